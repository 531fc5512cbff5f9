// Copyright (c) 2025, vistone
// All rights reserved.

// 并发正确性测试：多线程取还不重复不丢失、运行时不变量、closed回收名额

use evconnpool::*;
use std::collections::HashSet;
use std::io;
use std::os::fd::RawFd;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

struct MockConnector {
    issued: AtomicI32,
    attempts: Mutex<Vec<Box<dyn EventHandler>>>,
    next_fd: AtomicI32,
}

impl MockConnector {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            issued: AtomicI32::new(0),
            attempts: Mutex::new(Vec::new()),
            next_fd: AtomicI32::new(1000),
        })
    }

    fn issued(&self) -> i32 {
        self.issued.load(Ordering::Acquire)
    }

    fn resolve_all(&self) {
        let pending: Vec<_> = self.attempts.lock().unwrap().drain(..).collect();
        for mut h in pending {
            let fd = self.next_fd.fetch_add(1, Ordering::Relaxed);
            h.on_open(fd, 0);
        }
    }
}

impl Connector for MockConnector {
    fn is_attached(&self) -> bool {
        true
    }

    fn connect(
        &self,
        _addr: &str,
        handler: Box<dyn EventHandler>,
        _timeout: Duration,
    ) -> io::Result<()> {
        self.issued.fetch_add(1, Ordering::AcqRel);
        self.attempts.lock().unwrap().push(handler);
        Ok(())
    }
}

struct TestConn {
    item: PoolItem,
}

fn factory() -> HandlerFactory {
    Box::new(|| {
        Box::new(TestConn {
            item: PoolItem::default(),
        })
    })
}

impl EventHandler for TestConn {
    fn on_open(&mut self, _fd: RawFd, _now: i64) -> bool {
        true
    }

    fn on_close(&mut self, _fd: RawFd) {}
}

impl PoolHandler for TestConn {
    fn bind_pool(&mut self, pool: &Arc<ConnectPool>) {
        self.item.bind_pool(pool);
    }

    fn pool(&self) -> Option<Arc<ConnectPool>> {
        self.item.pool()
    }

    fn closed(&self) {
        self.item.closed();
    }
}

fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    cond()
}

#[test]
fn test_concurrent_acquire_release_no_duplicates() {
    const MAX_LIVE: usize = 10;
    const NUM_THREADS: usize = 8;
    const OPS_PER_THREAD: usize = 300;

    let connector = MockConnector::new();
    let pool = ConnectPool::with_config(
        connector.clone(),
        "127.0.0.1:8080",
        PoolConfig {
            min_idle_num: 5,
            add_num_once_time: 5,
            max_live_num: MAX_LIVE,
            keep_interval: Duration::from_millis(20),
            ..PoolConfig::default()
        },
        factory(),
    )
    .unwrap();

    // 后台持续把未决尝试解析成功，扮演引擎的完成回调线程
    let resolver_stop = Arc::new(AtomicBool::new(false));
    let resolver = {
        let connector = connector.clone();
        let stop = resolver_stop.clone();
        thread::spawn(move || {
            while !stop.load(Ordering::Relaxed) {
                connector.resolve_all();
                thread::sleep(Duration::from_millis(2));
            }
        })
    };

    // 监控线程：全程检查 0 <= idle <= live <= max_live
    let monitor_stop = Arc::new(AtomicBool::new(false));
    let invariant_violations = Arc::new(AtomicUsize::new(0));
    let monitor = {
        let pool = pool.clone();
        let stop = monitor_stop.clone();
        let violations = invariant_violations.clone();
        thread::spawn(move || {
            while !stop.load(Ordering::Relaxed) {
                // 本测试不调用closed，live只增不减，先读idle后读live不会误报
                let idle = pool.idle_num() as i32;
                let live = pool.live_num();
                if idle > live || live > MAX_LIVE as i32 {
                    violations.fetch_add(1, Ordering::Relaxed);
                }
                thread::sleep(Duration::from_millis(1));
            }
        })
    };

    let in_use: Arc<Mutex<HashSet<usize>>> = Arc::new(Mutex::new(HashSet::new()));
    let dup_violations = Arc::new(AtomicUsize::new(0));

    let mut workers = Vec::new();
    for _ in 0..NUM_THREADS {
        let pool = pool.clone();
        let in_use = in_use.clone();
        let dup_violations = dup_violations.clone();
        workers.push(thread::spawn(move || {
            for _ in 0..OPS_PER_THREAD {
                if let Some(conn) = pool.acquire() {
                    let key = &*conn as *const dyn PoolHandler as *const u8 as usize;
                    if !in_use.lock().unwrap().insert(key) {
                        // 同一个连接同时出现在两个持有者手里
                        dup_violations.fetch_add(1, Ordering::Relaxed);
                    }
                    thread::sleep(Duration::from_micros(100));
                    in_use.lock().unwrap().remove(&key);
                    pool.release(conn);
                }
            }
        }));
    }
    for h in workers {
        h.join().unwrap();
    }

    monitor_stop.store(true, Ordering::Relaxed);
    resolver_stop.store(true, Ordering::Relaxed);
    monitor.join().unwrap();
    resolver.join().unwrap();

    assert_eq!(dup_violations.load(Ordering::Relaxed), 0);
    assert_eq!(invariant_violations.load(Ordering::Relaxed), 0);
    assert!(pool.live_num() <= MAX_LIVE as i32);
    assert!(connector.issued() >= 5);
    pool.close();
}

#[test]
fn test_closed_decrements_live_exactly_once() {
    let connector = MockConnector::new();
    let pool = ConnectPool::with_config(
        connector.clone(),
        "127.0.0.1:8080",
        PoolConfig {
            min_idle_num: 3,
            add_num_once_time: 3,
            max_live_num: 6,
            keep_interval: Duration::from_secs(10), // 只靠空池信号驱动
            ..PoolConfig::default()
        },
        factory(),
    )
    .unwrap();

    assert!(pool.acquire().is_none());
    assert!(wait_until(Duration::from_secs(1), || connector.issued() == 3));
    connector.resolve_all();
    assert!(wait_until(Duration::from_secs(1), || pool.idle_num() == 3));
    assert_eq!(pool.live_num(), 3);

    // 逐个宣告断开，live每次恰好减一
    let mut expected = 3;
    for _ in 0..3 {
        let conn = pool.acquire().unwrap();
        conn.closed();
        drop(conn);
        expected -= 1;
        assert_eq!(pool.live_num(), expected);
    }
    assert_eq!(pool.live_num(), 0);
    assert_eq!(pool.idle_num(), 0);

    // 全部断开后回到冷启动：下一轮重新补足min_idle_num
    assert!(pool.acquire().is_none());
    assert!(wait_until(Duration::from_secs(1), || connector.issued() == 6));
    connector.resolve_all();
    assert!(wait_until(Duration::from_secs(1), || pool.idle_num() == 3));
    assert_eq!(pool.live_num(), 3);
    pool.close();
}
