// Copyright (c) 2025, vistone
// All rights reserved.

use crate::config::PoolConfig;
use crate::connector::Connector;
use crate::errors::{PoolError, Result};
use crate::handler::{EventHandler, HandlerFactory, PoolHandler};
use crate::keepalive;
use crossbeam::channel::{self, Receiver, Sender};
use crossbeam::select;
use std::collections::VecDeque;
use std::io;
use std::os::fd::RawFd;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, trace, warn};

/// 新建连接从引擎回调线程移交到池内工作线程的载体
struct NewConn {
    fd: RawFd,
    ch: Box<dyn PoolHandler>,
}

/// ConnectPool 面向单一远端地址的动态外连连接池
///
/// 空闲连接数低于min_idle_num时按批补充，存活总数不超过max_live_num。
/// 补充由两个信号驱动：固定周期的定时器，以及acquire取空时发出的空池信号。
/// 每轮补充通过pending_num上的一次CAS抢占名额，保证至多一批连接在途。
pub struct ConnectPool {
    config: PoolConfig,
    addr: String,
    connector: Arc<dyn Connector>,
    new_handler: HandlerFactory,

    conns: Mutex<VecDeque<Box<dyn PoolHandler>>>,
    live_num: AtomicI32,
    pending_num: AtomicI32,

    empty_sig: Sender<()>,
    intake: Sender<NewConn>,
    stop: Mutex<Option<Sender<()>>>,
}

impl ConnectPool {
    /// new 创建连接池并启动补充/登记两个工作线程
    ///
    /// addr 格式 192.168.0.1:8080
    ///
    /// min/add/max关系非法时panic；connector未挂接reactor时返回错误。
    pub fn new(
        connector: Arc<dyn Connector>,
        addr: impl Into<String>,
        min_idle_num: usize,
        add_num_once_time: usize,
        max_live_num: usize,
        new_handler: HandlerFactory,
    ) -> Result<Arc<Self>> {
        let config = PoolConfig {
            min_idle_num,
            add_num_once_time,
            max_live_num,
            ..PoolConfig::default()
        };
        Self::with_config(connector, addr, config, new_handler)
    }

    /// with_config 按完整配置创建连接池
    pub fn with_config(
        connector: Arc<dyn Connector>,
        addr: impl Into<String>,
        config: PoolConfig,
        new_handler: HandlerFactory,
    ) -> Result<Arc<Self>> {
        config.validate();
        if !connector.is_attached() {
            return Err(PoolError::ConnectorNotAttached);
        }

        let (empty_tx, empty_rx) = channel::bounded::<()>(0);
        let (intake_tx, intake_rx) =
            channel::bounded::<NewConn>(config.intake_capacity_or_default());
        let (stop_tx, stop_rx) = channel::bounded::<()>(0);

        let cp = Arc::new(Self {
            config,
            addr: addr.into(),
            connector,
            new_handler,
            conns: Mutex::new(VecDeque::new()),
            live_num: AtomicI32::new(0),
            pending_num: AtomicI32::new(0),
            empty_sig: empty_tx,
            intake: intake_tx,
            stop: Mutex::new(Some(stop_tx)),
        });

        let keeper = cp.clone();
        let keeper_stop = stop_rx.clone();
        if let Err(e) = thread::Builder::new()
            .name("connpool-keeper".into())
            .spawn(move || keeper.keep_num_timing(empty_rx, keeper_stop))
        {
            cp.close();
            return Err(PoolError::Io(e));
        }

        let intaker = cp.clone();
        if let Err(e) = thread::Builder::new()
            .name("connpool-intake".into())
            .spawn(move || intaker.handle_new_conn(intake_rx, stop_rx))
        {
            cp.close();
            return Err(PoolError::Io(e));
        }

        Ok(cp)
    }

    /// acquire 取出一个可用连接；没有可用连接时返回None，绝不阻塞等待补充
    ///
    /// 取空会向补充调度器发送一次空池信号，让补充立即发生而不必等下个周期。
    pub fn acquire(&self) -> Option<Box<dyn PoolHandler>> {
        let item = self.conns.lock().unwrap().pop_front();
        if item.is_none() {
            // 调度器常驻select等待，rendezvous发送近乎即时；
            // close之后接收端已退出，发送立即失败而不是阻塞
            let _ = self.empty_sig.send(());
        }
        item
    }

    /// release 归还一个可复用连接
    ///
    /// handler不属于本池时panic，这是使用契约而非可恢复的运行时状况。
    pub fn release(&self, ch: Box<dyn PoolHandler>) {
        match ch.pool() {
            Some(cp) if std::ptr::eq(Arc::as_ptr(&cp), self) => {}
            _ => panic!("ConnectPool::release: handler does not belong to this pool"),
        }
        self.conns.lock().unwrap().push_back(ch);
    }

    /// idle_num 当前空闲连接数
    pub fn idle_num(&self) -> usize {
        self.conns.lock().unwrap().len()
    }

    /// live_num 当前存活连接数（空闲+使用中）
    pub fn live_num(&self) -> i32 {
        self.live_num.load(Ordering::Acquire)
    }

    /// pending_num 已发起但尚未有结果的连接尝试数
    pub fn pending_num(&self) -> i32 {
        self.pending_num.load(Ordering::Acquire)
    }

    /// close 停止两个工作线程并清空空闲连接，可重复调用
    ///
    /// 调用后池不再补充；仍在途的连接尝试解析后会被静默丢弃。
    pub fn close(&self) {
        let stop = self.stop.lock().unwrap().take();
        if stop.is_none() {
            return;
        }
        // 丢弃stop发送端，两个工作线程的select随即感知断开并退出
        drop(stop);
        self.conns.lock().unwrap().clear();
    }

    pub(crate) fn conn_closed(&self) {
        self.live_num.fetch_sub(1, Ordering::AcqRel);
    }

    /// 补充调度器主循环：定时周期与空池信号走同一套补充算法
    fn keep_num_timing(self: Arc<Self>, empty_rx: Receiver<()>, stop_rx: Receiver<()>) {
        let ticker = channel::tick(self.config.keep_interval);
        loop {
            select! {
                recv(empty_rx) -> _ => self.keep_num(),
                recv(ticker) -> _ => self.keep_num(),
                recv(stop_rx) -> _ => break,
            }
        }
    }

    /// keep_num 一轮补充：估算缺口并批量发起异步连接
    fn keep_num(self: &Arc<Self>) {
        let idle_num = self.idle_num();
        if idle_num >= self.config.min_idle_num {
            return;
        }
        let live_num = self.live_num.load(Ordering::Acquire).max(0) as usize;
        let mut to_new = self.config.add_num_once_time;
        if live_num == 0 {
            // 冷启动：一次补足最小空闲数
            to_new = self.config.min_idle_num;
        } else if to_new + live_num > self.config.max_live_num {
            to_new = self.config.max_live_num.saturating_sub(live_num);
        }
        if to_new < 1 {
            return;
        }

        // CAS从0抢占本轮名额；抢占失败说明上一批还在途，直接放弃本轮
        if self
            .pending_num
            .compare_exchange(0, to_new as i32, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        trace!(addr = %self.addr, to_new, "replenishing connect pool");
        for _ in 0..to_new {
            let attempt = Box::new(ConnectAttempt { cp: self.clone() });
            if let Err(e) = self
                .connector
                .connect(&self.addr, attempt, self.config.connect_timeout)
            {
                self.pending_num.fetch_sub(1, Ordering::AcqRel);
                debug!(addr = %self.addr, "connect not issued: {e}");
            }
        }
    }

    /// intake消费者主循环：逐个登记新建连接
    fn handle_new_conn(self: Arc<Self>, intake_rx: Receiver<NewConn>, stop_rx: Receiver<()>) {
        loop {
            select! {
                recv(intake_rx) -> msg => match msg {
                    Ok(conn) => self.on_new_conn(conn.fd, conn.ch),
                    Err(_) => break,
                },
                recv(stop_rx) -> _ => break,
            }
        }
    }

    /// on_new_conn 新连接入池：先过用户open钩子，拒绝则直接丢弃不计数
    fn on_new_conn(&self, fd: RawFd, mut ch: Box<dyn PoolHandler>) {
        if !ch.on_open(fd, now_millis()) {
            debug!(fd, "handler rejected new connection");
            return;
        }
        self.live_num.fetch_add(1, Ordering::AcqRel);
        self.release(ch);
    }
}

/// ConnectAttempt 单次异步连接尝试的桥接处理器
///
/// 生命周期仅覆盖从发起连接到引擎送达结果为止；成功时把新连接
/// 交给intake队列后即被丢弃，从不注册后续IO事件。
struct ConnectAttempt {
    cp: Arc<ConnectPool>,
}

impl EventHandler for ConnectAttempt {
    fn on_open(&mut self, fd: RawFd, _now: i64) -> bool {
        self.cp.pending_num.fetch_sub(1, Ordering::AcqRel);

        if let Err(e) = keepalive::set_keep_alive(
            fd,
            self.cp.config.keepalive_idle,
            self.cp.config.keepalive_interval,
            self.cp.config.keepalive_probes,
        ) {
            debug!(fd, "set keepalive failed: {e}");
        }

        let mut ch = (self.cp.new_handler)();
        ch.bind_pool(&self.cp);
        // 有界发送：队列满时会阻塞引擎回调线程，以此对连接建立速率背压
        if self.cp.intake.send(NewConn { fd, ch }).is_err() {
            // 池已close，intake消费者不在了
            warn!(fd, "connect pool is closed, dropping new connection");
        }
        false
    }

    fn on_connect_fail(&mut self, err: io::Error) {
        self.cp.pending_num.fetch_sub(1, Ordering::AcqRel);
        debug!(addr = %self.cp.addr, "connect failed: {err}");
    }

    fn on_close(&mut self, _fd: RawFd) {}
}

/// 当前Unix毫秒时间戳
fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
