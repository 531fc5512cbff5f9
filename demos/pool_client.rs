// Copyright (c) 2025, vistone
// All rights reserved.

// 连接池使用演示：用每次连接单独起线程的最小连接器充当IO引擎
//
// 用法: cargo run --example pool_client <ip:port>

use evconnpool::*;
use std::io;
use std::net::{SocketAddr, TcpStream};
use std::os::fd::{AsRawFd, RawFd};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

struct ThreadConnector {
    streams: Arc<Mutex<Vec<TcpStream>>>,
}

impl Connector for ThreadConnector {
    fn is_attached(&self) -> bool {
        true
    }

    fn connect(
        &self,
        addr: &str,
        handler: Box<dyn EventHandler>,
        timeout: Duration,
    ) -> io::Result<()> {
        let addr: SocketAddr = addr
            .parse()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let streams = self.streams.clone();
        thread::Builder::new()
            .name("demo-connector".into())
            .spawn(move || {
                let mut handler = handler;
                match TcpStream::connect_timeout(&addr, timeout) {
                    Ok(stream) => {
                        let fd = stream.as_raw_fd();
                        streams.lock().unwrap().push(stream);
                        handler.on_open(fd, 0);
                    }
                    Err(e) => handler.on_connect_fail(e),
                }
            })?;
        Ok(())
    }
}

struct DemoConn {
    item: PoolItem,
}

impl EventHandler for DemoConn {
    fn on_open(&mut self, fd: RawFd, _now: i64) -> bool {
        println!("connection ready, fd={fd}");
        true
    }

    fn on_close(&mut self, _fd: RawFd) {}
}

impl PoolHandler for DemoConn {
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

fn main() {
    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:8080".to_string());

    let connector = Arc::new(ThreadConnector {
        streams: Arc::new(Mutex::new(Vec::new())),
    });
    let pool = ConnectPool::new(
        connector,
        addr,
        3,
        2,
        8,
        Box::new(|| {
            Box::new(DemoConn {
                item: PoolItem::default(),
            })
        }),
    )
    .expect("create connect pool");

    for round in 0..20 {
        match pool.acquire() {
            Some(conn) => {
                println!(
                    "round {round}: acquired, idle={} live={}",
                    pool.idle_num(),
                    pool.live_num()
                );
                pool.release(conn);
            }
            None => {
                println!(
                    "round {round}: pool empty, replenishing... live={}",
                    pool.live_num()
                );
            }
        }
        thread::sleep(Duration::from_millis(100));
    }

    pool.close();
}
