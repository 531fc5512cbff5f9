// Copyright (c) 2025, vistone
// All rights reserved.

use crate::pool::ConnectPool;
use std::io;
use std::os::fd::RawFd;
use std::sync::{Arc, Weak};

/// EventHandler IO引擎的事件回调接口
///
/// 所有回调都在引擎自己的IO线程上触发，实现方不应在其中阻塞。
pub trait EventHandler: Send {
    /// on_open 连接建立回调；返回false表示不注册后续IO事件
    fn on_open(&mut self, fd: RawFd, now: i64) -> bool;

    /// on_read fd可读回调；返回false表示交还连接控制权（将触发on_close）
    fn on_read(&mut self, fd: RawFd) -> bool {
        let _ = fd;
        true
    }

    /// on_connect_fail 异步连接失败（超时/拒绝/网络错误）回调
    fn on_connect_fail(&mut self, err: io::Error) {
        let _ = err;
    }

    /// on_close 连接关闭回调
    fn on_close(&mut self, fd: RawFd);
}

/// PoolHandler 入池连接需要实现的能力集：事件回调 + 池绑定 + 关闭通知
///
/// 用户类型通常内嵌[`PoolItem`]并把这三个方法委托给它。
pub trait PoolHandler: EventHandler {
    /// bind_pool 绑定所属连接池
    fn bind_pool(&mut self, pool: &Arc<ConnectPool>);

    /// pool 返回当前绑定的连接池
    fn pool(&self) -> Option<Arc<ConnectPool>>;

    /// closed 连接被检测为已断开时调用，通知连接池回收名额
    ///
    /// 调用前连接必须已经脱离流通（不在空闲队列中）。
    fn closed(&self);
}

/// HandlerFactory 池内连接对象工厂
pub type HandlerFactory = Box<dyn Fn() -> Box<dyn PoolHandler> + Send + Sync>;

/// PoolItem 池内连接的基础对象
///
/// 只持有所属连接池的弱引用：池的生命周期由其工作线程维系，
/// 绝不会因为连接的引用而被拖延释放。
#[derive(Default)]
pub struct PoolItem {
    cp: Weak<ConnectPool>,
}

impl PoolItem {
    /// bind_pool 绑定所属连接池
    pub fn bind_pool(&mut self, pool: &Arc<ConnectPool>) {
        self.cp = Arc::downgrade(pool);
    }

    /// pool 返回当前绑定的连接池
    pub fn pool(&self) -> Option<Arc<ConnectPool>> {
        self.cp.upgrade()
    }

    /// closed 通知连接池本连接已断开
    pub fn closed(&self) {
        if let Some(cp) = self.cp.upgrade() {
            cp.conn_closed();
        }
    }
}
