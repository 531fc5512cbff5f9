// Copyright (c) 2025, vistone
// All rights reserved.

use crate::handler::EventHandler;
use std::io;
use std::time::Duration;

/// Connector 外部IO引擎的出站连接入口
///
/// 连接池只通过这个边界发起连接，不关心引擎内部的就绪轮询与事件分发。
pub trait Connector: Send + Sync {
    /// is_attached 是否已挂接到运行中的reactor
    fn is_attached(&self) -> bool;

    /// connect 发起一次异步连接
    ///
    /// addr 格式 192.168.0.1:8080
    ///
    /// 返回Ok仅表示请求已成功发出；连接结果稍后通过handler的
    /// on_open/on_connect_fail 在引擎线程上送达。
    fn connect(
        &self,
        addr: &str,
        handler: Box<dyn EventHandler>,
        timeout: Duration,
    ) -> io::Result<()>;
}
