// Copyright (c) 2025, vistone
// All rights reserved.

use socket2::{SockRef, TcpKeepalive};
use std::io;
use std::os::fd::{BorrowedFd, RawFd};
use std::time::Duration;

/// set_keep_alive 在原始socket句柄上启用并配置TCP保活
pub fn set_keep_alive(
    fd: RawFd,
    idle: Duration,
    interval: Duration,
    probes: u32,
) -> io::Result<()> {
    // fd由引擎回调传入，仅在本次调用期间借用
    let fd = unsafe { BorrowedFd::borrow_raw(fd) };
    let sock = SockRef::from(&fd);
    let params = TcpKeepalive::new()
        .with_time(idle)
        .with_interval(interval)
        .with_retries(probes);
    sock.set_tcp_keepalive(&params)
}
