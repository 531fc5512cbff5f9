// Copyright (c) 2025, vistone
// All rights reserved.

//! evconnpool 事件驱动网络库的动态外连连接池
//!
//! 针对单一远端地址维持一组可复用的存活连接：连接被取走或断开后，
//! 由后台调度器按缺口异步补充，总量受max_live_num约束，
//! 且任意时刻至多一批补充连接在途。
//!
//! 连接的建立完全交给外部IO引擎（[`Connector`]），建立结果经由
//! 有界intake队列移交池内工作线程完成登记，引擎回调线程不做池内簿记。

pub mod config;
pub mod connector;
pub mod errors;
pub mod handler;
pub mod keepalive;
pub mod pool;

pub use config::{default_config, PoolConfig};
pub use connector::Connector;
pub use errors::{PoolError, Result};
pub use handler::{EventHandler, HandlerFactory, PoolHandler, PoolItem};
pub use pool::ConnectPool;
