// Copyright (c) 2025, vistone
// All rights reserved.

use std::io;
use thiserror::Error;

/// 连接池相关错误定义
#[derive(Error, Debug)]
pub enum PoolError {
    /// connector 未挂接到运行中的 reactor
    #[error("connector is not attached to a running reactor")]
    ConnectorNotAttached,

    /// 底层IO错误（如工作线程创建失败）
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl PartialEq for PoolError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::ConnectorNotAttached, Self::ConnectorNotAttached) => true,
            (Self::Io(e1), Self::Io(e2)) => e1.kind() == e2.kind(),
            _ => false,
        }
    }
}

/// 连接池相关错误类型别名
pub type Result<T> = std::result::Result<T, PoolError>;
