// Copyright (c) 2025, vistone
// All rights reserved.

use std::thread;
use std::time::Duration;

/// PoolConfig 连接池配置
pub struct PoolConfig {
    /// MinIdleNum 空闲连接数低于该值时触发补充
    pub min_idle_num: usize,

    /// AddNumOnceTime 每轮补充新建连接的默认数量
    pub add_num_once_time: usize,

    /// MaxLiveNum 存活连接总数上限（空闲+使用中）
    pub max_live_num: usize,

    /// KeepInterval 补充调度器的定时周期
    pub keep_interval: Duration,

    /// ConnectTimeout 单次连接尝试的超时时间
    pub connect_timeout: Duration,

    /// KeepAliveIdle TCP保活空闲时间
    pub keepalive_idle: Duration,

    /// KeepAliveInterval TCP保活探测间隔
    pub keepalive_interval: Duration,

    /// KeepAliveProbes TCP保活探测次数
    pub keepalive_probes: u32,

    /// IntakeCapacity 新连接交接队列容量，0表示取可用并行度的2倍
    pub intake_capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        default_config()
    }
}

/// default_config 返回默认配置
pub fn default_config() -> PoolConfig {
    PoolConfig {
        min_idle_num: 2,
        add_num_once_time: 2,
        max_live_num: 10,
        keep_interval: Duration::from_millis(200),
        connect_timeout: Duration::from_millis(1000),
        keepalive_idle: Duration::from_secs(60),
        keepalive_interval: Duration::from_secs(40),
        keepalive_probes: 3,
        intake_capacity: 0,
    }
}

impl PoolConfig {
    /// validate 校验min/add/max关系
    ///
    /// 非法组合属于编程错误而非运行时状况，直接panic终止。
    pub fn validate(&self) {
        if self.min_idle_num < 1
            || self.min_idle_num >= self.max_live_num
            || self.max_live_num < self.add_num_once_time
        {
            panic!(
                "ConnectPool min/add/max invalid: min_idle_num={} add_num_once_time={} max_live_num={}",
                self.min_idle_num, self.add_num_once_time, self.max_live_num
            );
        }
    }

    pub(crate) fn intake_capacity_or_default(&self) -> usize {
        if self.intake_capacity > 0 {
            self.intake_capacity
        } else {
            thread::available_parallelism().map(|n| n.get()).unwrap_or(4) * 2
        }
    }
}
