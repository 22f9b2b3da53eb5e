//! 定义了命令派发与链路监视的可配置参数。
//! Defines configurable parameters for command dispatch and link monitoring.

use std::time::Duration;

/// A structure containing all configurable parameters for the controller.
///
/// 包含控制器所有可配置参数的结构体。
#[derive(Debug, Clone)]
pub struct Config {
    /// Command dispatch-related parameters.
    /// 命令派发相关参数。
    pub command: CommandConfig,

    /// Link monitoring-related parameters.
    /// 链路监视相关参数。
    pub link: LinkConfig,

    /// State reconciliation-related parameters.
    /// 状态对账相关参数。
    pub reconcile: ReconcileConfig,
}

/// Command dispatch-related parameters.
///
/// 命令派发相关参数。
#[derive(Debug, Clone)]
pub struct CommandConfig {
    /// The default deadline applied to a device command when the caller
    /// does not supply one.
    /// 调用者未提供截止时间时应用于设备命令的默认截止时间。
    pub default_timeout: Duration,
    /// The fixed protocol deadline for the deactivation handshake.
    /// 去激活握手的固定协议截止时间。
    pub deactivate_timeout: Duration,
    /// The fixed protocol deadline for the temperature read.
    /// 温度读取的固定协议截止时间。
    pub temperature_timeout: Duration,
}

/// Link monitoring-related parameters.
///
/// 链路监视相关参数。
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// The interval between two `Connecting` progress ticks.
    /// 两次 `Connecting` 进度滴答之间的间隔。
    pub connecting_tick_interval: Duration,
    /// The tick number at which the `Connecting` progress counter halts
    /// regardless of link state. 600 ticks at one second each is the
    /// ten-minute bound of the reconnect window.
    ///
    /// `Connecting` 进度计数器无论链路状态如何都会停止的滴答编号。
    /// 每秒一次共600个滴答，即重连窗口的十分钟上界。
    pub connecting_tick_cap: u32,
    /// The capacity of the notification fan-out channel. A lagging
    /// consumer loses the oldest notifications, never blocks the core.
    ///
    /// 通知扇出通道的容量。滞后的消费者会丢失最旧的通知，
    /// 绝不会阻塞核心。
    pub notification_channel_capacity: usize,
}

/// State reconciliation-related parameters.
///
/// 状态对账相关参数。
#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    /// The interval between two device state reads while a priming
    /// progress stream is open.
    /// 排气进度流打开期间两次设备状态读取之间的间隔。
    pub priming_poll_interval: Duration,
    /// The capacity of a priming progress stream.
    /// 排气进度流的容量。
    pub priming_channel_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            command: CommandConfig::default(),
            link: LinkConfig::default(),
            reconcile: ReconcileConfig::default(),
        }
    }
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(10),
            deactivate_timeout: Duration::from_secs(15),
            temperature_timeout: Duration::from_secs(5),
        }
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            connecting_tick_interval: Duration::from_secs(1),
            connecting_tick_cap: 600, // 10 minutes at one tick per second
            notification_channel_capacity: 64,
        }
    }
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            priming_poll_interval: Duration::from_secs(1),
            priming_channel_capacity: 32,
        }
    }
}
