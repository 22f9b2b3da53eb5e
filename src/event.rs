//! 面向外部观察者的通知扇出。
//! Notification fan-out toward external observers.

use crate::types::ConnectionState;

/// A fire-and-forget notification consumed by UI/automation layers
/// outside this core. The consumer drains the broadcast channel on its
/// own serialized context; the core never waits for it.
///
/// 由本核心之外的UI/自动化层消费的即发即忘通知。消费者在自己的
/// 串行上下文中消费广播通道；核心从不等待它。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// The connection state changed, or a `Connecting` progress tick.
    /// 连接状态变化，或一次 `Connecting` 进度滴答。
    StatusChanged(ConnectionState),
    /// The overview presentation should refresh.
    /// 概览界面应当刷新。
    RefreshOverview {
        /// Human-readable cause, for logs and diagnostics.
        /// 可读的原因，用于日志与诊断。
        reason: String,
    },
    /// The set of available custom actions changed.
    /// 可用自定义操作的集合发生变化。
    CustomActionsChanged,
    /// Activation was started but has not completed. Re-emitted on
    /// every periodic check while the condition persists; the consumer
    /// collapses duplicates.
    /// 激活已开始但尚未完成。条件持续期间每次周期检查都会重发；
    /// 由消费者折叠重复项。
    ActivationNotComplete,
}
