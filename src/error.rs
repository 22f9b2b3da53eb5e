//! 定义了库中所有可能的错误类型。
//! Defines all possible error types in the library.

use crate::transport::LinkFault;
use crate::types::lifecycle::LifecyclePhase;
use thiserror::Error;

/// The primary error type for the patch controller library.
///
/// Every failure a caller can observe falls into exactly one of these
/// kinds. The first five are recoverable and are always surfaced as
/// `Err` values; [`Error::Fatal`] indicates a corrupted lifecycle model
/// and is propagated out of the long-running tasks so the process-level
/// supervisor can halt dosing decisions.
///
/// 贴片泵控制器库的主要错误类型。
///
/// 调用者可观察到的每一种失败恰好属于其中一类。前五类是可恢复的，
/// 始终以 `Err` 值返回；[`Error::Fatal`] 表示生命周期模型已损坏，
/// 会从长期运行的任务中向上传播，以便进程级监督者停止给药决策。
#[derive(Debug, Error)]
pub enum Error {
    /// A command is already in flight on this device link. New commands
    /// are rejected rather than queued.
    /// 该设备链路上已有一条命令在途。新命令被拒绝而不是排队。
    #[error("a command is already in flight on this link")]
    Busy,

    /// No response arrived within the deadline. The device-side effect
    /// of the command is unknown and must not be inferred.
    /// 截止时间内没有响应。命令在设备侧的效果未知，不得推断。
    #[error("no response within the deadline; device-side effect is unknown")]
    TimedOut,

    /// The transport reported a failure and the link is considered lost.
    /// 传输层报告了故障，链路被认为已丢失。
    #[error("link error: {0}")]
    Link(LinkFault),

    /// The device returned an explicit negative status code.
    /// 设备返回了明确的否定状态码。
    #[error("device rejected the command with status {0:#04x}")]
    Rejected(u8),

    /// The command was issued while the lifecycle phase forbids it,
    /// e.g. a bolus before activation.
    /// 在生命周期阶段不允许时下发了命令，例如激活前的大剂量。
    #[error("operation `{op}` not permitted in lifecycle phase {phase:?}")]
    InvalidPrecondition {
        /// The rejected operation, for diagnostics.
        /// 被拒绝的操作，用于诊断。
        op: &'static str,
        /// The phase the store was in at the time.
        /// 当时存储所处的阶段。
        phase: LifecyclePhase,
    },

    /// A programming-level invariant was violated: an unexpected
    /// lifecycle event, a corrupted persisted snapshot. Continuing
    /// risks unsafe dosing decisions.
    /// 违反了编程层面的不变量：意外的生命周期事件、损坏的持久化快照。
    /// 继续运行有不安全给药决策的风险。
    #[error("fatal invariant violation: {0}")]
    Fatal(String),
}

impl Error {
    /// Whether the caller may handle this error and carry on. Only
    /// [`Error::Fatal`] is unrecoverable.
    ///
    /// 调用者是否可以处理该错误并继续。只有 [`Error::Fatal`] 不可恢复。
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Error::Fatal(_))
    }
}

/// A specialized `Result` type for this library.
/// 本库专用的 `Result` 类型。
pub type Result<T> = std::result::Result<T, Error>;
