//! 贴片生命周期状态机的类型定义。
//! Type definitions for the patch lifecycle state machine.
//!
//! 该模块只定义阶段、子步骤与事件；合法转换表在
//! `store::validation` 中，事件的应用在 `store` 中。
//!
//! This module only defines phases, sub-steps and events; the legal
//! transition table lives in `store::validation`, event application in
//! `store`.

use serde::{Deserialize, Serialize};

/// The macro-state of the patch in its pairing / activation / delivery /
/// deactivation progression. Progression is monotonic forward, with two
/// exceptions: [`LifecyclePhase::Faulted`] is reachable from any phase,
/// and an explicit reset returns a deactivated patch to
/// [`LifecyclePhase::Unpaired`].
///
/// 贴片在配对/激活/输注/去激活进程中的宏观状态。进程单调向前，
/// 有两个例外：[`LifecyclePhase::Faulted`] 可以从任何阶段到达，
/// 显式重置可将已去激活的贴片带回 [`LifecyclePhase::Unpaired`]。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecyclePhase {
    /// No patch is bonded.
    /// 未绑定任何贴片。
    Unpaired,
    /// A bond with a discovered patch is being established.
    /// 正在与发现的贴片建立绑定。
    Bonding,
    /// The activation sequence is running; the payload is the sub-step
    /// currently in progress.
    /// 激活序列进行中；载荷为当前进行的子步骤。
    Activating(ActivationStep),
    /// The patch is activated and delivering.
    /// 贴片已激活并在输注。
    Activated,
    /// A deactivation handshake is in progress.
    /// 去激活握手进行中。
    Deactivating,
    /// The patch confirmed (or was forced through) deactivation.
    /// 贴片已确认（或被强制通过）去激活。
    Deactivated,
    /// The lifecycle model detected an inconsistency and refuses all
    /// dosing until reset.
    /// 生命周期模型检测到不一致，重置前拒绝一切给药。
    Faulted,
}

impl LifecyclePhase {
    /// Whether the patch is activated and may accept dosing commands.
    /// 贴片是否已激活并可接受给药命令。
    pub fn is_activated(&self) -> bool {
        matches!(self, LifecyclePhase::Activated)
    }

    /// Whether an activation sub-step is currently in progress.
    /// 当前是否有激活子步骤在进行。
    pub fn is_sub_step_running(&self) -> bool {
        matches!(self, LifecyclePhase::Activating(_))
    }
}

/// A fine-grained stage within the `Activating` phase, in protocol order.
///
/// `Activating` 阶段内的细粒度子步骤，按协议顺序排列。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivationStep {
    /// Device self-test after bonding.
    /// 绑定后的设备自检。
    SelfTest,
    /// Reservoir priming.
    /// 储药器排气。
    Priming,
    /// Needle insertion sensing.
    /// 针头植入感应。
    NeedleSensing,
    /// All sub-steps done; waiting for the final activation command.
    /// 所有子步骤完成；等待最终激活命令。
    Ready,
}

impl ActivationStep {
    /// The sub-step that follows this one, if any.
    /// 该子步骤之后的子步骤（若有）。
    pub fn next(&self) -> Option<ActivationStep> {
        match self {
            ActivationStep::SelfTest => Some(ActivationStep::Priming),
            ActivationStep::Priming => Some(ActivationStep::NeedleSensing),
            ActivationStep::NeedleSensing => Some(ActivationStep::Ready),
            ActivationStep::Ready => None,
        }
    }
}

/// A typed lifecycle event fed to `LifecycleStore::apply_event`.
///
/// 提供给 `LifecycleStore::apply_event` 的类型化生命周期事件。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleEvent {
    /// Bonding with a discovered patch started.
    /// 开始与发现的贴片绑定。
    BondStarted,
    /// The bond completed; activation begins at its first sub-step.
    /// 绑定完成；激活从第一个子步骤开始。
    BondSucceeded,
    /// The given activation sub-step completed.
    /// 给定的激活子步骤已完成。
    SubStepCompleted(ActivationStep),
    /// The device confirmed activation.
    /// 设备确认激活。
    ActivationConfirmed,
    /// A deactivation handshake started.
    /// 去激活握手开始。
    DeactivationStarted,
    /// The device confirmed (or the caller forced) deactivation.
    /// 设备确认（或调用者强制）去激活。
    DeactivationConfirmed,
    /// Explicit reset of a deactivated patch back to `Unpaired`.
    /// 将已去激活的贴片显式重置回 `Unpaired`。
    Reset,
    /// A fault was detected outside the store.
    /// 在存储之外检测到故障。
    FaultDetected,
}
