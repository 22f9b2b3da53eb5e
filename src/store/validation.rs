//! 生命周期阶段转换的验证逻辑模块。
//! Lifecycle phase transition validation logic module.
//!
//! 该模块是纯函数式的转换表：给定当前阶段与事件，产出结果阶段或
//! 拒绝。事件的实际应用与 `Faulted` 强制在 `store` 中。
//!
//! This module is a pure transition table: given the current phase and
//! an event, it yields the resulting phase or a refusal. Actual event
//! application and the `Faulted` coercion live in `store`.

use crate::types::lifecycle::{ActivationStep, LifecycleEvent, LifecyclePhase};

/// Phase validator responsible for the legal-transition table and the
/// phase predicates the dispatcher checks preconditions against.
/// 阶段验证器，负责合法转换表以及派发器检查前置条件所用的谓词。
pub struct PhaseValidator;

impl PhaseValidator {
    /// Applies an event to a phase. `None` means the event is not legal
    /// in this phase; the caller coerces to `Faulted`.
    ///
    /// 将事件应用到阶段。`None` 表示事件在该阶段不合法；
    /// 由调用者强制为 `Faulted`。
    pub fn apply(phase: LifecyclePhase, event: LifecycleEvent) -> Option<LifecyclePhase> {
        use LifecycleEvent::*;
        use LifecyclePhase::*;

        match (phase, event) {
            // 故障可以从任何阶段进入
            // A fault can be entered from any phase
            (_, FaultDetected) => Some(Faulted),

            // 绑定流程
            // Bonding flow
            (Unpaired, BondStarted) => Some(Bonding),
            (Bonding, BondSucceeded) => Some(Activating(ActivationStep::SelfTest)),

            // 激活子步骤严格按协议顺序推进
            // Activation sub-steps advance strictly in protocol order
            (Activating(current), SubStepCompleted(step)) if step == current => {
                step.next().map(Activating)
            }
            (Activating(ActivationStep::Ready), ActivationConfirmed) => Some(Activated),

            // 去激活
            // Deactivation
            (Activated, DeactivationStarted) => Some(Deactivating),
            (Deactivating, DeactivationConfirmed) => Some(Deactivated),
            // 强制去激活可以跳过握手阶段
            // Forced deactivation may skip the handshake phase
            (Activated, DeactivationConfirmed) => Some(Deactivated),

            // 确认去激活后的显式重置；故障贴片移除后同样如此
            // Explicit reset after confirmed deactivation; likewise for
            // a removed faulted patch
            (Deactivated, Reset) => Some(Unpaired),
            (Faulted, Reset) => Some(Unpaired),

            // 其余组合均不合法
            // All other combinations are illegal
            _ => None,
        }
    }

    /// Whether the phase permits dosing commands.
    /// 该阶段是否允许给药命令。
    pub fn permits_dosing(phase: LifecyclePhase) -> bool {
        matches!(phase, LifecyclePhase::Activated)
    }

    /// Whether the phase permits bonding.
    /// 该阶段是否允许绑定。
    pub fn permits_bonding(phase: LifecyclePhase) -> bool {
        matches!(phase, LifecyclePhase::Unpaired | LifecyclePhase::Bonding)
    }

    /// Whether the phase permits activation sub-step commands.
    /// 该阶段是否允许激活子步骤命令。
    pub fn permits_activation_steps(phase: LifecyclePhase) -> bool {
        matches!(phase, LifecyclePhase::Activating(_))
    }

    /// Whether the phase permits the deactivation handshake.
    /// 该阶段是否允许去激活握手。
    pub fn permits_deactivation(phase: LifecyclePhase) -> bool {
        matches!(
            phase,
            LifecyclePhase::Activated | LifecyclePhase::Deactivating
        )
    }
}
