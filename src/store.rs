//! The lifecycle store: the single writer of all persisted patch state.
//! 生命周期存储：所有持久化贴片状态的唯一写入者。

pub mod snapshot;
pub mod validation;

pub use snapshot::{MemorySnapshotStore, PatchSnapshot, SnapshotStore};

use crate::error::{Error, Result};
use crate::types::{
    BolusCurrent, LifecycleEvent, LifecyclePhase, NormalBasal, PatchConfig, PatchState, TempBasal,
};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use validation::PhaseValidator;

/// Diagnostic record of the last event the state machine refused.
/// 状态机最近拒绝的事件的诊断记录。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RejectedEvent {
    /// The refused event.
    /// 被拒绝的事件。
    pub event: LifecycleEvent,
    /// The phase the store was in when it was refused.
    /// 拒绝时存储所处的阶段。
    pub phase: LifecyclePhase,
}

/// 存储的内部快照，由单把互斥锁保护。
/// The store's inner snapshot, guarded by a single mutex.
#[derive(Debug)]
struct StoreInner {
    phase: LifecyclePhase,
    config: PatchConfig,
    normal_basal: Option<NormalBasal>,
    temp_basal: Option<TempBasal>,
    bolus_current: BolusCurrent,
    patch_state: PatchState,
    last_rejected: Option<RejectedEvent>,
}

/// The lifecycle store.
///
/// Holds the persisted lifecycle phase and configuration snapshot under
/// a single-writer discipline: every mutation runs under one mutex, so
/// concurrent appliers observe a total order and readers never see a
/// partially applied event. Change notification rides on `watch`
/// channels; a late subscriber receives only the latest value.
///
/// Mutations are NOT auto-persisted; callers invoke [`LifecycleStore::flush`]
/// after mutations they want survived across restarts, which bounds
/// write amplification during rapid bolus-progress updates.
///
/// 生命周期存储。
///
/// 以单写者纪律持有持久化的生命周期阶段与配置快照：每次修改都在
/// 同一把互斥锁下进行，因此并发的应用者观察到全序，读者绝不会看到
/// 部分应用的事件。变更通知通过 `watch` 通道传递，晚到的订阅者
/// 只能收到最新值。
///
/// 修改不会自动持久化；调用者在希望跨重启保留的修改之后调用
/// [`LifecycleStore::flush`]，以此约束大剂量进度快速更新期间的写放大。
pub struct LifecycleStore {
    inner: Mutex<StoreInner>,
    snapshots: Arc<dyn SnapshotStore>,
    phase_tx: watch::Sender<LifecyclePhase>,
    config_tx: watch::Sender<PatchConfig>,
    bolus_tx: watch::Sender<BolusCurrent>,
    patch_state_tx: watch::Sender<PatchState>,
}

impl std::fmt::Debug for LifecycleStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleStore")
            .field("phase", &self.phase())
            .finish()
    }
}

impl LifecycleStore {
    /// Creates the store from the persisted snapshot, or from defaults
    /// when nothing was persisted yet. A snapshot that fails to load is
    /// a corrupted lifecycle model: `Error::Fatal`.
    ///
    /// 从持久化快照创建存储；尚无持久化内容时从默认值创建。
    /// 无法加载的快照意味着生命周期模型已损坏：`Error::Fatal`。
    pub fn open(snapshots: Arc<dyn SnapshotStore>) -> Result<Self> {
        let loaded = snapshots
            .load()
            .map_err(|e| Error::Fatal(format!("corrupted persisted snapshot: {e}")))?;
        let snap = loaded.unwrap_or_default();

        info!(phase = ?snap.phase, "Lifecycle store opened");

        let (phase_tx, _) = watch::channel(snap.phase);
        let (config_tx, _) = watch::channel(snap.config.clone());
        let (bolus_tx, _) = watch::channel(snap.bolus_current);
        let (patch_state_tx, _) = watch::channel(PatchState::default());

        Ok(Self {
            inner: Mutex::new(StoreInner {
                phase: snap.phase,
                config: snap.config,
                normal_basal: snap.normal_basal,
                temp_basal: snap.temp_basal,
                bolus_current: snap.bolus_current,
                patch_state: PatchState::default(),
                last_rejected: None,
            }),
            snapshots,
            phase_tx,
            config_tx,
            bolus_tx,
            patch_state_tx,
        })
    }

    /// 在互斥锁下运行一个修改并返回其结果。锁从不跨越 `.await`。
    /// Runs a mutation under the mutex and returns its result. The lock
    /// is never held across an `.await`.
    fn with_inner<R>(&self, f: impl FnOnce(&mut StoreInner) -> R) -> R {
        match self.inner.lock() {
            Ok(mut guard) => f(&mut guard),
            // 所有修改都是纯数据操作；锁中毒时继续使用内部数据
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }

    /// Advances the lifecycle state machine. Never fails: an event that
    /// is not legal in the current phase coerces the phase to
    /// `Faulted`, with the offending event recorded for diagnostics.
    /// Returns the resulting phase.
    ///
    /// 推进生命周期状态机。从不失败：在当前阶段不合法的事件会把
    /// 阶段强制为 `Faulted`，并记录违规事件用于诊断。返回结果阶段。
    pub fn apply_event(&self, event: LifecycleEvent) -> LifecyclePhase {
        let (old, new) = self.with_inner(|inner| {
            let old = inner.phase;
            let new = match PhaseValidator::apply(old, event) {
                Some(next) => next,
                None => {
                    inner.last_rejected = Some(RejectedEvent { event, phase: old });
                    error!(
                        ?event,
                        phase = ?old,
                        "Lifecycle event not legal in current phase; coercing to Faulted"
                    );
                    LifecyclePhase::Faulted
                }
            };
            inner.phase = new;
            if new == LifecyclePhase::Deactivated {
                // 确认去激活后配置回到默认值
                inner.config = PatchConfig::default();
                inner.temp_basal = None;
                inner.bolus_current = BolusCurrent::default();
            }
            (old, new)
        });

        if old != new {
            debug!(from = ?old, to = ?new, ?event, "Lifecycle phase advanced");
        }
        self.phase_tx.send_replace(new);
        if new == LifecyclePhase::Deactivated {
            self.config_tx.send_replace(self.config());
            self.bolus_tx.send_replace(self.bolus_current());
        }
        new
    }

    /// Non-blocking snapshot read of the current phase.
    /// 当前阶段的非阻塞快照读取。
    pub fn phase(&self) -> LifecyclePhase {
        self.with_inner(|inner| inner.phase)
    }

    /// Non-blocking snapshot read of the patch configuration.
    /// 贴片配置的非阻塞快照读取。
    pub fn config(&self) -> PatchConfig {
        self.with_inner(|inner| inner.config.clone())
    }

    /// Non-blocking snapshot read of the in-flight bolus pair.
    /// 在途大剂量对的非阻塞快照读取。
    pub fn bolus_current(&self) -> BolusCurrent {
        self.with_inner(|inner| inner.bolus_current)
    }

    /// Non-blocking snapshot read of the last device-reported state.
    /// 最近设备报告状态的非阻塞快照读取。
    pub fn patch_state(&self) -> PatchState {
        self.with_inner(|inner| inner.patch_state)
    }

    /// The scheduled normal basal profile, if one is programmed.
    /// 已设定的普通基础率档案（若有）。
    pub fn normal_basal(&self) -> Option<NormalBasal> {
        self.with_inner(|inner| inner.normal_basal.clone())
    }

    /// The running temp basal override, if any.
    /// 进行中的临时基础率覆盖（若有）。
    pub fn temp_basal(&self) -> Option<TempBasal> {
        self.with_inner(|inner| inner.temp_basal)
    }

    /// The last event the state machine refused, if any.
    /// 状态机最近拒绝的事件（若有）。
    pub fn last_rejected_event(&self) -> Option<RejectedEvent> {
        self.with_inner(|inner| inner.last_rejected)
    }

    /// Mutates the patch configuration in place and publishes the new
    /// value. Not persisted until [`LifecycleStore::flush`].
    /// 就地修改贴片配置并发布新值。在 [`LifecycleStore::flush`]
    /// 之前不持久化。
    pub fn update_config(&self, f: impl FnOnce(&mut PatchConfig)) -> PatchConfig {
        let config = self.with_inner(|inner| {
            f(&mut inner.config);
            inner.config.clone()
        });
        self.config_tx.send_replace(config.clone());
        config
    }

    /// Stores a device-reported state snapshot and publishes it. A
    /// report of an idle device clears the cached bolus and temp-basal
    /// profiles; reconciliation after reconnection relies on this.
    ///
    /// 存入设备报告的状态快照并发布。设备空闲的报告会清除缓存的
    /// 大剂量与临时基础率档案；重连后的对账依赖这一点。
    pub fn update_patch_state(&self, state: PatchState) {
        let cleared = self.with_inner(|inner| {
            inner.patch_state = state;
            if state.is_idle() && (inner.bolus_current.is_active() || inner.temp_basal.is_some()) {
                inner.bolus_current = BolusCurrent::default();
                inner.temp_basal = None;
                true
            } else {
                false
            }
        });
        if cleared {
            warn!("Device reported idle; clearing cached bolus and temp basal");
            self.bolus_tx.send_replace(BolusCurrent::default());
        }
        self.patch_state_tx.send_replace(state);
    }

    /// Stores the programmed normal basal profile.
    /// 存入设定的普通基础率档案。
    pub fn set_normal_basal(&self, basal: NormalBasal) {
        self.with_inner(|inner| inner.normal_basal = Some(basal));
    }

    /// Stores the started temp basal override.
    /// 存入已启动的临时基础率覆盖。
    pub fn set_temp_basal(&self, temp: TempBasal) {
        self.with_inner(|inner| inner.temp_basal = Some(temp));
    }

    /// Clears the temp basal record after an explicit stop. Normal
    /// basal resumption is NOT driven from here: the device reports it
    /// through the next state read, identically for an explicit stop
    /// and a natural expiry.
    ///
    /// 显式停止后清除临时基础率记录。普通基础率的恢复不从这里驱动：
    /// 设备会通过下一次状态读取报告，显式停止与自然到期完全一致。
    pub fn clear_temp_basal(&self) {
        self.with_inner(|inner| inner.temp_basal = None);
    }

    /// Mutates the in-flight bolus pair and publishes the new value.
    /// 修改在途大剂量对并发布新值。
    pub fn update_bolus(&self, f: impl FnOnce(&mut BolusCurrent)) -> BolusCurrent {
        let bolus = self.with_inner(|inner| {
            f(&mut inner.bolus_current);
            inner.bolus_current
        });
        self.bolus_tx.send_replace(bolus);
        bolus
    }

    /// Durably persists the current snapshot through the persistence
    /// collaborator.
    /// 通过持久化协作者持久保存当前快照。
    pub fn flush(&self) -> Result<()> {
        let snap = self.with_inner(|inner| PatchSnapshot {
            phase: inner.phase,
            config: inner.config.clone(),
            normal_basal: inner.normal_basal.clone(),
            temp_basal: inner.temp_basal,
            bolus_current: inner.bolus_current,
        });
        self.snapshots.save(&snap)
    }

    /// Observes lifecycle phase changes. A late subscriber sees only
    /// the latest value, not history.
    /// 观察生命周期阶段变化。晚到的订阅者只能看到最新值，没有历史。
    pub fn observe_phase(&self) -> watch::Receiver<LifecyclePhase> {
        self.phase_tx.subscribe()
    }

    /// Observes configuration changes.
    /// 观察配置变化。
    pub fn observe_config(&self) -> watch::Receiver<PatchConfig> {
        self.config_tx.subscribe()
    }

    /// Observes in-flight bolus changes.
    /// 观察在途大剂量变化。
    pub fn observe_bolus(&self) -> watch::Receiver<BolusCurrent> {
        self.bolus_tx.subscribe()
    }

    /// Observes device-reported state updates.
    /// 观察设备报告状态的更新。
    pub fn observe_patch_state(&self) -> watch::Receiver<PatchState> {
        self.patch_state_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::lifecycle::ActivationStep;

    fn open_store() -> (LifecycleStore, Arc<MemorySnapshotStore>) {
        let snapshots = Arc::new(MemorySnapshotStore::new());
        let store = LifecycleStore::open(snapshots.clone()).expect("open");
        (store, snapshots)
    }

    #[test]
    fn test_apply_event_total_order_of_phases() {
        let (store, _) = open_store();
        assert_eq!(store.phase(), LifecyclePhase::Unpaired);

        assert_eq!(
            store.apply_event(LifecycleEvent::BondStarted),
            LifecyclePhase::Bonding
        );
        assert_eq!(
            store.apply_event(LifecycleEvent::BondSucceeded),
            LifecyclePhase::Activating(ActivationStep::SelfTest)
        );
        assert_eq!(
            store.apply_event(LifecycleEvent::SubStepCompleted(ActivationStep::SelfTest)),
            LifecyclePhase::Activating(ActivationStep::Priming)
        );
    }

    #[test]
    fn test_out_of_order_event_coerces_to_faulted() {
        let (store, _) = open_store();
        // 未配对时确认激活是非法的
        let phase = store.apply_event(LifecycleEvent::ActivationConfirmed);
        assert_eq!(phase, LifecyclePhase::Faulted);

        let rejected = store.last_rejected_event().expect("recorded");
        assert_eq!(rejected.event, LifecycleEvent::ActivationConfirmed);
        assert_eq!(rejected.phase, LifecyclePhase::Unpaired);
    }

    #[test]
    fn test_deactivation_resets_config() {
        let (store, _) = open_store();
        store.apply_event(LifecycleEvent::BondStarted);
        store.apply_event(LifecycleEvent::BondSucceeded);
        store.apply_event(LifecycleEvent::SubStepCompleted(ActivationStep::SelfTest));
        store.apply_event(LifecycleEvent::SubStepCompleted(ActivationStep::Priming));
        store.apply_event(LifecycleEvent::SubStepCompleted(
            ActivationStep::NeedleSensing,
        ));
        store.apply_event(LifecycleEvent::ActivationConfirmed);
        store.update_config(|c| {
            c.address = Some("00:11:22:33:44:55".into());
            c.info_reminder = true;
        });

        store.apply_event(LifecycleEvent::DeactivationStarted);
        let phase = store.apply_event(LifecycleEvent::DeactivationConfirmed);
        assert_eq!(phase, LifecyclePhase::Deactivated);
        assert_eq!(store.config(), PatchConfig::default());

        // 显式重置回到未配对
        assert_eq!(
            store.apply_event(LifecycleEvent::Reset),
            LifecyclePhase::Unpaired
        );
    }

    #[test]
    fn test_flush_then_reload_roundtrip() {
        let snapshots = Arc::new(MemorySnapshotStore::new());
        {
            let store = LifecycleStore::open(snapshots.clone()).expect("open");
            store.apply_event(LifecycleEvent::BondStarted);
            store.apply_event(LifecycleEvent::BondSucceeded);
            store.update_config(|c| {
                c.address = Some("aa:bb".into());
                c.low_reservoir_alert_units = 20;
            });
            store.set_normal_basal(NormalBasal::flat(0.8));
            store.flush().expect("flush");
        }

        let reloaded = LifecycleStore::open(snapshots).expect("reopen");
        assert_eq!(
            reloaded.phase(),
            LifecyclePhase::Activating(ActivationStep::SelfTest)
        );
        let config = reloaded.config();
        assert_eq!(config.address.as_deref(), Some("aa:bb"));
        assert_eq!(config.low_reservoir_alert_units, 20);
        assert_eq!(reloaded.normal_basal(), Some(NormalBasal::flat(0.8)));
    }

    #[test]
    fn test_unflushed_mutation_does_not_survive_reload() {
        let snapshots = Arc::new(MemorySnapshotStore::new());
        {
            let store = LifecycleStore::open(snapshots.clone()).expect("open");
            store.apply_event(LifecycleEvent::BondStarted);
            // 没有flush
        }
        let reloaded = LifecycleStore::open(snapshots).expect("reopen");
        assert_eq!(reloaded.phase(), LifecyclePhase::Unpaired);
    }

    #[test]
    fn test_idle_patch_state_clears_delivery() {
        let (store, _) = open_store();
        store.set_temp_basal(TempBasal {
            rate_u_per_hr: 0.5,
            duration_min: 30,
        });
        store.update_bolus(|b| b.now = Some(crate::types::BolusInjection::programmed(2.0)));

        // 活跃状态不清除
        store.update_patch_state(PatchState {
            now_bolus_active: true,
            ..PatchState::default()
        });
        assert!(store.bolus_current().is_active());

        // 空闲报告清除两者
        store.update_patch_state(PatchState::default());
        assert!(!store.bolus_current().is_active());
        assert_eq!(store.temp_basal(), None);
    }

    #[test]
    fn test_late_subscriber_sees_only_latest_value() {
        let (store, _) = open_store();
        store.apply_event(LifecycleEvent::BondStarted);
        store.apply_event(LifecycleEvent::BondSucceeded);

        // 订阅发生在两次事件之后：只能看到最新阶段
        let rx = store.observe_phase();
        assert_eq!(
            *rx.borrow(),
            LifecyclePhase::Activating(ActivationStep::SelfTest)
        );
    }
}
