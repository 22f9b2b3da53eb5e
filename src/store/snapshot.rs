//! 持久化快照与持久化能力的接缝。
//! The persisted snapshot and the persistence capability seam.

use crate::error::{Error, Result};
use crate::types::{BolusCurrent, LifecyclePhase, NormalBasal, PatchConfig, TempBasal};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Everything the store persists across process restarts. The
/// device-reported `PatchState` is deliberately absent: it is transient
/// and re-read from the device after reconnection.
///
/// 存储跨进程重启持久化的全部内容。设备报告的 `PatchState` 被有意
/// 排除：它是瞬态的，重连后从设备重新读取。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchSnapshot {
    /// The lifecycle phase.
    /// 生命周期阶段。
    pub phase: LifecyclePhase,
    /// The patch configuration.
    /// 贴片配置。
    pub config: PatchConfig,
    /// The programmed normal basal profile.
    /// 已设定的普通基础率档案。
    pub normal_basal: Option<NormalBasal>,
    /// The running temp basal override.
    /// 进行中的临时基础率覆盖。
    pub temp_basal: Option<TempBasal>,
    /// The in-flight bolus pair.
    /// 在途大剂量对。
    pub bolus_current: BolusCurrent,
}

impl Default for PatchSnapshot {
    fn default() -> Self {
        Self {
            phase: LifecyclePhase::Unpaired,
            config: PatchConfig::default(),
            normal_basal: None,
            temp_basal: None,
            bolus_current: BolusCurrent::default(),
        }
    }
}

/// The persistence capability this core is built against. Implementors
/// own serialization and the storage medium; a load that cannot produce
/// a coherent snapshot must return `Error::Fatal`, since dosing against
/// a half-read lifecycle is unsafe.
///
/// 本核心所依赖的持久化能力。实现者负责序列化与存储介质；无法产出
/// 一致快照的加载必须返回 `Error::Fatal`，因为基于读了一半的生命
/// 周期给药是不安全的。
pub trait SnapshotStore: Send + Sync {
    /// Loads the persisted snapshot, `None` when nothing was saved yet.
    /// 加载持久化快照，尚未保存过则为 `None`。
    fn load(&self) -> Result<Option<PatchSnapshot>>;

    /// Durably saves the snapshot.
    /// 持久保存快照。
    fn save(&self, snapshot: &PatchSnapshot) -> Result<()>;
}

/// An in-memory snapshot store for tests and simulators.
/// 用于测试与模拟器的内存快照存储。
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    cell: Mutex<Option<PatchSnapshot>>,
}

impl MemorySnapshotStore {
    /// An empty store.
    /// 空的存储。
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seeds the store with a snapshot, as if persisted earlier.
    /// 预置一个快照，仿佛先前已持久化。
    pub fn seeded(snapshot: PatchSnapshot) -> Self {
        Self {
            cell: Mutex::new(Some(snapshot)),
        }
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn load(&self) -> Result<Option<PatchSnapshot>> {
        let guard = self
            .cell
            .lock()
            .map_err(|_| Error::Fatal("snapshot store poisoned".into()))?;
        Ok(guard.clone())
    }

    fn save(&self, snapshot: &PatchSnapshot) -> Result<()> {
        let mut guard = self
            .cell
            .lock()
            .map_err(|_| Error::Fatal("snapshot store poisoned".into()))?;
        *guard = Some(snapshot.clone());
        Ok(())
    }
}
