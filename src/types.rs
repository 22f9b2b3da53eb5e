//! The domain value objects: lifecycle, configuration, delivery profiles,
//! alarms and connection state.
//! 领域值对象：生命周期、配置、输注档案、报警与连接状态。

pub mod alarm;
pub mod connection;
pub mod delivery;
pub mod lifecycle;
pub mod patch_config;
pub mod patch_state;

pub use alarm::{AlarmCode, AlarmSet};
pub use connection::ConnectionState;
pub use delivery::{BolusCurrent, BolusExDuration, BolusInjection, NormalBasal, TempBasal};
pub use lifecycle::{ActivationStep, LifecycleEvent, LifecyclePhase};
pub use patch_config::PatchConfig;
pub use patch_state::PatchState;
