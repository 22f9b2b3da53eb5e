//! 输注档案：普通基础率、临时基础率与大剂量。
//! Delivery profiles: normal basal, temp basal and bolus.

use serde::{Deserialize, Serialize};

/// One segment of the scheduled basal profile.
/// 计划基础率档案中的一个时段。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BasalSegment {
    /// Segment start, minutes from midnight.
    /// 时段开始，自午夜起的分钟数。
    pub start_min: u16,
    /// Segment end, minutes from midnight (exclusive).
    /// 时段结束，自午夜起的分钟数（不含）。
    pub end_min: u16,
    /// Delivery rate in dose units per hour.
    /// 输注速率，单位为剂量单位/小时。
    pub rate_u_per_hr: f32,
}

/// The scheduled basal delivery profile.
///
/// 计划中的基础率输注档案。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalBasal {
    /// The ordered, non-overlapping segments covering 24 hours.
    /// 覆盖24小时的有序、不重叠时段。
    pub segments: Vec<BasalSegment>,
}

impl NormalBasal {
    /// A flat 24-hour profile at the given rate.
    /// 给定速率的平坦24小时档案。
    pub fn flat(rate_u_per_hr: f32) -> Self {
        Self {
            segments: vec![BasalSegment {
                start_min: 0,
                end_min: 24 * 60,
                rate_u_per_hr,
            }],
        }
    }
}

/// A time-bounded override of the scheduled basal rate.
///
/// When a temp basal ends, whether stopped explicitly or by natural
/// expiry on-device, normal basal resumption is driven by the
/// device-reported state, never assumed client-side.
///
/// 对计划基础率的限时覆盖。
///
/// 临时基础率结束时（无论是显式停止还是设备上自然到期），
/// 普通基础率的恢复由设备报告的状态驱动，绝不在客户端假定。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TempBasal {
    /// Override rate in dose units per hour.
    /// 覆盖速率，单位为剂量单位/小时。
    pub rate_u_per_hr: f32,
    /// Override duration in minutes.
    /// 覆盖时长，单位为分钟。
    pub duration_min: u16,
}

/// The duration of the extended part of a combo bolus.
/// 双波大剂量延长部分的时长。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BolusExDuration {
    /// Minutes over which the extended dose is spread.
    /// 延长剂量铺开的分钟数。
    Minutes(u16),
}

impl BolusExDuration {
    /// The duration in minutes.
    /// 以分钟计的时长。
    pub fn minutes(&self) -> u16 {
        match self {
            BolusExDuration::Minutes(m) => *m,
        }
    }
}

/// One in-flight bolus injection.
/// 一次在途的大剂量注射。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BolusInjection {
    /// Programmed dose in units.
    /// 设定剂量，单位为剂量单位。
    pub dose_u: f32,
    /// Units the device reported as injected so far.
    /// 设备报告的已注射剂量。
    pub injected_u: f32,
}

impl BolusInjection {
    /// A freshly programmed injection with nothing delivered yet.
    /// 刚设定、尚未输注的注射。
    pub fn programmed(dose_u: f32) -> Self {
        Self {
            dose_u,
            injected_u: 0.0,
        }
    }
}

/// The in-flight bolus pair: an immediate part and an extended part.
/// Cleared whenever the device reports an idle delivery state.
///
/// 在途大剂量对：即时部分与延长部分。
/// 每当设备报告空闲输注状态时清除。
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BolusCurrent {
    /// The immediate injection, if one is running.
    /// 正在进行的即时注射（若有）。
    pub now: Option<BolusInjection>,
    /// The extended injection, if one is running.
    /// 正在进行的延长注射（若有）。
    pub extended: Option<BolusInjection>,
}

impl BolusCurrent {
    /// Whether any bolus is in flight.
    /// 是否有任何大剂量在途。
    pub fn is_active(&self) -> bool {
        self.now.is_some() || self.extended.is_some()
    }
}
