//! 定义设备响应的原始形式与各操作的类型化响应。
//! Defines the raw form of device responses and the typed responses of
//! each operation.

use crate::types::PatchState;
use bytes::{Buf, Bytes};

/// Status byte the device uses to acknowledge a command.
/// 设备用于确认命令的状态字节。
pub const STATUS_OK: u8 = 0x00;

/// A raw device response as produced by the transport: a status byte
/// followed by an opaque, operation-specific payload.
///
/// A non-zero status is an explicit negative acknowledgment and is
/// mapped to `Error::Rejected` before any typed decode is attempted.
///
/// 传输层产出的原始设备响应：一个状态字节，后随操作特定的不透明
/// 载荷。非零状态是明确的否定应答，在尝试任何类型化解码之前就被
/// 映射为 `Error::Rejected`。
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    /// Device status byte; `STATUS_OK` on success.
    /// 设备状态字节；成功时为 `STATUS_OK`。
    pub status: u8,
    /// Operation-specific payload.
    /// 操作特定的载荷。
    pub payload: Bytes,
}

impl RawResponse {
    /// A successful response carrying the given payload.
    /// 携带给定载荷的成功响应。
    pub fn ok(payload: Bytes) -> Self {
        Self {
            status: STATUS_OK,
            payload,
        }
    }

    /// A rejection with the given non-zero status.
    /// 带给定非零状态的拒绝响应。
    pub fn rejected(status: u8) -> Self {
        Self {
            status,
            payload: Bytes::new(),
        }
    }

    /// Whether the device acknowledged the command.
    /// 设备是否确认了命令。
    pub fn is_success(&self) -> bool {
        self.status == STATUS_OK
    }
}

/// A plain acknowledged / not-acknowledged response body.
/// 纯粹的已确认/未确认响应体。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BooleanResponse {
    /// The acknowledged flag from the payload.
    /// 载荷中的确认标志。
    pub acknowledged: bool,
}

impl BooleanResponse {
    /// 从载荷解码。
    /// Decodes from a payload.
    pub fn decode<B: Buf>(buf: &mut B) -> Option<Self> {
        if buf.remaining() < 1 {
            return None;
        }
        Some(Self {
            acknowledged: buf.get_u8() != 0,
        })
    }
}

/// The on-device temperature read.
/// 设备温度读取结果。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemperatureResponse {
    /// Temperature in tenths of a degree Celsius.
    /// 温度，单位为0.1摄氏度。
    pub deci_celsius: i16,
}

impl TemperatureResponse {
    /// 从载荷解码。
    /// Decodes from a payload.
    pub fn decode<B: Buf>(buf: &mut B) -> Option<Self> {
        if buf.remaining() < 2 {
            return None;
        }
        Some(Self {
            deci_celsius: buf.get_i16(),
        })
    }

    /// Temperature in whole degrees Celsius.
    /// 温度，单位为摄氏度。
    pub fn celsius(&self) -> f32 {
        f32::from(self.deci_celsius) / 10.0
    }
}

/// The outcome of the on-device self test.
/// 设备自检的结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelfTestResult {
    /// All checks passed.
    /// 所有检查通过。
    Passed,
    /// Battery below the activation floor.
    /// 电池低于激活下限。
    BatteryFailure,
    /// Reservoir pressure check failed.
    /// 储药器压力检查失败。
    ReservoirFailure,
    /// Internal sensor check failed.
    /// 内部传感器检查失败。
    SensorFailure,
}

impl SelfTestResult {
    /// 从载荷解码。
    /// Decodes from a payload.
    pub fn decode<B: Buf>(buf: &mut B) -> Option<Self> {
        if buf.remaining() < 1 {
            return None;
        }
        match buf.get_u8() {
            0x00 => Some(SelfTestResult::Passed),
            0x01 => Some(SelfTestResult::BatteryFailure),
            0x02 => Some(SelfTestResult::ReservoirFailure),
            0x03 => Some(SelfTestResult::SensorFailure),
            _ => None,
        }
    }

    /// Whether the patch may proceed with activation.
    /// 贴片是否可以继续激活。
    pub fn is_passed(&self) -> bool {
        matches!(self, SelfTestResult::Passed)
    }
}

/// Patch identity and firmware info.
/// 贴片标识与固件信息。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchInfo {
    /// Device serial string.
    /// 设备序列号字符串。
    pub serial: String,
    /// Hardware revision.
    /// 硬件版本。
    pub hw_rev: u8,
    /// Firmware revision.
    /// 固件版本。
    pub fw_rev: u8,
}

impl PatchInfo {
    /// 从载荷解码：版本两字节，序列号为长度前缀的ASCII。
    /// Decodes from a payload: two revision bytes, then a
    /// length-prefixed ASCII serial.
    pub fn decode<B: Buf>(buf: &mut B) -> Option<Self> {
        if buf.remaining() < 3 {
            return None;
        }
        let hw_rev = buf.get_u8();
        let fw_rev = buf.get_u8();
        let len = buf.get_u8() as usize;
        if buf.remaining() < len {
            return None;
        }
        let mut raw = vec![0u8; len];
        buf.copy_to_slice(&mut raw);
        let serial = String::from_utf8(raw).ok()?;
        Some(Self {
            serial,
            hw_rev,
            fw_rev,
        })
    }
}

/// Response to programming the normal basal schedule.
/// 设定普通基础率计划的响应。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BasalScheduleSetResponse {
    /// The schedule is programmed and delivery is running.
    /// 计划已设定且输注已运行。
    pub delivering: bool,
}

impl BasalScheduleSetResponse {
    /// 从载荷解码。
    /// Decodes from a payload.
    pub fn decode<B: Buf>(buf: &mut B) -> Option<Self> {
        if buf.remaining() < 1 {
            return None;
        }
        Some(Self {
            delivering: buf.get_u8() != 0,
        })
    }
}

/// Response to starting a temp basal override.
/// 启动临时基础率覆盖的响应。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TempBasalScheduleSetResponse {
    /// The override is active on-device.
    /// 覆盖已在设备上生效。
    pub active: bool,
    /// Minutes of override remaining as the device counts them.
    /// 设备计数的覆盖剩余分钟数。
    pub remaining_min: u16,
}

impl TempBasalScheduleSetResponse {
    /// 从载荷解码。
    /// Decodes from a payload.
    pub fn decode<B: Buf>(buf: &mut B) -> Option<Self> {
        if buf.remaining() < 3 {
            return None;
        }
        Some(Self {
            active: buf.get_u8() != 0,
            remaining_min: buf.get_u16(),
        })
    }
}

/// Response to starting a bolus.
/// 启动大剂量的响应。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BolusResponse {
    /// The immediate part started.
    /// 即时部分已开始。
    pub now_started: bool,
    /// The extended part started.
    /// 延长部分已开始。
    pub ext_started: bool,
}

impl BolusResponse {
    /// 从载荷解码。
    /// Decodes from a payload.
    pub fn decode<B: Buf>(buf: &mut B) -> Option<Self> {
        if buf.remaining() < 2 {
            return None;
        }
        Some(Self {
            now_started: buf.get_u8() != 0,
            ext_started: buf.get_u8() != 0,
        })
    }
}

/// Response to stopping a single bolus part. The injected amount is the
/// device's count, the only authoritative record of what was delivered.
///
/// 停止单个大剂量部分的响应。已注射量为设备的计数，是已输注量的
/// 唯一权威记录。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BolusStopResponse {
    /// Units injected before the stop, in hundredths of a unit.
    /// 停止前已注射量，单位为0.01剂量单位。
    pub injected_centi_u: u16,
}

impl BolusStopResponse {
    /// 从载荷解码。
    /// Decodes from a payload.
    pub fn decode<B: Buf>(buf: &mut B) -> Option<Self> {
        if buf.remaining() < 2 {
            return None;
        }
        Some(Self {
            injected_centi_u: buf.get_u16(),
        })
    }

    /// Injected units.
    /// 已注射剂量单位。
    pub fn injected_u(&self) -> f32 {
        f32::from(self.injected_centi_u) / 100.0
    }
}

/// Response to stopping both parts of a combo bolus.
/// 停止双波大剂量两个部分的响应。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComboBolusStopResponse {
    /// Immediate part injected before the stop, hundredths of a unit.
    /// 停止前即时部分已注射量，单位为0.01剂量单位。
    pub now_injected_centi_u: u16,
    /// Extended part injected before the stop, hundredths of a unit.
    /// 停止前延长部分已注射量，单位为0.01剂量单位。
    pub ext_injected_centi_u: u16,
}

impl ComboBolusStopResponse {
    /// 从载荷解码。
    /// Decodes from a payload.
    pub fn decode<B: Buf>(buf: &mut B) -> Option<Self> {
        if buf.remaining() < 4 {
            return None;
        }
        Some(Self {
            now_injected_centi_u: buf.get_u16(),
            ext_injected_centi_u: buf.get_u16(),
        })
    }
}

/// The outcome of a deactivation request. Produced by the dispatcher:
/// `Confirmed` when the device acknowledged the handshake, `Forced`
/// when the caller forced lifecycle advancement without confirmation
/// (physical removal without a final handshake).
///
/// 去激活请求的结果。由派发器产出：设备确认握手时为 `Confirmed`；
/// 调用者在无确认的情况下强制推进生命周期时为 `Forced`
/// （物理移除而没有最终握手）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeactivationStatus {
    /// The device confirmed deactivation.
    /// 设备确认了去激活。
    Confirmed,
    /// Lifecycle was advanced without device confirmation.
    /// 在无设备确认的情况下推进了生命周期。
    Forced,
}

/// 从载荷解码设备报告的状态快照。
/// Decodes the device-reported state snapshot from a payload.
pub fn decode_patch_state<B: Buf>(buf: &mut B) -> Option<PatchState> {
    if buf.remaining() < 7 {
        return None;
    }
    let flags = buf.get_u8();
    Some(PatchState {
        normal_basal_active: flags & 0x01 != 0,
        temp_basal_active: flags & 0x02 != 0,
        now_bolus_active: flags & 0x04 != 0,
        ext_bolus_active: flags & 0x08 != 0,
        prime_count: buf.get_u16(),
        remaining_units: buf.get_f32(),
    })
}
