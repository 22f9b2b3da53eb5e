//! 定义控制器可下发的所有设备操作码。
//! Defines all device opcodes the controller can issue.

use std::fmt;

/// The opcode of a device command. The first byte of every command the
/// transport carries to the patch.
/// 设备命令的操作码，传输层送往贴片的每条命令的第一个字节。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    /// Establish a bond with a scanned patch.
    /// 与扫描到的贴片建立绑定。
    Bond = 0x01,
    /// Read patch identity and firmware info.
    /// 读取贴片标识与固件信息。
    PatchInfo = 0x02,
    /// Run the on-device self test.
    /// 运行设备自检。
    SelfTest = 0x03,
    /// Read the on-device temperature.
    /// 读取设备温度。
    Temperature = 0x04,
    /// Start reservoir priming.
    /// 开始储药器排气。
    StartPriming = 0x05,
    /// Check the needle insertion sensor.
    /// 检查针头植入传感器。
    NeedleSensing = 0x06,
    /// Final activation handshake.
    /// 最终激活握手。
    Activate = 0x07,
    /// Program and start the normal basal schedule.
    /// 设定并启动普通基础率计划。
    BasalStart = 0x10,
    /// Resume a paused basal.
    /// 恢复暂停的基础率。
    BasalResume = 0x11,
    /// Pause basal delivery.
    /// 暂停基础率输注。
    BasalPause = 0x12,
    /// Start a temp basal override.
    /// 启动临时基础率覆盖。
    TempBasalStart = 0x13,
    /// Stop the running temp basal.
    /// 停止进行中的临时基础率。
    TempBasalStop = 0x14,
    /// Start a bolus (immediate and/or extended part).
    /// 启动大剂量（即时和/或延长部分）。
    BolusStart = 0x20,
    /// Stop the immediate bolus.
    /// 停止即时大剂量。
    BolusStopNow = 0x21,
    /// Stop the extended bolus.
    /// 停止延长大剂量。
    BolusStopExt = 0x22,
    /// Stop both parts of a combo bolus.
    /// 停止双波大剂量的两个部分。
    BolusStopCombo = 0x23,
    /// Deactivation handshake.
    /// 去激活握手。
    Deactivate = 0x30,
    /// Silence the buzzer.
    /// 静音蜂鸣器。
    BuzzerStop = 0x31,
    /// Enable or disable the info-reminder buzzer.
    /// 启用或禁用信息提醒蜂鸣。
    InfoReminderSet = 0x32,
    /// Program the low-reservoir and expiration alerts.
    /// 设定低储药量与过期报警。
    LowReservoirSet = 0x33,
    /// Silence the beep of a specific alarm code.
    /// 静音特定报警代码的提示音。
    AlarmBeepStop = 0x34,
    /// Read the device-reported state snapshot.
    /// 读取设备报告的状态快照。
    StateRead = 0x40,
}

impl Opcode {
    /// 从一个字节尝试转换成 `Opcode`。
    /// Tries to convert a byte into an `Opcode`.
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Opcode::Bond),
            0x02 => Some(Opcode::PatchInfo),
            0x03 => Some(Opcode::SelfTest),
            0x04 => Some(Opcode::Temperature),
            0x05 => Some(Opcode::StartPriming),
            0x06 => Some(Opcode::NeedleSensing),
            0x07 => Some(Opcode::Activate),
            0x10 => Some(Opcode::BasalStart),
            0x11 => Some(Opcode::BasalResume),
            0x12 => Some(Opcode::BasalPause),
            0x13 => Some(Opcode::TempBasalStart),
            0x14 => Some(Opcode::TempBasalStop),
            0x20 => Some(Opcode::BolusStart),
            0x21 => Some(Opcode::BolusStopNow),
            0x22 => Some(Opcode::BolusStopExt),
            0x23 => Some(Opcode::BolusStopCombo),
            0x30 => Some(Opcode::Deactivate),
            0x31 => Some(Opcode::BuzzerStop),
            0x32 => Some(Opcode::InfoReminderSet),
            0x33 => Some(Opcode::LowReservoirSet),
            0x34 => Some(Opcode::AlarmBeepStop),
            0x40 => Some(Opcode::StateRead),
            _ => None,
        }
    }

    /// Whether the command affects insulin delivery. A timed-out dosing
    /// command is never retried automatically anywhere in this crate.
    ///
    /// 该命令是否影响胰岛素输注。超时的给药命令在本库任何地方都
    /// 不会被自动重试。
    pub fn is_dosing(&self) -> bool {
        matches!(
            self,
            Opcode::BasalStart
                | Opcode::BasalResume
                | Opcode::BasalPause
                | Opcode::TempBasalStart
                | Opcode::TempBasalStop
                | Opcode::BolusStart
                | Opcode::BolusStopNow
                | Opcode::BolusStopExt
                | Opcode::BolusStopCombo
        )
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}
