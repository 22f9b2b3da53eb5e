//! 贴片的持久化配置快照。
//! The persisted configuration snapshot of the patch.

use serde::{Deserialize, Serialize};

/// Hours a patch delivers before it expires.
/// 贴片从激活到过期的输注小时数。
pub const PATCH_LIFE_HOURS: u64 = 84;

/// The patch configuration owned exclusively by the lifecycle store.
///
/// Mutated only through coordinator-mediated setting changes that first
/// attempt device-side confirmation when the patch is reachable. Reset
/// to defaults on confirmed deactivation.
///
/// 由生命周期存储独占持有的贴片配置。
///
/// 仅通过协调器中介的设置变更进行修改；贴片可达时先尝试设备侧确认。
/// 在确认去激活后重置为默认值。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatchConfig {
    /// The remembered device address (MAC-equivalent). Empty between
    /// pairings and while a scan is running.
    /// 记忆的设备地址（等价于MAC）。配对之间以及扫描期间为空。
    pub address: Option<String>,
    /// The device serial, learnt from the patch-info read.
    /// 从贴片信息读取获知的设备序列号。
    pub serial: Option<String>,
    /// Activation timestamp, epoch milliseconds.
    /// 激活时间戳，纪元毫秒。
    pub activated_at_ms: Option<u64>,
    /// Expiry timestamp, epoch milliseconds.
    /// 过期时间戳，纪元毫秒。
    pub expires_at_ms: Option<u64>,
    /// Buzzer (info-reminder) enabled on the device.
    /// 设备上的蜂鸣（信息提醒）是否启用。
    pub info_reminder: bool,
    /// Low-reservoir alert threshold in dose units.
    /// 低储药量报警阈值，单位为剂量单位。
    pub low_reservoir_alert_units: u16,
    /// Expiration alert lead time in hours.
    /// 过期报警提前量，单位为小时。
    pub expire_alert_hours: u16,
}

impl PatchConfig {
    /// Whether an address is remembered from a previous pairing.
    /// 是否记忆着上次配对的地址。
    pub fn has_address(&self) -> bool {
        self.address.as_deref().is_some_and(|a| !a.is_empty())
    }

    /// Forgets the remembered device address.
    /// 忘记记忆的设备地址。
    pub fn clear_address(&mut self) {
        self.address = None;
    }
}
