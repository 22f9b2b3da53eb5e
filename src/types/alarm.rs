//! 报警代码与当前发生中的报警集合。
//! Alarm codes and the set of currently occurring alarms.

use dashmap::DashMap;

/// A device alarm code.
///
/// 设备报警代码。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlarmCode {
    /// Activation blocked: needle sensing failed.
    /// 激活受阻：针头感应失败。
    A005,
    /// Activation blocked: priming incomplete.
    /// 激活受阻：排气未完成。
    A020,
    /// Low reservoir.
    /// 储药量低。
    A016,
    /// Patch expired.
    /// 贴片已过期。
    A003,
    /// Occlusion detected.
    /// 检测到堵塞。
    A044,
}

impl AlarmCode {
    /// Whether this alarm blocks the activation sequence. While a
    /// blocking alarm is occurring the coordinator suppresses the
    /// "activation incomplete" reminder.
    ///
    /// 该报警是否阻塞激活序列。阻塞报警发生期间，协调器抑制
    /// “激活未完成”提醒。
    pub fn blocks_activation(&self) -> bool {
        matches!(self, AlarmCode::A005 | AlarmCode::A020)
    }

    /// The numeric code the device protocol uses for this alarm.
    /// 设备协议为该报警使用的数字代码。
    pub fn wire_code(&self) -> u8 {
        match self {
            AlarmCode::A003 => 3,
            AlarmCode::A005 => 5,
            AlarmCode::A016 => 16,
            AlarmCode::A020 => 20,
            AlarmCode::A044 => 44,
        }
    }
}

/// The set of currently occurring alarms.
///
/// Written into by the alarm layer outside this core; the coordinator
/// only queries it. Concurrent readers and the writer never block each
/// other.
///
/// 当前发生中的报警集合。
///
/// 由本核心之外的报警层写入；协调器只查询。并发的读者与写入者
/// 互不阻塞。
#[derive(Debug, Default)]
pub struct AlarmSet {
    occurring: DashMap<AlarmCode, ()>,
}

impl AlarmSet {
    /// An empty alarm set.
    /// 空的报警集合。
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the alarm as occurring.
    /// 标记报警为发生中。
    pub fn raise(&self, code: AlarmCode) {
        self.occurring.insert(code, ());
    }

    /// Clears the alarm.
    /// 清除报警。
    pub fn clear(&self, code: AlarmCode) {
        self.occurring.remove(&code);
    }

    /// Whether the alarm is currently occurring.
    /// 该报警当前是否发生中。
    pub fn is_occurring(&self, code: AlarmCode) -> bool {
        self.occurring.contains_key(&code)
    }

    /// Whether any activation-blocking alarm is occurring.
    /// 是否有任何阻塞激活的报警发生中。
    pub fn any_blocking_activation(&self) -> bool {
        self.occurring.iter().any(|e| e.key().blocks_activation())
    }
}
