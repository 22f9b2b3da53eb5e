//! 归一化的三态连接状态。
//! The normalized 3-state connection state.

/// The connection state derived purely from the live transport signal.
/// Transient, never persisted. Identical consecutive states are
/// coalesced by the connection monitor before anyone observes them.
///
/// 纯粹由实时传输信号推导出的连接状态。瞬态，从不持久化。
/// 相同的连续状态在任何人观察到之前就被连接监视器合并。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// The link is down.
    /// 链路已断开。
    Disconnected,
    /// The link is being established; the payload counts whole seconds
    /// since the attempt began.
    /// 链路建立中；载荷为自尝试开始以来的整秒数。
    Connecting {
        /// Seconds elapsed in this attempt.
        /// 本次尝试已经过的秒数。
        elapsed_secs: u32,
    },
    /// The link is up.
    /// 链路已建立。
    Connected,
}

impl ConnectionState {
    /// Whether the link is up.
    /// 链路是否已建立。
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    /// Whether two states are the same kind, ignoring the `Connecting`
    /// elapsed counter. This is the notion of "identical" used for
    /// de-duplication.
    ///
    /// 两个状态是否同类，忽略 `Connecting` 的秒数计数。
    /// 这是去重所用的“相同”概念。
    pub fn same_kind(&self, other: &ConnectionState) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}
