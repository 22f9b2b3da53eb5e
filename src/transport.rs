//! Traits for abstracting over the physical patch transport.
//! 用于抽象贴片物理传输层的 trait。
//!
//! The radio stack (pairing, encryption, framing) lives behind
//! [`PatchTransport`]: the core only ever sees link-state events and
//! opaque command/response pairs.
//!
//! 无线电栈（配对、加密、成帧）位于 [`PatchTransport`] 之后：
//! 核心只会看到链路状态事件与不透明的命令/响应对。

use crate::error::Result;
use crate::protocol::{Opcode, RawResponse};
use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;
use std::time::Duration;
use tokio::sync::broadcast;

/// The raw link state as the transport reports it, without the
/// elapsed-seconds decoration the monitor adds.
/// 传输层报告的原始链路状态，不含监视器附加的秒数装饰。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// The link is down.
    /// 链路已断开。
    Disconnected,
    /// The link is being established.
    /// 链路建立中。
    Connecting,
    /// The link is up.
    /// 链路已建立。
    Connected,
}

/// An asynchronous link-layer error reported outside the normal state
/// stream.
///
/// Ordinary teardown noise must never crash the process; a delivery
/// defect indicates the error-reporting machinery itself is broken and
/// is fatal.
///
/// 在正常状态流之外报告的异步链路层错误。
///
/// 普通的拆链噪声绝不能使进程崩溃；投递缺陷表明错误报告机制本身
/// 已损坏，属于致命错误。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkFault {
    /// Noise tied to ordinary transport teardown. Logged and dropped.
    /// 与普通传输拆链相关的噪声。记录后丢弃。
    Teardown,
    /// A response arrived but its payload could not be decoded. The
    /// link is considered lost for the affected command.
    /// 响应已到达但载荷无法解码。对受影响的命令而言链路视为丢失。
    Malformed(String),
    /// A programming defect in error delivery. Escalated as fatal.
    /// 错误投递中的编程缺陷。作为致命错误上报。
    Defect(String),
}

impl LinkFault {
    /// Whether this fault must be escalated to the fault boundary.
    /// 该故障是否必须上报到故障边界。
    pub fn is_defect(&self) -> bool {
        matches!(self, LinkFault::Defect(_))
    }
}

impl fmt::Display for LinkFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkFault::Teardown => write!(f, "link teardown"),
            LinkFault::Malformed(msg) => write!(f, "malformed response: {msg}"),
            LinkFault::Defect(msg) => write!(f, "error delivery defect: {msg}"),
        }
    }
}

/// An event on the transport's link stream: either a state transition
/// or an asynchronous fault.
/// 传输层链路流上的事件：状态转换或异步故障。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// The raw link state changed.
    /// 原始链路状态发生变化。
    State(LinkState),
    /// An asynchronous link-layer error was reported.
    /// 报告了一个异步链路层错误。
    Fault(LinkFault),
}

/// A patch discovered by a scan.
/// 扫描发现的贴片。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredDevice {
    /// The device address (MAC-equivalent).
    /// 设备地址（等价于MAC）。
    pub address: String,
    /// The advertised name, if any.
    /// 广播的名称（若有）。
    pub name: Option<String>,
    /// Received signal strength in dBm.
    /// 接收信号强度，单位dBm。
    pub rssi: i16,
}

/// The transport capability the core is built against.
///
/// The connection handle behind an implementation is exclusively owned
/// by the command dispatcher; subscribers of the link stream may
/// observe but never mutate it.
///
/// 核心所依赖的传输能力。
///
/// 实现背后的连接句柄由命令派发器独占持有；链路流的订阅者只能
/// 观察，不能修改。
#[async_trait]
pub trait PatchTransport: Send + Sync + 'static {
    /// Subscribes to the raw link event stream. Every subscriber sees
    /// events in the order the transport emitted them.
    /// 订阅原始链路事件流。每个订阅者都按传输层发出的顺序看到事件。
    fn subscribe_link(&self) -> broadcast::Receiver<LinkEvent>;

    /// The current raw link state, for polling reads.
    /// 当前原始链路状态，用于轮询读取。
    fn link_state(&self) -> LinkState;

    /// Sends one command to the patch and resolves with its raw
    /// response. The dispatcher owns the deadline; an implementation
    /// pending forever under a lost link is acceptable.
    ///
    /// 向贴片发送一条命令并以其原始响应完成。截止时间由派发器
    /// 持有；链路丢失时实现永久挂起是可接受的。
    async fn send_command(&self, opcode: Opcode, payload: Bytes) -> Result<RawResponse>;

    /// Scans for nearby patches until the timeout elapses.
    /// 扫描附近的贴片直至超时。
    async fn scan(&self, timeout: Duration) -> Result<Vec<DiscoveredDevice>>;

    /// Updates (or with `None` clears) the remembered device address
    /// the transport auto-connects to.
    /// 更新（`None` 则清除）传输层自动连接所记忆的设备地址。
    async fn update_address(&self, address: Option<&str>) -> Result<()>;
}
