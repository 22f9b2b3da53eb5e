//! 连接监视器：把传输层的原始链路事件归一化为连接状态信号。
//! The connection monitor: normalizes the transport's raw link events
//! into the connection-state signal.
//!
//! 该模块将原始链路事件去重后转换为 [`ConnectionState`]，在进入
//! `Connecting` 时驱动有界的进度计数器，并在每次 `Connected` /
//! `Disconnected` 转换时按固定顺序扇出一组通知。
//!
//! This module de-duplicates raw link events into [`ConnectionState`],
//! drives the bounded progress counter while `Connecting`, and fans out
//! a fixed-order notification group on every `Connected`/`Disconnected`
//! transition.

use crate::config::LinkConfig;
use crate::error::{Error, Result};
use crate::event::Notification;
use crate::transport::{LinkEvent, LinkState, PatchTransport};
use crate::types::ConnectionState;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

/// A handle to the spawned connection monitor task.
///
/// Dropping the handle does not stop the task; the composition root
/// keeps it for the process lifetime and joins it to observe a fatal
/// fault escalation.
///
/// 已生成的连接监视任务的句柄。
///
/// 丢弃句柄不会停止任务；组合根在进程生命周期内持有它，并通过
/// join 观察致命故障的上报。
#[derive(Debug)]
pub struct ConnectionMonitor {
    state_rx: watch::Receiver<ConnectionState>,
    handle: JoinHandle<Result<()>>,
}

impl ConnectionMonitor {
    /// Spawns the monitor over the transport's link event stream.
    /// 在传输层链路事件流之上生成监视器。
    pub fn spawn<T: PatchTransport>(
        transport: &Arc<T>,
        notify_tx: broadcast::Sender<Notification>,
        config: LinkConfig,
    ) -> Self {
        let initial = match transport.link_state() {
            LinkState::Connected => ConnectionState::Connected,
            // 监视器启动时尚未见到任何事件；`Connecting` 的秒数从
            // 第一个观察到的事件开始计数
            LinkState::Connecting | LinkState::Disconnected => ConnectionState::Disconnected,
        };
        let (state_tx, state_rx) = watch::channel(initial);

        let task = MonitorTask {
            events: transport.subscribe_link(),
            state_tx,
            notify_tx,
            config,
            last: None,
            progress: None,
        };
        let handle = tokio::spawn(task.run());

        Self { state_rx, handle }
    }

    /// The current normalized connection state.
    /// 当前归一化的连接状态。
    pub fn connection_state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Observes connection-state changes. A late subscriber sees only
    /// the latest value.
    /// 观察连接状态变化。晚到的订阅者只能看到最新值。
    pub fn observe(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// Waits for the monitor to finish. Returns `Err(Error::Fatal)`
    /// when the monitor escalated a link-layer delivery defect.
    ///
    /// 等待监视器结束。监视器上报链路层投递缺陷时返回
    /// `Err(Error::Fatal)`。
    pub async fn join(self) -> Result<()> {
        match self.handle.await {
            Ok(result) => result,
            Err(join_err) => Err(Error::Fatal(format!("connection monitor died: {join_err}"))),
        }
    }
}

/// 监视器任务本体。
/// The monitor task itself.
struct MonitorTask {
    events: broadcast::Receiver<LinkEvent>,
    state_tx: watch::Sender<ConnectionState>,
    notify_tx: broadcast::Sender<Notification>,
    config: LinkConfig,
    /// The last raw state seen, for coalescing identical neighbors.
    /// 最近看到的原始状态，用于合并相同的相邻状态。
    last: Option<LinkState>,
    /// The in-flight progress counter, if the link is `Connecting`.
    /// 链路处于 `Connecting` 时的在途进度计数器。
    progress: Option<JoinHandle<()>>,
}

impl MonitorTask {
    async fn run(mut self) -> Result<()> {
        loop {
            match self.events.recv().await {
                Ok(LinkEvent::State(raw)) => self.on_state(raw),
                Ok(LinkEvent::Fault(fault)) if fault.is_defect() => {
                    // 投递缺陷意味着错误报告机制本身已损坏
                    self.stop_progress();
                    return Err(Error::Fatal(format!(
                        "link error delivery defect: {fault}"
                    )));
                }
                Ok(LinkEvent::Fault(fault)) => {
                    // 普通拆链噪声：记录并丢弃
                    trace!(%fault, "Dropping link teardown noise");
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "Connection monitor lagged behind link events");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Link event stream closed; connection monitor exiting");
                    self.stop_progress();
                    return Ok(());
                }
            }
        }
    }

    /// 处理一次原始状态转换。
    /// Handles one raw state transition.
    fn on_state(&mut self, raw: LinkState) {
        if self.last == Some(raw) {
            // 相同的连续状态最多产生一次通知
            trace!(?raw, "Coalescing repeated link state");
            return;
        }
        self.last = Some(raw);

        // 任何转换都立即取消在途的进度计数器；中止后不会再有
        // 进度事件被观察到
        self.stop_progress();

        match raw {
            LinkState::Disconnected => {
                self.state_tx.send_replace(ConnectionState::Disconnected);
                self.notify_transition(ConnectionState::Disconnected);
            }
            LinkState::Connected => {
                self.state_tx.send_replace(ConnectionState::Connected);
                self.notify_transition(ConnectionState::Connected);
            }
            LinkState::Connecting => {
                self.state_tx
                    .send_replace(ConnectionState::Connecting { elapsed_secs: 0 });
                self.progress = Some(tokio::spawn(progress_counter(
                    self.state_tx.clone(),
                    self.notify_tx.clone(),
                    self.config.clone(),
                )));
            }
        }
    }

    /// Emits the fixed notification group for a terminal transition:
    /// status-changed, refresh-overview, custom-actions-changed, in
    /// that order, exactly once.
    ///
    /// 为终态转换发出固定的通知组：状态变化、概览刷新、自定义操作
    /// 变化，按此顺序，恰好一次。
    fn notify_transition(&self, state: ConnectionState) {
        debug!(?state, "Patch connection state changed");
        let _ = self.notify_tx.send(Notification::StatusChanged(state));
        let _ = self.notify_tx.send(Notification::RefreshOverview {
            reason: format!("patch connection state: {state:?}"),
        });
        let _ = self.notify_tx.send(Notification::CustomActionsChanged);
    }

    /// 确定性地拆除进度计数器。
    /// Tears down the progress counter deterministically.
    fn stop_progress(&mut self) {
        if let Some(handle) = self.progress.take() {
            handle.abort();
        }
    }
}

/// The `Connecting` progress counter: one tick per interval starting at
/// zero, capped at `connecting_tick_cap`. The owning monitor aborts it
/// the instant the link leaves `Connecting`, whichever comes first.
///
/// `Connecting` 进度计数器：每个间隔一个滴答，从零开始，以
/// `connecting_tick_cap` 为上限。链路一离开 `Connecting`，持有它的
/// 监视器立即将其中止，两者以先到者为准。
async fn progress_counter(
    state_tx: watch::Sender<ConnectionState>,
    notify_tx: broadcast::Sender<Notification>,
    config: LinkConfig,
) {
    let mut ticker = tokio::time::interval(config.connecting_tick_interval);
    let mut elapsed: u32 = 0;
    loop {
        // 第一个滴答立即到来：滴答0在进入Connecting的那一刻发出
        ticker.tick().await;
        let state = ConnectionState::Connecting {
            elapsed_secs: elapsed,
        };
        state_tx.send_replace(state);
        let _ = notify_tx.send(Notification::StatusChanged(state));

        if elapsed >= config.connecting_tick_cap {
            debug!(
                cap = config.connecting_tick_cap,
                "Connecting progress counter reached its cap; halting"
            );
            return;
        }
        elapsed += 1;
    }
}
