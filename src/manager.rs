//! The composition root: one context value wiring store, dispatcher,
//! transport, alarms and the connection monitor together.
//! 组合根：一个上下文值，把存储、派发器、传输、报警与连接监视器
//! 接在一起。
//!
//! 原实现中的全局单例协调器在这里成为显式的上下文结构体：
//! 在启动时构造一次，所有需要它的操作通过引用获得它，没有环境级
//! 的全局可变状态。
//!
//! The original's global singleton coordinator becomes an explicit
//! context struct here: constructed once at startup, handed by
//! reference to every operation that needs it, with no ambient global
//! mutable state.

use crate::config::{Config, ReconcileConfig};
use crate::dispatcher::CommandDispatcher;
use crate::error::{Error, Result};
use crate::event::Notification;
use crate::link::ConnectionMonitor;
use crate::store::{LifecycleStore, SnapshotStore};
use crate::transport::{DiscoveredDevice, PatchTransport};
use crate::types::lifecycle::ActivationStep;
use crate::types::{
    AlarmSet, BolusCurrent, ConnectionState, LifecycleEvent, LifecyclePhase, NormalBasal,
    PatchConfig, PatchState, TempBasal,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, info, warn};

/// The patch manager: the caller-facing surface of the controller and
/// the coordinator of cross-cutting policy (reconnect observation,
/// stalled-activation detection, deferred setting reconciliation).
///
/// 贴片管理器：控制器面向调用者的表面，以及横切策略的协调者
/// （重连观察、激活停滞检测、延迟设置对账）。
pub struct PatchManager<T: PatchTransport> {
    transport: Arc<T>,
    store: Arc<LifecycleStore>,
    dispatcher: Arc<CommandDispatcher<T>>,
    alarms: Arc<AlarmSet>,
    notify_tx: broadcast::Sender<Notification>,
    monitor: ConnectionMonitor,
    reconcile: ReconcileConfig,
}

impl<T: PatchTransport> std::fmt::Debug for PatchManager<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatchManager")
            .field("phase", &self.store.phase())
            .finish_non_exhaustive()
    }
}

impl<T: PatchTransport> PatchManager<T> {
    /// Builds the controller over a transport and a persistence
    /// collaborator, loading the persisted snapshot and spawning the
    /// connection monitor. A snapshot that cannot be loaded is
    /// `Error::Fatal`.
    ///
    /// 在传输层与持久化协作者之上构建控制器，加载持久化快照并生成
    /// 连接监视器。无法加载的快照为 `Error::Fatal`。
    pub fn new(
        transport: Arc<T>,
        snapshots: Arc<dyn SnapshotStore>,
        config: Config,
    ) -> Result<Self> {
        let store = Arc::new(LifecycleStore::open(snapshots)?);
        let dispatcher = Arc::new(CommandDispatcher::new(
            transport.clone(),
            store.clone(),
            config.command.clone(),
        ));
        let (notify_tx, _) = broadcast::channel(config.link.notification_channel_capacity);
        let monitor = ConnectionMonitor::spawn(&transport, notify_tx.clone(), config.link.clone());

        info!(phase = ?store.phase(), "Patch manager constructed");

        Ok(Self {
            transport,
            store,
            dispatcher,
            alarms: Arc::new(AlarmSet::new()),
            notify_tx,
            monitor,
            reconcile: config.reconcile,
        })
    }

    /// Post-construction initialization: re-arm the remembered device
    /// address so the transport auto-connects, and seed the basal
    /// schedule from the caller's profile when none was persisted.
    ///
    /// 构造后的初始化：重新装载记忆的设备地址以便传输层自动连接，
    /// 并在没有持久化档案时用调用者的配置播种基础率计划。
    pub async fn init(&self, fallback_basal: NormalBasal) -> Result<()> {
        let config = self.store.config();
        if config.has_address() {
            self.transport
                .update_address(config.address.as_deref())
                .await?;
        }
        if self.store.normal_basal().is_none() {
            self.store.set_normal_basal(fallback_basal);
            self.store.flush()?;
        }
        Ok(())
    }

    // ─── Facade accessors ───────────────────────────────────────────
    // ─── 门面访问器 ────────────────────────────────────────────────

    /// The current lifecycle phase.
    /// 当前生命周期阶段。
    pub fn lifecycle_phase(&self) -> LifecyclePhase {
        self.store.phase()
    }

    /// Observes lifecycle phase changes.
    /// 观察生命周期阶段变化。
    pub fn observe_lifecycle(&self) -> watch::Receiver<LifecyclePhase> {
        self.store.observe_phase()
    }

    /// Applies a typed lifecycle event on behalf of an external flow.
    /// 代表外部流程应用一个类型化生命周期事件。
    pub fn update_lifecycle(&self, event: LifecycleEvent) -> LifecyclePhase {
        self.store.apply_event(event)
    }

    /// The current patch configuration snapshot.
    /// 当前贴片配置快照。
    pub fn patch_config(&self) -> PatchConfig {
        self.store.config()
    }

    /// Observes configuration changes.
    /// 观察配置变化。
    pub fn observe_config(&self) -> watch::Receiver<PatchConfig> {
        self.store.observe_config()
    }

    /// Whether the patch is activated and delivering.
    /// 贴片是否已激活并在输注。
    pub fn is_activated(&self) -> bool {
        self.store.phase().is_activated()
    }

    /// The expiry timestamp, epoch milliseconds, if activated.
    /// 过期时间戳（纪元毫秒），若已激活。
    pub fn patch_expire_ms(&self) -> Option<u64> {
        self.store.config().expires_at_ms
    }

    /// The programmed normal basal profile, if any.
    /// 已设定的普通基础率档案（若有）。
    pub fn normal_basal(&self) -> Option<NormalBasal> {
        self.store.normal_basal()
    }

    /// The running temp basal override, if any.
    /// 进行中的临时基础率覆盖（若有）。
    pub fn temp_basal(&self) -> Option<TempBasal> {
        self.store.temp_basal()
    }

    /// The in-flight bolus pair.
    /// 在途大剂量对。
    pub fn bolus_current(&self) -> BolusCurrent {
        self.store.bolus_current()
    }

    /// Observes in-flight bolus changes.
    /// 观察在途大剂量变化。
    pub fn observe_bolus(&self) -> watch::Receiver<BolusCurrent> {
        self.store.observe_bolus()
    }

    /// The last device-reported state.
    /// 最近的设备报告状态。
    pub fn patch_state(&self) -> PatchState {
        self.store.patch_state()
    }

    /// Observes device-reported state updates.
    /// 观察设备报告状态的更新。
    pub fn observe_patch_state(&self) -> watch::Receiver<PatchState> {
        self.store.observe_patch_state()
    }

    /// The current normalized connection state.
    /// 当前归一化的连接状态。
    pub fn connection_state(&self) -> ConnectionState {
        self.monitor.connection_state()
    }

    /// Observes connection-state changes.
    /// 观察连接状态变化。
    pub fn observe_connection(&self) -> watch::Receiver<ConnectionState> {
        self.monitor.observe()
    }

    /// Subscribes to the fire-and-forget notification fan-out.
    /// 订阅即发即忘的通知扇出。
    pub fn subscribe_notifications(&self) -> broadcast::Receiver<Notification> {
        self.notify_tx.subscribe()
    }

    /// The alarm set the alarm layer reports into.
    /// 报警层写入的报警集合。
    pub fn alarms(&self) -> &AlarmSet {
        &self.alarms
    }

    /// The command dispatcher, for direct device operations.
    /// 命令派发器，用于直接的设备操作。
    pub fn commands(&self) -> &Arc<CommandDispatcher<T>> {
        &self.dispatcher
    }

    // ─── Coordinator policy ─────────────────────────────────────────
    // ─── 协调策略 ──────────────────────────────────────────────────

    /// Periodic stalled-activation check, invoked by an external
    /// scheduler. Emits `ActivationNotComplete` whenever an activation
    /// sub-step is in progress and no blocking alarm is occurring.
    /// Intentionally re-emits on every call while the condition
    /// persists; the notification consumer collapses duplicates.
    ///
    /// 由外部调度器调用的周期性激活停滞检查。只要有激活子步骤在
    /// 进行且没有阻塞报警发生，就发出 `ActivationNotComplete`。
    /// 条件持续期间每次调用都有意重发；由通知消费者折叠重复项。
    pub fn check_activation_process(&self) {
        if self.store.phase().is_sub_step_running() && !self.alarms.any_blocking_activation() {
            debug!("Activation sub-step stalled; notifying");
            let _ = self.notify_tx.send(Notification::ActivationNotComplete);
        }
    }

    /// Reconciles the buzzer (info-reminder) setting. When the local
    /// value already matches, nothing happens. When the patch is
    /// activated, the device command runs first and the local value is
    /// committed only on success; when it is not activated there is no
    /// device to confirm against, so the commit is immediate.
    ///
    /// 对账蜂鸣（信息提醒）设置。本地值已一致时不做任何事。贴片已
    /// 激活时先执行设备命令，仅在成功后提交本地值；未激活时没有
    /// 设备可供确认，立即提交。
    pub async fn change_buzzer_setting(&self, enabled: bool) -> Result<()> {
        if self.store.config().info_reminder == enabled {
            return Ok(());
        }
        if self.is_activated() {
            self.dispatcher.set_info_reminder(enabled).await?;
        }
        self.store.update_config(|c| c.info_reminder = enabled);
        self.store.flush()
    }

    /// Reconciles the low-reservoir and expiration alert settings, with
    /// the same activated/not-activated split as the buzzer setting.
    ///
    /// 对账低储药量与过期报警设置，激活/未激活的区分与蜂鸣设置
    /// 相同。
    pub async fn change_reminder_setting(&self, units: u16, hours: u16) -> Result<()> {
        let config = self.store.config();
        if config.low_reservoir_alert_units == units && config.expire_alert_hours == hours {
            return Ok(());
        }
        if self.is_activated() {
            self.dispatcher.set_low_reservoir(units, hours).await?;
        }
        self.store.update_config(|c| {
            c.low_reservoir_alert_units = units;
            c.expire_alert_hours = hours;
        });
        self.store.flush()
    }

    /// Starts reservoir priming and returns a progress stream of
    /// device-reported prime counts, fed by periodic state reads until
    /// the target count is reached or the deadline elapses. Reaching
    /// the target completes the `Priming` sub-step. A `Busy` state read
    /// skips its round; never a blind retry.
    ///
    /// 开始储药器排气并返回设备报告的排气计数进度流，由周期性状态
    /// 读取喂入，直到达到目标计数或截止时间。达到目标即完成
    /// `Priming` 子步骤。`Busy` 的状态读取跳过本轮，绝不盲目重试。
    pub async fn start_priming(
        &self,
        timeout: Duration,
        target_count: u16,
    ) -> Result<mpsc::Receiver<u16>> {
        self.dispatcher.start_priming(timeout, target_count).await?;

        let (tx, rx) = mpsc::channel(self.reconcile.priming_channel_capacity);
        let dispatcher = self.dispatcher.clone();
        let store = self.store.clone();
        let poll_interval = self.reconcile.priming_poll_interval;
        let in_priming_step =
            store.phase() == LifecyclePhase::Activating(ActivationStep::Priming);

        tokio::spawn(async move {
            let deadline = tokio::time::Instant::now() + timeout;
            loop {
                tokio::time::sleep(poll_interval).await;
                if tokio::time::Instant::now() >= deadline {
                    debug!("Priming progress deadline elapsed");
                    return;
                }
                match dispatcher.update_connection().await {
                    Ok(state) => {
                        if tx.send(state.prime_count).await.is_err() {
                            // 接收端已丢弃进度流
                            return;
                        }
                        if state.prime_count >= target_count {
                            if in_priming_step {
                                store.apply_event(LifecycleEvent::SubStepCompleted(
                                    ActivationStep::Priming,
                                ));
                                let _ = store.flush();
                            }
                            return;
                        }
                    }
                    Err(Error::Busy) => continue,
                    Err(e) => {
                        warn!(error = %e, "Priming progress poll failed");
                        return;
                    }
                }
            }
        });
        Ok(rx)
    }

    /// Scans for nearby patches. The remembered address is cleared
    /// before the scan starts.
    /// 扫描附近的贴片。扫描开始前清除记忆的地址。
    pub async fn scan(&self, timeout: Duration) -> Result<Vec<DiscoveredDevice>> {
        self.dispatcher.scan(timeout).await
    }

    /// Runs until the connection monitor exits, surfacing a fatal
    /// link-layer escalation to the process's fault boundary. The
    /// supervisor that awaits this is expected to halt dosing on `Err`.
    ///
    /// 运行直到连接监视器退出，把致命的链路层上报带到进程的故障
    /// 边界。等待它的监督者应在 `Err` 时停止给药。
    pub async fn supervise(self) -> Result<()> {
        self.monitor.join().await
    }
}
