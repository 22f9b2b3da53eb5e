//! The command dispatcher: one entry point per device operation.
//! 命令派发器：每个设备操作一个入口。
//!
//! 派发器把类型化的命令请求映射到设备操作上：校验生命周期前置
//! 条件，持有每设备最多一条在途命令的闸门，施加截止时间，并把
//! 原始响应映射为类型化结果。
//!
//! The dispatcher maps typed command requests onto device operations:
//! it validates lifecycle preconditions, holds the at-most-one
//! in-flight-command gate per device, applies deadlines, and maps raw
//! responses to typed results.

use crate::config::CommandConfig;
use crate::error::{Error, Result};
use crate::protocol::response;
use crate::protocol::{
    BasalScheduleSetResponse, BolusResponse, BolusStopResponse, BooleanResponse,
    ComboBolusStopResponse, DeactivationStatus, Opcode, PatchInfo, RawResponse, SelfTestResult,
    TempBasalScheduleSetResponse, TemperatureResponse,
};
use crate::store::LifecycleStore;
use crate::store::validation::PhaseValidator;
use crate::transport::{DiscoveredDevice, LinkFault, PatchTransport};
use crate::types::lifecycle::{ActivationStep, LifecycleEvent, LifecyclePhase};
use crate::types::patch_config::PATCH_LIFE_HOURS;
use crate::types::{AlarmCode, BolusExDuration, BolusInjection, NormalBasal, PatchState, TempBasal};
use bytes::{BufMut, Bytes, BytesMut};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, trace, warn};

/// 纪元毫秒形式的当前时间。
/// The current time as epoch milliseconds.
fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// The command dispatcher. Exclusively owns the transport connection
/// handle; everything else reaches the device through it.
///
/// 命令派发器。独占持有传输连接句柄；其余一切都通过它抵达设备。
pub struct CommandDispatcher<T: PatchTransport> {
    transport: Arc<T>,
    store: Arc<LifecycleStore>,
    /// The in-flight gate. A second command while one is outstanding is
    /// rejected with `Busy`, never queued: concurrent commands over the
    /// same link produce undefined device behavior.
    ///
    /// 在途闸门。有命令未完成时的第二条命令被以 `Busy` 拒绝，
    /// 绝不排队：同一链路上的并发命令会产生未定义的设备行为。
    in_flight: Mutex<()>,
    command: CommandConfig,
}

impl<T: PatchTransport> std::fmt::Debug for CommandDispatcher<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDispatcher").finish_non_exhaustive()
    }
}

impl<T: PatchTransport> CommandDispatcher<T> {
    /// Creates the dispatcher over a transport and the lifecycle store.
    /// 在传输层与生命周期存储之上创建派发器。
    pub fn new(transport: Arc<T>, store: Arc<LifecycleStore>, command: CommandConfig) -> Self {
        Self {
            transport,
            store,
            in_flight: Mutex::new(()),
            command,
        }
    }

    /// 校验生命周期前置条件。
    /// Validates a lifecycle precondition.
    fn require(
        &self,
        op: &'static str,
        pred: impl FnOnce(LifecyclePhase) -> bool,
    ) -> Result<LifecyclePhase> {
        let phase = self.store.phase();
        if pred(phase) {
            Ok(phase)
        } else {
            Err(Error::InvalidPrecondition { op, phase })
        }
    }

    /// Sends one command under the in-flight gate, racing the response
    /// against the deadline. The two sources are mutually exclusive:
    /// whichever completes first is committed. A timeout makes no
    /// inference about the physical action; reconciliation is left to
    /// the next successful state read.
    ///
    /// 在在途闸门下发送一条命令，让响应与截止时间赛跑。两个来源
    /// 互斥：先完成者胜出。超时不对物理动作做任何推断，对账交给
    /// 下一次成功的状态读取。
    async fn execute(
        &self,
        op: &'static str,
        opcode: Opcode,
        payload: Bytes,
        timeout: Duration,
    ) -> Result<RawResponse> {
        let _gate = self.in_flight.try_lock().map_err(|_| Error::Busy)?;
        trace!(op, %opcode, ?timeout, "Dispatching device command");

        match tokio::time::timeout(timeout, self.transport.send_command(opcode, payload)).await {
            Ok(Ok(resp)) if resp.is_success() => Ok(resp),
            Ok(Ok(resp)) => {
                debug!(op, status = resp.status, "Device rejected command");
                Err(Error::Rejected(resp.status))
            }
            Ok(Err(e)) => Err(e),
            Err(_) => {
                warn!(op, ?timeout, "Command deadline elapsed; device-side effect unknown");
                Err(Error::TimedOut)
            }
        }
    }

    /// 把成功响应的载荷解码为类型化结果。
    /// Decodes a successful response's payload into a typed result.
    fn decode<R>(op: &'static str, resp: &RawResponse, decoded: Option<R>) -> Result<R> {
        decoded.ok_or_else(|| {
            warn!(op, len = resp.payload.len(), "Undecodable response payload");
            Error::Link(LinkFault::Malformed(format!("{op} response payload")))
        })
    }

    // ─── Pairing & activation ───────────────────────────────────────
    // ─── 配对与激活 ────────────────────────────────────────────────

    /// Establishes a bond with the patch at the given address. On
    /// device acknowledgment the lifecycle advances to activation and
    /// the address is remembered.
    ///
    /// 与给定地址的贴片建立绑定。设备确认后生命周期推进到激活，
    /// 并记忆该地址。
    pub async fn start_bond(&self, address: &str, timeout: Duration) -> Result<bool> {
        let phase = self.require("start_bond", PhaseValidator::permits_bonding)?;
        if phase == LifecyclePhase::Unpaired {
            self.store.apply_event(LifecycleEvent::BondStarted);
        }
        self.transport.update_address(Some(address)).await?;

        let mut payload = BytesMut::new();
        payload.put_u8(address.len() as u8);
        payload.put_slice(address.as_bytes());

        let resp = self
            .execute("start_bond", Opcode::Bond, payload.freeze(), timeout)
            .await?;
        let ack = Self::decode(
            "start_bond",
            &resp,
            BooleanResponse::decode(&mut resp.payload.clone()),
        )?;

        if ack.acknowledged {
            self.store.apply_event(LifecycleEvent::BondSucceeded);
            self.store
                .update_config(|c| c.address = Some(address.to_string()));
            self.store.flush()?;
        }
        Ok(ack.acknowledged)
    }

    /// Reads patch identity and firmware info, remembering the serial.
    /// 读取贴片标识与固件信息，并记忆序列号。
    pub async fn get_patch_info(&self, timeout: Duration) -> Result<PatchInfo> {
        let resp = self
            .execute("get_patch_info", Opcode::PatchInfo, Bytes::new(), timeout)
            .await?;
        let info = Self::decode(
            "get_patch_info",
            &resp,
            PatchInfo::decode(&mut resp.payload.clone()),
        )?;
        self.store
            .update_config(|c| c.serial = Some(info.serial.clone()));
        self.store.flush()?;
        Ok(info)
    }

    /// Runs the on-device self test. A pass completes the `SelfTest`
    /// activation sub-step.
    /// 运行设备自检。通过则完成 `SelfTest` 激活子步骤。
    pub async fn self_test(&self, timeout: Duration) -> Result<SelfTestResult> {
        let phase = self.require("self_test", PhaseValidator::permits_activation_steps)?;
        let resp = self
            .execute("self_test", Opcode::SelfTest, Bytes::new(), timeout)
            .await?;
        let result = Self::decode(
            "self_test",
            &resp,
            SelfTestResult::decode(&mut resp.payload.clone()),
        )?;

        if result.is_passed() && phase == LifecyclePhase::Activating(ActivationStep::SelfTest) {
            self.store
                .apply_event(LifecycleEvent::SubStepCompleted(ActivationStep::SelfTest));
            self.store.flush()?;
        }
        Ok(result)
    }

    /// Reads the on-device temperature. Uses the fixed protocol
    /// deadline.
    /// 读取设备温度。使用固定的协议截止时间。
    pub async fn get_temperature(&self) -> Result<TemperatureResponse> {
        let resp = self
            .execute(
                "get_temperature",
                Opcode::Temperature,
                Bytes::new(),
                self.command.temperature_timeout,
            )
            .await?;
        Self::decode(
            "get_temperature",
            &resp,
            TemperatureResponse::decode(&mut resp.payload.clone()),
        )
    }

    /// Issues the start-priming command. Priming progress is observed
    /// through subsequent device state reads; the coordinator drives
    /// that progress stream and completes the `Priming` sub-step.
    ///
    /// 下发开始排气命令。排气进度通过随后的设备状态读取观察；
    /// 进度流由协调器驱动，并由它完成 `Priming` 子步骤。
    pub async fn start_priming(&self, timeout: Duration, target_count: u16) -> Result<()> {
        self.require("start_priming", PhaseValidator::permits_activation_steps)?;
        let mut payload = BytesMut::new();
        payload.put_u16(target_count);
        self.execute("start_priming", Opcode::StartPriming, payload.freeze(), timeout)
            .await?;
        Ok(())
    }

    /// Checks the needle insertion sensor. Success completes the
    /// `NeedleSensing` sub-step.
    /// 检查针头植入传感器。成功则完成 `NeedleSensing` 子步骤。
    pub async fn check_needle_sensing(&self, timeout: Duration) -> Result<bool> {
        let phase = self.require(
            "check_needle_sensing",
            PhaseValidator::permits_activation_steps,
        )?;
        let resp = self
            .execute(
                "check_needle_sensing",
                Opcode::NeedleSensing,
                Bytes::new(),
                timeout,
            )
            .await?;
        let ack = Self::decode(
            "check_needle_sensing",
            &resp,
            BooleanResponse::decode(&mut resp.payload.clone()),
        )?;

        if ack.acknowledged && phase == LifecyclePhase::Activating(ActivationStep::NeedleSensing) {
            self.store.apply_event(LifecycleEvent::SubStepCompleted(
                ActivationStep::NeedleSensing,
            ));
            self.store.flush()?;
        }
        Ok(ack.acknowledged)
    }

    /// The final activation handshake. On acknowledgment the lifecycle
    /// reaches `Activated` and the activation/expiry timestamps are
    /// stamped.
    /// 最终激活握手。确认后生命周期到达 `Activated`，并记下激活与
    /// 过期时间戳。
    pub async fn activate(&self, timeout: Duration) -> Result<bool> {
        self.require("activate", |phase| {
            phase == LifecyclePhase::Activating(ActivationStep::Ready)
        })?;
        let resp = self
            .execute("activate", Opcode::Activate, Bytes::new(), timeout)
            .await?;
        let ack = Self::decode(
            "activate",
            &resp,
            BooleanResponse::decode(&mut resp.payload.clone()),
        )?;

        if ack.acknowledged {
            self.store.apply_event(LifecycleEvent::ActivationConfirmed);
            let activated = now_millis();
            self.store.update_config(|c| {
                c.activated_at_ms = Some(activated);
                c.expires_at_ms = Some(activated + PATCH_LIFE_HOURS * 60 * 60 * 1000);
            });
            self.store.flush()?;
        }
        Ok(ack.acknowledged)
    }

    // ─── Basal ──────────────────────────────────────────────────────
    // ─── 基础率 ────────────────────────────────────────────────────

    /// Programs and starts the normal basal schedule.
    /// 设定并启动普通基础率计划。
    pub async fn start_basal(&self, basal: NormalBasal) -> Result<BasalScheduleSetResponse> {
        self.require("start_basal", PhaseValidator::permits_dosing)?;

        let mut payload = BytesMut::new();
        payload.put_u8(basal.segments.len() as u8);
        for seg in &basal.segments {
            payload.put_u16(seg.start_min);
            payload.put_u16(seg.end_min);
            payload.put_f32(seg.rate_u_per_hr);
        }
        let resp = self
            .execute(
                "start_basal",
                Opcode::BasalStart,
                payload.freeze(),
                self.command.default_timeout,
            )
            .await?;
        let set = Self::decode(
            "start_basal",
            &resp,
            BasalScheduleSetResponse::decode(&mut resp.payload.clone()),
        )?;
        self.store.set_normal_basal(basal);
        self.store.flush()?;
        Ok(set)
    }

    /// Resumes a paused basal.
    /// 恢复暂停的基础率。
    pub async fn resume_basal(&self) -> Result<BooleanResponse> {
        self.require("resume_basal", PhaseValidator::permits_dosing)?;
        let resp = self
            .execute(
                "resume_basal",
                Opcode::BasalResume,
                Bytes::new(),
                self.command.default_timeout,
            )
            .await?;
        Self::decode(
            "resume_basal",
            &resp,
            BooleanResponse::decode(&mut resp.payload.clone()),
        )
    }

    /// Pauses basal delivery for the given number of hours.
    /// 暂停基础率输注给定的小时数。
    pub async fn pause_basal(&self, pause_hours: f32) -> Result<BooleanResponse> {
        self.require("pause_basal", PhaseValidator::permits_dosing)?;
        let mut payload = BytesMut::new();
        payload.put_f32(pause_hours);
        let resp = self
            .execute(
                "pause_basal",
                Opcode::BasalPause,
                payload.freeze(),
                self.command.default_timeout,
            )
            .await?;
        Self::decode(
            "pause_basal",
            &resp,
            BooleanResponse::decode(&mut resp.payload.clone()),
        )
    }

    // ─── Temp basal ─────────────────────────────────────────────────
    // ─── 临时基础率 ────────────────────────────────────────────────

    /// Starts a temp basal override.
    /// 启动临时基础率覆盖。
    pub async fn start_temp_basal(&self, temp: TempBasal) -> Result<TempBasalScheduleSetResponse> {
        self.require("start_temp_basal", PhaseValidator::permits_dosing)?;
        let mut payload = BytesMut::new();
        payload.put_f32(temp.rate_u_per_hr);
        payload.put_u16(temp.duration_min);
        let resp = self
            .execute(
                "start_temp_basal",
                Opcode::TempBasalStart,
                payload.freeze(),
                self.command.default_timeout,
            )
            .await?;
        let set = Self::decode(
            "start_temp_basal",
            &resp,
            TempBasalScheduleSetResponse::decode(&mut resp.payload.clone()),
        )?;
        self.store.set_temp_basal(temp);
        Ok(set)
    }

    /// Stops the running temp basal. The device resumes normal basal on
    /// its own, for the explicit stop exactly as for a natural expiry,
    /// so no resumption logic runs here; the resumption is observed via
    /// the next device state read.
    ///
    /// 停止进行中的临时基础率。设备自行恢复普通基础率（显式停止
    /// 与自然到期完全一样），因此这里不运行任何恢复逻辑；恢复通过
    /// 下一次设备状态读取观察到。
    pub async fn stop_temp_basal(&self) -> Result<BooleanResponse> {
        self.require("stop_temp_basal", PhaseValidator::permits_dosing)?;
        let resp = self
            .execute(
                "stop_temp_basal",
                Opcode::TempBasalStop,
                Bytes::new(),
                self.command.default_timeout,
            )
            .await?;
        let ack = Self::decode(
            "stop_temp_basal",
            &resp,
            BooleanResponse::decode(&mut resp.payload.clone()),
        )?;
        self.store.clear_temp_basal();
        Ok(ack)
    }

    // ─── Bolus ──────────────────────────────────────────────────────
    // ─── 大剂量 ────────────────────────────────────────────────────

    /// 编码并启动一次大剂量。
    /// Encodes and starts one bolus.
    async fn start_bolus(
        &self,
        op: &'static str,
        now_dose_u: f32,
        ext_dose_u: f32,
        ex_duration: BolusExDuration,
    ) -> Result<BolusResponse> {
        self.require(op, PhaseValidator::permits_dosing)?;
        let mut payload = BytesMut::new();
        payload.put_f32(now_dose_u);
        payload.put_f32(ext_dose_u);
        payload.put_u16(ex_duration.minutes());
        let resp = self
            .execute(op, Opcode::BolusStart, payload.freeze(), self.command.default_timeout)
            .await?;
        let started = Self::decode(op, &resp, BolusResponse::decode(&mut resp.payload.clone()))?;

        self.store.update_bolus(|b| {
            if started.now_started {
                b.now = Some(BolusInjection::programmed(now_dose_u));
            }
            if started.ext_started {
                b.extended = Some(BolusInjection::programmed(ext_dose_u));
            }
        });
        Ok(started)
    }

    /// Starts a quick bolus with caller-chosen immediate and extended
    /// parts.
    /// 以调用者选择的即时与延长部分启动快速大剂量。
    pub async fn start_quick_bolus(
        &self,
        now_dose_u: f32,
        ext_dose_u: f32,
        ex_duration: BolusExDuration,
    ) -> Result<BolusResponse> {
        self.start_bolus("start_quick_bolus", now_dose_u, ext_dose_u, ex_duration)
            .await
    }

    /// Starts a bolus computed by an external calculator. The dose
    /// decision itself is outside this core.
    /// 启动由外部计算器计算的大剂量。剂量决策本身在本核心之外。
    pub async fn start_calculator_bolus(
        &self,
        now_dose_u: f32,
        ext_dose_u: f32,
        ex_duration: BolusExDuration,
    ) -> Result<BolusResponse> {
        self.start_bolus("start_calculator_bolus", now_dose_u, ext_dose_u, ex_duration)
            .await
    }

    /// Stops the immediate bolus, returning the device's injected count.
    /// 停止即时大剂量，返回设备的已注射计数。
    pub async fn stop_now_bolus(&self) -> Result<BolusStopResponse> {
        self.require("stop_now_bolus", PhaseValidator::permits_dosing)?;
        let resp = self
            .execute(
                "stop_now_bolus",
                Opcode::BolusStopNow,
                Bytes::new(),
                self.command.default_timeout,
            )
            .await?;
        let stop = Self::decode(
            "stop_now_bolus",
            &resp,
            BolusStopResponse::decode(&mut resp.payload.clone()),
        )?;
        self.store.update_bolus(|b| b.now = None);
        Ok(stop)
    }

    /// Stops the extended bolus, returning the device's injected count.
    /// 停止延长大剂量，返回设备的已注射计数。
    pub async fn stop_ext_bolus(&self) -> Result<BolusStopResponse> {
        self.require("stop_ext_bolus", PhaseValidator::permits_dosing)?;
        let resp = self
            .execute(
                "stop_ext_bolus",
                Opcode::BolusStopExt,
                Bytes::new(),
                self.command.default_timeout,
            )
            .await?;
        let stop = Self::decode(
            "stop_ext_bolus",
            &resp,
            BolusStopResponse::decode(&mut resp.payload.clone()),
        )?;
        self.store.update_bolus(|b| b.extended = None);
        Ok(stop)
    }

    /// Stops both parts of a combo bolus.
    /// 停止双波大剂量的两个部分。
    pub async fn stop_combo_bolus(&self) -> Result<ComboBolusStopResponse> {
        self.require("stop_combo_bolus", PhaseValidator::permits_dosing)?;
        let resp = self
            .execute(
                "stop_combo_bolus",
                Opcode::BolusStopCombo,
                Bytes::new(),
                self.command.default_timeout,
            )
            .await?;
        let stop = Self::decode(
            "stop_combo_bolus",
            &resp,
            ComboBolusStopResponse::decode(&mut resp.payload.clone()),
        )?;
        self.store.update_bolus(|b| {
            b.now = None;
            b.extended = None;
        });
        Ok(stop)
    }

    // ─── Deactivation & settings ────────────────────────────────────
    // ─── 去激活与设置 ──────────────────────────────────────────────

    /// The deactivation handshake. With `force`, the lifecycle advances
    /// to `Deactivated` even when the device does not confirm: physical
    /// removal can occur without a final handshake.
    ///
    /// 去激活握手。带 `force` 时，即使设备不确认，生命周期也推进到
    /// `Deactivated`：物理移除可能在没有最终握手的情况下发生。
    pub async fn deactivate(&self, timeout: Duration, force: bool) -> Result<DeactivationStatus> {
        let phase = self.require("deactivate", PhaseValidator::permits_deactivation)?;
        if phase == LifecyclePhase::Activated {
            self.store.apply_event(LifecycleEvent::DeactivationStarted);
        }

        match self
            .execute("deactivate", Opcode::Deactivate, Bytes::new(), timeout)
            .await
        {
            Ok(_) => {
                self.store
                    .apply_event(LifecycleEvent::DeactivationConfirmed);
                self.store.flush()?;
                Ok(DeactivationStatus::Confirmed)
            }
            // Busy是客户端侧的拒绝：握手从未被尝试，不能强制
            Err(Error::Busy) => Err(Error::Busy),
            Err(e) if force && e.is_recoverable() => {
                warn!(error = %e, "Forcing deactivation without device confirmation");
                self.store
                    .apply_event(LifecycleEvent::DeactivationConfirmed);
                self.store.flush()?;
                Ok(DeactivationStatus::Forced)
            }
            Err(e) => Err(e),
        }
    }

    /// Silences the buzzer.
    /// 静音蜂鸣器。
    pub async fn stop_buzzer(&self) -> Result<BooleanResponse> {
        let resp = self
            .execute(
                "stop_buzzer",
                Opcode::BuzzerStop,
                Bytes::new(),
                self.command.default_timeout,
            )
            .await?;
        Self::decode(
            "stop_buzzer",
            &resp,
            BooleanResponse::decode(&mut resp.payload.clone()),
        )
    }

    /// Enables or disables the info-reminder buzzer on the device. The
    /// local configuration commit is the coordinator's job, after this
    /// succeeds.
    /// 在设备上启用或禁用信息提醒蜂鸣。本地配置的提交在此成功后
    /// 由协调器完成。
    pub async fn set_info_reminder(&self, enabled: bool) -> Result<BooleanResponse> {
        let mut payload = BytesMut::new();
        payload.put_u8(u8::from(enabled));
        let resp = self
            .execute(
                "set_info_reminder",
                Opcode::InfoReminderSet,
                payload.freeze(),
                self.command.default_timeout,
            )
            .await?;
        Self::decode(
            "set_info_reminder",
            &resp,
            BooleanResponse::decode(&mut resp.payload.clone()),
        )
    }

    /// Programs the low-reservoir and expiration alerts on the device.
    /// 在设备上设定低储药量与过期报警。
    pub async fn set_low_reservoir(&self, units: u16, hours: u16) -> Result<BooleanResponse> {
        let mut payload = BytesMut::new();
        payload.put_u16(units);
        payload.put_u16(hours);
        let resp = self
            .execute(
                "set_low_reservoir",
                Opcode::LowReservoirSet,
                payload.freeze(),
                self.command.default_timeout,
            )
            .await?;
        Self::decode(
            "set_low_reservoir",
            &resp,
            BooleanResponse::decode(&mut resp.payload.clone()),
        )
    }

    /// Silences the beep of one occurring alarm.
    /// 静音一个发生中报警的提示音。
    pub async fn stop_alarm_beep(&self, code: AlarmCode) -> Result<BooleanResponse> {
        let mut payload = BytesMut::new();
        payload.put_u8(code.wire_code());
        let resp = self
            .execute(
                "stop_alarm_beep",
                Opcode::AlarmBeepStop,
                payload.freeze(),
                self.command.default_timeout,
            )
            .await?;
        Self::decode(
            "stop_alarm_beep",
            &resp,
            BooleanResponse::decode(&mut resp.payload.clone()),
        )
    }

    // ─── State & discovery ──────────────────────────────────────────
    // ─── 状态与发现 ────────────────────────────────────────────────

    /// Reads the device-reported state snapshot and feeds it into the
    /// store. This is the reconciliation primitive: after a timeout or
    /// a reconnect, this read (not any client-side assumption) decides
    /// what is actually being delivered.
    ///
    /// 读取设备报告的状态快照并送入存储。这是对账原语：超时或重连
    /// 之后，由这次读取（而不是任何客户端假定）决定实际在输注
    /// 什么。
    pub async fn update_connection(&self) -> Result<PatchState> {
        let resp = self
            .execute(
                "update_connection",
                Opcode::StateRead,
                Bytes::new(),
                self.command.default_timeout,
            )
            .await?;
        let state = Self::decode(
            "update_connection",
            &resp,
            response::decode_patch_state(&mut resp.payload.clone()),
        )?;
        self.store.update_patch_state(state);
        Ok(state)
    }

    /// Scans for nearby patches. The previously remembered device
    /// address is cleared first, in the transport and in the stored
    /// config, so a fresh scan never biases toward a stale device.
    ///
    /// 扫描附近的贴片。先清除先前记忆的设备地址（传输层与存储的
    /// 配置中都清除），这样新的扫描绝不会偏向过期的设备。
    pub async fn scan(&self, timeout: Duration) -> Result<Vec<DiscoveredDevice>> {
        let _gate = self.in_flight.try_lock().map_err(|_| Error::Busy)?;
        self.transport.update_address(None).await?;
        self.store.update_config(|c| c.clear_address());
        self.store.flush()?;
        self.transport.scan(timeout).await
    }

    /// The default command deadline, for callers that do not supply one.
    /// 默认命令截止时间，供不提供截止时间的调用者使用。
    pub fn default_timeout(&self) -> Duration {
        self.command.default_timeout
    }

    /// The fixed deactivation deadline.
    /// 固定的去激活截止时间。
    pub fn deactivate_timeout(&self) -> Duration {
        self.command.deactivate_timeout
    }
}
