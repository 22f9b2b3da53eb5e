//! Command dispatch integration: the in-flight gate, deadline
//! semantics, and the special-case dosing policies.

pub mod common;

use common::harness::{
    FLAG_NORMAL_BASAL, Harness, Reply, bool_payload, bolus_started_payload, bolus_stop_payload,
    patch_state_payload, temp_basal_set_payload,
};
use patchlink::config::Config;
use patchlink::error::Error;
use patchlink::protocol::{DeactivationStatus, Opcode};
use patchlink::store::{PatchSnapshot, SnapshotStore};
use patchlink::transport::{DiscoveredDevice, PatchTransport};
use patchlink::types::{BolusExDuration, LifecyclePhase, PatchConfig, TempBasal};
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn second_command_in_flight_is_busy_and_timeout_fires_once() {
    let mut config = Config::default();
    config.command.default_timeout = Duration::from_secs(30);
    let h = Harness::activated_with_config(config);

    // 第一条命令永不应答
    h.transport.push_reply(Reply::Hang);

    let start = tokio::time::Instant::now();
    let commands = h.manager.commands().clone();
    let first = tokio::spawn(async move {
        commands
            .start_quick_bolus(2.0, 0.0, BolusExDuration::Minutes(0))
            .await
    });

    // t=5s：第二条命令被Busy拒绝，而不是排队
    tokio::time::sleep(Duration::from_secs(5)).await;
    let second = h
        .manager
        .commands()
        .start_quick_bolus(1.0, 0.0, BolusExDuration::Minutes(0))
        .await;
    assert!(matches!(second, Err(Error::Busy)));

    // t=30s：第一条命令恰好超时一次
    let first = first.await.expect("task join");
    assert!(matches!(first, Err(Error::TimedOut)));
    assert_eq!(start.elapsed(), Duration::from_secs(30));

    // 只有一条命令抵达设备；超时的给药命令不会被自动重试
    assert_eq!(h.transport.sent_opcodes(), vec![Opcode::BolusStart]);
    // 超时不得推断设备侧效果：本地不记录在途大剂量
    assert!(!h.manager.bolus_current().is_active());
}

#[tokio::test(start_paused = true)]
async fn device_rejection_surfaces_status() {
    let h = Harness::activated();
    h.transport.push_reply(Reply::Reject(0x42));
    let result = h.manager.commands().resume_basal().await;
    assert!(matches!(result, Err(Error::Rejected(0x42))));
}

#[tokio::test]
async fn dosing_before_activation_is_invalid_precondition() {
    let h = Harness::new();
    let result = h
        .manager
        .commands()
        .start_quick_bolus(2.0, 0.0, BolusExDuration::Minutes(0))
        .await;
    match result {
        Err(Error::InvalidPrecondition { op, phase }) => {
            assert_eq!(op, "start_quick_bolus");
            assert_eq!(phase, LifecyclePhase::Unpaired);
        }
        other => panic!("expected InvalidPrecondition, got {other:?}"),
    }
    // 命令从未抵达传输层
    assert!(h.transport.sent_opcodes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn stop_temp_basal_never_resumes_basal_itself() {
    let h = Harness::activated();
    let commands = h.manager.commands();

    h.transport
        .push_reply(Reply::Ok(temp_basal_set_payload(true, 45)));
    commands
        .start_temp_basal(TempBasal {
            rate_u_per_hr: 0.3,
            duration_min: 45,
        })
        .await
        .expect("start temp basal");
    assert!(h.manager.temp_basal().is_some());

    h.transport.push_reply(Reply::Ok(bool_payload(true)));
    commands.stop_temp_basal().await.expect("stop temp basal");
    assert!(h.manager.temp_basal().is_none());

    // 停止后派发器自身不发出任何恢复命令
    assert_eq!(
        h.transport.sent_opcodes(),
        vec![Opcode::TempBasalStart, Opcode::TempBasalStop]
    );

    // 恢复只能通过随后的状态读取观察到
    h.transport.push_reply(Reply::Ok(patch_state_payload(
        FLAG_NORMAL_BASAL,
        0,
        140.0,
    )));
    let state = commands.update_connection().await.expect("state read");
    assert!(state.normal_basal_active);
}

#[tokio::test(start_paused = true)]
async fn bolus_stop_reports_device_injected_amount() {
    let h = Harness::activated();
    let commands = h.manager.commands();

    h.transport
        .push_reply(Reply::Ok(bolus_started_payload(true, false)));
    commands
        .start_quick_bolus(2.0, 0.0, BolusExDuration::Minutes(0))
        .await
        .expect("bolus");
    assert!(h.manager.bolus_current().now.is_some());

    h.transport.push_reply(Reply::Ok(bolus_stop_payload(130)));
    let stop = commands.stop_now_bolus().await.expect("stop");
    assert!((stop.injected_u() - 1.3).abs() < f32::EPSILON);
    assert!(h.manager.bolus_current().now.is_none());
}

#[tokio::test]
async fn scan_clears_remembered_address_first() {
    let snapshot = PatchSnapshot {
        config: PatchConfig {
            address: Some("00:11:22:33:44:55".into()),
            ..PatchConfig::default()
        },
        ..PatchSnapshot::default()
    };
    let h = Harness::with_snapshot(snapshot, Config::default());
    h.transport
        .update_address(Some("00:11:22:33:44:55"))
        .await
        .expect("seed address");
    h.transport.set_scan_results(vec![DiscoveredDevice {
        address: "66:77:88:99:aa:bb".into(),
        name: Some("PATCH-42".into()),
        rssi: -61,
    }]);

    let devices = h.manager.scan(Duration::from_secs(10)).await.expect("scan");
    assert_eq!(devices.len(), 1);

    // 扫描总是无地址地开始：传输层、配置与持久化快照中都已清除
    assert_eq!(h.transport.remembered_address(), None);
    assert!(h.manager.patch_config().address.is_none());
    let persisted = h.snapshots.load().expect("load").expect("snapshot");
    assert!(persisted.config.address.is_none());
}

#[tokio::test(start_paused = true)]
async fn forced_deactivation_advances_without_confirmation() {
    let h = Harness::activated();
    h.transport.push_reply(Reply::Hang);

    let status = h
        .manager
        .commands()
        .deactivate(Duration::from_secs(5), true)
        .await
        .expect("forced deactivation");
    assert_eq!(status, DeactivationStatus::Forced);
    assert_eq!(h.manager.lifecycle_phase(), LifecyclePhase::Deactivated);
    // 确认去激活后配置回到默认值
    assert_eq!(h.manager.patch_config(), PatchConfig::default());
}

#[tokio::test(start_paused = true)]
async fn unforced_deactivation_timeout_stays_in_handshake() {
    let h = Harness::activated();
    h.transport.push_reply(Reply::Hang);

    let result = h
        .manager
        .commands()
        .deactivate(Duration::from_secs(5), false)
        .await;
    assert!(matches!(result, Err(Error::TimedOut)));
    assert_eq!(h.manager.lifecycle_phase(), LifecyclePhase::Deactivating);
}

#[tokio::test(start_paused = true)]
async fn confirmed_deactivation_reports_confirmed() {
    let h = Harness::activated();
    h.transport.push_reply(Reply::Ok(bool_payload(true)));

    let status = h
        .manager
        .commands()
        .deactivate(Duration::from_secs(5), false)
        .await
        .expect("deactivation");
    assert_eq!(status, DeactivationStatus::Confirmed);
    assert_eq!(h.manager.lifecycle_phase(), LifecyclePhase::Deactivated);
}
