//! protocol 模块的单元测试。
//! Unit tests for the protocol module.

use super::*;
use bytes::{BufMut, Bytes, BytesMut};

#[test]
fn test_opcode_roundtrip() {
    // 每个操作码都能从它的字节值还原
    let all = [
        Opcode::Bond,
        Opcode::PatchInfo,
        Opcode::SelfTest,
        Opcode::Temperature,
        Opcode::StartPriming,
        Opcode::NeedleSensing,
        Opcode::Activate,
        Opcode::BasalStart,
        Opcode::BasalResume,
        Opcode::BasalPause,
        Opcode::TempBasalStart,
        Opcode::TempBasalStop,
        Opcode::BolusStart,
        Opcode::BolusStopNow,
        Opcode::BolusStopExt,
        Opcode::BolusStopCombo,
        Opcode::Deactivate,
        Opcode::BuzzerStop,
        Opcode::InfoReminderSet,
        Opcode::LowReservoirSet,
        Opcode::AlarmBeepStop,
        Opcode::StateRead,
    ];
    for op in all {
        assert_eq!(Opcode::from_u8(op as u8), Some(op));
    }
    assert_eq!(Opcode::from_u8(0xff), None);
}

#[test]
fn test_dosing_classification() {
    assert!(Opcode::BolusStart.is_dosing());
    assert!(Opcode::TempBasalStop.is_dosing());
    assert!(Opcode::BasalPause.is_dosing());
    // 状态读取与设置不是给药命令
    assert!(!Opcode::StateRead.is_dosing());
    assert!(!Opcode::InfoReminderSet.is_dosing());
    assert!(!Opcode::Activate.is_dosing());
}

#[test]
fn test_raw_response_status() {
    assert!(RawResponse::ok(Bytes::new()).is_success());
    assert!(!RawResponse::rejected(0x42).is_success());
}

#[test]
fn test_patch_info_decode() {
    let mut buf = BytesMut::new();
    buf.put_u8(2); // hw
    buf.put_u8(7); // fw
    buf.put_u8(5);
    buf.put_slice(b"PL001");

    let info = PatchInfo::decode(&mut buf).expect("decode");
    assert_eq!(info.serial, "PL001");
    assert_eq!(info.hw_rev, 2);
    assert_eq!(info.fw_rev, 7);
}

#[test]
fn test_patch_info_decode_truncated_serial() {
    let mut buf = BytesMut::new();
    buf.put_u8(1);
    buf.put_u8(1);
    buf.put_u8(10); // 声称10字节，但只有2字节
    buf.put_slice(b"PL");
    assert!(PatchInfo::decode(&mut buf).is_none());
}

#[test]
fn test_self_test_decode() {
    let mut buf = Bytes::from_static(&[0x00]);
    assert_eq!(SelfTestResult::decode(&mut buf), Some(SelfTestResult::Passed));

    let mut buf = Bytes::from_static(&[0x02]);
    assert_eq!(
        SelfTestResult::decode(&mut buf),
        Some(SelfTestResult::ReservoirFailure)
    );

    let mut buf = Bytes::from_static(&[0x77]);
    assert_eq!(SelfTestResult::decode(&mut buf), None);
}

#[test]
fn test_temperature_decode() {
    let mut buf = BytesMut::new();
    buf.put_i16(365);
    let temp = TemperatureResponse::decode(&mut buf).expect("decode");
    assert!((temp.celsius() - 36.5).abs() < f32::EPSILON);
}

#[test]
fn test_bolus_stop_decode() {
    let mut buf = BytesMut::new();
    buf.put_u16(250); // 2.5 U
    let stop = BolusStopResponse::decode(&mut buf).expect("decode");
    assert!((stop.injected_u() - 2.5).abs() < f32::EPSILON);
}

#[test]
fn test_patch_state_decode() {
    let mut buf = BytesMut::new();
    buf.put_u8(0x01 | 0x04); // 普通基础率 + 即时大剂量
    buf.put_u16(12);
    buf.put_f32(142.5);

    let state = response::decode_patch_state(&mut buf).expect("decode");
    assert!(state.normal_basal_active);
    assert!(!state.temp_basal_active);
    assert!(state.now_bolus_active);
    assert!(!state.ext_bolus_active);
    assert_eq!(state.prime_count, 12);
    assert!(!state.is_idle());
}

#[test]
fn test_idle_patch_state() {
    let mut buf = BytesMut::new();
    buf.put_u8(0x00);
    buf.put_u16(0);
    buf.put_f32(200.0);

    let state = response::decode_patch_state(&mut buf).expect("decode");
    assert!(state.is_idle());
}

#[test]
fn test_decode_short_payloads() {
    // 各解码器在载荷不足时都返回None而不是panic
    let mut empty = Bytes::new();
    assert!(BooleanResponse::decode(&mut empty).is_none());
    let mut empty = Bytes::new();
    assert!(TemperatureResponse::decode(&mut empty).is_none());
    let mut one = Bytes::from_static(&[0x01]);
    assert!(TempBasalScheduleSetResponse::decode(&mut one).is_none());
    let mut one = Bytes::from_static(&[0x01]);
    assert!(response::decode_patch_state(&mut one).is_none());
}
