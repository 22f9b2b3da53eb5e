//! The protocol module: device operation opcodes and typed responses.
//! protocol 模块：设备操作操作码与类型化响应。

pub mod opcode;
pub mod response;

pub use opcode::Opcode;
pub use response::{
    BasalScheduleSetResponse, BolusResponse, BolusStopResponse, BooleanResponse,
    ComboBolusStopResponse, DeactivationStatus, PatchInfo, RawResponse, SelfTestResult,
    TempBasalScheduleSetResponse, TemperatureResponse,
};

#[cfg(test)]
mod tests;
