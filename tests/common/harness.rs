//! tests/common/harness.rs
//!
//! A scriptable fake transport and a pre-wired manager for integration
//! tests. 可编程的伪传输与预接好的管理器，用于集成测试。

use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use patchlink::config::Config;
use patchlink::error::{Error, Result};
use patchlink::manager::PatchManager;
use patchlink::protocol::{Opcode, RawResponse};
use patchlink::store::{MemorySnapshotStore, PatchSnapshot};
use patchlink::transport::{
    DiscoveredDevice, LinkEvent, LinkFault, LinkState, PatchTransport,
};
use patchlink::types::LifecyclePhase;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;
use tokio::sync::broadcast;

/// Initializes tracing for tests, ensuring it's only done once.
pub fn init_tracing() {
    static TRACING_INIT: Once = Once::new();
    TRACING_INIT.call_once(|| {
        let filter =
            std::env::var("RUST_LOG").unwrap_or_else(|_| "patchlink=debug".to_string());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .init();
    });
}

/// One scripted reply of the fake transport, consumed in FIFO order.
/// 伪传输的一条脚本化回复，按先进先出顺序消费。
#[derive(Debug, Clone)]
pub enum Reply {
    /// Respond successfully with the given payload.
    Ok(Bytes),
    /// Respond with an explicit device rejection.
    Reject(u8),
    /// Never respond; the dispatcher's deadline decides.
    Hang,
    /// Fail the command at the link layer.
    Fail(LinkFault),
}

/// A fake transport whose commands are scripted and whose link events
/// are driven by the test.
/// 命令由脚本决定、链路事件由测试驱动的伪传输。
pub struct FakeTransport {
    link_tx: broadcast::Sender<LinkEvent>,
    link_state: Mutex<LinkState>,
    address: Mutex<Option<String>>,
    script: Mutex<VecDeque<Reply>>,
    sent: Mutex<Vec<(Opcode, Bytes)>>,
    scan_results: Mutex<Vec<DiscoveredDevice>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        let (link_tx, _) = broadcast::channel(64);
        Self {
            link_tx,
            link_state: Mutex::new(LinkState::Disconnected),
            address: Mutex::new(None),
            script: Mutex::new(VecDeque::new()),
            sent: Mutex::new(Vec::new()),
            scan_results: Mutex::new(Vec::new()),
        }
    }

    /// Queues the next reply.
    pub fn push_reply(&self, reply: Reply) {
        self.script.lock().unwrap().push_back(reply);
    }

    /// Emits a raw link event, updating the polled state for state
    /// events.
    pub fn emit(&self, event: LinkEvent) {
        if let LinkEvent::State(state) = &event {
            *self.link_state.lock().unwrap() = *state;
        }
        let _ = self.link_tx.send(event);
    }

    /// Every command sent so far, in order.
    pub fn sent(&self) -> Vec<(Opcode, Bytes)> {
        self.sent.lock().unwrap().clone()
    }

    /// The opcodes sent so far, in order.
    pub fn sent_opcodes(&self) -> Vec<Opcode> {
        self.sent.lock().unwrap().iter().map(|(op, _)| *op).collect()
    }

    /// The currently remembered device address.
    pub fn remembered_address(&self) -> Option<String> {
        self.address.lock().unwrap().clone()
    }

    /// Seeds the scan result list.
    pub fn set_scan_results(&self, devices: Vec<DiscoveredDevice>) {
        *self.scan_results.lock().unwrap() = devices;
    }
}

#[async_trait]
impl PatchTransport for FakeTransport {
    fn subscribe_link(&self) -> broadcast::Receiver<LinkEvent> {
        self.link_tx.subscribe()
    }

    fn link_state(&self) -> LinkState {
        *self.link_state.lock().unwrap()
    }

    async fn send_command(&self, opcode: Opcode, payload: Bytes) -> Result<RawResponse> {
        self.sent.lock().unwrap().push((opcode, payload));
        let reply = self.script.lock().unwrap().pop_front();
        match reply {
            // 脚本耗尽时默认以确认载荷应答
            None => Ok(RawResponse::ok(bool_payload(true))),
            Some(Reply::Ok(payload)) => Ok(RawResponse::ok(payload)),
            Some(Reply::Reject(status)) => Ok(RawResponse::rejected(status)),
            Some(Reply::Hang) => futures::future::pending().await,
            Some(Reply::Fail(fault)) => Err(Error::Link(fault)),
        }
    }

    async fn scan(&self, _timeout: Duration) -> Result<Vec<DiscoveredDevice>> {
        Ok(self.scan_results.lock().unwrap().clone())
    }

    async fn update_address(&self, address: Option<&str>) -> Result<()> {
        *self.address.lock().unwrap() = address.map(str::to_string);
        Ok(())
    }
}

// ─── Payload builders ──────────────────────────────────────────────

pub fn bool_payload(ack: bool) -> Bytes {
    let mut buf = BytesMut::new();
    buf.put_u8(u8::from(ack));
    buf.freeze()
}

pub fn self_test_payload(code: u8) -> Bytes {
    let mut buf = BytesMut::new();
    buf.put_u8(code);
    buf.freeze()
}

pub fn patch_info_payload(serial: &str, hw: u8, fw: u8) -> Bytes {
    let mut buf = BytesMut::new();
    buf.put_u8(hw);
    buf.put_u8(fw);
    buf.put_u8(serial.len() as u8);
    buf.put_slice(serial.as_bytes());
    buf.freeze()
}

pub fn bolus_started_payload(now: bool, ext: bool) -> Bytes {
    let mut buf = BytesMut::new();
    buf.put_u8(u8::from(now));
    buf.put_u8(u8::from(ext));
    buf.freeze()
}

pub fn bolus_stop_payload(injected_centi_u: u16) -> Bytes {
    let mut buf = BytesMut::new();
    buf.put_u16(injected_centi_u);
    buf.freeze()
}

pub fn basal_set_payload(delivering: bool) -> Bytes {
    let mut buf = BytesMut::new();
    buf.put_u8(u8::from(delivering));
    buf.freeze()
}

pub fn temp_basal_set_payload(active: bool, remaining_min: u16) -> Bytes {
    let mut buf = BytesMut::new();
    buf.put_u8(u8::from(active));
    buf.put_u16(remaining_min);
    buf.freeze()
}

/// Device state payload: delivery flags, prime count, remaining units.
pub fn patch_state_payload(flags: u8, prime_count: u16, remaining_units: f32) -> Bytes {
    let mut buf = BytesMut::new();
    buf.put_u8(flags);
    buf.put_u16(prime_count);
    buf.put_f32(remaining_units);
    buf.freeze()
}

pub const FLAG_NORMAL_BASAL: u8 = 0x01;
pub const FLAG_TEMP_BASAL: u8 = 0x02;
pub const FLAG_NOW_BOLUS: u8 = 0x04;
pub const FLAG_EXT_BOLUS: u8 = 0x08;

// ─── The harness itself ────────────────────────────────────────────

/// A manager wired to a fake transport and an in-memory snapshot store.
/// 接在伪传输与内存快照存储上的管理器。
pub struct Harness {
    pub transport: Arc<FakeTransport>,
    pub snapshots: Arc<MemorySnapshotStore>,
    pub manager: PatchManager<FakeTransport>,
}

impl Harness {
    /// A harness starting from a fresh, unpaired patch.
    pub fn new() -> Self {
        Self::with_snapshot(PatchSnapshot::default(), Config::default())
    }

    /// A harness starting from the given persisted snapshot.
    pub fn with_snapshot(snapshot: PatchSnapshot, config: Config) -> Self {
        init_tracing();
        let transport = Arc::new(FakeTransport::new());
        let snapshots = Arc::new(MemorySnapshotStore::seeded(snapshot));
        let manager = PatchManager::new(transport.clone(), snapshots.clone(), config)
            .expect("manager construction");
        Self {
            transport,
            snapshots,
            manager,
        }
    }

    /// A harness whose patch is already activated and delivering.
    pub fn activated() -> Self {
        Self::activated_with_config(Config::default())
    }

    /// Same, with a caller-chosen controller configuration.
    pub fn activated_with_config(config: Config) -> Self {
        let snapshot = PatchSnapshot {
            phase: LifecyclePhase::Activated,
            ..PatchSnapshot::default()
        };
        Self::with_snapshot(snapshot, config)
    }
}
