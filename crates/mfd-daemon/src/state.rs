//! Shared runtime state for mfd-daemon.
//!
//! Handlers receive `State<Arc<AppState<S>>>` from Axum. The state is
//! generic over the backing store so the scenario tests can run the real
//! router against the in-memory store.

use std::sync::Arc;
use std::time::Duration;

use mfd_settlement::{FrontDeskStore, Money, SettlementPolicy};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// BusMsg: SSE event bus payload
// ---------------------------------------------------------------------------

/// Messages broadcast over the internal event bus and surfaced as SSE events
/// on the front-desk board.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusMsg {
    Heartbeat {
        ts_millis: i64,
    },
    StaySettled {
        stay_id: Uuid,
        room_id: Uuid,
        room_number: String,
    },
    SaleSettled {
        sale_id: Uuid,
        total: Money,
    },
    ShiftOpened {
        shift_id: Uuid,
    },
    ShiftClosed {
        shift_id: Uuid,
    },
}

impl BusMsg {
    /// SSE `event:` name.
    pub fn event_name(&self) -> &'static str {
        match self {
            BusMsg::Heartbeat { .. } => "heartbeat",
            BusMsg::StaySettled { .. } => "stay_settled",
            BusMsg::SaleSettled { .. } => "sale_settled",
            BusMsg::ShiftOpened { .. } => "shift_opened",
            BusMsg::ShiftClosed { .. } => "shift_closed",
        }
    }
}

// ---------------------------------------------------------------------------
// BuildInfo
// ---------------------------------------------------------------------------

/// Static build metadata included in health responses.
#[derive(Clone, Debug, Serialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

pub struct AppState<S> {
    /// Backing store (Postgres in production, in-memory in tests).
    pub store: Arc<S>,
    pub policy: SettlementPolicy,
    /// Broadcast bus for SSE.
    pub bus: broadcast::Sender<BusMsg>,
    pub build: BuildInfo,
}

impl<S: FrontDeskStore> AppState<S> {
    pub fn new(store: Arc<S>, policy: SettlementPolicy) -> Self {
        let (bus, _rx) = broadcast::channel::<BusMsg>(1024);
        Self {
            store,
            policy,
            bus,
            build: BuildInfo {
                service: "mfd-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
        }
    }

    /// Publish to the board. Having no subscribers is not an error.
    pub fn publish(&self, msg: BusMsg) {
        let _ = self.bus.send(msg);
    }
}

/// Spawn a background task that emits a heartbeat SSE every `interval`.
pub fn spawn_heartbeat(bus: broadcast::Sender<BusMsg>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let ts = chrono::Utc::now().timestamp_millis();
            let _ = bus.send(BusMsg::Heartbeat { ts_millis: ts });
        }
    });
}
