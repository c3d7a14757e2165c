//! Persisted entities read and written by the settlement workflows.
//!
//! These mirror the database rows one-to-one.  Monetary columns are stored as
//! `bigint` micros and surface here as [`Money`] / [`Rate`].

use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::money::{Money, Rate};

// ---------------------------------------------------------------------------
// Shift
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShiftState {
    Open,
    Closed,
}

impl ShiftState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShiftState::Open => "OPEN",
            ShiftState::Closed => "CLOSED",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "OPEN" => Ok(ShiftState::Open),
            "CLOSED" => Ok(ShiftState::Closed),
            other => Err(anyhow!("invalid shift state: {}", other)),
        }
    }
}

/// One operational period ("jornada").  At most one is `Open` system-wide.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Shift {
    pub shift_id: Uuid,
    pub shift_type_id: Uuid,
    pub opened_by: Uuid,
    pub work_date: NaiveDate,
    pub opening_cash: Money,
    pub opening_foreign: Money,
    pub exchange_rate: Rate,
    pub state: ShiftState,
    pub opened_at_utc: DateTime<Utc>,
    pub closed_by: Option<Uuid>,
    pub closed_at_utc: Option<DateTime<Utc>>,
}

/// Input for opening a shift.
#[derive(Debug, Clone)]
pub struct NewShift {
    pub shift_id: Uuid,
    pub shift_type_id: Uuid,
    pub opened_by: Uuid,
    pub work_date: NaiveDate,
    pub opening_cash: Money,
    pub opening_foreign: Money,
    pub exchange_rate: Rate,
    pub opened_at_utc: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Room
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomState {
    Available,
    Occupied,
    Cleaning,
    Maintenance,
}

impl RoomState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomState::Available => "AVAILABLE",
            RoomState::Occupied => "OCCUPIED",
            RoomState::Cleaning => "CLEANING",
            RoomState::Maintenance => "MAINTENANCE",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "AVAILABLE" => Ok(RoomState::Available),
            "OCCUPIED" => Ok(RoomState::Occupied),
            "CLEANING" => Ok(RoomState::Cleaning),
            "MAINTENANCE" => Ok(RoomState::Maintenance),
            other => Err(anyhow!("invalid room state: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    pub room_id: Uuid,
    pub number: String,
    pub state: RoomState,
    pub active: bool,
}

impl Room {
    /// Only an active, `Available` room may be allocated.
    pub fn is_allocatable(&self) -> bool {
        self.active && self.state == RoomState::Available
    }
}

// ---------------------------------------------------------------------------
// Guest
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Guest {
    pub guest_id: Uuid,
    pub document: String,
    pub name: String,
    pub phone: Option<String>,
    /// Prior visits: 0 on first encounter, +1 on every repeat settlement.
    pub visit_count: i32,
    pub last_visit_at_utc: Option<DateTime<Utc>>,
}

/// Outcome of resolving a guest by document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuestResolution {
    pub guest_id: Uuid,
    pub visit_count: i32,
    pub created: bool,
}

// ---------------------------------------------------------------------------
// Catalog rows
// ---------------------------------------------------------------------------

/// Fixed price for a contracted duration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StayType {
    pub stay_type_id: Uuid,
    pub name: String,
    pub price: Money,
    pub duration_hours: i32,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRateSample {
    pub sample_id: Uuid,
    pub rate: Rate,
    pub sampled_at_utc: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentInstrument {
    pub instrument_id: Uuid,
    pub code: String,
    pub name: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub article_id: Uuid,
    pub name: String,
    pub unit_price: Money,
    pub tax_percent: Rate,
    pub stock: i64,
    pub active: bool,
}

// ---------------------------------------------------------------------------
// Rows created by settlement
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStay {
    pub stay_id: Uuid,
    pub room_id: Uuid,
    pub guest_id: Uuid,
    pub stay_type_id: Uuid,
    pub shift_id: Uuid,
    pub entry_at_utc: DateTime<Utc>,
    pub exit_at_utc: DateTime<Utc>,
    pub duration_hours: i32,
    pub price: Money,
    pub notes: Option<String>,
    pub created_by: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSale {
    pub sale_id: Uuid,
    pub shift_id: Uuid,
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub created_at_utc: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSaleLine {
    pub line_id: Uuid,
    pub sale_id: Uuid,
    pub article_id: Uuid,
    pub quantity: i64,
    pub unit_price: Money,
    pub tax_percent: Rate,
    pub subtotal: Money,
    pub tax: Money,
}
