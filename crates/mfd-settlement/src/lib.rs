//! mfd-settlement
//!
//! Front-desk settlement core: stay check-in and retail sale workflows.
//! - Shift gate runs before any transaction is opened
//! - Room, guest, stay, ledger and stock writes commit or roll back together
//! - Every payment is written to both ledger projections
//! - Fixed-point money; no floats anywhere on the money path
//! - Storage is reached only through the `store` traits

mod checkin;
mod sale;
mod settle;

pub mod error;
pub mod ledger;
pub mod money;
pub mod payment;
pub mod pricing;
pub mod request;
pub mod shift;
pub mod stage;
pub mod store;
pub mod types;

pub use checkin::{settle_checkin, CheckinReceipt};
pub use error::{ErrorClass, SettlementError};
pub use ledger::{
    payment_events, LedgerProjection, OperationKind, OperationRef, PaymentSettled,
    LEDGER_PROJECTIONS,
};
pub use money::{parse_micros, FixedParseError, Money, Rate, MICROS_PER_UNIT};
pub use payment::{allocate, requires_exchange_rate, AllocatedPayment, Allocation};
pub use pricing::{line_total, price_stay, LineTotal, SaleTotals, StayPrice};
pub use request::{CheckinRequest, GuestDetails, PaymentEntry, SaleLineRequest, SaleRequest};
pub use sale::{settle_sale, SaleReceipt};
pub use settle::SettlementPolicy;
pub use shift::{current_open_shift, validate_new_shift};
pub use stage::{SettlementStage, StageTracker, TransitionError, CHECKIN_PATH, SALE_PATH};
pub use store::{FrontDeskAdmin, FrontDeskStore, SettlementStore, SettlementTx};
pub use types::{
    Article, ExchangeRateSample, Guest, GuestResolution, NewSale, NewSaleLine, NewShift, NewStay,
    PaymentInstrument, Room, RoomState, Shift, ShiftState, StayType,
};
