//! Storage seams for the settlement workflows.
//!
//! [`SettlementStore`] hands out [`SettlementTx`] units of work.  Every
//! invariant that spans rows (room occupancy, single open shift, unique guest
//! document) is enforced by the backing store under the transaction, never by
//! in-process locks.
//!
//! A transaction that is dropped without `commit` must roll back; request
//! timeouts rely on this.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::SettlementError;
use crate::ledger::{LedgerProjection, PaymentSettled};
use crate::money::Rate;
use crate::request::GuestDetails;
use crate::types::{
    Article, ExchangeRateSample, GuestResolution, NewSale, NewSaleLine, NewShift, NewStay,
    PaymentInstrument, Room, RoomState, Shift, StayType,
};

#[async_trait]
pub trait SettlementStore: Send + Sync + 'static {
    type Tx: SettlementTx;

    /// Most recent shift in state `OPEN`, read outside any transaction.
    async fn current_open_shift(&self) -> Result<Option<Shift>>;

    async fn begin(&self) -> Result<Self::Tx>;
}

#[async_trait]
pub trait SettlementTx: Send {
    /// Read the room row and lock it for the rest of the transaction.
    async fn lock_room(&mut self, room_id: Uuid) -> Result<Option<Room>>;

    async fn set_room_state(&mut self, room_id: Uuid, state: RoomState) -> Result<()>;

    /// Reuse the guest with this document (bumping the visit counter and
    /// last-visit time) or create it with zero prior visits.
    async fn resolve_guest(
        &mut self,
        guest: &GuestDetails,
        at: DateTime<Utc>,
    ) -> Result<GuestResolution>;

    async fn stay_type(&mut self, stay_type_id: Uuid) -> Result<Option<StayType>>;

    async fn latest_exchange_rate(&mut self) -> Result<Option<ExchangeRateSample>>;

    async fn payment_instrument(&mut self, code: &str) -> Result<Option<PaymentInstrument>>;

    async fn insert_stay(&mut self, stay: &NewStay) -> Result<()>;

    async fn project_payment(
        &mut self,
        projection: LedgerProjection,
        event: &PaymentSettled,
    ) -> Result<()>;

    /// Read the article row and lock it for the rest of the transaction.
    async fn lock_article(&mut self, article_id: Uuid) -> Result<Option<Article>>;

    async fn insert_sale(&mut self, sale: &NewSale) -> Result<()>;

    async fn insert_sale_line(&mut self, line: &NewSaleLine) -> Result<()>;

    async fn decrement_stock(&mut self, article_id: Uuid, quantity: i64) -> Result<()>;

    async fn commit(self) -> Result<()>;

    async fn rollback(self) -> Result<()>;
}

/// Operator actions around the settlement workflows: opening and closing
/// shifts and recording exchange-rate samples.
#[async_trait]
pub trait FrontDeskAdmin: Send + Sync + 'static {
    /// Fails with `ShiftAlreadyOpen` when another shift is open.
    async fn open_shift(&self, shift: &NewShift) -> Result<Shift, SettlementError>;

    async fn close_shift(
        &self,
        shift_id: Uuid,
        closed_by: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Shift, SettlementError>;

    async fn record_exchange_rate(
        &self,
        rate: Rate,
        sampled_at: DateTime<Utc>,
    ) -> Result<ExchangeRateSample, SettlementError>;

    async fn latest_exchange_rate(&self) -> Result<Option<ExchangeRateSample>>;
}

/// Everything the daemon needs from one backing store.
pub trait FrontDeskStore: SettlementStore + FrontDeskAdmin {}

impl<T: SettlementStore + FrontDeskAdmin> FrontDeskStore for T {}
