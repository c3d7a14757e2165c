//! Transactional in-memory store.
//!
//! `begin` takes the store mutex (owned guard) and clones the state into a
//! working copy. Writes go to the copy; `commit` swaps it in, `rollback` or
//! drop discards it. Holding the guard for the whole transaction makes every
//! transaction serializable, which is stronger than what Postgres gives the
//! real store but preserves the same observable outcomes for one room.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use mfd_settlement::{
    validate_new_shift, Article, ExchangeRateSample, FrontDeskAdmin, Guest, GuestDetails,
    GuestResolution, LedgerProjection, NewSale, NewSaleLine, NewShift, NewStay,
    PaymentInstrument, PaymentSettled, Rate, Room, RoomState, SettlementError, SettlementStore,
    SettlementTx, Shift, ShiftState, StayType,
};

/// Storage step at which an injected failure fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultPoint {
    LockRoom,
    ResolveGuest,
    InsertStay,
    ProjectPayment(LedgerProjection),
    SetRoomState,
    LockArticle,
    InsertSale,
    DecrementStock,
    Commit,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    /// shift_type_id → active
    pub shift_types: BTreeMap<Uuid, bool>,
    pub shifts: Vec<Shift>,
    pub rooms: BTreeMap<Uuid, Room>,
    pub guests: BTreeMap<Uuid, Guest>,
    pub stay_types: BTreeMap<Uuid, StayType>,
    pub rate_samples: Vec<ExchangeRateSample>,
    /// code → instrument
    pub instruments: BTreeMap<String, PaymentInstrument>,
    pub stays: Vec<NewStay>,
    pub legacy_ledger: Vec<PaymentSettled>,
    pub general_ledger: Vec<PaymentSettled>,
    pub articles: BTreeMap<Uuid, Article>,
    pub sales: Vec<NewSale>,
    pub sale_lines: Vec<NewSaleLine>,
}

impl MemoryState {
    pub fn open_shift(&self) -> Option<&Shift> {
        self.shifts
            .iter()
            .filter(|s| s.state == ShiftState::Open)
            .max_by_key(|s| s.opened_at_utc)
    }

    pub fn guest_by_document(&self, document: &str) -> Option<&Guest> {
        self.guests.values().find(|g| g.document == document)
    }

    pub fn latest_rate(&self) -> Option<&ExchangeRateSample> {
        self.rate_samples.iter().max_by_key(|s| s.sampled_at_utc)
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    fault: Arc<StdMutex<Option<FaultPoint>>>,
    commits: Arc<AtomicUsize>,
    rollbacks: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a one-shot failure for the next transaction that reaches `point`.
    pub fn fail_next(&self, point: FaultPoint) {
        if let Ok(mut f) = self.fault.lock() {
            *f = Some(point);
        }
    }

    /// Mutate committed state directly (seeding, test setup).
    pub async fn with_state<R>(&self, f: impl FnOnce(&mut MemoryState) -> R) -> R {
        let mut guard = self.state.lock().await;
        f(&mut guard)
    }

    pub async fn snapshot(&self) -> MemoryState {
        self.state.lock().await.clone()
    }

    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    pub fn rollback_count(&self) -> usize {
        self.rollbacks.load(Ordering::SeqCst)
    }

    fn take_fault(&self) -> Option<FaultPoint> {
        self.fault.lock().ok().and_then(|mut f| f.take())
    }
}

pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    work: MemoryState,
    fault: Option<FaultPoint>,
    commits: Arc<AtomicUsize>,
    rollbacks: Arc<AtomicUsize>,
}

impl MemoryTx {
    fn trip(&mut self, point: FaultPoint) -> Result<()> {
        if self.fault == Some(point) {
            self.fault = None;
            bail!("injected fault at {point:?}");
        }
        Ok(())
    }
}

#[async_trait]
impl SettlementStore for MemoryStore {
    type Tx = MemoryTx;

    async fn current_open_shift(&self) -> Result<Option<Shift>> {
        Ok(self.state.lock().await.open_shift().cloned())
    }

    async fn begin(&self) -> Result<MemoryTx> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let work = guard.clone();
        Ok(MemoryTx {
            guard,
            work,
            fault: self.take_fault(),
            commits: Arc::clone(&self.commits),
            rollbacks: Arc::clone(&self.rollbacks),
        })
    }
}

#[async_trait]
impl SettlementTx for MemoryTx {
    async fn lock_room(&mut self, room_id: Uuid) -> Result<Option<Room>> {
        self.trip(FaultPoint::LockRoom)?;
        Ok(self.work.rooms.get(&room_id).cloned())
    }

    async fn set_room_state(&mut self, room_id: Uuid, state: RoomState) -> Result<()> {
        self.trip(FaultPoint::SetRoomState)?;
        let room = self
            .work
            .rooms
            .get_mut(&room_id)
            .ok_or_else(|| anyhow!("set_room_state: room {room_id} not found"))?;
        room.state = state;
        Ok(())
    }

    async fn resolve_guest(
        &mut self,
        guest: &GuestDetails,
        at: DateTime<Utc>,
    ) -> Result<GuestResolution> {
        self.trip(FaultPoint::ResolveGuest)?;
        if let Some(existing) = self
            .work
            .guests
            .values_mut()
            .find(|g| g.document == guest.document())
        {
            existing.visit_count += 1;
            existing.last_visit_at_utc = Some(at);
            if let Some(phone) = guest.phone() {
                existing.phone = Some(phone.to_string());
            }
            return Ok(GuestResolution {
                guest_id: existing.guest_id,
                visit_count: existing.visit_count,
                created: false,
            });
        }

        let guest_id = Uuid::new_v4();
        self.work.guests.insert(
            guest_id,
            Guest {
                guest_id,
                document: guest.document().to_string(),
                name: guest.name().to_string(),
                phone: guest.phone().map(str::to_string),
                visit_count: 0,
                last_visit_at_utc: Some(at),
            },
        );
        Ok(GuestResolution {
            guest_id,
            visit_count: 0,
            created: true,
        })
    }

    async fn stay_type(&mut self, stay_type_id: Uuid) -> Result<Option<StayType>> {
        Ok(self.work.stay_types.get(&stay_type_id).cloned())
    }

    async fn latest_exchange_rate(&mut self) -> Result<Option<ExchangeRateSample>> {
        Ok(self.work.latest_rate().cloned())
    }

    async fn payment_instrument(&mut self, code: &str) -> Result<Option<PaymentInstrument>> {
        Ok(self.work.instruments.get(code).cloned())
    }

    async fn insert_stay(&mut self, stay: &NewStay) -> Result<()> {
        self.trip(FaultPoint::InsertStay)?;
        if self.work.stays.iter().any(|s| s.stay_id == stay.stay_id) {
            bail!("insert_stay: duplicate stay_id {}", stay.stay_id);
        }
        self.work.stays.push(stay.clone());
        Ok(())
    }

    async fn project_payment(
        &mut self,
        projection: LedgerProjection,
        event: &PaymentSettled,
    ) -> Result<()> {
        self.trip(FaultPoint::ProjectPayment(projection))?;
        let ledger = match projection {
            LedgerProjection::Legacy => &mut self.work.legacy_ledger,
            LedgerProjection::General => &mut self.work.general_ledger,
        };
        if ledger.iter().any(|p| p.payment_id == event.payment_id) {
            bail!("project_payment: duplicate payment_id {}", event.payment_id);
        }
        ledger.push(event.clone());
        Ok(())
    }

    async fn lock_article(&mut self, article_id: Uuid) -> Result<Option<Article>> {
        self.trip(FaultPoint::LockArticle)?;
        Ok(self.work.articles.get(&article_id).cloned())
    }

    async fn insert_sale(&mut self, sale: &NewSale) -> Result<()> {
        self.trip(FaultPoint::InsertSale)?;
        self.work.sales.push(sale.clone());
        Ok(())
    }

    async fn insert_sale_line(&mut self, line: &NewSaleLine) -> Result<()> {
        self.work.sale_lines.push(line.clone());
        Ok(())
    }

    async fn decrement_stock(&mut self, article_id: Uuid, quantity: i64) -> Result<()> {
        self.trip(FaultPoint::DecrementStock)?;
        let article = self
            .work
            .articles
            .get_mut(&article_id)
            .ok_or_else(|| anyhow!("decrement_stock: article {article_id} not found"))?;
        if article.stock < quantity {
            bail!("decrement_stock: article {article_id} lacks {quantity} units");
        }
        article.stock -= quantity;
        Ok(())
    }

    async fn commit(mut self) -> Result<()> {
        self.trip(FaultPoint::Commit)?;
        *self.guard = self.work;
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl FrontDeskAdmin for MemoryStore {
    async fn open_shift(&self, shift: &NewShift) -> Result<Shift, SettlementError> {
        validate_new_shift(shift)?;
        let mut state = self.state.lock().await;

        if state.shift_types.get(&shift.shift_type_id) != Some(&true) {
            return Err(SettlementError::invalid(format!(
                "unknown or inactive shift type: {}",
                shift.shift_type_id
            )));
        }
        if state.open_shift().is_some() {
            return Err(SettlementError::ShiftAlreadyOpen);
        }

        let opened = Shift {
            shift_id: shift.shift_id,
            shift_type_id: shift.shift_type_id,
            opened_by: shift.opened_by,
            work_date: shift.work_date,
            opening_cash: shift.opening_cash,
            opening_foreign: shift.opening_foreign,
            exchange_rate: shift.exchange_rate,
            state: ShiftState::Open,
            opened_at_utc: shift.opened_at_utc,
            closed_by: None,
            closed_at_utc: None,
        };
        state.shifts.push(opened.clone());
        state.rate_samples.push(ExchangeRateSample {
            sample_id: Uuid::new_v4(),
            rate: shift.exchange_rate,
            sampled_at_utc: shift.opened_at_utc,
        });
        Ok(opened)
    }

    async fn close_shift(
        &self,
        shift_id: Uuid,
        closed_by: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Shift, SettlementError> {
        if closed_by.is_nil() {
            return Err(SettlementError::invalid("closedBy is required"));
        }
        let mut state = self.state.lock().await;
        let shift = state
            .shifts
            .iter_mut()
            .find(|s| s.shift_id == shift_id)
            .ok_or(SettlementError::ShiftNotFound(shift_id))?;
        if shift.state != ShiftState::Open {
            return Err(SettlementError::ShiftNotOpen(shift_id));
        }
        shift.state = ShiftState::Closed;
        shift.closed_by = Some(closed_by);
        shift.closed_at_utc = Some(at);
        Ok(shift.clone())
    }

    async fn record_exchange_rate(
        &self,
        rate: Rate,
        sampled_at: DateTime<Utc>,
    ) -> Result<ExchangeRateSample, SettlementError> {
        if !rate.is_positive() {
            return Err(SettlementError::invalid("exchange rate must be positive"));
        }
        let sample = ExchangeRateSample {
            sample_id: Uuid::new_v4(),
            rate,
            sampled_at_utc: sampled_at,
        };
        self.state.lock().await.rate_samples.push(sample.clone());
        Ok(sample)
    }

    async fn latest_exchange_rate(&self) -> Result<Option<ExchangeRateSample>> {
        Ok(self.state.lock().await.latest_rate().cloned())
    }
}
