//! Stay check-in settlement.
//!
//! Shift Gate → (begin) → Room Allocator → Guest Resolver → Price Calculator
//! → Payment Allocator → stay + ledger writes → room flip → commit.
//!
//! The shift gate runs before the transaction exists, so a missing shift
//! leaves nothing to roll back.  Every later failure rolls the whole
//! transaction back before the error is returned; the room is flipped to
//! `Occupied` only as the last write.

use chrono::{DateTime, Duration, Utc};
use tracing::{error, info};
use uuid::Uuid;

use crate::error::SettlementError;
use crate::ledger::{payment_events, OperationKind, OperationRef, PaymentSettled};
use crate::money::{Money, Rate};
use crate::payment::allocate;
use crate::pricing::price_stay;
use crate::request::CheckinRequest;
use crate::settle::{abort, resolve_exchange_rate, resolve_instruments, write_payments, SettlementPolicy};
use crate::shift::current_open_shift;
use crate::stage::{SettlementStage, StageTracker};
use crate::store::{SettlementStore, SettlementTx};
use crate::types::{NewStay, RoomState, Shift};

/// Everything the caller learns from a committed check-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckinReceipt {
    pub stay_id: Uuid,
    pub shift_id: Uuid,
    pub room_id: Uuid,
    pub room_number: String,
    pub guest_id: Uuid,
    pub guest_created: bool,
    pub guest_visit_count: i32,
    pub stay_type_id: Uuid,
    pub entry_at_utc: DateTime<Utc>,
    pub exit_at_utc: DateTime<Utc>,
    pub duration_hours: i32,
    pub price_owed: Money,
    pub amount_paid: Money,
    pub exchange_rate: Option<Rate>,
    pub change: Money,
    pub payments: Vec<PaymentSettled>,
}

/// Allocate a room to a guest and settle payment for the stay, atomically.
pub async fn settle_checkin<S>(
    store: &S,
    policy: &SettlementPolicy,
    req: &CheckinRequest,
    now: DateTime<Utc>,
) -> Result<CheckinReceipt, SettlementError>
where
    S: SettlementStore + ?Sized,
{
    let mut stages = StageTracker::checkin();

    let shift = current_open_shift(store).await?;
    stages.advance(SettlementStage::ShiftChecked)?;

    let mut tx = store.begin().await?;

    let receipt = match checkin_in_tx(&mut tx, &mut stages, &shift, policy, req, now).await {
        Ok(r) => r,
        Err(err) => {
            abort(tx, &mut stages, "checkin", &err).await;
            return Err(err);
        }
    };

    if let Err(e) = tx.commit().await {
        let _ = stages.roll_back();
        error!(room_id = %req.room_id(), error = %format!("{e:#}"), "check-in commit failed");
        return Err(SettlementError::Storage(e.context("checkin commit failed")));
    }
    stages.advance(SettlementStage::Committed)?;

    info!(
        stay_id = %receipt.stay_id,
        room_id = %receipt.room_id,
        guest_id = %receipt.guest_id,
        shift_id = %receipt.shift_id,
        price = %receipt.price_owed,
        paid = %receipt.amount_paid,
        "check-in committed"
    );
    Ok(receipt)
}

async fn checkin_in_tx<T: SettlementTx>(
    tx: &mut T,
    stages: &mut StageTracker,
    shift: &Shift,
    policy: &SettlementPolicy,
    req: &CheckinRequest,
    now: DateTime<Utc>,
) -> Result<CheckinReceipt, SettlementError> {
    // Re-read under the transaction lock; an earlier read elsewhere proves
    // nothing about availability at commit time.
    let room = tx
        .lock_room(req.room_id())
        .await?
        .ok_or(SettlementError::RoomNotFound(req.room_id()))?;
    if !room.is_allocatable() {
        return Err(SettlementError::RoomNotAvailable(room.room_id));
    }
    stages.advance(SettlementStage::RoomAllocated)?;

    let guest = tx.resolve_guest(req.guest(), now).await?;
    stages.advance(SettlementStage::GuestResolved)?;

    let stay_type = tx
        .stay_type(req.stay_type_id())
        .await?
        .ok_or(SettlementError::StayTypeNotFound(req.stay_type_id()))?;
    let price = price_stay(&stay_type)?;
    stages.advance(SettlementStage::Priced)?;

    let rate = resolve_exchange_rate(tx, policy, req.payments(), now).await?;
    let allocation = allocate(req.payments(), price.amount, rate)?;
    let instruments = resolve_instruments(tx, &allocation).await?;
    stages.advance(SettlementStage::PaymentAllocated)?;

    let stay_id = Uuid::new_v4();
    let exit_at_utc = now
        .checked_add_signed(Duration::hours(i64::from(price.duration_hours)))
        .ok_or_else(|| SettlementError::invalid("exit time out of range"))?;

    tx.insert_stay(&NewStay {
        stay_id,
        room_id: room.room_id,
        guest_id: guest.guest_id,
        stay_type_id: stay_type.stay_type_id,
        shift_id: shift.shift_id,
        entry_at_utc: now,
        exit_at_utc,
        duration_hours: price.duration_hours,
        price: price.amount,
        notes: req.notes().map(str::to_string),
        created_by: req.acting_user_id(),
    })
    .await?;

    let payments = payment_events(
        OperationRef {
            kind: OperationKind::Stay,
            id: stay_id,
        },
        shift.shift_id,
        req.acting_user_id(),
        &allocation,
        &instruments,
        now,
    )?;
    write_payments(tx, &payments).await?;
    stages.advance(SettlementStage::LedgerWritten)?;

    tx.set_room_state(room.room_id, RoomState::Occupied).await?;
    stages.advance(SettlementStage::RoomFlipped)?;

    Ok(CheckinReceipt {
        stay_id,
        shift_id: shift.shift_id,
        room_id: room.room_id,
        room_number: room.number,
        guest_id: guest.guest_id,
        guest_created: guest.created,
        guest_visit_count: guest.visit_count,
        stay_type_id: stay_type.stay_type_id,
        entry_at_utc: now,
        exit_at_utc,
        duration_hours: price.duration_hours,
        price_owed: allocation.amount_owed,
        amount_paid: allocation.total_paid,
        exchange_rate: rate,
        change: allocation.change,
        payments,
    })
}
