//! Payment ledger event and its projections.
//!
//! One logical event, [`PaymentSettled`], is emitted per allocated payment.
//! Each entry in [`LEDGER_PROJECTIONS`] persists it in its own shape; the
//! orchestrators only iterate that list and never know the row layouts.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::SettlementError;
use crate::money::{Money, Rate};
use crate::payment::Allocation;
use crate::types::PaymentInstrument;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationKind {
    Stay,
    Sale,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Stay => "STAY",
            OperationKind::Sale => "SALE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationRef {
    pub kind: OperationKind,
    pub id: Uuid,
}

/// A payment applied to an operation during an open shift.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSettled {
    pub payment_id: Uuid,
    pub operation: OperationRef,
    pub shift_id: Uuid,
    pub user_id: Uuid,
    pub instrument_id: Uuid,
    pub instrument: String,
    pub amount: Money,
    pub is_foreign_currency: bool,
    pub converted_amount: Money,
    pub exchange_rate: Option<Rate>,
    pub reference: Option<String>,
    pub change_given: Money,
    pub settled_at_utc: DateTime<Utc>,
}

/// Persisted representations of a [`PaymentSettled`] event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LedgerProjection {
    /// Single-purpose ledger keyed to the stay (`stay_payments`) or sale
    /// (`sale_payments`).
    Legacy,
    /// Generalized ledger keyed by `(operation_type, operation_id)`
    /// (`payment_details`).
    General,
}

impl LedgerProjection {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerProjection::Legacy => "legacy",
            LedgerProjection::General => "general",
        }
    }
}

/// Every projection written for each payment, inside the settlement
/// transaction.
pub const LEDGER_PROJECTIONS: &[LedgerProjection] =
    &[LedgerProjection::Legacy, LedgerProjection::General];

/// Build one event per allocated payment.
///
/// `instruments` must hold the resolved instrument for each payment, in
/// allocation order.
pub fn payment_events(
    operation: OperationRef,
    shift_id: Uuid,
    user_id: Uuid,
    allocation: &Allocation,
    instruments: &[PaymentInstrument],
    at: DateTime<Utc>,
) -> Result<Vec<PaymentSettled>, SettlementError> {
    if instruments.len() != allocation.payments.len() {
        return Err(SettlementError::Storage(anyhow::anyhow!(
            "instrument resolution mismatch: {} instruments for {} payments",
            instruments.len(),
            allocation.payments.len()
        )));
    }

    Ok(allocation
        .payments
        .iter()
        .zip(instruments)
        .map(|(p, inst)| PaymentSettled {
            payment_id: Uuid::new_v4(),
            operation,
            shift_id,
            user_id,
            instrument_id: inst.instrument_id,
            instrument: inst.code.clone(),
            amount: p.entry.amount(),
            is_foreign_currency: p.entry.is_foreign_currency(),
            converted_amount: p.converted,
            exchange_rate: p.rate_used,
            reference: p.entry.reference().map(str::to_string),
            change_given: p.change_given,
            settled_at_utc: at,
        })
        .collect())
}
