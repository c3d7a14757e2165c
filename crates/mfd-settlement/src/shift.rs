//! Shift Gate.

use crate::error::SettlementError;
use crate::store::SettlementStore;
use crate::types::{NewShift, Shift};

/// The currently open shift, or `NoOpenShift`.
///
/// Runs before any transaction is opened; has no side effects.
pub async fn current_open_shift<S>(store: &S) -> Result<Shift, SettlementError>
where
    S: SettlementStore + ?Sized,
{
    store
        .current_open_shift()
        .await?
        .ok_or(SettlementError::NoOpenShift)
}

/// Input checks shared by every `FrontDeskAdmin::open_shift` implementation.
pub fn validate_new_shift(shift: &NewShift) -> Result<(), SettlementError> {
    if shift.shift_type_id.is_nil() {
        return Err(SettlementError::invalid("shiftTypeId is required"));
    }
    if shift.opened_by.is_nil() {
        return Err(SettlementError::invalid("openedBy is required"));
    }
    if shift.opening_cash.is_negative() || shift.opening_foreign.is_negative() {
        return Err(SettlementError::invalid("opening float cannot be negative"));
    }
    if !shift.exchange_rate.is_positive() {
        return Err(SettlementError::invalid("exchange rate must be positive"));
    }
    Ok(())
}
