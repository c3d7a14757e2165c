//! Payment Allocator.
//!
//! Converts each entry into settlement currency, sums, and checks the sum
//! covers the amount owed.  Pure: no storage, no clock.
//!
//! Conversion rule per entry:
//! - an explicit pre-converted amount always wins;
//! - otherwise a foreign-currency entry is `amount * rate`;
//! - otherwise the entry is already in settlement currency.

use crate::error::SettlementError;
use crate::money::{Money, Rate};
use crate::request::PaymentEntry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocatedPayment {
    pub entry: PaymentEntry,
    pub converted: Money,
    /// Rate applied, only for foreign entries converted here.
    pub rate_used: Option<Rate>,
    /// Change handed back on this entry (the whole change sits on the last
    /// entry).
    pub change_given: Money,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    pub payments: Vec<AllocatedPayment>,
    pub amount_owed: Money,
    pub total_paid: Money,
    pub change: Money,
}

/// True when at least one entry needs a live exchange rate to convert.
pub fn requires_exchange_rate(entries: &[PaymentEntry]) -> bool {
    entries
        .iter()
        .any(|e| e.is_foreign_currency() && e.pre_converted().is_none())
}

/// Converted amount and the rate applied to get it, if any.
fn convert_entry(
    entry: &PaymentEntry,
    rate: Option<Rate>,
) -> Result<(Money, Option<Rate>), SettlementError> {
    if let Some(converted) = entry.pre_converted() {
        return Ok((converted, None));
    }
    if !entry.is_foreign_currency() {
        return Ok((entry.amount(), None));
    }
    let rate = rate.ok_or(SettlementError::ExchangeRateUnavailable)?;
    if !rate.is_positive() {
        return Err(SettlementError::ExchangeRateUnavailable);
    }
    let converted = entry
        .amount()
        .convert(rate)
        .ok_or(SettlementError::AmountOutOfRange)?;
    Ok((converted, Some(rate)))
}

/// Allocate `entries` against `amount_owed`.
///
/// Zero entries is only sufficient when nothing is owed.
pub fn allocate(
    entries: &[PaymentEntry],
    amount_owed: Money,
    rate: Option<Rate>,
) -> Result<Allocation, SettlementError> {
    if amount_owed.is_negative() {
        return Err(SettlementError::invalid("amount owed cannot be negative"));
    }

    let mut payments = Vec::with_capacity(entries.len());
    let mut total_paid = Money::ZERO;
    for entry in entries {
        let (converted, rate_used) = convert_entry(entry, rate)?;
        total_paid = total_paid
            .checked_add(converted)
            .ok_or(SettlementError::AmountOutOfRange)?;
        payments.push(AllocatedPayment {
            entry: entry.clone(),
            converted,
            rate_used,
            change_given: Money::ZERO,
        });
    }

    if total_paid < amount_owed {
        return Err(SettlementError::InsufficientPayment {
            owed: amount_owed,
            paid: total_paid,
            shortfall: amount_owed - total_paid,
        });
    }

    let change = total_paid - amount_owed;
    if let Some(last) = payments.last_mut() {
        last.change_given = change;
    }

    Ok(Allocation {
        payments,
        amount_owed,
        total_paid,
        change,
    })
}
