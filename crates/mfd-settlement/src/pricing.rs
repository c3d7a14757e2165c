//! Price Calculator.
//!
//! Stays are a catalog lookup (fixed price for a fixed duration).  Sale lines
//! are `unit_price * quantity` plus tax at the article's percentage; totals
//! accumulate unrounded micros.

use crate::error::SettlementError;
use crate::money::{Money, Rate};
use crate::types::StayType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StayPrice {
    pub amount: Money,
    pub duration_hours: i32,
}

/// Amount owed and contracted duration for a stay type.
pub fn price_stay(stay_type: &StayType) -> Result<StayPrice, SettlementError> {
    if !stay_type.active {
        return Err(SettlementError::StayTypeNotFound(stay_type.stay_type_id));
    }
    if stay_type.duration_hours <= 0 {
        return Err(SettlementError::invalid(format!(
            "stay type {} has a non-positive duration",
            stay_type.stay_type_id
        )));
    }
    if stay_type.price.is_negative() {
        return Err(SettlementError::invalid(format!(
            "stay type {} has a negative price",
            stay_type.stay_type_id
        )));
    }
    Ok(StayPrice {
        amount: stay_type.price,
        duration_hours: stay_type.duration_hours,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineTotal {
    pub subtotal: Money,
    pub tax: Money,
}

impl LineTotal {
    pub fn total(&self) -> Money {
        self.subtotal + self.tax
    }
}

/// `subtotal = unit_price * quantity`, `tax = subtotal * tax_percent / 100`.
pub fn line_total(
    unit_price: Money,
    quantity: i64,
    tax_percent: Rate,
) -> Result<LineTotal, SettlementError> {
    let subtotal = unit_price
        .checked_mul_qty(quantity)
        .ok_or(SettlementError::AmountOutOfRange)?;
    let tax = subtotal
        .percent(tax_percent)
        .ok_or(SettlementError::AmountOutOfRange)?;
    Ok(LineTotal { subtotal, tax })
}

/// Running subtotal/tax across the lines of one sale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaleTotals {
    pub subtotal: Money,
    pub tax: Money,
}

impl SaleTotals {
    pub fn add_line(&mut self, line: &LineTotal) -> Result<(), SettlementError> {
        self.subtotal = self
            .subtotal
            .checked_add(line.subtotal)
            .ok_or(SettlementError::AmountOutOfRange)?;
        self.tax = self
            .tax
            .checked_add(line.tax)
            .ok_or(SettlementError::AmountOutOfRange)?;
        Ok(())
    }

    pub fn total(&self) -> Result<Money, SettlementError> {
        self.subtotal
            .checked_add(self.tax)
            .ok_or(SettlementError::AmountOutOfRange)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn m(s: &str) -> Money {
        Money::parse(s).unwrap()
    }

    #[test]
    fn line_total_with_tax() {
        let line = line_total(m("10"), 3, Rate::parse("16").unwrap()).unwrap();
        assert_eq!(line.subtotal, m("30"));
        assert_eq!(line.tax, m("4.80"));
        assert_eq!(line.total(), m("34.80"));
        assert_eq!(line.total().to_string(), "34.80");
    }

    #[test]
    fn totals_accumulate_without_intermediate_rounding() {
        // 0.333 * 1 at 10% = 0.0333 tax per line; rounding per line would
        // give 0.03 * 3 = 0.09, accumulation gives 0.0999 -> 0.10.
        let pct = Rate::parse("10").unwrap();
        let mut totals = SaleTotals::default();
        for _ in 0..3 {
            totals.add_line(&line_total(m("0.333"), 1, pct).unwrap()).unwrap();
        }
        assert_eq!(totals.tax, m("0.0999"));
        assert_eq!(totals.tax.to_string(), "0.10");
        assert_eq!(totals.total().unwrap(), m("1.0989"));
    }

    #[test]
    fn line_total_overflow_is_reported() {
        let err = line_total(Money::from_micros(i64::MAX), 2, Rate::ZERO).unwrap_err();
        assert!(matches!(err, SettlementError::AmountOutOfRange));
    }

    #[test]
    fn stay_price_is_catalog_lookup() {
        let st = StayType {
            stay_type_id: Uuid::new_v4(),
            name: "3 horas".to_string(),
            price: m("50"),
            duration_hours: 3,
            active: true,
        };
        let p = price_stay(&st).unwrap();
        assert_eq!(p.amount, m("50"));
        assert_eq!(p.duration_hours, 3);

        let inactive = StayType { active: false, ..st };
        assert!(matches!(
            price_stay(&inactive),
            Err(SettlementError::StayTypeNotFound(_))
        ));
    }
}
