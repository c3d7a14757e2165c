//! Immutable, validated settlement requests.
//!
//! Requests are validated once, at construction.  Orchestrators only ever see
//! a request that passed these checks, so they never re-check field presence.

use std::collections::HashSet;

use uuid::Uuid;

use crate::error::SettlementError;
use crate::money::Money;

const MAX_TEXT_LEN: usize = 200;

fn required_text(field: &str, value: &str) -> Result<String, SettlementError> {
    let v = value.trim();
    if v.is_empty() {
        return Err(SettlementError::invalid(format!("{field} is required")));
    }
    if v.chars().count() > MAX_TEXT_LEN {
        return Err(SettlementError::invalid(format!(
            "{field} exceeds {MAX_TEXT_LEN} characters"
        )));
    }
    Ok(v.to_string())
}

fn optional_text(field: &str, value: Option<&str>) -> Result<Option<String>, SettlementError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => required_text(field, v).map(Some),
    }
}

// ---------------------------------------------------------------------------
// Guest
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuestDetails {
    document: String,
    name: String,
    phone: Option<String>,
}

impl GuestDetails {
    pub fn new(document: &str, name: &str, phone: Option<&str>) -> Result<Self, SettlementError> {
        Ok(Self {
            document: required_text("guest.document", document)?,
            name: required_text("guest.name", name)?,
            phone: optional_text("guest.phone", phone)?,
        })
    }

    pub fn document(&self) -> &str {
        &self.document
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }
}

// ---------------------------------------------------------------------------
// Payment entry
// ---------------------------------------------------------------------------

/// One instrument's contribution, in the payer's currency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentEntry {
    instrument: String,
    amount: Money,
    is_foreign_currency: bool,
    pre_converted: Option<Money>,
    reference: Option<String>,
}

impl PaymentEntry {
    pub fn new(
        instrument: &str,
        amount: Money,
        is_foreign_currency: bool,
        pre_converted: Option<Money>,
        reference: Option<&str>,
    ) -> Result<Self, SettlementError> {
        let instrument = required_text("payment.instrument", instrument)?.to_ascii_uppercase();
        if !amount.is_positive() {
            return Err(SettlementError::invalid("payment.amount must be positive"));
        }
        if let Some(c) = pre_converted {
            if !c.is_positive() {
                return Err(SettlementError::invalid(
                    "payment.convertedAmount must be positive",
                ));
            }
        }
        Ok(Self {
            instrument,
            amount,
            is_foreign_currency,
            pre_converted,
            reference: optional_text("payment.reference", reference)?,
        })
    }

    /// Settlement-currency entry with no reference; handy for tests.
    pub fn local(instrument: &str, amount: Money) -> Result<Self, SettlementError> {
        Self::new(instrument, amount, false, None, None)
    }

    /// Foreign-currency entry converted at settlement time.
    pub fn foreign(instrument: &str, amount: Money) -> Result<Self, SettlementError> {
        Self::new(instrument, amount, true, None, None)
    }

    /// Instrument code, upper-cased.
    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    pub fn amount(&self) -> Money {
        self.amount
    }

    pub fn is_foreign_currency(&self) -> bool {
        self.is_foreign_currency
    }

    pub fn pre_converted(&self) -> Option<Money> {
        self.pre_converted
    }

    pub fn reference(&self) -> Option<&str> {
        self.reference.as_deref()
    }
}

// ---------------------------------------------------------------------------
// Check-in
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckinRequest {
    room_id: Uuid,
    stay_type_id: Uuid,
    guest: GuestDetails,
    payments: Vec<PaymentEntry>,
    acting_user_id: Uuid,
    notes: Option<String>,
}

impl CheckinRequest {
    pub fn new(
        room_id: Uuid,
        stay_type_id: Uuid,
        guest: GuestDetails,
        payments: Vec<PaymentEntry>,
        acting_user_id: Uuid,
        notes: Option<&str>,
    ) -> Result<Self, SettlementError> {
        if room_id.is_nil() {
            return Err(SettlementError::invalid("roomId is required"));
        }
        if stay_type_id.is_nil() {
            return Err(SettlementError::invalid("stayTypeId is required"));
        }
        if acting_user_id.is_nil() {
            return Err(SettlementError::invalid("actingUserId is required"));
        }
        Ok(Self {
            room_id,
            stay_type_id,
            guest,
            payments,
            acting_user_id,
            notes: notes.map(str::trim).filter(|n| !n.is_empty()).map(str::to_string),
        })
    }

    pub fn room_id(&self) -> Uuid {
        self.room_id
    }

    pub fn stay_type_id(&self) -> Uuid {
        self.stay_type_id
    }

    pub fn guest(&self) -> &GuestDetails {
        &self.guest
    }

    pub fn payments(&self) -> &[PaymentEntry] {
        &self.payments
    }

    pub fn acting_user_id(&self) -> Uuid {
        self.acting_user_id
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }
}

// ---------------------------------------------------------------------------
// Sale
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaleLineRequest {
    pub article_id: Uuid,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleRequest {
    lines: Vec<SaleLineRequest>,
    payments: Vec<PaymentEntry>,
    acting_user_id: Uuid,
    notes: Option<String>,
}

impl SaleRequest {
    pub fn new(
        lines: Vec<SaleLineRequest>,
        payments: Vec<PaymentEntry>,
        acting_user_id: Uuid,
        notes: Option<&str>,
    ) -> Result<Self, SettlementError> {
        if lines.is_empty() {
            return Err(SettlementError::invalid("at least one sale line is required"));
        }
        let mut seen = HashSet::new();
        for line in &lines {
            if line.article_id.is_nil() {
                return Err(SettlementError::invalid("lines[].articleId is required"));
            }
            if line.quantity <= 0 {
                return Err(SettlementError::invalid("lines[].quantity must be positive"));
            }
            if !seen.insert(line.article_id) {
                return Err(SettlementError::invalid(format!(
                    "article {} appears on more than one line",
                    line.article_id
                )));
            }
        }
        if acting_user_id.is_nil() {
            return Err(SettlementError::invalid("actingUserId is required"));
        }
        Ok(Self {
            lines,
            payments,
            acting_user_id,
            notes: notes.map(str::trim).filter(|n| !n.is_empty()).map(str::to_string),
        })
    }

    pub fn lines(&self) -> &[SaleLineRequest] {
        &self.lines
    }

    pub fn payments(&self) -> &[PaymentEntry] {
        &self.payments
    }

    pub fn acting_user_id(&self) -> Uuid {
        self.acting_user_id
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }
}
