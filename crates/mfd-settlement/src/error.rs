//! Settlement failure taxonomy.
//!
//! Every failure carries a short human-readable reason (`Display`) and an
//! [`ErrorClass`].  Callers never need more than the class to decide what to
//! do; storage internals are kept in the error source and never rendered.

use std::fmt;

use uuid::Uuid;

use crate::money::Money;
use crate::stage::TransitionError;

/// Coarse classification surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Operational precondition missing (no open shift). Not retryable until
    /// an operator acts.
    Precondition,
    /// Contended resource changed under us (room taken, stock gone, shift
    /// already open). Retryable against a different target.
    Conflict,
    /// A referenced row does not exist.
    NotFound,
    /// Bad input. Retryable after correcting the request.
    Validation,
    /// Unexpected storage failure. Always rolled back.
    Storage,
}

impl ErrorClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorClass::Precondition => "precondition",
            ErrorClass::Conflict => "conflict",
            ErrorClass::NotFound => "not_found",
            ErrorClass::Validation => "validation",
            ErrorClass::Storage => "storage",
        }
    }
}

#[derive(Debug)]
pub enum SettlementError {
    NoOpenShift,
    ShiftAlreadyOpen,
    ShiftNotFound(Uuid),
    ShiftNotOpen(Uuid),
    RoomNotFound(Uuid),
    RoomNotAvailable(Uuid),
    StayTypeNotFound(Uuid),
    ArticleNotFound(Uuid),
    InsufficientStock {
        article_id: Uuid,
        requested: i64,
        available: i64,
    },
    UnknownInstrument(String),
    ExchangeRateUnavailable,
    ExchangeRateStale {
        sampled_on: chrono::NaiveDate,
        settlement_on: chrono::NaiveDate,
    },
    InsufficientPayment {
        owed: Money,
        paid: Money,
        shortfall: Money,
    },
    AmountOutOfRange,
    Invalid(String),
    Storage(anyhow::Error),
}

impl SettlementError {
    pub fn class(&self) -> ErrorClass {
        match self {
            SettlementError::NoOpenShift => ErrorClass::Precondition,
            SettlementError::ShiftAlreadyOpen
            | SettlementError::ShiftNotOpen(_)
            | SettlementError::RoomNotAvailable(_)
            | SettlementError::InsufficientStock { .. } => ErrorClass::Conflict,
            SettlementError::ShiftNotFound(_)
            | SettlementError::RoomNotFound(_)
            | SettlementError::StayTypeNotFound(_)
            | SettlementError::ArticleNotFound(_) => ErrorClass::NotFound,
            SettlementError::UnknownInstrument(_)
            | SettlementError::ExchangeRateUnavailable
            | SettlementError::ExchangeRateStale { .. }
            | SettlementError::InsufficientPayment { .. }
            | SettlementError::AmountOutOfRange
            | SettlementError::Invalid(_) => ErrorClass::Validation,
            SettlementError::Storage(_) => ErrorClass::Storage,
        }
    }

    /// Amount still owed, for `InsufficientPayment` only.
    pub fn shortfall(&self) -> Option<Money> {
        match self {
            SettlementError::InsufficientPayment { shortfall, .. } => Some(*shortfall),
            _ => None,
        }
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        SettlementError::Invalid(msg.into())
    }
}

impl fmt::Display for SettlementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettlementError::NoOpenShift => {
                write!(f, "operation forbidden: no shift is currently open")
            }
            SettlementError::ShiftAlreadyOpen => write!(f, "a shift is already open"),
            SettlementError::ShiftNotFound(id) => write!(f, "shift not found: {id}"),
            SettlementError::ShiftNotOpen(id) => write!(f, "shift is not open: {id}"),
            SettlementError::RoomNotFound(id) => write!(f, "room not found: {id}"),
            SettlementError::RoomNotAvailable(id) => write!(f, "room not available: {id}"),
            SettlementError::StayTypeNotFound(id) => write!(f, "stay type not found: {id}"),
            SettlementError::ArticleNotFound(id) => write!(f, "article not found: {id}"),
            SettlementError::InsufficientStock {
                article_id,
                requested,
                available,
            } => write!(
                f,
                "insufficient stock for article {article_id}: requested {requested}, available {available}"
            ),
            SettlementError::UnknownInstrument(code) => {
                write!(f, "unknown payment instrument: {code}")
            }
            SettlementError::ExchangeRateUnavailable => write!(f, "no exchange rate available"),
            SettlementError::ExchangeRateStale {
                sampled_on,
                settlement_on,
            } => write!(
                f,
                "exchange rate is stale: sampled {sampled_on}, settling {settlement_on}"
            ),
            SettlementError::InsufficientPayment {
                owed,
                paid,
                shortfall,
            } => write!(
                f,
                "insufficient payment: owed {owed}, paid {paid}, short {shortfall}"
            ),
            SettlementError::AmountOutOfRange => write!(f, "amount out of range"),
            SettlementError::Invalid(msg) => write!(f, "invalid request: {msg}"),
            // Internals stay in the source chain; callers only see the class.
            SettlementError::Storage(_) => write!(f, "storage failure"),
        }
    }
}

impl std::error::Error for SettlementError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SettlementError::Storage(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for SettlementError {
    fn from(e: anyhow::Error) -> Self {
        SettlementError::Storage(e)
    }
}

impl From<TransitionError> for SettlementError {
    fn from(e: TransitionError) -> Self {
        SettlementError::Storage(anyhow::Error::new(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn storage_display_hides_internals() {
        let e = SettlementError::from(anyhow!("relation \"stays\" does not exist"));
        assert_eq!(e.to_string(), "storage failure");
        assert_eq!(e.class(), ErrorClass::Storage);
        let src = std::error::Error::source(&e).expect("source kept");
        assert!(src.to_string().contains("stays"));
    }

    #[test]
    fn classes_follow_taxonomy() {
        assert_eq!(SettlementError::NoOpenShift.class(), ErrorClass::Precondition);
        assert_eq!(
            SettlementError::RoomNotAvailable(Uuid::nil()).class(),
            ErrorClass::Conflict
        );
        assert_eq!(
            SettlementError::StayTypeNotFound(Uuid::nil()).class(),
            ErrorClass::NotFound
        );
        let short = SettlementError::InsufficientPayment {
            owed: Money::from_units(50).unwrap(),
            paid: Money::from_units(40).unwrap(),
            shortfall: Money::from_units(10).unwrap(),
        };
        assert_eq!(short.class(), ErrorClass::Validation);
        assert_eq!(short.shortfall(), Money::from_units(10));
        assert_eq!(
            short.to_string(),
            "insufficient payment: owed 50.00, paid 40.00, short 10.00"
        );
    }
}
