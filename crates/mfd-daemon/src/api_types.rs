//! Request and response types for all mfd-daemon HTTP endpoints.
//!
//! Request bodies are camelCase JSON and are turned into validated domain
//! requests with `into_request`. Identifier and text fields default when
//! absent so that a missing field surfaces as a named validation error rather
//! than a generic decode failure.

use axum::http::StatusCode;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use mfd_settlement::{
    CheckinReceipt, CheckinRequest, ErrorClass, ExchangeRateSample, GuestDetails, Money,
    NewSaleLine, PaymentEntry, PaymentSettled, Rate, SaleLineRequest, SaleReceipt, SaleRequest,
    SettlementError, Shift,
};

// ---------------------------------------------------------------------------
// /health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Body of every non-2xx response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    /// "precondition" | "conflict" | "not_found" | "validation" | "storage"
    pub class: &'static str,
    /// Amount still owed, on insufficient payment only.
    pub shortfall: Option<Money>,
}

impl ErrorResponse {
    pub fn from_error(err: &SettlementError) -> Self {
        Self {
            error: err.to_string(),
            class: err.class().as_str(),
            shortfall: err.shortfall(),
        }
    }

    /// A body that could not be decoded at all.
    pub fn malformed(reason: String) -> Self {
        Self {
            error: reason,
            class: ErrorClass::Validation.as_str(),
            shortfall: None,
        }
    }
}

/// HTTP status for a settlement failure.
///
/// A room that cannot be allocated reports 404 like a missing room; the
/// remaining conflicts are administrative and report 409.
pub fn status_for(err: &SettlementError) -> StatusCode {
    match (err.class(), err) {
        (_, SettlementError::RoomNotAvailable(_)) => StatusCode::NOT_FOUND,
        (ErrorClass::Precondition, _) => StatusCode::FORBIDDEN,
        (ErrorClass::NotFound, _) => StatusCode::NOT_FOUND,
        (ErrorClass::Conflict, _) => StatusCode::CONFLICT,
        (ErrorClass::Validation, _) => StatusCode::BAD_REQUEST,
        (ErrorClass::Storage, _) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// ---------------------------------------------------------------------------
// Shared request pieces
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestBody {
    #[serde(default)]
    pub document: String,
    #[serde(default)]
    pub name: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentBody {
    pub instrument: String,
    pub amount: Money,
    #[serde(default)]
    pub is_foreign_currency: bool,
    /// Amount already converted to settlement currency by the caller.
    pub converted_amount: Option<Money>,
    pub reference: Option<String>,
}

impl PaymentBody {
    fn into_entry(self) -> Result<PaymentEntry, SettlementError> {
        PaymentEntry::new(
            &self.instrument,
            self.amount,
            self.is_foreign_currency,
            self.converted_amount,
            self.reference.as_deref(),
        )
    }
}

fn entries(payments: Vec<PaymentBody>) -> Result<Vec<PaymentEntry>, SettlementError> {
    payments.into_iter().map(PaymentBody::into_entry).collect()
}

// ---------------------------------------------------------------------------
// POST /checkin
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckinBody {
    #[serde(default)]
    pub room_id: Uuid,
    #[serde(default)]
    pub stay_type_id: Uuid,
    #[serde(default)]
    pub guest: GuestBody,
    #[serde(default)]
    pub payments: Vec<PaymentBody>,
    #[serde(default)]
    pub acting_user_id: Uuid,
    pub notes: Option<String>,
}

impl CheckinBody {
    pub fn into_request(self) -> Result<CheckinRequest, SettlementError> {
        let guest = GuestDetails::new(
            &self.guest.document,
            &self.guest.name,
            self.guest.phone.as_deref(),
        )?;
        CheckinRequest::new(
            self.room_id,
            self.stay_type_id,
            guest,
            entries(self.payments)?,
            self.acting_user_id,
            self.notes.as_deref(),
        )
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckinResponse {
    pub stay_id: Uuid,
    pub shift_id: Uuid,
    pub room_id: Uuid,
    pub room_number: String,
    pub guest_id: Uuid,
    pub guest_created: bool,
    pub guest_visit_count: i32,
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub duration_hours: i32,
    pub price_owed: Money,
    pub amount_paid: Money,
    pub exchange_rate: Option<Rate>,
    pub change: Money,
    pub payments: Vec<PaymentSettled>,
}

impl From<CheckinReceipt> for CheckinResponse {
    fn from(r: CheckinReceipt) -> Self {
        Self {
            stay_id: r.stay_id,
            shift_id: r.shift_id,
            room_id: r.room_id,
            room_number: r.room_number,
            guest_id: r.guest_id,
            guest_created: r.guest_created,
            guest_visit_count: r.guest_visit_count,
            entry_time: r.entry_at_utc,
            exit_time: r.exit_at_utc,
            duration_hours: r.duration_hours,
            price_owed: r.price_owed,
            amount_paid: r.amount_paid,
            exchange_rate: r.exchange_rate,
            change: r.change,
            payments: r.payments,
        }
    }
}

// ---------------------------------------------------------------------------
// POST /sales
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleLineBody {
    pub article_id: Uuid,
    pub quantity: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleBody {
    #[serde(default)]
    pub lines: Vec<SaleLineBody>,
    #[serde(default)]
    pub payments: Vec<PaymentBody>,
    #[serde(default)]
    pub acting_user_id: Uuid,
    pub notes: Option<String>,
}

impl SaleBody {
    pub fn into_request(self) -> Result<SaleRequest, SettlementError> {
        let lines = self
            .lines
            .iter()
            .map(|l| SaleLineRequest {
                article_id: l.article_id,
                quantity: l.quantity,
            })
            .collect();
        SaleRequest::new(
            lines,
            entries(self.payments)?,
            self.acting_user_id,
            self.notes.as_deref(),
        )
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleResponse {
    pub sale_id: Uuid,
    pub shift_id: Uuid,
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
    pub amount_paid: Money,
    pub exchange_rate: Option<Rate>,
    pub change: Money,
    pub lines: Vec<NewSaleLine>,
    pub payments: Vec<PaymentSettled>,
}

impl From<SaleReceipt> for SaleResponse {
    fn from(r: SaleReceipt) -> Self {
        Self {
            sale_id: r.sale_id,
            shift_id: r.shift_id,
            subtotal: r.subtotal,
            tax: r.tax,
            total: r.total,
            amount_paid: r.amount_paid,
            exchange_rate: r.exchange_rate,
            change: r.change,
            lines: r.lines,
            payments: r.payments,
        }
    }
}

// ---------------------------------------------------------------------------
// Shifts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenShiftBody {
    #[serde(default)]
    pub shift_type_id: Uuid,
    #[serde(default)]
    pub opened_by: Uuid,
    /// Defaults to today in the settlement timezone.
    pub work_date: Option<NaiveDate>,
    pub opening_cash: Option<Money>,
    pub opening_foreign: Option<Money>,
    pub exchange_rate: Rate,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseShiftBody {
    #[serde(default)]
    pub closed_by: Uuid,
}

#[derive(Debug, Clone, Serialize)]
pub struct CurrentShiftResponse {
    pub shift: Option<Shift>,
}

// ---------------------------------------------------------------------------
// Exchange rates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct RecordRateBody {
    pub rate: Rate,
}

#[derive(Debug, Clone, Serialize)]
pub struct LatestRateResponse {
    pub sample: Option<ExchangeRateSample>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_taken_is_404_but_stock_conflict_is_409() {
        assert_eq!(
            status_for(&SettlementError::RoomNotAvailable(Uuid::new_v4())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&SettlementError::InsufficientStock {
                article_id: Uuid::new_v4(),
                requested: 2,
                available: 1,
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(status_for(&SettlementError::ShiftAlreadyOpen), StatusCode::CONFLICT);
        assert_eq!(status_for(&SettlementError::NoOpenShift), StatusCode::FORBIDDEN);
    }

    #[test]
    fn storage_failure_hides_its_cause() {
        let err = SettlementError::Storage(anyhow::anyhow!("relation \"stays\" does not exist"));
        let body = ErrorResponse::from_error(&err);
        assert_eq!(status_for(&err), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.class, "storage");
        assert!(!body.error.contains("stays"));
    }

    #[test]
    fn missing_guest_document_is_a_named_validation_error() {
        let body: CheckinBody = serde_json::from_str(
            r#"{"roomId":"7f9c1b2e-0000-4000-8000-000000000001",
                "stayTypeId":"7f9c1b2e-0000-4000-8000-000000000002",
                "guest":{"name":"Ana"},
                "payments":[{"instrument":"cash","amount":50}],
                "actingUserId":"7f9c1b2e-0000-4000-8000-000000000003"}"#,
        )
        .unwrap();
        let err = body.into_request().unwrap_err();
        assert!(err.to_string().contains("document"), "got {err}");
    }
}
