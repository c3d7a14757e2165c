//! Axum router and all HTTP handlers for mfd-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers. Handlers are generic over the backing store so the
//! scenario tests in `tests/` can compose the router over the in-memory store.

use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use futures_util::{Stream, StreamExt};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, error, info};
use uuid::Uuid;

use mfd_settlement::{
    current_open_shift, settle_checkin, settle_sale, ErrorClass, FrontDeskAdmin, FrontDeskStore, Money, NewShift,
    SettlementError, SettlementStore,
};

use crate::{
    api_types::{
        status_for, CheckinBody, CheckinResponse, CloseShiftBody, CurrentShiftResponse,
        ErrorResponse, HealthResponse, LatestRateResponse, OpenShiftBody, RecordRateBody,
        SaleBody, SaleResponse,
    },
    state::{AppState, BusMsg},
};

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing, timeout) are **not** applied here;
/// `main.rs` attaches them after this call so tests can use the bare router.
pub fn build_router<S: FrontDeskStore>(state: Arc<AppState<S>>) -> Router {
    Router::new()
        .route("/health", get(health::<S>))
        .route("/stream", get(stream::<S>))
        .route("/checkin", post(checkin::<S>))
        .route("/sales", post(sale::<S>))
        .route("/shifts/current", get(current_shift::<S>))
        .route("/shifts/open", post(open_shift::<S>))
        .route("/shifts/:shift_id/close", post(close_shift::<S>))
        .route("/exchange-rates", post(record_rate::<S>))
        .route("/exchange-rates/latest", get(latest_rate::<S>))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Error responses
// ---------------------------------------------------------------------------

fn error_response(err: SettlementError) -> Response {
    if err.class() == ErrorClass::Storage {
        // Full chain stays server-side.
        error!(error = ?err, "request failed on storage");
    } else {
        debug!(class = err.class().as_str(), error = %err, "request refused");
    }
    (status_for(&err), Json(ErrorResponse::from_error(&err))).into_response()
}

fn rejection_response(rej: JsonRejection) -> Response {
    debug!(error = %rej.body_text(), "malformed request body");
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::malformed(rej.body_text())),
    )
        .into_response()
}

fn storage(err: anyhow::Error) -> Response {
    error_response(SettlementError::Storage(err))
}

/// Shift gate for settlement requests. Runs ahead of field validation so a
/// closed desk answers 403 whatever the body carries.
async fn require_open_shift<S: FrontDeskStore>(st: &AppState<S>) -> Result<(), Response> {
    current_open_shift(st.store.as_ref())
        .await
        .map(|_| ())
        .map_err(error_response)
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

pub(crate) async fn health<S: FrontDeskStore>(State(st): State<Arc<AppState<S>>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service,
            version: st.build.version,
        }),
    )
}

// ---------------------------------------------------------------------------
// POST /checkin
// ---------------------------------------------------------------------------

pub(crate) async fn checkin<S: FrontDeskStore>(
    State(st): State<Arc<AppState<S>>>,
    body: Result<Json<CheckinBody>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rej) => return rejection_response(rej),
    };
    if let Err(resp) = require_open_shift(&st).await {
        return resp;
    }
    let req = match body.into_request() {
        Ok(r) => r,
        Err(e) => return error_response(e),
    };

    match settle_checkin(st.store.as_ref(), &st.policy, &req, Utc::now()).await {
        Ok(receipt) => {
            info!(stay_id = %receipt.stay_id, room = %receipt.room_number, "checkin");
            st.publish(BusMsg::StaySettled {
                stay_id: receipt.stay_id,
                room_id: receipt.room_id,
                room_number: receipt.room_number.clone(),
            });
            (StatusCode::CREATED, Json(CheckinResponse::from(receipt))).into_response()
        }
        Err(e) => error_response(e),
    }
}

// ---------------------------------------------------------------------------
// POST /sales
// ---------------------------------------------------------------------------

pub(crate) async fn sale<S: FrontDeskStore>(
    State(st): State<Arc<AppState<S>>>,
    body: Result<Json<SaleBody>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rej) => return rejection_response(rej),
    };
    if let Err(resp) = require_open_shift(&st).await {
        return resp;
    }
    let req = match body.into_request() {
        Ok(r) => r,
        Err(e) => return error_response(e),
    };

    match settle_sale(st.store.as_ref(), &st.policy, &req, Utc::now()).await {
        Ok(receipt) => {
            info!(sale_id = %receipt.sale_id, total = %receipt.total, "sale");
            st.publish(BusMsg::SaleSettled {
                sale_id: receipt.sale_id,
                total: receipt.total,
            });
            (StatusCode::CREATED, Json(SaleResponse::from(receipt))).into_response()
        }
        Err(e) => error_response(e),
    }
}

// ---------------------------------------------------------------------------
// Shifts
// ---------------------------------------------------------------------------

pub(crate) async fn current_shift<S: FrontDeskStore>(State(st): State<Arc<AppState<S>>>) -> Response {
    match SettlementStore::current_open_shift(st.store.as_ref()).await {
        Ok(shift) => (StatusCode::OK, Json(CurrentShiftResponse { shift })).into_response(),
        Err(e) => storage(e),
    }
}

pub(crate) async fn open_shift<S: FrontDeskStore>(
    State(st): State<Arc<AppState<S>>>,
    body: Result<Json<OpenShiftBody>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rej) => return rejection_response(rej),
    };

    let now = Utc::now();
    let new_shift = NewShift {
        shift_id: Uuid::new_v4(),
        shift_type_id: body.shift_type_id,
        opened_by: body.opened_by,
        work_date: body.work_date.unwrap_or_else(|| st.policy.local_date(now)),
        opening_cash: body.opening_cash.unwrap_or(Money::ZERO),
        opening_foreign: body.opening_foreign.unwrap_or(Money::ZERO),
        exchange_rate: body.exchange_rate,
        opened_at_utc: now,
    };

    match st.store.open_shift(&new_shift).await {
        Ok(shift) => {
            info!(shift_id = %shift.shift_id, work_date = %shift.work_date, "shift/open");
            st.publish(BusMsg::ShiftOpened {
                shift_id: shift.shift_id,
            });
            (StatusCode::CREATED, Json(shift)).into_response()
        }
        Err(e) => error_response(e),
    }
}

pub(crate) async fn close_shift<S: FrontDeskStore>(
    State(st): State<Arc<AppState<S>>>,
    Path(shift_id): Path<Uuid>,
    body: Result<Json<CloseShiftBody>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rej) => return rejection_response(rej),
    };
    if body.closed_by.is_nil() {
        return error_response(SettlementError::invalid("closedBy is required"));
    }

    match st.store.close_shift(shift_id, body.closed_by, Utc::now()).await {
        Ok(shift) => {
            info!(shift_id = %shift.shift_id, "shift/close");
            st.publish(BusMsg::ShiftClosed {
                shift_id: shift.shift_id,
            });
            (StatusCode::OK, Json(shift)).into_response()
        }
        Err(e) => error_response(e),
    }
}

// ---------------------------------------------------------------------------
// Exchange rates
// ---------------------------------------------------------------------------

pub(crate) async fn record_rate<S: FrontDeskStore>(
    State(st): State<Arc<AppState<S>>>,
    body: Result<Json<RecordRateBody>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rej) => return rejection_response(rej),
    };

    match st.store.record_exchange_rate(body.rate, Utc::now()).await {
        Ok(sample) => {
            info!(rate = %sample.rate, "exchange-rate/record");
            (StatusCode::CREATED, Json(sample)).into_response()
        }
        Err(e) => error_response(e),
    }
}

pub(crate) async fn latest_rate<S: FrontDeskStore>(State(st): State<Arc<AppState<S>>>) -> Response {
    match FrontDeskAdmin::latest_exchange_rate(st.store.as_ref()).await {
        Ok(sample) => (StatusCode::OK, Json(LatestRateResponse { sample })).into_response(),
        Err(e) => storage(e),
    }
}

// ---------------------------------------------------------------------------
// GET /stream  (SSE)
// ---------------------------------------------------------------------------

pub(crate) async fn stream<S: FrontDeskStore>(State(st): State<Arc<AppState<S>>>) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert("Cache-Control", HeaderValue::from_static("no-cache"));
    headers.insert("Connection", HeaderValue::from_static("keep-alive"));

    let rx = st.bus.subscribe();
    let events = broadcast_to_sse(rx);

    (headers, Sse::new(events).keep_alive(KeepAlive::new())).into_response()
}

fn broadcast_to_sse(
    rx: broadcast::Receiver<BusMsg>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    BroadcastStream::new(rx).filter_map(|msg| async move {
        match msg {
            Ok(m) => {
                let data = serde_json::to_string(&m).ok()?;
                Some(Ok(Event::default().event(m.event_name()).data(data)))
            }
            Err(_) => None, // lagged / closed
        }
    })
}
