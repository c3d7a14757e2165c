//! In-process scenario tests for the settlement endpoints.
//!
//! The router is built over the in-memory store and driven via
//! `tower::ServiceExt::oneshot`; no socket, no database.

use std::sync::Arc;

use axum::http::{Request, StatusCode};
use chrono::Utc;
use http_body_util::BodyExt;
use mfd_daemon::{routes, state};
use mfd_settlement::{RoomState, SettlementPolicy};
use mfd_testkit::{DeskFixture, MemoryStore};
use serde_json::json;
use tower::ServiceExt; // oneshot

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn make_router(store: &MemoryStore) -> axum::Router {
    let st = Arc::new(state::AppState::new(
        Arc::new(store.clone()),
        SettlementPolicy::default(),
    ));
    routes::build_router(st)
}

async fn call(router: axum::Router, req: Request<axum::body::Body>) -> (StatusCode, bytes::Bytes) {
    let resp = router.oneshot(req).await.expect("oneshot failed");
    let status = resp.status();
    let body = resp
        .into_body()
        .collect()
        .await
        .expect("body collect failed")
        .to_bytes();
    (status, body)
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<axum::body::Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(axum::body::Body::from(body.to_string()))
        .unwrap()
}

fn parse_json(b: bytes::Bytes) -> serde_json::Value {
    serde_json::from_slice(&b).expect("body is not valid JSON")
}

fn checkin_body(fx: &DeskFixture, room: uuid::Uuid, document: &str, cash: &str) -> serde_json::Value {
    json!({
        "roomId": room,
        "stayTypeId": fx.short_stay,
        "guest": { "document": document, "name": "Ana Ruiz", "phone": "555-0101" },
        "payments": [{ "instrument": "cash", "amount": cash }],
        "actingUserId": fx.user,
    })
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_returns_200_ok_true() {
    let fx = DeskFixture::closed_desk().await;
    let req = Request::builder()
        .method("GET")
        .uri("/health")
        .body(axum::body::Body::empty())
        .unwrap();

    let (status, body) = call(make_router(&fx.store), req).await;
    assert_eq!(status, StatusCode::OK);

    let json = parse_json(body);
    assert_eq!(json["ok"], true);
    assert_eq!(json["service"], "mfd-daemon");
}

// ---------------------------------------------------------------------------
// POST /checkin
// ---------------------------------------------------------------------------

#[tokio::test]
async fn checkin_returns_201_with_receipt() {
    let fx = DeskFixture::open_desk(Utc::now()).await;

    let (status, body) = call(
        make_router(&fx.store),
        post_json("/checkin", checkin_body(&fx, fx.room_101, "DOC-700", "60")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let json = parse_json(body);
    assert_eq!(json["roomNumber"], "101");
    assert_eq!(json["priceOwed"], "50.00");
    assert_eq!(json["amountPaid"], "60.00");
    assert_eq!(json["change"], "10.00");
    assert_eq!(json["exchangeRate"], "40", "latest sample is reported");
    assert_eq!(json["payments"].as_array().map(Vec::len), Some(1));
    assert_eq!(json["payments"][0]["instrument"], "CASH");
    assert_eq!(json["payments"][0]["changeGiven"], "10.00");

    let snap = fx.store.snapshot().await;
    assert_eq!(snap.rooms[&fx.room_101].state, RoomState::Occupied);
    assert_eq!(snap.stays.len(), 1);
}

#[tokio::test]
async fn checkin_without_open_shift_is_403() {
    let fx = DeskFixture::closed_desk().await;

    let (status, body) = call(
        make_router(&fx.store),
        post_json("/checkin", checkin_body(&fx, fx.room_101, "DOC-701", "50")),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let json = parse_json(body);
    assert_eq!(json["class"], "precondition");
    assert_eq!(json["error"], "operation forbidden: no shift is currently open");
    assert_eq!(fx.store.commit_count() + fx.store.rollback_count(), 0);
}

#[tokio::test]
async fn closed_desk_is_403_before_body_fields_are_validated() {
    let fx = DeskFixture::closed_desk().await;
    let router = make_router(&fx.store);

    let (status, body) = call(
        router.clone(),
        post_json("/checkin", checkin_body(&fx, fx.room_101, "DOC-706", "0")),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(parse_json(body)["class"], "precondition");

    let empty_sale = json!({
        "lines": [],
        "payments": [{ "instrument": "CASH", "amount": "10" }],
        "actingUserId": fx.user,
    });
    let (status, body) = call(router, post_json("/sales", empty_sale)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(parse_json(body)["class"], "precondition");

    assert_eq!(fx.store.commit_count() + fx.store.rollback_count(), 0);
}

#[tokio::test]
async fn occupied_room_is_404_and_unknown_room_is_404() {
    let fx = DeskFixture::open_desk(Utc::now()).await;
    let router = make_router(&fx.store);

    let (status, _) = call(
        router.clone(),
        post_json("/checkin", checkin_body(&fx, fx.room_101, "DOC-702", "50")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = call(
        router.clone(),
        post_json("/checkin", checkin_body(&fx, fx.room_101, "DOC-703", "50")),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(parse_json(body)["class"], "conflict");

    let (status, body) = call(
        router,
        post_json("/checkin", checkin_body(&fx, uuid::Uuid::new_v4(), "DOC-703", "50")),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(parse_json(body)["class"], "not_found");
}

#[tokio::test]
async fn short_payment_is_400_with_shortfall() {
    let fx = DeskFixture::open_desk(Utc::now()).await;

    let (status, body) = call(
        make_router(&fx.store),
        post_json("/checkin", checkin_body(&fx, fx.room_101, "DOC-704", "40")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let json = parse_json(body);
    assert_eq!(json["class"], "validation");
    assert_eq!(json["shortfall"], "10.00");

    let snap = fx.store.snapshot().await;
    assert_eq!(snap.rooms[&fx.room_101].state, RoomState::Available);
    assert!(snap.stays.is_empty());
}

#[tokio::test]
async fn malformed_and_incomplete_bodies_are_400() {
    let fx = DeskFixture::open_desk(Utc::now()).await;
    let router = make_router(&fx.store);

    let req = Request::builder()
        .method("POST")
        .uri("/checkin")
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{ not json"))
        .unwrap();
    let (status, body) = call(router.clone(), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(parse_json(body)["class"], "validation");

    let mut incomplete = checkin_body(&fx, fx.room_101, "DOC-705", "50");
    incomplete["guest"] = json!({ "name": "Ana Ruiz" });
    let (status, body) = call(router, post_json("/checkin", incomplete)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let json = parse_json(body);
    assert!(
        json["error"].as_str().unwrap_or_default().contains("guest.document"),
        "got {json}"
    );
    assert!(fx.store.snapshot().await.stays.is_empty());
}

#[tokio::test]
async fn foreign_cash_is_converted_at_the_current_rate() {
    let fx = DeskFixture::open_desk(Utc::now()).await;

    let mut body = checkin_body(&fx, fx.room_102, "DOC-706", "0");
    body["payments"] = json!([
        { "instrument": "CASH_USD", "amount": 1, "isForeignCurrency": true },
        { "instrument": "CARD", "amount": "10", "reference": "AUTH-1" },
    ]);
    let (status, body) = call(make_router(&fx.store), post_json("/checkin", body)).await;
    assert_eq!(status, StatusCode::CREATED);

    let json = parse_json(body);
    assert_eq!(json["exchangeRate"], "40");
    assert_eq!(json["amountPaid"], "50.00");
    assert_eq!(json["change"], "0.00");
    assert_eq!(json["payments"][0]["convertedAmount"], "40.00");
    assert_eq!(json["payments"][1]["reference"], "AUTH-1");
}
