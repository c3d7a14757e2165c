//! Retail sale: line pricing, stock decrement and the same all-or-nothing
//! guarantees as check-in.

use chrono::Utc;
use mfd_settlement::{
    settle_sale, ErrorClass, Money, OperationKind, SaleLineRequest, SaleRequest, SettlementError,
    SettlementPolicy,
};
use mfd_testkit::{cash, DeskFixture, FaultPoint};
use uuid::Uuid;

fn m(s: &str) -> Money {
    Money::parse(s).unwrap()
}

fn sale(fx: &DeskFixture, article_id: Uuid, quantity: i64, paid: &str) -> SaleRequest {
    SaleRequest::new(
        vec![SaleLineRequest { article_id, quantity }],
        vec![cash(paid)],
        fx.user,
        Some("minibar"),
    )
    .unwrap()
}

#[tokio::test]
async fn three_sodas_at_sixteen_percent() {
    let now = Utc::now();
    let fx = DeskFixture::open_desk(now).await;

    let r = settle_sale(&fx.store, &SettlementPolicy::default(), &sale(&fx, fx.soda, 3, "40"), now)
        .await
        .unwrap();

    assert_eq!(r.subtotal, m("30"));
    assert_eq!(r.tax, m("4.80"));
    assert_eq!(r.total, m("34.80"));
    assert_eq!(r.change, m("5.20"));
    assert_eq!(r.lines.len(), 1);

    let state = fx.store.snapshot().await;
    assert_eq!(state.articles[&fx.soda].stock, 2);
    assert_eq!(state.sales.len(), 1);
    assert_eq!(state.sale_lines.len(), 1);
    assert_eq!(state.general_ledger.len(), 1);
    assert_eq!(state.general_ledger[0].operation.kind, OperationKind::Sale);
    assert_eq!(state.general_ledger[0].operation.id, r.sale_id);
}

#[tokio::test]
async fn oversell_and_unknown_article_change_nothing() {
    let now = Utc::now();
    let fx = DeskFixture::open_desk(now).await;
    let policy = SettlementPolicy::default();

    let err = settle_sale(&fx.store, &policy, &sale(&fx, fx.soda, 6, "100"), now)
        .await
        .unwrap_err();
    assert!(matches!(err, SettlementError::InsufficientStock { requested: 6, available: 5, .. }));
    assert_eq!(err.class(), ErrorClass::Conflict);

    let err = settle_sale(&fx.store, &policy, &sale(&fx, Uuid::new_v4(), 1, "100"), now)
        .await
        .unwrap_err();
    assert!(matches!(err, SettlementError::ArticleNotFound(_)));

    let state = fx.store.snapshot().await;
    assert_eq!(state.articles[&fx.soda].stock, 5);
    assert!(state.sales.is_empty());
}

#[tokio::test]
async fn short_payment_and_stock_fault_roll_back() {
    let now = Utc::now();
    let fx = DeskFixture::open_desk(now).await;
    let policy = SettlementPolicy::default();

    let err = settle_sale(&fx.store, &policy, &sale(&fx, fx.soda, 1, "11"), now)
        .await
        .unwrap_err();
    assert_eq!(err.shortfall(), Some(m("0.60")));

    fx.store.fail_next(FaultPoint::DecrementStock);
    let err = settle_sale(&fx.store, &policy, &sale(&fx, fx.soda, 1, "20"), now)
        .await
        .unwrap_err();
    assert!(matches!(err, SettlementError::Storage(_)));

    let state = fx.store.snapshot().await;
    assert_eq!(state.articles[&fx.soda].stock, 5);
    assert!(state.sales.is_empty());
    assert!(state.sale_lines.is_empty());
    assert!(state.legacy_ledger.is_empty() && state.general_ledger.is_empty());
    assert_eq!(fx.store.rollback_count(), 2);
}
