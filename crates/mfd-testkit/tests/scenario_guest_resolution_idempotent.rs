//! Guest resolution is keyed by document: repeats reuse the row and bump the
//! visit counter by exactly one.

use chrono::{Duration, Utc};
use mfd_settlement::{settle_checkin, SettlementPolicy};
use mfd_testkit::{cash, DeskFixture};

#[tokio::test]
async fn repeat_document_reuses_guest_and_counts_visit() {
    let now = Utc::now();
    let fx = DeskFixture::open_desk(now).await;
    let policy = SettlementPolicy::default();

    let first = settle_checkin(&fx.store, &policy, &fx.checkin(fx.room_101, "DOC-400", vec![cash("50")]), now)
        .await
        .unwrap();
    assert!(first.guest_created);
    assert_eq!(first.guest_visit_count, 0);

    let later = now + Duration::minutes(5);
    let second = settle_checkin(&fx.store, &policy, &fx.checkin(fx.room_102, "DOC-400", vec![cash("50")]), later)
        .await
        .unwrap();
    assert!(!second.guest_created);
    assert_eq!(second.guest_id, first.guest_id);
    assert_eq!(second.guest_visit_count, first.guest_visit_count + 1);

    let state = fx.store.snapshot().await;
    assert_eq!(state.guests.len(), 1);
    let g = state.guest_by_document("DOC-400").unwrap();
    assert_eq!(g.visit_count, 1);
    assert_eq!(g.last_visit_at_utc, Some(later));
}

#[tokio::test]
async fn document_whitespace_is_not_a_new_guest() {
    let now = Utc::now();
    let fx = DeskFixture::open_desk(now).await;
    let policy = SettlementPolicy::default();

    settle_checkin(&fx.store, &policy, &fx.checkin(fx.room_101, "DOC-401", vec![cash("50")]), now)
        .await
        .unwrap();
    settle_checkin(&fx.store, &policy, &fx.checkin(fx.room_102, "  DOC-401 ", vec![cash("50")]), now)
        .await
        .unwrap();

    assert_eq!(fx.store.snapshot().await.guests.len(), 1);
}
