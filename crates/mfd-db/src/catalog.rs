//! Catalog seeding and read-back queries.
//!
//! Plain single-table reads and writes used by the CLI, fixtures and the
//! DB-backed scenarios. None of these take part in a settlement transaction.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use mfd_settlement::{Article, Guest, Money, OperationKind, Rate, Room};

use crate::store::{article_from_row, room_from_row};

pub async fn insert_shift_type(pool: &PgPool, name: &str) -> Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query("insert into shift_types (shift_type_id, name) values ($1, $2)")
        .bind(id)
        .bind(name)
        .execute(pool)
        .await
        .context("insert_shift_type failed")?;
    Ok(id)
}

pub async fn insert_room(pool: &PgPool, number: &str) -> Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query("insert into rooms (room_id, number) values ($1, $2)")
        .bind(id)
        .bind(number)
        .execute(pool)
        .await
        .context("insert_room failed")?;
    Ok(id)
}

pub async fn insert_stay_type(
    pool: &PgPool,
    name: &str,
    price: Money,
    duration_hours: i32,
) -> Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(
        "insert into stay_types (stay_type_id, name, price_micros, duration_hours) values ($1, $2, $3, $4)",
    )
    .bind(id)
    .bind(name)
    .bind(price.micros())
    .bind(duration_hours)
    .execute(pool)
    .await
    .context("insert_stay_type failed")?;
    Ok(id)
}

pub async fn insert_article(
    pool: &PgPool,
    name: &str,
    unit_price: Money,
    tax_percent: Rate,
    stock: i64,
) -> Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        insert into articles (article_id, name, unit_price_micros, tax_percent_micros, stock)
        values ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(unit_price.micros())
    .bind(tax_percent.micros())
    .bind(stock)
    .execute(pool)
    .await
    .context("insert_article failed")?;
    Ok(id)
}

pub async fn fetch_room(pool: &PgPool, room_id: Uuid) -> Result<Option<Room>> {
    let row = sqlx::query_as::<_, (Uuid, String, String, bool)>(
        "select room_id, number, state, active from rooms where room_id = $1",
    )
    .bind(room_id)
    .fetch_optional(pool)
    .await
    .context("fetch_room failed")?;
    row.map(room_from_row).transpose()
}

pub async fn fetch_article(pool: &PgPool, article_id: Uuid) -> Result<Option<Article>> {
    let row = sqlx::query_as::<_, (Uuid, String, i64, i64, i64, bool)>(
        r#"
        select article_id, name, unit_price_micros, tax_percent_micros, stock, active
        from articles
        where article_id = $1
        "#,
    )
    .bind(article_id)
    .fetch_optional(pool)
    .await
    .context("fetch_article failed")?;
    Ok(row.map(article_from_row))
}

pub async fn fetch_guest_by_document(pool: &PgPool, document: &str) -> Result<Option<Guest>> {
    let row = sqlx::query_as::<_, (Uuid, String, String, Option<String>, i32, Option<DateTime<Utc>>)>(
        r#"
        select guest_id, document, name, phone, visit_count, last_visit_at_utc
        from guests
        where document = $1
        "#,
    )
    .bind(document)
    .fetch_optional(pool)
    .await
    .context("fetch_guest_by_document failed")?;

    Ok(row.map(|r| Guest {
        guest_id: r.0,
        document: r.1,
        name: r.2,
        phone: r.3,
        visit_count: r.4,
        last_visit_at_utc: r.5,
    }))
}

pub async fn count_stays_for_room(pool: &PgPool, room_id: Uuid) -> Result<i64> {
    let (n,): (i64,) = sqlx::query_as("select count(*)::bigint from stays where room_id = $1")
        .bind(room_id)
        .fetch_one(pool)
        .await
        .context("count_stays_for_room failed")?;
    Ok(n)
}

/// Rows per ledger projection for one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerCounts {
    pub legacy: i64,
    pub general: i64,
    /// Sum of `converted_micros` in the general ledger.
    pub converted_total: Money,
}

pub async fn count_ledger_rows(
    pool: &PgPool,
    kind: OperationKind,
    operation_id: Uuid,
) -> Result<LedgerCounts> {
    let legacy_sql = match kind {
        OperationKind::Stay => "select count(*)::bigint from stay_payments where stay_id = $1",
        OperationKind::Sale => "select count(*)::bigint from sale_payments where sale_id = $1",
    };
    let (legacy,): (i64,) = sqlx::query_as(legacy_sql)
        .bind(operation_id)
        .fetch_one(pool)
        .await
        .context("count legacy ledger rows failed")?;

    let (general, converted): (i64, i64) = sqlx::query_as(
        r#"
        select count(*)::bigint, coalesce(sum(converted_micros), 0)::bigint
        from payment_details
        where operation_type = $1 and operation_id = $2
        "#,
    )
    .bind(kind.as_str())
    .bind(operation_id)
    .fetch_one(pool)
    .await
    .context("count general ledger rows failed")?;

    Ok(LedgerCounts {
        legacy,
        general,
        converted_total: Money::from_micros(converted),
    })
}
