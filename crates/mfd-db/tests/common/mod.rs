//! Shared setup for the DB-backed scenarios.
//!
//! Each test gets its own freshly migrated schema so the single-open-shift
//! index and seeded rows never collide across tests or with a developer DB.
//! The schema is dropped when the returned [`SchemaGuard`] goes out of scope,
//! including when the test panics. Tests skip (return early) when
//! MFD_DATABASE_URL is not set.

#![allow(dead_code)]

use std::str::FromStr;

use chrono::Utc;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use uuid::Uuid;

use mfd_db::PgStore;
use mfd_settlement::{
    CheckinRequest, FrontDeskAdmin, GuestDetails, Money, NewShift, PaymentEntry, Rate,
};

/// Drops its test schema on drop.
///
/// Cleanup runs on a separate thread with its own runtime so it works from
/// inside the test's runtime and during unwinding.
pub struct SchemaGuard {
    url: String,
    schema: String,
}

impl SchemaGuard {
    pub fn name(&self) -> &str {
        &self.schema
    }
}

impl Drop for SchemaGuard {
    fn drop(&mut self) {
        let url = std::mem::take(&mut self.url);
        let schema = std::mem::take(&mut self.schema);
        let cleanup = std::thread::spawn(move || -> anyhow::Result<()> {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            rt.block_on(drop_schema(&url, &schema))
        });
        match cleanup.join() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => eprintln!("WARN: test schema cleanup failed: {e:#}"),
            Err(_) => eprintln!("WARN: test schema cleanup panicked"),
        }
    }
}

pub async fn drop_schema(url: &str, schema: &str) -> anyhow::Result<()> {
    let admin = PgPoolOptions::new().max_connections(1).connect(url).await?;
    sqlx::query(&format!("drop schema if exists {schema} cascade"))
        .execute(&admin)
        .await?;
    admin.close().await;
    Ok(())
}

pub async fn schema_exists(url: &str, schema: &str) -> anyhow::Result<bool> {
    let admin = PgPoolOptions::new().max_connections(1).connect(url).await?;
    let (n,): (i64,) =
        sqlx::query_as("select count(*)::bigint from information_schema.schemata where schema_name = $1")
            .bind(schema)
            .fetch_one(&admin)
            .await?;
    admin.close().await;
    Ok(n > 0)
}

pub async fn isolated_pool() -> anyhow::Result<Option<(PgPool, SchemaGuard)>> {
    let url = match std::env::var(mfd_db::ENV_DB_URL) {
        Ok(v) => v,
        Err(_) => {
            eprintln!("SKIP: MFD_DATABASE_URL not set");
            return Ok(None);
        }
    };

    let schema = format!("mfd_test_{}", Uuid::new_v4().simple());
    let admin = PgPoolOptions::new().max_connections(1).connect(&url).await?;
    sqlx::query(&format!("create schema {schema}"))
        .execute(&admin)
        .await?;
    admin.close().await;
    let guard = SchemaGuard {
        url: url.clone(),
        schema: schema.clone(),
    };

    let opts = PgConnectOptions::from_str(&url)?.options([("search_path", schema.as_str())]);
    let pool = PgPoolOptions::new()
        .max_connections(8)
        .connect_with(opts)
        .await?;
    mfd_db::migrate(&pool).await?;
    Ok(Some((pool, guard)))
}

pub struct Seeded {
    pub store: PgStore,
    pub shift_id: Uuid,
    pub room_id: Uuid,
    pub second_room_id: Uuid,
    pub stay_type_id: Uuid,
    pub user: Uuid,
}

pub fn money(s: &str) -> Money {
    Money::parse(s).unwrap()
}

/// Two available rooms, a 50.00/3h stay type and an open shift at rate 40.
pub async fn seed_open_desk(pool: &PgPool) -> anyhow::Result<Seeded> {
    let store = PgStore::new(pool.clone());
    let shift_type_id = mfd_db::insert_shift_type(pool, "Morning").await?;
    let room_id = mfd_db::insert_room(pool, "101").await?;
    let second_room_id = mfd_db::insert_room(pool, "102").await?;
    let stay_type_id = mfd_db::insert_stay_type(pool, "Short stay", money("50"), 3).await?;
    let user = Uuid::new_v4();

    let shift = store
        .open_shift(&NewShift {
            shift_id: Uuid::new_v4(),
            shift_type_id,
            opened_by: user,
            work_date: Utc::now().date_naive(),
            opening_cash: money("500"),
            opening_foreign: Money::ZERO,
            exchange_rate: Rate::parse("40").unwrap(),
            opened_at_utc: Utc::now(),
        })
        .await
        .map_err(|e| anyhow::anyhow!("open_shift: {e}"))?;

    Ok(Seeded {
        store,
        shift_id: shift.shift_id,
        room_id,
        second_room_id,
        stay_type_id,
        user,
    })
}

pub fn checkin(seed: &Seeded, room_id: Uuid, document: &str, payments: Vec<PaymentEntry>) -> CheckinRequest {
    CheckinRequest::new(
        room_id,
        seed.stay_type_id,
        GuestDetails::new(document, "Ana Ruiz", Some("555-0101")).unwrap(),
        payments,
        seed.user,
        None,
    )
    .unwrap()
}

pub fn cash(amount: &str) -> PaymentEntry {
    PaymentEntry::local("CASH", money(amount)).unwrap()
}
