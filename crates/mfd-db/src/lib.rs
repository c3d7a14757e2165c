use anyhow::{Context, Result};
use sqlx::{postgres::PgPoolOptions, PgPool};

mod catalog;
mod store;

pub use catalog::{
    count_ledger_rows, count_stays_for_room, fetch_article, fetch_guest_by_document, fetch_room,
    insert_article, insert_room, insert_shift_type, insert_stay_type, LedgerCounts,
};
pub use store::{PgSettlementTx, PgStore};

/// Default value of `db.url_env`.
pub const ENV_DB_URL: &str = "MFD_DATABASE_URL";

pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await
        .context("failed to connect to Postgres")
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct DbStatus {
    pub ok: bool,
    pub has_shifts_table: bool,
}

/// Connectivity plus schema presence.
pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;

    let (exists,): (bool,) = sqlx::query_as(
        r#"
        select exists (
            select 1
            from information_schema.tables
            where table_schema = current_schema() and table_name = 'shifts'
        )
        "#,
    )
    .fetch_one(pool)
    .await
    .context("status table-exists query failed")?;

    Ok(DbStatus {
        ok: one == 1,
        has_shifts_table: exists,
    })
}

/// Open shifts right now (0 or 1 once migrated). Used by the CLI to refuse
/// migrating a database the front desk is actively using.
pub async fn count_open_shifts(pool: &PgPool) -> Result<i64> {
    // No schema yet means nothing can be open.
    if !status(pool).await?.has_shifts_table {
        return Ok(0);
    }

    let (n,): (i64,) = sqlx::query_as("select count(*)::bigint from shifts where state = 'OPEN'")
        .fetch_one(pool)
        .await
        .context("count_open_shifts failed")?;
    Ok(n)
}

pub async fn has_open_shift(pool: &PgPool) -> Result<bool> {
    Ok(count_open_shifts(pool).await? > 0)
}

/// Detect a Postgres unique violation (SQLSTATE 23505) on a named constraint
/// or unique index.
pub(crate) fn is_unique_constraint_violation(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.code().as_deref() == Some("23505") && db_err.constraint() == Some(constraint)
        }
        _ => false,
    }
}
