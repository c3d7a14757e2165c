//! Postgres implementation of the settlement store traits.
//!
//! Row locks (`for update`) on rooms and articles plus Postgres' default
//! read-committed isolation are the only concurrency guard: a second
//! settlement for the same room blocks on the lock, then re-reads the row
//! the first one committed and sees it `OCCUPIED`.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::info;
use uuid::Uuid;

use mfd_settlement::{
    validate_new_shift, Article, ExchangeRateSample, FrontDeskAdmin, GuestDetails,
    GuestResolution, LedgerProjection, Money, NewSale, NewSaleLine, NewShift, NewStay,
    OperationKind, PaymentInstrument, PaymentSettled, Rate, Room, RoomState, SettlementError,
    SettlementStore, SettlementTx, Shift, ShiftState, StayType,
};

use crate::is_unique_constraint_violation;

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// One settlement unit of work. Dropping it without `commit` rolls back.
pub struct PgSettlementTx {
    tx: Transaction<'static, Postgres>,
}

// ---------------------------------------------------------------------------
// Row shapes
// ---------------------------------------------------------------------------

type ShiftRow = (
    Uuid,
    Uuid,
    Uuid,
    NaiveDate,
    i64,
    i64,
    i64,
    String,
    DateTime<Utc>,
    Option<Uuid>,
    Option<DateTime<Utc>>,
);

fn shift_from_row(r: ShiftRow) -> Result<Shift> {
    Ok(Shift {
        shift_id: r.0,
        shift_type_id: r.1,
        opened_by: r.2,
        work_date: r.3,
        opening_cash: Money::from_micros(r.4),
        opening_foreign: Money::from_micros(r.5),
        exchange_rate: Rate::from_micros(r.6),
        state: ShiftState::parse(&r.7)?,
        opened_at_utc: r.8,
        closed_by: r.9,
        closed_at_utc: r.10,
    })
}

pub(crate) fn room_from_row(r: (Uuid, String, String, bool)) -> Result<Room> {
    Ok(Room {
        room_id: r.0,
        number: r.1,
        state: RoomState::parse(&r.2)?,
        active: r.3,
    })
}

pub(crate) fn article_from_row(r: (Uuid, String, i64, i64, i64, bool)) -> Article {
    Article {
        article_id: r.0,
        name: r.1,
        unit_price: Money::from_micros(r.2),
        tax_percent: Rate::from_micros(r.3),
        stock: r.4,
        active: r.5,
    }
}

fn sample_from_row(r: (Uuid, i64, DateTime<Utc>)) -> ExchangeRateSample {
    ExchangeRateSample {
        sample_id: r.0,
        rate: Rate::from_micros(r.1),
        sampled_at_utc: r.2,
    }
}

// ---------------------------------------------------------------------------
// SettlementStore
// ---------------------------------------------------------------------------

#[async_trait]
impl SettlementStore for PgStore {
    type Tx = PgSettlementTx;

    async fn current_open_shift(&self) -> Result<Option<Shift>> {
        let row = sqlx::query_as::<_, ShiftRow>(
            r#"
            select shift_id, shift_type_id, opened_by, work_date, opening_cash_micros,
                   opening_foreign_micros, exchange_rate_micros, state, opened_at_utc,
                   closed_by, closed_at_utc
            from shifts
            where state = 'OPEN'
            order by opened_at_utc desc
            limit 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await
        .context("current_open_shift failed")?;

        row.map(shift_from_row).transpose()
    }

    async fn begin(&self) -> Result<PgSettlementTx> {
        let tx = self.pool.begin().await.context("begin settlement tx failed")?;
        Ok(PgSettlementTx { tx })
    }
}

// ---------------------------------------------------------------------------
// SettlementTx
// ---------------------------------------------------------------------------

#[async_trait]
impl SettlementTx for PgSettlementTx {
    async fn lock_room(&mut self, room_id: Uuid) -> Result<Option<Room>> {
        let row = sqlx::query_as::<_, (Uuid, String, String, bool)>(
            r#"
            select room_id, number, state, active
            from rooms
            where room_id = $1
            for update
            "#,
        )
        .bind(room_id)
        .fetch_optional(&mut *self.tx)
        .await
        .context("lock_room failed")?;

        row.map(room_from_row).transpose()
    }

    async fn set_room_state(&mut self, room_id: Uuid, state: RoomState) -> Result<()> {
        let res = sqlx::query("update rooms set state = $2 where room_id = $1")
            .bind(room_id)
            .bind(state.as_str())
            .execute(&mut *self.tx)
            .await
            .context("set_room_state failed")?;
        if res.rows_affected() != 1 {
            bail!("set_room_state: room {room_id} not found");
        }
        Ok(())
    }

    async fn resolve_guest(
        &mut self,
        guest: &GuestDetails,
        at: DateTime<Utc>,
    ) -> Result<GuestResolution> {
        // Insert-or-bump in one statement; concurrent first visits with the
        // same document serialize on the unique index and converge.
        let candidate = Uuid::new_v4();
        let (guest_id, visit_count, created): (Uuid, i32, bool) = sqlx::query_as(
            r#"
            insert into guests (guest_id, document, name, phone, visit_count, last_visit_at_utc)
            values ($1, $2, $3, $4, 0, $5)
            on conflict (document) do update
              set visit_count = guests.visit_count + 1,
                  last_visit_at_utc = excluded.last_visit_at_utc,
                  phone = coalesce(excluded.phone, guests.phone)
            returning guest_id, visit_count, (guest_id = $1) as created
            "#,
        )
        .bind(candidate)
        .bind(guest.document())
        .bind(guest.name())
        .bind(guest.phone())
        .bind(at)
        .fetch_one(&mut *self.tx)
        .await
        .context("resolve_guest upsert failed")?;

        Ok(GuestResolution {
            guest_id,
            visit_count,
            created,
        })
    }

    async fn stay_type(&mut self, stay_type_id: Uuid) -> Result<Option<StayType>> {
        let row = sqlx::query_as::<_, (Uuid, String, i64, i32, bool)>(
            r#"
            select stay_type_id, name, price_micros, duration_hours, active
            from stay_types
            where stay_type_id = $1
            "#,
        )
        .bind(stay_type_id)
        .fetch_optional(&mut *self.tx)
        .await
        .context("stay_type lookup failed")?;

        Ok(row.map(|r| StayType {
            stay_type_id: r.0,
            name: r.1,
            price: Money::from_micros(r.2),
            duration_hours: r.3,
            active: r.4,
        }))
    }

    async fn latest_exchange_rate(&mut self) -> Result<Option<ExchangeRateSample>> {
        let row = sqlx::query_as::<_, (Uuid, i64, DateTime<Utc>)>(
            r#"
            select sample_id, rate_micros, sampled_at_utc
            from exchange_rates
            order by sampled_at_utc desc
            limit 1
            "#,
        )
        .fetch_optional(&mut *self.tx)
        .await
        .context("latest_exchange_rate failed")?;

        Ok(row.map(sample_from_row))
    }

    async fn payment_instrument(&mut self, code: &str) -> Result<Option<PaymentInstrument>> {
        let row = sqlx::query_as::<_, (Uuid, String, String, bool)>(
            "select instrument_id, code, name, active from payment_instruments where code = $1",
        )
        .bind(code)
        .fetch_optional(&mut *self.tx)
        .await
        .context("payment_instrument lookup failed")?;

        Ok(row.map(|r| PaymentInstrument {
            instrument_id: r.0,
            code: r.1,
            name: r.2,
            active: r.3,
        }))
    }

    async fn insert_stay(&mut self, stay: &NewStay) -> Result<()> {
        sqlx::query(
            r#"
            insert into stays (
              stay_id, room_id, guest_id, stay_type_id, shift_id, entry_at_utc,
              exit_at_utc, duration_hours, price_micros, notes, created_by
            ) values (
              $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11
            )
            "#,
        )
        .bind(stay.stay_id)
        .bind(stay.room_id)
        .bind(stay.guest_id)
        .bind(stay.stay_type_id)
        .bind(stay.shift_id)
        .bind(stay.entry_at_utc)
        .bind(stay.exit_at_utc)
        .bind(stay.duration_hours)
        .bind(stay.price.micros())
        .bind(stay.notes.as_deref())
        .bind(stay.created_by)
        .execute(&mut *self.tx)
        .await
        .context("insert_stay failed")?;
        Ok(())
    }

    async fn project_payment(
        &mut self,
        projection: LedgerProjection,
        ev: &PaymentSettled,
    ) -> Result<()> {
        let sql = match (projection, ev.operation.kind) {
            (LedgerProjection::Legacy, OperationKind::Stay) => {
                r#"
                insert into stay_payments (
                  payment_id, stay_id, shift_id, user_id, instrument_id, amount_micros,
                  is_foreign_currency, converted_micros, exchange_rate_micros, reference,
                  change_micros, paid_at_utc
                ) values (
                  $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12
                )
                "#
            }
            (LedgerProjection::Legacy, OperationKind::Sale) => {
                r#"
                insert into sale_payments (
                  payment_id, sale_id, shift_id, user_id, instrument_id, amount_micros,
                  is_foreign_currency, converted_micros, exchange_rate_micros, reference,
                  change_micros, paid_at_utc
                ) values (
                  $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12
                )
                "#
            }
            (LedgerProjection::General, _) => {
                r#"
                insert into payment_details (
                  payment_id, operation_id, shift_id, user_id, instrument_id, amount_micros,
                  is_foreign_currency, converted_micros, exchange_rate_micros, reference,
                  change_micros, created_at_utc, operation_type
                ) values (
                  $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13
                )
                "#
            }
        };

        let mut q = sqlx::query(sql)
            .bind(ev.payment_id)
            .bind(ev.operation.id)
            .bind(ev.shift_id)
            .bind(ev.user_id)
            .bind(ev.instrument_id)
            .bind(ev.amount.micros())
            .bind(ev.is_foreign_currency)
            .bind(ev.converted_amount.micros())
            .bind(ev.exchange_rate.map(|r| r.micros()))
            .bind(ev.reference.as_deref())
            .bind(ev.change_given.micros())
            .bind(ev.settled_at_utc);
        if projection == LedgerProjection::General {
            q = q.bind(ev.operation.kind.as_str());
        }

        q.execute(&mut *self.tx)
            .await
            .with_context(|| format!("project_payment ({}) failed", projection.as_str()))?;
        Ok(())
    }

    async fn lock_article(&mut self, article_id: Uuid) -> Result<Option<Article>> {
        let row = sqlx::query_as::<_, (Uuid, String, i64, i64, i64, bool)>(
            r#"
            select article_id, name, unit_price_micros, tax_percent_micros, stock, active
            from articles
            where article_id = $1
            for update
            "#,
        )
        .bind(article_id)
        .fetch_optional(&mut *self.tx)
        .await
        .context("lock_article failed")?;

        Ok(row.map(article_from_row))
    }

    async fn insert_sale(&mut self, sale: &NewSale) -> Result<()> {
        sqlx::query(
            r#"
            insert into sales (
              sale_id, shift_id, subtotal_micros, tax_micros, total_micros, notes,
              created_by, created_at_utc
            ) values (
              $1, $2, $3, $4, $5, $6, $7, $8
            )
            "#,
        )
        .bind(sale.sale_id)
        .bind(sale.shift_id)
        .bind(sale.subtotal.micros())
        .bind(sale.tax.micros())
        .bind(sale.total.micros())
        .bind(sale.notes.as_deref())
        .bind(sale.created_by)
        .bind(sale.created_at_utc)
        .execute(&mut *self.tx)
        .await
        .context("insert_sale failed")?;
        Ok(())
    }

    async fn insert_sale_line(&mut self, line: &NewSaleLine) -> Result<()> {
        sqlx::query(
            r#"
            insert into sale_lines (
              line_id, sale_id, article_id, quantity, unit_price_micros,
              tax_percent_micros, subtotal_micros, tax_micros
            ) values (
              $1, $2, $3, $4, $5, $6, $7, $8
            )
            "#,
        )
        .bind(line.line_id)
        .bind(line.sale_id)
        .bind(line.article_id)
        .bind(line.quantity)
        .bind(line.unit_price.micros())
        .bind(line.tax_percent.micros())
        .bind(line.subtotal.micros())
        .bind(line.tax.micros())
        .execute(&mut *self.tx)
        .await
        .context("insert_sale_line failed")?;
        Ok(())
    }

    async fn decrement_stock(&mut self, article_id: Uuid, quantity: i64) -> Result<()> {
        let res = sqlx::query(
            "update articles set stock = stock - $2 where article_id = $1 and stock >= $2",
        )
        .bind(article_id)
        .bind(quantity)
        .execute(&mut *self.tx)
        .await
        .context("decrement_stock failed")?;
        if res.rows_affected() != 1 {
            bail!("decrement_stock: article {article_id} lacks {quantity} units");
        }
        Ok(())
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await.context("commit failed")
    }

    async fn rollback(self) -> Result<()> {
        self.tx.rollback().await.context("rollback failed")
    }
}

// ---------------------------------------------------------------------------
// FrontDeskAdmin
// ---------------------------------------------------------------------------

#[async_trait]
impl FrontDeskAdmin for PgStore {
    async fn open_shift(&self, shift: &NewShift) -> Result<Shift, SettlementError> {
        validate_new_shift(shift)?;

        let mut tx = self.pool.begin().await.context("open_shift begin failed")?;

        let shift_type: Option<(bool,)> =
            sqlx::query_as("select active from shift_types where shift_type_id = $1")
                .bind(shift.shift_type_id)
                .fetch_optional(&mut *tx)
                .await
                .context("shift type lookup failed")?;
        if !matches!(shift_type, Some((true,))) {
            return Err(SettlementError::invalid(format!(
                "unknown or inactive shift type: {}",
                shift.shift_type_id
            )));
        }

        let inserted = sqlx::query(
            r#"
            insert into shifts (
              shift_id, shift_type_id, opened_by, work_date, opening_cash_micros,
              opening_foreign_micros, exchange_rate_micros, state, opened_at_utc
            ) values (
              $1, $2, $3, $4, $5, $6, $7, 'OPEN', $8
            )
            "#,
        )
        .bind(shift.shift_id)
        .bind(shift.shift_type_id)
        .bind(shift.opened_by)
        .bind(shift.work_date)
        .bind(shift.opening_cash.micros())
        .bind(shift.opening_foreign.micros())
        .bind(shift.exchange_rate.micros())
        .bind(shift.opened_at_utc)
        .execute(&mut *tx)
        .await;

        if let Err(e) = inserted {
            if is_unique_constraint_violation(&e, "uq_single_open_shift") {
                return Err(SettlementError::ShiftAlreadyOpen);
            }
            return Err(anyhow::Error::new(e).context("insert shift failed").into());
        }

        // The opening rate is also today's first rate sample.
        sqlx::query(
            "insert into exchange_rates (sample_id, rate_micros, sampled_at_utc) values ($1, $2, $3)",
        )
        .bind(Uuid::new_v4())
        .bind(shift.exchange_rate.micros())
        .bind(shift.opened_at_utc)
        .execute(&mut *tx)
        .await
        .context("insert opening exchange rate failed")?;

        tx.commit().await.context("open_shift commit failed")?;

        info!(shift_id = %shift.shift_id, opened_by = %shift.opened_by, work_date = %shift.work_date, "shift opened");
        Ok(Shift {
            shift_id: shift.shift_id,
            shift_type_id: shift.shift_type_id,
            opened_by: shift.opened_by,
            work_date: shift.work_date,
            opening_cash: shift.opening_cash,
            opening_foreign: shift.opening_foreign,
            exchange_rate: shift.exchange_rate,
            state: ShiftState::Open,
            opened_at_utc: shift.opened_at_utc,
            closed_by: None,
            closed_at_utc: None,
        })
    }

    async fn close_shift(
        &self,
        shift_id: Uuid,
        closed_by: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Shift, SettlementError> {
        if closed_by.is_nil() {
            return Err(SettlementError::invalid("closedBy is required"));
        }

        let row = sqlx::query_as::<_, ShiftRow>(
            r#"
            update shifts
            set state = 'CLOSED', closed_by = $2, closed_at_utc = $3
            where shift_id = $1 and state = 'OPEN'
            returning shift_id, shift_type_id, opened_by, work_date, opening_cash_micros,
                      opening_foreign_micros, exchange_rate_micros, state, opened_at_utc,
                      closed_by, closed_at_utc
            "#,
        )
        .bind(shift_id)
        .bind(closed_by)
        .bind(at)
        .fetch_optional(&self.pool)
        .await
        .context("close_shift failed")?;

        match row {
            Some(r) => {
                let shift = shift_from_row(r)?;
                info!(shift_id = %shift_id, closed_by = %closed_by, "shift closed");
                Ok(shift)
            }
            None => {
                let (exists,): (bool,) =
                    sqlx::query_as("select exists (select 1 from shifts where shift_id = $1)")
                        .bind(shift_id)
                        .fetch_one(&self.pool)
                        .await
                        .context("close_shift existence check failed")?;
                if exists {
                    Err(SettlementError::ShiftNotOpen(shift_id))
                } else {
                    Err(SettlementError::ShiftNotFound(shift_id))
                }
            }
        }
    }

    async fn record_exchange_rate(
        &self,
        rate: Rate,
        sampled_at: DateTime<Utc>,
    ) -> Result<ExchangeRateSample, SettlementError> {
        if !rate.is_positive() {
            return Err(SettlementError::invalid("exchange rate must be positive"));
        }

        let row = sqlx::query_as::<_, (Uuid, i64, DateTime<Utc>)>(
            r#"
            insert into exchange_rates (sample_id, rate_micros, sampled_at_utc)
            values ($1, $2, $3)
            returning sample_id, rate_micros, sampled_at_utc
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(rate.micros())
        .bind(sampled_at)
        .fetch_one(&self.pool)
        .await
        .context("record_exchange_rate failed")?;

        let sample = sample_from_row(row);
        info!(sample_id = %sample.sample_id, rate = %sample.rate, "exchange rate recorded");
        Ok(sample)
    }

    async fn latest_exchange_rate(&self) -> Result<Option<ExchangeRateSample>> {
        let row = sqlx::query_as::<_, (Uuid, i64, DateTime<Utc>)>(
            r#"
            select sample_id, rate_micros, sampled_at_utc
            from exchange_rates
            order by sampled_at_utc desc
            limit 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await
        .context("latest_exchange_rate failed")?;

        Ok(row.map(sample_from_row))
    }
}
