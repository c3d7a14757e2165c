//! Retail sale settlement.
//!
//! Same transaction discipline as check-in: the shift gate runs first, then
//! every article row is locked (in id order), priced, paid for, written to
//! both ledgers and finally decremented.

use chrono::{DateTime, Utc};
use tracing::{error, info};
use uuid::Uuid;

use crate::error::SettlementError;
use crate::ledger::{payment_events, OperationKind, OperationRef, PaymentSettled};
use crate::money::{Money, Rate};
use crate::payment::allocate;
use crate::pricing::{line_total, SaleTotals};
use crate::request::SaleRequest;
use crate::settle::{abort, resolve_exchange_rate, resolve_instruments, write_payments, SettlementPolicy};
use crate::shift::current_open_shift;
use crate::stage::{SettlementStage, StageTracker};
use crate::store::{SettlementStore, SettlementTx};
use crate::types::{Article, NewSale, NewSaleLine, Shift};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleReceipt {
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

/// Sell articles from stock and settle payment, atomically.
pub async fn settle_sale<S>(
    store: &S,
    policy: &SettlementPolicy,
    req: &SaleRequest,
    now: DateTime<Utc>,
) -> Result<SaleReceipt, SettlementError>
where
    S: SettlementStore + ?Sized,
{
    let mut stages = StageTracker::sale();

    let shift = current_open_shift(store).await?;
    stages.advance(SettlementStage::ShiftChecked)?;

    let mut tx = store.begin().await?;

    let receipt = match sale_in_tx(&mut tx, &mut stages, &shift, policy, req, now).await {
        Ok(r) => r,
        Err(err) => {
            abort(tx, &mut stages, "sale", &err).await;
            return Err(err);
        }
    };

    if let Err(e) = tx.commit().await {
        let _ = stages.roll_back();
        error!(error = %format!("{e:#}"), "sale commit failed");
        return Err(SettlementError::Storage(e.context("sale commit failed")));
    }
    stages.advance(SettlementStage::Committed)?;

    info!(
        sale_id = %receipt.sale_id,
        shift_id = %receipt.shift_id,
        lines = receipt.lines.len(),
        total = %receipt.total,
        paid = %receipt.amount_paid,
        "sale committed"
    );
    Ok(receipt)
}

async fn sale_in_tx<T: SettlementTx>(
    tx: &mut T,
    stages: &mut StageTracker,
    shift: &Shift,
    policy: &SettlementPolicy,
    req: &SaleRequest,
    now: DateTime<Utc>,
) -> Result<SaleReceipt, SettlementError> {
    // Lock in a stable order so two sales sharing articles cannot deadlock.
    let mut wanted: Vec<(Uuid, i64)> = req
        .lines()
        .iter()
        .map(|l| (l.article_id, l.quantity))
        .collect();
    wanted.sort_by_key(|(id, _)| *id);

    let mut locked: Vec<(Article, i64)> = Vec::with_capacity(wanted.len());
    for (article_id, quantity) in wanted {
        let article = tx
            .lock_article(article_id)
            .await?
            .filter(|a| a.active)
            .ok_or(SettlementError::ArticleNotFound(article_id))?;
        if article.stock < quantity {
            return Err(SettlementError::InsufficientStock {
                article_id,
                requested: quantity,
                available: article.stock,
            });
        }
        locked.push((article, quantity));
    }
    stages.advance(SettlementStage::StockReserved)?;

    let sale_id = Uuid::new_v4();
    let mut totals = SaleTotals::default();
    let mut lines = Vec::with_capacity(locked.len());
    // Receipt lines follow request order, not lock order.
    for requested in req.lines() {
        let Some((article, quantity)) = locked
            .iter()
            .find(|(a, _)| a.article_id == requested.article_id)
        else {
            return Err(SettlementError::ArticleNotFound(requested.article_id));
        };
        let lt = line_total(article.unit_price, *quantity, article.tax_percent)?;
        totals.add_line(&lt)?;
        lines.push(NewSaleLine {
            line_id: Uuid::new_v4(),
            sale_id,
            article_id: article.article_id,
            quantity: *quantity,
            unit_price: article.unit_price,
            tax_percent: article.tax_percent,
            subtotal: lt.subtotal,
            tax: lt.tax,
        });
    }
    let total = totals.total()?;
    stages.advance(SettlementStage::Priced)?;

    let rate = resolve_exchange_rate(tx, policy, req.payments(), now).await?;
    let allocation = allocate(req.payments(), total, rate)?;
    let instruments = resolve_instruments(tx, &allocation).await?;
    stages.advance(SettlementStage::PaymentAllocated)?;

    tx.insert_sale(&NewSale {
        sale_id,
        shift_id: shift.shift_id,
        subtotal: totals.subtotal,
        tax: totals.tax,
        total,
        notes: req.notes().map(str::to_string),
        created_by: req.acting_user_id(),
        created_at_utc: now,
    })
    .await?;
    for line in &lines {
        tx.insert_sale_line(line).await?;
    }

    let payments = payment_events(
        OperationRef {
            kind: OperationKind::Sale,
            id: sale_id,
        },
        shift.shift_id,
        req.acting_user_id(),
        &allocation,
        &instruments,
        now,
    )?;
    write_payments(tx, &payments).await?;
    stages.advance(SettlementStage::LedgerWritten)?;

    for (article, quantity) in &locked {
        tx.decrement_stock(article.article_id, *quantity).await?;
    }
    stages.advance(SettlementStage::StockDecremented)?;

    Ok(SaleReceipt {
        sale_id,
        shift_id: shift.shift_id,
        subtotal: totals.subtotal,
        tax: totals.tax,
        total,
        amount_paid: allocation.total_paid,
        exchange_rate: rate,
        change: allocation.change,
        lines,
        payments,
    })
}
