//! Steps shared by the check-in and sale orchestrators.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::{error, warn};

use crate::error::SettlementError;
use crate::ledger::{PaymentSettled, LEDGER_PROJECTIONS};
use crate::money::Rate;
use crate::payment::{requires_exchange_rate, Allocation};
use crate::request::PaymentEntry;
use crate::stage::StageTracker;
use crate::store::SettlementTx;
use crate::types::PaymentInstrument;

/// Knobs that change settlement behaviour without changing its shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlementPolicy {
    /// Zone in which "same day" is judged.
    pub timezone: Tz,
    /// Foreign-currency entries need a rate sampled on the settlement day.
    pub require_same_day_rate: bool,
}

impl Default for SettlementPolicy {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::UTC,
            require_same_day_rate: true,
        }
    }
}

impl SettlementPolicy {
    pub fn local_date(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.timezone).date_naive()
    }
}

/// Most recent exchange-rate sample, checked for freshness when an entry
/// needs it.  `None` when no sample exists and none is needed.
pub(crate) async fn resolve_exchange_rate<T: SettlementTx>(
    tx: &mut T,
    policy: &SettlementPolicy,
    entries: &[PaymentEntry],
    now: DateTime<Utc>,
) -> Result<Option<Rate>, SettlementError> {
    let needed = requires_exchange_rate(entries);
    let Some(sample) = tx.latest_exchange_rate().await? else {
        return if needed {
            Err(SettlementError::ExchangeRateUnavailable)
        } else {
            Ok(None)
        };
    };

    if needed && policy.require_same_day_rate {
        let sampled_on = policy.local_date(sample.sampled_at_utc);
        let settlement_on = policy.local_date(now);
        if sampled_on != settlement_on {
            return Err(SettlementError::ExchangeRateStale {
                sampled_on,
                settlement_on,
            });
        }
    }

    Ok(Some(sample.rate))
}

/// Map every allocated payment to an active instrument, in order.
pub(crate) async fn resolve_instruments<T: SettlementTx>(
    tx: &mut T,
    allocation: &Allocation,
) -> Result<Vec<PaymentInstrument>, SettlementError> {
    let mut cache: HashMap<String, PaymentInstrument> = HashMap::new();
    let mut out = Vec::with_capacity(allocation.payments.len());

    for p in &allocation.payments {
        let code = p.entry.instrument();
        if let Some(hit) = cache.get(code) {
            out.push(hit.clone());
            continue;
        }
        let inst = tx
            .payment_instrument(code)
            .await?
            .filter(|i| i.active)
            .ok_or_else(|| SettlementError::UnknownInstrument(code.to_string()))?;
        cache.insert(code.to_string(), inst.clone());
        out.push(inst);
    }

    Ok(out)
}

/// Write every event through every ledger projection.
pub(crate) async fn write_payments<T: SettlementTx>(
    tx: &mut T,
    events: &[PaymentSettled],
) -> Result<(), SettlementError> {
    for ev in events {
        for projection in LEDGER_PROJECTIONS {
            tx.project_payment(*projection, ev).await?;
        }
    }
    Ok(())
}

/// Roll the transaction back and record where the workflow stopped.
pub(crate) async fn abort<T: SettlementTx>(
    tx: T,
    stages: &mut StageTracker,
    workflow: &'static str,
    err: &SettlementError,
) {
    let reached = match stages.roll_back() {
        Ok(stage) => stage,
        Err(e) => e.from,
    };

    if let Err(rb) = tx.rollback().await {
        // The dropped transaction still rolls back on the server side.
        error!(workflow, error = %format!("{rb:#}"), "explicit rollback failed");
    }

    match err {
        SettlementError::Storage(e) => {
            error!(workflow, stage = %reached, detail = %format!("{e:#}"), "settlement rolled back on storage failure");
        }
        other => {
            warn!(workflow, stage = %reached, class = other.class().as_str(), reason = %other, "settlement rolled back");
        }
    }
}
