//! `mfd shift open|close|current`.

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use mfd_db::PgStore;
use mfd_settlement::{FrontDeskAdmin, NewShift, SettlementPolicy, SettlementStore, Shift};
use uuid::Uuid;

use super::{opt_dt, parse_money, parse_rate, parse_uuid};

pub struct OpenArgs {
    pub shift_type_id: String,
    pub opened_by: String,
    pub rate: String,
    pub opening_cash: String,
    pub opening_foreign: String,
    pub work_date: Option<NaiveDate>,
}

/// The work date defaults to the local date in the settlement zone, the
/// same rule the daemon applies.
pub fn new_shift(args: OpenArgs, policy: &SettlementPolicy, now: DateTime<Utc>) -> Result<NewShift> {
    Ok(NewShift {
        shift_id: Uuid::new_v4(),
        shift_type_id: parse_uuid("--shift-type-id", &args.shift_type_id)?,
        opened_by: parse_uuid("--opened-by", &args.opened_by)?,
        work_date: args.work_date.unwrap_or_else(|| policy.local_date(now)),
        opening_cash: parse_money("--opening-cash", &args.opening_cash)?,
        opening_foreign: parse_money("--opening-foreign", &args.opening_foreign)?,
        exchange_rate: parse_rate("--rate", &args.rate)?,
        opened_at_utc: now,
    })
}

pub async fn open(store: &PgStore, policy: &SettlementPolicy, args: OpenArgs) -> Result<()> {
    let new_shift = new_shift(args, policy, Utc::now())?;
    let shift = store.open_shift(&new_shift).await?;
    println!(
        "opened=true shift_id={} state={} work_date={}",
        shift.shift_id,
        shift.state.as_str(),
        shift.work_date
    );
    Ok(())
}

pub async fn close(store: &PgStore, shift_id: &str, closed_by: &str) -> Result<()> {
    let shift_id = parse_uuid("--shift-id", shift_id)?;
    let closed_by = parse_uuid("--closed-by", closed_by)?;
    let shift = store.close_shift(shift_id, closed_by, Utc::now()).await?;
    println!("closed=true shift_id={} state={}", shift.shift_id, shift.state.as_str());
    Ok(())
}

pub async fn current(store: &PgStore) -> Result<()> {
    match SettlementStore::current_open_shift(store).await? {
        Some(shift) => print_shift(&shift),
        None => println!("open_shift=none"),
    }
    Ok(())
}

fn print_shift(s: &Shift) {
    println!("shift_id={}", s.shift_id);
    println!("shift_type_id={}", s.shift_type_id);
    println!("state={}", s.state.as_str());
    println!("work_date={}", s.work_date);
    println!("opened_by={}", s.opened_by);
    println!("opened_at_utc={}", s.opened_at_utc.to_rfc3339());
    println!("opening_cash={}", s.opening_cash);
    println!("opening_foreign={}", s.opening_foreign);
    println!("exchange_rate={}", s.exchange_rate);
    println!("closed_at_utc={}", opt_dt(&s.closed_at_utc));
}
