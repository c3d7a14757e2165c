//! `mfd rate record|latest`.

use anyhow::Result;
use chrono::Utc;
use mfd_db::PgStore;
use mfd_settlement::FrontDeskAdmin;

use super::parse_rate;

pub async fn record(store: &PgStore, rate: &str) -> Result<()> {
    let rate = parse_rate("--rate", rate)?;
    let sample = store.record_exchange_rate(rate, Utc::now()).await?;
    println!(
        "recorded=true sample_id={} rate={} sampled_at_utc={}",
        sample.sample_id,
        sample.rate,
        sample.sampled_at_utc.to_rfc3339()
    );
    Ok(())
}

pub async fn latest(store: &PgStore) -> Result<()> {
    match store.latest_exchange_rate().await? {
        Some(sample) => println!(
            "rate={} sampled_at_utc={}",
            sample.rate,
            sample.sampled_at_utc.to_rfc3339()
        ),
        None => println!("rate=none"),
    }
    Ok(())
}
