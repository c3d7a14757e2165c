//! `mfd catalog ...`: seed the catalogs the settlement workflows read.

use anyhow::Result;
use mfd_db::PgStore;

use super::{parse_money, parse_rate};

pub async fn add_shift_type(store: &PgStore, name: &str) -> Result<()> {
    let id = mfd_db::insert_shift_type(store.pool(), name).await?;
    println!("shift_type_id={id}");
    Ok(())
}

pub async fn add_room(store: &PgStore, number: &str) -> Result<()> {
    let id = mfd_db::insert_room(store.pool(), number).await?;
    println!("room_id={id}");
    Ok(())
}

pub async fn add_stay_type(store: &PgStore, name: &str, price: &str, hours: i32) -> Result<()> {
    if hours <= 0 {
        anyhow::bail!("--hours must be positive, got {hours}");
    }
    let id = mfd_db::insert_stay_type(store.pool(), name, parse_money("--price", price)?, hours).await?;
    println!("stay_type_id={id}");
    Ok(())
}

pub async fn add_article(store: &PgStore, name: &str, price: &str, tax: &str, stock: i64) -> Result<()> {
    if stock < 0 {
        anyhow::bail!("--stock cannot be negative, got {stock}");
    }
    let id = mfd_db::insert_article(
        store.pool(),
        name,
        parse_money("--price", price)?,
        parse_rate("--tax-percent", tax)?,
        stock,
    )
    .await?;
    println!("article_id={id}");
    Ok(())
}
