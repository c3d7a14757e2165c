use predicates::prelude::*;

/// `mfd rate record` is visible to `mfd rate latest`; non-positive rates are refused.
///
/// DB-backed test, skipped if MFD_DATABASE_URL is not set.
#[tokio::test]
async fn cli_rate_record_then_latest() -> anyhow::Result<()> {
    let url = match std::env::var(mfd_db::ENV_DB_URL) {
        Ok(v) => v,
        Err(_) => {
            eprintln!("SKIP: MFD_DATABASE_URL not set");
            return Ok(());
        }
    };

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await?;
    mfd_db::migrate(&pool).await?;

    assert_cmd::Command::cargo_bin("mfd-cli")?
        .env(mfd_db::ENV_DB_URL, &url)
        .args(["rate", "record", "--rate", "38.125"])
        .assert()
        .success()
        .stdout(predicate::str::contains("rate=38.125"));

    assert_cmd::Command::cargo_bin("mfd-cli")?
        .env(mfd_db::ENV_DB_URL, &url)
        .args(["rate", "latest"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("rate=38.125"));

    assert_cmd::Command::cargo_bin("mfd-cli")?
        .env(mfd_db::ENV_DB_URL, &url)
        .args(["rate", "record", "--rate", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("exchange rate must be positive"));

    Ok(())
}
