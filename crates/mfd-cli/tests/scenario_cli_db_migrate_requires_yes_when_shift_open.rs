use predicates::prelude::*;
use uuid::Uuid;

/// `mfd db migrate` must refuse while a shift is open unless --yes.
///
/// DB-backed test, skipped if MFD_DATABASE_URL is not set.
#[tokio::test]
async fn cli_db_migrate_requires_yes_when_shift_open() -> anyhow::Result<()> {
    let url = match std::env::var(mfd_db::ENV_DB_URL) {
        Ok(v) => v,
        Err(_) => {
            eprintln!("SKIP: MFD_DATABASE_URL not set");
            return Ok(());
        }
    };

    let pool = match sqlx::postgres::PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await
    {
        Ok(p) => p,
        Err(e) => {
            eprintln!("SKIP: cannot connect to DB: {e}");
            return Ok(());
        }
    };
    mfd_db::migrate(&pool).await?;

    if mfd_db::has_open_shift(&pool).await? {
        eprintln!("SKIP: a shift is already open in this database");
        return Ok(());
    }

    let shift_type_id = mfd_db::insert_shift_type(&pool, &format!("TEST_{}", Uuid::new_v4())).await?;
    let user = Uuid::new_v4();

    let out = assert_cmd::Command::cargo_bin("mfd-cli")?
        .env(mfd_db::ENV_DB_URL, &url)
        .args([
            "shift",
            "open",
            "--shift-type-id",
            &shift_type_id.to_string(),
            "--opened-by",
            &user.to_string(),
            "--rate",
            "40",
        ])
        .output()?;
    assert!(out.status.success(), "shift open failed: {}", String::from_utf8_lossy(&out.stderr));
    let stdout = String::from_utf8(out.stdout)?;
    let shift_id = stdout
        .split_whitespace()
        .find_map(|kv| kv.strip_prefix("shift_id="))
        .expect("shift_id printed")
        .to_string();

    // Without --yes => must fail with refusal message.
    assert_cmd::Command::cargo_bin("mfd-cli")?
        .env(mfd_db::ENV_DB_URL, &url)
        .args(["db", "migrate"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("REFUSING MIGRATE"));

    // With --yes => should succeed.
    assert_cmd::Command::cargo_bin("mfd-cli")?
        .env(mfd_db::ENV_DB_URL, &url)
        .args(["db", "migrate", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("migrations_applied=true"));

    // Cleanup: do not leave an open shift behind.
    assert_cmd::Command::cargo_bin("mfd-cli")?
        .env(mfd_db::ENV_DB_URL, &url)
        .args(["shift", "close", "--shift-id", &shift_id, "--closed-by", &user.to_string()])
        .assert()
        .success()
        .stdout(predicate::str::contains("state=CLOSED"));

    Ok(())
}
