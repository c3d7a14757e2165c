use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use mfd_db::PgStore;
use tracing::info;

mod commands;

use commands::{catalog, rate, runtime::Runtime, shift};

#[derive(Parser)]
#[command(name = "mfd")]
#[command(about = "Motel front-desk CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database commands
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (defaults -> site -> local overrides)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Shift (jornada) administration
    Shift {
        #[command(subcommand)]
        cmd: ShiftCmd,
    },

    /// Exchange-rate samples
    Rate {
        #[command(subcommand)]
        cmd: RateCmd,
    },

    /// Seed catalog rows (shift types, rooms, stay types, articles)
    Catalog {
        #[command(subcommand)]
        cmd: CatalogCmd,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    Status,

    /// Apply SQL migrations. Guardrail: refuses while a shift is open unless --yes is provided.
    Migrate {
        /// Acknowledge you are migrating a DB the front desk is actively using.
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum ShiftCmd {
    /// Open a shift (fails if one is already open)
    Open {
        #[arg(long)]
        shift_type_id: String,

        /// Acting user id
        #[arg(long)]
        opened_by: String,

        /// Local units per foreign unit at opening
        #[arg(long)]
        rate: String,

        #[arg(long, default_value = "0")]
        opening_cash: String,

        #[arg(long, default_value = "0")]
        opening_foreign: String,

        /// Business date (YYYY-MM-DD); defaults to today in settlement.timezone
        #[arg(long)]
        work_date: Option<NaiveDate>,
    },

    /// Close an open shift (OPEN -> CLOSED)
    Close {
        #[arg(long)]
        shift_id: String,

        #[arg(long)]
        closed_by: String,
    },

    /// Print the currently open shift
    Current,
}

#[derive(Subcommand)]
enum RateCmd {
    /// Record a new sample taken now
    Record {
        #[arg(long)]
        rate: String,
    },

    /// Print the most recent sample
    Latest,
}

#[derive(Subcommand)]
enum CatalogCmd {
    AddShiftType {
        #[arg(long)]
        name: String,
    },

    AddRoom {
        #[arg(long)]
        number: String,
    },

    AddStayType {
        #[arg(long)]
        name: String,

        #[arg(long)]
        price: String,

        #[arg(long)]
        hours: i32,
    },

    AddArticle {
        #[arg(long)]
        name: String,

        #[arg(long)]
        price: String,

        /// Tax percentage, e.g. 16
        #[arg(long, default_value = "0")]
        tax_percent: String,

        #[arg(long, default_value_t = 0)]
        stock: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Db { cmd } => {
            let pool = Runtime::load()?.connect().await?;
            match cmd {
                DbCmd::Status => {
                    let s = mfd_db::status(&pool).await?;
                    println!("db_ok={} has_shifts_table={}", s.ok, s.has_shifts_table);
                }
                DbCmd::Migrate { yes } => {
                    // Refuse to migrate under an open shift unless the operator
                    // explicitly acknowledges with --yes.
                    let n = mfd_db::count_open_shifts(&pool).await?;
                    if n > 0 && !yes {
                        anyhow::bail!(
                            "REFUSING MIGRATE: detected {} open shift(s). Re-run with: `mfd db migrate --yes`",
                            n
                        );
                    }

                    info!(open_shifts = n, "applying migrations");
                    mfd_db::migrate(&pool).await?;
                    println!("migrations_applied=true");
                }
            }
        }

        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = mfd_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::Shift { cmd } => {
            let rt = Runtime::load()?;
            let store = PgStore::new(rt.connect().await?);
            match cmd {
                ShiftCmd::Open {
                    shift_type_id,
                    opened_by,
                    rate,
                    opening_cash,
                    opening_foreign,
                    work_date,
                } => {
                    shift::open(
                        &store,
                        &rt.policy,
                        shift::OpenArgs {
                            shift_type_id,
                            opened_by,
                            rate,
                            opening_cash,
                            opening_foreign,
                            work_date,
                        },
                    )
                    .await?
                }
                ShiftCmd::Close {
                    shift_id,
                    closed_by,
                } => shift::close(&store, &shift_id, &closed_by).await?,
                ShiftCmd::Current => shift::current(&store).await?,
            }
        }

        Commands::Rate { cmd } => {
            let store = PgStore::new(Runtime::load()?.connect().await?);
            match cmd {
                RateCmd::Record { rate: value } => rate::record(&store, &value).await?,
                RateCmd::Latest => rate::latest(&store).await?,
            }
        }

        Commands::Catalog { cmd } => {
            let store = PgStore::new(Runtime::load()?.connect().await?);
            match cmd {
                CatalogCmd::AddShiftType { name } => catalog::add_shift_type(&store, &name).await?,
                CatalogCmd::AddRoom { number } => catalog::add_room(&store, &number).await?,
                CatalogCmd::AddStayType { name, price, hours } => {
                    catalog::add_stay_type(&store, &name, &price, hours).await?
                }
                CatalogCmd::AddArticle {
                    name,
                    price,
                    tax_percent,
                    stock,
                } => catalog::add_article(&store, &name, &price, &tax_percent, stock).await?,
            }
        }
    }

    Ok(())
}

/// Logs go to stderr so stdout stays `key=value` for scripts.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}
