use std::path::PathBuf;

use anyhow::Context;
use chrono::{Datelike, Duration, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

mod aggregate;
mod analysis;
mod balance;
mod config;
mod db;
mod error;
mod insights;
mod models;
mod observability;
mod report;
mod trend;

use config::AppConfig;
use db::Scope;
use models::{BillingRecord, DeviceUsage, Reading};

#[derive(Parser)]
#[command(name = "meter-insights")]
#[command(
    about = "Usage, trend and token insights for prepaid electricity meters",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
#[group(multiple = false)]
struct ScopeArgs {
    /// Limit to a single meter number
    #[arg(long)]
    meter: Option<String>,
    /// Limit to all meters of one account
    #[arg(long)]
    user: Option<Uuid>,
}

impl ScopeArgs {
    fn into_scope(self) -> Scope {
        Scope::from_args(self.meter, self.user)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load two weeks of demo readings
    Seed,
    /// Import readings from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Print today's usage, weekly averages and the token estimate
    Summary {
        #[command(flatten)]
        scope: ScopeArgs,
    },
    /// List the insights derived from recent readings
    Insights {
        #[command(flatten)]
        scope: ScopeArgs,
        /// Print the full analysis as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate a markdown report
    Report {
        #[command(flatten)]
        scope: ScopeArgs,
        #[arg(long, default_value = "energy-report.md")]
        out: PathBuf,
    },
}

struct Window {
    readings: Vec<Reading>,
    billing: Vec<BillingRecord>,
    devices: Vec<DeviceUsage>,
}

/// Fetches everything the analysis needs. A failed query is logged and
/// treated as an empty row set.
async fn load_window(pool: &PgPool, scope: &Scope, today: NaiveDate, cfg: &AppConfig) -> Window {
    let lookback = analysis::lookback_days(cfg) as i64;
    let readings_since = Utc::now() - Duration::days(lookback + 1);
    let month_start = today.with_day(1).unwrap_or(today);
    let devices_since = today - Duration::days(6);

    let readings = db::fetch_readings(pool, readings_since, scope)
        .await
        .unwrap_or_else(|err| {
            tracing::warn!(error = %format!("{err:#}"), "no reading data available");
            Vec::new()
        });
    let billing = db::fetch_billing(pool, month_start, scope)
        .await
        .unwrap_or_else(|err| {
            tracing::warn!(error = %format!("{err:#}"), "no billing data available");
            Vec::new()
        });
    let devices = db::fetch_device_usage(pool, devices_since, scope)
        .await
        .unwrap_or_else(|err| {
            tracing::warn!(error = %format!("{err:#}"), "no device breakdown available");
            Vec::new()
        });

    tracing::info!(
        scope = %scope.label(),
        readings = readings.len(),
        billing = billing.len(),
        devices = devices.len(),
        "loaded reading window"
    );

    Window {
        readings,
        billing,
        devices,
    }
}

async fn run_analysis(pool: &PgPool, scope: &Scope, cfg: &AppConfig) -> analysis::Analysis {
    let today = Utc::now().with_timezone(&cfg.analysis.offset()).date_naive();
    let window = load_window(pool, scope, today, cfg).await;
    analysis::analyze(&window.readings, &window.billing, &window.devices, today, cfg)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init_tracing();

    let cli = Cli::parse();
    let cfg = AppConfig::load().context("failed to load configuration")?;
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to the dashboard's Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(cfg.database.max_connections)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let inserted = db::seed(&pool, cfg.analysis.offset()).await?;
            println!("Seed data inserted ({inserted} new readings).");
        }
        Commands::Import { csv } => {
            let inserted = db::import_csv(&pool, &csv).await?;
            println!("Inserted {inserted} readings from {}.", csv.display());
        }
        Commands::Summary { scope } => {
            let scope = scope.into_scope();
            let analysis = run_analysis(&pool, &scope, &cfg).await;
            print!("{}", report::build_summary(&scope.label(), &analysis));
        }
        Commands::Insights { scope, json } => {
            let scope = scope.into_scope();
            let analysis = run_analysis(&pool, &scope, &cfg).await;

            if json {
                println!("{}", serde_json::to_string_pretty(&analysis)?);
                return Ok(());
            }

            println!("Insights for {}:", scope.label());
            for insight in &analysis.insights {
                println!("- {}", report::format_insight(insight));
            }
        }
        Commands::Report { scope, out } => {
            let scope = scope.into_scope();
            let analysis = run_analysis(&pool, &scope, &cfg).await;
            let report = report::build_report(&scope.label(), &analysis);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
