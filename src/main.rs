use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{ArgGroup, Parser, Subcommand, ValueEnum};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod analytics;
mod config;
mod db;
mod ingest;
mod models;
mod negotiation;
mod report;
mod store;

use config::Config;
use db::PgStore;
use ingest::CallPayload;
use models::{LoadFilter, NegotiationRequest};
use store::{CallStore, LoadStore};

#[derive(Parser)]
#[command(name = "freight-desk")]
#[command(about = "Carrier rate negotiation and call analytics desk", long_about = None)]
struct Cli {
    /// Log at debug level regardless of FREIGHT_DESK_LOG
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum DashboardFormat {
    Json,
    Markdown,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed loads and calls
    Seed,
    /// Browse loads by id or by origin/destination
    Loads {
        #[arg(long, conflicts_with_all = ["origin", "destination"])]
        load_id: Option<i64>,
        #[arg(long)]
        origin: Option<String>,
        #[arg(long)]
        destination: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Compute the next rate to offer a carrier
    Negotiate {
        #[arg(long)]
        load_id: i64,
        #[arg(long, allow_negative_numbers = true)]
        offered_rate: f64,
        #[arg(long, allow_negative_numbers = true)]
        counter_offer: f64,
    },
    /// Record the outcome of a negotiation call
    #[command(group(
        ArgGroup::new("source")
            .args(["payload", "file"])
            .required(true)
            .multiple(false)
    ))]
    RecordCall {
        /// Call record as inline JSON
        #[arg(long)]
        payload: Option<String>,
        /// Path to a JSON file holding the call record
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Import call records from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Show success rate, sentiment mix and the 7-day daily averages
    Dashboard {
        #[arg(long, value_enum, default_value_t = DashboardFormat::Json)]
        format: DashboardFormat,
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn init_logging(config: &Config, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("freight_desk=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;
    init_logging(&config, cli.verbose);

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to Postgres")?;
    tracing::debug!(max_connections = config.max_connections, "connected to Postgres");
    let store = PgStore::new(pool.clone());

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Loads {
            load_id,
            origin,
            destination,
            json,
        } => {
            let loads = match load_id {
                Some(id) => vec![store
                    .get_by_id(id)
                    .await?
                    .with_context(|| format!("load {id} not found"))?],
                None => store.search(&LoadFilter { origin, destination }).await?,
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&loads)?);
            } else if loads.is_empty() {
                println!("No loads match this search.");
            } else {
                for load in &loads {
                    println!(
                        "- #{} {} -> {} ({}, {:.0} mi) listed at {:.2}, pickup {}",
                        load.load_id,
                        load.origin,
                        load.destination,
                        load.equipment_type,
                        load.miles,
                        load.loadboard_rate,
                        load.pickup_datetime.format("%Y-%m-%d %H:%M")
                    );
                }
            }
        }
        Commands::Negotiate {
            load_id,
            offered_rate,
            counter_offer,
        } => {
            if !offered_rate.is_finite() || !counter_offer.is_finite() {
                anyhow::bail!("offered_rate and counter_offer must be finite numbers");
            }
            let request = NegotiationRequest {
                load_id,
                offered_rate,
                counter_offer,
            };
            let result = negotiation::negotiate(&store, request).await?;
            println!("{}", serde_json::to_string(&result)?);
        }
        Commands::RecordCall { payload, file } => {
            let raw = match (payload, file) {
                (Some(inline), _) => inline,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read {}", path.display()))?,
                (None, None) => unreachable!("clap requires one call source"),
            };
            let record = CallPayload::from_json(&raw)?.validate(Utc::now())?;
            store.insert(&record).await?;
            tracing::info!(id = %record.id, successful = record.successful, "call recorded");
            println!("Call {} recorded.", record.id);
        }
        Commands::Import { csv } => {
            let summary = db::import_csv(&store, &csv).await?;
            println!(
                "Inserted {} calls from {} ({} already on record).",
                summary.inserted,
                csv.display(),
                summary.duplicates
            );
        }
        Commands::Dashboard { format, out } => {
            let now = Utc::now();
            let snapshot = analytics::dashboard(&store, now).await?;
            let rendered = match format {
                DashboardFormat::Json => serde_json::to_string_pretty(&snapshot)?,
                DashboardFormat::Markdown => report::build_report(&snapshot, now),
            };

            match out {
                Some(path) => {
                    std::fs::write(&path, rendered)?;
                    println!("Dashboard written to {}.", path.display());
                }
                None => println!("{rendered}"),
            }
        }
    }

    Ok(())
}
