//! Provisioning and seeding for the hr-analytics table.
//!
//! - `bootstrap` creates the table (idempotent).
//! - `seed` loads the built-in sample rows, a JSON file, or synthetic rows,
//!   either directly into the table or through the ingest API.
//! - `status` reports the row count.
//! - `destroy` retains the table unless `--force` is given.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod synthetic;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;

use hr_analytics_client::{AnalyticsClient, ClientOptions};
use hr_analytics_core::{sample_records, QueryRecord, RecordInput, DEFAULT_TABLE_NAME};
use hr_analytics_store::{RocksStore, Store};

pub use synthetic::synthetic_records;

/// Command line interface.
#[derive(Debug, Parser)]
#[command(author, version, about = "Provision and seed the hr-analytics table")]
pub struct Cli {
    /// Directory holding table data.
    #[arg(long, env = "DATA_DIR", default_value = "/data/hr-analytics", global = true)]
    pub data_dir: PathBuf,

    /// Analytics table name.
    #[arg(long, env = "ANALYTICS_TABLE", default_value = DEFAULT_TABLE_NAME, global = true)]
    pub table: String,

    /// Command to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Admin commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create the table and its column families.
    Bootstrap,
    /// Insert rows into the table.
    Seed(SeedArgs),
    /// Show the row count.
    Status,
    /// Delete the table (retained unless --force).
    Destroy {
        /// Actually delete every row and the table files.
        #[arg(long)]
        force: bool,
    },
}

/// Row sources for `seed`. With neither `--file` nor `--synthetic`, the two
/// built-in sample rows are written.
#[derive(Debug, Args)]
pub struct SeedArgs {
    /// JSON array of records.
    #[arg(long, conflicts_with = "synthetic")]
    pub file: Option<PathBuf>,

    /// Number of random rows to generate.
    #[arg(long)]
    pub synthetic: Option<usize>,

    /// Spread synthetic rows over this many days before now.
    #[arg(long, default_value_t = 30)]
    pub days: u32,

    /// RNG seed for reproducible synthetic rows.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Send rows through the ingest API at this base URL instead of writing
    /// the table directly.
    #[arg(long, env = "HR_ANALYTICS_API_URL")]
    pub api_url: Option<String>,

    /// Service API key for the ingest API.
    #[arg(long, env = "SERVICE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
}

impl Cli {
    /// Directory of the table: `{data_dir}/{table}`.
    #[must_use]
    pub fn table_path(&self) -> PathBuf {
        self.data_dir.join(&self.table)
    }
}

/// Run a parsed command.
///
/// # Errors
///
/// Returns an error if the table cannot be opened, the input cannot be read,
/// or the ingest API rejects the rows.
pub async fn run(cli: Cli) -> Result<()> {
    let table_path = cli.table_path();

    match cli.command {
        Command::Bootstrap => {
            open_table(&table_path)?;
            println!("Table ready at {}", table_path.display());
        }
        Command::Seed(args) => {
            let records = seed_rows(&args)?;
            let stored = match (&args.api_url, &args.api_key) {
                (Some(url), Some(key)) => seed_via_api(url, key, &records).await?,
                (Some(_), None) => bail!("--api-url requires --api-key (or SERVICE_API_KEY)"),
                (None, _) => {
                    let store = open_table(&table_path)?;
                    store
                        .put_records(&records)
                        .context("writing records to the table")?;
                    records.len()
                }
            };
            println!("Seeded {stored} records");
        }
        Command::Status => {
            if !table_path.exists() {
                bail!(
                    "table not found at {} (run `bootstrap` first)",
                    table_path.display()
                );
            }
            let store = open_table(&table_path)?;
            let rows = store.count().context("counting rows")?;
            println!("Table {} at {}: {rows} records", cli.table, table_path.display());
        }
        Command::Destroy { force } => destroy(&table_path, force)?,
    }

    Ok(())
}

fn open_table(path: &Path) -> Result<RocksStore> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating data dir: {}", parent.display()))?;
    }
    RocksStore::open(path).with_context(|| format!("opening table: {}", path.display()))
}

fn destroy(path: &Path, force: bool) -> Result<()> {
    if !force {
        println!(
            "Table at {} retained; pass --force to delete it",
            path.display()
        );
        return Ok(());
    }

    if !path.exists() {
        println!("No table at {}", path.display());
        return Ok(());
    }

    let removed = {
        let store = open_table(path)?;
        store.clear().context("deleting rows")?
    };
    RocksStore::destroy(path).with_context(|| format!("removing table: {}", path.display()))?;

    tracing::warn!(path = %path.display(), removed, "Table destroyed");
    println!("Deleted {removed} records and removed {}", path.display());
    Ok(())
}

/// Resolve the rows a `seed` invocation should write.
///
/// # Errors
///
/// Returns an error if the seed file cannot be read or holds an invalid record.
pub fn seed_rows(args: &SeedArgs) -> Result<Vec<QueryRecord>> {
    let now = Utc::now();

    if let Some(path) = &args.file {
        return load_records(path);
    }

    if let Some(count) = args.synthetic {
        let mut rng = match args.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        tracing::info!(count, days = args.days, "Generating synthetic records");
        return Ok(synthetic_records(&mut rng, count, args.days, now));
    }

    Ok(sample_records(now))
}

/// Read a JSON array of records.
///
/// # Errors
///
/// Returns an error naming the file, or the index of the first invalid record.
pub fn load_records(path: &Path) -> Result<Vec<QueryRecord>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading seed file: {}", path.display()))?;
    let inputs: Vec<RecordInput> = serde_json::from_str(&contents)
        .with_context(|| format!("parsing seed file: {}", path.display()))?;

    inputs
        .into_iter()
        .enumerate()
        .map(|(index, input)| {
            QueryRecord::try_from(input).with_context(|| format!("record {index}"))
        })
        .collect()
}

async fn seed_via_api(url: &str, api_key: &str, records: &[QueryRecord]) -> Result<usize> {
    let options = ClientOptions::with_service_name("hr-analytics-admin");
    let client = AnalyticsClient::with_options(url, options)?.with_api_key(api_key);

    tracing::info!(url = %url, count = records.len(), "Seeding through the ingest API");

    let response = client
        .put_records(records)
        .await
        .with_context(|| format!("sending records to {url}"))?;
    Ok(response.stored)
}
