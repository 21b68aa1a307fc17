//! pgdelta CLI
//!
//! Command-line tool computing PostgreSQL migrations from configurations.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use pgdelta::introspect::PostgresIntrospector;
use pgdelta::{Baseline, load_configuration, write_output};
use pgdelta_core::{CatalogOptions, Configuration, compute_delta, join_statements, synthesize};

/// Declarative PostgreSQL schema migrations.
#[derive(Parser)]
#[command(name = "pgdelta")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the migration script bringing the baseline to the desired
    /// configuration.
    Script(DiffArgs),

    /// Print the delta between the baseline and the desired configuration
    /// as JSON.
    Delta(DiffArgs),

    /// Print the configuration of a live database as JSON.
    Snapshot {
        /// Database URL.
        #[arg(long, env = "DATABASE_URL")]
        database_url: String,

        #[command(flatten)]
        catalog: CatalogArgs,

        /// Write to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args)]
struct DiffArgs {
    /// Desired configuration: a JSON file, or a directory of them.
    #[arg(long)]
    desired: PathBuf,

    /// Baseline configuration (JSON). Takes precedence over the database.
    #[arg(long)]
    baseline: Option<PathBuf>,

    /// Read the baseline from this database.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    #[command(flatten)]
    catalog: CatalogArgs,

    /// Write to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct CatalogArgs {
    /// Leave a schema out of the live configuration (repeatable).
    #[arg(long = "exclude-schema", value_name = "SCHEMA")]
    exclude_schemas: Vec<String>,

    /// Skip columns of unsupported types instead of failing.
    #[arg(long)]
    skip_unsupported: bool,

    /// Seconds to wait for a database connection.
    #[arg(long, default_value_t = 10)]
    connect_timeout: u64,
}

impl CatalogArgs {
    fn options(&self) -> CatalogOptions {
        let mut options = CatalogOptions::default();
        options
            .exclude_schemas
            .extend(self.exclude_schemas.iter().cloned());
        options.skip_unsupported = self.skip_unsupported;
        options
    }

    const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }
}

impl DiffArgs {
    async fn load(&self) -> anyhow::Result<(Configuration, Configuration)> {
        let desired = load_configuration(&self.desired)?;
        info!(path = %self.desired.display(), "loaded desired configuration");

        let baseline = Baseline::from_args(
            self.baseline.clone(),
            self.database_url.clone(),
            self.catalog.connect_timeout(),
        )
        .load(&self.catalog.options())
        .await?;
        Ok((baseline, desired))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr, stdout carries the output
    let log_level = match cli.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Script(args) => {
            let (baseline, desired) = args.load().await?;
            let delta = compute_delta(&baseline, &desired)?;
            let statements = synthesize(&delta)?;
            if statements.is_empty() {
                info!("Nothing to migrate.");
            } else {
                info!(statements = statements.len(), "Generated migration script.");
            }
            write_output(args.output.as_deref(), &join_statements(&statements))?;
        }

        Commands::Delta(args) => {
            let (baseline, desired) = args.load().await?;
            let delta = compute_delta(&baseline, &desired)?;
            info!(
                schemas = delta.schemas.new.len(),
                new_tables = delta.tables.new.len(),
                altered_tables = delta.tables.alter.len(),
                "Computed delta."
            );
            write_output(args.output.as_deref(), &serde_json::to_string_pretty(&delta)?)?;
        }

        Commands::Snapshot {
            database_url,
            catalog,
            output,
        } => {
            let introspector =
                PostgresIntrospector::connect(&database_url, catalog.connect_timeout()).await?;
            let configuration = introspector.introspect(&catalog.options()).await?;
            write_output(
                output.as_deref(),
                &serde_json::to_string_pretty(&configuration)?,
            )?;
        }
    }

    Ok(())
}
