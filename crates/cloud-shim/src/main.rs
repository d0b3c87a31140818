//! `ade-cloud`: command-line access to cloud tasks over HTTP or fixtures

use anyhow::Result;
use clap::{Parser, Subcommand};
use engine_bridge::cloud::cli::NOT_FOUND_EXIT_CODE;
use engine_bridge::{ApplyOptions, Error, Settings};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "ade-cloud")]
#[command(about = "List, inspect and apply cloud tasks")]
#[command(version)]
struct Cli {
    /// Settings file (YAML); the environment is used when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available cloud tasks
    List {
        /// Output JSON
        #[arg(long)]
        json: bool,
    },

    /// Show details for a task
    Show {
        /// Task id
        id: String,

        /// Output JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the diff for a task
    Diff {
        /// Task id
        id: String,
    },

    /// Apply a task patch
    Apply {
        /// Task id
        id: String,

        /// Target branch name
        #[arg(long)]
        branch: Option<String>,

        /// Force a three-way merge
        #[arg(long)]
        three_way: bool,

        /// Output JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let settings = match &cli.config {
        Some(path) => Settings::from_file(path)?,
        None => Settings::from_env()?,
    };

    // Never the CLI backend: that would be this binary calling itself.
    let backend = settings.cloud.direct_backend();
    debug!(backend = backend.name(), "using cloud backend");
    let client = backend.connect();
    let client = client.as_ref();

    match cli.command {
        Commands::List { json } => commands::list(client, json).await,
        Commands::Show { id, json } => commands::show(client, &id, json).await,
        Commands::Diff { id } => commands::diff(client, &id).await,
        Commands::Apply {
            id,
            branch,
            three_way,
            json,
        } => commands::apply(client, &id, &ApplyOptions { branch, three_way }, json).await,
    }
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    match smol::block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err:#}");
            exit_code_for(&err)
        }
    }
}

/// Unknown tasks get their own status so callers can tell them from failures
fn exit_code_for(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<Error>() {
        Some(Error::NotFound { .. }) => ExitCode::from(NOT_FOUND_EXIT_CODE as u8),
        _ => ExitCode::FAILURE,
    }
}
