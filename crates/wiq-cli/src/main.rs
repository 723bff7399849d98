mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{
    assess::AssessArgs, cache::CacheSubcommand, config::ConfigSubcommand, sync::SyncSubcommand,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "wiq",
    about = "Grade Azure DevOps work items A-F from a local field cache",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .wiq/ or .git/)
    #[arg(long, global = true, env = "WIQ_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default .wiq/config.yaml
    Init {
        /// Project name recorded in the config
        #[arg(long)]
        project: Option<String>,
    },

    /// Inspect and update the work item cache
    Cache {
        #[command(subcommand)]
        subcommand: CacheSubcommand,
    },

    /// Compare the cache with query results and plan fetches
    Sync {
        #[command(subcommand)]
        subcommand: SyncSubcommand,
    },

    /// Grade every expected item and write reports
    Assess(AssessArgs),

    /// Show the scoring breakdown for one cached item
    Score {
        /// Work item id
        id: u64,

        /// Evaluate Prelim against this date (YYYY-MM-DD) instead of today
        #[arg(long)]
        today: Option<String>,
    },

    /// Show or validate the configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init { project } => cmd::init::run(&root, project.as_deref()),
        Commands::Cache { subcommand } => cmd::cache::run(&root, subcommand, cli.json),
        Commands::Sync { subcommand } => cmd::sync::run(&root, subcommand, cli.json),
        Commands::Assess(args) => cmd::assess::run(&root, args, cli.json),
        Commands::Score { id, today } => cmd::score::run(&root, id, today.as_deref(), cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
