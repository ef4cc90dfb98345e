//! Third Voice CLI: the main entry point.
//!
//! Commands:
//! - `analyze`: interpret what someone really means
//! - `rewrite`: rewrite your own message constructively
//! - `providers`: show the ordered model table
//! - `doctor`: diagnose configuration
//! - `config`: show, locate or validate the config file
//! - `cache`: maintain the response cache

use clap::{Parser, Subcommand};
use thirdvoice_core::Operation;

mod commands;

#[derive(Parser)]
#[command(
    name = "thirdvoice",
    about = "Third Voice: turn heated messages into understanding",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(clap::Args)]
struct MessageArgs {
    /// The message to work on
    message: String,

    /// Relationship context (romantic, coparenting, workplace, family, friend, or free text)
    #[arg(short, long, default_value = "romantic")]
    context: String,

    /// Run the deep analysis
    #[arg(long)]
    deep: bool,

    /// Print the raw result as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Understand what someone really means and how to respond
    Analyze(MessageArgs),

    /// Rewrite a message to be more constructive
    Rewrite(MessageArgs),

    /// Show the ordered model table
    Providers,

    /// Diagnose configuration and cache health
    Doctor,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Response cache maintenance
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration (API key redacted)
    Show,
    /// Print the config file path
    Path,
    /// Validate the config file
    Validate,
}

#[derive(Subcommand)]
enum CacheAction {
    /// Remove expired entries, or every entry written for one requester
    Purge {
        #[arg(long)]
        requester: Option<String>,
    },
}

fn init_tracing(verbose: bool, json: bool) {
    let filter = if verbose { "debug" } else { "info" };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    match cli.command {
        Commands::Analyze(args) => {
            commands::analyze::run(
                Operation::Interpret,
                &args.message,
                &args.context,
                args.deep,
                args.json,
            )
            .await?
        }
        Commands::Rewrite(args) => {
            commands::analyze::run(
                Operation::Rewrite,
                &args.message,
                &args.context,
                args.deep,
                args.json,
            )
            .await?
        }
        Commands::Providers => commands::providers::run().await?,
        Commands::Doctor => commands::doctor::run().await?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show().await?,
            ConfigAction::Path => commands::config_cmd::path().await?,
            ConfigAction::Validate => commands::config_cmd::validate().await?,
        },
        Commands::Cache { action } => match action {
            CacheAction::Purge { requester } => commands::cache::purge(requester.as_deref()).await?,
        },
    }

    Ok(())
}
