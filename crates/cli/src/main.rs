//! fieldnote CLI: the main entry point.
//!
//! Commands:
//! - `research`: Run a research goal through the agent loop
//! - `agents`: List registered agents and their merge strategies
//! - `onboard`: Initialize config & reports directory
//! - `doctor`: Diagnose configuration and API keys
//! - `config`: Validate, show, or locate the config file

use clap::{Parser, Subcommand};

mod commands;
mod report;

#[derive(Parser)]
#[command(
    name = "fieldnote",
    about = "fieldnote — iterative multi-agent research reports",
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

#[derive(Subcommand)]
enum Commands {
    /// Research a goal and produce a report
    Research {
        /// The research goal (prompted for when omitted)
        #[arg(short, long)]
        goal: Option<String>,

        /// Override engine.max_iterations
        #[arg(long)]
        max_iterations: Option<usize>,

        /// Print the report without saving it
        #[arg(long)]
        no_save: bool,
    },

    /// List available agents
    Agents,

    /// Initialize configuration and reports directory
    Onboard,

    /// Diagnose configuration health
    Doctor,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Load and validate the config file
    Validate,
    /// Print the effective configuration (secrets redacted)
    Show,
    /// Print the config file path
    Path,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    match cli.command {
        Commands::Research {
            goal,
            max_iterations,
            no_save,
        } => commands::research::run(goal, max_iterations, no_save).await?,
        Commands::Agents => commands::agents::run().await?,
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Doctor => commands::doctor::run().await?,
        Commands::Config { action } => match action {
            ConfigAction::Validate => commands::config_cmd::validate().await?,
            ConfigAction::Show => commands::config_cmd::show().await?,
            ConfigAction::Path => commands::config_cmd::path().await?,
        },
    }

    Ok(())
}
