use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;
mod util;

use commands::TextInput;
use commands::movements::MovementCommands;

#[derive(Parser)]
#[command(
    name = "wod",
    version,
    about = "Parse free-text workouts into structured JSON, locally or through the wodparse API"
)]
struct Cli {
    /// API base URL (used by --remote commands and `health`)
    #[arg(long, env = "WOD_API_URL", default_value = "http://localhost:3000")]
    api_url: String,

    /// Movement catalog JSON for local commands (defaults to the built-in catalog)
    #[arg(long, env = "WOD_MOVEMENT_CATALOG")]
    catalog: Option<PathBuf>,

    /// Print compact single-line JSON
    #[arg(long, global = true)]
    raw: bool,

    /// Debug logging on stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check API health
    Health,
    /// Parse workout text into a structured workout
    Parse {
        #[command(flatten)]
        input: TextInput,
        /// Send the text to the API instead of parsing locally
        #[arg(long)]
        remote: bool,
    },
    /// Quick structural check without parsing
    Validate {
        #[command(flatten)]
        input: TextInput,
        /// Send the text to the API instead of checking locally
        #[arg(long)]
        remote: bool,
    },
    /// Movement dictionary lookups
    Movements {
        #[command(subcommand)]
        command: MovementCommands,
    },
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let catalog = cli.catalog.as_deref();
    let code = match cli.command {
        Commands::Health => commands::health::run(&cli.api_url, cli.raw).await,
        Commands::Parse { input, remote } => {
            commands::parse::run(&cli.api_url, catalog, input, remote, cli.raw).await
        }
        Commands::Validate { input, remote } => {
            commands::validate::run(&cli.api_url, input, remote, cli.raw).await
        }
        Commands::Movements { command } => {
            commands::movements::run(&cli.api_url, catalog, command, cli.raw).await
        }
    };

    std::process::exit(code);
}
