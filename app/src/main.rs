//! ScanWise command-line front end.

mod commands;
mod error;
mod state;

use clap::{Parser, Subcommand};
use commands::UsageArgs;
use error::CommandError;
use state::AppState;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "scanwise", version, about = "Cosmetic ingredient analysis")]
struct Cli {
    #[arg(long, global = true, help = "Config file (defaults to the user config directory)")]
    config: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        env = "SCANWISE_UID",
        help = "Signed-in user id; the bearer token is read from SCANWISE_TOKEN"
    )]
    uid: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze a typed or pasted ingredient list
    Analyze {
        ingredients: String,
        #[command(flatten)]
        usage: UsageArgs,
    },
    /// Analyze a catalog product by id
    Product {
        id: String,
        #[command(flatten)]
        usage: UsageArgs,
    },
    /// Search the product catalog
    Search { query: String },
    /// Read the ingredient list from a label photo, then analyze it
    Ocr {
        image: PathBuf,
        #[command(flatten)]
        usage: UsageArgs,
    },
    /// Decode a barcode from one or more frames, then analyze the product
    Barcode {
        #[arg(required = true)]
        frames: Vec<PathBuf>,
        #[command(flatten)]
        usage: UsageArgs,
    },
    /// List the signed-in user's scan history
    History,
    /// Show or update stored preferences
    Profile {
        #[arg(long)]
        skin_type: Option<String>,
        #[arg(long)]
        skin_tone: Option<String>,
        #[arg(long)]
        theme: Option<String>,
    },
    /// Print the effective configuration
    Config {
        #[arg(long, default_value_t = false, help = "Also write it to the config file")]
        save: bool,
    },
}

/// Initialize tracing subscriber for logging
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,scanwise=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

async fn run(cli: Cli) -> Result<serde_json::Value, CommandError> {
    let state = AppState::new(cli.config.as_deref(), cli.uid.as_deref())?;
    let config_path = cli.config;

    match cli.command {
        Commands::Analyze { ingredients, usage } => {
            commands::analyze(&state, &ingredients, &usage).await
        }
        Commands::Product { id, usage } => commands::product(&state, &id, &usage).await,
        Commands::Search { query } => commands::search(&state, &query).await,
        Commands::Ocr { image, usage } => commands::ocr(&state, &image, &usage).await,
        Commands::Barcode { frames, usage } => commands::barcode(&state, &frames, &usage).await,
        Commands::History => commands::history(&state).await,
        Commands::Profile {
            skin_type,
            skin_tone,
            theme,
        } => commands::profile(&state, skin_type, skin_tone, theme).await,
        Commands::Config { save } => commands::config(&state, save.then_some(config_path)),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    init_tracing();

    info!("Starting ScanWise v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    let (output, code) = match run(cli).await {
        Ok(value) => (value, ExitCode::SUCCESS),
        Err(e) => {
            tracing::error!("{}: {}", e.code, e.message);
            (serde_json::json!({ "error": e }), ExitCode::FAILURE)
        }
    };

    match serde_json::to_string_pretty(&output) {
        Ok(text) => println!("{text}"),
        Err(e) => {
            tracing::error!("Failed to serialize output: {}", e);
            return ExitCode::FAILURE;
        }
    }
    code
}
