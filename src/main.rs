//! Operator command line for the instrument catalog.
//!
//! Usage:
//!   gridhedge list
//!   gridhedge add ETHUSDT
//!   gridhedge set ETHUSDT '{"isActive": true}'
//!   gridhedge settings set --api-key KEY --secret-key SECRET

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use gridhedge::config::fetch_config;
use gridhedge::models::{InstrumentUpdate, SettingsUpdate};
use gridhedge::{CatalogError, GridError, GridHedge};
use serde::Serialize;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gridhedge")]
#[command(about = "Manage grid/hedge instrument configuration")]
struct Cli {
    /// State document path (overrides GRIDHEDGE_STATE_PATH)
    #[arg(long, global = true)]
    state: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List configured instruments
    List,
    /// Show one instrument
    Show { symbol: String },
    /// Add an instrument listed on the exchange
    Add { symbol: String },
    /// Apply a JSON merge-patch to an instrument
    Set {
        symbol: String,
        /// e.g. '{"slLong": {"count": 3, "stepUsdt": "10"}}'
        patch: String,
    },
    /// Remove an instrument
    Remove { symbol: String },
    /// List tradable symbols with tick size and quantity step
    Specs,
    /// Exchange credentials
    Settings {
        #[command(subcommand)]
        command: SettingsCommands,
    },
}

#[derive(Subcommand)]
enum SettingsCommands {
    /// Whether credentials are configured
    Status,
    /// Update credentials
    Set {
        #[arg(long)]
        api_key: Option<String>,
        #[arg(long)]
        secret_key: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), GridError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = fetch_config()?;
    if let Some(state) = cli.state {
        config.storage.state_path = state;
    }

    let app = GridHedge::from_config(&config)?;

    match cli.command {
        Commands::List => {
            app.restore().await?;
            print_json(&app.instruments().await)?;
        }
        Commands::Show { symbol } => {
            app.restore().await?;
            let instrument = app
                .instrument(&symbol)
                .await
                .ok_or_else(|| CatalogError::NotFound(symbol.trim().to_uppercase()))?;
            print_json(&instrument)?;
        }
        Commands::Add { symbol } => {
            app.bootstrap().await?;
            print_json(&app.create_instrument(&symbol).await?)?;
        }
        Commands::Set { symbol, patch } => {
            app.restore().await?;
            let patch: InstrumentUpdate = serde_json::from_str(&patch)?;
            print_json(&app.update_instrument(&symbol, &patch).await?)?;
        }
        Commands::Remove { symbol } => {
            app.restore().await?;
            let removed = app.delete_instrument(&symbol).await?;
            print_json(&serde_json::json!({ "removed": removed }))?;
        }
        Commands::Specs => {
            app.restore().await?;
            app.refresh_specs().await?;
            print_json(&app.specs())?;
        }
        Commands::Settings { command } => {
            app.restore().await?;
            match command {
                SettingsCommands::Status => print_json(&app.settings_status().await)?,
                SettingsCommands::Set {
                    api_key,
                    secret_key,
                } => {
                    let patch = SettingsUpdate {
                        bybit_api_key: api_key,
                        bybit_secret_key: secret_key,
                    };
                    let (_, rekeyed) = app.apply_settings(&patch).await?;
                    if rekeyed {
                        if let Err(e) = app.refresh_specs().await {
                            warn!(error = %e, "Failed to refresh specs with the new credentials");
                        }
                    }
                    print_json(&app.settings_status().await)?;
                }
            }
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), GridError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
