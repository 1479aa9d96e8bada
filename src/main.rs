//! craft-console main entry point
//!
//! This binary is the operator CLI for the command-delivery subsystem.
//! It handles argument parsing, logging setup, configuration loading, and
//! the one-shot dispatch commands.

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use craft_console::channel::{DockerChannel, ProcessChannel};
use craft_console::config::{Config, TransportMethod};
use craft_console::dispatch::CommandDispatcher;
use craft_console::fallback::{FallbackSender, MechanismProbe};
use craft_console::rcon::RconConnection;
use craft_console::{APP_NAME, VERSION};
use std::sync::Arc;

/// Command delivery for containerized game servers
#[derive(Parser, Debug)]
#[command(name = APP_NAME, version = VERSION, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(
        short,
        long,
        global = true,
        default_value = "/etc/craft-console/config.toml"
    )]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Send one command to the server
    Exec {
        /// Command line to deliver
        command: String,
    },

    /// Show the current player list
    Players,

    /// Report which transports and mechanisms are currently usable
    Probe,

    /// Validate the configuration file and exit
    Validate,

    /// Show version information
    Version,
}

/// Availability report printed by the `probe` subcommand
#[derive(Debug, Serialize)]
struct ProbeReport {
    method: TransportMethod,
    mechanisms: Vec<MechanismProbe>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rcon_reachable: Option<bool>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose);

    // Execute command
    if let Err(e) = run(cli).await {
        error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize structured logging with tracing
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Run the CLI command
async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Exec { command } => {
            let config = Config::from_file(&cli.config)?;
            let dispatcher = build_dispatcher(&config)?;

            let outcome = dispatcher.execute(&command).await?;
            dispatcher.close().await;

            println!("{}", serde_json::to_string_pretty(&outcome)?);
            if !outcome.succeeded {
                anyhow::bail!("command was not delivered");
            }
            Ok(())
        }
        Commands::Players => {
            let config = Config::from_file(&cli.config)?;
            let dispatcher = build_dispatcher(&config)?;

            let players = dispatcher.list_players().await?;
            dispatcher.close().await;

            if players.degraded {
                warn!("player list is degraded; treat the numbers as an estimate");
            }
            println!("{}", serde_json::to_string_pretty(&players)?);
            Ok(())
        }
        Commands::Probe => {
            let config = Config::from_file(&cli.config)?;
            config.validate()?;

            let channel = Arc::new(DockerChannel::new(&config.docker, config.timeouts)?);
            let sender = FallbackSender::new(channel, &config.docker, config.timeouts);

            let report = ProbeReport {
                method: config.method,
                mechanisms: sender.probe_report().await,
                rcon_reachable: match &config.rcon {
                    Some(rcon) => Some(probe_rcon(rcon, &config).await),
                    None => None,
                },
            };

            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Commands::Validate => {
            let config = Config::from_file(&cli.config)?;
            config.validate()?;
            info!(method = %config.method, "configuration is valid");
            println!("{}: configuration is valid (method = {})", cli.config, config.method);
            Ok(())
        }
        Commands::Version => {
            println!("{} v{}", APP_NAME, VERSION);
            Ok(())
        }
    }
}

/// Build a ready dispatcher from validated configuration
fn build_dispatcher(config: &Config) -> anyhow::Result<CommandDispatcher> {
    let channel: Arc<dyn ProcessChannel> =
        Arc::new(DockerChannel::new(&config.docker, config.timeouts)?);
    Ok(CommandDispatcher::with_config(config, channel)?)
}

/// Try a full RCON handshake and tear the session down again
async fn probe_rcon(rcon: &craft_console::config::RconConfig, config: &Config) -> bool {
    match RconConnection::connect(rcon, config.timeouts).await {
        Ok(connection) => {
            connection.close().await;
            true
        }
        Err(e) => {
            warn!(error = %e, "RCON probe failed");
            false
        }
    }
}
