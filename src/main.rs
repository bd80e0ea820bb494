use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use token_poller::core::settings::{LogFormat, LoggingSettings, Settings};
use token_poller::{cli, daemon};

#[derive(Parser)]
#[command(name = "token-poller")]
#[command(author, version, about = "Keeps an OAuth2 token fresh and polls endpoints with it")]
struct Cli {
    /// Config file (default: ~/.config/token-poller/config.toml)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Refresh and poll on the configured interval until stopped
    Daemon,

    /// Run a single refresh-and-poll cycle
    Once {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Refresh the access token once and save the rotated refresh token
    Refresh,

    /// Validate the configuration and token file
    Check,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_logging(logging: &LoggingSettings) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let (text, json) = match logging.format {
        LogFormat::Text => (Some(fmt::layer().with_writer(io::stderr)), None),
        LogFormat::Json => (None, Some(fmt::layer().json().with_writer(io::stderr))),
    };

    let (journald, journald_error) = if logging.journald {
        match tracing_journald::layer() {
            Ok(layer) => (Some(layer), None),
            Err(e) => (None, Some(e)),
        }
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(text)
        .with(json)
        .with(journald)
        .init();

    if let Some(e) = journald_error {
        tracing::warn!(error = %e, "journald unavailable, logging to stderr only");
    }
}

fn load_settings(path: Option<&std::path::Path>) -> anyhow::Result<Settings> {
    let settings = Settings::load(path)?;
    init_logging(&settings.logging);
    tracing::debug!(config_dir = ?settings.base_dir, "Configuration loaded");
    settings.validate()?;
    Ok(settings)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Daemon => daemon::run(load_settings(config)?).await,
        Commands::Once { json } => cli::once::run(&load_settings(config)?, json).await,
        Commands::Refresh => cli::refresh::run(&load_settings(config)?).await,
        Commands::Check => cli::check::run(&load_settings(config)?),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
    }
}
