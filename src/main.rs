use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use reputation_oracle::config::{Config, LogConfig};
use reputation_oracle::{client_version, service, ScoreMapper};

#[derive(Parser)]
#[command(name = "reputation-oracle")]
#[command(about = "Credit-score oracle that commits reputation adjustments on chain", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    
    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    
    /// Log level; RUST_LOG takes precedence
    #[arg(short, long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the oracle HTTP service
    Serve,
    
    /// Configuration utilities
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    
    /// Oracle account utilities
    Account {
        #[command(subcommand)]
        command: AccountCommands,
    },
    
    /// Print the score delta for a default probability
    Score {
        #[arg(short, long)]
        probability: f64,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Write a default configuration file
    Init {
        #[arg(short, long, default_value = "oracle.toml")]
        output: PathBuf,
    },
}

#[derive(Subcommand)]
enum AccountCommands {
    /// Print the address derived from the configured key
    Address,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    
    match cli.command {
        Commands::Serve => {
            let config = Config::load(cli.config.as_deref())?;
            init_logging(&config.log, cli.log_level.as_deref())?;
            info!("Starting {}", client_version());
            service::run(config).await?;
        }
        
        Commands::Config { command } => match command {
            ConfigCommands::Init { output } => {
                init_logging(&LogConfig::default(), cli.log_level.as_deref())?;
                if output.exists() {
                    anyhow::bail!("Refusing to overwrite existing file {}", output.display());
                }
                Config::default().to_file(&output)?;
                info!("Wrote default configuration to {}", output.display());
            }
        },
        
        Commands::Account { command } => match command {
            AccountCommands::Address => {
                let config = load_without_validation(cli.config.as_deref())?;
                let account = config
                    .oracle
                    .key_source()
                    .load()
                    .context("Failed to load oracle private key")?;
                println!("{}", account.address());
            }
        },
        
        Commands::Score { probability } => {
            let delta = ScoreMapper.map(probability)?;
            println!("{}", delta);
        }
    }
    
    Ok(())
}

/// Key lookups only need the `[oracle]` section.
fn load_without_validation(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(path),
        None => Ok(Config::default()),
    }
}

fn init_logging(log: &LogConfig, cli_level: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(cli_level.unwrap_or(&log.level)))
        .context("Invalid log level")?;
    
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if log.json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}
