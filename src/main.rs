use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use passgate::config::Config;
use passgate::gateway;

#[derive(Parser)]
#[command(name = "passgate", version, about = "Username/password authentication gateway")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP gateway.
    Serve {
        /// Bind host (overrides config).
        #[arg(long)]
        host: Option<String>,
        /// Bind port (overrides config).
        #[arg(long)]
        port: Option<u16>,
        /// Path to a TOML config file (default: ./passgate.toml if present).
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print a bcrypt hash for provisioning a user row.
    HashPassword {
        plain: String,
        /// bcrypt cost factor.
        #[arg(long, default_value_t = bcrypt::DEFAULT_COST)]
        cost: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Command::Serve { host, port, config } => {
            let mut config = Config::load(config.as_deref())?;
            if let Some(host) = host {
                config.gateway.host = host;
            }
            if let Some(port) = port {
                config.gateway.port = port;
            }
            gateway::run_gateway(&config).await
        }
        Command::HashPassword { plain, cost } => {
            println!("{}", bcrypt::hash(plain, cost)?);
            Ok(())
        }
    }
}
