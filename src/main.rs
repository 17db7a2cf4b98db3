use anyhow::Result;
use chatd::{gateway, observability, Config};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Minimal chat backend: accounts, session tokens and a shared message log.
#[derive(Parser, Debug)]
#[command(name = "chatd", version, about)]
struct Cli {
    /// Config file (defaults to the per-user config, if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP gateway (default)
    Serve {
        /// Listen host, overriding the config file
        #[arg(long)]
        host: Option<String>,

        /// Listen port, overriding the config file and environment
        #[arg(long)]
        port: Option<u16>,
    },

    /// Print the effective configuration with secrets masked
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing()?;

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;

    match cli.command.unwrap_or(Command::Serve {
        host: None,
        port: None,
    }) {
        Command::Serve { host, port } => {
            if let Some(host) = host {
                config.gateway.host = host;
            }
            if let Some(port) = port {
                config.gateway.port = port;
            }
            gateway::run_gateway(config).await
        }
        Command::Config => {
            print!("{}", config.redacted().to_toml()?);
            Ok(())
        }
    }
}
