//! ScanProxy CLI - Drive and configure the scan request proxy
//!
//! A command-line tool for replaying scan request bursts against a
//! simulated scan engine and managing the persisted throttle settings.

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "scanproxy")]
#[command(author, version, about = "Arbitrate and simulate network scan requests")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay scan requests against a simulated engine
    #[command(alias = "sim")]
    Simulate(commands::simulate::SimulateArgs),

    /// Manage the persisted configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Enable or disable scan throttling
    SetThrottle {
        #[arg(action = clap::ArgAction::Set)]
        enabled: bool,
    },
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Simulate(args) => {
            commands::simulate::run(args, cli.verbose > 0, cli.json).await?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::show(cli.json).await?,
            ConfigAction::SetThrottle { enabled } => commands::config::set_throttle(enabled).await?,
        },
    }

    Ok(())
}
