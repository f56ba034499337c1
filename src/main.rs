//! multichain-swap command-line entry point.
//!
//! Every command prints one JSON document on stdout. Logs go to stderr.
//! The secret phrase is read from the environment variable named in
//! `keys.secret_env`, never from a flag.

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

use multichain_swap::chain::Chain;
use multichain_swap::config::{load_config, parse_config, SwapConfig};
use multichain_swap::error::Stage;
use multichain_swap::keys::{derive, SecretPhrase};
use multichain_swap::lifecycle::{signals, CancellationSource};
use multichain_swap::pipeline::PollPolicy;
use multichain_swap::resilience::Backoff;
use multichain_swap::{observability, SwapService};

#[derive(Parser)]
#[command(name = "multichain-swap")]
#[command(about = "Swap native coins between Ethereum and Solana", long_about = None)]
struct Cli {
    /// TOML configuration file; built-in defaults when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show derived addresses and pool addresses
    Addresses,
    /// Price a swap without executing it
    Quote {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long)]
        amount: Decimal,
    },
    /// Quote and pay out on the target chain
    Swap {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long)]
        amount: Decimal,
        #[arg(long)]
        destination: String,
        /// Wait until the payout is final on chain
        #[arg(long)]
        wait: bool,
    },
    /// Pay out the value of a deposit made to a pool
    Redeem {
        #[arg(long)]
        chain: Chain,
        #[arg(long)]
        tx: String,
        #[arg(long)]
        to_token: String,
        #[arg(long)]
        destination: String,
        #[arg(long)]
        wait: bool,
    },
    /// Look up a transaction, retrying until the node knows it
    Lookup {
        #[arg(long)]
        chain: Chain,
        #[arg(long)]
        tx: String,
        /// Override the configured attempt budget
        #[arg(long)]
        attempts: Option<u32>,
        /// Fixed delay between attempts, overriding the configured schedule
        #[arg(long)]
        delay_ms: Option<u64>,
    },
    /// Native balance of an address (pool address by default)
    Balance {
        #[arg(long)]
        chain: Chain,
        #[arg(long)]
        address: Option<String>,
    },
    /// Send test funds to an address
    Fund {
        #[arg(long)]
        chain: Chain,
        #[arg(long)]
        address: String,
        /// Whole coins; defaults to 1
        #[arg(long)]
        amount: Option<Decimal>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match read_config(cli.config.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    };

    if let Err(e) = observability::init(&config.observability) {
        eprintln!("Error: logging setup failed: {}", e);
    }

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "multichain-swap starting");

    if let Err(e) = run(cli.command, &config).await {
        tracing::error!(error = %e, "Command failed");
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn read_config(path: Option<&PathBuf>) -> Result<SwapConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(path) => load_config(path)?,
        None => parse_config("")?,
    };
    Ok(config)
}

async fn run(command: Commands, config: &SwapConfig) -> Result<(), Box<dyn std::error::Error>> {
    let secret = SecretPhrase::from_env(&config.keys.secret_env)
        .map_err(|e| e.at(Stage::Derive, None))?;
    let keys = derive(&secret).map_err(|e| e.at(Stage::Derive, None))?;
    drop(secret);

    let service = SwapService::from_config(config, keys).await?;

    let source = CancellationSource::new();
    let cancel = source.token();
    let _signals = signals::cancel_on_signal(source);

    match command {
        Commands::Addresses => print_json(&service.addresses())?,
        Commands::Quote { from, to, amount } => {
            print_json(&service.quote(&from, &to, amount).await?)?
        }
        Commands::Swap {
            from,
            to,
            amount,
            destination,
            wait,
        } => {
            let execution = service
                .swap(&from, &to, amount, &destination, wait, &cancel)
                .await?;
            print_json(&execution)?
        }
        Commands::Redeem {
            chain,
            tx,
            to_token,
            destination,
            wait,
        } => {
            let result = service
                .swap_from_deposit(chain, &tx, &to_token, &destination, wait, &cancel)
                .await?;
            print_json(&result)?
        }
        Commands::Lookup {
            chain,
            tx,
            attempts,
            delay_ms,
        } => {
            let record = if attempts.is_some() || delay_ms.is_some() {
                let mut policy = PollPolicy::from_config(&config.poller);
                if let Some(attempts) = attempts {
                    policy.max_attempts = attempts.max(1);
                }
                if let Some(delay_ms) = delay_ms {
                    policy.backoff = Backoff::Fixed(Duration::from_millis(delay_ms));
                }
                service.lookup_with(chain, &tx, &policy, &cancel).await?
            } else {
                service.lookup(chain, &tx, &cancel).await?
            };
            print_json(&record)?
        }
        Commands::Balance { chain, address } => {
            print_json(&service.balance(chain, address.as_deref()).await?)?
        }
        Commands::Fund {
            chain,
            address,
            amount,
        } => {
            let tx_id = service.fund(chain, &address, amount).await?;
            print_json(&serde_json::json!({ "chain": chain, "tx_id": tx_id }))?
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
