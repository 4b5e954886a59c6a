use std::path::PathBuf;
use std::process::ExitCode;

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use serde_json::json;

use btc_wallet_gateway::chain::{BitcoinAddress, UserId, WalletResult};
use btc_wallet_gateway::config::{load_config, WalletConfig};
use btc_wallet_gateway::identity::StaticIdentity;
use btc_wallet_gateway::observability::logging::init_logging;
use btc_wallet_gateway::provisioning::{KeyDisclosure, PrivateKey};
use btc_wallet_gateway::WalletService;

#[derive(Parser)]
#[command(name = "wallet-cli")]
#[command(about = "Resolve balances and provision wallets without the HTTP gateway", long_about = None)]
struct Cli {
    /// Configuration file (defaults are used when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate an address format (no network calls)
    Check { address: String },
    /// Resolve an address balance
    Balance { address: String },
    /// List an address's transactions, newest first
    Transactions { address: String },
    /// Open a user's wallet, creating it on first use
    Provision {
        #[arg(long, env = "WALLET_USER_ID")]
        user: String,
    },
    /// Load and validate the configuration
    ConfigCheck,
}

/// Prints the private key to the terminal, once, on stderr.
struct TerminalDisclosure;

#[async_trait]
impl KeyDisclosure for TerminalDisclosure {
    async fn disclose(&self, address: &BitcoinAddress, key: &PrivateKey) -> WalletResult<()> {
        eprintln!();
        eprintln!("Private key for {} (shown once, it is not stored anywhere):", address);
        eprintln!("  {}", key.expose());
        eprintln!();
        Ok(())
    }
}

fn print_json(value: &impl serde::Serialize) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => WalletConfig::default(),
    };
    // Results go to stdout, so only warnings and errors are logged by default.
    let mut observability = config.observability.clone();
    observability.log_level = "warn".to_string();
    init_logging(&observability).map_err(|e| e as Box<dyn std::error::Error>)?;

    let service = WalletService::from_config(&config)?;

    match cli.command {
        Commands::Check { address } => {
            let address = service.check_address(&address)?;
            print_json(&json!({ "address": address, "valid": true, "format": address.format() }))?;
        }
        Commands::Balance { address } => {
            let balance = service.balance(&address).await?;
            print_json(&json!({
                "address": address.trim(),
                "satoshis": balance.satoshis,
                "btc": balance.btc(),
                "provider": balance.provider,
            }))?;
        }
        Commands::Transactions { address } => {
            let transactions = service.transactions(&address).await?;
            print_json(&transactions)?;
        }
        Commands::Provision { user } => {
            if !config.storage.backend.is_durable() {
                return Err(format!(
                    "refusing to provision with {:?} storage: the address would be regenerated on the next run",
                    config.storage.backend
                )
                .into());
            }
            let identity = StaticIdentity::signed_in(UserId::new(user));
            let view = service.open_wallet(&identity, &TerminalDisclosure).await?;
            print_json(&view)?;
        }
        Commands::ConfigCheck => {
            println!("Configuration OK ({} network)", config.network);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
