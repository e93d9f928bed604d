//! Viction Connect command-line host
//!
//! Discovers wallets over the announce/request channel, connects one of them
//! to the configured Viction network and prints the account state.

mod events;

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use ethers::types::Address;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use viction_connect::chains::supported_networks;
use viction_connect::client::{http_reader, ChainReader};
use viction_connect::provider::HttpProvider;
use viction_connect::{ConnectConfig, Network, WalletKit};

use events::LogEvents;

#[derive(Parser)]
#[command(name = "viction-connect")]
#[command(about = "Connect a wallet to the Viction network")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the supported networks
    Networks,
    /// Query the native balance of an address
    Balance {
        /// Account address
        address: String,
        /// Network to query (defaults to VICTION_NETWORK or mainnet)
        #[arg(short, long)]
        network: Option<String>,
    },
    /// Discover a JSON-RPC wallet, connect it and print its account
    Connect {
        /// Wallet JSON-RPC endpoint
        #[arg(long)]
        wallet_rpc: String,
        /// Display name announced for the wallet
        #[arg(long, default_value = "JSON-RPC Wallet")]
        name: String,
        /// How long to wait for announcements, in milliseconds
        #[arg(long, default_value_t = 300)]
        discovery_ms: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let mut config = ConnectConfig::from_env()?;

    match cli.command {
        Commands::Networks => {
            println!("{}", serde_json::to_string_pretty(&supported_networks())?);
        }
        Commands::Balance { address, network } => {
            if let Some(network) = network {
                config.network = Network::from_str(&network)?;
            }
            let account = Address::from_str(&address).context("invalid address")?;
            let chain = config.network.descriptor();
            let reader = http_reader(&chain)?;
            let balance = reader.get_balance(account).await?;
            println!("{} {}", chain.format_balance(balance)?, chain.native_currency.symbol);
        }
        Commands::Connect {
            wallet_rpc,
            name,
            discovery_ms,
        } => {
            connect(config, wallet_rpc, name, Duration::from_millis(discovery_ms)).await?;
        }
    }

    Ok(())
}

async fn connect(config: ConnectConfig, wallet_rpc: String, name: String, discovery: Duration) -> anyhow::Result<()> {
    let events = Arc::new(LogEvents);
    let kit = WalletKit::init(config, events.clone())?;

    let wallet = Arc::new(HttpProvider::new(wallet_rpc)).into_detail(name);
    let wallet_task = kit.bus().serve(wallet);

    tokio::time::sleep(discovery).await;
    let registry = kit.registry();
    info!(
        sponsors = registry.list_sponsors().len(),
        general = registry.list().len(),
        "discovery finished"
    );

    let chosen = registry
        .list_sponsors()
        .into_iter()
        .chain(registry.list())
        .next()
        .ok_or_else(|| anyhow!("no wallet announced itself"))?;

    let outcome = kit.connector().connect_on_network(&chosen, events.as_ref()).await?;
    info!(?outcome, "wallet on network");

    match kit.connector().account_snapshot().await? {
        Some(snapshot) => println!(
            "Account: {:?}\nBalance: {} {}",
            snapshot.account,
            snapshot.balance,
            kit.connector().network().native_currency.symbol
        ),
        None => println!("Wallet authorized no accounts"),
    }

    wallet_task.abort();
    kit.shutdown().await;
    Ok(())
}
