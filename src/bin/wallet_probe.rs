//! Wallet probe: verify connectivity and configuration against a live node.
//!
//! Builds the configured wallet, then runs the read-only operation set:
//! inspects the wallet's own address, loads its balance, and reads the
//! chain tip. No funds move.
//!
//! Usage:
//!   WALLET_CHAIN=ripple WALLET_RPC_URL=http://localhost:5005 \
//!   WALLET_ADDRESS=r... WALLET_CURRENCY=xrp cargo run --bin wallet_probe

use std::env;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use wallet_gateway::app::WalletService;
use wallet_gateway::domain::{Chain, Currency, WalletConfig};
use wallet_gateway::infra::{MemoryRegistry, build_blockchain_client, build_wallet_client};

fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn wallet_config_from_env() -> Result<WalletConfig> {
    let chain: Chain = env::var("WALLET_CHAIN")
        .context("WALLET_CHAIN not set")?
        .parse()
        .map_err(anyhow::Error::msg)?;
    let currency = env::var("WALLET_CURRENCY").context("WALLET_CURRENCY not set")?;
    let uri = env::var("WALLET_RPC_URL").context("WALLET_RPC_URL not set")?;
    let address = env::var("WALLET_ADDRESS").context("WALLET_ADDRESS not set")?;

    let mut config = WalletConfig::new(chain, Currency::new(currency), uri, address);
    if let Ok(secret) = env::var("WALLET_SECRET") {
        config = config.with_secret(secret.into());
    }
    if let Some(timeout) = env::var("WALLET_RPC_TIMEOUT_SECS")
        .ok()
        .and_then(|raw| raw.parse().ok())
    {
        config = config.with_rpc_timeout(Duration::from_secs(timeout));
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    init_tracing();

    info!("🔍 Wallet probe v{}", env!("CARGO_PKG_VERSION"));

    let config = wallet_config_from_env()?;
    let chain = config.chain;
    let currency = config.currency.clone();
    let address = config.address.clone();
    info!(chain = %chain, address = %address, "probing wallet");

    let client = build_wallet_client(&config)?;
    let blockchain = build_blockchain_client(&config)?;
    let service = WalletService::new(config, client, Arc::new(MemoryRegistry::new()));

    let inspected = service.inspect_address(&address).await?;
    if inspected.is_valid {
        info!(address = %inspected.address, "   ✓ address accepted");
    } else {
        warn!(address = %inspected.address, "   ✗ address rejected by the chain's shape rules");
    }

    let balance = service.load_balance(&address, &currency).await?;
    info!(balance = %balance, currency = %currency, "   ✓ balance loaded");

    let height = blockchain.latest_block_number().await?;
    info!(height, "   ✓ chain tip reached");

    info!("Probe complete");
    Ok(())
}
