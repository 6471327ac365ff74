//! Chain adapters: one module per chain family, each implementing the
//! full wallet operation set plus the block-scan helpers over its own
//! RPC dialect. Selection is a `match` on the configured chain key.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use rust_decimal::Decimal;
use serde_json::Value;

use crate::domain::{
    BlockchainClient, Chain, ConfigError, RpcError, WalletClient, WalletConfig,
};

pub mod ddkoin;
pub mod ripple;

pub use ddkoin::DdkoinClient;
pub use ripple::RippledClient;

/// Builds the wallet-operation adapter for the configured chain.
pub fn build_wallet_client(config: &WalletConfig) -> Result<Arc<dyn WalletClient>, ConfigError> {
    Ok(match config.chain {
        Chain::Ddkoin => Arc::new(DdkoinClient::new(config)?),
        Chain::Ripple => Arc::new(RippledClient::new(config)?),
    })
}

/// Builds the block-scan adapter for the configured chain.
pub fn build_blockchain_client(
    config: &WalletConfig,
) -> Result<Arc<dyn BlockchainClient>, ConfigError> {
    Ok(match config.chain {
        Chain::Ddkoin => Arc::new(DdkoinClient::new(config)?),
        Chain::Ripple => Arc::new(RippledClient::new(config)?),
    })
}

/// Short-lived cache around the latest-block-height call, bounding RPC
/// load while the ingestion pipeline polls.
pub(crate) struct BlockHeightCache {
    ttl: Duration,
    slot: Mutex<Option<(Instant, u64)>>,
}

impl BlockHeightCache {
    pub(crate) fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: Mutex::new(None),
        }
    }

    pub(crate) fn get(&self) -> Option<u64> {
        let guard = self.slot.lock().ok()?;
        guard.and_then(|(stored_at, height)| (stored_at.elapsed() < self.ttl).then_some(height))
    }

    pub(crate) fn put(&self, height: u64) {
        if let Ok(mut guard) = self.slot.lock() {
            *guard = Some((Instant::now(), height));
        }
    }
}

// ============================================================================
// RESPONSE FIELD EXTRACTION
// ============================================================================
//
// Node payloads arrive as loose JSON; a missing or mistyped field is an
// unexpected-response error, never a silently-empty success.

pub(crate) fn field<'a>(value: &'a Value, name: &str) -> Result<&'a Value, RpcError> {
    value
        .get(name)
        .ok_or_else(|| RpcError::UnexpectedResponse(format!("missing field: {}", name)))
}

pub(crate) fn str_field(value: &Value, name: &str) -> Result<String, RpcError> {
    field(value, name)?
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| RpcError::UnexpectedResponse(format!("field {} is not a string", name)))
}

pub(crate) fn array_field<'a>(value: &'a Value, name: &str) -> Result<&'a Vec<Value>, RpcError> {
    field(value, name)?
        .as_array()
        .ok_or_else(|| RpcError::UnexpectedResponse(format!("field {} is not an array", name)))
}

/// Integer base-unit amount; some dialects report these as numbers,
/// others as decimal strings.
pub(crate) fn base_units(value: &Value) -> Result<u64, RpcError> {
    if let Some(n) = value.as_u64() {
        return Ok(n);
    }
    if let Some(s) = value.as_str() {
        if let Ok(n) = s.parse::<u64>() {
            return Ok(n);
        }
    }
    Err(RpcError::UnexpectedResponse(format!(
        "not a base-unit amount: {}",
        value
    )))
}

pub(crate) fn u64_field(value: &Value, name: &str) -> Result<u64, RpcError> {
    base_units(field(value, name)?)
        .map_err(|_| RpcError::UnexpectedResponse(format!("field {} is not an integer", name)))
}

pub(crate) fn decimal_field(value: &Value, name: &str) -> Result<Decimal, RpcError> {
    let raw = field(value, name)?;
    if let Some(n) = raw.as_u64() {
        return Ok(Decimal::from(n));
    }
    if let Some(n) = raw.as_i64() {
        return Ok(Decimal::from(n));
    }
    if let Some(s) = raw.as_str() {
        if let Ok(d) = s.parse::<Decimal>() {
            return Ok(d);
        }
    }
    Err(RpcError::UnexpectedResponse(format!(
        "field {} is not a decimal",
        name
    )))
}
