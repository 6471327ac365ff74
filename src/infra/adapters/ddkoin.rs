//! Adapter for the DDK-style REST-path dialect.
//!
//! Every call is a plain HTTP request against an `/api/...` path with a
//! `{data, error}` envelope. Addresses and transaction ids have no
//! canonicalization rules, so the identity normalizers from the trait
//! apply. One address serves one customer; destination tags are not
//! used on this chain.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use tracing::{debug, info, instrument};

use crate::domain::{
    AdapterError, AdapterErrorKind, AddressOptions, Amount, BlockTransaction, BlockchainClient,
    Chain, ConfigError, CreatedAddress, Currency, Issuer, Recipient, RpcError, TxEntry,
    UnitConverter, WalletClient, WalletConfig, WithdrawalOptions,
};
use crate::infra::rpc::{HttpVerb, RpcTransport};

use super::{BlockHeightCache, array_field, base_units, decimal_field, field, str_field, u64_field};

const CHAIN: Chain = Chain::Ddkoin;

/// Base-unit divisor exponent: 10^8 base units per display unit.
const BASE_UNIT_PRECISION: u32 = 8;

const BLOCK_HEIGHT_CACHE_TTL: Duration = Duration::from_secs(5);

/// Transaction type the node assigns to plain transfers.
const TRANSFER_TX_TYPE: u32 = 10;
const BLOCK_PAGE_LIMIT: u32 = 100;
const TX_PAGE_LIMIT: u32 = 250;

pub struct DdkoinClient {
    transport: RpcTransport,
    converter: UnitConverter,
    block_height_cache: BlockHeightCache,
}

impl DdkoinClient {
    pub fn new(config: &WalletConfig) -> Result<Self, ConfigError> {
        let transport = RpcTransport::new(&config.uri, config.rpc_timeout)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        Ok(Self {
            transport,
            converter: UnitConverter::new(BASE_UNIT_PRECISION),
            block_height_cache: BlockHeightCache::new(BLOCK_HEIGHT_CACHE_TTL),
        })
    }

    async fn call(
        &self,
        verb: HttpVerb,
        path: &str,
        params: Value,
        operation: &'static str,
    ) -> Result<Value, AdapterError> {
        self.transport
            .call(verb, path, params)
            .await
            .map_err(|e| adapter_err(operation, e))
    }

    /// Shared request body of `create_withdrawal` and `get_txn_fee`:
    /// both post the same transfer description, to different paths.
    async fn withdrawal_request(
        &self,
        path: &str,
        operation: &'static str,
        issuer: &Issuer,
        recipient: &Recipient,
        amount: Amount,
    ) -> Result<Value, AdapterError> {
        let base_amount = self
            .converter
            .to_base(amount)
            .map_err(|e| adapter_err(operation, e))?;

        let params = json!({
            "senderAddress": issuer.address,
            "secret": issuer.secret.expose_secret(),
            "destinations": [{
                "address": recipient.address,
                "amount": base_amount,
            }],
        });

        let response = self.call(HttpVerb::Post, path, params, operation).await?;
        field(&response, "data")
            .map(Value::clone)
            .map_err(|e| adapter_err(operation, e))
    }
}

#[async_trait]
impl WalletClient for DdkoinClient {
    fn chain(&self) -> Chain {
        CHAIN
    }

    #[instrument(skip(self, options))]
    async fn create_address(
        &self,
        options: &AddressOptions,
    ) -> Result<CreatedAddress, AdapterError> {
        const OP: &str = "create_address";

        let secret = match &options.secret {
            Some(secret) => secret.clone(),
            None => {
                let response = self
                    .call(HttpVerb::Get, "/api/utils/generate-passphrase", Value::Null, OP)
                    .await?;
                let passphrase = field(&response, "data")
                    .and_then(|data| {
                        data.as_str().map(str::to_owned).ok_or_else(|| {
                            RpcError::UnexpectedResponse("data is not a passphrase".to_string())
                        })
                    })
                    .map_err(|e| adapter_err(OP, e))?;
                SecretString::from(passphrase)
            }
        };

        let response = self
            .call(
                HttpVerb::Post,
                "/api/accounts",
                json!({"secret": secret.expose_secret()}),
                OP,
            )
            .await?;
        let address = field(&response, "data")
            .and_then(|data| str_field(data, "address"))
            .map_err(|e| adapter_err(OP, e))?;

        info!(address = %address, "created deposit address");
        Ok(CreatedAddress { address, secret })
    }

    #[instrument(skip(self))]
    async fn load_balance(
        &self,
        address: &str,
        _currency: &Currency,
    ) -> Result<Amount, AdapterError> {
        const OP: &str = "load_balance";

        let path = format!("/api/accounts/{}/balance", address);
        let response = self.call(HttpVerb::Get, &path, Value::Null, OP).await?;
        let base = field(&response, "data")
            .and_then(base_units)
            .map_err(|e| adapter_err(OP, e))?;

        Ok(self.converter.to_display(base))
    }

    #[instrument(skip(self, issuer, _options), fields(issuer = %issuer.address, recipient = %recipient.address, amount = %amount))]
    async fn create_withdrawal(
        &self,
        issuer: &Issuer,
        recipient: &Recipient,
        amount: Amount,
        _options: &WithdrawalOptions,
    ) -> Result<String, AdapterError> {
        const OP: &str = "create_withdrawal";

        let data = self
            .withdrawal_request("/api/transactions", OP, issuer, recipient, amount)
            .await?;
        let txid = str_field(&data, "id").map_err(|e| adapter_err(OP, e))?;

        info!(txid = %txid, "withdrawal submitted");
        Ok(self.normalize_txid(&txid))
    }

    #[instrument(skip(self, issuer, _options), fields(recipient = %recipient.address, amount = %amount))]
    async fn get_txn_fee(
        &self,
        issuer: &Issuer,
        recipient: &Recipient,
        amount: Amount,
        _options: &WithdrawalOptions,
    ) -> Result<Amount, AdapterError> {
        const OP: &str = "get_txn_fee";

        // The fee comes back in base units and is reported as-is.
        let data = self
            .withdrawal_request("/api/transactions/fee", OP, issuer, recipient, amount)
            .await?;
        decimal_field(&data, "fee").map_err(|e| adapter_err(OP, e))
    }
}

#[async_trait]
impl BlockchainClient for DdkoinClient {
    fn chain(&self) -> Chain {
        CHAIN
    }

    #[instrument(skip(self))]
    async fn latest_block_number(&self) -> Result<u64, AdapterError> {
        const OP: &str = "latest_block_number";

        if let Some(height) = self.block_height_cache.get() {
            return Ok(height);
        }

        let response = self.call(HttpVerb::Get, "/api/blocks/last", Value::Null, OP).await?;
        let height = field(&response, "data")
            .and_then(|data| u64_field(data, "height"))
            .map_err(|e| adapter_err(OP, e))?;

        self.block_height_cache.put(height);
        debug!(height, "fetched latest block height");
        Ok(height)
    }

    #[instrument(skip(self))]
    async fn get_block_hash(&self, height: u64) -> Result<String, AdapterError> {
        const OP: &str = "get_block_hash";

        let params = json!({
            "limit": BLOCK_PAGE_LIMIT,
            "offset": 0,
            "filter": {"height": height},
        });
        let response = self.call(HttpVerb::Post, "/api/blocks/getMany", params, OP).await?;
        let blocks = field(&response, "data")
            .and_then(|data| array_field(data, "blocks"))
            .map_err(|e| adapter_err(OP, e))?;
        let block = blocks.first().ok_or_else(|| {
            adapter_err(
                OP,
                RpcError::UnexpectedResponse(format!("no block at height {}", height)),
            )
        })?;

        str_field(block, "id").map_err(|e| adapter_err(OP, e))
    }

    #[instrument(skip(self))]
    async fn get_block(&self, block_hash: &str) -> Result<Vec<Value>, AdapterError> {
        const OP: &str = "get_block";

        let params = json!({
            "limit": TX_PAGE_LIMIT,
            "offset": 0,
            "filter": {"block_id": block_hash, "type": TRANSFER_TX_TYPE},
        });
        let response = self
            .call(HttpVerb::Post, "/api/transactions/getMany", params, OP)
            .await?;

        field(&response, "data")
            .and_then(|data| {
                data.as_array().cloned().ok_or_else(|| {
                    RpcError::UnexpectedResponse("data is not a transaction array".to_string())
                })
            })
            .map_err(|e| adapter_err(OP, e))
    }

    fn build_transaction(
        &self,
        tx: &Value,
        block_number: u64,
    ) -> Result<BlockTransaction, AdapterError> {
        const OP: &str = "build_transaction";

        let id = str_field(tx, "id").map_err(|e| adapter_err(OP, e))?;
        let outputs = array_field(tx, "asset").map_err(|e| adapter_err(OP, e))?;

        let entries = outputs
            .iter()
            .enumerate()
            .map(|(index, output)| {
                let base = field(output, "amount").and_then(base_units)?;
                let address = str_field(output, "recipientAddress")?;
                Ok(TxEntry {
                    amount: self.converter.to_display(base),
                    address,
                    txout: index as u32,
                })
            })
            .collect::<Result<Vec<_>, RpcError>>()
            .map_err(|e| adapter_err(OP, e))?;

        Ok(BlockTransaction {
            id: self.normalize_txid(&id),
            block_number,
            entries,
        })
    }
}

fn adapter_err(operation: &'static str, kind: impl Into<AdapterErrorKind>) -> AdapterError {
    AdapterError::new(CHAIN, operation, kind)
}
