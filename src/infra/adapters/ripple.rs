//! Adapter for the rippled JSON-RPC dialect.
//!
//! Every command is `POST /` with `{"method": m, "params": [obj]}` and the
//! node answers inside a `result` object whose `status` field carries the
//! error channel. One funded account serves every customer; deposits are
//! told apart by destination tag, so addresses travel through this module
//! as `base?dt=<tag>` composites. Transaction hashes are compared
//! case-insensitively upstream and are folded to lowercase here.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde_json::{Value, json};
use tracing::{debug, info, instrument};

use crate::domain::{
    AdapterError, AdapterErrorKind, AddressOptions, Amount, BlockTransaction, BlockchainClient,
    Chain, ConfigError, CreatedAddress, Currency, InspectedAddress, Issuer, Recipient, RpcError,
    TaggedAddress, TxEntry, UnitConverter, WalletClient, WalletConfig, WithdrawalOptions,
};
use crate::infra::rpc::{HttpVerb, RpcTransport};

use super::{BlockHeightCache, base_units, decimal_field, field, str_field, u64_field};

const CHAIN: Chain = Chain::Ripple;

/// Base-unit divisor exponent: 10^6 drops per display unit.
const BASE_UNIT_PRECISION: u32 = 6;

const LEDGER_INDEX_CACHE_TTL: Duration = Duration::from_secs(5);

pub struct RippledClient {
    transport: RpcTransport,
    converter: UnitConverter,
    ledger_index_cache: BlockHeightCache,
}

impl RippledClient {
    pub fn new(config: &WalletConfig) -> Result<Self, ConfigError> {
        let transport = RpcTransport::new(&config.uri, config.rpc_timeout)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        Ok(Self {
            transport,
            converter: UnitConverter::new(BASE_UNIT_PRECISION),
            ledger_index_cache: BlockHeightCache::new(LEDGER_INDEX_CACHE_TTL),
        })
    }

    /// Sends one command and unwraps the `result` envelope, turning a
    /// `status: "error"` answer into an application error.
    async fn rpc_request(
        &self,
        method: &'static str,
        params: Value,
        operation: &'static str,
    ) -> Result<Value, AdapterError> {
        let payload = json!({"method": method, "params": [params]});
        let response = self
            .transport
            .call(HttpVerb::Post, "/", payload)
            .await
            .map_err(|e| adapter_err(operation, e))?;
        let result = field(&response, "result").map_err(|e| adapter_err(operation, e))?;

        if result.get("status").and_then(Value::as_str) == Some("error") {
            let message = result
                .get("error_message")
                .or_else(|| result.get("error"))
                .and_then(Value::as_str)
                .unwrap_or("node reported an unnamed error")
                .to_string();
            return Err(adapter_err(
                operation,
                RpcError::Application {
                    message,
                    raw: result.clone(),
                },
            ));
        }

        Ok(result.clone())
    }

    /// Splits a possibly tag-carrying composite into its parts.
    fn split(address: &str, operation: &'static str) -> Result<TaggedAddress, AdapterError> {
        address
            .parse()
            .map_err(|e: String| AdapterError::invalid_address(CHAIN, operation, e))
    }

    /// Shape check for a classic base-58 account: starts with `r`,
    /// 25 to 35 characters, no `0`, `O`, `I` or `l`.
    fn base_has_valid_shape(base: &str) -> bool {
        (25..=35).contains(&base.len())
            && base.starts_with('r')
            && base
                .chars()
                .all(|c| c.is_ascii_alphanumeric() && !matches!(c, '0' | 'O' | 'I' | 'l'))
    }
}

#[async_trait]
impl WalletClient for RippledClient {
    fn chain(&self) -> Chain {
        CHAIN
    }

    #[instrument(skip(self, options))]
    async fn create_address(
        &self,
        options: &AddressOptions,
    ) -> Result<CreatedAddress, AdapterError> {
        const OP: &str = "create_address";

        // A pre-composed tagged address points at the shared account, so
        // the caller must supply that account's secret along with it.
        if let Some(address) = &options.address {
            let secret = options.secret.clone().ok_or_else(|| {
                AdapterError::invalid_address(
                    CHAIN,
                    OP,
                    "a pre-composed address requires the wallet secret",
                )
            })?;
            return Ok(CreatedAddress {
                address: address.clone(),
                secret,
            });
        }

        let result = self.rpc_request("wallet_propose", json!({}), OP).await?;
        let address = str_field(&result, "account_id").map_err(|e| adapter_err(OP, e))?;
        let seed = str_field(&result, "master_seed").map_err(|e| adapter_err(OP, e))?;

        info!(address = %address, "proposed standalone account");
        Ok(CreatedAddress {
            address,
            secret: seed.into(),
        })
    }

    #[instrument(skip(self))]
    async fn load_balance(
        &self,
        address: &str,
        _currency: &Currency,
    ) -> Result<Amount, AdapterError> {
        const OP: &str = "load_balance";

        let account = Self::split(address, OP)?.base;
        let params = json!({"account": account, "ledger_index": "validated"});
        let result = self.rpc_request("account_info", params, OP).await?;
        let drops = field(&result, "account_data")
            .and_then(|data| field(data, "Balance"))
            .and_then(base_units)
            .map_err(|e| adapter_err(OP, e))?;

        Ok(self.converter.to_display(drops))
    }

    #[instrument(skip(self, issuer, options), fields(issuer = %issuer.address, recipient = %recipient.address, amount = %amount))]
    async fn create_withdrawal(
        &self,
        issuer: &Issuer,
        recipient: &Recipient,
        amount: Amount,
        options: &WithdrawalOptions,
    ) -> Result<String, AdapterError> {
        const OP: &str = "create_withdrawal";

        let account = Self::split(&issuer.address, OP)?.base;
        let destination = Self::split(&recipient.address, OP)?;
        let drops = self
            .converter
            .to_base(amount)
            .map_err(|e| adapter_err(OP, e))?;

        let mut tx_json = json!({
            "TransactionType": "Payment",
            "Account": account,
            "Destination": destination.base,
            "Amount": drops.to_string(),
        });
        if let Some(tag) = destination.tag {
            tx_json["DestinationTag"] = json!(tag.value());
        }
        if let Some(source_tag) = options.source_tag {
            tx_json["SourceTag"] = json!(source_tag);
        }

        let params = json!({
            "secret": issuer.secret.expose_secret(),
            "tx_json": tx_json,
        });
        let result = self.rpc_request("submit", params, OP).await?;

        let engine_result = str_field(&result, "engine_result").map_err(|e| adapter_err(OP, e))?;
        if engine_result != "tesSUCCESS" {
            let message = result
                .get("engine_result_message")
                .and_then(Value::as_str)
                .unwrap_or(&engine_result)
                .to_string();
            return Err(adapter_err(
                OP,
                RpcError::Application {
                    message,
                    raw: result.clone(),
                },
            ));
        }

        let txid = field(&result, "tx_json")
            .and_then(|tx| str_field(tx, "hash"))
            .map_err(|e| adapter_err(OP, e))?;

        info!(txid = %txid, "payment submitted");
        Ok(self.normalize_txid(&txid))
    }

    #[instrument(skip(self, _issuer, _options))]
    async fn get_txn_fee(
        &self,
        _issuer: &Issuer,
        _recipient: &Recipient,
        _amount: Amount,
        _options: &WithdrawalOptions,
    ) -> Result<Amount, AdapterError> {
        const OP: &str = "get_txn_fee";

        // Reported in drops, the node's own unit for fees.
        let result = self.rpc_request("fee", json!({}), OP).await?;
        field(&result, "drops")
            .and_then(|drops| decimal_field(drops, "open_ledger_fee"))
            .map_err(|e| adapter_err(OP, e))
    }

    async fn inspect_address(&self, address: &str) -> Result<InspectedAddress, AdapterError> {
        let is_valid = address
            .parse::<TaggedAddress>()
            .is_ok_and(|parsed| Self::base_has_valid_shape(&parsed.base));

        Ok(InspectedAddress {
            address: self.normalize_address(address),
            is_valid,
        })
    }

    fn normalize_txid(&self, txid: &str) -> String {
        txid.to_ascii_lowercase()
    }
}

#[async_trait]
impl BlockchainClient for RippledClient {
    fn chain(&self) -> Chain {
        CHAIN
    }

    #[instrument(skip(self))]
    async fn latest_block_number(&self) -> Result<u64, AdapterError> {
        const OP: &str = "latest_block_number";

        if let Some(index) = self.ledger_index_cache.get() {
            return Ok(index);
        }

        let params = json!({"ledger_index": "validated", "transactions": false});
        let result = self.rpc_request("ledger", params, OP).await?;
        let index = u64_field(&result, "ledger_index").map_err(|e| adapter_err(OP, e))?;

        self.ledger_index_cache.put(index);
        debug!(index, "fetched validated ledger index");
        Ok(index)
    }

    #[instrument(skip(self))]
    async fn get_block_hash(&self, height: u64) -> Result<String, AdapterError> {
        const OP: &str = "get_block_hash";

        let params = json!({"ledger_index": height, "transactions": false});
        let result = self.rpc_request("ledger", params, OP).await?;

        field(&result, "ledger")
            .and_then(|ledger| str_field(ledger, "ledger_hash"))
            .map_err(|e| adapter_err(OP, e))
    }

    #[instrument(skip(self))]
    async fn get_block(&self, block_hash: &str) -> Result<Vec<Value>, AdapterError> {
        const OP: &str = "get_block";

        let params = json!({
            "ledger_hash": block_hash,
            "transactions": true,
            "expand": true,
        });
        let result = self.rpc_request("ledger", params, OP).await?;

        field(&result, "ledger")
            .and_then(|ledger| {
                ledger
                    .get("transactions")
                    .and_then(Value::as_array)
                    .cloned()
                    .ok_or_else(|| {
                        RpcError::UnexpectedResponse(
                            "ledger carries no transaction array".to_string(),
                        )
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

        let id = str_field(tx, "hash").map_err(|e| adapter_err(OP, e))?;

        // Only native-currency payments move customer funds; anything
        // else (offers, trust lines, issued-currency payments whose
        // amount is an object) yields no entries.
        let is_payment = tx.get("TransactionType").and_then(Value::as_str) == Some("Payment");
        let native_amount = tx.get("Amount").filter(|amount| !amount.is_object());

        let entries = match (is_payment, native_amount) {
            (true, Some(amount)) => {
                let drops = base_units(amount).map_err(|e| adapter_err(OP, e))?;
                let destination = str_field(tx, "Destination").map_err(|e| adapter_err(OP, e))?;
                let address = match tx.get("DestinationTag").and_then(Value::as_u64) {
                    Some(tag) => format!("{}?dt={}", destination, tag),
                    None => destination,
                };
                vec![TxEntry {
                    amount: self.converter.to_display(drops),
                    address,
                    txout: 0,
                }]
            }
            _ => Vec::new(),
        };

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
