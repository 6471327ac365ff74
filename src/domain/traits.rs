//! Domain traits defining contracts for chain adapters and the address registry.

use async_trait::async_trait;

use super::error::{AdapterError, RegistryError};
use super::types::{
    AddressOptions, Amount, BlockTransaction, Chain, CreatedAddress, Currency, DestinationTag,
    InspectedAddress, Issuer, Recipient, WithdrawalOptions,
};

/// Wallet operation set, implemented once per chain family with identical
/// semantics even though wire formats differ. Adapters never retry; any
/// RPC failure propagates with chain and operation context attached.
#[async_trait]
pub trait WalletClient: Send + Sync {
    /// Which chain this adapter speaks for
    fn chain(&self) -> Chain;

    /// Create a deposit address. If no secret is supplied the adapter
    /// requests chain-generated credentials first and derives the
    /// address from them.
    async fn create_address(&self, options: &AddressOptions)
        -> Result<CreatedAddress, AdapterError>;

    /// Balance of an address in display units, converted from the
    /// chain's base unit with the adapter's fixed divisor.
    async fn load_balance(&self, address: &str, currency: &Currency)
        -> Result<Amount, AdapterError>;

    /// Submit one outbound transfer. The display amount is converted
    /// back to base units before submission; excess precision is an
    /// error, never a silent truncation. Returns the normalized
    /// transaction id.
    async fn create_withdrawal(
        &self,
        issuer: &Issuer,
        recipient: &Recipient,
        amount: Amount,
        options: &WithdrawalOptions,
    ) -> Result<String, AdapterError>;

    /// Fee estimate for the equivalent withdrawal, in whichever unit the
    /// chain reports. Read-only; moves no funds.
    async fn get_txn_fee(
        &self,
        issuer: &Issuer,
        recipient: &Recipient,
        amount: Amount,
        options: &WithdrawalOptions,
    ) -> Result<Amount, AdapterError>;

    /// Normalize an address and report whether it is usable. The default
    /// accepts any syntactically parseable address, for chains without a
    /// validation endpoint.
    async fn inspect_address(&self, address: &str) -> Result<InspectedAddress, AdapterError> {
        Ok(InspectedAddress {
            address: self.normalize_address(address),
            is_valid: true,
        })
    }

    /// Canonical address form. Identity for chains without
    /// canonicalization rules.
    fn normalize_address(&self, address: &str) -> String {
        address.to_string()
    }

    /// Canonical transaction-id form. Identity unless the chain folds
    /// case or format.
    fn normalize_txid(&self, txid: &str) -> String {
        txid.to_string()
    }
}

/// Block-scan helpers used by the external deposit-detection poller.
#[async_trait]
pub trait BlockchainClient: Send + Sync {
    /// Which chain this adapter speaks for
    fn chain(&self) -> Chain;

    /// Height of the newest block the node knows about. Cached briefly
    /// by implementations to bound RPC load during polling.
    async fn latest_block_number(&self) -> Result<u64, AdapterError>;

    /// Block hash at a given height
    async fn get_block_hash(&self, height: u64) -> Result<String, AdapterError>;

    /// Raw transactions of a block, in the chain's native shape
    async fn get_block(&self, block_hash: &str) -> Result<Vec<serde_json::Value>, AdapterError>;

    /// Reshape one raw transaction into the uniform entry list the
    /// ingestion pipeline consumes.
    fn build_transaction(
        &self,
        tx: &serde_json::Value,
        block_number: u64,
    ) -> Result<BlockTransaction, AdapterError>;
}

/// The durable store behind the tag allocator. `reserve` is the single
/// write path for new addresses and must be atomic per (chain, tag):
/// when two callers race, exactly one sees `true`.
#[async_trait]
pub trait AddressRegistry: Send + Sync {
    /// Does any registered address on `chain` already carry `tag`?
    async fn tag_exists(&self, chain: Chain, tag: DestinationTag) -> Result<bool, RegistryError>;

    /// Persist a new address, compare-and-set on the tag. Returns
    /// `false` when the tag or address is already taken.
    async fn reserve(
        &self,
        chain: Chain,
        address: &str,
        tag: Option<DestinationTag>,
    ) -> Result<bool, RegistryError>;
}
