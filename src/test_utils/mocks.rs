//! Mock implementations for testing.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::Value;

use crate::domain::{
    AdapterError, AddressOptions, Amount, Chain, CreatedAddress, Currency, Issuer, Recipient,
    RpcError, TransportError, WalletClient, WithdrawalOptions,
};

/// Configuration for mock behavior
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    pub should_fail: bool,
    pub error_message: Option<String>,
}

impl MockConfig {
    #[must_use]
    pub fn success() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            should_fail: true,
            error_message: Some(message.into()),
        }
    }
}

/// One withdrawal the mock accepted, as seen by the adapter boundary.
#[derive(Debug, Clone)]
pub struct RecordedWithdrawal {
    pub issuer: String,
    pub recipient: String,
    pub amount: Amount,
    pub source_tag: Option<u64>,
}

/// Mock wallet client for testing.
///
/// Succeeds by default, handing out numbered addresses and transaction
/// ids; `failing_for_address` scripts per-recipient withdrawal failures
/// on top of the blanket `MockConfig` switch.
pub struct MockWalletClient {
    chain: Chain,
    config: MockConfig,
    failing_addresses: HashSet<String>,
    balance: Amount,
    withdrawals: Arc<Mutex<Vec<RecordedWithdrawal>>>,
    attempts: AtomicU64,
    created: AtomicU64,
}

impl MockWalletClient {
    #[must_use]
    pub fn new(chain: Chain, config: MockConfig) -> Self {
        Self {
            chain,
            config,
            failing_addresses: HashSet::new(),
            balance: Decimal::ZERO,
            withdrawals: Arc::new(Mutex::new(Vec::new())),
            attempts: AtomicU64::new(0),
            created: AtomicU64::new(0),
        }
    }

    /// Make withdrawals to this recipient fail with an application error.
    #[must_use]
    pub fn failing_for_address(mut self, address: impl Into<String>) -> Self {
        self.failing_addresses.insert(address.into());
        self
    }

    /// Fixed balance reported by `load_balance`.
    #[must_use]
    pub fn with_balance(mut self, balance: Amount) -> Self {
        self.balance = balance;
        self
    }

    /// Withdrawals accepted so far (for assertions).
    pub fn recorded_withdrawals(&self) -> Vec<RecordedWithdrawal> {
        self.withdrawals.lock().unwrap().clone()
    }

    /// Accepted withdrawals only; scripted failures are not recorded.
    pub fn withdrawal_count(&self) -> usize {
        self.withdrawals.lock().unwrap().len()
    }

    /// Every `create_withdrawal` call, accepted or not.
    pub fn withdrawal_attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    fn check_should_fail(&self, operation: &'static str) -> Result<(), AdapterError> {
        if self.config.should_fail {
            let msg = self
                .config
                .error_message
                .clone()
                .unwrap_or_else(|| "Mock error".to_string());
            return Err(AdapterError::new(
                self.chain,
                operation,
                RpcError::from(TransportError::Connection(msg)),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl WalletClient for MockWalletClient {
    fn chain(&self) -> Chain {
        self.chain
    }

    async fn create_address(
        &self,
        options: &AddressOptions,
    ) -> Result<CreatedAddress, AdapterError> {
        self.check_should_fail("create_address")?;

        if let Some(address) = &options.address {
            let secret = options
                .secret
                .clone()
                .unwrap_or_else(|| SecretString::from("mock_shared_secret".to_string()));
            return Ok(CreatedAddress {
                address: address.clone(),
                secret,
            });
        }

        let n = self.created.fetch_add(1, Ordering::Relaxed);
        Ok(CreatedAddress {
            address: format!("mock_address_{}", n),
            secret: SecretString::from(format!("mock_secret_{}", n)),
        })
    }

    async fn load_balance(
        &self,
        _address: &str,
        _currency: &Currency,
    ) -> Result<Amount, AdapterError> {
        self.check_should_fail("load_balance")?;
        Ok(self.balance)
    }

    async fn create_withdrawal(
        &self,
        issuer: &Issuer,
        recipient: &Recipient,
        amount: Amount,
        options: &WithdrawalOptions,
    ) -> Result<String, AdapterError> {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        self.check_should_fail("create_withdrawal")?;

        if self.failing_addresses.contains(&recipient.address) {
            return Err(AdapterError::new(
                self.chain,
                "create_withdrawal",
                RpcError::Application {
                    message: format!("transfer to {} rejected", recipient.address),
                    raw: Value::Null,
                },
            ));
        }

        let mut withdrawals = self.withdrawals.lock().unwrap();
        withdrawals.push(RecordedWithdrawal {
            issuer: issuer.address.clone(),
            recipient: recipient.address.clone(),
            amount,
            source_tag: options.source_tag,
        });
        Ok(format!("mock_tx_{}", withdrawals.len()))
    }

    async fn get_txn_fee(
        &self,
        _issuer: &Issuer,
        _recipient: &Recipient,
        _amount: Amount,
        _options: &WithdrawalOptions,
    ) -> Result<Amount, AdapterError> {
        self.check_should_fail("get_txn_fee")?;
        Ok(Decimal::new(1, 4))
    }
}
