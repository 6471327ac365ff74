//! Wallet service facade.
//!
//! One instance serves one configured wallet on one chain. The service
//! owns the small amount of orchestration that sits above the protocol
//! adapter: tag allocation and registry persistence for new addresses,
//! request validation, hot-wallet credential handling, and the deposit
//! sweep. Chain I/O stays behind the injected [`WalletClient`].

use std::sync::Arc;

use secrecy::SecretString;
use tracing::{info, instrument, warn};
use validator::Validate;

use crate::app::{DepositSweeper, TagAllocator};
use crate::domain::{
    AddressOptions, AddressRegistry, Amount, AppError, ConfigError, CreatedAddress, Currency,
    Deposit, InspectedAddress, Issuer, Recipient, SpreadPlan, SweepEntryResult, SweepPolicy,
    WalletClient, WalletConfig, Withdrawal, WithdrawalOptions,
};

pub struct WalletService {
    config: WalletConfig,
    client: Arc<dyn WalletClient>,
    registry: Arc<dyn AddressRegistry>,
    allocator: TagAllocator,
    sweep_policy: SweepPolicy,
}

impl WalletService {
    #[must_use]
    pub fn new(
        config: WalletConfig,
        client: Arc<dyn WalletClient>,
        registry: Arc<dyn AddressRegistry>,
    ) -> Self {
        let allocator = TagAllocator::new(Arc::clone(&registry));
        Self {
            config,
            client,
            registry,
            allocator,
            sweep_policy: SweepPolicy::default(),
        }
    }

    /// Override the sweep failure policy.
    #[must_use]
    pub fn with_sweep_policy(mut self, policy: SweepPolicy) -> Self {
        self.sweep_policy = policy;
        self
    }

    /// Create a deposit address for a new customer.
    ///
    /// On shared-address chains this allocates a fresh destination tag on
    /// the wallet's base address; elsewhere the adapter creates fresh
    /// credentials. Either way the address ends up in the registry.
    #[instrument(skip(self, options))]
    pub async fn create_address(&self, options: &AddressOptions) -> Result<CreatedAddress, AppError> {
        if self.config.chain.uses_shared_addresses() {
            return self.create_tagged_address(options).await;
        }

        let created = self.client.create_address(options).await?;
        if !self
            .registry
            .reserve(self.config.chain, &created.address, None)
            .await?
        {
            // The chain handed out an address the registry already knows.
            // Nothing to unwind on-chain, so record it and let the
            // operator decide.
            warn!(address = %created.address, "freshly created address was already registered");
        }

        info!(address = %created.address, "deposit address ready");
        Ok(created)
    }

    /// Spread a settled deposit over internal accounts, one withdrawal
    /// per plan entry. Partial failure comes back as data, in plan order.
    #[instrument(skip(self, deposit, plan, options), fields(deposit = %deposit.address, entries = plan.len()))]
    pub async fn collect_deposit(
        &self,
        deposit: &Deposit,
        plan: &SpreadPlan,
        options: &WithdrawalOptions,
    ) -> Result<Vec<SweepEntryResult>, AppError> {
        plan.validate()?;

        let sweeper = DepositSweeper::new(Arc::clone(&self.client)).with_policy(self.sweep_policy);
        Ok(sweeper.sweep(deposit, plan, options).await)
    }

    /// Issue a single outbound transfer from the hot wallet.
    #[instrument(skip(self, withdrawal, options), fields(rid = %withdrawal.rid, amount = %withdrawal.amount))]
    pub async fn build_withdrawal(
        &self,
        withdrawal: &Withdrawal,
        options: &WithdrawalOptions,
    ) -> Result<String, AppError> {
        withdrawal.validate()?;

        let issuer = self.hot_wallet_issuer()?;
        let recipient = Recipient {
            address: withdrawal.rid.clone(),
        };
        let txid = self
            .client
            .create_withdrawal(&issuer, &recipient, withdrawal.amount, options)
            .await?;

        info!(txid = %txid, "withdrawal issued");
        Ok(txid)
    }

    /// Current balance of an address, in display units.
    #[instrument(skip(self))]
    pub async fn load_balance(&self, address: &str, currency: &Currency) -> Result<Amount, AppError> {
        Ok(self.client.load_balance(address, currency).await?)
    }

    /// Syntactic address check, normalized the way the chain compares.
    #[instrument(skip(self))]
    pub async fn inspect_address(&self, address: &str) -> Result<InspectedAddress, AppError> {
        Ok(self.client.inspect_address(address).await?)
    }

    async fn create_tagged_address(
        &self,
        options: &AddressOptions,
    ) -> Result<CreatedAddress, AppError> {
        let secret = self.shared_address_secret(options)?;
        let allocated = self
            .allocator
            .allocate(self.config.chain, &self.config.address)
            .await?;

        let composed = AddressOptions {
            address: Some(allocated.to_string()),
            secret: Some(secret),
        };
        let created = self.client.create_address(&composed).await?;

        info!(address = %created.address, "deposit address ready");
        Ok(created)
    }

    /// Tagged addresses live on the shared account, so their secret is
    /// the caller's override or the wallet's own.
    fn shared_address_secret(&self, options: &AddressOptions) -> Result<SecretString, AppError> {
        options
            .secret
            .clone()
            .or_else(|| self.config.secret.clone())
            .ok_or(AppError::Config(ConfigError::MissingSecret))
    }

    fn hot_wallet_issuer(&self) -> Result<Issuer, AppError> {
        let secret = self
            .config
            .secret
            .clone()
            .ok_or(AppError::Config(ConfigError::MissingSecret))?;
        Ok(Issuer {
            address: self.config.address.clone(),
            secret,
        })
    }
}
