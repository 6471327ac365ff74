//! Deposit sweep execution.
//!
//! A detected deposit sits on a customer address until it is spread over
//! the exchange's internal accounts. The split itself is decided
//! upstream; this executor just issues one withdrawal per plan entry,
//! sourced from the deposit address and signed with the deposit secret,
//! and reports what happened to every entry.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::domain::{
    Deposit, Issuer, Recipient, SpreadPlan, SweepEntryResult, SweepOutcome, SweepPolicy,
    WalletClient, WithdrawalOptions,
};

/// Issues the per-entry withdrawals of a spread plan, sequentially and
/// in plan order. Entries are independent on-chain transfers; there is
/// no atomicity across them, so the caller reconciles from the returned
/// per-entry outcomes.
pub struct DepositSweeper {
    client: Arc<dyn WalletClient>,
    policy: SweepPolicy,
}

impl DepositSweeper {
    #[must_use]
    pub fn new(client: Arc<dyn WalletClient>) -> Self {
        Self {
            client,
            policy: SweepPolicy::default(),
        }
    }

    /// Override the failure policy.
    #[must_use]
    pub fn with_policy(mut self, policy: SweepPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Executes the plan. Every entry appears in the result exactly once,
    /// in plan order; under [`SweepPolicy::FailFast`] the entries after
    /// the first failure come back as [`SweepOutcome::Skipped`]. The
    /// withdrawal options apply to every entry.
    #[instrument(skip(self, deposit, plan, options), fields(deposit = %deposit.address, entries = plan.len(), policy = %self.policy))]
    pub async fn sweep(
        &self,
        deposit: &Deposit,
        plan: &SpreadPlan,
        options: &WithdrawalOptions,
    ) -> Vec<SweepEntryResult> {
        let issuer = Issuer {
            address: deposit.address.clone(),
            secret: deposit.secret.clone(),
        };

        let mut results = Vec::with_capacity(plan.len());
        let mut halted = false;

        for entry in &plan.entries {
            if halted {
                results.push(SweepEntryResult {
                    address: entry.address.clone(),
                    amount: entry.amount,
                    outcome: SweepOutcome::Skipped,
                });
                continue;
            }

            let recipient = Recipient {
                address: entry.address.clone(),
            };
            let outcome = match self
                .client
                .create_withdrawal(&issuer, &recipient, entry.amount, options)
                .await
            {
                Ok(txid) => {
                    info!(target_address = %entry.address, amount = %entry.amount, txid = %txid, "sweep entry submitted");
                    SweepOutcome::Submitted(txid)
                }
                Err(e) => {
                    warn!(target_address = %entry.address, amount = %entry.amount, error = %e, "sweep entry failed");
                    if self.policy == SweepPolicy::FailFast {
                        halted = true;
                    }
                    SweepOutcome::Failed(e)
                }
            };

            results.push(SweepEntryResult {
                address: entry.address.clone(),
                amount: entry.amount,
                outcome,
            });
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Amount, Chain, Currency};
    use crate::test_utils::{MockConfig, MockWalletClient};
    use rust_decimal_macros::dec;

    fn deposit(amount: Amount) -> Deposit {
        Deposit {
            address: "DDK-deposit-holder".to_string(),
            secret: "deposit passphrase".to_string().into(),
            amount,
            currency: Currency::new("ddk"),
            txid: Some("deadbeef".to_string()),
        }
    }

    fn plan() -> SpreadPlan {
        SpreadPlan::new(vec![
            crate::domain::SpreadEntry::new("hot-1", dec!(0.4)),
            crate::domain::SpreadEntry::new("hot-2", dec!(0.4)),
            crate::domain::SpreadEntry::new("cold-1", dec!(0.2)),
        ])
    }

    #[tokio::test]
    async fn test_fail_soft_attempts_every_entry() {
        let client = Arc::new(
            MockWalletClient::new(Chain::Ddkoin, MockConfig::success())
                .failing_for_address("hot-2"),
        );
        let sweeper = DepositSweeper::new(client.clone());

        let results = sweeper
            .sweep(&deposit(dec!(1)), &plan(), &WithdrawalOptions::default())
            .await;

        assert_eq!(results.len(), 3);
        assert!(results[0].outcome.is_submitted());
        assert!(matches!(results[1].outcome, SweepOutcome::Failed(_)));
        assert!(results[2].outcome.is_submitted());
        assert_eq!(client.withdrawal_attempts(), 3);
        assert_eq!(client.withdrawal_count(), 2);
    }

    #[tokio::test]
    async fn test_fail_fast_skips_after_first_failure() {
        let client = Arc::new(
            MockWalletClient::new(Chain::Ddkoin, MockConfig::success())
                .failing_for_address("hot-2"),
        );
        let sweeper = DepositSweeper::new(client.clone()).with_policy(SweepPolicy::FailFast);

        let results = sweeper
            .sweep(&deposit(dec!(1)), &plan(), &WithdrawalOptions::default())
            .await;

        assert_eq!(results.len(), 3);
        assert!(results[0].outcome.is_submitted());
        assert!(matches!(results[1].outcome, SweepOutcome::Failed(_)));
        assert!(matches!(results[2].outcome, SweepOutcome::Skipped));
        assert_eq!(client.withdrawal_attempts(), 2);
        assert_eq!(client.withdrawal_count(), 1);
    }

    #[tokio::test]
    async fn test_entries_come_back_in_plan_order() {
        let client = Arc::new(MockWalletClient::new(Chain::Ddkoin, MockConfig::success()));
        let sweeper = DepositSweeper::new(client);

        let results = sweeper
            .sweep(&deposit(dec!(1)), &plan(), &WithdrawalOptions::default())
            .await;

        let addresses: Vec<_> = results.iter().map(|r| r.address.as_str()).collect();
        assert_eq!(addresses, vec!["hot-1", "hot-2", "cold-1"]);
        assert!(results.iter().all(|r| r.outcome.is_submitted()));
    }
}
