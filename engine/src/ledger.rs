//! The Ledger service: wallet balance, budget allocations and the
//! append-only transaction log.
//!
//! Validation happens here, before any store access; the atomic
//! check-and-mutate itself happens inside the store under the owner's
//! wallet lock (see `dropsim-store` for the contract). Timestamps come
//! from the injected clock.

use crate::{map_store_error, telemetry};
use dropsim_core::environment::Clock;
use dropsim_core::types::{Money, OwnerId};
use dropsim_core::SimulationError;
use dropsim_store::{
    AllocationLine, LedgerStore, LedgerTransaction, NewTransaction, StoreError,
    TransactionMetadata,
};
use std::sync::Arc;

/// Read-only budget projection, computed fresh on every call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BudgetStatus {
    /// Unallocated balance plus everything currently earmarked.
    pub total: Money,
    /// Sum of allocated budgets across products.
    pub allocated: Money,
    /// Sum of used budgets across products.
    pub used: Money,
    /// Spendable balance: `total - allocated`.
    pub available: Money,
    /// Most recent transactions, newest first.
    pub recent_transactions: Vec<LedgerTransaction>,
}

/// Outcome of a budget allocation batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AllocationOutcome {
    /// Spendable balance after the earmarks were taken.
    pub remaining_budget: Money,
    /// The lines that were applied; lines referencing unowned products are
    /// skipped without failing the batch.
    pub applied_lines: Vec<AllocationLine>,
}

/// The Ledger service.
#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn LedgerStore>,
    clock: Arc<dyn Clock>,
}

impl Ledger {
    /// Creates a ledger over a store and clock.
    #[must_use]
    pub fn new(store: Arc<dyn LedgerStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Atomically credits the wallet and appends a deposit entry.
    /// Returns the new balance.
    ///
    /// # Errors
    ///
    /// - [`SimulationError::Validation`] for a zero amount.
    /// - [`SimulationError::SystemFailure`] if the store fails.
    pub async fn credit(
        &self,
        owner: OwnerId,
        amount: Money,
        description: impl Into<String>,
        metadata: TransactionMetadata,
    ) -> Result<Money, SimulationError> {
        if amount.is_zero() {
            return Err(SimulationError::validation("amount must be positive, got $0.00"));
        }

        let entry = NewTransaction::new(description, metadata, self.clock.now());
        let new_balance = self
            .store
            .credit(owner, amount, entry)
            .await
            .map_err(map_store_error)?;

        telemetry::record_transaction("deposit");
        tracing::info!(%owner, %amount, %new_balance, "wallet credited");
        Ok(new_balance)
    }

    /// Atomically debits the wallet and appends a spend entry. The balance
    /// check runs inside the owner's wallet lock, so concurrent debits can
    /// never jointly overdraw. Returns the new balance.
    ///
    /// # Errors
    ///
    /// - [`SimulationError::Validation`] for a zero amount.
    /// - [`SimulationError::InsufficientFunds`] when the balance cannot
    ///   cover the amount; nothing is mutated. A wallet that was never
    ///   funded reports an available balance of zero.
    /// - [`SimulationError::SystemFailure`] if the store fails.
    pub async fn debit(
        &self,
        owner: OwnerId,
        amount: Money,
        description: impl Into<String>,
        metadata: TransactionMetadata,
    ) -> Result<Money, SimulationError> {
        if amount.is_zero() {
            return Err(SimulationError::validation("amount must be positive, got $0.00"));
        }

        let entry = NewTransaction::new(description, metadata, self.clock.now());
        let result = self.store.debit(owner, amount, entry).await;
        match result {
            Ok(new_balance) => {
                telemetry::record_transaction("spend");
                tracing::info!(%owner, %amount, %new_balance, "wallet debited");
                Ok(new_balance)
            }
            Err(StoreError::WalletNotFound(_)) => {
                telemetry::record_rejected_debit();
                Err(SimulationError::InsufficientFunds {
                    requested: amount,
                    available: Money::ZERO,
                })
            }
            Err(error @ StoreError::InsufficientFunds { .. }) => {
                telemetry::record_rejected_debit();
                Err(map_store_error(error))
            }
            Err(error) => Err(map_store_error(error)),
        }
    }

    /// Atomically applies a budget allocation batch: the applied sum leaves
    /// the balance, each applied product's earmark is **replaced**, and one
    /// summarizing allocation entry is appended. Lines referencing products
    /// the owner does not own are skipped without failing the batch.
    ///
    /// # Errors
    ///
    /// - [`SimulationError::Validation`] for an empty batch or a line with
    ///   a zero amount.
    /// - [`SimulationError::InsufficientFunds`] when the submitted sum
    ///   exceeds the balance; nothing is mutated.
    /// - [`SimulationError::SystemFailure`] if the store fails.
    pub async fn allocate(
        &self,
        owner: OwnerId,
        lines: Vec<AllocationLine>,
    ) -> Result<AllocationOutcome, SimulationError> {
        if lines.is_empty() {
            return Err(SimulationError::validation("allocation batch is empty"));
        }
        if let Some(line) = lines.iter().find(|line| line.amount.is_zero()) {
            return Err(SimulationError::validation(format!(
                "allocation for product {} must be positive, got $0.00",
                line.product
            )));
        }

        let requested = lines
            .iter()
            .fold(Money::ZERO, |sum, line| sum.saturating_add(line.amount));
        let entry = NewTransaction::new(
            "budget allocation",
            TransactionMetadata::default(),
            self.clock.now(),
        );
        let applied = self
            .store
            .apply_allocations(owner, lines, entry)
            .await
            .map_err(|error| match error {
                StoreError::WalletNotFound(_) => SimulationError::InsufficientFunds {
                    requested,
                    available: Money::ZERO,
                },
                other => map_store_error(other),
            })?;

        telemetry::record_transaction("allocation");
        tracing::info!(
            %owner,
            applied = applied.applied.len(),
            remaining = %applied.new_balance,
            "budget allocated"
        );
        Ok(AllocationOutcome {
            remaining_budget: applied.new_balance,
            applied_lines: applied.applied,
        })
    }

    /// The spendable balance; zero for a wallet that was never funded.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::SystemFailure`] if the store fails.
    pub async fn balance(&self, owner: OwnerId) -> Result<Money, SimulationError> {
        match self.store.wallet(owner).await {
            Ok(wallet) => Ok(wallet.balance),
            Err(StoreError::WalletNotFound(_)) => Ok(Money::ZERO),
            Err(error) => Err(map_store_error(error)),
        }
    }

    /// The budget projection plus the most recent transactions. Computed
    /// fresh on every call, never cached.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::SystemFailure`] if the store fails.
    pub async fn status(
        &self,
        owner: OwnerId,
        recent: usize,
    ) -> Result<BudgetStatus, SimulationError> {
        let balance = self.balance(owner).await?;
        let allocations = self
            .store
            .allocations(owner)
            .await
            .map_err(map_store_error)?;

        let mut allocated = Money::ZERO;
        let mut used = Money::ZERO;
        for allocation in &allocations {
            allocated = allocated.saturating_add(allocation.allocated_budget);
            used = used.saturating_add(allocation.used_budget);
        }

        let recent_transactions = self
            .store
            .transactions(owner, Some(recent))
            .await
            .map_err(map_store_error)?;

        Ok(BudgetStatus {
            total: balance.saturating_add(allocated),
            allocated,
            used,
            available: balance,
            recent_transactions,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use dropsim_store::{MemoryStore, TransactionKind};
    use dropsim_testing::helpers::{seed_product, seed_wallet};
    use dropsim_testing::FixedClock;

    fn ledger(store: &Arc<MemoryStore>) -> Ledger {
        Ledger::new(
            Arc::clone(store) as Arc<dyn LedgerStore>,
            Arc::new(FixedClock::midday()),
        )
    }

    #[tokio::test]
    async fn add_funds_appends_one_deposit() {
        let store = MemoryStore::shared();
        let owner = OwnerId::new();
        let clock = FixedClock::midday();
        seed_wallet(&store, owner, Money::from_dollars(100), clock.now())
            .await
            .unwrap();

        let ledger = ledger(&store);
        let new_balance = ledger
            .credit(
                owner,
                Money::from_dollars(50),
                "add funds",
                TransactionMetadata::default(),
            )
            .await
            .unwrap();

        assert_eq!(new_balance, Money::from_dollars(150));
        let status = ledger.status(owner, 10).await.unwrap();
        assert_eq!(status.recent_transactions.len(), 2);
        assert_eq!(status.recent_transactions[0].kind, TransactionKind::Deposit);
        assert_eq!(
            status.recent_transactions[0].amount,
            Money::from_dollars(50)
        );
    }

    #[tokio::test]
    async fn zero_amount_is_rejected_before_the_store() {
        let store = MemoryStore::shared();
        let owner = OwnerId::new();
        let ledger = ledger(&store);

        let err = ledger
            .credit(owner, Money::ZERO, "noop", TransactionMetadata::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SimulationError::Validation { .. }));

        // Nothing reached the store: no wallet was created.
        assert_eq!(ledger.balance(owner).await.unwrap(), Money::ZERO);
        let status = ledger.status(owner, 10).await.unwrap();
        assert!(status.recent_transactions.is_empty());
    }

    #[tokio::test]
    async fn debit_on_unfunded_wallet_reports_zero_available() {
        let store = MemoryStore::shared();
        let owner = OwnerId::new();
        let ledger = ledger(&store);

        let err = ledger
            .debit(
                owner,
                Money::from_dollars(10),
                "spend",
                TransactionMetadata::default(),
            )
            .await
            .unwrap_err();
        assert_eq!(
            err,
            SimulationError::InsufficientFunds {
                requested: Money::from_dollars(10),
                available: Money::ZERO,
            }
        );
    }

    #[tokio::test]
    async fn status_reconstructs_gross_total() {
        let store = MemoryStore::shared();
        let owner = OwnerId::new();
        let clock = FixedClock::midday();
        seed_wallet(&store, owner, Money::from_dollars(150), clock.now())
            .await
            .unwrap();
        let p1 = seed_product(&store, owner, "Widget", Money::from_dollars(2))
            .await
            .unwrap();
        let p2 = seed_product(&store, owner, "Gadget", Money::from_dollars(3))
            .await
            .unwrap();

        let ledger = ledger(&store);
        let outcome = ledger
            .allocate(
                owner,
                vec![
                    AllocationLine {
                        product: p1,
                        amount: Money::from_dollars(60),
                    },
                    AllocationLine {
                        product: p2,
                        amount: Money::from_dollars(40),
                    },
                ],
            )
            .await
            .unwrap();
        assert_eq!(outcome.remaining_budget, Money::from_dollars(50));
        assert_eq!(outcome.applied_lines.len(), 2);

        let status = ledger.status(owner, 10).await.unwrap();
        assert_eq!(status.total, Money::from_dollars(150));
        assert_eq!(status.allocated, Money::from_dollars(100));
        assert_eq!(status.available, Money::from_dollars(50));
        assert_eq!(status.used, Money::ZERO);
    }
}
