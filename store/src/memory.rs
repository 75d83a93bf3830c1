//! In-memory transactional store.
//!
//! Backs tests and the demo binary with the same atomicity contract a
//! relational backend would provide: every trait method runs inside the
//! owner's async mutex, so financial operations are serialized at
//! owner-wallet granularity and either fully apply or leave the records
//! untouched.
//!
//! Records are partitioned per owner; cross-owner operations (the deadline
//! sweep scan) take each owner's lock in turn rather than a global one;
//! balances are per-owner, so nothing needs cross-owner serialization.

use crate::entities::{
    AllocationLine, BusinessMetrics, InventoryRecord, LedgerTransaction, Mission, MissionStatus,
    NewTransaction, Product, ProductAllocation, TransactionKind, Wallet,
};
use crate::error::StoreError;
use crate::traits::{
    AllocationApplied, CatalogStore, InventoryStore, LedgerStore, MetricsStore, MissionStore,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dropsim_core::types::{MissionId, Money, OwnerId, ProductId, Sku};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::Mutex;

/// Everything the store holds for one owner. Guarded by one async mutex,
/// which is what serializes the owner's financial operations.
#[derive(Debug, Default)]
struct OwnerRecords {
    wallet: Option<Wallet>,
    transactions: Vec<LedgerTransaction>,
    allocations: BTreeMap<ProductId, ProductAllocation>,
    products: BTreeMap<ProductId, Product>,
    inventory: BTreeMap<(ProductId, Sku), InventoryRecord>,
    missions: Vec<Mission>,
    metrics: Option<BusinessMetrics>,
}

/// In-memory implementation of every storage trait.
#[derive(Debug, Default)]
pub struct MemoryStore {
    owners: RwLock<HashMap<OwnerId, Arc<Mutex<OwnerRecords>>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an Arc-wrapped store for sharing across services.
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn owner_cell(&self, owner: OwnerId) -> Arc<Mutex<OwnerRecords>> {
        {
            let owners = self
                .owners
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(cell) = owners.get(&owner) {
                return Arc::clone(cell);
            }
        }
        let mut owners = self
            .owners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(owners.entry(owner).or_default())
    }

    fn all_cells(&self) -> Vec<Arc<Mutex<OwnerRecords>>> {
        self.owners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(Arc::clone)
            .collect()
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn wallet(&self, owner: OwnerId) -> Result<Wallet, StoreError> {
        let cell = self.owner_cell(owner);
        let records = cell.lock().await;
        records
            .wallet
            .clone()
            .ok_or(StoreError::WalletNotFound(owner))
    }

    async fn credit(
        &self,
        owner: OwnerId,
        amount: Money,
        entry: NewTransaction,
    ) -> Result<Money, StoreError> {
        let cell = self.owner_cell(owner);
        let mut records = cell.lock().await;

        let current = records.wallet.as_ref().map_or(Money::ZERO, |w| w.balance);
        let new_balance = current
            .checked_add(amount)
            .ok_or_else(|| StoreError::Unavailable("wallet balance overflow".to_string()))?;
        records.wallet = Some(Wallet {
            owner,
            balance: new_balance,
        });
        records.transactions.push(LedgerTransaction {
            id: entry.id,
            owner,
            kind: TransactionKind::Deposit,
            amount,
            description: entry.description,
            metadata: entry.metadata,
            timestamp: entry.at,
        });
        Ok(new_balance)
    }

    async fn debit(
        &self,
        owner: OwnerId,
        amount: Money,
        entry: NewTransaction,
    ) -> Result<Money, StoreError> {
        let cell = self.owner_cell(owner);
        let mut records = cell.lock().await;

        let wallet = records
            .wallet
            .as_mut()
            .ok_or(StoreError::WalletNotFound(owner))?;
        let new_balance =
            wallet
                .balance
                .checked_sub(amount)
                .ok_or(StoreError::InsufficientFunds {
                    requested: amount,
                    available: wallet.balance,
                })?;
        wallet.balance = new_balance;

        // Spending tagged to a product consumes its earmark, clamped so the
        // used <= allocated invariant holds.
        if let Some(product) = entry.metadata.product {
            if let Some(allocation) = records.allocations.get_mut(&product) {
                let advanced = allocation.used_budget.saturating_add(amount);
                allocation.used_budget = advanced.min(allocation.allocated_budget);
            }
        }

        records.transactions.push(LedgerTransaction {
            id: entry.id,
            owner,
            kind: TransactionKind::Spend,
            amount,
            description: entry.description,
            metadata: entry.metadata,
            timestamp: entry.at,
        });
        Ok(new_balance)
    }

    async fn apply_allocations(
        &self,
        owner: OwnerId,
        lines: Vec<AllocationLine>,
        entry: NewTransaction,
    ) -> Result<AllocationApplied, StoreError> {
        let cell = self.owner_cell(owner);
        let mut records = cell.lock().await;

        let balance = records
            .wallet
            .as_ref()
            .map(|w| w.balance)
            .ok_or(StoreError::WalletNotFound(owner))?;

        // The funds check covers the whole submitted batch; skipping
        // happens after it.
        let mut requested = Money::ZERO;
        for line in &lines {
            requested = requested
                .checked_add(line.amount)
                .ok_or(StoreError::InsufficientFunds {
                    requested: Money::from_cents(u64::MAX),
                    available: balance,
                })?;
        }
        if requested > balance {
            return Err(StoreError::InsufficientFunds {
                requested,
                available: balance,
            });
        }

        let applied: Vec<AllocationLine> = lines
            .into_iter()
            .filter(|line| {
                let owned = records.products.contains_key(&line.product);
                if !owned {
                    tracing::debug!(%owner, product = %line.product, "allocation line skipped: product not owned");
                }
                owned
            })
            .collect();
        let sum = applied
            .iter()
            .fold(Money::ZERO, |acc, line| acc.saturating_add(line.amount));
        let new_balance = balance
            .checked_sub(sum)
            .ok_or(StoreError::InsufficientFunds {
                requested: sum,
                available: balance,
            })?;

        records.wallet = Some(Wallet {
            owner,
            balance: new_balance,
        });
        for line in &applied {
            let allocation =
                records
                    .allocations
                    .entry(line.product)
                    .or_insert_with(|| ProductAllocation {
                        owner,
                        product: line.product,
                        allocated_budget: Money::ZERO,
                        used_budget: Money::ZERO,
                    });
            allocation.allocated_budget = line.amount;
            allocation.used_budget = allocation.used_budget.min(line.amount);
        }

        if !applied.is_empty() {
            let mut metadata = entry.metadata;
            metadata.allocation_lines = applied.clone();
            records.transactions.push(LedgerTransaction {
                id: entry.id,
                owner,
                kind: TransactionKind::Allocation,
                amount: sum,
                description: entry.description,
                metadata,
                timestamp: entry.at,
            });
        }

        Ok(AllocationApplied {
            new_balance,
            applied,
        })
    }

    async fn transactions(
        &self,
        owner: OwnerId,
        limit: Option<usize>,
    ) -> Result<Vec<LedgerTransaction>, StoreError> {
        let cell = self.owner_cell(owner);
        let records = cell.lock().await;
        Ok(records
            .transactions
            .iter()
            .rev()
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn allocations(&self, owner: OwnerId) -> Result<Vec<ProductAllocation>, StoreError> {
        let cell = self.owner_cell(owner);
        let records = cell.lock().await;
        Ok(records.allocations.values().cloned().collect())
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn create_product(&self, product: Product) -> Result<(), StoreError> {
        let cell = self.owner_cell(product.owner);
        let mut records = cell.lock().await;
        records.products.insert(product.id, product);
        Ok(())
    }

    async fn product(&self, owner: OwnerId, id: ProductId) -> Result<Option<Product>, StoreError> {
        let cell = self.owner_cell(owner);
        let records = cell.lock().await;
        Ok(records.products.get(&id).cloned())
    }

    async fn products(&self, owner: OwnerId) -> Result<Vec<Product>, StoreError> {
        let cell = self.owner_cell(owner);
        let records = cell.lock().await;
        Ok(records.products.values().cloned().collect())
    }
}

#[async_trait]
impl InventoryStore for MemoryStore {
    async fn apply_restock(
        &self,
        owner: OwnerId,
        product: ProductId,
        sku: Sku,
        quantity: u32,
        at: DateTime<Utc>,
    ) -> Result<InventoryRecord, StoreError> {
        let cell = self.owner_cell(owner);
        let mut records = cell.lock().await;

        if !records.products.contains_key(&product) {
            return Err(StoreError::ProductNotFound(product));
        }
        let record = records
            .inventory
            .entry((product, sku.clone()))
            .or_insert_with(|| InventoryRecord::empty(owner, product, sku));
        record.quantity = record.quantity.saturating_add(quantity);
        record.last_restocked_at = Some(at);
        Ok(record.clone())
    }

    async fn update_sku_config(
        &self,
        owner: OwnerId,
        product: ProductId,
        sku: Sku,
        reorder_point: u32,
        reorder_quantity: u32,
    ) -> Result<InventoryRecord, StoreError> {
        let cell = self.owner_cell(owner);
        let mut records = cell.lock().await;

        if !records.products.contains_key(&product) {
            return Err(StoreError::ProductNotFound(product));
        }
        let record = records
            .inventory
            .entry((product, sku.clone()))
            .or_insert_with(|| InventoryRecord::empty(owner, product, sku));
        record.reorder_point = reorder_point;
        record.reorder_quantity = reorder_quantity;
        Ok(record.clone())
    }

    async fn inventory(
        &self,
        owner: OwnerId,
        product: Option<ProductId>,
    ) -> Result<Vec<InventoryRecord>, StoreError> {
        let cell = self.owner_cell(owner);
        let records = cell.lock().await;
        Ok(records
            .inventory
            .values()
            .filter(|record| product.is_none_or(|p| record.product == p))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl MissionStore for MemoryStore {
    async fn insert_mission(&self, mission: Mission) -> Result<bool, StoreError> {
        let cell = self.owner_cell(mission.owner);
        let mut records = cell.lock().await;
        let duplicate = records
            .missions
            .iter()
            .any(|m| m.status == MissionStatus::Active && m.dedup_key == mission.dedup_key);
        if duplicate {
            return Ok(false);
        }
        records.missions.push(mission);
        Ok(true)
    }

    async fn mission(&self, owner: OwnerId, id: MissionId) -> Result<Option<Mission>, StoreError> {
        let cell = self.owner_cell(owner);
        let records = cell.lock().await;
        Ok(records.missions.iter().find(|m| m.id == id).cloned())
    }

    async fn missions(&self, owner: OwnerId) -> Result<Vec<Mission>, StoreError> {
        let cell = self.owner_cell(owner);
        let records = cell.lock().await;
        let mut missions: Vec<Mission> = records.missions.clone();
        missions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(missions)
    }

    async fn transition(
        &self,
        owner: OwnerId,
        id: MissionId,
        to: MissionStatus,
    ) -> Result<Mission, StoreError> {
        let cell = self.owner_cell(owner);
        let mut records = cell.lock().await;

        let mission = records
            .missions
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(StoreError::MissionNotFound(id))?;
        if mission.status.is_terminal() {
            return Err(StoreError::InvalidTransition {
                mission: id,
                status: mission.status.to_string(),
            });
        }
        mission.status = to;
        Ok(mission.clone())
    }

    async fn expired_active(&self, now: DateTime<Utc>) -> Result<Vec<Mission>, StoreError> {
        let mut expired = Vec::new();
        for cell in self.all_cells() {
            let records = cell.lock().await;
            expired.extend(
                records
                    .missions
                    .iter()
                    .filter(|m| m.status == MissionStatus::Active && m.deadline < now)
                    .cloned(),
            );
        }
        Ok(expired)
    }
}

#[async_trait]
impl MetricsStore for MemoryStore {
    async fn metrics(&self, owner: OwnerId) -> Result<BusinessMetrics, StoreError> {
        let cell = self.owner_cell(owner);
        let records = cell.lock().await;
        Ok(records
            .metrics
            .clone()
            .unwrap_or_else(|| BusinessMetrics::zeroed(owner)))
    }

    async fn update_metrics(
        &self,
        owner: OwnerId,
        fold: Box<dyn for<'a> FnOnce(&'a mut BusinessMetrics) + Send>,
    ) -> Result<BusinessMetrics, StoreError> {
        let cell = self.owner_cell(owner);
        let mut records = cell.lock().await;
        let metrics = records
            .metrics
            .get_or_insert_with(|| BusinessMetrics::zeroed(owner));
        fold(metrics);
        metrics.recompute();
        Ok(metrics.clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::entities::TransactionMetadata;
    use chrono::Utc;

    fn entry(description: &str) -> NewTransaction {
        NewTransaction::new(description, TransactionMetadata::default(), Utc::now())
    }

    async fn seeded(owner: OwnerId, cents: u64) -> MemoryStore {
        let store = MemoryStore::new();
        store
            .credit(owner, Money::from_cents(cents), entry("seed"))
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn credit_creates_wallet_and_logs_deposit() {
        let owner = OwnerId::new();
        let store = seeded(owner, 10_000).await;

        let wallet = LedgerStore::wallet(&store, owner).await.unwrap();
        assert_eq!(wallet.balance, Money::from_cents(10_000));

        let log = store.transactions(owner, None).await.unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].kind, TransactionKind::Deposit);
        assert_eq!(log[0].amount, Money::from_cents(10_000));
    }

    #[tokio::test]
    async fn debit_rejects_overdraw_without_mutation() {
        let owner = OwnerId::new();
        let store = seeded(owner, 5_000).await;

        let err = store
            .debit(owner, Money::from_cents(6_000), entry("too much"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::InsufficientFunds {
                requested: Money::from_cents(6_000),
                available: Money::from_cents(5_000),
            }
        );

        let wallet = LedgerStore::wallet(&store, owner).await.unwrap();
        assert_eq!(wallet.balance, Money::from_cents(5_000));
        assert_eq!(store.transactions(owner, None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_debits_never_jointly_overdraw() {
        let owner = OwnerId::new();
        let store = Arc::new(seeded(owner, 10_000).await);

        let mut handles = Vec::new();
        for _ in 0..10 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .debit(owner, Money::from_cents(3_000), entry("race"))
                    .await
                    .is_ok()
            }));
        }

        let mut succeeded = 0;
        for handle in handles {
            if handle.await.unwrap() {
                succeeded += 1;
            }
        }

        // 10_000 cents covers exactly three 3_000-cent debits.
        assert_eq!(succeeded, 3);
        let wallet = LedgerStore::wallet(store.as_ref(), owner).await.unwrap();
        assert_eq!(wallet.balance, Money::from_cents(1_000));
    }

    #[tokio::test]
    async fn allocation_replaces_and_skips_unowned_products() {
        let owner = OwnerId::new();
        let store = seeded(owner, 15_000).await;
        let owned = ProductId::new();
        let unowned = ProductId::new();
        store
            .create_product(Product {
                id: owned,
                owner,
                name: "Widget".to_string(),
                unit_cost: Money::from_cents(100),
            })
            .await
            .unwrap();

        let outcome = store
            .apply_allocations(
                owner,
                vec![
                    AllocationLine {
                        product: owned,
                        amount: Money::from_cents(6_000),
                    },
                    AllocationLine {
                        product: unowned,
                        amount: Money::from_cents(4_000),
                    },
                ],
                entry("allocate"),
            )
            .await
            .unwrap();

        assert_eq!(outcome.applied.len(), 1);
        assert_eq!(outcome.new_balance, Money::from_cents(9_000));

        // Re-allocation replaces, not accumulates.
        let outcome = store
            .apply_allocations(
                owner,
                vec![AllocationLine {
                    product: owned,
                    amount: Money::from_cents(2_000),
                }],
                entry("reallocate"),
            )
            .await
            .unwrap();
        assert_eq!(outcome.new_balance, Money::from_cents(7_000));

        let allocations = store.allocations(owner).await.unwrap();
        assert_eq!(allocations.len(), 1);
        assert_eq!(allocations[0].allocated_budget, Money::from_cents(2_000));
    }

    #[tokio::test]
    async fn product_tagged_debit_advances_used_budget_clamped() {
        let owner = OwnerId::new();
        let store = seeded(owner, 20_000).await;
        let product = ProductId::new();
        store
            .create_product(Product {
                id: product,
                owner,
                name: "Widget".to_string(),
                unit_cost: Money::from_cents(100),
            })
            .await
            .unwrap();
        store
            .apply_allocations(
                owner,
                vec![AllocationLine {
                    product,
                    amount: Money::from_cents(1_000),
                }],
                entry("allocate"),
            )
            .await
            .unwrap();

        let sku = Sku::new("SKU-1").unwrap();
        let tagged = NewTransaction::new(
            "restock",
            TransactionMetadata::for_sku(product, sku),
            Utc::now(),
        );
        store
            .debit(owner, Money::from_cents(1_500), tagged)
            .await
            .unwrap();

        let allocations = store.allocations(owner).await.unwrap();
        assert_eq!(allocations[0].used_budget, Money::from_cents(1_000));
        assert_eq!(allocations[0].allocated_budget, Money::from_cents(1_000));
    }

    #[tokio::test]
    async fn restock_is_additive_and_stamps_time() {
        let owner = OwnerId::new();
        let store = MemoryStore::new();
        let product = ProductId::new();
        store
            .create_product(Product {
                id: product,
                owner,
                name: "Widget".to_string(),
                unit_cost: Money::from_cents(100),
            })
            .await
            .unwrap();

        let sku = Sku::new("SKU-1").unwrap();
        let at = Utc::now();
        let record = store
            .apply_restock(owner, product, sku.clone(), 5, at)
            .await
            .unwrap();
        assert_eq!(record.quantity, 5);
        assert_eq!(record.last_restocked_at, Some(at));

        let record = store
            .apply_restock(owner, product, sku, 7, at)
            .await
            .unwrap();
        assert_eq!(record.quantity, 12);
    }

    #[tokio::test]
    async fn transition_is_single_shot() {
        let owner = OwnerId::new();
        let store = MemoryStore::new();
        let mission = sample_mission(owner);
        let id = mission.id;
        store.insert_mission(mission).await.unwrap();

        let updated = store
            .transition(owner, id, MissionStatus::Completed)
            .await
            .unwrap();
        assert_eq!(updated.status, MissionStatus::Completed);

        let err = store
            .transition(owner, id, MissionStatus::Failed)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::InvalidTransition {
                mission: id,
                status: "completed".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn active_duplicate_suppresses_insert_terminal_does_not() {
        let owner = OwnerId::new();
        let store = MemoryStore::new();
        let first = sample_mission(owner);
        let key = first.dedup_key.clone();
        let first_id = first.id;
        assert!(store.insert_mission(first).await.unwrap());

        let mut twin = sample_mission(owner);
        twin.dedup_key = key.clone();
        assert!(!store.insert_mission(twin.clone()).await.unwrap());

        store
            .transition(owner, first_id, MissionStatus::Failed)
            .await
            .unwrap();
        assert!(store.insert_mission(twin).await.unwrap());
    }

    fn sample_mission(owner: OwnerId) -> Mission {
        use dropsim_core::impact::ImpactVector;
        use dropsim_core::types::{EventOrigin, ImpactKind};

        Mission {
            id: MissionId::new(),
            owner,
            title: "Port strike".to_string(),
            description: "Dock workers walked out".to_string(),
            kind: ImpactKind::Labour,
            origin: EventOrigin::Synthetic,
            status: MissionStatus::Active,
            deadline: Utc::now(),
            cost_to_solve: Money::from_cents(5_000),
            impact: ImpactVector::new(),
            dedup_key: "abc".to_string(),
            created_at: Utc::now(),
        }
    }
}
