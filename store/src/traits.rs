//! Storage traits the domain services depend on.
//!
//! Each trait method is one atomic unit against the backing store (see the
//! crate docs for the atomicity contract). Traits are object-safe so
//! services hold `Arc<dyn LedgerStore>` etc. and backends stay swappable.
//!
//! Timestamps always come in from the caller's injected clock; the store
//! never reads time on its own.

use crate::entities::{
    AllocationLine, BusinessMetrics, InventoryRecord, LedgerTransaction, Mission, MissionStatus,
    NewTransaction, Product, ProductAllocation, Wallet,
};
use crate::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dropsim_core::types::{MissionId, Money, OwnerId, ProductId, Sku};

/// Outcome of an allocation batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AllocationApplied {
    /// Wallet balance after the earmarks were taken.
    pub new_balance: Money,
    /// The lines that were actually applied (lines referencing products the
    /// owner does not own are skipped, not failed).
    pub applied: Vec<AllocationLine>,
}

/// Wallet balance, budget allocations and the append-only transaction log.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Reads the wallet row, if one exists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the backend fails.
    async fn wallet(&self, owner: OwnerId) -> Result<Wallet, StoreError>;

    /// Atomically increments the balance and appends a deposit entry.
    /// Creates the wallet on first credit. Returns the new balance.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] on backend failure or balance
    /// overflow.
    async fn credit(
        &self,
        owner: OwnerId,
        amount: Money,
        entry: NewTransaction,
    ) -> Result<Money, StoreError>;

    /// Atomically checks the balance, decrements it and appends a spend
    /// entry, all inside the owner's wallet lock, so concurrent debits can
    /// never jointly overdraw. Returns the new balance.
    ///
    /// When the entry's metadata names a product with an allocation row,
    /// the debit also advances that row's `used_budget`, clamped so
    /// `used_budget <= allocated_budget` always holds.
    ///
    /// # Errors
    ///
    /// - [`StoreError::InsufficientFunds`] if the balance cannot cover the
    ///   amount; nothing is mutated.
    /// - [`StoreError::WalletNotFound`] if no wallet exists.
    async fn debit(
        &self,
        owner: OwnerId,
        amount: Money,
        entry: NewTransaction,
    ) -> Result<Money, StoreError>;

    /// Atomically applies a budget allocation batch: checks the sum of the
    /// *submitted* lines against the balance, skips lines whose product
    /// the owner does not own, decrements the balance by the *applied*
    /// sum, **replaces** each applied product's `allocated_budget`, and
    /// appends one summarizing allocation entry covering the applied lines
    /// (no entry when every line was skipped).
    ///
    /// Replacing an allocation below its `used_budget` clamps the used
    /// figure down to the new budget so the row invariant holds.
    ///
    /// # Errors
    ///
    /// - [`StoreError::InsufficientFunds`] if the submitted sum exceeds
    ///   the balance; nothing is mutated.
    /// - [`StoreError::WalletNotFound`] if no wallet exists.
    async fn apply_allocations(
        &self,
        owner: OwnerId,
        lines: Vec<AllocationLine>,
        entry: NewTransaction,
    ) -> Result<AllocationApplied, StoreError>;

    /// The transaction log, newest first, optionally truncated.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the backend fails.
    async fn transactions(
        &self,
        owner: OwnerId,
        limit: Option<usize>,
    ) -> Result<Vec<LedgerTransaction>, StoreError>;

    /// All allocation rows for the owner.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the backend fails.
    async fn allocations(&self, owner: OwnerId) -> Result<Vec<ProductAllocation>, StoreError>;
}

/// Minimal product catalog (catalog management is an external concern; the
/// simulator only reads ownership and unit costs, and seeds rows in tests
/// and the demo).
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Inserts a catalog row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the backend fails.
    async fn create_product(&self, product: Product) -> Result<(), StoreError>;

    /// Reads one owned product.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the backend fails.
    async fn product(&self, owner: OwnerId, id: ProductId) -> Result<Option<Product>, StoreError>;

    /// All products for the owner.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the backend fails.
    async fn products(&self, owner: OwnerId) -> Result<Vec<Product>, StoreError>;
}

/// Per-SKU stock rows.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Atomically and additively applies a restock: increments `quantity`
    /// and stamps `last_restocked_at`. Creates the row on first restock of
    /// a missing SKU (first write wins under the owner lock). Returns the
    /// updated row.
    ///
    /// The caller is responsible for charging the wallet *before* calling
    /// this; the store applies stock unconditionally.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ProductNotFound`] if the owner does not own
    /// the product.
    async fn apply_restock(
        &self,
        owner: OwnerId,
        product: ProductId,
        sku: Sku,
        quantity: u32,
        at: DateTime<Utc>,
    ) -> Result<InventoryRecord, StoreError>;

    /// Sets reorder configuration for a SKU, creating an empty row if the
    /// SKU has never been stocked. No financial effect. Returns the
    /// updated row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ProductNotFound`] if the owner does not own
    /// the product.
    async fn update_sku_config(
        &self,
        owner: OwnerId,
        product: ProductId,
        sku: Sku,
        reorder_point: u32,
        reorder_quantity: u32,
    ) -> Result<InventoryRecord, StoreError>;

    /// All stock rows for the owner, optionally filtered to one product.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the backend fails.
    async fn inventory(
        &self,
        owner: OwnerId,
        product: Option<ProductId>,
    ) -> Result<Vec<InventoryRecord>, StoreError>;
}

/// The mission table.
#[async_trait]
pub trait MissionStore: Send + Sync {
    /// Inserts a newly issued mission unless an *active* mission with the
    /// same dedup key already exists for the owner, in which case nothing
    /// is inserted and `false` is returned. The check and the insert are
    /// one atomic unit (the relational analogue is a partial unique index
    /// on `(owner, dedup_key)` over active rows). Terminal missions never
    /// suppress.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the backend fails.
    async fn insert_mission(&self, mission: Mission) -> Result<bool, StoreError>;

    /// Reads one mission owned by the caller.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the backend fails.
    async fn mission(&self, owner: OwnerId, id: MissionId) -> Result<Option<Mission>, StoreError>;

    /// All missions for the owner, most recent first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the backend fails.
    async fn missions(&self, owner: OwnerId) -> Result<Vec<Mission>, StoreError>;

    /// Compare-and-set status transition out of `Active`. The single write
    /// a mission ever receives; later attempts observe the terminal status.
    /// Returns the updated mission.
    ///
    /// # Errors
    ///
    /// - [`StoreError::MissionNotFound`] if no such mission is owned by the
    ///   caller.
    /// - [`StoreError::InvalidTransition`] if the mission is already
    ///   terminal.
    async fn transition(
        &self,
        owner: OwnerId,
        id: MissionId,
        to: MissionStatus,
    ) -> Result<Mission, StoreError>;

    /// Active missions whose deadline has passed, across all owners. Used
    /// by the externally triggered deadline sweep.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the backend fails.
    async fn expired_active(&self, now: DateTime<Utc>) -> Result<Vec<Mission>, StoreError>;
}

/// The per-owner business-metrics row.
#[async_trait]
pub trait MetricsStore: Send + Sync {
    /// Reads the metrics row; a zeroed row if the owner has none yet.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the backend fails.
    async fn metrics(&self, owner: OwnerId) -> Result<BusinessMetrics, StoreError>;

    /// Atomically folds an update into the metrics row under the owner
    /// lock, then recomputes the derived fields (`profit`, `cash_flow`).
    /// Returns the updated row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the backend fails.
    async fn update_metrics(
        &self,
        owner: OwnerId,
        fold: Box<dyn for<'a> FnOnce(&'a mut BusinessMetrics) + Send>,
    ) -> Result<BusinessMetrics, StoreError>;
}
