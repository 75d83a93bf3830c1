//! Persisted entity rows.
//!
//! These structs mirror the relational rows the simulator assumes: a wallet
//! per owner, an append-only transaction log, one allocation row per
//! `(owner, product)`, one inventory row per `(owner, product, sku)`, the
//! mission table, the per-owner business-metrics row, and a minimal product
//! catalog. Derived quantities (available stock, needs-restock) are methods,
//! never stored columns.

use chrono::{DateTime, Utc};
use dropsim_core::impact::ImpactVector;
use dropsim_core::types::{
    EventOrigin, ImpactKind, MissionId, Money, OwnerId, ProductId, Sku, TransactionId,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// Wallet & transaction log
// ============================================================================

/// One owner's cash wallet.
///
/// `balance` is the unallocated, unspent cash. Budget allocations move cash
/// out of the balance into per-product earmarks; spends move it out of the
/// business entirely.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    /// Wallet owner.
    pub owner: OwnerId,
    /// Current unallocated balance.
    pub balance: Money,
}

/// The kind of a ledger transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionKind {
    /// Cash entering the wallet.
    Deposit,
    /// Cash moved from the wallet into per-product budget earmarks.
    Allocation,
    /// Cash leaving the wallet (mission mitigation, restock, ...).
    Spend,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deposit => f.write_str("deposit"),
            Self::Allocation => f.write_str("allocation"),
            Self::Spend => f.write_str("spend"),
        }
    }
}

/// Structured references a transaction may carry.
///
/// Kept as typed optional columns rather than a free-form blob so tests and
/// projections can ask "the spend for mission X" without string matching.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionMetadata {
    /// Mission this transaction paid for, if any.
    pub mission: Option<MissionId>,
    /// Product this transaction concerned, if any.
    pub product: Option<ProductId>,
    /// SKU this transaction concerned, if any.
    pub sku: Option<Sku>,
    /// The allocation lines a summarizing allocation transaction applied.
    pub allocation_lines: Vec<AllocationLine>,
}

impl TransactionMetadata {
    /// Metadata referencing a mission.
    #[must_use]
    pub fn for_mission(mission: MissionId) -> Self {
        Self {
            mission: Some(mission),
            ..Self::default()
        }
    }

    /// Metadata referencing a product and SKU.
    #[must_use]
    pub fn for_sku(product: ProductId, sku: Sku) -> Self {
        Self {
            product: Some(product),
            sku: Some(sku),
            ..Self::default()
        }
    }
}

/// One append-only ledger entry.
///
/// The log is the source of truth: replaying every entry for an owner
/// (deposits add; allocations and spends subtract) reconstructs the wallet
/// balance exactly.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTransaction {
    /// Transaction identifier.
    pub id: TransactionId,
    /// Wallet owner.
    pub owner: OwnerId,
    /// Deposit, allocation or spend.
    pub kind: TransactionKind,
    /// Positive magnitude; the kind determines the sign on replay.
    pub amount: Money,
    /// Human-readable description.
    pub description: String,
    /// Structured references.
    pub metadata: TransactionMetadata,
    /// When the transaction was applied.
    pub timestamp: DateTime<Utc>,
}

impl LedgerTransaction {
    /// The signed effect of this entry on the wallet balance, in cents.
    #[must_use]
    pub const fn signed_cents(&self) -> i64 {
        match self.kind {
            TransactionKind::Deposit => self.amount.as_signed_cents(),
            TransactionKind::Allocation | TransactionKind::Spend => {
                -self.amount.as_signed_cents()
            }
        }
    }
}

/// A ledger entry before the store stamps it into the log.
///
/// The caller supplies the timestamp from its injected clock so the store
/// stays clock-free and tests stay deterministic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewTransaction {
    /// Pre-generated transaction identifier.
    pub id: TransactionId,
    /// Human-readable description.
    pub description: String,
    /// Structured references.
    pub metadata: TransactionMetadata,
    /// When the operation happened, per the caller's clock.
    pub at: DateTime<Utc>,
}

impl NewTransaction {
    /// Creates a new entry with a fresh id.
    #[must_use]
    pub fn new(description: impl Into<String>, metadata: TransactionMetadata, at: DateTime<Utc>) -> Self {
        Self {
            id: TransactionId::new(),
            description: description.into(),
            metadata,
            at,
        }
    }
}

// ============================================================================
// Budget allocations
// ============================================================================

/// One line of an allocation request: earmark `amount` for `product`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationLine {
    /// Product receiving the earmark.
    pub product: ProductId,
    /// Amount to earmark.
    pub amount: Money,
}

/// The budget earmark row for one `(owner, product)` pair.
///
/// Invariant: `used_budget <= allocated_budget` at all times.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductAllocation {
    /// Owner of the earmark.
    pub owner: OwnerId,
    /// Product the earmark is ring-fenced for.
    pub product: ProductId,
    /// Budget set aside for this product.
    pub allocated_budget: Money,
    /// How much of the earmark has been consumed by spending.
    pub used_budget: Money,
}

impl ProductAllocation {
    /// Remaining headroom in the earmark.
    #[must_use]
    pub fn remaining(&self) -> Money {
        self.allocated_budget
            .checked_sub(self.used_budget)
            .unwrap_or(Money::ZERO)
    }
}

// ============================================================================
// Product catalog & inventory
// ============================================================================

/// Minimal catalog row; catalog management itself is an external concern.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Product identifier.
    pub id: ProductId,
    /// Owner of the catalog entry.
    pub owner: OwnerId,
    /// Display name.
    pub name: String,
    /// Supplier unit cost, used to price restocks.
    pub unit_cost: Money,
}

/// The stock row for one `(owner, product, sku)` triple.
///
/// Invariant: `reserved_quantity <= quantity`. Available stock is always
/// derived, never stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRecord {
    /// Owner of the stock.
    pub owner: OwnerId,
    /// Product this SKU belongs to.
    pub product: ProductId,
    /// Stock-keeping unit.
    pub sku: Sku,
    /// Units on hand.
    pub quantity: u32,
    /// Units held for open orders.
    pub reserved_quantity: u32,
    /// Restock trigger threshold.
    pub reorder_point: u32,
    /// Suggested restock size.
    pub reorder_quantity: u32,
    /// When stock last arrived, if ever.
    pub last_restocked_at: Option<DateTime<Utc>>,
}

impl InventoryRecord {
    /// A fresh, empty record with default reorder configuration.
    #[must_use]
    pub const fn empty(owner: OwnerId, product: ProductId, sku: Sku) -> Self {
        Self {
            owner,
            product,
            sku,
            quantity: 0,
            reserved_quantity: 0,
            reorder_point: 0,
            reorder_quantity: 0,
            last_restocked_at: None,
        }
    }

    /// Units available to sell: on hand minus reserved.
    #[must_use]
    pub const fn available_quantity(&self) -> u32 {
        self.quantity.saturating_sub(self.reserved_quantity)
    }

    /// Whether stock has fallen to the reorder point.
    #[must_use]
    pub const fn needs_restock(&self) -> bool {
        self.quantity <= self.reorder_point
    }
}

// ============================================================================
// Missions
// ============================================================================

/// Lifecycle state of a mission.
///
/// A mission transitions exactly once, from `Active` to one of the terminal
/// states. Missions are never deleted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MissionStatus {
    /// Awaiting resolution; the deadline clock is running.
    Active,
    /// Solved: the owner paid the mitigation cost.
    Completed,
    /// Failed explicitly or swept past its deadline.
    Failed,
}

impl MissionStatus {
    /// Whether this status is final.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for MissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => f.write_str("active"),
            Self::Completed => f.write_str("completed"),
            Self::Failed => f.write_str("failed"),
        }
    }
}

/// A persisted mission.
///
/// `cost_to_solve` and `impact` are snapshots taken at creation time; later
/// template regeneration never retroactively alters an issued mission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mission {
    /// Mission identifier.
    pub id: MissionId,
    /// Owner the mission was issued to.
    pub owner: OwnerId,
    /// Headline shown to the trainee.
    pub title: String,
    /// Longer description of the disruption.
    pub description: String,
    /// Classified disruption kind.
    pub kind: ImpactKind,
    /// Which aggregator source produced it.
    pub origin: EventOrigin,
    /// Lifecycle state.
    pub status: MissionStatus,
    /// When the mission fails automatically if unresolved.
    pub deadline: DateTime<Utc>,
    /// Snapshotted mitigation cost.
    pub cost_to_solve: Money,
    /// Snapshotted impact vector, applied once on resolution.
    pub impact: ImpactVector,
    /// Content hash of (normalized title, kind), stamped at creation and
    /// used to suppress duplicate active missions.
    pub dedup_key: String,
    /// When the mission was issued.
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Business metrics
// ============================================================================

/// Aggregate KPIs for one owner's business.
///
/// All financial fields are signed cents. `profit` and `cash_flow` are
/// always recomputed from revenue and expenses, never mutated on their own.
/// Informational readings accumulate per dimension name and never enter the
/// financial fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessMetrics {
    /// Owner of the aggregates.
    pub owner: OwnerId,
    /// Aggregate revenue, signed cents.
    pub revenue: i64,
    /// Aggregate expenses, signed cents.
    pub expenses: i64,
    /// `revenue - expenses`; recomputed on every fold.
    pub profit: i64,
    /// `revenue - expenses`; recomputed on every fold.
    pub cash_flow: i64,
    /// Accumulated non-financial readings (percent), per dimension name.
    pub informational: BTreeMap<String, i64>,
}

impl BusinessMetrics {
    /// A zeroed metrics row for an owner.
    #[must_use]
    pub const fn zeroed(owner: OwnerId) -> Self {
        Self {
            owner,
            revenue: 0,
            expenses: 0,
            profit: 0,
            cash_flow: 0,
            informational: BTreeMap::new(),
        }
    }

    /// Recomputes the derived fields from revenue and expenses.
    pub const fn recompute(&mut self) {
        self.profit = self.revenue - self.expenses;
        self.cash_flow = self.revenue - self.expenses;
    }
}
