//! # Dropsim Store
//!
//! Persisted entities and storage traits for the dropsim business simulator.
//!
//! The simulator assumes a transactional relational store with row-level
//! atomicity and unique constraints on `(owner, product)` and
//! `(owner, product, sku)`. Persistence-engine internals are not this
//! workspace's concern, so that collaborator is modeled as a set of
//! `Send + Sync` traits the domain services depend on, plus
//! [`MemoryStore`], an in-memory implementation that honors the same
//! atomicity contract and backs tests and the demo binary.
//!
//! ## Atomicity contract
//!
//! Every method on [`LedgerStore`], [`InventoryStore`], [`MissionStore`]
//! and [`MetricsStore`] is one atomic unit: it either fully applies or
//! leaves the store untouched. Financial methods serialize at owner-wallet
//! granularity: two concurrent debits for the same owner can never
//! interleave between the balance check and the balance write. A relational
//! implementation would hold a wallet row lock inside one transaction;
//! [`MemoryStore`] holds a per-owner async mutex.

pub mod entities;
pub mod error;
pub mod memory;
pub mod traits;

pub use entities::{
    AllocationLine, BusinessMetrics, InventoryRecord, LedgerTransaction, Mission, MissionStatus,
    NewTransaction, Product, ProductAllocation, TransactionKind, TransactionMetadata, Wallet,
};
pub use error::StoreError;
pub use memory::MemoryStore;
pub use traits::{
    AllocationApplied, CatalogStore, InventoryStore, LedgerStore, MetricsStore, MissionStore,
};
