//! # Dropsim Engine
//!
//! The mission engine and financial ledger of the dropsim training
//! simulator.
//!
//! ## Components
//!
//! - [`events`]: the Event Aggregator, which turns news articles, a festival
//!   calendar and a synthetic generator into mission template candidates
//! - [`missions`]: the Mission Lifecycle Manager, which issues missions from
//!   templates and drives them through `Active → Completed | Failed`
//! - [`ledger`]: wallet, budget allocations and the append-only
//!   transaction log
//! - [`inventory`]: per-SKU stock with charge-then-apply restocks
//! - [`projector`]: folds resolved-mission impact vectors into aggregate
//!   business KPIs
//! - [`service`]: the [`service::Simulation`] facade exposing the
//!   operation contracts
//!
//! ## Flow
//!
//! ```text
//! Event Aggregator ──templates──► Mission Lifecycle Manager
//!                                        │ resolve (solve)
//!                                        ▼
//!                                     Ledger ──debit ok──► Metrics Projector
//!                                        ▲
//! Inventory Manager ──restock cost───────┘
//! ```
//!
//! Every service reads time from an injected [`dropsim_core::environment::Clock`]
//! and randomness from an injected [`dropsim_core::environment::RandomSource`],
//! so the whole engine is deterministic under test.

pub mod auth;
pub mod config;
pub mod events;
pub mod inventory;
pub mod ledger;
pub mod missions;
pub mod projector;
pub mod service;
pub mod telemetry;

pub use service::Simulation;

use dropsim_core::SimulationError;
use dropsim_store::StoreError;

/// Translates storage errors into the user-facing taxonomy.
///
/// `Unavailable` details are logged here and replaced with the generic
/// retry message; storage internals never reach callers. Call sites that
/// need context-specific mappings (a missing wallet on a debit is an
/// insufficient-funds condition, not a lookup failure) intercept before
/// delegating.
pub(crate) fn map_store_error(error: StoreError) -> SimulationError {
    match error {
        StoreError::InsufficientFunds {
            requested,
            available,
        } => SimulationError::InsufficientFunds {
            requested,
            available,
        },
        StoreError::WalletNotFound(_) => SimulationError::not_found("wallet"),
        StoreError::MissionNotFound(id) => {
            SimulationError::not_found(format!("mission {id}"))
        }
        StoreError::ProductNotFound(id) => {
            SimulationError::not_found(format!("product {id}"))
        }
        StoreError::SkuNotFound { product, sku } => {
            SimulationError::not_found(format!("sku {sku} on product {product}"))
        }
        StoreError::InvalidTransition { status, .. } => SimulationError::Conflict { status },
        StoreError::Unavailable(detail) => {
            tracing::error!(detail = %detail, "store unavailable");
            SimulationError::SystemFailure
        }
    }
}
