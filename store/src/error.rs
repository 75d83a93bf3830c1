//! Storage error type.
//!
//! Carries enough structure for the engine to translate into the
//! user-facing taxonomy without string matching. `Unavailable` holds the
//! backend detail; the engine logs it and surfaces a generic retry message.

use dropsim_core::types::{MissionId, Money, OwnerId, ProductId, Sku};
use thiserror::Error;

/// Errors surfaced by the storage traits.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No wallet row exists for the owner.
    #[error("no wallet for owner {0}")]
    WalletNotFound(OwnerId),

    /// No mission row matches the id for this owner.
    #[error("mission {0} not found")]
    MissionNotFound(MissionId),

    /// No catalog row matches the product id for this owner.
    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    /// No inventory row matches the SKU for this owner and product.
    #[error("sku {sku} not found on product {product}")]
    SkuNotFound {
        /// The product looked up.
        product: ProductId,
        /// The SKU looked up.
        sku: Sku,
    },

    /// The wallet balance cannot cover the requested amount. The store
    /// checks inside the owner lock, so this is authoritative.
    #[error("insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds {
        /// Amount requested.
        requested: Money,
        /// Balance available at check time.
        available: Money,
    },

    /// A status transition was attempted on a mission that is no longer in
    /// the expected state.
    #[error("mission {mission} is already {status}")]
    InvalidTransition {
        /// The mission involved.
        mission: MissionId,
        /// Its current (terminal) status, as a stable label.
        status: String,
    },

    /// The backend failed. The detail is for logs only.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
