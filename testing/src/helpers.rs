//! Seeding helpers shared by engine and store tests.

use chrono::{DateTime, Utc};
use dropsim_core::types::{Money, OwnerId, ProductId, Sku};
use dropsim_store::{
    CatalogStore, LedgerStore, MemoryStore, NewTransaction, Product, StoreError,
    TransactionMetadata,
};

/// Parses a static SKU literal.
///
/// # Panics
///
/// Panics when handed a blank code; test fixtures always use literals.
#[must_use]
#[allow(clippy::expect_used)]
pub fn sku(code: &str) -> Sku {
    Sku::new(code).expect("test SKU codes are non-blank")
}

/// Credits an owner's wallet with opening capital.
///
/// # Errors
///
/// Propagates the store error (the in-memory store does not fail).
pub async fn seed_wallet(
    store: &MemoryStore,
    owner: OwnerId,
    opening: Money,
    at: DateTime<Utc>,
) -> Result<Money, StoreError> {
    store
        .credit(
            owner,
            opening,
            NewTransaction::new("starting capital", TransactionMetadata::default(), at),
        )
        .await
}

/// Creates a catalog product and returns its id.
///
/// # Errors
///
/// Propagates the store error (the in-memory store does not fail).
pub async fn seed_product(
    store: &MemoryStore,
    owner: OwnerId,
    name: &str,
    unit_cost: Money,
) -> Result<ProductId, StoreError> {
    let id = ProductId::new();
    store
        .create_product(Product {
            id,
            owner,
            name: name.to_string(),
            unit_cost,
        })
        .await?;
    Ok(id)
}
