//! The Inventory Manager: per-SKU stock with charge-then-apply restocks.
//!
//! A restock is priced from the product's catalog unit cost and charged
//! through the Ledger *before* any stock mutation. If the debit fails the
//! inventory is untouched; if it succeeds, the stock increment is additive,
//! never a replace.

use crate::ledger::Ledger;
use crate::{map_store_error, telemetry};
use dropsim_core::environment::Clock;
use dropsim_core::types::{Money, OwnerId, ProductId, Sku};
use dropsim_core::SimulationError;
use dropsim_store::{CatalogStore, InventoryRecord, InventoryStore, TransactionMetadata};
use std::sync::Arc;

/// Outcome of a restock.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RestockOutcome {
    /// What the restock cost: `quantity * unit_cost`.
    pub restock_cost: Money,
    /// Units on hand after the restock.
    pub new_quantity: u32,
    /// Wallet balance after the charge.
    pub new_balance: Money,
}

/// A stock row plus its derived fields, as exposed to callers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InventoryView {
    /// The underlying row.
    pub record: InventoryRecord,
    /// Units available to sell: on hand minus reserved.
    pub available_quantity: u32,
    /// Whether stock has fallen to the reorder point.
    pub needs_restock: bool,
}

impl From<InventoryRecord> for InventoryView {
    fn from(record: InventoryRecord) -> Self {
        let available_quantity = record.available_quantity();
        let needs_restock = record.needs_restock();
        Self {
            record,
            available_quantity,
            needs_restock,
        }
    }
}

/// The Inventory Manager service.
#[derive(Clone)]
pub struct InventoryManager {
    store: Arc<dyn InventoryStore>,
    catalog: Arc<dyn CatalogStore>,
    ledger: Ledger,
    clock: Arc<dyn Clock>,
}

impl InventoryManager {
    /// Creates an inventory manager over its stores and the ledger.
    #[must_use]
    pub fn new(
        store: Arc<dyn InventoryStore>,
        catalog: Arc<dyn CatalogStore>,
        ledger: Ledger,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            catalog,
            ledger,
            clock,
        }
    }

    /// Restocks a SKU: charges `quantity * unit_cost` through the Ledger,
    /// then additively increments the stock row and stamps the restock
    /// time. A SKU the product has never stocked is back-filled on first
    /// restock.
    ///
    /// Charge-then-apply is mandatory: when the debit fails, no inventory
    /// mutation occurs at all.
    ///
    /// # Errors
    ///
    /// - [`SimulationError::Validation`] for a zero quantity or a cost that
    ///   overflows.
    /// - [`SimulationError::NotFound`] when the owner does not own the
    ///   product.
    /// - [`SimulationError::InsufficientFunds`] when the wallet cannot
    ///   cover the cost; stock is untouched.
    /// - [`SimulationError::SystemFailure`] if the store fails.
    pub async fn restock(
        &self,
        owner: OwnerId,
        product: ProductId,
        sku: Sku,
        quantity: u32,
    ) -> Result<RestockOutcome, SimulationError> {
        if quantity == 0 {
            return Err(SimulationError::validation("quantity must be positive, got 0"));
        }

        let catalog_row = self
            .catalog
            .product(owner, product)
            .await
            .map_err(map_store_error)?
            .ok_or_else(|| SimulationError::not_found(format!("product {product}")))?;

        let restock_cost = catalog_row.unit_cost.checked_mul(quantity).ok_or_else(|| {
            SimulationError::validation(format!(
                "restock cost overflows: {} x {quantity}",
                catalog_row.unit_cost
            ))
        })?;

        let new_balance = self
            .ledger
            .debit(
                owner,
                restock_cost,
                format!("restock {sku} x{quantity} ({})", catalog_row.name),
                TransactionMetadata::for_sku(product, sku.clone()),
            )
            .await?;

        let record = self
            .store
            .apply_restock(owner, product, sku, quantity, self.clock.now())
            .await
            .map_err(map_store_error)?;

        telemetry::record_restock();
        tracing::info!(
            %owner,
            %product,
            sku = %record.sku,
            quantity,
            cost = %restock_cost,
            "inventory restocked"
        );
        Ok(RestockOutcome {
            restock_cost,
            new_quantity: record.quantity,
            new_balance,
        })
    }

    /// Updates a SKU's reorder configuration. No financial effect.
    ///
    /// # Errors
    ///
    /// - [`SimulationError::NotFound`] when the owner does not own the
    ///   product.
    /// - [`SimulationError::SystemFailure`] if the store fails.
    pub async fn update_sku_config(
        &self,
        owner: OwnerId,
        product: ProductId,
        sku: Sku,
        reorder_point: u32,
        reorder_quantity: u32,
    ) -> Result<InventoryView, SimulationError> {
        let record = self
            .store
            .update_sku_config(owner, product, sku, reorder_point, reorder_quantity)
            .await
            .map_err(map_store_error)?;
        Ok(record.into())
    }

    /// Lists stock rows with derived fields, optionally filtered to one
    /// product.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::SystemFailure`] if the store fails.
    pub async fn list(
        &self,
        owner: OwnerId,
        product: Option<ProductId>,
    ) -> Result<Vec<InventoryView>, SimulationError> {
        let records = self
            .store
            .inventory(owner, product)
            .await
            .map_err(map_store_error)?;
        Ok(records.into_iter().map(InventoryView::from).collect())
    }
}
