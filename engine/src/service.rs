//! The `Simulation` facade: wires the components together and exposes the
//! operation contracts.
//!
//! Each operation runs in its own short-lived request: authenticate (done
//! by the caller through the [`crate::auth`] seam), validate, then execute
//! against the stores. There is no in-process scheduler; the deadline
//! sweep is a method an external trigger calls.

use crate::config::Config;
use crate::events::festivals::FestivalEventSource;
use crate::events::news::{HttpNewsProvider, NewsEventSource, NewsProvider};
use crate::events::synthetic::SyntheticEventSource;
use crate::events::{EventAggregator, EventSource};
use crate::inventory::{InventoryManager, InventoryView, RestockOutcome};
use crate::ledger::{AllocationOutcome, BudgetStatus, Ledger};
use crate::missions::{MissionManager, Resolution, ResolveAction};
use crate::projector::MetricsProjector;
use dropsim_core::environment::{Clock, RandomSource};
use dropsim_core::types::{MissionId, Money, OwnerId, ProductId, Sku};
use dropsim_core::SimulationError;
use dropsim_store::{
    AllocationLine, BusinessMetrics, CatalogStore, InventoryStore, LedgerStore, MemoryStore,
    Mission, MetricsStore, MissionStore, TransactionMetadata,
};
use std::sync::Arc;
use std::time::Duration as StdDuration;

/// The storage trait objects the simulation runs over.
#[derive(Clone)]
pub struct Stores {
    /// Wallets, allocations and the transaction log.
    pub ledger: Arc<dyn LedgerStore>,
    /// The product catalog.
    pub catalog: Arc<dyn CatalogStore>,
    /// Per-SKU stock rows.
    pub inventory: Arc<dyn InventoryStore>,
    /// The mission table.
    pub missions: Arc<dyn MissionStore>,
    /// Per-owner business metrics.
    pub metrics: Arc<dyn MetricsStore>,
}

impl Stores {
    /// Points every trait at one shared in-memory store.
    #[must_use]
    pub fn from_memory(store: &Arc<MemoryStore>) -> Self {
        Self {
            ledger: Arc::clone(store) as Arc<dyn LedgerStore>,
            catalog: Arc::clone(store) as Arc<dyn CatalogStore>,
            inventory: Arc::clone(store) as Arc<dyn InventoryStore>,
            missions: Arc::clone(store) as Arc<dyn MissionStore>,
            metrics: Arc::clone(store) as Arc<dyn MetricsStore>,
        }
    }
}

/// The simulator's service facade.
pub struct Simulation {
    ledger: Ledger,
    inventory: InventoryManager,
    missions: MissionManager,
    projector: MetricsProjector,
    aggregator: EventAggregator,
    recent_transactions: usize,
}

impl Simulation {
    /// Wires the components over the given stores and environment.
    #[must_use]
    pub fn new(
        stores: Stores,
        aggregator: EventAggregator,
        clock: Arc<dyn Clock>,
        recent_transactions: usize,
    ) -> Self {
        let ledger = Ledger::new(Arc::clone(&stores.ledger), Arc::clone(&clock));
        let projector = MetricsProjector::new(Arc::clone(&stores.metrics));
        let inventory = InventoryManager::new(
            Arc::clone(&stores.inventory),
            Arc::clone(&stores.catalog),
            ledger.clone(),
            Arc::clone(&clock),
        );
        let missions = MissionManager::new(
            Arc::clone(&stores.missions),
            ledger.clone(),
            projector.clone(),
            clock,
        );
        Self {
            ledger,
            inventory,
            missions,
            projector,
            aggregator,
            recent_transactions,
        }
    }

    /// Wires the components from configuration: HTTP news providers in
    /// failover order, the festival calendar and the synthetic generator.
    #[must_use]
    pub fn from_config(
        config: &Config,
        stores: Stores,
        clock: Arc<dyn Clock>,
        random: Arc<dyn RandomSource>,
    ) -> Self {
        let provider_timeout = StdDuration::from_millis(config.news.provider_timeout_ms);
        let providers: Vec<Arc<dyn NewsProvider>> = config
            .news
            .providers
            .iter()
            .map(|provider| {
                Arc::new(HttpNewsProvider::new(
                    provider.name.clone(),
                    provider.endpoint.clone(),
                    provider.api_key.clone(),
                    provider_timeout,
                )) as Arc<dyn NewsProvider>
            })
            .collect();

        let sources: Vec<Arc<dyn EventSource>> = vec![
            Arc::new(NewsEventSource::new(providers, provider_timeout)),
            Arc::new(FestivalEventSource::new(Arc::clone(&clock))),
            Arc::new(SyntheticEventSource::with_probabilities(
                random,
                config.synthetic.labour_probability,
                config.synthetic.restriction_probability,
            )),
        ];
        let aggregator = EventAggregator::new(
            sources,
            StdDuration::from_millis(config.aggregator.source_timeout_ms),
        );

        Self::new(
            stores,
            aggregator,
            clock,
            config.simulation.recent_transactions,
        )
    }

    /// Collects the current template pool and issues a mission for every
    /// candidate that is not a duplicate of an active mission. Returns the
    /// missions actually created, which may be empty when everything was
    /// suppressed.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::SystemFailure`] if the store fails;
    /// source outages never fail the call.
    pub async fn create_missions_from_events(
        &self,
        owner: OwnerId,
        locations: &[String],
    ) -> Result<Vec<Mission>, SimulationError> {
        let templates = self.aggregator.collect(locations).await;

        let mut created = Vec::new();
        for template in &templates {
            if let Some(mission) = self.missions.create_from_template(owner, template).await? {
                created.push(mission);
            }
        }
        tracing::info!(
            %owner,
            candidates = templates.len(),
            created = created.len(),
            "missions created from events"
        );
        Ok(created)
    }

    /// All missions for the owner, most recent first.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::SystemFailure`] if the store fails.
    pub async fn list_missions(&self, owner: OwnerId) -> Result<Vec<Mission>, SimulationError> {
        self.missions.list(owner).await
    }

    /// Resolves a mission; see [`MissionManager::resolve`] for the
    /// state-machine contract.
    ///
    /// # Errors
    ///
    /// Propagates [`SimulationError::NotFound`], [`SimulationError::Conflict`],
    /// [`SimulationError::InsufficientFunds`] and
    /// [`SimulationError::SystemFailure`].
    pub async fn resolve_mission(
        &self,
        owner: OwnerId,
        mission: MissionId,
        action: ResolveAction,
    ) -> Result<Resolution, SimulationError> {
        self.missions.resolve(owner, mission, action).await
    }

    /// Fails active missions past their deadline, across all owners.
    /// Externally triggered and safely re-entrant.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::SystemFailure`] if the store fails.
    pub async fn sweep_deadlines(&self) -> Result<Vec<Mission>, SimulationError> {
        self.missions.sweep_deadlines().await
    }

    /// The budget projection plus recent transactions.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::SystemFailure`] if the store fails.
    pub async fn budget_status(&self, owner: OwnerId) -> Result<BudgetStatus, SimulationError> {
        self.ledger.status(owner, self.recent_transactions).await
    }

    /// Earmarks budget per product; see [`Ledger::allocate`].
    ///
    /// # Errors
    ///
    /// Propagates [`SimulationError::Validation`],
    /// [`SimulationError::InsufficientFunds`] and
    /// [`SimulationError::SystemFailure`].
    pub async fn allocate_budget(
        &self,
        owner: OwnerId,
        lines: Vec<AllocationLine>,
    ) -> Result<AllocationOutcome, SimulationError> {
        self.ledger.allocate(owner, lines).await
    }

    /// Adds funds to the wallet. Returns the new balance.
    ///
    /// # Errors
    ///
    /// Propagates [`SimulationError::Validation`] and
    /// [`SimulationError::SystemFailure`].
    pub async fn add_funds(
        &self,
        owner: OwnerId,
        amount: Money,
    ) -> Result<Money, SimulationError> {
        self.ledger
            .credit(owner, amount, "funds added", TransactionMetadata::default())
            .await
    }

    /// Restocks a SKU with charge-then-apply ordering; see
    /// [`InventoryManager::restock`].
    ///
    /// # Errors
    ///
    /// Propagates [`SimulationError::Validation`], [`SimulationError::NotFound`],
    /// [`SimulationError::InsufficientFunds`] and
    /// [`SimulationError::SystemFailure`].
    pub async fn restock_inventory(
        &self,
        owner: OwnerId,
        product: ProductId,
        sku: Sku,
        quantity: u32,
    ) -> Result<RestockOutcome, SimulationError> {
        self.inventory.restock(owner, product, sku, quantity).await
    }

    /// Updates a SKU's reorder configuration. No financial effect.
    ///
    /// # Errors
    ///
    /// Propagates [`SimulationError::NotFound`] and
    /// [`SimulationError::SystemFailure`].
    pub async fn update_sku_config(
        &self,
        owner: OwnerId,
        product: ProductId,
        sku: Sku,
        reorder_point: u32,
        reorder_quantity: u32,
    ) -> Result<InventoryView, SimulationError> {
        self.inventory
            .update_sku_config(owner, product, sku, reorder_point, reorder_quantity)
            .await
    }

    /// Lists stock rows with derived fields, optionally filtered to one
    /// product.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::SystemFailure`] if the store fails.
    pub async fn list_inventory(
        &self,
        owner: OwnerId,
        product: Option<ProductId>,
    ) -> Result<Vec<InventoryView>, SimulationError> {
        self.inventory.list(owner, product).await
    }

    /// The owner's aggregate business KPIs.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::SystemFailure`] if the store fails.
    pub async fn business_metrics(
        &self,
        owner: OwnerId,
    ) -> Result<BusinessMetrics, SimulationError> {
        self.projector.metrics(owner).await
    }
}
