//! The Mission Lifecycle Manager.
//!
//! Issues missions from templates and drives the state machine:
//!
//! ```text
//! Active --(solve, debit ok)--> Completed
//! Active --(fail | deadline)--> Failed
//! ```
//!
//! Both terminal states are final; missions are never deleted. Resolution
//! treats "check status → debit → flip status" as one logical unit keyed
//! by mission id: an in-process keyed lock serializes resolvers, and the
//! store's compare-and-set transition backs that up across processes, so
//! repeated or concurrent resolutions debit at most once and the loser
//! observes a `Conflict`.

use crate::events::MissionTemplate;
use crate::ledger::Ledger;
use crate::projector::MetricsProjector;
use crate::{map_store_error, telemetry};
use dropsim_core::environment::Clock;
use dropsim_core::types::{MissionId, Money, OwnerId};
use dropsim_core::SimulationError;
use dropsim_store::{
    Mission, MissionStatus, MissionStore, StoreError, TransactionMetadata,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use tokio::sync::Mutex;

/// How a caller wants a mission resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolveAction {
    /// Pay the mitigation cost; the mission completes.
    Solve,
    /// Give up; the impact lands and the mission fails.
    Fail,
}

impl ResolveAction {
    /// Parses a wire-level action name. `None` for anything unknown.
    #[must_use]
    pub fn parse(action: &str) -> Option<Self> {
        match action.trim().to_lowercase().as_str() {
            "solve" => Some(Self::Solve),
            "fail" => Some(Self::Fail),
            _ => None,
        }
    }
}

/// Outcome of a resolution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    /// The mission in its terminal state.
    pub mission: Mission,
    /// Wallet balance after the resolution (unchanged for `Fail`).
    pub new_balance: Money,
    /// Human-readable summary.
    pub message: String,
}

/// Per-mission resolution locks. Entries are tiny and missions are finite,
/// so the map is never pruned.
#[derive(Clone, Default)]
struct ResolutionLocks {
    inner: Arc<StdMutex<HashMap<MissionId, Arc<Mutex<()>>>>>,
}

impl ResolutionLocks {
    fn for_mission(&self, id: MissionId) -> Arc<Mutex<()>> {
        let mut locks = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(id).or_default())
    }
}

/// The Mission Lifecycle Manager service.
#[derive(Clone)]
pub struct MissionManager {
    store: Arc<dyn MissionStore>,
    ledger: Ledger,
    projector: MetricsProjector,
    clock: Arc<dyn Clock>,
    locks: ResolutionLocks,
}

impl MissionManager {
    /// Creates a manager over its store and collaborators.
    #[must_use]
    pub fn new(
        store: Arc<dyn MissionStore>,
        ledger: Ledger,
        projector: MetricsProjector,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            ledger,
            projector,
            clock,
            locks: ResolutionLocks::default(),
        }
    }

    /// Issues a mission from a template, snapshotting its cost and impact.
    /// Returns `None` when an active mission with the same dedup key
    /// already exists for the owner (terminal missions never suppress).
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::SystemFailure`] if the store fails.
    pub async fn create_from_template(
        &self,
        owner: OwnerId,
        template: &MissionTemplate,
    ) -> Result<Option<Mission>, SimulationError> {
        let now = self.clock.now();
        let mission = Mission {
            id: MissionId::new(),
            owner,
            title: template.title.clone(),
            description: template.description.clone(),
            kind: template.kind,
            origin: template.origin,
            status: MissionStatus::Active,
            deadline: now + template.duration,
            cost_to_solve: template.cost_to_solve,
            impact: template.impact.clone(),
            dedup_key: template.dedup_key(),
            created_at: now,
        };

        let inserted = self
            .store
            .insert_mission(mission.clone())
            .await
            .map_err(map_store_error)?;
        if inserted {
            telemetry::record_mission_created(&template.origin.to_string());
            tracing::info!(
                %owner,
                mission = %mission.id,
                title = %mission.title,
                deadline = %mission.deadline,
                "mission issued"
            );
            Ok(Some(mission))
        } else {
            tracing::debug!(%owner, title = %template.title, "duplicate active mission suppressed");
            Ok(None)
        }
    }

    /// All missions for the owner, most recent first.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::SystemFailure`] if the store fails.
    pub async fn list(&self, owner: OwnerId) -> Result<Vec<Mission>, SimulationError> {
        self.store.missions(owner).await.map_err(map_store_error)
    }

    /// Resolves an active mission.
    ///
    /// For [`ResolveAction::Solve`] the Ledger debit of the snapshotted
    /// cost must succeed before any other mutation; on insufficient funds
    /// the whole call aborts with no state change and the mission stays
    /// active. On a successful debit the impact vector is applied (paying
    /// mitigates the disruption does not reverse it) and the mission
    /// completes. For [`ResolveAction::Fail`] the debit is skipped, the
    /// impact lands, and the mission fails.
    ///
    /// # Errors
    ///
    /// - [`SimulationError::NotFound`] when no mission with this id belongs
    ///   to the owner.
    /// - [`SimulationError::Conflict`] when the mission is already
    ///   terminal; the balance is unchanged since the first resolution.
    /// - [`SimulationError::InsufficientFunds`] when solving and the wallet
    ///   cannot cover the cost.
    /// - [`SimulationError::SystemFailure`] if the store fails.
    pub async fn resolve(
        &self,
        owner: OwnerId,
        id: MissionId,
        action: ResolveAction,
    ) -> Result<Resolution, SimulationError> {
        let lock = self.locks.for_mission(id);
        let _guard = lock.lock().await;

        let mission = self
            .store
            .mission(owner, id)
            .await
            .map_err(map_store_error)?
            .ok_or_else(|| SimulationError::not_found(format!("mission {id}")))?;
        if mission.status.is_terminal() {
            return Err(SimulationError::Conflict {
                status: mission.status.to_string(),
            });
        }

        match action {
            ResolveAction::Solve => {
                let new_balance = self
                    .ledger
                    .debit(
                        owner,
                        mission.cost_to_solve,
                        format!("mitigation: {}", mission.title),
                        TransactionMetadata::for_mission(id),
                    )
                    .await?;
                self.projector
                    .apply(owner, &mission.impact, Some(mission.cost_to_solve))
                    .await?;
                let mission = self
                    .store
                    .transition(owner, id, MissionStatus::Completed)
                    .await
                    .map_err(map_store_error)?;

                telemetry::record_mission_resolved("completed");
                tracing::info!(%owner, mission = %id, cost = %mission.cost_to_solve, "mission solved");
                Ok(Resolution {
                    message: format!(
                        "Paid {} to mitigate \"{}\"; the impact still lands, softened.",
                        mission.cost_to_solve, mission.title
                    ),
                    mission,
                    new_balance,
                })
            }
            ResolveAction::Fail => {
                self.projector.apply(owner, &mission.impact, None).await?;
                let mission = self
                    .store
                    .transition(owner, id, MissionStatus::Failed)
                    .await
                    .map_err(map_store_error)?;
                let new_balance = self.ledger.balance(owner).await?;

                telemetry::record_mission_resolved("failed");
                tracing::info!(%owner, mission = %id, "mission failed by owner");
                Ok(Resolution {
                    message: format!(
                        "\"{}\" was not handled; the full impact lands.",
                        mission.title
                    ),
                    mission,
                    new_balance,
                })
            }
        }
    }

    /// Fails every active mission whose deadline has passed, across all
    /// owners. Safe to re-enter: the transition is a compare-and-set, so
    /// when sweeps race (or race a user resolution) only the winner applies
    /// the impact; everyone else observes a terminal status and no-ops.
    ///
    /// The transition runs *before* the impact fold so a sweep in another
    /// process can never double-apply the impact.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::SystemFailure`] if the store fails; a
    /// dropped sweep pass is retryable by the next trigger.
    pub async fn sweep_deadlines(&self) -> Result<Vec<Mission>, SimulationError> {
        let now = self.clock.now();
        let expired = self
            .store
            .expired_active(now)
            .await
            .map_err(map_store_error)?;

        let mut swept = Vec::new();
        for mission in expired {
            let lock = self.locks.for_mission(mission.id);
            let _guard = lock.lock().await;

            match self
                .store
                .transition(mission.owner, mission.id, MissionStatus::Failed)
                .await
            {
                Ok(updated) => {
                    self.projector
                        .apply(mission.owner, &updated.impact, None)
                        .await?;
                    telemetry::record_mission_resolved("swept");
                    tracing::info!(
                        owner = %mission.owner,
                        mission = %mission.id,
                        deadline = %mission.deadline,
                        "mission failed by deadline sweep"
                    );
                    swept.push(updated);
                }
                Err(StoreError::InvalidTransition { .. } | StoreError::MissionNotFound(_)) => {
                    // Another sweep or a user resolution won the race.
                    tracing::debug!(mission = %mission.id, "already terminal; sweep no-op");
                }
                Err(error) => return Err(map_store_error(error)),
            }
        }
        Ok(swept)
    }
}
