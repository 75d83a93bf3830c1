//! The Business Metrics Projector: folds a resolved mission's impact
//! vector into the owner's aggregate KPIs.
//!
//! Financial dimensions move their aggregates by the stated percentage;
//! the paid mitigation cost (present only when a mission was solved) is
//! additionally folded into expenses. Informational dimensions accumulate
//! in their own bucket and never enter the financial math. The whole fold
//! is one atomic unit per owner; `profit` and `cash_flow` are recomputed
//! by the store after every fold.

use crate::map_store_error;
use dropsim_core::impact::{ImpactVector, KpiDimension};
use dropsim_core::types::{Money, OwnerId};
use dropsim_core::SimulationError;
use dropsim_store::{BusinessMetrics, MetricsStore};
use std::sync::Arc;

/// The Business Metrics Projector service.
#[derive(Clone)]
pub struct MetricsProjector {
    store: Arc<dyn MetricsStore>,
}

/// Applies a signed percentage to an aggregate: `value + value * pct / 100`.
const fn apply_percent(value: i64, percent: i32) -> i64 {
    value.saturating_add(value.saturating_mul(percent as i64) / 100)
}

impl MetricsProjector {
    /// Creates a projector over a metrics store.
    #[must_use]
    pub fn new(store: Arc<dyn MetricsStore>) -> Self {
        Self { store }
    }

    /// Folds an impact vector into the owner's aggregates. `paid_cost` is
    /// the mitigation cost for a solved mission (`None` on failure, where
    /// only the stated impact lands).
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::SystemFailure`] if the store fails.
    pub async fn apply(
        &self,
        owner: OwnerId,
        impact: &ImpactVector,
        paid_cost: Option<Money>,
    ) -> Result<BusinessMetrics, SimulationError> {
        let impact = impact.clone();
        let updated = self
            .store
            .update_metrics(
                owner,
                Box::new(move |metrics| {
                    for entry in impact.financial() {
                        match &entry.dimension {
                            KpiDimension::Revenue => {
                                metrics.revenue = apply_percent(metrics.revenue, entry.percent);
                            }
                            KpiDimension::Expenses => {
                                metrics.expenses = apply_percent(metrics.expenses, entry.percent);
                            }
                            // Cash flow is derived (revenue - expenses) and
                            // recomputed after the fold; a stated delta on
                            // it has nothing of its own to move.
                            KpiDimension::CashFlow => {
                                tracing::debug!(
                                    percent = entry.percent,
                                    "cash_flow impact noted; aggregate stays derived"
                                );
                            }
                            KpiDimension::Informational(_) => {}
                        }
                    }
                    if let Some(cost) = paid_cost {
                        metrics.expenses =
                            metrics.expenses.saturating_add(cost.as_signed_cents());
                    }
                    for (name, percent) in impact.informational() {
                        *metrics.informational.entry(name.to_string()).or_insert(0) +=
                            i64::from(percent);
                    }
                }),
            )
            .await
            .map_err(map_store_error)?;

        tracing::info!(
            %owner,
            revenue = updated.revenue,
            expenses = updated.expenses,
            profit = updated.profit,
            "impact applied to business metrics"
        );
        Ok(updated)
    }

    /// Reads the owner's current aggregates.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::SystemFailure`] if the store fails.
    pub async fn metrics(&self, owner: OwnerId) -> Result<BusinessMetrics, SimulationError> {
        self.store.metrics(owner).await.map_err(map_store_error)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use dropsim_store::MemoryStore;

    async fn seeded_projector(owner: OwnerId, revenue: i64) -> MetricsProjector {
        let store = MemoryStore::shared();
        store
            .update_metrics(owner, Box::new(move |m| m.revenue = revenue))
            .await
            .unwrap();
        MetricsProjector::new(store as Arc<dyn MetricsStore>)
    }

    #[test]
    fn percent_math_is_signed() {
        assert_eq!(apply_percent(10_000, -20), 8_000);
        assert_eq!(apply_percent(10_000, 15), 11_500);
        assert_eq!(apply_percent(0, -50), 0);
    }

    #[tokio::test]
    async fn solve_folds_cost_into_expenses_and_recomputes() {
        let owner = OwnerId::new();
        let projector = seeded_projector(owner, 100_000).await;

        let impact = ImpactVector::new().with(KpiDimension::Revenue, -20);
        let metrics = projector
            .apply(owner, &impact, Some(Money::from_cents(5_000)))
            .await
            .unwrap();

        assert_eq!(metrics.revenue, 80_000);
        assert_eq!(metrics.expenses, 5_000);
        assert_eq!(metrics.profit, 75_000);
        assert_eq!(metrics.cash_flow, 75_000);
    }

    #[tokio::test]
    async fn informational_dimensions_never_touch_financials() {
        let owner = OwnerId::new();
        let projector = seeded_projector(owner, 100_000).await;

        let impact = ImpactVector::new()
            .with(KpiDimension::Informational("customer_satisfaction".into()), -10);
        let metrics = projector.apply(owner, &impact, None).await.unwrap();

        assert_eq!(metrics.revenue, 100_000);
        assert_eq!(metrics.expenses, 0);
        assert_eq!(metrics.profit, 100_000);
        assert_eq!(metrics.informational.get("customer_satisfaction"), Some(&-10));

        // Repeated impacts accumulate in the bucket.
        let metrics = projector.apply(owner, &impact, None).await.unwrap();
        assert_eq!(metrics.informational.get("customer_satisfaction"), Some(&-20));
        assert_eq!(metrics.profit, 100_000);
    }
}
