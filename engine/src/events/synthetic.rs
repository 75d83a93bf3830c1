//! Synthetic mission templates.
//!
//! Independent low-probability triggers over the caller's location list,
//! driven entirely by the injected [`RandomSource`] so tests can script
//! exactly which triggers fire. Also supplies the aggregator's fallback
//! template so the candidate pool is never empty.

use super::{EventSource, MissionTemplate, SourceError};
use async_trait::async_trait;
use chrono::Duration;
use dropsim_core::environment::RandomSource;
use dropsim_core::impact::{ImpactVector, KpiDimension};
use dropsim_core::types::{EventOrigin, ImpactKind, Money};
use std::sync::Arc;

/// Default probability of a labour-shortage trigger per location.
pub const LABOUR_PROBABILITY: f64 = 0.10;
/// Default probability of a movement-restriction trigger per location.
pub const RESTRICTION_PROBABILITY: f64 = 0.05;

/// The synthetic event source.
pub struct SyntheticEventSource {
    random: Arc<dyn RandomSource>,
    labour_probability: f64,
    restriction_probability: f64,
}

impl SyntheticEventSource {
    /// Creates a source with the default trigger probabilities.
    #[must_use]
    pub fn new(random: Arc<dyn RandomSource>) -> Self {
        Self::with_probabilities(random, LABOUR_PROBABILITY, RESTRICTION_PROBABILITY)
    }

    /// Creates a source with explicit trigger probabilities.
    #[must_use]
    pub fn with_probabilities(
        random: Arc<dyn RandomSource>,
        labour_probability: f64,
        restriction_probability: f64,
    ) -> Self {
        Self {
            random,
            labour_probability,
            restriction_probability,
        }
    }

    fn labour_template(location: &str) -> MissionTemplate {
        MissionTemplate {
            title: format!("Labour shortage in {location}"),
            description: format!(
                "Warehouse staffing in {location} dropped sharply; picking and packing \
                 are running behind."
            ),
            kind: ImpactKind::Labour,
            origin: EventOrigin::Synthetic,
            duration: Duration::days(3),
            cost_to_solve: Money::from_dollars(200),
            impact: ImpactVector::new()
                .with(KpiDimension::Expenses, 15)
                .with(KpiDimension::Informational("customer_satisfaction".into()), -5),
            location: Some(location.to_string()),
            source_url: None,
        }
    }

    fn restriction_template(location: &str) -> MissionTemplate {
        MissionTemplate {
            title: format!("Movement restrictions in {location}"),
            description: format!(
                "Local authorities in {location} restricted commercial movement; \
                 last-mile delivery is suspended."
            ),
            kind: ImpactKind::Curfew,
            origin: EventOrigin::Synthetic,
            duration: Duration::days(2),
            cost_to_solve: Money::from_dollars(180),
            impact: ImpactVector::new()
                .with(KpiDimension::Revenue, -20)
                .with(KpiDimension::Informational("customer_satisfaction".into()), -10),
            location: Some(location.to_string()),
            source_url: None,
        }
    }
}

/// The guaranteed fallback the aggregator issues when every source came
/// back empty, so trainees always have something to work on.
#[must_use]
pub fn fallback_template(locations: &[String]) -> MissionTemplate {
    let location = locations.first().cloned();
    let where_clause = location
        .clone()
        .unwrap_or_else(|| "your primary market".to_string());
    MissionTemplate {
        title: format!("Supplier quality audit for {where_clause}"),
        description: format!(
            "A routine week: use the lull to audit supplier quality serving \
             {where_clause} before the next disruption hits."
        ),
        kind: ImpactKind::Other,
        origin: EventOrigin::Synthetic,
        duration: Duration::days(2),
        cost_to_solve: Money::from_dollars(100),
        impact: ImpactVector::new().with(KpiDimension::Expenses, 5),
        location,
        source_url: None,
    }
}

#[async_trait]
impl EventSource for SyntheticEventSource {
    fn name(&self) -> &'static str {
        "synthetic"
    }

    async fn poll(&self, locations: &[String]) -> Result<Vec<MissionTemplate>, SourceError> {
        let mut templates = Vec::new();
        for location in locations {
            if self.random.roll() < self.labour_probability {
                templates.push(Self::labour_template(location));
            }
            if self.random.roll() < self.restriction_probability {
                templates.push(Self::restriction_template(location));
            }
        }
        Ok(templates)
    }
}
