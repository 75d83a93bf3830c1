//! The Event Aggregator: mission template candidates from heterogeneous
//! signals.
//!
//! Three independent sources feed the pool:
//!
//! - [`news::NewsEventSource`]: scored and classified news articles from
//!   failover-ordered providers
//! - [`festivals::FestivalEventSource`]: a static annual calendar with a
//!   short lookahead window
//! - [`synthetic::SyntheticEventSource`]: low-probability random triggers
//!
//! Sources are merged without cross-source dedup; duplicate suppression
//! happens at mission creation time against the owner's active missions.
//! A failing source contributes nothing and never raises; each source call
//! is bounded by a timeout, so a `collect` always terminates within the
//! sum of per-source timeouts.

pub mod festivals;
pub mod news;
pub mod synthetic;

use crate::telemetry;
use async_trait::async_trait;
use chrono::Duration;
use dropsim_core::impact::ImpactVector;
use dropsim_core::types::{EventOrigin, ImpactKind, Money};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration as StdDuration;
use thiserror::Error;

/// An ephemeral mission definition. Never persisted; missions snapshot
/// everything they need from the template at creation time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MissionTemplate {
    /// Headline shown to the trainee.
    pub title: String,
    /// Longer description of the disruption.
    pub description: String,
    /// Classified disruption kind.
    pub kind: ImpactKind,
    /// Which source produced the template.
    pub origin: EventOrigin,
    /// How long the trainee gets before the mission fails.
    pub duration: Duration,
    /// Mitigation cost.
    pub cost_to_solve: Money,
    /// KPI effects applied on resolution.
    pub impact: ImpactVector,
    /// Affected location, when the source knows one.
    pub location: Option<String>,
    /// Backing article URL, for news-sourced templates.
    pub source_url: Option<String>,
}

impl MissionTemplate {
    /// Content hash of the normalized title and kind. Computed at mission
    /// creation and compared against the owner's active missions, so
    /// whitespace or casing drift in regenerated templates cannot defeat
    /// duplicate suppression.
    #[must_use]
    pub fn dedup_key(&self) -> String {
        let normalized = self
            .title
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        let mut hasher = Sha256::new();
        hasher.update(normalized.as_bytes());
        hasher.update(b"|");
        hasher.update(self.kind.label().as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// Why a source produced nothing this round.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// Every upstream the source depends on failed.
    #[error("source failed: {0}")]
    Failed(String),
}

/// One feed of mission template candidates.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Stable source name for logs and telemetry.
    fn name(&self) -> &'static str;

    /// Produces this round's candidates for the given locations.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when the source cannot produce anything;
    /// the aggregator degrades silently to the remaining sources.
    async fn poll(&self, locations: &[String]) -> Result<Vec<MissionTemplate>, SourceError>;
}

/// Merges template candidates from every configured source.
pub struct EventAggregator {
    sources: Vec<Arc<dyn EventSource>>,
    source_timeout: StdDuration,
}

impl EventAggregator {
    /// Creates an aggregator over the given sources, each bounded by
    /// `source_timeout` per `collect`.
    #[must_use]
    pub fn new(sources: Vec<Arc<dyn EventSource>>, source_timeout: StdDuration) -> Self {
        Self {
            sources,
            source_timeout,
        }
    }

    /// Collects the current candidate pool. Never raises: a failing or
    /// timed-out source yields zero templates. When every source comes
    /// back empty, a synthetic fallback keeps the pool non-empty so
    /// trainees always have something to work on.
    pub async fn collect(&self, locations: &[String]) -> Vec<MissionTemplate> {
        let mut pool = Vec::new();
        for source in &self.sources {
            match tokio::time::timeout(self.source_timeout, source.poll(locations)).await {
                Ok(Ok(templates)) => {
                    tracing::debug!(
                        source = source.name(),
                        count = templates.len(),
                        "source contributed templates"
                    );
                    pool.extend(templates);
                }
                Ok(Err(error)) => {
                    tracing::warn!(source = source.name(), %error, "source failed; degrading");
                    telemetry::record_source_failure(source.name());
                }
                Err(_elapsed) => {
                    tracing::warn!(
                        source = source.name(),
                        timeout_ms = self.source_timeout.as_millis() as u64,
                        "source timed out; degrading"
                    );
                    telemetry::record_source_failure(source.name());
                }
            }
        }

        if pool.is_empty() {
            pool.push(synthetic::fallback_template(locations));
        }
        pool
    }
}
