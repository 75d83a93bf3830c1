//! Configuration management for the simulator.
//!
//! Loads configuration from environment variables with sensible defaults,
//! so the demo binary runs with no setup and a deployment can point the
//! news source at real providers.

use serde::{Deserialize, Serialize};
use std::env;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// News provider failover chain.
    pub news: NewsConfig,
    /// Event aggregator settings.
    pub aggregator: AggregatorConfig,
    /// Synthetic trigger probabilities.
    pub synthetic: SyntheticConfig,
    /// Simulation-wide settings.
    pub simulation: SimulationConfig,
}

/// One configured news provider endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsProviderConfig {
    /// Provider name used in logs and telemetry.
    pub name: String,
    /// Endpoint returning a JSON article list.
    pub endpoint: String,
    /// Optional API key sent as `X-Api-Key`.
    pub api_key: Option<String>,
}

/// News source configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsConfig {
    /// Providers in failover priority order; the first to respond wins.
    pub providers: Vec<NewsProviderConfig>,
    /// Per-provider timeout in milliseconds.
    pub provider_timeout_ms: u64,
}

/// Event aggregator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatorConfig {
    /// Per-source timeout in milliseconds; a `collect` terminates within
    /// the sum across sources.
    pub source_timeout_ms: u64,
    /// Locations tracked for scoring and synthetic triggers.
    pub tracked_locations: Vec<String>,
}

/// Synthetic event source configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntheticConfig {
    /// Probability of a labour-shortage trigger per location.
    pub labour_probability: f64,
    /// Probability of a movement-restriction trigger per location.
    pub restriction_probability: f64,
}

/// Simulation-wide configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Opening wallet balance for new trainees, in cents.
    pub starting_balance_cents: u64,
    /// How many recent transactions a budget status report includes.
    pub recent_transactions: usize,
    /// Log filter directive (tracing `EnvFilter` syntax).
    pub log_level: String,
}

impl Config {
    /// Loads configuration from environment variables, falling back to
    /// defaults that work offline (no news providers configured; the
    /// aggregator degrades to the festival and synthetic sources).
    #[must_use]
    pub fn from_env() -> Self {
        let providers = env::var("NEWS_PROVIDER_URLS")
            .map(|urls| {
                urls.split(',')
                    .filter(|url| !url.trim().is_empty())
                    .enumerate()
                    .map(|(index, url)| NewsProviderConfig {
                        name: format!("provider-{}", index + 1),
                        endpoint: url.trim().to_string(),
                        api_key: env::var("NEWS_PROVIDER_API_KEY").ok(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            news: NewsConfig {
                providers,
                provider_timeout_ms: env::var("NEWS_PROVIDER_TIMEOUT_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(3_000),
            },
            aggregator: AggregatorConfig {
                source_timeout_ms: env::var("AGGREGATOR_SOURCE_TIMEOUT_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10_000),
                tracked_locations: env::var("TRACKED_LOCATIONS")
                    .map(|list| {
                        list.split(',')
                            .map(|location| location.trim().to_string())
                            .filter(|location| !location.is_empty())
                            .collect()
                    })
                    .unwrap_or_else(|_| {
                        vec![
                            "Mumbai".to_string(),
                            "Delhi".to_string(),
                            "Shenzhen".to_string(),
                        ]
                    }),
            },
            synthetic: SyntheticConfig {
                labour_probability: env::var("SYNTHETIC_LABOUR_PROBABILITY")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(crate::events::synthetic::LABOUR_PROBABILITY),
                restriction_probability: env::var("SYNTHETIC_RESTRICTION_PROBABILITY")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(crate::events::synthetic::RESTRICTION_PROBABILITY),
            },
            simulation: SimulationConfig {
                starting_balance_cents: env::var("STARTING_BALANCE_CENTS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(100_000), // $1,000.00
                recent_transactions: env::var("RECENT_TRANSACTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
                log_level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            },
        }
    }
}
