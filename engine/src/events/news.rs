//! News-driven mission templates.
//!
//! Providers are interchangeable adapters tried in priority order: the
//! first one to respond successfully wins and the rest are skipped; a
//! failing or timed-out provider never blocks the pipeline. Articles are
//! scored for relevance (location signal + operational-impact signal),
//! classified into exactly one disruption kind by priority-ordered keyword
//! matching, and mapped onto fixed per-kind mission profiles.

use super::{EventSource, MissionTemplate, SourceError};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dropsim_core::impact::{ImpactVector, KpiDimension};
use dropsim_core::types::{EventOrigin, ImpactKind, Money};
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use thiserror::Error;

/// A news article as returned by a provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Article {
    /// Headline.
    pub title: String,
    /// Summary or lede.
    pub description: String,
    /// Canonical URL.
    pub url: String,
    /// Publication time, when the provider supplies one.
    pub published_at: Option<DateTime<Utc>>,
    /// Provider-reported outlet name.
    pub source: String,
}

/// Errors a news provider can fail with.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The request itself failed (connection, TLS, non-success status).
    #[error("provider request failed: {0}")]
    Request(String),
    /// The provider responded with a payload we could not parse.
    #[error("provider returned malformed payload: {0}")]
    Malformed(String),
}

/// One news upstream. Implementations are adapters over concrete services;
/// the failover order is configuration, not code.
#[async_trait]
pub trait NewsProvider: Send + Sync {
    /// Provider name for logs and telemetry.
    fn name(&self) -> &str;

    /// Fetches current articles relevant to the given locations.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] when the upstream fails; the source moves
    /// on to the next provider in priority order.
    async fn fetch(&self, locations: &[String]) -> Result<Vec<Article>, ProviderError>;
}

// ============================================================================
// HTTP provider adapter
// ============================================================================

#[derive(Debug, Deserialize)]
struct ArticlesPayload {
    articles: Vec<ArticlePayload>,
}

#[derive(Debug, Deserialize)]
struct ArticlePayload {
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    #[serde(rename = "publishedAt", alias = "published_at")]
    published_at: Option<DateTime<Utc>>,
    source: Option<SourcePayload>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SourcePayload {
    Named { name: Option<String> },
    Plain(String),
}

impl SourcePayload {
    fn into_name(self) -> Option<String> {
        match self {
            Self::Named { name } => name,
            Self::Plain(name) => Some(name),
        }
    }
}

/// Adapter over an HTTP news API returning a JSON article list.
pub struct HttpNewsProvider {
    name: String,
    endpoint: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl HttpNewsProvider {
    /// Creates an adapter for one endpoint. `request_timeout` bounds the
    /// whole HTTP exchange; the news source applies its own per-provider
    /// timeout on top.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        api_key: Option<String>,
        request_timeout: StdDuration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .unwrap_or_default();
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            api_key,
            client,
        }
    }
}

#[async_trait]
impl NewsProvider for HttpNewsProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, locations: &[String]) -> Result<Vec<Article>, ProviderError> {
        let query = locations.join(" OR ");
        let mut request = self.client.get(&self.endpoint).query(&[("q", &query)]);
        if let Some(key) = &self.api_key {
            request = request.header("X-Api-Key", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?
            .error_for_status()
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        let payload: ArticlesPayload = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        Ok(payload
            .articles
            .into_iter()
            .filter_map(|article| {
                let title = article.title?;
                Some(Article {
                    title,
                    description: article.description.unwrap_or_default(),
                    url: article.url.unwrap_or_default(),
                    published_at: article.published_at,
                    source: article
                        .source
                        .and_then(SourcePayload::into_name)
                        .unwrap_or_else(|| self.name.clone()),
                })
            })
            .collect())
    }
}

// ============================================================================
// Scoring & classification
// ============================================================================

/// How strongly an article signals an operational disruption.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Relevance {
    /// Tracked location *and* operational-impact keyword present.
    High,
    /// Exactly one of the two signals present.
    Medium,
    /// Neither signal present; dropped.
    Low,
}

/// Keywords that mark an article as operationally relevant.
const OPERATIONAL_KEYWORDS: &[&str] = &[
    "supply",
    "shipping",
    "strike",
    "curfew",
    "festival",
    "disaster",
    "lockdown",
    "holiday",
    "labour",
    "labor",
    "delivery",
    "manufacturing",
    "emergency",
    "port",
    "warehouse",
];

/// Priority-ordered classification rules; the first kind with a matching
/// keyword wins.
const CLASSIFICATION_RULES: &[(ImpactKind, &[&str])] = &[
    (ImpactKind::Curfew, &["curfew", "lockdown"]),
    (ImpactKind::Festival, &["festival", "holiday"]),
    (ImpactKind::Labour, &["labour", "labor", "strike", "walkout"]),
    (
        ImpactKind::Shipping,
        &["shipping", "delivery", "courier", "port"],
    ),
    (
        ImpactKind::Supply,
        &["supply", "manufacturing", "factory", "warehouse"],
    ),
    (
        ImpactKind::Disaster,
        &["disaster", "emergency", "flood", "earthquake", "cyclone"],
    ),
];

/// Scores an article's lowercased text against the tracked locations.
#[must_use]
pub fn score(text: &str, locations: &[String]) -> Relevance {
    let has_location = locations
        .iter()
        .any(|location| text.contains(&location.to_lowercase()));
    let has_keyword = OPERATIONAL_KEYWORDS
        .iter()
        .any(|keyword| text.contains(keyword));

    match (has_location, has_keyword) {
        (true, true) => Relevance::High,
        (false, false) => Relevance::Low,
        _ => Relevance::Medium,
    }
}

/// Classifies lowercased article text into exactly one disruption kind.
#[must_use]
pub fn classify(text: &str) -> ImpactKind {
    for (kind, keywords) in CLASSIFICATION_RULES {
        if keywords.iter().any(|keyword| text.contains(keyword)) {
            return *kind;
        }
    }
    ImpactKind::Other
}

/// Fixed mission profile for a disruption kind:
/// (duration, mitigation cost, impact vector).
#[must_use]
pub fn profile(kind: ImpactKind) -> (Duration, Money, ImpactVector) {
    match kind {
        ImpactKind::Curfew => (
            Duration::days(2),
            Money::from_dollars(180),
            ImpactVector::new()
                .with(KpiDimension::Revenue, -25)
                .with(KpiDimension::Informational("customer_satisfaction".into()), -10),
        ),
        ImpactKind::Festival => (
            Duration::days(5),
            Money::from_dollars(120),
            ImpactVector::new()
                .with(KpiDimension::Expenses, 10)
                .with(KpiDimension::Informational("customer_satisfaction".into()), -5),
        ),
        ImpactKind::Labour => (
            Duration::days(3),
            Money::from_dollars(200),
            ImpactVector::new()
                .with(KpiDimension::Expenses, 15)
                .with(KpiDimension::Informational("customer_satisfaction".into()), -10),
        ),
        ImpactKind::Shipping => (
            Duration::days(3),
            Money::from_dollars(150),
            ImpactVector::new()
                .with(KpiDimension::Revenue, -15)
                .with(KpiDimension::Informational("customer_satisfaction".into()), -15),
        ),
        ImpactKind::Supply => (
            Duration::days(4),
            Money::from_dollars(220),
            ImpactVector::new()
                .with(KpiDimension::Revenue, -10)
                .with(KpiDimension::Expenses, 20),
        ),
        ImpactKind::Disaster => (
            Duration::days(7),
            Money::from_dollars(400),
            ImpactVector::new()
                .with(KpiDimension::Revenue, -30)
                .with(KpiDimension::Expenses, 25)
                .with(KpiDimension::Informational("customer_satisfaction".into()), -20),
        ),
        ImpactKind::Other => (
            Duration::days(2),
            Money::from_dollars(100),
            ImpactVector::new().with(KpiDimension::Expenses, 5),
        ),
    }
}

// ============================================================================
// The news event source
// ============================================================================

/// The news-driven event source: provider failover, scoring,
/// classification.
pub struct NewsEventSource {
    providers: Vec<Arc<dyn NewsProvider>>,
    per_provider_timeout: StdDuration,
}

impl NewsEventSource {
    /// Creates a source over failover-ordered providers, each bounded by
    /// `per_provider_timeout`.
    #[must_use]
    pub fn new(providers: Vec<Arc<dyn NewsProvider>>, per_provider_timeout: StdDuration) -> Self {
        Self {
            providers,
            per_provider_timeout,
        }
    }

    /// Tries providers in priority order; the first successful response
    /// wins, the rest are skipped.
    async fn first_successful_fetch(
        &self,
        locations: &[String],
    ) -> Result<Vec<Article>, SourceError> {
        for provider in &self.providers {
            match tokio::time::timeout(self.per_provider_timeout, provider.fetch(locations)).await
            {
                Ok(Ok(articles)) => {
                    tracing::debug!(
                        provider = provider.name(),
                        count = articles.len(),
                        "provider responded"
                    );
                    return Ok(articles);
                }
                Ok(Err(error)) => {
                    tracing::warn!(provider = provider.name(), %error, "provider failed; trying next");
                }
                Err(_elapsed) => {
                    tracing::warn!(provider = provider.name(), "provider timed out; trying next");
                }
            }
        }
        Err(SourceError::Failed(
            "no news provider responded".to_string(),
        ))
    }
}

#[async_trait]
impl EventSource for NewsEventSource {
    fn name(&self) -> &'static str {
        "news"
    }

    async fn poll(&self, locations: &[String]) -> Result<Vec<MissionTemplate>, SourceError> {
        let articles = self.first_successful_fetch(locations).await?;

        let mut seen_titles = HashSet::new();
        let mut templates = Vec::new();
        for article in articles {
            let text = format!("{} {}", article.title, article.description).to_lowercase();

            let relevance = score(&text, locations);
            if relevance == Relevance::Low {
                tracing::debug!(title = %article.title, "article scored low; dropped");
                continue;
            }

            let normalized_title = article
                .title
                .to_lowercase()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ");
            if !seen_titles.insert(normalized_title) {
                continue;
            }

            let kind = classify(&text);
            let (duration, cost_to_solve, impact) = profile(kind);
            let location = locations
                .iter()
                .find(|candidate| text.contains(&candidate.to_lowercase()))
                .cloned();

            tracing::debug!(title = %article.title, ?relevance, %kind, "article qualified");
            templates.push(MissionTemplate {
                title: article.title,
                description: article.description,
                kind,
                origin: EventOrigin::News,
                duration,
                cost_to_solve,
                impact,
                location,
                source_url: (!article.url.is_empty()).then_some(article.url),
            });
        }
        Ok(templates)
    }
}
