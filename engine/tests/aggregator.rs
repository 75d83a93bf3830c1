//! Aggregator behavior under provider failure: failover order, bounded
//! timeouts, silent degradation, and duplicate suppression at creation
//! time.

#![allow(clippy::unwrap_used)]

use async_trait::async_trait;
use chrono::Duration;
use dropsim_core::environment::Clock;
use dropsim_core::types::{EventOrigin, ImpactKind, Money, OwnerId};
use dropsim_engine::events::news::{
    Article, NewsEventSource, NewsProvider, ProviderError,
};
use dropsim_engine::events::synthetic::SyntheticEventSource;
use dropsim_engine::events::{EventAggregator, EventSource, MissionTemplate, SourceError};
use dropsim_engine::service::{Simulation, Stores};
use dropsim_store::MemoryStore;
use dropsim_testing::helpers::seed_wallet;
use dropsim_testing::{FixedClock, ScriptedRandom};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

fn locations() -> Vec<String> {
    vec!["Mumbai".to_string()]
}

fn strike_article(title: &str) -> Article {
    Article {
        title: title.to_string(),
        description: "walkout stalls the port".to_string(),
        url: "https://example.com/strike".to_string(),
        published_at: None,
        source: "test".to_string(),
    }
}

struct StaticProvider {
    name: &'static str,
    articles: Vec<Article>,
    calls: AtomicUsize,
}

impl StaticProvider {
    fn new(name: &'static str, articles: Vec<Article>) -> Arc<Self> {
        Arc::new(Self {
            name,
            articles,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl NewsProvider for StaticProvider {
    fn name(&self) -> &str {
        self.name
    }

    async fn fetch(&self, _locations: &[String]) -> Result<Vec<Article>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.articles.clone())
    }
}

struct FailingProvider;

#[async_trait]
impl NewsProvider for FailingProvider {
    fn name(&self) -> &str {
        "failing"
    }

    async fn fetch(&self, _locations: &[String]) -> Result<Vec<Article>, ProviderError> {
        Err(ProviderError::Request("503 service unavailable".to_string()))
    }
}

struct HangingProvider;

#[async_trait]
impl NewsProvider for HangingProvider {
    fn name(&self) -> &str {
        "hanging"
    }

    async fn fetch(&self, _locations: &[String]) -> Result<Vec<Article>, ProviderError> {
        std::future::pending().await
    }
}

#[tokio::test]
async fn failing_provider_fails_over_to_the_next() {
    let backup = StaticProvider::new(
        "backup",
        vec![strike_article("Mumbai port strike enters second day")],
    );
    let source = NewsEventSource::new(
        vec![Arc::new(FailingProvider), Arc::clone(&backup) as _],
        StdDuration::from_millis(200),
    );

    let templates = source.poll(&locations()).await.unwrap();
    assert_eq!(templates.len(), 1);
    assert_eq!(templates[0].kind, ImpactKind::Labour);
    assert_eq!(backup.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn hanging_provider_is_bounded_by_its_timeout() {
    let backup = StaticProvider::new(
        "backup",
        vec![strike_article("Mumbai port strike enters second day")],
    );
    let source = NewsEventSource::new(
        vec![Arc::new(HangingProvider), Arc::clone(&backup) as _],
        StdDuration::from_millis(250),
    );

    let templates = source.poll(&locations()).await.unwrap();
    assert_eq!(templates.len(), 1);
}

#[tokio::test]
async fn first_successful_provider_wins_and_the_rest_are_skipped() {
    let primary = StaticProvider::new(
        "primary",
        vec![Article {
            title: "Mumbai courier delivery suspended".to_string(),
            description: "couriers pause operations across the city".to_string(),
            url: "https://example.com/courier".to_string(),
            published_at: None,
            source: "primary".to_string(),
        }],
    );
    let secondary = StaticProvider::new(
        "secondary",
        vec![strike_article("Mumbai factory supply crunch")],
    );
    let source = NewsEventSource::new(
        vec![Arc::clone(&primary) as _, Arc::clone(&secondary) as _],
        StdDuration::from_millis(200),
    );

    let templates = source.poll(&locations()).await.unwrap();
    assert_eq!(templates.len(), 1);
    assert_eq!(templates[0].kind, ImpactKind::Shipping);
    assert_eq!(primary.calls.load(Ordering::SeqCst), 1);
    assert_eq!(secondary.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn all_providers_down_degrades_to_an_empty_news_contribution() {
    let source = NewsEventSource::new(
        vec![Arc::new(FailingProvider) as _],
        StdDuration::from_millis(200),
    );
    let err = source.poll(&locations()).await.unwrap_err();
    assert!(matches!(err, SourceError::Failed(_)));
}

struct HangingSource;

#[async_trait]
impl EventSource for HangingSource {
    fn name(&self) -> &'static str {
        "hanging"
    }

    async fn poll(&self, _locations: &[String]) -> Result<Vec<MissionTemplate>, SourceError> {
        std::future::pending().await
    }
}

#[tokio::test(start_paused = true)]
async fn aggregator_survives_hanging_sources_and_never_returns_empty() {
    // One hanging source, one synthetic source scripted to stay quiet.
    let synthetic = SyntheticEventSource::new(Arc::new(ScriptedRandom::never_triggers()));
    let aggregator = EventAggregator::new(
        vec![Arc::new(HangingSource), Arc::new(synthetic)],
        StdDuration::from_millis(300),
    );

    let pool = aggregator.collect(&locations()).await;
    // The fallback keeps the pool non-empty even with every source quiet.
    assert_eq!(pool.len(), 1);
    assert_eq!(pool[0].kind, ImpactKind::Other);
    assert_eq!(pool[0].origin, EventOrigin::Synthetic);
}

#[tokio::test]
async fn regeneration_suppresses_active_duplicates_only() {
    let store = MemoryStore::shared();
    let owner = OwnerId::new();
    let clock: Arc<dyn Clock> = Arc::new(FixedClock::midday());
    seed_wallet(&store, owner, Money::from_dollars(1_000), clock.now())
        .await
        .unwrap();

    let provider = StaticProvider::new(
        "static",
        vec![strike_article("Mumbai port strike enters second day")],
    );
    let news = NewsEventSource::new(
        vec![Arc::clone(&provider) as _],
        StdDuration::from_millis(200),
    );
    let aggregator =
        EventAggregator::new(vec![Arc::new(news)], StdDuration::from_millis(500));
    let simulation = Simulation::new(Stores::from_memory(&store), aggregator, clock, 10);

    let first = simulation
        .create_missions_from_events(owner, &locations())
        .await
        .unwrap();
    assert_eq!(first.len(), 1);

    // The same article comes around again while the mission is active.
    let second = simulation
        .create_missions_from_events(owner, &locations())
        .await
        .unwrap();
    assert!(second.is_empty());

    // Once the mission is terminal, the same headline may recur.
    simulation
        .resolve_mission(
            owner,
            first[0].id,
            dropsim_engine::missions::ResolveAction::Solve,
        )
        .await
        .unwrap();
    let third = simulation
        .create_missions_from_events(owner, &locations())
        .await
        .unwrap();
    assert_eq!(third.len(), 1);
}

#[tokio::test]
async fn news_templates_expire_against_the_profile_duration() {
    let provider = StaticProvider::new(
        "static",
        vec![strike_article("Mumbai port strike enters second day")],
    );
    let source = NewsEventSource::new(
        vec![Arc::clone(&provider) as _],
        StdDuration::from_millis(200),
    );

    let templates = source.poll(&locations()).await.unwrap();
    assert_eq!(templates[0].duration, Duration::days(3));
    assert!(!templates[0].cost_to_solve.is_zero());
    assert_eq!(templates[0].location.as_deref(), Some("Mumbai"));
}
