//! End-to-end scenarios over the service facade and the in-memory store:
//! funding, allocation, mission resolution, the deadline sweep, and the
//! idempotency/atomicity guarantees around them.

#![allow(clippy::unwrap_used)]

use chrono::Duration;
use dropsim_core::environment::Clock;
use dropsim_core::impact::{ImpactVector, KpiDimension};
use dropsim_core::types::{EventOrigin, ImpactKind, MissionId, Money, OwnerId};
use dropsim_core::SimulationError;
use dropsim_engine::events::EventAggregator;
use dropsim_engine::missions::ResolveAction;
use dropsim_engine::service::{Simulation, Stores};
use dropsim_store::{
    AllocationLine, LedgerStore, MemoryStore, MetricsStore, Mission, MissionStatus, MissionStore,
    TransactionKind,
};
use dropsim_testing::helpers::{seed_product, seed_wallet};
use dropsim_testing::SteppingClock;
use std::sync::Arc;
use std::time::Duration as StdDuration;

struct Fixture {
    store: Arc<MemoryStore>,
    clock: Arc<SteppingClock>,
    simulation: Simulation,
    owner: OwnerId,
}

async fn fixture(opening_dollars: u64) -> Fixture {
    let store = MemoryStore::shared();
    let clock = Arc::new(SteppingClock::starting_at(
        dropsim_testing::FixedClock::midday().now(),
    ));
    let owner = OwnerId::new();
    if opening_dollars > 0 {
        seed_wallet(
            &store,
            owner,
            Money::from_dollars(opening_dollars),
            clock.now(),
        )
        .await
        .unwrap();
    }

    // No event sources; these scenarios drive the mission table directly.
    let aggregator = EventAggregator::new(Vec::new(), StdDuration::from_millis(100));
    let simulation = Simulation::new(
        Stores::from_memory(&store),
        aggregator,
        Arc::clone(&clock) as Arc<dyn Clock>,
        10,
    );
    Fixture {
        store,
        clock,
        simulation,
        owner,
    }
}

fn active_mission(owner: OwnerId, cost_dollars: u64, deadline: chrono::DateTime<chrono::Utc>) -> Mission {
    let id = MissionId::new();
    Mission {
        id,
        owner,
        title: format!("Port strike {id}"),
        description: "Dock workers walked out".to_string(),
        kind: ImpactKind::Labour,
        origin: EventOrigin::News,
        status: MissionStatus::Active,
        deadline,
        cost_to_solve: Money::from_dollars(cost_dollars),
        impact: ImpactVector::new()
            .with(KpiDimension::Revenue, -20)
            .with(KpiDimension::Informational("customer_satisfaction".into()), -10),
        dedup_key: id.to_string(),
        created_at: deadline - Duration::days(3),
    }
}

#[tokio::test]
async fn scenario_a_add_funds_appends_one_deposit() {
    let fx = fixture(100).await;

    let new_balance = fx
        .simulation
        .add_funds(fx.owner, Money::from_dollars(50))
        .await
        .unwrap();
    assert_eq!(new_balance, Money::from_dollars(150));

    let status = fx.simulation.budget_status(fx.owner).await.unwrap();
    assert_eq!(status.available, Money::from_dollars(150));
    let deposits: Vec<_> = status
        .recent_transactions
        .iter()
        .filter(|txn| txn.kind == TransactionKind::Deposit)
        .collect();
    assert_eq!(deposits.len(), 2); // seed + add_funds
    assert_eq!(deposits[0].amount, Money::from_dollars(50));
}

#[tokio::test]
async fn scenario_b_allocation_splits_the_budget() {
    let fx = fixture(150).await;
    let p1 = seed_product(&fx.store, fx.owner, "Widget", Money::from_cents(250))
        .await
        .unwrap();
    let p2 = seed_product(&fx.store, fx.owner, "Gadget", Money::from_cents(900))
        .await
        .unwrap();

    let outcome = fx
        .simulation
        .allocate_budget(
            fx.owner,
            vec![
                AllocationLine {
                    product: p1,
                    amount: Money::from_dollars(60),
                },
                AllocationLine {
                    product: p2,
                    amount: Money::from_dollars(40),
                },
            ],
        )
        .await
        .unwrap();
    assert_eq!(outcome.remaining_budget, Money::from_dollars(50));

    let status = fx.simulation.budget_status(fx.owner).await.unwrap();
    assert_eq!(status.available, Money::from_dollars(50));
    assert_eq!(status.allocated, Money::from_dollars(100));

    let allocations = fx.store.allocations(fx.owner).await.unwrap();
    let amount_for = |product| {
        allocations
            .iter()
            .find(|a| a.product == product)
            .map(|a| a.allocated_budget)
    };
    assert_eq!(amount_for(p1), Some(Money::from_dollars(60)));
    assert_eq!(amount_for(p2), Some(Money::from_dollars(40)));
}

#[tokio::test]
async fn scenario_c_insufficient_funds_leaves_the_mission_active() {
    let fx = fixture(50).await;
    let mission = active_mission(fx.owner, 500, fx.clock.now() + Duration::days(3));
    let id = mission.id;
    fx.store.insert_mission(mission).await.unwrap();

    let err = fx
        .simulation
        .resolve_mission(fx.owner, id, ResolveAction::Solve)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        SimulationError::InsufficientFunds {
            requested: Money::from_dollars(500),
            available: Money::from_dollars(50),
        }
    );

    let stored = fx.store.mission(fx.owner, id).await.unwrap().unwrap();
    assert_eq!(stored.status, MissionStatus::Active);
    let wallet = LedgerStore::wallet(fx.store.as_ref(), fx.owner)
        .await
        .unwrap();
    assert_eq!(wallet.balance, Money::from_dollars(50));
    // No impact was applied either.
    let metrics = fx.store.metrics(fx.owner).await.unwrap();
    assert_eq!(metrics.expenses, 0);
}

#[tokio::test]
async fn scenario_d_solve_debits_once_and_completes() {
    let fx = fixture(100).await;
    let mission = active_mission(fx.owner, 50, fx.clock.now() + Duration::days(3));
    let id = mission.id;
    fx.store.insert_mission(mission).await.unwrap();

    let resolution = fx
        .simulation
        .resolve_mission(fx.owner, id, ResolveAction::Solve)
        .await
        .unwrap();
    assert_eq!(resolution.new_balance, Money::from_dollars(50));
    assert_eq!(resolution.mission.status, MissionStatus::Completed);

    let spends: Vec<_> = fx
        .store
        .transactions(fx.owner, None)
        .await
        .unwrap()
        .into_iter()
        .filter(|txn| txn.kind == TransactionKind::Spend)
        .collect();
    assert_eq!(spends.len(), 1);
    assert_eq!(spends[0].amount, Money::from_dollars(50));
    assert_eq!(spends[0].metadata.mission, Some(id));
}

#[tokio::test]
async fn repeated_solve_debits_exactly_once() {
    let fx = fixture(200).await;
    let mission = active_mission(fx.owner, 50, fx.clock.now() + Duration::days(3));
    let id = mission.id;
    fx.store.insert_mission(mission).await.unwrap();

    fx.simulation
        .resolve_mission(fx.owner, id, ResolveAction::Solve)
        .await
        .unwrap();
    let err = fx
        .simulation
        .resolve_mission(fx.owner, id, ResolveAction::Solve)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        SimulationError::Conflict {
            status: "completed".to_string()
        }
    );

    let wallet = LedgerStore::wallet(fx.store.as_ref(), fx.owner)
        .await
        .unwrap();
    assert_eq!(wallet.balance, Money::from_dollars(150));
}

#[tokio::test]
async fn concurrent_solves_debit_exactly_once() {
    let fx = fixture(200).await;
    let mission = active_mission(fx.owner, 50, fx.clock.now() + Duration::days(3));
    let id = mission.id;
    fx.store.insert_mission(mission).await.unwrap();

    let (a, b) = tokio::join!(
        fx.simulation
            .resolve_mission(fx.owner, id, ResolveAction::Solve),
        fx.simulation
            .resolve_mission(fx.owner, id, ResolveAction::Solve),
    );
    let results = [a, b];
    let successes = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(SimulationError::Conflict { .. })))
        .count();
    assert_eq!(successes, 1);
    assert_eq!(conflicts, 1);

    let spends = fx
        .store
        .transactions(fx.owner, None)
        .await
        .unwrap()
        .into_iter()
        .filter(|txn| txn.kind == TransactionKind::Spend)
        .count();
    assert_eq!(spends, 1);
}

#[tokio::test]
async fn failing_a_mission_skips_the_debit_but_applies_the_impact() {
    let fx = fixture(100).await;
    fx.store
        .update_metrics(fx.owner, Box::new(|m| m.revenue = 100_000))
        .await
        .unwrap();
    let mission = active_mission(fx.owner, 50, fx.clock.now() + Duration::days(3));
    let id = mission.id;
    fx.store.insert_mission(mission).await.unwrap();

    let resolution = fx
        .simulation
        .resolve_mission(fx.owner, id, ResolveAction::Fail)
        .await
        .unwrap();
    assert_eq!(resolution.mission.status, MissionStatus::Failed);
    assert_eq!(resolution.new_balance, Money::from_dollars(100));

    let metrics = fx.store.metrics(fx.owner).await.unwrap();
    assert_eq!(metrics.revenue, 80_000); // -20%
    assert_eq!(metrics.expenses, 0); // no cost paid
    assert_eq!(metrics.informational.get("customer_satisfaction"), Some(&-10));
}

#[tokio::test]
async fn scenario_e_sweep_is_idempotent() {
    let fx = fixture(100).await;
    fx.store
        .update_metrics(fx.owner, Box::new(|m| m.revenue = 100_000))
        .await
        .unwrap();
    let mission = active_mission(fx.owner, 50, fx.clock.now() - Duration::hours(1));
    let id = mission.id;
    fx.store.insert_mission(mission).await.unwrap();

    let swept = fx.simulation.sweep_deadlines().await.unwrap();
    assert_eq!(swept.len(), 1);
    assert_eq!(swept[0].id, id);
    assert_eq!(swept[0].status, MissionStatus::Failed);

    // A second sweep observes the terminal status and no-ops.
    let swept = fx.simulation.sweep_deadlines().await.unwrap();
    assert!(swept.is_empty());

    let metrics = fx.store.metrics(fx.owner).await.unwrap();
    assert_eq!(metrics.revenue, 80_000); // impact applied exactly once
    let wallet = LedgerStore::wallet(fx.store.as_ref(), fx.owner)
        .await
        .unwrap();
    assert_eq!(wallet.balance, Money::from_dollars(100)); // sweep never debits
}

#[tokio::test]
async fn concurrent_sweeps_transition_exactly_once() {
    let fx = fixture(100).await;
    fx.store
        .update_metrics(fx.owner, Box::new(|m| m.revenue = 100_000))
        .await
        .unwrap();
    let mission = active_mission(fx.owner, 50, fx.clock.now() - Duration::hours(1));
    fx.store.insert_mission(mission).await.unwrap();

    let (a, b) = tokio::join!(
        fx.simulation.sweep_deadlines(),
        fx.simulation.sweep_deadlines(),
    );
    let total = a.unwrap().len() + b.unwrap().len();
    assert_eq!(total, 1);

    let metrics = fx.store.metrics(fx.owner).await.unwrap();
    assert_eq!(metrics.revenue, 80_000);
}

#[tokio::test]
async fn deadline_passing_after_creation_is_swept() {
    let fx = fixture(100).await;
    let mission = active_mission(fx.owner, 50, fx.clock.now() + Duration::days(2));
    let id = mission.id;
    fx.store.insert_mission(mission).await.unwrap();

    // Nothing to sweep while the deadline is ahead.
    assert!(fx.simulation.sweep_deadlines().await.unwrap().is_empty());

    fx.clock.advance(Duration::days(3));
    let swept = fx.simulation.sweep_deadlines().await.unwrap();
    assert_eq!(swept.len(), 1);
    assert_eq!(swept[0].id, id);
}

#[tokio::test]
async fn overdraining_restock_leaves_everything_untouched() {
    let fx = fixture(10).await;
    let product = seed_product(&fx.store, fx.owner, "Widget", Money::from_dollars(2))
        .await
        .unwrap();

    let sku = dropsim_testing::helpers::sku("SKU-1");
    let err = fx
        .simulation
        .restock_inventory(fx.owner, product, sku, 100)
        .await
        .unwrap_err();
    assert!(matches!(err, SimulationError::InsufficientFunds { .. }));

    assert!(fx
        .simulation
        .list_inventory(fx.owner, None)
        .await
        .unwrap()
        .is_empty());
    let wallet = LedgerStore::wallet(fx.store.as_ref(), fx.owner)
        .await
        .unwrap();
    assert_eq!(wallet.balance, Money::from_dollars(10));
}
