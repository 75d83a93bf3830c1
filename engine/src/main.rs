//! CLI demo: one trainee's week in the simulator.
//!
//! Runs entirely offline against the in-memory store: the news source has
//! no providers configured and degrades silently, while the festival and
//! synthetic sources (plus the fallback) keep the mission pool alive.

use dropsim_core::environment::{Clock, RandomSource, SystemClock, ThreadRandom};
use dropsim_core::types::{Money, OwnerId, ProductId, Sku};
use dropsim_engine::auth::{Authenticator, StaticAuthenticator};
use dropsim_engine::config::Config;
use dropsim_engine::missions::ResolveAction;
use dropsim_engine::service::{Simulation, Stores};
use dropsim_engine::telemetry;
use dropsim_store::{AllocationLine, CatalogStore, MemoryStore, MetricsStore, Product};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.simulation.log_level)?)
        .init();
    telemetry::register_telemetry();

    println!("=== Dropsim: one week in a dropshipping business ===\n");

    // The auth collaborator hands us an authenticated owner.
    let owner = OwnerId::new();
    let auth = StaticAuthenticator::new().with_token("demo-token", owner);
    let owner = auth.authenticate("demo-token")?;

    let store = MemoryStore::shared();
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let random: Arc<dyn RandomSource> = Arc::new(ThreadRandom);
    let simulation = Simulation::from_config(
        &config,
        Stores::from_memory(&store),
        Arc::clone(&clock),
        random,
    );

    // Seed the business: opening capital, a small catalog, a revenue
    // baseline for the KPI board.
    let opening = Money::from_cents(config.simulation.starting_balance_cents);
    simulation.add_funds(owner, opening).await?;
    let widget = ProductId::new();
    let gadget = ProductId::new();
    store
        .create_product(Product {
            id: widget,
            owner,
            name: "Phone stand".to_string(),
            unit_cost: Money::from_cents(250),
        })
        .await?;
    store
        .create_product(Product {
            id: gadget,
            owner,
            name: "Desk lamp".to_string(),
            unit_cost: Money::from_cents(900),
        })
        .await?;
    store
        .update_metrics(owner, Box::new(|m| m.revenue = 2_500_000))
        .await?;
    println!("Opening balance: {opening}");

    // Pull crises from the event feeds.
    let locations = config.aggregator.tracked_locations.clone();
    let missions = simulation
        .create_missions_from_events(owner, &locations)
        .await?;
    println!("\nIncoming missions:");
    for mission in &missions {
        println!(
            "  [{}] {} (cost {}, deadline {})",
            mission.kind, mission.title, mission.cost_to_solve, mission.deadline
        );
    }

    // Plan the budget and restock ahead of the disruption.
    let outcome = simulation
        .allocate_budget(
            owner,
            vec![
                AllocationLine {
                    product: widget,
                    amount: Money::from_dollars(60),
                },
                AllocationLine {
                    product: gadget,
                    amount: Money::from_dollars(40),
                },
            ],
        )
        .await?;
    println!(
        "\nAllocated budget across {} products; spendable balance {}",
        outcome.applied_lines.len(),
        outcome.remaining_budget
    );

    let sku = Sku::new("STAND-BLK").ok_or_else(|| anyhow::anyhow!("blank sku"))?;
    let restock = simulation
        .restock_inventory(owner, widget, sku, 20)
        .await?;
    println!(
        "Restocked 20 units for {}; on hand {}, balance {}",
        restock.restock_cost, restock.new_quantity, restock.new_balance
    );

    // Resolve the first mission by paying for mitigation.
    if let Some(mission) = missions.first() {
        match simulation
            .resolve_mission(owner, mission.id, ResolveAction::Solve)
            .await
        {
            Ok(resolution) => {
                println!("\n{}", resolution.message);
                println!("Balance after mitigation: {}", resolution.new_balance);
            }
            Err(error) => println!("\nCould not solve \"{}\": {error}", mission.title),
        }
    }

    // An externally triggered pass fails whatever blew past its deadline.
    let swept = simulation.sweep_deadlines().await?;
    println!("\nDeadline sweep failed {} mission(s)", swept.len());

    let status = simulation.budget_status(owner).await?;
    println!(
        "\nBudget: total {}, allocated {}, used {}, available {}",
        status.total, status.allocated, status.used, status.available
    );
    println!("Recent transactions:");
    for txn in &status.recent_transactions {
        println!("  {} {} - {}", txn.kind, txn.amount, txn.description);
    }

    let metrics = simulation.business_metrics(owner).await?;
    println!(
        "\nKPIs: revenue {}c, expenses {}c, profit {}c, cash flow {}c",
        metrics.revenue, metrics.expenses, metrics.profit, metrics.cash_flow
    );
    for (dimension, reading) in &metrics.informational {
        println!("  {dimension}: {reading:+}%");
    }

    println!("\n=== Demo complete ===");
    Ok(())
}
