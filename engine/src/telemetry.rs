//! Operational telemetry for the simulator.
//!
//! This module tracks how the engine itself behaves (missions issued,
//! debits rejected, sources failing over); the *business* KPIs the trainee
//! sees live in [`crate::projector`]. Recording goes through the `metrics`
//! facade so any exporter the host application installs picks these up.
//!
//! # Exported Series
//!
//! ## Counters
//! - `dropsim_missions_created_total{origin}` - Missions issued by source
//! - `dropsim_missions_resolved_total{outcome}` - Resolutions by outcome
//! - `dropsim_ledger_transactions_total{kind}` - Ledger entries by kind
//! - `dropsim_debits_rejected_total` - Debits rejected for insufficient funds
//! - `dropsim_restocks_total` - Inventory restocks applied
//! - `dropsim_event_source_failures_total{source}` - Aggregator source outages

use metrics::describe_counter;

/// Registers descriptions for every series. Call once at startup, before
/// any metrics are recorded.
pub fn register_telemetry() {
    describe_counter!(
        "dropsim_missions_created_total",
        "Total missions issued, labeled by aggregator origin"
    );
    describe_counter!(
        "dropsim_missions_resolved_total",
        "Total mission resolutions by outcome (completed, failed, swept)"
    );
    describe_counter!(
        "dropsim_ledger_transactions_total",
        "Total ledger transactions by kind (deposit, allocation, spend)"
    );
    describe_counter!(
        "dropsim_debits_rejected_total",
        "Total debits rejected for insufficient funds"
    );
    describe_counter!("dropsim_restocks_total", "Total inventory restocks applied");
    describe_counter!(
        "dropsim_event_source_failures_total",
        "Total event source failures or timeouts, labeled by source"
    );

    tracing::info!("telemetry registered");
}

/// Records a mission issued by the given aggregator origin.
pub fn record_mission_created(origin: &str) {
    metrics::counter!("dropsim_missions_created_total", "origin" => origin.to_owned())
        .increment(1);
}

/// Records a mission resolution outcome (`completed`, `failed`, `swept`).
pub fn record_mission_resolved(outcome: &'static str) {
    metrics::counter!("dropsim_missions_resolved_total", "outcome" => outcome).increment(1);
}

/// Records an appended ledger transaction by kind.
pub fn record_transaction(kind: &'static str) {
    metrics::counter!("dropsim_ledger_transactions_total", "kind" => kind).increment(1);
}

/// Records a debit rejected for insufficient funds.
pub fn record_rejected_debit() {
    metrics::counter!("dropsim_debits_rejected_total").increment(1);
}

/// Records an applied restock.
pub fn record_restock() {
    metrics::counter!("dropsim_restocks_total").increment(1);
}

/// Records an event source failing or timing out.
pub fn record_source_failure(source: &str) {
    metrics::counter!("dropsim_event_source_failures_total", "source" => source.to_owned())
        .increment(1);
}
