//! # Dropsim Core
//!
//! Shared primitives for the dropsim business simulator.
//!
//! The simulator trains its users by throwing time-bound crises ("missions")
//! at a fictitious dropshipping business and making them pay for mitigation
//! out of a simulated wallet. This crate holds the vocabulary every other
//! crate speaks:
//!
//! - Typed identifiers ([`types::OwnerId`], [`types::MissionId`], ...)
//! - The cents-based [`types::Money`] value object
//! - The impact-vector model ([`impact::ImpactVector`]) describing how a
//!   mission moves business KPIs
//! - The error taxonomy ([`error::SimulationError`])
//! - Injected environment traits ([`environment::Clock`],
//!   [`environment::RandomSource`]) so domain logic never reads wall-clock
//!   time or an ambient random generator directly
//!
//! Domain services live in `dropsim-engine`; persisted entities and storage
//! traits live in `dropsim-store`.

pub mod environment;
pub mod error;
pub mod impact;
pub mod types;

// Re-export commonly used types
pub use chrono::{DateTime, Duration, Utc};
pub use error::SimulationError;
pub use impact::{ImpactVector, KpiDimension};
pub use types::{ImpactKind, MissionId, Money, OwnerId, ProductId, Sku, TransactionId};
