//! The error taxonomy every exposed operation speaks.
//!
//! Ordering matters operationally: `Unauthorized` is rejected before any
//! side effect, `Validation` before any store access, and the remaining
//! variants surface from inside an operation. `SystemFailure` deliberately
//! carries no storage detail; internals go to the log, callers get a
//! generic retry message.

use crate::types::Money;
use thiserror::Error;

/// Errors surfaced by the simulator's exposed operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimulationError {
    /// No valid identity was supplied; rejected before any side effect.
    #[error("authentication required")]
    Unauthorized,

    /// The request is malformed; rejected before any store access.
    #[error("invalid request: {reason}")]
    Validation {
        /// What was wrong with the request, including the offending value.
        reason: String,
    },

    /// The referenced entity does not exist or is not owned by the caller.
    #[error("{entity} not found")]
    NotFound {
        /// Human-readable description of what was looked up.
        entity: String,
    },

    /// The wallet cannot cover the requested amount. Recoverable: add funds
    /// and retry.
    #[error("insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds {
        /// Amount the operation needed.
        requested: Money,
        /// Balance actually available.
        available: Money,
    },

    /// The mission was already resolved; the transition was not repeated.
    #[error("mission already resolved as {status}")]
    Conflict {
        /// The terminal status the mission is already in.
        status: String,
    },

    /// The storage collaborator failed. Retryable; details are logged, not
    /// leaked.
    #[error("service temporarily unavailable, please retry")]
    SystemFailure,
}

impl SimulationError {
    /// Convenience constructor for validation failures.
    #[must_use]
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for not-found failures.
    #[must_use]
    pub fn not_found(entity: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_funds_reports_structured_amounts() {
        let err = SimulationError::InsufficientFunds {
            requested: Money::from_dollars(500),
            available: Money::from_dollars(50),
        };
        let message = err.to_string();
        assert!(message.contains("$500.00"));
        assert!(message.contains("$50.00"));
    }

    #[test]
    fn system_failure_leaks_nothing() {
        let message = SimulationError::SystemFailure.to_string();
        assert!(!message.to_lowercase().contains("database"));
        assert!(message.contains("retry"));
    }
}
