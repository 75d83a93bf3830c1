//! The authentication seam.
//!
//! Credential issuance and verification are external concerns; the
//! simulator only needs "which owner is this request for". The collaborator
//! is modeled as a trait resolving an opaque token to an [`OwnerId`],
//! rejected with `Unauthorized` before any side effect.

use dropsim_core::types::OwnerId;
use dropsim_core::SimulationError;
use std::collections::HashMap;

/// Resolves an opaque token to an authenticated owner.
pub trait Authenticator: Send + Sync {
    /// Resolves the token.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::Unauthorized`] for a missing or unknown
    /// token.
    fn authenticate(&self, token: &str) -> Result<OwnerId, SimulationError>;
}

/// A fixed token table, used by the demo binary and tests in place of the
/// real auth collaborator.
#[derive(Debug, Default)]
pub struct StaticAuthenticator {
    tokens: HashMap<String, OwnerId>,
}

impl StaticAuthenticator {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a token for an owner and returns self for chaining.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>, owner: OwnerId) -> Self {
        self.tokens.insert(token.into(), owner);
        self
    }
}

impl Authenticator for StaticAuthenticator {
    fn authenticate(&self, token: &str) -> Result<OwnerId, SimulationError> {
        if token.trim().is_empty() {
            return Err(SimulationError::Unauthorized);
        }
        self.tokens
            .get(token)
            .copied()
            .ok_or(SimulationError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_token_resolves() {
        let owner = OwnerId::new();
        let auth = StaticAuthenticator::new().with_token("tok-1", owner);
        assert_eq!(auth.authenticate("tok-1"), Ok(owner));
    }

    #[test]
    fn blank_and_unknown_tokens_are_unauthorized() {
        let auth = StaticAuthenticator::new().with_token("tok-1", OwnerId::new());
        assert_eq!(auth.authenticate(""), Err(SimulationError::Unauthorized));
        assert_eq!(
            auth.authenticate("tok-2"),
            Err(SimulationError::Unauthorized)
        );
    }
}
