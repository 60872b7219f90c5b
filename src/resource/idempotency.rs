//! Idempotency Cache
//!
//! Provider deletes are asynchronous and accept a caller-chosen request ID.
//! Retrying a timed-out call with the *same* ID returns the original
//! operation instead of registering a second deletion, so the ID for a
//! (type, identity) pair is kept until the attempt reaches a terminal outcome.
//!
//! Each pair moves through three states:
//!
//! ```text
//! NoAttempt --token()--> InFlight(id) --observe(terminal)--> Terminal
//!     ^                      |   ^                              |
//!     |                      +---+ observe(pending/transient)   |
//!     +---------------------- entry dropped --------------------+
//! ```
//!
//! Terminal is only reported by `observe`; the cache keeps entries for
//! in-flight attempts alone.

use super::ResourceType;
use crate::driver::DeleteStatus;
use crate::error::ProviderError;
use std::collections::HashMap;
use uuid::Uuid;

/// Lifecycle of one delete attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptState {
    NoAttempt,
    InFlight(String),
    Terminal,
}

#[derive(Debug, Default)]
pub struct IdempotencyCache {
    attempts: HashMap<(ResourceType, String), AttemptState>,
}

impl IdempotencyCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, resource_type: ResourceType, identity: &str) -> AttemptState {
        self.attempts
            .get(&(resource_type, identity.to_string()))
            .cloned()
            .unwrap_or(AttemptState::NoAttempt)
    }

    /// Token for the next delete call, created lazily on first attempt.
    pub fn token(&mut self, resource_type: ResourceType, identity: &str) -> String {
        let state = self
            .attempts
            .entry((resource_type, identity.to_string()))
            .or_insert(AttemptState::NoAttempt);

        match state {
            AttemptState::InFlight(token) => token.clone(),
            AttemptState::NoAttempt | AttemptState::Terminal => {
                let token = Uuid::new_v4().to_string();
                *state = AttemptState::InFlight(token.clone());
                token
            }
        }
    }

    /// Drop the token: the attempt is over.
    pub fn reset(&mut self, resource_type: ResourceType, identity: &str) {
        self.attempts.remove(&(resource_type, identity.to_string()));
    }

    /// Apply a provider response. Returns the state after the transition.
    ///
    /// Done and not-found are terminal successes, pending and transient
    /// errors keep the token, anything else is a terminal failure.
    pub fn observe(
        &mut self,
        resource_type: ResourceType,
        identity: &str,
        response: &Result<DeleteStatus, ProviderError>,
    ) -> AttemptState {
        let keep = match response {
            Ok(DeleteStatus::Pending) => true,
            Ok(DeleteStatus::Done) | Ok(DeleteStatus::NotFound) => false,
            Err(err) => err.is_transient(),
        };

        if keep {
            return self.state(resource_type, identity);
        }
        self.reset(resource_type, identity);
        AttemptState::Terminal
    }

    /// Number of attempts currently holding a token.
    pub fn in_flight(&self) -> usize {
        self.attempts
            .values()
            .filter(|s| matches!(s, AttemptState::InFlight(_)))
            .count()
    }
}
