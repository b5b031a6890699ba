//! Generation tokens for discarding superseded passes.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{ExplainError, ExplainResult};

/// Hands out strictly increasing tokens. Only a result tagged with the most
/// recently issued token is accepted.
#[derive(Debug, Default)]
pub struct GenerationCounter {
    latest: AtomicU64,
}

impl GenerationCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new pass. Tokens begin at 1.
    pub fn next(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn latest(&self) -> u64 {
        self.latest.load(Ordering::Acquire)
    }

    pub fn is_current(&self, token: u64) -> bool {
        token == self.latest()
    }

    /// Pass `result` through if `token` is still the latest generation.
    pub fn accept<T>(&self, token: u64, result: T) -> ExplainResult<T> {
        let latest = self.latest();
        if token == latest {
            Ok(result)
        } else {
            Err(ExplainError::StaleResultDiscarded { token, latest })
        }
    }
}
