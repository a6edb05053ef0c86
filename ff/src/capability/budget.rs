//! Global step budget shared by a whole run

use std::sync::atomic::{AtomicU32, Ordering};

use thiserror::Error;
use tracing::debug;

/// The run used up its step budget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("step budget of {limit} exhausted")]
pub struct StepBudgetExceeded {
    pub limit: u32,
}

/// Counts stage dispatches, LLM turns and tool calls against one limit
#[derive(Debug)]
pub struct StepBudget {
    limit: u32,
    used: AtomicU32,
}

impl StepBudget {
    pub fn new(limit: u32) -> Self {
        debug!(%limit, "StepBudget::new: called");
        Self {
            limit,
            used: AtomicU32::new(0),
        }
    }

    /// Take one step; fails once the limit has been spent
    pub fn consume(&self, what: &str) -> Result<u32, StepBudgetExceeded> {
        let step = self.used.fetch_add(1, Ordering::SeqCst) + 1;
        if step > self.limit {
            debug!(%step, limit = %self.limit, %what, "StepBudget::consume: exhausted");
            return Err(StepBudgetExceeded { limit: self.limit });
        }
        debug!(%step, %what, "StepBudget::consume: ok");
        Ok(step)
    }

    /// Steps taken so far (including a failed attempt past the limit)
    pub fn used(&self) -> u32 {
        self.used.load(Ordering::SeqCst).min(self.limit)
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }
}
