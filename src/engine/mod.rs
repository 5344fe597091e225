//! Reviewer assignment core: selection, initial assignment, replacement,
//! and bulk deactivation repair.

pub mod assignment;
pub mod bulk;
pub mod replacement;
pub mod selector;

pub use assignment::AssignmentEngine;
pub use bulk::{BulkCoordinator, Reassignment};
pub use replacement::ReplacementEngine;
pub use selector::Selector;

use std::time::Duration;

/// Tunables shared by the engines.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Reviewer cap for new assignments. Replacement is always 1-for-1 and
    /// never changes a request's reviewer count.
    pub max_reviewers: usize,
    /// Soft latency budget for a whole bulk-deactivation batch. Overruns are
    /// logged, never enforced.
    pub bulk_latency_budget: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_reviewers: 2,
            bulk_latency_budget: Duration::from_millis(100),
        }
    }
}
