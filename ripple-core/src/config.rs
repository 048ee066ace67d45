//! Runtime Configuration
//!
//! A [`RuntimeConfig`] is fixed when a runtime is built. It can be written
//! by hand or loaded from JSON; every field has a default, so `{}` is a
//! valid configuration.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Configuration for a single reactive runtime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Name attached to the runtime's tracing spans.
    pub label: Option<String>,

    /// Upper bound on computation runs within one flush. Queue entries
    /// that are skipped because they already went back to `Init` do not count.
    ///
    /// `None` leaves flushes unbounded, so an effect that keeps invalidating
    /// itself never returns. With a bound, the flush stops, the remaining
    /// queue is dropped and `ReactiveError::FlushLimitExceeded` is reported.
    pub max_flush_runs: Option<usize>,
}

impl RuntimeConfig {
    /// Parse a configuration from a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set the tracing label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Bound the number of runs per flush.
    pub fn with_max_flush_runs(mut self, limit: usize) -> Self {
        self.max_flush_runs = Some(limit);
        self
    }

    pub(crate) fn label(&self) -> &str {
        self.label.as_deref().unwrap_or("default")
    }
}
