//! Scheduler Configuration
//!
//! Tunables for the update scheduler. Every field has a default, so an empty
//! JSON object (or no config at all) yields a working scheduler.
//!
//! ```json
//! { "pass_warning_threshold": 50, "trace_components": true }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default number of passes after which a flush logs a warning.
pub const DEFAULT_PASS_WARNING_THRESHOLD: usize = 100;

/// Configuration for a [`Scheduler`](crate::scheduler::Scheduler).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Log a warning once a single flush has looped this many passes without
    /// reaching a fixed point. This is only a diagnostic: the flush keeps
    /// looping until it settles.
    pub pass_warning_threshold: Option<usize>,

    /// Emit a trace event for every component update.
    pub trace_components: bool,
}

impl SchedulerConfig {
    /// Parse a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            pass_warning_threshold: Some(DEFAULT_PASS_WARNING_THRESHOLD),
            trace_components: false,
        }
    }
}
