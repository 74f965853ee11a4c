//! Error types shared across the crate.

use thiserror::Error;

use crate::component::ComponentId;

/// Boxed error returned by a component's update function.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised by lifecycle registration.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// A lifecycle hook was registered while no component was being
    /// initialized or updated.
    #[error("Function called outside component initialization ({hook})")]
    OutsideInitialization { hook: &'static str },
}

/// Errors that abort a flush.
#[derive(Debug, Error)]
pub enum FlushError {
    #[error("update of component {component} failed")]
    Update {
        component: ComponentId,
        #[source]
        source: BoxError,
    },
}

/// Errors raised while loading a [`SchedulerConfig`](crate::config::SchedulerConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid scheduler config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors raised by the date helpers in [`site`](crate::site).
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("unrecognized date: {0:?}")]
    InvalidDate(String),

    #[error("invalid format string: {0:?}")]
    InvalidFormat(String),
}
