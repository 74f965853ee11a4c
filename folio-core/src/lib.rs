//! Folio Core
//!
//! This crate provides the runtime glue for the Folio portfolio site.
//! It implements:
//!
//! - Component instances with dirty tracking and lifecycle callbacks
//! - A microtask-driven update scheduler that batches component updates
//! - The server preload hook and the date/path helpers used by project pages
//!
//! The crate can also be built as a Python extension module via PyO3 (the
//! `python` feature), which exposes the site helpers to the build scripts.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `component`: component handles, dirty bits, fragments and callbacks
//! - `scheduler`: the update scheduler, microtask queue and tokio driver
//! - `site`: preload policy and formatting helpers
//! - `config`: scheduler configuration
//! - `error`: error types
//!
//! # Example
//!
//! ```rust,ignore
//! use folio_core::component::{Callback, Component};
//! use folio_core::scheduler::Scheduler;
//!
//! let scheduler = Scheduler::new();
//! let nav = Component::new("nav").with_update(|| Ok(()));
//!
//! scheduler.init(&nav, || {
//!     scheduler
//!         .add_after_update(Callback::new(|| println!("nav updated")))
//!         .unwrap();
//! });
//!
//! // Any number of synchronous updates...
//! scheduler.schedule_update(&nav);
//! scheduler.schedule_update(&nav);
//!
//! // ...settle in one flush at the next microtask checkpoint.
//! scheduler.run_microtasks()?;
//! // Prints: "nav updated"
//! ```

pub mod component;
pub mod config;
pub mod error;
pub mod scheduler;
pub mod site;

#[cfg(feature = "python")]
mod python {
    use pyo3::exceptions::PyValueError;
    use pyo3::prelude::*;

    use crate::site::{self, PreloadPolicy, ResourceKind};

    /// Render a date string with a strftime format, in UTC.
    #[pyfunction]
    fn format_time(format: &str, date: &str) -> PyResult<String> {
        site::format_time(format, date).map_err(|e| PyValueError::new_err(e.to_string()))
    }

    /// Extract the project name from a `../projects/<name>.md` path.
    #[pyfunction]
    fn trim_name(id: &str) -> Option<String> {
        site::trim_name(id).map(str::to_owned)
    }

    /// Whether the default policy preloads resources of kind `kind`.
    #[pyfunction]
    fn should_preload(kind: &str) -> PyResult<bool> {
        let kind = ResourceKind::parse(kind)
            .ok_or_else(|| PyValueError::new_err(format!("unknown resource kind: {kind}")))?;
        Ok(PreloadPolicy::default().should_preload(kind))
    }

    /// Python module definition.
    ///
    /// This function is called by Python when importing the module.
    /// It registers all Python-exposed functions.
    #[pymodule]
    fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
        m.add_function(wrap_pyfunction!(format_time, m)?)?;
        m.add_function(wrap_pyfunction!(trim_name, m)?)?;
        m.add_function(wrap_pyfunction!(should_preload, m)?)?;

        // Add version info
        m.add("__version__", env!("CARGO_PKG_VERSION"))?;

        Ok(())
    }
}
