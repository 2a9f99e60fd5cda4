//! Observability for Herald.
//!
//! Provides [`TracingConfig`] for installing a `tracing` subscriber, plus
//! two registry observers built on the engine's own extension points:
//!
//! | Observer | Attached to | Level |
//! |----------|-------------|-------|
//! | [`FailureLogger`] | [`ON_HANDLER_EXCEPTION`](herald_hooks::ON_HANDLER_EXCEPTION) | `error` |
//! | [`CallTracer`] | a pre-trigger callback on one hook | `debug` |
//!
//! # Example
//!
//! ```
//! use herald_hooks::prelude::*;
//! use herald_observe::{CallTracer, FailureLogger, TracingConfig};
//!
//! TracingConfig::new().init();
//!
//! let registry = Registry::new();
//! registry
//!     .register("job.run", |_ctx: &HandlerContext<'_>| Ok(()), RegisterOptions::new())
//!     .unwrap();
//! let _logger = FailureLogger::attach(&registry).unwrap();
//! let _tracer = CallTracer::attach(&registry, "job.run").unwrap();
//!
//! registry.trigger("job.run", Args::new()).unwrap();
//! ```

mod observers;
mod tracing_config;

pub use observers::{CallTracer, FAILURE_LOGGER_TOKEN, FailureLogger};
pub use tracing_config::{TracingConfig, TracingFormat};

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::observers::{CallTracer, FailureLogger};
    pub use crate::tracing_config::{TracingConfig, TracingFormat};
}
