//! An in-process hook dispatch engine.
//!
//! Components register handlers to named hooks; triggering a hook calls its
//! handlers ordered by priority and needs/provides dependencies, with
//! per-scope exception policies, strict definitions and temporary muting.
//!
//! ```
//! use herald::prelude::*;
//!
//! let registry = Registry::new();
//! registry
//!     .register("app.started", |_ctx: &HandlerContext<'_>| Ok(()), RegisterOptions::new())
//!     .unwrap();
//! registry.trigger("app.started", Args::new()).unwrap();
//! ```

pub use herald_internal::*;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use herald_internal::prelude::*;
}
