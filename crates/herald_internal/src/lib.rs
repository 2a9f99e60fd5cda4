//! # Herald Internal Library
//!
//! Re-exports the core Herald crates for convenience.

/// Hook registry, resolver and dispatch engine.
pub use herald_hooks;

/// Tracing setup and registry observers.
#[cfg(feature = "observe")]
pub use herald_observe;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use herald_hooks::prelude::*;

    #[cfg(feature = "observe")]
    pub use herald_observe::prelude::*;
}
