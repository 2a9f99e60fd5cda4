//! In-process hook dispatch for Herald.
//!
//! `herald_hooks` lets decoupled components react to named events without
//! holding references to each other. Components register handlers to hooks
//! by name; triggering a hook invokes its handlers in a well-defined order.
//!
//! # Core Concepts
//!
//! - [`Registry`] - Owner of all hooks, registrations, scopes and mutes
//! - [`RegisterOptions`] - Priority, needs/provides, tags, token and gates of a registration
//! - [`HookDefinition`] - Declared arguments, tags and documentation of a hook
//! - [`ExceptionPolicy`] - What a trigger does when a handler fails
//! - [`Toggle`] - Shared latch for run-once-until-released handlers
//! - [`Blueprint`] - Registrations installed and removed as one unit
//!
//! # Ordering
//!
//! Handlers run by priority (higher first, ties in registration order),
//! permuted so that every provider of a dependency key runs before the
//! handlers that need it. A handler may also defer itself at run time with
//! [`not_now`] or [`wait_for`]; it is retried after the others.
//!
//! # Example
//!
//! ```
//! use herald_hooks::prelude::*;
//!
//! let registry = Registry::new();
//! registry
//!     .register(
//!         "app.started",
//!         |ctx: &HandlerContext<'_>| {
//!             wait_for(ctx.arg::<bool>("ready").copied().unwrap_or(true))?;
//!             Ok(())
//!         },
//!         RegisterOptions::new().needs(["config"]),
//!     )
//!     .unwrap();
//! registry
//!     .register_no_op("app.started", RegisterOptions::new().provides(["config"]))
//!     .unwrap();
//!
//! registry.trigger("app.started", Args::new()).unwrap();
//! ```

/// Trigger arguments and schemas.
pub mod args;

/// Batch registration under a shared token.
pub mod blueprint;

/// Registry and trigger errors.
pub mod error;

/// Hook definitions and pre-trigger callbacks.
pub mod hook;

/// Temporary hook suppression.
pub mod mute;

/// Exception policies.
pub mod policy;

/// Handler registrations and handler results.
pub mod registration;

/// The hook registry.
pub mod registry;

/// Call-order resolution.
pub mod resolver;

/// The dotted scope tree.
pub mod scope;

/// Tag and dependency-key sets.
pub mod tags;

/// Shared on/off latch.
pub mod toggle;

/// The trigger protocol.
pub mod trigger;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::args::{ArgSchema, ArgType, ArgValue, Args, ArgumentError};
    pub use crate::blueprint::Blueprint;
    pub use crate::error::{RegistryError, TriggerError};
    pub use crate::hook::{CallbackId, HookDefinition};
    pub use crate::mute::MuteGuard;
    pub use crate::policy::ExceptionPolicy;
    pub use crate::registration::{
        HandlerContext, HandlerError, HandlerFailure, HandlerResult, RegisterOptions, Registration,
        RegistrationHandle, RegistrationId, not_now, wait_for,
    };
    pub use crate::registry::Registry;
    pub use crate::resolver::{ResolveError, UnconstrainedPriority};
    pub use crate::tags::NameSet;
    pub use crate::toggle::Toggle;
    pub use crate::trigger::ON_HANDLER_EXCEPTION;
}

// Re-export key types at crate root for convenience
pub use blueprint::Blueprint;
pub use error::{RegistryError, TriggerError};
pub use hook::HookDefinition;
pub use policy::ExceptionPolicy;
pub use registration::{
    HandlerContext, HandlerError, HandlerFailure, HandlerResult, RegisterOptions,
    RegistrationHandle, not_now, wait_for,
};
pub use registry::Registry;
pub use toggle::Toggle;
pub use trigger::ON_HANDLER_EXCEPTION;
