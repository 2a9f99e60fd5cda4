//! Error types for registry configuration and triggering.

use thiserror::Error;

use crate::args::ArgumentError;
use crate::registration::{HandlerFailure, RegistrationId};
use crate::resolver::ResolveError;
use crate::tags::NameSet;

/// Errors raised by configuration calls on a [`Registry`](crate::registry::Registry).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A hook and a scope cannot share a name.
    #[error("name '{0}' is already used by another hook or scope")]
    NameAlreadyUsed(String),

    /// The hook was already defined.
    #[error("hook '{0}' is already defined")]
    HookAlreadyDefined(String),

    /// No hook exists under this name.
    #[error("hook '{0}' not found")]
    HookNotFound(String),

    /// No scope exists under this name.
    #[error("scope '{0}' not found")]
    ScopeNotFound(String),

    /// A strict scope requires the hook to be defined first.
    #[error("hook '{0}' is not defined in a strict scope")]
    UndefinedHook(String),

    /// Tags outside the hook's vocabulary were used in a strict scope.
    #[error("unsupported tags {tags} for hook '{hook}'")]
    UnsupportedTags {
        /// The hook name.
        hook: String,
        /// The offending tags.
        tags: NameSet,
    },

    /// A hook's tag vocabulary can be set only once.
    #[error("tags of hook '{0}' are already set")]
    TagsAlreadySet(String),

    /// The registration would create a dependency cycle.
    #[error("cannot resolve dependencies of hook '{hook}': {source}")]
    CannotResolveDependencies {
        /// The hook name.
        hook: String,
        /// The resolver failure.
        #[source]
        source: ResolveError,
    },

    /// No-op registrations may only provide keys.
    #[error("no-op registrations of hook '{0}' cannot declare needs")]
    NoOpWithNeeds(String),

    /// The registration is not attached to its hook.
    #[error("registration {id} of hook '{hook}' is not registered")]
    NotRegistered {
        /// The hook name.
        hook: String,
        /// The registration id.
        id: RegistrationId,
    },

    /// The root scope must have a concrete exception policy.
    #[error("the root scope cannot inherit its exception policy")]
    RootCannotInherit,

    /// The hook or scope opted out of muting.
    #[error("'{0}' cannot be muted")]
    MutingForbidden(String),
}

/// Errors raised by [`Registry::trigger`](crate::registry::Registry::trigger).
#[derive(Debug, Clone, Error)]
pub enum TriggerError {
    /// The hook is not defined and its scope is strict.
    #[error("hook '{0}' is not defined in a strict scope")]
    UndefinedHook(String),

    /// The trigger used tags outside the hook's vocabulary.
    #[error("unsupported tags {tags} for hook '{hook}'")]
    UnsupportedTags {
        /// The hook name.
        hook: String,
        /// The offending tags.
        tags: NameSet,
    },

    /// The arguments do not match the hook's schema.
    #[error("invalid arguments for hook '{hook}': {source}")]
    InvalidArguments {
        /// The hook name.
        hook: String,
        /// The validation failure.
        #[source]
        source: ArgumentError,
    },

    /// Some registration needs a key nobody provides.
    #[error("hook '{hook}' has unmet dependencies {missing}")]
    UnmetDependencies {
        /// The hook name.
        hook: String,
        /// Keys that are needed but not provided.
        missing: NameSet,
    },

    /// Every remaining handler deferred without any progress.
    #[error("deadlock in hook '{hook}': registrations {} keep deferring", display_ids(.stuck))]
    Deadlock {
        /// The hook name.
        hook: String,
        /// The registrations that never completed.
        stuck: Vec<RegistrationId>,
    },

    /// A handler failed and the exception policy propagated it.
    #[error(transparent)]
    Handler(#[from] HandlerFailure),
}

impl TriggerError {
    /// Returns the handler failure, if this error carries one.
    #[must_use]
    pub fn handler_failure(&self) -> Option<&HandlerFailure> {
        match self {
            TriggerError::Handler(failure) => Some(failure),
            _ => None,
        }
    }
}

fn display_ids(ids: &[RegistrationId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
