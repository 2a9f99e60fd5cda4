//! The trigger protocol.
//!
//! A trigger runs in two phases. The plan phase reads the registry under a
//! read lock: it applies the mute, strictness, argument and dependency
//! checks, resolves the exception policy and snapshots the call order. The
//! run phase drops the lock and executes the snapshot:
//!
//! ```text
//! pending = snapshot
//! loop:
//!     for each pending registration
//!         skip if invalidated or tags don't match
//!         skip if non-reentrant and already running
//!         pre-trigger callbacks
//!         invoke → Completed | Deferred | Failed
//!     no deferrals        → done
//!     deferrals, progress → pending = deferred, next pass
//!     deferrals, no progress → Deadlock
//! ```
//!
//! Failures are reported to [`ON_HANDLER_EXCEPTION`] and then handed to the
//! scope's [`PolicyContext`](crate::policy::PolicyContext).

use std::sync::Arc;

use crate::args::Args;
use crate::error::TriggerError;
use crate::hook::{CallbackId, PreTriggerCallback};
use crate::policy::ExceptionPolicy;
use crate::registration::{HandlerContext, HandlerFailure, Invocation, Registration};
use crate::registry::Registry;
use crate::scope::scope_of;
use crate::tags::{NameSet, tags_match, unsupported_tags};

/// Internal hook triggered for every handler failure.
///
/// Its handlers receive the arguments `hook` (`String`), `registration`
/// ([`RegistrationId`](crate::registration::RegistrationId)) and `failure`
/// ([`HandlerFailure`]).
pub const ON_HANDLER_EXCEPTION: &str = "herald.on_handler_exception";

/// Everything a trigger needs once the registry lock is released.
struct Plan {
    registrations: Arc<Vec<Arc<Registration>>>,
    callbacks: Arc<Vec<(CallbackId, PreTriggerCallback)>>,
    policy: ExceptionPolicy,
}

impl Registry {
    /// Triggers a hook, calling its handlers in order.
    ///
    /// Triggering a hook that does not exist does nothing.
    ///
    /// # Errors
    ///
    /// See [`TriggerError`]. Handler failures surface according to the
    /// exception policy of the hook's scope.
    pub fn trigger(&self, name: &str, args: Args) -> Result<(), TriggerError> {
        self.dispatch(name, &args, None)
    }

    /// Triggers a hook, calling only the handlers sharing one of `tags`.
    ///
    /// An empty tag set calls every handler.
    ///
    /// # Errors
    ///
    /// As [`trigger`](Self::trigger), plus [`TriggerError::UnsupportedTags`]
    /// in strict scopes.
    pub fn trigger_with_tags(
        &self,
        name: &str,
        args: Args,
        tags: impl Into<NameSet>,
    ) -> Result<(), TriggerError> {
        let tags = tags.into();
        self.dispatch(name, &args, Some(&tags))
    }

    fn plan(
        &self,
        name: &str,
        args: &Args,
        tags: Option<&NameSet>,
    ) -> Result<Option<Plan>, TriggerError> {
        let state = self.state.read();
        let Some(hook) = state.hooks.get(name) else {
            return Ok(None);
        };
        if self.is_muted(name) {
            tracing::debug!(hook = name, "hook muted, skipping trigger");
            return Ok(None);
        }

        let scope = scope_of(name);
        if state.effective_strict(scope) {
            if !hook.is_defined() {
                return Err(TriggerError::UndefinedHook(name.to_owned()));
            }
            if let Some(tags) = tags {
                let unsupported = unsupported_tags(tags, hook.tags());
                if !unsupported.is_empty() {
                    return Err(TriggerError::UnsupportedTags {
                        hook: name.to_owned(),
                        tags: unsupported,
                    });
                }
            }
            if let Some(schema) = hook.args() {
                schema
                    .validate(args)
                    .map_err(|source| TriggerError::InvalidArguments {
                        hook: name.to_owned(),
                        source,
                    })?;
            }
        }

        if !hook.unmet().is_empty() {
            return Err(TriggerError::UnmetDependencies {
                hook: name.to_owned(),
                missing: hook.unmet().clone(),
            });
        }

        Ok(Some(Plan {
            registrations: hook.snapshot(),
            callbacks: hook.callbacks(),
            policy: state.scopes.resolve_policy(scope),
        }))
    }

    fn dispatch(&self, name: &str, args: &Args, tags: Option<&NameSet>) -> Result<(), TriggerError> {
        let Some(plan) = self.plan(name, args, tags)? else {
            return Ok(());
        };

        let mut policy = plan.policy.enter();
        let mut pending: Vec<Arc<Registration>> = plan.registrations.iter().cloned().collect();
        let limit = pending.len();
        let mut passes = 0_usize;

        while !pending.is_empty() {
            passes += 1;
            assert!(
                passes <= limit,
                "hook '{name}' needed more than {limit} passes to settle deferred handlers"
            );

            let mut deferred = Vec::new();
            let mut progress = false;

            for registration in pending {
                if !registration.is_valid() || !tags_match(registration.tags(), tags) {
                    continue;
                }

                let invocation = {
                    let Some(_call) = registration.enter() else {
                        tracing::trace!(hook = name, registration = %registration.id(), "already running, skipping");
                        progress = true;
                        continue;
                    };
                    for (_, callback) in plan.callbacks.iter() {
                        callback(&*registration, args);
                    }
                    tracing::trace!(hook = name, registration = %registration.id(), "invoking handler");
                    registration.invoke(&HandlerContext::new(self, name, args, &registration))
                };

                match invocation {
                    Invocation::Completed => progress = true,
                    Invocation::Deferred => {
                        tracing::debug!(hook = name, registration = %registration.id(), "handler deferred");
                        deferred.push(registration);
                    }
                    Invocation::Failed(failure) => {
                        progress = true;
                        tracing::debug!(hook = name, registration = %registration.id(), error = %failure, "handler failed");
                        if name != ON_HANDLER_EXCEPTION {
                            self.report_failure(&failure)?;
                        }
                        policy.handle(failure)?;
                    }
                }
            }

            if !deferred.is_empty() && !progress {
                return Err(TriggerError::Deadlock {
                    hook: name.to_owned(),
                    stuck: deferred.iter().map(|registration| registration.id()).collect(),
                });
            }
            pending = deferred;
        }

        policy.finish()?;
        Ok(())
    }

    fn report_failure(&self, failure: &HandlerFailure) -> Result<(), TriggerError> {
        let args = Args::new()
            .with("hook", failure.hook().to_owned())
            .with("registration", failure.registration())
            .with("failure", failure.clone());
        self.trigger(ON_HANDLER_EXCEPTION, args)
    }
}
