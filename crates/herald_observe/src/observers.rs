//! Registry observers that report through `tracing`.
//!
//! - [`FailureLogger`] listens on [`ON_HANDLER_EXCEPTION`] and logs every
//!   handler failure at `error` level.
//! - [`CallTracer`] installs a pre-trigger callback on one hook and logs each
//!   invocation attempt at `debug` level.

use herald_hooks::prelude::*;

/// Token carried by the failure logger's registration.
pub const FAILURE_LOGGER_TOKEN: &str = "herald_observe.failure_logger";

// ─────────────────────────────────────────────────────────────────────────────
// FailureLogger
// ─────────────────────────────────────────────────────────────────────────────

/// Logs every handler failure reported by a registry.
#[derive(Debug)]
pub struct FailureLogger {
    handle: RegistrationHandle,
}

impl FailureLogger {
    /// Registers the logger on the registry's internal failure hook.
    ///
    /// The logger runs before any other failure handler and never fails
    /// itself.
    ///
    /// # Errors
    ///
    /// Returns the [`RegistryError`] of the underlying registration, e.g.
    /// when the failure hook lives in a strict scope and was not defined.
    pub fn attach(registry: &Registry) -> Result<Self, RegistryError> {
        let handle = registry.register(
            ON_HANDLER_EXCEPTION,
            |ctx: &HandlerContext<'_>| {
                let Some(failure) = ctx.arg::<HandlerFailure>("failure") else {
                    return Ok(());
                };
                tracing::error!(
                    hook = failure.hook(),
                    registration = %failure.registration(),
                    error = %failure.error(),
                    "handler failed"
                );
                Ok(())
            },
            RegisterOptions::new()
                .priority(i32::MAX)
                .token(FAILURE_LOGGER_TOKEN),
        )?;
        Ok(Self { handle })
    }

    /// Returns the logger's registration handle.
    #[must_use]
    pub fn handle(&self) -> &RegistrationHandle {
        &self.handle
    }

    /// Removes the logger from the registry.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotRegistered`] if it was already removed.
    pub fn detach(self, registry: &Registry) -> Result<(), RegistryError> {
        self.handle.unregister(registry)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// CallTracer
// ─────────────────────────────────────────────────────────────────────────────

/// Logs each handler invocation attempt on one hook.
#[derive(Debug)]
pub struct CallTracer {
    hook: String,
    callback: CallbackId,
}

impl CallTracer {
    /// Installs the tracer on `hook`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::HookNotFound`] if the hook does not exist.
    pub fn attach(registry: &Registry, hook: &str) -> Result<Self, RegistryError> {
        let callback = registry.add_pre_trigger_callback(hook, |registration: &Registration, args: &Args| {
            tracing::debug!(
                hook = registration.hook(),
                registration = %registration.id(),
                handler = registration.handler_name().unwrap_or("<no-op>"),
                args = ?args,
                "calling handler"
            );
        })?;
        Ok(Self {
            hook: hook.to_owned(),
            callback,
        })
    }

    /// Returns the traced hook's name.
    #[must_use]
    pub fn hook(&self) -> &str {
        &self.hook
    }

    /// Removes the tracer. Returns `false` if it was already gone, for
    /// example because the hook was undefined.
    pub fn detach(self, registry: &Registry) -> bool {
        registry.remove_pre_trigger_callback(&self.hook, self.callback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_logger_registers_with_token() {
        let registry = Registry::new();
        let logger = FailureLogger::attach(&registry).unwrap();
        let registrations = registry.registrations(ON_HANDLER_EXCEPTION);
        assert_eq!(registrations.len(), 1);
        assert_eq!(registrations[0].token(), Some(FAILURE_LOGGER_TOKEN));
        assert_eq!(registrations[0].priority(), i32::MAX);

        logger.detach(&registry).unwrap();
        assert!(registry.registrations(ON_HANDLER_EXCEPTION).is_empty());
    }

    #[test]
    fn call_tracer_needs_existing_hook() {
        let registry = Registry::new();
        assert_eq!(
            CallTracer::attach(&registry, "missing").unwrap_err(),
            RegistryError::HookNotFound("missing".into())
        );

        registry
            .register("present", |_ctx: &HandlerContext<'_>| Ok(()), RegisterOptions::new())
            .unwrap();
        let tracer = CallTracer::attach(&registry, "present").unwrap();
        assert_eq!(tracer.hook(), "present");
        assert!(tracer.detach(&registry));
    }
}
