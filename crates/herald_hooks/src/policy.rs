//! Exception policies.
//!
//! A policy decides what a trigger does when a handler fails. Each trigger
//! enters a [`PolicyContext`], feeds it every failure through
//! [`PolicyContext::handle`] and closes it with [`PolicyContext::finish`].

use core::fmt;

use crate::registration::HandlerFailure;

/// Failure handling strategy of a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ExceptionPolicy {
    /// The first failure aborts the trigger and is returned to the caller.
    #[default]
    RaiseImmediately,
    /// All handlers run; the first failure is returned afterwards.
    RaiseDefer,
    /// Failures are swallowed.
    Ignore,
}

impl ExceptionPolicy {
    /// Starts tracking failures for one trigger.
    #[must_use]
    pub fn enter(self) -> PolicyContext {
        PolicyContext {
            policy: self,
            first: None,
        }
    }
}

impl fmt::Display for ExceptionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExceptionPolicy::RaiseImmediately => f.write_str("raise-immediately"),
            ExceptionPolicy::RaiseDefer => f.write_str("raise-defer"),
            ExceptionPolicy::Ignore => f.write_str("ignore"),
        }
    }
}

/// Per-trigger failure state of an [`ExceptionPolicy`].
#[derive(Debug)]
pub struct PolicyContext {
    policy: ExceptionPolicy,
    first: Option<HandlerFailure>,
}

impl PolicyContext {
    /// Returns the policy this context applies.
    #[must_use]
    pub fn policy(&self) -> ExceptionPolicy {
        self.policy
    }

    /// Handles one handler failure.
    ///
    /// # Errors
    ///
    /// Returns the failure when the trigger must stop now.
    pub fn handle(&mut self, failure: HandlerFailure) -> Result<(), HandlerFailure> {
        match self.policy {
            ExceptionPolicy::RaiseImmediately => Err(failure),
            ExceptionPolicy::RaiseDefer => {
                if self.first.is_none() {
                    self.first = Some(failure);
                }
                Ok(())
            }
            ExceptionPolicy::Ignore => Ok(()),
        }
    }

    /// Closes the context after every handler ran.
    ///
    /// # Errors
    ///
    /// Returns the first recorded failure under [`ExceptionPolicy::RaiseDefer`].
    pub fn finish(self) -> Result<(), HandlerFailure> {
        match self.first {
            Some(failure) => Err(failure),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::registration::RegistrationId;

    #[derive(Debug, thiserror::Error)]
    #[error("failure {0}")]
    struct Numbered(u32);

    fn failure(n: u32) -> HandlerFailure {
        HandlerFailure::new("hook", RegistrationId(u64::from(n)), Arc::new(Numbered(n)))
    }

    #[test]
    fn raise_immediately_returns_failure() {
        let mut ctx = ExceptionPolicy::RaiseImmediately.enter();
        let err = ctx.handle(failure(1)).unwrap_err();
        assert_eq!(err.downcast_ref::<Numbered>().map(|n| n.0), Some(1));
        assert!(ctx.finish().is_ok());
    }

    #[test]
    fn raise_defer_keeps_first_failure() {
        let mut ctx = ExceptionPolicy::RaiseDefer.enter();
        assert!(ctx.handle(failure(1)).is_ok());
        assert!(ctx.handle(failure(2)).is_ok());
        let err = ctx.finish().unwrap_err();
        assert_eq!(err.downcast_ref::<Numbered>().map(|n| n.0), Some(1));
    }

    #[test]
    fn ignore_swallows_everything() {
        let mut ctx = ExceptionPolicy::Ignore.enter();
        assert!(ctx.handle(failure(1)).is_ok());
        assert!(ctx.finish().is_ok());
    }

    #[test]
    fn default_is_raise_immediately() {
        assert_eq!(ExceptionPolicy::default(), ExceptionPolicy::RaiseImmediately);
    }
}
