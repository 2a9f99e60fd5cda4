//! Handler registrations.
//!
//! A [`Registration`] binds one handler to one hook together with its
//! ordering and filtering metadata. Registrations are created through
//! [`Registry::register`](crate::registry::Registry::register), which returns
//! a [`RegistrationHandle`] the caller keeps for later unregistration.
//!
//! # Handler results
//!
//! Handlers return a [`HandlerResult`]. Besides success and failure, a
//! handler may ask to be retried later in the same trigger with
//! [`not_now`] or [`wait_for`]:
//!
//! ```
//! use herald_hooks::prelude::*;
//!
//! let registry = Registry::new();
//! registry
//!     .register("session.start", |ctx: &HandlerContext<'_>| {
//!         wait_for(ctx.arg::<bool>("ready").copied().unwrap_or(false))?;
//!         Ok(())
//!     }, RegisterOptions::default())
//!     .unwrap();
//! ```
//!
//! Invoking a registration yields an explicit [`Invocation`] rather than
//! relying on unwinding or sentinel errors.

use core::fmt;
use core::sync::atomic::{AtomicBool, Ordering};
use std::error::Error;
use std::sync::Arc;

use crate::args::{ArgValue, Args};
use crate::registry::Registry;
use crate::tags::NameSet;
use crate::toggle::Toggle;

// ─────────────────────────────────────────────────────────────────────────────
// Handler results
// ─────────────────────────────────────────────────────────────────────────────

/// The error half of a [`HandlerResult`].
///
/// Any `std::error::Error + Send + Sync + 'static` converts into
/// [`HandlerError::Failed`], so handlers can use `?` freely.
pub enum HandlerError {
    /// The handler cannot run yet and asks to be retried later in the same
    /// trigger.
    NotNow,
    /// The handler failed.
    Failed(Arc<dyn Error + Send + Sync>),
}

impl<E: Error + Send + Sync + 'static> From<E> for HandlerError {
    fn from(error: E) -> Self {
        HandlerError::Failed(Arc::new(error))
    }
}

impl fmt::Debug for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerError::NotNow => f.write_str("NotNow"),
            HandlerError::Failed(error) => f.debug_tuple("Failed").field(error).finish(),
        }
    }
}

/// Result returned by every handler.
pub type HandlerResult = Result<(), HandlerError>;

/// Defers the current handler until after the other pending handlers ran.
///
/// # Errors
///
/// Always returns [`HandlerError::NotNow`].
pub fn not_now() -> HandlerResult {
    Err(HandlerError::NotNow)
}

/// Defers the current handler unless `condition` holds.
///
/// # Errors
///
/// Returns [`HandlerError::NotNow`] if `condition` is `false`.
pub fn wait_for(condition: bool) -> HandlerResult {
    if condition { Ok(()) } else { not_now() }
}

// ─────────────────────────────────────────────────────────────────────────────
// HandlerFailure
// ─────────────────────────────────────────────────────────────────────────────

/// A handler failure, carrying the original error.
///
/// The error is reference counted, so every copy of a failure (the one
/// reported to the internal failure hook, the one recorded by an exception
/// policy and the one returned to the caller) points at the same error value.
#[derive(Clone)]
pub struct HandlerFailure {
    hook: String,
    registration: RegistrationId,
    error: Arc<dyn Error + Send + Sync>,
}

impl HandlerFailure {
    pub(crate) fn new(
        hook: impl Into<String>,
        registration: RegistrationId,
        error: Arc<dyn Error + Send + Sync>,
    ) -> Self {
        Self {
            hook: hook.into(),
            registration,
            error,
        }
    }

    /// Returns the name of the hook being triggered.
    #[must_use]
    pub fn hook(&self) -> &str {
        &self.hook
    }

    /// Returns the id of the failing registration.
    #[must_use]
    pub fn registration(&self) -> RegistrationId {
        self.registration
    }

    /// Returns the error raised by the handler.
    #[must_use]
    pub fn error(&self) -> &(dyn Error + Send + Sync + 'static) {
        self.error.as_ref()
    }

    /// Returns the handler's error as `E`, if it has that type.
    #[must_use]
    pub fn downcast_ref<E: Error + 'static>(&self) -> Option<&E> {
        self.error.downcast_ref::<E>()
    }

    /// Returns `true` if both failures carry the very same error value.
    #[must_use]
    pub fn same_error(&self, other: &HandlerFailure) -> bool {
        Arc::ptr_eq(&self.error, &other.error)
    }
}

impl fmt::Debug for HandlerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerFailure")
            .field("hook", &self.hook)
            .field("registration", &self.registration)
            .field("error", &self.error)
            .finish()
    }
}

impl fmt::Display for HandlerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "handler {} of hook '{}' failed: {}",
            self.registration, self.hook, self.error
        )
    }
}

impl Error for HandlerFailure {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(self.error.as_ref())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HandlerContext
// ─────────────────────────────────────────────────────────────────────────────

/// Everything a handler receives when it is invoked.
pub struct HandlerContext<'a> {
    registry: &'a Registry,
    hook: &'a str,
    args: &'a Args,
    registration: &'a Registration,
}

impl<'a> HandlerContext<'a> {
    pub(crate) fn new(
        registry: &'a Registry,
        hook: &'a str,
        args: &'a Args,
        registration: &'a Registration,
    ) -> Self {
        Self {
            registry,
            hook,
            args,
            registration,
        }
    }

    /// Returns the registry, so handlers can trigger or (un)register hooks.
    #[must_use]
    pub fn registry(&self) -> &'a Registry {
        self.registry
    }

    /// Returns the full name of the hook being triggered.
    #[must_use]
    pub fn hook(&self) -> &'a str {
        self.hook
    }

    /// Returns the trigger arguments.
    #[must_use]
    pub fn args(&self) -> &'a Args {
        self.args
    }

    /// Returns the argument `name` if it exists and has type `T`.
    #[must_use]
    pub fn arg<T: ArgValue>(&self, name: &str) -> Option<&'a T> {
        self.args.get::<T>(name)
    }

    /// Returns the registration being invoked.
    #[must_use]
    pub fn registration(&self) -> &'a Registration {
        self.registration
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// BoxedHandler
// ─────────────────────────────────────────────────────────────────────────────

/// Type-erased handler function.
pub struct BoxedHandler {
    handler: Box<dyn Fn(&HandlerContext<'_>) -> HandlerResult + Send + Sync>,
    name: &'static str,
}

impl BoxedHandler {
    /// Wraps a handler function.
    #[must_use]
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&HandlerContext<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            name: core::any::type_name::<F>(),
        }
    }

    /// Returns the handler's type name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    fn call(&self, ctx: &HandlerContext<'_>) -> HandlerResult {
        (self.handler)(ctx)
    }
}

impl fmt::Debug for BoxedHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BoxedHandler").field(&self.name).finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// RegisterOptions
// ─────────────────────────────────────────────────────────────────────────────

/// Metadata attached to a registration.
///
/// # Example
///
/// ```
/// use herald_hooks::registration::RegisterOptions;
///
/// let options = RegisterOptions::new()
///     .token("plugin-a")
///     .needs(["db"])
///     .priority(10)
///     .reentrant(false);
/// ```
#[derive(Debug, Clone)]
pub struct RegisterOptions {
    pub(crate) token: Option<String>,
    pub(crate) tags: NameSet,
    pub(crate) needs: NameSet,
    pub(crate) provides: NameSet,
    pub(crate) priority: i32,
    pub(crate) reentrant: bool,
    pub(crate) toggles_on: Option<Toggle>,
    pub(crate) toggles_off: Option<Toggle>,
}

impl Default for RegisterOptions {
    fn default() -> Self {
        Self {
            token: None,
            tags: NameSet::new(),
            needs: NameSet::new(),
            provides: NameSet::new(),
            priority: 0,
            reentrant: true,
            toggles_on: None,
            toggles_off: None,
        }
    }
}

impl RegisterOptions {
    /// Creates default options: no token, tags or dependencies, priority 0,
    /// reentrant.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the grouping token used by token unregistration.
    #[must_use]
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Sets the registration's tags.
    #[must_use]
    pub fn tags(mut self, tags: impl Into<NameSet>) -> Self {
        self.tags = tags.into();
        self
    }

    /// Sets the dependency keys that must be provided before this runs.
    #[must_use]
    pub fn needs(mut self, needs: impl Into<NameSet>) -> Self {
        self.needs = needs.into();
        self
    }

    /// Sets the dependency keys this registration satisfies.
    #[must_use]
    pub fn provides(mut self, provides: impl Into<NameSet>) -> Self {
        self.provides = provides.into();
        self
    }

    /// Sets the priority. Higher priorities run earlier.
    #[must_use]
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Controls whether the handler may run while it is already running.
    #[must_use]
    pub fn reentrant(mut self, reentrant: bool) -> Self {
        self.reentrant = reentrant;
        self
    }

    /// Gates the handler on `toggle`: it runs only if the toggle is off, and
    /// switches it on.
    #[must_use]
    pub fn toggles_on(mut self, toggle: &Toggle) -> Self {
        self.toggles_on = Some(toggle.clone());
        self
    }

    /// Gates the handler on `toggle`: it runs only if the toggle is on, and
    /// switches it off.
    #[must_use]
    pub fn toggles_off(mut self, toggle: &Toggle) -> Self {
        self.toggles_off = Some(toggle.clone());
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Registration
// ─────────────────────────────────────────────────────────────────────────────

/// Identifier of a registration, unique and increasing within a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RegistrationId(pub(crate) u64);

impl RegistrationId {
    /// Returns the raw id.
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Outcome of invoking a registration.
#[derive(Debug)]
pub enum Invocation {
    /// The handler ran to completion or was skipped by a gate.
    Completed,
    /// The handler asked to be retried later in this trigger.
    Deferred,
    /// The handler failed.
    Failed(HandlerFailure),
}

/// One handler bound to one hook.
pub struct Registration {
    id: RegistrationId,
    hook: String,
    handler: Option<BoxedHandler>,
    token: Option<String>,
    tags: NameSet,
    needs: NameSet,
    provides: NameSet,
    priority: i32,
    reentrant: bool,
    toggles_on: Option<Toggle>,
    toggles_off: Option<Toggle>,
    valid: AtomicBool,
    active: AtomicBool,
    in_call: AtomicBool,
}

impl Registration {
    pub(crate) fn new(
        id: RegistrationId,
        hook: impl Into<String>,
        handler: Option<BoxedHandler>,
        options: RegisterOptions,
    ) -> Self {
        Self {
            id,
            hook: hook.into(),
            handler,
            token: options.token,
            tags: options.tags,
            needs: options.needs,
            provides: options.provides,
            priority: options.priority,
            reentrant: options.reentrant,
            toggles_on: options.toggles_on,
            toggles_off: options.toggles_off,
            valid: AtomicBool::new(true),
            active: AtomicBool::new(true),
            in_call: AtomicBool::new(false),
        }
    }

    /// Returns the registration id.
    #[must_use]
    pub fn id(&self) -> RegistrationId {
        self.id
    }

    /// Returns the full name of the hook this registration belongs to.
    #[must_use]
    pub fn hook(&self) -> &str {
        &self.hook
    }

    /// Returns the grouping token, if any.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Returns the registration's tags.
    #[must_use]
    pub fn tags(&self) -> &NameSet {
        &self.tags
    }

    /// Returns the dependency keys this registration needs.
    #[must_use]
    pub fn needs(&self) -> &NameSet {
        &self.needs
    }

    /// Returns the dependency keys this registration provides.
    #[must_use]
    pub fn provides(&self) -> &NameSet {
        &self.provides
    }

    /// Returns the priority.
    #[must_use]
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Returns `true` if the handler may run recursively.
    #[must_use]
    pub fn is_reentrant(&self) -> bool {
        self.reentrant
    }

    /// Returns `true` for placeholder registrations that only provide keys.
    #[must_use]
    pub fn is_no_op(&self) -> bool {
        self.handler.is_none()
    }

    /// Returns the handler's type name, or `None` for no-op registrations.
    #[must_use]
    pub fn handler_name(&self) -> Option<&'static str> {
        self.handler.as_ref().map(BoxedHandler::name)
    }

    /// Returns `false` once the registration was invalidated by token
    /// unregistration.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.valid.load(Ordering::SeqCst)
    }

    /// Returns `true` while the registration is attached to its hook.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Returns `true` while the handler is executing.
    #[must_use]
    pub fn is_being_called(&self) -> bool {
        self.in_call.load(Ordering::SeqCst)
    }

    /// Returns `true` if the registration declares any needs or provides.
    #[must_use]
    pub fn has_dependencies(&self) -> bool {
        !self.needs.is_empty() || !self.provides.is_empty()
    }

    pub(crate) fn invalidate(&self) {
        self.valid.store(false, Ordering::SeqCst);
    }

    /// Marks the registration detached. Returns `false` if it already was.
    pub(crate) fn detach(&self) -> bool {
        self.active.swap(false, Ordering::SeqCst)
    }

    /// Marks the registration as executing.
    ///
    /// Returns `None` when a non-reentrant registration is already running;
    /// the nested call must then be skipped.
    pub(crate) fn enter(&self) -> Option<CallGuard<'_>> {
        let previous = self.in_call.swap(true, Ordering::SeqCst);
        if previous && !self.reentrant {
            return None;
        }
        Some(CallGuard {
            registration: self,
            previous,
        })
    }

    /// Invokes the handler, honouring toggle gates.
    pub(crate) fn invoke(&self, ctx: &HandlerContext<'_>) -> Invocation {
        let Some(handler) = &self.handler else {
            return Invocation::Completed;
        };

        if let Some(toggle) = &self.toggles_on
            && !toggle.switch_to(true)
        {
            tracing::trace!(registration = %self.id, hook = %self.hook, "toggle already on, skipping");
            return Invocation::Completed;
        }
        if let Some(toggle) = &self.toggles_off
            && !toggle.switch_to(false)
        {
            tracing::trace!(registration = %self.id, hook = %self.hook, "toggle already off, skipping");
            return Invocation::Completed;
        }

        match handler.call(ctx) {
            Ok(()) => Invocation::Completed,
            Err(HandlerError::NotNow) => {
                // The retry must see the gate in the state it found it.
                if let Some(toggle) = &self.toggles_on {
                    toggle.off();
                }
                if let Some(toggle) = &self.toggles_off {
                    toggle.on();
                }
                Invocation::Deferred
            }
            Err(HandlerError::Failed(error)) => {
                Invocation::Failed(HandlerFailure::new(self.hook.clone(), self.id, error))
            }
        }
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("id", &self.id)
            .field("hook", &self.hook)
            .field("handler", &self.handler_name())
            .field("token", &self.token)
            .field("tags", &self.tags)
            .field("needs", &self.needs)
            .field("provides", &self.provides)
            .field("priority", &self.priority)
            .field("reentrant", &self.reentrant)
            .field("valid", &self.is_valid())
            .field("active", &self.is_active())
            .finish()
    }
}

/// Resets a registration's in-call flag when dropped.
pub(crate) struct CallGuard<'a> {
    registration: &'a Registration,
    previous: bool,
}

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        self.registration
            .in_call
            .store(self.previous, Ordering::SeqCst);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// RegistrationHandle
// ─────────────────────────────────────────────────────────────────────────────

/// Handle returned by registration, used to unregister later.
#[derive(Debug, Clone)]
pub struct RegistrationHandle {
    registration: Arc<Registration>,
}

impl RegistrationHandle {
    pub(crate) fn new(registration: Arc<Registration>) -> Self {
        Self { registration }
    }

    /// Returns the registration id.
    #[must_use]
    pub fn id(&self) -> RegistrationId {
        self.registration.id()
    }

    /// Returns the full name of the hook.
    #[must_use]
    pub fn hook(&self) -> &str {
        self.registration.hook()
    }

    /// Returns `true` while the registration is attached to its hook.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.registration.is_active()
    }

    /// Returns the registration itself.
    #[must_use]
    pub fn registration(&self) -> &Registration {
        &self.registration
    }

    /// Unregisters from `registry`.
    ///
    /// # Errors
    ///
    /// See [`Registry::unregister`].
    pub fn unregister(&self, registry: &Registry) -> Result<(), crate::error::RegistryError> {
        registry.unregister(self)
    }
}
