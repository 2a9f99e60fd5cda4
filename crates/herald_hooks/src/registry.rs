//! The hook registry.
//!
//! [`Registry`] is the explicit owner of every hook, registration, scope,
//! mute frame and cached policy. There is no process-global state: create a
//! registry, share it by reference, and route every operation through it.
//!
//! # Thread Safety
//!
//! The registry uses interior mutability via [`RwLock`] so that handlers,
//! which receive `&Registry`, can register, unregister and trigger while a
//! trigger is in flight. No lock is held while handlers or pre-trigger
//! callbacks run.
//!
//! # Example
//!
//! ```
//! use herald_hooks::prelude::*;
//!
//! let registry = Registry::new();
//! registry
//!     .register("app.started", |_ctx: &HandlerContext<'_>| Ok(()), RegisterOptions::new())
//!     .unwrap();
//! registry.trigger("app.started", Args::new()).unwrap();
//! ```

use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use hashbrown::{HashMap, HashSet};
use parking_lot::{Mutex, RwLock};

use crate::args::Args;
use crate::error::RegistryError;
use crate::hook::{CallbackId, Hook, HookDefinition};
use crate::policy::ExceptionPolicy;
use crate::registration::{
    BoxedHandler, HandlerContext, HandlerResult, RegisterOptions, Registration, RegistrationHandle,
    RegistrationId,
};
use crate::resolver::UnconstrainedPriority;
use crate::scope::{ROOT, Scope, ScopeTree, ancestors, scope_of};
use crate::tags::{NameSet, unsupported_tags};

// ─────────────────────────────────────────────────────────────────────────────
// State
// ─────────────────────────────────────────────────────────────────────────────

/// Everything guarded by the registry lock.
pub(crate) struct State {
    pub(crate) hooks: HashMap<String, Hook>,
    pub(crate) scopes: ScopeTree,
}

impl State {
    /// Strictness of `scope`, taken from its nearest existing ancestor.
    pub(crate) fn effective_strict(&self, scope: &str) -> bool {
        ancestors(scope)
            .find_map(|name| self.scopes.get(name))
            .is_some_and(Scope::is_strict)
    }

    /// Unconstrained priority of `scope`, taken from its nearest existing
    /// ancestor.
    pub(crate) fn effective_unconstrained(&self, scope: &str) -> UnconstrainedPriority {
        ancestors(scope)
            .find_map(|name| self.scopes.get(name))
            .map_or(UnconstrainedPriority::DontCare, Scope::unconstrained_priority)
    }

    /// A hook name must not collide with a scope, and its scope path must not
    /// collide with a hook.
    fn check_hook_name(&self, name: &str) -> Result<(), RegistryError> {
        if name.is_empty() || self.scopes.contains(name) {
            return Err(RegistryError::NameAlreadyUsed(name.to_owned()));
        }
        self.check_scope_name(scope_of(name))
    }

    fn check_scope_name(&self, name: &str) -> Result<(), RegistryError> {
        match ancestors(name).find(|scope| self.hooks.contains_key(*scope)) {
            Some(hook) => Err(RegistryError::NameAlreadyUsed(hook.to_owned())),
            None => Ok(()),
        }
    }

    fn hook_can_be_muted(&self, name: &str, hook: &Hook) -> bool {
        hook.can_be_muted()
            .unwrap_or_else(|| !self.scopes.muting_forbidden(scope_of(name)))
    }

    /// Returns the name that prevents muting `name`, if any.
    ///
    /// Muting a scope mutes every hook below it, so the whole subtree must
    /// allow it.
    pub(crate) fn muting_blocker(&self, name: &str) -> Option<String> {
        if let Some(hook) = self.hooks.get(name) {
            return (!self.hook_can_be_muted(name, hook)).then(|| name.to_owned());
        }
        if let Some(scope) = ancestors(name).find(|scope| {
            self.scopes.get(scope).is_some_and(Scope::forbids_muting)
        }) {
            return Some(scope.to_owned());
        }
        if let Some(scope) = self
            .scopes
            .subtree(name)
            .into_iter()
            .find(|scope| self.scopes.get(scope).is_some_and(Scope::forbids_muting))
        {
            return Some(scope);
        }
        let mut hooks = self.scopes.hooks_in_subtree(name);
        hooks.sort();
        hooks.into_iter().find(|hook| {
            self.hooks
                .get(hook)
                .is_some_and(|found| !self.hook_can_be_muted(hook, found))
        })
    }

    /// Checks every hook in the subtree against strict-mode rules.
    fn validate_strict(&self, scope: &str) -> Result<(), RegistryError> {
        let mut hooks = self.scopes.hooks_in_subtree(scope);
        hooks.sort();
        for name in hooks {
            let Some(hook) = self.hooks.get(&name) else {
                continue;
            };
            if !hook.is_defined() {
                return Err(RegistryError::UndefinedHook(name));
            }
            for registration in hook.all() {
                let tags = unsupported_tags(registration.tags(), hook.tags());
                if !tags.is_empty() {
                    return Err(RegistryError::UnsupportedTags { hook: name, tags });
                }
            }
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────────────────────────────────────

/// Owner of all hooks, registrations and scopes.
pub struct Registry {
    pub(crate) state: RwLock<State>,
    pub(crate) mutes: Mutex<Vec<HashSet<String>>>,
    next_id: AtomicU64,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        let mut hooks: Vec<&Hook> = state.hooks.values().collect();
        hooks.sort_by(|a, b| a.name().cmp(b.name()));
        f.debug_struct("Registry")
            .field("hooks", &hooks)
            .field("mute_depth", &self.mutes.lock().len())
            .finish_non_exhaustive()
    }
}

impl Registry {
    /// Creates an empty registry with only the root scope.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State {
                hooks: HashMap::new(),
                scopes: ScopeTree::new(),
            }),
            mutes: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Hooks
    // ─────────────────────────────────────────────────────────────────────

    /// Defines a hook, creating it and its scopes if needed.
    ///
    /// Defining is what allows a hook to be used in a strict scope.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::NameAlreadyUsed`] if the name collides with a scope
    /// - [`RegistryError::HookAlreadyDefined`] if the hook was defined before
    /// - [`RegistryError::TagsAlreadySet`] if the definition carries tags and
    ///   the hook already has a vocabulary
    pub fn define(&self, name: &str, definition: HookDefinition) -> Result<&Self, RegistryError> {
        let mut state = self.state.write();
        state.check_hook_name(name)?;
        if let Some(hook) = state.hooks.get(name) {
            if hook.is_defined() {
                return Err(RegistryError::HookAlreadyDefined(name.to_owned()));
            }
            if definition.tags.is_some() && hook.tags().is_some() {
                return Err(RegistryError::TagsAlreadySet(name.to_owned()));
            }
        }

        let State { hooks, scopes } = &mut *state;
        let is_new = !hooks.contains_key(name);
        hooks
            .entry(name.to_owned())
            .or_insert_with(|| Hook::new(name))
            .define(definition);
        if is_new {
            scopes.attach_hook(name);
        }
        tracing::debug!(hook = name, "hook defined");
        Ok(self)
    }

    /// Removes a hook from the registry and from its scope.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::HookNotFound`] if there is no such hook.
    pub fn undefine(&self, name: &str) -> Result<(), RegistryError> {
        let mut state = self.state.write();
        let hook = state
            .hooks
            .remove(name)
            .ok_or_else(|| RegistryError::HookNotFound(name.to_owned()))?;
        state.scopes.detach_hook(name);
        for registration in hook.all() {
            registration.detach();
        }
        tracing::debug!(hook = name, "hook undefined");
        Ok(())
    }

    /// Sets the tag vocabulary of a hook. Allowed once per hook.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::HookNotFound`] if there is no such hook
    /// - [`RegistryError::TagsAlreadySet`] if the vocabulary was already set
    pub fn set_tags(&self, name: &str, tags: impl Into<NameSet>) -> Result<(), RegistryError> {
        let mut state = self.state.write();
        let hook = state
            .hooks
            .get_mut(name)
            .ok_or_else(|| RegistryError::HookNotFound(name.to_owned()))?;
        if hook.tags().is_some() {
            return Err(RegistryError::TagsAlreadySet(name.to_owned()));
        }
        hook.set_tags(tags.into());
        Ok(())
    }

    /// Registers a handler to a hook.
    ///
    /// Outside strict scopes the hook is created on first use.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::NameAlreadyUsed`] if the name collides with a scope
    /// - [`RegistryError::UndefinedHook`] in a strict scope, for undefined hooks
    /// - [`RegistryError::UnsupportedTags`] in a strict scope, for tags
    ///   outside the hook's vocabulary
    /// - [`RegistryError::CannotResolveDependencies`] if the needs/provides
    ///   declarations form a cycle; the hook is left unchanged
    pub fn register<F>(
        &self,
        name: &str,
        handler: F,
        options: RegisterOptions,
    ) -> Result<RegistrationHandle, RegistryError>
    where
        F: Fn(&HandlerContext<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        self.add_registration(name, Some(BoxedHandler::new(handler)), options)
    }

    /// Registers a placeholder that provides dependency keys but never runs.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NoOpWithNeeds`] if `options` declares needs,
    /// plus every error of [`register`](Self::register).
    pub fn register_no_op(
        &self,
        name: &str,
        options: RegisterOptions,
    ) -> Result<RegistrationHandle, RegistryError> {
        if !options.needs.is_empty() {
            return Err(RegistryError::NoOpWithNeeds(name.to_owned()));
        }
        self.add_registration(name, None, options)
    }

    fn add_registration(
        &self,
        name: &str,
        handler: Option<BoxedHandler>,
        options: RegisterOptions,
    ) -> Result<RegistrationHandle, RegistryError> {
        let mut state = self.state.write();
        state.check_hook_name(name)?;
        let scope = scope_of(name);
        let unconstrained = state.effective_unconstrained(scope);
        let existing = state.hooks.get(name);

        if state.effective_strict(scope) {
            let Some(hook) = existing.filter(|hook| hook.is_defined()) else {
                return Err(RegistryError::UndefinedHook(name.to_owned()));
            };
            let tags = unsupported_tags(&options.tags, hook.tags());
            if !tags.is_empty() {
                return Err(RegistryError::UnsupportedTags {
                    hook: name.to_owned(),
                    tags,
                });
            }
        }
        let deprecated = existing.is_some_and(Hook::is_deprecated);
        let is_new = existing.is_none();

        let registration = Arc::new(Registration::new(
            RegistrationId(self.next_id()),
            name,
            handler,
            options,
        ));

        let State { hooks, scopes } = &mut *state;
        let hook = hooks
            .entry(name.to_owned())
            .or_insert_with(|| Hook::new(name));
        if let Err(source) = hook.add(Arc::clone(&registration), unconstrained) {
            if is_new {
                hooks.remove(name);
            }
            return Err(RegistryError::CannotResolveDependencies {
                hook: name.to_owned(),
                source,
            });
        }
        if is_new {
            scopes.attach_hook(name);
        }
        drop(state);

        if deprecated {
            tracing::warn!(hook = name, "registering to deprecated hook");
        }
        tracing::trace!(
            hook = name,
            registration = %registration.id(),
            handler = registration.handler_name().unwrap_or("<no-op>"),
            "registered"
        );
        Ok(RegistrationHandle::new(registration))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Unregistration
    // ─────────────────────────────────────────────────────────────────────

    /// Detaches one registration from its hook.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotRegistered`] if the registration is no
    /// longer attached, for example because it was already unregistered.
    pub fn unregister(&self, handle: &RegistrationHandle) -> Result<(), RegistryError> {
        let name = handle.hook();
        let id = handle.id();
        let not_registered = || RegistryError::NotRegistered {
            hook: name.to_owned(),
            id,
        };

        let mut state = self.state.write();
        let unconstrained = state.effective_unconstrained(scope_of(name));
        let hook = state.hooks.get_mut(name).ok_or_else(not_registered)?;
        let removed = hook
            .remove_where(unconstrained, |registration| registration.id() == id)
            .map_err(|source| RegistryError::CannotResolveDependencies {
                hook: name.to_owned(),
                source,
            })?;
        if removed.is_empty() {
            return Err(not_registered());
        }
        for registration in removed {
            registration.detach();
        }
        tracing::trace!(hook = name, registration = %id, "unregistered");
        Ok(())
    }

    /// Detaches every registration of a hook. Does nothing for unknown or
    /// empty hooks.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::CannotResolveDependencies`] only if the
    /// remaining set cannot be ordered, which cannot happen for an empty set.
    pub fn unregister_all(&self, name: &str) -> Result<(), RegistryError> {
        let mut state = self.state.write();
        let unconstrained = state.effective_unconstrained(scope_of(name));
        let Some(hook) = state.hooks.get_mut(name) else {
            return Ok(());
        };
        let removed = hook.remove_where(unconstrained, |_| true).map_err(|source| {
            RegistryError::CannotResolveDependencies {
                hook: name.to_owned(),
                source,
            }
        })?;
        for registration in removed {
            registration.detach();
        }
        Ok(())
    }

    /// Invalidates and detaches every registration carrying `token`.
    ///
    /// Invalidated registrations are skipped by triggers already in flight.
    /// Returns the number of registrations removed.
    ///
    /// # Errors
    ///
    /// See [`unregister_token_in`](Self::unregister_token_in).
    pub fn unregister_token(&self, token: &str) -> Result<usize, RegistryError> {
        self.unregister_token_in(ROOT, token)
    }

    /// Like [`unregister_token`](Self::unregister_token), limited to the
    /// hooks under `scope`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::ScopeNotFound`] if the scope does not exist.
    pub fn unregister_token_in(&self, scope: &str, token: &str) -> Result<usize, RegistryError> {
        let mut state = self.state.write();
        if !state.scopes.contains(scope) {
            return Err(RegistryError::ScopeNotFound(scope.to_owned()));
        }
        let mut count = 0;
        for name in state.scopes.hooks_in_subtree(scope) {
            let unconstrained = state.effective_unconstrained(scope_of(&name));
            let Some(hook) = state.hooks.get_mut(&name) else {
                continue;
            };
            let removed = hook
                .remove_where(unconstrained, |registration| registration.token() == Some(token))
                .map_err(|source| RegistryError::CannotResolveDependencies {
                    hook: name.clone(),
                    source,
                })?;
            for registration in &removed {
                registration.invalidate();
                registration.detach();
            }
            count += removed.len();
        }
        tracing::debug!(scope, token, count, "unregistered token");
        Ok(count)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Pre-trigger callbacks
    // ─────────────────────────────────────────────────────────────────────

    /// Adds an observer called right before each handler of `name` runs.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::HookNotFound`] if there is no such hook.
    pub fn add_pre_trigger_callback<F>(&self, name: &str, callback: F) -> Result<CallbackId, RegistryError>
    where
        F: Fn(&Registration, &Args) + Send + Sync + 'static,
    {
        let id = CallbackId(self.next_id());
        self.state
            .write()
            .hooks
            .get_mut(name)
            .ok_or_else(|| RegistryError::HookNotFound(name.to_owned()))?
            .add_callback(id, Arc::new(callback));
        Ok(id)
    }

    /// Removes a pre-trigger callback. Returns `false` if it was not found.
    pub fn remove_pre_trigger_callback(&self, name: &str, id: CallbackId) -> bool {
        self.state
            .write()
            .hooks
            .get_mut(name)
            .is_some_and(|hook| hook.remove_callback(id))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Introspection
    // ─────────────────────────────────────────────────────────────────────

    /// Returns `true` if a hook called `name` exists.
    #[must_use]
    pub fn contains_hook(&self, name: &str) -> bool {
        self.state.read().hooks.contains_key(name)
    }

    /// Returns `true` if the hook exists and was explicitly defined.
    #[must_use]
    pub fn is_defined(&self, name: &str) -> bool {
        self.state.read().hooks.get(name).is_some_and(Hook::is_defined)
    }

    /// Returns all hook names, sorted.
    #[must_use]
    pub fn hook_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.read().hooks.keys().cloned().collect();
        names.sort();
        names
    }

    /// Returns the executable registrations of a hook in call order.
    #[must_use]
    pub fn registrations(&self, name: &str) -> Vec<Arc<Registration>> {
        self.state
            .read()
            .hooks
            .get(name)
            .map(|hook| hook.snapshot().iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns the no-op placeholders of a hook.
    #[must_use]
    pub fn no_op_registrations(&self, name: &str) -> Vec<Arc<Registration>> {
        self.state
            .read()
            .hooks
            .get(name)
            .map(|hook| hook.no_ops().to_vec())
            .unwrap_or_default()
    }

    /// Returns every registration in the registry, grouped by hook name.
    #[must_use]
    pub fn all_registrations(&self) -> Vec<Arc<Registration>> {
        let state = self.state.read();
        let mut hooks: Vec<&Hook> = state.hooks.values().collect();
        hooks.sort_by(|a, b| a.name().cmp(b.name()));
        hooks
            .into_iter()
            .flat_map(|hook| hook.all().cloned())
            .collect()
    }

    /// Returns the keys needed by the hook's registrations that nobody
    /// provides.
    #[must_use]
    pub fn unmet_dependencies(&self, name: &str) -> NameSet {
        self.state
            .read()
            .hooks
            .get(name)
            .map(|hook| hook.unmet().clone())
            .unwrap_or_default()
    }

    /// Returns the hook's tag vocabulary.
    #[must_use]
    pub fn hook_tags(&self, name: &str) -> Option<NameSet> {
        self.state.read().hooks.get(name)?.tags().cloned()
    }

    /// Returns the hook's documentation string.
    #[must_use]
    pub fn hook_doc(&self, name: &str) -> Option<String> {
        self.state
            .read()
            .hooks
            .get(name)?
            .doc()
            .map(str::to_owned)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Scopes
    // ─────────────────────────────────────────────────────────────────────

    /// Makes sure the scope and its ancestors exist.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NameAlreadyUsed`] if the name or an ancestor
    /// is a hook.
    pub fn get_or_create_scope(&self, name: &str) -> Result<(), RegistryError> {
        let mut state = self.state.write();
        state.check_scope_name(name)?;
        state.scopes.get_or_create(name);
        Ok(())
    }

    /// Creates a new scope.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NameAlreadyUsed`] if the scope exists or the
    /// name or an ancestor is a hook.
    pub fn create_scope(&self, name: &str) -> Result<(), RegistryError> {
        let mut state = self.state.write();
        if state.scopes.contains(name) {
            return Err(RegistryError::NameAlreadyUsed(name.to_owned()));
        }
        state.check_scope_name(name)?;
        state.scopes.get_or_create(name);
        Ok(())
    }

    /// Returns `true` if the scope exists.
    #[must_use]
    pub fn contains_scope(&self, name: &str) -> bool {
        self.state.read().scopes.contains(name)
    }

    /// Removes a scope, its subscopes and every hook inside them.
    ///
    /// Undefining the root scope resets the registry.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::ScopeNotFound`] if the scope does not exist.
    pub fn undefine_scope(&self, name: &str) -> Result<(), RegistryError> {
        let mut state = self.state.write();
        for hook in state.scopes.remove_subtree(name)? {
            if let Some(hook) = state.hooks.remove(&hook) {
                for registration in hook.all() {
                    registration.detach();
                }
            }
        }
        tracing::debug!(scope = name, "scope undefined");
        Ok(())
    }

    /// Sets strictness on a scope and all of its subscopes, creating the
    /// scope if needed.
    ///
    /// # Errors
    ///
    /// When enabling, returns [`RegistryError::UndefinedHook`] or
    /// [`RegistryError::UnsupportedTags`] for the first hook in the subtree
    /// that breaks the rules; nothing changes in that case.
    pub fn set_strict(&self, name: &str, strict: bool) -> Result<(), RegistryError> {
        let mut state = self.state.write();
        state.check_scope_name(name)?;
        if strict && state.scopes.contains(name) {
            state.validate_strict(name)?;
        }
        state.scopes.get_or_create(name);
        state.scopes.set_strict(name, strict)
    }

    /// Returns `true` if the scope (or its nearest existing ancestor) is
    /// strict.
    #[must_use]
    pub fn is_strict(&self, name: &str) -> bool {
        self.state.read().effective_strict(name)
    }

    /// Sets a scope's exception policy. `None` inherits from the parent.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::RootCannotInherit`] for `None` on the root scope
    /// - [`RegistryError::NameAlreadyUsed`] if the name or an ancestor is a hook
    pub fn set_exception_policy(
        &self,
        name: &str,
        policy: Option<ExceptionPolicy>,
    ) -> Result<(), RegistryError> {
        if name == ROOT && policy.is_none() {
            return Err(RegistryError::RootCannotInherit);
        }
        let mut state = self.state.write();
        state.check_scope_name(name)?;
        state.scopes.get_or_create(name);
        state.scopes.set_policy(name, policy)
    }

    /// Returns the resolved exception policy of a scope.
    #[must_use]
    pub fn exception_policy(&self, name: &str) -> ExceptionPolicy {
        self.state.read().scopes.resolve_policy(name)
    }

    /// Returns the policy set on the scope itself, `None` when it inherits or
    /// the scope does not exist.
    #[must_use]
    pub fn own_exception_policy(&self, name: &str) -> Option<ExceptionPolicy> {
        self.state.read().scopes.get(name).and_then(Scope::own_policy)
    }

    /// Sets where handlers without needs/provides run, for a scope and its
    /// subscopes, and recomputes the call order of every affected hook.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::CannotResolveDependencies`] if some hook could
    /// not be ordered; nothing changes in that case.
    pub fn set_unconstrained_priority(
        &self,
        name: &str,
        unconstrained: UnconstrainedPriority,
    ) -> Result<(), RegistryError> {
        let mut state = self.state.write();
        state.check_scope_name(name)?;
        let hooks = if state.scopes.contains(name) {
            state.scopes.hooks_in_subtree(name)
        } else {
            Vec::new()
        };
        for hook_name in &hooks {
            if let Some(hook) = state.hooks.get(hook_name) {
                hook.check_order(unconstrained).map_err(|source| {
                    RegistryError::CannotResolveDependencies {
                        hook: hook_name.clone(),
                        source,
                    }
                })?;
            }
        }

        state.scopes.get_or_create(name);
        state.scopes.set_unconstrained(name, unconstrained)?;
        for hook_name in &hooks {
            if let Some(hook) = state.hooks.get_mut(hook_name) {
                hook.recompute(unconstrained).map_err(|source| {
                    RegistryError::CannotResolveDependencies {
                        hook: hook_name.clone(),
                        source,
                    }
                })?;
            }
        }
        Ok(())
    }

    /// Returns the unconstrained priority in effect for a scope.
    #[must_use]
    pub fn unconstrained_priority(&self, name: &str) -> UnconstrainedPriority {
        self.state.read().effective_unconstrained(name)
    }

    /// Forbids (or allows again) muting hooks under a scope.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NameAlreadyUsed`] if the name or an ancestor
    /// is a hook.
    pub fn set_forbid_muting(&self, name: &str, forbid: bool) -> Result<(), RegistryError> {
        let mut state = self.state.write();
        state.check_scope_name(name)?;
        state.scopes.get_or_create(name);
        state.scopes.set_forbid_muting(name, forbid)
    }

    /// Returns the hooks under a scope that were never defined, sorted.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::ScopeNotFound`] if the scope does not exist.
    pub fn undefined_hooks(&self, name: &str) -> Result<Vec<String>, RegistryError> {
        let state = self.state.read();
        if !state.scopes.contains(name) {
            return Err(RegistryError::ScopeNotFound(name.to_owned()));
        }
        let mut hooks: Vec<String> = state
            .scopes
            .hooks_in_subtree(name)
            .into_iter()
            .filter(|hook| state.hooks.get(hook).is_some_and(|hook| !hook.is_defined()))
            .collect();
        hooks.sort();
        Ok(hooks)
    }

    /// Returns the full names of the scope's direct subscopes.
    #[must_use]
    pub fn subscopes(&self, name: &str) -> Vec<String> {
        self.state
            .read()
            .scopes
            .get(name)
            .map(|scope| scope.subscopes().map(str::to_owned).collect())
            .unwrap_or_default()
    }

    /// Returns the full names of the hooks directly in a scope, sorted.
    #[must_use]
    pub fn scope_hooks(&self, name: &str) -> Vec<String> {
        self.state
            .read()
            .scopes
            .get(name)
            .map(|scope| scope.hooks().map(str::to_owned).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(_ctx: &HandlerContext<'_>) -> HandlerResult {
        Ok(())
    }

    #[test]
    fn register_creates_hook_and_scopes() {
        let registry = Registry::new();
        registry.register("a.b.c", ok, RegisterOptions::new()).unwrap();
        assert!(registry.contains_hook("a.b.c"));
        assert!(registry.contains_scope("a"));
        assert!(registry.contains_scope("a.b"));
        assert!(!registry.is_defined("a.b.c"));
        assert_eq!(registry.undefined_hooks("a").unwrap(), vec!["a.b.c".to_owned()]);
        assert_eq!(registry.subscopes("a"), vec!["a.b".to_owned()]);
    }

    #[test]
    fn scope_introspection_reports_own_settings() {
        let registry = Registry::new();
        registry.register("a.y", ok, RegisterOptions::new()).unwrap();
        registry.register("a.x", ok, RegisterOptions::new()).unwrap();
        registry.register("a.b.z", ok, RegisterOptions::new()).unwrap();
        assert_eq!(registry.scope_hooks("a"), vec!["a.x".to_owned(), "a.y".to_owned()]);
        assert!(registry.scope_hooks("missing").is_empty());

        assert_eq!(
            registry.own_exception_policy(ROOT),
            Some(ExceptionPolicy::RaiseImmediately)
        );
        assert_eq!(registry.own_exception_policy("a"), None);
        registry
            .set_exception_policy("a", Some(ExceptionPolicy::Ignore))
            .unwrap();
        assert_eq!(registry.own_exception_policy("a"), Some(ExceptionPolicy::Ignore));
        assert_eq!(registry.own_exception_policy("a.b"), None);
        assert_eq!(registry.exception_policy("a.b"), ExceptionPolicy::Ignore);
    }

    #[test]
    fn hook_and_scope_names_cannot_collide() {
        let registry = Registry::new();
        registry.register("a.b", ok, RegisterOptions::new()).unwrap();
        assert_eq!(
            registry.register("a", ok, RegisterOptions::new()).unwrap_err(),
            RegistryError::NameAlreadyUsed("a".into())
        );
        assert_eq!(
            registry.register("a.b.c", ok, RegisterOptions::new()).unwrap_err(),
            RegistryError::NameAlreadyUsed("a.b".into())
        );
    }

    #[test]
    fn define_twice_fails() {
        let registry = Registry::new();
        registry
            .define("x", HookDefinition::new().doc("docs"))
            .unwrap()
            .define("y", HookDefinition::new())
            .unwrap();
        assert_eq!(
            registry.define("x", HookDefinition::new()).unwrap_err(),
            RegistryError::HookAlreadyDefined("x".into())
        );
        assert_eq!(registry.hook_doc("x").as_deref(), Some("docs"));
        assert_eq!(registry.hook_names(), vec!["x".to_owned(), "y".to_owned()]);
    }

    #[test]
    fn tags_can_be_set_once() {
        let registry = Registry::new();
        registry.define("x", HookDefinition::new()).unwrap();
        registry.set_tags("x", ["a"]).unwrap();
        assert_eq!(
            registry.set_tags("x", ["b"]).unwrap_err(),
            RegistryError::TagsAlreadySet("x".into())
        );
        assert_eq!(registry.hook_tags("x"), Some(NameSet::from(["a"])));
        assert_eq!(
            registry.set_tags("missing", ["b"]).unwrap_err(),
            RegistryError::HookNotFound("missing".into())
        );
    }

    #[test]
    fn undefine_detaches_registrations() {
        let registry = Registry::new();
        let handle = registry.register("x", ok, RegisterOptions::new()).unwrap();
        registry.undefine("x").unwrap();
        assert!(!handle.is_active());
        assert!(!registry.contains_hook("x"));
        assert!(matches!(
            registry.unregister(&handle),
            Err(RegistryError::NotRegistered { .. })
        ));
    }

    #[test]
    fn no_op_with_needs_is_rejected() {
        let registry = Registry::new();
        assert_eq!(
            registry
                .register_no_op("x", RegisterOptions::new().needs(["a"]))
                .unwrap_err(),
            RegistryError::NoOpWithNeeds("x".into())
        );
        assert!(!registry.contains_hook("x"));
    }

    #[test]
    fn unregister_token_in_is_scoped() {
        let registry = Registry::new();
        registry
            .register("a.x", ok, RegisterOptions::new().token("t"))
            .unwrap();
        registry
            .register("b.x", ok, RegisterOptions::new().token("t"))
            .unwrap();
        assert_eq!(registry.unregister_token_in("a", "t").unwrap(), 1);
        assert!(registry.registrations("a.x").is_empty());
        assert_eq!(registry.registrations("b.x").len(), 1);
        assert_eq!(registry.unregister_token("t").unwrap(), 1);
        assert!(matches!(
            registry.unregister_token_in("missing", "t"),
            Err(RegistryError::ScopeNotFound(_))
        ));
    }

    #[test]
    fn undefine_scope_removes_hooks() {
        let registry = Registry::new();
        registry.register("a.b.x", ok, RegisterOptions::new()).unwrap();
        registry.register("c", ok, RegisterOptions::new()).unwrap();
        registry.undefine_scope("a").unwrap();
        assert!(!registry.contains_hook("a.b.x"));
        assert!(!registry.contains_scope("a.b"));
        assert!(registry.contains_hook("c"));
        assert!(registry.undefine_scope("a").is_err());
    }

    #[test]
    fn strict_registration_requires_definition() {
        let registry = Registry::new();
        registry.set_strict("s", true).unwrap();
        assert_eq!(
            registry.register("s.x", ok, RegisterOptions::new()).unwrap_err(),
            RegistryError::UndefinedHook("s.x".into())
        );
        assert!(!registry.contains_hook("s.x"));
        registry.define("s.x", HookDefinition::new().tags(["t"])).unwrap();
        registry
            .register("s.x", ok, RegisterOptions::new().tags(["t"]))
            .unwrap();
        assert!(matches!(
            registry.register("s.x", ok, RegisterOptions::new().tags(["u"])),
            Err(RegistryError::UnsupportedTags { .. })
        ));
    }

    #[test]
    fn enabling_strict_validates_first() {
        let registry = Registry::new();
        registry.register("s.x", ok, RegisterOptions::new()).unwrap();
        registry.set_strict("s", false).unwrap();
        assert_eq!(
            registry.set_strict("s", true).unwrap_err(),
            RegistryError::UndefinedHook("s.x".into())
        );
        assert!(!registry.is_strict("s"));
    }

    #[test]
    fn strictness_propagates_to_new_and_existing_subscopes() {
        let registry = Registry::new();
        registry.get_or_create_scope("a.b").unwrap();
        registry.set_strict("a", true).unwrap();
        assert!(registry.is_strict("a.b"));
        registry.get_or_create_scope("a.c").unwrap();
        assert!(registry.is_strict("a.c"));
        assert!(registry.is_strict("a.d.e"));
        registry.set_strict("a", false).unwrap();
        assert!(!registry.is_strict("a.b"));
    }

    #[test]
    fn create_scope_rejects_existing() {
        let registry = Registry::new();
        registry.create_scope("a").unwrap();
        assert_eq!(
            registry.create_scope("a").unwrap_err(),
            RegistryError::NameAlreadyUsed("a".into())
        );
    }

    #[test]
    fn callbacks_require_hook() {
        let registry = Registry::new();
        assert!(matches!(
            registry.add_pre_trigger_callback("x", |_: &Registration, _: &Args| {}),
            Err(RegistryError::HookNotFound(_))
        ));
        registry.register("x", ok, RegisterOptions::new()).unwrap();
        let id = registry
            .add_pre_trigger_callback("x", |_: &Registration, _: &Args| {})
            .unwrap();
        assert!(registry.remove_pre_trigger_callback("x", id));
        assert!(!registry.remove_pre_trigger_callback("x", id));
    }
}
