//! Hooks: named, ordered lists of registrations.

use core::fmt;
use std::sync::Arc;

use crate::args::{ArgSchema, Args};
use crate::registration::Registration;
use crate::resolver::{self, Dependencies, ResolveError, UnconstrainedPriority};
use crate::tags::NameSet;

impl Dependencies for Registration {
    fn needs(&self) -> &NameSet {
        Registration::needs(self)
    }

    fn provides(&self) -> &NameSet {
        Registration::provides(self)
    }

    fn label(&self) -> String {
        self.id().to_string()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HookDefinition
// ─────────────────────────────────────────────────────────────────────────────

/// Declared shape of a hook, passed to [`Registry::define`](crate::registry::Registry::define).
///
/// # Example
///
/// ```
/// use herald_hooks::prelude::*;
///
/// let definition = HookDefinition::new()
///     .args(ArgSchema::new().typed::<String>("user"))
///     .tags(["audit"])
///     .doc("Called after a user logs in.");
/// ```
#[derive(Debug, Clone, Default)]
pub struct HookDefinition {
    pub(crate) args: Option<ArgSchema>,
    pub(crate) tags: Option<NameSet>,
    pub(crate) deprecated: bool,
    pub(crate) doc: Option<String>,
    pub(crate) can_be_muted: Option<bool>,
}

impl HookDefinition {
    /// Creates an empty definition.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the argument schema, enforced in strict scopes.
    #[must_use]
    pub fn args(mut self, schema: ArgSchema) -> Self {
        self.args = Some(schema);
        self
    }

    /// Sets the tag vocabulary.
    #[must_use]
    pub fn tags(mut self, tags: impl Into<NameSet>) -> Self {
        self.tags = Some(tags.into());
        self
    }

    /// Marks the hook as deprecated. Registering to it logs a warning.
    #[must_use]
    pub fn deprecated(mut self, deprecated: bool) -> Self {
        self.deprecated = deprecated;
        self
    }

    /// Sets the documentation string.
    #[must_use]
    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// Overrides whether the hook can be muted, regardless of its scope.
    #[must_use]
    pub fn can_be_muted(mut self, can_be_muted: bool) -> Self {
        self.can_be_muted = Some(can_be_muted);
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Pre-trigger callbacks
// ─────────────────────────────────────────────────────────────────────────────

/// Identifier of a pre-trigger callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackId(pub(crate) u64);

/// Observer invoked right before each handler invocation attempt.
pub type PreTriggerCallback = Arc<dyn Fn(&Registration, &Args) + Send + Sync>;

// ─────────────────────────────────────────────────────────────────────────────
// Hook
// ─────────────────────────────────────────────────────────────────────────────

/// A named extension point.
///
/// Registrations are kept in call order behind an `Arc`, so a trigger can
/// take a snapshot and run it without holding any registry lock.
pub(crate) struct Hook {
    name: String,
    registrations: Arc<Vec<Arc<Registration>>>,
    no_ops: Vec<Arc<Registration>>,
    unmet: NameSet,
    callbacks: Arc<Vec<(CallbackId, PreTriggerCallback)>>,
    args: Option<ArgSchema>,
    tags: Option<NameSet>,
    defined: bool,
    deprecated: bool,
    doc: Option<String>,
    can_be_muted: Option<bool>,
}

impl Hook {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            registrations: Arc::new(Vec::new()),
            no_ops: Vec::new(),
            unmet: NameSet::new(),
            callbacks: Arc::new(Vec::new()),
            args: None,
            tags: None,
            defined: false,
            deprecated: false,
            doc: None,
            can_be_muted: None,
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn is_defined(&self) -> bool {
        self.defined
    }

    pub(crate) fn is_deprecated(&self) -> bool {
        self.deprecated
    }

    pub(crate) fn args(&self) -> Option<&ArgSchema> {
        self.args.as_ref()
    }

    pub(crate) fn tags(&self) -> Option<&NameSet> {
        self.tags.as_ref()
    }

    pub(crate) fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    pub(crate) fn can_be_muted(&self) -> Option<bool> {
        self.can_be_muted
    }

    pub(crate) fn unmet(&self) -> &NameSet {
        &self.unmet
    }

    /// Applies a definition. The caller has checked the tag vocabulary.
    pub(crate) fn define(&mut self, definition: HookDefinition) {
        self.defined = true;
        self.args = definition.args;
        if definition.tags.is_some() {
            self.tags = definition.tags;
        }
        self.deprecated = definition.deprecated;
        self.doc = definition.doc;
        self.can_be_muted = definition.can_be_muted;
    }

    pub(crate) fn set_tags(&mut self, tags: NameSet) {
        self.tags = Some(tags);
    }

    /// Returns the registrations in call order.
    pub(crate) fn snapshot(&self) -> Arc<Vec<Arc<Registration>>> {
        Arc::clone(&self.registrations)
    }

    pub(crate) fn no_ops(&self) -> &[Arc<Registration>] {
        &self.no_ops
    }

    pub(crate) fn callbacks(&self) -> Arc<Vec<(CallbackId, PreTriggerCallback)>> {
        Arc::clone(&self.callbacks)
    }

    /// Every attached registration, executable ones first.
    pub(crate) fn all(&self) -> impl Iterator<Item = &Arc<Registration>> {
        self.registrations.iter().chain(self.no_ops.iter())
    }

    /// Adds a registration, recomputing the call order.
    ///
    /// On failure the hook is left unchanged.
    pub(crate) fn add(
        &mut self,
        registration: Arc<Registration>,
        unconstrained: UnconstrainedPriority,
    ) -> Result<(), ResolveError> {
        let mut all: Vec<Arc<Registration>> = self.all().cloned().collect();
        all.push(registration);
        self.reorder(all, unconstrained)
    }

    /// Removes the registrations matching `remove`, returning them.
    pub(crate) fn remove_where(
        &mut self,
        unconstrained: UnconstrainedPriority,
        remove: impl Fn(&Registration) -> bool,
    ) -> Result<Vec<Arc<Registration>>, ResolveError> {
        let (removed, kept): (Vec<_>, Vec<_>) =
            self.all().cloned().partition(|registration| remove(&**registration));
        if !removed.is_empty() {
            self.reorder(kept, unconstrained)?;
        }
        Ok(removed)
    }

    /// Recomputes the call order with the current registrations.
    pub(crate) fn recompute(&mut self, unconstrained: UnconstrainedPriority) -> Result<(), ResolveError> {
        let all = self.all().cloned().collect();
        self.reorder(all, unconstrained)
    }

    /// Checks that the registrations can be ordered under `unconstrained`.
    pub(crate) fn check_order(&self, unconstrained: UnconstrainedPriority) -> Result<(), ResolveError> {
        resolver::resolve(Self::sorted_by_priority(self.all().cloned().collect()), unconstrained)
            .map(|_| ())
    }

    fn sorted_by_priority(mut all: Vec<Arc<Registration>>) -> Vec<Arc<Registration>> {
        all.sort_by(|a, b| {
            b.priority()
                .cmp(&a.priority())
                .then_with(|| a.id().cmp(&b.id()))
        });
        all
    }

    fn reorder(
        &mut self,
        all: Vec<Arc<Registration>>,
        unconstrained: UnconstrainedPriority,
    ) -> Result<(), ResolveError> {
        let ordered = resolver::resolve(Self::sorted_by_priority(all), unconstrained)?;
        let unmet = resolver::unmet_needs(ordered.iter().map(|registration| &**registration));
        let (no_ops, registrations): (Vec<_>, Vec<_>) =
            ordered.into_iter().partition(|registration| registration.is_no_op());

        if !unmet.is_empty() {
            tracing::debug!(hook = %self.name, missing = %unmet, "hook has unmet dependencies");
        }
        self.registrations = Arc::new(registrations);
        self.no_ops = no_ops;
        self.unmet = unmet;
        Ok(())
    }

    pub(crate) fn add_callback(&mut self, id: CallbackId, callback: PreTriggerCallback) {
        let mut callbacks = Vec::clone(&self.callbacks);
        callbacks.push((id, callback));
        self.callbacks = Arc::new(callbacks);
    }

    pub(crate) fn remove_callback(&mut self, id: CallbackId) -> bool {
        if !self.callbacks.iter().any(|(existing, _)| *existing == id) {
            return false;
        }
        let callbacks = self
            .callbacks
            .iter()
            .filter(|(existing, _)| *existing != id)
            .cloned()
            .collect();
        self.callbacks = Arc::new(callbacks);
        true
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hook")
            .field("name", &self.name)
            .field("registrations", &self.registrations.len())
            .field("no_ops", &self.no_ops.len())
            .field("unmet", &self.unmet)
            .field("defined", &self.defined)
            .field("tags", &self.tags)
            .finish_non_exhaustive()
    }
}
