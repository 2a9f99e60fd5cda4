//! The dotted scope tree.
//!
//! Every hook lives in a scope derived from its name: `a.b.c` lives in scope
//! `a.b`, and a name without dots lives in the root scope `""`. Scopes carry
//! the settings their hooks inherit: strictness, exception policy,
//! unconstrained priority and the muting opt-out.
//!
//! ```text
//! ""            (root: RaiseImmediately)
//!  └── app      (policy: None → inherits from root)
//!       └── app.db   (policy: Ignore)
//! ```

use std::collections::BTreeSet;

use hashbrown::HashMap;
use parking_lot::Mutex;

use crate::error::RegistryError;
use crate::policy::ExceptionPolicy;
use crate::resolver::UnconstrainedPriority;

/// Name of the root scope.
pub const ROOT: &str = "";

/// Returns the name of the scope that contains `name`.
///
/// Returns `None` for the root scope itself.
#[must_use]
pub fn parent_of(name: &str) -> Option<&str> {
    if name.is_empty() {
        return None;
    }
    Some(name.rsplit_once('.').map_or(ROOT, |(parent, _)| parent))
}

/// Returns the name of the scope a hook called `hook` lives in.
#[must_use]
pub fn scope_of(hook: &str) -> &str {
    parent_of(hook).unwrap_or(ROOT)
}

/// Iterates over `name` and all of its ancestors, ending with the root.
pub fn ancestors(name: &str) -> impl Iterator<Item = &str> {
    core::iter::successors(Some(name), |current| parent_of(current))
}

/// One node of the scope tree.
#[derive(Debug)]
pub struct Scope {
    name: String,
    subscopes: BTreeSet<String>,
    hooks: BTreeSet<String>,
    strict: bool,
    policy: Option<ExceptionPolicy>,
    resolved_policy: Mutex<Option<ExceptionPolicy>>,
    unconstrained: UnconstrainedPriority,
    forbid_muting: bool,
}

impl Scope {
    fn new(name: String, strict: bool, unconstrained: UnconstrainedPriority) -> Self {
        Self {
            name,
            subscopes: BTreeSet::new(),
            hooks: BTreeSet::new(),
            strict,
            policy: None,
            resolved_policy: Mutex::new(None),
            unconstrained,
            forbid_muting: false,
        }
    }

    /// Returns the full dotted name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the names of the direct subscopes.
    pub fn subscopes(&self) -> impl Iterator<Item = &str> {
        self.subscopes.iter().map(String::as_str)
    }

    /// Returns the full names of the hooks directly in this scope.
    pub fn hooks(&self) -> impl Iterator<Item = &str> {
        self.hooks.iter().map(String::as_str)
    }

    /// Returns `true` if the scope is strict.
    #[must_use]
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Returns the scope's own policy, `None` meaning inherited.
    #[must_use]
    pub fn own_policy(&self) -> Option<ExceptionPolicy> {
        self.policy
    }

    /// Returns the unconstrained priority.
    #[must_use]
    pub fn unconstrained_priority(&self) -> UnconstrainedPriority {
        self.unconstrained
    }

    /// Returns `true` if the scope opted out of muting.
    #[must_use]
    pub fn forbids_muting(&self) -> bool {
        self.forbid_muting
    }
}

/// All scopes of a registry, keyed by full name.
#[derive(Debug)]
pub(crate) struct ScopeTree {
    scopes: HashMap<String, Scope>,
}

impl ScopeTree {
    pub(crate) fn new() -> Self {
        let mut root = Scope::new(ROOT.to_owned(), false, UnconstrainedPriority::DontCare);
        root.policy = Some(ExceptionPolicy::RaiseImmediately);
        let mut scopes = HashMap::new();
        scopes.insert(ROOT.to_owned(), root);
        Self { scopes }
    }

    pub(crate) fn get(&self, name: &str) -> Option<&Scope> {
        self.scopes.get(name)
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.scopes.contains_key(name)
    }

    fn require(&self, name: &str) -> Result<&Scope, RegistryError> {
        self.scopes
            .get(name)
            .ok_or_else(|| RegistryError::ScopeNotFound(name.to_owned()))
    }

    fn require_mut(&mut self, name: &str) -> Result<&mut Scope, RegistryError> {
        self.scopes
            .get_mut(name)
            .ok_or_else(|| RegistryError::ScopeNotFound(name.to_owned()))
    }

    /// Creates `name` and any missing ancestors. New scopes copy their
    /// parent's strictness and unconstrained priority.
    pub(crate) fn get_or_create(&mut self, name: &str) -> &Scope {
        if !self.scopes.contains_key(name) {
            let missing: Vec<&str> = ancestors(name)
                .take_while(|scope| !self.scopes.contains_key(*scope))
                .collect();
            for scope in missing.into_iter().rev() {
                let parent_name = parent_of(scope).unwrap_or(ROOT);
                let (strict, unconstrained) = match self.scopes.get_mut(parent_name) {
                    Some(parent) => {
                        parent.subscopes.insert(scope.to_owned());
                        (parent.strict, parent.unconstrained)
                    }
                    None => (false, UnconstrainedPriority::DontCare),
                };
                tracing::trace!(scope, "creating scope");
                self.scopes
                    .insert(scope.to_owned(), Scope::new(scope.to_owned(), strict, unconstrained));
            }
        }
        &self.scopes[name]
    }

    /// Records `hook` as a member of its scope, creating the scope chain.
    pub(crate) fn attach_hook(&mut self, hook: &str) {
        let scope = scope_of(hook);
        self.get_or_create(scope);
        if let Some(scope) = self.scopes.get_mut(scope) {
            scope.hooks.insert(hook.to_owned());
        }
    }

    pub(crate) fn detach_hook(&mut self, hook: &str) {
        if let Some(scope) = self.scopes.get_mut(scope_of(hook)) {
            scope.hooks.remove(hook);
        }
    }

    /// Returns `name` and all scopes below it, parents before children.
    pub(crate) fn subtree(&self, name: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut stack = vec![name.to_owned()];
        while let Some(current) = stack.pop() {
            if let Some(scope) = self.scopes.get(&current) {
                stack.extend(scope.subscopes.iter().rev().cloned());
                out.push(current);
            }
        }
        out
    }

    /// Returns every hook in the subtree rooted at `name`.
    pub(crate) fn hooks_in_subtree(&self, name: &str) -> Vec<String> {
        self.subtree(name)
            .iter()
            .filter_map(|scope| self.scopes.get(scope))
            .flat_map(|scope| scope.hooks.iter().cloned())
            .collect()
    }

    /// Removes `name` and everything below it, returning the removed hooks.
    pub(crate) fn remove_subtree(&mut self, name: &str) -> Result<Vec<String>, RegistryError> {
        self.require(name)?;
        let hooks = self.hooks_in_subtree(name);
        for scope in self.subtree(name) {
            self.scopes.remove(&scope);
        }
        if let Some(parent) = parent_of(name).and_then(|parent| self.scopes.get_mut(parent)) {
            parent.subscopes.remove(name);
        }
        if name == ROOT {
            *self = ScopeTree::new();
        }
        Ok(hooks)
    }

    pub(crate) fn set_strict(&mut self, name: &str, strict: bool) -> Result<(), RegistryError> {
        self.require(name)?;
        for scope in self.subtree(name) {
            if let Some(scope) = self.scopes.get_mut(&scope) {
                scope.strict = strict;
            }
        }
        Ok(())
    }

    pub(crate) fn set_unconstrained(
        &mut self,
        name: &str,
        unconstrained: UnconstrainedPriority,
    ) -> Result<(), RegistryError> {
        self.require(name)?;
        for scope in self.subtree(name) {
            if let Some(scope) = self.scopes.get_mut(&scope) {
                scope.unconstrained = unconstrained;
            }
        }
        Ok(())
    }

    pub(crate) fn set_forbid_muting(&mut self, name: &str, forbid: bool) -> Result<(), RegistryError> {
        self.require_mut(name)?.forbid_muting = forbid;
        Ok(())
    }

    /// Sets a scope's own policy and drops cached policies below it.
    pub(crate) fn set_policy(
        &mut self,
        name: &str,
        policy: Option<ExceptionPolicy>,
    ) -> Result<(), RegistryError> {
        if name == ROOT && policy.is_none() {
            return Err(RegistryError::RootCannotInherit);
        }
        self.require_mut(name)?.policy = policy;
        for scope in self.subtree(name) {
            if let Some(scope) = self.scopes.get(&scope) {
                *scope.resolved_policy.lock() = None;
            }
        }
        Ok(())
    }

    /// Resolves the effective policy of `name`, memoizing along the way.
    pub(crate) fn resolve_policy(&self, name: &str) -> ExceptionPolicy {
        let Some(scope) = self.scopes.get(name) else {
            return parent_of(name).map_or(ExceptionPolicy::default(), |parent| {
                self.resolve_policy(parent)
            });
        };
        if let Some(policy) = scope.policy {
            return policy;
        }
        if let Some(cached) = *scope.resolved_policy.lock() {
            return cached;
        }
        let resolved = parent_of(name).map_or(ExceptionPolicy::default(), |parent| {
            self.resolve_policy(parent)
        });
        *scope.resolved_policy.lock() = Some(resolved);
        resolved
    }

    /// Returns `true` if `name` or any ancestor forbids muting.
    pub(crate) fn muting_forbidden(&self, name: &str) -> bool {
        ancestors(name)
            .filter_map(|scope| self.scopes.get(scope))
            .any(Scope::forbids_muting)
    }

    #[cfg(test)]
    fn is_cached(&self, name: &str) -> bool {
        self.scopes
            .get(name)
            .is_some_and(|scope| scope.resolved_policy.lock().is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_of_splits_on_last_dot() {
        assert_eq!(parent_of("a.b.c"), Some("a.b"));
        assert_eq!(parent_of("a"), Some(ROOT));
        assert_eq!(parent_of(ROOT), None);
        assert_eq!(ancestors("a.b").collect::<Vec<_>>(), vec!["a.b", "a", ""]);
    }

    #[test]
    fn subscopes_copy_parent_settings() {
        let mut tree = ScopeTree::new();
        tree.get_or_create("a");
        tree.set_strict("a", true).unwrap();
        tree.set_unconstrained("a", UnconstrainedPriority::Last).unwrap();
        let child = tree.get_or_create("a.b.c");
        assert!(child.is_strict());
        assert_eq!(child.unconstrained_priority(), UnconstrainedPriority::Last);
        assert!(tree.contains("a.b"));
        assert!(!tree.get(ROOT).is_some_and(Scope::is_strict));
    }

    #[test]
    fn policy_inherits_and_cache_invalidates() {
        let mut tree = ScopeTree::new();
        tree.get_or_create("a.b");
        assert_eq!(tree.resolve_policy("a.b"), ExceptionPolicy::RaiseImmediately);
        assert!(tree.is_cached("a.b"));

        tree.set_policy("a", Some(ExceptionPolicy::Ignore)).unwrap();
        assert!(!tree.is_cached("a.b"));
        assert_eq!(tree.resolve_policy("a.b"), ExceptionPolicy::Ignore);

        tree.set_policy(ROOT, Some(ExceptionPolicy::RaiseDefer)).unwrap();
        tree.set_policy("a", None).unwrap();
        assert_eq!(tree.resolve_policy("a.b"), ExceptionPolicy::RaiseDefer);
    }

    #[test]
    fn root_cannot_inherit() {
        let mut tree = ScopeTree::new();
        assert_eq!(
            tree.set_policy(ROOT, None),
            Err(RegistryError::RootCannotInherit)
        );
    }

    #[test]
    fn remove_subtree_returns_hooks() {
        let mut tree = ScopeTree::new();
        tree.attach_hook("a.x");
        tree.attach_hook("a.b.y");
        tree.attach_hook("z");
        let mut removed = tree.remove_subtree("a").unwrap();
        removed.sort();
        assert_eq!(removed, vec!["a.b.y".to_owned(), "a.x".to_owned()]);
        assert!(!tree.contains("a"));
        assert!(!tree.contains("a.b"));
        assert!(tree.get(ROOT).unwrap().hooks().any(|hook| hook == "z"));
        assert!(tree.get(ROOT).unwrap().subscopes().next().is_none());
    }

    #[test]
    fn muting_forbidden_is_inherited() {
        let mut tree = ScopeTree::new();
        tree.get_or_create("a.b");
        tree.set_forbid_muting("a", true).unwrap();
        assert!(tree.muting_forbidden("a.b"));
        assert!(tree.muting_forbidden("a.b.hook"));
        assert!(!tree.muting_forbidden("c"));
    }
}
