//! Temporary hook suppression.
//!
//! The registry keeps a stack of muted-name sets. [`Registry::mute`] pushes
//! the union of the requested names and the current top; the returned
//! [`MuteGuard`] pops back to the previous frame when dropped, on every exit
//! path.

use hashbrown::HashSet;

use crate::error::RegistryError;
use crate::registry::Registry;
use crate::scope::ancestors;

/// Restores the previous mute frame when dropped.
#[must_use = "hooks are unmuted as soon as the guard is dropped"]
pub struct MuteGuard<'a> {
    registry: &'a Registry,
    depth: usize,
}

impl Drop for MuteGuard<'_> {
    fn drop(&mut self) {
        self.registry.mutes.lock().truncate(self.depth);
    }
}

impl core::fmt::Debug for MuteGuard<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MuteGuard").field("depth", &self.depth).finish()
    }
}

impl Registry {
    /// Mutes hooks or whole scopes until the returned guard is dropped.
    ///
    /// A muted hook's triggers return immediately without calling anything.
    /// Muting a scope name mutes every hook below it.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::MutingForbidden`] naming the hook or scope
    /// that cannot be muted, including hooks and scopes below a requested
    /// scope. Nothing is muted in that case.
    ///
    /// # Example
    ///
    /// ```
    /// use herald_hooks::prelude::*;
    ///
    /// let registry = Registry::new();
    /// {
    ///     let _guard = registry.mute(["app.tick"]).unwrap();
    ///     assert!(registry.is_muted("app.tick"));
    /// }
    /// assert!(!registry.is_muted("app.tick"));
    /// ```
    pub fn mute<I, S>(&self, names: I) -> Result<MuteGuard<'_>, RegistryError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let state = self.state.read();
        if let Some(blocker) = names.iter().find_map(|name| state.muting_blocker(name)) {
            return Err(RegistryError::MutingForbidden(blocker));
        }

        let mut stack = self.mutes.lock();
        let depth = stack.len();
        let mut frame: HashSet<String> = stack.last().cloned().unwrap_or_default();
        frame.extend(names);
        stack.push(frame);
        Ok(MuteGuard {
            registry: self,
            depth,
        })
    }

    /// Returns `true` if the hook or one of its scopes is currently muted.
    #[must_use]
    pub fn is_muted(&self, name: &str) -> bool {
        let stack = self.mutes.lock();
        stack
            .last()
            .is_some_and(|frame| ancestors(name).any(|scope| frame.contains(scope)))
    }
}
