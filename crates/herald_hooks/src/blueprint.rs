//! Batches of registrations installed and removed together.
//!
//! A [`Blueprint`] collects handler registrations without touching a
//! registry. [`Blueprint::install`] registers all of them under the
//! blueprint's generated token, optionally below a scope prefix;
//! [`Blueprint::uninstall`] removes them again through token unregistration.
//!
//! # Example
//!
//! ```
//! use herald_hooks::prelude::*;
//!
//! let mut blueprint = Blueprint::new();
//! blueprint.register("session.start", |_ctx: &HandlerContext<'_>| Ok(()), RegisterOptions::new());
//! blueprint.register("session.end", |_ctx: &HandlerContext<'_>| Ok(()), RegisterOptions::new());
//!
//! let registry = Registry::new();
//! blueprint.install(&registry, Some("plugin")).unwrap();
//! assert_eq!(registry.registrations("plugin.session.start").len(), 1);
//!
//! blueprint.uninstall(&registry).unwrap();
//! assert!(registry.registrations("plugin.session.start").is_empty());
//! ```

use std::sync::Arc;

use crate::error::RegistryError;
use crate::registration::{HandlerContext, HandlerResult, RegisterOptions};
use crate::registry::Registry;

type SharedHandler = Arc<dyn Fn(&HandlerContext<'_>) -> HandlerResult + Send + Sync>;

struct Entry {
    hook: String,
    handler: SharedHandler,
    options: RegisterOptions,
}

/// A set of registrations sharing one token.
pub struct Blueprint {
    token: String,
    entries: Vec<Entry>,
}

impl Default for Blueprint {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for Blueprint {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Blueprint")
            .field("token", &self.token)
            .field(
                "hooks",
                &self.entries.iter().map(|entry| entry.hook.as_str()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Blueprint {
    /// Creates an empty blueprint with a fresh token.
    #[must_use]
    pub fn new() -> Self {
        Self {
            token: format!("blueprint-{}", nanoid::nanoid!()),
            entries: Vec::new(),
        }
    }

    /// Returns the token every installed registration carries.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Returns the number of collected registrations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing was collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Adds a registration. Any token in `options` is replaced by the
    /// blueprint's own.
    pub fn register<F>(&mut self, hook: impl Into<String>, handler: F, options: RegisterOptions) -> &mut Self
    where
        F: Fn(&HandlerContext<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        self.entries.push(Entry {
            hook: hook.into(),
            handler: Arc::new(handler),
            options,
        });
        self
    }

    /// Registers every entry into `registry`, below `prefix` if given.
    ///
    /// Installation is all-or-nothing: on the first failure every
    /// registration made so far is removed again.
    ///
    /// # Errors
    ///
    /// Returns the error of the first registration that failed.
    pub fn install(&self, registry: &Registry, prefix: Option<&str>) -> Result<(), RegistryError> {
        let mut installed = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            let name = match prefix {
                Some(prefix) if !prefix.is_empty() => format!("{prefix}.{}", entry.hook),
                _ => entry.hook.clone(),
            };
            let handler = Arc::clone(&entry.handler);
            let options = entry.options.clone().token(self.token.clone());
            match registry.register(&name, move |ctx: &HandlerContext<'_>| handler(ctx), options) {
                Ok(handle) => installed.push(handle),
                Err(err) => {
                    tracing::debug!(token = %self.token, hook = %name, error = %err, "blueprint install failed, rolling back");
                    for handle in &installed {
                        if let Err(rollback) = registry.unregister(handle) {
                            tracing::debug!(token = %self.token, error = %rollback, "registration already removed, skipping rollback");
                        }
                    }
                    return Err(err);
                }
            }
        }
        tracing::debug!(token = %self.token, count = installed.len(), "blueprint installed");
        Ok(())
    }

    /// Removes every registration installed from this blueprint.
    ///
    /// Returns the number of registrations removed.
    ///
    /// # Errors
    ///
    /// Propagates [`Registry::unregister_token`] errors.
    pub fn uninstall(&self, registry: &Registry) -> Result<usize, RegistryError> {
        registry.unregister_token(&self.token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(_ctx: &HandlerContext<'_>) -> HandlerResult {
        Ok(())
    }

    #[test]
    fn tokens_are_unique() {
        assert_ne!(Blueprint::new().token(), Blueprint::new().token());
        assert!(Blueprint::new().token().starts_with("blueprint-"));
    }

    #[test]
    fn install_applies_prefix_and_token() {
        let mut blueprint = Blueprint::new();
        blueprint
            .register("a", ok, RegisterOptions::new().token("ignored"))
            .register("b.c", ok, RegisterOptions::new());
        let registry = Registry::new();
        blueprint.install(&registry, Some("p")).unwrap();

        let registrations = registry.registrations("p.b.c");
        assert_eq!(registrations.len(), 1);
        assert_eq!(registrations[0].token(), Some(blueprint.token()));
        assert_eq!(registry.registrations("p.a")[0].token(), Some(blueprint.token()));
        assert_eq!(blueprint.uninstall(&registry).unwrap(), 2);
    }

    #[test]
    fn install_without_prefix_uses_plain_names() {
        let mut blueprint = Blueprint::new();
        blueprint.register("plain", ok, RegisterOptions::new());
        let registry = Registry::new();
        blueprint.install(&registry, None).unwrap();
        assert_eq!(registry.registrations("plain").len(), 1);
        assert_eq!(blueprint.len(), 1);
    }
}
