//! Example plugin host built with Herald.
//!
//! The host owns a [`Registry`] with three strict hooks under the `app`
//! scope. Plugins contribute handlers through a [`Blueprint`], so removing
//! a plugin removes everything it registered.
//!
//! ```text
//! app.started ──▶ app.request (per path) ──▶ app.stopped
//! ```

mod plugins;

pub use plugins::{AuditPlugin, ConfigPlugin, FlakyError, FlakyPlugin, GreeterPlugin, Greeting};

use herald_hooks::prelude::*;
use herald_observe::FailureLogger;

/// Hook fired once before any request.
pub const STARTED: &str = "app.started";
/// Hook fired for every request. Arguments: `path` (`String`).
pub const REQUEST: &str = "app.request";
/// Hook fired once after the last request.
pub const STOPPED: &str = "app.stopped";

/// A unit of functionality contributing handlers to the host.
pub trait Plugin {
    /// Adds the plugin's handlers to `blueprint`.
    fn build(&self, blueprint: &mut Blueprint);

    /// Returns the plugin's name for diagnostics.
    fn name(&self) -> &str {
        core::any::type_name::<Self>()
    }
}

struct Installed {
    name: String,
    blueprint: Blueprint,
}

/// Owns the registry and the installed plugins.
pub struct Host {
    registry: Registry,
    plugins: Vec<Installed>,
    _logger: FailureLogger,
}

impl core::fmt::Debug for Host {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Host")
            .field(
                "plugins",
                &self.plugins.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

impl Host {
    /// Creates a host with the `app` hooks defined and the scope made strict.
    ///
    /// # Errors
    ///
    /// Propagates registry errors from the initial setup.
    pub fn new(policy: ExceptionPolicy) -> Result<Self, RegistryError> {
        let registry = Registry::new();
        registry
            .define(STARTED, HookDefinition::new().doc("Fired once at startup."))?
            .define(
                REQUEST,
                HookDefinition::new()
                    .args(ArgSchema::new().typed::<String>("path"))
                    .tags(["public", "admin"])
                    .doc("Fired for every request."),
            )?
            .define(STOPPED, HookDefinition::new().doc("Fired once at shutdown."))?;
        registry.set_strict("app", true)?;
        registry.set_exception_policy("app", Some(policy))?;
        let logger = FailureLogger::attach(&registry)?;

        Ok(Self {
            registry,
            plugins: Vec::new(),
            _logger: logger,
        })
    }

    /// Returns the host's registry.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Installs a plugin.
    ///
    /// # Errors
    ///
    /// Returns the first registration error; nothing of the plugin stays
    /// installed in that case.
    pub fn add_plugin<P: Plugin>(&mut self, plugin: P) -> Result<&mut Self, RegistryError> {
        let mut blueprint = Blueprint::new();
        plugin.build(&mut blueprint);
        blueprint.install(&self.registry, None)?;
        tracing::info!(plugin = plugin.name(), handlers = blueprint.len(), "plugin installed");
        self.plugins.push(Installed {
            name: plugin.name().to_owned(),
            blueprint,
        });
        Ok(self)
    }

    /// Removes a plugin by name. Returns the number of handlers removed, or
    /// `None` if no such plugin is installed.
    ///
    /// # Errors
    ///
    /// Propagates token unregistration errors.
    pub fn remove_plugin(&mut self, name: &str) -> Result<Option<usize>, RegistryError> {
        let Some(index) = self.plugins.iter().position(|p| p.name == name) else {
            return Ok(None);
        };
        let installed = self.plugins.remove(index);
        let removed = installed.blueprint.uninstall(&self.registry)?;
        tracing::info!(plugin = name, handlers = removed, "plugin removed");
        Ok(Some(removed))
    }

    /// Returns the names of the installed plugins in installation order.
    #[must_use]
    pub fn plugin_names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name.as_str()).collect()
    }

    /// Runs a session: start, one request per path, stop.
    ///
    /// Paths under `/admin` are dispatched to `admin` handlers only; every
    /// other path goes to `public` handlers.
    ///
    /// # Errors
    ///
    /// Returns the first trigger error the scope's policy lets through.
    pub fn run<I, S>(&self, paths: I) -> Result<(), TriggerError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.registry.trigger(STARTED, Args::new())?;
        for path in paths {
            let path = path.into();
            let tag = if path.starts_with("/admin") { "admin" } else { "public" };
            self.registry
                .trigger_with_tags(REQUEST, Args::new().with("path", path), [tag])?;
        }
        self.registry.trigger(STOPPED, Args::new())
    }
}
