//! Demo plugins.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use herald_hooks::prelude::*;
use parking_lot::Mutex;

use crate::{Plugin, REQUEST, STARTED, STOPPED};

// ─────────────────────────────────────────────────────────────────────────────
// Greeting
// ─────────────────────────────────────────────────────────────────────────────

/// State shared by [`ConfigPlugin`] and [`GreeterPlugin`].
#[derive(Debug, Clone, Default)]
pub struct Greeting {
    site: Arc<Mutex<Option<String>>>,
    lines: Arc<Mutex<Vec<String>>>,
}

impl Greeting {
    /// Returns everything the greeter said so far.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    fn say(&self, line: String) {
        tracing::info!(target: "herald_demo", "{line}");
        self.lines.lock().push(line);
    }
}

/// Loads the site configuration at startup. Provides `config`.
#[derive(Debug)]
pub struct ConfigPlugin {
    site: String,
    greeting: Greeting,
}

impl ConfigPlugin {
    /// Creates a plugin that configures `greeting` for `site`.
    #[must_use]
    pub fn new(site: impl Into<String>, greeting: Greeting) -> Self {
        Self {
            site: site.into(),
            greeting,
        }
    }
}

impl Plugin for ConfigPlugin {
    fn build(&self, blueprint: &mut Blueprint) {
        let site = self.site.clone();
        let target = Arc::clone(&self.greeting.site);
        blueprint.register(
            STARTED,
            move |_ctx: &HandlerContext<'_>| {
                *target.lock() = Some(site.clone());
                Ok(())
            },
            RegisterOptions::new().provides(["config"]),
        );
    }
}

/// Greets once per session and echoes public requests. Needs `config`.
#[derive(Debug)]
pub struct GreeterPlugin {
    greeting: Greeting,
    session: Toggle,
}

impl GreeterPlugin {
    /// Creates a greeter writing to `greeting`.
    #[must_use]
    pub fn new(greeting: Greeting) -> Self {
        Self {
            greeting,
            session: Toggle::new(),
        }
    }
}

impl Plugin for GreeterPlugin {
    fn build(&self, blueprint: &mut Blueprint) {
        let hello = self.greeting.clone();
        let echo = self.greeting.clone();
        let bye = self.greeting.clone();
        blueprint
            .register(
                STARTED,
                move |_ctx: &HandlerContext<'_>| {
                    let site = hello.site.lock().clone();
                    let Some(site) = site else {
                        return not_now();
                    };
                    hello.say(format!("hello from {site}"));
                    Ok(())
                },
                RegisterOptions::new()
                    .needs(["config"])
                    .toggles_on(&self.session),
            )
            .register(
                REQUEST,
                move |ctx: &HandlerContext<'_>| {
                    let path = ctx.arg::<String>("path").map_or("?", String::as_str);
                    echo.say(format!("GET {path}"));
                    Ok(())
                },
                RegisterOptions::new().tags(["public"]),
            )
            .register(
                STOPPED,
                move |_ctx: &HandlerContext<'_>| {
                    bye.say("bye".to_owned());
                    Ok(())
                },
                RegisterOptions::new().toggles_off(&self.session),
            );
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// AuditPlugin
// ─────────────────────────────────────────────────────────────────────────────

/// Counts admin requests.
#[derive(Debug, Default)]
pub struct AuditPlugin {
    /// Number of admin requests seen.
    pub requests: Arc<AtomicUsize>,
}

impl Plugin for AuditPlugin {
    fn build(&self, blueprint: &mut Blueprint) {
        let requests = Arc::clone(&self.requests);
        blueprint.register(
            REQUEST,
            move |ctx: &HandlerContext<'_>| {
                let seen = requests.fetch_add(1, Ordering::SeqCst) + 1;
                tracing::info!(
                    target: "herald_demo",
                    path = ctx.arg::<String>("path").map(String::as_str),
                    seen,
                    "admin request audited"
                );
                Ok(())
            },
            RegisterOptions::new().tags(["admin"]).priority(10),
        );
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// FlakyPlugin
// ─────────────────────────────────────────────────────────────────────────────

/// Error raised by [`FlakyPlugin`].
#[derive(Debug, thiserror::Error)]
#[error("request to {0} went boom")]
pub struct FlakyError(pub String);

/// Fails every public request whose path contains `boom`.
#[derive(Debug, Clone, Copy)]
pub struct FlakyPlugin;

impl Plugin for FlakyPlugin {
    fn build(&self, blueprint: &mut Blueprint) {
        blueprint.register(
            REQUEST,
            |ctx: &HandlerContext<'_>| {
                let path = ctx.arg::<String>("path").cloned().unwrap_or_default();
                if path.contains("boom") {
                    return Err(FlakyError(path).into());
                }
                Ok(())
            },
            RegisterOptions::new().tags(["public"]).priority(-10),
        );
    }
}
