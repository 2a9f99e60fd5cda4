//! Example plugin host CLI.
//!
//! Runs one session of the demo host over the given request paths.
//!
//! # Usage
//!
//! ```bash
//! herald-demo [--json] [--strict-errors] <path>...
//! ```
//!
//! # Example
//!
//! ```bash
//! RUST_LOG=debug herald-demo / /boom /admin/users
//! ```

use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use example::{AuditPlugin, ConfigPlugin, FlakyPlugin, GreeterPlugin, Greeting, Host, REQUEST};
use herald_hooks::prelude::*;
use herald_observe::{CallTracer, TracingConfig, TracingFormat};

fn main() -> ExitCode {
    let mut format = TracingFormat::Compact;
    let mut policy = ExceptionPolicy::Ignore;
    let mut paths = Vec::new();
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--json" => format = TracingFormat::Json,
            "--strict-errors" => policy = ExceptionPolicy::RaiseDefer,
            _ => paths.push(arg),
        }
    }
    if paths.is_empty() {
        eprintln!("Usage: herald-demo [--json] [--strict-errors] <path>...");
        eprintln!("Example: herald-demo / /boom /admin/users");
        return ExitCode::FAILURE;
    }

    TracingConfig::new().with_format(format).init();

    match run(policy, paths) {
        Ok(audited) => {
            tracing::info!(audited, "session finished");
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(error = %err, "session failed");
            ExitCode::FAILURE
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum DemoError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Trigger(#[from] TriggerError),
}

fn run(policy: ExceptionPolicy, paths: Vec<String>) -> Result<usize, DemoError> {
    let mut host = Host::new(policy)?;
    let greeting = Greeting::default();
    let audit = AuditPlugin::default();
    let audited = Arc::clone(&audit.requests);

    host.add_plugin(GreeterPlugin::new(greeting.clone()))?
        .add_plugin(ConfigPlugin::new("herald-demo", greeting))?
        .add_plugin(audit)?
        .add_plugin(FlakyPlugin)?;
    let _tracer = CallTracer::attach(host.registry(), REQUEST)?;

    host.run(paths)?;
    Ok(audited.load(Ordering::SeqCst))
}
