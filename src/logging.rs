//! Diagnostic logging to stderr. Rendered results stay on stdout.

use std::io;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default level for each `-v` count when `RUST_LOG` is unset.
fn level_for(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Filter from `RUST_LOG`, falling back to the verbosity level for this crate.
pub fn env_filter(verbosity: u8) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("warn,meal_solver_rs={}", level_for(verbosity)))
    })
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init(verbosity: u8) {
    let layer = fmt::layer()
        .with_target(verbosity >= 2)
        .with_thread_names(verbosity >= 2)
        .with_writer(io::stderr);

    let _ = tracing_subscriber::registry()
        .with(env_filter(verbosity))
        .with(layer)
        .try_init();
}
