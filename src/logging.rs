//! Logger setup.
//!
//! Diagnostics go to stderr as bare messages so stdout stays clean for
//! `backup`'s object name and `list --json`.  The filter comes from
//! `RUST_LOG` when set, otherwise from `--debug`.

use std::io::IsTerminal;

use tracing_subscriber::EnvFilter;

/// Targets that are chatty at `info` and only useful when debugging.
const QUIET_TARGETS: &[&str] = &[
    "aws_config",
    "aws_runtime",
    "aws_sdk_s3",
    "aws_smithy_runtime",
    "aws_smithy_runtime_api",
    "hyper",
    "hyper_util",
];

/// Default filter directive for the given verbosity.
pub fn default_directive(debug: bool) -> String {
    if debug {
        return "debug".into();
    }
    let mut directive = String::from("info");
    for target in QUIET_TARGETS {
        directive.push(',');
        directive.push_str(target);
        directive.push_str("=off");
    }
    directive
}

/// Install the global subscriber.  Call once, from `main`.
pub fn init(debug: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(debug)));

    // Leave an already-installed subscriber in place.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .without_time()
        .with_target(false)
        .with_level(debug)
        .try_init();
}

// ─── Tests ────────────────────────────────────────────────────────────────────
