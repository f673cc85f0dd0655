//! Diagnostics on stderr via `tracing`.
//!
//! `RUST_LOG` always wins. Without it the level depends on the command: the
//! TUI owns the terminal, so it logs nothing unless `RUST_LOG` asks for it,
//! and `--verbose` only affects the one-shot commands.

use std::io;

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset.
pub fn default_level(interactive: bool, verbose: bool) -> &'static str {
    match (interactive, verbose) {
        (true, _) => "off",
        (false, true) => "debug",
        (false, false) => "warn",
    }
}

/// Install the global subscriber. Safe to call more than once.
pub fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}
