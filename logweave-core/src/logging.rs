//! Self-diagnostics for the pipeline, using **tracing**.
//!
//! The pipeline never reports its own faults through itself. Sink failures,
//! dropped events, unbound template arguments and configuration decisions are
//! emitted as `tracing` events, so they reach whatever subscriber the
//! application installed, or the one set up here.
//!
//! Output goes to stderr; a console sink writing events keeps stdout.

use tracing_subscriber::EnvFilter;

/// Environment variable holding the self-diagnostic filter directives.
pub const SELF_LOG_ENV: &str = "LOGWEAVE_SELFLOG";

/// Directives used when [`SELF_LOG_ENV`] is unset or invalid.
pub const DEFAULT_SELF_LOG_FILTER: &str = "warn";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(SELF_LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_SELF_LOG_FILTER))
}

/// Installs a global subscriber for self-diagnostics on stderr.
///
/// Returns `false` when a global subscriber is already installed; the
/// existing one stays in place.
///
/// # Environment Variables
/// - `LOGWEAVE_SELFLOG`: filter directives (e.g. `LOGWEAVE_SELFLOG=logweave_core=debug`)
pub fn init_self_diagnostics(json: bool) -> bool {
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_ansi(false)
            .with_level(true)
            .with_target(true)
            .with_current_span(true)
            .with_env_filter(env_filter())
            .with_writer(std::io::stderr)
            .try_init()
            .is_ok()
    } else {
        tracing_subscriber::fmt()
            .with_target(true)
            .with_env_filter(env_filter())
            .with_writer(std::io::stderr)
            .try_init()
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_refused() {
        init_self_diagnostics(false);
        assert!(!init_self_diagnostics(true));
    }
}
