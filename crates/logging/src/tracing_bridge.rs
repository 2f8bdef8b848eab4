//! crates/logging/src/tracing_bridge.rs
//! Bridge between the tracing crate and the blob generator's verbosity flags.
//!
//! Every info and debug flag owns a `tracing` target (see
//! [`InfoFlag::target`](crate::InfoFlag::target) and
//! [`DebugFlag::target`](crate::DebugFlag::target)). The bridge renders a
//! [`VerbosityConfig`] into an [`EnvFilter`] so the standard `fmt` subscriber
//! only records the categories the user asked for.
//!
//! # Usage
//!
//! ```rust,ignore
//! use logging::{VerbosityConfig, init_tracing};
//!
//! let config = VerbosityConfig::from_verbose_level(2);
//! init_tracing(&config);
//!
//! tracing::debug!(target: "blobgen::store", "spilled 1.1");
//! ```

use super::config::VerbosityConfig;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Environment variable that overrides the directives derived from `-v`.
pub const LOG_ENV_VAR: &str = "BLOBGEN_LOG";

/// Builds the [`EnvFilter`] matching the supplied configuration.
///
/// When [`LOG_ENV_VAR`] is set and parses, its directives win over the ones
/// derived from the configuration.
#[must_use]
pub fn build_filter(config: &VerbosityConfig) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_env(LOG_ENV_VAR) {
        return filter;
    }
    EnvFilter::new(config.filter_directives())
}

/// Initialize tracing with the given verbosity configuration.
///
/// Diagnostics are written to standard error so they never interleave with
/// blob output. Returns `false` when a global subscriber was already
/// installed (for example by a test harness); the existing subscriber is
/// left untouched.
pub fn init_tracing(config: &VerbosityConfig) -> bool {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .without_time();

    tracing_subscriber::registry()
        .with(build_filter(config))
        .with(fmt_layer)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DebugFlag;

    #[test]
    fn filter_reflects_configuration() {
        let mut config = VerbosityConfig::default();
        config.apply_debug_flag("store").expect("valid flag");
        let rendered = build_filter(&config).to_string();
        assert!(rendered.contains(DebugFlag::Store.target()));
    }

    #[test]
    fn second_initialisation_is_reported() {
        let config = VerbosityConfig::from_verbose_level(1);
        let _first = init_tracing(&config);
        assert!(!init_tracing(&config));
    }
}
