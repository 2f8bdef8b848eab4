//! crates/logging/src/config.rs
//! Verbosity configuration combining info and debug levels.

use super::levels::{DebugFlag, DebugLevels, InfoFlag, InfoLevels};

/// Combined verbosity configuration for info and debug flags.
///
/// The configuration is a plain value: callers build it once from the
/// command line and hand it to [`init_tracing`](crate::init_tracing) and to
/// every component that wants to gate expensive diagnostics.
#[derive(Clone, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VerbosityConfig {
    /// Info flag levels.
    pub info: InfoLevels,
    /// Debug flag levels.
    pub debug: DebugLevels,
}

impl VerbosityConfig {
    /// Create a new configuration from a `-v` count.
    ///
    /// - 0: warnings and errors only
    /// - 1: one line per file plus statistics
    /// - 2: pruning, spills, and blob emission
    /// - 3: every diff application and keyword rewrite
    /// - 4+: trace-level detail for every category
    pub fn from_verbose_level(level: u8) -> Self {
        let mut config = Self::default();

        if level >= 1 {
            config.info.set_all(1);
        }
        if level >= 2 {
            config.debug.rcs = 1;
            config.debug.prune = 1;
            config.debug.store = 1;
            config.debug.emit = 1;
        }
        if level >= 3 {
            config.debug.delta = 1;
            config.debug.keyword = 1;
        }
        if level >= 4 {
            config.info.set_all(2);
            config.debug.set_all(2);
        }

        config
    }

    /// Check if the info flag is at or above the specified level.
    pub fn info_gte(&self, flag: InfoFlag, level: u8) -> bool {
        self.info.get(flag) >= level
    }

    /// Check if the debug flag is at or above the specified level.
    pub fn debug_gte(&self, flag: DebugFlag, level: u8) -> bool {
        self.debug.get(flag) >= level
    }

    /// Apply a single info flag token (e.g., "stats2", "files").
    pub fn apply_info_flag(&mut self, token: &str) -> Result<(), String> {
        let (name, level) = parse_flag_token(token)?;

        let flag = match name {
            "files" => InfoFlag::Files,
            "stats" => InfoFlag::Stats,
            _ => return Err(format!("unknown info flag: {name}")),
        };

        self.info.set(flag, level);
        Ok(())
    }

    /// Apply a single debug flag token (e.g., "store2", "delta").
    pub fn apply_debug_flag(&mut self, token: &str) -> Result<(), String> {
        let (name, level) = parse_flag_token(token)?;

        let flag = match name {
            "rcs" => DebugFlag::Rcs,
            "prune" => DebugFlag::Prune,
            "delta" => DebugFlag::Delta,
            "keyword" => DebugFlag::Keyword,
            "store" => DebugFlag::Store,
            "emit" => DebugFlag::Emit,
            _ => return Err(format!("unknown debug flag: {name}")),
        };

        self.debug.set(flag, level);
        Ok(())
    }

    /// Renders the configuration as `tracing_subscriber::EnvFilter` directives.
    ///
    /// Info flags map level 1 to `info` and 2+ to `debug`; debug flags map
    /// level 1 to `debug` and 2+ to `trace`. Flags at level 0 fall back to the
    /// `warn` default.
    #[must_use]
    pub fn filter_directives(&self) -> String {
        let mut directives = vec!["warn".to_owned()];

        for flag in InfoFlag::ALL {
            let level = match self.info.get(flag) {
                0 => continue,
                1 => "info",
                _ => "debug",
            };
            directives.push(format!("{}={level}", flag.target()));
        }

        for flag in DebugFlag::ALL {
            let level = match self.debug.get(flag) {
                0 => continue,
                1 => "debug",
                _ => "trace",
            };
            directives.push(format!("{}={level}", flag.target()));
        }

        directives.join(",")
    }
}

/// Parse a flag token like "store2" into ("store", 2) or "emit" into ("emit", 1).
fn parse_flag_token(token: &str) -> Result<(&str, u8), String> {
    if token.is_empty() {
        return Err("empty flag token".to_owned());
    }

    match token.find(|c: char| c.is_ascii_digit()) {
        Some(pos) => {
            let name = &token[..pos];
            let level = token[pos..]
                .parse::<u8>()
                .map_err(|_| format!("invalid level in flag: {token}"))?;
            Ok((name, level))
        }
        None => Ok((token, 1)),
    }
}
