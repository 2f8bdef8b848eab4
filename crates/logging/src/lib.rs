#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `logging` owns the verbosity model shared across the blob generator
//! workspace. A [`VerbosityConfig`] records an info level and a debug level
//! for each diagnostic category; it is built once from the command line and
//! passed by value to [`init_tracing`] and to the reconstruction engine.
//!
//! # Design
//!
//! Each [`InfoFlag`] and [`DebugFlag`] owns a `tracing` target under the
//! `blobgen::` prefix. Components emit through the `trace_*!` macros, and the
//! subscriber installed by [`init_tracing`] filters with directives derived
//! from the configuration. There is no process-wide verbosity state besides
//! the subscriber itself: code that needs to gate expensive diagnostics asks
//! the configuration value it was constructed with.
//!
//! # Examples
//!
//! ```
//! use logging::{DebugFlag, VerbosityConfig};
//!
//! let mut config = VerbosityConfig::from_verbose_level(1);
//! config.apply_debug_flag("store2").unwrap();
//!
//! assert!(config.debug_gte(DebugFlag::Store, 2));
//! assert!(config.filter_directives().contains("blobgen::store=trace"));
//! ```

mod config;
mod levels;
mod tracing_bridge;
mod tracing_macros;

pub use config::VerbosityConfig;
pub use levels::{DebugFlag, DebugLevels, InfoFlag, InfoLevels};
pub use tracing_bridge::{LOG_ENV_VAR, build_filter, init_tracing};
