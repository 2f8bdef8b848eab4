//! crates/logging/src/tracing_macros.rs
//! Convenience macros for blob-generator tracing.
//!
//! These macros provide ergonomic wrappers around standard tracing macros
//! with the targets owned by each verbosity flag.

/// Emit a per-file progress trace.
///
/// # Example
/// ```ignore
/// trace_files!("processing {}", path.display());
/// ```
#[macro_export]
macro_rules! trace_files {
    ($($arg:tt)*) => {
        ::tracing::info!(target: "blobgen::files", $($arg)*);
    };
}

/// Emit a statistics trace.
///
/// # Example
/// ```ignore
/// trace_stats!("emitted {} blobs", count);
/// ```
#[macro_export]
macro_rules! trace_stats {
    ($($arg:tt)*) => {
        ::tracing::info!(target: "blobgen::stats", $($arg)*);
    };
}

/// Emit an RCS parsing trace.
#[macro_export]
macro_rules! trace_rcs {
    ($($arg:tt)*) => {
        ::tracing::debug!(target: "blobgen::rcs", $($arg)*);
    };
}

/// Emit a pruning trace.
#[macro_export]
macro_rules! trace_prune {
    ($($arg:tt)*) => {
        ::tracing::debug!(target: "blobgen::prune", $($arg)*);
    };
}

/// Emit a diff application trace.
///
/// # Example
/// ```ignore
/// trace_delta!("applied diff for {}: {} lines", rev, lines);
/// ```
#[macro_export]
macro_rules! trace_delta {
    ($($arg:tt)*) => {
        ::tracing::debug!(target: "blobgen::delta", $($arg)*);
    };
}

/// Emit a keyword transform trace.
#[macro_export]
macro_rules! trace_keyword {
    ($($arg:tt)*) => {
        ::tracing::debug!(target: "blobgen::keyword", $($arg)*);
    };
}

/// Emit a scratch store trace.
///
/// # Example
/// ```ignore
/// trace_store!("spilled {} ({} bytes)", rev, len);
/// ```
#[macro_export]
macro_rules! trace_store {
    ($($arg:tt)*) => {
        ::tracing::debug!(target: "blobgen::store", $($arg)*);
    };
}

/// Emit a blob emission trace.
#[macro_export]
macro_rules! trace_emit {
    ($($arg:tt)*) => {
        ::tracing::debug!(target: "blobgen::emit", $($arg)*);
    };
}
