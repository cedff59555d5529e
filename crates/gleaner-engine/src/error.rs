//! Error types for the helper binary.
//!
//! [`EngineError`] is the top-level error type that wraps all possible
//! failure modes during engine startup.

/// Top-level error for the helper binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: gleaner_core::config::ConfigError,
    },

    /// Demo farm construction failed.
    #[error("harness error: {message}")]
    Harness {
        /// Description of the harness failure.
        message: String,
    },
}
