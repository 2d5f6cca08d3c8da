//! Error types for the engine binary.
//!
//! [`EngineError`] wraps every failure mode of startup and the run, so that
//! `main` can propagate with `?` and attach context through `anyhow`.

/// Top-level error for the engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading or validation failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: civitas_core::config::ConfigError,
    },

    /// The simulation runner failed.
    #[error("runner error: {source}")]
    Runner {
        /// The underlying runner error.
        #[from]
        source: civitas_core::runner::RunnerError,
    },

    /// The tracing subscriber could not be installed.
    #[error("logging setup failed: {message}")]
    Logging {
        /// Description of the failure.
        message: String,
    },
}
