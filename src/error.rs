use thiserror::Error;

/// Main error type for the babysit supervisor
#[derive(Debug, Error)]
pub enum BabysitError {
    // Configuration errors (fatal at startup)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid configuration file: {0}")]
    InvalidConfig(String),

    #[error("Missing required configuration field: {0}")]
    MissingConfigField(String),

    // Child lifecycle errors (logged, retried after the restart delay)
    #[error("Failed to spawn process: {0}")]
    SpawnError(String),

    #[error("Process exited abnormally: {0}")]
    RuntimeExitError(String),

    // Telemetry errors (only ever rendered on the status page)
    #[error("Process info unavailable for PID {0}: {1}")]
    ProcessInfoUnavailable(u32, String),

    // Redeploy errors (old instance keeps running)
    #[error("Redeploy script failed: {0}")]
    RedeployScriptError(String),

    // Control plane errors
    #[error("Signal error: {0}")]
    SignalError(String),

    #[error("HTTP server error: {0}")]
    HttpError(String),

    // IO errors (automatically converted from std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for babysit operations
pub type Result<T> = std::result::Result<T, BabysitError>;
