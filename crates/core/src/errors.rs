use std::path::PathBuf;

/// Result type alias for grace operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for grace operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration errors
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// A signal name that does not map to a supported signal
    #[error("unsupported signal '{name}'")]
    InvalidSignal { name: String },

    /// Installing the OS signal listener failed
    #[error("failed to register listener for signals [{}]: {source}", .signals.join(", "))]
    SignalRegistration {
        signals: Vec<String>,
        #[source]
        source: std::io::Error,
    },

    /// File system operations
    #[error("file system {operation} operation failed for '{path}': {source}")]
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// A unit of work hit a condition it cannot recover from
    #[error("worker '{worker}' failed: {message}")]
    Worker { worker: String, message: String },
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::Json {
            message: error.to_string(),
            source: error,
        }
    }
}

// Helper methods for creating errors with context
impl Error {
    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    /// Create an invalid signal error
    #[must_use]
    pub fn invalid_signal(name: impl Into<String>) -> Self {
        Error::InvalidSignal { name: name.into() }
    }

    /// Create a signal registration error
    #[must_use]
    pub fn signal_registration(signals: Vec<String>, source: std::io::Error) -> Self {
        Error::SignalRegistration { signals, source }
    }

    /// Create a file system error with context
    #[must_use]
    pub fn file_system(
        path: impl Into<PathBuf>,
        operation: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Error::FileSystem {
            path: path.into(),
            operation: operation.into(),
            source,
        }
    }

    /// Create a worker failure
    #[must_use]
    pub fn worker(worker: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Worker {
            worker: worker.into(),
            message: message.into(),
        }
    }
}
