//! Error types for rs-backend.
//!
//! Storage backends report failures through a small closed taxonomy so that
//! callers (the HTTP layer, the CLI) can react to the kind of failure without
//! caring which medium produced it.

use std::fmt;

use thiserror::Error;

/// The main error type for rs-backend operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// The medium is unreachable or an I/O operation on it failed.
    #[error("storage unavailable: {message}")]
    StorageUnavailable {
        /// Description of what went wrong.
        message: String,
    },

    /// The credentials in use lack the access the operation needs.
    #[error("storage permission denied: {message}")]
    StoragePermissionDenied {
        /// Description of what went wrong.
        message: String,
    },

    /// The target location or identifier does not exist.
    #[error("storage not found: {message}")]
    StorageNotFound {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// A required location or credential was not supplied.
    #[error("invalid configuration: {message}")]
    ConfigurationInvalid {
        /// Description of the validation failure.
        message: String,
    },

    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    // === I/O Errors ===
    /// File system operation failed outside of a storage medium.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for rs-backend operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

/// Closed classification of [`Error`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Medium unreachable or I/O failure.
    StorageUnavailable,
    /// Credentials lack the required access.
    StoragePermissionDenied,
    /// Target location or identifier does not exist.
    StorageNotFound,
    /// Required settings missing or malformed.
    ConfigurationInvalid,
    /// Anything else.
    Internal,
}

impl ErrorKind {
    /// Classify a remote service status code.
    ///
    /// | status | kind                      |
    /// |--------|---------------------------|
    /// | 403    | `StoragePermissionDenied` |
    /// | 404    | `StorageNotFound`         |
    /// | other  | `StorageUnavailable`      |
    #[must_use]
    pub fn from_status(status: u16) -> Self {
        match status {
            403 => Self::StoragePermissionDenied,
            404 => Self::StorageNotFound,
            _ => Self::StorageUnavailable,
        }
    }

    /// Stable snake-case name, used in HTTP error bodies.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StorageUnavailable => "storage_unavailable",
            Self::StoragePermissionDenied => "storage_permission_denied",
            Self::StorageNotFound => "storage_not_found",
            Self::ConfigurationInvalid => "configuration_invalid",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    /// Create a storage-unavailable error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::StorageUnavailable {
            message: message.into(),
        }
    }

    /// Create a storage-permission-denied error.
    #[must_use]
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::StoragePermissionDenied {
            message: message.into(),
        }
    }

    /// Create a storage-not-found error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::StorageNotFound {
            message: message.into(),
        }
    }

    /// Create a configuration-invalid error.
    #[must_use]
    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::ConfigurationInvalid {
            message: message.into(),
        }
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Build the storage error matching a remote status code.
    #[must_use]
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        Self::from_kind(ErrorKind::from_status(status), message)
    }

    /// Map a medium I/O failure onto the storage taxonomy.
    #[must_use]
    pub fn from_medium_io(err: &std::io::Error, context: &str) -> Self {
        let message = format!("{context}: {err}");
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => Self::permission_denied(message),
            std::io::ErrorKind::NotFound => Self::not_found(message),
            _ => Self::unavailable(message),
        }
    }

    fn from_kind(kind: ErrorKind, message: impl Into<String>) -> Self {
        match kind {
            ErrorKind::StorageUnavailable => Self::unavailable(message),
            ErrorKind::StoragePermissionDenied => Self::permission_denied(message),
            ErrorKind::StorageNotFound => Self::not_found(message),
            ErrorKind::ConfigurationInvalid => Self::config_invalid(message),
            ErrorKind::Internal => Self::internal(message),
        }
    }

    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::StorageUnavailable { .. } => ErrorKind::StorageUnavailable,
            Self::StoragePermissionDenied { .. } => ErrorKind::StoragePermissionDenied,
            Self::StorageNotFound { .. } => ErrorKind::StorageNotFound,
            Self::ConfigurationInvalid { .. } | Self::ConfigLoad(_) => {
                ErrorKind::ConfigurationInvalid
            }
            Self::Io(_) | Self::Json(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Check if this error came from the storage medium.
    #[must_use]
    pub fn is_storage_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::StorageUnavailable
                | ErrorKind::StoragePermissionDenied
                | ErrorKind::StorageNotFound
        )
    }
}
