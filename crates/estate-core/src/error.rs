//! Error types for the Estate application.

use thiserror::Error;

/// A shared error type for the entire Estate application.
///
/// Backend messages are carried verbatim so the UI can surface them
/// unchanged (sign-in failures in particular).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EstateError {
    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// The operation needs a signed-in (or guest) identity.
    #[error("User not authenticated")]
    Unauthenticated,

    /// Authentication service rejected the request.
    #[error("{0}")]
    Auth(String),

    /// Remote store answered with an error.
    #[error("Backend error{}: {message}", status_suffix(.status))]
    Backend { status: Option<u16>, message: String },

    /// Transport-level failure (connection refused, timeout, ...).
    #[error("Network error: {0}")]
    Network(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl EstateError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a NotFound error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates an Auth error carrying the backend message unchanged
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }

    /// Creates a Backend error
    pub fn backend(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Backend {
            status,
            message: message.into(),
        }
    }

    /// Creates a Network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, Self::Unauthenticated)
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }

    /// True for failures worth retrying later (network and 5xx backend errors).
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Backend {
                status: Some(status),
                ..
            } => *status >= 500,
            _ => false,
        }
    }

    /// The message shown to the user for this failure.
    ///
    /// Auth and backend errors surface the service's own wording.
    pub fn user_message(&self) -> String {
        match self {
            Self::Auth(message) => message.clone(),
            Self::Backend { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for EstateError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for EstateError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for EstateError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// Conversion from anyhow::Error (used by adapters that compose foreign errors)
impl From<anyhow::Error> for EstateError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({s})")).unwrap_or_default()
}

/// A type alias for `Result<T, EstateError>`.
pub type Result<T> = std::result::Result<T, EstateError>;
