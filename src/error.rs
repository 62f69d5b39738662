//! Error types for the guestbook

use thiserror::Error;

/// Result type alias for guestbook operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur across the store, service and client layers
#[derive(Error, Debug)]
pub enum Error {
    /// No record carries the requested id
    #[error("Signature not found")]
    NotFound,

    /// The create payload was rejected before it reached the store
    #[error("{0}")]
    Validation(String),

    /// The store cannot serve the request (closed, poisoned, I/O fault)
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// A journal line in the middle of the file could not be parsed
    #[error("Corrupt journal at line {line}: {reason}")]
    CorruptJournal { line: usize, reason: String },

    /// Export was requested from a blank capture surface
    #[error("Please provide a signature first.")]
    EmptySignature,

    /// Rasterizing or encoding the captured strokes failed
    #[error("Rendering failed: {0}")]
    RenderError(String),

    /// Transport-level failure talking to the service
    #[error("Network error: {0}")]
    NetworkError(String),

    /// The service answered with a non-success status
    #[error("Server responded with {status}: {message}")]
    Http { status: u16, message: String },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// True for the not-found condition, whether raised locally or reported
    /// by the service as a 404.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound | Error::Http { status: 404, .. })
    }
}

impl<T> From<std::sync::PoisonError<T>> for Error {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Error::StoreUnavailable(format!("lock poisoned: {}", err))
    }
}

#[cfg(feature = "client")]
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::NetworkError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_matches_wire_text() {
        assert_eq!(Error::NotFound.to_string(), "Signature not found");
    }

    #[test]
    fn http_404_counts_as_not_found() {
        let e = Error::Http {
            status: 404,
            message: "Signature not found".into(),
        };
        assert!(e.is_not_found());
        assert!(!Error::Validation("x".into()).is_not_found());
    }
}
