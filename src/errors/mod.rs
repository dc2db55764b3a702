//! Error types for the Syncthing client.

use std::fmt;
use thiserror::Error;

/// Result type alias for Syncthing operations.
pub type SyncthingResult<T> = Result<T, SyncthingError>;

/// Error kinds for categorizing Syncthing errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncthingErrorKind {
    // Local errors, raised before any I/O
    /// Invalid argument passed to a call.
    InvalidArgument,
    /// Invalid client configuration.
    InvalidConfiguration,

    // Status-code driven errors
    /// Bad or missing credentials (401).
    Unauthorized,
    /// Login attempt limit reached (403 with a lockout marker in the body).
    LoginAttemptsExceeded,
    /// Abuse detection triggered (403 with an abuse marker in the body).
    AbuseDetected,
    /// Access forbidden (403 without a more specific marker).
    Forbidden,
    /// Resource not found (404).
    NotFound,
    /// Any other error status (>= 400).
    Api,

    // Pipeline errors
    /// Failed to serialize a request body or deserialize a response body.
    Serialization,

    // Transport errors
    /// Connection failed.
    ConnectionFailed,
    /// Request timed out.
    Timeout,
    /// The call was cancelled before the transport completed.
    Cancelled,
    /// Unclassified transport failure.
    Transport,
}

impl fmt::Display for SyncthingErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument => write!(f, "invalid_argument"),
            Self::InvalidConfiguration => write!(f, "invalid_configuration"),
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::LoginAttemptsExceeded => write!(f, "login_attempts_exceeded"),
            Self::AbuseDetected => write!(f, "abuse_detected"),
            Self::Forbidden => write!(f, "forbidden"),
            Self::NotFound => write!(f, "not_found"),
            Self::Api => write!(f, "api_error"),
            Self::Serialization => write!(f, "serialization_error"),
            Self::ConnectionFailed => write!(f, "connection_failed"),
            Self::Timeout => write!(f, "timeout"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Transport => write!(f, "transport_error"),
        }
    }
}

/// Syncthing API error with the HTTP status and body attached when available.
#[derive(Error, Debug)]
pub struct SyncthingError {
    kind: SyncthingErrorKind,
    message: String,
    status_code: Option<u16>,
    body: Option<String>,
    #[source]
    cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for SyncthingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)?;
        if let Some(code) = self.status_code {
            write!(f, " (HTTP {})", code)?;
        }
        Ok(())
    }
}

impl SyncthingError {
    /// Creates a new Syncthing error.
    pub fn new(kind: SyncthingErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status_code: None,
            body: None,
            cause: None,
        }
    }

    /// Sets the HTTP status code.
    pub fn with_status(mut self, code: u16) -> Self {
        self.status_code = Some(code);
        self
    }

    /// Sets the raw response body.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Sets the underlying cause.
    pub fn with_cause(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Gets the error kind.
    pub fn kind(&self) -> &SyncthingErrorKind {
        &self.kind
    }

    /// Gets the HTTP status code.
    pub fn status_code(&self) -> Option<u16> {
        self.status_code
    }

    /// Gets the raw response body, when one was received.
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// Classifies an error HTTP response into a typed error.
    ///
    /// 401 and 404 map directly; 403 is refined by inspecting the body for
    /// the lockout marker first, then the abuse markers. Every other status
    /// >= 400 becomes a generic API error. Status and body are always kept
    /// for diagnostics.
    pub fn from_response(status: u16, body: &str) -> Self {
        let kind = match status {
            401 => SyncthingErrorKind::Unauthorized,
            403 => Self::kind_for_forbidden(body),
            404 => SyncthingErrorKind::NotFound,
            _ => SyncthingErrorKind::Api,
        };
        Self::new(kind, format!("HTTP {} error", status))
            .with_status(status)
            .with_body(body)
    }

    fn kind_for_forbidden(body: &str) -> SyncthingErrorKind {
        if body.contains("number of login attempts exceeded") {
            return SyncthingErrorKind::LoginAttemptsExceeded;
        }
        if body.contains("abuse-rate-limits") || body.contains("abuse detection mechanism") {
            return SyncthingErrorKind::AbuseDetected;
        }
        SyncthingErrorKind::Forbidden
    }

    // Convenience constructors

    /// Creates an invalid-argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(SyncthingErrorKind::InvalidArgument, message)
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(SyncthingErrorKind::InvalidConfiguration, message)
    }

    /// Creates a serialization error.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(SyncthingErrorKind::Serialization, message)
    }

    /// Creates a timeout error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(SyncthingErrorKind::Timeout, message)
    }

    /// Creates a cancellation error.
    pub fn cancelled() -> Self {
        Self::new(SyncthingErrorKind::Cancelled, "the request was cancelled")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_error_display() {
        let error =
            SyncthingError::new(SyncthingErrorKind::NotFound, "folder not found").with_status(404);

        let display = format!("{}", error);
        assert!(display.contains("not_found"));
        assert!(display.contains("folder not found"));
        assert!(display.contains("404"));
    }

    #[test_case(401, SyncthingErrorKind::Unauthorized; "unauthorized")]
    #[test_case(404, SyncthingErrorKind::NotFound; "not found")]
    #[test_case(409, SyncthingErrorKind::Api; "conflict")]
    #[test_case(500, SyncthingErrorKind::Api; "server error")]
    fn test_from_response_statuses(status: u16, kind: SyncthingErrorKind) {
        assert_eq!(*SyncthingError::from_response(status, "").kind(), kind);
    }

    #[test]
    fn test_forbidden_refinement() {
        let lockout =
            SyncthingError::from_response(403, "number of login attempts exceeded, try later");
        assert_eq!(*lockout.kind(), SyncthingErrorKind::LoginAttemptsExceeded);

        let abuse = SyncthingError::from_response(403, "you hit the abuse detection mechanism");
        assert_eq!(*abuse.kind(), SyncthingErrorKind::AbuseDetected);

        let plain = SyncthingError::from_response(403, "nope");
        assert_eq!(*plain.kind(), SyncthingErrorKind::Forbidden);
    }

    #[test]
    fn test_body_and_status_attached() {
        let error = SyncthingError::from_response(500, "internal error");
        assert_eq!(error.status_code(), Some(500));
        assert_eq!(error.body(), Some("internal error"));
    }
}
