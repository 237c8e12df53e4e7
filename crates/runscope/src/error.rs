//! Error types for Runscope API operations.
//!
//! Every failed API call carries a [`StatusKind`] derived from the HTTP
//! status code. Callers branch on the kind (for example, treating a
//! not-found read as "resource gone") and never on message text.

use std::fmt;

/// Result type alias for Runscope operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classification of API error statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    /// HTTP 404.
    NotFound,
    /// HTTP 403.
    Forbidden,
    /// HTTP 409.
    Conflict,
    /// Any other status of 300 or above.
    Other,
}

impl StatusKind {
    /// Classify an HTTP status code.
    #[must_use]
    pub fn from_status(status: u16) -> Self {
        match status {
            404 => Self::NotFound,
            403 => Self::Forbidden,
            409 => Self::Conflict,
            _ => Self::Other,
        }
    }

    /// Get a user-friendly description of this status kind.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::NotFound => "Resource not found",
            Self::Forbidden => "Access forbidden",
            Self::Conflict => "Conflicting resource state",
            Self::Other => "Unexpected API error",
        }
    }

    /// Get actionable advice for resolving this kind of error.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::NotFound => "The resource may have been deleted outside of this tool",
            Self::Forbidden => "Check that the access token can see this bucket or team",
            Self::Conflict => "Refresh state and try again",
            Self::Other => "Check the error details for more information",
        }
    }
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// The kind of call that failed, used in error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// POST of a new entity.
    Create,
    /// GET of a single entity.
    Read,
    /// PUT of an existing entity.
    Update,
    /// DELETE of an entity.
    Delete,
    /// GET of a collection.
    List,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            Self::Create => "creating",
            Self::Read => "reading",
            Self::Update => "updating",
            Self::Delete => "deleting",
            Self::List => "listing",
        };
        f.write_str(verb)
    }
}

/// Errors that can occur while talking to the Runscope API.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The API answered with a status of 300 or above.
    #[error("error {operation} {entity} {target}: status {status}: {reason}")]
    Api {
        /// What the client was doing.
        operation: Operation,
        /// Entity kind, e.g. "bucket".
        entity: &'static str,
        /// Name or ID of the entity involved.
        target: String,
        /// HTTP status code.
        status: u16,
        /// Classification of the status code.
        kind: StatusKind,
        /// Reason reported by the API, or the raw body.
        reason: String,
    },

    /// The request never produced a response.
    #[error("HTTP request failed: {0}")]
    Transport(String),

    /// The response body could not be decoded.
    #[error("invalid API response: {0}")]
    InvalidResponse(String),

    /// The entity was rejected locally before any request was sent.
    #[error("invalid {entity}: {message}")]
    Validation {
        /// Entity kind.
        entity: &'static str,
        /// What is wrong with it.
        message: String,
    },
}

impl Error {
    /// Create an API error, classifying the status.
    pub fn api(
        operation: Operation,
        entity: &'static str,
        target: impl Into<String>,
        status: u16,
        reason: impl Into<String>,
    ) -> Self {
        Self::Api {
            operation,
            entity,
            target: target.into(),
            status,
            kind: StatusKind::from_status(status),
            reason: reason.into(),
        }
    }

    /// Create a validation error.
    pub fn validation(entity: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            entity,
            message: message.into(),
        }
    }

    /// Status classification, if this error came from an API response.
    #[must_use]
    pub fn status_kind(&self) -> Option<StatusKind> {
        match self {
            Self::Api { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Whether the API reported the entity as missing.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status_kind() == Some(StatusKind::NotFound)
    }

    /// Whether the API refused access to the entity.
    #[must_use]
    pub fn is_forbidden(&self) -> bool {
        self.status_kind() == Some(StatusKind::Forbidden)
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_kind_from_status() {
        assert_eq!(StatusKind::from_status(404), StatusKind::NotFound);
        assert_eq!(StatusKind::from_status(403), StatusKind::Forbidden);
        assert_eq!(StatusKind::from_status(409), StatusKind::Conflict);
        assert_eq!(StatusKind::from_status(500), StatusKind::Other);
        assert_eq!(StatusKind::from_status(301), StatusKind::Other);
    }

    #[test]
    fn test_status_kind_description_and_advice() {
        assert!(!StatusKind::NotFound.description().is_empty());
        assert!(!StatusKind::Forbidden.advice().is_empty());
        assert!(format!("{}", StatusKind::Conflict).contains("Conflicting"));
    }

    #[test]
    fn test_api_error_classification() {
        let err = Error::api(Operation::Read, "test", "abc", 404, "not found");
        assert!(err.is_not_found());
        assert!(!err.is_forbidden());
        assert_eq!(err.status_kind(), Some(StatusKind::NotFound));

        let err = Error::api(Operation::Read, "environment", "abc", 403, "forbidden");
        assert!(err.is_forbidden());
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_non_api_errors_have_no_kind() {
        let err = Error::Transport("connection reset".to_string());
        assert_eq!(err.status_kind(), None);
        assert!(!err.is_not_found());

        let err = Error::validation("test step", "missing method");
        assert_eq!(err.status_kind(), None);
    }

    #[test]
    fn test_api_error_display() {
        let err = Error::api(Operation::Create, "bucket", "payments", 400, "bad team");
        let display = err.to_string();
        assert!(display.contains("creating bucket payments"));
        assert!(display.contains("status 400"));
        assert!(display.contains("bad team"));
    }

    #[test]
    fn test_serde_error_conversion() {
        let json_err = serde_json::from_str::<u32>("not json").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::InvalidResponse(_)));
    }
}
