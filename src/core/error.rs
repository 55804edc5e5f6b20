//! Request-scoped error taxonomy.
//!
//! Handlers and parameter validation raise these; the dispatcher reads the
//! carried status to shape the response. Any error that is not an
//! [`HttpError`] maps to `500 Internal Server Error`.

use thiserror::Error;

use super::status;

/// A request-scoped failure carrying an HTTP status code.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HttpError {
    /// Generic error with an explicit status.
    #[error("{message}")]
    Status { status: u16, message: String },

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    MethodNotAllowed(String),

    #[error("{0}")]
    Teapot(String),

    /// Parameter validation failure, always `400 Bad Request`.
    #[error("{0}")]
    Validation(String),
}

impl HttpError {
    /// Generic error; `None` defaults to internal server error.
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Status {
            status: status.unwrap_or(status::INTERNAL_SERVER_ERROR),
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn method_not_allowed(message: impl Into<String>) -> Self {
        Self::MethodNotAllowed(message.into())
    }

    pub fn teapot(message: impl Into<String>) -> Self {
        Self::Teapot(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// The HTTP status this error maps to.
    pub fn status(&self) -> u16 {
        match self {
            Self::Status { status, .. } => *status,
            Self::NotFound(_) => status::NOT_FOUND,
            Self::MethodNotAllowed(_) => status::METHOD_NOT_ALLOWED,
            Self::Teapot(_) => status::TEAPOT,
            Self::Validation(_) => status::BAD_REQUEST,
        }
    }

    /// Status for an arbitrary error: the carried status of an `HttpError`
    /// anywhere in the chain, else 500.
    pub fn status_of(err: &anyhow::Error) -> u16 {
        err.chain()
            .find_map(|e| e.downcast_ref::<Self>())
            .map_or(status::INTERNAL_SERVER_ERROR, Self::status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_taxonomy_statuses() {
        assert_eq!(HttpError::new(None, "boom").status(), 500);
        assert_eq!(HttpError::new(Some(409), "conflict").status(), 409);
        assert_eq!(HttpError::not_found("").status(), 404);
        assert_eq!(HttpError::method_not_allowed("").status(), 405);
        assert_eq!(HttpError::teapot("short and stout").status(), 418);
        assert_eq!(HttpError::validation("bad").status(), 400);
    }

    #[test]
    fn test_status_of_foreign_error_is_500() {
        let err = anyhow::anyhow!("something else");
        assert_eq!(HttpError::status_of(&err), 500);
    }

    #[test]
    fn test_status_of_wrapped_error() {
        let err: anyhow::Error = Err::<(), _>(HttpError::teapot("tea"))
            .context("while brewing")
            .unwrap_err();
        assert_eq!(HttpError::status_of(&err), 418);
    }

    #[test]
    fn test_message_is_display() {
        assert_eq!(HttpError::validation("Validation error").to_string(), "Validation error");
    }
}
