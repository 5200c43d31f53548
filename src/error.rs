// Application error taxonomy
//
// Every layer returns `AppError`. The kind decides the HTTP status at the edge;
// the message is the machine-readable code (or validation text) and the cause
// keeps the original failure for logs.
use std::fmt;

/// Boxed underlying failure attached to an `AppError`.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Closed set of error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    BadRequest,
    InternalServerError,
    Authorization,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::BadRequest => "BAD_REQUEST_ERROR",
            ErrorKind::InternalServerError => "INTERNAL_SERVER_ERROR",
            ErrorKind::Authorization => "AUTHORIZATION_ERROR",
        };
        f.write_str(name)
    }
}

/// Error codes shared across layers and surfaced on the wire.
pub mod codes {
    pub const DB_CREATE_ERROR: &str = "db_create_error";
    pub const DB_ERROR: &str = "db_error";
    pub const RECORD_NOT_FOUND: &str = "record_not_found";
    pub const VALIDATION_FAILURE: &str = "validation_failure";

    pub const UNAUTHORIZED: &str = "unauthorized";
    pub const BAD_REQUEST_ERROR: &str = "bad_request_error";
    pub const SERVER_ERROR: &str = "server_error";
}

/// Typed application error with an optional wrapped cause.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct AppError {
    kind: ErrorKind,
    message: String,
    #[source]
    cause: Option<BoxError>,
}

impl AppError {
    fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, message)
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InternalServerError, message)
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authorization, message)
    }

    /// Attach an underlying cause. The kind is left untouched.
    pub fn wrap<E>(mut self, cause: E) -> Self
    where
        E: Into<BoxError>,
    {
        self.cause = Some(cause.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn is_of_kind(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn cause(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        self.cause.as_deref()
    }

    /// Message followed by the cause chain, for logs only.
    pub fn detailed(&self) -> String {
        let mut out = self.message.clone();
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            out.push_str(": ");
            out.push_str(&err.to_string());
            source = err.source();
        }
        out
    }
}
