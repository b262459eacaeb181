//! Unified error handling system
//!
//! Every failure carries a stable [`ErrorCode`]. Storage failures are wrapped
//! with the name of the logical operation that produced them, and the code a
//! caller sees is found by unwrapping to the first error that sets one.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{error, warn};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub type Result<T> = std::result::Result<T, Error>;

/// Stable error classification exposed to the boundary layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Record or referenced foreign record is absent
    NotFound,
    /// Malformed input, decode failure or failed structural validation
    Invalid,
    /// Natural key already taken
    Conflict,
    /// Caller lacks the permission for the operation
    Unauthorized,
    /// Caller tried to grant permissions it does not hold
    Forbidden,
    /// Engine or storage failure
    Internal,
    /// Only produced by the boundary layer
    MethodNotAllowed,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::NotFound => "not found",
            ErrorCode::Invalid => "invalid",
            ErrorCode::Conflict => "conflict",
            ErrorCode::Unauthorized => "unauthorized",
            ErrorCode::Forbidden => "forbidden",
            ErrorCode::Internal => "internal error",
            ErrorCode::MethodNotAllowed => "method not allowed",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for Indagate
///
/// `code` is optional so that an error can act as a pure wrapper adding an
/// operation tag around another [`Error`].
#[derive(Error, Debug, Default)]
#[error("{}", render(.code, .op, .message, .source))]
pub struct Error {
    pub code: Option<ErrorCode>,
    pub message: Option<String>,
    pub op: Option<String>,
    #[source]
    pub source: Option<BoxError>,
}

fn render(
    code: &Option<ErrorCode>,
    op: &Option<String>,
    message: &Option<String>,
    source: &Option<BoxError>,
) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(3);
    if let Some(op) = op {
        parts.push(op.clone());
    }
    if let Some(message) = message {
        parts.push(message.clone());
    }
    if let Some(source) = source {
        parts.push(source.to_string());
    }
    if parts.is_empty() {
        return code.unwrap_or(ErrorCode::Internal).to_string();
    }
    parts.join(": ")
}

impl Error {
    pub fn new<S: Into<String>>(code: ErrorCode, message: S) -> Self {
        Self {
            code: Some(code),
            message: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn invalid<S: Into<String>>(message: S) -> Self {
        Self::new(ErrorCode::Invalid, message)
    }

    pub fn conflict<S: Into<String>>(message: S) -> Self {
        Self::new(ErrorCode::Conflict, message)
    }

    pub fn unauthorized<S: Into<String>>(message: S) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn forbidden<S: Into<String>>(message: S) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::new(ErrorCode::Internal, message)
    }

    pub fn method_not_allowed<S: Into<String>>(message: S) -> Self {
        Self::new(ErrorCode::MethodNotAllowed, message)
    }

    /// Tag `err` with the operation that failed, keeping its code
    pub fn wrap<S: Into<String>>(op: S, err: Error) -> Self {
        Self {
            code: None,
            message: None,
            op: Some(op.into()),
            source: Some(Box::new(err)),
        }
    }

    pub fn with_op<S: Into<String>>(mut self, op: S) -> Self {
        self.op = Some(op.into());
        self
    }

    pub fn with_source<E: Into<BoxError>>(mut self, source: E) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Dominant code: own code, else the code of the wrapped error, else internal
    pub fn code(&self) -> ErrorCode {
        if let Some(code) = self.code {
            return code;
        }
        match self
            .source
            .as_deref()
            .and_then(|source| source.downcast_ref::<Error>())
        {
            Some(inner) => inner.code(),
            None => ErrorCode::Internal,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.code() == ErrorCode::NotFound
    }

    pub fn is_unauthorized(&self) -> bool {
        self.code() == ErrorCode::Unauthorized
    }

    /// Log the error with appropriate level
    pub fn log(&self) {
        match self.code() {
            ErrorCode::Internal => {
                error!(code = %self.code(), op = ?self.op, error = %self, "Internal error occurred");
            }
            code => {
                warn!(code = %code, op = ?self.op, error = %self, "Operation failed");
            }
        }
    }
}

/// Code of an arbitrary error; foreign errors count as internal
pub fn error_code(err: &(dyn std::error::Error + 'static)) -> ErrorCode {
    match err.downcast_ref::<Error>() {
        Some(err) => err.code(),
        None => ErrorCode::Internal,
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error {
            code: Some(ErrorCode::Internal),
            message: Some("io failure".to_string()),
            op: None,
            source: Some(Box::new(err)),
        }
    }
}
