//! Error types for directory operations.
//!
//! Every public operation reports failure as a single [`Error`]: an LDAP result code plus a
//! message. Failures raised below the session boundary arrive as a textual signal of the form
//! `"<code>:<message>"` (or a bare message) and are decoded once by [`Error::from_signal`].

use crate::result_code::ResultCode;
use serde::Serialize;
use thiserror::Error;

/// Broad classification of an [`Error`] by where it originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    /// Result code reported by the directory server.
    Protocol,
    /// Failure detected by the client itself (codes 200-206).
    ClientLocal,
    /// Argument or state check that failed before any session call.
    Precondition,
    /// Signal without a numeric code.
    Unknown,
}

/// Directory operation error.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error(
    "LDAP Result Code {} {:?}: {}",
    .result_code,
    .result_code.description(),
    .message
)]
pub struct Error {
    result_code: ResultCode,
    message: String,
}

/// Specialized result type for directory operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Creates an error with an explicit result code.
    #[must_use]
    pub fn new(result_code: impl Into<ResultCode>, message: impl Into<String>) -> Self {
        Self {
            result_code: result_code.into(),
            message: message.into(),
        }
    }

    /// Creates a precondition failure (param error) raised before any session call.
    #[must_use]
    pub fn param(message: impl Into<String>) -> Self {
        Self::new(ResultCode::PARAM_ERROR, message)
    }

    /// Creates a client-local network failure.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ResultCode::NETWORK, message)
    }

    /// Creates the error returned when a simple bind is attempted with an empty password.
    #[must_use]
    pub fn empty_password() -> Self {
        Self::new(
            ResultCode::EMPTY_PASSWORD,
            "empty password not allowed by the client",
        )
    }

    /// Decodes a failure signal.
    ///
    /// The signal is split on its first colon. When the left part parses as an integer it
    /// becomes the result code and the right part the message; otherwise the code is
    /// [`ResultCode::UNKNOWN`] and the whole signal is kept as the message.
    #[must_use]
    pub fn from_signal(signal: &str) -> Self {
        match signal.split_once(':') {
            Some((code, message)) => match code.parse::<i32>() {
                Ok(code) => Self::new(code, message),
                Err(_) => Self::new(ResultCode::UNKNOWN, signal),
            },
            None => Self::new(ResultCode::UNKNOWN, signal),
        }
    }

    /// Returns the LDAP result code.
    #[must_use]
    pub const fn result_code(&self) -> ResultCode {
        self.result_code
    }

    /// Returns the message text.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the table description of the result code (empty when unknown).
    #[must_use]
    pub const fn description(&self) -> &'static str {
        self.result_code.description()
    }

    /// Classifies the error by origin.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        if self.result_code.value() == ResultCode::PARAM_ERROR.value() {
            ErrorKind::Precondition
        } else if self.result_code.is_client_local() {
            ErrorKind::ClientLocal
        } else if self.result_code.value() == ResultCode::UNKNOWN.value() {
            ErrorKind::Unknown
        } else {
            ErrorKind::Protocol
        }
    }

    /// Returns true if the code matches `code`.
    #[must_use]
    pub fn is(&self, code: ResultCode) -> bool {
        self.result_code == code
    }

    /// Returns true if this error should be logged as a serious error.
    #[must_use]
    pub const fn should_log(&self) -> bool {
        matches!(self.kind(), ErrorKind::ClientLocal | ErrorKind::Unknown)
    }
}

// Conversions from external error types
impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::network(format!("invalid directory URL: {err}"))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::param(format!("invalid connection parameters: {err}"))
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::param(err.to_string())
    }
}
