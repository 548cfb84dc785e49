use std::fmt;

use serde::Serialize;

/// Taxonomy tag carried by every failed verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Network,
    Server,
    ExtractionPath,
    TypeMismatch,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorKind::Validation => "validation error",
            ErrorKind::Network => "network error",
            ErrorKind::Server => "server error",
            ErrorKind::ExtractionPath => "extraction path error",
            ErrorKind::TypeMismatch => "type mismatch",
        };
        f.write_str(label)
    }
}

/// Failures raised while building, sending or reading a call to an org endpoint.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EndpointError {
    /// A required field is missing or malformed; no request was sent.
    #[error("{0}")]
    Validation(String),

    /// Transport failure, timeout, cancellation or a non-JSON body.
    #[error("{0}")]
    Network(String),

    /// Non-2xx status from the org endpoint.
    #[error("{message}")]
    Server { status: u16, message: String },

    /// The response path could not be parsed or walked.
    #[error("{0}")]
    ExtractionPath(String),

    /// The value at the response path is not a non-empty string.
    #[error("Extracted value is not a valid text string (found {found}). Path: {path}")]
    TypeMismatch { path: String, found: &'static str },
}

impl EndpointError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EndpointError::Validation(_) => ErrorKind::Validation,
            EndpointError::Network(_) => ErrorKind::Network,
            EndpointError::Server { .. } => ErrorKind::Server,
            EndpointError::ExtractionPath(_) => ErrorKind::ExtractionPath,
            EndpointError::TypeMismatch { .. } => ErrorKind::TypeMismatch,
        }
    }

    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        EndpointError::Validation(msg.into())
    }
}
