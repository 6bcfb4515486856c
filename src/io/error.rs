// src/io/error.rs
//
// Typed transport errors for device communication.
//
// Every error carries the endpoint string it happened on so the message
// shown to the operator names the device, not just the syscall.

use std::fmt;

/// What went wrong at the transport layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IoErrorKind {
    /// Could not open (or lost) the connection.
    Connection,
    /// An operation did not complete within its deadline.
    Timeout,
    /// Reading from the device failed.
    Read,
    /// Writing to the device failed.
    Write,
    /// The device broke the expected exchange shape.
    Protocol,
}

/// A transport-level failure on a named endpoint.
///
/// Use `.map_err(String::from)` at boundaries that need a plain string.
#[derive(Clone, Debug)]
pub struct IoError {
    kind: IoErrorKind,
    endpoint: String,
    detail: String,
}

impl IoError {
    pub fn connection(endpoint: &str, detail: impl Into<String>) -> Self {
        Self {
            kind: IoErrorKind::Connection,
            endpoint: endpoint.to_string(),
            detail: detail.into(),
        }
    }

    /// `operation` names what timed out, e.g. "connect" or "response".
    pub fn timeout(endpoint: &str, operation: impl Into<String>) -> Self {
        Self {
            kind: IoErrorKind::Timeout,
            endpoint: endpoint.to_string(),
            detail: operation.into(),
        }
    }

    pub fn read(endpoint: &str, detail: impl Into<String>) -> Self {
        Self {
            kind: IoErrorKind::Read,
            endpoint: endpoint.to_string(),
            detail: detail.into(),
        }
    }

    pub fn write(endpoint: &str, detail: impl Into<String>) -> Self {
        Self {
            kind: IoErrorKind::Write,
            endpoint: endpoint.to_string(),
            detail: detail.into(),
        }
    }

    pub fn protocol(endpoint: &str, detail: impl Into<String>) -> Self {
        Self {
            kind: IoErrorKind::Protocol,
            endpoint: endpoint.to_string(),
            detail: detail.into(),
        }
    }

    pub fn kind(&self) -> IoErrorKind {
        self.kind
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn is_timeout(&self) -> bool {
        self.kind == IoErrorKind::Timeout
    }
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            IoErrorKind::Connection => {
                write!(f, "Connection to {} failed: {}", self.endpoint, self.detail)
            }
            IoErrorKind::Timeout => {
                write!(f, "Timed out waiting for {} on {}", self.detail, self.endpoint)
            }
            IoErrorKind::Read => write!(f, "Read from {} failed: {}", self.endpoint, self.detail),
            IoErrorKind::Write => write!(f, "Write to {} failed: {}", self.endpoint, self.detail),
            IoErrorKind::Protocol => {
                write!(f, "Protocol error on {}: {}", self.endpoint, self.detail)
            }
        }
    }
}

impl std::error::Error for IoError {}

impl From<IoError> for String {
    fn from(e: IoError) -> Self {
        e.to_string()
    }
}
