// src/io/mb3/mod.rs
//
// MB3 marking device driver.
//
// The MB3 speaks a line-oriented text protocol on TCP port 23. A
// transmission is one short-lived connection: an advisory status query
// (`@inf`), a length-prefixed file-write announcement (`@f_wfile`), the
// marking payload itself, then a final acknowledgement. The device
// answers with frames judged by their `@ACK` / `@NAK` substrings.
//
// The device takes whatever address the site DHCP hands it, so every
// transmission starts from scratch: sweep the local /24, connect, talk,
// close. Nothing is cached between attempts.

pub mod codec;
pub mod link;
pub mod scanner;
pub mod session;

use std::fmt;

use crate::io::IoError;

pub use codec::DEVICE_PORT;
pub use link::{DeviceLink, TcpLink};
pub use session::{transmit, SessionConfig};

/// Terminal failure of one transmission attempt. Converted to the
/// operator-facing message at the facade boundary.
#[derive(Debug)]
pub enum SendError {
    /// No usable local IPv4 address, so no subnet to sweep.
    NoLocalAddress,
    /// The /24 sweep exhausted every host without an accepted connection.
    DeviceNotFound,
    /// The `@f_wfile` announcement was never acknowledged; no payload
    /// bytes were sent.
    FileCommandRejected,
    /// The payload went out but the final response carried no `@ACK`.
    DataNotAcknowledged,
    /// The operator cancelled the attempt.
    Cancelled,
    /// Transport failure during connect/read/write.
    Transport(IoError),
}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendError::NoLocalAddress => {
                write!(f, "Failed to get local IP address. Is the network up?")
            }
            SendError::DeviceNotFound => write!(f, "Failed to find MB3 device on the network."),
            SendError::FileCommandRejected => {
                write!(f, "Failed to send @f_wfile command. MB3 did not acknowledge.")
            }
            SendError::DataNotAcknowledged => {
                write!(f, "Failed to send data. MB3 did not acknowledge.")
            }
            SendError::Cancelled => write!(f, "Transmission cancelled."),
            SendError::Transport(e) => write!(f, "Transmission failed: {}", e),
        }
    }
}

impl std::error::Error for SendError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SendError::Transport(e) => Some(e),
            _ => None,
        }
    }
}

impl From<IoError> for SendError {
    fn from(e: IoError) -> Self {
        SendError::Transport(e)
    }
}
