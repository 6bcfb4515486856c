// src/io/mb3/link.rs
//
// Transport seam for the protocol session. Session logic talks to a
// DeviceLink so command exchanges can be driven against scripted links
// in tests; TcpLink is the real socket.

use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::io::IoError;

/// Bytes consumed per response frame. A single read, no reassembly: an
/// acknowledgement split across TCP segments or longer than this is not
/// put back together.
pub const RESPONSE_BUFFER_SIZE: usize = 1024;

/// One open connection to the device.
#[async_trait]
pub trait DeviceLink: Send {
    /// Write all bytes and flush.
    async fn send(&mut self, bytes: &[u8]) -> Result<(), IoError>;

    /// Read one response frame: a single read of at most
    /// `RESPONSE_BUFFER_SIZE` bytes, lossily decoded, surrounding
    /// whitespace trimmed.
    async fn read_response(&mut self) -> Result<String, IoError>;

    /// Close the connection. The session calls this exactly once per
    /// attempt, success or failure.
    async fn close(&mut self) -> Result<(), IoError>;
}

/// TCP implementation with explicit connect and read deadlines.
#[derive(Debug)]
pub struct TcpLink {
    stream: TcpStream,
    endpoint: String,
    read_timeout: Duration,
}

impl TcpLink {
    pub async fn connect(
        host: &str,
        port: u16,
        connect_timeout: Duration,
        read_timeout: Duration,
    ) -> Result<Self, IoError> {
        let endpoint = format!("mb3({}:{})", host, port);

        let stream = match tokio::time::timeout(connect_timeout, TcpStream::connect((host, port)))
            .await
        {
            Ok(Ok(s)) => s,
            Ok(Err(e)) => return Err(IoError::connection(&endpoint, e.to_string())),
            Err(_) => return Err(IoError::timeout(&endpoint, "connect")),
        };

        Ok(Self {
            stream,
            endpoint,
            read_timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl DeviceLink for TcpLink {
    async fn send(&mut self, bytes: &[u8]) -> Result<(), IoError> {
        self.stream
            .write_all(bytes)
            .await
            .map_err(|e| IoError::write(&self.endpoint, e.to_string()))?;
        self.stream
            .flush()
            .await
            .map_err(|e| IoError::write(&self.endpoint, e.to_string()))
    }

    async fn read_response(&mut self) -> Result<String, IoError> {
        let mut buf = [0u8; RESPONSE_BUFFER_SIZE];
        let n = match tokio::time::timeout(self.read_timeout, self.stream.read(&mut buf)).await {
            Ok(Ok(0)) => {
                return Err(IoError::connection(&self.endpoint, "closed by device"));
            }
            Ok(Ok(n)) => n,
            Ok(Err(e)) => return Err(IoError::read(&self.endpoint, e.to_string())),
            Err(_) => return Err(IoError::timeout(&self.endpoint, "response")),
        };
        Ok(String::from_utf8_lossy(&buf[..n]).trim().to_string())
    }

    async fn close(&mut self) -> Result<(), IoError> {
        // Best-effort; the socket may already be gone.
        let _ = self.stream.shutdown().await;
        Ok(())
    }
}
