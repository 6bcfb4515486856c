// src/io/mb3/session.rs
//
// The MB3 transmission sequence and the retry controller wrapped around
// each command exchange.
//
// Sequence per attempt: discover, connect, advisory status query,
// file-write announcement, payload, final acknowledgement, close. The
// link is closed exactly once on every path out, including cancellation
// and transport errors.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::io::IoError;
use crate::marking::Layout;

use super::codec;
use super::link::{DeviceLink, TcpLink};
use super::scanner;
use super::SendError;

/// Acknowledgement substring.
pub const ACK: &str = "@ACK";
/// Negative-acknowledgement substring.
pub const NAK: &str = "@NAK";

/// Message returned to the operator on a fully acknowledged transmission.
pub const SUCCESS_MESSAGE: &str =
    "MB3 successfully acknowledged the file and data transmission.";

/// Tunables for one transmission attempt.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub port: u16,
    /// Per-host timeout during the discovery sweep.
    pub probe_timeout: Duration,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    /// Attempts per command exchange.
    pub max_retries: u32,
    /// Pause after an explicit `@NAK` before the resend.
    pub retry_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            port: codec::DEVICE_PORT,
            probe_timeout: scanner::DEFAULT_PROBE_TIMEOUT,
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(10),
            max_retries: 3,
            retry_delay: Duration::from_millis(2000),
        }
    }
}

/// How a command exchange judges the device's response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AckPolicy {
    /// Success only on an explicit `@ACK`. Used for the file-write
    /// announcement.
    RequireAck,
    /// Anything that is not an explicit `@NAK` counts as success; the
    /// status query on older firmware answers with arbitrary info text.
    AcceptUnlessNak,
}

impl AckPolicy {
    fn accepts(&self, response: &str) -> bool {
        match self {
            AckPolicy::RequireAck => response.contains(ACK),
            AckPolicy::AcceptUnlessNak => !response.contains(NAK),
        }
    }
}

/// Send `command` and wait for an acceptable response, up to
/// `max_retries` attempts. An explicit `@NAK` waits `retry_delay` before
/// the resend; a response that is neither accepted nor `@NAK` burns the
/// attempt and retries immediately. Transport errors abort the exchange.
///
/// Returns whether the exchange was ultimately accepted.
pub async fn exchange(
    link: &mut dyn DeviceLink,
    command: &str,
    policy: AckPolicy,
    max_retries: u32,
    retry_delay: Duration,
) -> Result<bool, IoError> {
    let mut attempts = 0;
    while attempts < max_retries {
        link.send(command.as_bytes()).await?;
        let response = link.read_response().await?;
        tlog!(
            "[mb3::session] {} -> {}",
            command.trim_end(),
            response
        );

        if policy.accepts(&response) {
            return Ok(true);
        }
        if response.contains(NAK) {
            tlog!(
                "[mb3::session] Device answered @NAK, retrying in {}ms",
                retry_delay.as_millis()
            );
            tokio::time::sleep(retry_delay).await;
        }
        attempts += 1;
    }
    Ok(false)
}

/// Run one full transmission against an already-open link, then close
/// it. Split from the connect path so the protocol behavior is driven
/// against scripted links in tests.
pub async fn transmit_over(
    link: &mut dyn DeviceLink,
    payload: &str,
    config: &SessionConfig,
    cancel: &AtomicBool,
) -> Result<String, SendError> {
    let result = run_sequence(link, payload, config, cancel).await;
    let _ = link.close().await;
    result
}

async fn run_sequence(
    link: &mut dyn DeviceLink,
    payload: &str,
    config: &SessionConfig,
    cancel: &AtomicBool,
) -> Result<String, SendError> {
    tlog!(
        "[mb3::session] Payload {} bytes (hex {})",
        payload.len(),
        codec::hex_length(payload)
    );

    // Advisory status check: older firmware drops the query entirely, so
    // an exhausted exchange is logged and transmission proceeds.
    check_cancelled(cancel)?;
    let status_ok = exchange(
        link,
        codec::STATUS_COMMAND,
        AckPolicy::AcceptUnlessNak,
        config.max_retries,
        config.retry_delay,
    )
    .await?;
    if !status_ok {
        tlog!("[mb3::session] Status check failed after retries, proceeding anyway");
    }

    check_cancelled(cancel)?;
    let file_command = codec::file_write_command(payload);
    let file_ok = exchange(
        link,
        &file_command,
        AckPolicy::RequireAck,
        config.max_retries,
        config.retry_delay,
    )
    .await?;
    if !file_ok {
        return Err(SendError::FileCommandRejected);
    }

    check_cancelled(cancel)?;
    link.send(payload.as_bytes()).await?;
    let response = link.read_response().await?;
    tlog!("[mb3::session] Data response: {}", response);
    if !response.contains(ACK) {
        return Err(SendError::DataNotAcknowledged);
    }

    Ok(SUCCESS_MESSAGE.to_string())
}

/// Full transmission: discover the device, connect, run the sequence.
/// `None` sends the built-in connectivity-test payload.
pub async fn transmit(
    layout: Option<&Layout>,
    config: &SessionConfig,
    cancel: &AtomicBool,
) -> Result<String, SendError> {
    let address = scanner::discover(config.port, config.probe_timeout, cancel).await?;

    check_cancelled(cancel)?;
    tlog!("[mb3::session] Connecting to MB3 at {}:{}", address, config.port);
    let mut link = TcpLink::connect(
        &address,
        config.port,
        config.connect_timeout,
        config.read_timeout,
    )
    .await?;

    let payload = match layout {
        Some(layout) => codec::build_payload(layout),
        None => codec::TEST_PAYLOAD.clone(),
    };

    transmit_over(&mut link, &payload, config, cancel).await
}

fn check_cancelled(cancel: &AtomicBool) -> Result<(), SendError> {
    if cancel.load(Ordering::Relaxed) {
        Err(SendError::Cancelled)
    } else {
        Ok(())
    }
}
