// src/transmit.rs
//
// Public transmission entry points. One transmission at a time: the
// busy slot is taken with a compare-and-swap and held for the whole
// attempt, so an overlapping send is rejected outright instead of
// racing the first one on the device socket.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::io::mb3::session::{self, SessionConfig};
use crate::marking::Layout;

/// Message returned when a send is rejected because one is in flight.
pub const BUSY_MESSAGE: &str = "A transmission is already in progress.";

/// Facade over the protocol session for a UI shell or the CLI. All
/// failures come back as the operator-facing message string.
pub struct Transmitter {
    config: SessionConfig,
    busy: Arc<AtomicBool>,
    cancel: Arc<AtomicBool>,
}

impl Transmitter {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            busy: Arc::new(AtomicBool::new(false)),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Request cancellation of the in-flight transmission, if any. The
    /// attempt ends at its next checkpoint with a cancelled outcome.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Discover the device and transmit a layout snapshot.
    pub async fn send_layout(&self, layout: &Layout) -> Result<String, String> {
        self.send(Some(layout)).await
    }

    /// Discover the device and transmit the built-in test payload.
    pub async fn send_test(&self) -> Result<String, String> {
        self.send(None).await
    }

    async fn send(&self, layout: Option<&Layout>) -> Result<String, String> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tlog!("[transmit] Rejected overlapping send");
            return Err(BUSY_MESSAGE.to_string());
        }
        let _slot = BusySlot(&self.busy);

        self.cancel.store(false, Ordering::Relaxed);
        session::transmit(layout, &self.config, &self.cancel)
            .await
            .map_err(|e| e.to_string())
    }
}

impl Default for Transmitter {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

/// Releases the busy slot when the attempt ends, whatever the outcome.
struct BusySlot<'a>(&'a AtomicBool);

impl Drop for BusySlot<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
