// src/connectivity.rs
//
// Link observation for UI gating. The watcher polls the local-address
// probe and broadcasts transitions. Protocol code never consults this
// state; every transmission re-discovers the device on a fresh sweep.

use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::io::mb3::scanner;

/// A link transition observed by the watcher.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkEvent {
    pub online: bool,
    /// Local IPv4 while online.
    pub address: Option<String>,
}

/// Polls for a usable local IPv4 address and broadcasts every flip,
/// including the initial state on the first poll. Subscribe before the
/// first poll interval elapses to see that initial event.
pub struct ConnectivityWatcher {
    events: broadcast::Sender<LinkEvent>,
    task: JoinHandle<()>,
}

impl ConnectivityWatcher {
    /// Spawn the watcher on the current tokio runtime.
    pub fn start(poll_interval: Duration) -> Self {
        Self::start_with(poll_interval, || {
            scanner::local_ipv4().map(|a| a.to_string())
        })
    }

    /// Watcher with an injected address probe.
    pub fn start_with<F>(poll_interval: Duration, mut probe: F) -> Self
    where
        F: FnMut() -> Option<String> + Send + 'static,
    {
        let (events, _) = broadcast::channel(16);
        let tx = events.clone();
        let task = tokio::spawn(async move {
            let mut last: Option<bool> = None;
            loop {
                tokio::time::sleep(poll_interval).await;
                let address = probe();
                let online = address.is_some();
                if last != Some(online) {
                    last = Some(online);
                    tlog!(
                        "[connectivity] Link {}",
                        if online { "up" } else { "down" }
                    );
                    let _ = tx.send(LinkEvent { online, address });
                }
            }
        });
        Self { events, task }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LinkEvent> {
        self.events.subscribe()
    }

    /// Stop polling. Subscribers see the channel close.
    pub fn stop(self) {
        self.task.abort();
    }
}
