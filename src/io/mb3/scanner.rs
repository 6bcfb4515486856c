// src/io/mb3/scanner.rs
//
// Subnet discovery for the MB3.
//
// Architecture:
//   - Derive the /24 prefix from the local IPv4 address
//   - Sequential probe of .1 through .255, first accepted connect wins
//   - Probe failures mean "not this host", never abort the sweep
//   - Bounded per-probe timeout; the worst case is one empty sweep

use std::future::Future;
use std::net::{Ipv4Addr, SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::net::TcpStream;

use super::SendError;

/// Per-host probe timeout.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(500);

/// Local IPv4 address of the active uplink.
///
/// Connects a UDP socket to a public address and reads back the source
/// address the OS routing table picked; no packet leaves the machine.
/// `None` when there is no usable IPv4 route (link down, no network).
pub fn local_ipv4() -> Option<Ipv4Addr> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect(("8.8.8.8", 80)).ok()?;
    match socket.local_addr().ok()? {
        SocketAddr::V4(addr) if !addr.ip().is_unspecified() => Some(*addr.ip()),
        _ => None,
    }
}

/// /24 prefix of an address: 192.168.1.7 -> "192.168.1".
pub fn subnet_prefix(addr: Ipv4Addr) -> String {
    let [a, b, c, _] = addr.octets();
    format!("{}.{}.{}", a, b, c)
}

/// Probe one host: does it accept a TCP connection on the device port
/// within the timeout? The connection is dropped immediately either way.
async fn probe_host(host: &str, port: u16, timeout: Duration) -> bool {
    matches!(
        tokio::time::timeout(timeout, TcpStream::connect((host, port))).await,
        Ok(Ok(_))
    )
}

/// Sweep `<prefix>.1` through `<prefix>.255` ascending, stopping at the
/// first host `probe` accepts. Generic over the probe so the sweep
/// itself is exercised in tests without opening sockets.
pub async fn scan_subnet_with<F, Fut>(
    prefix: &str,
    cancel: &AtomicBool,
    mut probe: F,
) -> Result<String, SendError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = bool>,
{
    for suffix in 1..=255u8 {
        if cancel.load(Ordering::Relaxed) {
            return Err(SendError::Cancelled);
        }
        let host = format!("{}.{}", prefix, suffix);
        if probe(host.clone()).await {
            tlog!("[mb3::scanner] Device found at {}", host);
            return Ok(host);
        }
    }
    Err(SendError::DeviceNotFound)
}

/// Locate the MB3 on the local /24. Fails without scanning when the
/// local address cannot be determined.
pub async fn discover(
    port: u16,
    probe_timeout: Duration,
    cancel: &AtomicBool,
) -> Result<String, SendError> {
    let local = local_ipv4().ok_or(SendError::NoLocalAddress)?;
    let prefix = subnet_prefix(local);
    tlog!(
        "[mb3::scanner] Local address {}, sweeping {}.1-255 on port {}",
        local,
        prefix,
        port
    );
    scan_subnet_with(&prefix, cancel, |host| async move {
        probe_host(&host, port, probe_timeout).await
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recording_probe(
        probed: Arc<Mutex<Vec<String>>>,
        accept: impl Fn(&str) -> bool + 'static,
    ) -> impl FnMut(String) -> std::future::Ready<bool> {
        move |host: String| {
            probed.lock().unwrap().push(host.clone());
            std::future::ready(accept(&host))
        }
    }

    #[tokio::test]
    async fn test_scan_stops_at_first_acceptor() {
        let probed = Arc::new(Mutex::new(Vec::new()));
        let cancel = AtomicBool::new(false);

        let found = scan_subnet_with(
            "10.1.2",
            &cancel,
            recording_probe(probed.clone(), |host| host == "10.1.2.42"),
        )
        .await
        .unwrap();

        assert_eq!(found, "10.1.2.42");
        let probed = probed.lock().unwrap();
        assert_eq!(probed.len(), 42);
        assert_eq!(probed[0], "10.1.2.1");
        assert_eq!(probed[41], "10.1.2.42");
    }

    #[tokio::test]
    async fn test_scan_probes_every_host_once_in_order() {
        let probed = Arc::new(Mutex::new(Vec::new()));
        let cancel = AtomicBool::new(false);

        let err = scan_subnet_with("192.168.0", &cancel, recording_probe(probed.clone(), |_| false))
            .await
            .unwrap_err();

        assert!(matches!(err, SendError::DeviceNotFound));
        let probed = probed.lock().unwrap();
        assert_eq!(probed.len(), 255);
        for (i, host) in probed.iter().enumerate() {
            assert_eq!(host, &format!("192.168.0.{}", i + 1));
        }
    }

    #[tokio::test]
    async fn test_cancel_aborts_before_probing() {
        let probed = Arc::new(Mutex::new(Vec::new()));
        let cancel = AtomicBool::new(true);

        let err = scan_subnet_with("192.168.0", &cancel, recording_probe(probed.clone(), |_| true))
            .await
            .unwrap_err();

        assert!(matches!(err, SendError::Cancelled));
        assert!(probed.lock().unwrap().is_empty());
    }

    #[test]
    fn test_subnet_prefix() {
        assert_eq!(subnet_prefix(Ipv4Addr::new(192, 168, 1, 7)), "192.168.1");
        assert_eq!(subnet_prefix(Ipv4Addr::new(10, 0, 0, 254)), "10.0.0");
    }

    #[tokio::test]
    async fn test_probe_host_accepts_listener() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        assert!(probe_host("127.0.0.1", port, Duration::from_millis(500)).await);
    }

    #[tokio::test]
    async fn test_probe_host_rejects_closed_port() {
        // Bind-then-drop to get a port nothing is listening on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        assert!(!probe_host("127.0.0.1", port, Duration::from_millis(500)).await);
    }
}
