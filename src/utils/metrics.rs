//! Relay observability
//!
//! Atomic counters for the relay's datagram paths. One instance is owned by
//! each [`crate::transport::proxy::Proxy`], so relays running side by side
//! (as in tests) keep separate numbers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Counters for one relay instance
#[derive(Debug)]
pub struct RelayMetrics {
    /// Datagrams read from the public socket
    pub client_datagrams: AtomicU64,
    /// Bytes read from the public socket
    pub client_bytes: AtomicU64,
    /// Datagrams forwarded to the real server
    pub server_forwards: AtomicU64,
    /// Datagrams read from client port sockets that came from the real server
    pub server_datagrams: AtomicU64,
    /// Bytes read from the real server
    pub server_bytes: AtomicU64,
    /// Datagrams written back to real clients
    pub client_forwards: AtomicU64,
    /// Datagrams on client port sockets from someone other than the server
    pub foreign_datagrams: AtomicU64,
    /// Handshake datagrams rewritten by the interceptor
    pub handshakes_rewritten: AtomicU64,
    /// Client ports created
    pub ports_created: AtomicU64,
    /// Client port creations that failed
    pub port_errors: AtomicU64,
    /// Datagrams dropped because a socket write failed
    pub send_errors: AtomicU64,
    /// Capture records that could not be written
    pub capture_errors: AtomicU64,
    start_time: Instant,
}

impl RelayMetrics {
    pub fn new() -> Self {
        Self {
            client_datagrams: AtomicU64::new(0),
            client_bytes: AtomicU64::new(0),
            server_forwards: AtomicU64::new(0),
            server_datagrams: AtomicU64::new(0),
            server_bytes: AtomicU64::new(0),
            client_forwards: AtomicU64::new(0),
            foreign_datagrams: AtomicU64::new(0),
            handshakes_rewritten: AtomicU64::new(0),
            ports_created: AtomicU64::new(0),
            port_errors: AtomicU64::new(0),
            send_errors: AtomicU64::new(0),
            capture_errors: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a datagram read from a real client
    pub fn client_datagram(&self, byte_count: usize) {
        self.client_datagrams.fetch_add(1, Ordering::Relaxed);
        self.client_bytes
            .fetch_add(byte_count as u64, Ordering::Relaxed);
    }

    /// Record a datagram read from the real server
    pub fn server_datagram(&self, byte_count: usize) {
        self.server_datagrams.fetch_add(1, Ordering::Relaxed);
        self.server_bytes
            .fetch_add(byte_count as u64, Ordering::Relaxed);
    }

    pub fn server_forward(&self) {
        self.server_forwards.fetch_add(1, Ordering::Relaxed);
    }

    pub fn client_forward(&self) {
        self.client_forwards.fetch_add(1, Ordering::Relaxed);
    }

    pub fn foreign_datagram(&self) {
        self.foreign_datagrams.fetch_add(1, Ordering::Relaxed);
    }

    pub fn handshake_rewritten(&self) {
        self.handshakes_rewritten.fetch_add(1, Ordering::Relaxed);
    }

    pub fn port_created(&self) {
        self.ports_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn port_error(&self) {
        self.port_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn send_error(&self) {
        self.send_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn capture_error(&self) {
        self.capture_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            client_datagrams: self.client_datagrams.load(Ordering::Relaxed),
            client_bytes: self.client_bytes.load(Ordering::Relaxed),
            server_forwards: self.server_forwards.load(Ordering::Relaxed),
            server_datagrams: self.server_datagrams.load(Ordering::Relaxed),
            server_bytes: self.server_bytes.load(Ordering::Relaxed),
            client_forwards: self.client_forwards.load(Ordering::Relaxed),
            foreign_datagrams: self.foreign_datagrams.load(Ordering::Relaxed),
            handshakes_rewritten: self.handshakes_rewritten.load(Ordering::Relaxed),
            ports_created: self.ports_created.load(Ordering::Relaxed),
            port_errors: self.port_errors.load(Ordering::Relaxed),
            send_errors: self.send_errors.load(Ordering::Relaxed),
            capture_errors: self.capture_errors.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    /// Log current metrics
    pub fn log_metrics(&self) {
        let snapshot = self.snapshot();
        info!(
            client_datagrams = snapshot.client_datagrams,
            client_bytes = snapshot.client_bytes,
            server_forwards = snapshot.server_forwards,
            server_datagrams = snapshot.server_datagrams,
            server_bytes = snapshot.server_bytes,
            client_forwards = snapshot.client_forwards,
            foreign_datagrams = snapshot.foreign_datagrams,
            handshakes_rewritten = snapshot.handshakes_rewritten,
            ports_created = snapshot.ports_created,
            port_errors = snapshot.port_errors,
            send_errors = snapshot.send_errors,
            capture_errors = snapshot.capture_errors,
            uptime_seconds = snapshot.uptime_seconds,
            "Relay metrics snapshot"
        );
    }
}

impl Default for RelayMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub client_datagrams: u64,
    pub client_bytes: u64,
    pub server_forwards: u64,
    pub server_datagrams: u64,
    pub server_bytes: u64,
    pub client_forwards: u64,
    pub foreign_datagrams: u64,
    pub handshakes_rewritten: u64,
    pub ports_created: u64,
    pub port_errors: u64,
    pub send_errors: u64,
    pub capture_errors: u64,
    pub uptime_seconds: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let m = RelayMetrics::new();
        m.client_datagram(10);
        m.client_datagram(5);
        m.server_datagram(7);
        m.handshake_rewritten();

        let snap = m.snapshot();
        assert_eq!(snap.client_datagrams, 2);
        assert_eq!(snap.client_bytes, 15);
        assert_eq!(snap.server_bytes, 7);
        assert_eq!(snap.handshakes_rewritten, 1);
        assert_eq!(snap.send_errors, 0);
    }
}
