//! Per-client relay sockets.
//!
//! Every real client gets its own local socket toward the real server, so
//! the server sees one ordinary peer per client. Ports are created lazily on
//! the first datagram from a new client address and live as long as the
//! manager; there is no idle expiry.

use std::collections::HashMap;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

use crate::core::obfuscation::ObfuscationKey;
use crate::error::Result;

/// Relay session for one real client.
#[derive(Debug)]
pub struct ClientPort {
    id: u32,
    real_client: SocketAddr,
    socket: UdpSocket,
    write_lock: Mutex<()>,
    key: ObfuscationKey,
}

impl ClientPort {
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn real_client(&self) -> SocketAddr {
        self.real_client
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn key(&self) -> &ObfuscationKey {
        &self.key
    }

    /// Receive the next datagram on this port's socket.
    pub async fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        self.socket.recv_from(buf).await
    }

    /// Obfuscate `data` in place with the port key (if any) and send it to `server`.
    pub async fn send_to_server(&self, data: &mut [u8], server: SocketAddr) -> io::Result<usize> {
        self.key.apply(data);
        debug!(
            port = self.id,
            server = %server,
            len = data.len(),
            data = %hex::encode(&*data),
            "CP -> SRV"
        );
        let _guard = self.write_lock.lock().await;
        self.socket.send_to(data, server).await
    }
}

/// Registry of client ports keyed by real client address.
#[derive(Debug)]
pub struct ClientPortManager {
    bind_ip: IpAddr,
    next_id: AtomicU32,
    ports: RwLock<HashMap<SocketAddr, Arc<ClientPort>>>,
}

impl ClientPortManager {
    /// New manager whose port sockets bind to `bind_ip` on ephemeral ports.
    pub fn new(bind_ip: IpAddr) -> Self {
        Self {
            bind_ip,
            next_id: AtomicU32::new(0),
            ports: RwLock::new(HashMap::new()),
        }
    }

    /// Existing port for `addr`.
    pub async fn get(&self, addr: &SocketAddr) -> Option<Arc<ClientPort>> {
        self.ports.read().await.get(addr).cloned()
    }

    pub async fn len(&self) -> usize {
        self.ports.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.ports.read().await.is_empty()
    }

    /// Return the port for `addr`, creating it on first contact.
    ///
    /// Creation binds a fresh socket, assigns the next id, registers the port
    /// and then calls `on_create` (used to start the port's receive loop),
    /// all under the exclusive registry lock so one address never gets two
    /// ports. A bind failure registers nothing and is returned.
    #[instrument(skip(self, on_create), fields(client = %addr))]
    pub async fn acquire<F>(&self, addr: SocketAddr, on_create: F) -> Result<Arc<ClientPort>>
    where
        F: FnOnce(&Arc<ClientPort>),
    {
        if let Some(port) = self.ports.read().await.get(&addr) {
            return Ok(Arc::clone(port));
        }

        let mut ports = self.ports.write().await;
        if let Some(port) = ports.get(&addr) {
            return Ok(Arc::clone(port));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let socket = match UdpSocket::bind(SocketAddr::new(self.bind_ip, 0)).await {
            Ok(socket) => socket,
            Err(e) => {
                warn!(error = %e, id, bind_ip = %self.bind_ip, "Cannot allocate client port");
                return Err(e.into());
            }
        };

        let port = Arc::new(ClientPort {
            id,
            real_client: addr,
            socket,
            write_lock: Mutex::new(()),
            key: ObfuscationKey::new(),
        });
        info!(
            id,
            real = %addr,
            proxy = %port.local_addr().map(|a| a.to_string()).unwrap_or_default(),
            "New client port"
        );
        ports.insert(addr, Arc::clone(&port));
        on_create(&port);
        Ok(port)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use std::net::Ipv4Addr;

    fn loopback() -> IpAddr {
        IpAddr::V4(Ipv4Addr::LOCALHOST)
    }

    #[tokio::test]
    async fn test_acquire_reuses_port() {
        let manager = ClientPortManager::new(loopback());
        let client: SocketAddr = "127.0.0.1:40001".parse().unwrap();
        let mut created = 0;

        let a = manager.acquire(client, |_| created += 1).await.unwrap();
        let b = manager.acquire(client, |_| created += 1).await.unwrap();

        assert_eq!(created, 1);
        assert_eq!(a.id(), 1);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(manager.len().await, 1);
    }

    #[tokio::test]
    async fn test_ids_are_monotonic() {
        let manager = ClientPortManager::new(loopback());
        for n in 1..=3u32 {
            let client = SocketAddr::new(loopback(), 40_000 + n as u16);
            let port = manager.acquire(client, |_| {}).await.unwrap();
            assert_eq!(port.id(), n);
            assert_eq!(port.real_client(), client);
        }
    }

    #[tokio::test]
    async fn test_bind_failure_rolls_back() {
        // TEST-NET-1 is never assigned to a local interface.
        let manager = ClientPortManager::new("192.0.2.1".parse().unwrap());
        let client: SocketAddr = "127.0.0.1:40009".parse().unwrap();
        let mut created = false;

        let result = manager.acquire(client, |_| created = true).await;

        assert!(result.is_err());
        assert!(!created);
        assert!(manager.is_empty().await);
        assert!(manager.get(&client).await.is_none());
    }
}
