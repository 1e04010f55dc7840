//! # Proxy Relay
//!
//! Two flows run for the lifetime of the relay:
//!
//! - **client → server**: one task reads the shared public socket, finds or
//!   creates the sender's [`ClientPort`] and forwards the datagram through it
//!   (obfuscated once the port key is known);
//! - **server → client**: one task per client port reads the port socket,
//!   drops anything not sent by the real server, decrypts, runs the
//!   [`Interceptor`] and writes the result to the real client through the
//!   public socket.
//!
//! Every datagram is handled to completion by the task that read it; there is
//! no queueing and no retry. A failed write drops that datagram only.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::capture::record::CaptureRecord;
use crate::capture::sink::CaptureSink;
use crate::config::ProxyConfig;
use crate::error::{constants, RelayError, Result};
use crate::protocol::handshake::Interceptor;
use crate::transport::client_port::{ClientPort, ClientPortManager};
use crate::utils::metrics::RelayMetrics;

/// Capture id used for the server side of a record.
pub const SERVER_SIDE_ID: u32 = 0;

/// Transparent UDP relay between many real clients and one real server.
#[derive(Debug)]
pub struct Proxy {
    real_server: SocketAddr,
    listener: Mutex<Option<Arc<UdpSocket>>>,
    ports: ClientPortManager,
    interceptor: Interceptor,
    capture: Option<CaptureSink>,
    metrics: RelayMetrics,
    shutdown: CancellationToken,
    max_datagram: usize,
}

impl Proxy {
    /// Relay toward `real_server`; client ports bind to the unspecified
    /// address of the server's family.
    pub fn new(real_server: SocketAddr) -> Self {
        let bind_ip = match real_server {
            SocketAddr::V4(_) => std::net::Ipv4Addr::UNSPECIFIED.into(),
            SocketAddr::V6(_) => std::net::Ipv6Addr::UNSPECIFIED.into(),
        };
        Self {
            real_server,
            listener: Mutex::new(None),
            ports: ClientPortManager::new(bind_ip),
            interceptor: Interceptor::default(),
            capture: None,
            metrics: RelayMetrics::new(),
            shutdown: CancellationToken::new(),
            max_datagram: crate::config::DEFAULT_MAX_DATAGRAM,
        }
    }

    /// Relay built from configuration, opening the capture file if one is set.
    pub fn from_config(config: &ProxyConfig) -> Result<Self> {
        let mut proxy = Self::new(config.server_addr()?);
        proxy.ports = ClientPortManager::new(config.bind_ip()?);
        proxy.interceptor = Interceptor::new(config.server_name_prefix.clone());
        proxy.max_datagram = config.max_datagram_size;
        if let Some(path) = &config.capture_file {
            proxy.capture = Some(CaptureSink::create(path)?);
        }
        Ok(proxy)
    }

    pub fn with_capture(mut self, sink: CaptureSink) -> Self {
        self.capture = Some(sink);
        self
    }

    pub fn with_interceptor(mut self, interceptor: Interceptor) -> Self {
        self.interceptor = interceptor;
        self
    }

    pub fn real_server(&self) -> SocketAddr {
        self.real_server
    }

    pub fn ports(&self) -> &ClientPortManager {
        &self.ports
    }

    pub fn metrics(&self) -> &RelayMetrics {
        &self.metrics
    }

    /// Bind the public socket on `addr` and serve it.
    pub async fn listen_and_serve(self: &Arc<Self>, addr: SocketAddr) -> Result<()> {
        let socket = UdpSocket::bind(addr).await?;
        self.serve(socket).await
    }

    /// Serve real clients on `socket` until it fails or [`Proxy::close`] is called.
    #[instrument(skip(self, socket), fields(server = %self.real_server))]
    pub async fn serve(self: &Arc<Self>, socket: UdpSocket) -> Result<()> {
        let socket = Arc::new(socket);
        info!(
            host = %socket.local_addr()?,
            server = %self.real_server,
            "Serving proxy"
        );
        *self.listener.lock().await = Some(Arc::clone(&socket));

        let mut buf = vec![0u8; self.max_datagram];
        loop {
            let (n, addr) = tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("Proxy listener stopped");
                    return Ok(());
                }
                received = socket.recv_from(&mut buf) => match received {
                    Ok(v) => v,
                    Err(e) => {
                        error!(error = %e, "Public socket read failed");
                        return Err(e.into());
                    }
                },
            };
            self.send_as_client(addr, &mut buf[..n]).await;
        }
    }

    /// Stop all workers, drop the public socket and close the capture sink.
    pub async fn close(&self) -> Result<()> {
        self.shutdown.cancel();
        self.listener.lock().await.take();
        if let Some(capture) = &self.capture {
            capture.close()?;
        }
        Ok(())
    }

    /// Forward a datagram from a real client to the real server.
    async fn send_as_client(self: &Arc<Self>, real_client: SocketAddr, data: &mut [u8]) {
        self.metrics.client_datagram(data.len());

        let port = match self
            .ports
            .acquire(real_client, |port| self.spawn_port_worker(port))
            .await
        {
            Ok(port) => port,
            Err(e) => {
                self.metrics.port_error();
                warn!(client = %real_client, error = %e, "Cannot host client");
                return;
            }
        };

        self.record(port.id(), SERVER_SIDE_ID, real_client, self.real_server, data);
        debug!(
            port = port.id(),
            client = %real_client,
            len = data.len(),
            data = %hex::encode(&*data),
            "CLI -> SP"
        );

        match port.send_to_server(data, self.real_server).await {
            Ok(_) => self.metrics.server_forward(),
            Err(e) => {
                self.metrics.send_error();
                warn!(client = %real_client, error = %e, "Cannot send client packet");
            }
        }
    }

    fn spawn_port_worker(self: &Arc<Self>, port: &Arc<ClientPort>) {
        self.metrics.port_created();
        let proxy = Arc::clone(self);
        let port = Arc::clone(port);
        tokio::spawn(async move { proxy.serve_port(port).await });
    }

    /// Receive loop for one client port; exits on read error or shutdown.
    async fn serve_port(self: Arc<Self>, port: Arc<ClientPort>) {
        let mut buf = vec![0u8; self.max_datagram];
        loop {
            let (n, from) = tokio::select! {
                _ = self.shutdown.cancelled() => return,
                received = port.recv_from(&mut buf) => match received {
                    Ok(v) => v,
                    Err(e) => {
                        warn!(port = port.id(), client = %port.real_client(), error = %e, "Client port listener failed");
                        return;
                    }
                },
            };
            let data = &mut buf[..n];

            if from != self.real_server {
                self.metrics.foreign_datagram();
                warn!(
                    port = port.id(),
                    from = %from,
                    len = n,
                    data = %hex::encode(&*data),
                    "Dropping datagram not sent by the server"
                );
                continue;
            }

            self.metrics.server_datagram(n);
            debug!(port = port.id(), len = n, data = %hex::encode(&*data), "SRV -> CP");
            port.key().apply(data);

            let out = self.interceptor.intercept_server(port.key(), data);
            if let std::borrow::Cow::Owned(_) = out {
                self.metrics.handshake_rewritten();
            }
            if out.is_empty() {
                continue;
            }

            if let Err(e) = self.send_to_client(&port, &out).await {
                self.metrics.send_error();
                warn!(client = %port.real_client(), error = %e, "Cannot send to client");
            }
        }
    }

    /// Write a datagram to a real client through the public socket.
    async fn send_to_client(&self, port: &ClientPort, data: &[u8]) -> Result<()> {
        let listener = self.listener.lock().await;
        let socket = listener
            .as_ref()
            .ok_or(RelayError::Closed(constants::ERR_RELAY_CLOSED))?;
        self.record(SERVER_SIDE_ID, port.id(), self.real_server, port.real_client(), data);
        debug!(
            port = port.id(),
            client = %port.real_client(),
            len = data.len(),
            data = %hex::encode(data),
            "SP -> CLI"
        );
        socket.send_to(data, port.real_client()).await?;
        self.metrics.client_forward();
        Ok(())
    }

    /// Best-effort capture; failures are logged and counted only.
    fn record(&self, src_id: u32, dst_id: u32, src: SocketAddr, dst: SocketAddr, data: &[u8]) {
        let Some(capture) = &self.capture else {
            return;
        };
        let record = CaptureRecord::new(src_id, dst_id, src.to_string(), dst.to_string(), data);
        if let Err(e) = capture.record(&record) {
            self.metrics.capture_error();
            warn!(error = %e, "Cannot record datagram");
        }
    }
}
