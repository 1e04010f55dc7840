//! # Transport Layer
//!
//! UDP plumbing for the relay.
//!
//! ## Components
//! - **Client ports**: one local socket per real client, created on first contact
//! - **Proxy**: public listener, per-port receive loops and datagram forwarding
//!
//! All sockets are tokio [`UdpSocket`](tokio::net::UdpSocket)s; shutdown is
//! driven by a shared cancellation token.

pub mod client_port;
pub mod proxy;

pub use client_port::{ClientPort, ClientPortManager};
pub use proxy::Proxy;
