//! # nox-relay
//!
//! Transparent UDP relay and wire-protocol toolkit for Nox multiplayer
//! traffic.
//!
//! The relay sits between game clients and one game server. Every client is
//! given its own relay port toward the server, the handshake is rewritten in
//! flight so clients never see the obfuscation key, and every forwarded
//! datagram can be recorded to a JSON-lines capture for offline decoding.
//!
//! ## Modules
//! - [`core`]: datagram header and XOR obfuscation
//! - [`protocol`]: opcode registry, message codec, splitter, handshake rewriting
//! - [`transport`]: client ports and the proxy relay
//! - [`capture`]: capture records, the capture sink and the offline decoder
//! - [`config`]: TOML / environment configuration
//! - [`utils`]: logging setup and relay metrics
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use nox_relay::transport::Proxy;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let proxy = Arc::new(Proxy::new("127.0.0.1:18590".parse()?));
//! proxy.listen_and_serve("0.0.0.0:18600".parse()?).await?;
//! # Ok(())
//! # }
//! ```

pub mod capture;
pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod transport;
pub mod utils;

pub use config::RelayConfig;
pub use error::{RelayError, Result};
pub use protocol::{Message, NetMessage, Op};
pub use transport::Proxy;
