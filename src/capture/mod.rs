//! # Packet Capture
//!
//! Recording forwarded datagrams and decoding the recordings offline.
//!
//! ## Components
//! - **Record**: input/output JSON-lines record shapes
//! - **Sink**: lock-guarded writer the relay records into
//! - **Decoder**: turns raw records into per-message decoded traces
//!
//! ## Input Line
//! ```text
//! {"src_id":1,"dst_id":0,"src":"10.0.0.5:4000","dst":"127.0.0.1:18590","data":"80050f"}
//! ```

pub mod decoder;
pub mod record;
pub mod sink;

pub use decoder::{decode_record, decode_stream, UNPARSED_MARKER};
pub use record::{CaptureRecord, DecodedMessage, DecodedRecord};
pub use sink::CaptureSink;
