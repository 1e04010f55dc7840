//! Offline decoding of captured datagrams.
//!
//! Each record is split and decoded with the same codec the relay uses. A
//! record is "fully attributed" when every byte belongs to a message with a
//! registered opcode. Otherwise the listing stops at the first unattributed
//! bytes, which still get a `msgs` entry without fields; `ops` then ends with
//! `"???"` and `data` keeps the raw hex.

use std::io::{BufRead, Write};

use tracing::{debug, warn};

use crate::capture::record::{CaptureRecord, DecodedMessage, DecodedRecord};
use crate::core::header::DatagramHeader;
use crate::error::Result;
use crate::protocol::codec::DecodeState;
use crate::protocol::op::Op;
use crate::protocol::splitter::split;

/// Marker appended to `ops` when trailing bytes could not be attributed.
pub const UNPARSED_MARKER: &str = "???";

/// Decode one capture record.
///
/// `state` is reused across records; its direction flag is set from the
/// record's `src_id` before decoding.
pub fn decode_record(record: &CaptureRecord, state: &mut DecodeState) -> DecodedRecord {
    let mut out = DecodedRecord {
        src_id: record.src_id,
        dst_id: record.dst_id,
        src: record.src.clone(),
        dst: record.dst.clone(),
        data: Some(record.data.clone()),
        ..Default::default()
    };

    let raw = match hex::decode(&record.data) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(error = %e, src_id = record.src_id, "Capture record data is not hex");
            return out;
        }
    };
    out.len = raw.len();
    let Some((header, payload)) = DatagramHeader::split(&raw) else {
        return out;
    };

    out.hdr = hex::encode(header.as_bytes());
    out.sid = header.slot_id();
    out.syn = header.seq();
    out.ack = header.ack();
    state.is_client = record.is_client();

    if let [op] = payload {
        let op = Op(*op);
        if op.is_registered() && state.decode_next(payload).is_err() {
            out.op = Some(op.to_string());
            return out;
        }
    }

    let parts = split(payload, state);
    let mut attributed = parts.fully_split;
    let last = parts.messages.len().saturating_sub(1);
    for (i, part) in parts.messages.into_iter().enumerate() {
        let is_remainder = !parts.fully_split && i == last;
        let unattributed = is_remainder || !part.op.is_registered();
        if unattributed {
            debug!(op = %part.op, len = part.raw.len(), "Unattributed bytes in capture");
            attributed = false;
        } else {
            out.ops.push(part.op.to_string());
        }
        out.msgs.push(DecodedMessage {
            op: part.op.to_string(),
            fields: if unattributed { None } else { part.message },
            len: part.raw.len(),
            data: hex::encode(part.raw),
        });
        if unattributed {
            break;
        }
    }

    if attributed {
        out.data = None;
    } else {
        out.ops.push(UNPARSED_MARKER.to_string());
    }
    out
}

/// Decode a JSON-lines capture stream into a JSON-lines decoded stream.
///
/// Returns the number of records written. Stops at the first read, parse or
/// write error.
pub fn decode_stream<R: BufRead, W: Write>(reader: R, mut writer: W) -> Result<usize> {
    let mut state = DecodeState::default();
    let mut count = 0usize;
    for record in serde_json::Deserializer::from_reader(reader).into_iter::<CaptureRecord>() {
        let decoded = decode_record(&record?, &mut state);
        serde_json::to_writer(&mut writer, &decoded)?;
        writer.write_all(b"\n")?;
        count += 1;
    }
    writer.flush()?;
    Ok(count)
}
