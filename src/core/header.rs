//! Datagram header: the two bytes in front of every frame.
//!
//! ```text
//! byte 0: [R|slot:7]   R = reliable flag
//! byte 1: [seq/ack]    sequence when reliable, acknowledgment otherwise
//! ```

/// Length of the datagram header in bytes.
pub const HEADER_LEN: usize = 2;

/// High bit of byte 0: reliable traffic.
pub const RELIABLE_FLAG: u8 = 0x80;

/// Low 7 bits of byte 0: session slot id.
pub const SLOT_MASK: u8 = 0x7F;

/// Parsed view of the two header bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatagramHeader {
    raw: [u8; HEADER_LEN],
}

impl DatagramHeader {
    pub fn new(raw: [u8; HEADER_LEN]) -> Self {
        Self { raw }
    }

    /// Split a datagram into its header and frame payload.
    ///
    /// Returns `None` when the datagram is shorter than the header.
    pub fn split(datagram: &[u8]) -> Option<(Self, &[u8])> {
        if datagram.len() < HEADER_LEN {
            return None;
        }
        let (hdr, payload) = datagram.split_at(HEADER_LEN);
        Some((Self::new([hdr[0], hdr[1]]), payload))
    }

    #[inline]
    pub fn is_reliable(&self) -> bool {
        self.raw[0] & RELIABLE_FLAG != 0
    }

    #[inline]
    pub fn slot_id(&self) -> u8 {
        self.raw[0] & SLOT_MASK
    }

    /// Sequence number, present only on reliable datagrams.
    pub fn seq(&self) -> Option<u8> {
        self.is_reliable().then_some(self.raw[1])
    }

    /// Acknowledgment number, present only on unreliable datagrams.
    pub fn ack(&self) -> Option<u8> {
        (!self.is_reliable()).then_some(self.raw[1])
    }

    pub fn as_bytes(&self) -> &[u8; HEADER_LEN] {
        &self.raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reliable_header_fields() {
        let hdr = DatagramHeader::new([0x85, 0x2A]);
        assert!(hdr.is_reliable());
        assert_eq!(hdr.slot_id(), 5);
        assert_eq!(hdr.seq(), Some(0x2A));
        assert_eq!(hdr.ack(), None);
    }

    #[test]
    fn test_unreliable_header_fields() {
        let hdr = DatagramHeader::new([0x7F, 0x03]);
        assert!(!hdr.is_reliable());
        assert_eq!(hdr.slot_id(), 0x7F);
        assert_eq!(hdr.seq(), None);
        assert_eq!(hdr.ack(), Some(3));
    }

    #[test]
    fn test_split_short_datagram() {
        assert!(DatagramHeader::split(&[0x80]).is_none());
        let (hdr, payload) = DatagramHeader::split(&[0x80, 0x00]).unwrap();
        assert_eq!(hdr.as_bytes(), &[0x80, 0x00]);
        assert!(payload.is_empty());
    }
}
