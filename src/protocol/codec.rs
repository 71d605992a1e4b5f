//! Frame encoding and decoding.
//!
//! Encoding never fails: any type/content pair becomes valid wire data, even
//! an OK frame with content. Only validation decides whether a frame is
//! acceptable.

use bytes::{BufMut, Bytes, BytesMut};

use super::MessageType;

/// Fixed header size in bytes.
pub const HEADER_SIZE: usize = 8;

/// A frame as it came off the stream, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    /// First header byte, not yet checked against the known types.
    pub type_byte: u8,
    /// Bytes obtained by the header read (at most `HEADER_SIZE`).
    pub header_bytes_read: usize,
    /// Bytes obtained by the content read.
    pub content_bytes_read: usize,
    /// Content length declared in the header.
    pub declared_length: u32,
    /// Content bytes that were actually read.
    pub content: Bytes,
}

/// Encode a frame: type byte, three zero bytes, big-endian length, content.
///
/// Content longer than `u32::MAX` bytes cannot be framed; its length field
/// saturates at `u32::MAX`. Check with [`wire_length`] before sending.
pub fn encode(msg_type: MessageType, content: &[u8]) -> Bytes {
    encode_raw(msg_type.as_u8(), content)
}

/// Encode with an arbitrary type byte.
pub fn encode_raw(type_byte: u8, content: &[u8]) -> Bytes {
    let length = wire_length(content.len()).unwrap_or(u32::MAX);
    let mut buf = BytesMut::with_capacity(HEADER_SIZE + content.len());
    buf.put_slice(&encode_header(type_byte, length));
    buf.put_slice(content);
    buf.freeze()
}

/// The header length field for `len` content bytes, if it fits.
pub fn wire_length(len: usize) -> Option<u32> {
    u32::try_from(len).ok()
}

/// Build an 8-byte header.
pub fn encode_header(type_byte: u8, content_length: u32) -> [u8; HEADER_SIZE] {
    let mut header = [0u8; HEADER_SIZE];
    header[0] = type_byte;
    header[4..8].copy_from_slice(&content_length.to_be_bytes());
    header
}

/// Read the declared content length from a header.
///
/// Missing bytes of a truncated header count as zero.
pub fn content_length(header: &[u8]) -> u32 {
    (4..HEADER_SIZE).fold(0u32, |acc, i| {
        let byte = header.get(i).copied().unwrap_or(0);
        (acc << 8) | u32::from(byte)
    })
}

/// Reinterpret header and content bytes as a raw frame. No validation.
pub fn decode(header: &[u8], content: Bytes) -> RawFrame {
    RawFrame {
        type_byte: header.first().copied().unwrap_or(0),
        header_bytes_read: header.len().min(HEADER_SIZE),
        content_bytes_read: content.len(),
        declared_length: content_length(header),
        content,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_write_hello() {
        let wire = encode(MessageType::Write, b"hello");
        assert_eq!(
            &wire[..],
            &[0x02, 0, 0, 0, 0, 0, 0, 0x05, 0x68, 0x65, 0x6C, 0x6C, 0x6F]
        );
    }

    #[test]
    fn test_encode_empty_frames() {
        assert_eq!(&encode(MessageType::Ok, b"")[..], &[1, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(&encode(MessageType::Ping, b"")[..], &[5, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_encode_counts_bytes_not_chars() {
        let text = "grüße";
        let wire = encode(MessageType::Write, text.as_bytes());
        assert_eq!(content_length(&wire[..HEADER_SIZE]), 7);
        assert_eq!(&wire[HEADER_SIZE..], text.as_bytes());
    }

    #[test]
    fn test_encode_ok_with_content_is_allowed() {
        let wire = encode(MessageType::Ok, b"should not be here");
        assert_eq!(wire.len(), HEADER_SIZE + 18);
        assert_eq!(wire[7], 18);
    }

    #[test]
    fn test_wire_length() {
        assert_eq!(wire_length(0), Some(0));
        assert_eq!(wire_length(u32::MAX as usize), Some(u32::MAX));
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_wire_length_overflow() {
        assert_eq!(wire_length(u32::MAX as usize + 1), None);
        assert_eq!(wire_length(usize::MAX), None);
    }

    #[test]
    fn test_content_length_high_bit() {
        let header = [2, 0, 0, 0, 0x80, 0, 0, 0xFF];
        assert_eq!(content_length(&header), 0x8000_00FF);

        let header = encode_header(2, 255);
        assert_eq!(&header[4..], &[0, 0, 0, 0xFF]);
        assert_eq!(content_length(&header), 255);
    }

    #[test]
    fn test_content_length_truncated_header() {
        assert_eq!(content_length(&[2, 0, 0, 0, 0x01]), 0x0100_0000);
        assert_eq!(content_length(&[2]), 0);
    }

    #[test]
    fn test_decode_ignores_reserved_bytes() {
        let header = [5, 0xAA, 0xBB, 0xCC, 0, 0, 0, 0];
        let raw = decode(&header, Bytes::new());
        assert_eq!(raw.type_byte, 5);
        assert_eq!(raw.declared_length, 0);
        assert_eq!(raw.header_bytes_read, HEADER_SIZE);
        assert_eq!(raw.content_bytes_read, 0);
    }

    #[test]
    fn test_decode_records_read_sizes() {
        let wire = encode(MessageType::Error, b"oops");
        let raw = decode(&wire[..HEADER_SIZE], wire.slice(HEADER_SIZE..));
        assert_eq!(raw.type_byte, 4);
        assert_eq!(raw.declared_length, 4);
        assert_eq!(raw.content_bytes_read, 4);
        assert_eq!(&raw.content[..], b"oops");

        let raw = decode(&wire[..3], Bytes::new());
        assert_eq!(raw.header_bytes_read, 3);
    }
}
