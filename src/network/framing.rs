//! Length-prefixed framing
//!
//! Every message on a peer stream is a 4-byte big-endian payload length
//! followed by exactly that many bytes.

use crate::error::{LedgerError, Result};
use std::io::{Read, Write};

pub const FRAME_HEADER_LEN: usize = 4;

/// Largest payload a peer may announce; longer frames are refused before
/// any buffer is allocated
pub const MAX_FRAME_LEN: usize = 32 * 1024 * 1024;

pub fn encode_len(len: usize) -> Result<[u8; FRAME_HEADER_LEN]> {
    if len > MAX_FRAME_LEN {
        return Err(LedgerError::FrameTooLarge(len));
    }
    let len = u32::try_from(len).map_err(|_| LedgerError::FrameTooLarge(len))?;
    Ok(len.to_be_bytes())
}

pub fn decode_len(header: [u8; FRAME_HEADER_LEN]) -> usize {
    u32::from_be_bytes(header) as usize
}

/// Write one frame and flush
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> Result<()> {
    let header = encode_len(payload.len())?;
    writer.write_all(&header)?;
    writer.write_all(payload)?;
    writer.flush()?;
    Ok(())
}

/// Read one full frame, blocking until the whole payload has arrived
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Vec<u8>> {
    let mut header = [0u8; FRAME_HEADER_LEN];
    reader.read_exact(&mut header)?;
    let len = decode_len(header);
    if len > MAX_FRAME_LEN {
        return Err(LedgerError::FrameTooLarge(len));
    }
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload)?;
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_header_is_big_endian() {
        assert_eq!(encode_len(0).unwrap(), [0, 0, 0, 0]);
        assert_eq!(encode_len(16).unwrap(), [0, 0, 0, 16]);
        assert_eq!(encode_len(300).unwrap(), [0, 0, 1, 44]);
        assert_eq!(encode_len(0x0102_0304).unwrap(), [1, 2, 3, 4]);
        assert_eq!(decode_len([0, 0, 1, 44]), 300);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_oversized_length_rejected() {
        let err = encode_len(u32::MAX as usize + 1).unwrap_err();
        assert!(matches!(err, LedgerError::FrameTooLarge(_)));
    }

    #[test]
    fn test_announced_length_over_limit_is_refused() {
        let mut wire = vec![0xFF, 0xFF, 0xFF, 0xFF];
        wire.push(1);
        let err = read_frame(&mut Cursor::new(wire)).unwrap_err();
        assert!(matches!(err, LedgerError::FrameTooLarge(len) if len == u32::MAX as usize));

        let err = write_frame(&mut Vec::new(), &vec![0u8; MAX_FRAME_LEN + 1]).unwrap_err();
        assert!(matches!(err, LedgerError::FrameTooLarge(_)));
    }

    #[test]
    fn test_frames_are_read_back_in_order() {
        let mut wire = Vec::new();
        let large = vec![7u8; 70_000];
        write_frame(&mut wire, b"C1").unwrap();
        write_frame(&mut wire, b"").unwrap();
        write_frame(&mut wire, &large).unwrap();
        assert_eq!(wire.len(), 3 * FRAME_HEADER_LEN + 2 + large.len());

        let mut reader = Cursor::new(wire);
        assert_eq!(read_frame(&mut reader).unwrap(), b"C1");
        assert!(read_frame(&mut reader).unwrap().is_empty());
        assert_eq!(read_frame(&mut reader).unwrap(), large);
        assert!(read_frame(&mut reader).is_err());
    }

    #[test]
    fn test_truncated_payload_is_an_error() {
        let mut wire = Vec::new();
        write_frame(&mut wire, b"truncated").unwrap();
        wire.truncate(wire.len() - 3);
        assert!(read_frame(&mut Cursor::new(wire)).is_err());
    }
}
