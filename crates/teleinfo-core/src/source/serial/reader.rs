use std::io::BufRead;

use super::error::SerialSourceError;
use super::layout;

/// Discard bytes until a frame boundary has been consumed.
///
/// Establishes initial synchronization with the stream: everything read
/// before the first boundary byte belongs to a frame whose start was
/// missed and is dropped.
///
/// # Examples
/// This helper is part of an internal module, so the example is marked
/// as text example.
/// ```text
/// use std::io::Cursor;
///
/// let mut cursor = Cursor::new(b"noise\x02payload".to_vec());
/// sync_to_frame_start(&mut cursor).unwrap();
/// // the cursor now sits on the first payload byte
/// ```
///
/// # Errors
/// Returns `SerialSourceError::StreamClosed` when the stream ends before
/// a boundary byte is seen, and `SerialSourceError::Io` on read failure.
pub fn sync_to_frame_start<R: BufRead>(reader: &mut R) -> Result<(), SerialSourceError> {
    loop {
        let buf = reader.fill_buf()?;
        if buf.is_empty() {
            return Err(SerialSourceError::StreamClosed);
        }
        match buf.iter().position(|&b| b == layout::FRAME_BOUNDARY) {
            Some(pos) => {
                reader.consume(pos + 1);
                return Ok(());
            }
            None => {
                let len = buf.len();
                reader.consume(len);
            }
        }
    }
}

/// Accumulate payload bytes up to the next frame boundary.
///
/// The terminating boundary byte is consumed from the stream but
/// excluded from the returned payload.
///
/// # Errors
/// Returns `SerialSourceError::StreamClosed` when the stream ends before
/// the boundary, and `SerialSourceError::Io` on read failure. Bytes
/// accumulated for the unterminated frame are discarded.
pub fn read_frame_payload<R: BufRead>(reader: &mut R) -> Result<Vec<u8>, SerialSourceError> {
    let mut payload = Vec::new();
    loop {
        let buf = reader.fill_buf()?;
        if buf.is_empty() {
            return Err(SerialSourceError::StreamClosed);
        }
        match buf.iter().position(|&b| b == layout::FRAME_BOUNDARY) {
            Some(pos) => {
                payload.extend_from_slice(&buf[..pos]);
                reader.consume(pos + 1);
                return Ok(payload);
            }
            None => {
                payload.extend_from_slice(buf);
                let len = buf.len();
                reader.consume(len);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{read_frame_payload, sync_to_frame_start};
    use crate::source::serial::error::SerialSourceError;
    use std::io::Cursor;

    #[test]
    fn sync_discards_bytes_before_the_boundary() {
        let mut cursor = Cursor::new(b"noise\x02AAA\x02".to_vec());
        sync_to_frame_start(&mut cursor).unwrap();
        let payload = read_frame_payload(&mut cursor).unwrap();
        assert_eq!(payload, b"AAA");
    }

    #[test]
    fn sync_fails_when_no_boundary_arrives() {
        let mut cursor = Cursor::new(b"no boundary here".to_vec());
        let err = sync_to_frame_start(&mut cursor).unwrap_err();
        assert!(matches!(err, SerialSourceError::StreamClosed));
    }

    #[test]
    fn payload_excludes_the_terminating_boundary() {
        let mut cursor = Cursor::new(b"ABC\x02rest".to_vec());
        let payload = read_frame_payload(&mut cursor).unwrap();
        assert_eq!(payload, b"ABC");
    }

    #[test]
    fn payload_may_be_empty_between_adjacent_boundaries() {
        let mut cursor = Cursor::new(b"\x02".to_vec());
        let payload = read_frame_payload(&mut cursor).unwrap();
        assert!(payload.is_empty());
    }

    #[test]
    fn unterminated_frame_is_a_closed_stream() {
        let mut cursor = Cursor::new(b"partial frame".to_vec());
        let err = read_frame_payload(&mut cursor).unwrap_err();
        assert!(matches!(err, SerialSourceError::StreamClosed));
    }
}
