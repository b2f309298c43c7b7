mod serial;

pub use serial::SerialFrameSource;

use thiserror::Error;

/// One framed payload captured from the stream.
///
/// `timestamp` is sampled when the reader starts accumulating bytes for
/// the frame, not when the closing boundary arrives. The payload never
/// contains the boundary byte.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Capture time in UNIX seconds.
    pub timestamp: i64,
    /// Raw bytes between two boundary markers, markers excluded.
    pub payload: Vec<u8>,
}

/// Blocking producer of frames.
///
/// The sequence is infinite and non-restartable: exhaustion of the
/// underlying stream is a fault, not an end state, and no implementation
/// retries or reconnects.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Frame, SourceError>;
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("stream closed before a frame boundary")]
    StreamClosed,
}

impl From<serial::error::SerialSourceError> for SourceError {
    fn from(value: serial::error::SerialSourceError) -> Self {
        match value {
            serial::error::SerialSourceError::Io(err) => SourceError::Io(err),
            serial::error::SerialSourceError::StreamClosed => SourceError::StreamClosed,
        }
    }
}
