use thiserror::Error;

#[derive(Debug, Error)]
pub enum SerialSourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("stream closed before a frame boundary")]
    StreamClosed,
}
