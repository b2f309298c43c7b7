use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("timestamp {timestamp} is not representable as an RFC 3339 date: {source}")]
    Timestamp {
        timestamp: i64,
        source: time::Error,
    },
}
