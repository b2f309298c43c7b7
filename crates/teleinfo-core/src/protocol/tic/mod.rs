//! TIC (télé-information client) frame decoder.
//!
//! Turns one framed payload into a [`Record`](crate::Record). Decoding
//! is pure: no I/O, no shared state. Per-group checksums are carried on
//! the wire but never verified here, and malformed groups that still
//! look like `KEY SP VALUE` are accepted as-is.

pub mod error;
pub mod layout;
pub mod parser;

pub use error::DecodeError;
pub use parser::decode_frame;
