//! Serial frame source implementation.
//!
//! This module provides a `FrameSource` backed by the meter's serial
//! character device (or any other byte stream, e.g. a recorded capture).
//! It owns the blocking I/O and the boundary scanning, emitting raw
//! frames for the decoding pipeline.

pub mod error;
pub mod layout;
pub mod parser;
pub mod reader;

pub use parser::SerialFrameSource;
