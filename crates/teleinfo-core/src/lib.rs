//! Teleinfo core library: frame pipeline for EDF meter serial telemetry.
//!
//! This crate implements the acquisition pipeline used by the CLI: a
//! blocking frame source scans the meter's byte stream for 0x02 frame
//! boundaries, the TIC decoder turns each framed payload into a
//! key/value [`Record`], and the dispatcher fans every record out to the
//! registered observers on a worker pool so that a slow observer never
//! delays the reading of the next frame. All I/O is isolated in `source`
//! modules; decoding is byte-oriented and side-effect free.
//!
//! Invariants:
//! - A decoded record always carries a `DATE` entry (RFC 3339 UTC,
//!   second precision).
//! - The boundary byte never appears inside a frame payload.
//! - Observers are notified in registration order, never on the read
//!   loop's thread.
//! - A record's JSON form is computed at most once per instance.
//!
//! Version française (résumé):
//! Cette crate fournit le cœur du pipeline téléinfo : lecture bloquante
//! du flux série -> découpage en trames (délimiteur 0x02) -> décodage
//! TIC en enregistrements clé/valeur -> notification des observateurs
//! sur un pool de threads, sans jamais ralentir la boucle de lecture.
//! Les E/S restent dans `source`, le décodage est pur, les sommes de
//! contrôle sont transportées mais jamais vérifiées.
//!
//! # Examples
//! ```no_run
//! use std::sync::Arc;
//!
//! use teleinfo_core::{EventKind, Handler, Observer, Record};
//!
//! struct Printer;
//!
//! impl Observer for Printer {
//!     fn notify(&self, _event: EventKind, record: &Record) {
//!         println!("{}", record.json());
//!     }
//! }
//!
//! let mut handler = Handler::new("/dev/ttyAMA0")?;
//! handler.register(Arc::new(Printer));
//! handler.run()?; // only returns on a fatal stream fault
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::collections::BTreeMap;
use std::sync::OnceLock;

use serde::Serialize;

mod dispatch;
mod handler;
mod protocol;
mod source;

pub use dispatch::{
    DEFAULT_WORKERS, DispatchError, Dispatcher, EventKind, Observer, ObserverRegistry,
};
pub use handler::{ConfigError, Handler, RunError};
pub use protocol::tic::{DecodeError, decode_frame};
pub use source::{Frame, FrameSource, SerialFrameSource, SourceError};

/// Key under which the capture date is stored in every record.
pub const DATE_KEY: &str = "DATE";

/// Decoded representation of one teleinfo frame.
///
/// Holds the key/value groups observed on the wire plus a synthesized
/// `DATE` entry, the raw frame text and the capture timestamp. The JSON
/// form is derived lazily and cached: repeated calls to [`json`] on the
/// same instance return byte-identical output. Records are immutable
/// after construction and are handed to observers behind a shared
/// reference.
///
/// [`json`]: Record::json
///
/// # Examples
/// ```
/// use teleinfo_core::decode_frame;
///
/// let payload = b"\nADCO 012345678901 F\r\x03";
/// let record = decode_frame(payload, 0)?;
/// assert_eq!(record.get("ADCO"), Some("012345678901"));
/// assert_eq!(record.get("DATE"), Some("1970-01-01T00:00:00Z"));
/// # Ok::<(), teleinfo_core::DecodeError>(())
/// ```
#[derive(Debug, Serialize)]
pub struct Record {
    /// Data groups keyed by label, `DATE` included. Sorted key order
    /// keeps the serialized form deterministic.
    #[serde(flatten)]
    fields: BTreeMap<String, String>,
    #[serde(skip)]
    timestamp: i64,
    #[serde(skip)]
    raw: String,
    #[serde(skip)]
    json: OnceLock<String>,
}

impl Record {
    pub(crate) fn new(fields: BTreeMap<String, String>, timestamp: i64, raw: String) -> Self {
        Self {
            fields,
            timestamp,
            raw,
            json: OnceLock::new(),
        }
    }

    /// Value stored under `key`, if the frame carried it.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// All key/value groups, `DATE` included.
    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    /// Capture date, RFC 3339 UTC at second precision.
    pub fn date(&self) -> &str {
        self.fields
            .get(DATE_KEY)
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Capture timestamp in UNIX seconds, sampled when the reader
    /// started accumulating the frame.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Raw frame text as read from the stream, envelope included.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// JSON form of the record, computed on first use and cached.
    ///
    /// # Examples
    /// ```
    /// use teleinfo_core::decode_frame;
    ///
    /// let record = decode_frame(b"\nADCO 012345678901 F\r\x03", 0)?;
    /// assert_eq!(record.json(), record.json());
    /// # Ok::<(), teleinfo_core::DecodeError>(())
    /// ```
    pub fn json(&self) -> &str {
        self.json
            .get_or_init(|| serde_json::to_string(self).expect("string map serializes"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> Record {
        let mut fields = BTreeMap::new();
        fields.insert("ADCO".to_string(), "012345678901".to_string());
        fields.insert(DATE_KEY.to_string(), "1970-01-01T00:00:00Z".to_string());
        Record::new(fields, 0, "\u{2}raw\u{2}".to_string())
    }

    #[test]
    fn json_is_memoized_and_stable() {
        let record = sample_record();
        let first = record.json();
        let second = record.json();
        assert_eq!(first, second);
        assert!(std::ptr::eq(first, second), "second call must reuse the cache");
    }

    #[test]
    fn json_contains_only_fields() {
        let record = sample_record();
        let value: serde_json::Value = serde_json::from_str(record.json()).expect("valid json");
        let object = value.as_object().expect("flat object");
        assert_eq!(object.len(), 2);
        assert_eq!(object["ADCO"], "012345678901");
        assert_eq!(object["DATE"], "1970-01-01T00:00:00Z");
    }

    #[test]
    fn accessors_expose_fields_and_raw_text() {
        let record = sample_record();
        assert_eq!(record.get("ADCO"), Some("012345678901"));
        assert_eq!(record.get("MISSING"), None);
        assert_eq!(record.date(), "1970-01-01T00:00:00Z");
        assert_eq!(record.timestamp(), 0);
        assert_eq!(record.raw(), "\u{2}raw\u{2}");
    }
}
