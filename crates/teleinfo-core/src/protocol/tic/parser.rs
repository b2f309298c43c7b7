use std::collections::BTreeMap;

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::{DATE_KEY, Record};

use super::error::DecodeError;
use super::layout;

/// Decode one framed payload into a [`Record`].
///
/// The reader already excluded the 0x02 boundary markers, so what
/// remains of a frame on the wire is `LF group CR ... LF group CR ETX`.
/// One leading and one trailing byte are stripped here (the first
/// group's line feed and the closing ETX) and trailing whitespace is
/// trimmed, which removes the last group's carriage return. Each group
/// is then split on its first two spaces into key, value and checksum
/// fragment; groups with a non-empty key and value are kept, the last
/// occurrence winning when a key repeats. The checksum fragment is
/// discarded without verification. The `DATE` entry is injected last,
/// so it always reflects the capture timestamp, even when a frame
/// carries a `DATE` group of its own.
///
/// # Examples
/// ```
/// use teleinfo_core::decode_frame;
///
/// let payload = b"\nADCO 012345678901 F\r\nOPTARIF BASE 0\r\x03";
/// let record = decode_frame(payload, 1_700_000_000)?;
/// assert_eq!(record.get("ADCO"), Some("012345678901"));
/// assert_eq!(record.get("OPTARIF"), Some("BASE"));
/// assert_eq!(record.get("DATE"), Some("2023-11-14T22:13:20Z"));
/// # Ok::<(), teleinfo_core::DecodeError>(())
/// ```
///
/// # Errors
/// Returns [`DecodeError::Timestamp`] when `timestamp` cannot be
/// formatted as an RFC 3339 date.
pub fn decode_frame(payload: &[u8], timestamp: i64) -> Result<Record, DecodeError> {
    let date = format_date(timestamp)?;
    let raw = String::from_utf8_lossy(payload).into_owned();

    let body = String::from_utf8_lossy(frame_body(payload));
    let body = body.trim_end();

    let mut fields = BTreeMap::new();
    for group in body.split(layout::GROUP_SEPARATOR) {
        let mut parts = group.splitn(layout::GROUP_FIELDS, layout::FIELD_SEPARATOR);
        let key = parts.next().unwrap_or_default();
        let value = parts.next().unwrap_or_default();
        if !key.is_empty() && !value.is_empty() {
            fields.insert(key.to_string(), value.to_string());
        }
    }
    fields.insert(DATE_KEY.to_string(), date);

    Ok(Record::new(fields, timestamp, raw))
}

/// Strip the frame envelope: one leading byte (the first group's LF)
/// and one trailing byte (the ETX closing the body).
fn frame_body(payload: &[u8]) -> &[u8] {
    match payload.len() {
        0 | 1 => &payload[..0],
        len => &payload[1..len - 1],
    }
}

fn format_date(timestamp: i64) -> Result<String, DecodeError> {
    let fault = |source: time::Error| DecodeError::Timestamp { timestamp, source };
    let date = OffsetDateTime::from_unix_timestamp(timestamp).map_err(|e| fault(e.into()))?;
    date.format(&Rfc3339).map_err(|e| fault(e.into()))
}

#[cfg(test)]
mod tests {
    use super::decode_frame;
    use crate::protocol::tic::error::DecodeError;

    const TS: i64 = 1_700_000_000;
    const TS_DATE: &str = "2023-11-14T22:13:20Z";

    #[test]
    fn decodes_groups_and_injects_date() {
        let payload = b"\nADCO 012345678901 F\r\nOPTARIF BASE 0\r\x03";
        let record = decode_frame(payload, TS).unwrap();

        assert_eq!(record.get("ADCO"), Some("012345678901"));
        assert_eq!(record.get("OPTARIF"), Some("BASE"));
        assert_eq!(record.get("DATE"), Some(TS_DATE));
        assert_eq!(record.fields().len(), 3);
    }

    #[test]
    fn last_occurrence_wins_on_duplicate_keys() {
        let payload = b"\nX 1 C\r\nX 2 C\r\x03";
        let record = decode_frame(payload, TS).unwrap();
        assert_eq!(record.get("X"), Some("2"));
    }

    #[test]
    fn wrong_checksum_is_accepted_unverified() {
        // 'Z' is not the checksum of "ISOUSC 45"; the group is kept anyway.
        let payload = b"\nISOUSC 45 Z\r\x03";
        let record = decode_frame(payload, TS).unwrap();
        assert_eq!(record.get("ISOUSC"), Some("45"));
    }

    #[test]
    fn group_without_value_is_skipped() {
        let payload = b"\nLONE\r\nPTEC TH.. $\r\x03";
        let record = decode_frame(payload, TS).unwrap();
        assert_eq!(record.get("LONE"), None);
        assert_eq!(record.get("PTEC"), Some("TH.."));
    }

    #[test]
    fn empty_payload_yields_a_date_only_record() {
        let record = decode_frame(b"", TS).unwrap();
        assert_eq!(record.fields().len(), 1);
        assert_eq!(record.date(), TS_DATE);
    }

    #[test]
    fn synthesized_date_wins_over_a_wire_date_group() {
        let payload = b"\nDATE 19700101 C\r\x03";
        let record = decode_frame(payload, TS).unwrap();
        assert_eq!(record.get("DATE"), Some(TS_DATE));
    }

    #[test]
    fn raw_text_keeps_the_envelope() {
        let payload = b"\nADCO 012345678901 F\r\x03";
        let record = decode_frame(payload, TS).unwrap();
        assert_eq!(record.raw(), "\nADCO 012345678901 F\r\u{3}");
    }

    #[test]
    fn unrepresentable_timestamp_is_rejected() {
        let err = decode_frame(b"", i64::MAX).unwrap_err();
        assert!(matches!(err, DecodeError::Timestamp { .. }));
    }

    #[test]
    fn group_fields_may_carry_the_trailing_carriage_return() {
        // The CR before each LF lands in the checksum fragment, which is
        // discarded, so values stay clean.
        let payload = b"\nIINST 002 Y\r\nIMAX 030 B\r\x03";
        let record = decode_frame(payload, TS).unwrap();
        assert_eq!(record.get("IINST"), Some("002"));
        assert_eq!(record.get("IMAX"), Some("030"));
    }
}
