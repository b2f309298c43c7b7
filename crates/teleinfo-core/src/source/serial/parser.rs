use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use time::OffsetDateTime;

use crate::source::{Frame, FrameSource, SourceError};

use super::layout;
use super::reader::{read_frame_payload, sync_to_frame_start};

/// Frame source over the meter's serial character device.
///
/// The device is expected to be configured by the environment before
/// use (e.g. `stty -F /dev/ttyAMA0 1200 sane evenp parenb cs7
/// -crtscts`); this type only reads from it. Reads are blocking, one
/// frame at a time, and synchronization with the stream happens lazily:
/// the first call to `next_frame` discards bytes until the first
/// boundary marker.
pub struct SerialFrameSource<R: Read> {
    reader: BufReader<R>,
    synced: bool,
}

impl SerialFrameSource<File> {
    /// Open the stream at `path`.
    ///
    /// # Errors
    /// Returns `SourceError::Io` when the path cannot be opened.
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let file = File::open(path).map_err(SourceError::from)?;
        Ok(Self::from_reader(file))
    }
}

impl<R: Read> SerialFrameSource<R> {
    /// Wrap an arbitrary byte stream, e.g. a recorded capture.
    pub fn from_reader(inner: R) -> Self {
        Self {
            reader: BufReader::with_capacity(layout::SERIAL_READER_BUFFER_SIZE, inner),
            synced: false,
        }
    }
}

impl<R: Read> FrameSource for SerialFrameSource<R> {
    fn next_frame(&mut self) -> Result<Frame, SourceError> {
        if !self.synced {
            sync_to_frame_start(&mut self.reader)?;
            self.synced = true;
        }
        let timestamp = OffsetDateTime::now_utc().unix_timestamp();
        let payload = read_frame_payload(&mut self.reader)?;
        Ok(Frame { timestamp, payload })
    }
}
