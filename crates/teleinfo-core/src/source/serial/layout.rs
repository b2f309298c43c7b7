/// Boundary marker opening and closing every frame on the wire. There
/// is no distinct end-of-frame marker: consecutive frames share their
/// boundary byte, and no escaping mechanism exists.
pub const FRAME_BOUNDARY: u8 = 0x02;

/// Read buffer size for the stream. The meter emits at 1200 baud and a
/// frame stays well under 512 bytes.
pub const SERIAL_READER_BUFFER_SIZE: usize = 4096;
