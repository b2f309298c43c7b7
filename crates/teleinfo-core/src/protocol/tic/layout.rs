/// Separator between data groups inside a frame body.
pub const GROUP_SEPARATOR: char = '\n';

/// Separator between the fields of a data group
/// (`KEY SP VALUE SP CHECKSUM`).
pub const FIELD_SEPARATOR: char = ' ';

/// Maximum fields per data group: key, value, checksum fragment.
pub const GROUP_FIELDS: usize = 3;
