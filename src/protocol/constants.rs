//! Wire protocol constants

/// Separates the author name from the payload in outbound frames
pub const NAME_SEPARATOR: u8 = b'|';

/// Lowest valid message kind tag
pub const MIN_KIND: u8 = 1;

/// Highest valid message kind tag (6 is reserved)
pub const MAX_KIND: u8 = 6;
