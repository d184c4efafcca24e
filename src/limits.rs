//! Input bounds and garage-level gates.

/// The garage does not admit vehicles until at least this many entrances
/// are configured.
pub const MIN_OPEN_ENTRANCES: usize = 3;

/// Entrance and space names.
pub const MAX_NAME_LEN: usize = 64;

/// Vehicle registration plates.
pub const MAX_PLATE_LEN: usize = 16;
