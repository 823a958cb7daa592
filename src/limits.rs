//! Guard rails on request payloads and per-date state.

pub const MAX_NAME_LEN: usize = 100;
pub const MAX_DEPT_LEN: usize = 100;

/// A day holds at most 720 disjoint minute-precision slots, so this bound
/// can only be reached by requests the conflict scan would reject anyway.
/// It exists to cap the scan itself.
pub const MAX_RESERVATIONS_PER_DAY: usize = 720;
