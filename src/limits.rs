use crate::model::Ms;

pub const MAX_HALLS: usize = 1_000;
pub const MAX_BOOKINGS_PER_HALL: usize = 100_000;

pub const MAX_NAME_LEN: usize = 200;
pub const MAX_PURPOSE_LEN: usize = 2_000;
pub const MAX_LOCATION_LEN: usize = 500;
pub const MAX_IMAGE_LEN: usize = 2_048;
pub const MAX_AMENITIES: usize = 64;
pub const MAX_AMENITY_LEN: usize = 100;
pub const MAX_EMAIL_LEN: usize = 320;

/// 2000-01-01T00:00:00Z
pub const MIN_VALID_TIMESTAMP_MS: Ms = 946_684_800_000;
/// 2100-01-01T00:00:00Z
pub const MAX_VALID_TIMESTAMP_MS: Ms = 4_102_444_800_000;

/// 7 days.
pub const MAX_BOOKING_DURATION_MS: Ms = 7 * 24 * 3_600_000;
/// 366 days.
pub const MAX_QUERY_WINDOW_MS: Ms = 366 * 24 * 3_600_000;
