use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unix milliseconds. The only time type inside the scheduler.
pub type Ms = i64;

pub type HallId = Ulid;
pub type BookingId = Ulid;

/// Display name for bookings whose hall has been deleted.
pub const UNKNOWN_HALL_NAME: &str = "Unknown";

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: Ms,
    pub end: Ms,
}

impl Span {
    pub fn new(start: Ms, end: Ms) -> Self {
        debug_assert!(start < end, "Span start must be before end");
        Self { start, end }
    }

    pub fn duration_ms(&self) -> Ms {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Rejected,
    /// Reserved. Nothing transitions into it; bookings are deleted instead.
    Cancelled,
}

impl BookingStatus {
    /// Whether a booking in this status occupies its slot for admission purposes.
    pub fn blocks_slot(self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Rejected => "rejected",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid status value: {}", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

impl FromStr for BookingStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "rejected" => Ok(BookingStatus::Rejected),
            "cancelled" => Ok(BookingStatus::Cancelled),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hall {
    pub id: HallId,
    pub name: String,
    pub capacity: u32,
    pub location: Option<String>,
    pub image: Option<String>,
    pub amenities: Vec<String>,
}

/// Hall attributes as submitted by an administrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewHall {
    pub name: String,
    pub capacity: u32,
    pub location: Option<String>,
    pub image: Option<String>,
    pub amenities: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub hall_id: HallId,
    pub requester_email: String,
    pub span: Span,
    pub purpose: String,
    pub status: BookingStatus,
    pub created_at: Ms,
}

/// All bookings ever admitted on one hall, sorted by `span.start`.
///
/// Ledgers outlive their hall: deleting a hall leaves its ledger in place so
/// orphaned bookings stay listable and deletable.
#[derive(Debug, Clone)]
pub struct HallLedger {
    pub hall_id: HallId,
    pub bookings: Vec<Booking>,
}

impl HallLedger {
    pub fn new(hall_id: HallId) -> Self {
        Self {
            hall_id,
            bookings: Vec::new(),
        }
    }

    /// Insert booking maintaining sort order by span.start.
    pub fn insert_booking(&mut self, booking: Booking) {
        let pos = self
            .bookings
            .partition_point(|b| b.span.start <= booking.span.start);
        self.bookings.insert(pos, booking);
    }

    pub fn remove_booking(&mut self, id: BookingId) -> Option<Booking> {
        let pos = self.bookings.iter().position(|b| b.id == id)?;
        Some(self.bookings.remove(pos))
    }

    pub fn get(&self, id: BookingId) -> Option<&Booking> {
        self.bookings.iter().find(|b| b.id == id)
    }

    pub fn get_mut(&mut self, id: BookingId) -> Option<&mut Booking> {
        self.bookings.iter_mut().find(|b| b.id == id)
    }

    /// Bookings whose span overlaps the query window, any status.
    /// Uses binary search to skip bookings starting at or after `query.end`.
    pub fn overlapping(&self, query: &Span) -> impl Iterator<Item = &Booking> {
        let right_bound = self.bookings.partition_point(|b| b.span.start < query.end);
        self.bookings[..right_bound]
            .iter()
            .filter(move |b| b.span.end > query.start)
    }

    /// Overlapping bookings that still hold their slot.
    pub fn blocking(&self, query: &Span) -> impl Iterator<Item = &Booking> {
        self.overlapping(query).filter(|b| b.status.blocks_slot())
    }
}

/// The WAL record format. Flat, no nesting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    HallCreated {
        id: HallId,
        name: String,
        capacity: u32,
        location: Option<String>,
        image: Option<String>,
        amenities: Vec<String>,
    },
    HallDeleted {
        id: HallId,
    },
    BookingRequested {
        id: BookingId,
        hall_id: HallId,
        requester_email: String,
        span: Span,
        purpose: String,
        status: BookingStatus,
        created_at: Ms,
    },
    BookingStatusChanged {
        id: BookingId,
        hall_id: HallId,
        status: BookingStatus,
    },
    BookingDeleted {
        id: BookingId,
        hall_id: HallId,
    },
}

impl Event {
    pub fn hall_created(hall: &Hall) -> Self {
        Event::HallCreated {
            id: hall.id,
            name: hall.name.clone(),
            capacity: hall.capacity,
            location: hall.location.clone(),
            image: hall.image.clone(),
            amenities: hall.amenities.clone(),
        }
    }

    pub fn booking_requested(booking: &Booking) -> Self {
        Event::BookingRequested {
            id: booking.id,
            hall_id: booking.hall_id,
            requester_email: booking.requester_email.clone(),
            span: booking.span,
            purpose: booking.purpose.clone(),
            status: booking.status,
            created_at: booking.created_at,
        }
    }
}

// ── Query result types ───────────────────────────────────────────

/// A booking with its hall's display name resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingInfo {
    pub booking: Booking,
    pub hall_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingFilter {
    pub hall_id: Option<HallId>,
    pub requester_email: Option<String>,
}

impl BookingFilter {
    pub fn matches(&self, booking: &Booking) -> bool {
        self.hall_id.is_none_or(|h| h == booking.hall_id)
            && self
                .requester_email
                .as_deref()
                .is_none_or(|e| e.eq_ignore_ascii_case(&booking.requester_email))
    }
}
