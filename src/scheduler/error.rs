use ulid::Ulid;

use crate::model::{BookingId, BookingStatus};

/// Discriminant the access layer maps onto transport status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    Forbidden,
    NotFound,
    Store,
}

#[derive(Debug)]
pub enum SchedulerError {
    Invalid(&'static str),
    LimitExceeded(&'static str),
    DuplicateHallName(String),
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },
    Conflict(BookingId),
    Forbidden(&'static str),
    NotFound(Ulid),
    StoreError(String),
}

impl SchedulerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SchedulerError::Invalid(_)
            | SchedulerError::LimitExceeded(_)
            | SchedulerError::DuplicateHallName(_)
            | SchedulerError::InvalidTransition { .. } => ErrorKind::Validation,
            SchedulerError::Conflict(_) => ErrorKind::Conflict,
            SchedulerError::Forbidden(_) => ErrorKind::Forbidden,
            SchedulerError::NotFound(_) => ErrorKind::NotFound,
            SchedulerError::StoreError(_) => ErrorKind::Store,
        }
    }
}

impl std::fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchedulerError::Invalid(msg) => f.write_str(msg),
            SchedulerError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            SchedulerError::DuplicateHallName(name) => {
                write!(f, "a hall named {name:?} already exists")
            }
            SchedulerError::InvalidTransition { from, to } => {
                write!(f, "cannot change booking status from {from} to {to}")
            }
            SchedulerError::Conflict(_) => f.write_str("time slot already booked"),
            SchedulerError::Forbidden(msg) => f.write_str(msg),
            SchedulerError::NotFound(id) => write!(f, "not found: {id}"),
            SchedulerError::StoreError(e) => write!(f, "store error: {e}"),
        }
    }
}

impl std::error::Error for SchedulerError {}
