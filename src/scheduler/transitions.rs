use crate::model::BookingStatus;

use super::SchedulerError;

/// Targets an administrator may request.
pub(crate) fn validate_target(to: BookingStatus) -> Result<(), SchedulerError> {
    match to {
        BookingStatus::Confirmed | BookingStatus::Rejected => Ok(()),
        BookingStatus::Pending | BookingStatus::Cancelled => {
            Err(SchedulerError::Invalid("status must be confirmed or rejected"))
        }
    }
}

/// The approval workflow: `pending → confirmed | rejected`, nothing else.
/// Confirmed and rejected are terminal; only deletion leaves them.
pub(crate) fn next_status(
    from: BookingStatus,
    to: BookingStatus,
) -> Result<BookingStatus, SchedulerError> {
    validate_target(to)?;
    match from {
        BookingStatus::Pending => Ok(to),
        _ => Err(SchedulerError::InvalidTransition { from, to }),
    }
}
