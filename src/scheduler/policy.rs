//! Who may do what. Every check takes the verified principal; nothing here
//! reads identity from request data.

use crate::auth::Principal;
use crate::model::Booking;

use super::SchedulerError;

pub fn require_admin(actor: &Principal) -> Result<(), SchedulerError> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(SchedulerError::Forbidden("administrator access required"))
    }
}

/// Owners may delete their own bookings; administrators may delete any.
pub fn authorize_cancel(actor: &Principal, booking: &Booking) -> Result<(), SchedulerError> {
    if actor.is_admin() || actor.is(&booking.requester_email) {
        Ok(())
    } else {
        Err(SchedulerError::Forbidden("you can only cancel your own bookings"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BookingStatus, Span};
    use ulid::Ulid;

    fn booking_by(email: &str) -> Booking {
        Booking {
            id: Ulid::new(),
            hall_id: Ulid::new(),
            requester_email: email.into(),
            span: Span::new(0, 1),
            purpose: "x".into(),
            status: BookingStatus::Pending,
            created_at: 0,
        }
    }

    #[test]
    fn admin_required() {
        assert!(require_admin(&Principal::admin("root@uni.edu")).is_ok());
        assert!(matches!(
            require_admin(&Principal::student("alice@uni.edu")),
            Err(SchedulerError::Forbidden(_))
        ));
    }

    #[test]
    fn owner_and_admin_may_cancel() {
        let b = booking_by("alice@uni.edu");
        assert!(authorize_cancel(&Principal::student("alice@uni.edu"), &b).is_ok());
        assert!(authorize_cancel(&Principal::student("ALICE@uni.edu"), &b).is_ok());
        assert!(authorize_cancel(&Principal::admin("root@uni.edu"), &b).is_ok());
    }

    #[test]
    fn stranger_may_not_cancel() {
        let b = booking_by("alice@uni.edu");
        let err = authorize_cancel(&Principal::student("mallory@uni.edu"), &b).unwrap_err();
        assert_eq!(err.to_string(), "you can only cancel your own bookings");
    }
}
