use crate::limits::*;
use crate::model::*;

use super::SchedulerError;

pub(crate) fn now_ms() -> Ms {
    chrono::Utc::now().timestamp_millis()
}

/// Build the requested interval, rejecting reversed, empty or out-of-range ones.
pub(crate) fn validate_interval(start: Ms, end: Ms) -> Result<Span, SchedulerError> {
    if start >= end {
        return Err(SchedulerError::Invalid("end time must be after start time"));
    }
    if start < MIN_VALID_TIMESTAMP_MS || end > MAX_VALID_TIMESTAMP_MS {
        return Err(SchedulerError::LimitExceeded("timestamp out of range"));
    }
    let span = Span::new(start, end);
    if span.duration_ms() > MAX_BOOKING_DURATION_MS {
        return Err(SchedulerError::LimitExceeded("booking too long"));
    }
    Ok(span)
}

pub(crate) fn validate_purpose(purpose: &str) -> Result<String, SchedulerError> {
    let purpose = purpose.trim();
    if purpose.is_empty() {
        return Err(SchedulerError::Invalid("purpose is required"));
    }
    if purpose.len() > MAX_PURPOSE_LEN {
        return Err(SchedulerError::LimitExceeded("purpose too long"));
    }
    Ok(purpose.to_string())
}

/// Admission check: fails with the id of the first booking still holding an
/// overlapping slot. Rejected and cancelled bookings never block.
pub(crate) fn check_no_conflict(ledger: &HallLedger, span: &Span) -> Result<(), SchedulerError> {
    match ledger.blocking(span).next() {
        Some(existing) => Err(SchedulerError::Conflict(existing.id)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ulid::Ulid;

    const T0: Ms = 1_767_225_600_000; // 2026-01-01T00:00:00Z
    const H: Ms = 3_600_000;

    fn ledger_with(spans: &[(Ms, Ms, BookingStatus)]) -> HallLedger {
        let mut ledger = HallLedger::new(Ulid::nil());
        for &(start, end, status) in spans {
            ledger.insert_booking(Booking {
                id: Ulid::new(),
                hall_id: Ulid::nil(),
                requester_email: "a@uni.edu".into(),
                span: Span::new(start, end),
                purpose: "x".into(),
                status,
                created_at: 0,
            });
        }
        ledger
    }

    #[test]
    fn reversed_and_empty_intervals_rejected() {
        let err = validate_interval(T0 + H, T0).unwrap_err();
        assert_eq!(err.to_string(), "end time must be after start time");
        assert!(matches!(validate_interval(T0, T0), Err(SchedulerError::Invalid(_))));
    }

    #[test]
    fn out_of_range_intervals_rejected() {
        assert!(matches!(
            validate_interval(0, H),
            Err(SchedulerError::LimitExceeded("timestamp out of range"))
        ));
        assert!(matches!(
            validate_interval(T0, T0 + MAX_BOOKING_DURATION_MS + 1),
            Err(SchedulerError::LimitExceeded("booking too long"))
        ));
        assert_eq!(validate_interval(T0, T0 + H).unwrap(), Span::new(T0, T0 + H));
    }

    #[test]
    fn purpose_is_trimmed_and_required() {
        assert_eq!(validate_purpose("  Guest lecture ").unwrap(), "Guest lecture");
        assert!(matches!(validate_purpose("   "), Err(SchedulerError::Invalid(_))));
        let long = "x".repeat(MAX_PURPOSE_LEN + 1);
        assert!(matches!(validate_purpose(&long), Err(SchedulerError::LimitExceeded(_))));
    }

    #[test]
    fn overlap_conflicts() {
        let ledger = ledger_with(&[(T0 + 10 * H, T0 + 11 * H, BookingStatus::Pending)]);
        let conflicting = Span::new(T0 + 10 * H + H / 2, T0 + 11 * H + H / 2);
        let err = check_no_conflict(&ledger, &conflicting).unwrap_err();
        assert!(matches!(err, SchedulerError::Conflict(id) if id == ledger.bookings[0].id));
    }

    #[test]
    fn touching_intervals_do_not_conflict() {
        let ledger = ledger_with(&[(T0 + 10 * H, T0 + 11 * H, BookingStatus::Confirmed)]);
        assert!(check_no_conflict(&ledger, &Span::new(T0 + 11 * H, T0 + 12 * H)).is_ok());
        assert!(check_no_conflict(&ledger, &Span::new(T0 + 9 * H, T0 + 10 * H)).is_ok());
    }

    #[test]
    fn rejected_and_cancelled_free_the_slot() {
        let ledger = ledger_with(&[
            (T0, T0 + H, BookingStatus::Rejected),
            (T0, T0 + H, BookingStatus::Cancelled),
        ]);
        assert!(check_no_conflict(&ledger, &Span::new(T0, T0 + H)).is_ok());
    }

    #[test]
    fn enclosing_request_conflicts() {
        let ledger = ledger_with(&[(T0 + 2 * H, T0 + 3 * H, BookingStatus::Pending)]);
        assert!(check_no_conflict(&ledger, &Span::new(T0, T0 + 5 * H)).is_err());
    }
}
