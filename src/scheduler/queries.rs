use crate::limits::*;
use crate::model::*;

use super::availability::free_slots;
use super::{Scheduler, SchedulerError, SharedLedger};

impl Scheduler {
    pub fn list_halls(&self) -> Vec<Hall> {
        let mut halls: Vec<Hall> = self.halls.iter().map(|e| e.value().clone()).collect();
        halls.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        halls
    }

    pub fn get_hall(&self, id: &HallId) -> Option<Hall> {
        self.halls.get(id).map(|e| e.value().clone())
    }

    /// The hall's current name, or [`UNKNOWN_HALL_NAME`] once it is deleted.
    pub fn hall_name(&self, id: &HallId) -> String {
        self.halls
            .get(id)
            .map(|h| h.name.clone())
            .unwrap_or_else(|| UNKNOWN_HALL_NAME.to_string())
    }

    pub async fn get_booking(&self, id: &BookingId) -> Option<Booking> {
        let ledger = self.get_ledger(&self.get_hall_for_booking(id)?)?;
        let guard = ledger.read().await;
        guard.get(*id).cloned()
    }

    /// Bookings matching `filter`, hall names resolved, ordered by start time.
    pub async fn list_bookings(&self, filter: &BookingFilter) -> Vec<BookingInfo> {
        let ledgers: Vec<SharedLedger> = match filter.hall_id {
            Some(hall_id) => self.get_ledger(&hall_id).into_iter().collect(),
            None => self.ledgers.iter().map(|e| e.value().clone()).collect(),
        };

        let mut bookings = Vec::new();
        for ledger in ledgers {
            let guard = ledger.read().await;
            bookings.extend(guard.bookings.iter().filter(|b| filter.matches(b)).cloned());
        }
        bookings.sort_by(|a, b| a.span.start.cmp(&b.span.start).then(a.id.cmp(&b.id)));

        bookings
            .into_iter()
            .map(|booking| BookingInfo {
                hall_name: self.hall_name(&booking.hall_id),
                booking,
            })
            .collect()
    }

    /// Free sub-intervals of `[start, end)` on a hall.
    pub async fn free_slots(
        &self,
        hall_id: HallId,
        start: Ms,
        end: Ms,
    ) -> Result<Vec<Span>, SchedulerError> {
        if start >= end {
            return Err(SchedulerError::Invalid("end time must be after start time"));
        }
        if end.saturating_sub(start) > MAX_QUERY_WINDOW_MS {
            return Err(SchedulerError::LimitExceeded("query window too wide"));
        }
        if !self.halls.contains_key(&hall_id) {
            return Err(SchedulerError::NotFound(hall_id));
        }
        let ledger = self
            .get_ledger(&hall_id)
            .ok_or(SchedulerError::NotFound(hall_id))?;
        let guard = ledger.read().await;
        Ok(free_slots(&guard, &Span::new(start, end)))
    }
}
