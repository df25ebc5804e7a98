use std::sync::Arc;

use tokio::sync::{MutexGuard, RwLock};
use tracing::{info, warn};
use ulid::Ulid;

use crate::auth::Principal;
use crate::limits::*;
use crate::model::*;
use crate::observability;

use super::conflict::{check_no_conflict, now_ms, validate_interval, validate_purpose};
use super::policy::{authorize_cancel, require_admin};
use super::transitions::{next_status, validate_target};
use super::{Scheduler, SchedulerError};

/// Halls created by [`Scheduler::seed_default_halls`].
const DEFAULT_HALLS: [(&str, u32, &str, &str); 3] = [
    (
        "Seminar Hall A",
        60,
        "Ground Floor, Block A",
        "https://placehold.co/600x400?text=Hall+A",
    ),
    (
        "Seminar Hall B",
        120,
        "Second Floor, Block B",
        "https://placehold.co/600x400?text=Hall+B",
    ),
    (
        "Main Auditorium",
        300,
        "Admin Block",
        "https://placehold.co/600x400?text=Auditorium",
    ),
];

impl Scheduler {
    /// Admit a new booking for `requester` on `hall_id` over `[start, end)`.
    ///
    /// The overlap scan and the insert happen under the hall's write lock,
    /// so concurrent requests for overlapping slots resolve to exactly one
    /// admission. A rejected request writes nothing.
    pub async fn request_booking(
        &self,
        hall_id: HallId,
        requester: &Principal,
        start: Ms,
        end: Ms,
        purpose: &str,
    ) -> Result<Booking, SchedulerError> {
        let span = validate_interval(start, end)?;
        let purpose = validate_purpose(purpose)?;
        if requester.email.len() > MAX_EMAIL_LEN {
            return Err(SchedulerError::LimitExceeded("requester email too long"));
        }
        if !self.halls.contains_key(&hall_id) {
            return Err(SchedulerError::NotFound(hall_id));
        }
        let ledger = self
            .get_ledger(&hall_id)
            .ok_or(SchedulerError::NotFound(hall_id))?;
        let mut guard = ledger.write().await;
        // Deleted while we waited for the lock.
        if !self.halls.contains_key(&hall_id) {
            return Err(SchedulerError::NotFound(hall_id));
        }
        if guard.bookings.len() >= MAX_BOOKINGS_PER_HALL {
            return Err(SchedulerError::LimitExceeded("too many bookings on hall"));
        }

        if let Err(e) = check_no_conflict(&guard, &span) {
            metrics::counter!(observability::BOOKING_CONFLICTS_TOTAL).increment(1);
            warn!(
                "booking on {hall_id} [{}, {}) by {} refused: {e}",
                span.start, span.end, requester.email
            );
            return Err(e);
        }

        let booking = Booking {
            id: Ulid::new(),
            hall_id,
            requester_email: requester.email.clone(),
            span,
            purpose,
            status: BookingStatus::Pending,
            created_at: now_ms(),
        };
        self.persist_and_apply(&mut guard, &Event::booking_requested(&booking))
            .await?;
        metrics::counter!(observability::BOOKINGS_ADMITTED_TOTAL).increment(1);
        info!(
            "booking {} admitted on {hall_id} [{}, {}) for {}",
            booking.id, span.start, span.end, booking.requester_email
        );
        Ok(booking)
    }

    /// Administrator decision on a pending booking. Approval does not
    /// re-run the overlap scan: a pending booking already holds its slot.
    pub async fn set_status(
        &self,
        booking_id: BookingId,
        actor: &Principal,
        status: BookingStatus,
    ) -> Result<Booking, SchedulerError> {
        require_admin(actor)?;
        validate_target(status)?;
        let (hall_id, mut guard) = self.resolve_booking_write(&booking_id).await?;
        let current = guard
            .get(booking_id)
            .map(|b| b.status)
            .ok_or(SchedulerError::NotFound(booking_id))?;
        let next = next_status(current, status)?;

        let event = Event::BookingStatusChanged {
            id: booking_id,
            hall_id,
            status: next,
        };
        self.persist_and_apply(&mut guard, &event).await?;
        info!("booking {booking_id} {current} -> {next} by {}", actor.email);
        guard
            .get(booking_id)
            .cloned()
            .ok_or(SchedulerError::NotFound(booking_id))
    }

    /// Permanently remove a booking. Owner or administrator only.
    pub async fn cancel_booking(
        &self,
        booking_id: BookingId,
        actor: &Principal,
    ) -> Result<Booking, SchedulerError> {
        let (hall_id, mut guard) = self.resolve_booking_write(&booking_id).await?;
        let booking = guard
            .get(booking_id)
            .cloned()
            .ok_or(SchedulerError::NotFound(booking_id))?;
        if let Err(e) = authorize_cancel(actor, &booking) {
            warn!("{} may not cancel booking {booking_id}", actor.email);
            return Err(e);
        }

        let event = Event::BookingDeleted {
            id: booking_id,
            hall_id,
        };
        self.persist_and_apply(&mut guard, &event).await?;
        info!("booking {booking_id} deleted by {}", actor.email);
        Ok(booking)
    }

    pub async fn create_hall(&self, actor: &Principal, new: NewHall) -> Result<Hall, SchedulerError> {
        require_admin(actor)?;
        let hall = validate_new_hall(new)?;
        let catalog = self.catalog.lock().await;
        if self.halls.len() >= MAX_HALLS {
            return Err(SchedulerError::LimitExceeded("too many halls"));
        }
        if self
            .halls
            .iter()
            .any(|h| h.name.eq_ignore_ascii_case(&hall.name))
        {
            return Err(SchedulerError::DuplicateHallName(hall.name));
        }
        self.insert_hall(&catalog, hall).await
    }

    /// Remove a hall from the catalog. Its bookings stay, listed under
    /// [`UNKNOWN_HALL_NAME`].
    ///
    /// Holds the hall's write lock across the append and the removal, so a
    /// booking on the hall is journaled either before the deletion or not at
    /// all.
    pub async fn delete_hall(&self, actor: &Principal, hall_id: HallId) -> Result<(), SchedulerError> {
        require_admin(actor)?;
        let _catalog = self.catalog.lock().await;
        if !self.halls.contains_key(&hall_id) {
            return Err(SchedulerError::NotFound(hall_id));
        }
        let ledger = self
            .get_ledger(&hall_id)
            .ok_or(SchedulerError::NotFound(hall_id))?;
        let _ledger = ledger.write().await;
        self.journal_append(&Event::HallDeleted { id: hall_id }).await?;
        self.halls.remove(&hall_id);
        info!("hall {hall_id} deleted by {}", actor.email);
        Ok(())
    }

    /// Create the default halls if the catalog is empty. Returns how many
    /// were created.
    pub async fn seed_default_halls(&self) -> Result<usize, SchedulerError> {
        let catalog = self.catalog.lock().await;
        if !self.halls.is_empty() {
            return Ok(0);
        }
        for (name, capacity, location, image) in DEFAULT_HALLS {
            let hall = Hall {
                id: Ulid::new(),
                name: name.to_string(),
                capacity,
                location: Some(location.to_string()),
                image: Some(image.to_string()),
                amenities: Vec::new(),
            };
            self.insert_hall(&catalog, hall).await?;
        }
        Ok(DEFAULT_HALLS.len())
    }

    /// Journal and publish a validated hall. Callers hold the catalog lock.
    async fn insert_hall(&self, _catalog: &MutexGuard<'_, ()>, hall: Hall) -> Result<Hall, SchedulerError> {
        self.journal_append(&Event::hall_created(&hall)).await?;
        self.ledgers
            .entry(hall.id)
            .or_insert_with(|| Arc::new(RwLock::new(HallLedger::new(hall.id))));
        self.halls.insert(hall.id, hall.clone());
        info!("hall {} created: {}", hall.id, hall.name);
        Ok(hall)
    }

    /// Rewrite the journal as the minimal event set for the current state.
    ///
    /// Holds the catalog lock and every ledger's write lock (in hall id
    /// order) so no mutation lands between the snapshot and the rewrite.
    pub async fn compact(&self) -> Result<usize, SchedulerError> {
        let _catalog = self.catalog.lock().await;

        let mut ledgers: Vec<(HallId, super::SharedLedger)> = self
            .ledgers
            .iter()
            .map(|e| (*e.key(), e.value().clone()))
            .collect();
        ledgers.sort_by_key(|(id, _)| *id);
        let mut guards = Vec::with_capacity(ledgers.len());
        for (_, ledger) in &ledgers {
            guards.push(ledger.clone().write_owned().await);
        }

        let mut events: Vec<Event> = self.halls.iter().map(|h| Event::hall_created(h.value())).collect();
        for guard in &guards {
            events.extend(guard.bookings.iter().map(Event::booking_requested));
        }
        let count = events.len();

        self.journal.compact(events).await.map_err(|e| {
            tracing::error!("journal compaction failed: {e}");
            SchedulerError::StoreError(e.to_string())
        })?;
        Ok(count)
    }

    pub async fn appends_since_compact(&self) -> u64 {
        self.journal.appends_since_compact().await
    }
}

fn validate_new_hall(new: NewHall) -> Result<Hall, SchedulerError> {
    let name = new.name.trim().to_string();
    if name.is_empty() {
        return Err(SchedulerError::Invalid("hall name is required"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(SchedulerError::LimitExceeded("hall name too long"));
    }
    if new.capacity == 0 {
        return Err(SchedulerError::Invalid("capacity must be at least 1"));
    }
    let location = non_empty(new.location);
    if location.as_ref().is_some_and(|l| l.len() > MAX_LOCATION_LEN) {
        return Err(SchedulerError::LimitExceeded("location too long"));
    }
    let image = non_empty(new.image);
    if image.as_ref().is_some_and(|i| i.len() > MAX_IMAGE_LEN) {
        return Err(SchedulerError::LimitExceeded("image URI too long"));
    }

    let amenities: Vec<String> = new
        .amenities
        .iter()
        .map(|a| a.trim())
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .collect();
    if amenities.len() > MAX_AMENITIES {
        return Err(SchedulerError::LimitExceeded("too many amenities"));
    }
    if amenities.iter().any(|a| a.len() > MAX_AMENITY_LEN) {
        return Err(SchedulerError::LimitExceeded("amenity too long"));
    }

    Ok(Hall {
        id: Ulid::new(),
        name,
        capacity: new.capacity,
        location,
        image,
        amenities,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
