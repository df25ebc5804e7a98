//! The reservation scheduler: hall catalog, per-hall booking ledgers, and the
//! admission rule that keeps slot-holding bookings on a hall disjoint.
//!
//! Every ledger sits behind its own `RwLock`. Mutations hold the write lock
//! across check, journal append and apply, so two requests for the same hall
//! are admitted one at a time while different halls proceed in parallel.

mod availability;
mod conflict;
mod error;
mod journal;
mod mutations;
pub mod policy;
mod queries;
mod transitions;

pub use error::{ErrorKind, SchedulerError};
pub use journal::{Journal, MemoryJournal, WalJournal};

use std::collections::HashMap;
use std::io;
use std::path::Path;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedRwLockWriteGuard, RwLock};

use crate::model::*;

pub type SharedLedger = Arc<RwLock<HallLedger>>;

pub struct Scheduler {
    halls: DashMap<HallId, Hall>,
    /// One ledger per hall ever created. Never removed, so bookings survive
    /// their hall.
    ledgers: DashMap<HallId, SharedLedger>,
    /// Reverse lookup: booking id → hall id.
    booking_to_hall: DashMap<BookingId, HallId>,
    /// Serialises catalog changes (hall create/delete) and compaction.
    catalog: Mutex<()>,
    journal: Arc<dyn Journal>,
}

/// Apply a booking event to its ledger (no locking, caller holds the lock).
fn apply_to_ledger(ledger: &mut HallLedger, event: &Event, index: &DashMap<BookingId, HallId>) {
    match event {
        Event::BookingRequested {
            id,
            hall_id,
            requester_email,
            span,
            purpose,
            status,
            created_at,
        } => {
            ledger.insert_booking(Booking {
                id: *id,
                hall_id: *hall_id,
                requester_email: requester_email.clone(),
                span: *span,
                purpose: purpose.clone(),
                status: *status,
                created_at: *created_at,
            });
            index.insert(*id, *hall_id);
        }
        Event::BookingStatusChanged { id, status, .. } => {
            if let Some(booking) = ledger.get_mut(*id) {
                booking.status = *status;
            }
        }
        Event::BookingDeleted { id, .. } => {
            ledger.remove_booking(*id);
            index.remove(id);
        }
        // Catalog events are handled at the hall map level, not here
        Event::HallCreated { .. } | Event::HallDeleted { .. } => {}
    }
}

fn event_hall_id(event: &Event) -> HallId {
    match event {
        Event::HallCreated { id, .. } | Event::HallDeleted { id } => *id,
        Event::BookingRequested { hall_id, .. }
        | Event::BookingStatusChanged { hall_id, .. }
        | Event::BookingDeleted { hall_id, .. } => *hall_id,
    }
}

impl Scheduler {
    /// Recover state from the WAL at `wal_path` and start its writer task.
    /// Must run inside a Tokio runtime.
    pub fn open(wal_path: &Path) -> io::Result<Self> {
        let (journal, events) = WalJournal::open(wal_path)?;
        Ok(Self::with_journal(Arc::new(journal), &events))
    }

    /// A scheduler whose state is lost on exit.
    pub fn in_memory() -> Self {
        Self::with_journal(MemoryJournal::new(), &[])
    }

    /// Rebuild state by replaying `events` in order, then persist further
    /// changes through `journal`.
    pub fn with_journal(journal: Arc<dyn Journal>, events: &[Event]) -> Self {
        let halls = DashMap::new();
        let booking_to_hall = DashMap::new();
        let mut ledgers: HashMap<HallId, HallLedger> = HashMap::new();

        for event in events {
            match event {
                Event::HallCreated {
                    id,
                    name,
                    capacity,
                    location,
                    image,
                    amenities,
                } => {
                    halls.insert(
                        *id,
                        Hall {
                            id: *id,
                            name: name.clone(),
                            capacity: *capacity,
                            location: location.clone(),
                            image: image.clone(),
                            amenities: amenities.clone(),
                        },
                    );
                    ledgers.entry(*id).or_insert_with(|| HallLedger::new(*id));
                }
                Event::HallDeleted { id } => {
                    halls.remove(id);
                }
                other => {
                    let hall_id = event_hall_id(other);
                    let ledger = ledgers
                        .entry(hall_id)
                        .or_insert_with(|| HallLedger::new(hall_id));
                    apply_to_ledger(ledger, other, &booking_to_hall);
                }
            }
        }

        Self {
            halls,
            ledgers: ledgers
                .into_iter()
                .map(|(id, ledger)| (id, Arc::new(RwLock::new(ledger))))
                .collect(),
            booking_to_hall,
            catalog: Mutex::new(()),
            journal,
        }
    }

    pub fn hall_count(&self) -> usize {
        self.halls.len()
    }

    pub fn booking_count(&self) -> usize {
        self.booking_to_hall.len()
    }

    pub fn get_ledger(&self, hall_id: &HallId) -> Option<SharedLedger> {
        self.ledgers.get(hall_id).map(|e| e.value().clone())
    }

    pub fn get_hall_for_booking(&self, booking_id: &BookingId) -> Option<HallId> {
        self.booking_to_hall.get(booking_id).map(|e| *e.value())
    }

    async fn journal_append(&self, event: &Event) -> Result<(), SchedulerError> {
        self.journal.append(event).await.map_err(|e| {
            tracing::error!("journal append failed: {e}");
            SchedulerError::StoreError(e.to_string())
        })
    }

    /// Journal append + apply in one call. Nothing is applied if the append fails.
    pub(super) async fn persist_and_apply(
        &self,
        ledger: &mut HallLedger,
        event: &Event,
    ) -> Result<(), SchedulerError> {
        self.journal_append(event).await?;
        apply_to_ledger(ledger, event, &self.booking_to_hall);
        Ok(())
    }

    /// Lookup booking → hall, acquire that ledger's write lock.
    pub(super) async fn resolve_booking_write(
        &self,
        booking_id: &BookingId,
    ) -> Result<(HallId, OwnedRwLockWriteGuard<HallLedger>), SchedulerError> {
        let hall_id = self
            .get_hall_for_booking(booking_id)
            .ok_or(SchedulerError::NotFound(*booking_id))?;
        let ledger = self
            .get_ledger(&hall_id)
            .ok_or(SchedulerError::NotFound(*booking_id))?;
        let guard = ledger.write_owned().await;
        // Deleted while we waited for the lock.
        if guard.get(*booking_id).is_none() {
            return Err(SchedulerError::NotFound(*booking_id));
        }
        Ok((hall_id, guard))
    }
}
