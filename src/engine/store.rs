use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::RwLock;
use ulid::Ulid;

use crate::model::*;

use super::SharedDay;

/// Turf directory, per-day ledgers and the booking-id index.
pub struct InMemoryStore {
    turfs: DashMap<Ulid, Turf>,
    days: DashMap<DayKey, SharedDay>,
    booking_to_day: DashMap<Ulid, DayKey>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            turfs: DashMap::new(),
            days: DashMap::new(),
            booking_to_day: DashMap::new(),
        }
    }

    // ── Turf directory ───────────────────────────────────────

    pub fn turf_count(&self) -> usize {
        self.turfs.len()
    }

    pub fn contains_turf(&self, id: &Ulid) -> bool {
        self.turfs.contains_key(id)
    }

    /// Snapshot; later updates do not affect the returned value.
    pub fn get_turf(&self, id: &Ulid) -> Option<Turf> {
        self.turfs.get(id).map(|e| e.value().clone())
    }

    pub fn put_turf(&self, turf: Turf) {
        self.turfs.insert(turf.id, turf);
    }

    pub fn turfs(&self) -> Vec<Turf> {
        self.turfs.iter().map(|e| e.value().clone()).collect()
    }

    // ── Day ledgers ──────────────────────────────────────────

    pub fn get_day(&self, key: &DayKey) -> Option<SharedDay> {
        self.days.get(key).map(|e| e.value().clone())
    }

    pub fn day_or_default(&self, key: DayKey) -> SharedDay {
        self.days
            .entry(key)
            .or_insert_with(|| Arc::new(RwLock::new(DayLedger::new(key))))
            .value()
            .clone()
    }

    pub fn days(&self) -> Vec<SharedDay> {
        self.days.iter().map(|e| e.value().clone()).collect()
    }

    // ── Booking index ────────────────────────────────────────

    pub fn day_for_booking(&self, booking_id: &Ulid) -> Option<DayKey> {
        self.booking_to_day.get(booking_id).map(|e| *e.value())
    }

    /// Claim `booking_id` for `key`. `None` if the id is already taken.
    /// The claim is dropped again unless `BookingReservation::commit` is called.
    pub fn reserve_booking(&self, booking_id: Ulid, key: DayKey) -> Option<BookingReservation<'_>> {
        match self.booking_to_day.entry(booking_id) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                slot.insert(key);
                Some(BookingReservation {
                    store: self,
                    booking_id,
                    committed: false,
                })
            }
        }
    }

    // ── Event application ────────────────────────────────────

    /// Apply a turf event. Booking events are no-ops here; see `apply_to_day`.
    pub fn apply_turf_event(&self, event: &Event) {
        match event {
            Event::TurfRegistered { turf } | Event::TurfUpdated { turf } => {
                self.put_turf(turf.clone());
            }
            Event::BookingAdmitted { .. } | Event::BookingCancelled { .. } => {}
        }
    }

    /// Apply a booking event to its day ledger. Caller holds the day lock.
    pub fn apply_to_day(&self, day: &mut DayLedger, event: &Event) {
        match event {
            Event::BookingAdmitted {
                id,
                turf_id,
                date,
                span,
                total_amount,
                booker,
            } => {
                day.insert(BookingInterval {
                    id: *id,
                    turf_id: *turf_id,
                    date: *date,
                    span: *span,
                    status: BookingStatus::Booked,
                    payment: PaymentStatus::Paid,
                    total_amount: *total_amount,
                    booker: booker.clone(),
                });
                self.booking_to_day.insert(*id, day.key);
            }
            Event::BookingCancelled { id, .. } => {
                if let Some(b) = day.get_mut(*id) {
                    b.status = BookingStatus::Cancelled;
                    b.payment = PaymentStatus::Refunded;
                }
            }
            Event::TurfRegistered { .. } | Event::TurfUpdated { .. } => {}
        }
    }
}

/// A claimed booking id whose admission has not finished yet.
pub struct BookingReservation<'a> {
    store: &'a InMemoryStore,
    booking_id: Ulid,
    committed: bool,
}

impl BookingReservation<'_> {
    /// Keep the id. Call once the admission event has been applied.
    pub fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for BookingReservation<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.store.booking_to_day.remove(&self.booking_id);
        }
    }
}
