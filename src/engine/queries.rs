use std::cmp::Reverse;

use chrono::NaiveDate;
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;
use crate::observability;

use super::availability::{build_availability_grid, free_windows};
use super::{Engine, EngineError};

impl Engine {
    pub fn get_turf(&self, id: &Ulid) -> Option<Turf> {
        self.store.get_turf(id)
    }

    /// All turfs, ordered by id (registration order for ULIDs).
    pub fn list_turfs(&self) -> Vec<Turf> {
        let mut turfs = self.store.turfs();
        turfs.sort_by_key(|t| t.id);
        turfs
    }

    /// Snapshot of every interval (booked and cancelled) for a turf's day.
    async fn day_snapshot(&self, turf_id: Ulid, date: NaiveDate) -> Vec<BookingInterval> {
        match self.store.get_day(&DayKey { turf_id, date }) {
            Some(day) => day.read().await.bookings.clone(),
            None => Vec::new(),
        }
    }

    /// Booked intervals for one turf and day, ascending by start.
    pub async fn booked_intervals(&self, turf_id: Ulid, date: NaiveDate) -> Vec<BookingInterval> {
        let mut day = self.day_snapshot(turf_id, date).await;
        day.retain(BookingInterval::is_booked);
        day
    }

    pub async fn availability_grid(
        &self,
        turf_id: Ulid,
        date: NaiveDate,
    ) -> Result<Vec<GridSlot>, EngineError> {
        let turf = self
            .store
            .get_turf(&turf_id)
            .ok_or(EngineError::NotFound(turf_id))?;
        let existing = self.day_snapshot(turf_id, date).await;
        metrics::counter!(observability::GRID_QUERIES_TOTAL).increment(1);
        Ok(build_availability_grid(&turf, date, &existing, self.clock.now()))
    }

    pub async fn free_windows(&self, turf_id: Ulid, date: NaiveDate) -> Result<Vec<Span>, EngineError> {
        let turf = self
            .store
            .get_turf(&turf_id)
            .ok_or(EngineError::NotFound(turf_id))?;
        let existing = self.day_snapshot(turf_id, date).await;
        Ok(free_windows(&turf, date, &existing, self.clock.now()))
    }

    pub async fn get_booking(&self, id: Ulid) -> Option<BookingInterval> {
        let key = self.store.day_for_booking(&id)?;
        let day = self.store.get_day(&key)?;
        let guard = day.read().await;
        guard.bookings.iter().find(|b| b.id == id).cloned()
    }

    /// Filtered, paginated booking listing: newest date first, then latest start.
    pub async fn list_bookings(&self, filter: &BookingFilter) -> Result<Page<BookingInterval>, EngineError> {
        if filter.limit == 0 || filter.limit > MAX_PAGE_SIZE {
            return Err(EngineError::LimitExceeded("page size out of range"));
        }
        let page = filter.page.max(1);

        let mut matching = Vec::new();
        for day in self.store.days() {
            let guard = day.read().await;
            if filter.turf_id.is_some_and(|t| t != guard.key.turf_id) {
                continue;
            }
            matching.extend(guard.bookings.iter().filter(|b| filter.matches(b)).cloned());
        }
        matching.sort_by_key(|b| (Reverse(b.date), Reverse(b.span.start), b.id));

        let total = matching.len();
        let items = matching
            .into_iter()
            .skip((page - 1).saturating_mul(filter.limit))
            .take(filter.limit)
            .collect();
        Ok(Page {
            items,
            page,
            limit: filter.limit,
            total,
            pages: total.div_ceil(filter.limit),
        })
    }
}
