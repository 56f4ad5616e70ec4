use std::time::Instant;

use chrono::NaiveDate;
use tokio::sync::oneshot;
use tracing::{debug, info};
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;
use crate::observability;

use super::conflict::{check_cancellable, validate_booking_request};
use super::{Engine, EngineError, JournalCommand};

fn check_turf_fields(name: Option<&str>, price_per_hour: Amount) -> Result<(), EngineError> {
    if name.is_some_and(|n| n.len() > MAX_NAME_LEN) {
        return Err(EngineError::LimitExceeded("turf name too long"));
    }
    if price_per_hour > MAX_PRICE_PER_HOUR {
        return Err(EngineError::InvalidTurf("price per hour out of range"));
    }
    Ok(())
}

fn record_rejection(op: &'static str, err: &EngineError) {
    let reason = match err {
        EngineError::Rejected(r) => r.code(),
        EngineError::NotFound(_) => "not_found",
        EngineError::TurfInactive(_) => "turf_inactive",
        EngineError::LimitExceeded(_) => "limit_exceeded",
        _ => return,
    };
    metrics::counter!(observability::REJECTIONS_TOTAL, "op" => op, "reason" => reason)
        .increment(1);
}

impl Engine {
    pub async fn register_turf(
        &self,
        id: Ulid,
        name: Option<String>,
        window: OperatingWindow,
        price_per_hour: Amount,
    ) -> Result<Turf, EngineError> {
        check_turf_fields(name.as_deref(), price_per_hour)?;
        let _gate = self.compaction_gate.read().await;
        if self.store.turf_count() >= MAX_TURFS {
            return Err(EngineError::LimitExceeded("too many turfs"));
        }
        if self.store.contains_turf(&id) {
            return Err(EngineError::AlreadyExists(id));
        }

        let turf = Turf {
            id,
            name,
            window,
            price_per_hour,
            active: true,
        };
        let event = Event::TurfRegistered { turf: turf.clone() };
        self.journal_append(&event).await?;
        self.store.apply_turf_event(&event);
        self.notify.send(id, &event);
        info!(turf = %id, "turf registered {}-{}", window.opening(), window.closing());
        Ok(turf)
    }

    /// Replace a turf's configuration. Existing bookings keep their times
    /// even if they now fall outside the new hours.
    pub async fn update_turf(
        &self,
        id: Ulid,
        name: Option<String>,
        window: OperatingWindow,
        price_per_hour: Amount,
        active: bool,
    ) -> Result<Turf, EngineError> {
        check_turf_fields(name.as_deref(), price_per_hour)?;
        let _gate = self.compaction_gate.read().await;
        if !self.store.contains_turf(&id) {
            return Err(EngineError::NotFound(id));
        }

        let turf = Turf {
            id,
            name,
            window,
            price_per_hour,
            active,
        };
        let event = Event::TurfUpdated { turf: turf.clone() };
        self.journal_append(&event).await?;
        self.store.apply_turf_event(&event);
        self.notify.send(id, &event);
        info!(turf = %id, active, "turf updated");
        Ok(turf)
    }

    /// Admit a booking. The overlap check and the insert happen under the
    /// turf's day lock, so of any set of racing overlapping requests exactly
    /// one is admitted.
    pub async fn book_slot(
        &self,
        id: Ulid,
        turf_id: Ulid,
        date: NaiveDate,
        start: &str,
        end: &str,
        booker: Option<String>,
    ) -> Result<BookingInterval, EngineError> {
        let started = Instant::now();
        let result = self.admit(id, turf_id, date, start, end, booker).await;
        metrics::histogram!(observability::ADMISSION_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());

        match &result {
            Ok(b) => {
                metrics::counter!(observability::BOOKINGS_ADMITTED_TOTAL).increment(1);
                info!(booking = %b.id, turf = %turf_id, %date, "admitted {start}-{end}");
            }
            Err(e) => {
                record_rejection("book", e);
                debug!(turf = %turf_id, %date, "booking {start}-{end} refused: {e}");
            }
        }
        result
    }

    async fn admit(
        &self,
        id: Ulid,
        turf_id: Ulid,
        date: NaiveDate,
        start: &str,
        end: &str,
        booker: Option<String>,
    ) -> Result<BookingInterval, EngineError> {
        if booker.as_deref().is_some_and(|b| b.len() > MAX_BOOKER_LEN) {
            return Err(EngineError::LimitExceeded("booker reference too long"));
        }
        let turf = self
            .store
            .get_turf(&turf_id)
            .ok_or(EngineError::NotFound(turf_id))?;
        if !turf.active {
            return Err(EngineError::TurfInactive(turf_id));
        }
        // Claimed before any await so racing requests with one id cannot both pass.
        let key = DayKey { turf_id, date };
        let reservation = self
            .store
            .reserve_booking(id, key)
            .ok_or(EngineError::AlreadyExists(id))?;

        let _gate = self.compaction_gate.read().await;
        let day = self.store.day_or_default(key);
        let mut guard = day.write().await;
        if guard.booked_count() >= MAX_BOOKINGS_PER_DAY {
            return Err(EngineError::LimitExceeded("too many bookings on this day"));
        }

        let request = validate_booking_request(
            &turf,
            date,
            start,
            end,
            &guard.bookings,
            self.clock.now(),
        )?;

        let event = Event::BookingAdmitted {
            id,
            turf_id,
            date,
            span: request.span,
            total_amount: request.total_amount,
            booker: booker.clone(),
        };
        self.persist_and_apply(&mut guard, &event).await?;
        reservation.commit();

        Ok(BookingInterval {
            id,
            turf_id,
            date,
            span: request.span,
            status: BookingStatus::Booked,
            payment: PaymentStatus::Paid,
            total_amount: request.total_amount,
            booker,
        })
    }

    /// `Booked -> Cancelled`. The freed range is immediately bookable again.
    pub async fn cancel_booking(&self, id: Ulid) -> Result<BookingInterval, EngineError> {
        let result: Result<BookingInterval, EngineError> = async {
            let _gate = self.compaction_gate.read().await;
            let mut guard = self.resolve_booking_write(&id).await?;
            let booking = guard
                .bookings
                .iter()
                .find(|b| b.id == id)
                .cloned()
                .ok_or(EngineError::NotFound(id))?;
            check_cancellable(&booking, self.clock.now())?;

            let event = Event::BookingCancelled {
                id,
                turf_id: booking.turf_id,
                date: booking.date,
            };
            self.persist_and_apply(&mut guard, &event).await?;
            guard
                .bookings
                .iter()
                .find(|b| b.id == id)
                .cloned()
                .ok_or(EngineError::NotFound(id))
        }
        .await;

        match &result {
            Ok(b) => {
                metrics::counter!(observability::BOOKINGS_CANCELLED_TOTAL).increment(1);
                info!(booking = %id, turf = %b.turf_id, date = %b.date, "booking cancelled");
            }
            Err(e) => {
                record_rejection("cancel", e);
                debug!(booking = %id, "cancel refused: {e}");
            }
        }
        result
    }

    /// Rewrite the journal with just the events needed to rebuild current state.
    pub async fn compact_journal(&self) -> Result<(), EngineError> {
        // Holding the gate exclusively keeps every mutation out until the
        // rewrite is queued, so no append can land between snapshot and swap.
        let _gate = self.compaction_gate.write().await;
        let mut events: Vec<Event> = self
            .store
            .turfs()
            .into_iter()
            .map(|turf| Event::TurfRegistered { turf })
            .collect();

        for day in self.store.days() {
            let guard = day.read().await;
            for b in &guard.bookings {
                events.push(Event::BookingAdmitted {
                    id: b.id,
                    turf_id: b.turf_id,
                    date: b.date,
                    span: b.span,
                    total_amount: b.total_amount,
                    booker: b.booker.clone(),
                });
                if b.status == BookingStatus::Cancelled {
                    events.push(Event::BookingCancelled {
                        id: b.id,
                        turf_id: b.turf_id,
                        date: b.date,
                    });
                }
            }
        }

        let count = events.len();
        let (tx, rx) = oneshot::channel();
        self.journal_tx
            .send(JournalCommand::Rewrite { events, response: tx })
            .await
            .map_err(|_| EngineError::JournalError("journal writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::JournalError("journal writer dropped response".into()))?
            .map_err(|e| EngineError::JournalError(e.to_string()))?;
        info!("journal compacted to {count} events");
        Ok(())
    }

    pub async fn journal_appends_since_compact(&self) -> u64 {
        let (tx, rx) = oneshot::channel();
        if self
            .journal_tx
            .send(JournalCommand::AppendsSinceCompact { response: tx })
            .await
            .is_err()
        {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}
