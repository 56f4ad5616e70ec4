mod availability;
mod conflict;
mod error;
mod mutations;
mod queries;
mod store;

pub use availability::{build_availability_grid, free_windows, merge_overlapping, subtract_intervals};
pub use conflict::{cancel_booking, check_cancellable, check_overlap, overlaps, validate_booking_request};
pub use error::{EngineError, Rejection};
pub use store::{BookingReservation, InMemoryStore};

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{RwLock, mpsc, oneshot};
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::journal::Journal;
use crate::model::*;
use crate::notify::NotifyHub;
use crate::observability;

/// One lock per turf per day: admission for that day is serialized on it.
pub type SharedDay = Arc<RwLock<DayLedger>>;

// ── Group-commit journal channel ─────────────────────────

pub(super) enum JournalCommand {
    Append {
        event: Event,
        response: oneshot::Sender<io::Result<()>>,
    },
    Rewrite {
        events: Vec<Event>,
        response: oneshot::Sender<io::Result<()>>,
    },
    AppendsSinceCompact {
        response: oneshot::Sender<u64>,
    },
}

type PendingAppend = (Event, oneshot::Sender<io::Result<()>>);

/// Owns the journal. Appends that queue up while one fsync is in flight are
/// written together and committed with a single fsync.
async fn journal_writer_loop(mut journal: Journal, mut rx: mpsc::Receiver<JournalCommand>) {
    while let Some(cmd) = rx.recv().await {
        let JournalCommand::Append { event, response } = cmd else {
            handle_control(&mut journal, cmd);
            continue;
        };

        let mut batch: Vec<PendingAppend> = vec![(event, response)];
        let mut deferred = None;
        while let Ok(next) = rx.try_recv() {
            match next {
                JournalCommand::Append { event, response } => batch.push((event, response)),
                other => {
                    deferred = Some(other);
                    break;
                }
            }
        }

        commit_batch(&mut journal, batch);
        if let Some(cmd) = deferred {
            handle_control(&mut journal, cmd);
        }
    }
    debug!("journal writer stopped");
}

fn commit_batch(journal: &mut Journal, batch: Vec<PendingAppend>) {
    metrics::histogram!(observability::JOURNAL_BATCH_SIZE).record(batch.len() as f64);
    let started = Instant::now();

    let mut result = batch.iter().try_for_each(|(event, _)| journal.append(event));
    // Commit even after a failed append so no half-buffered batch leaks into the next one.
    let committed = journal.commit();
    if result.is_ok() {
        result = committed;
    }

    metrics::histogram!(observability::JOURNAL_COMMIT_DURATION_SECONDS)
        .record(started.elapsed().as_secs_f64());
    if let Err(e) = &result {
        warn!("journal commit failed for {} events: {e}", batch.len());
    }

    for (_, tx) in batch {
        let reply = match &result {
            Ok(()) => Ok(()),
            Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
        };
        let _ = tx.send(reply);
    }
}

fn handle_control(journal: &mut Journal, cmd: JournalCommand) {
    match cmd {
        JournalCommand::Rewrite { events, response } => {
            let _ = response.send(journal.rewrite(&events));
        }
        JournalCommand::AppendsSinceCompact { response } => {
            let _ = response.send(journal.appends_since_compact());
        }
        JournalCommand::Append { .. } => unreachable!("appends are batched by the writer loop"),
    }
}

/// The booking ledger: turf directory plus per-day booking state, journaled.
pub struct Engine {
    pub(super) store: InMemoryStore,
    pub(super) journal_tx: mpsc::Sender<JournalCommand>,
    pub notify: Arc<NotifyHub>,
    pub(super) clock: Arc<dyn Clock>,
    /// Mutations hold it shared; journal compaction holds it exclusively.
    pub(super) compaction_gate: RwLock<()>,
}

impl Engine {
    /// Replay the journal at `journal_path` and start its writer task.
    /// Must be called inside a tokio runtime.
    pub fn new(
        journal_path: PathBuf,
        notify: Arc<NotifyHub>,
        clock: Arc<dyn Clock>,
    ) -> io::Result<Self> {
        let events = Journal::replay(&journal_path)?;
        let journal = Journal::open(&journal_path, events.len() as u64)?;
        let (journal_tx, journal_rx) = mpsc::channel(4096);
        tokio::spawn(journal_writer_loop(journal, journal_rx));

        let engine = Self {
            store: InMemoryStore::new(),
            journal_tx,
            notify,
            clock,
            compaction_gate: RwLock::new(()),
        };

        // Nothing else holds these locks yet, so try_write never contends.
        // Blocking lock calls would panic if we are already inside the runtime.
        for event in &events {
            match event {
                Event::TurfRegistered { .. } | Event::TurfUpdated { .. } => {
                    engine.store.apply_turf_event(event);
                }
                Event::BookingAdmitted { turf_id, date, .. }
                | Event::BookingCancelled { turf_id, date, .. } => {
                    let day = engine.store.day_or_default(DayKey { turf_id: *turf_id, date: *date });
                    let Ok(mut guard) = day.try_write() else {
                        return Err(io::Error::other("journal replay: day ledger contended"));
                    };
                    engine.store.apply_to_day(&mut guard, event);
                }
            }
        }
        debug!("replayed {} journal events from {}", events.len(), journal_path.display());

        Ok(engine)
    }

    pub(super) async fn journal_append(&self, event: &Event) -> Result<(), EngineError> {
        let (tx, rx) = oneshot::channel();
        self.journal_tx
            .send(JournalCommand::Append {
                event: event.clone(),
                response: tx,
            })
            .await
            .map_err(|_| EngineError::JournalError("journal writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::JournalError("journal writer dropped response".into()))?
            .map_err(|e| EngineError::JournalError(e.to_string()))
    }

    /// Journal, apply and broadcast a booking event. Caller holds the day lock.
    pub(super) async fn persist_and_apply(
        &self,
        day: &mut DayLedger,
        event: &Event,
    ) -> Result<(), EngineError> {
        self.journal_append(event).await?;
        self.store.apply_to_day(day, event);
        self.notify.send(event.turf_id(), event);
        Ok(())
    }

    /// Resolve a booking id to its day and take that day's write lock.
    pub(super) async fn resolve_booking_write(
        &self,
        booking_id: &ulid::Ulid,
    ) -> Result<tokio::sync::OwnedRwLockWriteGuard<DayLedger>, EngineError> {
        let key = self
            .store
            .day_for_booking(booking_id)
            .ok_or(EngineError::NotFound(*booking_id))?;
        let day = self
            .store
            .get_day(&key)
            .ok_or(EngineError::NotFound(*booking_id))?;
        Ok(day.write_owned().await)
    }

    pub fn now(&self) -> chrono::NaiveDateTime {
        self.clock.now()
    }
}
