use chrono::{NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::engine::EngineError;
use crate::time::{SLOT_MINUTES, TimeOfDay};

/// Minutes since midnight. Wall-clock only, no zone.
pub type Minutes = u16;

/// Money in minor currency units.
pub type Amount = u64;

/// Half-open interval `[start, end)` in minutes since midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    #[serde(with = "crate::time::hhmm")]
    pub start: Minutes,
    #[serde(with = "crate::time::hhmm")]
    pub end: Minutes,
}

impl Span {
    pub fn new(start: Minutes, end: Minutes) -> Self {
        debug_assert!(start < end, "Span start must be before end");
        Self { start, end }
    }

    pub fn between(start: TimeOfDay, end: TimeOfDay) -> Self {
        Self::new(start.minutes(), end.minutes())
    }

    pub fn duration_minutes(&self) -> Minutes {
        self.end - self.start
    }

    /// Touching endpoints do not overlap.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && self.end > other.start
    }

    pub fn contains_span(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// Minute of day for a wall-clock instant.
pub fn minute_of_day(now: NaiveDateTime) -> Minutes {
    (now.hour() * 60 + now.minute()) as Minutes
}

/// Daily opening hours. `opening < closing` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatingWindow {
    opening: TimeOfDay,
    closing: TimeOfDay,
}

impl OperatingWindow {
    pub fn new(opening: TimeOfDay, closing: TimeOfDay) -> Result<Self, EngineError> {
        if opening >= closing {
            return Err(EngineError::InvalidTurf("opening time must be before closing time"));
        }
        Ok(Self { opening, closing })
    }

    pub fn opening(&self) -> TimeOfDay {
        self.opening
    }

    pub fn closing(&self) -> TimeOfDay {
        self.closing
    }

    pub fn span(&self) -> Span {
        Span::between(self.opening, self.closing)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turf {
    pub id: Ulid,
    pub name: Option<String>,
    pub window: OperatingWindow,
    pub price_per_hour: Amount,
    pub active: bool,
}

impl Turf {
    /// Closing minute counts as open, matching the public listing badge.
    pub fn is_open_at(&self, now: NaiveDateTime) -> bool {
        let t = minute_of_day(now);
        self.window.opening.minutes() <= t && t <= self.window.closing.minutes()
    }

    /// Price of `minutes` of play, rounded half up to a whole minor unit.
    pub fn price_for(&self, minutes: Minutes) -> Amount {
        let minute_cost = self.price_per_hour * minutes as Amount;
        let hour = SLOT_MINUTES as Amount;
        (minute_cost + hour / 2) / hour
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BookingStatus {
    Booked,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    Paid,
    Refunded,
}

/// One reservation. Never deleted; cancellation only flips `status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingInterval {
    pub id: Ulid,
    pub turf_id: Ulid,
    pub date: NaiveDate,
    pub span: Span,
    pub status: BookingStatus,
    pub payment: PaymentStatus,
    pub total_amount: Amount,
    pub booker: Option<String>,
}

impl BookingInterval {
    pub fn is_booked(&self) -> bool {
        self.status == BookingStatus::Booked
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotClassification {
    Available,
    Booked,
    Past,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSlot {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
    pub classification: SlotClassification,
}

/// An admitted and priced request, not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRequest {
    pub turf_id: Ulid,
    pub date: NaiveDate,
    pub span: Span,
    pub total_amount: Amount,
}

impl ValidatedRequest {
    pub fn duration_minutes(&self) -> Minutes {
        self.span.duration_minutes()
    }

    pub fn duration_hours(&self) -> f64 {
        f64::from(self.duration_minutes()) / f64::from(SLOT_MINUTES)
    }
}

/// Bookings are locked and indexed per turf per calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DayKey {
    pub turf_id: Ulid,
    pub date: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct DayLedger {
    pub key: DayKey,
    /// Booked and cancelled intervals, sorted by `span.start`.
    pub bookings: Vec<BookingInterval>,
}

impl DayLedger {
    pub fn new(key: DayKey) -> Self {
        Self {
            key,
            bookings: Vec::new(),
        }
    }

    pub fn insert(&mut self, booking: BookingInterval) {
        let pos = self
            .bookings
            .partition_point(|b| b.span.start <= booking.span.start);
        self.bookings.insert(pos, booking);
    }

    pub fn get_mut(&mut self, id: Ulid) -> Option<&mut BookingInterval> {
        self.bookings.iter_mut().find(|b| b.id == id)
    }

    pub fn booked(&self) -> impl Iterator<Item = &BookingInterval> {
        self.bookings.iter().filter(|b| b.is_booked())
    }

    pub fn booked_count(&self) -> usize {
        self.booked().count()
    }

    /// Booked intervals overlapping `query`. Entries starting at or after
    /// `query.end` are skipped by binary search.
    pub fn overlapping(&self, query: &Span) -> impl Iterator<Item = &BookingInterval> {
        let right_bound = self.bookings.partition_point(|b| b.span.start < query.end);
        self.bookings[..right_bound]
            .iter()
            .filter(move |b| b.is_booked() && b.span.end > query.start)
    }
}

/// Journal record format. Flat, one variant per state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    TurfRegistered {
        turf: Turf,
    },
    TurfUpdated {
        turf: Turf,
    },
    BookingAdmitted {
        id: Ulid,
        turf_id: Ulid,
        date: NaiveDate,
        span: Span,
        total_amount: Amount,
        booker: Option<String>,
    },
    BookingCancelled {
        id: Ulid,
        turf_id: Ulid,
        date: NaiveDate,
    },
}

impl Event {
    pub fn turf_id(&self) -> Ulid {
        match self {
            Event::TurfRegistered { turf } | Event::TurfUpdated { turf } => turf.id,
            Event::BookingAdmitted { turf_id, .. } | Event::BookingCancelled { turf_id, .. } => {
                *turf_id
            }
        }
    }
}

// ── Query types ───────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingFilter {
    pub turf_id: Option<Ulid>,
    pub booker: Option<String>,
    pub status: Option<BookingStatus>,
    /// Inclusive.
    pub from: Option<NaiveDate>,
    /// Inclusive.
    pub to: Option<NaiveDate>,
    /// 1-based.
    pub page: usize,
    pub limit: usize,
}

impl BookingFilter {
    pub fn matches(&self, b: &BookingInterval) -> bool {
        self.turf_id.is_none_or(|t| t == b.turf_id)
            && self.status.is_none_or(|s| s == b.status)
            && self.from.is_none_or(|d| b.date >= d)
            && self.to.is_none_or(|d| b.date <= d)
            && self
                .booker
                .as_deref()
                .is_none_or(|who| b.booker.as_deref() == Some(who))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub limit: usize,
    pub total: usize,
    pub pages: usize,
}
