use chrono::{NaiveDate, NaiveDateTime};
use ulid::Ulid;

use crate::model::*;
use crate::time::parse_time_of_day;

use super::Rejection;

/// The one overlap predicate for half-open minute ranges.
pub fn overlaps(a: &Span, b: &Span) -> bool {
    a.overlaps(b)
}

/// True if `span` collides with any booked interval of the same turf and day.
/// Cancelled intervals and other turfs/days never collide.
pub fn check_overlap<'a>(
    turf_id: Ulid,
    date: NaiveDate,
    span: &Span,
    existing: impl IntoIterator<Item = &'a BookingInterval>,
) -> bool {
    existing.into_iter().any(|b| {
        b.is_booked() && b.turf_id == turf_id && b.date == date && overlaps(span, &b.span)
    })
}

/// Run the admission guards in order; the first failure wins.
pub fn validate_booking_request<'a>(
    turf: &Turf,
    date: NaiveDate,
    start: &str,
    end: &str,
    existing: impl IntoIterator<Item = &'a BookingInterval>,
    now: NaiveDateTime,
) -> Result<ValidatedRequest, Rejection> {
    let start = parse_time_of_day(start)?;
    let end = parse_time_of_day(end)?;
    if end <= start {
        return Err(Rejection::InvalidRange);
    }

    let today = now.date();
    if date < today {
        return Err(Rejection::PastDate);
    }
    // Starting exactly at the current minute is allowed.
    if date == today && start.minutes() < minute_of_day(now) {
        return Err(Rejection::PastTime);
    }

    let span = Span::between(start, end);
    if !turf.window.span().contains_span(&span) {
        return Err(Rejection::OutsideOperatingHours);
    }
    if check_overlap(turf.id, date, &span, existing) {
        return Err(Rejection::SlotTaken);
    }

    Ok(ValidatedRequest {
        turf_id: turf.id,
        date,
        span,
        total_amount: turf.price_for(span.duration_minutes()),
    })
}

/// Guards for the single `Booked -> Cancelled` transition. Unlike admission,
/// a booking whose start equals the current minute has already started.
pub fn check_cancellable(booking: &BookingInterval, now: NaiveDateTime) -> Result<(), Rejection> {
    if booking.status == BookingStatus::Cancelled {
        return Err(Rejection::AlreadyCancelled);
    }
    let today = now.date();
    if booking.date < today {
        return Err(Rejection::PastBooking);
    }
    if booking.date == today && booking.span.start <= minute_of_day(now) {
        return Err(Rejection::AlreadyStarted);
    }
    Ok(())
}

/// Return the cancelled form of `booking`, leaving the input untouched.
pub fn cancel_booking(
    booking: &BookingInterval,
    now: NaiveDateTime,
) -> Result<BookingInterval, Rejection> {
    check_cancellable(booking, now)?;
    Ok(BookingInterval {
        status: BookingStatus::Cancelled,
        payment: PaymentStatus::Refunded,
        ..booking.clone()
    })
}
