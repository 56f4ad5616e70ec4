use chrono::{NaiveDate, NaiveDateTime};

use crate::model::*;
use crate::time::{TimeOfDay, generate_hourly_slots};

use super::conflict::check_overlap;

// ── Hourly grid ───────────────────────────────────────────────────

/// Classify every hourly cell of the turf's day.
///
/// `Past` wins over `Booked`: a cell on an earlier date, or starting before the
/// current minute today, is past regardless of bookings.
pub fn build_availability_grid(
    turf: &Turf,
    date: NaiveDate,
    existing: &[BookingInterval],
    now: NaiveDateTime,
) -> Vec<GridSlot> {
    let today = now.date();
    let current = minute_of_day(now);
    let window = turf.window.span();

    generate_hourly_slots(window.start, window.end)
        .filter_map(|cell| {
            let classification = if date < today || (date == today && cell.start < current) {
                SlotClassification::Past
            } else if check_overlap(turf.id, date, &cell, existing) {
                SlotClassification::Booked
            } else {
                SlotClassification::Available
            };
            Some(GridSlot {
                start: TimeOfDay::from_minutes(cell.start)?,
                end: TimeOfDay::from_minutes(cell.end)?,
                classification,
            })
        })
        .collect()
}

// ── Free windows ──────────────────────────────────────────────────

/// Maximal bookable ranges of the day: operating hours minus booked
/// intervals, minus whatever of today has already elapsed.
pub fn free_windows(
    turf: &Turf,
    date: NaiveDate,
    existing: &[BookingInterval],
    now: NaiveDateTime,
) -> Vec<Span> {
    let today = now.date();
    if date < today {
        return Vec::new();
    }
    let mut window = turf.window.span();
    if date == today {
        let current = minute_of_day(now);
        if current >= window.end {
            return Vec::new();
        }
        window.start = window.start.max(current);
    }

    let mut taken: Vec<Span> = existing
        .iter()
        .filter(|b| b.is_booked() && b.turf_id == turf.id && b.date == date)
        .map(|b| b.span)
        .collect();
    taken.sort_by_key(|s| s.start);
    let taken = merge_overlapping(&taken);

    subtract_intervals(&[window], &taken)
}

/// Merge sorted overlapping/adjacent spans into disjoint spans.
pub fn merge_overlapping(sorted: &[Span]) -> Vec<Span> {
    let mut merged: Vec<Span> = Vec::new();
    for &span in sorted {
        if let Some(last) = merged.last_mut()
            && span.start <= last.end
        {
            last.end = last.end.max(span.end);
            continue;
        }
        merged.push(span);
    }
    merged
}

/// `base` minus `to_remove`. Both sorted by start; `to_remove` disjoint.
pub fn subtract_intervals(base: &[Span], to_remove: &[Span]) -> Vec<Span> {
    let mut result = Vec::new();
    let mut ri = 0;

    for &b in base {
        let mut cursor = b.start;

        while ri < to_remove.len() && to_remove[ri].end <= cursor {
            ri += 1;
        }

        let mut j = ri;
        while j < to_remove.len() && to_remove[j].start < b.end {
            let r = to_remove[j];
            if r.start > cursor {
                result.push(Span::new(cursor, r.start));
            }
            cursor = cursor.max(r.end);
            j += 1;
        }

        if cursor < b.end {
            result.push(Span::new(cursor, b.end));
        }
    }

    result
}
