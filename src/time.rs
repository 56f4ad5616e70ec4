use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::engine::Rejection;
use crate::model::{Minutes, Span};

pub const MINUTES_PER_DAY: Minutes = 1440;

/// Width of one availability grid cell.
pub const SLOT_MINUTES: Minutes = 60;

/// Wall-clock time of day with no date or zone, stored as minutes since midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(Minutes);

impl TimeOfDay {
    pub fn from_minutes(minutes: Minutes) -> Option<Self> {
        (minutes < MINUTES_PER_DAY).then_some(Self(minutes))
    }

    pub fn from_hm(hour: Minutes, minute: Minutes) -> Option<Self> {
        if hour > 23 || minute > 59 {
            return None;
        }
        Some(Self(hour * 60 + minute))
    }

    pub fn minutes(self) -> Minutes {
        self.0
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

impl FromStr for TimeOfDay {
    type Err = Rejection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_time_of_day(s)
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        parse_time_of_day(&text).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for minutes-since-midnight fields, written as `HH:MM` text.
pub mod hhmm {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{TimeOfDay, parse_time_of_day};
    use crate::model::Minutes;

    pub fn serialize<S: Serializer>(minutes: &Minutes, serializer: S) -> Result<S::Ok, S::Error> {
        let time = TimeOfDay::from_minutes(*minutes).ok_or_else(|| {
            serde::ser::Error::custom(format!("{minutes} is not a minute of the day"))
        })?;
        serializer.collect_str(&time)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Minutes, D::Error> {
        let text = String::deserialize(deserializer)?;
        parse_time_of_day(&text)
            .map(TimeOfDay::minutes)
            .map_err(serde::de::Error::custom)
    }
}

/// Parse `H:MM` / `HH:MM`. Hours 0-23 with an optional leading zero, minutes
/// always two digits.
pub fn parse_time_of_day(text: &str) -> Result<TimeOfDay, Rejection> {
    let (h, m) = text.split_once(':').ok_or(Rejection::InvalidFormat)?;
    if h.is_empty() || h.len() > 2 || m.len() != 2 {
        return Err(Rejection::InvalidFormat);
    }
    if !h.bytes().chain(m.bytes()).all(|b| b.is_ascii_digit()) {
        return Err(Rejection::InvalidFormat);
    }
    // All-digit and at most two characters each, so these cannot fail.
    let hour: Minutes = h.parse().map_err(|_| Rejection::InvalidFormat)?;
    let minute: Minutes = m.parse().map_err(|_| Rejection::InvalidFormat)?;
    TimeOfDay::from_hm(hour, minute).ok_or(Rejection::InvalidFormat)
}

/// Zero-padded `HH:MM`, or `None` when `minutes` is not a time of day.
pub fn format_time_of_day(minutes: Minutes) -> Option<String> {
    TimeOfDay::from_minutes(minutes).map(|t| t.to_string())
}

/// Contiguous one-hour cells from `open`, stopping at `close`.
/// A trailing cell shorter than an hour is dropped. Clone to restart.
#[derive(Debug, Clone)]
pub struct HourlySlots {
    next: Minutes,
    close: Minutes,
}

impl Iterator for HourlySlots {
    type Item = Span;

    fn next(&mut self) -> Option<Span> {
        let end = self.next.checked_add(SLOT_MINUTES)?;
        if end > self.close {
            return None;
        }
        let slot = Span::new(self.next, end);
        self.next = end;
        Some(slot)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = (self.close.saturating_sub(self.next) / SLOT_MINUTES) as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for HourlySlots {}

pub fn generate_hourly_slots(open: Minutes, close: Minutes) -> HourlySlots {
    HourlySlots { next: open, close }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_canonical_and_short_hours() {
        assert_eq!(parse_time_of_day("09:30").unwrap().minutes(), 570);
        assert_eq!(parse_time_of_day("9:30").unwrap().minutes(), 570);
        assert_eq!(parse_time_of_day("00:00").unwrap().minutes(), 0);
        assert_eq!(parse_time_of_day("23:59").unwrap().minutes(), 1439);
    }

    #[test]
    fn rejects_malformed_times() {
        for bad in ["24:00", "12:60", "1:5", "123:00", ":30", "12:", "ab:cd", "12-30", "", "+1:30", "12:3 "] {
            assert_eq!(parse_time_of_day(bad), Err(Rejection::InvalidFormat), "{bad:?}");
        }
    }

    #[test]
    fn format_pads_and_bounds() {
        assert_eq!(format_time_of_day(0).as_deref(), Some("00:00"));
        assert_eq!(format_time_of_day(545).as_deref(), Some("09:05"));
        assert_eq!(format_time_of_day(1439).as_deref(), Some("23:59"));
        assert_eq!(format_time_of_day(1440), None);
    }

    #[test]
    fn hourly_slots_full_day_window() {
        let slots: Vec<Span> = generate_hourly_slots(300, 1380).collect();
        assert_eq!(slots.len(), 18);
        assert_eq!(slots[0], Span::new(300, 360));
        assert_eq!(slots[17], Span::new(1320, 1380));
        assert!(slots.windows(2).all(|w| w[0].end == w[1].start));
    }

    #[test]
    fn hourly_slots_drop_partial_tail() {
        // 06:30 - 09:00 leaves a 30 minute tail after 08:30
        let slots: Vec<Span> = generate_hourly_slots(390, 540).collect();
        assert_eq!(slots, vec![Span::new(390, 450), Span::new(450, 510)]);
    }

    #[test]
    fn hourly_slots_short_window_is_empty() {
        assert_eq!(generate_hourly_slots(600, 630).count(), 0);
    }

    #[test]
    fn hourly_slots_restart_by_clone() {
        let slots = generate_hourly_slots(360, 600);
        assert_eq!(slots.len(), 4);
        let first: Vec<_> = slots.clone().collect();
        let second: Vec<_> = slots.collect();
        assert_eq!(first, second);
    }

    #[test]
    fn serde_uses_text_form() {
        let t = parse_time_of_day("7:05").unwrap();
        assert_eq!(serde_json::to_string(&t).unwrap(), "\"07:05\"");
        let back: TimeOfDay = serde_json::from_str("\"07:05\"").unwrap();
        assert_eq!(back, t);
        assert!(serde_json::from_str::<TimeOfDay>("\"25:00\"").is_err());
    }
}
