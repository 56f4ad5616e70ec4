//! Hard caps on ledger size and input lengths.

use crate::model::Amount;

pub const MAX_TURFS: usize = 100_000;

/// One booking per minute of the day is the densest possible schedule.
pub const MAX_BOOKINGS_PER_DAY: usize = 1_440;

pub const MAX_NAME_LEN: usize = 200;

pub const MAX_BOOKER_LEN: usize = 256;

pub const MAX_PRICE_PER_HOUR: Amount = 1_000_000_000;

pub const MAX_PAGE_SIZE: usize = 100;

pub const DEFAULT_PAGE_SIZE: usize = 10;
