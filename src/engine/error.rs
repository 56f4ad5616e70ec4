use ulid::Ulid;

/// Expected, user-facing reasons a booking or cancellation is refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rejection {
    InvalidFormat,
    InvalidRange,
    PastDate,
    PastTime,
    OutsideOperatingHours,
    SlotTaken,
    AlreadyCancelled,
    PastBooking,
    AlreadyStarted,
}

impl Rejection {
    /// Stable label for metrics and logs.
    pub fn code(&self) -> &'static str {
        match self {
            Rejection::InvalidFormat => "invalid_format",
            Rejection::InvalidRange => "invalid_range",
            Rejection::PastDate => "past_date",
            Rejection::PastTime => "past_time",
            Rejection::OutsideOperatingHours => "outside_operating_hours",
            Rejection::SlotTaken => "slot_taken",
            Rejection::AlreadyCancelled => "already_cancelled",
            Rejection::PastBooking => "past_booking",
            Rejection::AlreadyStarted => "already_started",
        }
    }
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            Rejection::InvalidFormat => "time must be in HH:MM format",
            Rejection::InvalidRange => "end time must be after start time",
            Rejection::PastDate => "cannot book slots in the past",
            Rejection::PastTime => "start time has already passed today",
            Rejection::OutsideOperatingHours => "booking must be within turf operating hours",
            Rejection::SlotTaken => "this time slot is already booked",
            Rejection::AlreadyCancelled => "booking is already cancelled",
            Rejection::PastBooking => "cannot cancel past bookings",
            Rejection::AlreadyStarted => "cannot cancel a booking that has already started",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for Rejection {}

#[derive(Debug)]
pub enum EngineError {
    NotFound(Ulid),
    AlreadyExists(Ulid),
    Rejected(Rejection),
    InvalidTurf(&'static str),
    TurfInactive(Ulid),
    LimitExceeded(&'static str),
    JournalError(String),
}

impl From<Rejection> for EngineError {
    fn from(r: Rejection) -> Self {
        EngineError::Rejected(r)
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::NotFound(id) => write!(f, "not found: {id}"),
            EngineError::AlreadyExists(id) => write!(f, "already exists: {id}"),
            EngineError::Rejected(r) => write!(f, "rejected: {r}"),
            EngineError::InvalidTurf(msg) => write!(f, "invalid turf configuration: {msg}"),
            EngineError::TurfInactive(id) => {
                write!(f, "turf {id} is not available for booking")
            }
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            EngineError::JournalError(e) => write!(f, "journal error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}
