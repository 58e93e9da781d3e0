use chrono::Weekday;
use thiserror::Error;
use ulid::Ulid;

use crate::model::{Ms, SpaceStatus, Span};
use crate::reservation::ReservationStatus;

/// Expected, recoverable-by-caller failures. `SlotConflict` and
/// `LockTimeout` are the only kinds where resubmitting the same request
/// might succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("not found: {0}")]
    NotFound(Ulid),
    #[error("already exists: {0}")]
    AlreadyExists(Ulid),
    #[error("space {space_id} does not accept reservations (status {status:?})")]
    SpaceInactive { space_id: Ulid, status: SpaceStatus },
    #[error("space {space_id} holds {capacity} guests, {requested} requested")]
    CapacityExceeded {
        space_id: Ulid,
        requested: u32,
        capacity: u32,
    },
    #[error("start {start} outside the bookable window [{earliest}, {latest}] of space {space_id}")]
    AdvanceWindowViolation {
        space_id: Ulid,
        start: Ms,
        earliest: Ms,
        latest: Ms,
    },
    #[error("duration {duration_ms}ms exceeds the {max_hours}h limit of space {space_id}")]
    DurationExceeded {
        space_id: Ulid,
        duration_ms: Ms,
        max_hours: u32,
    },
    #[error("unit {unit_id} is barred from booking")]
    UnitBlocked { unit_id: Ulid },
    #[error("slot {span:?} on space {space_id} is taken")]
    SlotConflict { space_id: Ulid, span: Span },
    #[error("reservation {reservation_id}: no transition from {from:?} to {to:?}")]
    InvalidStatusTransition {
        reservation_id: Ulid,
        from: ReservationStatus,
        to: ReservationStatus,
    },
    #[error("invalid range: end {end} not after start {start}")]
    InvalidDateRange { start: Ms, end: Ms },
    #[error("timed out waiting for the booking lock on space {space_id}; safe to retry")]
    LockTimeout { space_id: Ulid },
    #[error("window overlaps an existing {weekday} window on space {space_id}")]
    WindowOverlap { space_id: Ulid, weekday: Weekday },
    #[error("limit exceeded: {0}")]
    LimitExceeded(&'static str),
}
