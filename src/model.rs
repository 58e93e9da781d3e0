use chrono::{Datelike, NaiveDate, NaiveTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::reservation::Reservation;

/// Unix milliseconds — the only time type.
pub type Ms = i64;

pub const MS_PER_HOUR: Ms = 3_600_000;
pub const MS_PER_DAY: Ms = 24 * MS_PER_HOUR;

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: Ms,
    pub end: Ms,
}

impl Span {
    pub fn new(start: Ms, end: Ms) -> Self {
        debug_assert!(start < end, "Span start must be before end");
        Self { start, end }
    }

    pub fn duration_ms(&self) -> Ms {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Intersection with `bounds`. Caller must guarantee the spans overlap.
    pub fn clamp_to(&self, bounds: &Span) -> Span {
        Span::new(self.start.max(bounds.start), self.end.min(bounds.end))
    }
}

/// Milliseconds since midnight, for window diagnostics.
pub(crate) fn time_to_ms(t: NaiveTime) -> Ms {
    Ms::from(t.num_seconds_from_midnight()) * 1000
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpaceStatus {
    Active,
    Inactive,
    Maintenance,
}

/// Administrative configuration of a bookable space. Read-only input to the
/// booking paths; changing it never touches existing reservations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceConfig {
    pub name: String,
    /// Amenity kind (hall, pool, court, ...). Informational.
    pub kind: String,
    /// Maximum guest count per reservation.
    pub capacity: u32,
    /// When set, new reservations start as `PendingApproval`.
    pub requires_approval: bool,
    pub max_duration_hours: Option<u32>,
    pub max_advance_days: u32,
    pub min_advance_hours: u32,
    pub cancellation_deadline_hours: u32,
}

/// One weekly recurring open window for a space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenWindow {
    pub id: Ulid,
    pub weekday: Weekday,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl OpenWindow {
    /// Concrete span of this window on `date`, if the weekday matches.
    pub fn span_on(&self, date: NaiveDate) -> Option<Span> {
        if date.weekday() != self.weekday {
            return None;
        }
        let start = date.and_time(self.start).and_utc().timestamp_millis();
        let end = date.and_time(self.end).and_utc().timestamp_millis();
        Some(Span::new(start, end))
    }

    /// Two windows clash when they share a weekday and their times overlap.
    pub fn overlaps(&self, other: &OpenWindow) -> bool {
        self.weekday == other.weekday && self.start < other.end && other.start < self.end
    }
}

/// Ad-hoc closure of a space, e.g. maintenance. Overrides weekly windows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub id: Ulid,
    pub span: Span,
    pub reason: String,
    pub created_by: Ulid,
    pub notes: Option<String>,
}

/// Informational key/value constraint attached to a space. Listed to
/// residents, never enforced by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HouseRule {
    pub key: String,
    pub value: String,
}

/// One entry of the finest-grained availability cut for a space/date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub span: Span,
    pub available: bool,
}

/// A booking request as it arrives from the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationRequest {
    pub space_id: Ulid,
    pub unit_id: Ulid,
    pub resident_id: Ulid,
    pub start: Ms,
    pub end: Ms,
    pub expected_guests: u32,
    pub title: Option<String>,
    pub notes: Option<String>,
}

/// Per-space aggregate: configuration, schedule and the full reservation
/// history. One `RwLock` around this value serializes all bookings for the
/// space.
#[derive(Debug, Clone)]
pub struct SpaceState {
    pub id: Ulid,
    pub status: SpaceStatus,
    pub config: SpaceConfig,
    pub created_at: Ms,
    pub windows: Vec<OpenWindow>,
    /// Sorted by `span.start`.
    pub blocks: Vec<Block>,
    pub rules: Vec<HouseRule>,
    /// Every reservation ever admitted, sorted by `span.start`. Terminal
    /// ones stay as history and stop consuming their slot.
    pub reservations: Vec<Reservation>,
}

impl SpaceState {
    pub fn new(id: Ulid, config: SpaceConfig, created_at: Ms) -> Self {
        Self {
            id,
            status: SpaceStatus::Active,
            config,
            created_at,
            windows: Vec::new(),
            blocks: Vec::new(),
            rules: Vec::new(),
            reservations: Vec::new(),
        }
    }

    /// Insert block maintaining sort order by span.start.
    pub fn insert_block(&mut self, block: Block) {
        let pos = self
            .blocks
            .binary_search_by_key(&block.span.start, |b| b.span.start)
            .unwrap_or_else(|e| e);
        self.blocks.insert(pos, block);
    }

    pub fn remove_block(&mut self, id: Ulid) -> Option<Block> {
        let pos = self.blocks.iter().position(|b| b.id == id)?;
        Some(self.blocks.remove(pos))
    }

    /// Blocks whose span overlaps the query window. Binary search skips
    /// blocks starting at or after `query.end`.
    pub fn overlapping_blocks(&self, query: &Span) -> impl Iterator<Item = &Block> {
        let right_bound = self.blocks.partition_point(|b| b.span.start < query.end);
        self.blocks[..right_bound]
            .iter()
            .filter(move |b| b.span.end > query.start)
    }

    pub fn remove_window(&mut self, id: Ulid) -> Option<OpenWindow> {
        let pos = self.windows.iter().position(|w| w.id == id)?;
        Some(self.windows.remove(pos))
    }

    /// Insert reservation maintaining sort order by span.start.
    pub fn insert_reservation(&mut self, reservation: Reservation) {
        let pos = self
            .reservations
            .binary_search_by_key(&reservation.span.start, |r| r.span.start)
            .unwrap_or_else(|e| e);
        self.reservations.insert(pos, reservation);
    }

    pub fn reservation(&self, id: &Ulid) -> Option<&Reservation> {
        self.reservations.iter().find(|r| r.id == *id)
    }

    pub fn reservation_mut(&mut self, id: &Ulid) -> Option<&mut Reservation> {
        self.reservations.iter_mut().find(|r| r.id == *id)
    }

    /// Reservations whose span overlaps the query window, regardless of
    /// status — callers filter on `status.blocks_slot()`.
    pub fn overlapping_reservations(&self, query: &Span) -> impl Iterator<Item = &Reservation> {
        let right_bound = self
            .reservations
            .partition_point(|r| r.span.start < query.end);
        self.reservations[..right_bound]
            .iter()
            .filter(move |r| r.span.end > query.start)
    }
}

/// Domain events, one per successful mutation. Consumed by the event sink
/// for cache invalidation, notifications and governance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DomainEvent {
    SpaceCreated {
        space_id: Ulid,
        name: String,
    },
    SpaceUpdated {
        space_id: Ulid,
    },
    WindowAdded {
        id: Ulid,
        space_id: Ulid,
        weekday: Weekday,
        start: NaiveTime,
        end: NaiveTime,
    },
    WindowRemoved {
        id: Ulid,
        space_id: Ulid,
    },
    BlockAdded {
        id: Ulid,
        space_id: Ulid,
        span: Span,
        reason: String,
    },
    BlockRemoved {
        id: Ulid,
        space_id: Ulid,
    },
    ReservationRequested {
        id: Ulid,
        space_id: Ulid,
        unit_id: Ulid,
        resident_id: Ulid,
        span: Span,
    },
    ReservationConfirmed {
        id: Ulid,
        space_id: Ulid,
        unit_id: Ulid,
        span: Span,
    },
    ReservationRejected {
        id: Ulid,
        space_id: Ulid,
        rejected_by: Ulid,
        reason: Option<String>,
    },
    ReservationCanceled {
        id: Ulid,
        space_id: Ulid,
        canceled_by: Ulid,
        is_late_cancellation: bool,
        reason: Option<String>,
    },
    ReservationCheckedIn {
        id: Ulid,
        space_id: Ulid,
    },
    ReservationCompleted {
        id: Ulid,
        space_id: Ulid,
    },
    ReservationNoShow {
        id: Ulid,
        space_id: Ulid,
        unit_id: Ulid,
    },
}

impl DomainEvent {
    /// The space this event belongs to; events are routed per space.
    pub fn space_id(&self) -> Ulid {
        match self {
            DomainEvent::SpaceCreated { space_id, .. }
            | DomainEvent::SpaceUpdated { space_id }
            | DomainEvent::WindowAdded { space_id, .. }
            | DomainEvent::WindowRemoved { space_id, .. }
            | DomainEvent::BlockAdded { space_id, .. }
            | DomainEvent::BlockRemoved { space_id, .. }
            | DomainEvent::ReservationRequested { space_id, .. }
            | DomainEvent::ReservationConfirmed { space_id, .. }
            | DomainEvent::ReservationRejected { space_id, .. }
            | DomainEvent::ReservationCanceled { space_id, .. }
            | DomainEvent::ReservationCheckedIn { space_id, .. }
            | DomainEvent::ReservationCompleted { space_id, .. }
            | DomainEvent::ReservationNoShow { space_id, .. } => *space_id,
        }
    }
}

// ── Query result types ───────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceInfo {
    pub id: Ulid,
    pub status: SpaceStatus,
    pub config: SpaceConfig,
    pub created_at: Ms,
}
