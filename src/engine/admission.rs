use tracing::{debug, info};
use ulid::Ulid;

use crate::limits::*;
use crate::model::{
    DomainEvent, MS_PER_DAY, MS_PER_HOUR, Ms, ReservationRequest, SpaceState, SpaceStatus, Span,
};
use crate::observability::{ADMISSION_DURATION_SECONDS, ADMISSIONS_TOTAL};
use crate::reservation::{Reservation, ReservationStatus};

use super::{Engine, EngineError};

pub(crate) fn now_ms() -> Ms {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_millis() as Ms
}

/// Checked construction of a reservation/block span.
pub(crate) fn validate_range(start: Ms, end: Ms) -> Result<Span, EngineError> {
    if end <= start {
        return Err(EngineError::InvalidDateRange { start, end });
    }
    if start < MIN_VALID_TIMESTAMP_MS || end > MAX_VALID_TIMESTAMP_MS {
        return Err(EngineError::LimitExceeded("timestamp out of range"));
    }
    let span = Span::new(start, end);
    if span.duration_ms() > MAX_SPAN_DURATION_MS {
        return Err(EngineError::LimitExceeded("span too wide"));
    }
    Ok(span)
}

/// Pre-lock admission checks, in order: space status, range, capacity,
/// advance window, duration. First violation wins.
pub(crate) fn validate_request(
    state: &SpaceState,
    req: &ReservationRequest,
    now: Ms,
) -> Result<Span, EngineError> {
    if state.status != SpaceStatus::Active {
        return Err(EngineError::SpaceInactive {
            space_id: state.id,
            status: state.status,
        });
    }
    let span = validate_range(req.start, req.end)?;
    if let Some(ref title) = req.title
        && title.len() > MAX_TITLE_LEN
    {
        return Err(EngineError::LimitExceeded("title too long"));
    }

    let cfg = &state.config;
    if req.expected_guests > cfg.capacity {
        return Err(EngineError::CapacityExceeded {
            space_id: state.id,
            requested: req.expected_guests,
            capacity: cfg.capacity,
        });
    }
    let earliest = now + Ms::from(cfg.min_advance_hours) * MS_PER_HOUR;
    let latest = now + Ms::from(cfg.max_advance_days) * MS_PER_DAY;
    if span.start < earliest || span.start > latest {
        return Err(EngineError::AdvanceWindowViolation {
            space_id: state.id,
            start: span.start,
            earliest,
            latest,
        });
    }
    if let Some(max_hours) = cfg.max_duration_hours
        && span.duration_ms() > Ms::from(max_hours) * MS_PER_HOUR
    {
        return Err(EngineError::DurationExceeded {
            space_id: state.id,
            duration_ms: span.duration_ms(),
            max_hours,
        });
    }
    Ok(span)
}

/// The locked conflict re-check: any live reservation or block overlapping
/// the requested span claims the slot.
pub(crate) fn check_slot_free(state: &SpaceState, span: &Span) -> Result<(), EngineError> {
    if state
        .overlapping_reservations(span)
        .any(|r| r.status.blocks_slot())
        || state.overlapping_blocks(span).next().is_some()
    {
        return Err(EngineError::SlotConflict {
            space_id: state.id,
            span: *span,
        });
    }
    Ok(())
}

impl Engine {
    /// Validate and admit a booking request. On success the returned
    /// reservation exclusively holds its interval until a terminal
    /// transition — no later admission for the same space can observe the
    /// slot as open.
    pub async fn request_reservation(
        &self,
        id: Ulid,
        req: ReservationRequest,
    ) -> Result<Reservation, EngineError> {
        let space_id = req.space_id;
        let started = std::time::Instant::now();
        let result = self.admit(id, req, now_ms()).await;
        metrics::histogram!(ADMISSION_DURATION_SECONDS).record(started.elapsed().as_secs_f64());
        match &result {
            Ok(r) => {
                metrics::counter!(ADMISSIONS_TOTAL, "outcome" => "admitted").increment(1);
                info!(reservation = %r.id, space = %space_id, status = ?r.status, "reservation admitted");
            }
            Err(e) => {
                metrics::counter!(ADMISSIONS_TOTAL, "outcome" => "rejected").increment(1);
                debug!(space = %space_id, error = %e, "admission rejected");
            }
        }
        result
    }

    pub(crate) async fn admit(
        &self,
        id: Ulid,
        req: ReservationRequest,
        now: Ms,
    ) -> Result<Reservation, EngineError> {
        let rs = self
            .get_space(&req.space_id)
            .ok_or(EngineError::NotFound(req.space_id))?;

        // Steps 1–4 read the administrative config without the write lock;
        // a config edit racing past here is caught on the next attempt.
        let span = {
            let guard = self.lock_space_read(req.space_id, &rs).await?;
            validate_request(&guard, &req, now)?
        };

        // Governance is consulted before any locking.
        if self.governance.has_active_block(req.unit_id).await {
            return Err(EngineError::UnitBlocked { unit_id: req.unit_id });
        }

        // Critical section: conflict re-check and insert. First lock-holder
        // wins the slot; the loser observes SlotConflict.
        let mut guard = self.lock_space_write(req.space_id, &rs).await?;
        if guard.reservations.len() >= MAX_RESERVATIONS_PER_SPACE {
            return Err(EngineError::LimitExceeded("too many reservations on space"));
        }
        if self.entity_to_space.contains_key(&id) {
            return Err(EngineError::AlreadyExists(id));
        }
        check_slot_free(&guard, &span)?;

        let status = if guard.config.requires_approval {
            ReservationStatus::PendingApproval
        } else {
            ReservationStatus::Confirmed
        };
        let reservation = Reservation::new(id, &req, span, status, now);
        guard.insert_reservation(reservation.clone());
        self.entity_to_space.insert(id, req.space_id);

        let event = match status {
            ReservationStatus::PendingApproval => DomainEvent::ReservationRequested {
                id,
                space_id: req.space_id,
                unit_id: req.unit_id,
                resident_id: req.resident_id,
                span,
            },
            _ => DomainEvent::ReservationConfirmed {
                id,
                space_id: req.space_id,
                unit_id: req.unit_id,
                span,
            },
        };
        self.events.publish(&event);
        Ok(reservation)
    }
}
