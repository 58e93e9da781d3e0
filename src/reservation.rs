use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::engine::EngineError;
use crate::model::{DomainEvent, MS_PER_HOUR, Ms, ReservationRequest, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReservationStatus {
    PendingApproval,
    Confirmed,
    Rejected,
    Canceled,
    InProgress,
    Completed,
    NoShow,
}

impl ReservationStatus {
    /// Targets reachable from this status. Everything not listed is an
    /// invalid transition.
    pub fn allowed_targets(self) -> &'static [ReservationStatus] {
        use ReservationStatus::*;
        match self {
            PendingApproval => &[Confirmed, Rejected, Canceled],
            Confirmed => &[Canceled, InProgress],
            InProgress => &[Completed, NoShow],
            Rejected | Canceled | Completed | NoShow => &[],
        }
    }

    pub fn is_terminal(self) -> bool {
        self.allowed_targets().is_empty()
    }

    /// Whether a reservation in this status still consumes its slot.
    pub fn blocks_slot(self) -> bool {
        matches!(
            self,
            ReservationStatus::PendingApproval
                | ReservationStatus::Confirmed
                | ReservationStatus::InProgress
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approval {
    pub by: Ulid,
    pub at: Ms,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub by: Ulid,
    pub at: Ms,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cancellation {
    pub by: Ulid,
    pub at: Ms,
    pub reason: Option<String>,
    /// Fell inside the space's notice deadline.
    pub late: bool,
}

/// A cancellation is late when it lands inside the space's configured
/// notice deadline before the reservation starts.
pub fn is_late_cancellation(start: Ms, now: Ms, deadline_hours: u32) -> bool {
    start - now < Ms::from(deadline_hours) * MS_PER_HOUR
}

/// The booking aggregate: an immutable interval, a lifecycle status and the
/// audit trail of who moved it there. Created once by admission, mutated
/// only through the transition methods below, never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Ulid,
    pub space_id: Ulid,
    pub unit_id: Ulid,
    pub resident_id: Ulid,
    pub title: Option<String>,
    pub notes: Option<String>,
    pub span: Span,
    pub expected_guests: u32,
    pub status: ReservationStatus,
    pub created_at: Ms,
    pub approved: Option<Approval>,
    pub rejected: Option<Rejection>,
    pub canceled: Option<Cancellation>,
    pub checked_in_at: Option<Ms>,
    pub completed_at: Option<Ms>,
    pub no_show_at: Option<Ms>,
}

impl Reservation {
    pub(crate) fn new(
        id: Ulid,
        req: &ReservationRequest,
        span: Span,
        status: ReservationStatus,
        created_at: Ms,
    ) -> Self {
        Self {
            id,
            space_id: req.space_id,
            unit_id: req.unit_id,
            resident_id: req.resident_id,
            title: req.title.clone(),
            notes: req.notes.clone(),
            span,
            expected_guests: req.expected_guests,
            status,
            created_at,
            approved: None,
            rejected: None,
            canceled: None,
            checked_in_at: None,
            completed_at: None,
            no_show_at: None,
        }
    }

    fn guard(&self, target: ReservationStatus) -> Result<(), EngineError> {
        if self.status.allowed_targets().contains(&target) {
            Ok(())
        } else {
            Err(EngineError::InvalidStatusTransition {
                reservation_id: self.id,
                from: self.status,
                to: target,
            })
        }
    }

    pub fn approve(&mut self, by: Ulid, now: Ms) -> Result<DomainEvent, EngineError> {
        self.guard(ReservationStatus::Confirmed)?;
        self.status = ReservationStatus::Confirmed;
        self.approved = Some(Approval { by, at: now });
        Ok(DomainEvent::ReservationConfirmed {
            id: self.id,
            space_id: self.space_id,
            unit_id: self.unit_id,
            span: self.span,
        })
    }

    pub fn reject(
        &mut self,
        by: Ulid,
        reason: Option<String>,
        now: Ms,
    ) -> Result<DomainEvent, EngineError> {
        self.guard(ReservationStatus::Rejected)?;
        self.status = ReservationStatus::Rejected;
        self.rejected = Some(Rejection { by, at: now, reason: reason.clone() });
        Ok(DomainEvent::ReservationRejected {
            id: self.id,
            space_id: self.space_id,
            rejected_by: by,
            reason,
        })
    }

    pub fn cancel(
        &mut self,
        by: Ulid,
        reason: Option<String>,
        late: bool,
        now: Ms,
    ) -> Result<DomainEvent, EngineError> {
        self.guard(ReservationStatus::Canceled)?;
        self.status = ReservationStatus::Canceled;
        self.canceled = Some(Cancellation { by, at: now, reason: reason.clone(), late });
        Ok(DomainEvent::ReservationCanceled {
            id: self.id,
            space_id: self.space_id,
            canceled_by: by,
            is_late_cancellation: late,
            reason,
        })
    }

    pub fn check_in(&mut self, now: Ms) -> Result<DomainEvent, EngineError> {
        self.guard(ReservationStatus::InProgress)?;
        self.status = ReservationStatus::InProgress;
        self.checked_in_at = Some(now);
        Ok(DomainEvent::ReservationCheckedIn { id: self.id, space_id: self.space_id })
    }

    pub fn complete(&mut self, now: Ms) -> Result<DomainEvent, EngineError> {
        self.guard(ReservationStatus::Completed)?;
        self.status = ReservationStatus::Completed;
        self.completed_at = Some(now);
        Ok(DomainEvent::ReservationCompleted { id: self.id, space_id: self.space_id })
    }

    pub fn mark_no_show(&mut self, now: Ms) -> Result<DomainEvent, EngineError> {
        self.guard(ReservationStatus::NoShow)?;
        self.status = ReservationStatus::NoShow;
        self.no_show_at = Some(now);
        Ok(DomainEvent::ReservationNoShow {
            id: self.id,
            space_id: self.space_id,
            unit_id: self.unit_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const H: Ms = MS_PER_HOUR;

    fn fresh(status: ReservationStatus) -> Reservation {
        let req = ReservationRequest {
            space_id: Ulid::new(),
            unit_id: Ulid::new(),
            resident_id: Ulid::new(),
            start: 10 * H,
            end: 12 * H,
            expected_guests: 4,
            title: Some("birthday".into()),
            notes: None,
        };
        let mut r = Reservation::new(
            Ulid::new(),
            &req,
            Span::new(req.start, req.end),
            ReservationStatus::PendingApproval,
            0,
        );
        r.status = status;
        r
    }

    /// Apply the transition that targets `to`, so every table entry can be
    /// driven from one loop.
    fn attempt(r: &mut Reservation, to: ReservationStatus) -> Result<DomainEvent, EngineError> {
        let actor = Ulid::new();
        match to {
            ReservationStatus::Confirmed => r.approve(actor, 1),
            ReservationStatus::Rejected => r.reject(actor, None, 1),
            ReservationStatus::Canceled => r.cancel(actor, None, false, 1),
            ReservationStatus::InProgress => r.check_in(1),
            ReservationStatus::Completed => r.complete(1),
            ReservationStatus::NoShow => r.mark_no_show(1),
            ReservationStatus::PendingApproval => unreachable!("nothing targets PendingApproval"),
        }
    }

    const ALL: [ReservationStatus; 7] = [
        ReservationStatus::PendingApproval,
        ReservationStatus::Confirmed,
        ReservationStatus::Rejected,
        ReservationStatus::Canceled,
        ReservationStatus::InProgress,
        ReservationStatus::Completed,
        ReservationStatus::NoShow,
    ];

    #[test]
    fn transition_table_is_closed() {
        for from in ALL {
            for to in ALL {
                if to == ReservationStatus::PendingApproval {
                    continue; // creation-only state
                }
                let mut r = fresh(from);
                let before = r.clone();
                let result = attempt(&mut r, to);
                if from.allowed_targets().contains(&to) {
                    result.unwrap();
                    assert_eq!(r.status, to);
                } else {
                    assert!(matches!(
                        result,
                        Err(EngineError::InvalidStatusTransition { .. })
                    ));
                    // Failed transitions leave the aggregate untouched.
                    assert_eq!(r, before);
                }
            }
        }
    }

    #[test]
    fn terminal_states_have_no_exits() {
        for status in [
            ReservationStatus::Rejected,
            ReservationStatus::Canceled,
            ReservationStatus::Completed,
            ReservationStatus::NoShow,
        ] {
            assert!(status.is_terminal());
            assert!(!status.blocks_slot());
        }
        assert!(!ReservationStatus::PendingApproval.is_terminal());
        assert!(ReservationStatus::PendingApproval.blocks_slot());
        assert!(ReservationStatus::InProgress.blocks_slot());
    }

    #[test]
    fn approve_stamps_audit_trail() {
        let mut r = fresh(ReservationStatus::PendingApproval);
        let admin = Ulid::new();
        let event = r.approve(admin, 42).unwrap();
        assert_eq!(r.status, ReservationStatus::Confirmed);
        assert_eq!(r.approved, Some(Approval { by: admin, at: 42 }));
        assert!(r.rejected.is_none() && r.canceled.is_none());
        assert!(matches!(event, DomainEvent::ReservationConfirmed { id, .. } if id == r.id));
    }

    #[test]
    fn cancel_records_late_flag_and_reason() {
        let mut r = fresh(ReservationStatus::Confirmed);
        let resident = Ulid::new();
        let event = r.cancel(resident, Some("sick".into()), true, 7).unwrap();
        let record = r.canceled.clone().unwrap();
        assert!(record.late);
        assert_eq!(record.reason.as_deref(), Some("sick"));
        assert!(matches!(
            event,
            DomainEvent::ReservationCanceled { is_late_cancellation: true, .. }
        ));
    }

    #[test]
    fn lifecycle_stamps_progress_fields() {
        let mut r = fresh(ReservationStatus::Confirmed);
        r.check_in(5).unwrap();
        assert_eq!(r.checked_in_at, Some(5));
        r.complete(9).unwrap();
        assert_eq!(r.completed_at, Some(9));
        assert!(r.no_show_at.is_none());
    }

    #[test]
    fn late_cancellation_threshold() {
        // Deadline 24h: starting in 10h is late, in 48h is not.
        assert!(is_late_cancellation(10 * H, 0, 24));
        assert!(!is_late_cancellation(48 * H, 0, 24));
        // Exactly at the deadline is still timely (strict less-than).
        assert!(!is_late_cancellation(24 * H, 0, 24));
        assert!(is_late_cancellation(24 * H - 1, 0, 24));
        // Zero deadline never classifies as late.
        assert!(!is_late_cancellation(1, 0, 0));
    }
}
