use std::sync::Arc;

use chrono::{NaiveTime, Weekday};
use tokio::sync::RwLock;
use tracing::info;
use ulid::Ulid;

use crate::limits::*;
use crate::model::{
    Block, DomainEvent, HouseRule, Ms, OpenWindow, SpaceConfig, SpaceState, SpaceStatus,
    time_to_ms,
};
use crate::observability::TRANSITIONS_TOTAL;
use crate::reservation::is_late_cancellation;

use super::admission::{now_ms, validate_range};
use super::{Engine, EngineError};

fn validate_config(config: &SpaceConfig) -> Result<(), EngineError> {
    if config.name.len() > MAX_NAME_LEN {
        return Err(EngineError::LimitExceeded("space name too long"));
    }
    if config.capacity == 0 {
        return Err(EngineError::LimitExceeded("capacity must be positive"));
    }
    Ok(())
}

impl Engine {
    // ── Space administration ─────────────────────────────

    pub async fn create_space(&self, id: Ulid, config: SpaceConfig) -> Result<(), EngineError> {
        if self.state.len() >= MAX_SPACES_PER_TENANT {
            return Err(EngineError::LimitExceeded("too many spaces"));
        }
        validate_config(&config)?;
        if self.state.contains_key(&id) {
            return Err(EngineError::AlreadyExists(id));
        }

        let name = config.name.clone();
        let state = SpaceState::new(id, config, now_ms());
        self.state.insert(id, Arc::new(RwLock::new(state)));
        self.events.publish(&DomainEvent::SpaceCreated { space_id: id, name });
        Ok(())
    }

    /// Reconfigure a space. Existing reservations are not revalidated
    /// against the new limits.
    pub async fn update_space(&self, id: Ulid, config: SpaceConfig) -> Result<(), EngineError> {
        validate_config(&config)?;
        let rs = self.get_space(&id).ok_or(EngineError::NotFound(id))?;
        let mut guard = self.lock_space_write(id, &rs).await?;
        guard.config = config;
        self.events.publish(&DomainEvent::SpaceUpdated { space_id: id });
        Ok(())
    }

    pub async fn set_space_status(
        &self,
        id: Ulid,
        status: SpaceStatus,
    ) -> Result<(), EngineError> {
        let rs = self.get_space(&id).ok_or(EngineError::NotFound(id))?;
        let mut guard = self.lock_space_write(id, &rs).await?;
        guard.status = status;
        info!(space = %id, status = ?status, "space status changed");
        self.events.publish(&DomainEvent::SpaceUpdated { space_id: id });
        Ok(())
    }

    // ── Weekly windows ───────────────────────────────────

    pub async fn add_window(
        &self,
        id: Ulid,
        space_id: Ulid,
        weekday: Weekday,
        start: NaiveTime,
        end: NaiveTime,
    ) -> Result<(), EngineError> {
        if start >= end {
            return Err(EngineError::InvalidDateRange {
                start: time_to_ms(start),
                end: time_to_ms(end),
            });
        }
        let rs = self.get_space(&space_id).ok_or(EngineError::NotFound(space_id))?;
        let mut guard = self.lock_space_write(space_id, &rs).await?;
        if guard.windows.len() >= MAX_WINDOWS_PER_SPACE {
            return Err(EngineError::LimitExceeded("too many windows on space"));
        }
        if self.entity_to_space.contains_key(&id) {
            return Err(EngineError::AlreadyExists(id));
        }

        let window = OpenWindow { id, weekday, start, end };
        if guard.windows.iter().any(|w| w.overlaps(&window)) {
            return Err(EngineError::WindowOverlap { space_id, weekday });
        }

        guard.windows.push(window);
        self.entity_to_space.insert(id, space_id);
        self.events
            .publish(&DomainEvent::WindowAdded { id, space_id, weekday, start, end });
        Ok(())
    }

    pub async fn remove_window(&self, id: Ulid) -> Result<Ulid, EngineError> {
        let (space_id, mut guard) = self.resolve_entity_write(&id).await?;
        guard.remove_window(id).ok_or(EngineError::NotFound(id))?;
        self.entity_to_space.remove(&id);
        self.events.publish(&DomainEvent::WindowRemoved { id, space_id });
        Ok(space_id)
    }

    // ── Blocks ───────────────────────────────────────────

    pub async fn add_block(
        &self,
        id: Ulid,
        space_id: Ulid,
        start: Ms,
        end: Ms,
        reason: String,
        created_by: Ulid,
        notes: Option<String>,
    ) -> Result<(), EngineError> {
        let span = validate_range(start, end)?;
        if reason.len() > MAX_REASON_LEN {
            return Err(EngineError::LimitExceeded("block reason too long"));
        }
        let rs = self.get_space(&space_id).ok_or(EngineError::NotFound(space_id))?;
        let mut guard = self.lock_space_write(space_id, &rs).await?;
        if guard.blocks.len() >= MAX_BLOCKS_PER_SPACE {
            return Err(EngineError::LimitExceeded("too many blocks on space"));
        }
        if self.entity_to_space.contains_key(&id) {
            return Err(EngineError::AlreadyExists(id));
        }

        // A block closes the interval for future admissions; reservations
        // already holding it are left to the manager to cancel.
        guard.insert_block(Block {
            id,
            span,
            reason: reason.clone(),
            created_by,
            notes,
        });
        self.entity_to_space.insert(id, space_id);
        self.events.publish(&DomainEvent::BlockAdded { id, space_id, span, reason });
        Ok(())
    }

    pub async fn remove_block(&self, id: Ulid) -> Result<Ulid, EngineError> {
        let (space_id, mut guard) = self.resolve_entity_write(&id).await?;
        guard.remove_block(id).ok_or(EngineError::NotFound(id))?;
        self.entity_to_space.remove(&id);
        self.events.publish(&DomainEvent::BlockRemoved { id, space_id });
        Ok(space_id)
    }

    // ── House rules ──────────────────────────────────────

    /// Upsert an informational rule by key.
    pub async fn set_house_rule(
        &self,
        space_id: Ulid,
        key: String,
        value: String,
    ) -> Result<(), EngineError> {
        if key.is_empty() || key.len() > MAX_RULE_KEY_LEN {
            return Err(EngineError::LimitExceeded("rule key length"));
        }
        if value.len() > MAX_RULE_VALUE_LEN {
            return Err(EngineError::LimitExceeded("rule value too long"));
        }
        let rs = self.get_space(&space_id).ok_or(EngineError::NotFound(space_id))?;
        let mut guard = self.lock_space_write(space_id, &rs).await?;
        if let Some(rule) = guard.rules.iter_mut().find(|r| r.key == key) {
            rule.value = value;
        } else {
            if guard.rules.len() >= MAX_RULES_PER_SPACE {
                return Err(EngineError::LimitExceeded("too many rules on space"));
            }
            guard.rules.push(HouseRule { key, value });
        }
        Ok(())
    }

    /// Returns whether the rule existed.
    pub async fn remove_house_rule(
        &self,
        space_id: Ulid,
        key: &str,
    ) -> Result<bool, EngineError> {
        let rs = self.get_space(&space_id).ok_or(EngineError::NotFound(space_id))?;
        let mut guard = self.lock_space_write(space_id, &rs).await?;
        let before = guard.rules.len();
        guard.rules.retain(|r| r.key != key);
        Ok(guard.rules.len() < before)
    }

    // ── Reservation lifecycle ────────────────────────────

    pub async fn approve(
        &self,
        reservation_id: Ulid,
        approved_by: Ulid,
    ) -> Result<(), EngineError> {
        let (space_id, mut guard) = self.resolve_entity_write(&reservation_id).await?;
        let res = guard
            .reservation_mut(&reservation_id)
            .ok_or(EngineError::NotFound(reservation_id))?;
        let event = res.approve(approved_by, now_ms())?;
        metrics::counter!(TRANSITIONS_TOTAL, "transition" => "approve").increment(1);
        info!(reservation = %reservation_id, space = %space_id, "reservation approved");
        self.events.publish(&event);
        Ok(())
    }

    pub async fn reject(
        &self,
        reservation_id: Ulid,
        rejected_by: Ulid,
        reason: Option<String>,
    ) -> Result<(), EngineError> {
        let (space_id, mut guard) = self.resolve_entity_write(&reservation_id).await?;
        let res = guard
            .reservation_mut(&reservation_id)
            .ok_or(EngineError::NotFound(reservation_id))?;
        let event = res.reject(rejected_by, reason, now_ms())?;
        metrics::counter!(TRANSITIONS_TOTAL, "transition" => "reject").increment(1);
        info!(reservation = %reservation_id, space = %space_id, "reservation rejected");
        self.events.publish(&event);
        Ok(())
    }

    /// Cancel a reservation, classifying the cancellation against the
    /// space's notice deadline. The late flag travels on the emitted event
    /// for the governance collaborator; no penalty is applied here.
    pub async fn cancel(
        &self,
        reservation_id: Ulid,
        canceled_by: Ulid,
        reason: Option<String>,
    ) -> Result<(), EngineError> {
        let (space_id, mut guard) = self.resolve_entity_write(&reservation_id).await?;
        let deadline_hours = guard.config.cancellation_deadline_hours;
        let now = now_ms();
        let res = guard
            .reservation_mut(&reservation_id)
            .ok_or(EngineError::NotFound(reservation_id))?;
        let late = is_late_cancellation(res.span.start, now, deadline_hours);
        let event = res.cancel(canceled_by, reason, late, now)?;
        metrics::counter!(TRANSITIONS_TOTAL, "transition" => "cancel").increment(1);
        info!(reservation = %reservation_id, space = %space_id, late, "reservation canceled");
        self.events.publish(&event);
        Ok(())
    }

    pub async fn check_in(&self, reservation_id: Ulid) -> Result<(), EngineError> {
        let (space_id, mut guard) = self.resolve_entity_write(&reservation_id).await?;
        let res = guard
            .reservation_mut(&reservation_id)
            .ok_or(EngineError::NotFound(reservation_id))?;
        let event = res.check_in(now_ms())?;
        metrics::counter!(TRANSITIONS_TOTAL, "transition" => "check_in").increment(1);
        info!(reservation = %reservation_id, space = %space_id, "reservation checked in");
        self.events.publish(&event);
        Ok(())
    }

    pub async fn complete(&self, reservation_id: Ulid) -> Result<(), EngineError> {
        let (space_id, mut guard) = self.resolve_entity_write(&reservation_id).await?;
        let res = guard
            .reservation_mut(&reservation_id)
            .ok_or(EngineError::NotFound(reservation_id))?;
        let event = res.complete(now_ms())?;
        metrics::counter!(TRANSITIONS_TOTAL, "transition" => "complete").increment(1);
        info!(reservation = %reservation_id, space = %space_id, "reservation completed");
        self.events.publish(&event);
        Ok(())
    }

    pub async fn mark_no_show(&self, reservation_id: Ulid) -> Result<(), EngineError> {
        let (space_id, mut guard) = self.resolve_entity_write(&reservation_id).await?;
        let res = guard
            .reservation_mut(&reservation_id)
            .ok_or(EngineError::NotFound(reservation_id))?;
        let event = res.mark_no_show(now_ms())?;
        metrics::counter!(TRANSITIONS_TOTAL, "transition" => "no_show").increment(1);
        info!(reservation = %reservation_id, space = %space_id, "reservation marked no-show");
        self.events.publish(&event);
        Ok(())
    }
}
