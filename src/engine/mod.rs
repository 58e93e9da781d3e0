mod admission;
mod availability;
mod error;
mod mutations;
mod queries;

pub use availability::{cut_slots, merge_overlapping, subtract_intervals};
pub use error::EngineError;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};
use ulid::Ulid;

use crate::limits::LOCK_TIMEOUT_MS;
use crate::model::SpaceState;
use crate::notify::EventHub;

pub type SharedSpaceState = Arc<RwLock<SpaceState>>;

/// Governance collaborator: asked whether a unit is barred from booking.
/// Queried before any admission lock is taken.
#[async_trait]
pub trait Governance: Send + Sync {
    async fn has_active_block(&self, unit_id: Ulid) -> bool;
}

/// Governance that never blocks anyone, for hosts without a penalty
/// subsystem.
pub struct NoGovernance;

#[async_trait]
impl Governance for NoGovernance {
    async fn has_active_block(&self, _unit_id: Ulid) -> bool {
        false
    }
}

/// The per-community booking engine. One write lock per space serializes
/// admissions and lifecycle transitions for that space; different spaces
/// proceed fully in parallel.
pub struct Engine {
    pub(crate) state: DashMap<Ulid, SharedSpaceState>,
    pub events: Arc<EventHub>,
    pub(crate) governance: Arc<dyn Governance>,
    /// Reverse lookup: window/block/reservation id → space id.
    pub(crate) entity_to_space: DashMap<Ulid, Ulid>,
}

impl Engine {
    pub fn new(events: Arc<EventHub>, governance: Arc<dyn Governance>) -> Self {
        Self {
            state: DashMap::new(),
            events,
            governance,
            entity_to_space: DashMap::new(),
        }
    }

    pub fn get_space(&self, id: &Ulid) -> Option<SharedSpaceState> {
        self.state.get(id).map(|e| e.value().clone())
    }

    pub fn space_for_entity(&self, entity_id: &Ulid) -> Option<Ulid> {
        self.entity_to_space.get(entity_id).map(|e| *e.value())
    }

    /// Space write lock with a bounded wait. On timeout the operation fails
    /// with the retryable `LockTimeout` instead of queueing indefinitely.
    pub(crate) async fn lock_space_write(
        &self,
        space_id: Ulid,
        rs: &SharedSpaceState,
    ) -> Result<OwnedRwLockWriteGuard<SpaceState>, EngineError> {
        tokio::time::timeout(
            Duration::from_millis(LOCK_TIMEOUT_MS),
            rs.clone().write_owned(),
        )
        .await
        .map_err(|_| EngineError::LockTimeout { space_id })
    }

    /// Read-lock counterpart, same bounded wait: a reader stuck behind a
    /// long-held write lock surfaces `LockTimeout` rather than queueing.
    pub(crate) async fn lock_space_read(
        &self,
        space_id: Ulid,
        rs: &SharedSpaceState,
    ) -> Result<OwnedRwLockReadGuard<SpaceState>, EngineError> {
        tokio::time::timeout(
            Duration::from_millis(LOCK_TIMEOUT_MS),
            rs.clone().read_owned(),
        )
        .await
        .map_err(|_| EngineError::LockTimeout { space_id })
    }

    /// Lookup entity → space, get space, acquire its write lock.
    pub(crate) async fn resolve_entity_write(
        &self,
        entity_id: &Ulid,
    ) -> Result<(Ulid, OwnedRwLockWriteGuard<SpaceState>), EngineError> {
        let space_id = self
            .space_for_entity(entity_id)
            .ok_or(EngineError::NotFound(*entity_id))?;
        let rs = self
            .get_space(&space_id)
            .ok_or(EngineError::NotFound(space_id))?;
        let guard = self.lock_space_write(space_id, &rs).await?;
        Ok((space_id, guard))
    }
}
