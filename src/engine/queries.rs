use chrono::NaiveDate;
use ulid::Ulid;

use crate::model::{Block, HouseRule, OpenWindow, Slot, SpaceInfo, Span};
use crate::observability::SLOT_QUERIES_TOTAL;
use crate::reservation::Reservation;

use super::availability::cut_slots;
use super::{Engine, EngineError};

impl Engine {
    /// The finest-grained availability cut for a space on one date: weekly
    /// windows matching the weekday, minus blocks and live reservations.
    /// A day without windows (or an unknown space) yields an empty sequence.
    pub async fn slots_for(&self, space_id: Ulid, date: NaiveDate) -> Result<Vec<Slot>, EngineError> {
        metrics::counter!(SLOT_QUERIES_TOTAL).increment(1);
        let rs = match self.get_space(&space_id) {
            Some(rs) => rs,
            None => return Ok(vec![]),
        };
        let guard = rs.read().await;

        let mut windows: Vec<Span> = guard
            .windows
            .iter()
            .filter_map(|w| w.span_on(date))
            .collect();
        windows.sort_by_key(|s| s.start);

        let mut slots = Vec::new();
        for window in windows {
            let mut busy: Vec<Span> = guard
                .overlapping_blocks(&window)
                .map(|b| b.span)
                .collect();
            busy.extend(
                guard
                    .overlapping_reservations(&window)
                    .filter(|r| r.status.blocks_slot())
                    .map(|r| r.span),
            );
            busy.sort_by_key(|s| s.start);
            slots.extend(cut_slots(window, &busy));
        }
        Ok(slots)
    }

    pub async fn space_info(&self, space_id: Ulid) -> Option<SpaceInfo> {
        let rs = self.get_space(&space_id)?;
        let guard = rs.read().await;
        Some(SpaceInfo {
            id: guard.id,
            status: guard.status,
            config: guard.config.clone(),
            created_at: guard.created_at,
        })
    }

    pub async fn list_spaces(&self) -> Vec<SpaceInfo> {
        let shared: Vec<_> = self.state.iter().map(|e| e.value().clone()).collect();
        let mut out = Vec::with_capacity(shared.len());
        for rs in shared {
            let guard = rs.read().await;
            out.push(SpaceInfo {
                id: guard.id,
                status: guard.status,
                config: guard.config.clone(),
                created_at: guard.created_at,
            });
        }
        out
    }

    pub async fn get_windows(&self, space_id: Ulid) -> Vec<OpenWindow> {
        match self.get_space(&space_id) {
            Some(rs) => rs.read().await.windows.clone(),
            None => vec![],
        }
    }

    pub async fn get_blocks(&self, space_id: Ulid) -> Vec<Block> {
        match self.get_space(&space_id) {
            Some(rs) => rs.read().await.blocks.clone(),
            None => vec![],
        }
    }

    pub async fn get_house_rules(&self, space_id: Ulid) -> Vec<HouseRule> {
        match self.get_space(&space_id) {
            Some(rs) => rs.read().await.rules.clone(),
            None => vec![],
        }
    }

    /// Full reservation history of a space, terminal states included.
    pub async fn get_reservations(&self, space_id: Ulid) -> Vec<Reservation> {
        match self.get_space(&space_id) {
            Some(rs) => rs.read().await.reservations.clone(),
            None => vec![],
        }
    }

    pub async fn get_reservation(&self, id: Ulid) -> Option<Reservation> {
        let space_id = self.space_for_entity(&id)?;
        let rs = self.get_space(&space_id)?;
        let guard = rs.read().await;
        guard.reservation(&id).cloned()
    }
}
