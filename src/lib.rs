//! Booking conflict-resolution and availability engine for shared
//! residential amenities (halls, pools, courts).
//!
//! Residents reserve spaces subject to weekly availability windows, ad-hoc
//! blocks and per-space capacity/timing constraints. The engine guarantees
//! that no two live reservations for the same space ever overlap, even
//! under concurrent requests: all admissions for one space are serialized
//! behind that space's write lock, while different spaces proceed in
//! parallel. Every successful mutation emits exactly one domain event for
//! downstream consumers (cache invalidation, governance, notifications).
//!
//! Persistence, transport, auth and penalty evaluation are the host's
//! concern; see [`engine::Governance`] and [`notify::EventHub`] for the
//! collaborator seams.

pub mod engine;
pub mod limits;
pub mod model;
pub mod notify;
pub mod observability;
pub mod reservation;
pub mod tenant;

pub use engine::{Engine, EngineError, Governance, NoGovernance};
pub use model::{
    Block, DomainEvent, HouseRule, Ms, OpenWindow, ReservationRequest, Slot, SpaceConfig,
    SpaceInfo, SpaceStatus, Span,
};
pub use notify::EventHub;
pub use reservation::{Reservation, ReservationStatus};
pub use tenant::TenantManager;
