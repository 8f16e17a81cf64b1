//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only (one tick per frame)
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering or platform dependencies

pub mod body;
pub mod collision;
pub mod events;
pub mod knockback;
pub mod placement;
pub mod schedule;
pub mod shape;
pub mod state;
pub mod tick;

pub use body::{AgentState, Body, BodyId, BodyKind, RegistrationError};
pub use collision::{bodies_collide, circles_overlap, sweep};
pub use events::{Observer, ObserverError, Observers, SimEvent};
pub use knockback::{Knockback, RecoilReport};
pub use placement::generate_obstacles;
pub use schedule::{Schedule, ScheduledAction, ScheduledEvent};
pub use shape::{Shape, ShapeKind};
pub use state::{AGENT_COUNT, GamePhase, RngState, SimState, Snapshot};
pub use tick::{AgentInput, BoostWindow, InputBuffer, Simulation, TickInput, tick};
