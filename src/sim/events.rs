//! Simulation events and observers
//!
//! A tick collects its events into a list; the orchestration loop hands that
//! list to every registered observer once the physics for the tick is done.
//! Observers are isolated from each other: an error or panic in one is logged
//! and the rest still run.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};

use serde::Serialize;
use thiserror::Error;

use super::body::BodyId;
use super::knockback::RecoilReport;

/// Something that happened during a tick
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SimEvent {
    /// Two bodies overlapped
    Collision { a: BodyId, b: BodyId },
    /// A knockback exchange resolved
    Recoil(RecoilReport),
    /// Terminal: an agent touched an obstacle
    AgentHitObstacle {
        loser: BodyId,
        obstacle: BodyId,
        winner: Option<BodyId>,
    },
    /// Terminal: an agent left the arena
    AgentOutOfBounds {
        loser: BodyId,
        winner: Option<BodyId>,
    },
    BoostStarted { agent: BodyId, until_tick: u64 },
    BoostExpired { agent: BodyId },
    /// A round began with a fresh obstacle layout
    RoundStarted { round: u32, obstacles: usize },
}

impl SimEvent {
    /// Does this event concern the given body?
    pub fn involves(&self, id: BodyId) -> bool {
        match *self {
            SimEvent::Collision { a, b } => a == id || b == id,
            SimEvent::Recoil(report) => report.agent_a == id || report.agent_b == id,
            SimEvent::AgentHitObstacle {
                loser,
                obstacle,
                winner,
            } => loser == id || obstacle == id || winner == Some(id),
            SimEvent::AgentOutOfBounds { loser, winner } => loser == id || winner == Some(id),
            SimEvent::BoostStarted { agent, .. } | SimEvent::BoostExpired { agent } => agent == id,
            SimEvent::RoundStarted { .. } => false,
        }
    }

    /// True for events that end the round
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SimEvent::AgentHitObstacle { .. } | SimEvent::AgentOutOfBounds { .. }
        )
    }
}

/// Failure reported by an observer
#[derive(Debug, Clone, Error)]
#[error("observer failed: {0}")]
pub struct ObserverError(pub String);

/// Receives simulation events
pub trait Observer {
    fn on_event(&mut self, event: &SimEvent) -> Result<(), ObserverError>;
}

impl<F> Observer for F
where
    F: FnMut(&SimEvent) -> Result<(), ObserverError>,
{
    fn on_event(&mut self, event: &SimEvent) -> Result<(), ObserverError> {
        self(event)
    }
}

/// Registered observers: global ones see every event, body observers only
/// see events involving their body
#[derive(Default)]
pub struct Observers {
    global: Vec<Box<dyn Observer>>,
    per_body: Vec<(BodyId, Box<dyn Observer>)>,
}

impl fmt::Debug for Observers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers")
            .field("global", &self.global.len())
            .field("per_body", &self.per_body.len())
            .finish()
    }
}

impl Observers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, observer: impl Observer + 'static) {
        self.global.push(Box::new(observer));
    }

    pub fn subscribe_body(&mut self, id: BodyId, observer: impl Observer + 'static) {
        self.per_body.push((id, Box::new(observer)));
    }

    /// Drop observers attached to bodies that no longer exist
    pub fn retain_bodies(&mut self, alive: impl Fn(BodyId) -> bool) {
        self.per_body.retain(|(id, _)| alive(*id));
    }

    pub fn len(&self) -> usize {
        self.global.len() + self.per_body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver events in order; returns the number of observer faults
    pub fn dispatch(&mut self, events: &[SimEvent]) -> usize {
        let mut faults = 0;
        for event in events {
            for observer in self.global.iter_mut() {
                if !notify(observer.as_mut(), event) {
                    faults += 1;
                }
            }
            for (id, observer) in self.per_body.iter_mut() {
                if event.involves(*id) && !notify(observer.as_mut(), event) {
                    faults += 1;
                }
            }
        }
        faults
    }
}

/// Run one observer, containing errors and panics
fn notify(observer: &mut dyn Observer, event: &SimEvent) -> bool {
    match catch_unwind(AssertUnwindSafe(|| observer.on_event(event))) {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            log::warn!("Observer error on {:?}: {}", event, e);
            false
        }
        Err(_) => {
            log::warn!("Observer panicked on {:?}", event);
            false
        }
    }
}
