//! Simulated bodies: agents and obstacles
//!
//! Every body carries a bounding circle used for broad interactions, even when
//! its real footprint is a rectangle or polygon.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::shape::Shape;

/// Stable entity identifier (assigned on registration)
pub type BodyId = u32;

/// Why a body was refused entry into the simulation set
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum RegistrationError {
    #[error("position ({0}, {1}) is not finite")]
    NonFinitePosition(f32, f32),
    #[error("radius {0} must be finite and positive")]
    InvalidRadius(f32),
}

/// Agent-only state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    /// Reference speed, never modified after construction
    pub base_speed: f32,
    /// Current speed (base speed unless a boost is active)
    pub speed: f32,
    /// Unit shield heading; `None` when the agent has no shield
    pub facing: Option<Vec2>,
    /// Cumulative push taken this round; only grows until restart
    pub recoil_accumulator: f32,
    /// Latest movement sample (per axis in [-1, 1])
    #[serde(skip)]
    pub input: Vec2,
}

impl AgentState {
    pub fn new(base_speed: f32) -> Self {
        Self {
            base_speed,
            speed: base_speed,
            facing: Some(Vec2::X),
            recoil_accumulator: 0.0,
            input: Vec2::ZERO,
        }
    }

    pub fn is_boosted(&self) -> bool {
        self.speed != self.base_speed
    }
}

/// Body discriminator with kind-specific data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BodyKind {
    Agent(AgentState),
    Obstacle { shape: Shape },
}

/// A body in the simulation set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub id: BodyId,
    pub pos: Vec2,
    pub radius: f32,
    /// Only agents ever have nonzero velocity
    pub vel: Vec2,
    /// Recent collision pressure, decays geometrically each tick
    pub collision_count: f32,
    pub kind: BodyKind,
}

impl Body {
    pub fn agent(pos: Vec2, radius: f32, base_speed: f32) -> Self {
        Self {
            id: 0,
            pos,
            radius,
            vel: Vec2::ZERO,
            collision_count: 0.0,
            kind: BodyKind::Agent(AgentState::new(base_speed)),
        }
    }

    pub fn obstacle(pos: Vec2, radius: f32, shape: Shape) -> Self {
        Self {
            id: 0,
            pos,
            radius,
            vel: Vec2::ZERO,
            collision_count: 0.0,
            kind: BodyKind::Obstacle { shape },
        }
    }

    /// Builder: replace the agent's facing (no-op for obstacles)
    pub fn with_facing(mut self, facing: Option<Vec2>) -> Self {
        if let BodyKind::Agent(agent) = &mut self.kind {
            agent.facing = facing.map(|f| f.normalize_or_zero()).filter(|f| *f != Vec2::ZERO);
        }
        self
    }

    /// Builder: set an initial velocity
    pub fn with_velocity(mut self, vel: Vec2) -> Self {
        self.vel = vel;
        self
    }

    /// Registration check: finite position and a finite, positive radius
    pub fn validate(&self) -> Result<(), RegistrationError> {
        if !self.pos.is_finite() {
            return Err(RegistrationError::NonFinitePosition(self.pos.x, self.pos.y));
        }
        if !self.radius.is_finite() || self.radius <= 0.0 {
            return Err(RegistrationError::InvalidRadius(self.radius));
        }
        Ok(())
    }

    #[inline]
    pub fn is_agent(&self) -> bool {
        matches!(self.kind, BodyKind::Agent(_))
    }

    #[inline]
    pub fn is_obstacle(&self) -> bool {
        matches!(self.kind, BodyKind::Obstacle { .. })
    }

    pub fn agent_state(&self) -> Option<&AgentState> {
        match &self.kind {
            BodyKind::Agent(agent) => Some(agent),
            BodyKind::Obstacle { .. } => None,
        }
    }

    pub fn agent_state_mut(&mut self) -> Option<&mut AgentState> {
        match &mut self.kind {
            BodyKind::Agent(agent) => Some(agent),
            BodyKind::Obstacle { .. } => None,
        }
    }

    pub fn shape(&self) -> Option<&Shape> {
        match &self.kind {
            BodyKind::Obstacle { shape } => Some(shape),
            BodyKind::Agent(_) => None,
        }
    }

    /// Shield heading, if this is an agent with one
    pub fn facing(&self) -> Option<Vec2> {
        self.agent_state().and_then(|a| a.facing)
    }

    pub fn recoil_accumulator(&self) -> f32 {
        self.agent_state().map_or(0.0, |a| a.recoil_accumulator)
    }

    #[inline]
    pub fn speed(&self) -> f32 {
        self.vel.length()
    }

    /// Move an agent by its latest input sample and turn its shield
    ///
    /// The shield only turns when the input clears the deadzone, so a resting
    /// agent keeps its last heading.
    pub fn steer(&mut self, deadzone: f32) {
        let BodyKind::Agent(agent) = &mut self.kind else {
            return;
        };
        let input = agent
            .input
            .clamp(Vec2::splat(-1.0), Vec2::ONE)
            .clamp_length_max(1.0);
        self.pos += input * agent.speed;

        let magnitude = input.length();
        if magnitude > deadzone {
            agent.facing = Some(input / magnitude);
        }
    }
}
