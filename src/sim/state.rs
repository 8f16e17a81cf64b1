//! Simulation state
//!
//! `SimState` exclusively owns the simulation set (agents + obstacles). The
//! collision and knockback passes borrow bodies from it but never add or
//! remove any.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::body::{Body, BodyId, RegistrationError};
use super::placement::{Keepout, generate_obstacles};
use super::schedule::Schedule;
use crate::config::{Rect, SimConfig, inset_region};

/// Current phase of play
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Waiting for the first start
    Title,
    /// Active round
    Playing,
    /// Round ended; `winner` is set (or `None` if nobody was left)
    GameOver,
}

/// Number of agents in a match
pub const AGENT_COUNT: usize = 2;

/// RNG seeding for obstacle layouts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RngState {
    pub seed: u64,
}

impl RngState {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Fresh generator for a round (layouts differ between rounds)
    pub fn for_round(&self, round: u32) -> Pcg32 {
        Pcg32::seed_from_u64(
            (round as u64)
                .wrapping_mul(2654435761)
                .wrapping_add(self.seed),
        )
    }
}

/// Complete simulation state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimState {
    pub config: SimConfig,
    pub rng_state: RngState,
    /// Round counter (incremented by every reset)
    pub round: u32,
    /// Simulation tick counter
    pub time_ticks: u64,
    pub phase: GamePhase,
    pub winner: Option<BodyId>,
    /// Simulation set (sorted by id)
    pub bodies: Vec<Body>,
    /// Pending timed effects
    pub schedule: Schedule,
    region_assigned: bool,
    next_id: u32,
}

impl SimState {
    /// Empty simulation set (no agents, no obstacles)
    pub fn empty(config: SimConfig, seed: u64) -> Self {
        Self {
            config,
            rng_state: RngState::new(seed),
            round: 0,
            time_ticks: 0,
            phase: GamePhase::Title,
            winner: None,
            bodies: Vec::new(),
            schedule: Schedule::new(),
            region_assigned: false,
            next_id: 1,
        }
    }

    /// Two agents at their spawn points, waiting on the title screen
    pub fn new(config: SimConfig, seed: u64) -> Self {
        let mut state = Self::empty(config, seed);
        for slot in 0..AGENT_COUNT {
            let agent = Body::agent(
                state.spawn_position(slot),
                state.config.agent.radius,
                state.config.agent.base_speed,
            );
            if let Err(e) = state.register(agent) {
                log::warn!("Agent {} not spawned: {}", slot, e);
            }
        }
        state
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> BodyId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Add a body to the simulation set
    ///
    /// Bodies without a finite position or a positive radius are rejected
    /// with a diagnostic and never reach the collision pass.
    pub fn register(&mut self, mut body: Body) -> Result<BodyId, RegistrationError> {
        if let Err(e) = body.validate() {
            log::warn!("Rejected body registration: {}", e);
            return Err(e);
        }
        body.id = self.next_entity_id();
        body.collision_count = 0.0;
        let id = body.id;
        self.bodies.push(body);
        Ok(id)
    }

    pub fn remove(&mut self, id: BodyId) -> Option<Body> {
        let index = self.bodies.iter().position(|b| b.id == id)?;
        Some(self.bodies.remove(index))
    }

    pub fn body(&self, id: BodyId) -> Option<&Body> {
        self.bodies.iter().find(|b| b.id == id)
    }

    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut Body> {
        self.bodies.iter_mut().find(|b| b.id == id)
    }

    pub fn agents(&self) -> impl Iterator<Item = &Body> {
        self.bodies.iter().filter(|b| b.is_agent())
    }

    pub fn obstacles(&self) -> impl Iterator<Item = &Body> {
        self.bodies.iter().filter(|b| b.is_obstacle())
    }

    /// Agent ids in set order (slot 0 first)
    pub fn agent_ids(&self) -> Vec<BodyId> {
        self.agents().map(|b| b.id).collect()
    }

    pub fn obstacle_count(&self) -> usize {
        self.obstacles().count()
    }

    /// The first agent other than `id`, if any
    pub fn other_agent(&self, id: BodyId) -> Option<BodyId> {
        self.agents().map(|b| b.id).find(|&other| other != id)
    }

    pub fn arena(&self) -> Rect {
        self.config.arena.bounds
    }

    /// Spawn point for an agent slot: thirds across, vertically centered
    pub fn spawn_position(&self, slot: usize) -> Vec2 {
        let arena = self.arena();
        Vec2::new(
            arena.x + arena.width / 3.0 * (slot as f32 + 1.0),
            arena.y + arena.height / 2.0,
        )
    }

    /// Assign the playable region from a viewport rectangle
    ///
    /// The region is inset by the border buffers. The first valid assignment
    /// places the agents and runs the initial generation pass; later ones only
    /// move the bounds.
    pub fn assign_region(&mut self, x: f32, y: f32, width: f32, height: f32) {
        let bounds = inset_region(x, y, width, height);
        if !bounds.is_valid() {
            log::warn!("Ignoring degenerate region {}x{}", width, height);
            return;
        }
        self.config.arena.bounds = bounds;

        if !self.region_assigned {
            self.region_assigned = true;
            self.place_agents_at_spawn();
            self.generate_obstacles();
        }
    }

    fn place_agents_at_spawn(&mut self) {
        let spawns: Vec<Vec2> = (0..AGENT_COUNT).map(|i| self.spawn_position(i)).collect();
        for (body, spawn) in self.bodies.iter_mut().filter(|b| b.is_agent()).zip(spawns) {
            body.pos = spawn;
        }
    }

    /// Drop every obstacle; agents stay
    pub fn clear_obstacles(&mut self) {
        self.bodies.retain(|b| b.is_agent());
    }

    /// Run one placement pass for the current round; returns obstacles placed
    pub fn generate_obstacles(&mut self) -> usize {
        let keepouts: Vec<Keepout> = self.agents().map(Keepout::from).collect();
        let mut rng = self.rng_state.for_round(self.round);
        let arena = self.arena();
        let obstacles = generate_obstacles(&mut rng, &arena, &keepouts, &self.config.placement);

        let mut placed = 0;
        for obstacle in obstacles {
            if self.register(obstacle).is_ok() {
                placed += 1;
            }
        }
        log::info!(
            "Round {}: placed {} of {} obstacles",
            self.round,
            placed,
            self.config.placement.obstacle_budget
        );
        placed
    }

    /// Reset phase of a restart: clear obstacles and agent state
    ///
    /// Agents return to their spawn points with no velocity, no collision
    /// history, base speed and an empty recoil accumulator. Facing is kept.
    pub fn reset_round(&mut self) {
        self.clear_obstacles();
        self.round += 1;

        let spawns: Vec<Vec2> = (0..AGENT_COUNT).map(|i| self.spawn_position(i)).collect();
        let mut slots = spawns.into_iter();
        for body in self.bodies.iter_mut() {
            if let Some(spawn) = slots.next() {
                body.pos = spawn;
            }
            body.vel = Vec2::ZERO;
            body.collision_count = 0.0;
            if let Some(agent) = body.agent_state_mut() {
                agent.speed = agent.base_speed;
                agent.recoil_accumulator = 0.0;
                agent.input = Vec2::ZERO;
            }
        }

        self.winner = None;
        self.phase = GamePhase::Playing;
    }

    /// Leave the title screen, keeping the layout from region assignment
    ///
    /// Without a layout yet this is a full restart. Returns the obstacle count
    /// of the round, or `None` outside the title screen.
    pub fn begin(&mut self) -> Option<usize> {
        if self.phase != GamePhase::Title {
            return None;
        }
        if !self.region_assigned {
            return Some(self.restart());
        }
        self.phase = GamePhase::Playing;
        self.winner = None;
        Some(self.obstacle_count())
    }

    /// Start a fresh round: reset, then regenerate obstacles
    pub fn restart(&mut self) -> usize {
        self.reset_round();
        self.region_assigned = true;
        self.generate_obstacles()
    }

    /// Ensure bodies are sorted by ID for deterministic iteration
    pub fn normalize_order(&mut self) {
        self.bodies.sort_by_key(|b| b.id);
    }

    /// Read-only view for drawing and telemetry
    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            tick: self.time_ticks,
            round: self.round,
            phase: self.phase,
            winner: self.winner,
            arena: self.arena(),
            bodies: &self.bodies,
        }
    }
}

/// Serializable view of the current state
#[derive(Debug, Serialize)]
pub struct Snapshot<'a> {
    pub tick: u64,
    pub round: u32,
    pub phase: GamePhase,
    pub winner: Option<BodyId>,
    pub arena: Rect,
    pub bodies: &'a [Body],
}

impl Snapshot<'_> {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
