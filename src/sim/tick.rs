//! Simulation tick
//!
//! One tick per rendered frame:
//! 1. expire due boosts, apply new boost windows
//! 2. move agents from their latest input
//! 3. sweep collisions, resolving knockback pair by pair
//! 4. integrate velocity, friction and collision-count decay
//! 5. check arena bounds
//! 6. fold recoil reports into the agents' accumulators

use glam::Vec2;

use super::body::BodyId;
use super::collision;
use super::events::{Observers, SimEvent};
use super::knockback::{self, RecoilReport};
use super::schedule::{ScheduledAction, ScheduledEvent};
use super::state::{AGENT_COUNT, GamePhase, SimState};
use crate::config::{AgentConfig, SimConfig};
use crate::round2;

/// A temporary speed multiplication window (cooldowns are managed upstream)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoostWindow {
    pub multiplier: f32,
    pub duration_ticks: u64,
}

impl BoostWindow {
    /// The configured default boost
    pub fn from_config(cfg: &AgentConfig) -> Self {
        Self {
            multiplier: cfg.boost_multiplier,
            duration_ticks: cfg.boost_duration_ticks,
        }
    }
}

/// Input for one agent slot
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AgentInput {
    /// Direction and magnitude, per axis in [-1, 1]
    pub direction: Vec2,
    /// Boost to start this tick
    pub boost: Option<BoostWindow>,
}

/// Input commands for a single tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Indexed by agent slot
    pub agents: [AgentInput; AGENT_COUNT],
    /// Start a new round from the title or game-over screen
    pub restart: bool,
}

/// Latest-sample input buffer
///
/// Input arrives between ticks. A newer direction overwrites an unconsumed
/// one; boost and restart triggers are one-shot and cleared once sampled.
#[derive(Debug, Clone, Default)]
pub struct InputBuffer {
    current: TickInput,
}

impl InputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_direction(&mut self, slot: usize, direction: Vec2) {
        if let Some(agent) = self.current.agents.get_mut(slot) {
            agent.direction = direction;
        }
    }

    pub fn trigger_boost(&mut self, slot: usize, window: BoostWindow) {
        if let Some(agent) = self.current.agents.get_mut(slot) {
            agent.boost = Some(window);
        }
    }

    pub fn request_restart(&mut self) {
        self.current.restart = true;
    }

    /// Input for the next tick; clears one-shot triggers
    pub fn sample(&mut self) -> TickInput {
        let input = self.current.clone();
        for agent in self.current.agents.iter_mut() {
            agent.boost = None;
        }
        self.current.restart = false;
        input
    }
}

/// Advance the simulation by one tick and return what happened
pub fn tick(state: &mut SimState, input: &TickInput) -> Vec<SimEvent> {
    let mut events = Vec::new();

    if input.restart {
        let started = match state.phase {
            GamePhase::Title => state.begin(),
            GamePhase::GameOver => Some(state.restart()),
            GamePhase::Playing => None,
        };
        if let Some(obstacles) = started {
            events.push(SimEvent::RoundStarted {
                round: state.round,
                obstacles,
            });
            return events;
        }
    }

    if state.phase != GamePhase::Playing {
        return events;
    }

    state.time_ticks += 1;
    let now = state.time_ticks;

    expire_boosts(state, now, &mut events);

    let agent_ids = state.agent_ids();
    for (slot, &id) in agent_ids.iter().enumerate() {
        let Some(agent_input) = input.agents.get(slot) else {
            break;
        };
        if let Some(window) = agent_input.boost {
            start_boost(state, id, window, now, &mut events);
        }
        if let Some(agent) = state.body_mut(id).and_then(|b| b.agent_state_mut()) {
            agent.input = agent_input.direction;
        }
    }

    let deadzone = state.config.agent.facing_deadzone;
    for body in state.bodies.iter_mut() {
        body.steer(deadzone);
    }

    let reports = resolve_contacts(state, &agent_ids, &mut events);

    knockback::integrate(&mut state.bodies, &state.config.knockback);

    check_bounds(state, &agent_ids, &mut events);

    for report in reports {
        accumulate_recoil(state, report.agent_a, report.push_a);
        accumulate_recoil(state, report.agent_b, report.push_b);
    }

    state.normalize_order();
    events
}

/// Collision sweep with knockback; terminal conditions end the round once
fn resolve_contacts(
    state: &mut SimState,
    agent_ids: &[BodyId],
    events: &mut Vec<SimEvent>,
) -> Vec<RecoilReport> {
    let cfg = state.config.knockback.clone();
    let mut reports = Vec::new();
    let mut hits: Vec<(BodyId, BodyId)> = Vec::new();

    collision::sweep(&mut state.bodies, |a, b| {
        a.collision_count += 1.0;
        b.collision_count += 1.0;
        events.push(SimEvent::Collision { a: a.id, b: b.id });

        match (a.is_agent(), b.is_agent()) {
            (true, false) => hits.push((a.id, b.id)),
            (false, true) => hits.push((b.id, a.id)),
            _ => {}
        }

        if let Some(report) = knockback::resolve(a, b, &cfg) {
            events.push(SimEvent::Recoil(report));
            reports.push(report);
        }
    });

    for (loser, obstacle) in hits {
        if let Some(winner) = end_round(state, loser, agent_ids) {
            log::info!("Agent {} hit obstacle {}", loser, obstacle);
            events.push(SimEvent::AgentHitObstacle {
                loser,
                obstacle,
                winner,
            });
        }
    }

    reports
}

/// Agents whose circle leaves the arena lose
fn check_bounds(state: &mut SimState, agent_ids: &[BodyId], events: &mut Vec<SimEvent>) {
    let arena = state.arena();
    let outside: Vec<BodyId> = state
        .agents()
        .filter(|b| !arena.contains_circle(b.pos, b.radius))
        .map(|b| b.id)
        .collect();

    for loser in outside {
        if let Some(winner) = end_round(state, loser, agent_ids) {
            log::info!("Agent {} left the arena", loser);
            events.push(SimEvent::AgentOutOfBounds { loser, winner });
        }
    }
}

/// Move to game over with `loser` beaten; only the first call per round counts
///
/// Returns `Some(winner)` if this call ended the round.
fn end_round(state: &mut SimState, loser: BodyId, agent_ids: &[BodyId]) -> Option<Option<BodyId>> {
    if state.phase != GamePhase::Playing {
        return None;
    }
    let winner = agent_ids.iter().copied().find(|&id| id != loser);
    state.phase = GamePhase::GameOver;
    state.winner = winner;
    Some(winner)
}

fn accumulate_recoil(state: &mut SimState, id: BodyId, push: f32) {
    if let Some(agent) = state.body_mut(id).and_then(|b| b.agent_state_mut()) {
        agent.recoil_accumulator += round2(push).max(0.0);
    }
}

/// Multiply an agent's speed and schedule the revert
fn start_boost(
    state: &mut SimState,
    id: BodyId,
    window: BoostWindow,
    now: u64,
    events: &mut Vec<SimEvent>,
) {
    if !window.multiplier.is_finite() || window.multiplier <= 0.0 {
        log::warn!("Ignoring boost with multiplier {}", window.multiplier);
        return;
    }
    let round = state.round;
    let Some(agent) = state.body_mut(id).and_then(|b| b.agent_state_mut()) else {
        return;
    };
    agent.speed = agent.base_speed * window.multiplier;

    let until_tick = now + window.duration_ticks;
    state.schedule.cancel_boost(id);
    state.schedule.push(ScheduledEvent {
        due_tick: until_tick,
        round,
        action: ScheduledAction::EndBoost { agent: id },
    });
    events.push(SimEvent::BoostStarted {
        agent: id,
        until_tick,
    });
}

/// Revert boosts that are due
///
/// Expiry always writes the base speed; an expiry scheduled before a restart
/// is a no-op since the reset already restored the speed.
fn expire_boosts(state: &mut SimState, now: u64, events: &mut Vec<SimEvent>) {
    for due in state.schedule.drain_due(now) {
        match due.action {
            ScheduledAction::EndBoost { agent: id } => {
                if due.round != state.round {
                    log::debug!("Dropping stale boost expiry for agent {}", id);
                    continue;
                }
                if let Some(agent) = state.body_mut(id).and_then(|b| b.agent_state_mut()) {
                    agent.speed = agent.base_speed;
                    events.push(SimEvent::BoostExpired { agent: id });
                }
            }
        }
    }
}

/// Simulation plus its observers and input buffer
///
/// This is the orchestration entry point: sample input, tick, then hand the
/// tick's events to observers.
#[derive(Debug)]
pub struct Simulation {
    pub state: SimState,
    pub observers: Observers,
    pub input: InputBuffer,
}

impl Simulation {
    pub fn new(config: SimConfig, seed: u64) -> Self {
        Self {
            state: SimState::new(config, seed),
            observers: Observers::new(),
            input: InputBuffer::new(),
        }
    }

    /// Run one tick with the buffered input and notify observers
    pub fn step(&mut self) -> Vec<SimEvent> {
        let input = self.input.sample();
        let events = tick(&mut self.state, &input);
        if events.iter().any(|e| matches!(e, SimEvent::RoundStarted { .. })) {
            self.drop_stale_observers();
        }
        self.dispatch(&events);
        events
    }

    /// Leave the title screen with the current layout
    pub fn begin(&mut self) -> Vec<SimEvent> {
        let Some(obstacles) = self.state.begin() else {
            return Vec::new();
        };
        let events = vec![SimEvent::RoundStarted {
            round: self.state.round,
            obstacles,
        }];
        self.dispatch(&events);
        events
    }

    /// Start a fresh round immediately (from any phase)
    pub fn restart(&mut self) -> Vec<SimEvent> {
        let obstacles = self.state.restart();
        self.drop_stale_observers();
        let events = vec![SimEvent::RoundStarted {
            round: self.state.round,
            obstacles,
        }];
        self.dispatch(&events);
        events
    }

    /// Queue the configured boost for an agent slot
    pub fn boost(&mut self, slot: usize) {
        let window = BoostWindow::from_config(&self.state.config.agent);
        self.input.trigger_boost(slot, window);
    }

    pub fn assign_region(&mut self, x: f32, y: f32, width: f32, height: f32) {
        self.state.assign_region(x, y, width, height);
    }

    fn drop_stale_observers(&mut self) {
        let state = &self.state;
        self.observers.retain_bodies(|id| state.body(id).is_some());
    }

    fn dispatch(&mut self, events: &[SimEvent]) {
        let faults = self.observers.dispatch(events);
        if faults > 0 {
            log::warn!("{} observer fault(s) on tick {}", faults, self.state.time_ticks);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Rect;
    use crate::sim::body::Body;
    use crate::sim::events::ObserverError;
    use crate::sim::shape::Shape;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Playing state with two agents and no obstacles
    fn open_arena() -> SimState {
        let mut state = SimState::new(SimConfig::default(), 12345);
        state.reset_round();
        state
    }

    fn ids(state: &SimState) -> (BodyId, BodyId) {
        let ids = state.agent_ids();
        (ids[0], ids[1])
    }

    #[test]
    fn test_title_does_not_tick() {
        let mut state = SimState::new(SimConfig::default(), 1);
        let events = tick(&mut state, &TickInput::default());
        assert!(events.is_empty());
        assert_eq!(state.time_ticks, 0);
    }

    #[test]
    fn test_restart_from_title() {
        let mut state = SimState::new(SimConfig::default(), 1);
        let input = TickInput {
            restart: true,
            ..Default::default()
        };
        let events = tick(&mut state, &input);
        assert_eq!(state.phase, GamePhase::Playing);
        assert!(matches!(events[0], SimEvent::RoundStarted { round: 1, .. }));
        assert!(state.obstacle_count() > 0);
    }

    #[test]
    fn test_begin_after_region_keeps_layout() {
        let mut sim = Simulation::new(SimConfig::default(), 21);
        sim.assign_region(0.0, 0.0, 1280.0, 720.0);
        let layout: Vec<_> = sim.state.obstacles().map(|o| o.id).collect();

        let events = sim.begin();
        assert_eq!(
            events,
            vec![SimEvent::RoundStarted {
                round: 0,
                obstacles: layout.len(),
            }]
        );
        let after: Vec<_> = sim.state.obstacles().map(|o| o.id).collect();
        assert_eq!(layout, after);
        assert!(sim.begin().is_empty());

        // A restart request from the title screen goes through the same path
        let mut state = SimState::new(SimConfig::default(), 21);
        state.assign_region(0.0, 0.0, 1280.0, 720.0);
        let before = state.obstacle_count();
        let input = TickInput {
            restart: true,
            ..Default::default()
        };
        tick(&mut state, &input);
        assert_eq!(state.phase, GamePhase::Playing);
        assert_eq!(state.round, 0);
        assert_eq!(state.obstacle_count(), before);
    }

    #[test]
    fn test_agents_move_from_input() {
        let mut state = open_arena();
        let (a, _) = ids(&state);
        let start = state.body(a).unwrap().pos;
        let mut input = TickInput::default();
        input.agents[0].direction = Vec2::new(1.0, 0.0);
        tick(&mut state, &input);
        let body = state.body(a).unwrap();
        assert!((body.pos.x - (start.x + body.agent_state().unwrap().base_speed)).abs() < 1e-4);
        assert_eq!(body.facing(), Some(Vec2::X));
    }

    #[test]
    fn test_stationary_agents_overlapping() {
        let mut state = open_arena();
        let (a, b) = ids(&state);
        for (id, x) in [(a, 400.0), (b, 430.0)] {
            let body = state.body_mut(id).unwrap();
            body.pos = Vec2::new(x, 240.0);
            body.agent_state_mut().unwrap().facing = None;
        }

        let events = tick(&mut state, &TickInput::default());

        let recoils: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                SimEvent::Recoil(r) => Some(*r),
                _ => None,
            })
            .collect();
        assert_eq!(recoils.len(), 1);
        let r = recoils[0];
        assert!(r.push_a > 0.0 && r.push_b > 0.0);
        assert!(r.push_a.is_finite() && r.push_b.is_finite());
        assert!((r.push_a - r.push_b).abs() < 1e-6);

        let pa = state.body(a).unwrap().pos;
        let pb = state.body(b).unwrap().pos;
        assert!((pb - pa).length() > 30.0);
        assert!((pa.y - 240.0).abs() < 1e-4 && (pb.y - 240.0).abs() < 1e-4);
        assert_eq!(state.phase, GamePhase::Playing);
    }

    #[test]
    fn test_recoil_accumulates_and_never_decreases() {
        let mut state = open_arena();
        let (a, b) = ids(&state);
        let mut previous = 0.0;
        for _ in 0..5 {
            state.body_mut(a).unwrap().pos = Vec2::new(400.0, 240.0);
            state.body_mut(b).unwrap().pos = Vec2::new(425.0, 240.0);
            tick(&mut state, &TickInput::default());
            let recoil = state.body(a).unwrap().recoil_accumulator();
            assert!(recoil >= previous);
            previous = recoil;
        }
        assert!(previous > 0.0);

        state.restart();
        for agent in state.agents() {
            assert_eq!(agent.recoil_accumulator(), 0.0);
        }
    }

    #[test]
    fn test_agent_hits_obstacle_ends_round() {
        let mut state = open_arena();
        let (a, b) = ids(&state);
        let pos = state.body(a).unwrap().pos;
        let obstacle = state
            .register(Body::obstacle(
                pos,
                30.0,
                Shape::Rectangle {
                    width: 60.0,
                    height: 40.0,
                },
            ))
            .unwrap();

        let events = tick(&mut state, &TickInput::default());
        assert!(events.contains(&SimEvent::AgentHitObstacle {
            loser: a,
            obstacle,
            winner: Some(b),
        }));
        assert_eq!(state.phase, GamePhase::GameOver);
        assert_eq!(state.winner, Some(b));

        // No further ticks once over
        let before = state.time_ticks;
        assert!(tick(&mut state, &TickInput::default()).is_empty());
        assert_eq!(state.time_ticks, before);
    }

    #[test]
    fn test_lone_agent_has_no_winner() {
        let mut state = SimState::empty(SimConfig::default(), 3);
        let a = state.register(Body::agent(Vec2::new(100.0, 100.0), 20.0, 1.0)).unwrap();
        state.register(Body::obstacle(Vec2::new(110.0, 100.0), 20.0, Shape::Circle)).unwrap();
        state.phase = GamePhase::Playing;

        let events = tick(&mut state, &TickInput::default());
        assert!(events.iter().any(|e| matches!(
            e,
            SimEvent::AgentHitObstacle { loser, winner: None, .. } if *loser == a
        )));
    }

    #[test]
    fn test_out_of_bounds_ends_round() {
        let mut state = open_arena();
        let (a, b) = ids(&state);
        state.config.arena.bounds = Rect::new(0.0, 0.0, 800.0, 480.0);
        state.body_mut(b).unwrap().pos = Vec2::new(790.0, 240.0);

        let events = tick(&mut state, &TickInput::default());
        assert!(events.contains(&SimEvent::AgentOutOfBounds {
            loser: b,
            winner: Some(a),
        }));
        assert_eq!(state.winner, Some(a));
    }

    #[test]
    fn test_only_first_terminal_condition_counts() {
        let mut state = open_arena();
        let (a, b) = ids(&state);
        let pos = state.body(a).unwrap().pos;
        state.register(Body::obstacle(pos, 30.0, Shape::Circle)).unwrap();
        state.body_mut(b).unwrap().pos = Vec2::new(-100.0, 240.0);

        let events = tick(&mut state, &TickInput::default());
        assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
        assert_eq!(state.winner, Some(b));
    }

    #[test]
    fn test_boost_applies_and_expires() {
        let mut state = open_arena();
        let (a, _) = ids(&state);
        let base = state.body(a).unwrap().agent_state().unwrap().base_speed;

        let mut input = TickInput::default();
        input.agents[0].boost = Some(BoostWindow {
            multiplier: 2.0,
            duration_ticks: 3,
        });
        let events = tick(&mut state, &input);
        assert!(events.contains(&SimEvent::BoostStarted { agent: a, until_tick: 4 }));
        assert_eq!(state.body(a).unwrap().agent_state().unwrap().speed, base * 2.0);

        for _ in 0..2 {
            tick(&mut state, &TickInput::default());
        }
        assert_eq!(state.body(a).unwrap().agent_state().unwrap().speed, base * 2.0);

        let events = tick(&mut state, &TickInput::default());
        assert!(events.contains(&SimEvent::BoostExpired { agent: a }));
        assert_eq!(state.body(a).unwrap().agent_state().unwrap().speed, base);
    }

    #[test]
    fn test_simulation_boost_uses_config() {
        let mut sim = Simulation::new(SimConfig::default(), 8);
        sim.restart();
        sim.state.clear_obstacles();
        let (a, _) = ids(&sim.state);
        sim.boost(0);
        let events = sim.step();
        let duration = sim.state.config.agent.boost_duration_ticks;
        assert!(events.contains(&SimEvent::BoostStarted {
            agent: a,
            until_tick: 1 + duration,
        }));
        let agent = sim.state.body(a).unwrap().agent_state().unwrap();
        assert!(agent.is_boosted());
        assert_eq!(agent.speed, agent.base_speed * sim.state.config.agent.boost_multiplier);
    }

    #[test]
    fn test_stale_boost_expiry_after_restart_is_noop() {
        let mut state = open_arena();
        let (a, _) = ids(&state);
        let base = state.body(a).unwrap().agent_state().unwrap().base_speed;

        let mut input = TickInput::default();
        input.agents[0].boost = Some(BoostWindow {
            multiplier: 2.0,
            duration_ticks: 5,
        });
        tick(&mut state, &input);

        state.restart();
        state.clear_obstacles();
        assert_eq!(state.body(a).unwrap().agent_state().unwrap().speed, base);

        // Boost again in the new round with a longer window
        input.agents[0].boost = Some(BoostWindow {
            multiplier: 3.0,
            duration_ticks: 50,
        });
        tick(&mut state, &input);
        for _ in 0..10 {
            let events = tick(&mut state, &TickInput::default());
            assert!(!events.iter().any(|e| matches!(e, SimEvent::BoostExpired { .. })));
        }
        assert_eq!(state.body(a).unwrap().agent_state().unwrap().speed, base * 3.0);
    }

    #[test]
    fn test_stale_expiry_without_new_boost() {
        let mut state = open_arena();
        let (a, _) = ids(&state);
        let mut input = TickInput::default();
        input.agents[0].boost = Some(BoostWindow {
            multiplier: 2.0,
            duration_ticks: 2,
        });
        tick(&mut state, &input);
        state.restart();
        state.clear_obstacles();

        for _ in 0..5 {
            let events = tick(&mut state, &TickInput::default());
            assert!(!events.iter().any(|e| matches!(e, SimEvent::BoostExpired { .. })));
        }
        let agent = state.body(a).unwrap().agent_state().unwrap().clone();
        assert_eq!(agent.speed, agent.base_speed);
        assert!(state.schedule.is_empty());
    }

    #[test]
    fn test_collision_count_increments_then_decays() {
        let mut state = open_arena();
        let (a, b) = ids(&state);
        state.body_mut(a).unwrap().pos = Vec2::new(400.0, 240.0);
        state.body_mut(b).unwrap().pos = Vec2::new(430.0, 240.0);
        tick(&mut state, &TickInput::default());
        // +1 then one decay step (0.5)
        assert!((state.body(a).unwrap().collision_count - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_input_buffer_keeps_latest_sample() {
        let mut buffer = InputBuffer::new();
        buffer.set_direction(0, Vec2::new(1.0, 0.0));
        buffer.set_direction(0, Vec2::new(0.0, -1.0));
        buffer.trigger_boost(
            1,
            BoostWindow {
                multiplier: 2.0,
                duration_ticks: 10,
            },
        );
        buffer.set_direction(7, Vec2::ONE);

        let first = buffer.sample();
        assert_eq!(first.agents[0].direction, Vec2::new(0.0, -1.0));
        assert!(first.agents[1].boost.is_some());

        let second = buffer.sample();
        assert_eq!(second.agents[0].direction, Vec2::new(0.0, -1.0));
        assert!(second.agents[1].boost.is_none());
    }

    #[test]
    fn test_simulation_restart_clears_and_regenerates() {
        let mut sim = Simulation::new(SimConfig::default(), 77);
        sim.restart();
        assert!(sim.state.obstacle_count() > 0);

        // Play until something ends the round
        sim.input.set_direction(0, Vec2::new(-1.0, 0.0));
        for _ in 0..2000 {
            sim.step();
            if sim.state.phase == GamePhase::GameOver {
                break;
            }
        }
        assert_eq!(sim.state.phase, GamePhase::GameOver);

        sim.state.reset_round();
        assert_eq!(sim.state.obstacle_count(), 0);
        for agent in sim.state.agents() {
            assert_eq!(agent.recoil_accumulator(), 0.0);
        }
        assert!(sim.state.generate_obstacles() > 0);
    }

    #[test]
    fn test_observers_see_events_and_faults_are_contained() {
        let mut sim = Simulation::new(SimConfig::default(), 5);
        sim.restart();
        sim.state.clear_obstacles();
        let (a, b) = ids(&sim.state);
        sim.state.body_mut(a).unwrap().pos = Vec2::new(400.0, 240.0);
        sim.state.body_mut(b).unwrap().pos = Vec2::new(430.0, 240.0);

        let seen = Rc::new(RefCell::new(0usize));
        let sink = Rc::clone(&seen);
        sim.observers
            .subscribe(|_: &SimEvent| -> Result<(), ObserverError> { panic!("bad listener") });
        sim.observers.subscribe_body(a, move |e: &SimEvent| -> Result<(), ObserverError> {
            if matches!(e, SimEvent::Recoil(_)) {
                *sink.borrow_mut() += 1;
            }
            Ok(())
        });

        let events = sim.step();
        assert!(events.iter().any(|e| matches!(e, SimEvent::Recoil(_))));
        assert_eq!(*seen.borrow(), 1);
        assert!(sim.state.body(a).unwrap().recoil_accumulator() > 0.0);
    }
}
