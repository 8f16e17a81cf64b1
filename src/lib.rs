//! Shield Push - a two-player knockback arena
//!
//! Core modules:
//! - `sim`: Simulation core (shapes, collisions, knockback, obstacle placement, tick loop)
//! - `config`: Data-driven tuning and viewport sizing

pub mod config;
pub mod sim;

pub use config::{AgentConfig, ArenaConfig, KnockbackConfig, PlacementConfig, SimConfig};

use glam::Vec2;

/// Simulation constants
pub mod consts {
    /// Nominal ticks per second (one tick per rendered frame)
    pub const TICKS_PER_SECOND: u64 = 60;

    /// Default agent radius
    pub const AGENT_RADIUS: f32 = 20.0;
    /// Default agent speed (pixels per tick at full deflection)
    pub const AGENT_BASE_SPEED: f32 = 0.63;
    /// Input magnitude below which facing is left unchanged
    pub const FACING_DEADZONE: f32 = 0.1;

    /// Boost defaults (multiplier, duration)
    pub const BOOST_MULTIPLIER: f32 = 2.0;
    pub const BOOST_DURATION_TICKS: u64 = TICKS_PER_SECOND;

    /// Reference obstacle size before viewport scaling
    pub const OBSTACLE_BASE_SIZE: f32 = 40.0;
    /// Clearance kept between placed obstacles and agents
    pub const OBSTACLE_MIN_SPACING: f32 = 10.0;
    /// Failed draws tolerated for a single obstacle before placement stops
    pub const OBSTACLE_MAX_ATTEMPTS: u32 = 60;
}

/// Normalize a direction, treating a zero-length vector as magnitude 1
///
/// Mirrors the "|v| or 1" guard used on incoming contact directions: a zero
/// vector stays zero instead of producing NaN.
#[inline]
pub fn unit_or_zero(v: Vec2) -> Vec2 {
    let len = v.length();
    let len = if len > 0.0 { len } else { 1.0 };
    v / len
}

/// Round to two decimals (recoil values are accumulated at display precision)
#[inline]
pub fn round2(value: f32) -> f32 {
    (value * 100.0).round() / 100.0
}

/// Cartesian cross product of (b - a) and (p - a)
#[inline]
pub fn cross(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    (b - a).perp_dot(p - a)
}
