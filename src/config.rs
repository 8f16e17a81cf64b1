//! Simulation tuning and viewport sizing
//!
//! Every constant the core uses lives here with its default. Any subset can be
//! overridden from JSON; missing keys keep their defaults.

use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::*;

/// Errors raised while loading a configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Knockback resolver constants
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KnockbackConfig {
    /// Base knockback magnitude before escalation
    pub base_strength: f32,
    /// Per-tick velocity multiplier (< 1)
    pub friction: f32,
    /// Knockback growth per recent collision
    pub growth: f32,
    /// Per-tick collision count multiplier (< 1)
    pub decay: f32,
    /// How strongly the speed difference amplifies an exchange
    pub speed_influence: f32,
    /// Cosine above which a contact counts as "in front"
    pub front_threshold: f32,
    /// Push multiplier for a side blocking with its shield
    pub front_reduction: f32,
    /// Bias for the faster side (takes less push)
    pub faster_bias: f32,
    /// Bias for the slower side (takes more push)
    pub slower_bias: f32,
    pub recoil_scale: f32,
    /// Fraction of push applied as positional separation
    pub separation_scale: f32,
    /// Fraction of push applied as velocity impulse
    pub impulse_scale: f32,
    /// Recoil reports carry `push * report_scale / 1000`
    pub report_scale: f32,
    /// Applied to both pushes when both agents block each other
    pub shield_collision_multiplier: f32,
    /// Display-dependent multiplier supplied by the embedding layer
    pub knockback_modifier: f32,
}

impl Default for KnockbackConfig {
    fn default() -> Self {
        Self {
            base_strength: 30.0,
            friction: 0.95,
            growth: 0.1,
            decay: 0.5,
            speed_influence: 5.0,
            front_threshold: 0.5,
            front_reduction: 0.5,
            faster_bias: 0.5,
            slower_bias: 0.8,
            recoil_scale: 0.165,
            separation_scale: 0.165,
            impulse_scale: 0.165,
            report_scale: 10.0,
            shield_collision_multiplier: 1.5,
            knockback_modifier: 1.0,
        }
    }
}

/// Obstacle placement constants
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    /// Reference obstacle radius (scaled by `size_pool`)
    pub base_size: f32,
    /// Radius multipliers drawn uniformly per candidate
    pub size_pool: Vec<f32>,
    /// Shape names drawn uniformly per accepted obstacle (normalized on build)
    pub shapes: Vec<String>,
    /// Maximum obstacles per generation pass
    pub obstacle_budget: usize,
    /// Extra clearance beyond the radius sum
    pub min_spacing: f32,
    /// Failed draws allowed for one obstacle before the pass stops
    pub max_attempts_per_obstacle: u32,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            base_size: OBSTACLE_BASE_SIZE,
            size_pool: vec![1.0, 1.5, 0.75, 1.25, 1.1],
            shapes: ["circle", "triangle", "rect", "star", "route"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            obstacle_budget: 4,
            min_spacing: OBSTACLE_MIN_SPACING,
            max_attempts_per_obstacle: OBSTACLE_MAX_ATTEMPTS,
        }
    }
}

/// Agent defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub radius: f32,
    pub base_speed: f32,
    /// Input magnitude needed to turn the shield
    pub facing_deadzone: f32,
    pub boost_multiplier: f32,
    pub boost_duration_ticks: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            radius: AGENT_RADIUS,
            base_speed: AGENT_BASE_SPEED,
            facing_deadzone: FACING_DEADZONE,
            boost_multiplier: BOOST_MULTIPLIER,
            boost_duration_ticks: BOOST_DURATION_TICKS,
        }
    }
}

/// Axis-aligned playfield rectangle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[inline]
    pub fn min(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    #[inline]
    pub fn max(&self) -> Vec2 {
        Vec2::new(self.x + self.width, self.y + self.height)
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// True if a circle lies fully inside the rectangle
    pub fn contains_circle(&self, center: Vec2, radius: f32) -> bool {
        center.x - radius >= self.x
            && center.x + radius <= self.x + self.width
            && center.y - radius >= self.y
            && center.y + radius <= self.y + self.height
    }

    pub fn is_valid(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.width.is_finite()
            && self.height.is_finite()
            && self.width > 0.0
            && self.height > 0.0
    }
}

/// Arena bounds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    pub bounds: Rect,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            bounds: Rect::new(0.0, 0.0, 800.0, 480.0),
        }
    }
}

/// Complete simulation configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub knockback: KnockbackConfig,
    pub placement: PlacementConfig,
    pub agent: AgentConfig,
    pub arena: ArenaConfig,
}

impl SimConfig {
    /// Parse a (possibly partial) JSON config
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a (possibly partial) JSON config from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_json_str(&json)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Apply viewport-derived sizing (speed, obstacle size and budget, arena)
    pub fn apply_viewport(&mut self, width: f32, height: f32) {
        let sizing = ViewportSizing::for_viewport(width, height);
        self.agent.base_speed = sizing.agent_speed;
        self.placement.base_size = sizing.obstacle_base_size;
        self.placement.obstacle_budget = sizing.obstacle_budget;
        self.arena.bounds = Rect::new(0.0, 0.0, sizing.playfield.x, sizing.playfield.y);
    }

    /// Build a config already sized for a viewport
    pub fn for_viewport(width: f32, height: f32) -> Self {
        let mut config = Self::default();
        config.apply_viewport(width, height);
        config
    }
}

/// Display size tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViewportClass {
    Mobile,
    Tablet,
    Desktop,
}

impl ViewportClass {
    pub fn from_width(width: f32) -> Self {
        if width < 768.0 {
            ViewportClass::Mobile
        } else if width < 1440.0 {
            ViewportClass::Tablet
        } else {
            ViewportClass::Desktop
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ViewportClass::Mobile => "Mobile",
            ViewportClass::Tablet => "Tablet",
            ViewportClass::Desktop => "Desktop",
        }
    }

    /// Obstacle count for this tier
    pub fn obstacle_budget(&self) -> usize {
        match self {
            ViewportClass::Mobile => 3,
            ViewportClass::Tablet => 4,
            ViewportClass::Desktop => 6,
        }
    }
}

/// Sizing parameters recomputed on viewport change
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportSizing {
    pub class: ViewportClass,
    pub agent_speed: f32,
    pub obstacle_base_size: f32,
    pub obstacle_budget: usize,
    /// Playfield width/height
    pub playfield: Vec2,
}

impl ViewportSizing {
    pub fn for_viewport(width: f32, height: f32) -> Self {
        let small = width.min(height);
        let class = ViewportClass::from_width(width);
        Self {
            class,
            agent_speed: 3.0 * (small / 1000.0) * 0.7,
            obstacle_base_size: OBSTACLE_BASE_SIZE * (small / 800.0),
            obstacle_budget: class.obstacle_budget(),
            playfield: Vec2::new(width * 0.8, height * 0.6),
        }
    }

    /// The playfield centered in a viewport of the given size
    pub fn playfield_rect(&self, width: f32, height: f32) -> Rect {
        Rect::new(
            (width - self.playfield.x) / 2.0,
            (height - self.playfield.y) / 2.0,
            self.playfield.x,
            self.playfield.y,
        )
    }
}

/// Inset a viewport region into the playable arena (border buffers)
pub fn inset_region(x: f32, y: f32, width: f32, height: f32) -> Rect {
    let horizontal = (width * 0.024).max(12.0);
    let vertical = (height * 0.016).max(8.0);
    Rect::new(
        x + horizontal,
        y + vertical,
        width - horizontal * 2.0,
        height - vertical * 2.0,
    )
}
