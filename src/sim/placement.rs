//! Procedural obstacle placement
//!
//! Rejection sampling inside the arena: draw a size and a position, keep the
//! candidate only if it clears every agent and every obstacle placed so far.
//! When one obstacle cannot be placed within the attempt budget the pass
//! stops early and the round simply has fewer obstacles.

use glam::Vec2;
use rand::Rng;

use super::body::Body;
use super::shape::{Shape, ShapeKind};
use crate::config::{PlacementConfig, Rect};

/// A circle that placed obstacles must keep clear of
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keepout {
    pub pos: Vec2,
    pub radius: f32,
}

impl From<&Body> for Keepout {
    fn from(body: &Body) -> Self {
        Self {
            pos: body.pos,
            radius: body.radius,
        }
    }
}

/// True if a candidate keeps `spacing` beyond the radius sum to every keepout
pub fn has_clearance(pos: Vec2, radius: f32, keepouts: &[Keepout], spacing: f32) -> bool {
    keepouts
        .iter()
        .all(|k| (k.pos - pos).length() >= k.radius + radius + spacing)
}

/// Shape geometry for an accepted placement
///
/// Rectangles are wider than tall (`2.2r x 1.2r`); every other name goes
/// through the usual normalization.
pub fn shape_for(name: &str, radius: f32) -> Shape {
    match ShapeKind::from_name(name) {
        ShapeKind::Rectangle => Shape::Rectangle {
            width: radius * 2.2,
            height: radius * 1.2,
        },
        _ => Shape::from_name(name, radius),
    }
}

/// Draw one candidate; `None` if the arena cannot hold the drawn size
fn draw_candidate<R: Rng>(rng: &mut R, bounds: &Rect, cfg: &PlacementConfig) -> Option<(Vec2, f32)> {
    let multiplier = cfg.size_pool[rng.random_range(0..cfg.size_pool.len())];
    let radius = cfg.base_size * multiplier;
    if !radius.is_finite() || radius <= 0.0 {
        return None;
    }

    let span = Vec2::new(bounds.width, bounds.height) - Vec2::splat(2.0 * radius);
    if span.x < 0.0 || span.y < 0.0 {
        return None;
    }

    let pos = Vec2::new(
        bounds.x + rng.random::<f32>() * span.x + radius,
        bounds.y + rng.random::<f32>() * span.y + radius,
    );
    Some((pos, radius))
}

/// Generate up to `cfg.obstacle_budget` non-overlapping obstacles
///
/// `agents` are the positions to keep clear at generation time. Returned
/// obstacles are unregistered (id 0).
pub fn generate_obstacles<R: Rng>(
    rng: &mut R,
    bounds: &Rect,
    agents: &[Keepout],
    cfg: &PlacementConfig,
) -> Vec<Body> {
    let mut obstacles: Vec<Body> = Vec::new();
    if cfg.size_pool.is_empty() || cfg.shapes.is_empty() || !bounds.is_valid() {
        log::warn!("Obstacle placement skipped: empty size pool, shape set or arena");
        return obstacles;
    }

    let mut keepouts: Vec<Keepout> = agents.to_vec();

    while obstacles.len() < cfg.obstacle_budget {
        let mut placed = false;

        for _ in 0..cfg.max_attempts_per_obstacle {
            let Some((pos, radius)) = draw_candidate(rng, bounds, cfg) else {
                continue;
            };
            if !has_clearance(pos, radius, &keepouts, cfg.min_spacing) {
                continue;
            }

            let name = &cfg.shapes[rng.random_range(0..cfg.shapes.len())];
            let obstacle = Body::obstacle(pos, radius, shape_for(name, radius));
            keepouts.push(Keepout::from(&obstacle));
            obstacles.push(obstacle);
            placed = true;
            break;
        }

        if !placed {
            log::debug!(
                "Obstacle placement exhausted after {} of {} obstacles",
                obstacles.len(),
                cfg.obstacle_budget
            );
            break;
        }
    }

    obstacles
}
