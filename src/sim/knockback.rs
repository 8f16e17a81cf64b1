//! Knockback resolution and passive decay
//!
//! A confirmed contact produces an asymmetric push pair:
//!
//! 1. base strength grows with each side's recent collision count
//! 2. the speed difference scales the whole exchange
//! 3. the slower side takes the larger share
//! 4. a shield facing the contact halves that side's push
//! 5. two shields facing each other amplify both pushes ("clash")
//! 6. accumulated recoil makes a side progressively easier to push
//!
//! Obstacles never move: their push is always zero.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::body::{Body, BodyId};
use crate::config::KnockbackConfig;
use crate::unit_or_zero;

/// Contact geometry between two overlapping bodies
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactGeometry {
    /// Unit vector from `a` toward `b`
    pub normal: Vec2,
    pub distance: f32,
    /// Penetration depth (`ra + rb - distance`), always > 0
    pub overlap: f32,
}

impl ContactGeometry {
    /// Returns `None` for coincident centers or non-penetrating pairs
    pub fn between(a: &Body, b: &Body) -> Option<Self> {
        let delta = b.pos - a.pos;
        let distance = delta.length();
        if distance == 0.0 || !distance.is_finite() {
            return None;
        }
        let overlap = a.radius + b.radius - distance;
        if overlap <= 0.0 {
            return None;
        }
        Some(Self {
            normal: delta / distance,
            distance,
            overlap,
        })
    }
}

/// Computed push pair (before it is written back to the bodies)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Knockback {
    pub push_a: f32,
    pub push_b: f32,
    /// Unit vector from `a` toward `b`; `a` is pushed along `-normal`
    pub normal: Vec2,
    /// True when both shields met head-on
    pub shield_clash: bool,
}

/// Push report for score/telemetry display (no effect on physics)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecoilReport {
    pub agent_a: BodyId,
    pub agent_b: BodyId,
    pub push_a: f32,
    pub push_b: f32,
}

/// Does `body` face the contact direction closely enough to block?
///
/// `toward_contact` is the direction from the body toward the other body.
pub fn is_front_contact(body: &Body, toward_contact: Vec2, cfg: &KnockbackConfig) -> bool {
    let Some(facing) = body.facing() else {
        return false;
    };
    unit_or_zero(toward_contact).dot(facing) > cfg.front_threshold
}

/// Speed biases `(a, b)`: the faster side takes less push
///
/// Equal speeds split the difference so a symmetric contact stays symmetric.
pub fn speed_biases(speed_a: f32, speed_b: f32, cfg: &KnockbackConfig) -> (f32, f32) {
    if speed_a > speed_b {
        (cfg.faster_bias, cfg.slower_bias)
    } else if speed_b > speed_a {
        (cfg.slower_bias, cfg.faster_bias)
    } else {
        let even = (cfg.faster_bias + cfg.slower_bias) / 2.0;
        (even, even)
    }
}

/// Knockback strength escalated by recent collisions
#[inline]
pub fn escalated_strength(collision_count: f32, cfg: &KnockbackConfig) -> f32 {
    cfg.base_strength * (1.0 + collision_count * cfg.growth)
}

/// Multiplier from accumulated recoil (`1 + recoil / 100`)
#[inline]
pub fn recoil_bonus(body: &Body) -> f32 {
    1.0 + body.recoil_accumulator() / 100.0
}

/// Compute the push pair for two bodies without mutating them
pub fn compute(a: &Body, b: &Body, cfg: &KnockbackConfig) -> Option<Knockback> {
    let contact = ContactGeometry::between(a, b)?;
    let n = contact.normal;

    let speed_a = a.speed();
    let speed_b = b.speed();
    let speed_scale = 1.0 + (speed_a - speed_b).abs() * cfg.speed_influence;
    let (bias_a, bias_b) = speed_biases(speed_a, speed_b, cfg);

    let shared = contact.overlap * speed_scale * cfg.recoil_scale * cfg.knockback_modifier;
    let mut push_a = if a.is_agent() {
        bias_a * escalated_strength(a.collision_count, cfg) * shared
    } else {
        0.0
    };
    let mut push_b = if b.is_agent() {
        bias_b * escalated_strength(b.collision_count, cfg) * shared
    } else {
        0.0
    };

    // Per-side shield mitigation
    let a_front = a.is_agent() && is_front_contact(a, n, cfg);
    let b_front = b.is_agent() && is_front_contact(b, -n, cfg);
    if a_front {
        push_a *= cfg.front_reduction;
    }
    if b_front {
        push_b *= cfg.front_reduction;
    }

    // Head-on shield clash amplifies the whole exchange
    let shield_clash = a_front && b_front;
    if shield_clash {
        push_a *= cfg.shield_collision_multiplier;
        push_b *= cfg.shield_collision_multiplier;
    }

    push_a *= recoil_bonus(a);
    push_b *= recoil_bonus(b);

    if !push_a.is_finite() || !push_b.is_finite() {
        log::warn!(
            "Discarding non-finite knockback between {} and {}",
            a.id,
            b.id
        );
        return None;
    }

    Some(Knockback {
        push_a,
        push_b,
        normal: n,
        shield_clash,
    })
}

/// Nudge a body along `dir` and add an impulse (agents only)
fn apply_push(body: &mut Body, dir: Vec2, push: f32, cfg: &KnockbackConfig) {
    if !body.is_agent() || push == 0.0 {
        return;
    }
    body.pos += dir * push * cfg.separation_scale;
    body.vel += dir * push * cfg.impulse_scale;
}

/// Resolve a contact: compute, apply, and report
///
/// Returns `None` when nothing was applied (degenerate geometry, or neither
/// side is an agent).
pub fn resolve(a: &mut Body, b: &mut Body, cfg: &KnockbackConfig) -> Option<RecoilReport> {
    if !a.is_agent() && !b.is_agent() {
        return None;
    }
    let knockback = compute(a, b, cfg)?;

    apply_push(a, -knockback.normal, knockback.push_a, cfg);
    apply_push(b, knockback.normal, knockback.push_b, cfg);

    if knockback.shield_clash {
        log::debug!("Shield clash between {} and {}", a.id, b.id);
    }

    Some(RecoilReport {
        agent_a: a.id,
        agent_b: b.id,
        push_a: knockback.push_a * cfg.report_scale / 1000.0,
        push_b: knockback.push_b * cfg.report_scale / 1000.0,
    })
}

/// Passive per-tick update: integrate agent velocity, apply friction, decay
/// collision counts
///
/// Recoil accumulators are left alone.
pub fn integrate(bodies: &mut [Body], cfg: &KnockbackConfig) {
    for body in bodies.iter_mut() {
        if body.is_agent() {
            body.pos += body.vel;
            body.vel *= cfg.friction;
        }
        body.collision_count *= cfg.decay;
    }
}
