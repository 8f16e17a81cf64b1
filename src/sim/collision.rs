//! Collision detection over the simulation set
//!
//! Every unordered pair is tested each tick. The set is two agents plus a
//! small obstacle budget, so the quadratic sweep stays cheap and needs no
//! broad phase.

use glam::Vec2;

use super::body::Body;

/// Circle-circle overlap, excluding coincident centers
///
/// A zero distance has no separating direction, so it is reported as no
/// collision rather than handing a degenerate pair to knockback.
#[inline]
pub fn circles_overlap(pa: Vec2, ra: f32, pb: Vec2, rb: f32) -> bool {
    let dist = (pb - pa).length();
    dist > 0.0 && dist < ra + rb
}

/// Check whether two bodies overlap
///
/// An agent/obstacle pair uses the obstacle's real footprint; every other
/// pairing falls back to bounding circles.
pub fn bodies_collide(a: &Body, b: &Body) -> bool {
    let (obstacle, agent) = match (a.is_obstacle(), b.is_obstacle()) {
        (true, false) => (a, b),
        (false, true) => (b, a),
        _ => return circles_overlap(a.pos, a.radius, b.pos, b.radius),
    };

    match obstacle.shape() {
        Some(shape) => shape.intersects_circle(obstacle.pos, obstacle.radius, agent.pos, agent.radius),
        None => circles_overlap(a.pos, a.radius, b.pos, b.radius),
    }
}

/// Test every unordered pair in set order, handing overlapping pairs to
/// `on_contact` as they are found
///
/// Pairs are tested against the positions left by earlier contacts in the
/// same sweep. Returns the number of contacts.
pub fn sweep<F>(bodies: &mut [Body], mut on_contact: F) -> usize
where
    F: FnMut(&mut Body, &mut Body),
{
    let mut contacts = 0;
    for i in 0..bodies.len() {
        for j in (i + 1)..bodies.len() {
            if !bodies_collide(&bodies[i], &bodies[j]) {
                continue;
            }
            if let Some((a, b)) = pair_mut(bodies, i, j) {
                on_contact(a, b);
                contacts += 1;
            }
        }
    }
    contacts
}

/// Borrow two distinct bodies mutably
///
/// Returns `None` if the indices coincide or are out of range.
pub fn pair_mut(bodies: &mut [Body], a: usize, b: usize) -> Option<(&mut Body, &mut Body)> {
    if a == b || a.max(b) >= bodies.len() {
        return None;
    }
    if a < b {
        let (left, right) = bodies.split_at_mut(b);
        Some((&mut left[a], &mut right[0]))
    } else {
        let (left, right) = bodies.split_at_mut(a);
        Some((&mut right[0], &mut left[b]))
    }
}
