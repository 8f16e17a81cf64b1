//! Obstacle footprints
//!
//! Shapes are a closed set: circle, axis-aligned rectangle, and a compound
//! polygon (triangles and routes). Extra geometry is stored relative to the
//! obstacle center, so a shape never needs to know where it is placed.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::cross;

/// Canonical shape identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShapeKind {
    Circle,
    Rectangle,
    Compound,
}

impl ShapeKind {
    /// Canonicalize a shape name
    ///
    /// Legacy aliases map onto the canonical set; anything unrecognized
    /// degrades to a circle so the obstacle stays collidable.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "circle" => ShapeKind::Circle,
            "rect" | "rectangle" => ShapeKind::Rectangle,
            "compound" | "triangle" | "polygon" | "route" => ShapeKind::Compound,
            other => {
                log::debug!("Unknown obstacle shape {:?}, using circle", other);
                ShapeKind::Circle
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ShapeKind::Circle => "circle",
            ShapeKind::Rectangle => "rectangle",
            ShapeKind::Compound => "compound",
        }
    }
}

/// Obstacle footprint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Circle,
    Rectangle { width: f32, height: f32 },
    /// Point list as offsets from the obstacle center, solid as a triangle
    /// fan from the first point
    Compound { points: Vec<Vec2> },
}

impl Shape {
    /// Build a shape from a (possibly legacy) name
    ///
    /// Rectangles default to a `2r x 2r` box; compound shapes default to the
    /// triangle inscribed in the bounding radius, except `route` which gets
    /// its four-point zigzag.
    pub fn from_name(name: &str, radius: f32) -> Self {
        match ShapeKind::from_name(name) {
            ShapeKind::Circle => Shape::Circle,
            ShapeKind::Rectangle => Shape::Rectangle {
                width: radius * 2.0,
                height: radius * 2.0,
            },
            ShapeKind::Compound if name.trim().eq_ignore_ascii_case("route") => Shape::Compound {
                points: route_points(radius),
            },
            ShapeKind::Compound => Shape::Compound {
                points: triangle_points(radius),
            },
        }
    }

    pub fn kind(&self) -> ShapeKind {
        match self {
            Shape::Circle => ShapeKind::Circle,
            Shape::Rectangle { .. } => ShapeKind::Rectangle,
            Shape::Compound { .. } => ShapeKind::Compound,
        }
    }

    /// Check whether a circle at `p` with radius `pr` touches this shape
    /// placed at `center` with bounding radius `radius`
    pub fn intersects_circle(&self, center: Vec2, radius: f32, p: Vec2, pr: f32) -> bool {
        match self {
            Shape::Circle => circle_intersects_circle(center, radius, p, pr),
            Shape::Rectangle { width, height } => {
                circle_intersects_rect(center, Vec2::new(*width, *height) / 2.0, p, pr)
            }
            // A compound without vertices would be inert; treat it as its bounding circle
            Shape::Compound { points } if points.is_empty() => {
                circle_intersects_circle(center, radius, p, pr)
            }
            Shape::Compound { points } => {
                let world: Vec<Vec2> = points.iter().map(|&o| center + o).collect();
                circle_intersects_polygon(&world, p, pr)
            }
        }
    }
}

/// Triangle vertices (offsets) for a bounding radius
pub fn triangle_points(radius: f32) -> Vec<Vec2> {
    vec![
        Vec2::new(0.0, -(2.0 / 3.0) * radius),
        Vec2::new(-radius, radius / 3.0),
        Vec2::new(radius, radius / 3.0),
    ]
}

/// Four-point route (offsets) for a bounding radius
pub fn route_points(radius: f32) -> Vec<Vec2> {
    vec![
        Vec2::new(-radius, 0.0),
        Vec2::new(-radius / 2.0, -radius * 0.6),
        Vec2::new(radius / 2.0, radius * 0.4),
        Vec2::new(radius, 0.0),
    ]
}

/// Inclusive circle-circle overlap (touching counts)
#[inline]
pub fn circle_intersects_circle(center: Vec2, radius: f32, p: Vec2, pr: f32) -> bool {
    let sum = radius + pr;
    (p - center).length_squared() <= sum * sum
}

/// Circle vs axis-aligned rectangle via the nearest clamped point
pub fn circle_intersects_rect(center: Vec2, half_extents: Vec2, p: Vec2, pr: f32) -> bool {
    let nearest = p.clamp(center - half_extents, center + half_extents);
    (p - nearest).length_squared() <= pr * pr
}

/// Circle vs compound shape, taken as a fan of triangles from the first vertex
///
/// Each triangle is hit when the circle center lies inside it or one of its
/// edges is within reach. A fan keeps non-convex and self-crossing point lists
/// (the route zigzag) solid instead of leaving blind interiors.
pub fn circle_intersects_polygon(vertices: &[Vec2], p: Vec2, pr: f32) -> bool {
    let r_sq = pr * pr;
    match vertices {
        [] => false,
        [a] => (p - *a).length_squared() <= r_sq,
        [a, b] => distance_sq_point_to_segment(p, *a, *b) <= r_sq,
        [first, rest @ ..] => rest.windows(2).any(|edge| {
            let tri = [*first, edge[0], edge[1]];
            point_in_triangle(tri, p)
                || (0..3).any(|i| distance_sq_point_to_segment(p, tri[i], tri[(i + 1) % 3]) <= r_sq)
        }),
    }
}

/// Sign-consistency test over the three edge cross products
///
/// Points on an edge count as inside; winding does not matter.
pub fn point_in_triangle(tri: [Vec2; 3], p: Vec2) -> bool {
    let d1 = cross(tri[0], tri[1], p);
    let d2 = cross(tri[1], tri[2], p);
    let d3 = cross(tri[2], tri[0], p);
    let has_neg = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
    let has_pos = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;
    !(has_neg && has_pos)
}

/// Squared distance from `p` to segment `a-b` (no square root)
pub fn distance_sq_point_to_segment(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    let v = b - a;
    let w = p - a;
    let c1 = w.dot(v);
    if c1 <= 0.0 {
        return (p - a).length_squared();
    }
    let c2 = v.length_squared();
    if c2 <= c1 {
        return (p - b).length_squared();
    }
    let proj = a + v * (c1 / c2);
    (p - proj).length_squared()
}
