use std::borrow::Cow;
use std::f32::consts::TAU;
use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    fn dot(self, other: Vec2) -> f32 {
        self.x * other.x + self.y * other.y
    }

    fn cross(self, other: Vec2) -> f32 {
        self.x * other.y - self.y * other.x
    }

    fn perp(self) -> Vec2 {
        Vec2::new(-self.y, self.x)
    }

    fn is_zero(self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }

    fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, other: Vec2) -> Vec2 {
        Vec2::new(self.x + other.x, self.y + other.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, other: Vec2) -> Vec2 {
        Vec2::new(self.x - other.x, self.y - other.y)
    }
}

/// Axis-aligned box anchored at its top-left corner (`origin`), y growing down.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub origin: Vec2,
    pub width: f32,
    pub height: f32,
}

impl Aabb {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            origin: Vec2::new(x, y),
            width,
            height,
        }
    }

    pub fn min_x(&self) -> f32 {
        self.origin.x
    }

    pub fn max_x(&self) -> f32 {
        self.origin.x + self.width
    }

    pub fn min_y(&self) -> f32 {
        self.origin.y
    }

    pub fn max_y(&self) -> f32 {
        self.origin.y + self.height
    }

    /// Corners in clockwise screen order starting at the origin.
    pub fn corners(&self) -> [Vec2; 4] {
        [
            Vec2::new(self.min_x(), self.min_y()),
            Vec2::new(self.max_x(), self.min_y()),
            Vec2::new(self.max_x(), self.max_y()),
            Vec2::new(self.min_x(), self.max_y()),
        ]
    }

    /// Open-interior overlap: boxes sharing only an edge do not overlap.
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min_x() < other.max_x()
            && other.min_x() < self.max_x()
            && self.min_y() < other.max_y()
            && other.min_y() < self.max_y()
    }

    pub fn translated(&self, offset: Vec2) -> Aabb {
        Aabb {
            origin: self.origin + offset,
            ..*self
        }
    }

    fn validate(&self) -> Result<(), ShapeError> {
        let finite = self.origin.is_finite() && self.width.is_finite() && self.height.is_finite();
        if !finite || self.width < 0.0 || self.height < 0.0 {
            return Err(ShapeError::InvalidBox {
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }
}

const TURN_TOLERANCE: f32 = 1.0e-3;

/// Convex polygon in absolute coordinates. Validated on construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    points: Vec<Vec2>,
}

impl Polygon {
    pub fn new(points: Vec<Vec2>) -> Result<Self, ShapeError> {
        if points.len() < 3 {
            return Err(ShapeError::TooFewPoints {
                count: points.len(),
            });
        }
        if let Some(index) = points.iter().position(|point| !point.is_finite()) {
            return Err(ShapeError::NonFinitePoint { index });
        }

        let count = points.len();
        let doubled_area: f32 = (0..count)
            .map(|index| points[index].cross(points[(index + 1) % count]))
            .sum();
        let edges: Vec<Vec2> = (0..count)
            .map(|index| points[(index + 1) % count] - points[index])
            .filter(|edge| !edge.is_zero())
            .collect();

        let mut winding = 0.0f32;
        let mut total_turn = 0.0f32;
        for (index, &incoming) in edges.iter().enumerate() {
            let outgoing = edges[(index + 1) % edges.len()];
            let turn = incoming.cross(outgoing);
            if turn != 0.0 {
                if winding == 0.0 {
                    winding = turn.signum();
                } else if turn.signum() != winding {
                    return Err(ShapeError::NotConvex);
                }
            }
            total_turn += turn.atan2(incoming.dot(outgoing));
        }
        if doubled_area == 0.0 {
            return Err(ShapeError::ZeroArea);
        }
        // A simple convex outline turns exactly once; a star winds twice.
        if (total_turn.abs() - TAU).abs() > TURN_TOLERANCE {
            return Err(ShapeError::NotConvex);
        }

        Ok(Self { points })
    }

    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    pub fn translated(&self, offset: Vec2) -> Polygon {
        Polygon {
            points: self.points.iter().map(|point| *point + offset).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    Box,
    Polygon,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Box(Aabb),
    Polygon(Polygon),
}

impl Shape {
    pub fn kind(&self) -> ShapeKind {
        match self {
            Shape::Box(_) => ShapeKind::Box,
            Shape::Polygon(_) => ShapeKind::Polygon,
        }
    }

    pub fn translated(&self, offset: Vec2) -> Shape {
        match self {
            Shape::Box(aabb) => Shape::Box(aabb.translated(offset)),
            Shape::Polygon(polygon) => Shape::Polygon(polygon.translated(offset)),
        }
    }

    /// Polygons are checked in [`Polygon::new`]; boxes are plain data and are
    /// checked here before they enter a map.
    pub fn validate(&self) -> Result<(), ShapeError> {
        match self {
            Shape::Box(aabb) => aabb.validate(),
            Shape::Polygon(_) => Ok(()),
        }
    }

    fn vertices(&self) -> Cow<'_, [Vec2]> {
        match self {
            Shape::Box(aabb) => Cow::Owned(aabb.corners().to_vec()),
            Shape::Polygon(polygon) => Cow::Borrowed(polygon.points()),
        }
    }
}

impl From<Aabb> for Shape {
    fn from(aabb: Aabb) -> Self {
        Shape::Box(aabb)
    }
}

impl From<Polygon> for Shape {
    fn from(polygon: Polygon) -> Self {
        Shape::Polygon(polygon)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ShapeError {
    #[error("polygon needs at least 3 points, got {count}")]
    TooFewPoints { count: usize },
    #[error("polygon point {index} is not finite")]
    NonFinitePoint { index: usize },
    #[error("polygon is not convex")]
    NotConvex,
    #[error("polygon has zero area")]
    ZeroArea,
    #[error("box has invalid size {width}x{height}")]
    InvalidBox { width: f32, height: f32 },
}

/// Half-open vertical interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZBand {
    pub start: f32,
    pub end: f32,
}

impl ZBand {
    pub fn new(z: f32, height: f32) -> Self {
        Self {
            start: z,
            end: z + height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn overlaps(self, other: ZBand) -> bool {
        overlaps_1d(self, other)
    }
}

/// True iff the two half-open intervals share at least one point.
/// `[a, b)` and `[b, c)` are disjoint; an empty interval overlaps nothing.
pub fn overlaps_1d(a: ZBand, b: ZBand) -> bool {
    !a.is_empty() && !b.is_empty() && a.start < b.end && b.start < a.end
}

pub fn intersects(a: &Shape, b: &Shape) -> bool {
    match (a, b) {
        (Shape::Box(a), Shape::Box(b)) => a.overlaps(b),
        _ => {
            let a = a.vertices();
            let b = b.vertices();
            !has_separating_axis(&a, &b) && !has_separating_axis(&b, &a)
        }
    }
}

fn has_separating_axis(source: &[Vec2], other: &[Vec2]) -> bool {
    edge_normals(source).any(|axis| {
        let (min_a, max_a) = project(source, axis);
        let (min_b, max_b) = project(other, axis);
        max_a <= min_b || max_b <= min_a
    })
}

fn edge_normals(points: &[Vec2]) -> impl Iterator<Item = Vec2> + '_ {
    points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(from, to)| (*to - *from).perp())
        .filter(|axis| !axis.is_zero())
}

fn project(points: &[Vec2], axis: Vec2) -> (f32, f32) {
    points
        .iter()
        .map(|point| point.dot(axis))
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(min, max), value| {
            (min.min(value), max.max(value))
        })
}
