mod body;
mod shape;

pub use body::{Collidable, Collider, HitboxSize, Position, SpatialBody};
pub use shape::{
    intersects, overlaps_1d, Aabb, Polygon, Shape, ShapeError, ShapeKind, Vec2, ZBand,
};
