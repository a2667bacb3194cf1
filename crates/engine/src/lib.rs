pub mod collision;
pub mod map;
pub mod movement;
pub mod world;

pub use collision::{
    intersects, overlaps_1d, Aabb, Collidable, Collider, HitboxSize, Polygon, Position, Shape,
    ShapeError, ShapeKind, SpatialBody, Vec2, ZBand,
};
pub use map::{
    MapHandle, MapQuery, MapRegistry, ShapeId, ShapeProperties, StaticShape, Tile, TileLayer,
    TileMap, TileMapError, EMPTY_TILE_ID,
};
pub use movement::{
    pixels_per_tile, resolve_dispatch, ActionCode, Actor, ActorState, BlockReason, Collision,
    CollisionTarget, Dispatch, Direction, DirectionError, EventHandlers, MoveOutcome,
    PlacementRequest, Trigger, TriggerSink, UnknownActionCode,
};
pub use world::{EntityId, EntityIdAllocator, World, WorldObject, WorldSnapshot};
