mod registry;
mod tile;
mod tilemap;

pub use registry::{MapHandle, MapRegistry};
pub use tile::{MapQuery, ShapeId, ShapeProperties, StaticShape, Tile};
pub use tilemap::{TileLayer, TileMap, TileMapError, EMPTY_TILE_ID};
