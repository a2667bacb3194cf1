use std::collections::HashMap;

use thiserror::Error;

use crate::collision::{Vec2, ZBand};

use super::tile::{MapQuery, StaticShape, Tile};

pub const EMPTY_TILE_ID: u16 = 0;

/// One grid of tile ids stacked at height `z`. Id 0 marks an empty cell.
#[derive(Debug, Clone, PartialEq)]
pub struct TileLayer {
    z: f32,
    tiles: Vec<u16>,
}

impl TileLayer {
    pub fn new(z: f32, tiles: Vec<u16>) -> Self {
        Self { z, tiles }
    }

    pub fn z(&self) -> f32 {
        self.z
    }

    pub fn tiles(&self) -> &[u16] {
        &self.tiles
    }
}

/// Grid origin convention:
/// - tile (0,0) starts at pixel (0,0), x grows right and y grows down.
/// - tile (x,y) covers `[x * tile_width, (x + 1) * tile_width)` horizontally.
#[derive(Debug, Clone, PartialEq)]
pub struct TileMap {
    width: u32,
    height: u32,
    tile_width: f32,
    tile_height: f32,
    tileset: HashMap<u16, Tile>,
    layers: Vec<TileLayer>,
    shapes: Vec<StaticShape>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TileMapError {
    #[error("tile size must be positive and finite, got {tile_width}x{tile_height}")]
    InvalidTileSize { tile_width: f32, tile_height: f32 },
    #[error("tile id 0 is reserved for empty cells")]
    ReservedTileId,
    #[error("layer {layer}: tile count mismatch: expected {expected}, got {actual}")]
    TileCountMismatch {
        layer: usize,
        expected: usize,
        actual: usize,
    },
    #[error("layer {layer}: tile id {tile_id} has no tileset entry")]
    UnknownTileId { layer: usize, tile_id: u16 },
}

impl TileMap {
    pub fn new(
        width: u32,
        height: u32,
        tile_width: f32,
        tile_height: f32,
        tileset: Vec<(u16, Tile)>,
        layers: Vec<TileLayer>,
    ) -> Result<Self, TileMapError> {
        let valid_size = |value: f32| value.is_finite() && value > 0.0;
        if !valid_size(tile_width) || !valid_size(tile_height) {
            return Err(TileMapError::InvalidTileSize {
                tile_width,
                tile_height,
            });
        }

        let mut by_id = HashMap::with_capacity(tileset.len());
        for (tile_id, tile) in tileset {
            if tile_id == EMPTY_TILE_ID {
                return Err(TileMapError::ReservedTileId);
            }
            by_id.insert(tile_id, tile);
        }

        let expected = width as usize * height as usize;
        for (layer_index, layer) in layers.iter().enumerate() {
            let actual = layer.tiles.len();
            if expected != actual {
                return Err(TileMapError::TileCountMismatch {
                    layer: layer_index,
                    expected,
                    actual,
                });
            }
            if let Some(&tile_id) = layer
                .tiles
                .iter()
                .find(|&&tile_id| tile_id != EMPTY_TILE_ID && !by_id.contains_key(&tile_id))
            {
                return Err(TileMapError::UnknownTileId {
                    layer: layer_index,
                    tile_id,
                });
            }
        }

        Ok(Self {
            width,
            height,
            tile_width,
            tile_height,
            tileset: by_id,
            layers,
            shapes: Vec::new(),
        })
    }

    pub fn with_shapes(mut self, shapes: Vec<StaticShape>) -> Self {
        self.shapes = shapes;
        self
    }

    pub fn push_shape(&mut self, shape: StaticShape) {
        self.shapes.push(shape);
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn layers(&self) -> &[TileLayer] {
        &self.layers
    }

    pub fn index_of(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    fn cell_at(&self, x: f32, y: f32) -> Option<usize> {
        let tile_x = (x / self.tile_width).floor();
        let tile_y = (y / self.tile_height).floor();
        if !(tile_x >= 0.0 && tile_y >= 0.0) {
            return None;
        }
        self.index_of(tile_x as u32, tile_y as u32)
    }
}

impl MapQuery for TileMap {
    fn tile_width(&self) -> f32 {
        self.tile_width
    }

    fn tile_height(&self) -> f32 {
        self.tile_height
    }

    fn width_px(&self) -> f32 {
        self.width as f32 * self.tile_width
    }

    fn height_px(&self) -> f32 {
        self.height as f32 * self.tile_height
    }

    fn tile_at(&self, x: f32, y: f32, band: ZBand) -> Tile {
        let mut merged = Tile::default();
        let Some(index) = self.cell_at(x, y) else {
            return merged;
        };
        for layer in &self.layers {
            if !ZBand::new(layer.z, self.tile_height).overlaps(band) {
                continue;
            }
            let tile_id = layer.tiles[index];
            if let Some(tile) = self.tileset.get(&tile_id) {
                merged.merge(tile);
            }
        }
        merged
    }

    fn tile_origin(&self, x: f32, y: f32) -> Vec2 {
        Vec2::new(
            (x / self.tile_width).floor() * self.tile_width,
            (y / self.tile_height).floor() * self.tile_height,
        )
    }

    fn shapes(&self) -> &[StaticShape] {
        &self.shapes
    }
}
