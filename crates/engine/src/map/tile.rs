use std::fmt;

use serde::{Deserialize, Serialize};

use crate::collision::{Shape, ShapeError, Vec2, ZBand};
use crate::movement::{EventHandlers, Trigger};

/// Collision data of one tile cell, merged across every layer that was
/// queried. `object_groups` are in tile-local coordinates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tile {
    pub has_collision: bool,
    pub is_climbable: bool,
    pub object_groups: Vec<Shape>,
}

impl Tile {
    pub fn blocking() -> Self {
        Self {
            has_collision: true,
            ..Self::default()
        }
    }

    pub fn climbable() -> Self {
        Self {
            is_climbable: true,
            ..Self::default()
        }
    }

    pub fn with_objects(object_groups: Vec<Shape>) -> Self {
        Self {
            object_groups,
            ..Self::default()
        }
    }

    pub(crate) fn merge(&mut self, other: &Tile) {
        self.has_collision |= other.has_collision;
        self.is_climbable |= other.is_climbable;
        self.object_groups
            .extend(other.object_groups.iter().cloned());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShapeId(pub u32);

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "shape#{}", self.0)
    }
}

/// Authored properties of a static shape. `collision` makes it a wall;
/// without it the shape is a pure trigger region.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShapeProperties {
    pub collision: bool,
    pub z: Option<f32>,
    pub go_map: Option<String>,
    pub on_touch: Option<String>,
    pub on_action: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StaticShape {
    id: ShapeId,
    name: String,
    hitbox: Shape,
    properties: ShapeProperties,
    trigger: Trigger,
}

impl StaticShape {
    pub fn new(
        id: ShapeId,
        name: impl Into<String>,
        hitbox: Shape,
        properties: ShapeProperties,
    ) -> Result<Self, ShapeError> {
        hitbox.validate()?;
        let trigger = trigger_for_properties(&properties);
        Ok(Self {
            id,
            name: name.into(),
            hitbox,
            properties,
            trigger,
        })
    }

    pub fn id(&self) -> ShapeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn hitbox(&self) -> &Shape {
        &self.hitbox
    }

    pub fn properties(&self) -> &ShapeProperties {
        &self.properties
    }

    pub fn is_blocking(&self) -> bool {
        self.properties.collision
    }

    pub fn trigger(&self) -> &Trigger {
        &self.trigger
    }

    /// Shapes without a `z` property exist on every layer.
    pub fn z_band(&self, layer_height: f32) -> Option<ZBand> {
        self.properties.z.map(|z| ZBand::new(z, layer_height))
    }
}

fn trigger_for_properties(properties: &ShapeProperties) -> Trigger {
    let handlers = EventHandlers {
        on_action: properties.on_action.clone(),
        on_touch: properties.on_touch.clone(),
    };
    if !handlers.is_empty() {
        return Trigger::Shape {
            handlers,
            go_map: properties.go_map.clone(),
        };
    }
    match &properties.go_map {
        Some(target_map) => Trigger::MapTransition {
            target_map: target_map.clone(),
        },
        None => Trigger::Inert,
    }
}

/// Read-only view of a loaded map, in pixel space.
pub trait MapQuery: fmt::Debug {
    fn tile_width(&self) -> f32;
    fn tile_height(&self) -> f32;
    fn width_px(&self) -> f32;
    fn height_px(&self) -> f32;
    /// Tile under `(x, y)` restricted to layers overlapping `band`. Positions
    /// outside the grid yield an empty tile.
    fn tile_at(&self, x: f32, y: f32, band: ZBand) -> Tile;
    fn tile_origin(&self, x: f32, y: f32) -> Vec2;
    fn shapes(&self) -> &[StaticShape];
}
