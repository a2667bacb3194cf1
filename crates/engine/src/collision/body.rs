use serde::{Deserialize, Serialize};

use crate::movement::Trigger;
use crate::world::EntityId;

use super::shape::{Aabb, ZBand};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Position {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HitboxSize {
    pub width: f32,
    pub height: f32,
}

/// Position, visual extents and hitbox of anything that occupies space.
///
/// Only the hitbox *size* is stored. Its anchor is read from `position` on
/// every query, so moving the body can never leave a stale hitbox behind.
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialBody {
    position: Position,
    width: f32,
    height: f32,
    hitbox: HitboxSize,
}

impl SpatialBody {
    pub fn new(position: Position, width: f32, height: f32) -> Self {
        Self {
            position,
            width,
            height,
            hitbox: HitboxSize { width, height },
        }
    }

    pub fn with_hitbox(mut self, width: f32, height: f32) -> Self {
        self.set_hitbox(width, height);
        self
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn set_x(&mut self, x: f32) {
        self.position.x = x;
    }

    pub fn set_y(&mut self, y: f32) {
        self.position.y = y;
    }

    pub fn set_z(&mut self, z: f32) {
        self.position.z = z;
    }

    pub fn set_xy(&mut self, x: f32, y: f32) {
        self.position.x = x;
        self.position.y = y;
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    /// Changes the visual extents only. The hitbox keeps its own size.
    pub fn resize(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
    }

    pub fn set_sizes(&mut self, width: f32, height: f32, hitbox: Option<HitboxSize>) {
        self.resize(width, height);
        if let Some(hitbox) = hitbox {
            self.hitbox = hitbox;
        }
    }

    pub fn hitbox_size(&self) -> HitboxSize {
        self.hitbox
    }

    pub fn set_hitbox(&mut self, width: f32, height: f32) {
        self.hitbox = HitboxSize { width, height };
    }

    pub fn hitbox_width(&self) -> f32 {
        self.hitbox.width
    }

    pub fn hitbox_height(&self) -> f32 {
        self.hitbox.height
    }

    pub fn set_hitbox_width(&mut self, width: f32) {
        self.hitbox.width = width;
    }

    pub fn set_hitbox_height(&mut self, height: f32) {
        self.hitbox.height = height;
    }

    pub fn hitbox(&self) -> Aabb {
        self.hitbox_at(self.position.x, self.position.y)
    }

    pub fn hitbox_at(&self, x: f32, y: f32) -> Aabb {
        Aabb::new(x, y, self.hitbox.width, self.hitbox.height)
    }

    pub fn z_band(&self) -> ZBand {
        self.z_band_at(self.position.z)
    }

    pub fn z_band_at(&self, z: f32) -> ZBand {
        ZBand::new(z, self.height)
    }
}

/// Capability shared by everything the resolver can bump into.
pub trait Collidable {
    fn id(&self) -> EntityId;
    fn body(&self) -> &SpatialBody;
    fn trigger(&self) -> &Trigger;
}

/// Frozen copy of a collidable, as seen at snapshot time.
#[derive(Debug, Clone, PartialEq)]
pub struct Collider {
    pub id: EntityId,
    pub body: SpatialBody,
    pub trigger: Trigger,
}

impl Collider {
    pub fn capture<C: Collidable + ?Sized>(source: &C) -> Self {
        Self {
            id: source.id(),
            body: source.body().clone(),
            trigger: source.trigger().clone(),
        }
    }
}

impl Collidable for Collider {
    fn id(&self) -> EntityId {
        self.id
    }

    fn body(&self) -> &SpatialBody {
        &self.body
    }

    fn trigger(&self) -> &Trigger {
        &self.trigger
    }
}
