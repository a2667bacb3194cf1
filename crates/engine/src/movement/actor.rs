use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::collision::{Collidable, Collider, HitboxSize, Position, SpatialBody};
use crate::map::{MapHandle, MapQuery, MapRegistry};
use crate::world::EntityId;

use super::direction::{pixels_per_tile, Direction};
use super::trigger::{resolve_dispatch, ActionCode, Collision, Trigger, TriggerSink};

/// Placement by pixels, by tile, or both. Tile coordinates win over pixel
/// coordinates on the same axis.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlacementRequest {
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub tile_x: Option<u32>,
    pub tile_y: Option<u32>,
}

/// Observable state handed to presentation and network layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorState {
    pub id: EntityId,
    pub map: String,
    pub position: Position,
    pub direction: Direction,
    pub width: f32,
    pub height: f32,
    pub hitbox: HitboxSize,
    pub speed: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct MapBinding {
    name: String,
    handle: Option<MapHandle>,
}

/// A movable collidable. Position changes go through [`Actor::move_step`] or
/// the explicit placement calls; there is no mutable access to the body.
#[derive(Debug, Clone)]
pub struct Actor {
    pub(super) id: EntityId,
    pub(super) body: SpatialBody,
    pub(super) direction: Direction,
    pub(super) speed: f32,
    map: MapBinding,
    pub(super) can_change_map: bool,
    trigger: Trigger,
    pub(super) events: Vec<Collider>,
    pub(super) collision_with: Vec<Collision>,
}

impl Actor {
    pub fn new(id: EntityId, body: SpatialBody, speed: f32) -> Self {
        Self {
            id,
            body,
            direction: Direction::default(),
            speed,
            map: MapBinding::default(),
            can_change_map: true,
            trigger: Trigger::Inert,
            events: Vec::new(),
            collision_with: Vec::new(),
        }
    }

    pub fn with_trigger(mut self, trigger: Trigger) -> Self {
        self.trigger = trigger;
        self
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn body(&self) -> &SpatialBody {
        &self.body
    }

    pub fn position(&self) -> Position {
        self.body.position()
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn change_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed;
    }

    pub fn can_change_map(&self) -> bool {
        self.can_change_map
    }

    pub fn set_can_change_map(&mut self, can_change_map: bool) {
        self.can_change_map = can_change_map;
    }

    pub fn set_trigger(&mut self, trigger: Trigger) {
        self.trigger = trigger;
    }

    pub fn map_name(&self) -> &str {
        &self.map.name
    }

    pub fn map_handle(&self) -> Option<MapHandle> {
        self.map.handle
    }

    /// Binds the actor to `name` and resolves its handle once. Returns whether
    /// the map is currently registered; an unresolved actor rejects every step.
    pub fn set_map(&mut self, name: impl Into<String>, maps: &MapRegistry) -> bool {
        self.map.name = name.into();
        self.rebind_map(maps)
    }

    /// Re-resolves the handle for the current map name, e.g. after the map was
    /// removed and registered again.
    pub fn rebind_map(&mut self, maps: &MapRegistry) -> bool {
        self.map.handle = maps.resolve(&self.map.name);
        self.map.handle.is_some()
    }

    pub(super) fn resolve_map<'m>(&self, maps: &'m MapRegistry) -> Option<&'m dyn MapQuery> {
        self.map.handle.and_then(|handle| maps.get(handle))
    }

    pub fn events(&self) -> &[Collider] {
        &self.events
    }

    pub fn push_event(&mut self, event: Collider) {
        self.events.push(event);
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    /// Collisions recorded by the most recent step.
    pub fn collision_with(&self) -> &[Collision] {
        &self.collision_with
    }

    /// Replays the last step's collisions with `action`, the "use" button
    /// after bumping into something. Returns how many dispatches fired.
    pub fn trigger_collisions(&self, action: ActionCode, sink: &mut dyn TriggerSink) -> usize {
        let mut fired = 0;
        for collision in &self.collision_with {
            if self.dispatch_collision(collision, action, sink) {
                fired += 1;
            }
        }
        fired
    }

    pub(super) fn dispatch_collision(
        &self,
        collision: &Collision,
        action: ActionCode,
        sink: &mut dyn TriggerSink,
    ) -> bool {
        let Some(dispatch) = resolve_dispatch(collision, self.id, self.can_change_map, action)
        else {
            return false;
        };
        debug!(
            actor = self.id.0,
            target = %collision.target,
            kind = dispatch.kind(),
            "trigger_dispatched"
        );
        sink.dispatch(dispatch);
        true
    }

    /// Tile coordinates need the resolved map's tile size; they are ignored
    /// when the map is unresolved and `false` is returned.
    pub fn set_position(&mut self, request: PlacementRequest, maps: &MapRegistry) -> bool {
        let tile_size = self
            .resolve_map(maps)
            .map(|map| (map.tile_width(), map.tile_height()));
        let needs_tiles = request.tile_x.is_some() || request.tile_y.is_some();

        let mut x = request.x;
        let mut y = request.y;
        if let Some((tile_width, tile_height)) = tile_size {
            if let Some(tile_x) = request.tile_x {
                x = Some(tile_x as f32 * tile_width);
            }
            if let Some(tile_y) = request.tile_y {
                y = Some(tile_y as f32 * tile_height);
            }
        }

        if let Some(x) = x {
            self.body.set_x(x);
        }
        if let Some(y) = y {
            self.body.set_y(y);
        }
        !needs_tiles || tile_size.is_some()
    }

    pub fn set_z(&mut self, z: f32) {
        self.body.set_z(z);
    }

    pub fn set_sizes(&mut self, width: f32, height: f32, hitbox: Option<HitboxSize>) {
        self.body.set_sizes(width, height, hitbox);
    }

    pub fn set_hitbox(&mut self, width: f32, height: f32) {
        self.body.set_hitbox(width, height);
    }

    /// Steps per tile in the current facing; `NaN` when the map is unresolved.
    pub fn pixels_per_tile(&self, maps: &MapRegistry) -> f32 {
        match self.resolve_map(maps) {
            Some(map) => pixels_per_tile(
                self.direction.code(),
                map.tile_width(),
                map.tile_height(),
                self.speed,
            ),
            None => f32::NAN,
        }
    }

    pub fn state(&self) -> ActorState {
        ActorState {
            id: self.id,
            map: self.map.name.clone(),
            position: self.body.position(),
            direction: self.direction,
            width: self.body.width(),
            height: self.body.height(),
            hitbox: self.body.hitbox_size(),
            speed: self.speed,
        }
    }
}

impl Collidable for Actor {
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
