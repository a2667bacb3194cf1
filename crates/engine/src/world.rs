use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::collision::{Collidable, Collider, SpatialBody};
use crate::map::MapRegistry;
use crate::movement::{Actor, Direction, MoveOutcome, Trigger, TriggerSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity#{}", self.0)
    }
}

#[derive(Debug, Default)]
pub struct EntityIdAllocator {
    next: u64,
}

impl EntityIdAllocator {
    pub fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next = self.next.saturating_add(1);
        id
    }
}

/// A collidable that never moves on its own: NPC events, chests, doors.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldObject {
    pub id: EntityId,
    pub map: String,
    pub body: SpatialBody,
    pub trigger: Trigger,
}

impl Collidable for WorldObject {
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

/// Read-only copy of the entities one step may collide with, taken at a
/// single point in time. Nothing keeps it in sync with the live world.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorldSnapshot {
    scoped: Vec<Collider>,
    globals: Vec<Collider>,
}

impl WorldSnapshot {
    pub fn new(scoped: Vec<Collider>, globals: Vec<Collider>) -> Self {
        Self { scoped, globals }
    }

    pub fn scoped(&self) -> &[Collider] {
        &self.scoped
    }

    pub fn globals(&self) -> &[Collider] {
        &self.globals
    }

    pub fn len(&self) -> usize {
        self.scoped.len() + self.globals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory owner of actors, static objects, per-map groups and global
/// events.
#[derive(Debug, Default)]
pub struct World {
    allocator: EntityIdAllocator,
    actors: Vec<Actor>,
    objects: Vec<WorldObject>,
    groups: HashMap<String, Vec<EntityId>>,
    globals: Vec<Collider>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn_actor(
        &mut self,
        body: SpatialBody,
        speed: f32,
        map: &str,
        maps: &MapRegistry,
    ) -> EntityId {
        let id = self.allocator.allocate();
        let mut actor = Actor::new(id, body, speed);
        if !actor.set_map(map, maps) {
            debug!(actor = id.0, map, "actor_map_unresolved");
        }
        self.actors.push(actor);
        self.join_group(id, map);
        id
    }

    pub fn spawn_object(&mut self, body: SpatialBody, trigger: Trigger, map: &str) -> EntityId {
        let id = self.allocator.allocate();
        self.objects.push(WorldObject {
            id,
            map: map.to_string(),
            body,
            trigger,
        });
        self.join_group(id, map);
        id
    }

    /// Global events collide with actors on every map.
    pub fn add_global(&mut self, body: SpatialBody, trigger: Trigger) -> EntityId {
        let id = self.allocator.allocate();
        self.globals.push(Collider { id, body, trigger });
        id
    }

    pub fn despawn(&mut self, id: EntityId) -> bool {
        let before = self.entity_count() + self.globals.len();
        self.actors.retain(|actor| actor.id() != id);
        self.objects.retain(|object| object.id != id);
        self.globals.retain(|global| global.id != id);
        for members in self.groups.values_mut() {
            members.retain(|member| *member != id);
        }
        before != self.entity_count() + self.globals.len()
    }

    pub fn join_group(&mut self, id: EntityId, map: &str) {
        let members = self.groups.entry(map.to_string()).or_default();
        if !members.contains(&id) {
            members.push(id);
        }
    }

    pub fn leave_group(&mut self, id: EntityId, map: &str) -> bool {
        let Some(members) = self.groups.get_mut(map) else {
            return false;
        };
        let before = members.len();
        members.retain(|member| *member != id);
        before != members.len()
    }

    pub fn group(&self, map: &str) -> Option<&[EntityId]> {
        self.groups.get(map).map(Vec::as_slice)
    }

    pub fn actors(&self) -> &[Actor] {
        &self.actors
    }

    pub fn objects(&self) -> &[WorldObject] {
        &self.objects
    }

    pub fn globals(&self) -> &[Collider] {
        &self.globals
    }

    pub fn entity_count(&self) -> usize {
        self.actors.len() + self.objects.len()
    }

    pub fn find_actor(&self, id: EntityId) -> Option<&Actor> {
        self.actors.iter().find(|actor| actor.id() == id)
    }

    pub fn find_actor_mut(&mut self, id: EntityId) -> Option<&mut Actor> {
        self.actors.iter_mut().find(|actor| actor.id() == id)
    }

    pub fn find_object(&self, id: EntityId) -> Option<&WorldObject> {
        self.objects.iter().find(|object| object.id == id)
    }

    fn capture(&self, id: EntityId) -> Option<Collider> {
        if let Some(actor) = self.find_actor(id) {
            return Some(Collider::capture(actor));
        }
        self.find_object(id).map(Collider::capture)
    }

    /// Members of `map`'s group, or every known entity when the map has no
    /// group, plus the global events.
    pub fn snapshot(&self, map: &str) -> WorldSnapshot {
        let scoped = match self.groups.get(map) {
            Some(members) => members.iter().filter_map(|id| self.capture(*id)).collect(),
            None => self
                .actors
                .iter()
                .map(Collider::capture)
                .chain(self.objects.iter().map(Collider::capture))
                .collect(),
        };
        WorldSnapshot::new(scoped, self.globals.clone())
    }

    /// Snapshots the actor's map and steps it once. Actors stepped one after
    /// another each see the positions committed before them.
    pub fn step_actor(
        &mut self,
        id: EntityId,
        direction: Direction,
        maps: &MapRegistry,
        sink: &mut dyn TriggerSink,
    ) -> Option<MoveOutcome> {
        let map = self.find_actor(id)?.map_name().to_string();
        let snapshot = self.snapshot(&map);
        let actor = self.find_actor_mut(id)?;
        Some(actor.move_step(direction, maps, &snapshot, sink))
    }

    /// Moves an actor to another map's group and rebinds its map handle.
    /// Unknown actors and unregistered maps leave the world unchanged.
    pub fn change_actor_map(&mut self, id: EntityId, map: &str, maps: &MapRegistry) -> bool {
        if !maps.contains(map) {
            debug!(actor = id.0, map, "map_change_unknown_map");
            return false;
        }
        let Some(actor) = self.find_actor_mut(id) else {
            return false;
        };
        let previous = actor.map_name().to_string();
        actor.set_map(map, maps);
        self.leave_group(id, &previous);
        self.join_group(id, map);
        info!(actor = id.0, from = %previous, to = map, "actor_map_changed");
        true
    }
}
