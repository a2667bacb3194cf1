use tracing::{debug, trace};

use crate::collision::{intersects, Aabb, Position, Shape, ZBand};
use crate::map::{MapQuery, MapRegistry, ShapeId};
use crate::world::{EntityId, WorldSnapshot};

use super::actor::Actor;
use super::direction::Direction;
use super::trigger::{ActionCode, Collision, CollisionTarget, TriggerSink};

/// Result of one step. Only `Moved` and `Climbed` count as a successful move;
/// `Clamped` still wrote the clamped axis back to the actor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MoveOutcome {
    Moved { position: Position },
    Climbed { z: f32 },
    Clamped { position: Position },
    Blocked(BlockReason),
}

impl MoveOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, MoveOutcome::Moved { .. } | MoveOutcome::Climbed { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BlockReason {
    MapUnresolved,
    TileCollision { x: f32, y: f32 },
    TileObject { x: f32, y: f32 },
    Entity(EntityId),
    Shape(ShapeId),
}

impl Actor {
    /// Resolves one step in `direction` against the actor's map, the entities
    /// in `world` and the map's static shapes. Position is written only on
    /// commit or on a boundary clamp; every other rejection leaves it intact.
    ///
    /// `world` is read as given. Several actors stepped against the same
    /// snapshot do not see each other's moves.
    pub fn move_step(
        &mut self,
        direction: Direction,
        maps: &MapRegistry,
        world: &WorldSnapshot,
        sink: &mut dyn TriggerSink,
    ) -> MoveOutcome {
        self.collision_with.clear();
        self.direction = direction;

        let current = self.body.position();
        let (dx, dy) = direction.step_offset(self.speed);
        let next = Position::new(current.x + dx, current.y + dy, current.z);

        let Some(map) = self.resolve_map(maps) else {
            return self.reject(BlockReason::MapUnresolved);
        };

        if let Some(outcome) = self.clamp_to_bounds(map, next) {
            return outcome;
        }

        let hitbox = self.body.hitbox_at(next.x, next.y);
        let band = self.body.z_band_at(next.z);
        let climbable = match probe_tiles(map, &hitbox, band) {
            Ok(climbable) => climbable,
            Err(reason) => return self.reject(reason),
        };

        let candidate = Shape::Box(hitbox);
        if let Some((id, collision)) = self.find_dynamic_collision(world, &candidate, band) {
            self.record_collision(collision, sink);
            return self.reject(BlockReason::Entity(id));
        }

        let layer_height = map.tile_height();
        for shape in map.shapes() {
            if let Some(shape_band) = shape.z_band(layer_height) {
                if !band.overlaps(shape_band) {
                    continue;
                }
            }
            if !intersects(&candidate, shape.hitbox()) {
                continue;
            }
            self.record_collision(
                Collision {
                    target: CollisionTarget::Shape(shape.id()),
                    trigger: shape.trigger().clone(),
                },
                sink,
            );
            if shape.is_blocking() {
                return self.reject(BlockReason::Shape(shape.id()));
            }
        }

        self.commit(direction, next, climbable)
    }

    fn clamp_to_bounds(&mut self, map: &dyn MapQuery, next: Position) -> Option<MoveOutcome> {
        let max_x = map.width_px() - self.body.width();
        let max_y = map.height_px() - self.body.height();

        if next.x < 0.0 {
            self.body.set_x(0.0);
        } else if next.y < 0.0 {
            self.body.set_y(0.0);
        } else if next.x > max_x {
            self.body.set_x(max_x);
        } else if next.y > max_y {
            self.body.set_y(max_y);
        } else {
            return None;
        }

        let position = self.body.position();
        debug!(
            actor = self.id.0,
            direction = %self.direction,
            x = position.x,
            y = position.y,
            "move_clamped"
        );
        Some(MoveOutcome::Clamped { position })
    }

    fn find_dynamic_collision(
        &self,
        world: &WorldSnapshot,
        candidate: &Shape,
        band: ZBand,
    ) -> Option<(EntityId, Collision)> {
        world
            .scoped()
            .iter()
            .chain(self.events.iter())
            .chain(world.globals().iter())
            .filter(|other| other.id != self.id)
            .find(|other| {
                band.overlaps(other.body.z_band())
                    && intersects(candidate, &Shape::Box(other.body.hitbox()))
            })
            .map(|other| {
                let collision = Collision {
                    target: CollisionTarget::Entity(other.id),
                    trigger: other.trigger.clone(),
                };
                (other.id, collision)
            })
    }

    fn record_collision(&mut self, collision: Collision, sink: &mut dyn TriggerSink) {
        self.dispatch_collision(&collision, ActionCode::Idle, sink);
        self.collision_with.push(collision);
    }

    fn commit(&mut self, direction: Direction, next: Position, climbable: bool) -> MoveOutcome {
        let outcome = match direction {
            Direction::Up | Direction::Down if climbable => {
                let delta = if direction == Direction::Up {
                    self.speed
                } else {
                    -self.speed
                };
                let z = self.body.position().z + delta;
                self.body.set_z(z);
                MoveOutcome::Climbed { z }
            }
            Direction::Left | Direction::Right => {
                self.body.set_x(next.x);
                MoveOutcome::Moved {
                    position: self.body.position(),
                }
            }
            Direction::Up | Direction::Down => {
                self.body.set_y(next.y);
                MoveOutcome::Moved {
                    position: self.body.position(),
                }
            }
        };
        trace!(actor = self.id.0, direction = %direction, outcome = ?outcome, "move_committed");
        outcome
    }

    fn reject(&self, reason: BlockReason) -> MoveOutcome {
        debug!(
            actor = self.id.0,
            direction = %self.direction,
            reason = ?reason,
            "move_rejected"
        );
        MoveOutcome::Blocked(reason)
    }
}

/// Checks the four hitbox corners against the tile grid. Returns whether any
/// visited tile was climbable, or the first blocking corner.
fn probe_tiles(map: &dyn MapQuery, hitbox: &Aabb, band: ZBand) -> Result<bool, BlockReason> {
    let candidate = Shape::Box(*hitbox);
    let mut climbable = false;
    for corner in hitbox.corners() {
        let tile = map.tile_at(corner.x, corner.y, band);
        if tile.has_collision {
            return Err(BlockReason::TileCollision {
                x: corner.x,
                y: corner.y,
            });
        }
        if !tile.object_groups.is_empty() {
            let origin = map.tile_origin(corner.x, corner.y);
            let blocked = tile
                .object_groups
                .iter()
                .any(|object| intersects(&object.translated(origin), &candidate));
            if blocked {
                return Err(BlockReason::TileObject {
                    x: corner.x,
                    y: corner.y,
                });
            }
        }
        climbable |= tile.is_climbable;
    }
    Ok(climbable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::{Collider, Polygon, SpatialBody, Vec2};
    use crate::map::{ShapeProperties, StaticShape, Tile, TileLayer, TileMap};
    use crate::movement::{Dispatch, EventHandlers, Trigger};

    const WALL: u16 = 1;
    const LADDER: u16 = 2;
    const LAMP: u16 = 3;

    fn open_field() -> TileMap {
        TileMap::new(10, 10, 10.0, 10.0, Vec::<(u16, Tile)>::new(), Vec::new()).expect("map")
    }

    fn registry_with(map: TileMap) -> MapRegistry {
        let mut maps = MapRegistry::new();
        maps.insert("field", map);
        maps
    }

    fn actor_at(maps: &MapRegistry, x: f32, y: f32) -> Actor {
        let mut actor = Actor::new(
            EntityId(1),
            SpatialBody::new(Position::new(x, y, 0.0), 8.0, 8.0),
            2.0,
        );
        actor.set_map("field", maps);
        actor
    }

    fn collider(id: u64, x: f32, y: f32, z: f32, trigger: Trigger) -> Collider {
        Collider {
            id: EntityId(id),
            body: SpatialBody::new(Position::new(x, y, z), 8.0, 16.0),
            trigger,
        }
    }

    fn step(actor: &mut Actor, direction: Direction, maps: &MapRegistry) -> MoveOutcome {
        actor.move_step(direction, maps, &WorldSnapshot::default(), &mut ())
    }

    #[test]
    fn free_steps_move_by_speed_along_axis() {
        let maps = registry_with(open_field());
        let expected = [
            (Direction::Down, (50.0, 52.0)),
            (Direction::Left, (48.0, 50.0)),
            (Direction::Right, (52.0, 50.0)),
            (Direction::Up, (50.0, 48.0)),
        ];
        for (direction, (x, y)) in expected {
            let mut actor = actor_at(&maps, 50.0, 50.0);
            let outcome = step(&mut actor, direction, &maps);
            assert!(outcome.is_committed(), "{direction} should move");
            assert_eq!(actor.position(), Position::new(x, y, 0.0));
            assert_eq!(actor.direction(), direction);
        }
    }

    #[test]
    fn right_from_origin_moves_two_pixels() {
        let maps = registry_with(open_field());
        let mut actor = actor_at(&maps, 0.0, 0.0);
        let outcome = step(&mut actor, Direction::Right, &maps);
        assert_eq!(
            outcome,
            MoveOutcome::Moved {
                position: Position::new(2.0, 0.0, 0.0)
            }
        );
    }

    #[test]
    fn leaving_the_map_clamps_and_rejects() {
        let maps = registry_with(open_field());
        let mut actor = actor_at(&maps, 0.0, 0.0);
        let outcome = step(&mut actor, Direction::Left, &maps);
        assert!(!outcome.is_committed());
        assert_eq!(actor.position(), Position::new(0.0, 0.0, 0.0));

        let mut actor = actor_at(&maps, 91.0, 30.0);
        let outcome = step(&mut actor, Direction::Right, &maps);
        assert_eq!(
            outcome,
            MoveOutcome::Clamped {
                position: Position::new(92.0, 30.0, 0.0)
            }
        );
        assert_eq!(actor.body().hitbox().origin.x, 92.0);

        let mut actor = actor_at(&maps, 30.0, 1.0);
        step(&mut actor, Direction::Up, &maps);
        assert_eq!(actor.position(), Position::new(30.0, 0.0, 0.0));
    }

    #[test]
    fn bottom_edge_clamps_to_max_y() {
        let maps = registry_with(open_field());
        let mut actor = actor_at(&maps, 30.0, 91.0);
        let outcome = step(&mut actor, Direction::Down, &maps);
        assert_eq!(
            outcome,
            MoveOutcome::Clamped {
                position: Position::new(30.0, 92.0, 0.0)
            }
        );
        assert!(!outcome.is_committed());
        assert_eq!(actor.body().hitbox().origin.y, 92.0);
    }

    #[test]
    fn unresolved_map_rejects_without_mutation() {
        let maps = MapRegistry::new();
        let mut actor = actor_at(&maps, 5.0, 5.0);
        let outcome = step(&mut actor, Direction::Right, &maps);
        assert_eq!(outcome, MoveOutcome::Blocked(BlockReason::MapUnresolved));
        assert_eq!(actor.position(), Position::new(5.0, 5.0, 0.0));
    }

    #[test]
    fn tile_collision_leaves_position_untouched() {
        let mut tiles = vec![0; 100];
        tiles[1] = WALL;
        let map = TileMap::new(
            10,
            10,
            10.0,
            10.0,
            vec![(WALL, Tile::blocking())],
            vec![TileLayer::new(0.0, tiles)],
        )
        .expect("map");
        let maps = registry_with(map);
        let mut actor = actor_at(&maps, 1.5, 0.0);
        let before = actor.position();

        let outcome = step(&mut actor, Direction::Right, &maps);
        assert!(matches!(
            outcome,
            MoveOutcome::Blocked(BlockReason::TileCollision { .. })
        ));
        assert_eq!(actor.position().x.to_bits(), before.x.to_bits());
        assert_eq!(actor.position().y.to_bits(), before.y.to_bits());
    }

    #[test]
    fn tile_on_other_layer_does_not_block() {
        let mut tiles = vec![0; 100];
        tiles[1] = WALL;
        let map = TileMap::new(
            10,
            10,
            10.0,
            10.0,
            vec![(WALL, Tile::blocking())],
            vec![TileLayer::new(20.0, tiles)],
        )
        .expect("map");
        let maps = registry_with(map);
        let mut actor = actor_at(&maps, 1.5, 0.0);
        assert!(step(&mut actor, Direction::Right, &maps).is_committed());
    }

    #[test]
    fn tile_objects_are_tested_at_tile_origin() {
        let mut tiles = vec![0; 100];
        tiles[1] = LAMP;
        let lamp = Shape::Box(Aabb::new(6.0, 0.0, 4.0, 4.0));
        let map = TileMap::new(
            10,
            10,
            10.0,
            10.0,
            vec![(LAMP, Tile::with_objects(vec![lamp]))],
            vec![TileLayer::new(0.0, tiles)],
        )
        .expect("map");
        let maps = registry_with(map);

        let mut actor = actor_at(&maps, 2.0, 0.0);
        assert!(step(&mut actor, Direction::Right, &maps).is_committed());

        let mut actor = actor_at(&maps, 8.0, 0.0);
        let outcome = step(&mut actor, Direction::Right, &maps);
        assert!(matches!(
            outcome,
            MoveOutcome::Blocked(BlockReason::TileObject { .. })
        ));
        assert_eq!(actor.position().x, 8.0);
    }

    #[test]
    fn dynamic_collision_blocks_and_dispatches_touch() {
        let maps = registry_with(open_field());
        let mut actor = actor_at(&maps, 10.0, 10.0);
        let npc = collider(
            2,
            19.0,
            10.0,
            0.0,
            Trigger::Actor {
                handlers: EventHandlers {
                    on_action: None,
                    on_touch: Some("npc.greet".to_string()),
                },
            },
        );
        let world = WorldSnapshot::new(vec![npc], Vec::new());
        let mut sink = Vec::new();

        let outcome = actor.move_step(Direction::Right, &maps, &world, &mut sink);
        assert_eq!(outcome, MoveOutcome::Blocked(BlockReason::Entity(EntityId(2))));
        assert_eq!(actor.position().x, 10.0);
        assert_eq!(actor.collision_with().len(), 1);
        assert_eq!(
            sink,
            vec![Dispatch::Touch {
                actor: EntityId(1),
                target: CollisionTarget::Entity(EntityId(2)),
                handler: "npc.greet".to_string(),
            }]
        );
    }

    #[test]
    fn separated_z_bands_do_not_block() {
        let maps = registry_with(open_field());
        let mut actor = Actor::new(
            EntityId(1),
            SpatialBody::new(Position::new(10.0, 10.0, 0.0), 8.0, 16.0),
            2.0,
        );
        actor.set_map("field", &maps);
        let above = collider(2, 11.0, 10.0, 32.0, Trigger::Inert);
        let world = WorldSnapshot::new(vec![above], Vec::new());

        let outcome = actor.move_step(Direction::Right, &maps, &world, &mut ());
        assert!(outcome.is_committed());
        assert!(actor.collision_with().is_empty());
    }

    #[test]
    fn self_in_snapshot_is_ignored() {
        let maps = registry_with(open_field());
        let mut actor = actor_at(&maps, 10.0, 10.0);
        let me = Collider::capture(&actor);
        let world = WorldSnapshot::new(vec![me.clone()], vec![me]);
        assert!(actor
            .move_step(Direction::Down, &maps, &world, &mut ())
            .is_committed());
    }

    #[test]
    fn local_events_and_globals_join_the_candidate_set() {
        let maps = registry_with(open_field());

        let mut actor = actor_at(&maps, 10.0, 10.0);
        actor.push_event(collider(5, 10.0, 19.0, 0.0, Trigger::Inert));
        let outcome = step(&mut actor, Direction::Down, &maps);
        assert_eq!(outcome, MoveOutcome::Blocked(BlockReason::Entity(EntityId(5))));

        let mut actor = actor_at(&maps, 10.0, 10.0);
        let global = collider(6, 3.0, 10.0, 0.0, Trigger::Inert);
        let world = WorldSnapshot::new(Vec::new(), vec![global]);
        let outcome = actor.move_step(Direction::Left, &maps, &world, &mut ());
        assert_eq!(outcome, MoveOutcome::Blocked(BlockReason::Entity(EntityId(6))));
    }

    #[test]
    fn non_blocking_map_transition_moves_and_dispatches() {
        let portal = StaticShape::new(
            ShapeId(1),
            "to-town",
            Shape::Box(Aabb::new(10.0, 0.0, 10.0, 10.0)),
            ShapeProperties {
                go_map: Some("town".to_string()),
                ..ShapeProperties::default()
            },
        )
        .expect("shape");
        let maps = registry_with(open_field().with_shapes(vec![portal]));
        let mut actor = actor_at(&maps, 1.0, 0.0);
        let mut sink = Vec::new();

        let empty = WorldSnapshot::default();
        let outcome = actor.move_step(Direction::Right, &maps, &empty, &mut sink);
        assert!(outcome.is_committed());
        assert_eq!(actor.position().x, 3.0);
        assert_eq!(actor.collision_with().len(), 1);
        assert_eq!(
            sink,
            vec![Dispatch::MapTransition {
                actor: EntityId(1),
                target: CollisionTarget::Shape(ShapeId(1)),
                map: "town".to_string(),
            }]
        );

        actor.set_can_change_map(false);
        let mut sink = Vec::new();
        actor.move_step(Direction::Right, &maps, &empty, &mut sink);
        assert!(sink.is_empty());
        assert_eq!(actor.collision_with().len(), 1);
    }

    #[test]
    fn trigger_shape_does_not_stop_the_shape_scan() {
        let portal = StaticShape::new(
            ShapeId(1),
            "to-cellar",
            Shape::Box(Aabb::new(10.0, 0.0, 10.0, 10.0)),
            ShapeProperties {
                go_map: Some("cellar".to_string()),
                ..ShapeProperties::default()
            },
        )
        .expect("portal");
        let door = StaticShape::new(
            ShapeId(2),
            "locked-door",
            Shape::Box(Aabb::new(10.0, 0.0, 10.0, 10.0)),
            ShapeProperties {
                collision: true,
                ..ShapeProperties::default()
            },
        )
        .expect("door");
        let maps = registry_with(open_field().with_shapes(vec![portal, door]));
        let mut actor = actor_at(&maps, 1.0, 0.0);
        let mut sink = Vec::new();

        let empty = WorldSnapshot::default();
        let outcome = actor.move_step(Direction::Right, &maps, &empty, &mut sink);
        assert_eq!(outcome, MoveOutcome::Blocked(BlockReason::Shape(ShapeId(2))));
        assert_eq!(actor.position(), Position::new(1.0, 0.0, 0.0));
        let targets: Vec<_> = actor
            .collision_with()
            .iter()
            .map(|collision| collision.target)
            .collect();
        assert_eq!(
            targets,
            vec![
                CollisionTarget::Shape(ShapeId(1)),
                CollisionTarget::Shape(ShapeId(2))
            ]
        );
        assert_eq!(
            sink,
            vec![Dispatch::MapTransition {
                actor: EntityId(1),
                target: CollisionTarget::Shape(ShapeId(1)),
                map: "cellar".to_string(),
            }]
        );
    }

    #[test]
    fn blocking_polygon_shape_rejects() {
        let ramp = Polygon::new(vec![
            Vec2::new(12.0, 0.0),
            Vec2::new(30.0, 0.0),
            Vec2::new(12.0, 20.0),
        ])
        .expect("polygon");
        let wall = StaticShape::new(
            ShapeId(9),
            "ramp",
            Shape::Polygon(ramp),
            ShapeProperties {
                collision: true,
                ..ShapeProperties::default()
            },
        )
        .expect("shape");
        let maps = registry_with(open_field().with_shapes(vec![wall]));

        let mut actor = actor_at(&maps, 2.0, 0.0);
        assert!(step(&mut actor, Direction::Right, &maps).is_committed());
        let outcome = step(&mut actor, Direction::Right, &maps);
        assert_eq!(outcome, MoveOutcome::Blocked(BlockReason::Shape(ShapeId(9))));
        assert_eq!(actor.position().x, 4.0);
    }

    #[test]
    fn shape_on_other_layer_is_skipped() {
        let wall = StaticShape::new(
            ShapeId(2),
            "balcony",
            Shape::Box(Aabb::new(10.0, 0.0, 10.0, 10.0)),
            ShapeProperties {
                collision: true,
                z: Some(10.0),
                ..ShapeProperties::default()
            },
        )
        .expect("shape");
        let maps = registry_with(open_field().with_shapes(vec![wall]));
        let mut actor = actor_at(&maps, 1.0, 0.0);
        assert!(step(&mut actor, Direction::Right, &maps).is_committed());

        actor.set_z(10.0);
        let outcome = step(&mut actor, Direction::Right, &maps);
        assert_eq!(outcome, MoveOutcome::Blocked(BlockReason::Shape(ShapeId(2))));
    }

    #[test]
    fn climbable_tile_changes_layer_instead_of_moving() {
        let map = TileMap::new(
            10,
            10,
            10.0,
            10.0,
            vec![(LADDER, Tile::climbable())],
            vec![TileLayer::new(0.0, vec![LADDER; 100])],
        )
        .expect("map");
        let maps = registry_with(map);
        let mut actor = actor_at(&maps, 20.0, 20.0);
        actor.set_z(4.0);

        let outcome = step(&mut actor, Direction::Up, &maps);
        assert_eq!(outcome, MoveOutcome::Climbed { z: 6.0 });
        assert_eq!(actor.position(), Position::new(20.0, 20.0, 6.0));

        let outcome = step(&mut actor, Direction::Down, &maps);
        assert_eq!(outcome, MoveOutcome::Climbed { z: 4.0 });
        assert_eq!(actor.position(), Position::new(20.0, 20.0, 4.0));

        assert!(step(&mut actor, Direction::Left, &maps).is_committed());
        assert_eq!(actor.position(), Position::new(18.0, 20.0, 4.0));
    }

    #[test]
    fn collision_list_is_cleared_each_step() {
        let maps = registry_with(open_field());
        let mut actor = actor_at(&maps, 10.0, 10.0);
        let npc = collider(2, 19.0, 10.0, 0.0, Trigger::Inert);
        let world = WorldSnapshot::new(vec![npc], Vec::new());
        actor.move_step(Direction::Right, &maps, &world, &mut ());
        assert_eq!(actor.collision_with().len(), 1);
        actor.move_step(Direction::Left, &maps, &world, &mut ());
        assert!(actor.collision_with().is_empty());
    }

    #[test]
    fn shared_snapshot_allows_stale_overlap() {
        let maps = registry_with(open_field());
        let mut left = actor_at(&maps, 10.0, 10.0);
        let mut right = Actor::new(
            EntityId(2),
            SpatialBody::new(Position::new(20.0, 10.0, 0.0), 8.0, 8.0),
            2.0,
        );
        right.set_map("field", &maps);

        let snapshot = WorldSnapshot::new(
            vec![Collider::capture(&left), Collider::capture(&right)],
            Vec::new(),
        );
        assert!(left
            .move_step(Direction::Right, &maps, &snapshot, &mut ())
            .is_committed());
        assert!(right
            .move_step(Direction::Left, &maps, &snapshot, &mut ())
            .is_committed());
        assert!(left.body().hitbox().overlaps(&right.body().hitbox()));
    }
}
