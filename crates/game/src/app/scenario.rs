use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tilestep_engine::{
    Aabb, EntityId, HitboxSize, MapRegistry, PlacementRequest, Polygon, Position, Shape,
    ShapeError, ShapeId, ShapeProperties, SpatialBody, StaticShape, Tile, TileLayer, TileMap,
    TileMapError, Trigger, Vec2, World,
};
use tracing::info;

/// Harness fixture: maps, static objects, global events and scripted actors.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Scenario {
    #[serde(default)]
    pub(crate) name: String,
    pub(crate) maps: Vec<MapDef>,
    #[serde(default)]
    pub(crate) objects: Vec<ObjectDef>,
    #[serde(default)]
    pub(crate) globals: Vec<GlobalDef>,
    pub(crate) actors: Vec<ActorDef>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct MapDef {
    pub(crate) name: String,
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) tile_width: f32,
    pub(crate) tile_height: f32,
    #[serde(default)]
    pub(crate) tileset: Vec<TileDef>,
    #[serde(default)]
    pub(crate) layers: Vec<LayerDef>,
    #[serde(default)]
    pub(crate) shapes: Vec<ShapeDef>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct TileDef {
    pub(crate) id: u16,
    #[serde(default)]
    pub(crate) collision: bool,
    #[serde(default)]
    pub(crate) climbable: bool,
    #[serde(default)]
    pub(crate) objects: Vec<GeometryDef>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct LayerDef {
    #[serde(default)]
    pub(crate) z: f32,
    pub(crate) tiles: Vec<u16>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum GeometryDef {
    Box {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
    Polygon {
        points: Vec<[f32; 2]>,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ShapeDef {
    pub(crate) id: u32,
    #[serde(default)]
    pub(crate) name: String,
    pub(crate) geometry: GeometryDef,
    #[serde(default)]
    pub(crate) collision: bool,
    #[serde(default)]
    pub(crate) z: Option<f32>,
    #[serde(default, rename = "go-map")]
    pub(crate) go_map: Option<String>,
    #[serde(default)]
    pub(crate) on_touch: Option<String>,
    #[serde(default)]
    pub(crate) on_action: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ObjectDef {
    pub(crate) map: String,
    pub(crate) x: f32,
    pub(crate) y: f32,
    #[serde(default)]
    pub(crate) z: f32,
    pub(crate) width: f32,
    pub(crate) height: f32,
    #[serde(default)]
    pub(crate) hitbox: Option<HitboxSize>,
    #[serde(default)]
    pub(crate) trigger: Trigger,
}

/// Global event: collides with actors on every map.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct GlobalDef {
    pub(crate) x: f32,
    pub(crate) y: f32,
    #[serde(default)]
    pub(crate) z: f32,
    pub(crate) width: f32,
    pub(crate) height: f32,
    #[serde(default)]
    pub(crate) hitbox: Option<HitboxSize>,
    #[serde(default)]
    pub(crate) trigger: Trigger,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ActorDef {
    pub(crate) name: String,
    pub(crate) map: String,
    #[serde(default)]
    pub(crate) x: f32,
    #[serde(default)]
    pub(crate) y: f32,
    #[serde(default)]
    pub(crate) z: f32,
    #[serde(default)]
    pub(crate) tile_x: Option<u32>,
    #[serde(default)]
    pub(crate) tile_y: Option<u32>,
    pub(crate) width: f32,
    pub(crate) height: f32,
    #[serde(default)]
    pub(crate) hitbox: Option<HitboxSize>,
    pub(crate) speed: f32,
    #[serde(default = "default_can_change_map")]
    pub(crate) can_change_map: bool,
    #[serde(default)]
    pub(crate) trigger: Trigger,
    #[serde(default)]
    pub(crate) moves: Vec<String>,
}

fn default_can_change_map() -> bool {
    true
}

#[derive(Debug, Error)]
pub(crate) enum ScenarioError {
    #[error("failed to read scenario '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse scenario '{path}' at {json_path}: {source}")]
    Parse {
        path: PathBuf,
        json_path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("map '{0}' is defined more than once")]
    DuplicateMap(String),
    #[error("map '{map}': {source}")]
    TileMap {
        map: String,
        #[source]
        source: TileMapError,
    },
    #[error("map '{map}', shape '{shape}': {source}")]
    Shape {
        map: String,
        shape: String,
        #[source]
        source: ShapeError,
    },
    #[error("{owner} references unknown map '{map}'")]
    UnknownMap { owner: String, map: String },
}

/// Reads and parses a scenario file. Parse errors name the failing JSON path.
pub(crate) fn load_scenario(path: &Path) -> Result<Scenario, ScenarioError> {
    let raw = fs::read_to_string(path).map_err(|source| ScenarioError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let scenario = parse_scenario(&raw, path)?;
    info!(
        path = %path.display(),
        scenario = %scenario.name,
        maps = scenario.maps.len(),
        actors = scenario.actors.len(),
        "scenario_loaded"
    );
    Ok(scenario)
}

pub(crate) fn parse_scenario(raw: &str, path: &Path) -> Result<Scenario, ScenarioError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize::<_, Scenario>(&mut deserializer).map_err(|error| {
        let json_path = error.path().to_string();
        ScenarioError::Parse {
            path: path.to_path_buf(),
            json_path,
            source: error.into_inner(),
        }
    })
}

/// Live state built from a scenario. `actors` keeps scenario order and the
/// scripted moves of each actor.
#[derive(Debug)]
pub(crate) struct LoadedScenario {
    pub(crate) maps: MapRegistry,
    pub(crate) world: World,
    pub(crate) actors: Vec<ScriptedActor>,
}

#[derive(Debug, Clone)]
pub(crate) struct ScriptedActor {
    pub(crate) name: String,
    pub(crate) id: EntityId,
    pub(crate) moves: Vec<String>,
}

pub(crate) fn build_world(scenario: &Scenario) -> Result<LoadedScenario, ScenarioError> {
    let mut maps = MapRegistry::new();
    let mut seen = HashSet::new();
    for def in &scenario.maps {
        if !seen.insert(def.name.as_str()) {
            return Err(ScenarioError::DuplicateMap(def.name.clone()));
        }
        maps.insert(def.name.clone(), build_map(def)?);
    }

    let mut world = World::new();
    for (index, def) in scenario.objects.iter().enumerate() {
        ensure_map(&maps, &def.map, || format!("object #{index}"))?;
        let position = Position::new(def.x, def.y, def.z);
        let body = static_body(position, def.width, def.height, def.hitbox);
        world.spawn_object(body, def.trigger.clone(), &def.map);
    }
    for def in &scenario.globals {
        let position = Position::new(def.x, def.y, def.z);
        let body = static_body(position, def.width, def.height, def.hitbox);
        world.add_global(body, def.trigger.clone());
    }

    let mut actors = Vec::with_capacity(scenario.actors.len());
    for def in &scenario.actors {
        ensure_map(&maps, &def.map, || format!("actor '{}'", def.name))?;
        let mut body = SpatialBody::new(Position::new(def.x, def.y, def.z), def.width, def.height);
        if let Some(hitbox) = def.hitbox {
            body.set_hitbox(hitbox.width, hitbox.height);
        }
        let id = world.spawn_actor(body, def.speed, &def.map, &maps);
        if let Some(actor) = world.find_actor_mut(id) {
            actor.set_can_change_map(def.can_change_map);
            actor.set_trigger(def.trigger.clone());
            actor.set_position(
                PlacementRequest {
                    tile_x: def.tile_x,
                    tile_y: def.tile_y,
                    ..PlacementRequest::default()
                },
                &maps,
            );
        }
        actors.push(ScriptedActor {
            name: def.name.clone(),
            id,
            moves: def.moves.clone(),
        });
    }

    info!(
        maps = maps.len(),
        entities = world.entity_count(),
        globals = world.globals().len(),
        "world_built"
    );
    Ok(LoadedScenario {
        maps,
        world,
        actors,
    })
}

fn ensure_map(
    maps: &MapRegistry,
    map: &str,
    owner: impl FnOnce() -> String,
) -> Result<(), ScenarioError> {
    if maps.contains(map) {
        Ok(())
    } else {
        Err(ScenarioError::UnknownMap {
            owner: owner(),
            map: map.to_string(),
        })
    }
}

fn static_body(
    position: Position,
    width: f32,
    height: f32,
    hitbox: Option<HitboxSize>,
) -> SpatialBody {
    let body = SpatialBody::new(position, width, height);
    match hitbox {
        Some(hitbox) => body.with_hitbox(hitbox.width, hitbox.height),
        None => body,
    }
}

fn build_map(def: &MapDef) -> Result<TileMap, ScenarioError> {
    let shape_err = |shape: String| {
        let map = def.name.clone();
        move |source| ScenarioError::Shape { map, shape, source }
    };

    let mut tileset = Vec::with_capacity(def.tileset.len());
    for tile in &def.tileset {
        let mut object_groups = Vec::with_capacity(tile.objects.len());
        for geometry in &tile.objects {
            let shape = build_geometry(geometry)
                .and_then(|shape| shape.validate().map(|()| shape))
                .map_err(shape_err(format!("tile {}", tile.id)))?;
            object_groups.push(shape);
        }
        tileset.push((
            tile.id,
            Tile {
                has_collision: tile.collision,
                is_climbable: tile.climbable,
                object_groups,
            },
        ));
    }

    let layers = def
        .layers
        .iter()
        .map(|layer| TileLayer::new(layer.z, layer.tiles.clone()))
        .collect();
    let mut map = TileMap::new(
        def.width,
        def.height,
        def.tile_width,
        def.tile_height,
        tileset,
        layers,
    )
    .map_err(|source| ScenarioError::TileMap {
        map: def.name.clone(),
        source,
    })?;

    for shape in &def.shapes {
        let label = if shape.name.is_empty() {
            format!("#{}", shape.id)
        } else {
            shape.name.clone()
        };
        let properties = ShapeProperties {
            collision: shape.collision,
            z: shape.z,
            go_map: shape.go_map.clone(),
            on_touch: shape.on_touch.clone(),
            on_action: shape.on_action.clone(),
        };
        let static_shape = build_geometry(&shape.geometry)
            .and_then(|hitbox| {
                StaticShape::new(ShapeId(shape.id), label.clone(), hitbox, properties)
            })
            .map_err(shape_err(label))?;
        map.push_shape(static_shape);
    }
    Ok(map)
}

fn build_geometry(def: &GeometryDef) -> Result<Shape, ShapeError> {
    match def {
        GeometryDef::Box {
            x,
            y,
            width,
            height,
        } => Ok(Shape::Box(Aabb::new(*x, *y, *width, *height))),
        GeometryDef::Polygon { points } => {
            let points = points.iter().map(|[x, y]| Vec2::new(*x, *y)).collect();
            Polygon::new(points).map(Shape::Polygon)
        }
    }
}
