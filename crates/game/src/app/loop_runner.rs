use std::process::ExitCode;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;
use tilestep_engine::{
    ActionCode, ActorState, Direction, Dispatch, MapRegistry, MoveOutcome, Position, World,
};
use tracing::{error, info, warn};

use super::bootstrap::{load_config, resolve_app_paths, SimConfig, StartupError};
use super::scenario::{build_world, load_scenario, LoadedScenario, ScenarioError};

#[derive(Debug, Error)]
pub(crate) enum HarnessError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error(transparent)]
    Scenario(#[from] ScenarioError),
    #[error("failed to encode run summary: {0}")]
    Summary(#[source] serde_json::Error),
}

/// One scripted input: a step in a direction, or the "use" button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Command {
    Step(Direction),
    Action,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        if raw.trim().eq_ignore_ascii_case("action") {
            return Ok(Command::Action);
        }
        raw.parse::<Direction>()
            .map(Command::Step)
            .map_err(|error| error.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct DispatchRecord {
    pub(crate) kind: &'static str,
    pub(crate) target: String,
    pub(crate) detail: String,
}

impl From<&Dispatch> for DispatchRecord {
    fn from(dispatch: &Dispatch) -> Self {
        let detail = match dispatch {
            Dispatch::Action { handler, .. } | Dispatch::Touch { handler, .. } => handler.clone(),
            Dispatch::MapTransition { map, .. } => map.clone(),
        };
        Self {
            kind: dispatch.kind(),
            target: dispatch.target().to_string(),
            detail,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct StepRecord {
    pub(crate) round: usize,
    pub(crate) actor: String,
    pub(crate) command: String,
    pub(crate) committed: bool,
    pub(crate) outcome: String,
    pub(crate) position: Position,
    pub(crate) dispatches: Vec<DispatchRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct RunReport {
    pub(crate) scenario: String,
    pub(crate) rounds: usize,
    pub(crate) steps: Vec<StepRecord>,
    pub(crate) actors: Vec<ActorState>,
}

pub(crate) fn run(args: impl IntoIterator<Item = String>) -> ExitCode {
    match try_run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "startup_failed");
            ExitCode::FAILURE
        }
    }
}

fn try_run(args: impl IntoIterator<Item = String>) -> Result<(), HarnessError> {
    let paths = resolve_app_paths()?;
    info!(root = %paths.root.display(), "paths_resolved");
    let config = load_config(&paths, args)?;

    let scenario = load_scenario(&config.scenario_path)?;
    let mut loaded = build_world(&scenario)?;
    let report = run_scenario(&mut loaded, &config, &scenario.name);

    if config.print_summary {
        let json = serde_json::to_string_pretty(&report).map_err(HarnessError::Summary)?;
        println!("{json}");
    }
    Ok(())
}

/// Plays every actor's script in lockstep rounds: in each round every actor
/// issues its next command, in scenario order. Map transitions requested by a
/// step are applied once that step has returned.
pub(crate) fn run_scenario(
    loaded: &mut LoadedScenario,
    config: &SimConfig,
    scenario_name: &str,
) -> RunReport {
    let longest = loaded
        .actors
        .iter()
        .map(|actor| actor.moves.len())
        .max()
        .unwrap_or(0);
    let rounds = longest.min(config.max_steps);
    if rounds < longest {
        warn!(longest, max_steps = config.max_steps, "script_truncated");
    }

    let mut steps = Vec::new();
    let mut sink: Vec<Dispatch> = Vec::new();
    for round in 0..rounds {
        for scripted in &loaded.actors {
            let Some(raw) = scripted.moves.get(round) else {
                continue;
            };
            let command = match raw.parse::<Command>() {
                Ok(command) => command,
                Err(reason) => {
                    warn!(actor = %scripted.name, command = %raw, %reason, "unknown_command");
                    continue;
                }
            };

            let (committed, outcome) = match command {
                Command::Step(direction) => {
                    match loaded
                        .world
                        .step_actor(scripted.id, direction, &loaded.maps, &mut sink)
                    {
                        Some(outcome) => (outcome.is_committed(), describe(&outcome)),
                        None => continue,
                    }
                }
                Command::Action => {
                    let Some(actor) = loaded.world.find_actor(scripted.id) else {
                        continue;
                    };
                    let fired = actor.trigger_collisions(ActionCode::Action, &mut sink);
                    (false, format!("action x{fired}"))
                }
            };

            let dispatches = sink.iter().map(DispatchRecord::from).collect();
            apply_dispatches(&mut loaded.world, &loaded.maps, sink.drain(..));

            let position = loaded
                .world
                .find_actor(scripted.id)
                .map(|actor| actor.position())
                .unwrap_or_default();
            info!(
                round,
                actor = %scripted.name,
                command = %raw,
                committed,
                x = position.x,
                y = position.y,
                z = position.z,
                "step_resolved"
            );
            steps.push(StepRecord {
                round,
                actor: scripted.name.clone(),
                command: raw.clone(),
                committed,
                outcome,
                position,
                dispatches,
            });
        }
    }

    let actors = loaded
        .actors
        .iter()
        .filter_map(|scripted| loaded.world.find_actor(scripted.id))
        .map(|actor| actor.state())
        .collect();
    info!(rounds, steps = steps.len(), "scenario_finished");
    RunReport {
        scenario: scenario_name.to_string(),
        rounds,
        steps,
        actors,
    }
}

fn apply_dispatches(
    world: &mut World,
    maps: &MapRegistry,
    dispatches: impl Iterator<Item = Dispatch>,
) {
    for dispatch in dispatches {
        match dispatch {
            Dispatch::MapTransition { actor, map, .. } => {
                if !world.change_actor_map(actor, &map, maps) {
                    warn!(actor = actor.0, map = %map, "dispatch_unknown_map");
                }
            }
            Dispatch::Action {
                actor,
                target,
                handler,
            }
            | Dispatch::Touch {
                actor,
                target,
                handler,
            } => {
                info!(
                    actor = actor.0,
                    target = %target,
                    handler = %handler,
                    "script_handler_requested"
                );
            }
        }
    }
}

fn describe(outcome: &MoveOutcome) -> String {
    match outcome {
        MoveOutcome::Moved { .. } => "moved".to_string(),
        MoveOutcome::Climbed { z } => format!("climbed to z={z}"),
        MoveOutcome::Clamped { .. } => "clamped".to_string(),
        MoveOutcome::Blocked(reason) => format!("blocked: {reason:?}"),
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use tilestep_engine::EntityId;

    use super::*;
    use crate::app::scenario::parse_scenario;

    const BUNDLED: &str = include_str!("../../../../assets/scenarios/overworld.json");

    fn load(raw: &str) -> (LoadedScenario, String) {
        let scenario = parse_scenario(raw, Path::new("test.json")).expect("parse");
        let loaded = build_world(&scenario).expect("build");
        (loaded, scenario.name)
    }

    #[test]
    fn commands_parse_directions_and_action() {
        assert_eq!("left".parse::<Command>(), Ok(Command::Step(Direction::Left)));
        assert_eq!("Action".parse::<Command>(), Ok(Command::Action));
        assert!("jump".parse::<Command>().is_err());
    }

    #[test]
    fn portal_dispatch_moves_actor_to_target_map() {
        let raw = r#"{
            "name": "portal",
            "maps": [
                { "name": "field", "width": 10, "height": 10, "tile_width": 10, "tile_height": 10,
                  "shapes": [{ "id": 1, "name": "to-town", "go-map": "town",
                               "geometry": { "type": "box", "x": 10, "y": 0,
                                             "width": 10, "height": 10 } }] },
                { "name": "town", "width": 10, "height": 10, "tile_width": 10, "tile_height": 10 }
            ],
            "actors": [{ "name": "hero", "map": "field", "x": 1, "width": 8, "height": 8,
                         "speed": 2, "moves": ["right", "jump", "down"] }]
        }"#;
        let (mut loaded, name) = load(raw);
        let report = run_scenario(&mut loaded, &SimConfig::default(), &name);

        assert_eq!(report.rounds, 3);
        assert_eq!(report.steps.len(), 2);
        let first = &report.steps[0];
        assert!(first.committed);
        assert_eq!(first.dispatches.len(), 1);
        assert_eq!(first.dispatches[0].kind, "map_transition");
        assert_eq!(first.dispatches[0].detail, "town");
        assert_eq!(report.actors[0].map, "town");
        assert_eq!(loaded.world.group("town"), Some(&[EntityId(0)][..]));
        assert_eq!(report.actors[0].position, Position::new(3.0, 2.0, 0.0));
    }

    #[test]
    fn action_replays_last_collision() {
        let raw = r#"{
            "maps": [{ "name": "field", "width": 10, "height": 10,
                       "tile_width": 10, "tile_height": 10 }],
            "objects": [{ "map": "field", "x": 20, "y": 0, "width": 8, "height": 8,
                          "trigger": { "kind": "actor",
                                       "handlers": { "on_action": "chest.open" } } }],
            "actors": [{ "name": "hero", "map": "field", "x": 10, "width": 8, "height": 8,
                         "speed": 4, "moves": ["right", "action"] }]
        }"#;
        let (mut loaded, name) = load(raw);
        let report = run_scenario(&mut loaded, &SimConfig::default(), &name);

        assert!(!report.steps[0].committed);
        assert!(report.steps[0].dispatches.is_empty());
        assert_eq!(
            report.steps[1].dispatches,
            vec![DispatchRecord {
                kind: "action",
                target: "entity#0".to_string(),
                detail: "chest.open".to_string(),
            }]
        );
    }

    #[test]
    fn max_steps_caps_rounds() {
        let (mut loaded, name) = load(BUNDLED);
        let config = SimConfig {
            max_steps: 1,
            ..SimConfig::default()
        };
        let report = run_scenario(&mut loaded, &config, &name);
        assert_eq!(report.rounds, 1);
        assert!(report.steps.len() <= loaded.actors.len());
    }

    #[test]
    fn bundled_scenario_runs_and_serializes() {
        let (mut loaded, name) = load(BUNDLED);
        let report = run_scenario(&mut loaded, &SimConfig::default(), &name);
        assert!(!report.steps.is_empty());
        assert!(report.steps.iter().any(|step| step.committed));
        assert!(report.steps.iter().any(|step| !step.committed));
        let json = serde_json::to_value(&report).expect("serialize");
        assert_eq!(json["actors"].as_array().map(Vec::len), Some(loaded.actors.len()));
    }
}
