use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::map::ShapeId;
use crate::world::EntityId;

/// What the actor was doing when a collision is dispatched. Movement always
/// dispatches with [`ActionCode::Idle`]; an explicit use request replays the
/// recorded collisions with [`ActionCode::Action`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum ActionCode {
    #[default]
    Idle = 0,
    Run = 1,
    Action = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown action code {0}")]
pub struct UnknownActionCode(pub u8);

impl ActionCode {
    pub const fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(ActionCode::Idle),
            1 => Some(ActionCode::Run),
            2 => Some(ActionCode::Action),
            _ => None,
        }
    }
}

impl From<ActionCode> for u8 {
    fn from(action: ActionCode) -> Self {
        action.code()
    }
}

impl TryFrom<u8> for ActionCode {
    type Error = UnknownActionCode;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        ActionCode::from_code(code).ok_or(UnknownActionCode(code))
    }
}

/// Named script hooks. Names are opaque to the engine and handed back to the
/// host through [`Dispatch`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventHandlers {
    #[serde(default)]
    pub on_action: Option<String>,
    #[serde(default)]
    pub on_touch: Option<String>,
}

impl EventHandlers {
    pub fn is_empty(&self) -> bool {
        self.on_action.is_none() && self.on_touch.is_none()
    }
}

/// Trigger capability of anything an actor can collide with. Fixed when the
/// collidable is built so dispatch never probes for optional members.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Trigger {
    #[default]
    Inert,
    Actor {
        handlers: EventHandlers,
    },
    Shape {
        handlers: EventHandlers,
        #[serde(default)]
        go_map: Option<String>,
    },
    MapTransition {
        target_map: String,
    },
}

impl Trigger {
    pub fn handlers(&self) -> Option<&EventHandlers> {
        match self {
            Trigger::Actor { handlers } | Trigger::Shape { handlers, .. } => Some(handlers),
            Trigger::Inert | Trigger::MapTransition { .. } => None,
        }
    }

    pub fn target_map(&self) -> Option<&str> {
        match self {
            Trigger::Shape { go_map, .. } => go_map.as_deref(),
            Trigger::MapTransition { target_map } => Some(target_map),
            Trigger::Inert | Trigger::Actor { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollisionTarget {
    Entity(EntityId),
    Shape(ShapeId),
}

impl fmt::Display for CollisionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollisionTarget::Entity(id) => write!(f, "{id}"),
            CollisionTarget::Shape(id) => write!(f, "{id}"),
        }
    }
}

/// A collision recorded during movement, with the trigger captured at the
/// time it happened.
#[derive(Debug, Clone, PartialEq)]
pub struct Collision {
    pub target: CollisionTarget,
    pub trigger: Trigger,
}

/// Host-facing request produced by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    Action {
        actor: EntityId,
        target: CollisionTarget,
        handler: String,
    },
    Touch {
        actor: EntityId,
        target: CollisionTarget,
        handler: String,
    },
    MapTransition {
        actor: EntityId,
        target: CollisionTarget,
        map: String,
    },
}

impl Dispatch {
    pub fn actor(&self) -> EntityId {
        match self {
            Dispatch::Action { actor, .. }
            | Dispatch::Touch { actor, .. }
            | Dispatch::MapTransition { actor, .. } => *actor,
        }
    }

    pub fn target(&self) -> CollisionTarget {
        match self {
            Dispatch::Action { target, .. }
            | Dispatch::Touch { target, .. }
            | Dispatch::MapTransition { target, .. } => *target,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Dispatch::Action { .. } => "action",
            Dispatch::Touch { .. } => "touch",
            Dispatch::MapTransition { .. } => "map_transition",
        }
    }
}

/// Receives dispatches as soon as the resolver decides them. Runs inside the
/// movement step, so implementations must not call back into movement.
pub trait TriggerSink {
    fn dispatch(&mut self, dispatch: Dispatch);
}

impl TriggerSink for Vec<Dispatch> {
    fn dispatch(&mut self, dispatch: Dispatch) {
        self.push(dispatch);
    }
}

impl TriggerSink for () {
    fn dispatch(&mut self, _dispatch: Dispatch) {}
}

/// Picks at most one reaction for `collision`, in strict order: the action
/// handler on an explicit action request, then the touch handler, then a map
/// transition when the actor can change maps.
pub fn resolve_dispatch(
    collision: &Collision,
    actor: EntityId,
    can_change_map: bool,
    action: ActionCode,
) -> Option<Dispatch> {
    let target = collision.target;
    let handlers = collision.trigger.handlers();

    if action == ActionCode::Action {
        if let Some(handler) = handlers.and_then(|handlers| handlers.on_action.as_ref()) {
            return Some(Dispatch::Action {
                actor,
                target,
                handler: handler.clone(),
            });
        }
    }

    if let Some(handler) = handlers.and_then(|handlers| handlers.on_touch.as_ref()) {
        return Some(Dispatch::Touch {
            actor,
            target,
            handler: handler.clone(),
        });
    }

    match collision.trigger.target_map() {
        Some(map) if can_change_map => Some(Dispatch::MapTransition {
            actor,
            target,
            map: map.to_string(),
        }),
        _ => None,
    }
}
