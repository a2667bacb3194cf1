mod actor;
mod direction;
mod resolver;
mod trigger;

pub use actor::{Actor, ActorState, PlacementRequest};
pub use direction::{pixels_per_tile, Direction, DirectionError};
pub use resolver::{BlockReason, MoveOutcome};
pub use trigger::{
    resolve_dispatch, ActionCode, Collision, CollisionTarget, Dispatch, EventHandlers, Trigger,
    TriggerSink, UnknownActionCode,
};
