//! The behavior engine.
//!
//! Leaf to root: types/ids, registry, navigation and movement, the path
//! follower, behavior definitions, the per-actor state machine, queue and
//! register managers, the event relay, the low-fidelity simulator, and the
//! world that composes them.

pub mod actor;
pub mod basic_sim;
pub mod behaviors;
pub mod context;
pub mod events;
pub mod ids;
pub mod machine;
pub mod movement;
pub mod nav;
pub mod path_following;
pub mod queue;
pub mod registers;
pub mod registry;
pub mod routines;
pub mod snapshot;
pub mod types;
pub mod world;

#[cfg(test)]
pub(crate) mod testkit;

#[cfg(test)]
mod machine_tests;


pub use actor::{Actor, ActorBody, ActorKind};
pub use basic_sim::{BasicBehavior, BasicCtx, BasicOutcome, BasicSimConfig, BasicSimulator};
pub use behaviors::{
    Behavior, CashierState, CustomerState, Directive, GeneralState, PathState, StateKey,
};
pub use context::BehaviorCtx;
pub use events::{EmoteKind, EventBus, GameEvent, InterruptKind};
pub use ids::{ActorId, ItemId, PathId, WaypointId};
pub use machine::{BehaviorSet, FallbackKeys, StateMachine, StateTable};
pub use movement::MovementHandler;
pub use nav::{DirectNavigator, GridNavigator, Navigator};
pub use path_following::PathFollower;
pub use queue::{
    shop_lines, CascadeStep, LineQueueManager, QueueAssignment, QueueHandler, QueueManager,
    QueueType,
};
pub use registers::RegisterBoard;
pub use registry::{DecisionRule, Path, PathEndPolicy, PathRegistry, RegistryConfig};
pub use routines::{Routine, RoutineStatus, TimerRoutine};
pub use snapshot::{PathProgress, SimulationSnapshot};
pub use types::Transform;
pub use world::{World, WorldConfig};
