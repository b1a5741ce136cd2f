//! # npc_core - Data-driven NPC behavior simulation core
//!
//! This library drives the non-player characters of a pharmacy-shop
//! simulation: a data-driven, interruptible state machine per actor, with
//! path-following, shared queue/register resources, and a dual-fidelity
//! model that runs far-away actors on a cheap periodic simulation and
//! resumes the full machine at the exact point it left off.
//!
//! ## Features
//! - Deterministic simulation (same seed + same config = same run)
//! - Shared, stateless behavior definitions keyed by (category, value)
//! - LIFO interruption stack for combat/social/emote triggers
//! - Mid-path restore: resumed actors keep their waypoint index and
//!   direction, whether the suspension was an interruption or a fidelity
//!   handoff

// Game engine APIs often require many parameters for state plumbing
#![allow(clippy::too_many_arguments)]

pub mod engine;
pub mod error;

pub use engine::{
    Actor, ActorId, ActorKind, Behavior, BehaviorCtx, Directive, EventBus, GameEvent,
    InterruptKind, ItemId, PathFollower, PathId, PathRegistry, QueueManager, QueueType,
    SimulationSnapshot, StateKey, StateMachine, Transform, World, WorldConfig,
};
pub use error::{CoreError, Result};
