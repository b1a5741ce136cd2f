//! The per-actor record.
//!
//! Behavior definitions are shared and stateless; everything mutable about a
//! single NPC lives here — transform, handlers, shopping progress, the
//! suspend/resume snapshot — and is passed into every behavior hook.

use crate::engine::events::EmoteKind;
use crate::engine::ids::{ActorId, ItemId};
use crate::engine::machine::StateMachine;
use crate::engine::movement::MovementHandler;
use crate::engine::path_following::PathFollower;
use crate::engine::queue::{QueueHandler, QueueType};
use crate::engine::snapshot::{PathProgress, SimulationSnapshot};
use crate::engine::types::Transform;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorKind {
    Customer,
    Cashier,
}

pub struct ActorBody {
    pub id: ActorId,
    pub kind: ActorKind,
    pub transform: Transform,
    pub shopping_list: Vec<ItemId>,
    pub preferred_queue: QueueType,
    pub movement: MovementHandler,
    pub path: PathFollower,
    pub queue: QueueHandler,
    /// Present only while the actor runs on the low-fidelity simulator.
    pub snapshot: Option<SimulationSnapshot>,
    /// Mid-path capture waiting to be consumed by the next path behavior's
    /// `on_enter` — written on interruption and on fidelity resume.
    pub pending_resume: Option<PathProgress>,
    /// Whoever triggered the active combat/social interruption.
    pub interactor: Option<ActorId>,
    pub active_emote: Option<EmoteKind>,
    pub despawn_requested: bool,
}

impl ActorBody {
    pub fn new(kind: ActorKind, spawn: Transform, walk_speed: f32) -> Self {
        Self {
            id: ActorId::new(),
            kind,
            transform: spawn,
            shopping_list: Vec::new(),
            preferred_queue: QueueType::Main,
            movement: MovementHandler::new(walk_speed),
            path: PathFollower::default(),
            queue: QueueHandler::default(),
            snapshot: None,
            pending_resume: None,
            interactor: None,
            active_emote: None,
            despawn_requested: false,
        }
    }

    pub fn items_to_buy(&self) -> &[ItemId] {
        &self.shopping_list
    }

    /// Re-initialize a pooled record for a fresh spawn. The id changes; a
    /// GUID is never reused.
    pub fn reset(&mut self, kind: ActorKind, spawn: Transform) {
        self.id = ActorId::new();
        self.kind = kind;
        self.transform = spawn;
        self.shopping_list.clear();
        self.preferred_queue = QueueType::Main;
        self.movement.stop();
        self.path.stop();
        self.queue.clear(None);
        self.snapshot = None;
        self.pending_resume = None;
        self.interactor = None;
        self.active_emote = None;
        self.despawn_requested = false;
    }
}

/// One spawned NPC: mutable record + its state machine runner.
pub struct Actor {
    pub body: ActorBody,
    pub machine: StateMachine,
    /// False while the actor runs on the low-fidelity simulator.
    pub active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_issues_a_fresh_guid() {
        let mut body = ActorBody::new(ActorKind::Customer, Transform::default(), 1.5);
        let old = body.id;
        body.shopping_list.push(ItemId::from("bandages"));
        body.despawn_requested = true;
        body.reset(ActorKind::Cashier, Transform::at(1.0, 0.0, 0.0));
        assert_ne!(body.id, old);
        assert!(body.shopping_list.is_empty());
        assert!(!body.despawn_requested);
        assert_eq!(body.kind, ActorKind::Cashier);
    }
}
