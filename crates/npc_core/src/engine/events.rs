//! Domain events and the relay that turns them into machine actions.
//!
//! The bus is single-threaded: publishing enqueues, the world drains within
//! the same tick. All trigger filtering lives in `relay` — behaviors and the
//! runner never re-check whether an event is admissible, they only see the
//! actions the relay produced.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::engine::behaviors::{CustomerState, GeneralState, StateKey};
use crate::engine::ids::ActorId;
use crate::engine::queue::QueueType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmoteKind {
    Wave,
    Dance,
    Grumble,
}

/// Everything the core publishes or subscribes to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameEvent {
    Attacked { target: ActorId, attacker: ActorId },
    Interacted { target: ActorId, initiator: ActorId },
    EmoteTriggered { target: ActorId, emote: EmoteKind },
    CombatEnded { actor: ActorId },
    InteractionEnded { actor: ActorId },
    EmoteEnded { actor: ActorId },
    TransactionCompleted { customer: ActorId },
    QueueReleased { queue: QueueType, index: usize },
    Impatient { actor: ActorId },
    ReadyForCheckout { actor: ActorId },
}

/// Reactive triggers that may suspend the current behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptKind {
    Combat,
    Social,
    Emote,
}

impl InterruptKind {
    /// The behavior entered while the trigger plays out.
    pub fn state_key(self) -> StateKey {
        match self {
            InterruptKind::Combat => StateKey::General(GeneralState::Combat),
            InterruptKind::Social => StateKey::General(GeneralState::Social),
            InterruptKind::Emote => StateKey::General(GeneralState::Emoting),
        }
    }
}

/// FIFO publish/drain bus shared by all actors and managers.
#[derive(Debug, Default)]
pub struct EventBus {
    queue: VecDeque<GameEvent>,
}

impl EventBus {
    pub fn publish(&mut self, event: GameEvent) {
        self.queue.push_back(event);
    }

    pub fn pop(&mut self) -> Option<GameEvent> {
        self.queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

/// What the world should do with one event.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayAction {
    /// Push the current state and enter the interrupt behavior.
    Interrupt { actor: ActorId, kind: InterruptKind, source: Option<ActorId> },
    /// Pop the interruption stack — valid only while `expected` is current.
    Complete { actor: ActorId, kind: InterruptKind },
    /// Transition `actor` to `to`, but only while `only_if` is its current
    /// state. Guards against stale events.
    TransitionIf { actor: ActorId, only_if: StateKey, to: StateKey },
    /// Let the queue manager cascade actors forward into the freed slot.
    QueueCascade { queue: QueueType },
    /// Outbound-only event; nothing for the core to do.
    None,
}

/// The single place where domain events become machine actions.
pub fn relay(event: &GameEvent) -> RelayAction {
    match event {
        GameEvent::Attacked { target, attacker } => RelayAction::Interrupt {
            actor: *target,
            kind: InterruptKind::Combat,
            source: Some(*attacker),
        },
        GameEvent::Interacted { target, initiator } => RelayAction::Interrupt {
            actor: *target,
            kind: InterruptKind::Social,
            source: Some(*initiator),
        },
        GameEvent::EmoteTriggered { target, .. } => {
            RelayAction::Interrupt { actor: *target, kind: InterruptKind::Emote, source: None }
        }
        GameEvent::CombatEnded { actor } => {
            RelayAction::Complete { actor: *actor, kind: InterruptKind::Combat }
        }
        GameEvent::InteractionEnded { actor } => {
            RelayAction::Complete { actor: *actor, kind: InterruptKind::Social }
        }
        GameEvent::EmoteEnded { actor } => {
            RelayAction::Complete { actor: *actor, kind: InterruptKind::Emote }
        }
        GameEvent::TransactionCompleted { customer } => RelayAction::TransitionIf {
            actor: *customer,
            only_if: StateKey::Customer(CustomerState::CheckingOut),
            to: StateKey::Customer(CustomerState::Exiting),
        },
        GameEvent::QueueReleased { queue, .. } => RelayAction::QueueCascade { queue: *queue },
        GameEvent::Impatient { .. } | GameEvent::ReadyForCheckout { .. } => RelayAction::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bus_is_fifo() {
        let mut bus = EventBus::default();
        let a = ActorId::new();
        bus.publish(GameEvent::Impatient { actor: a });
        bus.publish(GameEvent::CombatEnded { actor: a });
        assert_eq!(bus.len(), 2);
        assert!(matches!(bus.pop(), Some(GameEvent::Impatient { .. })));
        assert!(matches!(bus.pop(), Some(GameEvent::CombatEnded { .. })));
        assert!(bus.is_empty());
    }

    #[test]
    fn test_attack_relays_to_combat_interrupt() {
        let target = ActorId::new();
        let attacker = ActorId::new();
        let action = relay(&GameEvent::Attacked { target, attacker });
        assert_eq!(
            action,
            RelayAction::Interrupt {
                actor: target,
                kind: InterruptKind::Combat,
                source: Some(attacker)
            }
        );
    }

    #[test]
    fn test_transaction_only_moves_checkout_customers() {
        let customer = ActorId::new();
        let action = relay(&GameEvent::TransactionCompleted { customer });
        let RelayAction::TransitionIf { only_if, to, .. } = action else {
            panic!("expected a guarded transition");
        };
        assert_eq!(only_if, StateKey::Customer(CustomerState::CheckingOut));
        assert_eq!(to, StateKey::Customer(CustomerState::Exiting));
    }

    #[test]
    fn test_outbound_events_relay_to_nothing() {
        let actor = ActorId::new();
        assert_eq!(relay(&GameEvent::Impatient { actor }), RelayAction::None);
        assert_eq!(relay(&GameEvent::ReadyForCheckout { actor }), RelayAction::None);
    }
}
