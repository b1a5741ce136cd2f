//! Customer behaviors: shopping, queueing, checking out, leaving.

use log::{debug, warn};

use crate::engine::behaviors::traits::{Behavior, Directive};
use crate::engine::behaviors::{CustomerState, PathState, StateKey};
use crate::engine::context::BehaviorCtx;
use crate::engine::events::GameEvent;
use crate::engine::routines::TimerRoutine;

/// Walk the shopping list shelf by shelf. Progress is the list itself, so an
/// interrupted customer re-targets whatever item was next.
pub struct ShoppingBehavior;

fn target_next_shelf(ctx: &mut BehaviorCtx<'_>) -> Directive {
    loop {
        let Some(item) = ctx.body.shopping_list.first().cloned() else {
            return Directive::Transition(StateKey::Path(PathState::ToCheckout));
        };
        let target = ctx
            .config
            .shelves
            .get(&item)
            .and_then(|wp| ctx.registry.get_waypoint_transform(wp));
        match target {
            Some(shelf) if ctx.set_destination(shelf.position) => return Directive::Stay,
            _ => {
                warn!("no reachable shelf for '{item}', skipping it");
                ctx.body.shopping_list.remove(0);
            }
        }
    }
}

impl Behavior for ShoppingBehavior {
    fn key(&self) -> StateKey {
        StateKey::Customer(CustomerState::Shopping)
    }

    fn wants_arrival_callback(&self) -> bool {
        true
    }

    fn on_enter(&self, ctx: &mut BehaviorCtx<'_>) -> Directive {
        target_next_shelf(ctx)
    }

    fn on_reached_destination(&self, ctx: &mut BehaviorCtx<'_>) -> Directive {
        if !ctx.body.shopping_list.is_empty() {
            ctx.body.shopping_list.remove(0);
        }
        target_next_shelf(ctx)
    }
}

/// Hold a slot in a checkout line, shuffling forward as the line cascades.
pub struct QueueWaitingBehavior;

impl Behavior for QueueWaitingBehavior {
    fn key(&self) -> StateKey {
        StateKey::Customer(CustomerState::QueueWaiting)
    }

    fn wants_arrival_callback(&self) -> bool {
        true
    }

    fn on_enter(&self, ctx: &mut BehaviorCtx<'_>) -> Directive {
        if let Some(held) = ctx.body.queue.assignment() {
            // Re-entry with a slot already held: fidelity resume or a popped
            // interruption. Walk back to the spot.
            let spot = ctx.queues.slot_transform(held.queue, held.index);
            match spot {
                Some(spot) if ctx.set_destination(spot.position) => {}
                _ => return Directive::Transition(StateKey::Customer(CustomerState::Exiting)),
            }
        } else {
            let queue = ctx.body.preferred_queue;
            if !ctx.join_queue(queue) {
                debug!("actor {}: queue {queue:?} full, giving up", ctx.body.id);
                return Directive::Transition(StateKey::Customer(CustomerState::Exiting));
            }
        }
        let actor = ctx.body.id;
        ctx.start_routine(
            TimerRoutine::new(ctx.config.impatience_secs)
                .publish(GameEvent::Impatient { actor })
                .then(Directive::Transition(StateKey::Customer(CustomerState::Exiting))),
        );
        Directive::Stay
    }

    fn on_reached_destination(&self, ctx: &mut BehaviorCtx<'_>) -> Directive {
        match ctx.body.queue.assignment() {
            Some(held) if held.index == 0 => {
                Directive::Transition(StateKey::Customer(CustomerState::CheckingOut))
            }
            Some(_) => Directive::Stay,
            None => Directive::Transition(StateKey::Customer(CustomerState::Exiting)),
        }
    }

    fn on_exit(&self, ctx: &mut BehaviorCtx<'_>) {
        // An interruption or fidelity handoff only suspends the wait; the
        // slot is kept and mirrored. A real departure releases it.
        if !ctx.suspending {
            ctx.leave_queue();
        }
    }
}

/// Stand at the register until the transaction completes. The completion
/// event arrives through the relay; the timer is a defensive cap.
pub struct CheckingOutBehavior;

impl Behavior for CheckingOutBehavior {
    fn key(&self) -> StateKey {
        StateKey::Customer(CustomerState::CheckingOut)
    }

    fn wants_arrival_callback(&self) -> bool {
        true
    }

    fn on_enter(&self, ctx: &mut BehaviorCtx<'_>) -> Directive {
        let spot = ctx.config.register_spot.position;
        if !ctx.set_destination(spot) {
            return Directive::Transition(StateKey::Customer(CustomerState::Exiting));
        }
        let actor = ctx.body.id;
        ctx.start_routine(
            TimerRoutine::new(ctx.config.checkout_timeout_secs)
                .publish(GameEvent::Impatient { actor })
                .then(Directive::Transition(StateKey::Customer(CustomerState::Exiting))),
        );
        Directive::Stay
    }

    fn on_reached_destination(&self, ctx: &mut BehaviorCtx<'_>) -> Directive {
        let actor = ctx.body.id;
        ctx.registers.request(actor);
        ctx.publish(GameEvent::ReadyForCheckout { actor });
        Directive::Stay
    }

    fn on_exit(&self, ctx: &mut BehaviorCtx<'_>) {
        if !ctx.suspending {
            let actor = ctx.body.id;
            ctx.registers.finish(actor);
        }
    }
}

/// Forced exit: walk out now, whatever was in progress.
pub struct ExitingBehavior;

impl Behavior for ExitingBehavior {
    fn key(&self) -> StateKey {
        StateKey::Customer(CustomerState::Exiting)
    }

    fn interruptible(&self) -> bool {
        false
    }

    fn wants_arrival_callback(&self) -> bool {
        true
    }

    fn on_enter(&self, ctx: &mut BehaviorCtx<'_>) -> Directive {
        if !ctx.set_destination(ctx.config.despawn.position) {
            return Directive::Despawn;
        }
        Directive::Stay
    }

    fn on_reached_destination(&self, _ctx: &mut BehaviorCtx<'_>) -> Directive {
        Directive::Despawn
    }
}
