//! The context handed to every behavior hook.
//!
//! One actor's mutable record plus explicit references to the shared
//! services — no behavior ever reaches for a global. Built fresh by the world
//! for each hook invocation and torn down before the next actor ticks.

use nalgebra::Point3;
use rand_chacha::ChaCha8Rng;

use crate::engine::actor::ActorBody;
use crate::engine::events::{EventBus, GameEvent};
use crate::engine::nav::Navigator;
use crate::engine::queue::{QueueManager, QueueType};
use crate::engine::registers::RegisterBoard;
use crate::engine::registry::PathRegistry;
use crate::engine::routines::Routine;
use crate::engine::types::Transform;
use crate::engine::world::WorldConfig;

pub struct BehaviorCtx<'a> {
    pub body: &'a mut ActorBody,
    pub registry: &'a PathRegistry,
    pub nav: &'a dyn Navigator,
    pub queues: &'a mut dyn QueueManager,
    pub registers: &'a mut RegisterBoard,
    pub bus: &'a mut EventBus,
    pub rng: &'a mut ChaCha8Rng,
    pub config: &'a WorldConfig,
    pub dt: f32,
    /// True while the runner is exiting a state for an interruption rather
    /// than a real departure — queue states keep their slot in that case.
    pub suspending: bool,
    /// Routine started by the current hook; collected by the runner.
    pub started_routine: Option<Box<dyn Routine>>,
}

impl<'a> BehaviorCtx<'a> {
    pub fn start_routine(&mut self, routine: impl Routine + 'static) {
        self.started_routine = Some(Box::new(routine));
    }

    pub fn publish(&mut self, event: GameEvent) {
        self.bus.publish(event);
    }

    /// Route to `to` through the navigator. False when unreachable.
    pub fn set_destination(&mut self, to: Point3<f32>) -> bool {
        let body = &mut *self.body;
        body.movement.set_destination(body.transform.position, to, self.nav)
    }

    /// Drop the held queue slot, tell the manager, and announce the opening.
    pub fn leave_queue(&mut self) {
        let snapshot = self.body.snapshot.as_mut();
        if let Some(a) = self.body.queue.clear(snapshot) {
            self.queues.free_slot(a.queue, a.index);
            self.bus.publish(GameEvent::QueueReleased { queue: a.queue, index: a.index });
        }
    }

    /// Claim an open slot in `queue` and start walking to it.
    pub fn join_queue(&mut self, queue: QueueType) -> bool {
        let Some((spot, index)) = self.queues.try_join(queue, self.body.id) else {
            return false;
        };
        if !self.set_destination(spot.position) {
            self.queues.free_slot(queue, index);
            return false;
        }
        let snapshot = self.body.snapshot.as_mut();
        self.body.queue.assign(queue, index, snapshot);
        true
    }

    /// Command movement to a new slot. The previous slot is freed the moment
    /// movement starts, not on arrival, so the manager can cascade the next
    /// actor forward immediately.
    pub fn move_to_queue_spot(&mut self, spot: Transform, new_index: usize) -> bool {
        let Some(prev) = self.body.queue.assignment() else {
            return false;
        };
        if !self.queues.claim_slot(prev.queue, new_index, self.body.id) {
            return false;
        }
        if !self.set_destination(spot.position) {
            self.queues.free_slot(prev.queue, new_index);
            // Never leave the manager pointing at an unreachable actor.
            self.leave_queue();
            return false;
        }
        self.queues.free_slot(prev.queue, prev.index);
        let snapshot = self.body.snapshot.as_mut();
        self.body.queue.assign(prev.queue, new_index, snapshot);
        true
    }
}
