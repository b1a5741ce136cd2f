//! Cooperative per-state tasks.
//!
//! A routine is the long-running half of a behavior: polled once per tick by
//! the runner and dropped — synchronously — on every transition, so it can
//! never outlive the state that started it.

use crate::engine::behaviors::Directive;
use crate::engine::context::BehaviorCtx;
use crate::engine::events::GameEvent;

pub enum RoutineStatus {
    Running,
    Done(Directive),
}

pub trait Routine: Send {
    fn tick(&mut self, ctx: &mut BehaviorCtx<'_>) -> RoutineStatus;
}

/// Counts down, then optionally publishes an event and/or requests a
/// transition. Covers emote durations, service times, impatience and the
/// defensive timeouts on externally-completed states.
pub struct TimerRoutine {
    remaining: f32,
    publish: Option<GameEvent>,
    then: Directive,
}

impl TimerRoutine {
    pub fn new(secs: f32) -> Self {
        Self { remaining: secs, publish: None, then: Directive::Stay }
    }

    pub fn publish(mut self, event: GameEvent) -> Self {
        self.publish = Some(event);
        self
    }

    pub fn then(mut self, directive: Directive) -> Self {
        self.then = directive;
        self
    }
}

impl Routine for TimerRoutine {
    fn tick(&mut self, ctx: &mut BehaviorCtx<'_>) -> RoutineStatus {
        self.remaining -= ctx.dt;
        if self.remaining > 0.0 {
            return RoutineStatus::Running;
        }
        if let Some(event) = self.publish.take() {
            ctx.bus.publish(event);
        }
        RoutineStatus::Done(self.then)
    }
}
