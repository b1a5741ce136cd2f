//! Per-actor state machine runner.
//!
//! Owns the actor's current behavior, the previous-state pointer, the
//! interruption stack and the active routine. Behavior lookups go through a
//! table compiled once at spawn from an ordered list of behavior sets, with
//! later sets overriding earlier ones key by key; misses degrade through the
//! configured returning/idle fallbacks before giving up on the actor.
//!
//! Every error here is local to one actor: the worst outcome is a forced
//! despawn, never a broken tick loop.

use std::sync::Arc;

use fxhash::FxHashMap;
use log::{debug, error, warn};

use crate::engine::behaviors::{Behavior, Directive, StateKey};
use crate::engine::context::BehaviorCtx;
use crate::engine::events::{GameEvent, InterruptKind};
use crate::engine::ids::ActorId;
use crate::engine::routines::RoutineStatus;
use crate::error::CoreError;

/// A transition requested from `on_enter` may redirect again, but only this
/// many times before the runner forces idle.
const MAX_TRANSITION_HOPS: usize = 8;

/// An ordered group of behavior definitions, composed into a table at spawn.
pub type BehaviorSet = Vec<Arc<dyn Behavior>>;

/// Compiled per-actor lookup table. Last writer wins per key.
pub struct StateTable {
    entries: FxHashMap<StateKey, Arc<dyn Behavior>>,
}

impl StateTable {
    pub fn compile(sets: &[&BehaviorSet]) -> Self {
        let mut entries = FxHashMap::default();
        for set in sets {
            for behavior in set.iter() {
                entries.insert(behavior.key(), Arc::clone(behavior));
            }
        }
        Self { entries }
    }

    pub fn get(&self, key: StateKey) -> Option<Arc<dyn Behavior>> {
        self.entries.get(&key).cloned()
    }

    pub fn contains(&self, key: StateKey) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Where lookups degrade to when a key is not registered.
#[derive(Debug, Clone, Copy)]
pub struct FallbackKeys {
    pub returning: Option<StateKey>,
    pub idle: Option<StateKey>,
}

impl Default for FallbackKeys {
    fn default() -> Self {
        Self { returning: Some(StateKey::RETURNING), idle: Some(StateKey::IDLE) }
    }
}

pub struct StateMachine {
    table: Arc<StateTable>,
    fallbacks: FallbackKeys,
    current: Option<Arc<dyn Behavior>>,
    previous: Option<StateKey>,
    stack: Vec<Arc<dyn Behavior>>,
    routine: Option<Box<dyn crate::engine::routines::Routine>>,
}

impl StateMachine {
    pub fn new(table: Arc<StateTable>, fallbacks: FallbackKeys) -> Self {
        Self { table, fallbacks, current: None, previous: None, stack: Vec::new(), routine: None }
    }

    pub fn current_key(&self) -> Option<StateKey> {
        self.current.as_ref().map(|b| b.key())
    }

    pub fn previous_key(&self) -> Option<StateKey> {
        self.previous
    }

    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    pub fn has_routine(&self) -> bool {
        self.routine.is_some()
    }

    /// Look up `key`, degrading through the returning and idle fallbacks.
    /// `None` is fatal for the actor; the caller force-despawns.
    pub fn resolve(&self, key: StateKey) -> Option<Arc<dyn Behavior>> {
        if let Some(behavior) = self.table.get(key) {
            return Some(behavior);
        }
        warn!("no behavior registered for {key:?}");
        if let Some(returning) = self.fallbacks.returning {
            if returning != key {
                if let Some(behavior) = self.table.get(returning) {
                    debug!("{key:?} resolved to returning fallback {returning:?}");
                    return Some(behavior);
                }
            }
        }
        if let Some(idle) = self.fallbacks.idle {
            if idle != key {
                if let Some(behavior) = self.table.get(idle) {
                    debug!("{key:?} resolved to idle fallback {idle:?}");
                    return Some(behavior);
                }
            }
        }
        None
    }

    /// Transition to the behavior registered under `key`. A transition to
    /// the current key is a no-op. Not reentrant: behavior hooks request
    /// transitions through their returned `Directive`, never by calling
    /// back into the runner.
    pub fn transition_to(&mut self, key: StateKey, ctx: &mut BehaviorCtx<'_>) {
        self.follow(Directive::Transition(key), ctx);
    }

    /// Apply a directive, chasing `on_enter` redirects up to the hop limit.
    /// Returns true when the current state changed or the actor is despawning.
    fn follow(&mut self, mut directive: Directive, ctx: &mut BehaviorCtx<'_>) -> bool {
        let mut changed = false;
        for _ in 0..MAX_TRANSITION_HOPS {
            match directive {
                Directive::Stay => return changed,
                Directive::Despawn => {
                    ctx.body.despawn_requested = true;
                    return true;
                }
                Directive::Transition(key) => {
                    let Some(next) = self.resolve(key) else {
                        error!("actor {}: {}", ctx.body.id, CoreError::MissingState(key));
                        ctx.body.despawn_requested = true;
                        return true;
                    };
                    if self.current_key() == Some(next.key()) {
                        return changed;
                    }
                    directive = self.enter(next, ctx);
                    changed = true;
                }
            }
        }
        warn!("actor {}: transition chain exceeded {MAX_TRANSITION_HOPS} hops", ctx.body.id);
        let idle = self.fallbacks.idle.and_then(|k| self.table.get(k));
        match idle {
            Some(behavior) if self.current_key() != Some(behavior.key()) => {
                let _ = self.enter(behavior, ctx);
            }
            Some(_) => {}
            None => ctx.body.despawn_requested = true,
        }
        true
    }

    /// One transition step: exit the old state, cancel its routine, enter
    /// the new one. Returns whatever `on_enter` asks for next.
    fn enter(&mut self, next: Arc<dyn Behavior>, ctx: &mut BehaviorCtx<'_>) -> Directive {
        if let Some(old) = self.current.take() {
            self.previous = Some(old.key());
            old.on_exit(ctx);
        }
        // A state's task never outlives the transition away from it.
        self.routine = None;
        ctx.started_routine = None;
        self.current = Some(Arc::clone(&next));
        let directive = next.on_enter(ctx);
        self.routine = ctx.started_routine.take();
        directive
    }

    /// Drive one tick: `on_update`, then the routine, then — only if the
    /// state wants it — the once-per-arrival callback.
    pub fn tick(&mut self, ctx: &mut BehaviorCtx<'_>) {
        let Some(current) = self.current.clone() else {
            return;
        };
        let before = current.key();

        let directive = current.on_update(ctx);
        if let Some(routine) = ctx.started_routine.take() {
            self.routine = Some(routine);
        }
        if self.follow(directive, ctx) {
            return;
        }

        if let Some(mut routine) = self.routine.take() {
            match routine.tick(ctx) {
                RoutineStatus::Running => self.routine = Some(routine),
                RoutineStatus::Done(directive) => {
                    if self.follow(directive, ctx) {
                        return;
                    }
                }
            }
        }

        if self.current_key() != Some(before) {
            return;
        }
        if current.wants_arrival_callback() {
            let arrived = {
                let body = &mut *ctx.body;
                body.movement.poll_arrival(&body.transform)
            };
            if arrived {
                ctx.body.movement.stop();
                let directive = current.on_reached_destination(ctx);
                if let Some(routine) = ctx.started_routine.take() {
                    self.routine = Some(routine);
                }
                self.follow(directive, ctx);
            }
        }
    }

    /// A reactive trigger for this actor. Pushes the current state when it
    /// allows interruption, then enters the matching interrupt behavior.
    pub fn interrupt(
        &mut self,
        kind: InterruptKind,
        source: Option<ActorId>,
        ctx: &mut BehaviorCtx<'_>,
    ) {
        let Some(current) = self.current.clone() else {
            debug!("{kind:?} trigger ignored: actor {} has no behavior", ctx.body.id);
            return;
        };
        if current.key() == kind.state_key() {
            debug!("{kind:?} trigger dropped: already in {:?}", current.key());
            return;
        }
        if !current.interruptible() {
            debug!("{kind:?} trigger dropped: {:?} is not interruptible", current.key());
            return;
        }
        // Capture live path progress so the popped state resumes mid-path
        // instead of restarting.
        if let Some(progress) = ctx.body.path.progress() {
            ctx.body.pending_resume = Some(progress);
        }
        ctx.body.interactor = source;
        self.stack.push(current);
        ctx.suspending = true;
        self.transition_to(kind.state_key(), ctx);
        ctx.suspending = false;
    }

    /// The matching completion event. Pops LIFO; an empty stack degrades to
    /// idle rather than crashing.
    pub fn complete(&mut self, kind: InterruptKind, ctx: &mut BehaviorCtx<'_>) {
        if self.current_key() != Some(kind.state_key()) {
            debug!("{kind:?} completion ignored: not the active interruption");
            return;
        }
        match self.stack.pop() {
            Some(previous) => {
                let directive = self.enter(previous, ctx);
                self.follow(directive, ctx);
            }
            None => {
                warn!("{}", CoreError::StackUnderflow(ctx.body.id));
                match self.fallbacks.idle {
                    Some(idle) => self.transition_to(idle, ctx),
                    None => ctx.body.despawn_requested = true,
                }
            }
        }
    }

    /// Tear down for the low-fidelity handoff. No `on_exit` runs — the
    /// resources the snapshot mirrors (queue slot, path progress) stay
    /// claimed. Returns the behavior tag the snapshot should resume into:
    /// the bottom of the interruption stack when one exists, since interrupt
    /// sources are player-proximate and gone once the actor deactivates.
    pub fn suspend(&mut self) -> Option<StateKey> {
        let tag = self.stack.first().map(|b| b.key()).or_else(|| self.current_key());
        self.current = None;
        self.stack.clear();
        self.routine = None;
        tag
    }

    /// Despawn teardown: exit the current state, discard the stack without
    /// executing the popped states, and release held resources synchronously.
    pub fn shutdown(&mut self, ctx: &mut BehaviorCtx<'_>) {
        if let Some(current) = self.current.take() {
            self.previous = Some(current.key());
            current.on_exit(ctx);
        }
        self.stack.clear();
        self.routine = None;
        ctx.started_routine = None;
        let snapshot = ctx.body.snapshot.as_mut();
        if let Some(held) = ctx.body.queue.clear(snapshot) {
            ctx.queues.free_slot(held.queue, held.index);
            ctx.bus.publish(GameEvent::QueueReleased { queue: held.queue, index: held.index });
        }
        ctx.body.path.stop();
        ctx.body.movement.stop();
    }
}
