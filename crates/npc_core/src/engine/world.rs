//! Composition root: actor storage, the tick loop, and the fidelity handoff.
//!
//! Everything the behaviors consume — registry, navigator, queue manager,
//! register board, event bus, RNG — is owned here and threaded through
//! explicitly. Single-threaded and tick-driven: all mutation of an actor
//! happens synchronously inside its own tick call, and cross-actor effects
//! only travel through the bus and the managers.

use std::sync::Arc;

use fxhash::FxHashMap;
use log::{debug, warn};
use nalgebra::Point3;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;

use crate::engine::actor::{Actor, ActorBody, ActorKind};
use crate::engine::basic_sim::{BasicCtx, BasicOutcome, BasicSimConfig, BasicSimulator};
use crate::engine::behaviors::path_follow::build_path_set;
use crate::engine::behaviors::{
    CustomerState, PathState, StateKey, CASHIER_SET, CUSTOMER_SET, GENERAL_SET,
};
use crate::engine::context::BehaviorCtx;
use crate::engine::events::{relay, EventBus, GameEvent, RelayAction};
use crate::engine::ids::{ActorId, ItemId, PathId, WaypointId};
use crate::engine::machine::{BehaviorSet, FallbackKeys, StateMachine, StateTable};
use crate::engine::nav::Navigator;
use crate::engine::queue::{QueueManager, QueueType};
use crate::engine::registers::RegisterBoard;
use crate::engine::registry::PathRegistry;
use crate::engine::snapshot::SimulationSnapshot;
use crate::engine::types::Transform;
use crate::error::{CoreError, Result};

/// Events processed per drain pass before deferring to the next tick.
const MAX_EVENTS_PER_TICK: usize = 256;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub spawn: Transform,
    pub despawn: Transform,
    pub register_spot: Transform,
    pub cashier_station: Transform,
    /// Item → shelf waypoint the customer walks to for it.
    pub shelves: FxHashMap<ItemId, WaypointId>,
    /// Path-state key → concrete path id.
    pub path_bindings: FxHashMap<PathState, PathId>,
    pub customer_entry: StateKey,
    pub cashier_entry: StateKey,
    pub walk_speed: f32,
    pub impatience_secs: f32,
    pub checkout_timeout_secs: f32,
    pub combat_timeout_secs: f32,
    pub interaction_timeout_secs: f32,
    pub emote_secs: f32,
    pub service_secs_mean: f32,
    pub service_secs_std: f32,
    pub basic: BasicSimConfig,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            spawn: Transform::at(0.0, 0.0, 0.0),
            despawn: Transform::at(0.0, 0.0, -2.0),
            register_spot: Transform::at(10.0, 0.0, 0.0),
            cashier_station: Transform::at(10.5, 0.0, 1.0),
            shelves: FxHashMap::default(),
            path_bindings: FxHashMap::default(),
            customer_entry: StateKey::Customer(CustomerState::Shopping),
            cashier_entry: StateKey::Cashier(crate::engine::behaviors::CashierState::Working),
            walk_speed: 1.6,
            impatience_secs: 45.0,
            checkout_timeout_secs: 30.0,
            combat_timeout_secs: 20.0,
            interaction_timeout_secs: 15.0,
            emote_secs: 3.0,
            service_secs_mean: 4.0,
            service_secs_std: 1.0,
            basic: BasicSimConfig::default(),
        }
    }
}

pub struct World {
    registry: Arc<PathRegistry>,
    nav: Box<dyn Navigator>,
    queues: Box<dyn QueueManager>,
    registers: RegisterBoard,
    bus: EventBus,
    rng: ChaCha8Rng,
    config: WorldConfig,
    basic: BasicSimulator,
    path_set: BehaviorSet,
    fallbacks: FallbackKeys,
    actors: FxHashMap<ActorId, Actor>,
    order: Vec<ActorId>,
    pool: Vec<ActorBody>,
    event_log: Vec<GameEvent>,
}

impl World {
    /// All config cross-references are checked here, once; lookups after a
    /// successful construction treat them as settled.
    pub fn new(
        registry: Arc<PathRegistry>,
        nav: Box<dyn Navigator>,
        queues: Box<dyn QueueManager>,
        mut config: WorldConfig,
        seed: u64,
    ) -> Result<Self> {
        if registry.is_empty() && !config.path_bindings.is_empty() {
            // Configuration error, not a crash: actors degrade through the
            // resolve fallbacks instead of holding unresolvable path states.
            log::error!("{}", CoreError::MissingCollaborator("path registry"));
            config.path_bindings.clear();
            config.shelves.clear();
        }
        let path_set = build_path_set(&config.path_bindings, &registry)?;
        for (item, waypoint) in &config.shelves {
            if registry.get_waypoint_transform(waypoint).is_none() {
                return Err(CoreError::InvalidConfig(format!(
                    "shelf for '{item}' references unknown waypoint '{waypoint}'"
                )));
            }
        }
        Ok(Self {
            registry,
            nav,
            queues,
            registers: RegisterBoard::default(),
            bus: EventBus::default(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            config,
            basic: BasicSimulator::new(),
            path_set,
            fallbacks: FallbackKeys::default(),
            actors: FxHashMap::default(),
            order: Vec::new(),
            pool: Vec::new(),
            event_log: Vec::new(),
        })
    }

    // ------------------------------------------------------------------
    // Spawning
    // ------------------------------------------------------------------

    pub fn spawn_customer(&mut self, items: Vec<ItemId>, queue: QueueType) -> ActorId {
        let entry = self.config.customer_entry;
        self.spawn(ActorKind::Customer, entry, |body| {
            body.shopping_list = items;
            body.preferred_queue = queue;
        })
    }

    pub fn spawn_cashier(&mut self) -> ActorId {
        let entry = self.config.cashier_entry;
        self.spawn(ActorKind::Cashier, entry, |_| {})
    }

    fn spawn(
        &mut self,
        kind: ActorKind,
        initial: StateKey,
        customize: impl FnOnce(&mut ActorBody),
    ) -> ActorId {
        let spawn_at = self.config.spawn;
        let mut body = match self.pool.pop() {
            Some(mut pooled) => {
                pooled.reset(kind, spawn_at);
                pooled
            }
            None => ActorBody::new(kind, spawn_at, self.config.walk_speed),
        };
        customize(&mut body);
        let id = body.id;

        // Per-actor table, composed in order: general first, then the
        // data-driven path set, then the kind set. Last writer wins per key.
        let kind_set: &BehaviorSet = match kind {
            ActorKind::Customer => &CUSTOMER_SET,
            ActorKind::Cashier => &CASHIER_SET,
        };
        let table = StateTable::compile(&[&*GENERAL_SET, &self.path_set, kind_set]);
        let machine = StateMachine::new(Arc::new(table), self.fallbacks);

        self.actors.insert(id, Actor { body, machine, active: true });
        self.order.push(id);
        self.with_actor(id, 0.0, |machine, ctx| machine.transition_to(initial, ctx));
        id
    }

    pub fn despawn(&mut self, id: ActorId) {
        self.with_actor(id, 0.0, |machine, ctx| machine.shutdown(ctx));
        if let Some(actor) = self.actors.remove(&id) {
            self.order.retain(|a| *a != id);
            self.pool.push(actor.body);
        }
    }

    // ------------------------------------------------------------------
    // Tick loop
    // ------------------------------------------------------------------

    pub fn tick(&mut self, dt: f32) {
        let ids: Vec<ActorId> = self.order.clone();
        for id in ids {
            let Some(actor) = self.actors.get_mut(&id) else {
                continue;
            };
            if !actor.active {
                continue;
            }
            // Physical advance first, so the machine's arrival check sees
            // this tick's motion after its own on_update.
            let body = &mut actor.body;
            {
                let ActorBody { movement, transform, .. } = body;
                movement.tick(transform, dt);
            }
            {
                let ActorBody { path, transform, .. } = body;
                path.tick(&self.registry, transform, dt);
            }
            self.with_actor(id, dt, |machine, ctx| machine.tick(ctx));
        }
        self.drain_events();
        self.basic_tick(dt);
        self.sweep_despawns();
        self.drain_events();
    }

    fn drain_events(&mut self) {
        for _ in 0..MAX_EVENTS_PER_TICK {
            let Some(event) = self.bus.pop() else {
                return;
            };
            self.event_log.push(event.clone());
            self.dispatch(event);
        }
        if !self.bus.is_empty() {
            warn!("event backlog of {} deferred to next tick", self.bus.len());
        }
    }

    fn dispatch(&mut self, event: GameEvent) {
        if let GameEvent::TransactionCompleted { customer } = &event {
            self.registers.finish(*customer);
        }
        match relay(&event) {
            RelayAction::Interrupt { actor, kind, source } => {
                self.with_actor(actor, 0.0, |machine, ctx| machine.interrupt(kind, source, ctx));
            }
            RelayAction::Complete { actor, kind } => {
                self.with_actor(actor, 0.0, |machine, ctx| machine.complete(kind, ctx));
            }
            RelayAction::TransitionIf { actor, only_if, to } => {
                self.with_actor(actor, 0.0, |machine, ctx| {
                    if machine.current_key() == Some(only_if) {
                        machine.transition_to(to, ctx);
                    } else {
                        debug!("guarded transition to {to:?} skipped for {actor}");
                    }
                });
            }
            RelayAction::QueueCascade { queue } => self.apply_cascade(queue),
            RelayAction::None => {}
        }
    }

    fn apply_cascade(&mut self, queue: QueueType) {
        let steps = self.queues.cascade_plan(queue);
        for step in steps {
            let moved = self.with_actor(step.actor, 0.0, |machine, ctx| {
                // Only actors actually standing in line shuffle forward;
                // an interrupted holder keeps its slot where it is.
                if machine.current_key() == Some(StateKey::Customer(CustomerState::QueueWaiting)) {
                    ctx.move_to_queue_spot(step.spot, step.new_index)
                } else {
                    true
                }
            });
            if moved == Some(false) {
                // Movement could not be initiated; never leave the manager
                // pointing at an unreachable actor.
                self.with_actor(step.actor, 0.0, |machine, ctx| {
                    machine.transition_to(StateKey::Customer(CustomerState::Exiting), ctx);
                });
            }
        }
    }

    fn basic_tick(&mut self, dt: f32) {
        let interval = self.config.basic.interval;
        let steps = self.basic.accrue(dt, interval);
        for _ in 0..steps {
            let ids: Vec<ActorId> = self.order.clone();
            for id in ids {
                let Self { actors, registry, queues, bus, rng, config, basic, .. } = self;
                let Some(actor) = actors.get_mut(&id) else {
                    continue;
                };
                if actor.active {
                    continue;
                }
                let ActorBody { snapshot, shopping_list, despawn_requested, queue, .. } =
                    &mut actor.body;
                let Some(snap) = snapshot.as_mut() else {
                    continue;
                };
                let mut ctx = BasicCtx {
                    registry: &**registry,
                    config: &*config,
                    queues: queues.as_mut(),
                    bus,
                    rng,
                    items: shopping_list,
                };
                if basic.step(snap, &mut ctx, interval) == BasicOutcome::Despawn {
                    *despawn_requested = true;
                }
                // Keep the live handler mirroring the snapshot while
                // suspended, so teardown never double-frees a slot.
                if snap.queue.is_none() {
                    queue.clear(None);
                }
            }
        }
    }

    fn sweep_despawns(&mut self) {
        let doomed: Vec<ActorId> = self
            .actors
            .iter()
            .filter(|(_, actor)| actor.body.despawn_requested)
            .map(|(id, _)| *id)
            .collect();
        for id in doomed {
            self.despawn(id);
        }
    }

    // ------------------------------------------------------------------
    // Fidelity handoff
    // ------------------------------------------------------------------

    /// Tear the actor down to the cheap simulation. Its snapshot captures
    /// path and queue progress; the live handlers are then stopped.
    pub fn deactivate(&mut self, id: ActorId) {
        let registry = Arc::clone(&self.registry);
        let Some(actor) = self.actors.get_mut(&id) else {
            return;
        };
        if !actor.active {
            return;
        }
        let tag = actor.machine.suspend().unwrap_or(StateKey::IDLE);
        let body = &mut actor.body;
        let mut snap = SimulationSnapshot::new(tag, &body.transform);
        snap.path = body.path.progress();
        snap.queue = body.queue.assignment();
        snap.target = match &snap.path {
            Some(p) => registry.waypoint_at(&p.path, p.target_index).map(|t| t.position),
            None => body.movement.destination(),
        };
        body.path.stop();
        body.movement.stop();
        body.pending_resume = None;
        body.snapshot = Some(snap);
        actor.active = false;
    }

    /// Reconstitute the full machine from the snapshot, consuming it. A
    /// rejected mid-path restore degrades to starting the path from its
    /// beginning via navigation — never a fatal error.
    pub fn activate(&mut self, id: ActorId) {
        let Some(actor) = self.actors.get_mut(&id) else {
            return;
        };
        if actor.active {
            return;
        }
        actor.active = true;
        let Some(snap) = actor.body.snapshot.take() else {
            self.with_actor(id, 0.0, |machine, ctx| {
                machine.transition_to(StateKey::IDLE, ctx)
            });
            return;
        };
        actor.body.transform = snap.transform();
        match snap.queue {
            Some(held) => actor.body.queue.assign(held.queue, held.index, None),
            None => {
                actor.body.queue.clear(None);
            }
        }
        actor.body.pending_resume = snap.path.clone();
        let behavior = snap.behavior;
        self.with_actor(id, 0.0, |machine, ctx| machine.transition_to(behavior, ctx));
        if let Some(actor) = self.actors.get_mut(&id) {
            // Anything the entered behavior did not consume is stale.
            actor.body.pending_resume = None;
        }
    }

    // ------------------------------------------------------------------
    // Collaborator-facing surface
    // ------------------------------------------------------------------

    /// Inject a domain event (attack, interaction, transaction...). Handled
    /// in the same tick it is drained.
    pub fn publish(&mut self, event: GameEvent) {
        self.bus.publish(event);
    }

    pub fn transition_actor(&mut self, id: ActorId, key: StateKey) {
        self.with_actor(id, 0.0, |machine, ctx| machine.transition_to(key, ctx));
    }

    pub fn current_state(&self, id: ActorId) -> Option<StateKey> {
        self.actors.get(&id).and_then(|a| a.machine.current_key())
    }

    pub fn items_to_buy(&self, id: ActorId) -> Option<&[ItemId]> {
        self.actors.get(&id).map(|a| a.body.items_to_buy())
    }

    pub fn queue_assignment(&self, id: ActorId) -> Option<crate::engine::queue::QueueAssignment> {
        self.actors.get(&id).and_then(|a| a.body.queue.assignment())
    }

    pub fn position(&self, id: ActorId) -> Option<Point3<f32>> {
        self.actors.get(&id).map(|a| a.body.transform.position)
    }

    pub fn snapshot(&self, id: ActorId) -> Option<&SimulationSnapshot> {
        self.actors.get(&id).and_then(|a| a.body.snapshot.as_ref())
    }

    pub fn is_active(&self, id: ActorId) -> Option<bool> {
        self.actors.get(&id).map(|a| a.active)
    }

    pub fn stack_depth(&self, id: ActorId) -> Option<usize> {
        self.actors.get(&id).map(|a| a.machine.stack_depth())
    }

    pub fn actor_count(&self) -> usize {
        self.actors.len()
    }

    pub fn contains(&self, id: ActorId) -> bool {
        self.actors.contains_key(&id)
    }

    /// Every event drained so far, in order. Mostly for tests and tooling.
    pub fn event_log(&self) -> &[GameEvent] {
        &self.event_log
    }

    #[cfg(test)]
    pub(crate) fn actor(&self, id: ActorId) -> Option<&Actor> {
        self.actors.get(&id)
    }

    // ------------------------------------------------------------------

    /// Split-borrow helper: one actor's machine plus a context over the
    /// shared services.
    fn with_actor<R>(
        &mut self,
        id: ActorId,
        dt: f32,
        f: impl FnOnce(&mut StateMachine, &mut BehaviorCtx<'_>) -> R,
    ) -> Option<R> {
        let Self { actors, registry, nav, queues, registers, bus, rng, config, .. } = self;
        let actor = actors.get_mut(&id)?;
        let mut ctx = BehaviorCtx {
            body: &mut actor.body,
            registry: &**registry,
            nav: nav.as_ref(),
            queues: queues.as_mut(),
            registers,
            bus,
            rng,
            config: &*config,
            dt,
            suspending: false,
            started_routine: None,
        };
        Some(f(&mut actor.machine, &mut ctx))
    }
}
