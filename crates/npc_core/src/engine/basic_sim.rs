//! Low-fidelity simulation for actors outside player proximity.
//!
//! One shared-interval manager ticks every suspended actor: linear
//! interpolation toward the snapshot's target, and timeout-driven transitions
//! for behaviors with no natural arrival signal. The manager alone owns
//! arming and decrementing timers and firing the forced transitions — basic
//! states declare durations, they never count.

use std::sync::Arc;

use fxhash::FxHashMap;
use log::warn;
use rand_chacha::ChaCha8Rng;

use crate::engine::behaviors::path_follow::{resolve_end, ResolvedEnd};
use crate::engine::behaviors::{
    CashierState, CustomerState, GeneralState, PathState, StateKey,
};
use crate::engine::events::{EventBus, GameEvent};
use crate::engine::ids::ItemId;
use crate::engine::queue::QueueManager;
use crate::engine::registry::PathRegistry;
use crate::engine::snapshot::{PathProgress, SimulationSnapshot};
use crate::engine::types::step_toward;
use crate::engine::world::WorldConfig;
use serde::Deserialize;

/// Catch-up steps processed after a long stall, at most.
const MAX_CATCHUP_STEPS: u32 = 64;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BasicSimConfig {
    /// Seconds of simulated time per basic step.
    pub interval: f32,
    /// Meters per second for interpolated movement.
    pub speed: f32,
    /// Stand-in for a whole queue wait.
    pub queue_wait_secs: f32,
    /// Stand-in for being served at the register.
    pub checkout_secs: f32,
    /// Stand-in for picking one item when the shelf is unknown.
    pub browse_secs: f32,
}

impl Default for BasicSimConfig {
    fn default() -> Self {
        Self {
            interval: 0.5,
            speed: 1.6,
            queue_wait_secs: 18.0,
            checkout_secs: 6.0,
            browse_secs: 2.0,
        }
    }
}

/// Shared services a basic state may consult. No movement handlers, no
/// navigation — saved data only.
pub struct BasicCtx<'a> {
    pub registry: &'a PathRegistry,
    pub config: &'a WorldConfig,
    pub queues: &'a mut dyn QueueManager,
    pub bus: &'a mut EventBus,
    pub rng: &'a mut ChaCha8Rng,
    /// The suspended actor's shopping list.
    pub items: &'a mut Vec<ItemId>,
}

/// What one basic step decided about the actor as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BasicOutcome {
    Stay,
    Transition(StateKey),
    Despawn,
}

/// Reduced counterpart of one full behavior, operating purely on the
/// snapshot. Stateless and shared, like the full definitions.
pub trait BasicBehavior: Send + Sync {
    /// Point the snapshot at its next target, if the state walks anywhere.
    /// Called on entry and whenever neither a target nor a timer is set.
    fn arm(&self, _snap: &mut SimulationSnapshot, _ctx: &mut BasicCtx<'_>) {}

    /// Countdown to arm while no target is set. The manager decrements it.
    fn timeout(&self, _ctx: &BasicCtx<'_>) -> Option<f32> {
        None
    }

    /// Forced transition fired by the manager when the countdown expires.
    fn on_timeout(&self, _snap: &SimulationSnapshot) -> StateKey {
        StateKey::IDLE
    }

    /// The snapshot reached its target (target already cleared).
    fn on_arrived(&self, _snap: &mut SimulationSnapshot, _ctx: &mut BasicCtx<'_>) -> BasicOutcome {
        BasicOutcome::Stay
    }
}

/// Inert stand-in; also the fallback for keys with no basic equivalent.
struct BasicIdle;

impl BasicBehavior for BasicIdle {}

/// Walk to the despawn point, then leave the scene for good.
struct BasicTravelOut;

impl BasicBehavior for BasicTravelOut {
    fn arm(&self, snap: &mut SimulationSnapshot, ctx: &mut BasicCtx<'_>) {
        release_queue_slot(snap, ctx);
        snap.target = Some(ctx.config.despawn.position);
    }

    fn on_arrived(&self, _snap: &mut SimulationSnapshot, _ctx: &mut BasicCtx<'_>) -> BasicOutcome {
        BasicOutcome::Despawn
    }
}

/// Tick through the shopping list by walking shelf to shelf.
struct BasicShopping;

impl BasicBehavior for BasicShopping {
    fn arm(&self, snap: &mut SimulationSnapshot, ctx: &mut BasicCtx<'_>) {
        if let Some(item) = ctx.items.first() {
            let shelf = ctx
                .config
                .shelves
                .get(item)
                .and_then(|wp| ctx.registry.get_waypoint_transform(wp));
            snap.target = shelf.map(|t| t.position);
        }
    }

    fn timeout(&self, ctx: &BasicCtx<'_>) -> Option<f32> {
        // No shelf to walk to: either the list is done or the item is
        // unplaceable. Either way a short beat, then move on.
        Some(ctx.config.basic.browse_secs)
    }

    fn on_timeout(&self, _snap: &SimulationSnapshot) -> StateKey {
        StateKey::Customer(CustomerState::QueueWaiting)
    }

    fn on_arrived(&self, snap: &mut SimulationSnapshot, ctx: &mut BasicCtx<'_>) -> BasicOutcome {
        if !ctx.items.is_empty() {
            ctx.items.remove(0);
        }
        if ctx.items.is_empty() {
            return BasicOutcome::Transition(StateKey::Customer(CustomerState::QueueWaiting));
        }
        // Straight on to the next shelf; the browse timeout only covers
        // items with no placeable shelf.
        self.arm(snap, ctx);
        BasicOutcome::Stay
    }
}

/// The whole queue wait, collapsed into one countdown.
struct BasicQueueWait;

impl BasicBehavior for BasicQueueWait {
    fn timeout(&self, ctx: &BasicCtx<'_>) -> Option<f32> {
        Some(ctx.config.basic.queue_wait_secs)
    }

    fn on_timeout(&self, _snap: &SimulationSnapshot) -> StateKey {
        StateKey::Customer(CustomerState::CheckingOut)
    }
}

/// Being served, collapsed into one countdown.
struct BasicCheckout;

impl BasicBehavior for BasicCheckout {
    fn arm(&self, snap: &mut SimulationSnapshot, ctx: &mut BasicCtx<'_>) {
        release_queue_slot(snap, ctx);
    }

    fn timeout(&self, ctx: &BasicCtx<'_>) -> Option<f32> {
        Some(ctx.config.basic.checkout_secs)
    }

    fn on_timeout(&self, _snap: &SimulationSnapshot) -> StateKey {
        StateKey::Customer(CustomerState::Exiting)
    }
}

/// Waypoint-by-waypoint walk mirroring the live path follower, so the full
/// runtime can resume at the exact index this simulation reached.
struct BasicPathWalk;

impl BasicPathWalk {
    fn progress_of(
        snap: &SimulationSnapshot,
        ctx: &BasicCtx<'_>,
    ) -> Option<PathProgress> {
        if let Some(progress) = &snap.path {
            return Some(progress.clone());
        }
        // Suspended on the navigation leg before the path started: synthesize
        // progress from the key's binding.
        let StateKey::Path(state) = snap.behavior else {
            return None;
        };
        let path = ctx.config.path_bindings.get(&state)?.clone();
        let first = ctx.registry.get_path(&path)?.first_index(false);
        Some(PathProgress { path, target_index: first, reverse: false })
    }
}

impl BasicBehavior for BasicPathWalk {
    fn arm(&self, snap: &mut SimulationSnapshot, ctx: &mut BasicCtx<'_>) {
        let Some(progress) = Self::progress_of(snap, ctx) else {
            return;
        };
        snap.target = ctx
            .registry
            .waypoint_at(&progress.path, progress.target_index)
            .map(|t| t.position);
        snap.path = Some(progress);
    }

    fn timeout(&self, _ctx: &BasicCtx<'_>) -> Option<f32> {
        // Unresolvable path data: don't walk, don't hang.
        Some(1.0)
    }

    fn on_arrived(&self, snap: &mut SimulationSnapshot, ctx: &mut BasicCtx<'_>) -> BasicOutcome {
        let Some(progress) = snap.path.clone() else {
            return BasicOutcome::Stay;
        };
        let Some(path) = ctx.registry.get_path(&progress.path) else {
            snap.path = None;
            return BasicOutcome::Transition(StateKey::IDLE);
        };
        if progress.target_index != path.final_index(progress.reverse) {
            let next_index = if progress.reverse {
                progress.target_index - 1
            } else {
                progress.target_index + 1
            };
            snap.target =
                ctx.registry.waypoint_at(&progress.path, next_index).map(|t| t.position);
            snap.path = Some(PathProgress { target_index: next_index, ..progress });
            return BasicOutcome::Stay;
        }
        // End of the path: same decision the live behavior would make.
        snap.path = None;
        match resolve_end(&path.on_end, ctx.items.is_empty(), 0) {
            Some(ResolvedEnd::Continue { path: next, start_index, reverse }) => {
                match ctx.registry.waypoint_at(&next, start_index) {
                    Some(waypoint) => {
                        snap.target = Some(waypoint.position);
                        snap.path =
                            Some(PathProgress { path: next, target_index: start_index, reverse });
                        BasicOutcome::Stay
                    }
                    None => BasicOutcome::Transition(StateKey::IDLE),
                }
            }
            Some(ResolvedEnd::Enter(state)) => BasicOutcome::Transition(state),
            None => BasicOutcome::Transition(StateKey::IDLE),
        }
    }
}

fn release_queue_slot(snap: &mut SimulationSnapshot, ctx: &mut BasicCtx<'_>) {
    if let Some(held) = snap.queue.take() {
        ctx.queues.free_slot(held.queue, held.index);
        ctx.bus.publish(GameEvent::QueueReleased { queue: held.queue, index: held.index });
    }
}

pub struct BasicSimulator {
    table: FxHashMap<StateKey, Arc<dyn BasicBehavior>>,
    fallback: Arc<dyn BasicBehavior>,
    accumulator: f32,
}

impl Default for BasicSimulator {
    fn default() -> Self {
        Self::new()
    }
}

impl BasicSimulator {
    pub fn new() -> Self {
        let idle: Arc<dyn BasicBehavior> = Arc::new(BasicIdle);
        let travel_out: Arc<dyn BasicBehavior> = Arc::new(BasicTravelOut);
        let path_walk: Arc<dyn BasicBehavior> = Arc::new(BasicPathWalk);
        let mut table: FxHashMap<StateKey, Arc<dyn BasicBehavior>> = FxHashMap::default();
        table.insert(StateKey::General(GeneralState::Idle), Arc::clone(&idle));
        table.insert(StateKey::General(GeneralState::Returning), Arc::clone(&travel_out));
        table.insert(StateKey::Customer(CustomerState::Shopping), Arc::new(BasicShopping));
        table.insert(StateKey::Customer(CustomerState::QueueWaiting), Arc::new(BasicQueueWait));
        table.insert(StateKey::Customer(CustomerState::CheckingOut), Arc::new(BasicCheckout));
        table.insert(StateKey::Customer(CustomerState::Exiting), Arc::clone(&travel_out));
        table.insert(StateKey::Cashier(CashierState::Working), Arc::clone(&idle));
        for state in
            [PathState::Entering, PathState::Browsing, PathState::ToCheckout, PathState::ToExit]
        {
            table.insert(StateKey::Path(state), Arc::clone(&path_walk));
        }
        Self { table, fallback: idle, accumulator: 0.0 }
    }

    /// Accumulate wall time; returns how many fixed steps are due.
    pub fn accrue(&mut self, dt: f32, interval: f32) -> u32 {
        self.accumulator += dt;
        let mut due = 0;
        while self.accumulator >= interval && due < MAX_CATCHUP_STEPS {
            self.accumulator -= interval;
            due += 1;
        }
        if due == MAX_CATCHUP_STEPS {
            warn!("basic simulation fell behind; dropping backlog");
            self.accumulator = 0.0;
        }
        due
    }

    fn behavior_for(&self, key: StateKey) -> Arc<dyn BasicBehavior> {
        self.table.get(&key).cloned().unwrap_or_else(|| Arc::clone(&self.fallback))
    }

    fn enter(&self, key: StateKey, snap: &mut SimulationSnapshot, ctx: &mut BasicCtx<'_>) {
        snap.behavior = key;
        snap.target = None;
        snap.timer = None;
        let behavior = self.behavior_for(key);
        behavior.arm(snap, ctx);
        if snap.target.is_none() {
            snap.timer = behavior.timeout(ctx);
        }
    }

    /// One fixed step for one suspended actor.
    pub fn step(
        &self,
        snap: &mut SimulationSnapshot,
        ctx: &mut BasicCtx<'_>,
        interval: f32,
    ) -> BasicOutcome {
        let behavior = self.behavior_for(snap.behavior);

        if snap.target.is_none() && snap.timer.is_none() {
            behavior.arm(snap, ctx);
            if snap.target.is_none() {
                snap.timer = behavior.timeout(ctx);
            }
        }

        if let Some(target) = snap.target {
            if step_toward(&mut snap.position, target, ctx.config.basic.speed * interval) {
                snap.target = None;
                match behavior.on_arrived(snap, ctx) {
                    BasicOutcome::Stay => {
                        if snap.target.is_none() && snap.timer.is_none() {
                            snap.timer = behavior.timeout(ctx);
                        }
                    }
                    BasicOutcome::Transition(next) => self.enter(next, snap, ctx),
                    BasicOutcome::Despawn => return BasicOutcome::Despawn,
                }
            }
            return BasicOutcome::Stay;
        }

        if let Some(timer) = snap.timer.as_mut() {
            *timer -= interval;
            if *timer <= 0.0 {
                snap.timer = None;
                let next = behavior.on_timeout(snap);
                self.enter(next, snap, ctx);
            }
        }
        BasicOutcome::Stay
    }
}
