//! Path-following behaviors.
//!
//! Each `PathState` key is bound to a concrete path id at load time. Entering
//! the state walks the actor to the path's first waypoint over the navigation
//! mesh, then hands motion to the path follower — unless a mid-path capture
//! is waiting (interruption pop or fidelity resume), in which case the
//! follower restores straight to the recorded waypoint index and the
//! navigation leg is skipped entirely.

use std::sync::Arc;

use fxhash::FxHashMap;
use log::warn;

use crate::engine::behaviors::traits::{Behavior, Directive};
use crate::engine::behaviors::{PathState, StateKey};
use crate::engine::context::BehaviorCtx;
use crate::engine::ids::PathId;
use crate::engine::machine::BehaviorSet;
use crate::engine::registry::{DecisionRule, PathEndPolicy, PathRegistry};
use crate::engine::snapshot::PathProgress;
use crate::error::{CoreError, Result};

const MAX_POLICY_DEPTH: usize = 8;

pub struct FollowPathBehavior {
    key: StateKey,
    path: PathId,
    reverse: bool,
}

impl FollowPathBehavior {
    pub fn new(state: PathState, path: PathId) -> Self {
        Self { key: StateKey::Path(state), path, reverse: false }
    }

    pub fn reversed(mut self) -> Self {
        self.reverse = true;
        self
    }
}

/// A fully resolved end-of-path outcome.
pub(crate) enum ResolvedEnd {
    Continue { path: PathId, start_index: usize, reverse: bool },
    Enter(StateKey),
}

/// Walk the policy tree down to a concrete outcome. `list_empty` is the
/// actor-local datum decision points branch on. Shared with the basic
/// simulator so both fidelities branch identically.
pub(crate) fn resolve_end(
    policy: &PathEndPolicy,
    list_empty: bool,
    depth: usize,
) -> Option<ResolvedEnd> {
    if depth > MAX_POLICY_DEPTH {
        return None;
    }
    match policy {
        PathEndPolicy::Continue { path, start_index, reverse } => Some(ResolvedEnd::Continue {
            path: path.clone(),
            start_index: *start_index,
            reverse: *reverse,
        }),
        PathEndPolicy::Enter { state } => Some(ResolvedEnd::Enter(*state)),
        PathEndPolicy::Decision { rule } => match rule {
            DecisionRule::ShoppingListEmpty { then, otherwise } => {
                let branch = if list_empty { then } else { otherwise };
                resolve_end(branch, list_empty, depth + 1)
            }
        },
    }
}

impl Behavior for FollowPathBehavior {
    fn key(&self) -> StateKey {
        self.key
    }

    fn wants_arrival_callback(&self) -> bool {
        true
    }

    fn on_enter(&self, ctx: &mut BehaviorCtx<'_>) -> Directive {
        if let Some(progress) = ctx.body.pending_resume.take() {
            if progress.path == self.path {
                let restored = ctx.body.path.restore_progress(
                    ctx.registry,
                    progress.path.clone(),
                    progress.target_index,
                    progress.reverse,
                );
                match restored {
                    Ok(()) => return Directive::Stay,
                    Err(err) => {
                        warn!("actor {}: {err}; starting '{}' from the top", ctx.body.id, self.path);
                    }
                }
            }
        }
        let first = ctx
            .registry
            .get_path(&self.path)
            .map(|p| p.first_index(self.reverse))
            .and_then(|i| ctx.registry.waypoint_at(&self.path, i));
        match first {
            Some(waypoint) if ctx.set_destination(waypoint.position) => Directive::Stay,
            _ => {
                warn!("actor {}: path '{}' unreachable", ctx.body.id, self.path);
                Directive::Transition(StateKey::RETURNING)
            }
        }
    }

    fn on_reached_destination(&self, ctx: &mut BehaviorCtx<'_>) -> Directive {
        let first = match ctx.registry.get_path(&self.path) {
            Some(path) => path.first_index(self.reverse),
            None => {
                warn!("actor {}: path '{}' vanished", ctx.body.id, self.path);
                return Directive::Transition(StateKey::RETURNING);
            }
        };
        match ctx.body.path.start(ctx.registry, self.path.clone(), first, self.reverse) {
            Ok(()) => Directive::Stay,
            Err(err) => {
                warn!("actor {}: {err}", ctx.body.id);
                Directive::Transition(StateKey::RETURNING)
            }
        }
    }

    fn on_update(&self, ctx: &mut BehaviorCtx<'_>) -> Directive {
        let Some(done) = ctx.body.path.finished().cloned() else {
            return Directive::Stay;
        };
        next_leg(ctx, &done)
    }

    fn on_exit(&self, ctx: &mut BehaviorCtx<'_>) {
        ctx.body.path.stop();
    }
}

/// Apply the completed path's end policy: chain onto the next path, enter a
/// behavior, or — when nothing resolves — fall back to idle.
fn next_leg(ctx: &mut BehaviorCtx<'_>, done: &PathProgress) -> Directive {
    let Some(path) = ctx.registry.get_path(&done.path) else {
        warn!("completed path '{}' no longer registered", done.path);
        return Directive::Transition(StateKey::IDLE);
    };
    match resolve_end(&path.on_end, ctx.body.shopping_list.is_empty(), 0) {
        Some(ResolvedEnd::Continue { path, start_index, reverse }) => {
            match ctx.body.path.start(ctx.registry, path, start_index, reverse) {
                Ok(()) => Directive::Stay,
                Err(err) => {
                    warn!("actor {}: {err}", ctx.body.id);
                    Directive::Transition(StateKey::IDLE)
                }
            }
        }
        Some(ResolvedEnd::Enter(state)) => Directive::Transition(state),
        None => {
            warn!("end policy of '{}' did not resolve", done.path);
            Directive::Transition(StateKey::IDLE)
        }
    }
}

/// Build the path behavior set from the world's key→path bindings. Checked
/// against the registry once, at load.
pub fn build_path_set(
    bindings: &FxHashMap<PathState, PathId>,
    registry: &PathRegistry,
) -> Result<BehaviorSet> {
    let mut set: BehaviorSet = Vec::with_capacity(bindings.len());
    for (state, path) in bindings {
        if registry.get_path(path).is_none() {
            return Err(CoreError::InvalidConfig(format!(
                "path state {state:?} bound to unknown path '{path}'"
            )));
        }
        set.push(Arc::new(FollowPathBehavior::new(*state, path.clone())));
    }
    Ok(set)
}
