//! Waypoint-sequence traversal, independent of the navigation mesh.
//!
//! Used once an actor is already standing at a path's first waypoint; from
//! there it walks waypoint to waypoint at the path's fixed speed. Traversal
//! can be restored mid-path — resuming toward an arbitrary waypoint index and
//! direction — which is how both interruption recovery and the low-fidelity
//! handoff avoid re-walking already-passed waypoints.

use log::warn;

use crate::engine::ids::PathId;
use crate::engine::registry::PathRegistry;
use crate::engine::snapshot::PathProgress;
use crate::engine::types::Transform;
use crate::error::{CoreError, Result};

#[derive(Debug, Clone, PartialEq)]
struct Traversal {
    path: PathId,
    target_index: usize,
    reverse: bool,
}

#[derive(Debug, Default)]
pub struct PathFollower {
    active: Option<Traversal>,
    /// Set when a traversal completes; cleared by `start`/`restore_progress`
    /// and by `stop`, so a stale completion can never leak into the next
    /// path state.
    finished: Option<PathProgress>,
}

impl PathFollower {
    /// Begin traversal at `from_index`, heading toward the path's end in the
    /// given direction.
    pub fn start(
        &mut self,
        registry: &PathRegistry,
        path_id: PathId,
        from_index: usize,
        reverse: bool,
    ) -> Result<()> {
        let path = registry
            .get_path(&path_id)
            .ok_or_else(|| CoreError::InvalidConfig(format!("unknown path '{path_id}'")))?;
        if from_index >= path.len() {
            return Err(CoreError::InvalidPathIndex {
                path: path_id,
                index: from_index,
                len: path.len(),
            });
        }
        self.finished = None;
        self.active = Some(Traversal { path: path_id, target_index: from_index, reverse });
        Ok(())
    }

    /// Resume as if the actor had already been travelling toward
    /// `target_index`. Reaches the end with the same signal `start` would
    /// produce, without re-visiting passed waypoints.
    pub fn restore_progress(
        &mut self,
        registry: &PathRegistry,
        path_id: PathId,
        target_index: usize,
        reverse: bool,
    ) -> Result<()> {
        let Some(path) = registry.get_path(&path_id) else {
            return Err(CoreError::RestoreFailed { path: path_id, index: target_index });
        };
        if target_index >= path.len() {
            return Err(CoreError::RestoreFailed { path: path_id, index: target_index });
        }
        self.finished = None;
        self.active = Some(Traversal { path: path_id, target_index, reverse });
        Ok(())
    }

    /// Halt traversal and return movement control to the navigation handler.
    /// Idempotent.
    pub fn stop(&mut self) {
        self.active = None;
        self.finished = None;
    }

    pub fn is_following(&self) -> bool {
        self.active.is_some()
    }

    /// Progress of the in-flight traversal, for snapshots and interruption
    /// capture.
    pub fn progress(&self) -> Option<PathProgress> {
        self.active.as_ref().map(|t| PathProgress {
            path: t.path.clone(),
            target_index: t.target_index,
            reverse: t.reverse,
        })
    }

    /// True exactly once per completed traversal.
    pub fn has_reached_end_of_path(&self) -> bool {
        self.finished.is_some()
    }

    /// The traversal that just completed, while the completion latch holds.
    pub fn finished(&self) -> Option<&PathProgress> {
        self.finished.as_ref()
    }

    /// Advance toward the current target waypoint. Called once per tick while
    /// a traversal is active.
    pub fn tick(&mut self, registry: &PathRegistry, transform: &mut Transform, dt: f32) {
        let Some(t) = &mut self.active else {
            return;
        };
        let Some(path) = registry.get_path(&t.path) else {
            warn!("path '{}' vanished mid-traversal", t.path);
            self.active = None;
            return;
        };
        let Some(target) = registry.waypoint_at(&t.path, t.target_index) else {
            warn!("waypoint {} of path '{}' unresolvable", t.target_index, t.path);
            self.active = None;
            return;
        };
        transform.face_toward(target.position);
        if !transform.move_toward(target.position, path.speed * dt) {
            return;
        }
        if t.target_index == path.final_index(t.reverse) {
            transform.rotation = target.rotation;
            let done = PathProgress {
                path: t.path.clone(),
                target_index: t.target_index,
                reverse: t.reverse,
            };
            self.finished = Some(done);
            self.active = None;
        } else if t.reverse {
            t.target_index -= 1;
        } else {
            t.target_index += 1;
        }
    }
}
