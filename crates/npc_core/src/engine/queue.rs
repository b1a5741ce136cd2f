//! Queue assignments and the queue-manager boundary.
//!
//! The per-actor handler only records which slot the actor holds and tells
//! the owning manager when slots open up; slot bookkeeping itself belongs to
//! the manager. Freeing happens on departure-start, not on arrival, so the
//! manager can cascade the next actor forward without waiting.

use fxhash::FxHashMap;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::engine::ids::ActorId;
use crate::engine::snapshot::SimulationSnapshot;
use crate::engine::types::Transform;

/// Which waiting line an actor occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueType {
    Main,
    Secondary,
    Prescription,
}

/// A held slot. Index 0 is the head of the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueAssignment {
    pub queue: QueueType,
    pub index: usize,
}

/// Slot bookkeeping owned by the external queue manager.
pub trait QueueManager: Send {
    /// Claim the first open slot; returns the spot to stand at and its index.
    fn try_join(&mut self, queue: QueueType, actor: ActorId) -> Option<(Transform, usize)>;

    /// Claim a specific slot for an actor. Returns false when taken.
    fn claim_slot(&mut self, queue: QueueType, index: usize, actor: ActorId) -> bool;

    /// Release a slot. Returns false when the slot was not held.
    fn free_slot(&mut self, queue: QueueType, index: usize) -> bool;

    /// Plan which actors move forward into open slots. Read-only; the moves
    /// are applied through `claim_slot`/`free_slot` as each actor departs.
    fn cascade_plan(&self, queue: QueueType) -> Vec<CascadeStep>;

    /// Spot transform for a slot, for movement commands.
    fn slot_transform(&self, queue: QueueType, index: usize) -> Option<Transform>;
}

/// One forward move in a cascade.
#[derive(Debug, Clone, PartialEq)]
pub struct CascadeStep {
    pub actor: ActorId,
    pub new_index: usize,
    pub spot: Transform,
}

/// Tracks the actor's own slot and mirrors it into an attached snapshot.
#[derive(Debug, Default)]
pub struct QueueHandler {
    assignment: Option<QueueAssignment>,
}

impl QueueHandler {
    pub fn assignment(&self) -> Option<QueueAssignment> {
        self.assignment
    }

    /// Record a slot and mirror it into the snapshot, if one is attached.
    pub fn assign(
        &mut self,
        queue: QueueType,
        index: usize,
        snapshot: Option<&mut SimulationSnapshot>,
    ) {
        let assignment = QueueAssignment { queue, index };
        self.assignment = Some(assignment);
        if let Some(snap) = snapshot {
            snap.queue = Some(assignment);
        }
    }

    /// Reset to unassigned. Returns the dropped assignment so the caller can
    /// release it with the manager.
    pub fn clear(&mut self, snapshot: Option<&mut SimulationSnapshot>) -> Option<QueueAssignment> {
        if let Some(snap) = snapshot {
            snap.queue = None;
        }
        self.assignment.take()
    }
}

/// Straight-line queue manager: fixed anchor per queue, slots spaced behind
/// it, actors always packed toward the head.
#[derive(Debug)]
pub struct LineQueueManager {
    lines: FxHashMap<QueueType, Line>,
}

#[derive(Debug)]
struct Line {
    spots: Vec<Transform>,
    occupants: Vec<Option<ActorId>>,
}

impl LineQueueManager {
    pub fn new(lines: impl IntoIterator<Item = (QueueType, Vec<Transform>)>) -> Self {
        let lines = lines
            .into_iter()
            .map(|(queue, spots)| {
                let occupants = vec![None; spots.len()];
                (queue, Line { spots, occupants })
            })
            .collect();
        Self { lines }
    }

    pub fn occupant(&self, queue: QueueType, index: usize) -> Option<ActorId> {
        self.lines.get(&queue)?.occupants.get(index).copied().flatten()
    }

    pub fn head(&self, queue: QueueType) -> Option<ActorId> {
        self.occupant(queue, 0)
    }
}

impl QueueManager for LineQueueManager {
    fn try_join(&mut self, queue: QueueType, actor: ActorId) -> Option<(Transform, usize)> {
        let line = self.lines.get_mut(&queue)?;
        let index = line.occupants.iter().position(|o| o.is_none())?;
        line.occupants[index] = Some(actor);
        Some((line.spots[index], index))
    }

    fn claim_slot(&mut self, queue: QueueType, index: usize, actor: ActorId) -> bool {
        let Some(line) = self.lines.get_mut(&queue) else {
            return false;
        };
        match line.occupants.get_mut(index) {
            Some(slot) if slot.is_none() => {
                *slot = Some(actor);
                true
            }
            _ => false,
        }
    }

    fn free_slot(&mut self, queue: QueueType, index: usize) -> bool {
        let Some(line) = self.lines.get_mut(&queue) else {
            return false;
        };
        match line.occupants.get_mut(index) {
            Some(slot) if slot.is_some() => {
                *slot = None;
                true
            }
            _ => {
                warn!("free_slot({queue:?}, {index}) on an empty slot");
                false
            }
        }
    }

    fn cascade_plan(&self, queue: QueueType) -> Vec<CascadeStep> {
        let Some(line) = self.lines.get(&queue) else {
            return Vec::new();
        };
        let mut occupants = line.occupants.clone();
        let mut steps = Vec::new();
        for index in 1..occupants.len() {
            if occupants[index - 1].is_none() {
                if let Some(actor) = occupants[index].take() {
                    occupants[index - 1] = Some(actor);
                    steps.push(CascadeStep {
                        actor,
                        new_index: index - 1,
                        spot: line.spots[index - 1],
                    });
                }
            }
        }
        steps
    }

    fn slot_transform(&self, queue: QueueType, index: usize) -> Option<Transform> {
        self.lines.get(&queue)?.spots.get(index).copied()
    }
}

/// Build the three shop lines from an anchor point each, slots spaced along
/// negative Z behind the anchor.
pub fn shop_lines(
    main: Transform,
    secondary: Transform,
    prescription: Transform,
    slots: usize,
    spacing: f32,
) -> LineQueueManager {
    let line = |anchor: Transform| {
        (0..slots)
            .map(|i| {
                let mut t = anchor;
                t.position.z -= spacing * i as f32;
                t
            })
            .collect::<Vec<_>>()
    };
    LineQueueManager::new([
        (QueueType::Main, line(main)),
        (QueueType::Secondary, line(secondary)),
        (QueueType::Prescription, line(prescription)),
    ])
}
