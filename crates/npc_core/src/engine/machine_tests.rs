//! Runner contract tests: idempotent transitions, fallback resolution,
//! interruption stack LIFO, routine cancellation, arrival delivery.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use proptest::prelude::*;

use crate::engine::behaviors::{
    Behavior, CashierState, CustomerState, Directive, GeneralState, StateKey, GENERAL_SET,
};
use crate::engine::context::BehaviorCtx;
use crate::engine::events::{GameEvent, InterruptKind};
use crate::engine::ids::ItemId;
use crate::engine::machine::{BehaviorSet, FallbackKeys, StateMachine, StateTable};
use crate::engine::nav::Navigator;
use crate::engine::testkit::TestStage;

/// Test double that counts hook invocations.
struct Probe {
    key: StateKey,
    interruptible: bool,
    wants_arrival: bool,
    enter_redirect: Option<StateKey>,
    enters: AtomicUsize,
    exits: AtomicUsize,
    arrivals: AtomicUsize,
}

impl Probe {
    fn new(key: StateKey) -> Arc<Self> {
        Arc::new(Self {
            key,
            interruptible: true,
            wants_arrival: false,
            enter_redirect: None,
            enters: AtomicUsize::new(0),
            exits: AtomicUsize::new(0),
            arrivals: AtomicUsize::new(0),
        })
    }

    fn with_arrival(key: StateKey) -> Arc<Self> {
        Arc::new(Self { wants_arrival: true, ..Self::template(key) })
    }

    fn redirecting(key: StateKey, to: StateKey) -> Arc<Self> {
        Arc::new(Self { enter_redirect: Some(to), ..Self::template(key) })
    }

    fn pinned(key: StateKey) -> Arc<Self> {
        Arc::new(Self { interruptible: false, ..Self::template(key) })
    }

    fn template(key: StateKey) -> Self {
        Self {
            key,
            interruptible: true,
            wants_arrival: false,
            enter_redirect: None,
            enters: AtomicUsize::new(0),
            exits: AtomicUsize::new(0),
            arrivals: AtomicUsize::new(0),
        }
    }

    fn enters(&self) -> usize {
        self.enters.load(Ordering::Relaxed)
    }

    fn exits(&self) -> usize {
        self.exits.load(Ordering::Relaxed)
    }

    fn arrivals(&self) -> usize {
        self.arrivals.load(Ordering::Relaxed)
    }
}

impl Behavior for Probe {
    fn key(&self) -> StateKey {
        self.key
    }

    fn interruptible(&self) -> bool {
        self.interruptible
    }

    fn wants_arrival_callback(&self) -> bool {
        self.wants_arrival
    }

    fn on_enter(&self, _ctx: &mut BehaviorCtx<'_>) -> Directive {
        self.enters.fetch_add(1, Ordering::Relaxed);
        match self.enter_redirect {
            Some(to) => Directive::Transition(to),
            None => Directive::Stay,
        }
    }

    fn on_exit(&self, _ctx: &mut BehaviorCtx<'_>) {
        self.exits.fetch_add(1, Ordering::Relaxed);
    }

    fn on_reached_destination(&self, _ctx: &mut BehaviorCtx<'_>) -> Directive {
        self.arrivals.fetch_add(1, Ordering::Relaxed);
        Directive::Stay
    }
}

const KEY_A: StateKey = StateKey::Customer(CustomerState::Shopping);
const KEY_B: StateKey = StateKey::Customer(CustomerState::Exiting);

fn machine_over(sets: &[&BehaviorSet]) -> StateMachine {
    StateMachine::new(Arc::new(StateTable::compile(sets)), FallbackKeys::default())
}

#[test]
fn test_transition_to_same_state_is_noop() {
    let mut stage = TestStage::new();
    let probe = Probe::new(KEY_A);
    let set: BehaviorSet = vec![probe.clone()];
    let mut machine = machine_over(&[&set]);

    let mut ctx = stage.ctx();
    machine.transition_to(KEY_A, &mut ctx);
    machine.transition_to(KEY_A, &mut ctx);
    assert_eq!(probe.enters(), 1);
    assert_eq!(probe.exits(), 0);
}

#[test]
fn test_transition_runs_exit_then_enter() {
    let mut stage = TestStage::new();
    let a = Probe::new(KEY_A);
    let b = Probe::new(KEY_B);
    let set: BehaviorSet = vec![a.clone(), b.clone()];
    let mut machine = machine_over(&[&set]);

    let mut ctx = stage.ctx();
    machine.transition_to(KEY_A, &mut ctx);
    machine.transition_to(KEY_B, &mut ctx);
    assert_eq!(a.exits(), 1);
    assert_eq!(b.enters(), 1);
    assert_eq!(machine.previous_key(), Some(KEY_A));
    assert_eq!(machine.current_key(), Some(KEY_B));
}

#[test]
fn test_later_sets_override_earlier_ones() {
    let mut stage = TestStage::new();
    let base = Probe::new(KEY_A);
    let replacement = Probe::new(KEY_A);
    let base_set: BehaviorSet = vec![base.clone()];
    let override_set: BehaviorSet = vec![replacement.clone()];
    let mut machine = machine_over(&[&base_set, &override_set]);

    let mut ctx = stage.ctx();
    machine.transition_to(KEY_A, &mut ctx);
    assert_eq!(base.enters(), 0);
    assert_eq!(replacement.enters(), 1);
}

#[test]
fn test_resolve_falls_back_returning_then_idle() {
    let stage = TestStage::new();
    let machine = stage.customer_machine();

    // Unregistered key on a full table: degrade to returning.
    let resolved = machine.resolve(StateKey::Cashier(CashierState::Working)).unwrap();
    assert_eq!(resolved.key(), StateKey::RETURNING);

    // Table with idle only: degrade past returning to idle.
    let idle_only: BehaviorSet =
        vec![Probe::new(StateKey::General(GeneralState::Idle)) as Arc<dyn Behavior>];
    let machine = machine_over(&[&idle_only]);
    let resolved = machine.resolve(StateKey::Cashier(CashierState::Working)).unwrap();
    assert_eq!(resolved.key(), StateKey::IDLE);

    // Requesting the returning fallback itself while unregistered must not
    // loop; it lands on idle.
    let resolved = machine.resolve(StateKey::RETURNING).unwrap();
    assert_eq!(resolved.key(), StateKey::IDLE);

    // Nothing registered at all: the lookup is a hard miss.
    let empty: BehaviorSet = Vec::new();
    let machine = machine_over(&[&empty]);
    assert!(machine.resolve(StateKey::IDLE).is_none());
}

#[test]
fn test_missing_state_forces_despawn() {
    let mut stage = TestStage::new();
    let empty: BehaviorSet = Vec::new();
    let mut machine = machine_over(&[&empty]);
    let mut ctx = stage.ctx();
    machine.transition_to(KEY_A, &mut ctx);
    assert!(ctx.body.despawn_requested);
    assert_eq!(machine.current_key(), None);
}

#[test]
fn test_enter_redirect_chain_is_bounded() {
    let mut stage = TestStage::new();
    let a = Probe::redirecting(KEY_A, KEY_B);
    let b = Probe::redirecting(KEY_B, KEY_A);
    let set: BehaviorSet = vec![a, b];
    let mut machine = machine_over(&[&set, &*GENERAL_SET]);

    let mut ctx = stage.ctx();
    machine.transition_to(KEY_A, &mut ctx);
    // The ping-pong is cut off and the actor parks on idle.
    assert_eq!(machine.current_key(), Some(StateKey::IDLE));
    assert!(!ctx.body.despawn_requested);
}

#[test]
fn test_interrupt_pushes_and_completion_pops() {
    let mut stage = TestStage::new();
    stage.body.shopping_list.push(ItemId::from("aspirin"));
    let mut machine = stage.customer_machine();

    {
        let mut ctx = stage.ctx();
        machine.transition_to(KEY_A, &mut ctx);
        assert_eq!(machine.current_key(), Some(KEY_A));
    }
    {
        let mut ctx = stage.ctx();
        machine.interrupt(InterruptKind::Social, None, &mut ctx);
        assert_eq!(machine.current_key(), Some(StateKey::General(GeneralState::Social)));
        assert_eq!(machine.stack_depth(), 1);
    }
    {
        let mut ctx = stage.ctx();
        machine.complete(InterruptKind::Social, &mut ctx);
        assert_eq!(machine.current_key(), Some(KEY_A));
        assert_eq!(machine.stack_depth(), 0);
    }
}

#[test]
fn test_trigger_dropped_when_not_interruptible() {
    let mut stage = TestStage::new();
    let pinned = Probe::pinned(KEY_A);
    let set: BehaviorSet = vec![pinned.clone()];
    let mut machine = machine_over(&[&set, &*GENERAL_SET]);

    let mut ctx = stage.ctx();
    machine.transition_to(KEY_A, &mut ctx);
    machine.interrupt(InterruptKind::Combat, None, &mut ctx);
    assert_eq!(machine.current_key(), Some(KEY_A));
    assert_eq!(machine.stack_depth(), 0);
    assert_eq!(pinned.exits(), 0);
}

#[test]
fn test_completion_with_empty_stack_recovers_to_idle() {
    let mut stage = TestStage::new();
    let mut machine = stage.customer_machine();
    let mut ctx = stage.ctx();
    // Walked into combat without a push (stale completion scenario).
    machine.transition_to(StateKey::General(GeneralState::Combat), &mut ctx);
    machine.complete(InterruptKind::Combat, &mut ctx);
    assert_eq!(machine.current_key(), Some(StateKey::IDLE));
    assert!(!ctx.body.despawn_requested);
}

#[test]
fn test_stale_completion_for_other_state_is_ignored() {
    let mut stage = TestStage::new();
    stage.body.shopping_list.push(ItemId::from("aspirin"));
    let mut machine = stage.customer_machine();
    let mut ctx = stage.ctx();
    machine.transition_to(KEY_A, &mut ctx);
    machine.complete(InterruptKind::Combat, &mut ctx);
    assert_eq!(machine.current_key(), Some(KEY_A));
}

#[test]
fn test_routine_cancelled_synchronously_on_transition() {
    let mut stage = TestStage::new();
    let mut machine = stage.customer_machine();
    {
        let mut ctx = stage.ctx();
        machine.transition_to(StateKey::General(GeneralState::Social), &mut ctx);
        assert!(machine.has_routine());
        machine.transition_to(StateKey::IDLE, &mut ctx);
        assert!(!machine.has_routine());
    }
    // Well past the social timeout: the cancelled routine must not fire.
    for _ in 0..4 {
        let mut ctx = stage.ctx_dt(20.0);
        machine.tick(&mut ctx);
    }
    while let Some(event) = stage.bus.pop() {
        assert!(
            !matches!(event, GameEvent::InteractionEnded { .. }),
            "cancelled routine published {event:?}"
        );
    }
}

#[test]
fn test_arrival_callback_delivered_once() {
    let mut stage = TestStage::new();
    let probe = Probe::with_arrival(KEY_A);
    let set: BehaviorSet = vec![probe.clone()];
    let mut machine = machine_over(&[&set]);

    {
        let mut ctx = stage.ctx();
        machine.transition_to(KEY_A, &mut ctx);
    }
    let target = nalgebra::Point3::new(1.0, 0.0, 0.0);
    let from = stage.body.transform.position;
    assert!(stage.body.movement.set_destination(from, target, &stage.nav as &dyn Navigator));
    stage.body.movement.tick(&mut stage.body.transform, 2.0);
    for _ in 0..3 {
        let mut ctx = stage.ctx();
        machine.tick(&mut ctx);
    }
    assert_eq!(probe.arrivals(), 1);
}

#[test]
fn test_shutdown_discards_stack_without_running_popped_states() {
    let mut stage = TestStage::new();
    let probe = Probe::new(KEY_A);
    let set: BehaviorSet = vec![probe.clone()];
    let mut machine = machine_over(&[&set, &*GENERAL_SET]);

    let mut ctx = stage.ctx();
    machine.transition_to(KEY_A, &mut ctx);
    machine.interrupt(InterruptKind::Social, None, &mut ctx);
    assert_eq!(machine.stack_depth(), 1);
    machine.shutdown(&mut ctx);
    assert_eq!(machine.stack_depth(), 0);
    assert_eq!(machine.current_key(), None);
    // The suspended probe was discarded, not re-entered.
    assert_eq!(probe.enters(), 1);
}

proptest! {
    /// N stacked triggers unwound by N matching completions always land the
    /// actor back in the state it held before the first trigger.
    #[test]
    fn prop_interruption_stack_unwinds_lifo(n in 1usize..5) {
        let mut stage = TestStage::new();
        stage.body.shopping_list.push(ItemId::from("aspirin"));
        let mut machine = stage.customer_machine();
        {
            let mut ctx = stage.ctx();
            machine.transition_to(KEY_A, &mut ctx);
        }

        let kinds: Vec<InterruptKind> = (0..n)
            .map(|i| if i % 2 == 0 { InterruptKind::Social } else { InterruptKind::Emote })
            .collect();
        for kind in &kinds {
            let mut ctx = stage.ctx();
            machine.interrupt(*kind, None, &mut ctx);
        }
        prop_assert_eq!(machine.stack_depth(), n);

        for kind in kinds.iter().rev() {
            let mut ctx = stage.ctx();
            machine.complete(*kind, &mut ctx);
        }
        prop_assert_eq!(machine.stack_depth(), 0);
        prop_assert_eq!(machine.current_key(), Some(KEY_A));
    }
}
