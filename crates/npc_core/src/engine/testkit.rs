//! Shared fixtures for engine tests: a small shop layout and a stage that
//! hands out behavior contexts without a full world.

use std::sync::Arc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::engine::actor::{ActorBody, ActorKind};
use crate::engine::behaviors::path_follow::build_path_set;
use crate::engine::behaviors::{CASHIER_SET, CUSTOMER_SET, GENERAL_SET};
use crate::engine::context::BehaviorCtx;
use crate::engine::events::EventBus;
use crate::engine::ids::ItemId;
use crate::engine::machine::{BehaviorSet, FallbackKeys, StateMachine, StateTable};
use crate::engine::nav::DirectNavigator;
use crate::engine::queue::{shop_lines, LineQueueManager};
use crate::engine::registers::RegisterBoard;
use crate::engine::registry::PathRegistry;
use crate::engine::types::Transform;
use crate::engine::world::WorldConfig;

/// Shop floor used across the engine tests: a door, two shelves, and a
/// three-waypoint lane with a browse loop that branches on the shopping list.
pub(crate) const SHOP_YAML: &str = r#"
waypoints:
  - { id: door, position: [0.0, 0.0, 2.0] }
  - { id: shelf_a, position: [4.0, 0.0, 2.0] }
  - { id: shelf_b, position: [8.0, 0.0, 2.0] }
  - { id: lane_in, position: [2.0, 0.0, 0.0] }
  - { id: lane_mid, position: [5.0, 0.0, 0.0] }
  - { id: lane_end, position: [9.0, 0.0, 0.0] }
  - { id: lane_far, position: [13.0, 0.0, 0.0] }
paths:
  - id: entry
    waypoints: [door, shelf_a]
    on_end:
      enter: { state: { customer: shopping } }
  - id: browse
    waypoints: [shelf_a, shelf_b]
    on_end:
      decision:
        rule:
          shopping_list_empty:
            then:
              enter: { state: { customer: queue_waiting } }
            otherwise:
              continue: { path: browse, start_index: 0, reverse: false }
  - id: to_checkout
    waypoints: [lane_in]
    on_end:
      enter: { state: { customer: queue_waiting } }
  - id: lane
    waypoints: [lane_in, lane_mid, lane_end, lane_far]
    speed: 1.0
    on_end:
      enter: { state: { general: idle } }
  - id: to_exit
    waypoints: [door]
    on_end:
      enter: { state: { general: returning } }
"#;

pub(crate) fn shop_registry() -> PathRegistry {
    PathRegistry::from_yaml(SHOP_YAML).expect("test registry must validate")
}

pub(crate) fn shop_config() -> WorldConfig {
    let mut config = WorldConfig::default();
    config.shelves.insert(ItemId::from("aspirin"), "shelf_a".into());
    config.shelves.insert(ItemId::from("bandages"), "shelf_b".into());
    config.path_bindings.insert(crate::engine::behaviors::PathState::Entering, "entry".into());
    config.path_bindings.insert(crate::engine::behaviors::PathState::Browsing, "browse".into());
    config
        .path_bindings
        .insert(crate::engine::behaviors::PathState::ToCheckout, "to_checkout".into());
    config.path_bindings.insert(crate::engine::behaviors::PathState::ToExit, "to_exit".into());
    config
}

pub(crate) fn shop_queues() -> LineQueueManager {
    shop_lines(
        Transform::at(10.0, 0.0, 0.0),
        Transform::at(14.0, 0.0, 0.0),
        Transform::at(18.0, 0.0, 0.0),
        4,
        1.0,
    )
}

/// Owns one actor body plus every shared service, and lends out behavior
/// contexts the way the world does.
pub(crate) struct TestStage {
    pub registry: PathRegistry,
    pub nav: DirectNavigator,
    pub queues: LineQueueManager,
    pub registers: RegisterBoard,
    pub bus: EventBus,
    pub rng: ChaCha8Rng,
    pub config: WorldConfig,
    pub path_set: BehaviorSet,
    pub body: ActorBody,
}

impl TestStage {
    pub fn new() -> Self {
        let registry = shop_registry();
        let config = shop_config();
        let path_set =
            build_path_set(&config.path_bindings, &registry).expect("bindings must resolve");
        let body = ActorBody::new(ActorKind::Customer, config.spawn, config.walk_speed);
        Self {
            registry,
            nav: DirectNavigator,
            queues: shop_queues(),
            registers: RegisterBoard::default(),
            bus: EventBus::default(),
            rng: ChaCha8Rng::seed_from_u64(7),
            config,
            path_set,
            body,
        }
    }

    pub fn ctx(&mut self) -> BehaviorCtx<'_> {
        self.ctx_dt(0.1)
    }

    pub fn ctx_dt(&mut self, dt: f32) -> BehaviorCtx<'_> {
        BehaviorCtx {
            body: &mut self.body,
            registry: &self.registry,
            nav: &self.nav,
            queues: &mut self.queues,
            registers: &mut self.registers,
            bus: &mut self.bus,
            rng: &mut self.rng,
            config: &self.config,
            dt,
            suspending: false,
            started_routine: None,
        }
    }

    /// A customer machine over the standard sets.
    pub fn customer_machine(&self) -> StateMachine {
        let table = StateTable::compile(&[&*GENERAL_SET, &self.path_set, &*CUSTOMER_SET]);
        StateMachine::new(Arc::new(table), FallbackKeys::default())
    }

    /// A cashier machine over the standard sets.
    #[allow(dead_code)]
    pub fn cashier_machine(&self) -> StateMachine {
        let table = StateTable::compile(&[&*GENERAL_SET, &self.path_set, &*CASHIER_SET]);
        StateMachine::new(Arc::new(table), FallbackKeys::default())
    }
}
