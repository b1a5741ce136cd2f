//! Tick-throughput benchmarks: a large low-fidelity population on the shared
//! basic-sim cadence, and a smaller fully-active crowd.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use npc_core::engine::{
    shop_lines, DirectNavigator, PathRegistry, PathState, QueueType, StateKey, Transform, World,
    WorldConfig,
};

const FLOOR_YAML: &str = r#"
waypoints:
  - { id: shelf_a, position: [4.0, 0.0, 2.0] }
  - { id: shelf_b, position: [8.0, 0.0, 2.0] }
paths:
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
"#;

/// Customers with one item left loop the browse path forever, which keeps
/// the population stable across benchmark iterations.
fn browsing_world(population: usize, active: bool) -> World {
    let registry = Arc::new(PathRegistry::from_yaml(FLOOR_YAML).expect("bench registry"));
    let mut config = WorldConfig::default();
    config.customer_entry = StateKey::Path(PathState::Browsing);
    config.path_bindings.insert(PathState::Browsing, "browse".into());
    let queues = shop_lines(
        Transform::at(10.0, 0.0, 0.0),
        Transform::at(14.0, 0.0, 0.0),
        Transform::at(18.0, 0.0, 0.0),
        8,
        1.0,
    );
    let mut world =
        World::new(registry, Box::new(DirectNavigator), Box::new(queues), config, 7).expect("bench world");
    let ids: Vec<_> = (0..population)
        .map(|_| world.spawn_customer(vec!["aspirin".into()], QueueType::Main))
        .collect();
    if !active {
        for id in ids {
            world.deactivate(id);
        }
    }
    world
}

fn bench_low_fidelity_tick(c: &mut Criterion) {
    let mut world = browsing_world(500, false);
    c.bench_function("basic_tick_500_suspended", |b| {
        b.iter(|| {
            world.tick(0.5);
            black_box(world.actor_count());
        })
    });
}

fn bench_active_tick(c: &mut Criterion) {
    let mut world = browsing_world(100, true);
    c.bench_function("full_tick_100_active", |b| {
        b.iter(|| {
            world.tick(0.1);
            black_box(world.actor_count());
        })
    });
}

criterion_group!(benches, bench_low_fidelity_tick, bench_active_tick);
criterion_main!(benches);
