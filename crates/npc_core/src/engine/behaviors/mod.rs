//! Shared, stateless behavior definitions.
//!
//! One instance of each behavior serves every actor holding it; per-actor
//! progress lives in the `ActorBody` passed into the hooks. Behaviors are
//! grouped into ordered sets and composed into a per-actor table at spawn,
//! later sets overriding earlier ones key by key.

pub mod cashier;
pub mod customer;
pub mod general;
pub mod interrupts;
pub mod keys;
pub mod path_follow;
pub mod traits;

pub use keys::{CashierState, CustomerState, GeneralState, PathState, StateKey};
pub use traits::{Behavior, Directive};

use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::engine::machine::BehaviorSet;

/// Baseline set composed in first for every actor kind.
pub static GENERAL_SET: Lazy<BehaviorSet> = Lazy::new(|| {
    vec![
        Arc::new(general::IdleBehavior) as Arc<dyn Behavior>,
        Arc::new(general::ReturningBehavior),
        Arc::new(interrupts::CombatBehavior),
        Arc::new(interrupts::SocialBehavior),
        Arc::new(interrupts::EmotingBehavior),
    ]
});

pub static CUSTOMER_SET: Lazy<BehaviorSet> = Lazy::new(|| {
    vec![
        Arc::new(customer::ShoppingBehavior) as Arc<dyn Behavior>,
        Arc::new(customer::QueueWaitingBehavior),
        Arc::new(customer::CheckingOutBehavior),
        Arc::new(customer::ExitingBehavior),
    ]
});

pub static CASHIER_SET: Lazy<BehaviorSet> = Lazy::new(|| {
    vec![Arc::new(cashier::CashierWorkingBehavior) as Arc<dyn Behavior>]
});
