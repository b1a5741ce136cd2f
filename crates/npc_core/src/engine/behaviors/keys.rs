//! Behavior keys: a (category, value) pair identifying one shared behavior
//! definition.

use serde::{Deserialize, Serialize};

/// Behaviors every actor kind can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneralState {
    /// Default: stand around, occasionally glance elsewhere
    #[default]
    Idle,
    /// Walk to the despawn point and leave the scene
    Returning,
    /// Reacting to an attack
    Combat,
    /// Talking to whoever initiated an interaction
    Social,
    /// Playing a timed emote
    Emoting,
}

/// Customer-only behaviors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomerState {
    /// Work through the shopping list shelf by shelf
    #[default]
    Shopping,
    /// Hold a slot in a checkout line
    QueueWaiting,
    /// Stand at the register until the transaction completes
    CheckingOut,
    /// Forced exit: walk out without finishing
    Exiting,
}

/// Cashier-only behaviors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CashierState {
    /// Serve whoever reaches the register
    #[default]
    Working,
}

/// Path-following behaviors. Each key is bound to a concrete path id by the
/// world's registry config at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathState {
    /// From the door into the shop floor
    #[default]
    Entering,
    /// Loop through the aisles
    Browsing,
    /// From the shop floor to the checkout area
    ToCheckout,
    /// From anywhere on the floor to the door
    ToExit,
}

/// Fully qualified behavior key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateKey {
    General(GeneralState),
    Customer(CustomerState),
    Cashier(CashierState),
    Path(PathState),
}

impl StateKey {
    pub const IDLE: StateKey = StateKey::General(GeneralState::Idle);
    pub const RETURNING: StateKey = StateKey::General(GeneralState::Returning);
}

impl Default for StateKey {
    fn default() -> Self {
        StateKey::IDLE
    }
}
