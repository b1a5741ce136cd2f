//! Waypoint and path registry.
//!
//! Populated once at load from JSON or YAML config, validated in full at that
//! point, and read-only afterwards. Every path carries an end policy telling
//! the owning behavior what happens after the final waypoint: continue on
//! another path, enter a named behavior, or branch on actor data.

use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::engine::behaviors::StateKey;
use crate::engine::ids::{PathId, WaypointId};
use crate::engine::types::Transform;
use crate::error::{CoreError, Result};

/// Decision branches may nest, but only this deep.
const MAX_POLICY_DEPTH: usize = 8;

/// What happens once an actor reaches the final waypoint of a path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathEndPolicy {
    /// Keep walking: switch to another path without a behavior change.
    Continue { path: PathId, start_index: usize, reverse: bool },
    /// Hand control back to the state machine.
    Enter { state: StateKey },
    /// Branch on actor-local data.
    Decision { rule: DecisionRule },
}

/// A data-driven branch evaluated against the actor that finished the path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionRule {
    /// Picks `then` once the shopping list is empty, `otherwise` before.
    ShoppingListEmpty { then: Box<PathEndPolicy>, otherwise: Box<PathEndPolicy> },
}

/// An ordered, named waypoint sequence with a fixed traversal speed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    pub id: PathId,
    pub waypoints: Vec<WaypointId>,
    #[serde(default = "default_path_speed")]
    pub speed: f32,
    pub on_end: PathEndPolicy,
}

fn default_path_speed() -> f32 {
    1.6
}

impl Path {
    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Index of the last waypoint in traversal order.
    pub fn final_index(&self, reverse: bool) -> usize {
        if reverse {
            0
        } else {
            self.waypoints.len().saturating_sub(1)
        }
    }

    /// Index of the first waypoint in traversal order.
    pub fn first_index(&self, reverse: bool) -> usize {
        if reverse {
            self.waypoints.len().saturating_sub(1)
        } else {
            0
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WaypointConfig {
    pub id: WaypointId,
    pub position: [f32; 3],
    #[serde(default)]
    pub yaw: f32,
}

/// Serde shape of the full registry.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RegistryConfig {
    #[serde(default)]
    pub waypoints: Vec<WaypointConfig>,
    #[serde(default)]
    pub paths: Vec<Path>,
}

/// Read-only lookup service for paths and waypoint transforms.
#[derive(Debug, Default)]
pub struct PathRegistry {
    paths: FxHashMap<PathId, Path>,
    waypoints: FxHashMap<WaypointId, Transform>,
}

impl PathRegistry {
    pub fn from_config(config: RegistryConfig) -> Result<Self> {
        let mut waypoints = FxHashMap::default();
        for wp in config.waypoints {
            let t = Transform::at(wp.position[0], wp.position[1], wp.position[2])
                .with_yaw(wp.yaw);
            if waypoints.insert(wp.id.clone(), t).is_some() {
                return Err(CoreError::InvalidConfig(format!(
                    "duplicate waypoint id '{}'",
                    wp.id
                )));
            }
        }
        let mut paths = FxHashMap::default();
        for path in config.paths {
            if paths.insert(path.id.clone(), path.clone()).is_some() {
                return Err(CoreError::InvalidConfig(format!("duplicate path id '{}'", path.id)));
            }
        }
        let registry = Self { paths, waypoints };
        registry.validate()?;
        Ok(registry)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: RegistryConfig = serde_json::from_str(json)
            .map_err(|e| CoreError::InvalidConfig(e.to_string()))?;
        Self::from_config(config)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: RegistryConfig = serde_yaml::from_str(yaml)
            .map_err(|e| CoreError::InvalidConfig(e.to_string()))?;
        Self::from_config(config)
    }

    pub fn get_path(&self, id: &PathId) -> Option<&Path> {
        self.paths.get(id)
    }

    pub fn path_count(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty() && self.waypoints.is_empty()
    }

    pub fn get_waypoint_transform(&self, id: &WaypointId) -> Option<Transform> {
        self.waypoints.get(id).copied()
    }

    /// Transform of the waypoint at `index` of `path`, if both exist.
    pub fn waypoint_at(&self, path: &PathId, index: usize) -> Option<Transform> {
        let path = self.paths.get(path)?;
        let id = path.waypoints.get(index)?;
        self.waypoints.get(id).copied()
    }

    /// Full structural check, run once at startup. Lookups after a successful
    /// validation can treat dangling references as impossible.
    fn validate(&self) -> Result<()> {
        for path in self.paths.values() {
            if path.is_empty() {
                return Err(CoreError::InvalidConfig(format!("path '{}' has no waypoints", path.id)));
            }
            if path.speed <= 0.0 {
                return Err(CoreError::InvalidConfig(format!(
                    "path '{}' has non-positive speed",
                    path.id
                )));
            }
            for wp in &path.waypoints {
                if !self.waypoints.contains_key(wp) {
                    return Err(CoreError::InvalidConfig(format!(
                        "path '{}' references unknown waypoint '{}'",
                        path.id, wp
                    )));
                }
            }
            self.validate_policy(&path.id, &path.on_end, 0)?;
        }
        Ok(())
    }

    fn validate_policy(&self, owner: &PathId, policy: &PathEndPolicy, depth: usize) -> Result<()> {
        if depth > MAX_POLICY_DEPTH {
            return Err(CoreError::InvalidConfig(format!(
                "end policy of path '{owner}' nests deeper than {MAX_POLICY_DEPTH}"
            )));
        }
        match policy {
            PathEndPolicy::Continue { path, start_index, .. } => {
                let Some(target) = self.paths.get(path) else {
                    return Err(CoreError::InvalidConfig(format!(
                        "path '{owner}' continues onto unknown path '{path}'"
                    )));
                };
                if *start_index >= target.len() {
                    return Err(CoreError::InvalidConfig(format!(
                        "path '{owner}' continues onto '{path}' at index {start_index}, \
                         but it has {} waypoints",
                        target.len()
                    )));
                }
                Ok(())
            }
            PathEndPolicy::Enter { .. } => Ok(()),
            PathEndPolicy::Decision { rule } => match rule {
                DecisionRule::ShoppingListEmpty { then, otherwise } => {
                    self.validate_policy(owner, then, depth + 1)?;
                    self.validate_policy(owner, otherwise, depth + 1)
                }
            },
        }
    }
}
