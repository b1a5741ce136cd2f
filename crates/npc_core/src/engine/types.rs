//! World-space transform and the small geometry helpers every handler uses.

use nalgebra::{Point3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// How close to a target position counts as "arrived", in meters.
pub const ARRIVAL_EPSILON: f32 = 0.05;

/// Position + facing of an actor or a placed waypoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Point3<f32>,
    pub rotation: UnitQuaternion<f32>,
}

impl Transform {
    pub fn at(x: f32, y: f32, z: f32) -> Self {
        Self { position: Point3::new(x, y, z), rotation: UnitQuaternion::identity() }
    }

    pub fn with_yaw(mut self, yaw: f32) -> Self {
        self.rotation = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), yaw);
        self
    }

    pub fn distance_to(&self, target: Point3<f32>) -> f32 {
        (target - self.position).norm()
    }

    /// Advance up to `step` meters toward `target`. Returns true when the
    /// target was reached this step.
    pub fn move_toward(&mut self, target: Point3<f32>, step: f32) -> bool {
        let offset = target - self.position;
        let dist = offset.norm();
        if dist <= step || dist <= ARRIVAL_EPSILON {
            self.position = target;
            return true;
        }
        self.position += offset * (step / dist);
        false
    }

    /// Face toward `target`, rotating around the world up axis only.
    pub fn face_toward(&mut self, target: Point3<f32>) {
        let dx = target.x - self.position.x;
        let dz = target.z - self.position.z;
        if dx.abs() < f32::EPSILON && dz.abs() < f32::EPSILON {
            return;
        }
        let yaw = dx.atan2(dz);
        self.rotation = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), yaw);
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::at(0.0, 0.0, 0.0)
    }
}

/// Move `position` up to `step` meters toward `target` without a facing
/// update. The low-fidelity simulator runs on this alone.
pub fn step_toward(position: &mut Point3<f32>, target: Point3<f32>, step: f32) -> bool {
    let offset = target - *position;
    let dist = offset.norm();
    if dist <= step || dist <= ARRIVAL_EPSILON {
        *position = target;
        return true;
    }
    *position += offset * (step / dist);
    false
}
