//! Idle and despawn behaviors shared by every actor kind.

use log::warn;
use nalgebra::{UnitQuaternion, Vector3};
use rand::Rng;

use crate::engine::behaviors::traits::{Behavior, Directive};
use crate::engine::behaviors::{GeneralState, StateKey};
use crate::engine::context::BehaviorCtx;

/// Safe terminal fallback: stand in place, occasionally look around.
pub struct IdleBehavior;

impl Behavior for IdleBehavior {
    fn key(&self) -> StateKey {
        StateKey::General(GeneralState::Idle)
    }

    fn on_update(&self, ctx: &mut BehaviorCtx<'_>) -> Directive {
        if ctx.rng.gen_bool(0.01) {
            let yaw = ctx.rng.gen_range(0.0..std::f32::consts::TAU);
            ctx.body.transform.rotation =
                UnitQuaternion::from_axis_angle(&Vector3::y_axis(), yaw);
        }
        Directive::Stay
    }
}

/// Walk to the despawn point and leave the scene. Also the first fallback
/// for unregistered behavior keys.
pub struct ReturningBehavior;

impl Behavior for ReturningBehavior {
    fn key(&self) -> StateKey {
        StateKey::General(GeneralState::Returning)
    }

    fn interruptible(&self) -> bool {
        false
    }

    fn wants_arrival_callback(&self) -> bool {
        true
    }

    fn on_enter(&self, ctx: &mut BehaviorCtx<'_>) -> Directive {
        let exit = ctx.config.despawn.position;
        if !ctx.set_destination(exit) {
            warn!("actor {}: despawn point unreachable, removing in place", ctx.body.id);
            return Directive::Despawn;
        }
        Directive::Stay
    }

    fn on_reached_destination(&self, _ctx: &mut BehaviorCtx<'_>) -> Directive {
        Directive::Despawn
    }
}
