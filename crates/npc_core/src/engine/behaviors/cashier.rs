//! Cashier behavior: man the register, serve whoever is ready.

use rand_distr::{Distribution, Normal};

use crate::engine::behaviors::traits::{Behavior, Directive};
use crate::engine::behaviors::{CashierState, StateKey};
use crate::engine::context::BehaviorCtx;
use crate::engine::events::GameEvent;
use crate::engine::routines::TimerRoutine;

pub struct CashierWorkingBehavior;

fn sample_service_secs(ctx: &mut BehaviorCtx<'_>) -> f32 {
    let mean = ctx.config.service_secs_mean;
    match Normal::new(mean, ctx.config.service_secs_std) {
        Ok(dist) => dist.sample(ctx.rng).max(0.5),
        Err(_) => mean,
    }
}

impl Behavior for CashierWorkingBehavior {
    fn key(&self) -> StateKey {
        StateKey::Cashier(CashierState::Working)
    }

    fn on_enter(&self, ctx: &mut BehaviorCtx<'_>) -> Directive {
        let station = ctx.config.cashier_station;
        if !ctx.set_destination(station.position) {
            let body = &mut *ctx.body;
            body.movement.warp(&mut body.transform, station);
        }
        // Coming back from an interruption mid-service: restart the
        // transaction for whoever was at the register.
        if let Some(customer) = ctx.registers.serving() {
            let secs = sample_service_secs(ctx);
            ctx.start_routine(
                TimerRoutine::new(secs).publish(GameEvent::TransactionCompleted { customer }),
            );
        }
        Directive::Stay
    }

    fn on_update(&self, ctx: &mut BehaviorCtx<'_>) -> Directive {
        if ctx.registers.serving().is_none() {
            if let Some(customer) = ctx.registers.begin_next() {
                let secs = sample_service_secs(ctx);
                ctx.start_routine(
                    TimerRoutine::new(secs)
                        .publish(GameEvent::TransactionCompleted { customer }),
                );
            }
        }
        Directive::Stay
    }
}
