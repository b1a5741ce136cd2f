//! Reactive interrupt behaviors: combat, social interaction, emoting.
//!
//! These are the states the runner transitions into when a trigger suspends
//! the current behavior. Combat and social normally end on an external
//! completion event; each also arms a defensive cap so one lost event cannot
//! wedge the actor forever. Emotes are self-timed.

use rand::Rng;

use crate::engine::behaviors::traits::{Behavior, Directive};
use crate::engine::behaviors::{GeneralState, StateKey};
use crate::engine::context::BehaviorCtx;
use crate::engine::events::{EmoteKind, GameEvent};
use crate::engine::routines::TimerRoutine;

pub struct CombatBehavior;

impl Behavior for CombatBehavior {
    fn key(&self) -> StateKey {
        StateKey::General(GeneralState::Combat)
    }

    fn interruptible(&self) -> bool {
        false
    }

    fn on_enter(&self, ctx: &mut BehaviorCtx<'_>) -> Directive {
        let actor = ctx.body.id;
        ctx.start_routine(
            TimerRoutine::new(ctx.config.combat_timeout_secs)
                .publish(GameEvent::CombatEnded { actor }),
        );
        Directive::Stay
    }

    fn on_exit(&self, ctx: &mut BehaviorCtx<'_>) {
        ctx.body.interactor = None;
    }
}

pub struct SocialBehavior;

impl Behavior for SocialBehavior {
    fn key(&self) -> StateKey {
        StateKey::General(GeneralState::Social)
    }

    fn on_enter(&self, ctx: &mut BehaviorCtx<'_>) -> Directive {
        let actor = ctx.body.id;
        ctx.start_routine(
            TimerRoutine::new(ctx.config.interaction_timeout_secs)
                .publish(GameEvent::InteractionEnded { actor }),
        );
        Directive::Stay
    }

    fn on_exit(&self, ctx: &mut BehaviorCtx<'_>) {
        ctx.body.interactor = None;
    }
}

pub struct EmotingBehavior;

impl Behavior for EmotingBehavior {
    fn key(&self) -> StateKey {
        StateKey::General(GeneralState::Emoting)
    }

    fn on_enter(&self, ctx: &mut BehaviorCtx<'_>) -> Directive {
        if ctx.body.active_emote.is_none() {
            let emote = match ctx.rng.gen_range(0..3) {
                0 => EmoteKind::Wave,
                1 => EmoteKind::Dance,
                _ => EmoteKind::Grumble,
            };
            ctx.body.active_emote = Some(emote);
        }
        let secs = ctx.config.emote_secs * ctx.rng.gen_range(0.75..1.25);
        let actor = ctx.body.id;
        ctx.start_routine(TimerRoutine::new(secs).publish(GameEvent::EmoteEnded { actor }));
        Directive::Stay
    }

    fn on_exit(&self, ctx: &mut BehaviorCtx<'_>) {
        ctx.body.active_emote = None;
    }
}
