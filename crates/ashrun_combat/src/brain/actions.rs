//! Конкретные действия мозга.

use rand::Rng;

use crate::brain::action::{ActionCtx, ActionStatus, BrainAction};
use crate::logger::log;
use crate::weapons::FireSlot;

/// Фоновое безделье: стоим, изредка "переминаемся" (host может вешать
/// на это idle-анимации). Никогда не завершается само.
pub struct IdleAction {
    repose: Option<f32>,
}

impl IdleAction {
    pub fn new() -> Self {
        Self { repose: None }
    }
}

impl Default for IdleAction {
    fn default() -> Self {
        Self::new()
    }
}

impl BrainAction for IdleAction {
    fn name(&self) -> &'static str {
        "idle"
    }

    fn on_activate(&mut self, _ctx: &mut ActionCtx) -> bool {
        true
    }

    fn tick(&mut self, ctx: &mut ActionCtx) -> ActionStatus {
        match &mut self.repose {
            None => {
                self.repose = Some(ctx.rng.gen_range(1.0..3.0));
            }
            Some(t) => {
                *t -= ctx.dt;
                if *t <= 0.0 {
                    log("💤 Idle repose");
                    self.repose = None;
                }
            }
        }
        ActionStatus::Running
    }
}

/// Обстрел цели очередями: зажать триггер, отпустить, передохнуть,
/// повторить. Конечное число очередей → Success.
pub struct EngageTargetAction {
    slot: FireSlot,
    bursts_left: u32,
    phase_timer: f32,
    firing: bool,
}

impl EngageTargetAction {
    pub fn new(slot: FireSlot, bursts: u32) -> Self {
        Self {
            slot,
            bursts_left: bursts.max(1),
            phase_timer: 0.0,
            firing: false,
        }
    }

    fn release_trigger(&mut self, ctx: &mut ActionCtx) {
        if !self.firing {
            return;
        }
        self.firing = false;
        let ActionCtx {
            loadout,
            outbox,
            net,
            now,
            ..
        } = ctx;
        if let Some(loadout) = loadout.as_deref_mut() {
            loadout.stop_fire(self.slot, *net, *now, outbox);
        }
    }
}

impl BrainAction for EngageTargetAction {
    fn name(&self) -> &'static str {
        "engage_target"
    }

    fn on_activate(&mut self, ctx: &mut ActionCtx) -> bool {
        // Без оружия в руках обстрел не стартует
        let armed = ctx
            .loadout
            .as_deref_mut()
            .and_then(|l| l.current())
            .is_some();
        if !armed {
            return false;
        }
        self.firing = false;
        self.phase_timer = ctx.rng.gen_range(0.1..0.3);
        true
    }

    fn on_pause(&mut self, ctx: &mut ActionCtx) {
        self.release_trigger(ctx);
    }

    fn on_resume(&mut self, ctx: &mut ActionCtx) -> bool {
        self.phase_timer = ctx.rng.gen_range(0.1..0.3);
        true
    }

    fn on_abort(&mut self, ctx: &mut ActionCtx) {
        self.release_trigger(ctx);
    }

    fn tick(&mut self, ctx: &mut ActionCtx) -> ActionStatus {
        self.phase_timer -= ctx.dt;
        if self.phase_timer > 0.0 {
            return ActionStatus::Running;
        }

        if self.firing {
            self.release_trigger(ctx);
            self.bursts_left -= 1;
            if self.bursts_left == 0 {
                return ActionStatus::Success;
            }
            self.phase_timer = ctx.rng.gen_range(0.3..0.8);
        } else {
            let ActionCtx {
                loadout,
                outbox,
                net,
                now,
                ..
            } = ctx;
            match loadout.as_deref_mut() {
                Some(l) if l.current().is_some() => {
                    l.start_fire(self.slot, *net, *now, outbox);
                }
                // Оружие потеряли по дороге
                _ => return ActionStatus::Failure,
            }
            self.firing = true;
            self.phase_timer = ctx.rng.gen_range(0.2..0.5);
        }
        ActionStatus::Running
    }
}
