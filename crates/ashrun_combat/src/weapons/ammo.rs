//! Патроны fire-mode'а.
//!
//! Float-based: дробовик может тратить 1.0, лучемёт — 0.25 за тик луча.
//! Amount реплицируется SkipOwner (владелец предсказывает сам),
//! initial — OwnerOnly (late-join владельца).

use std::collections::VecDeque;

use crate::logger::log_warning;
use crate::net::{NetContext, Outbox};
use crate::weapons::events::CombatEvent;
use crate::weapons::{FireSlot, WeaponId};

/// Сколько последних изменений храним для отладки рассинхронов.
const AMMO_HISTORY_CAP: usize = 8;

/// Статическое описание боезапаса.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmmoSpec {
    pub max: f32,
    pub default_amount: f32,
}

impl Default for AmmoSpec {
    fn default() -> Self {
        Self {
            max: 100.0,
            default_amount: 50.0,
        }
    }
}

/// Запись истории изменений (отладка prediction-рассинхронов).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmmoDelta {
    pub time: f32,
    pub delta: f32,
    pub result: f32,
}

/// Runtime-состояние боезапаса одного fire-mode'а.
#[derive(Debug, Clone)]
pub struct Ammo {
    max: f32,
    default_amount: f32,
    /// -1.0 = ещё не инициализировано (sentinel, как и initial).
    amount: f32,
    /// Стартовое значение: authority выставляет сам, владелец получает OwnerOnly-репликой.
    initial: f32,
    done_first_init: bool,
    history: VecDeque<AmmoDelta>,
}

impl Ammo {
    pub fn new(spec: AmmoSpec) -> Self {
        Self {
            max: spec.max,
            default_amount: spec.default_amount,
            amount: -1.0,
            initial: -1.0,
            done_first_init: false,
            history: VecDeque::with_capacity(AMMO_HISTORY_CAP),
        }
    }

    pub fn amount(&self) -> f32 {
        self.amount
    }

    pub fn max(&self) -> f32 {
        self.max
    }

    pub fn initial(&self) -> f32 {
        self.initial
    }

    pub fn is_initialized(&self) -> bool {
        self.done_first_init
    }

    /// Первичная инициализация. На authority seed'ит initial из default.
    /// На владельце amount берётся из initial, когда тот приехал репликой.
    pub fn initialize(&mut self, net: NetContext) {
        if self.done_first_init {
            return;
        }
        if net.is_authority() {
            self.initial = self.default_amount.clamp(0.0, self.max);
            self.amount = self.initial;
            self.done_first_init = true;
        } else if self.initial >= 0.0 {
            // Реплика initial уже пришла — можно стартовать prediction
            self.amount = self.initial;
            self.done_first_init = true;
        }
    }

    pub fn can_consume(&self, cost: f32) -> bool {
        cost <= self.amount
    }

    /// Списывает cost. Simulated proxy ничего не тратит (у него SkipOwner-реплика),
    /// но и не блокирует выстрел — возвращает true.
    pub fn consume(
        &mut self,
        cost: f32,
        weapon: WeaponId,
        slot: FireSlot,
        net: NetContext,
        now: f32,
        outbox: &mut Outbox,
    ) -> bool {
        if net.is_simulated_proxy() {
            return true;
        }
        if !self.can_consume(cost) {
            return false;
        }
        self.apply_delta(-cost, now);
        outbox.push(CombatEvent::AmmoChanged {
            weapon,
            slot,
            amount: self.amount,
        });
        true
    }

    /// Пополнение (подбор патронов). Возвращает фактически добавленное.
    pub fn load(
        &mut self,
        amount: f32,
        weapon: WeaponId,
        slot: FireSlot,
        now: f32,
        outbox: &mut Outbox,
    ) -> f32 {
        let before = self.amount;
        self.apply_delta(amount, now);
        let added = self.amount - before;
        if added != 0.0 {
            outbox.push(CombatEvent::AmmoChanged {
                weapon,
                slot,
                amount: self.amount,
            });
        }
        added
    }

    fn apply_delta(&mut self, delta: f32, now: f32) {
        self.amount = (self.amount + delta).clamp(0.0, self.max);
        if self.history.len() == AMMO_HISTORY_CAP {
            self.history.pop_front();
        }
        self.history.push_back(AmmoDelta {
            time: now,
            delta,
            result: self.amount,
        });
    }

    /// Авторитетная коррекция с сервера — применяем безусловно.
    pub fn apply_correction(&mut self, amount: f32, now: f32) {
        log_warning(&format!(
            "⚠️ Ammo correction: {} -> {}",
            self.amount, amount
        ));
        let delta = amount - self.amount;
        self.apply_delta(delta, now);
    }

    /// Реплика AmmoAmount (SkipOwner — приходит только на proxy).
    pub fn apply_rep_amount(&mut self, amount: f32) {
        self.amount = amount.clamp(0.0, self.max);
    }

    /// Реплика InitialAmmo (OwnerOnly). Proxy игнорирует.
    pub fn apply_rep_initial(&mut self, initial: f32, net: NetContext) {
        if net.is_simulated_proxy() {
            return;
        }
        self.initial = initial;
        if !self.done_first_init {
            self.amount = self.initial.clamp(0.0, self.max);
            self.done_first_init = true;
        }
    }

    pub fn history(&self) -> impl Iterator<Item = &AmmoDelta> {
        self.history.iter()
    }
}
