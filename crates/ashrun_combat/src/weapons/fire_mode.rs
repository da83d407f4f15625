//! Fire mode — state machine одного режима стрельбы.
//!
//! Полный цикл: fire → таймер fire_rate → fire_complete → (авто-refire).
//! Репликация через fire counter: сервер крутит счётчик, simulated proxy
//! догоняет его косметическими выстрелами (с clamp'ом, чтобы после лага
//! не проигрывать очередь из тридцати выстрелов разом).

use crate::logger::{log, log_warning};
use crate::net::{ClientMsg, Outbox, ServerMsg};
use crate::weapons::ammo::{Ammo, AmmoSpec};
use crate::weapons::events::CombatEvent;
use crate::weapons::weapon::WeaponCtx;
use crate::weapons::{FireSlot, FireType, WeaponState};

/// Статическое описание fire-mode'а.
#[derive(Debug, Clone)]
pub struct FireModeSpec {
    /// Секунд на один выстрел.
    pub fire_rate: f32,
    pub fire_type: FireType,
    /// Реплицируется ли слот на proxy (melee-пинок может быть чисто локальным).
    pub replicated: bool,
    /// Сколько патронов тратит один выстрел.
    pub consume_cost: f32,
    /// None — бесконечный боезапас (нож).
    pub ammo: Option<AmmoSpec>,
}

impl Default for FireModeSpec {
    fn default() -> Self {
        Self {
            fire_rate: 0.5,
            fire_type: FireType::SemiAuto,
            replicated: true,
            consume_cost: 1.0,
            ammo: Some(AmmoSpec::default()),
        }
    }
}

/// Runtime-состояние fire-mode'а.
#[derive(Debug, Clone)]
pub struct FireMode {
    slot: FireSlot,
    fire_rate: f32,
    fire_type: FireType,
    replicated: bool,
    consume_cost: f32,
    /// Игрок держит триггер (intent, не факт стрельбы).
    holding_fire: bool,
    /// Обратный отсчёт текущего выстрела. Some = стреляем.
    fire_timer: Option<f32>,
    /// Серверный счётчик выстрелов (реплицируется SkipOwner).
    fire_counter: i32,
    /// Сколько выстрелов проиграла эта реплика.
    local_fire_counter: i32,
    ammo: Option<Ammo>,
}

impl FireMode {
    pub fn new(slot: FireSlot, spec: &FireModeSpec) -> Self {
        Self {
            slot,
            fire_rate: spec.fire_rate.max(0.01),
            fire_type: spec.fire_type,
            replicated: spec.replicated,
            consume_cost: spec.consume_cost,
            holding_fire: false,
            fire_timer: None,
            fire_counter: 0,
            local_fire_counter: 0,
            ammo: spec.ammo.map(Ammo::new),
        }
    }

    pub fn slot(&self) -> FireSlot {
        self.slot
    }

    pub fn is_replicated(&self) -> bool {
        self.replicated
    }

    pub fn is_firing(&self) -> bool {
        self.fire_timer.is_some()
    }

    pub fn is_holding_fire(&self) -> bool {
        self.holding_fire
    }

    pub fn fire_counter(&self) -> i32 {
        self.fire_counter
    }

    pub fn ammo(&self) -> Option<&Ammo> {
        self.ammo.as_ref()
    }

    pub fn ammo_mut(&mut self) -> Option<&mut Ammo> {
        self.ammo.as_mut()
    }

    pub fn initialize(&mut self, ctx: WeaponCtx) {
        if let Some(ammo) = &mut self.ammo {
            ammo.initialize(ctx.net);
        }
    }

    /// Можно ли сейчас начать выстрел. Simulated proxy не гейтится —
    /// сервер уже всё проверил, проксе остаётся проиграть косметику.
    pub fn can_fire(&self, ctx: WeaponCtx) -> bool {
        if ctx.net.is_simulated_proxy() {
            return !self.is_firing();
        }
        if ctx.state != WeaponState::Active {
            return false;
        }
        if self.is_firing() {
            return false;
        }
        if let Some(ammo) = &self.ammo {
            if !ammo.can_consume(self.consume_cost) {
                return false;
            }
        }
        true
    }

    /// Пока идёт выстрел, оружие нельзя убрать.
    pub fn can_put_down(&self) -> bool {
        !self.is_firing()
    }

    /// Начинает выстрел. `override_start` — серверное время нажатия клиента
    /// (lag compensation), -1.0 если выстрел локальный.
    ///
    /// Intent (holding_fire) выставляется ДО гейта: авто-режим должен
    /// подхватить стрельбу, как только появятся патроны/завершится equip.
    pub fn fire(&mut self, ctx: WeaponCtx, override_start: f32, outbox: &mut Outbox) -> bool {
        self.holding_fire = true;

        if !self.can_fire(ctx) {
            return false;
        }

        outbox.push(CombatEvent::FireStart {
            weapon: ctx.weapon,
            slot: self.slot,
        });

        if let Some(ammo) = &mut self.ammo {
            if !ammo.consume(self.consume_cost, ctx.weapon, self.slot, ctx.net, ctx.now, outbox) {
                // Гейт уже прошёл can_consume, сюда попадаем только при гонке
                return false;
            }
        }

        if self.fire_type == FireType::SemiAuto && ctx.net.is_locally_owned() {
            // Полуавтомат: одно нажатие — один выстрел
            self.holding_fire = false;
        }

        // Компенсация RTT: выстрел клиента на сервере укорачивается на
        // время в полёте, но не больше чем до половины fire_rate.
        let duration = if override_start >= 0.0 {
            (self.fire_rate - (ctx.now - override_start))
                .max(self.fire_rate * 0.5)
                .max(0.01)
        } else {
            self.fire_rate
        };
        self.fire_timer = Some(duration);
        self.local_fire_counter += 1;

        if ctx.net.is_authority() {
            self.fire_counter += 1;
        }

        if ctx.net.is_locally_owned_remote() {
            outbox.send_client(ClientMsg::Fire {
                slot: self.slot,
                server_time: ctx.now,
            });
        }

        true
    }

    /// Выстрел завершён (таймер истёк).
    pub fn fire_complete(&mut self, ctx: WeaponCtx, outbox: &mut Outbox) {
        self.fire_timer = None;
        outbox.push(CombatEvent::FireComplete {
            weapon: ctx.weapon,
            slot: self.slot,
        });

        if ctx.net.is_simulated_proxy() {
            // Proxy после выстрела продолжает догонять счётчик
            self.catch_up_fire_counter(ctx, outbox);
            return;
        }

        if ctx.net.is_locally_owned()
            && self.fire_type == FireType::Automatic
            && self.holding_fire
            && self.can_fire(ctx)
        {
            self.fire(ctx, -1.0, outbox);
        }
    }

    /// Триггер отпущен.
    pub fn stop_fire(&mut self, ctx: WeaponCtx, outbox: &mut Outbox) {
        if !self.holding_fire {
            return;
        }
        self.holding_fire = false;
        if ctx.net.is_locally_owned_remote() {
            outbox.send_client(ClientMsg::StopFire {
                slot: self.slot,
                server_time: ctx.now,
            });
        }
    }

    /// Сервер принудительно завершает выстрел (форсированный put-down).
    pub fn force_end_fire(&mut self, ctx: WeaponCtx, outbox: &mut Outbox) {
        if !ctx.net.is_non_owning_authority() {
            return;
        }
        self.holding_fire = false;
        if self.is_firing() {
            self.fire_complete(ctx, outbox);
        }
    }

    /// Серверная обработка ClientMsg::Fire.
    ///
    /// Проверки проваливаются → клиенту летит FailedFire + авторитетный
    /// боезапас (клиент уже списал патрон у себя). Счётчик инкрементится
    /// в любом случае: proxy-реплики должны видеть тот же номер выстрела,
    /// что и owner после отката.
    pub fn server_fire(&mut self, ctx: WeaponCtx, client_time: f32, outbox: &mut Outbox) {
        // Клиент не может жить в будущем сервера
        let override_start = client_time.min(ctx.now);
        if !self.fire(ctx, override_start, outbox) {
            log_warning(&format!(
                "⚠️ server_fire rejected: weapon {:?} slot {:?}",
                ctx.weapon, self.slot
            ));
            outbox.send_server(ServerMsg::FailedFire {
                weapon: ctx.weapon,
                slot: self.slot,
            });
            if let Some(ammo) = &self.ammo {
                outbox.send_server(ServerMsg::AmmoCorrection {
                    weapon: ctx.weapon,
                    slot: self.slot,
                    amount: ammo.amount(),
                });
            }
            self.fire_counter += 1;
            self.local_fire_counter = self.fire_counter;
        }
    }

    /// Реплика fire counter'а пришла на proxy.
    pub fn on_rep_fire_counter(&mut self, value: i32, ctx: WeaponCtx, outbox: &mut Outbox) {
        self.fire_counter = value;
        // Снэп без косметики: реплика только появилась, счётчик сбросили,
        // или оружие вообще убрано
        if !ctx.begun_play || value <= 0 || ctx.state == WeaponState::Inactive {
            self.local_fire_counter = value;
            return;
        }
        self.catch_up_fire_counter(ctx, outbox);
    }

    /// Догоняет серверный счётчик косметическими выстрелами.
    /// За один заход проигрываем не больше ceil((rate+0.5)/rate) выстрелов —
    /// после лага нет смысла прокручивать всю пропущенную очередь.
    fn catch_up_fire_counter(&mut self, ctx: WeaponCtx, outbox: &mut Outbox) {
        let max_shots = ((self.fire_rate + 0.5) / self.fire_rate).ceil() as i32;
        let deficit = self.fire_counter - self.local_fire_counter;
        if deficit <= 0 {
            return;
        }
        if deficit > max_shots {
            log(&format!(
                "🗑️ Dropping {} stale cosmetic shots on slot {:?}",
                deficit - max_shots,
                self.slot
            ));
            self.local_fire_counter = self.fire_counter - max_shots;
        }
        if !self.fire(ctx, -1.0, outbox) {
            self.local_fire_counter = self.fire_counter;
        }
    }

    /// Оружие доехало до Active — авто-режим с зажатым триггером стреляет сам.
    pub fn weapon_equip_complete(&mut self, ctx: WeaponCtx, outbox: &mut Outbox) {
        if ctx.net.is_locally_owned() && self.holding_fire && self.can_fire(ctx) {
            self.fire(ctx, -1.0, outbox);
        }
    }

    /// Тик таймера выстрела.
    pub fn tick(&mut self, dt: f32, ctx: WeaponCtx, outbox: &mut Outbox) {
        if let Some(t) = &mut self.fire_timer {
            *t -= dt;
        }
        if matches!(self.fire_timer, Some(t) if t <= 0.0) {
            self.fire_complete(ctx, outbox);
        }
    }
}
