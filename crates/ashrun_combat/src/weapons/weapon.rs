//! Оружие: state machine Active/Inactive/Equipping/PuttingDown
//! плюс набор fire-mode слотов.
//!
//! Переходы рисует владелец (и сервер), simulated proxy получает
//! состояние только репликой и доигрывает cosmetics по edge'ам.

use std::collections::HashMap;

use crate::logger::{log, log_error};
use crate::net::{NetContext, Outbox};
use crate::weapons::events::CombatEvent;
use crate::weapons::fire_mode::{FireMode, FireModeSpec};
use crate::weapons::{FireSlot, FireType, WeaponGroup, WeaponId, WeaponState, MAX_FIRE_SLOTS};

/// Снимок состояния оружия, который пробрасывается в fire modes.
/// Copy — чтобы не упираться в borrow при итерации по слотам.
#[derive(Debug, Clone, Copy)]
pub struct WeaponCtx {
    pub weapon: WeaponId,
    pub state: WeaponState,
    pub begun_play: bool,
    pub net: NetContext,
    pub now: f32,
}

/// Статическое описание класса оружия.
#[derive(Debug, Clone)]
pub struct WeaponSpec {
    /// Идентификатор класса ("pistol", "rifle"...). Ключ в каталоге.
    pub class: String,
    pub group: WeaponGroup,
    /// Приоритет автовыбора: выше — лучше.
    pub rating: f32,
    pub equip_time: f32,
    pub put_down_time: f32,
    pub fire_modes: Vec<(FireSlot, FireModeSpec)>,
}

impl WeaponSpec {
    pub fn pistol() -> Self {
        Self {
            class: "pistol".to_string(),
            group: WeaponGroup::Pistol,
            rating: 10.0,
            equip_time: 0.4,
            put_down_time: 0.3,
            fire_modes: vec![(
                FireSlot::Primary,
                FireModeSpec {
                    fire_rate: 0.35,
                    fire_type: FireType::SemiAuto,
                    ..Default::default()
                },
            )],
        }
    }

    pub fn rifle() -> Self {
        Self {
            class: "rifle".to_string(),
            group: WeaponGroup::Rifle,
            rating: 30.0,
            equip_time: 0.7,
            put_down_time: 0.5,
            fire_modes: vec![(
                FireSlot::Primary,
                FireModeSpec {
                    fire_rate: 0.1,
                    fire_type: FireType::Automatic,
                    ..Default::default()
                },
            )],
        }
    }

    pub fn combat_knife() -> Self {
        Self {
            class: "combat_knife".to_string(),
            group: WeaponGroup::Melee,
            rating: 2.0,
            equip_time: 0.2,
            put_down_time: 0.15,
            fire_modes: vec![(
                FireSlot::Primary,
                FireModeSpec {
                    fire_rate: 0.6,
                    fire_type: FireType::SemiAuto,
                    // Нож чисто косметический на проксях, без репликации слота
                    replicated: false,
                    consume_cost: 0.0,
                    ammo: None,
                },
            )],
        }
    }
}

/// Каталог классов оружия. Shared-данные: клиент строит оружие
/// из реплики списка инвентаря по имени класса.
#[derive(Debug, Clone, Default)]
pub struct WeaponCatalog {
    specs: HashMap<String, WeaponSpec>,
}

impl WeaponCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        let mut catalog = Self::new();
        catalog.register(WeaponSpec::combat_knife());
        catalog.register(WeaponSpec::pistol());
        catalog.register(WeaponSpec::rifle());
        catalog
    }

    pub fn register(&mut self, spec: WeaponSpec) {
        self.specs.insert(spec.class.clone(), spec);
    }

    pub fn get(&self, class: &str) -> Option<&WeaponSpec> {
        self.specs.get(class)
    }
}

/// Runtime-экземпляр оружия внутри Loadout'а.
#[derive(Debug, Clone)]
pub struct Weapon {
    id: WeaponId,
    class: String,
    group: WeaponGroup,
    rating: f32,
    state: WeaponState,
    equip_time: f32,
    put_down_time: f32,
    /// Put-down запрошен, но заблокирован стрельбой — доберём на fire complete.
    pending_put_down: bool,
    equip_timer: Option<f32>,
    put_down_timer: Option<f32>,
    fire_modes: [Option<FireMode>; MAX_FIRE_SLOTS],
    /// Спеки слотов — для отложенного конструирования на клиенте.
    spec_fire_modes: Vec<(FireSlot, FireModeSpec)>,
    begun_play: bool,
}

impl Weapon {
    pub fn new(id: WeaponId, spec: &WeaponSpec) -> Self {
        Self {
            id,
            class: spec.class.clone(),
            group: spec.group,
            rating: spec.rating,
            state: WeaponState::Inactive,
            equip_time: spec.equip_time.max(0.0),
            put_down_time: spec.put_down_time.max(0.0),
            pending_put_down: false,
            equip_timer: None,
            put_down_timer: None,
            fire_modes: [None, None, None, None, None],
            spec_fire_modes: spec.fire_modes.clone(),
            begun_play: false,
        }
    }

    pub fn id(&self) -> WeaponId {
        self.id
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn group(&self) -> WeaponGroup {
        self.group
    }

    pub fn rating(&self) -> f32 {
        self.rating
    }

    pub fn state(&self) -> WeaponState {
        self.state
    }

    pub fn has_begun_play(&self) -> bool {
        self.begun_play
    }

    pub fn has_pending_put_down(&self) -> bool {
        self.pending_put_down
    }

    pub fn fire_mode(&self, slot: FireSlot) -> Option<&FireMode> {
        self.fire_modes[slot.index()].as_ref()
    }

    pub fn fire_mode_mut(&mut self, slot: FireSlot) -> Option<&mut FireMode> {
        self.fire_modes[slot.index()].as_mut()
    }

    pub fn fire_modes(&self) -> impl Iterator<Item = &FireMode> {
        self.fire_modes.iter().flatten()
    }

    pub fn ctx(&self, net: NetContext, now: f32) -> WeaponCtx {
        WeaponCtx {
            weapon: self.id,
            state: self.state,
            begun_play: self.begun_play,
            net,
            now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state == WeaponState::Active
    }

    pub fn is_inactive(&self) -> bool {
        self.state == WeaponState::Inactive
    }

    pub fn is_equipping(&self) -> bool {
        self.state == WeaponState::Equipping
    }

    pub fn is_putting_down(&self) -> bool {
        self.state == WeaponState::PuttingDown
    }

    pub fn is_firing(&self) -> bool {
        self.fire_modes().any(|m| m.is_firing())
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    pub fn begin_play(&mut self, net: NetContext, now: f32) {
        if self.begun_play {
            return;
        }
        self.begun_play = true;
        self.build_fire_modes(net, now);
    }

    /// Конструирует fire modes по правилам репликации роли:
    /// - non-replicated слоты живут только там, где есть владелец
    ///   (cosmetics владельца серверу чужого pawn'а не нужны);
    /// - replicated слоты на клиентах ждут RepUpdate::FireModeList.
    fn build_fire_modes(&mut self, net: NetContext, now: f32) {
        for (slot, spec) in self.spec_fire_modes.clone() {
            if !spec.replicated && net.is_non_owning_authority() {
                continue;
            }
            if spec.replicated && !net.is_authority() {
                continue;
            }
            self.construct_fire_mode(slot, &spec, net, now);
        }
    }

    fn construct_fire_mode(&mut self, slot: FireSlot, spec: &FireModeSpec, net: NetContext, now: f32) {
        if self.fire_modes[slot.index()].is_some() {
            return;
        }
        let mut mode = FireMode::new(slot, spec);
        mode.initialize(WeaponCtx {
            weapon: self.id,
            state: self.state,
            begun_play: self.begun_play,
            net,
            now,
        });
        self.fire_modes[slot.index()] = Some(mode);
    }

    /// Клиент получил список replicated-слотов этого оружия.
    pub fn apply_rep_fire_mode_list(&mut self, slots: &[FireSlot], net: NetContext, now: f32) {
        for slot in slots {
            if let Some((_, spec)) = self
                .spec_fire_modes
                .iter()
                .find(|(s, _)| s == slot)
                .cloned()
            {
                self.construct_fire_mode(*slot, &spec, net, now);
            } else {
                log_error(&format!(
                    "Replicated fire mode list names unknown slot {:?} on {}",
                    slot, self.class
                ));
            }
        }
    }

    /// Слоты для RepUpdate::FireModeList (только replicated).
    pub fn replicated_slots(&self) -> Vec<FireSlot> {
        self.spec_fire_modes
            .iter()
            .filter(|(_, spec)| spec.replicated)
            .map(|(slot, _)| *slot)
            .collect()
    }

    // ========================================================================
    // State machine
    // ========================================================================

    /// Прямой переход. Simulated proxy состояние не рисует —
    /// его двигает только apply_replicated_state.
    fn set_state(&mut self, new: WeaponState, net: NetContext, now: f32, outbox: &mut Outbox) {
        if net.is_simulated_proxy() {
            return;
        }
        if self.state == new {
            return;
        }
        let previous = self.state;
        self.state = new;
        self.on_state_changed(previous, net, now, outbox);
    }

    /// Реплика WeaponState пришла на proxy. Edge-triggered:
    /// повторное значение ничего не запускает.
    pub fn apply_replicated_state(
        &mut self,
        new: WeaponState,
        net: NetContext,
        now: f32,
        outbox: &mut Outbox,
    ) {
        if self.state == new {
            return;
        }
        let previous = self.state;
        self.state = new;
        self.on_state_changed(previous, net, now, outbox);
    }

    fn on_state_changed(
        &mut self,
        previous: WeaponState,
        net: NetContext,
        now: f32,
        outbox: &mut Outbox,
    ) {
        outbox.push(CombatEvent::WeaponStateChanged {
            weapon: self.id,
            state: self.state,
            previous,
        });

        match self.state {
            WeaponState::Equipping => {
                outbox.push(CombatEvent::WeaponEquipStart { weapon: self.id });
            }
            WeaponState::PuttingDown => {
                outbox.push(CombatEvent::WeaponPutDownStart { weapon: self.id });
            }
            WeaponState::Active => {
                if previous == WeaponState::Equipping {
                    outbox.push(CombatEvent::WeaponEquipComplete { weapon: self.id });
                    // Зажатый триггер подхватывает стрельбу сразу после equip
                    let ctx = self.ctx(net, now);
                    for mode in self.fire_modes.iter_mut().flatten() {
                        mode.weapon_equip_complete(ctx, outbox);
                    }
                }
            }
            WeaponState::Inactive => {
                if previous == WeaponState::PuttingDown {
                    outbox.push(CombatEvent::WeaponPutDownComplete { weapon: self.id });
                }
            }
            // Custom оружие двигает само, у машины тут нет реакции
            WeaponState::Custom => {}
        }
    }

    pub fn can_equip(&self, net: NetContext) -> bool {
        // Серверу чужого pawn'а и проксе доверяем внешнему потоку состояний
        if net.is_non_owning_authority() || net.is_simulated_proxy() {
            return true;
        }
        self.state != WeaponState::Equipping
    }

    pub fn equip(&mut self, net: NetContext, now: f32, outbox: &mut Outbox) -> bool {
        if !self.can_equip(net) {
            return false;
        }
        if self.state == WeaponState::Active {
            self.pending_put_down = false;
            return true;
        }
        self.pending_put_down = false;
        self.put_down_timer = None;
        self.set_state(WeaponState::Equipping, net, now, outbox);
        self.equip_timer = Some(self.equip_time);
        true
    }

    fn equip_complete(&mut self, net: NetContext, now: f32, outbox: &mut Outbox) {
        self.equip_timer = None;
        self.set_state(WeaponState::Active, net, now, outbox);
    }

    pub fn can_put_down(&self, net: NetContext) -> bool {
        if net.is_non_owning_authority() || net.is_simulated_proxy() {
            return true;
        }
        if self.state != WeaponState::Active {
            return false;
        }
        self.fire_modes().all(|m| m.can_put_down())
    }

    /// Запрос на уборку. Блокирован стрельбой у владельца — запоминаем
    /// intent и вернёмся к нему, когда выстрел завершится.
    pub fn put_down(&mut self, net: NetContext, now: f32, outbox: &mut Outbox) -> bool {
        if !self.can_put_down(net) {
            if net.is_locally_owned() && self.state == WeaponState::Active {
                self.pending_put_down = true;
            }
            return false;
        }
        self.pending_put_down = false;
        self.equip_timer = None;
        self.set_state(WeaponState::PuttingDown, net, now, outbox);
        self.put_down_timer = Some(self.put_down_time);
        true
    }

    fn put_down_complete(&mut self, net: NetContext, now: f32, outbox: &mut Outbox) {
        self.put_down_timer = None;
        self.set_state(WeaponState::Inactive, net, now, outbox);
    }

    /// Сбрасывает отложенный put-down intent (отмена swap'а).
    pub fn clear_pending_put_down(&mut self) {
        self.pending_put_down = false;
    }

    /// Авторитетный fast-forward: недоигранная уборка завершается сразу.
    /// Никогда не зовётся на локально-владеющей реплике — она играет
    /// таймеры честно.
    pub fn abort_put_down(&mut self, net: NetContext, now: f32, outbox: &mut Outbox) -> bool {
        if !net.is_non_owning_authority() {
            return false;
        }
        if self.state != WeaponState::PuttingDown {
            return false;
        }
        self.put_down_complete(net, now, outbox);
        true
    }

    /// Fast-forward в другую сторону: недоигранный equip прогоняется
    /// через Active и полную уборку до Inactive.
    pub fn abort_equip(&mut self, net: NetContext, now: f32, outbox: &mut Outbox) -> bool {
        if !net.is_non_owning_authority() {
            return false;
        }
        if self.state != WeaponState::Equipping {
            return false;
        }
        self.equip_complete(net, now, outbox);
        self.put_down(net, now, outbox);
        self.put_down_complete(net, now, outbox);
        true
    }

    /// Сервер догоняет клиента: клиент уже считает оружие убранным,
    /// серверная копия снимается форсированно.
    pub fn force_put_down(&mut self, net: NetContext, now: f32, outbox: &mut Outbox) {
        if !net.is_non_owning_authority() {
            return;
        }
        match self.state {
            WeaponState::Inactive => return,
            WeaponState::PuttingDown => {
                self.put_down_complete(net, now, outbox);
            }
            WeaponState::Equipping => {
                self.abort_equip(net, now, outbox);
            }
            _ => {
                let ctx = self.ctx(net, now);
                for mode in self.fire_modes.iter_mut().flatten() {
                    mode.force_end_fire(ctx, outbox);
                }
                if !self.put_down(net, now, outbox) {
                    log_error(&format!(
                        "Force put down of {} blocked after force-ending fire",
                        self.class
                    ));
                    return;
                }
                self.put_down_complete(net, now, outbox);
            }
        }
        log(&format!("🗑️ Force put down {}", self.class));
    }

    /// Сервер догоняет клиента в другую сторону: клиент уже стреляет,
    /// а серверная копия ещё доигрывает переход.
    pub fn force_equip(&mut self, net: NetContext, now: f32, outbox: &mut Outbox) {
        if !net.is_non_owning_authority() {
            return;
        }
        match self.state {
            WeaponState::Active => {}
            WeaponState::Equipping => self.equip_complete(net, now, outbox),
            WeaponState::PuttingDown => {
                // Доигрываем уборку; pump инвентаря достанет оружие обратно
                self.abort_put_down(net, now, outbox);
            }
            _ => {
                self.equip(net, now, outbox);
                self.equip_complete(net, now, outbox);
            }
        }
    }

    // ========================================================================
    // Fire
    // ========================================================================

    pub fn start_fire(&mut self, slot: FireSlot, net: NetContext, now: f32, outbox: &mut Outbox) -> bool {
        let ctx = self.ctx(net, now);
        match &mut self.fire_modes[slot.index()] {
            Some(mode) => mode.fire(ctx, -1.0, outbox),
            None => false,
        }
    }

    pub fn stop_fire(&mut self, slot: FireSlot, net: NetContext, now: f32, outbox: &mut Outbox) {
        let ctx = self.ctx(net, now);
        if let Some(mode) = &mut self.fire_modes[slot.index()] {
            mode.stop_fire(ctx, outbox);
        }
    }

    /// Серверная обработка ClientMsg::Fire. Если серверная копия ещё
    /// в Equipping — клиенту виднее, форсируем Active перед проверками.
    pub fn handle_client_fire(
        &mut self,
        slot: FireSlot,
        client_time: f32,
        net: NetContext,
        now: f32,
        outbox: &mut Outbox,
    ) {
        if self.state == WeaponState::Equipping {
            self.force_equip(net, now, outbox);
        }
        let ctx = self.ctx(net, now);
        if let Some(mode) = &mut self.fire_modes[slot.index()] {
            mode.server_fire(ctx, client_time, outbox);
        } else {
            log_error(&format!(
                "Client fire on missing fire mode {:?} of {}",
                slot, self.class
            ));
        }
    }

    // ========================================================================
    // Replication appliers
    // ========================================================================

    pub fn apply_rep_fire_counter(
        &mut self,
        slot: FireSlot,
        value: i32,
        net: NetContext,
        now: f32,
        outbox: &mut Outbox,
    ) {
        let ctx = self.ctx(net, now);
        if let Some(mode) = &mut self.fire_modes[slot.index()] {
            mode.on_rep_fire_counter(value, ctx, outbox);
        }
    }

    pub fn apply_rep_ammo_amount(&mut self, slot: FireSlot, amount: f32) {
        if let Some(ammo) = self.fire_modes[slot.index()]
            .as_mut()
            .and_then(|m| m.ammo_mut())
        {
            ammo.apply_rep_amount(amount);
        }
    }

    pub fn apply_rep_ammo_initial(&mut self, slot: FireSlot, initial: f32, net: NetContext) {
        if let Some(ammo) = self.fire_modes[slot.index()]
            .as_mut()
            .and_then(|m| m.ammo_mut())
        {
            ammo.apply_rep_initial(initial, net);
        }
    }

    // ========================================================================
    // Tick
    // ========================================================================

    pub fn tick(&mut self, dt: f32, net: NetContext, now: f32, outbox: &mut Outbox) {
        if !self.begun_play {
            self.begin_play(net, now);
        }

        if let Some(t) = &mut self.equip_timer {
            *t -= dt;
        }
        if matches!(self.equip_timer, Some(t) if t <= 0.0) {
            self.equip_complete(net, now, outbox);
        }

        if let Some(t) = &mut self.put_down_timer {
            *t -= dt;
        }
        if matches!(self.put_down_timer, Some(t) if t <= 0.0) {
            self.put_down_complete(net, now, outbox);
        }

        let ctx = self.ctx(net, now);
        for mode in self.fire_modes.iter_mut().flatten() {
            mode.tick(dt, ctx, outbox);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_weapon(spec: &WeaponSpec) -> (Weapon, Outbox) {
        let mut weapon = Weapon::new(WeaponId(1), spec);
        weapon.begin_play(NetContext::AUTHORITY, 0.0);
        (weapon, Outbox::new())
    }

    fn run_ticks(weapon: &mut Weapon, outbox: &mut Outbox, net: NetContext, ticks: u32) {
        let dt = 1.0 / 60.0;
        for i in 0..ticks {
            weapon.tick(dt, net, i as f32 * dt, outbox);
        }
    }

    #[test]
    fn test_equip_cycle() {
        let (mut weapon, mut outbox) = make_weapon(&WeaponSpec::pistol());
        assert!(weapon.is_inactive());
        assert!(weapon.equip(NetContext::AUTHORITY, 0.0, &mut outbox));
        assert!(weapon.is_equipping());
        // 0.4s equip при 60Hz — 24 тика плюс запас
        run_ticks(&mut weapon, &mut outbox, NetContext::AUTHORITY, 26);
        assert!(weapon.is_active());
        assert!(outbox
            .events
            .contains(&CombatEvent::WeaponEquipComplete { weapon: WeaponId(1) }));
    }

    #[test]
    fn test_put_down_cycle() {
        let (mut weapon, mut outbox) = make_weapon(&WeaponSpec::pistol());
        weapon.equip(NetContext::AUTHORITY, 0.0, &mut outbox);
        run_ticks(&mut weapon, &mut outbox, NetContext::AUTHORITY, 26);
        assert!(weapon.put_down(NetContext::AUTHORITY, 0.5, &mut outbox));
        assert!(weapon.is_putting_down());
        run_ticks(&mut weapon, &mut outbox, NetContext::AUTHORITY, 20);
        assert!(weapon.is_inactive());
        assert!(outbox
            .events
            .contains(&CombatEvent::WeaponPutDownComplete { weapon: WeaponId(1) }));
    }

    #[test]
    fn test_put_down_blocked_by_firing_sets_pending() {
        let (mut weapon, mut outbox) = make_weapon(&WeaponSpec::pistol());
        weapon.equip(NetContext::AUTHORITY, 0.0, &mut outbox);
        run_ticks(&mut weapon, &mut outbox, NetContext::AUTHORITY, 26);
        assert!(weapon.start_fire(FireSlot::Primary, NetContext::AUTHORITY, 0.5, &mut outbox));
        assert!(weapon.is_firing());

        assert!(!weapon.put_down(NetContext::AUTHORITY, 0.5, &mut outbox));
        assert!(weapon.is_active());
        assert!(weapon.has_pending_put_down());
    }

    #[test]
    fn test_abort_put_down_fast_forwards_on_server() {
        let mut weapon = Weapon::new(WeaponId(8), &WeaponSpec::pistol());
        weapon.begin_play(NetContext::SERVER_PROXY, 0.0);
        let mut outbox = Outbox::new();
        weapon.equip(NetContext::SERVER_PROXY, 0.0, &mut outbox);
        run_ticks(&mut weapon, &mut outbox, NetContext::SERVER_PROXY, 26);
        weapon.put_down(NetContext::SERVER_PROXY, 0.5, &mut outbox);

        assert!(weapon.abort_put_down(NetContext::SERVER_PROXY, 0.6, &mut outbox));
        assert!(weapon.is_inactive());
        assert!(outbox
            .events
            .contains(&CombatEvent::WeaponPutDownComplete { weapon: WeaponId(8) }));
    }

    #[test]
    fn test_abort_put_down_refused_on_owner() {
        let (mut weapon, mut outbox) = make_weapon(&WeaponSpec::pistol());
        weapon.equip(NetContext::AUTHORITY, 0.0, &mut outbox);
        run_ticks(&mut weapon, &mut outbox, NetContext::AUTHORITY, 26);
        weapon.put_down(NetContext::AUTHORITY, 0.5, &mut outbox);

        // Владелец играет таймеры честно — fast-forward ему запрещён
        assert!(!weapon.abort_put_down(NetContext::AUTHORITY, 0.6, &mut outbox));
        assert!(weapon.is_putting_down());
    }

    #[test]
    fn test_abort_equip_runs_full_cycle_to_inactive() {
        let mut weapon = Weapon::new(WeaponId(9), &WeaponSpec::rifle());
        weapon.begin_play(NetContext::SERVER_PROXY, 0.0);
        let mut outbox = Outbox::new();
        weapon.equip(NetContext::SERVER_PROXY, 0.0, &mut outbox);
        assert!(weapon.is_equipping());

        assert!(weapon.abort_equip(NetContext::SERVER_PROXY, 0.1, &mut outbox));
        assert!(weapon.is_inactive());
        // Машина прошла все рёбра, а не перескочила в Inactive напрямую
        for ev in [
            CombatEvent::WeaponEquipComplete { weapon: WeaponId(9) },
            CombatEvent::WeaponPutDownStart { weapon: WeaponId(9) },
            CombatEvent::WeaponPutDownComplete { weapon: WeaponId(9) },
        ] {
            assert!(outbox.events.contains(&ev));
        }
    }

    #[test]
    fn test_simulated_proxy_state_only_via_rep() {
        let mut weapon = Weapon::new(WeaponId(2), &WeaponSpec::rifle());
        weapon.begin_play(NetContext::SIMULATED, 0.0);
        let mut outbox = Outbox::new();

        // Прямой equip на проксе ничего не двигает
        weapon.equip(NetContext::SIMULATED, 0.0, &mut outbox);
        run_ticks(&mut weapon, &mut outbox, NetContext::SIMULATED, 60);
        assert!(weapon.is_inactive());

        weapon.apply_replicated_state(WeaponState::Equipping, NetContext::SIMULATED, 1.0, &mut outbox);
        assert!(weapon.is_equipping());
        assert!(outbox
            .events
            .contains(&CombatEvent::WeaponEquipStart { weapon: WeaponId(2) }));

        // Повтор того же значения — без новых событий (edge-triggered)
        let count = outbox.events.len();
        weapon.apply_replicated_state(WeaponState::Equipping, NetContext::SIMULATED, 1.1, &mut outbox);
        assert_eq!(outbox.events.len(), count);

        weapon.apply_replicated_state(WeaponState::Active, NetContext::SIMULATED, 1.7, &mut outbox);
        assert!(weapon.is_active());
    }

    #[test]
    fn test_fire_mode_gating_by_role() {
        // Нож: non-replicated слот не строится на сервере чужого pawn'а
        let mut server_copy = Weapon::new(WeaponId(3), &WeaponSpec::combat_knife());
        server_copy.begin_play(NetContext::SERVER_PROXY, 0.0);
        assert!(server_copy.fire_mode(FireSlot::Primary).is_none());

        // Винтовка: replicated слот на клиенте ждёт FireModeList
        let mut proxy = Weapon::new(WeaponId(4), &WeaponSpec::rifle());
        proxy.begin_play(NetContext::SIMULATED, 0.0);
        assert!(proxy.fire_mode(FireSlot::Primary).is_none());
        proxy.apply_rep_fire_mode_list(&[FireSlot::Primary], NetContext::SIMULATED, 0.0);
        assert!(proxy.fire_mode(FireSlot::Primary).is_some());

        // У владельца нож есть сразу
        let mut owner = Weapon::new(WeaponId(5), &WeaponSpec::combat_knife());
        owner.begin_play(NetContext::AUTHORITY, 0.0);
        assert!(owner.fire_mode(FireSlot::Primary).is_some());
    }

    #[test]
    fn test_force_put_down_ends_fire_and_snaps_inactive() {
        let mut weapon = Weapon::new(WeaponId(6), &WeaponSpec::rifle());
        weapon.begin_play(NetContext::SERVER_PROXY, 0.0);
        let mut outbox = Outbox::new();
        weapon.equip(NetContext::SERVER_PROXY, 0.0, &mut outbox);
        run_ticks(&mut weapon, &mut outbox, NetContext::SERVER_PROXY, 44);
        weapon.handle_client_fire(FireSlot::Primary, 0.7, NetContext::SERVER_PROXY, 0.73, &mut outbox);
        assert!(weapon.is_firing());

        weapon.force_put_down(NetContext::SERVER_PROXY, 0.8, &mut outbox);
        assert!(weapon.is_inactive());
        assert!(!weapon.is_firing());
    }

    #[test]
    fn test_client_fire_during_equip_forces_active() {
        let mut weapon = Weapon::new(WeaponId(7), &WeaponSpec::rifle());
        weapon.begin_play(NetContext::SERVER_PROXY, 0.0);
        let mut outbox = Outbox::new();
        weapon.equip(NetContext::SERVER_PROXY, 0.0, &mut outbox);
        assert!(weapon.is_equipping());

        // Клиент уже в Active и стреляет — сервер верит и догоняет
        weapon.handle_client_fire(FireSlot::Primary, 0.1, NetContext::SERVER_PROXY, 0.15, &mut outbox);
        assert!(weapon.is_active());
        assert!(weapon.is_firing());
    }

    #[test]
    fn test_catalog_lookup() {
        let catalog = WeaponCatalog::with_defaults();
        assert!(catalog.get("pistol").is_some());
        assert!(catalog.get("rifle").is_some());
        assert!(catalog.get("bfg9000").is_none());
    }
}
