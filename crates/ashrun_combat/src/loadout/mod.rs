//! Loadout — инвентарь pawn'а и арбитраж смены оружия.
//!
//! Владелец меняет оружие предиктивно (put down → equip), сервер
//! догоняет через ClientMsg::WeaponEquipped и при рассинхроне
//! форсирует свою копию к клиентской.

pub mod input;
pub mod systems;

use std::collections::HashMap;

use bevy::prelude::*;

use crate::logger::{log, log_error, log_warning};
use crate::net::{
    ClientMsg, ItemSnapshot, NetContext, Outbox, RepEnvelope, RepUpdate, RepVisibility, ServerMsg,
};
use crate::weapons::events::CombatEvent;
use crate::weapons::{
    FireSlot, Weapon, WeaponCatalog, WeaponGroup, WeaponId, WeaponState, WEAPON_GROUP_COUNT,
};

/// Сколько раз отложенная задача может уйти на следующий тик,
/// прежде чем мы признаем её зависшей и выбросим.
const MAX_DEFERRED_RETRIES: u32 = 8;

/// Не-оружейный предмет инвентаря (аптечка, граната...).
#[derive(Debug, Clone, PartialEq)]
pub struct GearItem {
    pub class: String,
}

/// Предмет инвентаря. Tagged enum вместо даункастов:
/// кто оружие, а кто нет — видно по типу.
#[derive(Debug, Clone)]
pub enum InventoryItem {
    Weapon(Weapon),
    Gear(GearItem),
}

impl InventoryItem {
    pub fn class(&self) -> &str {
        match self {
            InventoryItem::Weapon(w) => w.class(),
            InventoryItem::Gear(g) => &g.class,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum DeferredKind {
    ChangedWeapon,
    EquipInitialWeapon,
}

#[derive(Debug, Clone, Copy)]
struct DeferredTask {
    kind: DeferredKind,
    retries: u32,
}

/// Кэш последних отправленных реплик — шлём только изменившееся.
#[derive(Debug, Clone, Default)]
struct RepCache {
    inventory: Option<Vec<ItemSnapshot>>,
    fire_mode_lists: HashMap<WeaponId, Vec<FireSlot>>,
    weapon_states: HashMap<WeaponId, WeaponState>,
    fire_counters: HashMap<(WeaponId, FireSlot), i32>,
    ammo_amounts: HashMap<(WeaponId, FireSlot), f32>,
    ammo_initials: HashMap<(WeaponId, FireSlot), f32>,
}

/// Инвентарь и weapon-swap state machine одного pawn'а.
#[derive(Component, Debug, Clone)]
pub struct Loadout {
    items: Vec<InventoryItem>,
    current: Option<WeaponId>,
    /// Оружие, к которому идёт swap (None — swap не идёт).
    pending: Option<WeaponId>,
    /// Группы быстрого выбора, в порядке добавления.
    groups: [Vec<WeaponId>; WEAPON_GROUP_COUNT],
    deferred: Vec<DeferredTask>,
    next_weapon_id: u16,
    rep_cache: RepCache,
    catalog: WeaponCatalog,
}

impl Loadout {
    pub fn new(catalog: WeaponCatalog) -> Self {
        Self {
            items: Vec::new(),
            current: None,
            pending: None,
            groups: std::array::from_fn(|_| Vec::new()),
            deferred: Vec::new(),
            next_weapon_id: 0,
            rep_cache: RepCache::default(),
            catalog,
        }
    }

    pub fn items(&self) -> &[InventoryItem] {
        &self.items
    }

    pub fn current(&self) -> Option<WeaponId> {
        self.current
    }

    pub fn pending(&self) -> Option<WeaponId> {
        self.pending
    }

    pub fn group_weapons(&self, group: WeaponGroup) -> &[WeaponId] {
        &self.groups[group.index()]
    }

    fn weapon_index(&self, id: WeaponId) -> Option<usize> {
        self.items.iter().position(|item| {
            matches!(item, InventoryItem::Weapon(w) if w.id() == id)
        })
    }

    pub fn weapon(&self, id: WeaponId) -> Option<&Weapon> {
        self.items.iter().find_map(|item| match item {
            InventoryItem::Weapon(w) if w.id() == id => Some(w),
            _ => None,
        })
    }

    pub fn weapon_mut(&mut self, id: WeaponId) -> Option<&mut Weapon> {
        self.items.iter_mut().find_map(|item| match item {
            InventoryItem::Weapon(w) if w.id() == id => Some(w),
            _ => None,
        })
    }

    pub fn current_weapon(&self) -> Option<&Weapon> {
        self.current.and_then(|id| self.weapon(id))
    }

    pub fn weapons(&self) -> impl Iterator<Item = &Weapon> {
        self.items.iter().filter_map(|item| match item {
            InventoryItem::Weapon(w) => Some(w),
            _ => None,
        })
    }

    fn alloc_weapon_id(&mut self) -> WeaponId {
        self.next_weapon_id += 1;
        WeaponId(self.next_weapon_id)
    }

    fn set_pending(&mut self, value: Option<WeaponId>, outbox: &mut Outbox) {
        if self.pending == value {
            return;
        }
        self.pending = value;
        outbox.push(CombatEvent::PendingWeaponChanged { weapon: value });
    }

    // ========================================================================
    // Inventory mutation (authority)
    // ========================================================================

    /// Выдаёт оружие по классу из каталога. Только authority:
    /// клиенты получают инвентарь репликой списка.
    pub fn add_weapon(
        &mut self,
        class: &str,
        net: NetContext,
        now: f32,
        outbox: &mut Outbox,
    ) -> Option<WeaponId> {
        if !net.is_authority() {
            log_warning(&format!("⚠️ add_weapon('{}') on non-authority ignored", class));
            return None;
        }
        if self.items.iter().any(|item| item.class() == class) {
            log(&format!("Duplicate item '{}' not added", class));
            return None;
        }
        let Some(spec) = self.catalog.get(class).cloned() else {
            log_error(&format!("Unknown weapon class '{}'", class));
            return None;
        };
        let id = self.alloc_weapon_id();
        self.items.push(InventoryItem::Weapon(Weapon::new(id, &spec)));
        outbox.push(CombatEvent::ItemAdded {
            class: class.to_string(),
        });
        self.update_weapon_group_map(outbox);
        outbox.push(CombatEvent::InventoryUpdated);
        self.equip_initial_weapon(net, now, outbox);
        Some(id)
    }

    pub fn add_gear(&mut self, class: &str, net: NetContext, outbox: &mut Outbox) -> bool {
        if !net.is_authority() {
            return false;
        }
        if self.items.iter().any(|item| item.class() == class) {
            return false;
        }
        self.items.push(InventoryItem::Gear(GearItem {
            class: class.to_string(),
        }));
        outbox.push(CombatEvent::ItemAdded {
            class: class.to_string(),
        });
        outbox.push(CombatEvent::InventoryUpdated);
        true
    }

    /// Убирает предмет. Если ушло активное оружие — выбираем замену.
    pub fn remove_item(
        &mut self,
        class: &str,
        net: NetContext,
        now: f32,
        outbox: &mut Outbox,
    ) -> bool {
        if !net.is_authority() {
            return false;
        }
        let Some(index) = self.items.iter().position(|item| item.class() == class) else {
            return false;
        };
        let removed = self.items.remove(index);
        if let InventoryItem::Weapon(w) = &removed {
            let id = w.id();
            if self.pending == Some(id) {
                self.set_pending(None, outbox);
            }
            if self.current == Some(id) {
                self.current = None;
                if net.is_locally_owned() {
                    if let Some(next) = self.pending.or_else(|| self.next_best_weapon(net)) {
                        self.set_current_weapon(next, net, now, outbox);
                    }
                }
            }
        }
        outbox.push(CombatEvent::ItemRemoved {
            class: class.to_string(),
        });
        self.update_weapon_group_map(outbox);
        outbox.push(CombatEvent::InventoryUpdated);
        true
    }

    fn update_weapon_group_map(&mut self, outbox: &mut Outbox) {
        let mut new_groups: [Vec<WeaponId>; WEAPON_GROUP_COUNT] =
            std::array::from_fn(|_| Vec::new());
        for item in &self.items {
            if let InventoryItem::Weapon(w) = item {
                new_groups[w.group().index()].push(w.id());
            }
        }
        for (i, group) in WeaponGroup::ALL.iter().enumerate() {
            if new_groups[i] != self.groups[i] {
                outbox.push(CombatEvent::WeaponGroupChanged { group: *group });
            }
        }
        self.groups = new_groups;
    }

    // ========================================================================
    // Weapon selection
    // ========================================================================

    /// Запрос выбора оружия (ввод игрока, AI, сервер по RPC).
    pub fn set_current_weapon(
        &mut self,
        weapon: WeaponId,
        net: NetContext,
        now: f32,
        outbox: &mut Outbox,
    ) {
        if self.weapon_index(weapon).is_none() {
            log_warning(&format!("⚠️ Select of unknown weapon {:?}", weapon));
            return;
        }

        let can_equip = self
            .weapon(weapon)
            .map(|w| w.can_equip(net))
            .unwrap_or(false);
        if !can_equip {
            // Не можем, потому что уже достаём его же — это отмена swap'а
            if self.current == Some(weapon) {
                self.set_pending(None, outbox);
                if let Some(w) = self.weapon_mut(weapon) {
                    w.clear_pending_put_down();
                }
            }
            return;
        }

        // Повторный выбор текущего (не в уборке): сбрасываем swap-интенты
        let current_putting_down = self
            .current_weapon()
            .map(|w| w.is_putting_down())
            .unwrap_or(false);
        if self.current == Some(weapon) && !current_putting_down {
            self.set_pending(None, outbox);
            if let Some(w) = self.weapon_mut(weapon) {
                w.clear_pending_put_down();
            }
            return;
        }

        self.set_pending(Some(weapon), outbox);

        // Текущее == желаемое, но уже убирается: ждём put down complete,
        // pump достанет его обратно по pending
        if self.current == Some(weapon) {
            return;
        }

        let Some(cur) = self.current else {
            // Руки пустые — swap без put down
            if net.is_locally_owned_remote() {
                outbox.send_client(ClientMsg::SelectWeapon { weapon });
            }
            self.changed_weapon(net, now, outbox);
            return;
        };

        match self.weapon(cur).map(|w| w.state()) {
            Some(WeaponState::Inactive) | None => {
                if net.is_locally_owned_remote() {
                    outbox.send_client(ClientMsg::SelectWeapon { weapon });
                }
                self.changed_weapon(net, now, outbox);
            }
            // Уже убирается (переигрываем pending на лету) — ждём complete
            Some(WeaponState::PuttingDown) => {}
            _ => {
                // Блокированный put down оставит intent в оружии,
                // pump доберёт его на fire complete. RPC — только когда
                // уборка реально началась.
                let started = self
                    .weapon_mut(cur)
                    .map(|w| w.put_down(net, now, outbox))
                    .unwrap_or(false);
                if started && net.is_locally_owned_remote() {
                    outbox.send_client(ClientMsg::SelectWeapon { weapon });
                }
            }
        }
    }

    fn changed_weapon(&mut self, net: NetContext, now: f32, outbox: &mut Outbox) {
        self.changed_weapon_inner(net, now, outbox, 0);
    }

    /// Завершение swap'а: текущее оружие полностью убрано, достаём новое.
    fn changed_weapon_inner(
        &mut self,
        net: NetContext,
        now: f32,
        outbox: &mut Outbox,
        retries: u32,
    ) {
        if let Some(cur) = self.current {
            let inactive = self.weapon(cur).map(|w| w.is_inactive()).unwrap_or(true);
            if !inactive {
                if net.is_non_owning_authority() {
                    if let Some(w) = self.weapon_mut(cur) {
                        w.force_put_down(net, now, outbox);
                    }
                }
                let still_up = self.weapon(cur).map(|w| !w.is_inactive()).unwrap_or(false);
                if still_up {
                    if retries >= MAX_DEFERRED_RETRIES {
                        log_error(&format!(
                            "Weapon {:?} refuses to go down, dropping swap",
                            cur
                        ));
                        self.set_pending(None, outbox);
                        return;
                    }
                    self.deferred.push(DeferredTask {
                        kind: DeferredKind::ChangedWeapon,
                        retries: retries + 1,
                    });
                    return;
                }
            }
        }

        let target = self.pending.or_else(|| {
            // Pending потерян (оружие изъяли в полёте) — возвращаем текущее
            // или берём лучшее из оставшихся
            match self.current {
                Some(cur) if self.weapon_index(cur).is_some() => Some(cur),
                _ => self.next_best_weapon(net),
            }
        });

        let Some(target) = target else {
            log_error("Swap finished with nothing to equip");
            self.current = None;
            return;
        };

        self.current = Some(target);
        self.set_pending(None, outbox);
        if let Some(w) = self.weapon_mut(target) {
            w.equip(net, now, outbox);
        }
        outbox.push(CombatEvent::CurrentWeaponChanged { weapon: target });
        if net.is_locally_owned_remote() {
            outbox.send_client(ClientMsg::WeaponEquipped { weapon: target });
        }
    }

    /// Лучшее оружие кроме текущего (по rating).
    pub fn next_best_weapon(&self, net: NetContext) -> Option<WeaponId> {
        self.weapons()
            .filter(|w| Some(w.id()) != self.current && w.can_equip(net))
            .max_by(|a, b| a.rating().total_cmp(&b.rating()))
            .map(|w| w.id())
    }

    /// Циклический выбор в группе (клавиши 1-6). Сравниваем с pending,
    /// чтобы быстрый даблтап листал дальше, а не дёргал тот же ствол.
    pub fn equip_next_weapon(
        &mut self,
        group: WeaponGroup,
        net: NetContext,
        now: f32,
        outbox: &mut Outbox,
    ) {
        let list = &self.groups[group.index()];
        if list.is_empty() {
            return;
        }
        let compared = self.pending.or(self.current);
        let target = match compared.and_then(|c| list.iter().position(|id| *id == c)) {
            Some(pos) => list[(pos + 1) % list.len()],
            None => list[0],
        };
        self.set_current_weapon(target, net, now, outbox);
    }

    pub fn equip_initial_weapon(&mut self, net: NetContext, now: f32, outbox: &mut Outbox) {
        self.equip_initial_inner(net, now, outbox, 0);
    }

    fn equip_initial_inner(
        &mut self,
        net: NetContext,
        now: f32,
        outbox: &mut Outbox,
        retries: u32,
    ) {
        if !net.is_locally_owned() || self.current.is_some() || self.pending.is_some() {
            return;
        }
        let (id, begun_play) = match self.weapons().find(|w| w.can_equip(net)) {
            Some(w) => (w.id(), w.has_begun_play()),
            None => return,
        };
        if !begun_play {
            // Оружие ещё не ожило (добавлено до первого тика) — отложим
            if retries >= MAX_DEFERRED_RETRIES {
                log_error(&format!("Initial weapon {:?} never began play", id));
                return;
            }
            self.deferred.push(DeferredTask {
                kind: DeferredKind::EquipInitialWeapon,
                retries: retries + 1,
            });
            return;
        }
        self.set_current_weapon(id, net, now, outbox);
    }

    // ========================================================================
    // Fire input
    // ========================================================================

    pub fn start_fire(&mut self, slot: FireSlot, net: NetContext, now: f32, outbox: &mut Outbox) {
        if let Some(cur) = self.current {
            if let Some(w) = self.weapon_mut(cur) {
                w.start_fire(slot, net, now, outbox);
            }
        }
    }

    pub fn stop_fire(&mut self, slot: FireSlot, net: NetContext, now: f32, outbox: &mut Outbox) {
        if let Some(cur) = self.current {
            if let Some(w) = self.weapon_mut(cur) {
                w.stop_fire(slot, net, now, outbox);
            }
        }
    }

    // ========================================================================
    // Server-side reconciliation
    // ========================================================================

    /// ClientMsg::WeaponEquipped: клиент доложил, что локально достал weapon.
    /// Серверная копия сверяется и при рассинхроне догоняет форсом.
    fn server_weapon_equipped(
        &mut self,
        weapon: WeaponId,
        net: NetContext,
        now: f32,
        outbox: &mut Outbox,
    ) {
        if self.weapon_index(weapon).is_none() {
            log_error(&format!("Client equipped unknown weapon {:?}", weapon));
            return;
        }
        match self.current {
            None => self.set_current_weapon(weapon, net, now, outbox),
            // Совпадает: если наша копия успела начать уборку — доигрываем
            // её форсом, pump тут же достанет оружие обратно по pending
            Some(cur) if cur == weapon => {
                let putting_down = self
                    .weapon(cur)
                    .map(|w| w.is_putting_down())
                    .unwrap_or(false);
                if putting_down {
                    self.set_pending(Some(weapon), outbox);
                    if let Some(w) = self.weapon_mut(weapon) {
                        w.abort_put_down(net, now, outbox);
                    }
                }
            }
            Some(cur) => {
                self.set_current_weapon(weapon, net, now, outbox);
                if self.current != Some(weapon) {
                    // Обычный swap не сошёлся (наша копия чем-то занята) —
                    // клиент уже там, снимаем текущее форсом
                    if let Some(w) = self.weapon_mut(cur) {
                        w.force_put_down(net, now, outbox);
                    }
                }
            }
        }
    }

    pub fn handle_client_msg(
        &mut self,
        msg: ClientMsg,
        net: NetContext,
        now: f32,
        outbox: &mut Outbox,
    ) {
        if !net.is_authority() {
            log_warning("⚠️ ClientMsg on non-authority replica dropped");
            return;
        }
        match msg {
            ClientMsg::SelectWeapon { weapon } => {
                self.set_current_weapon(weapon, net, now, outbox);
            }
            ClientMsg::WeaponEquipped { weapon } => {
                self.server_weapon_equipped(weapon, net, now, outbox);
            }
            ClientMsg::Fire { slot, server_time } => {
                if let Some(cur) = self.current {
                    if let Some(w) = self.weapon_mut(cur) {
                        w.handle_client_fire(slot, server_time, net, now, outbox);
                    }
                }
            }
            ClientMsg::StopFire { slot, .. } => {
                self.stop_fire(slot, net, now, outbox);
            }
        }
        // Форсированные переходы могли родить put-down события
        self.pump(net, now, outbox);
    }

    pub fn handle_server_msg(
        &mut self,
        msg: ServerMsg,
        net: NetContext,
        now: f32,
        outbox: &mut Outbox,
    ) {
        if !net.is_locally_owned_remote() {
            return;
        }
        match msg {
            ServerMsg::FailedFire { weapon, slot } => {
                log_warning(&format!(
                    "⚠️ Server rejected fire on {:?} of weapon {:?}",
                    slot, weapon
                ));
            }
            ServerMsg::AmmoCorrection {
                weapon,
                slot,
                amount,
            } => {
                // Адресуемся по id: reliable RPC мог приехать уже после
                // swap'а, current здесь — не обязательно то оружие
                if let Some(ammo) = self
                    .weapon_mut(weapon)
                    .and_then(|w| w.fire_mode_mut(slot))
                    .and_then(|m| m.ammo_mut())
                {
                    ammo.apply_correction(amount, now);
                }
            }
        }
    }

    // ========================================================================
    // Event pump
    // ========================================================================

    /// Обрабатывает события этого тика, ещё не виденные хуками.
    /// Cursor общий на Outbox: обработчик может родить новые события,
    /// они просто встанут в хвост и будут обработаны этим же циклом.
    fn pump(&mut self, net: NetContext, now: f32, outbox: &mut Outbox) {
        while outbox.hook_cursor < outbox.events.len() {
            let event = outbox.events[outbox.hook_cursor].clone();
            outbox.hook_cursor += 1;
            match event {
                CombatEvent::WeaponPutDownComplete { weapon }
                    if self.current == Some(weapon) && self.pending.is_some() =>
                {
                    self.changed_weapon(net, now, outbox);
                }
                // Отложенный swap: уборка ждала конца выстрела. Только при
                // живом pending — отменённый swap выстрел не подхватывает.
                CombatEvent::FireComplete { weapon, .. }
                    if self.current == Some(weapon)
                        && net.is_locally_owned()
                        && self.pending.is_some() =>
                {
                    let ready = self
                        .weapon(weapon)
                        .map(|w| w.has_pending_put_down() && w.can_put_down(net))
                        .unwrap_or(false);
                    if ready {
                        if let Some(target) = self.pending {
                            self.set_current_weapon(target, net, now, outbox);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    // ========================================================================
    // Tick
    // ========================================================================

    pub fn tick(&mut self, dt: f32, net: NetContext, now: f32, outbox: &mut Outbox) {
        for item in &mut self.items {
            if let InventoryItem::Weapon(w) = item {
                w.tick(dt, net, now, outbox);
            }
        }

        let tasks = std::mem::take(&mut self.deferred);
        for task in tasks {
            match task.kind {
                DeferredKind::ChangedWeapon => {
                    self.changed_weapon_inner(net, now, outbox, task.retries);
                }
                DeferredKind::EquipInitialWeapon => {
                    self.equip_initial_inner(net, now, outbox, task.retries);
                }
            }
        }

        self.pump(net, now, outbox);
    }

    // ========================================================================
    // Replication
    // ========================================================================

    fn item_snapshots(&self) -> Vec<ItemSnapshot> {
        self.items
            .iter()
            .map(|item| match item {
                InventoryItem::Weapon(w) => ItemSnapshot::Weapon {
                    id: w.id(),
                    class: w.class().to_string(),
                },
                InventoryItem::Gear(g) => ItemSnapshot::Gear {
                    class: g.class.clone(),
                },
            })
            .collect()
    }

    /// Authority: diff состояния против последней рассылки.
    /// Host раскидывает конверты по клиентам согласно visibility.
    pub fn collect_rep_updates(&mut self, net: NetContext) -> Vec<RepEnvelope> {
        if !net.is_authority() {
            return Vec::new();
        }
        let mut out = Vec::new();

        let snapshot = self.item_snapshots();
        let cache = &mut self.rep_cache;
        if cache.inventory.as_ref() != Some(&snapshot) {
            out.push(RepEnvelope::new(
                RepVisibility::All,
                RepUpdate::InventoryList {
                    items: snapshot.clone(),
                },
            ));
            cache.inventory = Some(snapshot);
        }

        for item in &self.items {
            let InventoryItem::Weapon(w) = item else {
                continue;
            };
            let id = w.id();

            let slots = w.replicated_slots();
            if cache.fire_mode_lists.get(&id) != Some(&slots) {
                out.push(RepEnvelope::new(
                    RepVisibility::All,
                    RepUpdate::FireModeList {
                        weapon: id,
                        slots: slots.clone(),
                    },
                ));
                cache.fire_mode_lists.insert(id, slots);
            }

            if cache.weapon_states.get(&id) != Some(&w.state()) {
                out.push(RepEnvelope::new(
                    RepVisibility::SkipOwner,
                    RepUpdate::WeaponState {
                        weapon: id,
                        state: w.state(),
                    },
                ));
                cache.weapon_states.insert(id, w.state());
            }

            for mode in w.fire_modes() {
                if !mode.is_replicated() {
                    continue;
                }
                let key = (id, mode.slot());

                if cache.fire_counters.get(&key) != Some(&mode.fire_counter()) {
                    out.push(RepEnvelope::new(
                        RepVisibility::SkipOwner,
                        RepUpdate::FireCounter {
                            weapon: id,
                            slot: mode.slot(),
                            value: mode.fire_counter(),
                        },
                    ));
                    cache.fire_counters.insert(key, mode.fire_counter());
                }

                if let Some(ammo) = mode.ammo() {
                    if cache.ammo_amounts.get(&key) != Some(&ammo.amount()) {
                        out.push(RepEnvelope::new(
                            RepVisibility::SkipOwner,
                            RepUpdate::AmmoAmount {
                                weapon: id,
                                slot: mode.slot(),
                                amount: ammo.amount(),
                            },
                        ));
                        cache.ammo_amounts.insert(key, ammo.amount());
                    }
                    if ammo.is_initialized()
                        && cache.ammo_initials.get(&key) != Some(&ammo.initial())
                    {
                        out.push(RepEnvelope::new(
                            RepVisibility::OwnerOnly,
                            RepUpdate::AmmoInitial {
                                weapon: id,
                                slot: mode.slot(),
                                initial: ammo.initial(),
                            },
                        ));
                        cache.ammo_initials.insert(key, ammo.initial());
                    }
                }
            }
        }
        out
    }

    /// Применение реплики на клиенте. Host уже отфильтровал по visibility,
    /// но envelope проверяем ещё раз — лишняя реплика хуже потерянной.
    pub fn apply_rep(
        &mut self,
        envelope: RepEnvelope,
        net: NetContext,
        now: f32,
        outbox: &mut Outbox,
    ) {
        if net.is_authority() {
            return;
        }
        if !envelope.applies_to(net.is_locally_owned()) {
            return;
        }
        match envelope.update {
            RepUpdate::InventoryList { items } => {
                self.on_rep_inventory_list(items, net, now, outbox);
            }
            RepUpdate::FireModeList { weapon, slots } => {
                if let Some(w) = self.weapon_mut(weapon) {
                    w.apply_rep_fire_mode_list(&slots, net, now);
                }
            }
            RepUpdate::WeaponState { weapon, state } => {
                if let Some(w) = self.weapon_mut(weapon) {
                    w.apply_replicated_state(state, net, now, outbox);
                }
            }
            RepUpdate::FireCounter {
                weapon,
                slot,
                value,
            } => {
                if let Some(w) = self.weapon_mut(weapon) {
                    w.apply_rep_fire_counter(slot, value, net, now, outbox);
                }
            }
            RepUpdate::AmmoAmount {
                weapon,
                slot,
                amount,
            } => {
                if let Some(w) = self.weapon_mut(weapon) {
                    w.apply_rep_ammo_amount(slot, amount);
                }
            }
            RepUpdate::AmmoInitial {
                weapon,
                slot,
                initial,
            } => {
                if let Some(w) = self.weapon_mut(weapon) {
                    w.apply_rep_ammo_initial(slot, initial, net);
                }
            }
        }
    }

    /// Реплика полного списка инвентаря: переживших сохраняем,
    /// новых строим из каталога, пропавших выбрасываем.
    fn on_rep_inventory_list(
        &mut self,
        snapshot: Vec<ItemSnapshot>,
        net: NetContext,
        now: f32,
        outbox: &mut Outbox,
    ) {
        let old_items = std::mem::take(&mut self.items);
        let mut old_weapons: HashMap<WeaponId, Weapon> = HashMap::new();
        let mut old_gear: Vec<GearItem> = Vec::new();
        for item in old_items {
            match item {
                InventoryItem::Weapon(w) => {
                    old_weapons.insert(w.id(), w);
                }
                InventoryItem::Gear(g) => old_gear.push(g),
            }
        }

        let mut new_items = Vec::with_capacity(snapshot.len());
        for snap in snapshot {
            match snap {
                ItemSnapshot::Weapon { id, class } => {
                    if let Some(w) = old_weapons.remove(&id) {
                        new_items.push(InventoryItem::Weapon(w));
                    } else if let Some(spec) = self.catalog.get(&class) {
                        new_items.push(InventoryItem::Weapon(Weapon::new(id, spec)));
                        outbox.push(CombatEvent::ItemAdded { class });
                    } else {
                        log_error(&format!("Replicated unknown weapon class '{}'", class));
                    }
                }
                ItemSnapshot::Gear { class } => {
                    if let Some(pos) = old_gear.iter().position(|g| g.class == class) {
                        new_items.push(InventoryItem::Gear(old_gear.remove(pos)));
                    } else {
                        new_items.push(InventoryItem::Gear(GearItem {
                            class: class.clone(),
                        }));
                        outbox.push(CombatEvent::ItemAdded { class });
                    }
                }
            }
        }

        for (_, w) in old_weapons {
            outbox.push(CombatEvent::ItemRemoved {
                class: w.class().to_string(),
            });
        }
        for g in old_gear {
            outbox.push(CombatEvent::ItemRemoved { class: g.class });
        }

        self.items = new_items;

        if self
            .pending
            .map(|p| self.weapon_index(p).is_none())
            .unwrap_or(false)
        {
            self.set_pending(None, outbox);
        }
        if let Some(cur) = self.current {
            if self.weapon_index(cur).is_none() {
                // Активное оружие изъяли — руки пустые, ищем замену
                self.current = None;
                if net.is_locally_owned() {
                    if let Some(next) = self.pending.or_else(|| self.next_best_weapon(net)) {
                        self.set_current_weapon(next, net, now, outbox);
                    }
                }
            }
        }

        self.update_weapon_group_map(outbox);
        outbox.push(CombatEvent::InventoryUpdated);
        self.equip_initial_weapon(net, now, outbox);
    }
}
