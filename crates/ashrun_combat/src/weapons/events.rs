//! Gameplay-события боевой подсистемы.
//!
//! Plain enum, не bevy Event: события ходят через Outbox и только
//! на границе ECS заворачиваются в wrapper-event (см. loadout::systems).

use crate::weapons::{FireSlot, WeaponGroup, WeaponId, WeaponState};

#[derive(Debug, Clone, PartialEq)]
pub enum CombatEvent {
    /// Оружие сменило состояние (старое → новое).
    WeaponStateChanged {
        weapon: WeaponId,
        state: WeaponState,
        previous: WeaponState,
    },
    WeaponEquipStart { weapon: WeaponId },
    WeaponEquipComplete { weapon: WeaponId },
    WeaponPutDownStart { weapon: WeaponId },
    WeaponPutDownComplete { weapon: WeaponId },
    /// Выстрел начался (анимация/звук/хитскан — на стороне host'а).
    FireStart { weapon: WeaponId, slot: FireSlot },
    FireComplete { weapon: WeaponId, slot: FireSlot },
    AmmoChanged {
        weapon: WeaponId,
        slot: FireSlot,
        amount: f32,
    },
    /// Активное оружие loadout'а сменилось.
    CurrentWeaponChanged { weapon: WeaponId },
    /// Ожидаемое (pending) оружие сменилось; None — swap отменён/завершён.
    PendingWeaponChanged { weapon: Option<WeaponId> },
    ItemAdded { class: String },
    ItemRemoved { class: String },
    /// Список инвентаря изменился (после diff'а добавлений/удалений).
    InventoryUpdated,
    /// Состав группы быстрого выбора изменился (для HUD).
    WeaponGroupChanged { group: WeaponGroup },
}
