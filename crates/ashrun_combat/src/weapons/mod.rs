//! Оружейная подсистема: state machine оружия, fire modes, патроны.

pub mod ammo;
pub mod events;
pub mod fire_mode;
pub mod weapon;

pub use ammo::{Ammo, AmmoSpec};
pub use events::CombatEvent;
pub use fire_mode::{FireMode, FireModeSpec};
pub use weapon::{Weapon, WeaponCatalog, WeaponCtx, WeaponSpec};

use serde::{Deserialize, Serialize};

/// Максимум fire-mode слотов на оружии.
pub const MAX_FIRE_SLOTS: usize = 5;

/// Количество групп оружия (для quick-select).
pub const WEAPON_GROUP_COUNT: usize = 6;

/// Уникальный id экземпляра оружия внутри одного Loadout'а.
/// Генерируется на authority и реплицируется со списком инвентаря.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WeaponId(pub u16);

/// Слот fire-mode (primary = ЛКМ, secondary = ПКМ, и т.д.).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FireSlot {
    Primary,
    Secondary,
    Tertiary,
    Quaternary,
    Quinary,
}

impl FireSlot {
    pub const ALL: [FireSlot; MAX_FIRE_SLOTS] = [
        FireSlot::Primary,
        FireSlot::Secondary,
        FireSlot::Tertiary,
        FireSlot::Quaternary,
        FireSlot::Quinary,
    ];

    pub fn index(self) -> usize {
        match self {
            FireSlot::Primary => 0,
            FireSlot::Secondary => 1,
            FireSlot::Tertiary => 2,
            FireSlot::Quaternary => 3,
            FireSlot::Quinary => 4,
        }
    }

    pub fn from_index(index: usize) -> Option<FireSlot> {
        FireSlot::ALL.get(index).copied()
    }
}

/// Полуавтомат (один выстрел на нажатие) или автомат (refire пока держат).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FireType {
    SemiAuto,
    Automatic,
}

/// Состояние state machine оружия.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeaponState {
    /// В руках, готово стрелять.
    Active,
    /// Убрано (в инвентаре, не в руках).
    Inactive,
    /// Достаётся (таймер equip_time).
    Equipping,
    /// Убирается (таймер put_down_time).
    PuttingDown,
    /// Нестандартное состояние (перезарядка, осечка) — двигает само оружие.
    Custom,
}

/// Группа для быстрого выбора (клавиши 1-6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeaponGroup {
    Melee,
    Pistol,
    Smg,
    Rifle,
    Special,
    Utility,
}

impl WeaponGroup {
    pub const ALL: [WeaponGroup; WEAPON_GROUP_COUNT] = [
        WeaponGroup::Melee,
        WeaponGroup::Pistol,
        WeaponGroup::Smg,
        WeaponGroup::Rifle,
        WeaponGroup::Special,
        WeaponGroup::Utility,
    ];

    pub fn index(self) -> usize {
        match self {
            WeaponGroup::Melee => 0,
            WeaponGroup::Pistol => 1,
            WeaponGroup::Smg => 2,
            WeaponGroup::Rifle => 3,
            WeaponGroup::Special => 4,
            WeaponGroup::Utility => 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fire_slot_index_roundtrip() {
        for slot in FireSlot::ALL {
            assert_eq!(FireSlot::from_index(slot.index()), Some(slot));
        }
        assert_eq!(FireSlot::from_index(5), None);
    }

    #[test]
    fn test_weapon_group_indices_unique() {
        let mut seen = [false; WEAPON_GROUP_COUNT];
        for group in WeaponGroup::ALL {
            assert!(!seen[group.index()]);
            seen[group.index()] = true;
        }
    }
}
