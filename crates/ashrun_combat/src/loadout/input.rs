//! Привязка ввода к командам loadout'а.
//!
//! Таблица "имя действия → команда" вместо зашитого match'а по клавишам:
//! host маппит свои физические клавиши на имена, симуляция не знает
//! про клавиатуры.

use crate::weapons::{FireSlot, WeaponGroup, WeaponId};

/// Команда, которую понимает Loadout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoadoutCommand {
    SelectWeapon(WeaponId),
    NextWeapon(WeaponGroup),
    StartFire(FireSlot),
    StopFire(FireSlot),
}

/// Именованное действие ввода (без привязки к конкретной клавише).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputAction {
    NextWeapon(WeaponGroup),
    FirePressed(FireSlot),
    FireReleased(FireSlot),
}

impl InputAction {
    pub fn command(self) -> LoadoutCommand {
        match self {
            InputAction::NextWeapon(group) => LoadoutCommand::NextWeapon(group),
            InputAction::FirePressed(slot) => LoadoutCommand::StartFire(slot),
            InputAction::FireReleased(slot) => LoadoutCommand::StopFire(slot),
        }
    }
}

/// Таблица привязок. Дефолт повторяет классическую FPS-раскладку.
#[derive(Debug, Clone)]
pub struct InputBindings {
    bindings: Vec<(&'static str, InputAction)>,
}

impl Default for InputBindings {
    fn default() -> Self {
        Self {
            bindings: vec![
                ("weapon_group_1", InputAction::NextWeapon(WeaponGroup::Melee)),
                ("weapon_group_2", InputAction::NextWeapon(WeaponGroup::Pistol)),
                ("weapon_group_3", InputAction::NextWeapon(WeaponGroup::Smg)),
                ("weapon_group_4", InputAction::NextWeapon(WeaponGroup::Rifle)),
                ("weapon_group_5", InputAction::NextWeapon(WeaponGroup::Special)),
                ("weapon_group_6", InputAction::NextWeapon(WeaponGroup::Utility)),
                ("fire", InputAction::FirePressed(FireSlot::Primary)),
                ("fire_release", InputAction::FireReleased(FireSlot::Primary)),
                ("alt_fire", InputAction::FirePressed(FireSlot::Secondary)),
                ("alt_fire_release", InputAction::FireReleased(FireSlot::Secondary)),
            ],
        }
    }
}

impl InputBindings {
    pub fn resolve(&self, name: &str) -> Option<InputAction> {
        self.bindings
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, action)| *action)
    }
}
