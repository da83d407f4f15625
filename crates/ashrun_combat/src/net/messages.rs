//! Форматы сообщений client ↔ server и property-replication.
//!
//! Всё serde-сериализуемо: транспорт (и условная доставка по visibility)
//! — ответственность host'а. Доставка считается reliable + ordered.

use serde::{Deserialize, Serialize};

use crate::weapons::{FireSlot, WeaponId, WeaponState};

/// Reliable RPC от владеющего клиента на сервер.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClientMsg {
    /// Запрос смены активного оружия.
    SelectWeapon { weapon: WeaponId },
    /// Локальный swap завершён — серверу нужно свериться.
    WeaponEquipped { weapon: WeaponId },
    /// Клиент начал выстрел; server_time — его оценка серверного времени
    /// на момент нажатия (для компенсации RTT).
    Fire { slot: FireSlot, server_time: f32 },
    /// Клиент отпустил триггер (server_time — штамп момента отпускания).
    StopFire { slot: FireSlot, server_time: f32 },
}

/// Reliable RPC от сервера владеющему клиенту. Оба сообщения адресуются
/// по id оружия: reliable-доставка может обогнать swap, и к моменту
/// прихода current уже другой.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ServerMsg {
    /// Серверная проверка выстрела не прошла — клиент откатывает prediction.
    FailedFire { weapon: WeaponId, slot: FireSlot },
    /// Авторитетное значение патронов (после рассинхрона).
    AmmoCorrection {
        weapon: WeaponId,
        slot: FireSlot,
        amount: f32,
    },
}

/// Кому сервер рассылает данный RepUpdate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepVisibility {
    /// Всем клиентам.
    All,
    /// Всем кроме владеющего клиента (он предсказывает сам).
    SkipOwner,
    /// Только владеющему клиенту.
    OwnerOnly,
}

/// Снимок предмета инвентаря для replication списка.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ItemSnapshot {
    Weapon { id: WeaponId, class: String },
    Gear { class: String },
}

/// Реплицируемое свойство (last-write-wins, сервер → клиенты).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RepUpdate {
    /// Полный список инвентаря.
    InventoryList { items: Vec<ItemSnapshot> },
    /// Набор fire-mode слотов оружия (только replicated-слоты).
    FireModeList {
        weapon: WeaponId,
        slots: Vec<FireSlot>,
    },
    WeaponState {
        weapon: WeaponId,
        state: WeaponState,
    },
    FireCounter {
        weapon: WeaponId,
        slot: FireSlot,
        value: i32,
    },
    AmmoAmount {
        weapon: WeaponId,
        slot: FireSlot,
        amount: f32,
    },
    AmmoInitial {
        weapon: WeaponId,
        slot: FireSlot,
        initial: f32,
    },
}

/// RepUpdate вместе с правилом видимости — host фильтрует по роли получателя.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepEnvelope {
    pub visibility: RepVisibility,
    pub update: RepUpdate,
}

impl RepEnvelope {
    pub fn new(visibility: RepVisibility, update: RepUpdate) -> Self {
        Self { visibility, update }
    }

    /// Должна ли реплика с данной ролью принять этот update.
    pub fn applies_to(&self, locally_owned: bool) -> bool {
        match self.visibility {
            RepVisibility::All => true,
            RepVisibility::SkipOwner => !locally_owned,
            RepVisibility::OwnerOnly => locally_owned,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visibility_filtering() {
        let skip_owner = RepEnvelope::new(
            RepVisibility::SkipOwner,
            RepUpdate::FireCounter {
                weapon: WeaponId(1),
                slot: FireSlot::Primary,
                value: 3,
            },
        );
        assert!(!skip_owner.applies_to(true));
        assert!(skip_owner.applies_to(false));

        let owner_only = RepEnvelope::new(
            RepVisibility::OwnerOnly,
            RepUpdate::AmmoInitial {
                weapon: WeaponId(1),
                slot: FireSlot::Primary,
                initial: 50.0,
            },
        );
        assert!(owner_only.applies_to(true));
        assert!(!owner_only.applies_to(false));
    }

    #[test]
    fn test_client_msg_equality() {
        let msg = ClientMsg::Fire {
            slot: FireSlot::Secondary,
            server_time: 12.5,
        };
        assert_eq!(msg.clone(), msg);
        assert_ne!(
            msg,
            ClientMsg::StopFire {
                slot: FireSlot::Secondary,
                server_time: 12.5,
            }
        );
    }
}
