//! Outbox — накопитель исходящих событий и сообщений за тик.
//!
//! Вместо multicast-delegate'ов: операции пишут события сюда, а хуки
//! (weapon-swap pump, ECS-система, тесты) читают по cursor'у. Так нет
//! re-entrancy: обработчик события сам может породить новые события,
//! они просто лягут дальше в вектор.

use crate::net::messages::{ClientMsg, ServerMsg};
use crate::weapons::events::CombatEvent;

#[derive(Debug, Default)]
pub struct Outbox {
    /// Локальные gameplay-события этого тика (порядок = порядок возникновения).
    pub events: Vec<CombatEvent>,
    /// RPC на сервер (имеет смысл только при is_locally_owned_remote).
    pub client_msgs: Vec<ClientMsg>,
    /// RPC владеющему клиенту (имеет смысл только на authority).
    pub server_msgs: Vec<ServerMsg>,
    /// Cursor внутреннего pump'а (сколько событий уже обработано хуками).
    pub hook_cursor: usize,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: CombatEvent) {
        self.events.push(event);
    }

    pub fn send_client(&mut self, msg: ClientMsg) {
        self.client_msgs.push(msg);
    }

    pub fn send_server(&mut self, msg: ServerMsg) {
        self.server_msgs.push(msg);
    }

    /// Сброс между тиками. Host обязан забрать события ДО вызова.
    pub fn clear(&mut self) {
        self.events.clear();
        self.client_msgs.clear();
        self.server_msgs.clear();
        self.hook_cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weapons::WeaponId;

    #[test]
    fn test_outbox_accumulates_and_clears() {
        let mut outbox = Outbox::new();
        outbox.push(CombatEvent::CurrentWeaponChanged {
            weapon: WeaponId(1),
        });
        outbox.send_client(ClientMsg::WeaponEquipped { weapon: WeaponId(1) });
        assert_eq!(outbox.events.len(), 1);
        assert_eq!(outbox.client_msgs.len(), 1);

        outbox.clear();
        assert!(outbox.events.is_empty());
        assert!(outbox.client_msgs.is_empty());
        assert_eq!(outbox.hook_cursor, 0);
    }
}
