//! Сетевой контекст и replication-примитивы.
//!
//! Симуляция не владеет транспортом: host подаёт сообщения и забирает
//! исходящие через Outbox. Здесь только роли и форматы.

pub mod messages;
pub mod outbox;

pub use messages::{ClientMsg, ItemSnapshot, RepEnvelope, RepUpdate, RepVisibility, ServerMsg};
pub use outbox::Outbox;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Сетевая роль реплики. Две оси: authority (серверная копия?)
/// и locally_owned (этой машиной управляет игрок/AI?).
///
/// Из двух bool'ов выводятся все четыре классические роли:
/// - authority + locally_owned     → listen-server pawn / standalone
/// - authority + !locally_owned    → серверная копия чужого pawn'а
/// - !authority + locally_owned    → owning client (predicted)
/// - !authority + !locally_owned   → simulated proxy
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetContext {
    pub authority: bool,
    pub locally_owned: bool,
}

impl NetContext {
    /// Standalone / listen-server own pawn.
    pub const AUTHORITY: NetContext = NetContext {
        authority: true,
        locally_owned: true,
    };

    /// Серверная копия pawn'а, которым владеет удалённый клиент.
    pub const SERVER_PROXY: NetContext = NetContext {
        authority: true,
        locally_owned: false,
    };

    /// Владеющий клиент (prediction + RPC на сервер).
    pub const OWNING_CLIENT: NetContext = NetContext {
        authority: false,
        locally_owned: true,
    };

    /// Чужой pawn на клиенте — только replicated-состояние.
    pub const SIMULATED: NetContext = NetContext {
        authority: false,
        locally_owned: false,
    };

    pub fn is_authority(&self) -> bool {
        self.authority
    }

    pub fn is_locally_owned(&self) -> bool {
        self.locally_owned
    }

    /// Владеющий клиент (не сервер).
    pub fn is_locally_owned_remote(&self) -> bool {
        self.locally_owned && !self.authority
    }

    /// Серверная копия клиентского pawn'а.
    pub fn is_non_owning_authority(&self) -> bool {
        self.authority && !self.locally_owned
    }

    pub fn is_simulated_proxy(&self) -> bool {
        !self.authority && !self.locally_owned
    }
}
