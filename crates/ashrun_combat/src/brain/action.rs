//! Базовые типы действий AI-мозга.

use bevy::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::loadout::Loadout;
use crate::net::{NetContext, Outbox};

/// Идентификатор действия внутри одного мозга.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActionId(pub u32);

/// Жизненный цикл действия.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionState {
    /// Создано, ещё не в стеке.
    Idle,
    Active,
    Paused,
    Finished,
    Failed,
    Aborted,
}

impl ActionState {
    /// Терминальное состояние — действие отработало.
    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            ActionState::Finished | ActionState::Failed | ActionState::Aborted
        )
    }
}

/// Результат одного тика действия.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionStatus {
    Running,
    Success,
    Failure,
}

/// Всё, что действию доступно на тик: pawn, его loadout, rng и outbox.
pub struct ActionCtx<'a> {
    pub pawn: Entity,
    pub loadout: Option<&'a mut Loadout>,
    pub net: NetContext,
    pub now: f32,
    pub dt: f32,
    pub rng: &'a mut ChaCha8Rng,
    pub outbox: &'a mut Outbox,
}

/// Поведение действия. Мозг гарантирует: on_activate перед tick,
/// on_pause при вытеснении старшим приоритетом, on_abort при сносе.
pub trait BrainAction: Send + Sync {
    fn name(&self) -> &'static str;

    /// false — действие не смогло стартовать (мозг снимет его со стека).
    fn on_activate(&mut self, ctx: &mut ActionCtx) -> bool;

    fn on_pause(&mut self, _ctx: &mut ActionCtx) {}

    /// false — не смогло возобновиться после паузы.
    fn on_resume(&mut self, _ctx: &mut ActionCtx) -> bool {
        true
    }

    fn on_abort(&mut self, _ctx: &mut ActionCtx) {}

    fn tick(&mut self, ctx: &mut ActionCtx) -> ActionStatus;

    /// false — действию не нужны тики (чистый ожидатель событий),
    /// мозг может заснуть.
    fn wants_tick(&self) -> bool {
        true
    }
}

pub struct ActionEntry {
    pub id: ActionId,
    pub priority: super::ActionPriority,
    /// Родитель: под-действие, снос родителя сносит и его детей.
    pub parent: Option<ActionId>,
    pub state: ActionState,
    pub action: Box<dyn BrainAction>,
}
