//! AI-мозг: приоритетные стеки действий с событийным планировщиком.
//!
//! Четыре яруса приоритета, в каждом — стек действий. Исполняется верх
//! самого старшего непустого яруса; вытесненные действия встают на паузу
//! и возобновляются, когда старшие сходят со сцены. Все переходы идут
//! через очередь событий: один проход на тик, стабильный порядок.

pub mod action;
pub mod actions;
pub mod systems;

pub use action::{ActionCtx, ActionEntry, ActionId, ActionState, ActionStatus, BrainAction};

use bevy::prelude::*;

use crate::logger::{log, log_error, log_warning};

pub const PRIORITY_COUNT: usize = 4;

/// Ярус приоритета, по возрастанию: Logic — фоновое поведение,
/// Reaction — ответ на раздражители, HardScript — скриптовые сцены,
/// Ultimate — никогда не вытесняется (смерть, stagger).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ActionPriority {
    Logic,
    Reaction,
    HardScript,
    Ultimate,
}

impl ActionPriority {
    pub fn index(self) -> usize {
        match self {
            ActionPriority::Logic => 0,
            ActionPriority::Reaction => 1,
            ActionPriority::HardScript => 2,
            ActionPriority::Ultimate => 3,
        }
    }
}

/// Тип события планировщика. Порядок объявления = порядок обработки
/// внутри одного приоритета: сначала зачистки, потом push'и, аборты
/// последними (они срезают и то, что встало в этом же тике).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ActionEventType {
    FailedToStart,
    FinishedAborting,
    FinishedExecution,
    Push,
    InstantAbort,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActionEvent {
    pub action: ActionId,
    pub event_type: ActionEventType,
    pub priority: ActionPriority,
    pub seq: u64,
}

impl ActionEvent {
    /// Тот же запрос, независимо от момента постановки.
    fn same_request(&self, other: &ActionEvent) -> bool {
        self.action == other.action && self.event_type == other.event_type
    }
}

/// Мозг одного pawn'а.
#[derive(Component)]
pub struct ActionBrain {
    stacks: [Vec<ActionId>; PRIORITY_COUNT],
    entries: Vec<ActionEntry>,
    events: Vec<ActionEvent>,
    next_seq: u64,
    next_id: u32,
    current: Option<ActionId>,
    running: bool,
    /// false — мозг спит до следующего события.
    tick_enabled: bool,
    pawn: Option<Entity>,
    /// Фоновое действие, с которого начинается логика.
    default_action: Option<fn() -> (Box<dyn BrainAction>, ActionPriority)>,
}

impl Default for ActionBrain {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionBrain {
    pub fn new() -> Self {
        Self {
            stacks: std::array::from_fn(|_| Vec::new()),
            entries: Vec::new(),
            events: Vec::new(),
            next_seq: 0,
            next_id: 0,
            current: None,
            running: false,
            tick_enabled: true,
            pawn: None,
            default_action: None,
        }
    }

    pub fn with_default_action(
        mut self,
        factory: fn() -> (Box<dyn BrainAction>, ActionPriority),
    ) -> Self {
        self.default_action = Some(factory);
        self
    }

    pub fn current(&self) -> Option<ActionId> {
        self.current
    }

    pub fn current_name(&self) -> Option<&'static str> {
        self.current
            .and_then(|id| self.entry_index(id))
            .map(|idx| self.entries[idx].action.name())
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_tick_enabled(&self) -> bool {
        self.tick_enabled
    }

    pub fn pawn(&self) -> Option<Entity> {
        self.pawn
    }

    pub fn action_state(&self, id: ActionId) -> Option<ActionState> {
        self.entry_index(id).map(|idx| self.entries[idx].state)
    }

    fn entry_index(&self, id: ActionId) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }

    // ========================================================================
    // Action management
    // ========================================================================

    pub fn create_action(
        &mut self,
        action: Box<dyn BrainAction>,
        priority: ActionPriority,
        parent: Option<ActionId>,
    ) -> ActionId {
        self.next_id += 1;
        let id = ActionId(self.next_id);
        self.entries.push(ActionEntry {
            id,
            priority,
            parent,
            state: ActionState::Idle,
            action,
        });
        id
    }

    /// Ставит действие в очередь на свой ярус.
    pub fn push_action(&mut self, id: ActionId) -> bool {
        let Some(idx) = self.entry_index(id) else {
            log_error(&format!("Push of unknown action {:?}", id));
            return false;
        };
        if self.entries[idx].state != ActionState::Idle {
            log_warning(&format!(
                "⚠️ Push of action '{}' in state {:?} ignored",
                self.entries[idx].action.name(),
                self.entries[idx].state
            ));
            return false;
        }
        self.queue_event(id, ActionEventType::Push)
    }

    /// Снос действия. Ещё не вставшее — выбрасывается сразу вместе со
    /// своими push-событиями; вставшее — через InstantAbort в очереди.
    pub fn abort_action(&mut self, id: ActionId) -> bool {
        let Some(idx) = self.entry_index(id) else {
            return false;
        };
        if self.entries[idx].state == ActionState::Idle {
            self.remove_events_for(id);
            self.entries.remove(idx);
            return true;
        }
        self.queue_event(id, ActionEventType::InstantAbort)
    }

    /// Синхронный снос, минуя очередь (StopLogic, смерть pawn'а).
    pub fn force_abort_action(&mut self, id: ActionId, ctx: &mut ActionCtx) {
        let Some(idx) = self.entry_index(id) else {
            return;
        };
        {
            let entry = &mut self.entries[idx];
            if matches!(entry.state, ActionState::Active | ActionState::Paused) {
                entry.action.on_abort(ctx);
            }
            entry.state = ActionState::Aborted;
        }
        log(&format!("🗑️ Action {:?} aborted", id));
        self.pop_action(id);
    }

    /// Убирает действие из мира: стек, события, реестр.
    fn pop_action(&mut self, id: ActionId) {
        for stack in &mut self.stacks {
            stack.retain(|x| *x != id);
        }
        self.remove_events_for(id);
        if self.current == Some(id) {
            self.current = None;
        }
        if let Some(idx) = self.entry_index(id) {
            self.entries.remove(idx);
        }
    }

    fn remove_events_for(&mut self, id: ActionId) {
        self.events.retain(|e| e.action != id);
    }

    fn queue_event(&mut self, action: ActionId, event_type: ActionEventType) -> bool {
        let Some(idx) = self.entry_index(action) else {
            log_error(&format!("Event {:?} for unknown action {:?}", event_type, action));
            return false;
        };
        let event = ActionEvent {
            action,
            event_type,
            priority: self.entries[idx].priority,
            seq: self.next_seq,
        };
        if self.events.iter().any(|e| e.same_request(&event)) {
            log(&format!("Duplicate event {:?} for {:?} dropped", event_type, action));
            return false;
        }
        self.next_seq += 1;
        self.events.push(event);
        // Мозг просыпается, как только ему есть чем заняться
        if self.pawn.is_some() {
            self.tick_enabled = true;
        }
        true
    }

    // ========================================================================
    // Logic lifecycle
    // ========================================================================

    pub fn start_logic(&mut self) {
        if self.running {
            return;
        }
        self.running = true;
        self.tick_enabled = true;
        if let Some(factory) = self.default_action {
            if self.entries.is_empty() {
                let (action, priority) = factory();
                let id = self.create_action(action, priority, None);
                self.push_action(id);
            }
        }
    }

    /// Останавливает логику: каждый ярус сносится с верхушки вместе с
    /// цепочкой родителей, пока стеки не опустеют. Запаузенные действия
    /// младших ярусов получают свой on_abort, а не тихо исчезают.
    pub fn stop_logic(&mut self, ctx: &mut ActionCtx) {
        if !self.running {
            return;
        }
        self.running = false;
        for tier in 0..PRIORITY_COUNT {
            while let Some(&top) = self.stacks[tier].last() {
                let mut chain = vec![top];
                let mut cursor = self
                    .entry_index(top)
                    .and_then(|idx| self.entries[idx].parent);
                while let Some(id) = cursor {
                    chain.push(id);
                    cursor = self.entry_index(id).and_then(|idx| self.entries[idx].parent);
                }
                for id in chain {
                    self.force_abort_action(id, ctx);
                }
            }
        }
        // Idle-действия с невыполненными push'ами тоже не переживают stop
        self.entries.clear();
        self.events.clear();
        self.current = None;
    }

    pub fn restart_logic(&mut self, ctx: &mut ActionCtx) {
        self.stop_logic(ctx);
        self.start_logic();
    }

    pub fn on_pawn_updated(&mut self, pawn: Option<Entity>) {
        self.pawn = pawn;
        if pawn.is_some() && !self.events.is_empty() {
            self.tick_enabled = true;
        }
    }

    // ========================================================================
    // Scheduler tick
    // ========================================================================

    pub fn step(&mut self, ctx: &mut ActionCtx) {
        if !self.tick_enabled {
            return;
        }
        if self.pawn.is_none() {
            self.pawn = Some(ctx.pawn);
        }

        // 1. События: стабильный порядок (ярус, тип, время постановки).
        //    Обработчики могут ставить новые — те лягут в свежий вектор
        //    и дождутся следующего тика.
        self.events
            .sort_by_key(|e| (e.priority, e.event_type, e.seq));
        let drained = std::mem::take(&mut self.events);
        for event in drained {
            match event.event_type {
                ActionEventType::Push => {
                    let Some(idx) = self.entry_index(event.action) else {
                        continue;
                    };
                    let priority = self.entries[idx].priority;
                    if self.entries[idx].state == ActionState::Idle
                        && !self.stacks[priority.index()].contains(&event.action)
                    {
                        self.stacks[priority.index()].push(event.action);
                    }
                }
                ActionEventType::InstantAbort => {
                    self.force_abort_action(event.action, ctx);
                }
                ActionEventType::FailedToStart
                | ActionEventType::FinishedAborting
                | ActionEventType::FinishedExecution => {
                    self.pop_action(event.action);
                }
            }
        }

        // 2. Пересчёт текущего действия
        self.update_current_action(ctx);

        // 3. Тик текущего
        if let Some(id) = self.current {
            if let Some(idx) = self.entry_index(id) {
                if self.entries[idx].state == ActionState::Active
                    && self.entries[idx].action.wants_tick()
                {
                    match self.entries[idx].action.tick(ctx) {
                        ActionStatus::Running => {}
                        ActionStatus::Success => {
                            self.entries[idx].state = ActionState::Finished;
                            self.queue_event(id, ActionEventType::FinishedExecution);
                        }
                        ActionStatus::Failure => {
                            self.entries[idx].state = ActionState::Failed;
                            self.queue_event(id, ActionEventType::FinishedExecution);
                        }
                    }
                }
            }
        }

        // 4. Нечего делать — засыпаем до следующего события
        let current_wants_tick = self
            .current
            .and_then(|id| self.entry_index(id))
            .map(|idx| self.entries[idx].action.wants_tick())
            .unwrap_or(false);
        if self.events.is_empty() && !current_wants_tick {
            self.tick_enabled = false;
        }
    }

    fn update_current_action(&mut self, ctx: &mut ActionCtx) {
        // Верх самого старшего непустого яруса
        let desired = self.stacks.iter().rev().find_map(|s| s.last().copied());
        let Some(desired) = desired else {
            self.current = None;
            return;
        };

        if self.current == Some(desired) {
            let Some(idx) = self.entry_index(desired) else {
                self.current = None;
                return;
            };
            if self.entries[idx].state.is_finished() {
                // Завершилось, но всё ещё на верхушке — перезапуск
                self.activate(desired, ctx);
            }
            return;
        }

        if let Some(old) = self.current {
            if let Some(idx) = self.entry_index(old) {
                if self.entries[idx].state == ActionState::Active {
                    self.entries[idx].action.on_pause(ctx);
                    self.entries[idx].state = ActionState::Paused;
                }
            }
        }

        self.activate(desired, ctx);
    }

    fn activate(&mut self, id: ActionId, ctx: &mut ActionCtx) {
        let Some(idx) = self.entry_index(id) else {
            self.current = None;
            return;
        };
        let name = self.entries[idx].action.name();
        let resumed = self.entries[idx].state == ActionState::Paused;
        let ok = if resumed {
            self.entries[idx].action.on_resume(ctx)
        } else {
            self.entries[idx].action.on_activate(ctx)
        };
        if ok {
            self.entries[idx].state = ActionState::Active;
            self.current = Some(id);
            log(&format!(
                "🎬 Action '{}' {}",
                name,
                if resumed { "resumed" } else { "started" }
            ));
        } else {
            // Стартовать не смогло: помечаем и отдаём планировщику на снос
            self.entries[idx].state = ActionState::Failed;
            self.current = None;
            self.queue_event(id, ActionEventType::FailedToStart);
            log_warning(&format!("⚠️ Action '{}' failed to start", name));
        }
    }
}
