//! ECS-обвязка боевой подсистемы.
//!
//! Границы: внутрь — команды ввода и сетевые сообщения (wrapper-events),
//! наружу — gameplay-события и исходящие конверты. Host подключает
//! транспорт к *Out/*In событиям.

use bevy::prelude::*;

use crate::loadout::input::LoadoutCommand;
use crate::loadout::Loadout;
use crate::net::{ClientMsg, NetContext, Outbox, RepEnvelope, ServerMsg};
use crate::weapons::events::CombatEvent;

// ============================================================================
// Wrapper events
// ============================================================================

/// Gameplay-событие, поднятое из Outbox в ECS.
#[derive(Event, Debug, Clone)]
pub struct CombatEventOut {
    pub entity: Entity,
    pub event: CombatEvent,
}

/// Команда ввода для конкретного pawn'а.
#[derive(Event, Debug, Clone)]
pub struct LoadoutCommandEvent {
    pub entity: Entity,
    pub command: LoadoutCommand,
}

/// RPC, который реплика хочет отправить на сервер.
#[derive(Event, Debug, Clone)]
pub struct ClientMsgOut {
    pub entity: Entity,
    pub msg: ClientMsg,
}

/// RPC, который сервер хочет отправить владельцу.
#[derive(Event, Debug, Clone)]
pub struct ServerMsgOut {
    pub entity: Entity,
    pub msg: ServerMsg,
}

/// Реплика свойства для рассылки клиентам.
#[derive(Event, Debug, Clone)]
pub struct RepUpdateOut {
    pub entity: Entity,
    pub envelope: RepEnvelope,
}

/// Входящий RPC клиента (доставлен транспортом host'а).
#[derive(Event, Debug, Clone)]
pub struct ClientMsgIn {
    pub entity: Entity,
    pub msg: ClientMsg,
}

/// Входящий RPC сервера.
#[derive(Event, Debug, Clone)]
pub struct ServerMsgIn {
    pub entity: Entity,
    pub msg: ServerMsg,
}

/// Входящая реплика свойства.
#[derive(Event, Debug, Clone)]
pub struct RepUpdateIn {
    pub entity: Entity,
    pub envelope: RepEnvelope,
}

// ============================================================================
// Systems
// ============================================================================

pub(crate) fn drain_outbox(
    entity: Entity,
    outbox: &mut Outbox,
    events: &mut EventWriter<CombatEventOut>,
    client_out: &mut EventWriter<ClientMsgOut>,
    server_out: &mut EventWriter<ServerMsgOut>,
) {
    for event in outbox.events.drain(..) {
        events.write(CombatEventOut { entity, event });
    }
    for msg in outbox.client_msgs.drain(..) {
        client_out.write(ClientMsgOut { entity, msg });
    }
    for msg in outbox.server_msgs.drain(..) {
        server_out.write(ServerMsgOut { entity, msg });
    }
    outbox.clear();
}

/// Входящая сеть применяется до команд и тика.
pub fn apply_network_inbox(
    time: Res<Time>,
    mut query: Query<(Entity, &mut Loadout, &NetContext)>,
    mut client_in: EventReader<ClientMsgIn>,
    mut server_in: EventReader<ServerMsgIn>,
    mut rep_in: EventReader<RepUpdateIn>,
    mut events: EventWriter<CombatEventOut>,
    mut client_out: EventWriter<ClientMsgOut>,
    mut server_out: EventWriter<ServerMsgOut>,
) {
    let now = time.elapsed_secs();
    for ClientMsgIn { entity, msg } in client_in.read() {
        if let Ok((entity, mut loadout, net)) = query.get_mut(*entity) {
            let mut outbox = Outbox::new();
            loadout.handle_client_msg(msg.clone(), *net, now, &mut outbox);
            drain_outbox(entity, &mut outbox, &mut events, &mut client_out, &mut server_out);
        }
    }
    for ServerMsgIn { entity, msg } in server_in.read() {
        if let Ok((entity, mut loadout, net)) = query.get_mut(*entity) {
            let mut outbox = Outbox::new();
            loadout.handle_server_msg(msg.clone(), *net, now, &mut outbox);
            drain_outbox(entity, &mut outbox, &mut events, &mut client_out, &mut server_out);
        }
    }
    for RepUpdateIn { entity, envelope } in rep_in.read() {
        if let Ok((entity, mut loadout, net)) = query.get_mut(*entity) {
            let mut outbox = Outbox::new();
            loadout.apply_rep(envelope.clone(), *net, now, &mut outbox);
            drain_outbox(entity, &mut outbox, &mut events, &mut client_out, &mut server_out);
        }
    }
}

pub fn process_loadout_commands(
    time: Res<Time>,
    mut query: Query<(Entity, &mut Loadout, &NetContext)>,
    mut commands_in: EventReader<LoadoutCommandEvent>,
    mut events: EventWriter<CombatEventOut>,
    mut client_out: EventWriter<ClientMsgOut>,
    mut server_out: EventWriter<ServerMsgOut>,
) {
    let now = time.elapsed_secs();
    for LoadoutCommandEvent { entity, command } in commands_in.read() {
        let Ok((entity, mut loadout, net)) = query.get_mut(*entity) else {
            continue;
        };
        let mut outbox = Outbox::new();
        match command {
            LoadoutCommand::SelectWeapon(weapon) => {
                loadout.set_current_weapon(*weapon, *net, now, &mut outbox);
            }
            LoadoutCommand::NextWeapon(group) => {
                loadout.equip_next_weapon(*group, *net, now, &mut outbox);
            }
            LoadoutCommand::StartFire(slot) => {
                loadout.start_fire(*slot, *net, now, &mut outbox);
            }
            LoadoutCommand::StopFire(slot) => {
                loadout.stop_fire(*slot, *net, now, &mut outbox);
            }
        }
        drain_outbox(entity, &mut outbox, &mut events, &mut client_out, &mut server_out);
    }
}

pub fn tick_loadouts(
    time: Res<Time>,
    mut query: Query<(Entity, &mut Loadout, &NetContext)>,
    mut events: EventWriter<CombatEventOut>,
    mut client_out: EventWriter<ClientMsgOut>,
    mut server_out: EventWriter<ServerMsgOut>,
    mut rep_out: EventWriter<RepUpdateOut>,
) {
    let dt = time.delta_secs();
    let now = time.elapsed_secs();
    for (entity, mut loadout, net) in query.iter_mut() {
        let mut outbox = Outbox::new();
        loadout.tick(dt, *net, now, &mut outbox);
        if net.is_authority() {
            for envelope in loadout.collect_rep_updates(*net) {
                rep_out.write(RepUpdateOut { entity, envelope });
            }
        }
        drain_outbox(entity, &mut outbox, &mut events, &mut client_out, &mut server_out);
    }
}

// ============================================================================
// Plugin
// ============================================================================

pub struct CombatPlugin;

impl Plugin for CombatPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<CombatEventOut>()
            .add_event::<LoadoutCommandEvent>()
            .add_event::<ClientMsgOut>()
            .add_event::<ServerMsgOut>()
            .add_event::<RepUpdateOut>()
            .add_event::<ClientMsgIn>()
            .add_event::<ServerMsgIn>()
            .add_event::<RepUpdateIn>()
            .add_systems(
                FixedUpdate,
                // Порядок важен: сеть → ввод → тик
                (apply_network_inbox, process_loadout_commands, tick_loadouts).chain(),
            );
    }
}
