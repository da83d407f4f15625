//! ECS-обвязка мозга.

use bevy::prelude::*;

use crate::brain::{ActionBrain, ActionCtx};
use crate::loadout::systems::{drain_outbox, ClientMsgOut, CombatEventOut, ServerMsgOut};
use crate::loadout::Loadout;
use crate::net::{NetContext, Outbox};
use crate::DeterministicRng;

pub fn tick_action_brains(
    time: Res<Time>,
    mut rng: ResMut<DeterministicRng>,
    mut query: Query<(Entity, &mut ActionBrain, Option<&mut Loadout>, &NetContext)>,
    mut events: EventWriter<CombatEventOut>,
    mut client_out: EventWriter<ClientMsgOut>,
    mut server_out: EventWriter<ServerMsgOut>,
) {
    let dt = time.delta_secs();
    let now = time.elapsed_secs();
    for (entity, mut brain, mut loadout, net) in query.iter_mut() {
        if brain.pawn().is_none() {
            brain.on_pawn_updated(Some(entity));
        }
        if !brain.is_tick_enabled() {
            continue;
        }
        let mut outbox = Outbox::new();
        {
            let mut ctx = ActionCtx {
                pawn: entity,
                loadout: loadout.as_deref_mut(),
                net: *net,
                now,
                dt,
                rng: &mut rng.rng,
                outbox: &mut outbox,
            };
            brain.step(&mut ctx);
        }
        drain_outbox(entity, &mut outbox, &mut events, &mut client_out, &mut server_out);
    }
}

pub struct BrainPlugin;

impl Plugin for BrainPlugin {
    fn build(&self, app: &mut App) {
        // Решения мозга должны лечь до обработки сети и тика loadout'ов
        app.add_systems(
            FixedUpdate,
            tick_action_brains.before(crate::loadout::systems::apply_network_inbox),
        );
    }
}
