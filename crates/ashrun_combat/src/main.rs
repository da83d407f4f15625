//! Headless-демо: pawn с пистолетом и винтовкой, мозг бездельничает,
//! через секунду получает приказ обстрелять цель.

use bevy::prelude::*;

use ashrun_combat::brain::actions::{EngageTargetAction, IdleAction};
use ashrun_combat::brain::{ActionBrain, ActionPriority};
use ashrun_combat::loadout::systems::CombatEventOut;
use ashrun_combat::loadout::Loadout;
use ashrun_combat::net::{NetContext, Outbox};
use ashrun_combat::weapons::{FireSlot, WeaponCatalog};
use ashrun_combat::{create_headless_app, init_logger, log, log_info};

fn main() {
    init_logger();
    log_info("🚀 ASHRUN combat demo");

    let mut app = create_headless_app(42);
    app.add_systems(Startup, spawn_demo_pawn)
        .add_systems(FixedUpdate, (direct_engagement, print_combat_events));

    // ~10 секунд боя
    for _ in 0..600 {
        app.update();
        std::thread::sleep(std::time::Duration::from_millis(16));
    }
    log_info("✅ Demo finished");
}

fn spawn_demo_pawn(mut commands: Commands) {
    let net = NetContext::AUTHORITY;
    let mut loadout = Loadout::new(WeaponCatalog::with_defaults());
    let mut outbox = Outbox::new();
    loadout.add_weapon("pistol", net, 0.0, &mut outbox);
    loadout.add_weapon("rifle", net, 0.0, &mut outbox);

    let mut brain = ActionBrain::new()
        .with_default_action(|| (Box::new(IdleAction::new()), ActionPriority::Logic));
    brain.start_logic();

    commands.spawn((loadout, net, brain));
    log_info("Pawn spawned: pistol + rifle");
}

/// Через секунду после старта приказывает обстрелять цель.
fn direct_engagement(
    time: Res<Time>,
    mut query: Query<(&mut ActionBrain, &Loadout)>,
    mut ordered: Local<bool>,
) {
    if *ordered || time.elapsed_secs() < 1.0 {
        return;
    }
    for (mut brain, loadout) in query.iter_mut() {
        if loadout.current().is_none() {
            continue;
        }
        let engage = brain.create_action(
            Box::new(EngageTargetAction::new(FireSlot::Primary, 3)),
            ActionPriority::Reaction,
            None,
        );
        brain.push_action(engage);
        *ordered = true;
        log_info("🎯 Engage order issued");
    }
}

fn print_combat_events(mut events: EventReader<CombatEventOut>) {
    for CombatEventOut { entity, event } in events.read() {
        log(&format!("{:?}: {:?}", entity, event));
    }
}
