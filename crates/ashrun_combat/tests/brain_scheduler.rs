//! Мозг поверх ECS: действия двигают loadout, seed решает всё.

use std::time::Duration;

use bevy::prelude::*;

use ashrun_combat::brain::actions::{EngageTargetAction, IdleAction};
use ashrun_combat::brain::{ActionBrain, ActionPriority};
use ashrun_combat::create_headless_app;
use ashrun_combat::loadout::systems::CombatEventOut;
use ashrun_combat::loadout::Loadout;
use ashrun_combat::net::{NetContext, Outbox};
use ashrun_combat::weapons::events::CombatEvent;
use ashrun_combat::weapons::{FireSlot, WeaponCatalog};

const DT: f32 = 1.0 / 60.0;

fn advance(app: &mut App, ticks: u32) {
    for _ in 0..ticks {
        let generic = {
            let mut time = app.world_mut().resource_mut::<Time<Fixed>>();
            time.advance_by(Duration::from_secs_f32(DT));
            time.as_generic()
        };
        *app.world_mut().resource_mut::<Time>() = generic;
        app.world_mut().run_schedule(FixedUpdate);
    }
}

fn collect_events(app: &App) -> Vec<CombatEvent> {
    let events = app.world().resource::<Events<CombatEventOut>>();
    events
        .get_cursor()
        .read(events)
        .map(|e| e.event.clone())
        .collect()
}

fn spawn_ai_pawn(app: &mut App) -> Entity {
    let net = NetContext::AUTHORITY;
    let mut loadout = Loadout::new(WeaponCatalog::with_defaults());
    let mut outbox = Outbox::new();
    loadout.add_weapon("rifle", net, 0.0, &mut outbox);

    let mut brain = ActionBrain::new()
        .with_default_action(|| (Box::new(IdleAction::new()), ActionPriority::Logic));
    brain.start_logic();

    app.world_mut().spawn((loadout, net, brain)).id()
}

fn order_engagement(app: &mut App, pawn: Entity, bursts: u32) {
    let mut brain = app.world_mut().get_mut::<ActionBrain>(pawn).unwrap();
    let engage = brain.create_action(
        Box::new(EngageTargetAction::new(FireSlot::Primary, bursts)),
        ActionPriority::Reaction,
        None,
    );
    brain.push_action(engage);
}

#[test]
fn test_brain_fires_weapon_through_ecs() {
    let mut app = create_headless_app(42);
    let pawn = spawn_ai_pawn(&mut app);

    // Мозг бездельничает, пока оружие достаётся
    advance(&mut app, 60);
    {
        let brain = app.world().get::<ActionBrain>(pawn).unwrap();
        assert_eq!(brain.current_name(), Some("idle"));
    }

    order_engagement(&mut app, pawn, 2);
    advance(&mut app, 600);

    let shots = collect_events(&app)
        .iter()
        .filter(|e| matches!(e, CombatEvent::FireStart { .. }))
        .count();
    assert!(shots > 0, "engage action never fired");

    // Обстрел закончился — мозг вернулся к idle
    let brain = app.world().get::<ActionBrain>(pawn).unwrap();
    assert_eq!(brain.current_name(), Some("idle"));
    let loadout = app.world().get::<Loadout>(pawn).unwrap();
    assert!(!loadout.current_weapon().unwrap().is_firing());
}

#[test]
fn test_engage_without_weapon_falls_back_to_idle() {
    let mut app = create_headless_app(42);
    let net = NetContext::AUTHORITY;
    // Пустой инвентарь
    let mut brain = ActionBrain::new()
        .with_default_action(|| (Box::new(IdleAction::new()), ActionPriority::Logic));
    brain.start_logic();
    let pawn = app
        .world_mut()
        .spawn((Loadout::new(WeaponCatalog::with_defaults()), net, brain))
        .id();

    advance(&mut app, 10);
    order_engagement(&mut app, pawn, 1);
    advance(&mut app, 10);

    // Стрелять нечем: действие упало на старте, idle продолжается
    let brain = app.world().get::<ActionBrain>(pawn).unwrap();
    assert_eq!(brain.current_name(), Some("idle"));
    assert!(collect_events(&app)
        .iter()
        .all(|e| !matches!(e, CombatEvent::FireStart { .. })));
}

/// Один seed — байт-в-байт одинаковый бой.
fn scripted_battle(seed: u64) -> Vec<String> {
    let mut app = create_headless_app(seed);
    let pawn = spawn_ai_pawn(&mut app);
    advance(&mut app, 60);
    order_engagement(&mut app, pawn, 3);
    advance(&mut app, 900);
    collect_events(&app)
        .iter()
        .map(|e| format!("{:?}", e))
        .collect()
}

#[test]
fn test_seeded_runs_are_identical() {
    let first = scripted_battle(1337);
    let second = scripted_battle(1337);
    let third = scripted_battle(1337);
    assert!(!first.is_empty());
    assert_eq!(first, second);
    assert_eq!(second, third);
}
