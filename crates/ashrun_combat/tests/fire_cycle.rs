//! Интеграционные тесты цикла стрельбы через headless App.

use std::time::Duration;

use bevy::prelude::*;

use ashrun_combat::create_headless_app;
use ashrun_combat::loadout::input::LoadoutCommand;
use ashrun_combat::loadout::systems::{CombatEventOut, LoadoutCommandEvent};
use ashrun_combat::loadout::Loadout;
use ashrun_combat::net::{NetContext, Outbox};
use ashrun_combat::weapons::events::CombatEvent;
use ashrun_combat::weapons::{FireSlot, WeaponCatalog};

const DT: f32 = 1.0 / 60.0;

/// Прокручивает FixedUpdate вручную — тесты не зависят от wall clock.
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

fn spawn_armed_pawn(app: &mut App, classes: &[&str]) -> Entity {
    let net = NetContext::AUTHORITY;
    let mut loadout = Loadout::new(WeaponCatalog::with_defaults());
    let mut outbox = Outbox::new();
    for class in classes {
        loadout.add_weapon(class, net, 0.0, &mut outbox);
    }
    app.world_mut().spawn((loadout, net)).id()
}

#[test]
fn test_semi_auto_fire_cycle() {
    let mut app = create_headless_app(1);
    let pawn = spawn_armed_pawn(&mut app, &["pistol"]);

    // Достаём пистолет (initial equip + 0.4s)
    advance(&mut app, 30);
    {
        let loadout = app.world().get::<Loadout>(pawn).unwrap();
        assert!(loadout.current_weapon().unwrap().is_active());
    }

    app.world_mut().send_event(LoadoutCommandEvent {
        entity: pawn,
        command: LoadoutCommand::StartFire(FireSlot::Primary),
    });
    advance(&mut app, 30);

    let events = collect_events(&app);
    let shots = events
        .iter()
        .filter(|e| matches!(e, CombatEvent::FireStart { .. }))
        .count();
    // Полуавтомат: одно нажатие — ровно один выстрел
    assert_eq!(shots, 1);
    assert!(events
        .iter()
        .any(|e| matches!(e, CombatEvent::FireComplete { .. })));

    let loadout = app.world().get::<Loadout>(pawn).unwrap();
    let ammo = loadout
        .current_weapon()
        .unwrap()
        .fire_mode(FireSlot::Primary)
        .unwrap()
        .ammo()
        .unwrap();
    assert_eq!(ammo.amount(), 49.0);
}

#[test]
fn test_automatic_fire_until_released() {
    let mut app = create_headless_app(1);
    let pawn = spawn_armed_pawn(&mut app, &["rifle"]);
    advance(&mut app, 60);

    app.world_mut().send_event(LoadoutCommandEvent {
        entity: pawn,
        command: LoadoutCommand::StartFire(FireSlot::Primary),
    });
    // Секунда очереди при 0.1s/выстрел
    advance(&mut app, 60);
    app.world_mut().send_event(LoadoutCommandEvent {
        entity: pawn,
        command: LoadoutCommand::StopFire(FireSlot::Primary),
    });
    advance(&mut app, 30);

    let shots = collect_events(&app)
        .iter()
        .filter(|e| matches!(e, CombatEvent::FireStart { .. }))
        .count();
    assert!(shots >= 9, "expected a sustained burst, got {} shots", shots);
    assert!(shots <= 11, "refire faster than fire_rate: {} shots", shots);

    let loadout = app.world().get::<Loadout>(pawn).unwrap();
    assert!(!loadout.current_weapon().unwrap().is_firing());
}

#[test]
fn test_ammo_never_negative_under_sustained_fire() {
    let mut app = create_headless_app(1);
    let pawn = spawn_armed_pawn(&mut app, &["rifle"]);
    advance(&mut app, 60);

    app.world_mut().send_event(LoadoutCommandEvent {
        entity: pawn,
        command: LoadoutCommand::StartFire(FireSlot::Primary),
    });

    // 50 патронов при 0.1s/выстрел — кончатся за ~5 секунд; держим дольше
    for _ in 0..600 {
        advance(&mut app, 1);
        let loadout = app.world().get::<Loadout>(pawn).unwrap();
        let ammo = loadout
            .current_weapon()
            .unwrap()
            .fire_mode(FireSlot::Primary)
            .unwrap()
            .ammo()
            .unwrap();
        assert!(ammo.amount() >= 0.0, "ammo went negative: {}", ammo.amount());
    }

    let loadout = app.world().get::<Loadout>(pawn).unwrap();
    let mode = loadout
        .current_weapon()
        .unwrap()
        .fire_mode(FireSlot::Primary)
        .unwrap();
    assert_eq!(mode.ammo().unwrap().amount(), 0.0);
    // Триггер всё ещё зажат, но стрельбы нет
    assert!(mode.is_holding_fire());
    assert!(!mode.is_firing());
}

#[test]
fn test_weapon_swap_over_ecs_commands() {
    let mut app = create_headless_app(1);
    let pawn = spawn_armed_pawn(&mut app, &["pistol", "rifle"]);
    advance(&mut app, 30);

    let rifle = {
        let loadout = app.world().get::<Loadout>(pawn).unwrap();
        loadout
            .weapons()
            .find(|w| w.class() == "rifle")
            .map(|w| w.id())
            .unwrap()
    };

    app.world_mut().send_event(LoadoutCommandEvent {
        entity: pawn,
        command: LoadoutCommand::SelectWeapon(rifle),
    });
    // 0.3s put down + 0.7s equip
    advance(&mut app, 70);

    let loadout = app.world().get::<Loadout>(pawn).unwrap();
    assert_eq!(loadout.current(), Some(rifle));
    assert!(loadout.current_weapon().unwrap().is_active());
    assert!(collect_events(&app)
        .iter()
        .any(|e| matches!(e, CombatEvent::CurrentWeaponChanged { weapon } if *weapon == rifle)));
}
