//! Сверка клиент/сервер/прокси: смена оружия, предиктивная стрельба,
//! откат по серверной коррекции.
//!
//! Три реплики одного pawn'а соединены "транспортом" из ручной
//! перекладки сообщений — reliable, ordered, без потерь, доставка
//! в конце тика.

use ashrun_combat::loadout::Loadout;
use ashrun_combat::net::{NetContext, Outbox, ServerMsg};
use ashrun_combat::weapons::events::CombatEvent;
use ashrun_combat::weapons::{FireSlot, WeaponCatalog, WeaponId, WeaponState};

const DT: f32 = 1.0 / 60.0;

struct Replica {
    loadout: Loadout,
    net: NetContext,
    outbox: Outbox,
    events: Vec<CombatEvent>,
}

impl Replica {
    fn new(net: NetContext) -> Self {
        Self {
            loadout: Loadout::new(WeaponCatalog::with_defaults()),
            net,
            outbox: Outbox::new(),
            events: Vec::new(),
        }
    }
}

struct Harness {
    server: Replica,
    owner: Replica,
    proxy: Replica,
    now: f32,
}

impl Harness {
    fn new(classes: &[&str]) -> Self {
        let mut server = Replica::new(NetContext::SERVER_PROXY);
        for class in classes {
            server
                .loadout
                .add_weapon(class, server.net, 0.0, &mut server.outbox);
        }
        let mut harness = Harness {
            server,
            owner: Replica::new(NetContext::OWNING_CLIENT),
            proxy: Replica::new(NetContext::SIMULATED),
            now: 0.0,
        };
        harness.exchange();
        harness
    }

    /// Перекладывает RPC и реплики между репликами.
    fn exchange(&mut self) {
        let client_msgs: Vec<_> = self.owner.outbox.client_msgs.drain(..).collect();
        for msg in client_msgs {
            self.server.loadout.handle_client_msg(
                msg,
                self.server.net,
                self.now,
                &mut self.server.outbox,
            );
        }

        let server_msgs: Vec<_> = self.server.outbox.server_msgs.drain(..).collect();
        for msg in server_msgs {
            self.owner.loadout.handle_server_msg(
                msg,
                self.owner.net,
                self.now,
                &mut self.owner.outbox,
            );
        }

        for envelope in self.server.loadout.collect_rep_updates(self.server.net) {
            if envelope.applies_to(true) {
                self.owner.loadout.apply_rep(
                    envelope.clone(),
                    self.owner.net,
                    self.now,
                    &mut self.owner.outbox,
                );
            }
            if envelope.applies_to(false) {
                self.proxy.loadout.apply_rep(
                    envelope,
                    self.proxy.net,
                    self.now,
                    &mut self.proxy.outbox,
                );
            }
        }

        for replica in [&mut self.server, &mut self.owner, &mut self.proxy] {
            replica.events.append(&mut replica.outbox.events);
            replica.outbox.clear();
        }
    }

    fn tick(&mut self) {
        self.now += DT;
        for replica in [&mut self.server, &mut self.owner, &mut self.proxy] {
            replica
                .loadout
                .tick(DT, replica.net, self.now, &mut replica.outbox);
        }
        self.exchange();
    }

    fn run(&mut self, ticks: u32) {
        for _ in 0..ticks {
            self.tick();
        }
    }

    fn weapon_by_class(&self, class: &str) -> WeaponId {
        self.server
            .loadout
            .weapons()
            .find(|w| w.class() == class)
            .map(|w| w.id())
            .unwrap()
    }

    fn owner_ammo(&self, slot: FireSlot) -> f32 {
        self.owner
            .loadout
            .current_weapon()
            .unwrap()
            .fire_mode(slot)
            .unwrap()
            .ammo()
            .unwrap()
            .amount()
    }

    fn server_ammo(&self, slot: FireSlot) -> f32 {
        self.server
            .loadout
            .current_weapon()
            .unwrap()
            .fire_mode(slot)
            .unwrap()
            .ammo()
            .unwrap()
            .amount()
    }
}

#[test]
fn test_initial_equip_converges_on_all_replicas() {
    let mut h = Harness::new(&["pistol", "rifle"]);
    // Владелец строит инвентарь из реплики, сам выбирает первое оружие,
    // сервер следует за ним
    h.run(60);

    let pistol = h.weapon_by_class("pistol");
    assert_eq!(h.owner.loadout.current(), Some(pistol));
    assert!(h.owner.loadout.current_weapon().unwrap().is_active());
    assert_eq!(h.server.loadout.current(), Some(pistol));
    assert!(h.server.loadout.current_weapon().unwrap().is_active());
    // Проксе состояние приехало репликой
    assert_eq!(
        h.proxy.loadout.weapon(pistol).unwrap().state(),
        WeaponState::Active
    );
}

#[test]
fn test_owner_swap_converges() {
    let mut h = Harness::new(&["pistol", "rifle"]);
    h.run(60);
    let pistol = h.weapon_by_class("pistol");
    let rifle = h.weapon_by_class("rifle");

    let now = h.now;
    h.owner
        .loadout
        .set_current_weapon(rifle, h.owner.net, now, &mut h.owner.outbox);
    h.exchange();
    // 0.3s put down + 0.7s equip + сетевой лаг в один тик
    h.run(80);

    assert_eq!(h.owner.loadout.current(), Some(rifle));
    assert!(h.owner.loadout.current_weapon().unwrap().is_active());
    assert_eq!(h.server.loadout.current(), Some(rifle));
    assert!(h.server.loadout.current_weapon().unwrap().is_active());
    assert_eq!(
        h.proxy.loadout.weapon(rifle).unwrap().state(),
        WeaponState::Active
    );
    assert_eq!(
        h.proxy.loadout.weapon(pistol).unwrap().state(),
        WeaponState::Inactive
    );
}

#[test]
fn test_swap_cancel_reconciles() {
    let mut h = Harness::new(&["pistol", "rifle"]);
    h.run(60);
    let pistol = h.weapon_by_class("pistol");
    let rifle = h.weapon_by_class("rifle");

    let now = h.now;
    h.owner
        .loadout
        .set_current_weapon(rifle, h.owner.net, now, &mut h.owner.outbox);
    h.run(3);
    assert!(h.owner.loadout.weapon(pistol).unwrap().is_putting_down());

    // Передумали — выбираем пистолет обратно. Уборка доигрывается,
    // пистолет возвращается в руки, сервер сходится по WeaponEquipped
    let now = h.now;
    h.owner
        .loadout
        .set_current_weapon(pistol, h.owner.net, now, &mut h.owner.outbox);
    assert_eq!(h.owner.loadout.pending(), Some(pistol));
    h.run(90);

    assert_eq!(h.owner.loadout.current(), Some(pistol));
    assert!(h.owner.loadout.current_weapon().unwrap().is_active());
    assert_eq!(h.owner.loadout.pending(), None);
    assert_eq!(h.server.loadout.current(), Some(pistol));
    assert!(h.server.loadout.current_weapon().unwrap().is_active());
    assert!(h.server.loadout.weapon(rifle).unwrap().is_inactive());
}

#[test]
fn test_predicted_fire_validated_and_replicated() {
    let mut h = Harness::new(&["pistol"]);
    h.run(60);

    let now = h.now;
    h.owner
        .loadout
        .start_fire(FireSlot::Primary, h.owner.net, now, &mut h.owner.outbox);
    // Prediction: патрон списан сразу, до ответа сервера
    assert_eq!(h.owner_ammo(FireSlot::Primary), 49.0);

    h.run(5);
    // Сервер проверил и согласился
    assert_eq!(h.server_ammo(FireSlot::Primary), 49.0);
    assert_eq!(
        h.server
            .loadout
            .current_weapon()
            .unwrap()
            .fire_mode(FireSlot::Primary)
            .unwrap()
            .fire_counter(),
        1
    );
    // Прокся проиграла косметику по fire counter'у
    assert!(h
        .proxy
        .events
        .iter()
        .any(|e| matches!(e, CombatEvent::FireStart { .. })));
    // Коррекций не было
    assert_eq!(h.owner_ammo(FireSlot::Primary), 49.0);
}

#[test]
fn test_rejected_fire_rolls_back_ammo() {
    let mut h = Harness::new(&["pistol"]);
    h.run(60);
    let pistol = h.weapon_by_class("pistol");

    // Расхождение: сервер авторитетно сжёг все патроны (другая система),
    // владелец об этом ещё не знает — SkipOwner-реплика к нему не идёт
    let now = h.now;
    h.server
        .loadout
        .weapon_mut(pistol)
        .unwrap()
        .fire_mode_mut(FireSlot::Primary)
        .unwrap()
        .ammo_mut()
        .unwrap()
        .apply_correction(0.0, now);

    let now = h.now;
    h.owner
        .loadout
        .start_fire(FireSlot::Primary, h.owner.net, now, &mut h.owner.outbox);
    assert_eq!(h.owner_ammo(FireSlot::Primary), 49.0);

    h.run(5);
    // Сервер отверг выстрел и прислал авторитетный боезапас
    assert_eq!(h.owner_ammo(FireSlot::Primary), 0.0);
    assert_eq!(h.server_ammo(FireSlot::Primary), 0.0);
    // Счётчик сервера двинулся и при отказе — прокси в курсе выстрела
    assert_eq!(
        h.server
            .loadout
            .current_weapon()
            .unwrap()
            .fire_mode(FireSlot::Primary)
            .unwrap()
            .fire_counter(),
        1
    );
}

#[test]
fn test_late_correction_lands_on_original_weapon() {
    let mut h = Harness::new(&["pistol", "rifle"]);
    h.run(60);
    let pistol = h.weapon_by_class("pistol");
    let rifle = h.weapon_by_class("rifle");

    let now = h.now;
    h.owner
        .loadout
        .set_current_weapon(rifle, h.owner.net, now, &mut h.owner.outbox);
    h.run(80);
    assert_eq!(h.owner.loadout.current(), Some(rifle));

    // Запоздалая коррекция по пистолету: reliable RPC пережил swap.
    // Ложится в пистолет, а не в текущее оружие
    let now = h.now;
    h.owner.loadout.handle_server_msg(
        ServerMsg::AmmoCorrection {
            weapon: pistol,
            slot: FireSlot::Primary,
            amount: 12.0,
        },
        h.owner.net,
        now,
        &mut h.owner.outbox,
    );
    let pistol_ammo = h
        .owner
        .loadout
        .weapon(pistol)
        .unwrap()
        .fire_mode(FireSlot::Primary)
        .unwrap()
        .ammo()
        .unwrap()
        .amount();
    assert_eq!(pistol_ammo, 12.0);
    assert_eq!(h.owner_ammo(FireSlot::Primary), 50.0);
}

#[test]
fn test_removed_item_propagates_to_replicas() {
    let mut h = Harness::new(&["pistol", "rifle"]);
    h.run(60);
    let rifle = h.weapon_by_class("rifle");

    let now = h.now;
    h.server
        .loadout
        .remove_item("rifle", h.server.net, now, &mut h.server.outbox);
    h.run(5);

    assert!(h.owner.loadout.weapon(rifle).is_none());
    assert!(h.proxy.loadout.weapon(rifle).is_none());
    assert!(h
        .owner
        .events
        .iter()
        .any(|e| matches!(e, CombatEvent::ItemRemoved { class } if class == "rifle")));
}
