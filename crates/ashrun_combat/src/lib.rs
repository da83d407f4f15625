//! ASHRUN combat core — детерминированная боевая симуляция шутера.
//!
//! Engine-agnostic библиотека: оружие, инвентарь, AI-мозг и сетевые
//! роли живут здесь, рендер и транспорт — у host'а (Godot shell,
//! dedicated server, тесты). Вся логика крутится в FixedUpdate 60Hz.

pub mod brain;
pub mod loadout;
pub mod logger;
pub mod net;
pub mod weapons;

use bevy::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

pub use brain::systems::BrainPlugin;
pub use loadout::systems::CombatPlugin;
pub use logger::{init_logger, log, log_error, log_info, log_warning};

/// Seeded RNG всей симуляции. Один seed — один и тот же бой,
/// на этом держатся replay и lockstep-проверки.
#[derive(Resource)]
pub struct DeterministicRng {
    pub rng: ChaCha8Rng,
    pub seed: u64,
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }
}

/// Корневой plugin: fixed timestep, RNG, боевая подсистема и мозг.
pub struct SimulationPlugin {
    pub seed: u64,
}

impl Default for SimulationPlugin {
    fn default() -> Self {
        Self { seed: 42 }
    }
}

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(Time::<Fixed>::from_hz(60.0))
            .insert_resource(DeterministicRng::new(self.seed))
            .add_plugins(CombatPlugin)
            .add_plugins(BrainPlugin);
    }
}

/// Headless App для тестов и dedicated-сервера.
pub fn create_headless_app(seed: u64) -> App {
    let mut app = App::new();
    app.add_plugins(MinimalPlugins);
    app.add_plugins(SimulationPlugin { seed });
    app
}
