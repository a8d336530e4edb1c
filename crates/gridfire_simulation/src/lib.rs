//! GRIDFIRE Simulation Core
//!
//! Headless баллистическая симуляция на Bevy 0.16: полёт снарядов по
//! клеточной сетке, per-tick interception против terrain/cover/существ,
//! body-size impact resolution, suppression.
//!
//! Архитектура:
//! - ECS = simulation layer (trajectory, collision, suppression rules)
//! - Host = rendering/audio/damage/persistence (подписка на events)

use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::time::Duration;

// Публичные модули
pub mod grid;
pub mod logger;
pub mod occupant;
pub mod projectile;
pub mod trajectory;

// Re-export базовых типов для удобства
pub use grid::{cell_center, cell_of, RoofKind, SpatialGrid};
pub use occupant::{
    AltitudeLayer, FillCategory, OccupantKind, OccupantProfile, ShieldBelt, ShieldState,
    Suppressable, WorldPosition,
};
pub use projectile::{
    ExplosionSpec, ExplosionTriggered, FlightPlugin, FlightState, InstantImpactRequest,
    Projectile, ProjectileImpact, ProjectileLaunch, ProjectileProperties, ProjectileVanished,
    SuppressionApplied, VanishReason,
};

// Re-export logger API
pub use logger::{
    init_logger, log, log_error, log_info, log_warning, set_log_level, set_logger, LogLevel,
    LogPrinter,
};

/// Частота симуляции (тиков в секунду)
pub const TICKS_PER_SECOND: f64 = 60.0;

/// Главный plugin симуляции
pub struct SimulationPlugin;

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        // Fixed timestep 60Hz для simulation tick
        app.insert_resource(Time::<Fixed>::from_hz(TICKS_PER_SECOND));

        // Детерминистичный RNG и grid — только если host их ещё не вставил
        if !app.world().contains_resource::<DeterministicRng>() {
            app.insert_resource(DeterministicRng::new(42));
        }
        app.init_resource::<SpatialGrid>();

        app.add_plugins(FlightPlugin);
    }
}

/// Детерминистичный RNG resource (seeded)
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

/// Создаёт minimal Bevy App для headless симуляции
///
/// Время продвигается вручную ровно на период fixed timestep —
/// один `app.update()` == ровно один simulation tick, независимо
/// от wall clock (важно для точных tick-count тестов).
pub fn create_headless_app(seed: u64) -> App {
    let mut app = App::new();
    init_logger();
    app.add_plugins(MinimalPlugins)
        .insert_resource(DeterministicRng::new(seed))
        .insert_resource(Time::<Fixed>::from_hz(TICKS_PER_SECOND))
        .insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_secs_f64(
            1.0 / TICKS_PER_SECOND,
        )));

    // Первый апдейт часов Bevy только инициализирует clock (delta = 0),
    // поэтому праймим Time<Real> заранее — иначе первый app.update()
    // не запустил бы ни одного fixed tick.
    app.world_mut()
        .resource_mut::<Time<bevy::time::Real>>()
        .update_with_duration(Duration::ZERO);

    app
}

/// Snapshot мира для сравнения детерминизма
///
/// Собирает компоненты в детерминированный байтовый формат
/// (сортировка по Entity ID, сериализация через Debug).
pub fn world_snapshot<T: Component>(world: &mut World) -> Vec<u8>
where
    T: std::fmt::Debug,
{
    let mut snapshot = Vec::new();

    let mut query = world.query::<(Entity, &T)>();
    let mut entities: Vec<_> = query.iter(world).collect();

    entities.sort_by_key(|(entity, _)| entity.index());

    for (entity, component) in entities {
        snapshot.extend_from_slice(&entity.index().to_le_bytes());
        snapshot.extend_from_slice(format!("{:?}", component).as_bytes());
    }

    snapshot
}
