//! Projectile events — наружная поверхность flight core
//!
//! Внутрь: ProjectileLaunch, InstantImpactRequest.
//! Наружу: ProjectileImpact, ProjectileVanished, SuppressionApplied,
//! ExplosionTriggered. Host-слои (rendering, audio, damage) подписываются
//! на исходящие события; core их сам не интерпретирует.

use bevy::prelude::*;

use super::ProjectileProperties;

/// Event: запрос на запуск снаряда
///
/// Если `destination` не задан — берётся центр клетки цели с
/// deterministic ±0.3 scatter из seeded RNG. `shot_speed < 0` —
/// sentinel «использовать базовую скорость типа».
#[derive(Event, Debug, Clone)]
pub struct ProjectileLaunch {
    /// Кто стреляет (weak, допускается None)
    pub launcher: Option<Entity>,

    pub origin: Vec3,

    /// Изначально выцеленный объект
    pub target: Option<Entity>,

    /// Явная точка назначения (None → клетка target'а + scatter)
    pub destination: Option<Vec3>,

    /// Перенацеленный промах (full-fill цели отклоняются)
    pub miss_target: Option<Entity>,

    pub properties: ProjectileProperties,

    pub shot_angle: f32,
    pub shot_height: f32,
    pub shot_speed: f32,

    /// Mid-flight interception включён
    pub can_free_intercept: bool,
}

/// Event: форсировать мгновенный impact (zero-distance shots)
///
/// Пропускает оставшийся полёт и синхронно запускает финальное
/// impact resolution в точке назначения.
#[derive(Event, Debug, Clone)]
pub struct InstantImpactRequest {
    pub projectile: Entity,
}

/// Event: снаряд разрешился как impact
///
/// `hit == None` — попадание в землю/terrain (всё равно производит
/// эффекты, например area explosion).
#[derive(Event, Debug, Clone)]
pub struct ProjectileImpact {
    pub projectile: Entity,
    pub launcher: Option<Entity>,
    pub cell: IVec3,
    pub hit: Option<Entity>,
}

/// Причина исчезновения снаряда без impact-эффектов
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VanishReason {
    /// Траектория вышла за границы карты
    OutOfBounds,
    /// Overhead снаряд заблокирован thick roof над точкой падения
    ThickRoof,
}

/// Event: снаряд исчез без impact-эффектов
#[derive(Event, Debug, Clone)]
pub struct ProjectileVanished {
    pub projectile: Entity,
    pub cell: IVec3,
    pub reason: VanishReason,
}

/// Event: существу добавлено suppression («felt fire»)
///
/// Применяется при каждом body-size check против существа,
/// независимо от фактического попадания.
#[derive(Event, Debug, Clone)]
pub struct SuppressionApplied {
    pub target: Entity,
    pub amount: f32,
    /// Клетка, откуда пришёл выстрел
    pub origin_cell: IVec3,
}

/// Event: explosive payload сдетонировал
#[derive(Event, Debug, Clone)]
pub struct ExplosionTriggered {
    pub center: IVec3,
    pub launcher: Option<Entity>,
    pub radius: f32,
}
