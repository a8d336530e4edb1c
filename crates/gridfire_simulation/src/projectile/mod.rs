//! Projectile module — баллистический снаряд
//!
//! ECS ответственность:
//! - Components: Projectile (kinematics + countdown), ProjectileProperties (тип)
//! - Systems: launch → instant impact → per-tick flight (flight.rs)
//! - Events: launch intents внутрь, impact/vanish/suppression/explosion наружу
//!
//! Host ответственность (вне core):
//! - Rendering/audio по событиям
//! - Damage application по ProjectileImpact
//! - Persistence полей снаряда

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

pub mod events;
pub mod flight;

pub use events::{
    ExplosionTriggered, InstantImpactRequest, ProjectileImpact, ProjectileLaunch,
    ProjectileVanished, SuppressionApplied, VanishReason,
};

use crate::grid::cell_of;
use crate::occupant::FillCategory;
use crate::trajectory;

/// Параметры area explosion для explosive payload
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ExplosionSpec {
    pub radius: f32,
}

/// Свойства типа снаряда (аналог def'а)
#[derive(Component, Debug, Clone, Serialize, Deserialize)]
pub struct ProjectileProperties {
    /// Базовая скорость (клетки на 100 тиков); подставляется если
    /// launch не задал shot_speed
    pub speed: f32,
    /// Базовый урон — он же база для suppression
    pub damage_amount: f32,
    /// Armor penetration для расчёта suppression (0..1)
    pub armor_penetration: f32,
    /// Overhead/mortar: игнорирует препятствия по пути, блокируется
    /// thick roof над точкой падения
    pub fly_overhead: bool,
    /// Отключает minimum-collision-distance guard
    pub always_free_intercept: bool,
    /// Explosive payload: area explosion при impact
    pub explosive: Option<ExplosionSpec>,
    /// Вертикальный draw-offset, добавляется к exact position
    pub altitude: f32,
}

impl Default for ProjectileProperties {
    fn default() -> Self {
        Self {
            speed: 50.0,
            damage_amount: 10.0,
            armor_penetration: 0.0,
            fly_overhead: false,
            always_free_intercept: false,
            explosive: None,
            altitude: 1.0,
        }
    }
}

/// Состояние per-tick state machine полёта
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlightState {
    #[default]
    Flying,
    /// Идёт segment interception между позициями тика
    InterceptCheck,
    /// Терминальное: попадание (в occupant или в землю)
    Impacted,
    /// Терминальное: вылет за границы карты (vanish без эффектов)
    OutOfBounds,
    /// Терминальное: полёт окончен без impact-эффектов (thick roof)
    Landed,
}

/// Снаряд в полёте
///
/// Создаётся при launch, мутируется только per-tick системой,
/// уничтожается при impact или out-of-bounds. Инвариант:
/// ticks_to_impact строго падает на 1 за тик пока !landed.
#[derive(Component, Debug, Clone)]
pub struct Projectile {
    pub origin: Vec3,
    pub destination: Vec3,
    /// Weak reference: launcher мог быть уничтожен
    pub launcher: Option<Entity>,
    /// Изначально выцеленный объект
    pub assigned_target: Option<Entity>,
    /// Miss target (промах перенацелен); Full-fill объекты отклоняются
    pub assigned_miss_target: Option<Entity>,
    pub shot_angle: f32,
    pub shot_height: f32,
    pub shot_speed: f32,
    pub ticks_to_impact: i32,
    pub starting_ticks: i32,
    pub landed: bool,
    /// Mid-flight interception checks включены
    pub can_free_intercept: bool,
    /// Текущая grid-позиция (snap каждый тик)
    pub position: IVec3,
    pub state: FlightState,
}

impl Projectile {
    /// Конструирует снаряд в момент запуска
    ///
    /// Неположительная shot_speed (sentinel «не задана», либо нулевая
    /// скорость, на которой countdown бы не сходился) нормализуется
    /// к базовой скорости типа; countdown считается один раз здесь.
    #[allow(clippy::too_many_arguments)]
    pub fn launched(
        launcher: Option<Entity>,
        origin: Vec3,
        destination: Vec3,
        shot_angle: f32,
        shot_height: f32,
        shot_speed: f32,
        props: &ProjectileProperties,
        can_free_intercept: bool,
    ) -> Self {
        let shot_speed = if shot_speed <= 0.0 { props.speed } else { shot_speed };
        let starting_ticks =
            trajectory::starting_ticks_to_impact(origin, destination, shot_angle, shot_speed);
        Self {
            origin,
            destination,
            launcher,
            assigned_target: None,
            assigned_miss_target: None,
            shot_angle,
            shot_height,
            shot_speed,
            ticks_to_impact: starting_ticks,
            starting_ticks,
            landed: false,
            can_free_intercept,
            position: cell_of(origin),
            state: FlightState::Flying,
        }
    }

    /// Точная позиция на текущем тике (+ altitude offset типа)
    pub fn exact_position(&self, altitude: f32) -> Vec3 {
        trajectory::exact_position(
            self.origin,
            self.destination,
            self.ticks_to_impact,
            self.starting_ticks,
            altitude,
        )
    }

    /// Горизонтальная дистанция от origin до текущей позиции
    pub fn distance_from_origin(&self) -> f32 {
        let current = self.exact_position(0.0);
        trajectory::horizontal(current - self.origin).length()
    }

    pub fn destination_cell(&self) -> IVec3 {
        cell_of(self.destination)
    }

    /// Назначает miss target; full-fill объект — нелегитимная цель
    /// промаха, присвоение отклоняется
    pub fn set_miss_target(&mut self, target: Entity, fill: FillCategory) {
        if fill == FillCategory::Full {
            return;
        }
        self.assigned_miss_target = Some(target);
    }
}

/// Flight Plugin
///
/// Регистрирует events и flight-системы в FixedUpdate (60Hz).
///
/// Порядок выполнения (chain):
/// 1. launch_projectiles — spawn снарядов из launch intents
/// 2. process_instant_impacts — синхронный forced impact
/// 3. tick_projectiles — per-tick state machine полёта
pub struct FlightPlugin;

impl Plugin for FlightPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<ProjectileLaunch>()
            .add_event::<InstantImpactRequest>()
            .add_event::<ProjectileImpact>()
            .add_event::<ProjectileVanished>()
            .add_event::<SuppressionApplied>()
            .add_event::<ExplosionTriggered>();

        app.add_systems(
            FixedUpdate,
            (
                flight::launch_projectiles,
                flight::process_instant_impacts,
                flight::tick_projectiles,
            )
                .chain(), // Последовательное выполнение
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launched_normalizes_negative_speed() {
        let props = ProjectileProperties {
            speed: 50.0,
            ..Default::default()
        };
        let proj = Projectile::launched(
            None,
            Vec3::ZERO,
            Vec3::new(10.0, 0.0, 0.0),
            0.0,
            0.3,
            -1.0, // sentinel
            &props,
            true,
        );

        assert!((proj.shot_speed - 50.0).abs() < 1e-6);
        assert_eq!(proj.starting_ticks, 20);
        assert_eq!(proj.ticks_to_impact, 20);
    }

    #[test]
    fn test_launched_normalizes_zero_speed() {
        // Нулевая скорость дала бы бесконечный countdown
        let props = ProjectileProperties {
            speed: 50.0,
            ..Default::default()
        };
        let proj = Projectile::launched(
            None,
            Vec3::ZERO,
            Vec3::new(10.0, 0.0, 0.0),
            0.0,
            0.3,
            0.0,
            &props,
            true,
        );

        assert!((proj.shot_speed - 50.0).abs() < 1e-6);
        assert_eq!(proj.starting_ticks, 20);
    }

    #[test]
    fn test_launched_keeps_explicit_speed() {
        let props = ProjectileProperties::default();
        let proj = Projectile::launched(
            None,
            Vec3::ZERO,
            Vec3::new(10.0, 0.0, 0.0),
            0.0,
            0.3,
            100.0,
            &props,
            true,
        );
        assert!((proj.shot_speed - 100.0).abs() < 1e-6);
        assert_eq!(proj.starting_ticks, 10);
    }

    #[test]
    fn test_exact_position_starts_at_origin() {
        let props = ProjectileProperties::default();
        let origin = Vec3::new(2.0, 0.0, 3.0);
        let proj = Projectile::launched(
            None,
            origin,
            Vec3::new(12.0, 0.0, 3.0),
            0.0,
            0.3,
            -1.0,
            &props,
            true,
        );
        assert!((proj.exact_position(0.0) - origin).length() < 1e-4);
    }

    #[test]
    fn test_miss_target_rejects_full_fill() {
        let props = ProjectileProperties::default();
        let mut proj = Projectile::launched(
            None,
            Vec3::ZERO,
            Vec3::new(5.0, 0.0, 0.0),
            0.0,
            0.3,
            -1.0,
            &props,
            true,
        );
        let wall = Entity::from_raw(1);
        let pawn = Entity::from_raw(2);

        proj.set_miss_target(wall, FillCategory::Full);
        assert_eq!(proj.assigned_miss_target, None);

        proj.set_miss_target(pawn, FillCategory::None);
        assert_eq!(proj.assigned_miss_target, Some(pawn));
    }
}
