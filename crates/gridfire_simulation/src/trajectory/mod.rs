//! Trajectory engine — чистая баллистическая математика
//!
//! Pure functions без ECS state: время полёта, позиция на данном тике,
//! параболическая высота с учётом gravity drop. Collision resolver
//! (projectile::flight) строит на этом interception checks.
//!
//! Масштаб: скорость задаётся в клетках на 100 тиков, т.е.
//! `speed / 100` клеток за тик.

use bevy::prelude::*;

/// Гравитационная константа (клетки/сек²)
pub const GRAVITY: f32 = 9.8;

/// Перевод speed → клетки за тик
pub const SPEED_TICK_SCALE: f32 = 100.0;

/// Горизонтальная проекция вектора (y обнуляется)
pub fn horizontal(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z)
}

/// Полное время полёта в тиках
///
/// `distance / (cos(angle) · speed / 100)`, округлённое, минимум 1 —
/// ноль и отрицательные значения невозможны. Ноль/отрицательная
/// скорость должна быть нормализована caller'ом до вызова (launch
/// подставляет базовую скорость типа снаряда); здесь только clamp
/// от деления на ноль.
pub fn starting_ticks_to_impact(origin: Vec3, destination: Vec3, angle: f32, speed: f32) -> i32 {
    let speed = speed.max(f32::EPSILON);
    let cells_per_tick = angle.cos() * speed / SPEED_TICK_SCALE;
    let ticks = ((origin - destination).length() / cells_per_tick).round() as i32;
    ticks.max(1)
}

/// Точная позиция снаряда на данном тике
///
/// Линейная интерполяция origin→destination по elapsed fraction
/// `1 − ticks_to_impact/starting_ticks`, плюс фиксированный altitude
/// offset по вертикали (draw-высота типа снаряда).
pub fn exact_position(
    origin: Vec3,
    destination: Vec3,
    ticks_to_impact: i32,
    starting_ticks: i32,
    altitude: f32,
) -> Vec3 {
    let elapsed = 1.0 - ticks_to_impact as f32 / starting_ticks as f32;
    origin + (destination - origin) * elapsed + Vec3::Y * altitude
}

/// Параболическая высота снаряда на given горизонтальной дистанции
///
/// `base + d·tan(angle) − g·d² / (2·(speed·cos(angle))²)`.
/// Caller обязан не звать с angle ≈ 90° (cos → 0).
pub fn projectile_height(base_height: f32, distance: f32, angle: f32, speed: f32) -> f32 {
    base_height + distance * angle.tan()
        - GRAVITY * distance.powi(2) / (2.0 * (speed * angle.cos()).powi(2))
}

/// Перпендикулярное расстояние точки до бесконечной линии полёта
/// origin→destination (горизонтальная проекция, point-to-line formula)
pub fn distance_to_flight_line(point: Vec3, origin: Vec3, destination: Vec3) -> f32 {
    let dz = destination.z - origin.z;
    let dx = destination.x - origin.x;
    let denom = (dz * dz + dx * dx).sqrt();
    if denom < f32::EPSILON {
        // origin и destination совпадают горизонтально
        return horizontal(point - origin).length();
    }
    (dz * point.x - dx * point.z + destination.x * origin.z - destination.z * origin.x).abs() / denom
}
