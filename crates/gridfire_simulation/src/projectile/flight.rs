//! Flight systems — per-tick state machine снаряда
//!
//! Порядок за тик (пока не landed):
//! 1. Позиция до/после декремента countdown
//! 2. Fast-exit при вылете за границы (vanish, приоритет над interception)
//! 3. Segment interception между позициями тика (0.2-unit sub-steps,
//!    dedup клеток, перпендикулярно-смежные клетки для существ)
//! 4. Snap grid-позиции
//! 5. Финальное impact resolution при countdown == 0
//!
//! Вся случайность (scatter, plant rolls) — из DeterministicRng.

use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use super::events::{
    ExplosionTriggered, InstantImpactRequest, ProjectileImpact, ProjectileLaunch,
    ProjectileVanished, SuppressionApplied, VanishReason,
};
use super::{FlightState, Projectile, ProjectileProperties};
use crate::grid::{cell_center, cell_of, manhattan, RoofKind, SpatialGrid};
use crate::occupant::{
    AltitudeLayer, FillCategory, OccupantKind, OccupantProfile, ShieldBelt, ShieldState,
    Suppressable, WorldPosition,
};
use crate::trajectory::{self, horizontal};
use crate::DeterministicRng;

/// Пространственное разрешение segment walk (клетки)
const SEGMENT_STEP: f32 = 0.2;

/// Множитель шанса столкновения с деревом
const PLANT_COLLISION_FACTOR: f32 = 0.5;

/// Нормировочная дистанция для plant collision chance
const PLANT_RANGE_NORM: f32 = 40.0;

/// Максимальный радиус minimum-collision-distance guard
const MAX_GUARD_RADIUS: f32 = 12.0;

type OccupantData = (
    &'static OccupantProfile,
    &'static WorldPosition,
    Option<&'static mut Suppressable>,
    Option<&'static ShieldBelt>,
);

/// Query occupant-стороны: flight core мутирует только Suppressable
pub type OccupantQuery<'w, 's> = Query<'w, 's, OccupantData>;

/// Исходящие события flight core (одним SystemParam)
#[derive(SystemParam)]
pub struct FlightEvents<'w> {
    pub impacts: EventWriter<'w, ProjectileImpact>,
    pub vanishes: EventWriter<'w, ProjectileVanished>,
    pub suppressions: EventWriter<'w, SuppressionApplied>,
    pub explosions: EventWriter<'w, ExplosionTriggered>,
}

/// System: spawn снарядов из launch intents
///
/// Нормализует sentinel-скорость, выводит destination из клетки цели
/// (+ deterministic scatter) если явная точка не задана.
pub fn launch_projectiles(
    mut commands: Commands,
    mut rng: ResMut<DeterministicRng>,
    mut launches: EventReader<ProjectileLaunch>,
    occupants: Query<(Option<&OccupantProfile>, &WorldPosition)>,
) {
    for ev in launches.read() {
        let destination = match ev.destination {
            Some(d) => d,
            None => match ev.target.and_then(|t| occupants.get(t).ok()) {
                Some((_, pos)) => {
                    let jitter = Vec3::new(
                        rng.rng.gen_range(-0.3..0.3),
                        0.0,
                        rng.rng.gen_range(-0.3..0.3),
                    );
                    cell_center(cell_of(pos.0)) + jitter
                }
                None => {
                    crate::log_warning(
                        "ProjectileLaunch without destination or valid target, skipping",
                    );
                    continue;
                }
            },
        };

        let mut proj = Projectile::launched(
            ev.launcher,
            ev.origin,
            destination,
            ev.shot_angle,
            ev.shot_height,
            ev.shot_speed,
            &ev.properties,
            ev.can_free_intercept,
        );
        proj.assigned_target = ev.target;
        if let Some(miss) = ev.miss_target {
            let fill = occupants
                .get(miss)
                .ok()
                .and_then(|(p, _)| p.map(|p| p.fill))
                .unwrap_or(FillCategory::None);
            proj.set_miss_target(miss, fill);
        }

        crate::log(&format!(
            "Projectile launched: origin={:?} dest={:?} ticks={}",
            ev.origin, destination, proj.starting_ticks
        ));
        commands.spawn((proj, ev.properties.clone()));
    }
}

/// System: forced instant impact (zero-distance shots)
///
/// Пропускает оставшийся полёт: out-of-bounds destination → vanish,
/// иначе snap на клетку назначения и синхронное финальное resolution.
pub fn process_instant_impacts(
    mut commands: Commands,
    grid: Res<SpatialGrid>,
    mut requests: EventReader<InstantImpactRequest>,
    mut projectiles: Query<(&mut Projectile, &ProjectileProperties)>,
    mut occupants: OccupantQuery,
    mut fx: FlightEvents,
) {
    for req in requests.read() {
        let Ok((mut proj, props)) = projectiles.get_mut(req.projectile) else {
            continue;
        };
        if proj.landed {
            continue;
        }

        let dest_cell = proj.destination_cell();
        if !grid.in_bounds(dest_cell) {
            proj.landed = true;
            proj.state = FlightState::OutOfBounds;
            fx.vanishes.write(ProjectileVanished {
                projectile: req.projectile,
                cell: dest_cell,
                reason: VanishReason::OutOfBounds,
            });
            commands.entity(req.projectile).despawn();
            continue;
        }

        proj.ticks_to_impact = 0;
        proj.position = dest_cell;
        impact_something(
            req.projectile,
            &mut proj,
            props,
            &grid,
            &mut occupants,
            &mut commands,
            &mut fx,
        );
    }
}

/// System: per-tick симуляция всех живых снарядов
pub fn tick_projectiles(
    mut commands: Commands,
    grid: Res<SpatialGrid>,
    mut rng: ResMut<DeterministicRng>,
    mut projectiles: Query<(Entity, &mut Projectile, &ProjectileProperties)>,
    mut occupants: OccupantQuery,
    mut fx: FlightEvents,
) {
    for (entity, mut proj, props) in projectiles.iter_mut() {
        if proj.landed {
            continue;
        }

        let last_pos = proj.exact_position(props.altitude);
        proj.ticks_to_impact -= 1;
        let new_pos = proj.exact_position(props.altitude);

        // Fast-exit: вылет за границы карты, vanish без impact-эффектов
        if !grid.in_bounds(cell_of(new_pos)) {
            proj.ticks_to_impact += 1;
            proj.position = cell_of(new_pos);
            proj.landed = true;
            proj.state = FlightState::OutOfBounds;
            fx.vanishes.write(ProjectileVanished {
                projectile: entity,
                cell: proj.position,
                reason: VanishReason::OutOfBounds,
            });
            crate::log(&format!(
                "Projectile {:?} left map bounds at {:?}",
                entity, proj.position
            ));
            commands.entity(entity).despawn();
            continue;
        }

        // Overhead снаряды перехват не проверяют вовсе
        if !props.fly_overhead && proj.can_free_intercept {
            proj.state = FlightState::InterceptCheck;
            if check_for_free_intercept_between(
                entity,
                last_pos,
                new_pos,
                &mut proj,
                props,
                &grid,
                &mut rng.rng,
                &mut occupants,
                &mut commands,
                &mut fx,
            ) {
                continue;
            }
            proj.state = FlightState::Flying;
        }

        proj.position = cell_of(new_pos);

        if proj.ticks_to_impact <= 0 {
            let dest_cell = proj.destination_cell();
            if grid.in_bounds(dest_cell) {
                proj.position = dest_cell;
            }
            impact_something(
                entity,
                &mut proj,
                props,
                &grid,
                &mut occupants,
                &mut commands,
                &mut fx,
            );
        }
    }
}

/// Segment interception между позициями тика
///
/// Одна клетка — нет проверки; Manhattan 1 — прямая проверка новой
/// клетки; иначе walk сегмента шагами 0.2 с дедупликацией клеток.
/// Checked-cells буфер — per-call local, не shared scratch.
#[allow(clippy::too_many_arguments)]
fn check_for_free_intercept_between(
    entity: Entity,
    last_pos: Vec3,
    new_pos: Vec3,
    proj: &mut Projectile,
    props: &ProjectileProperties,
    grid: &SpatialGrid,
    rng: &mut ChaCha8Rng,
    occupants: &mut OccupantQuery,
    commands: &mut Commands,
    fx: &mut FlightEvents,
) -> bool {
    let last_cell = cell_of(last_pos);
    let new_cell = cell_of(new_pos);
    if new_cell == last_cell {
        return false;
    }
    if !grid.in_bounds(last_cell) || !grid.in_bounds(new_cell) {
        return false;
    }
    if manhattan(new_cell, last_cell) == 1 {
        return check_for_free_intercept(
            entity, new_cell, proj, props, grid, rng, occupants, commands, fx,
        );
    }

    let flight_vec = new_pos - last_pos;
    let section_vec = flight_vec.normalize_or_zero() * SEGMENT_STEP;
    let num_sections = (horizontal(flight_vec).length() / SEGMENT_STEP) as i32;
    let mut checked_cells: Vec<IVec3> = Vec::new();
    let mut current = last_pos;

    for _ in 0..=num_sections {
        current += section_vec;
        let cell = cell_of(current);
        if !checked_cells.contains(&cell) {
            if check_for_free_intercept(
                entity, cell, proj, props, grid, rng, occupants, commands, fx,
            ) {
                return true;
            }
            checked_cells.push(cell);
        }
        if cell == new_cell {
            return false;
        }
    }
    false
}

/// Горизонтальная дистанция origin→цель (assigned target если жив,
/// иначе destination) — база для guard-радиуса
fn distance_to_target(proj: &Projectile, occupants: &OccupantQuery) -> f32 {
    if let Some(target) = proj.assigned_target {
        if let Ok((_, pos, ..)) = occupants.get(target) {
            return horizontal(pos.0 - proj.origin).length();
        }
    }
    horizontal(proj.destination - proj.origin).length()
}

/// Per-cell interception check
///
/// Guard: в пределах минимального радиуса от origin перехват невозможен
/// (клетка дула стрелка не self-collide), кроме always_free_intercept
/// типов. Кандидаты: occupants клетки + существа перпендикулярно-смежных
/// клеток (расширение cross-section для angled shots).
#[allow(clippy::too_many_arguments)]
fn check_for_free_intercept(
    entity: Entity,
    cell: IVec3,
    proj: &mut Projectile,
    props: &ProjectileProperties,
    grid: &SpatialGrid,
    rng: &mut ChaCha8Rng,
    occupants: &mut OccupantQuery,
    commands: &mut Commands,
    fx: &mut FlightEvents,
) -> bool {
    let dist_from_origin = horizontal(cell_center(cell) - proj.origin).length();

    // Minimum collision distance guard
    if !props.always_free_intercept {
        let dist_to_target = distance_to_target(proj, occupants);
        let guard_radius = if dist_to_target <= 1.0 {
            1.0
        } else {
            MAX_GUARD_RADIUS.min(dist_to_target / 2.0)
        };
        if dist_from_origin < guard_radius {
            return false;
        }
    }

    let mut candidates: Vec<Entity> = grid.occupants_at(cell).to_vec();

    // Существа из смежных клеток перпендикулярно доминирующей оси полёта
    let shot_vec = (proj.destination - proj.origin).normalize_or_zero();
    let offsets = if shot_vec.x.abs() < shot_vec.z.abs() {
        [IVec3::new(1, 0, 0), IVec3::new(-1, 0, 0)]
    } else {
        [IVec3::new(0, 0, 1), IVec3::new(0, 0, -1)]
    };
    for offset in offsets {
        let adj = cell + offset;
        if !grid.in_bounds(adj) {
            continue;
        }
        for &e in grid.occupants_at(adj) {
            if candidates.contains(&e) {
                continue;
            }
            if let Ok((profile, ..)) = occupants.get(e) {
                if profile.kind == OccupantKind::Creature {
                    candidates.push(e);
                }
            }
        }
    }

    if candidates.is_empty() {
        return false;
    }

    // Высота считается один раз и только когда кандидаты есть
    let height = trajectory::projectile_height(
        proj.shot_height,
        proj.distance_from_origin(),
        proj.shot_angle,
        proj.shot_speed,
    );
    // Impact при перехвате атрибутируется проверяемой клетке
    proj.position = cell;

    for e in candidates {
        let (kind, fill, fill_percent, altitude) = match occupants.get(e) {
            Ok((profile, ..)) => (
                profile.kind,
                profile.fill,
                profile.fill_percent,
                profile.altitude,
            ),
            Err(_) => continue,
        };

        // Full fill перехватывает независимо от высоты
        if fill == FillCategory::Full {
            impact(entity, Some(e), proj, props, commands, fx);
            return true;
        }

        // Деревья: probabilistic chance, растёт с дистанцией
        if kind == OccupantKind::Plant && altitude == AltitudeLayer::Building {
            let chance = fill_percent
                * (dist_from_origin / PLANT_RANGE_NORM).clamp(0.0, 1.0 / PLANT_COLLISION_FACTOR)
                * PLANT_COLLISION_FACTOR;
            if rng.gen::<f32>() < chance {
                impact(entity, Some(e), proj, props, commands, fx);
                return true;
            }
        }

        // Существа всегда; прочие occupants с fill — после середины полёта
        // (fill_percent > 0 отсекает эффекты/моты без collision-объёма)
        if kind == OccupantKind::Creature
            || (proj.ticks_to_impact < proj.starting_ticks / 2 && fill_percent > 0.0)
        {
            return impact_through_body_size(
                entity, e, height, proj, props, occupants, commands, fx,
            );
        }
    }
    false
}

/// Body-size impact resolution
///
/// Для существ: suppression («felt fire») применяется при каждом
/// check, независимо от попадания — кроме носителей активного
/// personal shield. Попадание: перпендикуляр до линии полёта в
/// пределах collision width И высота снаряда ниже collision height.
#[allow(clippy::too_many_arguments)]
fn impact_through_body_size(
    entity: Entity,
    target: Entity,
    height: f32,
    proj: &mut Projectile,
    props: &ProjectileProperties,
    occupants: &mut OccupantQuery,
    commands: &mut Commands,
    fx: &mut FlightEvents,
) -> bool {
    let Ok((profile, pos, suppressable, shield)) = occupants.get_mut(target) else {
        return false;
    };

    if profile.kind == OccupantKind::Creature {
        // Активный шилд глушит suppression; resetting — не защищает
        let shield_active =
            profile.humanlike && shield.is_some_and(|s| s.state == ShieldState::Active);
        if !shield_active {
            if let Some(mut sup) = suppressable {
                let amount = props.damage_amount
                    * (1.0 - (profile.armor - props.armor_penetration).clamp(0.0, 1.0));
                let origin_cell = cell_of(proj.origin);
                sup.add_suppression(amount, origin_cell);
                fx.suppressions.write(SuppressionApplied {
                    target,
                    amount,
                    origin_cell,
                });
            }
        }

        let dist_to_line =
            trajectory::distance_to_flight_line(pos.0, proj.origin, proj.destination);
        if dist_to_line <= profile.collision_width && height < profile.collision_height {
            impact(entity, Some(target), proj, props, commands, fx);
            return true;
        }
    }

    // Любой occupant с fill: перехват если снаряд ниже collision height
    // (Full — безусловно)
    if profile.fill_percent > 0.0 || profile.fill == FillCategory::Full {
        if height < profile.collision_height || profile.fill == FillCategory::Full {
            impact(entity, Some(target), proj, props, commands, fx);
            return true;
        }
    }
    false
}

/// Финальное impact resolution при countdown == 0
///
/// Overhead + thick roof → vanish без эффектов. Иначе: assigned target
/// в клетке падения → прямой body-size check; существо в клетке;
/// при промахе — обход остальных occupants по порядку; в конце —
/// земля. Любой исход уничтожает снаряд.
fn impact_something(
    entity: Entity,
    proj: &mut Projectile,
    props: &ProjectileProperties,
    grid: &SpatialGrid,
    occupants: &mut OccupantQuery,
    commands: &mut Commands,
    fx: &mut FlightEvents,
) {
    // Mortar-style полёт блокируется thick roof
    if props.fly_overhead && grid.roof_at(proj.position) == Some(RoofKind::Thick) {
        proj.landed = true;
        proj.state = FlightState::Landed;
        fx.vanishes.write(ProjectileVanished {
            projectile: entity,
            cell: proj.position,
            reason: VanishReason::ThickRoof,
        });
        crate::log(&format!(
            "Projectile {:?} blocked by thick roof at {:?}",
            entity, proj.position
        ));
        commands.entity(entity).despawn();
        return;
    }

    let height = trajectory::projectile_height(
        proj.shot_height,
        proj.distance_from_origin(),
        proj.shot_angle,
        proj.shot_speed,
    );

    // Приоритетная цель: assigned target если всё ещё в клетке падения
    // (детерминированное разрешение без probabilistic checks), иначе
    // первое существо в клетке
    let mut priority: Option<Entity> = None;
    if let Some(target) = proj.assigned_target {
        let target_in_cell = occupants
            .get(target)
            .map_or(false, |(_, pos, ..)| cell_of(pos.0) == proj.position);
        if target_in_cell {
            priority = Some(target);
        }
    }
    if priority.is_none() {
        priority = grid.occupants_at(proj.position).iter().copied().find(|&e| {
            occupants
                .get(e)
                .map_or(false, |(p, ..)| p.kind == OccupantKind::Creature)
        });
    }
    if let Some(target) = priority {
        if impact_through_body_size(
            entity, target, height, proj, props, occupants, commands, fx,
        ) {
            return;
        }
    }

    // Промах по приоритетной цели (или её отсутствие): остальные
    // occupants по порядку регистрации; пустая клетка — сразу земля
    let list: Vec<Entity> = grid.occupants_at(proj.position).to_vec();
    if !list.is_empty() && height > 0.0 {
        for e in list {
            if priority == Some(e) {
                continue;
            }
            if impact_through_body_size(entity, e, height, proj, props, occupants, commands, fx)
            {
                return;
            }
        }
    }
    impact(entity, None, proj, props, commands, fx);
}

/// Терминальный impact: explosion для explosive payload, событие
/// наружу, despawn (vanish) — успешный или в землю
fn impact(
    entity: Entity,
    hit: Option<Entity>,
    proj: &mut Projectile,
    props: &ProjectileProperties,
    commands: &mut Commands,
    fx: &mut FlightEvents,
) {
    proj.landed = true;
    proj.state = FlightState::Impacted;

    if let Some(explosion) = &props.explosive {
        fx.explosions.write(ExplosionTriggered {
            center: proj.position,
            launcher: proj.launcher,
            radius: explosion.radius,
        });
    }
    fx.impacts.write(ProjectileImpact {
        projectile: entity,
        launcher: proj.launcher,
        cell: proj.position,
        hit,
    });
    crate::log(&format!(
        "Projectile {:?} impact at {:?} (hit: {:?})",
        entity, proj.position, hit
    ));
    commands.entity(entity).despawn();
}
