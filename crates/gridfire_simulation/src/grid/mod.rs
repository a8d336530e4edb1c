//! Spatial grid — внешний collaborator симуляции полёта
//!
//! Клеточная сетка карты: occupancy (cell → ordered occupant list),
//! границы карты, крыши. Flight core читает её только через queries
//! (occupants_at / in_bounds / roof_at) и никогда не мутирует —
//! registration API используют host-слой и тесты.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Тип крыши над клеткой
///
/// Thick блокирует overhead/mortar снаряды при финальном impact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoofKind {
    Thin,
    Thick,
}

/// Дискретная клетка для world-space позиции (floor по x/z, y обнуляется)
pub fn cell_of(pos: Vec3) -> IVec3 {
    IVec3::new(pos.x.floor() as i32, 0, pos.z.floor() as i32)
}

/// Центр клетки в world space (shifted на +0.5 по x/z)
pub fn cell_center(cell: IVec3) -> Vec3 {
    Vec3::new(cell.x as f32 + 0.5, 0.0, cell.z as f32 + 0.5)
}

/// Manhattan-расстояние между клетками
pub fn manhattan(a: IVec3, b: IVec3) -> i32 {
    let d = (a - b).abs();
    d.x + d.y + d.z
}

/// Occupancy grid карты (resource)
///
/// Ordered occupant lists: порядок вставки сохраняется, per-cell check
/// обходит кандидатов в этом порядке (first match wins).
#[derive(Resource)]
pub struct SpatialGrid {
    size: IVec3,
    occupants: HashMap<IVec3, Vec<Entity>>,
    roofs: HashMap<IVec3, RoofKind>,
}

impl Default for SpatialGrid {
    fn default() -> Self {
        Self::new(IVec3::new(250, 1, 250))
    }
}

impl SpatialGrid {
    pub fn new(size: IVec3) -> Self {
        Self {
            size,
            occupants: HashMap::new(),
            roofs: HashMap::new(),
        }
    }

    pub fn size(&self) -> IVec3 {
        self.size
    }

    /// Клетка внутри играбельных границ карты (по x/z)
    pub fn in_bounds(&self, cell: IVec3) -> bool {
        cell.x >= 0 && cell.x < self.size.x && cell.z >= 0 && cell.z < self.size.z
    }

    /// Occupants клетки в порядке регистрации (пустой slice если никого)
    pub fn occupants_at(&self, cell: IVec3) -> &[Entity] {
        self.occupants.get(&cell).map_or(&[], |v| v.as_slice())
    }

    pub fn roof_at(&self, cell: IVec3) -> Option<RoofKind> {
        self.roofs.get(&cell).copied()
    }

    /// Регистрирует occupant в клетке (идемпотентно)
    pub fn register(&mut self, entity: Entity, cell: IVec3) {
        let list = self.occupants.entry(cell).or_default();
        if !list.contains(&entity) {
            list.push(entity);
        }
    }

    pub fn deregister(&mut self, entity: Entity, cell: IVec3) {
        if let Some(list) = self.occupants.get_mut(&cell) {
            list.retain(|&e| e != entity);
        }
    }

    pub fn move_occupant(&mut self, entity: Entity, from: IVec3, to: IVec3) {
        self.deregister(entity, from);
        self.register(entity, to);
    }

    pub fn set_roof(&mut self, cell: IVec3, roof: RoofKind) {
        self.roofs.insert(cell, roof);
    }

    pub fn clear_roof(&mut self, cell: IVec3) {
        self.roofs.remove(&cell);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_of_floors_coordinates() {
        assert_eq!(cell_of(Vec3::new(5.9, 2.0, 0.1)), IVec3::new(5, 0, 0));
        assert_eq!(cell_of(Vec3::new(-0.1, 0.0, 3.0)), IVec3::new(-1, 0, 3));
    }

    #[test]
    fn test_cell_center_is_shifted() {
        assert_eq!(cell_center(IVec3::new(5, 0, 7)), Vec3::new(5.5, 0.0, 7.5));
    }

    #[test]
    fn test_manhattan_distance() {
        assert_eq!(manhattan(IVec3::new(1, 0, 1), IVec3::new(2, 0, 1)), 1);
        assert_eq!(manhattan(IVec3::new(0, 0, 0), IVec3::new(2, 0, 3)), 5);
    }

    #[test]
    fn test_bounds() {
        let grid = SpatialGrid::new(IVec3::new(10, 1, 10));
        assert!(grid.in_bounds(IVec3::new(0, 0, 0)));
        assert!(grid.in_bounds(IVec3::new(9, 0, 9)));
        assert!(!grid.in_bounds(IVec3::new(10, 0, 0)));
        assert!(!grid.in_bounds(IVec3::new(-1, 0, 5)));
    }

    #[test]
    fn test_occupant_registration_preserves_order() {
        let mut grid = SpatialGrid::default();
        let cell = IVec3::new(3, 0, 3);
        let a = Entity::from_raw(1);
        let b = Entity::from_raw(2);

        grid.register(a, cell);
        grid.register(b, cell);
        grid.register(a, cell); // идемпотентно
        assert_eq!(grid.occupants_at(cell), &[a, b]);

        grid.deregister(a, cell);
        assert_eq!(grid.occupants_at(cell), &[b]);
    }

    #[test]
    fn test_move_occupant() {
        let mut grid = SpatialGrid::default();
        let e = Entity::from_raw(7);
        let from = IVec3::new(1, 0, 1);
        let to = IVec3::new(2, 0, 1);

        grid.register(e, from);
        grid.move_occupant(e, from, to);
        assert!(grid.occupants_at(from).is_empty());
        assert_eq!(grid.occupants_at(to), &[e]);
    }

    #[test]
    fn test_roofs() {
        let mut grid = SpatialGrid::default();
        let cell = IVec3::new(4, 0, 4);
        assert_eq!(grid.roof_at(cell), None);

        grid.set_roof(cell, RoofKind::Thick);
        assert_eq!(grid.roof_at(cell), Some(RoofKind::Thick));

        grid.clear_roof(cell);
        assert_eq!(grid.roof_at(cell), None);
    }
}
