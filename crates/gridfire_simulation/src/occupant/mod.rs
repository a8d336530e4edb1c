//! Occupant metadata — внешний entity-metadata collaborator
//!
//! Компоненты на стороне occupants (существа, cover, растительность):
//! fill category, collision размеры из body size, armor, personal shield,
//! suppression state. Flight core читает их через queries и мутирует
//! только Suppressable (additive suppression call).

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Насколько объект структурно заполняет клетку
///
/// Full блокирует все interception checks безусловно (стена).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FillCategory {
    None,
    Partial,
    Full,
}

/// Категория occupant'а для collision логики
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OccupantKind {
    Creature,
    Plant,
    Other,
}

/// Высотный слой occupant'а
///
/// Plants на Building-слое (деревья) участвуют в probabilistic
/// interception, низкая растительность — нет.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AltitudeLayer {
    Ground,
    Building,
    Overhead,
}

/// Состояние personal shield
///
/// Resetting шилд не защищает — suppression применяется как к unshielded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShieldState {
    Active,
    Resetting,
}

/// Personal shield apparel (носимый щит)
#[derive(Component, Debug, Clone, Copy)]
pub struct ShieldBelt {
    pub state: ShieldState,
}

/// Точная world-space позиция occupant'а
///
/// Дискретную клетку для grid-запросов даёт `grid::cell_of`.
#[derive(Component, Debug, Clone, Copy)]
pub struct WorldPosition(pub Vec3);

/// Collision-профиль occupant'а (metadata interface)
#[derive(Component, Debug, Clone, Serialize, Deserialize)]
pub struct OccupantProfile {
    pub kind: OccupantKind,
    pub fill: FillCategory,
    /// Доля клетки, занятая объектом (0..1); мотыльки/эффекты дают 0
    pub fill_percent: f32,
    pub altitude: AltitudeLayer,
    /// Полуширина collision cross-section (от body size)
    pub collision_width: f32,
    /// Высота collision box — снаряд выше неё пролетает
    pub collision_height: f32,
    /// Armor value для расчёта suppression (0..1)
    pub armor: f32,
    /// Humanlike существа могут носить personal shield
    pub humanlike: bool,
}

/// Ширина collision box на единицу body size
pub const COLLISION_WIDTH_FACTOR: f32 = 0.3;
/// Высота collision box на единицу body size
pub const COLLISION_HEIGHT_FACTOR: f32 = 1.5;

impl OccupantProfile {
    /// Существо: collision размеры выводятся из body size
    /// (human body_size = 1.0 → width 0.3, height 1.5)
    pub fn creature(body_size: f32) -> Self {
        Self {
            kind: OccupantKind::Creature,
            fill: FillCategory::None,
            fill_percent: 0.0,
            altitude: AltitudeLayer::Ground,
            collision_width: body_size * COLLISION_WIDTH_FACTOR,
            collision_height: body_size * COLLISION_HEIGHT_FACTOR,
            armor: 0.0,
            humanlike: false,
        }
    }

    /// Частичное укрытие (мешки, баррикады)
    pub fn cover(fill_percent: f32, height: f32) -> Self {
        Self {
            kind: OccupantKind::Other,
            fill: FillCategory::Partial,
            fill_percent,
            altitude: AltitudeLayer::Ground,
            collision_width: 0.5,
            collision_height: height,
            armor: 0.0,
            humanlike: false,
        }
    }

    /// Полностью заполненная клетка (стена) — перехватывает безусловно
    pub fn wall() -> Self {
        Self {
            kind: OccupantKind::Other,
            fill: FillCategory::Full,
            fill_percent: 1.0,
            altitude: AltitudeLayer::Ground,
            collision_width: 0.5,
            collision_height: f32::MAX,
            armor: 0.0,
            humanlike: false,
        }
    }

    /// Дерево (Plant на Building-слое, probabilistic interception)
    pub fn tree(fill_percent: f32) -> Self {
        Self {
            kind: OccupantKind::Plant,
            fill: FillCategory::Partial,
            fill_percent,
            altitude: AltitudeLayer::Building,
            collision_width: 0.4,
            collision_height: 2.0,
            armor: 0.0,
            humanlike: false,
        }
    }

    pub fn with_armor(mut self, armor: f32) -> Self {
        self.armor = armor;
        self
    }

    pub fn humanlike(mut self) -> Self {
        self.humanlike = true;
        self
    }
}

/// Накопительное suppression state существа
///
/// «Felt fire»: растёт при каждом body-size check против существа,
/// независимо от фактического попадания.
#[derive(Component, Debug, Default, Clone)]
pub struct Suppressable {
    pub current: f32,
    /// Клетка, откуда пришёл последний подавляющий выстрел
    pub last_origin: Option<IVec3>,
}

impl Suppressable {
    pub fn add_suppression(&mut self, amount: f32, origin_cell: IVec3) {
        self.current += amount;
        self.last_origin = Some(origin_cell);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creature_collision_from_body_size() {
        let human = OccupantProfile::creature(1.0);
        assert!((human.collision_width - 0.3).abs() < 1e-6);
        assert!((human.collision_height - 1.5).abs() < 1e-6);

        let rat = OccupantProfile::creature(0.3);
        assert!(rat.collision_width < human.collision_width);
        assert!(rat.collision_height < human.collision_height);
    }

    #[test]
    fn test_wall_is_full_fill() {
        let wall = OccupantProfile::wall();
        assert_eq!(wall.fill, FillCategory::Full);
        assert_eq!(wall.kind, OccupantKind::Other);
    }

    #[test]
    fn test_tree_is_building_altitude_plant() {
        let tree = OccupantProfile::tree(0.8);
        assert_eq!(tree.kind, OccupantKind::Plant);
        assert_eq!(tree.altitude, AltitudeLayer::Building);
        assert!((tree.fill_percent - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_suppression_accumulates() {
        let mut sup = Suppressable::default();
        let origin = IVec3::new(3, 0, 4);

        sup.add_suppression(10.0, origin);
        sup.add_suppression(5.0, origin);

        assert!((sup.current - 15.0).abs() < 1e-6);
        assert_eq!(sup.last_origin, Some(origin));
    }
}
