//! Минимальный словарь мира: идентификаторы миров, координаты чанков,
//! позиции блоков и сущностей, а также трейты, через которые игровая
//! логика описывает подписчиков и сообщения.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Ширина чанка в блоках задаётся сдвигом.
pub const CHUNK_SHIFT: i32 = 4;

/// Идентификатор мира.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorldId(pub u32);

/// Координаты чанка: ячейка сетки, по которой разбит мир.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkKey {
    pub x: i32,
    pub z: i32,
}

/// Точка в мире.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub world: WorldId,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Блок, адресуемый целочисленными координатами.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Block {
    pub world: WorldId,
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

/// Сущность с текущим положением.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: u64,
    pub location: Location,
}

/// Подписчик, у которого есть положение и собственная дальность обзора.
pub trait Viewer {
    fn location(&self) -> Location;

    /// Дальность обзора в чанках, запрошенная самим клиентом.
    fn view_distance(&self) -> u32;
}

/// Сообщение, которое умеет назвать свой вид.
///
/// Используется фильтрами, отсекающими виды сообщений, которые
/// клиентский протокол не умеет отобразить.
pub trait Classified {
    fn kind(&self) -> &str;
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl ChunkKey {
    pub const fn new(
        x: i32,
        z: i32,
    ) -> Self {
        Self { x, z }
    }

    /// Чанк, содержащий блок с координатами `(x, z)`.
    pub const fn containing(
        block_x: i32,
        block_z: i32,
    ) -> Self {
        Self {
            x: block_x >> CHUNK_SHIFT,
            z: block_z >> CHUNK_SHIFT,
        }
    }

    /// Расстояние Чебышёва в чанках.
    pub fn distance(
        &self,
        other: &ChunkKey,
    ) -> u32 {
        self.x.abs_diff(other.x).max(self.z.abs_diff(other.z))
    }

    /// Квадрат `(2r+1)×(2r+1)` чанков с центром в `self`.
    pub fn square(
        self,
        radius: u32,
    ) -> impl Iterator<Item = ChunkKey> {
        let r = radius.min(i32::MAX as u32) as i32;
        let (cx, cz) = (self.x, self.z);
        (cx.saturating_sub(r)..=cx.saturating_add(r)).flat_map(move |x| {
            (cz.saturating_sub(r)..=cz.saturating_add(r)).map(move |z| ChunkKey::new(x, z))
        })
    }
}

impl Location {
    pub fn new(
        world: WorldId,
        x: f64,
        y: f64,
        z: f64,
    ) -> Self {
        Self { world, x, y, z }
    }

    pub fn block_x(&self) -> i32 {
        self.x.floor() as i32
    }

    pub fn block_z(&self) -> i32 {
        self.z.floor() as i32
    }

    pub fn chunk(&self) -> ChunkKey {
        ChunkKey::containing(self.block_x(), self.block_z())
    }
}

impl Block {
    pub fn chunk(&self) -> ChunkKey {
        ChunkKey::containing(self.x, self.z)
    }
}

impl Entity {
    pub fn chunk(&self) -> ChunkKey {
        self.location.chunk()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие трейты
////////////////////////////////////////////////////////////////////////////////

impl fmt::Display for WorldId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "world-{}", self.0)
    }
}

impl fmt::Display for ChunkKey {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "chunk:{}:{}", self.x, self.z)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    /// Тест проверяет, что отрицательные координаты блока округляются
    /// вниз, а не к нулю.
    #[test]
    fn test_chunk_of_negative_block() {
        assert_eq!(ChunkKey::containing(-1, -16), ChunkKey::new(-1, -1));
        assert_eq!(ChunkKey::containing(-17, 15), ChunkKey::new(-2, 0));
        assert_eq!(ChunkKey::containing(16, 31), ChunkKey::new(1, 1));
    }

    #[test]
    fn test_location_chunk_uses_floor() {
        let loc = Location::new(WorldId(0), -0.5, 64.0, 15.9);
        assert_eq!(loc.block_x(), -1);
        assert_eq!(loc.chunk(), ChunkKey::new(-1, 0));
    }

    #[test]
    fn test_square_size_and_bounds() {
        let cells: HashSet<_> = ChunkKey::new(3, -2).square(1).collect();
        assert_eq!(cells.len(), 9);
        assert!(cells.contains(&ChunkKey::new(2, -3)));
        assert!(cells.contains(&ChunkKey::new(4, -1)));
        assert!(!cells.contains(&ChunkKey::new(5, -2)));
    }

    #[test]
    fn test_square_radius_zero_is_center() {
        let cells: Vec<_> = ChunkKey::new(7, 7).square(0).collect();
        assert_eq!(cells, vec![ChunkKey::new(7, 7)]);
    }

    #[test]
    fn test_chebyshev_distance() {
        let a = ChunkKey::new(0, 0);
        assert_eq!(a.distance(&ChunkKey::new(3, -1)), 3);
        assert_eq!(a.distance(&ChunkKey::new(-2, 2)), 2);
        assert_eq!(a.distance(&a), 0);
    }

    #[test]
    fn test_display() {
        assert_eq!(ChunkKey::new(-3, 4).to_string(), "chunk:-3:4");
        assert_eq!(WorldId(2).to_string(), "world-2");
    }
}
