//! Tile geometry and grid queries for gridflow networks.
//!
//! Provides the 2D coordinate types shared by every network crate
//! (positions, directions, rotations, footprints, rectangles) and the
//! [`GridTopology`] trait through which the network engine reads which
//! entities occupy a tile. [`TileGrid`] is an in-memory, layered
//! implementation used by hosts that do not bring their own grid storage.

use serde::{Deserialize, Serialize};

pub mod grid;
pub use grid::{GridTopology, Layer, SpatialError, TileGrid};

// ---------------------------------------------------------------------------
// Positions
// ---------------------------------------------------------------------------

/// A position on the 2D grid. `y` grows downward (south).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPosition {
    pub x: i32,
    pub y: i32,
}

impl GridPosition {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The tile one step away in `dir`.
    pub fn step(self, dir: Direction) -> Self {
        self.step_by(dir, 1)
    }

    /// The tile `n` steps away in `dir`.
    pub fn step_by(self, dir: Direction, n: i32) -> Self {
        let (dx, dy) = dir.offset();
        Self::new(
            self.x.saturating_add(dx.saturating_mul(n)),
            self.y.saturating_add(dy.saturating_mul(n)),
        )
    }

    /// Translate by a local offset.
    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x.saturating_add(dx), self.y.saturating_add(dy))
    }

    /// Manhattan distance to another position.
    pub fn manhattan_distance(&self, other: &GridPosition) -> u32 {
        (self.x - other.x).unsigned_abs() + (self.y - other.y).unsigned_abs()
    }
}

// ---------------------------------------------------------------------------
// Directions and rotations
// ---------------------------------------------------------------------------

/// Cardinal directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    /// All four cardinal directions, clockwise from north.
    pub fn all() -> [Direction; 4] {
        [
            Direction::North,
            Direction::East,
            Direction::South,
            Direction::West,
        ]
    }

    /// Offset for this direction.
    pub fn offset(&self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::East => (1, 0),
            Direction::South => (0, 1),
            Direction::West => (-1, 0),
        }
    }

    /// The opposite direction.
    pub fn inverse(self) -> Self {
        match self {
            Direction::North => Direction::South,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
        }
    }

    /// Turn 90 degrees clockwise.
    pub fn turn_cw(self) -> Self {
        match self {
            Direction::North => Direction::East,
            Direction::East => Direction::South,
            Direction::South => Direction::West,
            Direction::West => Direction::North,
        }
    }

    /// Map a local direction to world space under `rotation`.
    pub fn rotated(self, rotation: Rotation) -> Self {
        (0..rotation.quarter_turns()).fold(self, |d, _| d.turn_cw())
    }
}

/// Rotation applied to a placed entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rotation {
    /// No rotation.
    #[default]
    None,
    /// 90 degrees clockwise.
    Cw90,
    /// 180 degrees.
    Cw180,
    /// 270 degrees clockwise (90 degrees counter-clockwise).
    Cw270,
}

impl Rotation {
    /// All four rotation values.
    pub fn all() -> [Rotation; 4] {
        [
            Rotation::None,
            Rotation::Cw90,
            Rotation::Cw180,
            Rotation::Cw270,
        ]
    }

    /// Rotate 90 degrees clockwise.
    pub fn rotate_cw(self) -> Self {
        match self {
            Rotation::None => Rotation::Cw90,
            Rotation::Cw90 => Rotation::Cw180,
            Rotation::Cw180 => Rotation::Cw270,
            Rotation::Cw270 => Rotation::None,
        }
    }

    /// Number of clockwise quarter turns.
    pub fn quarter_turns(self) -> u8 {
        match self {
            Rotation::None => 0,
            Rotation::Cw90 => 1,
            Rotation::Cw180 => 2,
            Rotation::Cw270 => 3,
        }
    }
}

// ---------------------------------------------------------------------------
// Footprints
// ---------------------------------------------------------------------------

/// The unrotated size of an entity on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Footprint {
    pub width: u32,
    pub height: u32,
}

impl Default for Footprint {
    fn default() -> Self {
        Self::single()
    }
}

impl Footprint {
    /// A 1x1 entity.
    pub fn single() -> Self {
        Self {
            width: 1,
            height: 1,
        }
    }

    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    /// Return the footprint after rotation. For 90/270 degrees, width and
    /// height are swapped.
    pub fn rotated(&self, rotation: Rotation) -> Self {
        match rotation {
            Rotation::None | Rotation::Cw180 => *self,
            Rotation::Cw90 | Rotation::Cw270 => Self {
                width: self.height,
                height: self.width,
            },
        }
    }

    /// Map a local tile offset inside this (unrotated) footprint to its
    /// offset from the origin of the rotated footprint.
    pub fn rotate_offset(&self, local: (i32, i32), rotation: Rotation) -> (i32, i32) {
        let w = self.width as i32;
        let h = self.height as i32;
        let (x, y) = local;
        match rotation {
            Rotation::None => (x, y),
            Rotation::Cw90 => (h - 1 - y, x),
            Rotation::Cw180 => (w - 1 - x, h - 1 - y),
            Rotation::Cw270 => (y, w - 1 - x),
        }
    }

    /// The world rectangle covered when placed at `origin` (top-left corner)
    /// with `rotation`.
    pub fn rect(&self, origin: GridPosition, rotation: Rotation) -> TileRect {
        let r = self.rotated(rotation);
        TileRect::new(
            origin,
            origin.offset(r.width as i32 - 1, r.height as i32 - 1),
        )
    }
}

// ---------------------------------------------------------------------------
// Rectangles
// ---------------------------------------------------------------------------

/// An inclusive, axis-aligned rectangle of tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileRect {
    pub min: GridPosition,
    pub max: GridPosition,
}

impl TileRect {
    /// Build a rectangle from two corners in any order.
    pub fn new(a: GridPosition, b: GridPosition) -> Self {
        Self {
            min: GridPosition::new(a.x.min(b.x), a.y.min(b.y)),
            max: GridPosition::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    pub fn single(pos: GridPosition) -> Self {
        Self { min: pos, max: pos }
    }

    /// Grow by `margin` tiles on every side.
    pub fn expand(&self, margin: i32) -> Self {
        Self {
            min: self.min.offset(-margin, -margin),
            max: self.max.offset(margin, margin),
        }
    }

    /// Smallest rectangle covering both.
    pub fn union(&self, other: &TileRect) -> Self {
        Self {
            min: GridPosition::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            max: GridPosition::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        }
    }

    pub fn contains(&self, pos: GridPosition) -> bool {
        pos.x >= self.min.x && pos.x <= self.max.x && pos.y >= self.min.y && pos.y <= self.max.y
    }

    pub fn contains_rect(&self, other: &TileRect) -> bool {
        self.contains(other.min) && self.contains(other.max)
    }

    pub fn intersects(&self, other: &TileRect) -> bool {
        self.min.x <= other.max.x
            && other.min.x <= self.max.x
            && self.min.y <= other.max.y
            && other.min.y <= self.max.y
    }

    pub fn width(&self) -> u64 {
        (i64::from(self.max.x) - i64::from(self.min.x) + 1) as u64
    }

    pub fn height(&self) -> u64 {
        (i64::from(self.max.y) - i64::from(self.min.y) + 1) as u64
    }

    pub fn area(&self) -> u64 {
        self.width().saturating_mul(self.height())
    }

    /// Iterate all tiles, row by row.
    pub fn tiles(self) -> impl Iterator<Item = GridPosition> {
        let (min, max) = (self.min, self.max);
        (min.y..=max.y).flat_map(move |y| (min.x..=max.x).map(move |x| GridPosition::new(x, y)))
    }

    /// The tiles along the side facing `dir`.
    pub fn edge(self, dir: Direction) -> impl Iterator<Item = GridPosition> {
        let (min, max) = (self.min, self.max);
        let (from, to) = match dir {
            Direction::North => (min, GridPosition::new(max.x, min.y)),
            Direction::South => (GridPosition::new(min.x, max.y), max),
            Direction::West => (min, GridPosition::new(min.x, max.y)),
            Direction::East => (GridPosition::new(max.x, min.y), max),
        };
        TileRect::new(from, to).tiles()
    }

    /// The tiles `1..=len` steps away from `origin` along `dir`.
    pub fn ray(origin: GridPosition, dir: Direction, len: u32) -> Option<Self> {
        if len == 0 {
            return None;
        }
        let len = i32::try_from(len).unwrap_or(i32::MAX);
        Some(TileRect::new(origin.step(dir), origin.step_by(dir, len)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_moves_one_tile() {
        let p = GridPosition::new(2, 2);
        assert_eq!(p.step(Direction::North), GridPosition::new(2, 1));
        assert_eq!(p.step(Direction::East), GridPosition::new(3, 2));
        assert_eq!(p.step_by(Direction::West, 3), GridPosition::new(-1, 2));
    }

    #[test]
    fn inverse_is_involution() {
        for d in Direction::all() {
            assert_eq!(d.inverse().inverse(), d);
            assert_ne!(d.inverse(), d);
        }
    }

    #[test]
    fn direction_rotation() {
        assert_eq!(Direction::North.rotated(Rotation::Cw90), Direction::East);
        assert_eq!(Direction::North.rotated(Rotation::Cw180), Direction::South);
        assert_eq!(Direction::North.rotated(Rotation::Cw270), Direction::West);
        assert_eq!(Direction::West.rotated(Rotation::None), Direction::West);
    }

    #[test]
    fn footprint_rotation_swaps_dimensions() {
        let fp = Footprint::new(2, 3);
        assert_eq!(fp.rotated(Rotation::Cw90), Footprint::new(3, 2));
        assert_eq!(fp.rotated(Rotation::Cw180), fp);
    }

    #[test]
    fn rotate_offset_clockwise() {
        // 2 wide, 1 tall: tiles (0,0) and (1,0).
        let fp = Footprint::new(2, 1);
        // After a quarter turn the building is 1 wide, 2 tall; the left tile
        // ends up on top.
        assert_eq!(fp.rotate_offset((0, 0), Rotation::Cw90), (0, 0));
        assert_eq!(fp.rotate_offset((1, 0), Rotation::Cw90), (0, 1));
        assert_eq!(fp.rotate_offset((0, 0), Rotation::Cw180), (1, 0));
        assert_eq!(fp.rotate_offset((1, 0), Rotation::Cw270), (0, 0));
    }

    #[test]
    fn footprint_rect() {
        let r = Footprint::new(2, 3).rect(GridPosition::new(10, 20), Rotation::Cw90);
        assert_eq!(r.min, GridPosition::new(10, 20));
        assert_eq!(r.max, GridPosition::new(12, 21));
    }

    #[test]
    fn rect_expand_and_contains() {
        let r = TileRect::single(GridPosition::new(0, 0)).expand(1);
        assert_eq!(r.area(), 9);
        assert!(r.contains(GridPosition::new(-1, 1)));
        assert!(!r.contains(GridPosition::new(2, 0)));
    }

    #[test]
    fn rect_union_and_intersection() {
        let a = TileRect::new(GridPosition::new(0, 0), GridPosition::new(2, 2));
        let b = TileRect::new(GridPosition::new(2, 2), GridPosition::new(4, 3));
        let c = TileRect::new(GridPosition::new(5, 5), GridPosition::new(6, 6));
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
        let u = a.union(&c);
        assert_eq!(u.min, GridPosition::new(0, 0));
        assert_eq!(u.max, GridPosition::new(6, 6));
        assert!(u.contains_rect(&a));
    }

    #[test]
    fn rect_edges() {
        let r = TileRect::new(GridPosition::new(0, 0), GridPosition::new(1, 2));
        let east: Vec<_> = r.edge(Direction::East).collect();
        assert_eq!(
            east,
            vec![
                GridPosition::new(1, 0),
                GridPosition::new(1, 1),
                GridPosition::new(1, 2)
            ]
        );
        let north: Vec<_> = r.edge(Direction::North).collect();
        assert_eq!(north, vec![GridPosition::new(0, 0), GridPosition::new(1, 0)]);
    }

    #[test]
    fn tile_iterators_outlive_their_rect() {
        let tiles = {
            let r = TileRect::new(GridPosition::new(0, 0), GridPosition::new(1, 1));
            r.tiles()
        };
        assert_eq!(tiles.count(), 4);
        let south: Vec<_> = TileRect::single(GridPosition::new(3, 3))
            .edge(Direction::South)
            .collect();
        assert_eq!(south, vec![GridPosition::new(3, 3)]);
    }

    #[test]
    fn ray_covers_hop_range() {
        let r = TileRect::ray(GridPosition::new(0, 0), Direction::East, 5).unwrap();
        assert_eq!(r.min, GridPosition::new(1, 0));
        assert_eq!(r.max, GridPosition::new(5, 0));
        assert!(TileRect::ray(GridPosition::new(0, 0), Direction::East, 0).is_none());
    }
}
