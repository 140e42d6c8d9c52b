//! Grid storage and the read-only query trait the network engine uses.

use std::collections::{BTreeMap, BTreeSet};

use gridflow_core::id::EntityId;
use serde::{Deserialize, Serialize};
use slotmap::{Key, SecondaryMap};

use crate::{GridPosition, TileRect};

/// Answers "what occupies this tile?" for the network engine.
///
/// The engine never mutates the grid; placement and removal belong to the
/// host, which reports them through the module's topology-change setters.
pub trait GridTopology {
    /// Every entity occupying `pos`, on any layer.
    fn contents_at(&self, pos: GridPosition) -> &[EntityId];

    /// Whether `pos` lies inside the playable area. Probes that leave the
    /// grid simply find nothing.
    fn in_bounds(&self, pos: GridPosition) -> bool {
        let _ = pos;
        true
    }

    /// Unique entities overlapping `rect`, in first-seen row-major order.
    fn entities_in_rect(&self, rect: &TileRect) -> Vec<EntityId> {
        let mut seen = BTreeSet::new();
        let mut result = Vec::new();
        for pos in rect.tiles() {
            for &entity in self.contents_at(pos) {
                if seen.insert(entity.data().as_ffi()) {
                    result.push(entity);
                }
            }
        }
        result
    }
}

/// A conceptual grid layer. Entities on different layers may share a tile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Layer(pub u8);

/// Errors from grid placement.
#[derive(Debug, thiserror::Error)]
pub enum SpatialError {
    #[error("tile ({x}, {y}) is occupied on layer {layer}")]
    Occupied { x: i32, y: i32, layer: u8 },
    #[error("tile ({x}, {y}) is outside the grid")]
    OutOfBounds { x: i32, y: i32 },
    #[error("entity is not placed on the grid")]
    NotPlaced,
    #[error("entity is already placed on the grid")]
    AlreadyPlaced,
}

#[derive(Debug, Clone, Copy)]
struct Placement {
    rect: TileRect,
    layer: Layer,
}

/// In-memory layered grid mapping tiles to the entities covering them.
///
/// Maintains a bidirectional mapping:
/// - `tiles`: position -> entities (one per layer at most)
/// - `placements`: entity -> covered rectangle and layer
#[derive(Debug, Default)]
pub struct TileGrid {
    tiles: BTreeMap<GridPosition, Vec<EntityId>>,
    placements: SecondaryMap<EntityId, Placement>,
    bounds: Option<TileRect>,
}

impl TileGrid {
    /// An unbounded grid.
    pub fn new() -> Self {
        Self::default()
    }

    /// A grid that rejects placement and answers no probes outside `bounds`.
    pub fn with_bounds(bounds: TileRect) -> Self {
        Self {
            bounds: Some(bounds),
            ..Self::default()
        }
    }

    pub fn bounds(&self) -> Option<TileRect> {
        self.bounds
    }

    /// Occupy every tile of `rect` on `layer`.
    pub fn place(
        &mut self,
        entity: EntityId,
        rect: TileRect,
        layer: Layer,
    ) -> Result<(), SpatialError> {
        if self.placements.contains_key(entity) {
            return Err(SpatialError::AlreadyPlaced);
        }

        for tile in rect.tiles() {
            if !self.in_bounds(tile) {
                return Err(SpatialError::OutOfBounds {
                    x: tile.x,
                    y: tile.y,
                });
            }
            if self.occupant(tile, layer).is_some() {
                return Err(SpatialError::Occupied {
                    x: tile.x,
                    y: tile.y,
                    layer: layer.0,
                });
            }
        }

        for tile in rect.tiles() {
            self.tiles.entry(tile).or_default().push(entity);
        }
        self.placements.insert(entity, Placement { rect, layer });
        Ok(())
    }

    /// Remove an entity from the grid, returning the rectangle it covered.
    pub fn remove(&mut self, entity: EntityId) -> Result<TileRect, SpatialError> {
        let placement = self
            .placements
            .remove(entity)
            .ok_or(SpatialError::NotPlaced)?;
        for tile in placement.rect.tiles() {
            if let Some(list) = self.tiles.get_mut(&tile) {
                list.retain(|e| *e != entity);
                if list.is_empty() {
                    self.tiles.remove(&tile);
                }
            }
        }
        Ok(placement.rect)
    }

    /// Move an entity to a new rectangle on the same layer (e.g. after a
    /// rotation changed its footprint). On failure the old placement is kept.
    pub fn relocate(&mut self, entity: EntityId, rect: TileRect) -> Result<TileRect, SpatialError> {
        let placement = *self.placements.get(entity).ok_or(SpatialError::NotPlaced)?;
        let old = self.remove(entity)?;
        if let Err(e) = self.place(entity, rect, placement.layer) {
            self.place(entity, old, placement.layer)?;
            return Err(e);
        }
        Ok(old)
    }

    /// The entity occupying `pos` on `layer`, if any.
    pub fn occupant(&self, pos: GridPosition, layer: Layer) -> Option<EntityId> {
        self.tiles.get(&pos)?.iter().copied().find(|e| {
            self.placements
                .get(*e)
                .is_some_and(|p| p.layer == layer)
        })
    }

    /// The rectangle an entity covers.
    pub fn rect_of(&self, entity: EntityId) -> Option<TileRect> {
        self.placements.get(entity).map(|p| p.rect)
    }

    /// Number of entities placed on the grid.
    pub fn entity_count(&self) -> usize {
        self.placements.len()
    }

    /// Total number of occupied tiles (on any layer).
    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }
}

impl GridTopology for TileGrid {
    fn contents_at(&self, pos: GridPosition) -> &[EntityId] {
        if !self.in_bounds(pos) {
            return &[];
        }
        self.tiles.get(&pos).map(Vec::as_slice).unwrap_or(&[])
    }

    fn in_bounds(&self, pos: GridPosition) -> bool {
        self.bounds.is_none_or(|b| b.contains(pos))
    }

    fn entities_in_rect(&self, rect: &TileRect) -> Vec<EntityId> {
        let mut seen = BTreeSet::new();
        let mut result = Vec::new();

        // Positions order by x first, so the range spans whole columns and
        // rows outside the rectangle are filtered.
        for (&pos, list) in self.tiles.range(rect.min..=rect.max) {
            if !rect.contains(pos) || !self.in_bounds(pos) {
                continue;
            }
            for &entity in list {
                if seen.insert(entity.data().as_ffi()) {
                    result.push(entity);
                }
            }
        }
        result
    }
}
