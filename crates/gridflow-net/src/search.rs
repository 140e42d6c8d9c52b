//! Directional neighbour search.
//!
//! Given an origin and a set of outward directions, probe the adjacent tiles
//! and return every unclaimed connector or slot that links back toward the
//! origin. Pins only connect head-on: a slot matches when it sits on the
//! probed tile and faces exactly opposite the probing direction.

use gridflow_core::id::{EntityId, TypeMask};
use gridflow_spatial::{Direction, GridPosition, GridTopology, TileRect};
use slotmap::SlotMap;

use crate::node::{Node, NodeKind, NodeRef};
use crate::tunnel::tunnels_in_reach;

/// Where a probe starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOrigin {
    /// A single tile, probed once per direction.
    Tile(GridPosition),
    /// A whole footprint: every border tile is probed outward.
    Area(TileRect),
}

/// Find unclaimed, compatible nodes adjacent to `origin` in `directions`.
///
/// `from` is the entity doing the search; its own tiles and slots are never
/// returned. Probes that leave the grid find nothing. The same node may be
/// returned more than once when several probes reach it; callers discard
/// duplicates when they pop them.
pub fn find_targets<G: GridTopology + ?Sized>(
    nodes: &SlotMap<EntityId, Node>,
    grid: &G,
    from: Option<EntityId>,
    origin: SearchOrigin,
    directions: &[Direction],
    mask: TypeMask,
) -> Vec<NodeRef> {
    let mut found = Vec::new();
    search(nodes, grid, from, origin, directions, mask, false, &mut found);
    found
}

/// Entities any part of `entity` could ever link to, whatever their claims.
///
/// Each part searches with its own mask, and tunnel slots add every partner
/// candidate in reach. Linking is symmetric except along tunnel reach, so
/// a caller closing a set over this relation must also look for tunnels
/// whose reach covers the set.
pub fn find_links<G: GridTopology + ?Sized>(
    nodes: &SlotMap<EntityId, Node>,
    grid: &G,
    entity: EntityId,
) -> Vec<EntityId> {
    let Some(node) = nodes.get(entity) else {
        return Vec::new();
    };
    let mut found = Vec::new();
    match &node.kind {
        NodeKind::Connector(c) => search(
            nodes,
            grid,
            Some(entity),
            SearchOrigin::Area(node.rect()),
            &node.connector_directions(c),
            c.mask,
            true,
            &mut found,
        ),
        NodeKind::Slots(slots) => {
            for (i, slot) in slots.iter().enumerate() {
                search(
                    nodes,
                    grid,
                    Some(entity),
                    SearchOrigin::Tile(node.slot_position(slot)),
                    &[node.slot_direction(slot)],
                    slot.mask,
                    true,
                    &mut found,
                );
                if slot.as_tunnel().is_some() {
                    found.extend(tunnels_in_reach(nodes, grid, NodeRef::slot(entity, i), slot.mask));
                }
            }
        }
    }
    let mut entities: Vec<EntityId> = found.into_iter().map(|r| r.entity).collect();
    entities.sort();
    entities.dedup();
    entities
}

#[allow(clippy::too_many_arguments)]
fn search<G: GridTopology + ?Sized>(
    nodes: &SlotMap<EntityId, Node>,
    grid: &G,
    from: Option<EntityId>,
    origin: SearchOrigin,
    directions: &[Direction],
    mask: TypeMask,
    include_claimed: bool,
    found: &mut Vec<NodeRef>,
) {
    for &dir in directions {
        match origin {
            SearchOrigin::Tile(tile) => {
                probe(nodes, grid, from, tile.step(dir), dir, mask, include_claimed, found);
            }
            SearchOrigin::Area(rect) => {
                for tile in rect.edge(dir) {
                    let target = tile.step(dir);
                    if rect.contains(target) {
                        continue;
                    }
                    probe(nodes, grid, from, target, dir, mask, include_claimed, found);
                }
            }
        }
    }
}

/// Match everything on `target`, reached by stepping in `dir`.
#[allow(clippy::too_many_arguments)]
fn probe<G: GridTopology + ?Sized>(
    nodes: &SlotMap<EntityId, Node>,
    grid: &G,
    from: Option<EntityId>,
    target: GridPosition,
    dir: Direction,
    mask: TypeMask,
    include_claimed: bool,
    found: &mut Vec<NodeRef>,
) {
    if !grid.in_bounds(target) {
        return;
    }
    let inbound = dir.inverse();

    for &entity in grid.contents_at(target) {
        if Some(entity) == from {
            continue;
        }
        let Some(node) = nodes.get(entity) else {
            continue;
        };

        match &node.kind {
            NodeKind::Connector(c) => {
                if (c.claim.is_claimed() && !include_claimed) || !mask.accepts(c.mask) {
                    continue;
                }
                if c.allowed_directions.is_some()
                    && !node.connector_directions(c).contains(&inbound)
                {
                    continue;
                }
                found.push(NodeRef::connector(entity));
            }
            NodeKind::Slots(slots) => {
                // A slot owner never doubles as a generic connector.
                for (i, slot) in slots.iter().enumerate() {
                    if (slot.claim.is_claimed() && !include_claimed) || !mask.accepts(slot.mask) {
                        continue;
                    }
                    if node.slot_position(slot) == target && node.slot_direction(slot) == inbound {
                        found.push(NodeRef::slot(entity, i));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Connector, Pin, Slot};
    use gridflow_core::fixed::Fixed64;
    use gridflow_core::id::ResourceTypeId;
    use gridflow_spatial::{Footprint, Layer, Rotation, TileGrid};

    fn fixed(v: f64) -> Fixed64 {
        Fixed64::from_num(v)
    }

    fn grade(n: u32) -> TypeMask {
        TypeMask::Only(ResourceTypeId(n))
    }

    struct World {
        nodes: SlotMap<EntityId, Node>,
        grid: TileGrid,
    }

    impl World {
        fn new() -> Self {
            Self {
                nodes: SlotMap::with_key(),
                grid: TileGrid::new(),
            }
        }

        fn add(&mut self, node: Node) -> EntityId {
            let rect = node.rect();
            let id = self.nodes.insert(node);
            self.grid.place(id, rect, Layer(0)).unwrap();
            id
        }

        fn connector(&mut self, x: i32, y: i32, mask: TypeMask) -> EntityId {
            self.add(Node::connector(
                GridPosition::new(x, y),
                Connector::new(mask, fixed(100.0), fixed(10.0)),
            ))
        }

        fn pin(&mut self, x: i32, y: i32, dir: Direction) -> EntityId {
            self.add(Node::building(
                GridPosition::new(x, y),
                Footprint::single(),
                vec![Slot::pin((0, 0), dir, grade(0), Pin::producer(fixed(5.0)))],
            ))
        }

        fn search(&self, origin: SearchOrigin, dirs: &[Direction], mask: TypeMask) -> Vec<NodeRef> {
            find_targets(&self.nodes, &self.grid, None, origin, dirs, mask)
        }
    }

    fn at(x: i32, y: i32) -> SearchOrigin {
        SearchOrigin::Tile(GridPosition::new(x, y))
    }

    #[test]
    fn finds_adjacent_connectors_in_all_directions() {
        let mut w = World::new();
        let n = w.connector(0, -1, grade(0));
        let e = w.connector(1, 0, grade(0));
        let _far = w.connector(3, 0, grade(0));

        let found = w.search(at(0, 0), &Direction::all(), grade(0));
        assert_eq!(found, vec![NodeRef::connector(n), NodeRef::connector(e)]);
    }

    #[test]
    fn skips_mismatched_and_claimed() {
        let mut w = World::new();
        let _other = w.connector(1, 0, grade(1));
        let claimed = w.connector(-1, 0, grade(0));
        w.nodes[claimed].as_connector_mut().unwrap().claim.claim(gridflow_core::id::NetworkId(0));

        assert!(w.search(at(0, 0), &Direction::all(), grade(0)).is_empty());
    }

    #[test]
    fn wildcard_mask_matches_any_grade() {
        let mut w = World::new();
        let c = w.connector(1, 0, grade(7));
        let found = w.search(at(0, 0), &[Direction::East], TypeMask::Any);
        assert_eq!(found, vec![NodeRef::connector(c)]);
    }

    #[test]
    fn directional_connector_only_links_through_its_pair() {
        let mut w = World::new();
        let pipe = w.add(Node::connector(
            GridPosition::new(1, 0),
            Connector::new(grade(0), fixed(1.0), fixed(1.0))
                .with_directions(Direction::West, Direction::East),
        ));

        // Approaching from the west side: accepted.
        assert_eq!(
            w.search(at(0, 0), &[Direction::East], grade(0)),
            vec![NodeRef::connector(pipe)]
        );
        // Approaching from the north side: rejected.
        assert!(w.search(at(1, -1), &[Direction::South], grade(0)).is_empty());
    }

    #[test]
    fn pins_only_connect_head_on() {
        let mut w = World::new();
        let facing = w.pin(1, 0, Direction::West);
        let sideways = w.pin(0, 1, Direction::East);

        let found = w.search(at(0, 0), &Direction::all(), grade(0));
        assert_eq!(found, vec![NodeRef::slot(facing, 0)]);
        assert!(!found.contains(&NodeRef::slot(sideways, 0)));
    }

    #[test]
    fn slot_must_sit_on_probed_tile() {
        // 2x1 building whose only pin is on its right tile facing west; the
        // left tile is adjacent to the origin but carries no slot.
        let mut w = World::new();
        w.add(Node::building(
            GridPosition::new(1, 0),
            Footprint::new(2, 1),
            vec![Slot::pin((1, 0), Direction::West, grade(0), Pin::producer(fixed(1.0)))],
        ));
        assert!(w.search(at(0, 0), &[Direction::East], grade(0)).is_empty());
    }

    #[test]
    fn area_origin_probes_every_border_tile() {
        let mut w = World::new();
        let building = w.add(Node::building(
            GridPosition::new(0, 0),
            Footprint::new(2, 2),
            Vec::new(),
        ));
        let a = w.connector(2, 1, grade(0));
        let b = w.connector(0, -1, grade(0));
        let c = w.connector(-1, 1, grade(0));

        let rect = w.nodes[building].rect();
        let found = find_targets(
            &w.nodes,
            &w.grid,
            Some(building),
            SearchOrigin::Area(rect),
            &Direction::all(),
            grade(0),
        );
        assert_eq!(found.len(), 3);
        for id in [a, b, c] {
            assert!(found.contains(&NodeRef::connector(id)));
        }
    }

    #[test]
    fn rotated_pin_matches_in_world_space() {
        let mut w = World::new();
        // Local north-facing pin; rotated a quarter turn it faces east.
        let id = w.add(
            Node::building(
                GridPosition::new(-1, 0),
                Footprint::single(),
                vec![Slot::pin((0, 0), Direction::North, grade(0), Pin::consumer(fixed(1.0)))],
            )
            .rotated(Rotation::Cw90),
        );
        assert_eq!(
            w.search(at(0, 0), &[Direction::West], grade(0)),
            vec![NodeRef::slot(id, 0)]
        );
    }

    #[test]
    fn links_ignore_claims_but_not_grades() {
        let mut w = World::new();
        let centre = w.connector(0, 0, grade(0));
        let claimed = w.connector(1, 0, grade(0));
        let any = w.connector(0, 1, TypeMask::Any);
        w.connector(-1, 0, grade(1));
        let facing = w.pin(0, -1, Direction::South);
        w.nodes[claimed].as_connector_mut().unwrap().claim.claim(gridflow_core::id::NetworkId(2));

        let links = find_links(&w.nodes, &w.grid, centre);
        let mut expected = vec![claimed, any, facing];
        expected.sort();
        assert_eq!(links, expected);
    }

    #[test]
    fn probe_outside_grid_finds_nothing() {
        let bounds = TileRect::new(GridPosition::new(0, 0), GridPosition::new(3, 3));
        let mut w = World {
            nodes: SlotMap::with_key(),
            grid: TileGrid::with_bounds(bounds),
        };
        w.connector(0, 0, grade(0));
        assert!(w.search(at(0, 0), &[Direction::West, Direction::North], grade(0)).is_empty());
    }
}
