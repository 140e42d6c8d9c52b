//! Property-based tests for network discovery and balancing.
//!
//! Random layouts of connectors and pins on a small board are built into a
//! sandbox; the properties below must hold for every one of them. A second
//! generator produces edit sequences (placements, removals and ticks) that
//! are replayed in both discovery modes.

use std::collections::{BTreeSet, HashMap, HashSet};

use gridflow_core::fixed::Fixed64;
use gridflow_core::id::{EntityId, TypeMask};
use gridflow_net::test_utils::*;
use gridflow_net::{NetworkConfig, Node, NodeKind, NodeRef, Pin, PinBuffers};
use gridflow_spatial::{Direction, GridPosition};
use proptest::prelude::*;

// ===========================================================================
// Generators
// ===========================================================================

const WIDTH: i32 = 8;
const HEIGHT: i32 = 5;

#[derive(Debug, Clone, Copy)]
enum Cell {
    Empty,
    ConnectorA,
    ConnectorB,
    Producer(Direction),
    Consumer(Direction),
}

fn arb_direction() -> impl Strategy<Value = Direction> {
    prop_oneof![
        Just(Direction::North),
        Just(Direction::East),
        Just(Direction::South),
        Just(Direction::West),
    ]
}

fn arb_cell() -> impl Strategy<Value = Cell> {
    prop_oneof![
        3 => Just(Cell::Empty),
        4 => Just(Cell::ConnectorA),
        2 => Just(Cell::ConnectorB),
        1 => arb_direction().prop_map(Cell::Producer),
        1 => arb_direction().prop_map(Cell::Consumer),
    ]
}

fn arb_layout() -> impl Strategy<Value = Vec<Cell>> {
    proptest::collection::vec(arb_cell(), (WIDTH * HEIGHT) as usize)
}

#[derive(Debug, Clone, Copy)]
enum Piece {
    Connector(TypeMask),
    /// A grade A connector linking only east-west, or only north-south.
    Straight { vertical: bool },
    Producer(Direction),
    Consumer(Direction),
    Tunnel { facing: Direction, hop: u32 },
}

#[derive(Debug, Clone, Copy)]
enum Edit {
    Place(usize, Piece),
    Remove(usize),
    Tick,
}

fn arb_piece() -> impl Strategy<Value = Piece> {
    prop_oneof![
        3 => Just(Piece::Connector(grade_a())),
        1 => Just(Piece::Connector(grade_b())),
        2 => Just(Piece::Connector(TypeMask::Any)),
        2 => any::<bool>().prop_map(|vertical| Piece::Straight { vertical }),
        1 => arb_direction().prop_map(Piece::Producer),
        1 => arb_direction().prop_map(Piece::Consumer),
        3 => (arb_direction(), 1u32..7).prop_map(|(facing, hop)| Piece::Tunnel { facing, hop }),
    ]
}

fn arb_edits() -> impl Strategy<Value = Vec<Edit>> {
    let tile = 0..(WIDTH * HEIGHT) as usize;
    let edit = prop_oneof![
        6 => (tile.clone(), arb_piece()).prop_map(|(i, p)| Edit::Place(i, p)),
        2 => tile.prop_map(Edit::Remove),
        2 => Just(Edit::Tick),
    ];
    proptest::collection::vec(edit, 1..60)
}

/// Apply one edit, tracking which entity sits on which tile.
fn apply(sb: &mut Sandbox, placed: &mut HashMap<usize, EntityId>, edit: Edit) {
    match edit {
        Edit::Place(index, piece) => {
            if placed.contains_key(&index) {
                return;
            }
            let (x, y) = position(index);
            let entity = match piece {
                Piece::Connector(mask) => sb.connector_at(x, y, mask),
                Piece::Straight { vertical } => {
                    let (from, to) = if vertical {
                        (Direction::North, Direction::South)
                    } else {
                        (Direction::West, Direction::East)
                    };
                    sb.add(Node::connector(
                        GridPosition::new(x, y),
                        default_connector(grade_a()).with_directions(from, to),
                    ))
                }
                Piece::Producer(dir) => sb.pin_at(x, y, dir, grade_a(), Pin::producer(fixed(10.0))),
                Piece::Consumer(dir) => sb.pin_at(x, y, dir, grade_a(), Pin::consumer(fixed(5.0))),
                Piece::Tunnel { facing, hop } => sb.tunnel_at(x, y, facing, hop, grade_a()),
            };
            placed.insert(index, entity);
        }
        Edit::Remove(index) => {
            if let Some(entity) = placed.remove(&index) {
                sb.remove(entity);
            }
        }
        Edit::Tick => {
            sb.tick();
        }
    }
}

fn position(index: usize) -> (i32, i32) {
    let i = index as i32;
    (i % WIDTH, i / WIDTH)
}

/// Build `layout`, placing cells in `order`. Returns the producer slots.
fn build(layout: &[Cell], order: impl Iterator<Item = usize>) -> (Sandbox, Vec<NodeRef>) {
    let mut sb = Sandbox::new();
    let mut producers = Vec::new();
    for index in order {
        let (x, y) = position(index);
        match layout[index] {
            Cell::Empty => {}
            Cell::ConnectorA => {
                sb.connector_at(x, y, grade_a());
            }
            Cell::ConnectorB => {
                sb.connector_at(x, y, grade_b());
            }
            Cell::Producer(dir) => {
                let pin = Pin::producer(fixed(10.0)).with_buffer(fixed(20.0));
                producers.push(NodeRef::slot(sb.pin_at(x, y, dir, grade_a(), pin), 0));
            }
            Cell::Consumer(dir) => {
                sb.pin_at(x, y, dir, grade_a(), Pin::consumer(fixed(7.5)));
            }
        }
    }
    (sb, producers)
}

/// Networks as sets of member positions, independent of ids and entity keys.
fn partition(sb: &Sandbox) -> BTreeSet<Vec<(i32, i32)>> {
    sb.module
        .networks()
        .map(|net| {
            let mut tiles: Vec<(i32, i32)> = net
                .all_refs()
                .filter_map(|r| sb.module.node(r.entity))
                .map(|n| (n.origin.x, n.origin.y))
                .collect();
            tiles.sort();
            tiles
        })
        .collect()
}

fn run(sb: &mut Sandbox, producers: &[NodeRef], ticks: usize) {
    for _ in 0..ticks {
        for p in producers {
            sb.module.adjust_buffer(*p, 10.0).unwrap();
        }
        sb.tick();
    }
}

// ===========================================================================
// Properties
// ===========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Placement order never changes the resulting partition.
    #[test]
    fn discovery_is_order_independent(layout in arb_layout()) {
        let n = layout.len();
        let (mut forward, _) = build(&layout, 0..n);
        let (mut backward, _) = build(&layout, (0..n).rev());
        forward.tick();
        backward.tick();
        prop_assert_eq!(partition(&forward), partition(&backward));
    }

    /// A full rebuild of an unchanged world reproduces the same partition.
    #[test]
    fn rebuild_is_idempotent(layout in arb_layout()) {
        let (mut sb, _) = build(&layout, 0..layout.len());
        sb.tick();
        let before = partition(&sb);
        sb.module.mark_all_stale();
        sb.tick();
        prop_assert_eq!(partition(&sb), before);
    }

    /// Rebuilding without topology change keeps the stored volume.
    #[test]
    fn volume_survives_rebuild(layout in arb_layout(), ticks in 1usize..12) {
        let (mut sb, producers) = build(&layout, 0..layout.len());
        run(&mut sb, &producers, ticks);
        let before = sb.module.total_volume();

        sb.module.mark_all_stale();
        sb.module.recompute(&sb.grid);
        let after = sb.module.total_volume();

        // Pro-rating truncates in the last fractional bit per member.
        let tolerance = fixed(0.001);
        prop_assert!(after <= before);
        prop_assert!(before - after <= tolerance, "lost {} of {}", before - after, before);
    }

    /// Stored volume stays within `[0, max_volume]` on every tick.
    #[test]
    fn volume_stays_in_bounds(layout in arb_layout(), ticks in 1usize..20) {
        let (mut sb, producers) = build(&layout, 0..layout.len());
        for _ in 0..ticks {
            run(&mut sb, &producers, 1);
            for net in sb.module.networks() {
                prop_assert!(net.current_volume >= Fixed64::ZERO);
                prop_assert!(net.current_volume <= net.max_volume);
            }
        }
    }

    /// What goes in minus what comes out is exactly what was stored.
    #[test]
    fn flow_is_conserved(layout in arb_layout(), ticks in 1usize..10) {
        let (mut sb, producers) = build(&layout, 0..layout.len());
        run(&mut sb, &producers, ticks);
        for net in sb.module.networks() {
            if let Some(flow) = sb.module.last_flow(net.id) {
                prop_assert_eq!(
                    flow.actual_production - flow.actual_consumption,
                    flow.volume_after - flow.volume_before
                );
                prop_assert!(flow.actual_production <= flow.potential_production);
                prop_assert!(flow.actual_consumption <= flow.potential_consumption);
            }
        }
    }

    /// Rebuilding only the stale area after each batch of edits yields the
    /// same networks as rebuilding everything.
    #[test]
    fn scoped_matches_full_under_edits(edits in arb_edits()) {
        let mut scoped = Sandbox::new();
        let mut full = Sandbox::with_config(NetworkConfig::full());
        let mut scoped_placed = HashMap::new();
        let mut full_placed = HashMap::new();

        for edit in edits.iter().copied().chain([Edit::Tick]) {
            apply(&mut scoped, &mut scoped_placed, edit);
            apply(&mut full, &mut full_placed, edit);
            if matches!(edit, Edit::Tick) {
                prop_assert_eq!(partition(&scoped), partition(&full));
            }
        }
    }

    /// Connectors of different grades never share a network.
    #[test]
    fn grades_never_mix(layout in arb_layout()) {
        let (mut sb, _) = build(&layout, 0..layout.len());
        sb.tick();
        for net in sb.module.networks() {
            let masks: HashSet<_> = net
                .members
                .iter()
                .filter_map(|r| sb.module.node(r.entity))
                .filter_map(|n| match &n.kind {
                    NodeKind::Connector(c) => Some(c.mask),
                    NodeKind::Slots(_) => None,
                })
                .collect();
            prop_assert!(masks.len() <= 1, "mixed grades {:?}", masks);
        }
    }

    /// Every claimed node points at a live network that lists it, and every
    /// listed node points back.
    #[test]
    fn claims_match_membership(layout in arb_layout()) {
        let (mut sb, _) = build(&layout, 0..layout.len());
        sb.tick();
        for (entity, node) in sb.module.nodes() {
            for slot in node.parts() {
                let r = NodeRef { entity, slot };
                if let Some(id) = sb.module.network_of(r) {
                    let net = sb.module.network(id);
                    prop_assert!(net.is_some_and(|n| n.contains(&r)));
                }
            }
        }
        for net in sb.module.networks() {
            for r in net.all_refs() {
                prop_assert_eq!(sb.module.network_of(*r), Some(net.id));
            }
        }
    }
}
