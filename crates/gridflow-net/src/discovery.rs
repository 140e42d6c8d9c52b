//! Network discovery: breadth-first flood fill from every unclaimed seed.
//!
//! A pass either rebuilds the whole world or only the networks touching a
//! set of stale regions. In both cases the rebuilt nodes are released first
//! (their network id moves to `previous`), then every unclaimed connector or
//! tunnel among them seeds a fresh [`Network`]. Stored volume is carried
//! forward member by member, pro-rated by the old network's fill ratio.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use gridflow_core::fixed::Fixed64;
use gridflow_core::id::{EntityId, NetworkId, TypeMask};
use gridflow_spatial::{GridTopology, TileRect};
use log::{debug, trace};
use slotmap::SlotMap;

use crate::network::{Network, VolumeRecord};
use crate::node::{Node, NodeKind, NodeRef, PinRole, SlotKind};
use crate::search::{SearchOrigin, find_links, find_targets};
use crate::tunnel::find_paired_tunnel;

/// Which part of the world a pass rebuilds.
#[derive(Debug, Clone, Copy)]
pub enum Scope<'a> {
    /// Every node in the arena.
    Full,
    /// Nodes overlapping `regions`, tunnels reaching into them and every
    /// node of the explicitly stale `networks`, grown by everything those
    /// nodes could link to and by whole networks.
    Scoped {
        regions: &'a [TileRect],
        networks: &'a BTreeSet<NetworkId>,
    },
}

/// Summary of one discovery pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecomputeOutcome {
    /// Networks created by this pass, in creation order.
    pub created: Vec<NetworkId>,
    /// Networks destroyed by this pass.
    pub retired: Vec<NetworkId>,
    /// Number of entities released and reconsidered.
    pub reconsidered: usize,
}

impl RecomputeOutcome {
    pub fn is_noop(&self) -> bool {
        self.created.is_empty() && self.retired.is_empty() && self.reconsidered == 0
    }
}

/// Owns the live networks and the id counter.
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    networks: BTreeMap<NetworkId, Network>,
    /// Volume of networks destroyed by the pass in flight (or restored from
    /// a snapshot), keyed by the id nodes still carry in `previous`.
    carry: BTreeMap<NetworkId, VolumeRecord>,
    /// Entities with tunnel slots. Rebuilt by every full pass and extended
    /// by scoped passes, which always see newly placed nodes in their regions.
    tunnels: BTreeSet<EntityId>,
    next_id: u32,
}

impl Discovery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn networks(&self) -> &BTreeMap<NetworkId, Network> {
        &self.networks
    }

    pub fn networks_mut(&mut self) -> &mut BTreeMap<NetworkId, Network> {
        &mut self.networks
    }

    pub fn network(&self, id: NetworkId) -> Option<&Network> {
        self.networks.get(&id)
    }

    /// The id the next created network will receive.
    pub fn next_id(&self) -> NetworkId {
        NetworkId(self.next_id)
    }

    /// Register volume for nodes whose `previous` link names `id`, so the
    /// next pass carries it forward. Used when restoring a snapshot.
    pub fn seed_carry(&mut self, id: NetworkId, record: VolumeRecord) {
        self.carry.insert(id, record);
        // Never hand out an id that a restored link still refers to.
        self.next_id = self.next_id.max(id.0.saturating_add(1));
    }

    fn allocate(&mut self) -> NetworkId {
        let id = NetworkId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        id
    }

    /// Rebuild the networks covered by `scope`.
    ///
    /// An empty scoped pass (no regions, no networks) does nothing.
    pub fn recompute<G: GridTopology + ?Sized>(
        &mut self,
        nodes: &mut SlotMap<EntityId, Node>,
        grid: &G,
        scope: Scope<'_>,
    ) -> RecomputeOutcome {
        let (entities, stale) = self.collect(nodes, grid, scope);
        if entities.is_empty() && stale.is_empty() {
            return RecomputeOutcome::default();
        }

        // Step 1: release every reconsidered node and retire its network.
        for &entity in &entities {
            if let Some(node) = nodes.get_mut(entity) {
                for claim in node.claims_mut() {
                    claim.release();
                }
            }
        }
        let mut retired = Vec::with_capacity(stale.len());
        for id in &stale {
            if let Some(old) = self.networks.remove(id) {
                self.carry.insert(*id, VolumeRecord::from(&old));
                retired.push(*id);
            }
        }

        // Step 2: flood fill from every seed that is still unclaimed.
        let mut created = Vec::new();
        for &entity in &entities {
            let Some(parts) = nodes.get(entity).map(Node::parts) else {
                continue;
            };
            for slot in parts {
                let seed = NodeRef { entity, slot };
                let unclaimed_seed = nodes.get(entity).is_some_and(|n| {
                    n.is_seed(slot) && n.claim(slot).is_some_and(|c| !c.is_claimed())
                });
                if !unclaimed_seed {
                    continue;
                }
                let network = self.flood(nodes, grid, seed);
                created.push(network.id);
                self.networks.insert(network.id, network);
            }
        }

        // Step 3: volume links are single-use; drop whatever was not picked up.
        for &entity in &entities {
            if let Some(node) = nodes.get_mut(entity) {
                for claim in node.claims_mut() {
                    claim.previous = None;
                }
            }
        }
        self.carry.clear();

        debug!(
            "discovery: reconsidered {} entities, retired {} networks, created {}",
            entities.len(),
            retired.len(),
            created.len()
        );

        RecomputeOutcome {
            created,
            retired,
            reconsidered: entities.len(),
        }
    }

    /// Entities to release (in deterministic seed order) and the networks
    /// they currently belong to.
    ///
    /// A scoped pass closes its starting set over every possible link,
    /// claimed or not, and over whole networks. Nothing outside the result
    /// can reach inside it, so rebuilding it alone yields the same networks
    /// a full pass would.
    fn collect<G: GridTopology + ?Sized>(
        &mut self,
        nodes: &SlotMap<EntityId, Node>,
        grid: &G,
        scope: Scope<'_>,
    ) -> (Vec<EntityId>, BTreeSet<NetworkId>) {
        let mut entities: BTreeSet<EntityId> = BTreeSet::new();
        let mut stale: BTreeSet<NetworkId> = BTreeSet::new();

        match scope {
            Scope::Full => {
                entities.extend(nodes.keys());
                stale.extend(self.networks.keys().copied());
                self.tunnels = nodes
                    .iter()
                    .filter(|(_, n)| n.has_tunnels())
                    .map(|(e, _)| e)
                    .collect();
            }
            Scope::Scoped { regions, networks } => {
                self.tunnels.retain(|e| nodes.contains_key(*e));

                let mut queue: Vec<EntityId> = Vec::new();
                for rect in regions {
                    queue.extend(grid.entities_in_rect(rect));
                }
                // Tunnels placed elsewhere whose reach crosses a region.
                queue.extend(self.reaching(nodes, regions));
                for id in networks.iter().filter(|id| self.networks.contains_key(*id)) {
                    stale.insert(*id);
                    queue.extend(self.members_of(*id));
                }

                while let Some(entity) = queue.pop() {
                    let Some(node) = nodes.get(entity) else {
                        continue;
                    };
                    if !entities.insert(entity) {
                        continue;
                    }
                    for id in node.networks() {
                        if stale.insert(id) {
                            queue.extend(self.members_of(id));
                        }
                    }
                    queue.extend(find_links(nodes, grid, entity));
                    if node.has_tunnels() {
                        queue.extend(self.reaching(nodes, &[node.rect()]));
                    }
                }

                self.tunnels.extend(
                    entities
                        .iter()
                        .filter(|e| nodes.get(**e).is_some_and(Node::has_tunnels)),
                );
            }
        }

        let mut ordered: Vec<EntityId> = entities.into_iter().collect();
        ordered.sort_by_key(|e| (nodes.get(*e).map(|n| (n.origin.y, n.origin.x)), *e));
        (ordered, stale)
    }

    /// Entities of a live network.
    fn members_of(&self, id: NetworkId) -> Vec<EntityId> {
        self.networks
            .get(&id)
            .map(|n| n.all_refs().map(|r| r.entity).collect())
            .unwrap_or_default()
    }

    /// Known tunnels whose reach overlaps any of `rects`.
    fn reaching(&self, nodes: &SlotMap<EntityId, Node>, rects: &[TileRect]) -> Vec<EntityId> {
        self.tunnels
            .iter()
            .copied()
            .filter(|e| {
                nodes.get(*e).is_some_and(|n| {
                    n.tunnel_reach()
                        .iter()
                        .any(|ray| rects.iter().any(|r| r.intersects(ray)))
                })
            })
            .collect()
    }

    /// Build one network from `seed` with a FIFO worklist.
    fn flood<G: GridTopology + ?Sized>(
        &mut self,
        nodes: &mut SlotMap<EntityId, Node>,
        grid: &G,
        seed: NodeRef,
    ) -> Network {
        let id = self.allocate();
        let mut network = Network::new(id, seed);
        let mut mask = TypeMask::Any;
        let mut queue: VecDeque<NodeRef> = VecDeque::from([seed]);

        while let Some(current) = queue.pop_front() {
            let Some(node) = nodes.get_mut(current.entity) else {
                continue;
            };
            // Duplicate worklist entries are discarded here, not at push time.
            let Some(claim) = node.claim(current.slot) else {
                continue;
            };
            if claim.is_claimed() {
                continue;
            }
            let Some(node_mask) = node.mask(current.slot) else {
                continue;
            };
            if !mask.accepts(node_mask) {
                continue;
            }
            mask = mask.narrow(node_mask);

            let carried = self.take_carry(node, current.slot);
            network.current_volume = network.current_volume.saturating_add(carried);
            if let Some(claim) = node.claim_mut(current.slot) {
                claim.claim(id);
            }
            trace!("network {id:?} claimed {current:?}");

            let node = &nodes[current.entity];
            let (origin, directions, tunnel) = match (&node.kind, current.slot) {
                (NodeKind::Connector(c), _) => {
                    network.members.push(current);
                    (
                        SearchOrigin::Area(node.rect()),
                        node.connector_directions(c),
                        false,
                    )
                }
                (NodeKind::Slots(slots), Some(i)) => {
                    let slot = &slots[i];
                    let is_tunnel = match &slot.kind {
                        SlotKind::Pin(pin) => {
                            match pin.role {
                                PinRole::Producer => network.producers.push(current),
                                PinRole::Consumer => network.consumers.push(current),
                            }
                            false
                        }
                        SlotKind::Tunnel(_) => {
                            network.members.push(current);
                            true
                        }
                    };
                    (
                        SearchOrigin::Tile(node.slot_position(slot)),
                        vec![node.slot_direction(slot)],
                        is_tunnel,
                    )
                }
                (NodeKind::Slots(_), None) => continue,
            };

            queue.extend(find_targets(
                nodes,
                grid,
                Some(current.entity),
                origin,
                &directions,
                mask,
            ));
            if tunnel && let Some(pair) = find_paired_tunnel(nodes, grid, current, mask) {
                queue.push_back(pair);
            }
        }

        network.mask = mask;
        network.refresh_limits(nodes);
        network
    }

    /// Pro-rated charge a member brings from its previous network.
    fn take_carry(&self, node: &mut Node, slot: Option<usize>) -> Fixed64 {
        let capacity = node
            .member_limits(slot)
            .map(|l| l.capacity)
            .unwrap_or(Fixed64::ZERO);
        let Some(claim) = node.claim_mut(slot) else {
            return Fixed64::ZERO;
        };
        let Some(previous) = claim.previous.take() else {
            return Fixed64::ZERO;
        };
        self.carry
            .get(&previous)
            .map(|record| record.share(capacity))
            .unwrap_or(Fixed64::ZERO)
    }
}
