//! The discovered network record and its derived limits.

use gridflow_core::fixed::{self, Fixed64};
use gridflow_core::id::{EntityId, NetworkId, TypeMask};
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

use crate::node::{Node, NodeRef};

/// A connected, type-homogeneous set of connectors, tunnels and pins.
///
/// Networks are rebuilt from scratch by discovery and never patched; only
/// the stored volume survives a rebuild, pro-rated onto the new networks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Network {
    pub id: NetworkId,
    /// Grade carried by this network, fixed by its first typed node.
    pub mask: TypeMask,
    /// The connector or tunnel the traversal started from.
    pub seed: NodeRef,
    /// Connectors and tunnel slots (capacity contributors).
    pub members: Vec<NodeRef>,
    /// Producer pin slots.
    pub producers: Vec<NodeRef>,
    /// Consumer pin slots.
    pub consumers: Vec<NodeRef>,
    /// Sum of member capacities.
    pub max_volume: Fixed64,
    /// Weakest member throughput scaled by the wider side's pin count.
    pub max_throughput: Fixed64,
    /// Stored units, kept in `[0, max_volume]`.
    pub current_volume: Fixed64,
    /// Units moved through the network on the last balanced tick.
    pub current_throughput: Fixed64,
    /// Whether consumers were short-changed on the last balanced tick.
    pub was_starved: bool,
    pub was_full: bool,
    pub was_empty: bool,
}

impl Network {
    pub fn new(id: NetworkId, seed: NodeRef) -> Self {
        Self {
            id,
            mask: TypeMask::Any,
            seed,
            members: Vec::new(),
            producers: Vec::new(),
            consumers: Vec::new(),
            max_volume: Fixed64::ZERO,
            max_throughput: Fixed64::ZERO,
            current_volume: Fixed64::ZERO,
            current_throughput: Fixed64::ZERO,
            was_starved: false,
            was_full: false,
            was_empty: true,
        }
    }

    /// Recompute `max_volume` and `max_throughput` from member records and
    /// clamp the stored volume into the new bound.
    pub fn refresh_limits(&mut self, nodes: &SlotMap<EntityId, Node>) {
        let mut max_volume = Fixed64::ZERO;
        let mut weakest: Option<Fixed64> = None;

        for member in &self.members {
            let Some(limits) = nodes
                .get(member.entity)
                .and_then(|n| n.member_limits(member.slot))
            else {
                continue;
            };
            max_volume = max_volume.saturating_add(limits.capacity);
            weakest = Some(weakest.map_or(limits.throughput, |w| w.min(limits.throughput)));
        }

        let parallelism = self.producers.len().max(self.consumers.len());
        self.max_volume = max_volume;
        self.max_throughput = fixed::scale(weakest.unwrap_or(Fixed64::ZERO), parallelism);
        self.current_volume = fixed::clamp(self.current_volume, Fixed64::ZERO, self.max_volume);
        self.was_full = self.is_full();
        self.was_empty = self.is_empty();
    }

    /// Stored fraction in `[0, 1]`; zero for a network without capacity.
    pub fn fill_ratio(&self) -> Fixed64 {
        fixed::ratio(self.current_volume, self.max_volume)
            .map(|r| fixed::clamp(r, Fixed64::ZERO, Fixed64::ONE))
            .unwrap_or(Fixed64::ZERO)
    }

    pub fn is_full(&self) -> bool {
        self.max_volume > Fixed64::ZERO && self.current_volume >= self.max_volume
    }

    pub fn is_empty(&self) -> bool {
        self.current_volume <= Fixed64::ZERO
    }

    /// Every node reference in this network.
    pub fn all_refs(&self) -> impl Iterator<Item = &NodeRef> {
        self.members
            .iter()
            .chain(self.producers.iter())
            .chain(self.consumers.iter())
    }

    pub fn contains(&self, node: &NodeRef) -> bool {
        self.all_refs().any(|r| r == node)
    }

    /// Total number of nodes of any role.
    pub fn len(&self) -> usize {
        self.members.len() + self.producers.len() + self.consumers.len()
    }

    pub fn is_empty_network(&self) -> bool {
        self.len() == 0
    }
}

/// The part of a retired network that outlives a rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeRecord {
    pub current_volume: Fixed64,
    pub max_volume: Fixed64,
}

impl VolumeRecord {
    /// Charge a member of `capacity` carries forward from this network.
    pub fn share(&self, capacity: Fixed64) -> Fixed64 {
        match fixed::ratio(self.current_volume, self.max_volume) {
            Some(r) => capacity.saturating_mul(fixed::clamp(r, Fixed64::ZERO, Fixed64::ONE)),
            None => Fixed64::ZERO,
        }
    }
}

impl From<&Network> for VolumeRecord {
    fn from(n: &Network) -> Self {
        Self {
            current_volume: n.current_volume,
            max_volume: n.max_volume,
        }
    }
}
