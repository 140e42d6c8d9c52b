//! Node records: connectors, pin slots and tunnel slots.
//!
//! Every entity the network engine knows about is a [`Node`] stored in the
//! module's arena and addressed by [`EntityId`]. A node is either a passive
//! [`Connector`] or a building exposing one or more [`Slot`]s. Nodes refer to
//! their network by [`NetworkId`] only, never by reference.

use gridflow_core::fixed::Fixed64;
use gridflow_core::id::{EntityId, NetworkId, TypeMask};
use gridflow_spatial::{Direction, Footprint, GridPosition, Rotation, TileRect};
use serde::{Deserialize, Serialize};

/// Default `max_buffer` multiple of a pin's `max_rate`.
pub const DEFAULT_BUFFER_FACTOR: u32 = 3;

// ---------------------------------------------------------------------------
// References and claims
// ---------------------------------------------------------------------------

/// Addresses a connector (`slot = None`) or one slot of a building.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeRef {
    pub entity: EntityId,
    pub slot: Option<usize>,
}

impl NodeRef {
    pub fn connector(entity: EntityId) -> Self {
        Self { entity, slot: None }
    }

    pub fn slot(entity: EntityId, slot: usize) -> Self {
        Self {
            entity,
            slot: Some(slot),
        }
    }
}

/// Network membership of a single connector or slot.
///
/// `previous` is only populated while a recompute is in flight (or right
/// after a snapshot restore) and names the network whose stored volume this
/// node should carry forward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub network: Option<NetworkId>,
    pub previous: Option<NetworkId>,
}

impl Claim {
    pub fn is_claimed(&self) -> bool {
        self.network.is_some()
    }

    /// Assign to a network. Claiming twice is a traversal bug.
    pub fn claim(&mut self, id: NetworkId) {
        debug_assert!(
            self.network.is_none(),
            "node already claimed by {:?}, reclaimed by {id:?}",
            self.network
        );
        self.network = Some(id);
    }

    /// Detach ahead of a rebuild, remembering the old network.
    pub fn release(&mut self) {
        if let Some(id) = self.network.take() {
            self.previous = Some(id);
        }
    }
}

// ---------------------------------------------------------------------------
// Connector
// ---------------------------------------------------------------------------

/// A passive node that carries resource between networked nodes and
/// contributes storage capacity and a throughput cap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connector {
    pub mask: TypeMask,
    /// Resource units storable in this connector.
    pub capacity: Fixed64,
    /// Units per tick this connector can pass.
    pub throughput: Fixed64,
    /// Local `{from, to}` pair this connector links through. `None` links
    /// all four sides.
    pub allowed_directions: Option<(Direction, Direction)>,
    #[serde(default)]
    pub claim: Claim,
}

impl Connector {
    pub fn new(mask: TypeMask, capacity: Fixed64, throughput: Fixed64) -> Self {
        Self {
            mask,
            capacity,
            throughput,
            allowed_directions: None,
            claim: Claim::default(),
        }
    }

    /// Restrict linking to a `{from, to}` pair of local directions.
    pub fn with_directions(mut self, from: Direction, to: Direction) -> Self {
        self.allowed_directions = Some((from, to));
        self
    }
}

// ---------------------------------------------------------------------------
// Slots
// ---------------------------------------------------------------------------

/// Whether a pin feeds resource into its network or draws from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PinRole {
    Producer,
    Consumer,
}

/// An active endpoint with a bounded buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pin {
    pub role: PinRole,
    /// Units per tick this pin can produce or accept.
    pub max_rate: Fixed64,
    /// Current stored units, kept in `[0, max_buffer]`.
    pub buffer: Fixed64,
    pub max_buffer: Fixed64,
}

impl Pin {
    /// A pin with `max_buffer = 3 × max_rate` and an empty buffer.
    pub fn new(role: PinRole, max_rate: Fixed64) -> Self {
        Self::with_buffer_factor(role, max_rate, DEFAULT_BUFFER_FACTOR)
    }

    pub fn with_buffer_factor(role: PinRole, max_rate: Fixed64, factor: u32) -> Self {
        Self {
            role,
            max_rate,
            buffer: Fixed64::ZERO,
            max_buffer: max_rate.saturating_mul_int(i64::from(factor)),
        }
    }

    pub fn producer(max_rate: Fixed64) -> Self {
        Self::new(PinRole::Producer, max_rate)
    }

    pub fn consumer(max_rate: Fixed64) -> Self {
        Self::new(PinRole::Consumer, max_rate)
    }

    pub fn with_max_buffer(mut self, max_buffer: Fixed64) -> Self {
        self.max_buffer = max_buffer;
        self.buffer = gridflow_core::fixed::clamp(self.buffer, Fixed64::ZERO, max_buffer);
        self
    }

    pub fn with_buffer(mut self, buffer: Fixed64) -> Self {
        self.buffer = gridflow_core::fixed::clamp(buffer, Fixed64::ZERO, self.max_buffer);
        self
    }

    /// Room left in the buffer.
    pub fn headroom(&self) -> Fixed64 {
        (self.max_buffer - self.buffer).max(Fixed64::ZERO)
    }
}

/// A slot that links to the nearest facing tunnel within `max_hop_length`
/// tiles instead of (in addition to) its adjacent tile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tunnel {
    /// Local direction in which the partner is searched.
    pub tunnel_direction: Direction,
    pub max_hop_length: u32,
    #[serde(default)]
    pub capacity: Fixed64,
    pub throughput: Fixed64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SlotKind {
    Pin(Pin),
    Tunnel(Tunnel),
}

/// A directional endpoint on a building.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    /// Local tile offset inside the unrotated footprint.
    pub position: (i32, i32),
    /// Local outward direction.
    pub direction: Direction,
    pub mask: TypeMask,
    pub kind: SlotKind,
    #[serde(default)]
    pub claim: Claim,
}

impl Slot {
    pub fn pin(position: (i32, i32), direction: Direction, mask: TypeMask, pin: Pin) -> Self {
        Self {
            position,
            direction,
            mask,
            kind: SlotKind::Pin(pin),
            claim: Claim::default(),
        }
    }

    pub fn tunnel(
        position: (i32, i32),
        direction: Direction,
        mask: TypeMask,
        tunnel: Tunnel,
    ) -> Self {
        Self {
            position,
            direction,
            mask,
            kind: SlotKind::Tunnel(tunnel),
            claim: Claim::default(),
        }
    }

    pub fn as_pin(&self) -> Option<&Pin> {
        match &self.kind {
            SlotKind::Pin(p) => Some(p),
            SlotKind::Tunnel(_) => None,
        }
    }

    pub fn as_pin_mut(&mut self) -> Option<&mut Pin> {
        match &mut self.kind {
            SlotKind::Pin(p) => Some(p),
            SlotKind::Tunnel(_) => None,
        }
    }

    pub fn as_tunnel(&self) -> Option<&Tunnel> {
        match &self.kind {
            SlotKind::Tunnel(t) => Some(t),
            SlotKind::Pin(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    Connector(Connector),
    Slots(Vec<Slot>),
}

/// A placed entity as seen by the network engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Top-left tile of the rotated footprint.
    pub origin: GridPosition,
    pub footprint: Footprint,
    #[serde(default)]
    pub rotation: Rotation,
    pub kind: NodeKind,
}

/// Capacity and throughput a member contributes to its network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberLimits {
    pub capacity: Fixed64,
    pub throughput: Fixed64,
}

impl Node {
    /// A 1x1 connector.
    pub fn connector(origin: GridPosition, connector: Connector) -> Self {
        Self {
            origin,
            footprint: Footprint::single(),
            rotation: Rotation::None,
            kind: NodeKind::Connector(connector),
        }
    }

    /// A building exposing `slots`.
    pub fn building(origin: GridPosition, footprint: Footprint, slots: Vec<Slot>) -> Self {
        Self {
            origin,
            footprint,
            rotation: Rotation::None,
            kind: NodeKind::Slots(slots),
        }
    }

    pub fn rotated(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    /// World rectangle covered by this node.
    pub fn rect(&self) -> TileRect {
        self.footprint.rect(self.origin, self.rotation)
    }

    pub fn as_connector(&self) -> Option<&Connector> {
        match &self.kind {
            NodeKind::Connector(c) => Some(c),
            NodeKind::Slots(_) => None,
        }
    }

    pub fn as_connector_mut(&mut self) -> Option<&mut Connector> {
        match &mut self.kind {
            NodeKind::Connector(c) => Some(c),
            NodeKind::Slots(_) => None,
        }
    }

    pub fn slots(&self) -> &[Slot] {
        match &self.kind {
            NodeKind::Slots(s) => s,
            NodeKind::Connector(_) => &[],
        }
    }

    pub fn slot(&self, index: usize) -> Option<&Slot> {
        self.slots().get(index)
    }

    pub fn slot_mut(&mut self, index: usize) -> Option<&mut Slot> {
        match &mut self.kind {
            NodeKind::Slots(s) => s.get_mut(index),
            NodeKind::Connector(_) => None,
        }
    }

    /// World tile a slot sits on.
    pub fn slot_position(&self, slot: &Slot) -> GridPosition {
        let (dx, dy) = self.footprint.rotate_offset(slot.position, self.rotation);
        self.origin.offset(dx, dy)
    }

    /// World outward direction of a slot.
    pub fn slot_direction(&self, slot: &Slot) -> Direction {
        slot.direction.rotated(self.rotation)
    }

    /// World direction a tunnel slot searches for its partner.
    pub fn tunnel_direction(&self, tunnel: &Tunnel) -> Direction {
        tunnel.tunnel_direction.rotated(self.rotation)
    }

    /// World directions a connector links through.
    pub fn connector_directions(&self, connector: &Connector) -> Vec<Direction> {
        match connector.allowed_directions {
            Some((from, to)) => {
                let from = from.rotated(self.rotation);
                let to = to.rotated(self.rotation);
                if from == to { vec![from] } else { vec![from, to] }
            }
            None => Direction::all().to_vec(),
        }
    }

    /// The claim addressed by `slot` (`None` for the connector itself).
    pub fn claim(&self, slot: Option<usize>) -> Option<&Claim> {
        match (&self.kind, slot) {
            (NodeKind::Connector(c), None) => Some(&c.claim),
            (NodeKind::Slots(s), Some(i)) => s.get(i).map(|s| &s.claim),
            _ => None,
        }
    }

    pub fn claim_mut(&mut self, slot: Option<usize>) -> Option<&mut Claim> {
        match (&mut self.kind, slot) {
            (NodeKind::Connector(c), None) => Some(&mut c.claim),
            (NodeKind::Slots(s), Some(i)) => s.get_mut(i).map(|s| &mut s.claim),
            _ => None,
        }
    }

    /// Every addressable claim on this node, in slot order.
    pub fn claims_mut(&mut self) -> Vec<&mut Claim> {
        match &mut self.kind {
            NodeKind::Connector(c) => vec![&mut c.claim],
            NodeKind::Slots(s) => s.iter_mut().map(|s| &mut s.claim).collect(),
        }
    }

    /// Slot indices (or `None` for a connector) of every addressable part.
    pub fn parts(&self) -> Vec<Option<usize>> {
        match &self.kind {
            NodeKind::Connector(_) => vec![None],
            NodeKind::Slots(s) => (0..s.len()).map(Some).collect(),
        }
    }

    /// Networks any part of this node currently belongs to.
    pub fn networks(&self) -> Vec<NetworkId> {
        let mut ids: Vec<NetworkId> = match &self.kind {
            NodeKind::Connector(c) => c.claim.network.into_iter().collect(),
            NodeKind::Slots(s) => s.iter().filter_map(|s| s.claim.network).collect(),
        };
        ids.sort();
        ids.dedup();
        ids
    }

    pub fn mask(&self, slot: Option<usize>) -> Option<TypeMask> {
        match (&self.kind, slot) {
            (NodeKind::Connector(c), None) => Some(c.mask),
            (NodeKind::Slots(s), Some(i)) => s.get(i).map(|s| s.mask),
            _ => None,
        }
    }

    /// Whether this part can start a traversal (connectors and tunnels).
    pub fn is_seed(&self, slot: Option<usize>) -> bool {
        match (&self.kind, slot) {
            (NodeKind::Connector(_), None) => true,
            (NodeKind::Slots(s), Some(i)) => s.get(i).is_some_and(|s| s.as_tunnel().is_some()),
            _ => false,
        }
    }

    /// Capacity/throughput contributed by a member part; pins contribute none.
    pub fn member_limits(&self, slot: Option<usize>) -> Option<MemberLimits> {
        match (&self.kind, slot) {
            (NodeKind::Connector(c), None) => Some(MemberLimits {
                capacity: c.capacity,
                throughput: c.throughput,
            }),
            (NodeKind::Slots(s), Some(i)) => s.get(i)?.as_tunnel().map(|t| MemberLimits {
                capacity: t.capacity,
                throughput: t.throughput,
            }),
            _ => None,
        }
    }

    /// Regions whose contents a change to this node can affect: the
    /// footprint grown by `margin`, plus the reach of every tunnel slot.
    pub fn influence(&self, margin: i32) -> Vec<TileRect> {
        let mut rects = vec![self.rect().expand(margin)];
        rects.extend(self.tunnel_reach());
        rects
    }

    pub fn has_tunnels(&self) -> bool {
        self.slots().iter().any(|s| s.as_tunnel().is_some())
    }

    /// Tiles each tunnel slot scans for a partner.
    pub fn tunnel_reach(&self) -> Vec<TileRect> {
        self.slots()
            .iter()
            .filter_map(|slot| {
                let tunnel = slot.as_tunnel()?;
                TileRect::ray(
                    self.slot_position(slot),
                    self.tunnel_direction(tunnel),
                    tunnel.max_hop_length,
                )
            })
            .collect()
    }
}
