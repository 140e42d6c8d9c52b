//! Shared test helpers for unit tests, integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]`.

use gridflow_core::fixed::{Fixed64, Ticks};
use gridflow_core::id::{EntityId, ResourceTypeId, TypeMask};
use gridflow_spatial::{Direction, Footprint, GridPosition, Layer, Rotation, TileGrid};

use crate::config::NetworkConfig;
use crate::event::NetworkEvent;
use crate::module::NetworkModule;
use crate::node::{Connector, Node, NodeRef, Pin, Slot, Tunnel};

// ===========================================================================
// Values
// ===========================================================================

pub fn fixed(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

pub fn grade_a() -> TypeMask {
    TypeMask::Only(ResourceTypeId(0))
}

pub fn grade_b() -> TypeMask {
    TypeMask::Only(ResourceTypeId(1))
}

/// Capacity 200, throughput 50.
pub fn default_connector(mask: TypeMask) -> Connector {
    Connector::new(mask, fixed(200.0), fixed(50.0))
}

pub fn tunnel(facing: Direction, max_hop_length: u32) -> Tunnel {
    Tunnel {
        tunnel_direction: facing,
        max_hop_length,
        capacity: Fixed64::ZERO,
        throughput: fixed(50.0),
    }
}

// ===========================================================================
// Sandbox
// ===========================================================================

/// A [`NetworkModule`] paired with the [`TileGrid`] it discovers over.
///
/// Every helper keeps both in step, the way a host game would.
#[derive(Debug, Default)]
pub struct Sandbox {
    pub module: NetworkModule,
    pub grid: TileGrid,
    pub tick: Ticks,
}

impl Sandbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: NetworkConfig) -> Self {
        Self {
            module: NetworkModule::new(config),
            ..Self::default()
        }
    }

    pub fn add(&mut self, node: Node) -> EntityId {
        let rect = node.rect();
        let id = self.module.add_node(node);
        self.grid
            .place(id, rect, Layer(0))
            .expect("sandbox placement overlaps");
        id
    }

    pub fn remove(&mut self, entity: EntityId) -> Node {
        self.grid.remove(entity).expect("entity not placed");
        self.module.remove_node(entity).expect("entity not registered")
    }

    pub fn rotate(&mut self, entity: EntityId, rotation: Rotation) {
        let rect = self
            .module
            .set_rotation(entity, rotation)
            .expect("entity not registered");
        self.grid.relocate(entity, rect).expect("rotated footprint overlaps");
    }

    pub fn connector_at(&mut self, x: i32, y: i32, mask: TypeMask) -> EntityId {
        self.add(Node::connector(GridPosition::new(x, y), default_connector(mask)))
    }

    /// A 1x1 building with a single pin facing `dir`.
    pub fn pin_at(&mut self, x: i32, y: i32, dir: Direction, mask: TypeMask, pin: Pin) -> EntityId {
        self.add(Node::building(
            GridPosition::new(x, y),
            Footprint::single(),
            vec![Slot::pin((0, 0), dir, mask, pin)],
        ))
    }

    /// A 1x1 building with a single tunnel slot searching toward `facing`
    /// and linking locally on the opposite side.
    pub fn tunnel_at(&mut self, x: i32, y: i32, facing: Direction, hop: u32, mask: TypeMask) -> EntityId {
        self.add(Node::building(
            GridPosition::new(x, y),
            Footprint::single(),
            vec![Slot::tunnel((0, 0), facing.inverse(), mask, tunnel(facing, hop))],
        ))
    }

    /// `pin` at (0, 0) facing east into a default connector at (1, 0).
    pub fn chain(&mut self, pin: Pin) -> NodeRef {
        self.connector_at(1, 0, grade_a());
        NodeRef::slot(self.pin_at(0, 0, Direction::East, grade_a(), pin), 0)
    }

    /// Scenario layout: producer, `len` connectors, consumer along y = 0.
    /// Returns the producer and consumer slots.
    pub fn line(&mut self, len: i32, producer: Pin, consumer: Pin) -> (NodeRef, NodeRef) {
        let p = self.pin_at(0, 0, Direction::East, grade_a(), producer);
        for x in 1..=len {
            self.connector_at(x, 0, grade_a());
        }
        let c = self.pin_at(len + 1, 0, Direction::West, grade_a(), consumer);
        (NodeRef::slot(p, 0), NodeRef::slot(c, 0))
    }

    pub fn buffer(&self, slot: NodeRef) -> Fixed64 {
        self.module.pin(slot).map(|p| p.buffer).unwrap_or(Fixed64::ZERO)
    }

    pub fn tick(&mut self) -> Vec<NetworkEvent> {
        let events = self.module.tick(&self.grid, self.tick);
        self.tick += 1;
        events
    }
}
