//! Gridflow Networks -- discovery and balancing of resource networks.
//!
//! Connectors, pins and tunnels placed on a tile grid are partitioned into
//! type-homogeneous [`Network`]s by a breadth-first flood fill. Each tick
//! every network balances its producers against its consumers, banking
//! surplus in (or drawing deficit from) the storage its connectors provide.
//!
//! # Layout
//!
//! - [`node`] -- connector, pin and tunnel records.
//! - [`search`] / [`tunnel`] -- adjacency and remote tunnel pairing.
//! - [`discovery`] -- full and scoped rebuilds with volume carry-over.
//! - [`dirty`] -- stale regions collected between ticks.
//! - [`balance`] -- the per-network conservation step.
//! - [`module`] -- [`NetworkModule`], the owner of all of the above.
//! - [`snapshot`] -- volume persistence across save/load.
//!
//! Every quantity is a [`Fixed64`](gridflow_core::fixed::Fixed64), so a
//! given sequence of changes balances identically on every platform.

pub mod balance;
pub mod behavior;
pub mod buffers;
pub mod config;
pub mod dirty;
pub mod discovery;
pub mod error;
pub mod event;
pub mod module;
pub mod network;
pub mod node;
pub mod search;
pub mod snapshot;
pub mod tunnel;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use balance::FlowReport;
pub use behavior::{Behaviors, ConstantSink, ConstantSource, ResourceBehavior};
pub use buffers::PinBuffers;
pub use config::{DiscoveryMode, NetworkConfig};
pub use dirty::{StaleAreaTracker, StaleSet};
pub use discovery::RecomputeOutcome;
pub use error::NetError;
pub use event::NetworkEvent;
pub use module::NetworkModule;
pub use network::Network;
pub use node::{Connector, Node, NodeKind, NodeRef, Pin, PinRole, Slot, SlotKind, Tunnel};
pub use snapshot::{RestoreReport, VolumeSnapshot};
