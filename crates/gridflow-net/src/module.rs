//! The network module: node arena, change feed and per-tick orchestration.
//!
//! Topology changes go through explicit setters that only mark regions
//! stale. [`NetworkModule::tick`] then runs at most one discovery pass
//! followed by one balance step per network, and reports transitions as
//! [`NetworkEvent`]s.

use std::collections::BTreeMap;

use gridflow_core::fixed::{Fixed64, Ticks, fixed64_to_f64};
use gridflow_core::id::{EntityId, NetworkId};
use gridflow_spatial::{GridTopology, Rotation, TileRect};
use log::debug;
use slotmap::SlotMap;

use crate::balance::{FlowReport, balance};
use crate::buffers::{PinBuffers, adjust_pin};
use crate::config::{DiscoveryMode, NetworkConfig};
use crate::dirty::StaleAreaTracker;
use crate::discovery::{Discovery, RecomputeOutcome, Scope};
use crate::error::NetError;
use crate::event::NetworkEvent;
use crate::network::Network;
use crate::node::{Connector, Node, NodeRef, Pin};

#[derive(Debug, Clone, Default)]
pub struct NetworkModule {
    pub(crate) nodes: SlotMap<EntityId, Node>,
    pub(crate) discovery: Discovery,
    pub(crate) stale: StaleAreaTracker,
    config: NetworkConfig,
    pub(crate) flows: BTreeMap<NetworkId, FlowReport>,
}

impl NetworkModule {
    pub fn new(config: NetworkConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Topology feed
    // -----------------------------------------------------------------------

    /// Register a node. The caller places it in its grid under the returned
    /// id before the next tick.
    pub fn add_node(&mut self, node: Node) -> EntityId {
        self.mark_influence(&node);
        self.nodes.insert(node)
    }

    /// Unregister a node; its networks are rebuilt on the next tick.
    pub fn remove_node(&mut self, entity: EntityId) -> Result<Node, NetError> {
        let node = self
            .nodes
            .remove(entity)
            .ok_or(NetError::UnknownEntity(entity))?;
        for id in node.networks() {
            self.stale.mark_network(id);
        }
        self.mark_influence(&node);
        Ok(node)
    }

    /// Rotate a node in place. Returns the node's new bounding box, which
    /// the caller applies to its grid.
    pub fn set_rotation(&mut self, entity: EntityId, rotation: Rotation) -> Result<TileRect, NetError> {
        let margin = self.config.margin();
        let node = self
            .nodes
            .get_mut(entity)
            .ok_or(NetError::UnknownEntity(entity))?;
        let before = node.influence(margin);
        node.rotation = rotation;
        let rect = node.rect();
        let after = node.influence(margin);
        let networks = node.networks();

        for r in before.into_iter().chain(after) {
            self.stale.mark_region(r);
        }
        for id in networks {
            self.stale.mark_network(id);
        }
        Ok(rect)
    }

    /// Edit a connector's properties (mask, capacity, directions, ...).
    pub fn update_connector<F>(&mut self, entity: EntityId, edit: F) -> Result<(), NetError>
    where
        F: FnOnce(&mut Connector),
    {
        let node = self
            .nodes
            .get_mut(entity)
            .ok_or(NetError::UnknownEntity(entity))?;
        let connector = node
            .as_connector_mut()
            .ok_or(NetError::NotAConnector(entity))?;
        let claim = connector.claim;
        edit(connector);
        // Membership is owned by discovery, not by the edit.
        connector.claim = claim;
        self.notify_changed(entity)
    }

    /// Topology feed entry for a node changed by means outside this module.
    pub fn notify_changed(&mut self, entity: EntityId) -> Result<(), NetError> {
        let node = self
            .nodes
            .get(entity)
            .ok_or(NetError::UnknownEntity(entity))?;
        let networks = node.networks();
        let regions = node.influence(self.config.margin());
        for id in networks {
            self.stale.mark_network(id);
        }
        for r in regions {
            self.stale.mark_region(r);
        }
        Ok(())
    }

    /// Mark an arbitrary tile region stale, grown by the configured margin.
    pub fn notify_region(&mut self, rect: TileRect) {
        self.stale.mark_region(rect.expand(self.config.margin()));
    }

    /// Force a full rebuild on the next tick.
    pub fn mark_all_stale(&mut self) {
        self.stale.mark_all();
    }

    pub fn is_stale(&self) -> bool {
        self.stale.is_dirty()
    }

    fn mark_influence(&mut self, node: &Node) {
        for r in node.influence(self.config.margin()) {
            self.stale.mark_region(r);
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn node(&self, entity: EntityId) -> Option<&Node> {
        self.nodes.get(entity)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (EntityId, &Node)> {
        self.nodes.iter()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// The pin at `slot`.
    pub fn pin(&self, slot: NodeRef) -> Result<&Pin, NetError> {
        let node = self
            .nodes
            .get(slot.entity)
            .ok_or(NetError::UnknownEntity(slot.entity))?;
        let index = slot.slot.ok_or(NetError::NotAPin(slot))?;
        node.slot(index)
            .ok_or(NetError::SlotOutOfRange {
                entity: slot.entity,
                slot: index,
            })?
            .as_pin()
            .ok_or(NetError::NotAPin(slot))
    }

    fn pin_mut(&mut self, slot: NodeRef) -> Result<&mut Pin, NetError> {
        let node = self
            .nodes
            .get_mut(slot.entity)
            .ok_or(NetError::UnknownEntity(slot.entity))?;
        let index = slot.slot.ok_or(NetError::NotAPin(slot))?;
        node.slot_mut(index)
            .ok_or(NetError::SlotOutOfRange {
                entity: slot.entity,
                slot: index,
            })?
            .as_pin_mut()
            .ok_or(NetError::NotAPin(slot))
    }

    /// Network the connector or slot currently belongs to.
    pub fn network_of(&self, node: NodeRef) -> Option<NetworkId> {
        self.nodes.get(node.entity)?.claim(node.slot)?.network
    }

    pub fn network(&self, id: NetworkId) -> Option<&Network> {
        self.discovery.network(id)
    }

    /// Live networks in id order.
    pub fn networks(&self) -> impl Iterator<Item = &Network> {
        self.discovery.networks().values()
    }

    pub fn network_count(&self) -> usize {
        self.discovery.networks().len()
    }

    /// Stored volume across every network.
    pub fn total_volume(&self) -> Fixed64 {
        self.networks()
            .fold(Fixed64::ZERO, |acc, n| acc.saturating_add(n.current_volume))
    }

    /// What the network moved on its last balanced tick.
    pub fn last_flow(&self, id: NetworkId) -> Option<&FlowReport> {
        self.flows.get(&id)
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    /// Run one discovery pass over everything marked stale. Does nothing when
    /// nothing is stale.
    pub fn recompute<G: GridTopology + ?Sized>(&mut self, grid: &G) -> RecomputeOutcome {
        let set = self.stale.take();
        if set.is_empty() {
            return RecomputeOutcome::default();
        }
        let scope = if set.full || self.config.mode == DiscoveryMode::Full {
            Scope::Full
        } else {
            Scope::Scoped {
                regions: &set.regions,
                networks: &set.networks,
            }
        };
        debug!(
            "recompute ({:?}): {} regions, {} stale networks",
            self.config.mode,
            set.regions.len(),
            set.networks.len()
        );
        let outcome = self.discovery.recompute(&mut self.nodes, grid, scope);
        for id in &outcome.retired {
            self.flows.remove(id);
        }
        outcome
    }

    /// Advance the module by one tick: rebuild stale networks, then balance
    /// every network.
    pub fn tick<G: GridTopology + ?Sized>(&mut self, grid: &G, current_tick: Ticks) -> Vec<NetworkEvent> {
        let mut events = Vec::new();

        let outcome = self.recompute(grid);
        events.extend(outcome.retired.iter().map(|&network_id| NetworkEvent::NetworkRetired {
            network_id,
            tick: current_tick,
        }));
        events.extend(outcome.created.iter().map(|&network_id| NetworkEvent::NetworkFormed {
            network_id,
            tick: current_tick,
        }));

        for network in self.discovery.networks_mut().values_mut() {
            let report = balance(network, &mut self.nodes);
            let network_id = network.id;

            let starved = report.is_some_and(|r| r.is_starved());
            if starved && !network.was_starved {
                events.push(NetworkEvent::Starved {
                    network_id,
                    shortfall: report.map_or(Fixed64::ZERO, |r| r.shortfall()),
                    tick: current_tick,
                });
            } else if !starved && network.was_starved {
                events.push(NetworkEvent::Satisfied {
                    network_id,
                    tick: current_tick,
                });
            }
            network.was_starved = starved;

            let full = network.is_full();
            if full && !network.was_full {
                events.push(NetworkEvent::StorageFull {
                    network_id,
                    tick: current_tick,
                });
            }
            network.was_full = full;

            let empty = network.is_empty();
            if empty && !network.was_empty {
                events.push(NetworkEvent::StorageEmpty {
                    network_id,
                    tick: current_tick,
                });
            }
            network.was_empty = empty;

            match report {
                Some(r) => {
                    self.flows.insert(network_id, r);
                }
                None => {
                    self.flows.remove(&network_id);
                }
            }
        }

        events
    }
}

impl PinBuffers for NetworkModule {
    fn read_buffer(&self, slot: NodeRef) -> Result<f64, NetError> {
        self.pin(slot).map(|p| fixed64_to_f64(p.buffer))
    }

    fn adjust_buffer(&mut self, slot: NodeRef, delta: f64) -> Result<f64, NetError> {
        self.pin_mut(slot).map(|p| adjust_pin(p, delta))
    }
}
