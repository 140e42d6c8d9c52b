//! Per-tick conservation balancing of a single network.
//!
//! Producers offer what their buffers hold, consumers ask for what their
//! buffers can take, both capped by their own rate and by the network's
//! throughput. Whichever side is larger is scaled down by one ratio; the
//! difference is banked into or drawn from network storage. Every producer
//! (or every consumer) is scaled by the same ratio: there is no priority
//! between slots of the same role.

use gridflow_core::fixed::{self, Fixed64};
use gridflow_core::id::EntityId;
use slotmap::SlotMap;

use crate::network::Network;
use crate::node::{Node, NodeRef};

/// What one balance step moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowReport {
    pub potential_production: Fixed64,
    pub potential_consumption: Fixed64,
    pub actual_production: Fixed64,
    pub actual_consumption: Fixed64,
    pub production_ratio: Fixed64,
    pub consumption_ratio: Fixed64,
    pub volume_before: Fixed64,
    pub volume_after: Fixed64,
}

impl FlowReport {
    /// Consumers received less than they could take.
    pub fn is_starved(&self) -> bool {
        self.consumption_ratio < Fixed64::ONE
    }

    /// Demand that went unmet this tick.
    pub fn shortfall(&self) -> Fixed64 {
        (self.potential_consumption - self.actual_consumption).max(Fixed64::ZERO)
    }

    /// Net change to stored volume.
    pub fn stored(&self) -> Fixed64 {
        self.volume_after - self.volume_before
    }
}

/// Per-slot offer (producers) or request (consumers), in network order.
fn potentials(
    network: &Network,
    nodes: &SlotMap<EntityId, Node>,
    refs: &[NodeRef],
    producing: bool,
) -> Vec<Fixed64> {
    refs.iter()
        .map(|r| {
            let pin = r
                .slot
                .and_then(|i| nodes.get(r.entity)?.slot(i))
                .and_then(|s| s.as_pin());
            match pin {
                Some(pin) => {
                    let available = if producing { pin.buffer } else { pin.headroom() };
                    available
                        .min(pin.max_rate)
                        .min(network.max_throughput)
                        .max(Fixed64::ZERO)
                }
                None => Fixed64::ZERO,
            }
        })
        .collect()
}

fn sum(values: &[Fixed64]) -> Fixed64 {
    values
        .iter()
        .fold(Fixed64::ZERO, |acc, v| acc.saturating_add(*v))
}

/// Scale each slot's amount by `ratio` and move it out of (`withdraw`) or
/// into its buffer.
fn apply(
    nodes: &mut SlotMap<EntityId, Node>,
    refs: &[NodeRef],
    amounts: &[Fixed64],
    ratio: Fixed64,
    withdraw: bool,
) {
    for (r, amount) in refs.iter().zip(amounts) {
        let Some(pin) = r
            .slot
            .and_then(|i| nodes.get_mut(r.entity)?.slot_mut(i))
            .and_then(|s| s.as_pin_mut())
        else {
            continue;
        };
        let moved = amount.saturating_mul(ratio);
        let next = if withdraw {
            pin.buffer.saturating_sub(moved)
        } else {
            pin.buffer.saturating_add(moved)
        };
        pin.buffer = fixed::clamp(next, Fixed64::ZERO, pin.max_buffer);
    }
}

/// Balance `network` for one tick.
///
/// Returns `None` (and leaves every buffer untouched) when there is nothing
/// to produce and nothing to consume.
pub fn balance(network: &mut Network, nodes: &mut SlotMap<EntityId, Node>) -> Option<FlowReport> {
    let production = potentials(network, nodes, &network.producers, true);
    let consumption = potentials(network, nodes, &network.consumers, false);
    let potential_production = sum(&production);
    let potential_consumption = sum(&consumption);

    if potential_production == Fixed64::ZERO && potential_consumption == Fixed64::ZERO {
        network.current_throughput = Fixed64::ZERO;
        return None;
    }

    let volume_before = network.current_volume;
    let (actual_production, actual_consumption, production_ratio, consumption_ratio, volume);

    if potential_production > potential_consumption {
        // Surplus is banked.
        let headroom = (network.max_volume - volume_before).max(Fixed64::ZERO);
        actual_production =
            potential_production.min(potential_consumption.saturating_add(headroom));
        actual_consumption = potential_consumption;
        volume = volume_before + (actual_production - potential_consumption);
        production_ratio = fixed::ratio(actual_production, potential_production)
            .unwrap_or(Fixed64::ONE);
        consumption_ratio = Fixed64::ONE;
    } else {
        // Deficit is drawn from storage.
        actual_consumption =
            potential_consumption.min(potential_production.saturating_add(volume_before));
        actual_production = potential_production;
        volume = volume_before - (actual_consumption - potential_production);
        consumption_ratio = fixed::ratio(actual_consumption, potential_consumption)
            .unwrap_or(Fixed64::ONE);
        production_ratio = Fixed64::ONE;
    }

    let production_ratio = fixed::clamp(production_ratio, Fixed64::ZERO, Fixed64::ONE);
    let consumption_ratio = fixed::clamp(consumption_ratio, Fixed64::ZERO, Fixed64::ONE);

    apply(nodes, &network.producers, &production, production_ratio, true);
    apply(nodes, &network.consumers, &consumption, consumption_ratio, false);

    network.current_volume = fixed::clamp(volume, Fixed64::ZERO, network.max_volume);
    network.current_throughput = actual_production.max(actual_consumption);

    Some(FlowReport {
        potential_production,
        potential_consumption,
        actual_production,
        actual_consumption,
        production_ratio,
        consumption_ratio,
        volume_before,
        volume_after: network.current_volume,
    })
}
