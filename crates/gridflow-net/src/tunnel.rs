//! Remote pairing of tunnel slots across intervening tiles.

use gridflow_core::id::{EntityId, TypeMask};
use gridflow_spatial::GridTopology;
use log::trace;
use slotmap::SlotMap;

use crate::node::{Claim, Node, NodeKind, NodeRef};

/// Find the closest unclaimed tunnel facing back toward `tunnel`.
///
/// Scans tile by tile along the tunnel's world `tunnel_direction`, starting
/// one tile beyond its own position, for at most `max_hop_length` tiles. The
/// first tunnel slot on a scanned tile whose own tunnel direction is the
/// exact inverse, and whose grade is compatible with `mask`, wins. Returns
/// `None` when `tunnel` is not a tunnel slot or nothing is in reach.
pub fn find_paired_tunnel<G: GridTopology + ?Sized>(
    nodes: &SlotMap<EntityId, Node>,
    grid: &G,
    tunnel: NodeRef,
    mask: TypeMask,
) -> Option<NodeRef> {
    let mut pair = None;
    scan(nodes, grid, tunnel, mask, |candidate, claim, hop| {
        if claim.is_claimed() {
            return false;
        }
        trace!(
            "tunnel {:?}/{:?} paired with {:?}/{:?} after {hop} tiles",
            tunnel.entity, tunnel.slot, candidate.entity, candidate.slot
        );
        pair = Some(candidate);
        true
    });
    pair
}

/// Every opposite-facing, grade-compatible tunnel within reach of `tunnel`,
/// claimed or not, nearest first.
pub fn tunnels_in_reach<G: GridTopology + ?Sized>(
    nodes: &SlotMap<EntityId, Node>,
    grid: &G,
    tunnel: NodeRef,
    mask: TypeMask,
) -> Vec<NodeRef> {
    let mut found = Vec::new();
    scan(nodes, grid, tunnel, mask, |candidate, _, _| {
        found.push(candidate);
        false
    });
    found
}

/// Walk the reach of `tunnel`, handing each partner candidate to `visit`
/// until it returns `true`.
fn scan<G, F>(nodes: &SlotMap<EntityId, Node>, grid: &G, tunnel: NodeRef, mask: TypeMask, mut visit: F)
where
    G: GridTopology + ?Sized,
    F: FnMut(NodeRef, &Claim, u32) -> bool,
{
    let Some(node) = nodes.get(tunnel.entity) else {
        return;
    };
    let Some(slot) = tunnel.slot.and_then(|i| node.slot(i)) else {
        return;
    };
    let Some(reach) = slot.as_tunnel() else {
        return;
    };

    let start = node.slot_position(slot);
    let dir = node.tunnel_direction(reach);
    let wanted = dir.inverse();

    for hop in 1..=reach.max_hop_length {
        let tile = start.step_by(dir, i32::try_from(hop).unwrap_or(i32::MAX));
        if !grid.in_bounds(tile) {
            break;
        }

        for &entity in grid.contents_at(tile) {
            let Some(other) = nodes.get(entity) else {
                continue;
            };
            let NodeKind::Slots(slots) = &other.kind else {
                continue;
            };
            for (i, candidate) in slots.iter().enumerate() {
                let Some(far) = candidate.as_tunnel() else {
                    continue;
                };
                if NodeRef::slot(entity, i) == tunnel
                    || !mask.accepts(candidate.mask)
                    || other.slot_position(candidate) != tile
                    || other.tunnel_direction(far) != wanted
                {
                    continue;
                }
                if visit(NodeRef::slot(entity, i), &candidate.claim, hop) {
                    return;
                }
            }
        }
    }
}
