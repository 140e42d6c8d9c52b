//! Volume snapshots for save/load.
//!
//! Topology is owned by the host and rebuilt on load; what must survive is
//! the stored volume of every network, the network each node belonged to
//! and the pin buffers. Restoring a snapshot links every node back to its
//! saved network through `previous`, so the first recompute after loading
//! pro-rates the saved volume exactly like an ordinary rebuild would.

use gridflow_core::fixed::{Fixed64, Ticks};
use gridflow_core::id::NetworkId;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::NetError;
use crate::module::NetworkModule;
use crate::network::VolumeRecord;
use crate::node::NodeRef;

/// Magic number identifying a gridflow volume snapshot.
pub const SNAPSHOT_MAGIC: u32 = 0x6F1F_0001;

/// Current format version. Increment when breaking the wire format.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotHeader {
    pub magic: u32,
    pub version: u32,
    /// Tick the snapshot was taken on.
    pub tick: Ticks,
}

impl SnapshotHeader {
    pub fn new(tick: Ticks) -> Self {
        Self {
            magic: SNAPSHOT_MAGIC,
            version: SNAPSHOT_VERSION,
            tick,
        }
    }

    pub fn validate(&self) -> Result<(), NetError> {
        if self.magic != SNAPSHOT_MAGIC {
            return Err(NetError::InvalidMagic(self.magic));
        }
        if self.version != SNAPSHOT_VERSION {
            return Err(NetError::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedNetwork {
    pub id: NetworkId,
    pub volume: VolumeRecord,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeSnapshot {
    pub header: SnapshotHeader,
    pub networks: Vec<SavedNetwork>,
    /// Network membership of every claimed connector and slot.
    pub links: Vec<(NodeRef, NetworkId)>,
    /// Contents of every pin buffer.
    pub buffers: Vec<(NodeRef, Fixed64)>,
}

impl VolumeSnapshot {
    pub fn encode(&self) -> Result<Vec<u8>, NetError> {
        bitcode::serialize(self).map_err(|e| NetError::SnapshotEncode(e.to_string()))
    }

    /// Decode and validate the header.
    pub fn decode(data: &[u8]) -> Result<Self, NetError> {
        let snapshot: VolumeSnapshot =
            bitcode::deserialize(data).map_err(|e| NetError::SnapshotDecode(e.to_string()))?;
        snapshot.header.validate()?;
        Ok(snapshot)
    }

    pub fn total_volume(&self) -> Fixed64 {
        self.networks
            .iter()
            .fold(Fixed64::ZERO, |acc, n| acc.saturating_add(n.volume.current_volume))
    }
}

/// What a restore applied and what it had to skip.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub links: usize,
    pub buffers: usize,
    /// Entries naming entities or slots the module does not have.
    pub skipped: usize,
}

impl NetworkModule {
    /// Capture the current volumes, memberships and pin buffers.
    pub fn snapshot(&self, tick: Ticks) -> VolumeSnapshot {
        let networks = self
            .networks()
            .map(|n| SavedNetwork {
                id: n.id,
                volume: VolumeRecord::from(n),
            })
            .collect();

        let mut links = Vec::new();
        let mut buffers = Vec::new();
        for (entity, node) in self.nodes() {
            for slot in node.parts() {
                let r = NodeRef { entity, slot };
                if let Some(id) = node.claim(slot).and_then(|c| c.network) {
                    links.push((r, id));
                }
                if let Some(pin) = slot.and_then(|i| node.slot(i)).and_then(|s| s.as_pin()) {
                    buffers.push((r, pin.buffer));
                }
            }
        }

        VolumeSnapshot {
            header: SnapshotHeader::new(tick),
            networks,
            links,
            buffers,
        }
    }

    /// Re-seed volume linkage from `snapshot` onto the nodes currently
    /// registered, and schedule a full rebuild.
    ///
    /// Every node is detached from its current network first, so the next
    /// tick's recompute sees only the saved links.
    pub fn restore_volumes(&mut self, snapshot: &VolumeSnapshot) -> Result<RestoreReport, NetError> {
        snapshot.header.validate()?;
        let mut report = RestoreReport::default();

        for node in self.nodes.values_mut() {
            for claim in node.claims_mut() {
                *claim = Default::default();
            }
        }
        for saved in &snapshot.networks {
            self.discovery.seed_carry(saved.id, saved.volume);
        }

        for (r, id) in &snapshot.links {
            match self.nodes.get_mut(r.entity).and_then(|n| n.claim_mut(r.slot)) {
                Some(claim) => {
                    claim.previous = Some(*id);
                    report.links += 1;
                }
                None => report.skipped += 1,
            }
        }

        for (r, amount) in &snapshot.buffers {
            let pin = r
                .slot
                .and_then(|i| self.nodes.get_mut(r.entity)?.slot_mut(i))
                .and_then(|s| s.as_pin_mut());
            match pin {
                Some(pin) => {
                    pin.buffer =
                        gridflow_core::fixed::clamp(*amount, Fixed64::ZERO, pin.max_buffer);
                    report.buffers += 1;
                }
                None => report.skipped += 1,
            }
        }

        if report.skipped > 0 {
            warn!(
                "snapshot from tick {} referenced {} unknown nodes",
                snapshot.header.tick, report.skipped
            );
        }
        debug!(
            "restored {} networks, {} links, {} buffers",
            snapshot.networks.len(),
            report.links,
            report.buffers
        );

        self.discovery.networks_mut().clear();
        self.flows.clear();
        self.mark_all_stale();
        Ok(report)
    }
}
