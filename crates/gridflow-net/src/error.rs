use gridflow_core::id::EntityId;

use crate::node::NodeRef;

/// Errors surfaced by the network module's public API.
///
/// Discovery and balancing never fail: type mismatches, unpaired tunnels
/// and empty networks are ordinary world states, not errors.
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    #[error("unknown entity {0:?}")]
    UnknownEntity(EntityId),
    #[error("entity {entity:?} has no slot {slot}")]
    SlotOutOfRange { entity: EntityId, slot: usize },
    #[error("{0:?} is not a pin slot")]
    NotAPin(NodeRef),
    #[error("entity {0:?} is not a connector")]
    NotAConnector(EntityId),
    #[error("snapshot encoding failed: {0}")]
    SnapshotEncode(String),
    #[error("snapshot decoding failed: {0}")]
    SnapshotDecode(String),
    #[error("invalid snapshot magic: expected 0x{:08X}, got 0x{:08X}", crate::snapshot::SNAPSHOT_MAGIC, .0)]
    InvalidMagic(u32),
    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u32),
}
