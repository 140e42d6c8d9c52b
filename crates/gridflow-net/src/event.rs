use gridflow_core::fixed::{Fixed64, Ticks};
use gridflow_core::id::NetworkId;

/// Events emitted by the network module.
///
/// Formation events fire once per discovery pass; the storage and
/// starvation events fire only on transitions, not every tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkEvent {
    NetworkFormed {
        network_id: NetworkId,
        tick: Ticks,
    },
    NetworkRetired {
        network_id: NetworkId,
        tick: Ticks,
    },
    /// Consumers stopped receiving everything they asked for.
    Starved {
        network_id: NetworkId,
        /// Unmet demand on the tick the network went short.
        shortfall: Fixed64,
        tick: Ticks,
    },
    /// Consumers are fully served again.
    Satisfied {
        network_id: NetworkId,
        tick: Ticks,
    },
    StorageFull {
        network_id: NetworkId,
        tick: Ticks,
    },
    StorageEmpty {
        network_id: NetworkId,
        tick: Ticks,
    },
}

impl NetworkEvent {
    pub fn network_id(&self) -> NetworkId {
        match self {
            Self::NetworkFormed { network_id, .. }
            | Self::NetworkRetired { network_id, .. }
            | Self::Starved { network_id, .. }
            | Self::Satisfied { network_id, .. }
            | Self::StorageFull { network_id, .. }
            | Self::StorageEmpty { network_id, .. } => *network_id,
        }
    }
}
