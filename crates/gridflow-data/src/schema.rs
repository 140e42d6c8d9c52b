//! On-disk catalog format.
//!
//! These structs mirror the data files one-to-one; names are resolved into
//! ids by [`crate::catalog`].

use gridflow_spatial::Direction;
use serde::Deserialize;

// ===========================================================================
// Resources
// ===========================================================================

/// A resource grade (`power`, `water`, `steam`, ...).
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceData {
    pub name: String,
}

// ===========================================================================
// Connectors
// ===========================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ConnectorData {
    pub name: String,
    /// Resource name; absent links any grade.
    #[serde(default)]
    pub resource: Option<String>,
    pub capacity: f64,
    pub throughput: f64,
    /// Local `(from, to)` pair; absent links all four sides.
    #[serde(default)]
    pub directions: Option<(Direction, Direction)>,
}

// ===========================================================================
// Buildings
// ===========================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct BuildingData {
    pub name: String,
    #[serde(default = "default_footprint")]
    pub footprint: FootprintData,
    pub slots: Vec<SlotData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FootprintData {
    pub width: u32,
    pub height: u32,
}

fn default_footprint() -> FootprintData {
    FootprintData {
        width: 1,
        height: 1,
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlotData {
    /// Local tile inside the unrotated footprint.
    #[serde(default)]
    pub position: (i32, i32),
    /// Local outward direction.
    pub direction: Direction,
    #[serde(default)]
    pub resource: Option<String>,
    pub kind: SlotKindData,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotKindData {
    Producer {
        max_rate: f64,
        #[serde(default)]
        max_buffer: Option<f64>,
    },
    Consumer {
        max_rate: f64,
        #[serde(default)]
        max_buffer: Option<f64>,
    },
    Tunnel {
        tunnel_direction: Direction,
        max_hop_length: u32,
        #[serde(default)]
        capacity: f64,
        throughput: f64,
    },
}
