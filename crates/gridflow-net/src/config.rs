//! Runtime configuration of the network module.

use serde::{Deserialize, Serialize};

use crate::node::DEFAULT_BUFFER_FACTOR;

/// How much of the world a dirty tick rebuilds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryMode {
    /// Rebuild only networks touching the stale regions.
    #[default]
    Scoped,
    /// Rebuild every network whenever anything is stale.
    Full,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub mode: DiscoveryMode,
    /// Tiles added on every side of a changed node's bounding box.
    pub dirty_margin: u32,
    /// `max_buffer = default_buffer_factor × max_rate` for pins that do not
    /// override it.
    pub default_buffer_factor: u32,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            mode: DiscoveryMode::Scoped,
            dirty_margin: 1,
            default_buffer_factor: DEFAULT_BUFFER_FACTOR,
        }
    }
}

impl NetworkConfig {
    pub fn full() -> Self {
        Self {
            mode: DiscoveryMode::Full,
            ..Self::default()
        }
    }

    pub(crate) fn margin(&self) -> i32 {
        i32::try_from(self.dirty_margin).unwrap_or(i32::MAX)
    }
}
