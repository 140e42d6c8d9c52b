//! A small host world shared by the runnable examples.
//!
//! [`World`] owns a catalog, a network module and the tile grid the module
//! discovers over, and keeps the three in step when buildings are placed
//! or demolished.

use std::path::{Path, PathBuf};

use gridflow_core::fixed::Ticks;
use gridflow_core::id::EntityId;
use gridflow_data::{Catalog, DataLoadError, load_catalog};
use gridflow_net::{Behaviors, NetError, NetworkEvent, NetworkModule};
use gridflow_spatial::{GridPosition, Layer, Rotation, SpatialError, TileGrid};
use log::{debug, info};

#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    #[error("no kind named '{0}' in the catalog")]
    UnknownKind(String),
    #[error(transparent)]
    Spatial(#[from] SpatialError),
    #[error(transparent)]
    Net(#[from] NetError),
    #[error(transparent)]
    Data(#[from] DataLoadError),
}

/// The bundled catalog shipped next to the examples.
pub fn data_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("data")
}

#[derive(Debug)]
pub struct World {
    pub catalog: Catalog,
    pub module: NetworkModule,
    pub grid: TileGrid,
    pub tick: Ticks,
}

impl World {
    pub fn load(dir: &Path) -> Result<Self, WorldError> {
        let catalog = load_catalog(dir)?;
        let module = NetworkModule::new(catalog.config().clone());
        Ok(Self {
            catalog,
            module,
            grid: TileGrid::new(),
            tick: 0,
        })
    }

    /// Place a catalog kind with its origin at `(x, y)`.
    pub fn place(
        &mut self,
        kind: &str,
        x: i32,
        y: i32,
        rotation: Rotation,
    ) -> Result<EntityId, WorldError> {
        let node = self
            .catalog
            .kind(kind)
            .and_then(|k| self.catalog.instantiate(k, GridPosition::new(x, y), rotation))
            .ok_or_else(|| WorldError::UnknownKind(kind.to_string()))?;
        let rect = node.rect();
        let entity = self.module.add_node(node);
        if let Err(err) = self.grid.place(entity, rect, Layer(0)) {
            self.module.remove_node(entity)?;
            return Err(err.into());
        }
        debug!("placed {kind} at ({x}, {y}) as {entity:?}");
        Ok(entity)
    }

    pub fn demolish(&mut self, entity: EntityId) -> Result<(), WorldError> {
        self.grid.remove(entity)?;
        self.module.remove_node(entity)?;
        Ok(())
    }

    /// Run behaviours, then one network tick.
    pub fn step(&mut self, behaviors: &mut Behaviors) -> Vec<NetworkEvent> {
        let dropped = behaviors.run(&mut self.module, self.tick);
        if dropped > 0 {
            debug!("{dropped} behaviours dropped at tick {}", self.tick);
        }
        let events = self.module.tick(&self.grid, self.tick);
        self.tick += 1;
        events
    }

    /// Log one line per network.
    pub fn report(&self) {
        for net in self.module.networks() {
            info!(
                "tick {:>3} network {:?}: {} members, {}/{} stored, throughput {}/{}",
                self.tick,
                net.id,
                net.members.len(),
                net.current_volume,
                net.max_volume,
                net.current_throughput,
                net.max_throughput,
            );
        }
    }
}
