//! Resolved catalog of resources and placeable kinds.
//!
//! A catalog directory holds:
//!
//! | base name    | required | contents                           |
//! |--------------|----------|------------------------------------|
//! | `resources`  | yes      | list of [`ResourceData`]           |
//! | `connectors` | no       | list of [`ConnectorData`]          |
//! | `buildings`  | no       | list of [`BuildingData`]           |
//! | `network`    | no       | a [`NetworkConfig`] table          |
//!
//! Connectors and buildings share one namespace of kind names.

use std::collections::HashMap;
use std::path::Path;

use gridflow_core::fixed::{Fixed64, f64_to_fixed64};
use gridflow_core::id::{BuildingKindId, ResourceTypeId, TypeMask};
use gridflow_net::{Connector, NetworkConfig, Node, Pin, PinRole, Slot, Tunnel};
use gridflow_spatial::{Footprint, GridPosition, Rotation};
use log::debug;

use crate::loader::{
    DataLoadError, check_duplicate, deserialize_file, deserialize_list, find_data_file,
    require_data_file, resolve_name,
};
use crate::schema::{BuildingData, ConnectorData, ResourceData, SlotData, SlotKindData};

/// A placeable kind with every name resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum KindTemplate {
    Connector(Connector),
    Building { footprint: Footprint, slots: Vec<Slot> },
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    resources: Vec<String>,
    resource_ids: HashMap<String, ResourceTypeId>,
    kinds: Vec<(String, KindTemplate)>,
    kind_ids: HashMap<String, BuildingKindId>,
    config: NetworkConfig,
}

impl Catalog {
    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn resource(&self, name: &str) -> Option<ResourceTypeId> {
        self.resource_ids.get(name).copied()
    }

    pub fn resource_name(&self, id: ResourceTypeId) -> Option<&str> {
        self.resources.get(id.0 as usize).map(String::as_str)
    }

    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    pub fn kind(&self, name: &str) -> Option<BuildingKindId> {
        self.kind_ids.get(name).copied()
    }

    pub fn kind_name(&self, id: BuildingKindId) -> Option<&str> {
        self.kinds.get(id.0 as usize).map(|(n, _)| n.as_str())
    }

    pub fn template(&self, id: BuildingKindId) -> Option<&KindTemplate> {
        self.kinds.get(id.0 as usize).map(|(_, t)| t)
    }

    pub fn kind_count(&self) -> usize {
        self.kinds.len()
    }

    /// A fresh, unclaimed node of `kind` placed at `origin`.
    pub fn instantiate(
        &self,
        kind: BuildingKindId,
        origin: GridPosition,
        rotation: Rotation,
    ) -> Option<Node> {
        let node = match self.template(kind)? {
            KindTemplate::Connector(c) => Node::connector(origin, c.clone()),
            KindTemplate::Building { footprint, slots } => {
                Node::building(origin, *footprint, slots.clone())
            }
        };
        Some(node.rotated(rotation))
    }

    fn add_kind(&mut self, name: &str, template: KindTemplate, file: &Path) -> Result<(), DataLoadError> {
        check_duplicate(&self.kind_ids, name, file)?;
        let id = BuildingKindId(self.kinds.len() as u32);
        self.kind_ids.insert(name.to_string(), id);
        self.kinds.push((name.to_string(), template));
        Ok(())
    }

    fn mask(&self, resource: Option<&String>, file: &Path) -> Result<TypeMask, DataLoadError> {
        match resource {
            None => Ok(TypeMask::Any),
            Some(name) => {
                resolve_name(&self.resource_ids, name, file, "resource").map(|id| TypeMask::Only(*id))
            }
        }
    }
}

fn quantity(
    value: f64,
    file: &Path,
    name: &str,
    field: &'static str,
) -> Result<Fixed64, DataLoadError> {
    if !value.is_finite() || value < 0.0 {
        return Err(DataLoadError::Invalid {
            file: file.to_path_buf(),
            name: name.to_string(),
            field,
            detail: format!("expected a non-negative number, got {value}"),
        });
    }
    Ok(f64_to_fixed64(value))
}

fn resolve_connector(
    catalog: &Catalog,
    data: &ConnectorData,
    file: &Path,
) -> Result<KindTemplate, DataLoadError> {
    let mut connector = Connector::new(
        catalog.mask(data.resource.as_ref(), file)?,
        quantity(data.capacity, file, &data.name, "capacity")?,
        quantity(data.throughput, file, &data.name, "throughput")?,
    );
    if let Some((from, to)) = data.directions {
        connector = connector.with_directions(from, to);
    }
    Ok(KindTemplate::Connector(connector))
}

fn resolve_slot(
    catalog: &Catalog,
    building: &BuildingData,
    data: &SlotData,
    file: &Path,
) -> Result<Slot, DataLoadError> {
    let name = building.name.as_str();
    let (x, y) = data.position;
    if x < 0
        || y < 0
        || x as u32 >= building.footprint.width
        || y as u32 >= building.footprint.height
    {
        return Err(DataLoadError::Invalid {
            file: file.to_path_buf(),
            name: name.to_string(),
            field: "position",
            detail: format!("slot ({x}, {y}) lies outside the footprint"),
        });
    }
    let mask = catalog.mask(data.resource.as_ref(), file)?;

    let pin = |role: PinRole, max_rate: f64, max_buffer: Option<f64>| -> Result<Pin, DataLoadError> {
        let rate = quantity(max_rate, file, name, "max_rate")?;
        let pin = Pin::with_buffer_factor(role, rate, catalog.config.default_buffer_factor);
        match max_buffer {
            Some(b) => Ok(pin.with_max_buffer(quantity(b, file, name, "max_buffer")?)),
            None => Ok(pin),
        }
    };

    Ok(match &data.kind {
        SlotKindData::Producer { max_rate, max_buffer } => Slot::pin(
            data.position,
            data.direction,
            mask,
            pin(PinRole::Producer, *max_rate, *max_buffer)?,
        ),
        SlotKindData::Consumer { max_rate, max_buffer } => Slot::pin(
            data.position,
            data.direction,
            mask,
            pin(PinRole::Consumer, *max_rate, *max_buffer)?,
        ),
        SlotKindData::Tunnel {
            tunnel_direction,
            max_hop_length,
            capacity,
            throughput,
        } => Slot::tunnel(
            data.position,
            data.direction,
            mask,
            Tunnel {
                tunnel_direction: *tunnel_direction,
                max_hop_length: *max_hop_length,
                capacity: quantity(*capacity, file, name, "capacity")?,
                throughput: quantity(*throughput, file, name, "throughput")?,
            },
        ),
    })
}

/// Load and resolve every catalog file in `dir`.
pub fn load_catalog(dir: &Path) -> Result<Catalog, DataLoadError> {
    let mut catalog = Catalog::default();

    if let Some(path) = find_data_file(dir, "network")? {
        catalog.config = deserialize_file(&path)?;
    }

    let path = require_data_file(dir, "resources")?;
    let resources: Vec<ResourceData> = deserialize_list(&path, "resources")?;
    for r in resources {
        check_duplicate(&catalog.resource_ids, &r.name, &path)?;
        let id = ResourceTypeId(catalog.resources.len() as u32);
        catalog.resource_ids.insert(r.name.clone(), id);
        catalog.resources.push(r.name);
    }

    if let Some(path) = find_data_file(dir, "connectors")? {
        let connectors: Vec<ConnectorData> = deserialize_list(&path, "connectors")?;
        for c in &connectors {
            let template = resolve_connector(&catalog, c, &path)?;
            catalog.add_kind(&c.name, template, &path)?;
        }
    }

    if let Some(path) = find_data_file(dir, "buildings")? {
        let buildings: Vec<BuildingData> = deserialize_list(&path, "buildings")?;
        for b in &buildings {
            let slots = b
                .slots
                .iter()
                .map(|s| resolve_slot(&catalog, b, s, &path))
                .collect::<Result<Vec<_>, _>>()?;
            let footprint = Footprint::new(b.footprint.width, b.footprint.height);
            catalog.add_kind(&b.name, KindTemplate::Building { footprint, slots }, &path)?;
        }
    }

    debug!(
        "loaded catalog from {}: {} resources, {} kinds",
        dir.display(),
        catalog.resource_count(),
        catalog.kind_count()
    );
    Ok(catalog)
}
