use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Identifies an entity (connector or building) placed on the grid.
    pub struct EntityId;
}

/// Identifies a discovered network. Allocated from a monotonic counter and
/// never reused for the lifetime of the owning module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NetworkId(pub u32);

/// Identifies a resource grade (e.g. low-voltage energy, water, torque).
/// Networks never mix grades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceTypeId(pub u32);

/// Identifies a building or connector template in a loaded catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BuildingKindId(pub u32);

/// Restricts which nodes may share a network.
///
/// `Any` is the wildcard: it is compatible with every grade. A traversal
/// starts out as `Any` and is narrowed by the first typed member it claims.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeMask {
    #[default]
    Any,
    Only(ResourceTypeId),
}

impl TypeMask {
    /// Whether two masks may live in the same network.
    pub fn accepts(self, other: TypeMask) -> bool {
        match (self, other) {
            (TypeMask::Any, _) | (_, TypeMask::Any) => true,
            (TypeMask::Only(a), TypeMask::Only(b)) => a == b,
        }
    }

    /// Narrow a traversal mask with a newly claimed member's mask.
    pub fn narrow(self, other: TypeMask) -> TypeMask {
        match self {
            TypeMask::Any => other,
            fixed => fixed,
        }
    }

    pub fn is_any(self) -> bool {
        matches!(self, TypeMask::Any)
    }
}

impl From<ResourceTypeId> for TypeMask {
    fn from(id: ResourceTypeId) -> Self {
        TypeMask::Only(id)
    }
}
