use std::collections::HashSet;

use crate::error::ConfigError;

/// A class of vehicle with a fixed load capacity
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TruckType {
    pub name: String,
    /// Freight units one truck can carry
    pub capacity: u32,
    /// Trucks owned in-house, shared by all nodes
    pub fleet_size: u32,
    /// Outsourced trucks of this type allowed per node
    pub outsourcing_ceiling: u32,
}

impl TruckType {
    pub fn new(name: impl Into<String>, capacity: u32, fleet_size: u32, outsourcing_ceiling: u32) -> Self {
        Self {
            name: name.into(),
            capacity,
            fleet_size,
            outsourcing_ceiling,
        }
    }

    pub fn in_house_capacity(&self) -> u64 {
        u64::from(self.capacity) * u64::from(self.fleet_size)
    }

    pub fn outsourced_capacity(&self) -> u64 {
        u64::from(self.capacity) * u64::from(self.outsourcing_ceiling)
    }
}

/// Static reference data: the truck types available to the allocator
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "Vec<TruckType>", into = "Vec<TruckType>"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FleetCatalog {
    truck_types: Vec<TruckType>,
}

impl FleetCatalog {
    pub fn new(truck_types: Vec<TruckType>) -> Result<Self, ConfigError> {
        if truck_types.is_empty() {
            return Err(ConfigError::EmptyCatalog);
        }

        let mut seen = HashSet::new();
        for truck in &truck_types {
            if !seen.insert(truck.name.as_str()) {
                return Err(ConfigError::DuplicateTruckType(truck.name.clone()));
            }
            if truck.capacity == 0 {
                return Err(ConfigError::ZeroCapacity(truck.name.clone()));
            }
            // Load variables are bounded by these products and must stay 32-bit
            let widest = truck.in_house_capacity().max(truck.outsourced_capacity());
            if widest > i32::MAX as u64 {
                return Err(ConfigError::CapacityOverflow(truck.name.clone()));
            }
        }

        Ok(Self { truck_types })
    }

    /// Built-in catalogs skip validation; the preset tests cover them
    pub(crate) fn from_preset(truck_types: Vec<TruckType>) -> Self {
        Self { truck_types }
    }

    pub fn len(&self) -> usize {
        self.truck_types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.truck_types.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TruckType> {
        self.truck_types.iter()
    }

    pub fn truck_types(&self) -> &[TruckType] {
        &self.truck_types
    }

    pub fn get(&self, name: &str) -> Option<&TruckType> {
        self.truck_types.iter().find(|t| t.name == name)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.truck_types.iter().position(|t| t.name == name)
    }

    /// Index of the lowest-capacity type, first one on ties
    pub fn smallest(&self) -> usize {
        self.truck_types
            .iter()
            .enumerate()
            .min_by_key(|(_, t)| t.capacity)
            .map(|(i, _)| i)
            .unwrap_or(0)
    }

    /// Capacity of the whole in-house fleet
    pub fn in_house_capacity(&self) -> u64 {
        self.truck_types.iter().map(TruckType::in_house_capacity).sum()
    }

    /// Largest demand a single node could ever receive
    pub fn max_node_capacity(&self) -> u64 {
        self.truck_types
            .iter()
            .map(|t| t.in_house_capacity() + t.outsourced_capacity())
            .sum()
    }
}

impl<'a> IntoIterator for &'a FleetCatalog {
    type Item = &'a TruckType;
    type IntoIter = std::slice::Iter<'a, TruckType>;

    fn into_iter(self) -> Self::IntoIter {
        self.truck_types.iter()
    }
}

impl TryFrom<Vec<TruckType>> for FleetCatalog {
    type Error = ConfigError;

    fn try_from(truck_types: Vec<TruckType>) -> Result<Self, Self::Error> {
        Self::new(truck_types)
    }
}

impl From<FleetCatalog> for Vec<TruckType> {
    fn from(catalog: FleetCatalog) -> Self {
        catalog.truck_types
    }
}
