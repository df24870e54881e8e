use std::str::FromStr;

use log::warn;

use crate::catalog::{FleetCatalog, TruckType};
use crate::error::ConfigError;

pub const DEFAULT_INTEGRALITY_TOLERANCE: f64 = 1e-6;

/// Relaxation constant of the low-demand gate
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum BigM {
    /// Largest demand a single node can receive under the catalog
    #[default]
    Derived,
    Fixed(f64),
}

/// Deployment-time configuration of the allocation model
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct AllocationConfig {
    pub catalog: FleetCatalog,
    /// Nodes with demand at or below this value count as small shipments
    pub low_demand_threshold: u64,
    /// Truck type restricted to small-shipment nodes; the smallest type when absent
    #[cfg_attr(feature = "serde", serde(default))]
    pub low_demand_gated_type: Option<String>,
    /// Objective cost of a single outsourced truck
    pub outsourcing_penalty: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub big_m: BigM,
    #[cfg_attr(feature = "serde", serde(default = "default_tolerance"))]
    pub integrality_tolerance: f64,
}

#[cfg(feature = "serde")]
fn default_tolerance() -> f64 {
    DEFAULT_INTEGRALITY_TOLERANCE
}

impl AllocationConfig {
    pub fn new(catalog: FleetCatalog, low_demand_threshold: u64, outsourcing_penalty: f64) -> Self {
        Self {
            catalog,
            low_demand_threshold,
            low_demand_gated_type: None,
            outsourcing_penalty,
            big_m: BigM::Derived,
            integrality_tolerance: DEFAULT_INTEGRALITY_TOLERANCE,
        }
    }

    pub fn with_gated_type(mut self, name: impl Into<String>) -> Self {
        self.low_demand_gated_type = Some(name.into());
        self
    }

    pub fn with_big_m(mut self, big_m: BigM) -> Self {
        self.big_m = big_m;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.integrality_tolerance = tolerance;
        self
    }

    /// The fleet observed in production: five tiers from a van up to a 10-ton truck
    pub fn standard() -> Self {
        let catalog = FleetCatalog::from_preset(vec![
            TruckType::new("Van", 42, 1, 1000),
            TruckType::new("3A-Ton", 165, 7, 70000),
            TruckType::new("3B-Ton", 220, 23, 23000),
            TruckType::new("7-Ton", 275, 4, 40000),
            TruckType::new("10-Ton", 330, 1, 1000),
        ]);
        Self::new(catalog, 40, 10000.0).with_gated_type("Van")
    }

    /// A second depot layout that reserves a mid-size tier for small shipments
    pub fn regional() -> Self {
        let catalog = FleetCatalog::from_preset(vec![
            TruckType::new("Pickup", 30, 4, 200),
            TruckType::new("Box-3T", 120, 6, 5000),
            TruckType::new("Box-5T", 180, 10, 8000),
            TruckType::new("Rigid-8T", 260, 3, 3000),
            TruckType::new("Trailer-12T", 400, 2, 500),
        ]);
        Self::new(catalog, 120, 5000.0).with_gated_type("Box-3T")
    }

    /// Index of the truck type subject to low-demand gating
    pub fn gated_type(&self) -> Result<usize, ConfigError> {
        match &self.low_demand_gated_type {
            Some(name) => self
                .catalog
                .index_of(name)
                .ok_or_else(|| ConfigError::UnknownTruckType(name.clone())),
            None => Ok(self.catalog.smallest()),
        }
    }

    pub fn big_m_value(&self) -> f64 {
        match self.big_m {
            BigM::Derived => self.catalog.max_node_capacity() as f64,
            BigM::Fixed(value) => value,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.gated_type()?;

        let in_house_capacity = self.catalog.in_house_capacity();
        // One outsourced truck must cost more than leaving the whole fleet idle
        if !(self.outsourcing_penalty.is_finite() && self.outsourcing_penalty > in_house_capacity as f64) {
            return Err(ConfigError::PenaltyTooSmall {
                penalty: self.outsourcing_penalty,
                in_house_capacity,
            });
        }

        let big_m = self.big_m_value();
        if !(big_m.is_finite() && big_m > 0.0) {
            return Err(ConfigError::InvalidBigM(big_m));
        }
        let derived = self.catalog.max_node_capacity() as f64;
        if big_m < derived {
            warn!(
                "big-M {} is below the largest feasible node demand {}; the low-demand gate may cut off valid allocations",
                big_m, derived
            );
        }

        let tol = self.integrality_tolerance;
        if !(tol > 0.0 && tol < 0.5) {
            return Err(ConfigError::InvalidTolerance(tol));
        }

        Ok(())
    }
}

/// Built-in configurations selectable by name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    Standard,
    Regional,
}

impl Preset {
    pub const ALL: [Preset; 2] = [Preset::Standard, Preset::Regional];

    pub fn name(self) -> &'static str {
        match self {
            Preset::Standard => "standard",
            Preset::Regional => "regional",
        }
    }

    pub fn config(self) -> AllocationConfig {
        match self {
            Preset::Standard => AllocationConfig::standard(),
            Preset::Regional => AllocationConfig::regional(),
        }
    }
}

impl FromStr for Preset {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Preset::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConfigError::UnknownPreset(s.to_string()))
    }
}
