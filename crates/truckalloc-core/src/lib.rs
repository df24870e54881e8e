pub mod allocator;
pub mod catalog;
pub mod config;
pub mod demand;
pub mod error;
pub mod model;
pub mod report;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use allocator::{solve_truck_allocation, Allocator};
pub use catalog::{FleetCatalog, TruckType};
pub use config::{AllocationConfig, BigM, Preset};
pub use demand::DemandVector;
pub use error::{AllocationError, ConfigError, InputError};
pub use model::{AllocationModel, AllocationVars, ModelBuilder};
pub use report::{AllocationDetail, AllocationMetrics, AllocationReport, NodeSummary, ResultExtractor};
