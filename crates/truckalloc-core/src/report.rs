use std::ops::AddAssign;

use log::{debug, info};
use truckalloc_solver::{Solution, SolutionStatus, VarId};

use crate::config::AllocationConfig;
use crate::error::AllocationError;
use crate::model::AllocationModel;

/// The six per-row metrics shared by the summary and detail tables
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllocationMetrics {
    pub in_house_trucks: u64,
    pub in_house_load: u64,
    pub in_house_unused: u64,
    pub outsourced_trucks: u64,
    pub outsourced_load: u64,
    pub outsourced_unused: u64,
}

impl AllocationMetrics {
    /// At least one truck, in-house or outsourced, was sent
    pub fn is_assigned(&self) -> bool {
        self.in_house_trucks > 0 || self.outsourced_trucks > 0
    }

    pub fn total_load(&self) -> u64 {
        self.in_house_load + self.outsourced_load
    }
}

impl AddAssign for AllocationMetrics {
    fn add_assign(&mut self, other: Self) {
        self.in_house_trucks += other.in_house_trucks;
        self.in_house_load += other.in_house_load;
        self.in_house_unused += other.in_house_unused;
        self.outsourced_trucks += other.outsourced_trucks;
        self.outsourced_load += other.outsourced_load;
        self.outsourced_unused += other.outsourced_unused;
    }
}

/// One row per node
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSummary {
    /// 1-based node number
    pub node: usize,
    pub demand: u64,
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub metrics: AllocationMetrics,
}

/// One row per (node, truck type) pair that received a truck
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationDetail {
    pub node: usize,
    pub truck_type: String,
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub metrics: AllocationMetrics,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct AllocationReport {
    pub summary: Vec<NodeSummary>,
    pub details: Vec<AllocationDetail>,
    pub objective_value: f64,
}

impl AllocationReport {
    /// Column totals over all nodes
    pub fn totals(&self) -> AllocationMetrics {
        let mut totals = AllocationMetrics::default();
        for row in &self.summary {
            totals += row.metrics;
        }
        totals
    }

    pub fn total_outsourced_trucks(&self) -> u64 {
        self.totals().outsourced_trucks
    }

    pub fn node(&self, node: usize) -> Option<&NodeSummary> {
        self.summary.iter().find(|row| row.node == node)
    }

    pub fn details_for(&self, node: usize) -> impl Iterator<Item = &AllocationDetail> + '_ {
        self.details.iter().filter(move |row| row.node == node)
    }
}

/// Maps solved variable values back onto nodes and truck types
pub struct ResultExtractor<'a> {
    config: &'a AllocationConfig,
}

impl<'a> ResultExtractor<'a> {
    pub fn new(config: &'a AllocationConfig) -> Self {
        Self { config }
    }

    pub fn extract(&self, model: &AllocationModel, solution: &Solution) -> Result<AllocationReport, AllocationError> {
        match solution.status {
            SolutionStatus::Optimal => {}
            SolutionStatus::Infeasible => return Err(AllocationError::Infeasible),
            status => return Err(AllocationError::NotOptimal { status }),
        }

        let tolerance = self.config.integrality_tolerance;
        let violations = model.problem.violations(&solution.values, tolerance);
        if let Some(first) = violations.first() {
            return Err(AllocationError::InvariantViolation(format!(
                "{} model rows or bounds violated, first: {}",
                violations.len(),
                first.description
            )));
        }

        let trucks = self.config.catalog.truck_types();
        if trucks.len() != model.num_truck_types() {
            return Err(AllocationError::InvariantViolation(format!(
                "model has {} truck types but the catalog has {}",
                model.num_truck_types(),
                trucks.len()
            )));
        }

        let read = |var: VarId| -> Result<u64, AllocationError> { integral(model, solution, var, tolerance) };
        let vars = &model.vars;
        let mut summary = Vec::with_capacity(model.num_nodes());
        let mut details = Vec::new();
        let mut fleet_used = vec![0u64; trucks.len()];

        for (j, demand) in model.demands.as_slice().iter().enumerate() {
            let node = j + 1;
            let mut node_metrics = AllocationMetrics::default();

            for (i, truck) in trucks.iter().enumerate() {
                let capacity = u64::from(truck.capacity);
                let in_house_trucks = read(vars.in_house_count[i][j])?;
                let in_house_load = read(vars.in_house_load[i][j])?;
                let outsourced_trucks = read(vars.outsourced_count[i][j])?;
                let outsourced_load = read(vars.outsourced_load[i][j])?;

                let in_house_unused = unused(in_house_trucks * capacity, in_house_load)
                    .ok_or_else(|| overload("in-house", &truck.name, node, in_house_trucks, in_house_load))?;
                let outsourced_unused = unused(outsourced_trucks * capacity, outsourced_load)
                    .ok_or_else(|| overload("outsourced", &truck.name, node, outsourced_trucks, outsourced_load))?;

                if outsourced_trucks > u64::from(truck.outsourcing_ceiling) {
                    return Err(AllocationError::InvariantViolation(format!(
                        "node {node}: {outsourced_trucks} outsourced {} trucks exceed the ceiling of {}",
                        truck.name, truck.outsourcing_ceiling
                    )));
                }
                if i == model.gated_type && in_house_trucks > 0 && *demand > self.config.low_demand_threshold {
                    return Err(AllocationError::InvariantViolation(format!(
                        "node {node}: gated type {} used for demand {demand} above threshold {}",
                        truck.name, self.config.low_demand_threshold
                    )));
                }
                fleet_used[i] += in_house_trucks;

                let metrics = AllocationMetrics {
                    in_house_trucks,
                    in_house_load,
                    in_house_unused,
                    outsourced_trucks,
                    outsourced_load,
                    outsourced_unused,
                };
                if metrics.is_assigned() {
                    details.push(AllocationDetail {
                        node,
                        truck_type: truck.name.clone(),
                        metrics,
                    });
                }
                node_metrics += metrics;
            }

            if node_metrics.total_load() != *demand {
                return Err(AllocationError::InvariantViolation(format!(
                    "node {node}: delivered {} but demand is {demand}",
                    node_metrics.total_load()
                )));
            }

            debug!(
                "node {node}: {} in-house / {} outsourced trucks",
                node_metrics.in_house_trucks, node_metrics.outsourced_trucks
            );
            summary.push(NodeSummary {
                node,
                demand: *demand,
                metrics: node_metrics,
            });
        }

        for (truck, used) in trucks.iter().zip(&fleet_used) {
            if *used > u64::from(truck.fleet_size) {
                return Err(AllocationError::InvariantViolation(format!(
                    "{used} in-house {} trucks allocated but the fleet has {}",
                    truck.name, truck.fleet_size
                )));
            }
        }

        let report = AllocationReport {
            summary,
            details,
            objective_value: solution.objective_value,
        };
        info!(
            "Extracted allocation: objective {:.2}, {} detail rows, {} outsourced trucks",
            report.objective_value,
            report.details.len(),
            report.total_outsourced_trucks()
        );
        Ok(report)
    }
}

/// Solved value of an integral variable, snapped to the nearest non-negative integer
fn integral(model: &AllocationModel, solution: &Solution, var: VarId, tolerance: f64) -> Result<u64, AllocationError> {
    let name = &model.problem.variable(var).name;
    let value = solution
        .value(var)
        .ok_or_else(|| AllocationError::InvariantViolation(format!("no solved value for {name}")))?;
    let rounded = value.round();
    if (value - rounded).abs() > tolerance || rounded < 0.0 {
        return Err(AllocationError::InvariantViolation(format!(
            "{name} = {value} is not a non-negative integer"
        )));
    }
    Ok(rounded as u64)
}

fn unused(capacity: u64, load: u64) -> Option<u64> {
    capacity.checked_sub(load)
}

fn overload(kind: &str, truck: &str, node: usize, trucks: u64, load: u64) -> AllocationError {
    AllocationError::InvariantViolation(format!(
        "node {node}: {kind} {truck} carries {load} with only {trucks} trucks (negative unused capacity)"
    ))
}
