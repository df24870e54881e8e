use itertools::iproduct;
use log::{debug, info, trace};
use truckalloc_solver::{ConstraintOp, MipProblem, Term, VarId, VarKind};

use crate::config::AllocationConfig;
use crate::demand::DemandVector;
use crate::error::AllocationError;

/// Decision variables of the allocation model, indexed `[truck type][node]`
/// with nodes counted from 0.
#[derive(Debug, Clone)]
pub struct AllocationVars {
    /// 1 if the type's in-house trucks serve the node at all
    pub used: Vec<Vec<VarId>>,
    pub in_house_count: Vec<Vec<VarId>>,
    pub in_house_load: Vec<Vec<VarId>>,
    pub outsourced_count: Vec<Vec<VarId>>,
    pub outsourced_load: Vec<Vec<VarId>>,
    /// 1 if the node counts as a small shipment, indexed by node
    pub low_demand: Vec<VarId>,
}

/// A complete model for one demand vector, ready for a solver backend
#[derive(Debug, Clone)]
pub struct AllocationModel {
    pub problem: MipProblem,
    pub vars: AllocationVars,
    pub demands: DemandVector,
    /// Relaxation constant used in the low-demand rows
    pub big_m: f64,
    /// Index of the truck type subject to low-demand gating
    pub gated_type: usize,
}

/// Translates a demand vector into a MILP under a fixed configuration
pub struct ModelBuilder<'a> {
    config: &'a AllocationConfig,
}

impl<'a> ModelBuilder<'a> {
    pub fn new(config: &'a AllocationConfig) -> Self {
        Self { config }
    }

    #[allow(non_snake_case)]
    pub fn build(&self, demands: &DemandVector) -> Result<AllocationModel, AllocationError> {
        self.config.validate()?;
        let gated_type = self.config.gated_type()?;
        let big_m = self.config.big_m_value();
        let trucks = self.config.catalog.truck_types();
        let threshold = self.config.low_demand_threshold as f64;

        info!(
            "Building allocation model for {} nodes and {} truck types",
            demands.len(),
            trucks.len()
        );

        let mut problem = MipProblem::new(format!("truck_allocation_{}", demands.len()));

        //*************CREATE VARIABLES*************//
        let I = 0..trucks.len();
        let J = 0..demands.len();

        let mut grid = |base: &str, kind: VarKind, upper: &dyn Fn(usize) -> f64| -> Vec<Vec<VarId>> {
            I.clone()
                .map(|i| {
                    J.clone()
                        .map(|j| {
                            let name = format!("{base}[{},{}]", trucks[i].name, j + 1);
                            problem.add_variable(name, kind, 0.0, upper(i))
                        })
                        .collect()
                })
                .collect()
        };

        let used = grid("used", VarKind::Binary, &|_: usize| 1.0);
        let in_house_count = grid("in_house_count", VarKind::Integer, &|i: usize| trucks[i].fleet_size as f64);
        let in_house_load = grid("in_house_load", VarKind::Integer, &|i: usize| trucks[i].in_house_capacity() as f64);
        let outsourced_count = grid("outsourced_count", VarKind::Integer, &|i: usize| {
            trucks[i].outsourcing_ceiling as f64
        });
        let outsourced_load = grid("outsourced_load", VarKind::Integer, &|i: usize| {
            trucks[i].outsourced_capacity() as f64
        });

        let low_demand: Vec<VarId> = J
            .clone()
            .map(|j| problem.add_variable(format!("low_demand[{}]", j + 1), VarKind::Binary, 0.0, 1.0))
            .collect();

        // the flag can never be 1 above the threshold; fix it instead of relying on big-M alone
        for (j, demand) in demands.as_slice().iter().enumerate() {
            if *demand as f64 > threshold {
                debug!("node {} demand {} above threshold, low-demand flag fixed to 0", j + 1, demand);
                problem.fix_upper(low_demand[j], 0.0);
            }
        }

        // ******************** ADD CONSTRAINTS ********************
        // in-house trucks of a type summed over all nodes stay within the fleet
        for i in I.clone() {
            let lhs: Vec<Term> = J.clone().map(|j| (in_house_count[i][j], 1.0)).collect();
            problem.add_constraint(
                format!("fleet_ceiling_{}", trucks[i].name),
                lhs,
                ConstraintOp::Le,
                trucks[i].fleet_size as f64,
            );
        }

        for (i, j) in iproduct!(I.clone(), J.clone()) {
            let truck = &trucks[i];
            let capacity = truck.capacity as f64;
            let node = j + 1;

            // no in-house trucks unless the type is marked used at the node
            problem.add_constraint(
                format!("usage_gate_{}_{node}", truck.name),
                vec![(in_house_count[i][j], 1.0), (used[i][j], -(truck.fleet_size as f64))],
                ConstraintOp::Le,
                0.0,
            );

            // load carried never exceeds the capacity of the trucks sent
            problem.add_constraint(
                format!("in_house_capacity_{}_{node}", truck.name),
                vec![(in_house_load[i][j], 1.0), (in_house_count[i][j], -capacity)],
                ConstraintOp::Le,
                0.0,
            );
            problem.add_constraint(
                format!("outsourced_capacity_{}_{node}", truck.name),
                vec![(outsourced_load[i][j], 1.0), (outsourced_count[i][j], -capacity)],
                ConstraintOp::Le,
                0.0,
            );

            problem.add_constraint(
                format!("outsourcing_ceiling_{}_{node}", truck.name),
                vec![(outsourced_count[i][j], 1.0)],
                ConstraintOp::Le,
                truck.outsourcing_ceiling as f64,
            );
        }

        for (j, demand) in demands.as_slice().iter().enumerate() {
            let demand = *demand as f64;
            let node = j + 1;

            // demand is met exactly by in-house plus outsourced load
            let delivered: Vec<Term> = I
                .clone()
                .flat_map(|i| [(in_house_load[i][j], 1.0), (outsourced_load[i][j], 1.0)])
                .collect();
            problem.add_constraint(format!("demand_{node}"), delivered, ConstraintOp::Eq, demand);

            // demand <= threshold + M * (1 - flag), rearranged as M * flag <= threshold + M - demand
            problem.add_constraint(
                format!("low_demand_{node}"),
                vec![(low_demand[j], big_m)],
                ConstraintOp::Le,
                threshold + big_m - demand,
            );
            problem.add_constraint(
                format!("gated_usage_{node}"),
                vec![(used[gated_type][j], 1.0), (low_demand[j], -1.0)],
                ConstraintOp::Le,
                0.0,
            );

            // capacity sent covers the demand: in-house first, outsourced for the rest
            let sent: Vec<Term> = I
                .clone()
                .flat_map(|i| {
                    let capacity = trucks[i].capacity as f64;
                    [(in_house_count[i][j], capacity), (outsourced_count[i][j], capacity)]
                })
                .collect();
            problem.add_constraint(format!("in_house_first_{node}"), sent, ConstraintOp::Ge, demand);
        }

        // set objective: unused in-house capacity plus a penalty per outsourced truck
        let penalty = self.config.outsourcing_penalty;
        let objective: Vec<Term> = iproduct!(I.clone(), J.clone())
            .flat_map(|(i, j)| {
                [
                    (in_house_count[i][j], trucks[i].capacity as f64),
                    (in_house_load[i][j], -1.0),
                    (outsourced_count[i][j], penalty),
                ]
            })
            .collect();
        problem.set_objective(objective, true);

        for constraint in &problem.constraints {
            trace!(
                "{}: {} terms {} {}",
                constraint.name,
                constraint.terms.len(),
                constraint.op.symbol(),
                constraint.rhs
            );
        }
        info!(
            "Successfully built allocation model: {} variables, {} constraints, big-M {}",
            problem.num_variables(),
            problem.num_constraints(),
            big_m
        );

        Ok(AllocationModel {
            problem,
            vars: AllocationVars {
                used,
                in_house_count,
                in_house_load,
                outsourced_count,
                outsourced_load,
                low_demand,
            },
            demands: demands.clone(),
            big_m,
            gated_type,
        })
    }
}

impl AllocationModel {
    pub fn num_nodes(&self) -> usize {
        self.demands.len()
    }

    pub fn num_truck_types(&self) -> usize {
        self.vars.used.len()
    }
}
