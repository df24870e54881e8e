use log::{debug, info};
use truckalloc_solver::{SolverBackend, Solver};

use crate::config::AllocationConfig;
use crate::demand::DemandVector;
use crate::error::AllocationError;
use crate::model::{AllocationModel, ModelBuilder};
use crate::report::{AllocationReport, ResultExtractor};

/// The allocation pipeline: model builder, solver backend, result extractor.
///
/// Holds only immutable configuration, so independent demand vectors can be
/// allocated concurrently through one instance when the backend allows it.
pub struct Allocator<B: SolverBackend = Solver> {
    config: AllocationConfig,
    backend: B,
}

impl Allocator<Solver> {
    pub fn new(config: AllocationConfig) -> Result<Self, AllocationError> {
        let backend = Solver::new().with_tolerance(config.integrality_tolerance);
        Self::with_backend(config, backend)
    }
}

impl<B: SolverBackend> Allocator<B> {
    pub fn with_backend(config: AllocationConfig, backend: B) -> Result<Self, AllocationError> {
        config.validate()?;
        Ok(Self { config, backend })
    }

    pub fn config(&self) -> &AllocationConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn build_model(&self, demands: &DemandVector) -> Result<AllocationModel, AllocationError> {
        ModelBuilder::new(&self.config).build(demands)
    }

    /// Allocate trucks for one demand vector. The solver is called exactly once.
    pub fn allocate(&self, demands: &DemandVector) -> Result<AllocationReport, AllocationError> {
        let model = self.build_model(demands)?;

        info!("Solving with backend '{}'", self.backend.name());
        let solution = self.backend.solve(&model.problem)?;
        debug!("Backend returned status {}", solution.status);

        ResultExtractor::new(&self.config).extract(&model, &solution)
    }
}

/// Allocate the standard fleet for raw per-node demands
pub fn solve_truck_allocation(demands: &[i64]) -> Result<AllocationReport, AllocationError> {
    let demands = DemandVector::try_from(demands)?;
    Allocator::new(AllocationConfig::standard())?.allocate(&demands)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{FleetCatalog, TruckType};
    use crate::error::InputError;
    use truckalloc_solver::{MipProblem, Solution, SolutionStatus, SolverError};

    /// small: capacity 10, gated at demand <= 10; large: capacity 25
    fn two_tier() -> AllocationConfig {
        let catalog = FleetCatalog::new(vec![
            TruckType::new("small", 10, 2, 10),
            TruckType::new("large", 25, 2, 10),
        ])
        .unwrap();
        AllocationConfig::new(catalog, 10, 1000.0)
    }

    /// No single type can carry 100 units per pair of nodes; together they can
    fn three_tier() -> AllocationConfig {
        let catalog = FleetCatalog::new(vec![
            TruckType::new("small", 5, 4, 10),
            TruckType::new("medium", 20, 2, 10),
            TruckType::new("large", 30, 2, 10),
        ])
        .unwrap();
        AllocationConfig::new(catalog, 5, 1000.0)
    }

    fn allocate(config: AllocationConfig, demands: Vec<i64>) -> Result<AllocationReport, AllocationError> {
        let demands = DemandVector::new(demands).unwrap();
        Allocator::new(config).unwrap().allocate(&demands)
    }

    fn assert_invariants(config: &AllocationConfig, demands: &[u64], report: &AllocationReport) {
        assert_eq!(report.summary.len(), demands.len());
        for (row, demand) in report.summary.iter().zip(demands) {
            assert_eq!(row.metrics.in_house_load + row.metrics.outsourced_load, *demand);
        }
        for truck in config.catalog.iter() {
            let used: u64 = report
                .details
                .iter()
                .filter(|d| d.truck_type == truck.name)
                .map(|d| d.metrics.in_house_trucks)
                .sum();
            assert!(used <= u64::from(truck.fleet_size), "{} over fleet", truck.name);
        }
        for detail in &report.details {
            let capacity = u64::from(config.catalog.get(&detail.truck_type).unwrap().capacity);
            let m = &detail.metrics;
            assert!(m.is_assigned());
            assert_eq!(m.in_house_trucks * capacity, m.in_house_load + m.in_house_unused);
            assert_eq!(m.outsourced_trucks * capacity, m.outsourced_load + m.outsourced_unused);
        }
    }

    #[test]
    fn test_zero_demand_node() {
        let report = allocate(AllocationConfig::standard(), vec![0]).unwrap();
        assert_eq!(report.summary.len(), 1);
        assert_eq!(report.summary[0].metrics, Default::default());
        assert!(report.details.is_empty());
        assert!(report.objective_value.abs() < 1e-6);
    }

    #[test]
    fn test_small_shipment_uses_smallest_type() {
        let config = AllocationConfig::standard();
        let report = allocate(config.clone(), vec![30]).unwrap();
        assert_invariants(&config, &[30], &report);
        assert_eq!(report.details.len(), 1);
        assert_eq!(report.details[0].truck_type, "Van");
        assert_eq!(report.details[0].metrics.in_house_trucks, 1);
        assert_eq!(report.details[0].metrics.in_house_unused, 12);
        assert_eq!(report.total_outsourced_trucks(), 0);

        let report = allocate(two_tier(), vec![8]).unwrap();
        assert_eq!(report.details.len(), 1);
        assert_eq!(report.details[0].truck_type, "small");
        assert!((report.objective_value - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_gated_type_skipped_above_threshold() {
        let config = two_tier();
        let report = allocate(config.clone(), vec![20]).unwrap();
        assert_invariants(&config, &[20], &report);
        assert_eq!(report.details.len(), 1);
        assert_eq!(report.details[0].truck_type, "large");
        assert_eq!(report.details[0].metrics.in_house_unused, 5);
        assert!((report.objective_value - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_outsourcing_when_gated_type_is_unavailable() {
        // in-house can carry 50 (small is gated off), so one truck must be rented
        let config = two_tier();
        let report = allocate(config.clone(), vec![60]).unwrap();
        assert_invariants(&config, &[60], &report);

        let totals = report.totals();
        assert_eq!(totals.outsourced_trucks, 1);
        assert_eq!(totals.in_house_trucks, 2);
        assert_eq!(totals.in_house_unused, 0);
        assert!((report.objective_value - 1000.0).abs() < 1e-6);
    }

    #[test]
    fn test_fleet_split_across_nodes() {
        let config = three_tier();
        let report = allocate(config.clone(), vec![50, 50]).unwrap();
        assert_invariants(&config, &[50, 50], &report);

        assert_eq!(report.total_outsourced_trucks(), 0);
        assert!(report.objective_value.abs() < 1e-6);
        for node in [1, 2] {
            let mut types: Vec<_> = report
                .details_for(node)
                .map(|d| (d.truck_type.as_str(), d.metrics.in_house_trucks))
                .collect();
            types.sort();
            assert_eq!(types, vec![("large", 1), ("medium", 1)]);
        }
    }

    #[test]
    fn test_infeasible_demand() {
        // one unit more than every in-house and outsourced truck could carry to one node
        let config = two_tier();
        let limit = config.catalog.max_node_capacity() as i64;
        let err = allocate(config, vec![limit + 1]).unwrap_err();
        assert!(matches!(err, AllocationError::Infeasible));
        assert!(err.is_no_allocation());
    }

    #[test]
    fn test_outsourcing_is_monotone_in_demand() {
        let config = two_tier();
        let mut previous = 0;
        for demand in [40, 50, 60, 75, 80, 100] {
            let report = allocate(config.clone(), vec![demand]).unwrap();
            assert_invariants(&config, &[demand as u64], &report);
            let outsourced = report.total_outsourced_trucks();
            assert!(outsourced >= previous, "demand {demand}: {outsourced} < {previous}");
            previous = outsourced;
        }
        assert!(previous > 0);
    }

    #[test]
    fn test_repeated_solves_agree_on_totals() {
        let config = three_tier();
        let first = allocate(config.clone(), vec![35, 4, 45]).unwrap();
        let second = allocate(config.clone(), vec![35, 4, 45]).unwrap();
        assert_invariants(&config, &[35, 4, 45], &first);
        assert_eq!(first.totals(), second.totals());
        assert!((first.objective_value - second.objective_value).abs() < 1e-6);
    }

    #[test]
    fn test_standard_fleet_mid_size_demand() {
        let config = AllocationConfig::standard();
        let report = allocate(config.clone(), vec![500]).unwrap();
        assert_invariants(&config, &[500], &report);
        assert_eq!(report.total_outsourced_trucks(), 0);
        // two trucks of 550 combined capacity is the tightest fit for 500
        assert_eq!(report.totals().in_house_unused, 50);
    }

    #[test]
    fn test_standard_fleet_just_above_threshold() {
        // the van is reserved for nodes at or below 40, so 41 takes a 3A-Ton
        let config = AllocationConfig::standard();
        let report = allocate(config.clone(), vec![41]).unwrap();
        assert_invariants(&config, &[41], &report);
        assert_eq!(report.details.len(), 1);
        assert_eq!(report.details[0].truck_type, "3A-Ton");
        assert_eq!(report.details[0].metrics.in_house_unused, 124);
    }

    #[test]
    fn test_demand_beyond_total_in_house_capacity() {
        // 8000 exceeds the whole standard fleet (7687); the van is gated off, leaving 7645
        let config = AllocationConfig::standard();
        assert!(8000 > config.catalog.in_house_capacity());
        let report = allocate(config.clone(), vec![8000]).unwrap();
        assert_invariants(&config, &[8000], &report);

        let totals = report.totals();
        assert_eq!(report.total_outsourced_trucks(), 2);
        assert_eq!(totals.in_house_unused, 0);
        assert_eq!(totals.in_house_load + totals.outsourced_load, 8000);
        assert!((report.objective_value - 2.0 * 10000.0).abs() < 1e-6);
    }

    #[test]
    fn test_concurrent_independent_solves() {
        let allocator = Allocator::new(two_tier()).unwrap();
        let inputs = [vec![8], vec![20], vec![60]];
        let reports: Vec<_> = std::thread::scope(|s| {
            let handles: Vec<_> = inputs
                .iter()
                .map(|demands| {
                    let allocator = &allocator;
                    s.spawn(move || allocator.allocate(&DemandVector::new(demands.clone()).unwrap()))
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap().unwrap()).collect()
        });
        let objectives: Vec<_> = reports.iter().map(|r| r.objective_value.round() as i64).collect();
        assert_eq!(objectives, vec![2, 5, 1000]);
    }

    #[test]
    fn test_invalid_input_never_reaches_solver() {
        let allocator = Allocator::with_backend(two_tier(), Unavailable).unwrap();
        assert!(matches!(
            DemandVector::new(vec![-4]).map(|d| allocator.allocate(&d)),
            Err(InputError::Negative { node: 1, value: -4 })
        ));
        assert!(matches!(
            solve_truck_allocation(&[]),
            Err(AllocationError::InvalidInput(InputError::Empty))
        ));
    }

    #[test]
    fn test_solver_failure_is_not_infeasible() {
        let allocator = Allocator::with_backend(two_tier(), Unavailable).unwrap();
        let demands = DemandVector::new(vec![8]).unwrap();
        let err = allocator.allocate(&demands).unwrap_err();
        assert!(matches!(err, AllocationError::SolverUnavailable(SolverError::Unavailable(_))));
        assert!(!err.is_no_allocation());
    }

    #[test]
    fn test_non_optimal_status_is_reported() {
        let allocator = Allocator::with_backend(two_tier(), Fixed(Solution::unbounded())).unwrap();
        let demands = DemandVector::new(vec![8]).unwrap();
        let err = allocator.allocate(&demands).unwrap_err();
        assert!(matches!(
            err,
            AllocationError::NotOptimal {
                status: SolutionStatus::Unbounded
            }
        ));
    }

    #[test]
    fn test_defective_backend_is_caught() {
        // claims optimality but returns all zeros: demand is not met
        let allocator = Allocator::with_backend(two_tier(), Zeros).unwrap();
        let demands = DemandVector::new(vec![8]).unwrap();
        let err = allocator.allocate(&demands).unwrap_err();
        assert!(matches!(err, AllocationError::InvariantViolation(_)));
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = two_tier().with_gated_type("huge");
        assert!(matches!(Allocator::new(config), Err(AllocationError::Config(_))));
    }

    struct Unavailable;

    impl SolverBackend for Unavailable {
        fn name(&self) -> &str {
            "unavailable"
        }

        fn solve(&self, _problem: &MipProblem) -> Result<Solution, SolverError> {
            Err(SolverError::Unavailable("no license".to_string()))
        }
    }

    struct Fixed(Solution);

    impl SolverBackend for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn solve(&self, _problem: &MipProblem) -> Result<Solution, SolverError> {
            Ok(self.0.clone())
        }
    }

    struct Zeros;

    impl SolverBackend for Zeros {
        fn name(&self) -> &str {
            "zeros"
        }

        fn solve(&self, problem: &MipProblem) -> Result<Solution, SolverError> {
            Ok(Solution::optimal(vec![0.0; problem.num_variables()], 0.0))
        }
    }
}
