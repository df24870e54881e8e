use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

use truckalloc_core::{AllocationConfig, AllocationError, AllocationReport, Allocator, DemandVector, Preset};

#[derive(Parser)]
#[command(name = "truckalloc")]
#[command(about = "Allocate in-house and outsourced trucks to demand nodes", long_about = None)]
struct Cli {
    /// Increase log output (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve an allocation for per-node demands
    Solve {
        /// Demand per node, in node order (e.g. `120 40 0` or `120,40,0`)
        #[arg(required = true, num_args = 1.., allow_negative_numbers = true)]
        demands: Vec<String>,
        #[command(flatten)]
        fleet: FleetArgs,
        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: Format,
        /// Also print the per-truck-type detail table
        #[arg(short, long)]
        details: bool,
    },
    /// Show the fleet catalog and derived model constants
    Fleet {
        #[command(flatten)]
        fleet: FleetArgs,
    },
    /// Check a fleet configuration file for errors
    Check {
        /// The JSON configuration file to check
        file: PathBuf,
    },
    /// Build the model for the given demands and print its size without solving
    Model {
        #[arg(required = true, num_args = 1.., allow_negative_numbers = true)]
        demands: Vec<String>,
        #[command(flatten)]
        fleet: FleetArgs,
    },
}

#[derive(Args)]
struct FleetArgs {
    /// Built-in fleet configuration
    #[arg(short, long, default_value = "standard", conflicts_with = "config")]
    preset: String,
    /// JSON fleet configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Table,
    Json,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Solve {
            demands,
            fleet,
            format,
            details,
        } => {
            let config = load_config(&fleet).unwrap_or_else(|e| fail(&e));
            let demands = parse_demands(&demands);
            let allocator = Allocator::new(config).unwrap_or_else(|e| fail(&format!("Invalid configuration: {}", e)));

            match allocator.allocate(&demands) {
                Ok(report) => match format {
                    Format::Json => match serde_json::to_string_pretty(&report) {
                        Ok(json) => println!("{}", json),
                        Err(e) => fail(&format!("Error writing JSON: {}", e)),
                    },
                    Format::Table => print_report(&report, details),
                },
                Err(AllocationError::Infeasible) => {
                    println!("Status: INFEASIBLE");
                    println!("No allocation satisfies every node's demand with this fleet.");
                    std::process::exit(1);
                }
                Err(AllocationError::NotOptimal { status }) => {
                    println!("Status: {}", status.to_string().to_uppercase());
                    println!("The solver did not prove an optimal allocation.");
                    std::process::exit(1);
                }
                Err(e) => fail(&format!("Error: {}", e)),
            }
        }
        Commands::Fleet { fleet } => {
            let config = load_config(&fleet).unwrap_or_else(|e| fail(&e));
            print_fleet(&config);
        }
        Commands::Check { file } => match read_config(&file).and_then(|c| {
            c.validate()
                .map(|_| c)
                .map_err(|e| format!("Invalid configuration: {}", e))
        }) {
            Ok(config) => {
                println!("✓ {} is valid", file.display());
                println!("  {} truck types", config.catalog.len());
                println!("  in-house capacity {}", config.catalog.in_house_capacity());
                println!("  big-M {}", config.big_m_value());
            }
            Err(e) => {
                eprintln!("✗ {} has errors:", file.display());
                eprintln!("  {}", e);
                std::process::exit(1);
            }
        },
        Commands::Model { demands, fleet } => {
            let config = load_config(&fleet).unwrap_or_else(|e| fail(&e));
            let demands = parse_demands(&demands);
            let allocator = Allocator::new(config).unwrap_or_else(|e| fail(&format!("Invalid configuration: {}", e)));
            let model = allocator
                .build_model(&demands)
                .unwrap_or_else(|e| fail(&format!("Error: {}", e)));

            println!("Model: {}", model.problem.name);
            println!("  {} nodes, {} truck types", model.num_nodes(), model.num_truck_types());
            println!(
                "  {} variables ({} integral)",
                model.problem.num_variables(),
                model.problem.num_integer_variables()
            );
            println!("  {} constraints", model.problem.num_constraints());
            println!("  big-M {}", model.big_m);
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn fail(message: &str) -> ! {
    eprintln!("{}", message);
    std::process::exit(1);
}

fn parse_demands(raw: &[String]) -> DemandVector {
    let joined = raw.join(" ");
    DemandVector::parse(&joined).unwrap_or_else(|e| fail(&format!("Invalid input: {}", e)))
}

fn load_config(fleet: &FleetArgs) -> Result<AllocationConfig, String> {
    match &fleet.config {
        Some(path) => read_config(path),
        None => fleet
            .preset
            .parse::<Preset>()
            .map(Preset::config)
            .map_err(|e| e.to_string()),
    }
}

fn read_config(path: &Path) -> Result<AllocationConfig, String> {
    let source =
        std::fs::read_to_string(path).map_err(|e| format!("Error reading file {}: {}", path.display(), e))?;
    let config: AllocationConfig =
        serde_json::from_str(&source).map_err(|e| format!("Error parsing {}: {}", path.display(), e))?;
    log::info!("loaded {} truck types from {}", config.catalog.len(), path.display());
    Ok(config)
}

fn print_fleet(config: &AllocationConfig) {
    let gated = config.gated_type().ok();
    println!("{:14} {:>9} {:>7} {:>11}", "Truck type", "Capacity", "Fleet", "Outsource");
    for (i, truck) in config.catalog.iter().enumerate() {
        let marker = if Some(i) == gated { " *" } else { "" };
        println!(
            "{:14} {:>9} {:>7} {:>11}{}",
            truck.name, truck.capacity, truck.fleet_size, truck.outsourcing_ceiling, marker
        );
    }
    println!();
    println!("* restricted to nodes with demand <= {}", config.low_demand_threshold);
    println!("In-house capacity:   {}", config.catalog.in_house_capacity());
    println!("Outsourcing penalty: {}", config.outsourcing_penalty);
    println!("Big-M:               {}", config.big_m_value());
}

fn print_report(report: &AllocationReport, details: bool) {
    println!("Status: OPTIMAL");
    println!("Objective: {:.2}", report.objective_value);
    println!();
    println!("Summary:");
    println!(
        "  {:>5} {:>8} | {:>8} {:>8} {:>8} | {:>8} {:>8} {:>8}",
        "Node", "Demand", "Trucks", "Load", "Unused", "Out", "OutLoad", "OutFree"
    );
    for row in &report.summary {
        let m = &row.metrics;
        println!(
            "  {:>5} {:>8} | {:>8} {:>8} {:>8} | {:>8} {:>8} {:>8}",
            row.node,
            row.demand,
            m.in_house_trucks,
            m.in_house_load,
            m.in_house_unused,
            m.outsourced_trucks,
            m.outsourced_load,
            m.outsourced_unused
        );
    }

    if details {
        println!();
        println!("Details:");
        if report.details.is_empty() {
            println!("  (no trucks assigned)");
        }
        for row in &report.details {
            let m = &row.metrics;
            println!(
                "  {:>5} {:14} | {:>8} {:>8} {:>8} | {:>8} {:>8} {:>8}",
                row.node,
                row.truck_type,
                m.in_house_trucks,
                m.in_house_load,
                m.in_house_unused,
                m.outsourced_trucks,
                m.outsourced_load,
                m.outsourced_unused
            );
        }
    }
}
