// Barangay Resource Distribution - Core Library
// Exposes all modules for use in CLI, TUI, API server, and tests

pub mod resources;
pub mod household;
pub mod experts;      // Blackboard experts: Captain, Councilor, Treasurer
pub mod allocation;
pub mod registry;
pub mod report;       // Summary text report + plan CSV export
pub mod store;        // CSV persistence
pub mod audit;        // SQLite event trail
pub mod config;
pub mod logging;
pub mod simulation;   // Bayesian disaster allocation simulator

// Re-export commonly used types
pub use resources::{
    Resource, ResourceCatalog,
    FOOD_PACK, HYGIENE_KIT, MEDICAL_KIT, SCHOOL_SUPPLIES,
};
pub use household::{
    AgeBracket, AgeProfile, Household, HouseholdError, HouseholdInput,
    calculate_priority, parse_ages,
};
pub use experts::{BarangayCaptain, BudgetError, DistributionCouncilor, ExpertRole, Treasurer};
pub use allocation::{Allocation, AllocationEngine, AllocationOutcome, AllocationPlan};
pub use registry::{
    AllocationLine, DistributionRegistry, HouseholdDetails, RegistryError, DEFAULT_BUDGET,
};
pub use report::{
    DistributionSummary, ExportPaths, ReportError,
    export_plan, format_pesos,
};
pub use audit::{Event, open_audit, record_event, recent_events, events_for_entity};
pub use config::Config;
pub use logging::init_tracing;
pub use simulation::{
    AllocationRecord, SimulationConfig, SimulationHandle, SimulationResult, SimulationSummary,
    Vulnerability, run_simulation, spawn_simulation,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
