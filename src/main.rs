// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{Context, Result};
use barangay_distribution::audit::{
    self, BUDGET_UPDATED, HOUSEHOLD_ADDED, HOUSEHOLD_REMOVED, PLAN_EXPORTED, RESOURCES_ALLOCATED,
};
use barangay_distribution::logging::init_tracing_with_default;
use barangay_distribution::{
    export_plan, format_pesos, init_tracing, spawn_simulation, store, Config, DistributionRegistry,
    DistributionSummary, Event, HouseholdInput, SimulationConfig,
};
use chrono::Local;
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use serde_json::json;
use std::fs;
use std::path::PathBuf;

/// Barangay resource distribution: register households, allocate relief
/// resources within budget, export the plan.
#[derive(Parser, Debug)]
#[command(name = "barangay", version, about, long_about = None)]
struct Cli {
    /// Directory holding the CSV data files and audit database
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Path to configuration file (defaults to ./barangay.toml if present)
    #[arg(long, global = true, env = "BARANGAY_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Register a household
    Add {
        /// Name of the household head
        #[arg(long)]
        name: String,

        /// Comma-separated ages, e.g. "30,25,5"
        #[arg(long)]
        ages: String,

        /// Number of members (defaults to the number of ages)
        #[arg(long)]
        members: Option<u32>,
    },

    /// Remove a household by id
    Remove { id: u32 },

    /// List households by priority
    List,

    /// Show one household with its age groups and allocation
    Show { id: u32 },

    /// Allocate resources to households within budget
    Allocate,

    /// Show or set the budget
    Budget {
        #[arg(allow_negative_numbers = true)]
        amount: Option<i64>,
    },

    /// Show resource stock and unit costs
    Resources,

    /// Export the distribution plan CSV and summary report
    Export {
        /// Output directory (defaults to the data directory)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Print the summary report, or parse a saved one
    Summary {
        #[arg(long)]
        parse: Option<PathBuf>,
    },

    /// Run the Bayesian disaster allocation simulator
    Simulate {
        #[arg(long)]
        households: Option<usize>,

        #[arg(long)]
        budget: Option<i64>,

        #[arg(long)]
        seed: Option<u64>,

        /// Write per-household results to this CSV file
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Show recent audit events
    Audit {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Interactive terminal UI
    Ui,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Log lines would tear the TUI, keep it quiet unless asked
    if matches!(cli.command, Commands::Ui) {
        init_tracing_with_default("barangay=warn");
    } else {
        init_tracing();
    }

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    tracing::debug!(data_dir = ?config.data_dir, "configuration loaded");

    match cli.command {
        Commands::Add { name, ages, members } => run_add(&config, &name, &ages, members),
        Commands::Remove { id } => run_remove(&config, id),
        Commands::List => run_list(&config),
        Commands::Show { id } => run_show(&config, id),
        Commands::Allocate => run_allocate(&config),
        Commands::Budget { amount } => run_budget(&config, amount),
        Commands::Resources => run_resources(&config),
        Commands::Export { out } => run_export(&config, out),
        Commands::Summary { parse } => run_summary(&config, parse),
        Commands::Simulate {
            households,
            budget,
            seed,
            out,
        } => run_simulate(&config, households, budget, seed, out),
        Commands::Audit { limit } => run_audit(&config, limit),
        Commands::Ui => run_ui_mode(&config),
    }
}

// ============================================================================
// SESSION
// ============================================================================

/// Loaded registry plus audit connection for one command
struct Session<'a> {
    config: &'a Config,
    registry: DistributionRegistry,
    audit: Connection,
}

impl<'a> Session<'a> {
    fn open(config: &'a Config) -> Result<Self> {
        let registry = store::load(&config.data_dir, config.default_budget)
            .context("Failed to load registry data")?;
        let audit = audit::open_audit(&config.data_dir)?;
        Ok(Session {
            config,
            registry,
            audit,
        })
    }

    fn event(&self, event_type: &str, entity_type: &str, entity_id: &str, data: serde_json::Value) -> Event {
        Event::new(event_type, entity_type, entity_id, data, &self.config.actor)
    }

    /// Save `registry` and its audit event together
    fn commit(&self, registry: &DistributionRegistry, event: Event) -> Result<()> {
        store::commit(&self.config.data_dir, registry, &self.audit, &event)
    }

    /// Audit-only event for commands that change nothing in the store
    fn record(&self, event: Event) -> Result<()> {
        audit::record_event(&self.audit, &event)
    }
}

// ============================================================================
// COMMANDS
// ============================================================================

fn run_add(config: &Config, name: &str, ages: &str, members: Option<u32>) -> Result<()> {
    let mut session = Session::open(config)?;

    let input = HouseholdInput::from_form(name, ages, members)?;
    let household = session.registry.add_household(input)?.clone();
    let event = session.event(
        HOUSEHOLD_ADDED,
        "household",
        &household.id.to_string(),
        json!({
            "name": household.name,
            "members": household.members,
            "ages": household.ages,
            "priority_score": household.priority_score,
        }),
    );
    session.commit(&session.registry, event)?;

    println!("✅ Household added");
    println!("   ID: {}", household.id);
    println!("   Head: {}", household.name);
    println!("   Members: {}", household.members);
    println!("   Priority score: {}", household.priority_score);
    Ok(())
}

fn run_remove(config: &Config, id: u32) -> Result<()> {
    let mut session = Session::open(config)?;

    let removed = session.registry.remove_household(id)?;
    let event = session.event(
        HOUSEHOLD_REMOVED,
        "household",
        &id.to_string(),
        json!({ "name": removed.name }),
    );
    session.commit(&session.registry, event)?;

    println!("🗑️  Household {} ({}) removed", removed.id, removed.name);
    Ok(())
}

fn run_list(config: &Config) -> Result<()> {
    let session = Session::open(config)?;
    let households = session.registry.households_by_priority();

    if households.is_empty() {
        println!("📭 No households registered yet");
        println!("   Run: barangay add --name \"Dela Cruz, Juan\" --ages \"35,33,8,3\"");
        return Ok(());
    }

    println!("🏠 Households ({}) - by priority", households.len());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("{:>4}  {:<28} {:>7}  {:<20} {:>8}", "ID", "Household Head", "Members", "Ages", "Priority");
    for h in households {
        println!(
            "{:>4}  {:<28} {:>7}  {:<20} {:>8}",
            h.id,
            h.name,
            h.members,
            h.ages_display(),
            h.priority_score
        );
    }
    Ok(())
}

fn run_show(config: &Config, id: u32) -> Result<()> {
    let session = Session::open(config)?;
    let details = session.registry.household_details(id)?;
    let h = &details.household;

    println!("🏠 Household {} - {}", h.id, h.name);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("   Members: {}", h.members);
    println!(
        "   Max age: {}",
        details.max_age.map(|a| a.to_string()).unwrap_or_else(|| "-".to_string())
    );
    println!("   Priority score: {}", h.priority_score);

    println!("\n👪 Age groups");
    for (bracket, ages) in &details.age_groups {
        let ages: Vec<String> = ages.iter().map(|a| a.to_string()).collect();
        println!("   {}: {}", bracket.label(), ages.join(", "));
    }

    println!("\n📦 Allocation");
    if details.allocations.is_empty() {
        println!("   Nothing allocated");
    }
    for line in &details.allocations {
        println!("   {} x{} = ₱{}", line.resource, line.quantity, format_pesos(line.cost));
    }
    println!("   Total: ₱{}", format_pesos(details.total_cost));
    Ok(())
}

fn run_allocate(config: &Config) -> Result<()> {
    let mut session = Session::open(config)?;

    let outcome = session.registry.allocate()?;
    let event = session.event(
        RESOURCES_ALLOCATED,
        "plan",
        "current",
        json!({
            "households": session.registry.households.len(),
            "served": outcome.served_count(),
            "total_cost": outcome.total_cost,
            "remaining_budget": outcome.remaining_budget,
        }),
    );
    session.commit(&session.registry, event)?;

    println!("⚖️  Resources allocated");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!(
        "✓ Served {} of {} households",
        outcome.served_count(),
        session.registry.households.len()
    );
    for (resource, units) in outcome.units_by_resource() {
        println!("   {}: {} units", resource, units);
    }
    println!("✓ Total cost: ₱{}", format_pesos(outcome.total_cost));
    println!("✓ Remaining budget: ₱{}", format_pesos(outcome.remaining_budget));
    Ok(())
}

fn run_budget(config: &Config, amount: Option<i64>) -> Result<()> {
    let mut session = Session::open(config)?;

    if let Some(amount) = amount {
        let previous = session.registry.budget;
        session.registry.update_budget(amount)?;
        let event = session.event(
            BUDGET_UPDATED,
            "budget",
            "barangay",
            json!({ "previous": previous, "budget": amount }),
        );
        session.commit(&session.registry, event)?;
        println!("💰 Budget updated to ₱{}", format_pesos(amount));
        return Ok(());
    }

    let registry = &session.registry;
    println!("💰 Budget: ₱{}", format_pesos(registry.budget));
    println!("   Allocated: ₱{}", format_pesos(registry.total_cost()));
    println!("   Remaining: ₱{}", format_pesos(registry.remaining_budget()));
    Ok(())
}

fn run_resources(config: &Config) -> Result<()> {
    let session = Session::open(config)?;

    println!("📦 Resources");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("{:<20} {:>12} {:>10}", "Resource", "Unit Cost", "Available");
    for r in &session.registry.catalog {
        println!("{:<20} {:>12} {:>10}", r.name, format!("₱{}", format_pesos(r.cost)), r.available);
    }
    Ok(())
}

fn run_export(config: &Config, out: Option<PathBuf>) -> Result<()> {
    let session = Session::open(config)?;
    let dir = out.unwrap_or_else(|| config.data_dir.clone());

    let paths = export_plan(&session.registry, &dir, Local::now().naive_local())?;
    session.record(session.event(
        PLAN_EXPORTED,
        "plan",
        "current",
        json!({
            "plan_csv": paths.plan_csv.display().to_string(),
            "summary_txt": paths.summary_txt.display().to_string(),
        }),
    ))?;

    println!("📤 Distribution plan exported");
    println!("   Plan: {}", paths.plan_csv.display());
    println!("   Summary: {}", paths.summary_txt.display());
    Ok(())
}

fn run_summary(config: &Config, parse: Option<PathBuf>) -> Result<()> {
    let Some(path) = parse else {
        let session = Session::open(config)?;
        print!("{}", session.registry.summary(Local::now().date_naive()).render());
        return Ok(());
    };

    let text = fs::read_to_string(&path).with_context(|| format!("Failed to read report {:?}", path))?;
    let summary = DistributionSummary::parse(&text).with_context(|| format!("Invalid report {:?}", path))?;

    println!("📄 Report dated {}", summary.date);
    println!("   Budget: ₱{}", format_pesos(summary.total_budget));
    println!("   Total cost: ₱{}", format_pesos(summary.total_cost));
    println!("   Remaining: ₱{}", format_pesos(summary.remaining_budget));
    println!("   Households: {}", summary.demographics.households);
    println!(
        "   Under 5: {}  School age: {}  Elderly: {}",
        summary.demographics.children_under_five,
        summary.demographics.school_age,
        summary.demographics.elderly
    );
    for line in &summary.resources {
        println!("   {}: {} left at ₱{}", line.name, line.remaining, format_pesos(line.unit_price));
    }
    for note in &summary.notes {
        println!("   📝 {}", note.author);
    }
    Ok(())
}

fn run_simulate(
    config: &Config,
    households: Option<usize>,
    budget: Option<i64>,
    seed: Option<u64>,
    out: Option<PathBuf>,
) -> Result<()> {
    let mut settings = config.clone();
    if let Some(n) = households {
        settings.simulation.households = n;
    }
    if let Some(b) = budget {
        settings.simulation.budget = b;
    }
    if seed.is_some() {
        settings.simulation.seed = seed;
    }
    settings.validate()?;

    println!("🎲 Disaster Allocation Simulator");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let handle = spawn_simulation(SimulationConfig {
        households: settings.simulation.households,
        budget: settings.simulation.budget,
        seed: settings.simulation.seed,
        ..SimulationConfig::default()
    });

    for line in handle.progress.iter() {
        println!("   {}", line);
    }
    let result = handle.join()?;
    let summary = result.summary();

    println!("\n📊 Summary");
    println!("   Households served: {}", summary.households_served);
    println!("   Households not reached: {}", result.unserved);
    println!("   Remaining budget: ₱{}", format_pesos(summary.remaining_budget));
    println!("   Average priority: {:.2}", summary.average_priority);
    println!("   Average items per household: {:.2}", summary.average_items);
    println!("   Average cost per household: ₱{:.2}", summary.average_cost);
    println!(
        "   Waiting time min/avg/max: {} / {:.2} / {}",
        summary.min_waiting_time, summary.average_waiting_time, summary.max_waiting_time
    );

    if let Some(path) = out {
        result.export_csv(&path)?;
        println!("\n💾 Results saved to {}", path.display());
    }
    Ok(())
}

fn run_audit(config: &Config, limit: usize) -> Result<()> {
    let conn = audit::open_audit(&config.data_dir)?;
    let events = audit::recent_events(&conn, limit)?;

    if events.is_empty() {
        println!("📜 No audit events yet");
        return Ok(());
    }

    println!("📜 Recent events");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for event in events {
        println!(
            "{}  {:<20} {}:{:<8} by {}  {}",
            event.timestamp.format("%Y-%m-%d %H:%M:%S"),
            event.event_type,
            event.entity_type,
            event.entity_id,
            event.actor,
            event.data
        );
    }
    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(config: &Config) -> Result<()> {
    let session = Session::open(config)?;

    let mut app = ui::App::new(session.registry.clone());
    ui::run_ui(&mut app)?;

    if app.dirty {
        let event = session.event(
            RESOURCES_ALLOCATED,
            "plan",
            "current",
            json!({
                "households": app.registry.households.len(),
                "total_cost": app.registry.total_cost(),
                "remaining_budget": app.registry.remaining_budget(),
            }),
        );
        session.commit(&app.registry, event)?;
        println!("💾 Allocation saved");
    }

    println!("✅ UI closed successfully");
    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_config: &Config) -> Result<()> {
    anyhow::bail!("TUI mode not available, rebuild with: cargo build --features tui")
}
