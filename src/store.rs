// 💾 Store - CSV persistence of the registry
//
// data/
//   households.csv   id,name,members,ages,priority_score
//   resources.csv    resource,cost,available
//   allocations.csv  household_id,resource,quantity
//   budget.txt       150000
//
// Missing files keep defaults. Malformed files are errors.

use crate::allocation::AllocationPlan;
use crate::audit::{self, Event};
use crate::household::{calculate_priority, join_ages, parse_ages, Household, HouseholdInput};
use crate::registry::DistributionRegistry;
use crate::resources::Resource;
use anyhow::{Context, Result};
use rusqlite::Connection;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

pub const HOUSEHOLDS_FILE: &str = "households.csv";
pub const RESOURCES_FILE: &str = "resources.csv";
pub const ALLOCATIONS_FILE: &str = "allocations.csv";
pub const BUDGET_FILE: &str = "budget.txt";

// ============================================================================
// ROW TYPES
// ============================================================================

#[derive(Debug, Deserialize)]
struct HouseholdRow {
    id: u32,
    name: String,
    members: u32,
    /// Comma-joined ages ("30,25,5")
    ages: String,
    /// Older files stored this as a float
    priority_score: f64,
}

#[derive(Debug, Deserialize)]
struct AllocationRow {
    household_id: u32,
    resource: String,
    quantity: u32,
}

// ============================================================================
// LOAD
// ============================================================================

/// Load registry state from `dir`, starting from `default_budget` and the
/// default catalog.
pub fn load(dir: &Path, default_budget: i64) -> Result<DistributionRegistry> {
    let mut registry = DistributionRegistry::new(default_budget);

    let households_path = dir.join(HOUSEHOLDS_FILE);
    if households_path.exists() {
        registry.households = load_households(&households_path)?;
    }

    let resources_path = dir.join(RESOURCES_FILE);
    if resources_path.exists() {
        let mut reader = csv::Reader::from_path(&resources_path)
            .with_context(|| format!("Failed to open {:?}", resources_path))?;
        for result in reader.deserialize() {
            let resource: Resource = result
                .with_context(|| format!("Failed to read resource row in {:?}", resources_path))?;
            if !registry.catalog.apply_stored(&resource) {
                warn!(resource = %resource.name, "unknown resource in store, ignored");
            }
        }
    }

    let allocations_path = dir.join(ALLOCATIONS_FILE);
    if allocations_path.exists() {
        registry.plan = load_allocations(&allocations_path)?;
    }

    let budget_path = dir.join(BUDGET_FILE);
    if budget_path.exists() {
        let content = fs::read_to_string(&budget_path)
            .with_context(|| format!("Failed to read {:?}", budget_path))?;
        registry.budget = content
            .trim()
            .parse()
            .with_context(|| format!("Invalid budget in {:?}: {}", budget_path, content.trim()))?;
    }

    debug!(
        households = registry.households.len(),
        budget = registry.budget,
        "registry loaded from {:?}",
        dir
    );
    Ok(registry)
}

fn load_households(path: &Path) -> Result<Vec<Household>> {
    let mut reader =
        csv::Reader::from_path(path).with_context(|| format!("Failed to open {:?}", path))?;

    let mut households = Vec::new();
    for result in reader.deserialize() {
        let row: HouseholdRow =
            result.with_context(|| format!("Failed to read household row in {:?}", path))?;

        let ages = parse_ages(&row.ages)
            .with_context(|| format!("Household {} has invalid ages in {:?}", row.id, path))?;

        // Same rules as registration: non-empty name, one age per member
        let input = HouseholdInput {
            name: row.name,
            members: row.members,
            ages,
        };
        input
            .validate()
            .with_context(|| format!("Household {} is invalid in {:?}", row.id, path))?;
        let HouseholdInput { name, members, ages } = input;

        // Priority is derived data; recompute rather than trust the file
        let priority_score = calculate_priority(members, &ages);
        if (row.priority_score - f64::from(priority_score)).abs() > f64::EPSILON {
            warn!(
                id = row.id,
                stored = row.priority_score,
                computed = priority_score,
                "stale priority score in store, recomputed"
            );
        }

        households.push(Household {
            id: row.id,
            name,
            members,
            ages,
            priority_score,
        });
    }

    Ok(households)
}

fn load_allocations(path: &Path) -> Result<AllocationPlan> {
    let mut reader =
        csv::Reader::from_path(path).with_context(|| format!("Failed to open {:?}", path))?;

    let mut plan = AllocationPlan::new();
    for result in reader.deserialize() {
        let row: AllocationRow =
            result.with_context(|| format!("Failed to read allocation row in {:?}", path))?;
        plan.entry(row.household_id)
            .or_default()
            .insert(row.resource, row.quantity);
    }
    Ok(plan)
}

// ============================================================================
// SAVE
// ============================================================================

pub fn save(dir: &Path, registry: &DistributionRegistry) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create data dir {:?}", dir))?;

    let households_path = dir.join(HOUSEHOLDS_FILE);
    let mut writer = csv::Writer::from_path(&households_path)
        .with_context(|| format!("Failed to write {:?}", households_path))?;
    writer.write_record(["id", "name", "members", "ages", "priority_score"])?;
    for household in &registry.households {
        writer.write_record([
            household.id.to_string(),
            household.name.clone(),
            household.members.to_string(),
            join_ages(&household.ages),
            household.priority_score.to_string(),
        ])?;
    }
    writer.flush()?;

    let resources_path = dir.join(RESOURCES_FILE);
    let mut writer = csv::Writer::from_path(&resources_path)
        .with_context(|| format!("Failed to write {:?}", resources_path))?;
    for resource in registry.catalog.iter() {
        writer.serialize(resource)?;
    }
    writer.flush()?;

    let allocations_path = dir.join(ALLOCATIONS_FILE);
    let mut writer = csv::Writer::from_path(&allocations_path)
        .with_context(|| format!("Failed to write {:?}", allocations_path))?;
    writer.write_record(["household_id", "resource", "quantity"])?;
    for (&household_id, allocation) in &registry.plan {
        for (resource, &quantity) in allocation {
            writer.write_record([
                household_id.to_string(),
                resource.clone(),
                quantity.to_string(),
            ])?;
        }
    }
    writer.flush()?;

    fs::write(dir.join(BUDGET_FILE), registry.budget.to_string())
        .with_context(|| format!("Failed to write budget to {:?}", dir))?;

    Ok(())
}

/// Save the registry and record `event` as one step. The event is
/// inserted in a transaction that only commits once the files are
/// written, so a failed save leaves no audit entry behind.
pub fn commit(
    dir: &Path,
    registry: &DistributionRegistry,
    audit_conn: &Connection,
    event: &Event,
) -> Result<()> {
    let tx = audit_conn
        .unchecked_transaction()
        .context("Failed to begin audit transaction")?;
    audit::record_event(&tx, event)?;
    save(dir, registry).context("Failed to save registry data")?;
    tx.commit().context("Failed to commit audit event")?;
    debug!(event_type = %event.event_type, "registry committed");
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{FOOD_PACK, MEDICAL_KIT};

    fn input(name: &str, ages: &[u32]) -> HouseholdInput {
        HouseholdInput {
            name: name.to_string(),
            members: ages.len() as u32,
            ages: ages.to_vec(),
        }
    }

    #[test]
    fn test_load_empty_dir_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let registry = load(dir.path(), 90_000).unwrap();

        assert!(registry.households.is_empty());
        assert_eq!(registry.budget, 90_000);
        assert_eq!(registry.catalog.get(FOOD_PACK).unwrap().available, 100);
    }

    #[test]
    fn test_save_then_load_preserves_state() {
        let dir = tempfile::tempdir().unwrap();

        let mut registry = DistributionRegistry::default();
        registry.add_household(input("Dela Cruz, Juan", &[35, 33, 8, 3])).unwrap();
        registry.add_household(input("Santos", &[72, 70])).unwrap();
        registry.update_budget(120_000).unwrap();
        registry.allocate().unwrap();

        save(dir.path(), &registry).unwrap();
        let loaded = load(dir.path(), 0).unwrap();

        assert_eq!(loaded.households, registry.households);
        assert_eq!(loaded.catalog, registry.catalog);
        assert_eq!(loaded.budget, 120_000);
        assert_eq!(loaded.total_cost(), registry.total_cost());
        assert_eq!(loaded.allocation_for(2).unwrap()[MEDICAL_KIT], 1);
    }

    #[test]
    fn test_ages_written_as_single_field() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = DistributionRegistry::default();
        registry.add_household(input("Reyes", &[30, 25, 5])).unwrap();

        save(dir.path(), &registry).unwrap();

        let text = fs::read_to_string(dir.path().join(HOUSEHOLDS_FILE)).unwrap();
        assert!(text.contains("1,Reyes,3,\"30,25,5\",50\n"));
    }

    #[test]
    fn test_load_legacy_float_priority_and_unknown_resource() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(HOUSEHOLDS_FILE),
            "id,name,members,ages,priority_score\n4,Garcia,2,\"70,3\",75.0\n",
        )
        .unwrap();
        fs::write(
            dir.path().join(RESOURCES_FILE),
            "resource,cost,available\nFood Pack,520,40\nGenerator,9000,2\n",
        )
        .unwrap();

        let registry = load(dir.path(), 150_000).unwrap();

        assert_eq!(registry.households[0].id, 4);
        assert_eq!(registry.households[0].priority_score, 75);
        assert_eq!(registry.catalog.unit_cost(FOOD_PACK), Some(520));
        assert_eq!(registry.catalog.len(), 4);
    }

    #[test]
    fn test_member_count_mismatch_is_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(HOUSEHOLDS_FILE),
            "id,name,members,ages,priority_score\n1,Garcia,3,\"70,3\",85\n",
        )
        .unwrap();

        let err = load(dir.path(), 150_000).unwrap_err();
        assert!(format!("{:#}", err).contains("Household 1 is invalid"));
    }

    #[test]
    fn test_huge_member_count_is_error_not_overflow() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(HOUSEHOLDS_FILE),
            "id,name,members,ages,priority_score\n1,Garcia,500000000,\"70,3\",0\n",
        )
        .unwrap();

        assert!(load(dir.path(), 150_000).is_err());
    }

    #[test]
    fn test_zero_members_is_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(HOUSEHOLDS_FILE),
            "id,name,members,ages,priority_score\n1,Garcia,0,\"70\",25\n",
        )
        .unwrap();

        assert!(load(dir.path(), 150_000).is_err());
    }

    #[test]
    fn test_malformed_budget_is_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(BUDGET_FILE), "one hundred").unwrap();

        let err = load(dir.path(), 150_000).unwrap_err();
        assert!(format!("{:#}", err).contains("Invalid budget"));
    }

    #[test]
    fn test_malformed_household_row_is_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(HOUSEHOLDS_FILE),
            "id,name,members,ages,priority_score\nx,Garcia,2,\"70,3\",75\n",
        )
        .unwrap();

        assert!(load(dir.path(), 150_000).is_err());
    }

    #[test]
    fn test_commit_saves_and_records() {
        let dir = tempfile::tempdir().unwrap();
        let conn = audit::open_audit(dir.path()).unwrap();
        let mut registry = DistributionRegistry::new(150_000);
        registry.add_household(input("Santos", &[70, 3])).unwrap();

        let event = Event::new("household_added", "household", "1", serde_json::json!({}), "cli");
        commit(dir.path(), &registry, &conn, &event).unwrap();

        assert_eq!(load(dir.path(), 0).unwrap().households.len(), 1);
        assert_eq!(audit::recent_events(&conn, 10).unwrap().len(), 1);
    }

    #[test]
    fn test_failed_save_records_no_event() {
        let dir = tempfile::tempdir().unwrap();
        let conn = audit::open_audit(dir.path()).unwrap();
        // A regular file where the data dir should be
        let blocked = dir.path().join("not-a-dir");
        fs::write(&blocked, "").unwrap();

        let registry = DistributionRegistry::new(150_000);
        let event = Event::new("budget_updated", "budget", "barangay", serde_json::json!({}), "cli");
        assert!(commit(&blocked, &registry, &conn, &event).is_err());
        assert!(audit::recent_events(&conn, 10).unwrap().is_empty());
    }
}
