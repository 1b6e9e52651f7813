// 🗂️ Distribution Registry - The shared blackboard
//
// Holds households, resource stock, budget and the current plan.
// Experts read from it; the allocation engine writes the plan back.

use crate::allocation::{Allocation, AllocationEngine, AllocationOutcome, AllocationPlan};
use crate::experts::{BudgetError, Treasurer};
use crate::household::{AgeBracket, AgeProfile, Household, HouseholdError, HouseholdInput};
use crate::report::DistributionSummary;
use crate::resources::ResourceCatalog;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

/// Initial budget: 150,000 pesos
pub const DEFAULT_BUDGET: i64 = 150_000;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("household {0} not found")]
    UnknownHousehold(u32),

    #[error("there are no households in the system, add households first")]
    NoHouseholds,

    #[error(transparent)]
    Household(#[from] HouseholdError),

    #[error(transparent)]
    Budget(#[from] BudgetError),
}

// ============================================================================
// HOUSEHOLD DETAILS (read model)
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationLine {
    pub resource: String,
    pub quantity: u32,
    pub cost: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HouseholdDetails {
    pub household: Household,
    pub max_age: Option<u32>,
    pub age_groups: Vec<(AgeBracket, Vec<u32>)>,
    pub allocations: Vec<AllocationLine>,
    pub total_cost: i64,
}

// ============================================================================
// REGISTRY
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionRegistry {
    pub households: Vec<Household>,
    pub catalog: ResourceCatalog,
    pub budget: i64,
    pub plan: AllocationPlan,
}

impl DistributionRegistry {
    pub fn new(budget: i64) -> Self {
        DistributionRegistry {
            households: Vec::new(),
            catalog: ResourceCatalog::default(),
            budget,
            plan: AllocationPlan::new(),
        }
    }

    pub fn with_catalog(mut self, catalog: ResourceCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    fn next_id(&self) -> u32 {
        self.households.iter().map(|h| h.id).max().unwrap_or(0) + 1
    }

    /// Register a household. Priority is computed on the way in.
    pub fn add_household(&mut self, input: HouseholdInput) -> Result<&Household, RegistryError> {
        input.validate()?;

        let household = Household::new(self.next_id(), input);
        info!(
            id = household.id,
            name = %household.name,
            priority = household.priority_score,
            "household added"
        );
        self.households.push(household);

        let added = self.households.len() - 1;
        Ok(&self.households[added])
    }

    /// Remove a household. Any units it was granted go back to stock.
    pub fn remove_household(&mut self, id: u32) -> Result<Household, RegistryError> {
        let index = self
            .households
            .iter()
            .position(|h| h.id == id)
            .ok_or(RegistryError::UnknownHousehold(id))?;

        let household = self.households.remove(index);
        if let Some(allocation) = self.plan.remove(&id) {
            self.release(&allocation);
        }

        info!(id, name = %household.name, "household removed");
        Ok(household)
    }

    pub fn household(&self, id: u32) -> Option<&Household> {
        self.households.iter().find(|h| h.id == id)
    }

    pub fn households_by_priority(&self) -> Vec<&Household> {
        AllocationEngine::priority_order(&self.households)
    }

    /// Eldest household first. Households without ages sort last.
    pub fn households_by_max_age(&self) -> Vec<&Household> {
        let mut sorted: Vec<&Household> = self.households.iter().collect();
        sorted.sort_by(|a, b| b.max_age().cmp(&a.max_age()).then(a.id.cmp(&b.id)));
        sorted
    }

    /// Treasurer's role
    pub fn update_budget(&mut self, new_budget: i64) -> Result<(), RegistryError> {
        self.budget = Treasurer::validate_budget(new_budget)?;
        info!(budget = new_budget, "budget updated");
        Ok(())
    }

    /// Run a fresh allocation. Units from the previous plan are returned to
    /// stock first so repeated runs don't double count.
    pub fn allocate(&mut self) -> Result<AllocationOutcome, RegistryError> {
        if self.households.is_empty() {
            return Err(RegistryError::NoHouseholds);
        }

        let previous = std::mem::take(&mut self.plan);
        for allocation in previous.values() {
            self.release(allocation);
        }

        let outcome = AllocationEngine::new().allocate(&self.households, &mut self.catalog, self.budget);
        self.plan = outcome.plan.clone();
        Ok(outcome)
    }

    fn release(&mut self, allocation: &Allocation) {
        for (resource, &qty) in allocation {
            self.catalog.restock(resource, qty);
        }
    }

    pub fn has_plan(&self) -> bool {
        !self.plan.is_empty()
    }

    pub fn allocation_for(&self, id: u32) -> Option<&Allocation> {
        self.plan.get(&id)
    }

    /// Plan cost at current unit costs
    pub fn total_cost(&self) -> i64 {
        Treasurer::calculate_total_cost(&self.plan, &self.catalog)
    }

    pub fn remaining_budget(&self) -> i64 {
        self.budget - self.total_cost()
    }

    /// Barangay-wide age bracket counts
    pub fn demographics(&self) -> AgeProfile {
        let mut total = AgeProfile::default();
        for household in &self.households {
            total.merge(&household.profile());
        }
        total
    }

    pub fn household_details(&self, id: u32) -> Result<HouseholdDetails, RegistryError> {
        let household = self.household(id).ok_or(RegistryError::UnknownHousehold(id))?;

        let mut allocations = Vec::new();
        if let Some(allocation) = self.plan.get(&id) {
            for resource in self.catalog.iter() {
                if let Some(&quantity) = allocation.get(&resource.name) {
                    if quantity > 0 {
                        allocations.push(AllocationLine {
                            resource: resource.name.clone(),
                            quantity,
                            cost: resource.cost_of(quantity),
                        });
                    }
                }
            }
        }
        let total_cost = allocations.iter().map(|line| line.cost).sum();

        Ok(HouseholdDetails {
            household: household.clone(),
            max_age: household.max_age(),
            age_groups: household.ages_by_bracket(),
            allocations,
            total_cost,
        })
    }

    pub fn summary(&self, date: NaiveDate) -> DistributionSummary {
        DistributionSummary::from_registry(self, date)
    }
}

impl Default for DistributionRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_BUDGET)
    }
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

    fn sample_registry() -> DistributionRegistry {
        let mut registry = DistributionRegistry::default();
        registry.add_household(input("Dela Cruz", &[35, 33, 8, 3])).unwrap();
        registry.add_household(input("Santos", &[72, 70])).unwrap();
        registry.add_household(input("Reyes", &[28])).unwrap();
        registry
    }

    #[test]
    fn test_add_assigns_sequential_ids() {
        let registry = sample_registry();
        let ids: Vec<u32> = registry.households.iter().map(|h| h.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_ids_never_collide_after_removal() {
        let mut registry = sample_registry();
        registry.remove_household(1).unwrap();

        let added = registry.add_household(input("Garcia", &[40])).unwrap();
        assert_eq!(added.id, 4);

        let ids: Vec<u32> = registry.households.iter().map(|h| h.id).collect();
        assert_eq!(ids, vec![2, 3, 4]);
    }

    #[test]
    fn test_add_rejects_invalid_input() {
        let mut registry = DistributionRegistry::default();
        let bad = HouseholdInput {
            name: "Bautista".to_string(),
            members: 3,
            ages: vec![30],
        };

        let err = registry.add_household(bad).unwrap_err();
        assert!(matches!(
            err,
            RegistryError::Household(HouseholdError::AgeCountMismatch { ages: 1, members: 3 })
        ));
        assert!(registry.households.is_empty());
    }

    #[test]
    fn test_allocate_without_households() {
        let mut registry = DistributionRegistry::default();
        assert!(matches!(registry.allocate(), Err(RegistryError::NoHouseholds)));
    }

    #[test]
    fn test_repeated_allocation_does_not_double_deduct() {
        let mut registry = sample_registry();

        let first = registry.allocate().unwrap();
        let food_after_first = registry.catalog.get(FOOD_PACK).unwrap().available;

        let second = registry.allocate().unwrap();
        let food_after_second = registry.catalog.get(FOOD_PACK).unwrap().available;

        assert_eq!(first.plan, second.plan);
        assert_eq!(food_after_first, food_after_second);
        assert_eq!(registry.total_cost(), second.total_cost);
    }

    #[test]
    fn test_remove_returns_stock() {
        let mut registry = sample_registry();
        registry.allocate().unwrap();

        let medical_before = registry.catalog.get(MEDICAL_KIT).unwrap().available;
        let santos_medical = registry.allocation_for(2).unwrap()[MEDICAL_KIT];

        registry.remove_household(2).unwrap();

        assert_eq!(
            registry.catalog.get(MEDICAL_KIT).unwrap().available,
            medical_before + santos_medical
        );
        assert!(registry.allocation_for(2).is_none());
    }

    #[test]
    fn test_remove_unknown() {
        let mut registry = sample_registry();
        assert!(matches!(
            registry.remove_household(99),
            Err(RegistryError::UnknownHousehold(99))
        ));
    }

    #[test]
    fn test_budget_update() {
        let mut registry = sample_registry();
        registry.update_budget(200_000).unwrap();
        assert_eq!(registry.budget, 200_000);
        assert!(registry.update_budget(-5).is_err());
        assert_eq!(registry.budget, 200_000);
    }

    #[test]
    fn test_sort_by_max_age() {
        let registry = sample_registry();
        let ids: Vec<u32> = registry.households_by_max_age().iter().map(|h| h.id).collect();
        assert_eq!(ids, vec![2, 1, 3]);
    }

    #[test]
    fn test_household_details() {
        let mut registry = sample_registry();
        registry.allocate().unwrap();

        let details = registry.household_details(1).unwrap();
        assert_eq!(details.max_age, Some(35));
        assert_eq!(details.age_groups.len(), 3);
        // 2 food, 1 hygiene, 1 medical, 1 school supplies
        assert_eq!(details.allocations.len(), 4);
        assert_eq!(details.total_cost, 1000 + 300 + 400 + 250);
    }

    #[test]
    fn test_demographics() {
        let registry = sample_registry();
        let profile = registry.demographics();
        assert_eq!(profile.under_five, 1);
        assert_eq!(profile.school_age, 1);
        assert_eq!(profile.elderly, 2);
        assert_eq!(profile.adults, 3);
    }
}
