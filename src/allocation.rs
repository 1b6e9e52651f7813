// ⚖️ Allocation Engine - Budget and stock constrained distribution
//
// Households are served in priority order (highest score first).
// For each household, every recommended resource is granted in full
// or not at all:
//   granted iff quantity <= stock AND quantity * cost <= remaining budget
//
// Invariant: total_cost + remaining_budget == budget

use crate::experts::DistributionCouncilor;
use crate::household::Household;
use crate::resources::ResourceCatalog;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Resource name -> units granted to one household
pub type Allocation = BTreeMap<String, u32>;

/// Household id -> that household's allocation
pub type AllocationPlan = BTreeMap<u32, Allocation>;

// ============================================================================
// OUTCOME
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationOutcome {
    /// Every household processed, including those that received nothing
    pub plan: AllocationPlan,

    /// Household ids in the order they were served
    pub order: Vec<u32>,

    pub total_cost: i64,
    pub remaining_budget: i64,
}

impl AllocationOutcome {
    /// Households that received at least one unit
    pub fn served_count(&self) -> usize {
        self.plan
            .values()
            .filter(|a| a.values().any(|&qty| qty > 0))
            .count()
    }

    /// Units handed out per resource
    pub fn units_by_resource(&self) -> BTreeMap<String, u32> {
        let mut totals = BTreeMap::new();
        for allocation in self.plan.values() {
            for (resource, &qty) in allocation {
                *totals.entry(resource.clone()).or_insert(0) += qty;
            }
        }
        totals
    }
}

// ============================================================================
// ENGINE
// ============================================================================

pub struct AllocationEngine;

impl AllocationEngine {
    pub fn new() -> Self {
        AllocationEngine
    }

    /// Serve households in priority order. Stock is deducted from `catalog`.
    pub fn allocate(
        &self,
        households: &[Household],
        catalog: &mut ResourceCatalog,
        budget: i64,
    ) -> AllocationOutcome {
        let order = Self::priority_order(households);

        let mut plan = AllocationPlan::new();
        let mut remaining_budget = budget;
        let mut total_cost = 0;

        for household in &order {
            let needs = DistributionCouncilor::recommend_resources(household);
            let mut allocation = Allocation::new();

            // Walk in catalog order so earlier resources get first claim on the budget
            for name in catalog.names() {
                let Some(&quantity) = needs.get(&name) else {
                    continue;
                };

                if !catalog.check_availability(&name, quantity, remaining_budget) {
                    debug!(
                        household = household.id,
                        resource = %name,
                        quantity,
                        remaining_budget,
                        "need not met"
                    );
                    continue;
                }

                let cost = catalog.get(&name).map(|r| r.cost_of(quantity)).unwrap_or(0);
                if catalog.take(&name, quantity) {
                    allocation.insert(name, quantity);
                    remaining_budget -= cost;
                    total_cost += cost;
                }
            }

            plan.insert(household.id, allocation);
        }

        info!(
            households = households.len(),
            total_cost,
            remaining_budget,
            "allocation complete"
        );

        AllocationOutcome {
            plan,
            order: order.iter().map(|h| h.id).collect(),
            total_cost,
            remaining_budget,
        }
    }

    /// Highest priority first. Stable, so ties keep registration order.
    pub fn priority_order(households: &[Household]) -> Vec<&Household> {
        let mut sorted: Vec<&Household> = households.iter().collect();
        sorted.sort_by(|a, b| b.priority_score.cmp(&a.priority_score));
        sorted
    }
}

impl Default for AllocationEngine {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================
