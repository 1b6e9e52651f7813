// 🧑‍⚖️ Expert Team - The three officials behind every distribution plan
//
// Blackboard architecture: the registry holds the shared state, each expert
// reads it and contributes one kind of judgement:
// - Barangay Captain: who is most vulnerable
// - Distribution Councilor: what each household needs
// - Treasurer: whether the plan fits the budget

use crate::allocation::{Allocation, AllocationPlan};
use crate::household::Household;
use crate::resources::{ResourceCatalog, FOOD_PACK, HYGIENE_KIT, MEDICAL_KIT, SCHOOL_SUPPLIES};
use thiserror::Error;
use tracing::warn;

/// A named official, as credited in report notes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpertRole {
    pub title: &'static str,
    pub name: &'static str,
}

impl ExpertRole {
    /// "Barangay Captain (Kap. Rosalie Mauricio)"
    pub fn label(&self) -> String {
        format!("{} ({})", self.title, self.name)
    }
}

// ============================================================================
// BARANGAY CAPTAIN
// ============================================================================

/// Sets priorities based on vulnerable groups and community needs
pub struct BarangayCaptain;

impl BarangayCaptain {
    pub const ROLE: ExpertRole = ExpertRole {
        title: "Barangay Captain",
        name: "Kap. Rosalie Mauricio",
    };

    /// Vulnerability points from young children and elderly alone
    pub fn assess_vulnerability(household: &Household) -> u32 {
        let profile = household.profile();
        profile.under_five * 30 + profile.elderly * 25
    }

    pub fn note() -> &'static str {
        "Resources were allocated prioritizing households with the highest \
         vulnerability scores first. Young children and elderly members within \
         those households were then considered for specific kit types."
    }
}

// ============================================================================
// DISTRIBUTION COUNCILOR
// ============================================================================

/// Suggests how many resources each household needs based on size and ages
pub struct DistributionCouncilor;

impl DistributionCouncilor {
    pub const ROLE: ExpertRole = ExpertRole {
        title: "Councilor for Distribution",
        name: "Kgd. Romy Colubong",
    };

    /// Needs per resource. Resources with zero need are omitted.
    pub fn recommend_resources(household: &Household) -> Allocation {
        let members = household.members;
        let profile = household.profile();

        let mut needs = Allocation::new();

        // One food pack per 3 people, rounded up
        needs.insert(FOOD_PACK.to_string(), (members + 2) / 3);

        // One hygiene kit per 4 people, rounded up
        needs.insert(HYGIENE_KIT.to_string(), (members + 3) / 4);

        let medical_kits = match profile.vulnerable() {
            0 => 0,
            1 | 2 => 1,
            _ => 2,
        };
        needs.insert(MEDICAL_KIT.to_string(), medical_kits);

        needs.insert(SCHOOL_SUPPLIES.to_string(), profile.school_age);

        needs.retain(|_, qty| *qty > 0);
        needs
    }

    pub fn note() -> &'static str {
        "Distribution plan accounts for household size for food packs and \
         hygiene kits, and specific needs (school supplies, medical kits) \
         for each household in priority order."
    }
}

// ============================================================================
// TREASURER
// ============================================================================

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BudgetError {
    #[error("total cost ₱{total_cost} exceeds available budget ₱{budget}")]
    OverBudget { total_cost: i64, budget: i64 },

    #[error("budget cannot be negative (got {0})")]
    Negative(i64),
}

/// Manages budget and approves spending
pub struct Treasurer;

impl Treasurer {
    pub const ROLE: ExpertRole = ExpertRole {
        title: "Treas.",
        name: "Weng Panganiban",
    };

    /// Approve a plan cost. Returns the budget left over.
    pub fn approve_budget(total_cost: i64, budget: i64) -> Result<i64, BudgetError> {
        if total_cost <= budget {
            Ok(budget - total_cost)
        } else {
            Err(BudgetError::OverBudget { total_cost, budget })
        }
    }

    pub fn validate_budget(budget: i64) -> Result<i64, BudgetError> {
        if budget < 0 {
            Err(BudgetError::Negative(budget))
        } else {
            Ok(budget)
        }
    }

    /// Price a whole plan at current unit costs
    pub fn calculate_total_cost(plan: &AllocationPlan, catalog: &ResourceCatalog) -> i64 {
        plan.values()
            .map(|allocation| Self::allocation_cost(allocation, catalog))
            .sum()
    }

    /// Price one household's allocation. Unknown resources are skipped.
    pub fn allocation_cost(allocation: &Allocation, catalog: &ResourceCatalog) -> i64 {
        let mut total = 0;
        for (resource, &quantity) in allocation {
            match catalog.get(resource) {
                Some(r) => total += r.cost_of(quantity),
                None => warn!(resource = %resource, "resource not in catalog, skipped in cost"),
            }
        }
        total
    }

    pub fn note(total_cost: i64, budget: i64) -> String {
        if budget <= 0 {
            return "No budget is currently available for resource distribution.".to_string();
        }
        let used = total_cost as f64 / budget as f64 * 100.0;
        format!(
            "The current allocation utilized {:.1}% of the available budget for resource distribution.",
            used
        )
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::household::HouseholdInput;

    fn household(ages: &[u32]) -> Household {
        Household::new(
            1,
            HouseholdInput {
                name: "Test".to_string(),
                members: ages.len() as u32,
                ages: ages.to_vec(),
            },
        )
    }

    #[test]
    fn test_captain_vulnerability() {
        assert_eq!(BarangayCaptain::assess_vulnerability(&household(&[2, 70, 30])), 55);
        assert_eq!(BarangayCaptain::assess_vulnerability(&household(&[10, 30])), 0);
    }

    #[test]
    fn test_councilor_scales_with_size() {
        let needs = DistributionCouncilor::recommend_resources(&household(&[40, 38, 12, 9, 6]));

        assert_eq!(needs.get(FOOD_PACK), Some(&2));
        assert_eq!(needs.get(HYGIENE_KIT), Some(&2));
        assert_eq!(needs.get(SCHOOL_SUPPLIES), Some(&3));
        assert_eq!(needs.get(MEDICAL_KIT), None);
    }

    #[test]
    fn test_councilor_medical_kits() {
        let one = DistributionCouncilor::recommend_resources(&household(&[1, 30]));
        assert_eq!(one.get(MEDICAL_KIT), Some(&1));

        let two = DistributionCouncilor::recommend_resources(&household(&[1, 30, 2]));
        assert_eq!(two.get(MEDICAL_KIT), Some(&1));

        let three = DistributionCouncilor::recommend_resources(&household(&[1, 3, 75, 30]));
        assert_eq!(three.get(MEDICAL_KIT), Some(&2));
    }

    #[test]
    fn test_single_member_household() {
        let needs = DistributionCouncilor::recommend_resources(&household(&[80]));
        assert_eq!(needs.get(FOOD_PACK), Some(&1));
        assert_eq!(needs.get(HYGIENE_KIT), Some(&1));
        assert_eq!(needs.get(MEDICAL_KIT), Some(&1));
        assert_eq!(needs.len(), 3);
    }

    #[test]
    fn test_treasurer_approval() {
        assert_eq!(Treasurer::approve_budget(1000, 1500), Ok(500));
        assert_eq!(
            Treasurer::approve_budget(2000, 1500),
            Err(BudgetError::OverBudget { total_cost: 2000, budget: 1500 })
        );
        assert!(Treasurer::validate_budget(-1).is_err());
    }

    #[test]
    fn test_treasurer_total_cost_skips_unknown() {
        let catalog = ResourceCatalog::default();
        let mut plan = AllocationPlan::new();

        let mut first = Allocation::new();
        first.insert(FOOD_PACK.to_string(), 2);
        first.insert("Generator".to_string(), 1);
        plan.insert(1, first);

        let mut second = Allocation::new();
        second.insert(MEDICAL_KIT.to_string(), 1);
        plan.insert(2, second);

        assert_eq!(Treasurer::calculate_total_cost(&plan, &catalog), 1400);
    }

    #[test]
    fn test_role_labels() {
        assert_eq!(
            BarangayCaptain::ROLE.label(),
            "Barangay Captain (Kap. Rosalie Mauricio)"
        );
        assert_eq!(Treasurer::ROLE.label(), "Treas. (Weng Panganiban)");
    }

    #[test]
    fn test_treasurer_note_percentage() {
        assert!(Treasurer::note(75_000, 150_000).contains("50.0%"));
        assert!(Treasurer::note(0, 0).contains("No budget"));
    }
}
