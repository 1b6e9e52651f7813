// 🏠 Household - The unit that gets counted and prioritized
//
// Priority is a vulnerability score:
//   members * 10
//   + 30 per child under 5
//   + 20 per school-age child (5-17)
//   + 25 per elderly member (over 60)

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HouseholdError {
    #[error("please enter the name of the household head")]
    EmptyName,

    #[error("a household needs at least one member")]
    NoMembers,

    #[error("ages cannot be empty")]
    EmptyAges,

    #[error("invalid age '{0}': use comma-separated numbers (e.g. 30,25,5)")]
    InvalidAge(String),

    #[error("the number of ages ({ages}) doesn't match the number of members ({members})")]
    AgeCountMismatch { ages: usize, members: u32 },
}

// ============================================================================
// AGE BRACKETS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgeBracket {
    UnderFive,
    SchoolAge,
    Adult,
    Elderly,
}

impl AgeBracket {
    pub fn of(age: u32) -> Self {
        match age {
            0..=4 => AgeBracket::UnderFive,
            5..=17 => AgeBracket::SchoolAge,
            18..=60 => AgeBracket::Adult,
            _ => AgeBracket::Elderly,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AgeBracket::UnderFive => "Children under 5",
            AgeBracket::SchoolAge => "School-age children",
            AgeBracket::Adult => "Adults",
            AgeBracket::Elderly => "Elderly",
        }
    }

    /// Points each member in this bracket adds to the priority score
    pub fn priority_weight(&self) -> u32 {
        match self {
            AgeBracket::UnderFive => 30,
            AgeBracket::SchoolAge => 20,
            AgeBracket::Adult => 0,
            AgeBracket::Elderly => 25,
        }
    }

    pub fn all() -> [AgeBracket; 4] {
        [
            AgeBracket::UnderFive,
            AgeBracket::SchoolAge,
            AgeBracket::Adult,
            AgeBracket::Elderly,
        ]
    }
}

/// Bracket counts for one household (or a whole barangay)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeProfile {
    pub under_five: u32,
    pub school_age: u32,
    pub adults: u32,
    pub elderly: u32,
}

impl AgeProfile {
    pub fn from_ages(ages: &[u32]) -> Self {
        let mut profile = AgeProfile::default();
        for &age in ages {
            profile.add(AgeBracket::of(age));
        }
        profile
    }

    pub fn add(&mut self, bracket: AgeBracket) {
        match bracket {
            AgeBracket::UnderFive => self.under_five += 1,
            AgeBracket::SchoolAge => self.school_age += 1,
            AgeBracket::Adult => self.adults += 1,
            AgeBracket::Elderly => self.elderly += 1,
        }
    }

    pub fn merge(&mut self, other: &AgeProfile) {
        self.under_five += other.under_five;
        self.school_age += other.school_age;
        self.adults += other.adults;
        self.elderly += other.elderly;
    }

    /// Members needing medical attention first
    pub fn vulnerable(&self) -> u32 {
        self.under_five + self.elderly
    }
}

// ============================================================================
// HOUSEHOLD
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Household {
    pub id: u32,

    /// Name of the household head
    pub name: String,

    pub members: u32,
    pub ages: Vec<u32>,
    pub priority_score: u32,
}

impl Household {
    pub fn new(id: u32, input: HouseholdInput) -> Self {
        let priority_score = calculate_priority(input.members, &input.ages);
        Household {
            id,
            name: input.name,
            members: input.members,
            ages: input.ages,
            priority_score,
        }
    }

    pub fn profile(&self) -> AgeProfile {
        AgeProfile::from_ages(&self.ages)
    }

    pub fn max_age(&self) -> Option<u32> {
        self.ages.iter().copied().max()
    }

    /// Ages grouped by bracket, in bracket order, skipping empty groups
    pub fn ages_by_bracket(&self) -> Vec<(AgeBracket, Vec<u32>)> {
        AgeBracket::all()
            .into_iter()
            .map(|bracket| {
                let ages: Vec<u32> = self
                    .ages
                    .iter()
                    .copied()
                    .filter(|&age| AgeBracket::of(age) == bracket)
                    .collect();
                (bracket, ages)
            })
            .filter(|(_, ages)| !ages.is_empty())
            .collect()
    }

    pub fn ages_display(&self) -> String {
        join_ages(&self.ages)
    }
}

pub fn calculate_priority(members: u32, ages: &[u32]) -> u32 {
    let age_points = ages
        .iter()
        .map(|&age| AgeBracket::of(age).priority_weight())
        .fold(0u32, u32::saturating_add);
    members.saturating_mul(10).saturating_add(age_points)
}

// ============================================================================
// INPUT
// ============================================================================

/// Unvalidated household registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HouseholdInput {
    pub name: String,
    pub members: u32,
    pub ages: Vec<u32>,
}

impl HouseholdInput {
    /// Build from raw form fields. `members` defaults to the number of ages.
    pub fn from_form(name: &str, ages_text: &str, members: Option<u32>) -> Result<Self, HouseholdError> {
        let ages = parse_ages(ages_text)?;
        let input = HouseholdInput {
            name: name.trim().to_string(),
            members: members.unwrap_or(ages.len() as u32),
            ages,
        };
        input.validate()?;
        Ok(input)
    }

    pub fn validate(&self) -> Result<(), HouseholdError> {
        if self.name.trim().is_empty() {
            return Err(HouseholdError::EmptyName);
        }
        if self.members == 0 {
            return Err(HouseholdError::NoMembers);
        }
        if self.ages.is_empty() {
            return Err(HouseholdError::EmptyAges);
        }
        if self.ages.len() != self.members as usize {
            return Err(HouseholdError::AgeCountMismatch {
                ages: self.ages.len(),
                members: self.members,
            });
        }
        Ok(())
    }
}

/// Parse "30, 25,5" into ages. Empty tokens between commas are skipped.
pub fn parse_ages(text: &str) -> Result<Vec<u32>, HouseholdError> {
    let ages = text
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| {
            token
                .parse::<u32>()
                .map_err(|_| HouseholdError::InvalidAge(token.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if ages.is_empty() {
        return Err(HouseholdError::EmptyAges);
    }
    Ok(ages)
}

pub fn join_ages(ages: &[u32]) -> String {
    ages.iter()
        .map(|a| a.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn input(name: &str, ages: &[u32]) -> HouseholdInput {
        HouseholdInput {
            name: name.to_string(),
            members: ages.len() as u32,
            ages: ages.to_vec(),
        }
    }

    #[test]
    fn test_bracket_boundaries() {
        assert_eq!(AgeBracket::of(0), AgeBracket::UnderFive);
        assert_eq!(AgeBracket::of(4), AgeBracket::UnderFive);
        assert_eq!(AgeBracket::of(5), AgeBracket::SchoolAge);
        assert_eq!(AgeBracket::of(17), AgeBracket::SchoolAge);
        assert_eq!(AgeBracket::of(18), AgeBracket::Adult);
        assert_eq!(AgeBracket::of(60), AgeBracket::Adult);
        assert_eq!(AgeBracket::of(61), AgeBracket::Elderly);
    }

    #[test]
    fn test_priority_score() {
        // 4 members: 40, + child 3 (30) + child 10 (20) + adult 35 (0) + elder 70 (25)
        assert_eq!(calculate_priority(4, &[3, 10, 35, 70]), 115);
        // Age 60 is not elderly
        assert_eq!(calculate_priority(1, &[60]), 10);
    }

    #[test]
    fn test_priority_saturates_on_huge_member_count() {
        assert_eq!(calculate_priority(500_000_000, &[70, 3]), u32::MAX);
    }

    #[test]
    fn test_household_new_sets_priority() {
        let household = Household::new(7, input("Dela Cruz", &[30, 25, 5]));
        assert_eq!(household.id, 7);
        assert_eq!(household.priority_score, 30 + 20);
        assert_eq!(household.max_age(), Some(30));
    }

    #[test]
    fn test_ages_by_bracket_skips_empty() {
        let household = Household::new(1, input("Santos", &[2, 40, 65, 1]));
        let groups = household.ages_by_bracket();

        assert_eq!(
            groups,
            vec![
                (AgeBracket::UnderFive, vec![2, 1]),
                (AgeBracket::Adult, vec![40]),
                (AgeBracket::Elderly, vec![65]),
            ]
        );
    }

    #[test]
    fn test_parse_ages() {
        assert_eq!(parse_ages("30, 25,5").unwrap(), vec![30, 25, 5]);
        assert_eq!(parse_ages("  ").unwrap_err(), HouseholdError::EmptyAges);
        assert_eq!(
            parse_ages("30,abc").unwrap_err(),
            HouseholdError::InvalidAge("abc".to_string())
        );
        assert!(matches!(parse_ages("-3"), Err(HouseholdError::InvalidAge(_))));
    }

    #[test]
    fn test_validation_errors() {
        assert_eq!(
            HouseholdInput::from_form("  ", "30", None).unwrap_err(),
            HouseholdError::EmptyName
        );
        assert_eq!(
            HouseholdInput::from_form("Reyes", "30,2", Some(3)).unwrap_err(),
            HouseholdError::AgeCountMismatch { ages: 2, members: 3 }
        );

        let ok = HouseholdInput::from_form(" Reyes ", "30,2", None).unwrap();
        assert_eq!(ok.name, "Reyes");
        assert_eq!(ok.members, 2);
    }

    #[test]
    fn test_profile_vulnerable() {
        let profile = AgeProfile::from_ages(&[1, 3, 8, 45, 72]);
        assert_eq!(profile.under_five, 2);
        assert_eq!(profile.school_age, 1);
        assert_eq!(profile.adults, 1);
        assert_eq!(profile.elderly, 1);
        assert_eq!(profile.vulnerable(), 3);
    }
}
