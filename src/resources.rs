// 📦 Resource Catalog - What the barangay can hand out
// Each resource has a unit cost (pesos) and a stock count

use serde::{Deserialize, Serialize};

pub const FOOD_PACK: &str = "Food Pack";
pub const HYGIENE_KIT: &str = "Hygiene Kit";
pub const MEDICAL_KIT: &str = "Medical Kit";
pub const SCHOOL_SUPPLIES: &str = "School Supplies";

// ============================================================================
// RESOURCE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(rename = "resource")]
    pub name: String,

    /// Unit cost in pesos
    pub cost: i64,

    /// Units still in stock
    pub available: u32,
}

impl Resource {
    pub fn new(name: &str, cost: i64, available: u32) -> Self {
        Resource {
            name: name.to_string(),
            cost,
            available,
        }
    }

    /// Cost of `quantity` units
    pub fn cost_of(&self, quantity: u32) -> i64 {
        self.cost * i64::from(quantity)
    }
}

// ============================================================================
// RESOURCE CATALOG
// ============================================================================

/// Ordered catalog. Order matters: the allocation engine walks resources
/// in catalog order for every household.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceCatalog {
    resources: Vec<Resource>,
}

impl ResourceCatalog {
    pub fn new(resources: Vec<Resource>) -> Self {
        ResourceCatalog { resources }
    }

    pub fn get(&self, name: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Resource> {
        self.resources.iter_mut().find(|r| r.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.resources.iter()
    }

    pub fn names(&self) -> Vec<String> {
        self.resources.iter().map(|r| r.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn unit_cost(&self, name: &str) -> Option<i64> {
        self.get(name).map(|r| r.cost)
    }

    /// True if `quantity` units are in stock and affordable within `budget`.
    /// A zero quantity is never "available".
    pub fn check_availability(&self, name: &str, quantity: u32, budget: i64) -> bool {
        if quantity == 0 {
            return false;
        }

        match self.get(name) {
            Some(resource) => quantity <= resource.available && resource.cost_of(quantity) <= budget,
            None => false,
        }
    }

    /// Remove units from stock. Returns false (and leaves stock alone) when
    /// there are not enough units.
    pub fn take(&mut self, name: &str, quantity: u32) -> bool {
        match self.get_mut(name) {
            Some(resource) if resource.available >= quantity => {
                resource.available -= quantity;
                true
            }
            _ => false,
        }
    }

    /// Return units to stock
    pub fn restock(&mut self, name: &str, quantity: u32) {
        if let Some(resource) = self.get_mut(name) {
            resource.available = resource.available.saturating_add(quantity);
        }
    }

    /// Override cost/stock of a known resource. Unknown names are rejected
    /// so stored files cannot grow the catalog.
    pub fn apply_stored(&mut self, stored: &Resource) -> bool {
        match self.get_mut(&stored.name) {
            Some(resource) => {
                resource.cost = stored.cost;
                resource.available = stored.available;
                true
            }
            None => false,
        }
    }
}

impl Default for ResourceCatalog {
    /// Barangay relief stock at the start of a distribution cycle
    fn default() -> Self {
        ResourceCatalog::new(vec![
            Resource::new(FOOD_PACK, 500, 100),
            Resource::new(HYGIENE_KIT, 300, 80),
            Resource::new(MEDICAL_KIT, 400, 50),
            Resource::new(SCHOOL_SUPPLIES, 250, 70),
        ])
    }
}

impl<'a> IntoIterator for &'a ResourceCatalog {
    type Item = &'a Resource;
    type IntoIter = std::slice::Iter<'a, Resource>;

    fn into_iter(self) -> Self::IntoIter {
        self.resources.iter()
    }
}

// ============================================================================
// TESTS
// ============================================================================
