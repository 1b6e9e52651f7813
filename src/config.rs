// ⚙️ Configuration - defaults, then barangay.toml, then environment
//
// Resolution order (highest priority first):
// 1. CLI flags (applied by the binary)
// 2. Environment variables (BARANGAY_*)
// 3. Config file (barangay.toml, or an explicit path)
// 4. Compiled defaults

use crate::registry::DEFAULT_BUDGET;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "barangay.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where households.csv, resources.csv, allocations.csv, budget.txt
    /// and audit.db live
    pub data_dir: PathBuf,

    /// Budget used when no budget.txt exists yet
    pub default_budget: i64,

    /// Actor name recorded in the audit trail
    pub actor: String,

    pub simulation: SimulationSettings,
    pub server: ServerSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    pub households: usize,
    pub budget: i64,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: PathBuf::from("data"),
            default_budget: DEFAULT_BUDGET,
            actor: "cli".to_string(),
            simulation: SimulationSettings::default(),
            server: ServerSettings::default(),
        }
    }
}

impl Default for SimulationSettings {
    fn default() -> Self {
        SimulationSettings {
            households: 100,
            budget: DEFAULT_BUDGET,
            seed: None,
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            bind: "127.0.0.1:3000".to_string(),
        }
    }
}

impl Config {
    /// Load with layered resolution. An explicit `path` (or
    /// BARANGAY_CONFIG) must exist; the implicit barangay.toml is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// `load` with an injectable environment lookup
    pub fn load_with<F>(path: Option<&Path>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let from_env = lookup("BARANGAY_CONFIG")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);
        let mut config = match path.or(from_env.as_deref()) {
            Some(p) => Self::from_file(p)?,
            None if Path::new(CONFIG_FILE).exists() => Self::from_file(Path::new(CONFIG_FILE))?,
            None => Self::default(),
        };

        config.apply_env(lookup)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml(&content).with_context(|| format!("Invalid config file: {:?}", path))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config TOML")
    }

    /// Apply BARANGAY_* overrides. `lookup` is injectable for tests.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("BARANGAY_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(budget) = lookup("BARANGAY_BUDGET") {
            self.default_budget = budget
                .trim()
                .parse()
                .with_context(|| format!("BARANGAY_BUDGET is not a number: {}", budget))?;
        }
        if let Some(actor) = lookup("BARANGAY_ACTOR") {
            self.actor = actor;
        }
        if let Some(bind) = lookup("BARANGAY_BIND") {
            self.server.bind = bind;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_budget < 0 {
            bail!("default_budget must not be negative");
        }
        if self.simulation.budget < 0 {
            bail!("simulation.budget must not be negative");
        }
        if !(10..=1000).contains(&self.simulation.households) {
            bail!("simulation.households must be between 10 and 1000");
        }
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
