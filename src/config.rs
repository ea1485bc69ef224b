//! Configuration loading from TOML.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs. The
//! `[engine]` and `[advisor]` sections map onto the engine's own config
//! types via [`AppConfig::engine_config`].

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;

use crate::engine::advisor::AdvisorConfig;
use crate::engine::EngineConfig;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub service: ServiceConfig,
    pub engine: EngineSection,
    pub advisor: AdvisorSection,
    pub simulation: SimulationConfig,
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    pub name: String,
    /// Where belief snapshots are persisted.
    pub state_file: String,
    pub autosave_interval_secs: u64,
}

/// Bandit and profit-model knobs.
#[derive(Debug, Deserialize, Clone)]
pub struct EngineSection {
    pub alpha_init: f64,
    pub beta_init: f64,
    pub base_spoilage_rate: f64,
    pub decay_factor: f64,
}

/// Price-trend override thresholds. The fallback-rule knobs keep their
/// built-in defaults.
#[derive(Debug, Deserialize, Clone)]
pub struct AdvisorSection {
    pub strong_rise: f64,
    pub moderate_rise: f64,
    pub drop: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SimulationConfig {
    pub n_scenarios: usize,
    pub seed: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardConfig {
    pub enabled: bool,
    pub port: u16,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        Ok(config)
    }

    /// Assemble the engine's config from the `[engine]` and `[advisor]`
    /// sections.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            alpha_init: self.engine.alpha_init,
            beta_init: self.engine.beta_init,
            base_spoilage_rate: self.engine.base_spoilage_rate,
            decay_factor: self.engine.decay_factor,
            advisor: AdvisorConfig {
                strong_rise: self.advisor.strong_rise,
                moderate_rise: self.advisor.moderate_rise,
                drop: self.advisor.drop,
                ..AdvisorConfig::default()
            },
        }
    }
}
