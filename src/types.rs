//! Shared types for the GRANARY engine.
//!
//! These types form the data model used across all modules.
//! They are designed to be stable so that the profit, bandit,
//! and engine modules can depend on them without circular references.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// A harvest timing action. The action set is fixed and ordered;
/// arm indices in the bandit correspond to this ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    HarvestNow,
    Wait3Days,
    Wait7Days,
}

impl Action {
    /// All actions in arm order (useful for iteration).
    pub const ALL: &'static [Action] = &[Action::HarvestNow, Action::Wait3Days, Action::Wait7Days];

    /// Number of days this action defers the harvest.
    pub fn wait_days(&self) -> u32 {
        match self {
            Action::HarvestNow => 0,
            Action::Wait3Days => 3,
            Action::Wait7Days => 7,
        }
    }

    /// Bandit arm index for this action.
    pub fn index(&self) -> usize {
        match self {
            Action::HarvestNow => 0,
            Action::Wait3Days => 1,
            Action::Wait7Days => 2,
        }
    }

    /// Map an arm index back to its action.
    pub fn from_index(idx: usize) -> Result<Action, EngineError> {
        match idx {
            0 => Ok(Action::HarvestNow),
            1 => Ok(Action::Wait3Days),
            2 => Ok(Action::Wait7Days),
            _ => Err(EngineError::InvalidInput(format!(
                "Unknown action index: {idx}"
            ))),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::HarvestNow => write!(f, "Harvest Now"),
            Action::Wait3Days => write!(f, "Wait 3 Days"),
            Action::Wait7Days => write!(f, "Wait 7 Days"),
        }
    }
}

/// Attempt to parse a string into an Action (case-insensitive).
impl std::str::FromStr for Action {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace([' ', '_', '-'], "").as_str() {
            "harvestnow" | "now" => Ok(Action::HarvestNow),
            "wait3days" | "wait3" => Ok(Action::Wait3Days),
            "wait7days" | "wait7" => Ok(Action::Wait7Days),
            _ => Err(anyhow::anyhow!("Unknown action: {s}")),
        }
    }
}

/// How the winning action was selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionMode {
    /// One Beta posterior draw per arm, argmax wins.
    Thompson,
    /// Argmax of expected profit, deterministic.
    Greedy,
}

impl fmt::Display for SelectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionMode::Thompson => write!(f, "thompson"),
            SelectionMode::Greedy => write!(f, "greedy"),
        }
    }
}

// ---------------------------------------------------------------------------
// Decision request
// ---------------------------------------------------------------------------

fn default_plant_health() -> f64 {
    0.9
}

fn default_storage_cost() -> f64 {
    10.0
}

fn default_use_thompson() -> bool {
    true
}

/// Inputs for one harvest timing decision. Price forecasts come from an
/// external forecaster; this engine treats them as opaque inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRequest {
    /// Current market price per kg.
    pub current_price: f64,
    /// Forecast price median per kg (horizon covering the wait window).
    pub forecast_price_median: f64,
    /// Forecast price standard deviation.
    pub forecast_price_std: f64,
    /// Expected harvest yield in kg.
    pub yield_kg: f64,
    /// Plant health score in [0, 1]; healthier crops spoil slower.
    #[serde(default = "default_plant_health")]
    pub plant_health_score: f64,
    /// Storage/holding cost per day of waiting.
    #[serde(default = "default_storage_cost")]
    pub storage_cost_per_day: f64,
    /// Thompson sampling (true) or greedy expected-profit selection (false).
    #[serde(default = "default_use_thompson")]
    pub use_thompson: bool,
}

impl DecisionRequest {
    /// Validate all preconditions. Out-of-domain inputs are rejected,
    /// never clamped.
    pub fn validate(&self) -> Result<(), EngineError> {
        if !(self.current_price > 0.0) {
            return Err(EngineError::InvalidInput(format!(
                "current_price must be > 0, got {}",
                self.current_price
            )));
        }
        if !(self.forecast_price_median > 0.0) {
            return Err(EngineError::InvalidInput(format!(
                "forecast_price_median must be > 0, got {}",
                self.forecast_price_median
            )));
        }
        if !(self.forecast_price_std >= 0.0) {
            return Err(EngineError::InvalidInput(format!(
                "forecast_price_std must be >= 0, got {}",
                self.forecast_price_std
            )));
        }
        if !(self.yield_kg > 0.0) {
            return Err(EngineError::InvalidInput(format!(
                "yield_kg must be > 0, got {}",
                self.yield_kg
            )));
        }
        if !(0.0..=1.0).contains(&self.plant_health_score) {
            return Err(EngineError::InvalidInput(format!(
                "plant_health_score must be in [0, 1], got {}",
                self.plant_health_score
            )));
        }
        if !(self.storage_cost_per_day >= 0.0) {
            return Err(EngineError::InvalidInput(format!(
                "storage_cost_per_day must be >= 0, got {}",
                self.storage_cost_per_day
            )));
        }
        Ok(())
    }

    /// Relative price change implied by the forecast:
    /// (forecast - current) / current.
    pub fn price_change(&self) -> f64 {
        (self.forecast_price_median - self.current_price) / self.current_price
    }

    /// Helper to build a test/sample request with sensible defaults.
    #[cfg(test)]
    pub fn sample() -> Self {
        DecisionRequest {
            current_price: 20.0,
            forecast_price_median: 25.0,
            forecast_price_std: 2.0,
            yield_kg: 1000.0,
            plant_health_score: 0.9,
            storage_cost_per_day: 10.0,
            use_thompson: true,
        }
    }
}

impl fmt::Display for DecisionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "price={:.2} forecast={:.2}±{:.2} yield={:.0}kg health={:.2} storage={:.2}/day ({})",
            self.current_price,
            self.forecast_price_median,
            self.forecast_price_std,
            self.yield_kg,
            self.plant_health_score,
            self.storage_cost_per_day,
            if self.use_thompson { "thompson" } else { "greedy" },
        )
    }
}

// ---------------------------------------------------------------------------
// Profit estimates
// ---------------------------------------------------------------------------

/// Per-action profit projection. Ephemeral: recomputed for every decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfitEstimate {
    pub action: Action,
    /// Expected net profit (revenue minus storage cost).
    pub expected_profit: f64,
    /// Standard deviation of profit (driven by price uncertainty).
    pub profit_std: f64,
    /// Yield remaining after spoilage, in kg.
    pub remaining_yield: f64,
    /// Price per kg used for this action's revenue.
    pub expected_price: f64,
    /// Total storage cost over the wait window.
    pub storage_cost: f64,
    /// Gross revenue (remaining_yield × expected_price).
    pub revenue: f64,
}

impl fmt::Display for ProfitEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: profit={:.2}±{:.2} (yield={:.1}kg @ {:.2}, storage={:.2})",
            self.action,
            self.expected_profit,
            self.profit_std,
            self.remaining_yield,
            self.expected_price,
            self.storage_cost,
        )
    }
}

// ---------------------------------------------------------------------------
// Posteriors
// ---------------------------------------------------------------------------

/// Snapshot of one arm's Beta posterior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArmPosterior {
    pub arm: usize,
    pub alpha: f64,
    pub beta: f64,
    /// Posterior mean: alpha / (alpha + beta).
    pub mean: f64,
    /// Posterior variance: alpha*beta / ((alpha+beta)^2 * (alpha+beta+1)).
    pub variance: f64,
}

impl fmt::Display for ArmPosterior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "arm {}: Beta({:.1}, {:.1}) mean={:.3} var={:.5}",
            self.arm, self.alpha, self.beta, self.mean, self.variance,
        )
    }
}

// ---------------------------------------------------------------------------
// Decisions & outcomes
// ---------------------------------------------------------------------------

/// A fully computed harvest decision. Appended to history, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub id: Uuid,
    pub chosen_action: Action,
    /// One estimate per action, in arm order.
    pub estimates: Vec<ProfitEstimate>,
    /// Posterior snapshot at decision time, in arm order.
    pub posteriors: Vec<ArmPosterior>,
    pub mode: SelectionMode,
    /// True if the advisor overlay replaced the core selection.
    pub overridden: bool,
    pub issued_at: DateTime<Utc>,
    /// When the chosen wait window elapses and the outcome can be observed.
    pub matures_at: DateTime<Utc>,
}

impl Decision {
    /// The estimate for the chosen action.
    pub fn chosen_estimate(&self) -> Option<&ProfitEstimate> {
        self.estimates
            .iter()
            .find(|e| e.action == self.chosen_action)
    }

    /// The highest expected profit across all actions.
    pub fn best_expected_profit(&self) -> f64 {
        self.estimates
            .iter()
            .map(|e| e.expected_profit)
            .fold(f64::NEG_INFINITY, f64::max)
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let profit = self
            .chosen_estimate()
            .map(|e| e.expected_profit)
            .unwrap_or(0.0);
        write!(
            f,
            "[{}] {} (profit={:.2}, mode={}{})",
            self.id,
            self.chosen_action,
            profit,
            self.mode,
            if self.overridden { ", overridden" } else { "" },
        )
    }
}

/// A decision whose true outcome has not yet been observed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingDecision {
    pub id: Uuid,
    pub action: Action,
    pub issued_at: DateTime<Utc>,
    pub matures_at: DateTime<Utc>,
}

/// A resolved outcome fed back into the bandit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outcome {
    pub action: Action,
    /// Normalized reward in [0, 1].
    pub reward: f64,
    pub observed_at: DateTime<Utc>,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} reward={:.3}", self.action, self.reward)
    }
}

/// Read-only engine counters + posterior snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStats {
    pub total_decisions: u64,
    pub pending: usize,
    pub resolved: u64,
    pub posteriors: Vec<ArmPosterior>,
}

impl fmt::Display for EngineStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "decisions={} pending={} resolved={}",
            self.total_decisions, self.pending, self.resolved,
        )
    }
}

// ---------------------------------------------------------------------------
// Persistence snapshot
// ---------------------------------------------------------------------------

/// Serializable belief state. Beliefs and the outcome log are what learning
/// needs to survive a restart; decision history is not carried over.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSnapshot {
    /// Per-arm alpha pseudo-counts, in arm order.
    pub alpha: Vec<f64>,
    /// Per-arm beta pseudo-counts, in arm order.
    pub beta: Vec<f64>,
    pub outcomes: Vec<Outcome>,
    pub saved_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for GRANARY.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unknown decision: {0}")]
    UnknownDecision(Uuid),

    #[error("Storage error: {0}")]
    Storage(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
