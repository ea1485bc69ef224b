//! Simulation runner.
//!
//! Feeds a scenario batch through a live engine, resolving each decision
//! immediately with the normalized profit-ratio reward, and reports
//! accuracy and profit efficiency against the per-scenario best action.

use tracing::{debug, info};

use crate::engine::{reward_ratio, DecisionEngine, EngineConfig};
use crate::types::{Action, ArmPosterior, DecisionRequest, EngineError};

use super::scenarios::Scenario;

// ---------------------------------------------------------------------------
// Simulation results
// ---------------------------------------------------------------------------

/// Aggregate outcome of one simulation run.
#[derive(Debug, Clone)]
pub struct SimulationReport {
    pub scenarios: usize,
    pub correct: usize,
    /// Fraction of decisions that matched the best action exactly.
    pub accuracy: f64,
    pub total_profit: f64,
    pub optimal_profit: f64,
    /// Captured profit as a fraction of the best attainable. Often the more
    /// telling number: a near-optimal wrong pick barely dents it.
    pub profit_efficiency: f64,
    /// Decisions per action, in arm order.
    pub action_counts: Vec<u64>,
    /// Belief state after the run.
    pub posteriors: Vec<ArmPosterior>,
}

// ---------------------------------------------------------------------------
// Simulator
// ---------------------------------------------------------------------------

/// Replays scenarios through a seeded engine.
#[derive(Debug)]
pub struct Simulator {
    engine: DecisionEngine,
}

impl Simulator {
    /// Engine seeded for a reproducible run.
    pub fn new(config: EngineConfig, seed: u64) -> Result<Self, EngineError> {
        let engine = DecisionEngine::with_seed(config, seed)?;
        Ok(Self { engine })
    }

    pub fn engine(&self) -> &DecisionEngine {
        &self.engine
    }

    /// Run every scenario in order: decide, score against the scenario's
    /// ground truth, resolve with the continuous reward.
    pub fn run(&mut self, scenarios: &[Scenario]) -> Result<SimulationReport, EngineError> {
        info!(
            scenarios = scenarios.len(),
            decay = self.engine.config().decay_factor,
            "Starting simulation"
        );

        let mut correct = 0usize;
        let mut total_profit = 0.0_f64;
        let mut optimal_profit = 0.0_f64;
        let mut action_counts = vec![0u64; Action::ALL.len()];

        for (idx, scenario) in scenarios.iter().enumerate() {
            let request = DecisionRequest {
                current_price: scenario.current_price,
                forecast_price_median: scenario.noisy_forecast_price,
                forecast_price_std: scenario.forecast_std,
                yield_kg: scenario.yield_kg,
                plant_health_score: scenario.plant_health,
                storage_cost_per_day: scenario.storage_cost_per_day,
                use_thompson: true,
            };

            let decision = self.engine.decide(&request)?;
            let chosen = decision.chosen_action;
            action_counts[chosen.index()] += 1;

            let actual = scenario.profit_for(chosen);
            let is_correct = chosen == scenario.optimal_action;
            if is_correct {
                correct += 1;
            }

            let reward = reward_ratio(actual, scenario.optimal_profit);
            self.engine.resolve_continuous(decision.id, reward)?;

            debug!(
                scenario = idx,
                chosen = %chosen,
                optimal = %scenario.optimal_action,
                reward = format!("{reward:.3}"),
                "Scenario resolved"
            );

            total_profit += actual;
            optimal_profit += scenario.optimal_profit;
        }

        let accuracy = if scenarios.is_empty() {
            0.0
        } else {
            correct as f64 / scenarios.len() as f64
        };
        let profit_efficiency = if optimal_profit > 0.0 {
            total_profit / optimal_profit
        } else {
            0.0
        };

        info!(
            accuracy = format!("{:.1}%", accuracy * 100.0),
            profit_efficiency = format!("{:.1}%", profit_efficiency * 100.0),
            total_profit = format!("{total_profit:.0}"),
            "Simulation complete"
        );

        Ok(SimulationReport {
            scenarios: scenarios.len(),
            correct,
            accuracy,
            total_profit,
            optimal_profit,
            profit_efficiency,
            action_counts,
            posteriors: self.engine.posteriors(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
