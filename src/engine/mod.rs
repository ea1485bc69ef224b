//! Decision engine — profit table, posterior selection, belief feedback.
//!
//! `DecisionEngine` owns the bandit and the ledger. `decide` never updates
//! beliefs; feedback arrives later through `resolve` (matched by decision id)
//! or `record_outcome` (caller-tracked linkage).

pub mod advisor;
pub mod ledger;

use chrono::{Duration, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};
use uuid::Uuid;

use crate::bandit::ThompsonSampler;
use crate::profit::ProfitCalculator;
use crate::types::{
    Action, ArmPosterior, Decision, DecisionRequest, EngineError, EngineSnapshot, EngineStats,
    Outcome, PendingDecision, ProfitEstimate, SelectionMode,
};
use advisor::{AdvisorConfig, HarvestAdvisor};
use ledger::DecisionLedger;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Engine tuning knobs.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Prior pseudo-successes per arm.
    pub alpha_init: f64,
    /// Prior pseudo-failures per arm.
    pub beta_init: f64,
    /// Daily spoilage fraction for a crop at health 0. The effective rate
    /// for a request is `base_spoilage_rate × (1 − plant_health_score)`.
    pub base_spoilage_rate: f64,
    /// Forgetting factor for continuous belief updates, in (0, 1].
    pub decay_factor: f64,
    pub advisor: AdvisorConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            alpha_init: 1.0,
            beta_init: 1.0,
            base_spoilage_rate: 0.02,
            decay_factor: 0.995,
            advisor: AdvisorConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Reward normalization
// ---------------------------------------------------------------------------

/// Normalized profit-ratio reward: `clamp(actual / best, 0, 1)`.
///
/// When the best achievable profit is non-positive there is no meaningful
/// ratio; 0.5 keeps the update neutral.
pub fn reward_ratio(actual_profit: f64, best_profit: f64) -> f64 {
    if best_profit > 0.0 {
        (actual_profit / best_profit).clamp(0.0, 1.0)
    } else {
        0.5
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Orchestrates one decision: profit table → arm selection → advisor review
/// → ledger append. Belief updates happen only on feedback.
#[derive(Debug)]
pub struct DecisionEngine {
    bandit: ThompsonSampler,
    advisor: HarvestAdvisor,
    ledger: DecisionLedger,
    config: EngineConfig,
    rng: StdRng,
}

impl DecisionEngine {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        Self::with_rng(config, StdRng::from_os_rng())
    }

    /// Deterministic engine for simulations and tests.
    pub fn with_seed(config: EngineConfig, seed: u64) -> Result<Self, EngineError> {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: EngineConfig, rng: StdRng) -> Result<Self, EngineError> {
        if !(config.decay_factor > 0.0 && config.decay_factor <= 1.0) {
            return Err(EngineError::InvalidInput(format!(
                "decay_factor must be in (0, 1], got {}",
                config.decay_factor
            )));
        }
        if !(0.0..1.0).contains(&config.base_spoilage_rate) {
            return Err(EngineError::InvalidInput(format!(
                "base_spoilage_rate must be in [0, 1), got {}",
                config.base_spoilage_rate
            )));
        }
        let bandit = ThompsonSampler::new(Action::ALL.len(), config.alpha_init, config.beta_init)?;
        Ok(Self {
            bandit,
            advisor: HarvestAdvisor::new(config.advisor.clone()),
            ledger: DecisionLedger::new(),
            config,
            rng,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Make one harvest timing decision.
    ///
    /// Computes a profit estimate per action, selects via Thompson sampling
    /// (or greedy argmax when `use_thompson` is false), lets the advisor
    /// review the pick, and appends the decision plus a pending entry.
    /// Beliefs are not touched.
    pub fn decide(&mut self, request: &DecisionRequest) -> Result<Decision, EngineError> {
        request.validate()?;

        let spoilage_rate = self.config.base_spoilage_rate * (1.0 - request.plant_health_score);
        let calculator = ProfitCalculator::new(request.yield_kg, request.storage_cost_per_day)?;
        let estimates = calculator.estimate_all(
            request.current_price,
            request.forecast_price_median,
            request.forecast_price_std,
            spoilage_rate,
        )?;

        let (core_idx, mode) = if request.use_thompson {
            let (idx, samples) = self.bandit.sample_and_select(&mut self.rng);
            debug!(samples = ?samples, "Posterior samples drawn");
            (idx, SelectionMode::Thompson)
        } else {
            (greedy_index(&estimates), SelectionMode::Greedy)
        };
        let core_action = Action::from_index(core_idx)?;

        let (chosen_action, overridden) =
            match self.advisor.review(request, core_action, &estimates) {
                Some(action) => (action, true),
                None => (core_action, false),
            };

        let issued_at = Utc::now();
        let decision = Decision {
            id: Uuid::new_v4(),
            chosen_action,
            estimates,
            posteriors: self.bandit.get_arm_posteriors(),
            mode,
            overridden,
            issued_at,
            matures_at: issued_at + Duration::days(chosen_action.wait_days() as i64),
        };
        self.ledger.record_decision(&decision);

        info!(
            decision_id = %decision.id,
            action = %decision.chosen_action,
            mode = %decision.mode,
            overridden = decision.overridden,
            expected_profit = format!(
                "{:.2}",
                decision
                    .chosen_estimate()
                    .map(|e| e.expected_profit)
                    .unwrap_or(0.0)
            ),
            "Decision issued"
        );

        Ok(decision)
    }

    /// Resolve a pending decision with its observed reward (binary update).
    ///
    /// Exactly-once: a second resolve of the same id fails with
    /// `UnknownDecision` and leaves beliefs untouched.
    pub fn resolve(&mut self, decision_id: Uuid, reward: f64) -> Result<Outcome, EngineError> {
        check_reward(reward)?;
        let pending = self.ledger.resolve(decision_id)?;
        self.bandit.update_beliefs(pending.action.index(), reward)?;
        let outcome = Outcome {
            action: pending.action,
            reward,
            observed_at: Utc::now(),
        };
        self.ledger.record_outcome(outcome.clone());

        info!(
            decision_id = %decision_id,
            action = %outcome.action,
            reward = format!("{:.3}", reward),
            "Decision resolved"
        );
        Ok(outcome)
    }

    /// Resolve with the continuous (decayed, fractional) update instead of
    /// the binary one. Used by the simulation runner, where rewards are
    /// profit ratios rather than hit-or-miss observations.
    pub fn resolve_continuous(
        &mut self,
        decision_id: Uuid,
        reward: f64,
    ) -> Result<Outcome, EngineError> {
        check_reward(reward)?;
        let pending = self.ledger.resolve(decision_id)?;
        self.bandit.update_beliefs_continuous(
            pending.action.index(),
            reward,
            self.config.decay_factor,
        )?;
        let outcome = Outcome {
            action: pending.action,
            reward,
            observed_at: Utc::now(),
        };
        self.ledger.record_outcome(outcome.clone());

        info!(
            decision_id = %decision_id,
            action = %outcome.action,
            reward = format!("{:.3}", reward),
            "Decision resolved (continuous)"
        );
        Ok(outcome)
    }

    /// Direct belief feed for callers that track decision linkage themselves.
    pub fn record_outcome(&mut self, action: Action, reward: f64) -> Result<Outcome, EngineError> {
        check_reward(reward)?;
        self.bandit.update_beliefs(action.index(), reward)?;
        let outcome = Outcome {
            action,
            reward,
            observed_at: Utc::now(),
        };
        self.ledger.record_outcome(outcome.clone());

        info!(action = %action, reward = format!("{:.3}", reward), "Outcome recorded");
        Ok(outcome)
    }

    pub fn get_stats(&self) -> EngineStats {
        EngineStats {
            total_decisions: self.ledger.decisions().len() as u64,
            pending: self.ledger.pending_count(),
            resolved: self.ledger.outcomes().len() as u64,
            posteriors: self.bandit.get_arm_posteriors(),
        }
    }

    pub fn posteriors(&self) -> Vec<ArmPosterior> {
        self.bandit.get_arm_posteriors()
    }

    pub fn decisions(&self) -> &[Decision] {
        self.ledger.decisions()
    }

    /// The most recent `n` decisions, oldest first.
    pub fn recent_decisions(&self, n: usize) -> &[Decision] {
        self.ledger.recent_decisions(n)
    }

    pub fn pending(&self) -> Vec<PendingDecision> {
        self.ledger.pending()
    }

    pub fn outcomes(&self) -> &[Outcome] {
        self.ledger.outcomes()
    }

    /// Belief state for persistence.
    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            alpha: self.bandit.alpha().to_vec(),
            beta: self.bandit.beta().to_vec(),
            outcomes: self.ledger.outcomes().to_vec(),
            saved_at: Utc::now(),
        }
    }

    /// Restore beliefs and the outcome log from a snapshot.
    pub fn restore(&mut self, snapshot: EngineSnapshot) -> Result<(), EngineError> {
        if snapshot.alpha.len() != Action::ALL.len() {
            return Err(EngineError::InvalidInput(format!(
                "snapshot has {} arms, expected {}",
                snapshot.alpha.len(),
                Action::ALL.len()
            )));
        }
        self.bandit = ThompsonSampler::from_state(snapshot.alpha, snapshot.beta)?;
        self.ledger.restore_outcomes(snapshot.outcomes);
        info!(outcomes = self.ledger.outcomes().len(), "Belief state restored");
        Ok(())
    }
}

fn check_reward(reward: f64) -> Result<(), EngineError> {
    if !(0.0..=1.0).contains(&reward) {
        return Err(EngineError::InvalidInput(format!(
            "reward must be in [0, 1], got {reward}"
        )));
    }
    Ok(())
}

/// Argmax of expected profit; ties go to the lower index.
fn greedy_index(estimates: &[ProfitEstimate]) -> usize {
    let mut best = 0;
    for (i, est) in estimates.iter().enumerate().skip(1) {
        if est.expected_profit > estimates[best].expected_profit {
            best = i;
        }
    }
    best
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
