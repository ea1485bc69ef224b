//! Beta-Bernoulli Thompson Sampling bandit.
//!
//! Holds one (alpha, beta) belief pair per arm, draws posterior samples
//! for action selection, and updates beliefs from observed rewards.
//! Not a finite-state machine: a continuously refined probability model.

use rand::Rng;
use rand_distr::{Beta, Distribution};
use tracing::debug;

use crate::types::{ArmPosterior, EngineError};

/// Reward cutoff converting a normalized profit ratio into a binary
/// success/failure for the conjugate Beta update. An intentional
/// simplification: magnitude above/below the cutoff is discarded.
pub const SUCCESS_THRESHOLD: f64 = 0.5;

/// Floor applied after exponential decay so pseudo-counts stay positive.
const MIN_PSEUDO_COUNT: f64 = 1e-3;

/// Thompson Sampling over independent Beta posteriors, one per arm.
///
/// Invariant: `alpha[i] > 0 && beta[i] > 0` for every arm, always.
#[derive(Debug, Clone)]
pub struct ThompsonSampler {
    alpha: Vec<f64>,
    beta: Vec<f64>,
}

impl ThompsonSampler {
    /// Create a sampler with every arm at `Beta(alpha_init, beta_init)`.
    pub fn new(n_arms: usize, alpha_init: f64, beta_init: f64) -> Result<Self, EngineError> {
        if n_arms == 0 {
            return Err(EngineError::InvalidInput(
                "n_arms must be > 0".to_string(),
            ));
        }
        if !(alpha_init > 0.0) || !(beta_init > 0.0) {
            return Err(EngineError::InvalidInput(format!(
                "priors must be > 0, got alpha_init={alpha_init} beta_init={beta_init}"
            )));
        }
        Ok(Self {
            alpha: vec![alpha_init; n_arms],
            beta: vec![beta_init; n_arms],
        })
    }

    /// Uniform, uninformative prior: every arm at `Beta(1, 1)`.
    pub fn uniform(n_arms: usize) -> Result<Self, EngineError> {
        Self::new(n_arms, 1.0, 1.0)
    }

    /// Rebuild a sampler from persisted belief state.
    pub fn from_state(alpha: Vec<f64>, beta: Vec<f64>) -> Result<Self, EngineError> {
        if alpha.is_empty() || alpha.len() != beta.len() {
            return Err(EngineError::InvalidInput(format!(
                "belief arrays must be non-empty and equal length, got {} and {}",
                alpha.len(),
                beta.len()
            )));
        }
        for (i, (a, b)) in alpha.iter().zip(&beta).enumerate() {
            if !(a.is_finite() && *a > 0.0 && b.is_finite() && *b > 0.0) {
                return Err(EngineError::InvalidInput(format!(
                    "arm {i} beliefs must be finite and > 0, got alpha={a} beta={b}"
                )));
            }
        }
        Ok(Self { alpha, beta })
    }

    pub fn n_arms(&self) -> usize {
        self.alpha.len()
    }

    /// Raw alpha pseudo-counts, in arm order.
    pub fn alpha(&self) -> &[f64] {
        &self.alpha
    }

    /// Raw beta pseudo-counts, in arm order.
    pub fn beta(&self) -> &[f64] {
        &self.beta
    }

    /// Draw `θ_i ~ Beta(alpha_i, beta_i)` for each arm and return the arm
    /// with the largest sample plus the full sample vector.
    /// Ties break toward the lower arm index.
    pub fn sample_and_select<R: Rng + ?Sized>(&self, rng: &mut R) -> (usize, Vec<f64>) {
        let samples: Vec<f64> = self
            .alpha
            .iter()
            .zip(&self.beta)
            .map(|(&a, &b)| match Beta::new(a, b) {
                Ok(dist) => dist.sample(rng),
                // Unreachable while the positivity invariant holds; the
                // posterior mean keeps selection well-defined regardless.
                Err(_) => a / (a + b),
            })
            .collect();

        let mut best = 0;
        for (i, sample) in samples.iter().enumerate() {
            if *sample > samples[best] {
                best = i;
            }
        }

        (best, samples)
    }

    /// Binary conjugate update: success iff `reward > SUCCESS_THRESHOLD`.
    /// Success increments `alpha[action_idx]` by 1, failure increments
    /// `beta[action_idx]` by 1. Counts never decrease in this mode.
    pub fn update_beliefs(&mut self, action_idx: usize, reward: f64) -> Result<(), EngineError> {
        self.check_arm(action_idx)?;
        if !reward.is_finite() {
            return Err(EngineError::InvalidInput(format!(
                "reward must be finite, got {reward}"
            )));
        }

        if reward > SUCCESS_THRESHOLD {
            self.alpha[action_idx] += 1.0;
        } else {
            self.beta[action_idx] += 1.0;
        }

        debug!(
            arm = action_idx,
            reward = format!("{reward:.3}"),
            alpha = self.alpha[action_idx],
            beta = self.beta[action_idx],
            "Beliefs updated"
        );

        Ok(())
    }

    /// Continuous-reward variant for non-stationary environments: every
    /// arm's counts decay exponentially (floored to stay positive), then
    /// the chosen arm gains fractional pseudo-counts `reward` / `1 - reward`.
    ///
    /// A different statistical model from the binary update, not a drop-in
    /// replacement.
    pub fn update_beliefs_continuous(
        &mut self,
        action_idx: usize,
        reward: f64,
        decay_factor: f64,
    ) -> Result<(), EngineError> {
        self.check_arm(action_idx)?;
        if !(0.0..=1.0).contains(&reward) {
            return Err(EngineError::InvalidInput(format!(
                "continuous reward must be in [0, 1], got {reward}"
            )));
        }
        if !(decay_factor > 0.0 && decay_factor <= 1.0) {
            return Err(EngineError::InvalidInput(format!(
                "decay_factor must be in (0, 1], got {decay_factor}"
            )));
        }

        for i in 0..self.alpha.len() {
            self.alpha[i] = (self.alpha[i] * decay_factor).max(MIN_PSEUDO_COUNT);
            self.beta[i] = (self.beta[i] * decay_factor).max(MIN_PSEUDO_COUNT);
        }

        self.alpha[action_idx] += reward;
        self.beta[action_idx] += 1.0 - reward;

        Ok(())
    }

    /// Closed-form posterior moments for every arm, in arm order.
    pub fn get_arm_posteriors(&self) -> Vec<ArmPosterior> {
        self.alpha
            .iter()
            .zip(&self.beta)
            .enumerate()
            .map(|(arm, (&a, &b))| {
                let total = a + b;
                ArmPosterior {
                    arm,
                    alpha: a,
                    beta: b,
                    mean: a / total,
                    variance: (a * b) / (total * total * (total + 1.0)),
                }
            })
            .collect()
    }

    fn check_arm(&self, action_idx: usize) -> Result<(), EngineError> {
        if action_idx >= self.alpha.len() {
            return Err(EngineError::InvalidInput(format!(
                "action_idx {action_idx} out of range for {} arms",
                self.alpha.len()
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
