//! Synthetic scenario generation.
//!
//! Produces balanced batches of market situations (rising, falling, flat)
//! with ground-truth profits per action, so a simulation can score the
//! engine's choices against the best available one.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

use crate::profit::ProfitCalculator;
use crate::types::{Action, EngineError};

// ---------------------------------------------------------------------------
// Price trends
// ---------------------------------------------------------------------------

/// Market regime a scenario is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceTrend {
    Up,
    Down,
    Stable,
}

impl std::fmt::Display for PriceTrend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PriceTrend::Up => write!(f, "up"),
            PriceTrend::Down => write!(f, "down"),
            PriceTrend::Stable => write!(f, "stable"),
        }
    }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

/// One synthetic market situation with its ground truth.
///
/// `forecast_price` is the true future price; `noisy_forecast_price` is what
/// the engine gets to see. Ground-truth profits are computed from the noisy
/// forecast too, so the best action is the best given the information the
/// engine had, not hindsight.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub trend: PriceTrend,
    pub current_price: f64,
    pub forecast_price: f64,
    pub noisy_forecast_price: f64,
    pub forecast_std: f64,
    pub yield_kg: f64,
    pub plant_health: f64,
    pub storage_cost_per_day: f64,
    /// Expected profit per action, in arm order.
    pub profits: Vec<f64>,
    pub optimal_action: Action,
    pub optimal_profit: f64,
}

impl Scenario {
    pub fn profit_for(&self, action: Action) -> f64 {
        self.profits[action.index()]
    }
}

/// Knobs for scenario generation.
#[derive(Debug, Clone)]
pub struct ScenarioConfig {
    pub n_scenarios: usize,
    /// Base spoilage used when computing ground-truth profits. Should match
    /// the engine under test.
    pub base_spoilage_rate: f64,
    pub seed: u64,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            n_scenarios: 3000,
            base_spoilage_rate: 0.02,
            seed: 42,
        }
    }
}

/// Seeded generator producing balanced trend thirds.
#[derive(Debug)]
pub struct ScenarioGenerator {
    config: ScenarioConfig,
    rng: StdRng,
}

impl ScenarioGenerator {
    pub fn new(config: ScenarioConfig) -> Result<Self, EngineError> {
        if config.n_scenarios == 0 {
            return Err(EngineError::InvalidInput(
                "n_scenarios must be > 0".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&config.base_spoilage_rate) {
            return Err(EngineError::InvalidInput(format!(
                "base_spoilage_rate must be in [0, 1), got {}",
                config.base_spoilage_rate
            )));
        }
        let rng = StdRng::seed_from_u64(config.seed);
        Ok(Self { config, rng })
    }

    /// Generate the full batch: first third rising, second third falling,
    /// remainder flat.
    pub fn generate(&mut self) -> Result<Vec<Scenario>, EngineError> {
        let n = self.config.n_scenarios;
        let mut scenarios = Vec::with_capacity(n);
        for i in 0..n {
            let trend = if i < n / 3 {
                PriceTrend::Up
            } else if i < 2 * n / 3 {
                PriceTrend::Down
            } else {
                PriceTrend::Stable
            };
            scenarios.push(self.generate_one(trend)?);
        }
        Ok(scenarios)
    }

    fn generate_one(&mut self, trend: PriceTrend) -> Result<Scenario, EngineError> {
        let (current_price, forecast_price): (f64, f64) = match trend {
            PriceTrend::Up => {
                let current = self.rng.random_range(2.5..3.5);
                let forecast = current * self.rng.random_range(1.10..1.25);
                (current, forecast)
            }
            PriceTrend::Down => {
                let current = self.rng.random_range(3.0..4.0);
                let forecast = current * self.rng.random_range(0.80..0.95);
                (current, forecast)
            }
            PriceTrend::Stable => {
                let current = self.rng.random_range(2.5..4.0);
                let forecast = current * self.rng.random_range(0.97..1.03);
                (current, forecast)
            }
        };

        let forecast_std = (forecast_price - current_price).abs() * 0.15;
        let yield_kg = self.rng.random_range(12_000.0..18_000.0);
        let plant_health = self.rng.random_range(0.85..1.0);
        let storage_cost_per_day = self.rng.random_range(3.0..7.0);

        // What the engine will see: forecast plus noise, floored so a noisy
        // draw cannot produce a nonsensical price.
        let noisy_forecast_price = Normal::new(forecast_price, forecast_std)
            .map(|dist| dist.sample(&mut self.rng))
            .unwrap_or(forecast_price)
            .max(0.5);

        let spoilage = self.config.base_spoilage_rate * (1.0 - plant_health);
        let calculator = ProfitCalculator::new(yield_kg, storage_cost_per_day)?;
        let estimates = calculator.estimate_all(
            current_price,
            noisy_forecast_price,
            forecast_std,
            spoilage,
        )?;

        let profits: Vec<f64> = estimates.iter().map(|e| e.expected_profit).collect();
        let mut best = 0usize;
        for (idx, &profit) in profits.iter().enumerate() {
            if profit > profits[best] {
                best = idx;
            }
        }
        let optimal_action = Action::from_index(best)?;
        let optimal_profit = profits[best];

        Ok(Scenario {
            trend,
            current_price,
            forecast_price,
            noisy_forecast_price,
            forecast_std,
            yield_kg,
            plant_health,
            storage_cost_per_day,
            profits,
            optimal_action,
            optimal_profit,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn generate(n: usize, seed: u64) -> Vec<Scenario> {
        ScenarioGenerator::new(ScenarioConfig {
            n_scenarios: n,
            seed,
            ..ScenarioConfig::default()
        })
        .unwrap()
        .generate()
        .unwrap()
    }

    #[test]
    fn test_rejects_empty_batch() {
        assert!(ScenarioGenerator::new(ScenarioConfig {
            n_scenarios: 0,
            ..ScenarioConfig::default()
        })
        .is_err());
    }

    #[test]
    fn test_rejects_invalid_spoilage() {
        assert!(ScenarioGenerator::new(ScenarioConfig {
            base_spoilage_rate: 1.0,
            ..ScenarioConfig::default()
        })
        .is_err());
    }

    #[test]
    fn test_balanced_trend_thirds() {
        let scenarios = generate(300, 42);
        let ups = scenarios.iter().filter(|s| s.trend == PriceTrend::Up).count();
        let downs = scenarios
            .iter()
            .filter(|s| s.trend == PriceTrend::Down)
            .count();
        let stables = scenarios
            .iter()
            .filter(|s| s.trend == PriceTrend::Stable)
            .count();
        assert_eq!(ups, 100);
        assert_eq!(downs, 100);
        assert_eq!(stables, 100);
    }

    #[test]
    fn test_trend_ranges() {
        for scenario in generate(300, 7) {
            match scenario.trend {
                PriceTrend::Up => {
                    assert!((2.5..3.5).contains(&scenario.current_price));
                    assert!(scenario.forecast_price > scenario.current_price);
                }
                PriceTrend::Down => {
                    assert!((3.0..4.0).contains(&scenario.current_price));
                    assert!(scenario.forecast_price < scenario.current_price);
                }
                PriceTrend::Stable => {
                    assert!((2.5..4.0).contains(&scenario.current_price));
                    let ratio = scenario.forecast_price / scenario.current_price;
                    assert!(ratio > 0.97 - 1e-9 && ratio < 1.03 + 1e-9);
                }
            }
            assert!((12_000.0..18_000.0).contains(&scenario.yield_kg));
            assert!((0.85..1.0).contains(&scenario.plant_health));
            assert!((3.0..7.0).contains(&scenario.storage_cost_per_day));
            assert!(scenario.noisy_forecast_price >= 0.5);
        }
    }

    #[test]
    fn test_forecast_std_tracks_price_gap() {
        for scenario in generate(90, 11) {
            let expected = (scenario.forecast_price - scenario.current_price).abs() * 0.15;
            assert!((scenario.forecast_std - expected).abs() < 1e-10);
        }
    }

    #[test]
    fn test_optimal_profit_is_max() {
        for scenario in generate(150, 3) {
            let max = scenario
                .profits
                .iter()
                .cloned()
                .fold(f64::NEG_INFINITY, f64::max);
            assert!((scenario.optimal_profit - max).abs() < 1e-10);
            assert!((scenario.profit_for(scenario.optimal_action) - max).abs() < 1e-10);
        }
    }

    #[test]
    fn test_same_seed_reproduces_batch() {
        let a = generate(60, 99);
        let b = generate(60, 99);
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.current_price, y.current_price);
            assert_eq!(x.noisy_forecast_price, y.noisy_forecast_price);
            assert_eq!(x.optimal_action, y.optimal_action);
        }
    }

    #[test]
    fn test_different_seeds_differ() {
        let a = generate(10, 1);
        let b = generate(10, 2);
        assert!(a
            .iter()
            .zip(b.iter())
            .any(|(x, y)| x.current_price != y.current_price));
    }

    #[test]
    fn test_profits_in_arm_order() {
        for scenario in generate(30, 5) {
            assert_eq!(scenario.profits.len(), Action::ALL.len());
            // Selling today never pays storage, so the arm-0 profit is
            // current price times full yield exactly.
            let now = scenario.current_price * scenario.yield_kg;
            assert!((scenario.profits[0] - now).abs() < 1e-6);
        }
    }
}
