//! Per-action profit estimation.
//!
//! Converts market/yield/cost inputs into an expected profit and its
//! uncertainty for one discrete wait-action. Pure computation: no I/O,
//! no belief state, no error recovery.

use tracing::debug;

use crate::types::{Action, EngineError, ProfitEstimate};

/// Computes profit projections for harvest timing actions.
///
/// Holds the per-crop constants (yield and daily storage cost); per-call
/// inputs (prices, uncertainty, spoilage) vary with each decision.
#[derive(Debug, Clone)]
pub struct ProfitCalculator {
    yield_kg: f64,
    storage_cost_per_day: f64,
}

impl ProfitCalculator {
    /// Create a calculator for a crop with the given yield and storage cost.
    pub fn new(yield_kg: f64, storage_cost_per_day: f64) -> Result<Self, EngineError> {
        if !(yield_kg > 0.0) {
            return Err(EngineError::InvalidInput(format!(
                "yield_kg must be > 0, got {yield_kg}"
            )));
        }
        if !(storage_cost_per_day >= 0.0) {
            return Err(EngineError::InvalidInput(format!(
                "storage_cost_per_day must be >= 0, got {storage_cost_per_day}"
            )));
        }
        Ok(Self {
            yield_kg,
            storage_cost_per_day,
        })
    }

    pub fn yield_kg(&self) -> f64 {
        self.yield_kg
    }

    /// Profit projection for one action.
    ///
    /// Waiting trades spoilage losses and storage cost against the forecast
    /// price. Selling today realizes the observed current price with zero
    /// price uncertainty; any wait uses the (uncertain) forecast.
    ///
    /// `revenue_std = remaining_yield × price_std` is linear propagation
    /// through a fixed multiplier; yield/price covariance is ignored.
    pub fn calculate_profit(
        &self,
        action: Action,
        current_price: f64,
        forecast_price: f64,
        forecast_std: f64,
        spoilage_rate_per_day: f64,
    ) -> Result<ProfitEstimate, EngineError> {
        let wait_days = action.wait_days() as f64;

        if !(0.0..1.0).contains(&spoilage_rate_per_day) {
            return Err(EngineError::InvalidInput(format!(
                "spoilage_rate_per_day must be in [0, 1), got {spoilage_rate_per_day}"
            )));
        }
        if !(forecast_std >= 0.0) {
            return Err(EngineError::InvalidInput(format!(
                "forecast_std must be >= 0, got {forecast_std}"
            )));
        }
        if !(current_price > 0.0) {
            return Err(EngineError::InvalidInput(format!(
                "current_price must be > 0, got {current_price}"
            )));
        }
        if wait_days > 0.0 && !(forecast_price > 0.0) {
            return Err(EngineError::InvalidInput(format!(
                "forecast_price must be > 0, got {forecast_price}"
            )));
        }

        // Yield remaining after spoilage, floored at zero.
        let spoilage_loss = self.yield_kg * spoilage_rate_per_day * wait_days;
        let remaining_yield = (self.yield_kg - spoilage_loss).max(0.0);

        // An observed price has no uncertainty; a forecast does.
        let (expected_price, price_std) = if action == Action::HarvestNow {
            (current_price, 0.0)
        } else {
            (forecast_price, forecast_std)
        };

        let revenue = remaining_yield * expected_price;
        let revenue_std = remaining_yield * price_std;

        let storage_cost = self.storage_cost_per_day * wait_days;

        let expected_profit = revenue - storage_cost;

        debug!(
            action = %action,
            expected_profit = format!("{expected_profit:.2}"),
            remaining_yield = format!("{remaining_yield:.1}"),
            storage_cost = format!("{storage_cost:.2}"),
            "Profit estimated"
        );

        Ok(ProfitEstimate {
            action,
            expected_profit,
            profit_std: revenue_std,
            remaining_yield,
            expected_price,
            storage_cost,
            revenue,
        })
    }

    /// Profit projections for every action, in arm order.
    pub fn estimate_all(
        &self,
        current_price: f64,
        forecast_price: f64,
        forecast_std: f64,
        spoilage_rate_per_day: f64,
    ) -> Result<Vec<ProfitEstimate>, EngineError> {
        Action::ALL
            .iter()
            .map(|&action| {
                self.calculate_profit(
                    action,
                    current_price,
                    forecast_price,
                    forecast_std,
                    spoilage_rate_per_day,
                )
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
