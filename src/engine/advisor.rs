//! Advisor overlay — price-trend overrides and the rule-based fallback.
//!
//! Sits strictly outside the bandit: it may replace a selected action using
//! the already-computed profit table, but never touches beliefs and never
//! rewrites history. The fallback path makes a decision with no learned
//! state at all.

use tracing::{debug, info};

use crate::types::{Action, DecisionRequest, ProfitEstimate};

/// Thresholds for the override rules and the fallback heuristic.
///
/// Overrides fire on strict inequality; a price change exactly at a
/// threshold leaves the core selection untouched.
#[derive(Debug, Clone)]
pub struct AdvisorConfig {
    /// Relative price rise above which a HarvestNow pick may flip to Wait7Days.
    pub strong_rise: f64,
    /// Relative price rise above which a HarvestNow pick may flip to Wait3Days.
    pub moderate_rise: f64,
    /// Relative price drop (absolute value) above which a wait pick flips to
    /// HarvestNow.
    pub drop: f64,
    /// Fallback rule: rise required to wait 7 days.
    pub fallback_strong_rise: f64,
    /// Fallback rule: rise required to wait 3 days.
    pub fallback_moderate_rise: f64,
    /// Fallback rule: fraction of yield surviving a 3-day wait.
    pub wait3_yield_factor: f64,
    /// Fallback rule: fraction of yield surviving a 7-day wait.
    pub wait7_yield_factor: f64,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            strong_rise: 0.12,
            moderate_rise: 0.07,
            drop: 0.05,
            fallback_strong_rise: 0.10,
            fallback_moderate_rise: 0.05,
            wait3_yield_factor: 0.98,
            wait7_yield_factor: 0.95,
        }
    }
}

/// Reviews core selections against the forecast price trend.
#[derive(Debug, Clone)]
pub struct HarvestAdvisor {
    config: AdvisorConfig,
}

impl HarvestAdvisor {
    pub fn new(config: AdvisorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AdvisorConfig {
        &self.config
    }

    /// Returns `Some(action)` if the core selection should be replaced.
    ///
    /// Rules, evaluated in order (first match wins, no fallthrough between
    /// the rise tiers):
    /// 1. rise > strong_rise, core said HarvestNow, wait-7 profit beats now
    ///    → Wait7Days.
    /// 2. rise > moderate_rise, core said HarvestNow, wait-3 profit beats now
    ///    → Wait3Days.
    /// 3. drop > drop threshold, core said wait → HarvestNow.
    pub fn review(
        &self,
        request: &DecisionRequest,
        core_action: Action,
        estimates: &[ProfitEstimate],
    ) -> Option<Action> {
        let change = request.price_change();
        let profit = |action: Action| {
            estimates
                .iter()
                .find(|e| e.action == action)
                .map(|e| e.expected_profit)
        };

        if core_action == Action::HarvestNow {
            if change > self.config.strong_rise {
                if profit(Action::Wait7Days)? > profit(Action::HarvestNow)? {
                    info!(
                        rise = format!("{:.1}%", change * 100.0),
                        "Override: strong price rise, switching to Wait 7 Days"
                    );
                    return Some(Action::Wait7Days);
                }
            } else if change > self.config.moderate_rise
                && profit(Action::Wait3Days)? > profit(Action::HarvestNow)?
            {
                info!(
                    rise = format!("{:.1}%", change * 100.0),
                    "Override: price rise, switching to Wait 3 Days"
                );
                return Some(Action::Wait3Days);
            }
        } else if change < -self.config.drop {
            info!(
                drop = format!("{:.1}%", -change * 100.0),
                core = %core_action,
                "Override: price drop, switching to Harvest Now"
            );
            return Some(Action::HarvestNow);
        }

        None
    }

    /// Rule-based decision for operation without a learned bandit.
    ///
    /// Uses fixed yield haircuts instead of a spoilage model: wait only when
    /// the forecast rise clears the threshold and the haircut profit still
    /// beats selling today.
    pub fn fallback_decision(&self, request: &DecisionRequest) -> Action {
        let change = request.price_change();

        let profit_now = request.current_price * request.yield_kg;
        let profit_wait3 = request.forecast_price_median
            * request.yield_kg
            * self.config.wait3_yield_factor
            - request.storage_cost_per_day * 3.0;
        let profit_wait7 = request.forecast_price_median
            * request.yield_kg
            * self.config.wait7_yield_factor
            - request.storage_cost_per_day * 7.0;

        let action = if change > self.config.fallback_strong_rise && profit_wait7 > profit_now {
            Action::Wait7Days
        } else if change > self.config.fallback_moderate_rise && profit_wait3 > profit_now {
            Action::Wait3Days
        } else {
            Action::HarvestNow
        };

        debug!(
            action = %action,
            change = format!("{:.1}%", change * 100.0),
            "Fallback decision"
        );
        action
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profit::ProfitCalculator;
    use crate::types::DecisionRequest;

    fn advisor() -> HarvestAdvisor {
        HarvestAdvisor::new(AdvisorConfig::default())
    }

    fn request(current: f64, forecast: f64) -> DecisionRequest {
        DecisionRequest {
            current_price: current,
            forecast_price_median: forecast,
            forecast_price_std: 1.0,
            yield_kg: 1000.0,
            plant_health_score: 0.9,
            storage_cost_per_day: 10.0,
            use_thompson: true,
        }
    }

    fn estimates(req: &DecisionRequest) -> Vec<ProfitEstimate> {
        let calc = ProfitCalculator::new(req.yield_kg, req.storage_cost_per_day).unwrap();
        calc.estimate_all(
            req.current_price,
            req.forecast_price_median,
            req.forecast_price_std,
            0.002,
        )
        .unwrap()
    }

    #[test]
    fn test_strong_rise_overrides_harvest_now_to_wait7() {
        let req = request(20.0, 25.0); // +25%
        let ests = estimates(&req);
        let verdict = advisor().review(&req, Action::HarvestNow, &ests);
        assert_eq!(verdict, Some(Action::Wait7Days));
    }

    #[test]
    fn test_moderate_rise_overrides_harvest_now_to_wait3() {
        let req = request(20.0, 22.0); // +10%
        let ests = estimates(&req);
        let verdict = advisor().review(&req, Action::HarvestNow, &ests);
        assert_eq!(verdict, Some(Action::Wait3Days));
    }

    #[test]
    fn test_drop_overrides_wait_to_harvest_now() {
        let req = request(20.0, 18.0); // -10%
        let ests = estimates(&req);
        assert_eq!(
            advisor().review(&req, Action::Wait3Days, &ests),
            Some(Action::HarvestNow)
        );
        assert_eq!(
            advisor().review(&req, Action::Wait7Days, &ests),
            Some(Action::HarvestNow)
        );
    }

    #[test]
    fn test_no_override_when_core_already_waiting_on_rise() {
        let req = request(20.0, 25.0); // +25%, but core is already waiting
        let ests = estimates(&req);
        assert_eq!(advisor().review(&req, Action::Wait7Days, &ests), None);
        assert_eq!(advisor().review(&req, Action::Wait3Days, &ests), None);
    }

    #[test]
    fn test_no_override_when_harvesting_into_a_drop() {
        let req = request(20.0, 18.0);
        let ests = estimates(&req);
        assert_eq!(advisor().review(&req, Action::HarvestNow, &ests), None);
    }

    #[test]
    fn test_thresholds_are_strict() {
        // Exactly +12% is not a strong rise; it falls to the moderate tier.
        let req = request(20.0, 22.4);
        let ests = estimates(&req);
        assert_eq!(
            advisor().review(&req, Action::HarvestNow, &ests),
            Some(Action::Wait3Days)
        );

        // Exactly -5% is not a drop override.
        let req = request(20.0, 19.0);
        let ests = estimates(&req);
        assert_eq!(advisor().review(&req, Action::Wait7Days, &ests), None);
    }

    #[test]
    fn test_strong_rise_does_not_fall_through_to_moderate_tier() {
        // Above the strong threshold but wait-7 loses to now (huge storage
        // cost): rule 1 fails its profit check and rule 2 must not fire.
        let mut req = request(20.0, 25.0);
        req.storage_cost_per_day = 10_000.0;
        let calc = ProfitCalculator::new(req.yield_kg, req.storage_cost_per_day).unwrap();
        let ests = calc
            .estimate_all(
                req.current_price,
                req.forecast_price_median,
                req.forecast_price_std,
                0.002,
            )
            .unwrap();
        assert_eq!(advisor().review(&req, Action::HarvestNow, &ests), None);
    }

    #[test]
    fn test_small_change_no_override() {
        let req = request(20.0, 20.5); // +2.5%
        let ests = estimates(&req);
        assert_eq!(advisor().review(&req, Action::HarvestNow, &ests), None);
        assert_eq!(advisor().review(&req, Action::Wait3Days, &ests), None);
    }

    // ---- fallback ----------------------------------------------------------

    #[test]
    fn test_fallback_strong_rise_waits_7() {
        let req = request(20.0, 25.0); // +25%
        assert_eq!(advisor().fallback_decision(&req), Action::Wait7Days);
    }

    #[test]
    fn test_fallback_moderate_rise_waits_3() {
        let req = request(20.0, 21.5); // +7.5%
        assert_eq!(advisor().fallback_decision(&req), Action::Wait3Days);
    }

    #[test]
    fn test_fallback_flat_or_falling_harvests_now() {
        assert_eq!(
            advisor().fallback_decision(&request(20.0, 20.0)),
            Action::HarvestNow
        );
        assert_eq!(
            advisor().fallback_decision(&request(20.0, 17.0)),
            Action::HarvestNow
        );
    }

    #[test]
    fn test_fallback_rise_without_profit_harvests_now() {
        // +25% but the haircut profit cannot beat now once storage dominates.
        let mut req = request(20.0, 25.0);
        req.yield_kg = 1.0;
        req.storage_cost_per_day = 100.0;
        assert_eq!(advisor().fallback_decision(&req), Action::HarvestNow);
    }
}
