//! Offline simulation harness.
//!
//! Generates synthetic market scenarios with a known best action and
//! replays them through a live engine to measure decision quality.

pub mod runner;
pub mod scenarios;
