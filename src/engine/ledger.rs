//! Decision ledger — append-only history plus the pending set.
//!
//! Decisions and outcomes are only ever appended; the pending set is the
//! one mutable structure, and each entry leaves it exactly once.

use std::collections::HashMap;

use uuid::Uuid;

use crate::types::{Decision, EngineError, Outcome, PendingDecision};

/// Bookkeeping for issued decisions and observed outcomes.
///
/// Every `Decision` recorded here also creates a `PendingDecision` keyed by
/// its id. Resolving removes the pending entry and is the only way to do so,
/// which is what makes resolve() exactly-once at the engine level.
#[derive(Debug, Default)]
pub struct DecisionLedger {
    decisions: Vec<Decision>,
    outcomes: Vec<Outcome>,
    pending: HashMap<Uuid, PendingDecision>,
}

impl DecisionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a decision and open its pending entry.
    pub fn record_decision(&mut self, decision: &Decision) {
        self.pending.insert(
            decision.id,
            PendingDecision {
                id: decision.id,
                action: decision.chosen_action,
                issued_at: decision.issued_at,
                matures_at: decision.matures_at,
            },
        );
        self.decisions.push(decision.clone());
    }

    /// Close the pending entry for `id`, returning it.
    pub fn resolve(&mut self, id: Uuid) -> Result<PendingDecision, EngineError> {
        self.pending
            .remove(&id)
            .ok_or(EngineError::UnknownDecision(id))
    }

    /// Append an observed outcome.
    pub fn record_outcome(&mut self, outcome: Outcome) {
        self.outcomes.push(outcome);
    }

    pub fn decisions(&self) -> &[Decision] {
        &self.decisions
    }

    /// The most recent `n` decisions, oldest first.
    pub fn recent_decisions(&self, n: usize) -> &[Decision] {
        let start = self.decisions.len().saturating_sub(n);
        &self.decisions[start..]
    }

    pub fn outcomes(&self) -> &[Outcome] {
        &self.outcomes
    }

    /// Pending decisions ordered by issue time.
    pub fn pending(&self) -> Vec<PendingDecision> {
        let mut entries: Vec<PendingDecision> = self.pending.values().cloned().collect();
        entries.sort_by_key(|p| p.issued_at);
        entries
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Replace the outcome log (snapshot restore).
    pub fn restore_outcomes(&mut self, outcomes: Vec<Outcome>) {
        self.outcomes = outcomes;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
