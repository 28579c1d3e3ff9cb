use chrono::{DateTime, Utc};
use serde::Serialize;

use promptloops_critic::CritiqueResult;

use crate::outcome::{RefineOutcome, RefineStatus};

/// State carried across rounds of the refine loop
#[derive(Debug, Clone)]
pub struct RefineContext {
    /// Text as supplied by the caller, never trimmed
    pub original: String,
    /// Text the next round will critique
    pub current: String,
    /// Rounds completed so far
    pub round: usize,
    pub max_rounds: usize,
    pub threshold: u32,
    trace: Vec<RoundRecord>,
}

/// One critiqued round. Append-only; rounds are numbered from 1.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundRecord {
    pub round: usize,
    pub prompt: String,
    pub critique: CritiqueResult,
    pub total: i64,
    pub timestamp: DateTime<Utc>,
}

impl RefineContext {
    pub fn new(original: impl Into<String>, threshold: u32, max_rounds: usize) -> Self {
        let original = original.into();
        Self {
            current: original.clone(),
            original,
            round: 0,
            max_rounds,
            threshold,
            trace: Vec::new(),
        }
    }

    pub fn should_continue(&self) -> bool {
        self.round < self.max_rounds
    }

    /// Record the critique of the current text as a new round
    pub fn push_critique(&mut self, critique: CritiqueResult) -> &RoundRecord {
        self.round += 1;
        self.trace.push(RoundRecord {
            round: self.round,
            prompt: self.current.clone(),
            total: critique.total(),
            critique,
            timestamp: Utc::now(),
        });
        &self.trace[self.trace.len() - 1]
    }

    pub fn is_converged(&self, total: i64) -> bool {
        total >= i64::from(self.threshold)
    }

    pub fn last_total(&self) -> Option<i64> {
        self.trace.last().map(|r| r.total)
    }

    pub fn trace(&self) -> &[RoundRecord] {
        &self.trace
    }

    /// Close the run, handing the original text, current text and trace to the outcome
    pub fn into_outcome(self, status: RefineStatus) -> RefineOutcome {
        RefineOutcome::new(self.original, self.current, status, self.trace)
    }
}
