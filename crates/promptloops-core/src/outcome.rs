use serde::Serialize;

use crate::RoundRecord;

/// How the refine loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefineStatus {
    /// A critique total reached the threshold
    Converged,
    /// The text classified as SOCIAL and was left as is
    Passthrough,
    /// The round budget ran out; the last text is still the result
    Exhausted,
}

/// Final text of a refine run plus its trace
#[derive(Debug, Clone, Serialize)]
pub struct RefineOutcome {
    /// Text the run started from
    pub original: String,
    pub final_text: String,
    pub status: RefineStatus,
    pub rounds: usize,
    pub trace: Vec<RoundRecord>,
}

impl RefineOutcome {
    pub fn new(
        original: String,
        final_text: String,
        status: RefineStatus,
        trace: Vec<RoundRecord>,
    ) -> Self {
        Self {
            original,
            final_text,
            status,
            rounds: trace.len(),
            trace,
        }
    }

    pub fn is_converged(&self) -> bool {
        self.status == RefineStatus::Converged
    }

    /// Whether the final text differs from what the caller supplied
    pub fn changed(&self) -> bool {
        self.final_text != self.original
    }

    /// Total of the last critiqued round, if any round ran
    pub fn last_total(&self) -> Option<i64> {
        self.trace.last().map(|r| r.total)
    }
}
