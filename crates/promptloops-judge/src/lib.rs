//! # promptloops-judge
//!
//! Pairwise comparison of two finished responses to the same query.
//!
//! Two independent implementations share the [`JudgeVerdict`] shape:
//!
//! - [`GenerativeJudge`] - one generator call scoring X and Y independently
//! - [`HeuristicJudge`] - deterministic surface signals, no external calls
//!
//! The heuristic judge is always available, so callers can fall back to it
//! when the generation service is down.

mod generative;
mod heuristic;
mod verdict;

pub use generative::{GenerativeJudge, JUDGE_SYSTEM};
pub use heuristic::{HeuristicJudge, TIE_MARGIN};
pub use verdict::{JudgeType, JudgeVerdict, SideScore, Winner};

use async_trait::async_trait;
use promptloops_gen::GenerationError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum JudgeError {
    #[error("Judge generation failed: {0}")]
    Generation(#[from] GenerationError),
}

/// A pairwise judge of two responses to `query`
#[async_trait]
pub trait Judge: Send + Sync {
    fn judge_type(&self) -> JudgeType;

    async fn judge(
        &self,
        query: &str,
        response_x: &str,
        response_y: &str,
    ) -> Result<JudgeVerdict, JudgeError>;
}
