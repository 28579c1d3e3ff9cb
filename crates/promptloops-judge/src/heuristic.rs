//! Deterministic pairwise judge.
//!
//! Scores each response from surface signals only: lexical overlap with the
//! query's content words, length bands, list/step markup and hedging
//! language. The same inputs always produce the same verdict.

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeSet;
use tracing::debug;

use promptloops_critic::{has_list_markup, Axis, RubricScore, JUDGE_RANGE};

use crate::{Judge, JudgeError, JudgeType, JudgeVerdict, SideScore, Winner};

/// Totals must differ by more than this for a winner to be declared
pub const TIE_MARGIN: i64 = 1;

const SIDE_NOTES: &str = "Heuristic scores based on overlap, length, and structure signals.";

lazy_static! {
    static ref CONTENT_WORD: Regex = Regex::new(r"[A-Za-z]{4,}").expect("word pattern is valid");
    static ref HEDGING: Regex = Regex::new(
        r"(?i)\b(depends|cannot|can't|limitations?|trade-?offs?|uncertain|not sure|may vary|consult)\b"
    )
    .expect("hedging pattern is valid");
}

/// Offline judge; never calls a generator
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicJudge;

impl HeuristicJudge {
    pub fn new() -> Self {
        Self
    }

    /// Compare two responses. Infallible and deterministic.
    pub fn verdict(&self, query: &str, response_x: &str, response_y: &str) -> JudgeVerdict {
        let x = score_response(query, response_x);
        let y = score_response(query, response_y);

        let (sx, sy) = (x.total(), y.total());
        let (winner, reason) = if (sx - sy).abs() <= TIE_MARGIN {
            (Winner::Tie, "Scores are very close under heuristic signals.")
        } else if sx > sy {
            (
                Winner::X,
                "X scores higher on heuristic overlap/structure signals.",
            )
        } else {
            (
                Winner::Y,
                "Y scores higher on heuristic overlap/structure signals.",
            )
        };

        debug!(x_total = sx, y_total = sy, %winner, "Heuristic judge completed");

        JudgeVerdict {
            x,
            y,
            winner,
            reason: reason.to_string(),
            judge_type: JudgeType::Heuristic,
        }
    }
}

#[async_trait]
impl Judge for HeuristicJudge {
    fn judge_type(&self) -> JudgeType {
        JudgeType::Heuristic
    }

    async fn judge(
        &self,
        query: &str,
        response_x: &str,
        response_y: &str,
    ) -> Result<JudgeVerdict, JudgeError> {
        Ok(self.verdict(query, response_x, response_y))
    }
}

fn to_axis(value: f64) -> i64 {
    value.round_ties_even() as i64
}

fn score_response(query: &str, response: &str) -> SideScore {
    let r = response.trim();
    let r_lower = r.to_lowercase();
    let q_lower = query.trim().to_lowercase();

    let n_words = r.split_whitespace().count();
    let has_steps = has_list_markup(r);
    let asks_back = r.contains('?');
    let hedges = HEDGING.is_match(r);

    let content_words: BTreeSet<&str> = CONTENT_WORD
        .find_iter(&q_lower)
        .map(|m| m.as_str())
        .collect();
    let overlap = content_words
        .iter()
        .filter(|word| r_lower.contains(*word))
        .count();

    let intent = 2.5
        + if overlap >= 2 { 1.0 } else { 0.0 }
        + if n_words >= 25 { 1.0 } else { 0.0 };
    let clarity = 2.5
        + if r.contains('.') { 0.5 } else { 0.0 }
        + if n_words <= 250 { 0.5 } else { -0.5 };
    let structure = 2.0
        + if has_steps {
            1.0
        } else if n_words <= 120 {
            0.5
        } else {
            0.0
        };
    let safety = 4.5 + if hedges || asks_back { 0.5 } else { 0.0 };

    let scores = RubricScore::from_axes(
        [
            (Axis::Intent, to_axis(intent)),
            (Axis::Clarity, to_axis(clarity)),
            (Axis::Structure, to_axis(structure)),
            (Axis::Safety, to_axis(safety)),
        ],
        JUDGE_RANGE,
    );

    SideScore::new(scores, SIDE_NOTES)
}
