use serde::{Deserialize, Serialize};
use std::fmt;

use promptloops_critic::RubricScore;

/// Outcome of a pairwise comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Winner {
    X,
    Y,
    #[serde(rename = "tie")]
    Tie,
}

impl Winner {
    /// Parse a generator-provided winner; only X, Y and tie are accepted
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "x" => Some(Winner::X),
            "y" => Some(Winner::Y),
            "tie" => Some(Winner::Tie),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Winner::X => "X",
            Winner::Y => "Y",
            Winner::Tie => "tie",
        }
    }
}

impl fmt::Display for Winner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which implementation produced a verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JudgeType {
    Generative,
    Heuristic,
}

/// Rubric scores plus a one-line note for one side of a comparison
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SideScore {
    #[serde(flatten)]
    pub scores: RubricScore,
    pub notes: String,
}

impl SideScore {
    pub fn new(scores: RubricScore, notes: impl Into<String>) -> Self {
        Self {
            scores,
            notes: notes.into(),
        }
    }

    pub fn total(&self) -> i64 {
        self.scores.total()
    }
}

/// Result of one pairwise comparison
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JudgeVerdict {
    #[serde(rename = "X")]
    pub x: SideScore,
    #[serde(rename = "Y")]
    pub y: SideScore,
    pub winner: Winner,
    pub reason: String,
    pub judge_type: JudgeType,
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptloops_critic::{Axis, JUDGE_RANGE};
    use serde_json::json;

    #[test]
    fn test_winner_parse() {
        assert_eq!(Winner::parse(" x "), Some(Winner::X));
        assert_eq!(Winner::parse("Y"), Some(Winner::Y));
        assert_eq!(Winner::parse("TIE"), Some(Winner::Tie));
        assert_eq!(Winner::parse("X|Y|tie"), None);
        assert_eq!(Winner::parse("both"), None);
    }

    #[test]
    fn test_verdict_json_shape() {
        let side = |v| {
            SideScore::new(
                RubricScore::from_axes(
                    [
                        (Axis::Intent, v),
                        (Axis::Clarity, v),
                        (Axis::Structure, v),
                        (Axis::Safety, v),
                    ],
                    JUDGE_RANGE,
                ),
                "ok",
            )
        };
        let verdict = JudgeVerdict {
            x: side(3),
            y: side(4),
            winner: Winner::Y,
            reason: "Y is clearer".into(),
            judge_type: JudgeType::Heuristic,
        };

        assert_eq!(
            serde_json::to_value(&verdict).unwrap(),
            json!({
                "X": {"intent": 3, "clarity": 3, "structure": 3, "safety": 3, "notes": "ok"},
                "Y": {"intent": 4, "clarity": 4, "structure": 4, "safety": 4, "notes": "ok"},
                "winner": "Y",
                "reason": "Y is clearer",
                "judge_type": "heuristic"
            })
        );
    }
}
