use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use promptloops_gen::{is_recovery_error, GenerationError, Generator};

use crate::{CriticPrompts, RubricScore, CRITIQUE_RANGE};

/// Edit used whenever the generator's suggestion is missing or unusable
pub const GENERIC_EDIT: &str =
    "Make the prompt clearer and better structured while preserving intent.";

/// One rubric critique of a prompt
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CritiqueResult {
    scores: RubricScore,
    total: i64,
    weakest: String,
    edit: String,
    reason: String,
}

impl CritiqueResult {
    /// Assemble a critique. `weakest` falls back to the lowest axis when it
    /// does not name one of `scores`.
    pub fn new(
        scores: RubricScore,
        weakest: impl Into<String>,
        edit: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        let weakest = weakest.into().trim().to_lowercase();
        let weakest = if scores.contains(&weakest) {
            weakest
        } else {
            scores.weakest().unwrap_or_default().to_string()
        };

        Self {
            total: scores.total(),
            scores,
            weakest,
            edit: edit.into(),
            reason: reason.into(),
        }
    }

    pub fn scores(&self) -> &RubricScore {
        &self.scores
    }

    /// Sum of every axis; this is what the refine loop compares to its threshold
    pub fn total(&self) -> i64 {
        self.total
    }

    pub fn weakest(&self) -> &str {
        &self.weakest
    }

    pub fn edit(&self) -> &str {
        &self.edit
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Turn whatever the critique call produced into a valid [`CritiqueResult`].
pub fn normalize_critique(data: &Map<String, Value>) -> CritiqueResult {
    let unparseable = is_recovery_error(data);

    let recovered = match data.get("scores") {
        Some(Value::Object(raw)) => {
            Some(RubricScore::from_map(raw, CRITIQUE_RANGE, &[])).filter(|s| !s.is_empty())
        }
        _ => None,
    };
    let scores_defaulted = recovered.is_none();
    let scores = recovered.unwrap_or_else(|| RubricScore::floor(CRITIQUE_RANGE));

    let weakest = data
        .get("weakest")
        .and_then(Value::as_str)
        .unwrap_or_default();

    let edit = data
        .get("edit")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|e| !e.is_empty() && !looks_like_json(e))
        .unwrap_or(GENERIC_EDIT);

    let mut reason = data
        .get("reason")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_string();

    if unparseable {
        let detail = data
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        reason = format!(
            "critique output unparseable, used conservative default ({})",
            detail
        );
    } else if scores_defaulted && reason.is_empty() {
        reason = "critique scores missing, used conservative default".to_string();
    }

    CritiqueResult::new(scores, weakest, edit, reason)
}

/// The generator sometimes echoes its own rubric back as the "edit"
fn looks_like_json(edit: &str) -> bool {
    edit.starts_with('{') || edit.starts_with('[') || edit.to_lowercase().contains("json")
}

/// Scores prompts against the rubric with a generative call
pub struct CritiqueEngine<'a> {
    generator: &'a dyn Generator,
}

impl<'a> CritiqueEngine<'a> {
    pub fn new(generator: &'a dyn Generator) -> Self {
        Self { generator }
    }

    /// Critique a single prompt.
    ///
    /// Malformed output is normalised into a valid result; only a transport
    /// failure of the generator is returned as an error.
    pub async fn critique(&self, prompt: &str) -> Result<CritiqueResult, GenerationError> {
        debug!(prompt_len = prompt.len(), "Running critique");

        let data = self
            .generator
            .generate_recovered(
                CriticPrompts::CRITIQUE_SYSTEM,
                &CriticPrompts::build_critique_input(prompt),
                0.0,
            )
            .await?;

        if is_recovery_error(&data) {
            warn!("Critique output unparseable, substituting defaults");
        }

        let result = normalize_critique(&data);
        info!(
            total = result.total(),
            weakest = result.weakest(),
            "Critique completed"
        );
        Ok(result)
    }
}
