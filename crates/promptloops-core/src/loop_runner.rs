use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use promptloops_critic::{CriticPrompts, CritiqueEngine};
use promptloops_gen::{GenerationError, Generator};
use promptloops_logging::{LogEvent, Logger};
use promptloops_router::{classify_offline, EnhanceMode, Route};

use crate::context::RefineContext;
use crate::error::RefineError;
use crate::outcome::{RefineOutcome, RefineStatus};

/// Sampling temperature of both rewrite passes
const REWRITE_TEMPERATURE: f64 = 0.2;

/// Edit intensity of the structural rewrite pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RewriteMode {
    #[default]
    Full,
    Light,
}

impl RewriteMode {
    fn system(&self) -> &'static str {
        match self {
            RewriteMode::Full => CriticPrompts::REWRITE_FULL_SYSTEM,
            RewriteMode::Light => CriticPrompts::REWRITE_LIGHT_SYSTEM,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RewriteMode::Full => "full",
            RewriteMode::Light => "light",
        }
    }

    /// Rewrite mode behind an enhance gate decision; `None` means no rewriting
    pub fn for_enhance(mode: EnhanceMode) -> Option<Self> {
        match mode {
            EnhanceMode::None => None,
            EnhanceMode::Light => Some(RewriteMode::Light),
            EnhanceMode::Full => Some(RewriteMode::Full),
        }
    }
}

impl std::str::FromStr for RewriteMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "full" => Ok(RewriteMode::Full),
            "light" => Ok(RewriteMode::Light),
            _ => Err(format!("Unknown rewrite mode: {}", s)),
        }
    }
}

/// Critique-and-rewrite loop over a single prompt
pub struct SelfRefiner<'a> {
    generator: &'a dyn Generator,
    logger: Arc<Logger>,
}

impl<'a> SelfRefiner<'a> {
    pub fn new(generator: &'a dyn Generator, logger: Arc<Logger>) -> Self {
        Self { generator, logger }
    }

    /// Refine `original` until a critique total reaches `threshold` or
    /// `max_rounds` critiques have run.
    ///
    /// Running out of rounds is not an error: the last text is returned with
    /// [`RefineStatus::Exhausted`]. Generation failures stop the loop and
    /// propagate unchanged; nothing is retried here.
    pub async fn refine(
        &self,
        original: &str,
        threshold: u32,
        max_rounds: usize,
        mode: RewriteMode,
    ) -> Result<RefineOutcome, RefineError> {
        let mut context = RefineContext::new(original, threshold, max_rounds);
        let critic = CritiqueEngine::new(self.generator);

        self.logger.log(&LogEvent::RefineStarted {
            prompt_preview: original.chars().take(100).collect(),
            threshold,
            max_rounds,
            mode: mode.as_str().to_string(),
        });

        while context.should_continue() {
            let critique = critic.critique(&context.current).await?;
            let (round, total, edit) = {
                let record = context.push_critique(critique);
                self.logger.log(&LogEvent::RoundCritiqued {
                    round: record.round,
                    total: record.total,
                    threshold,
                    weakest: record.critique.weakest().to_string(),
                });
                (record.round, record.total, record.critique.edit().to_string())
            };

            if context.is_converged(total) {
                info!(round, total, threshold, "Refine converged");
                self.logger
                    .log(&LogEvent::RefineConverged { rounds: round, total });
                return Ok(context.into_outcome(RefineStatus::Converged));
            }

            // SOCIAL text is never rewritten, whatever earlier rounds did to it
            if classify_offline(&context.current).route() == Route::Social {
                debug!(round, "Social text, leaving unchanged");
                self.logger.log(&LogEvent::PassthroughApplied { round });
                return Ok(context.into_outcome(RefineStatus::Passthrough));
            }

            let rewritten = self.rewrite(&context.current, &edit, mode).await?;
            self.logger.log(&LogEvent::RoundRewritten {
                round,
                prompt_preview: rewritten.chars().take(100).collect(),
            });
            context.current = rewritten;
        }

        info!(rounds = context.round, "Refine round budget exhausted");
        self.logger.log(&LogEvent::RefineExhausted {
            rounds: context.round,
            last_total: context.last_total(),
        });
        Ok(context.into_outcome(RefineStatus::Exhausted))
    }

    /// Structural rewrite followed by a pass that applies only the critic's edit
    async fn rewrite(
        &self,
        text: &str,
        edit: &str,
        mode: RewriteMode,
    ) -> Result<String, GenerationError> {
        let candidate = self
            .generator
            .generate_text(mode.system(), text, REWRITE_TEMPERATURE)
            .await?;
        let candidate = non_empty_or(candidate, text);

        let revised = self
            .generator
            .generate_text(
                CriticPrompts::REVISE_SYSTEM,
                &CriticPrompts::build_revision_input(&candidate, edit),
                REWRITE_TEMPERATURE,
            )
            .await?;
        Ok(non_empty_or(revised, &candidate))
    }
}

/// Trimmed generator output, or `previous` when the output is blank
fn non_empty_or(output: String, previous: &str) -> String {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        previous.to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rewrite_mode_parse() {
        assert_eq!("LIGHT".parse::<RewriteMode>().unwrap(), RewriteMode::Light);
        assert_eq!(" full ".parse::<RewriteMode>().unwrap(), RewriteMode::Full);
        assert!("heavy".parse::<RewriteMode>().is_err());
    }

    #[test]
    fn test_enhance_gate_mapping() {
        assert_eq!(RewriteMode::for_enhance(EnhanceMode::None), None);
        assert_eq!(
            RewriteMode::for_enhance(EnhanceMode::Light),
            Some(RewriteMode::Light)
        );
        assert_eq!(
            RewriteMode::for_enhance(EnhanceMode::Full),
            Some(RewriteMode::Full)
        );
    }

    #[test]
    fn test_blank_output_keeps_previous_text() {
        assert_eq!(non_empty_or("   \n".to_string(), "before"), "before");
        assert_eq!(non_empty_or("  after \n".to_string(), "before"), "after");
    }
}
