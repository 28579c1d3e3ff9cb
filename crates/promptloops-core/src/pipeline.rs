//! End-to-end answer pipeline and the baseline-vs-variant comparison.
//!
//! A variant is a combination of three switches on top of the plain
//! baseline answer:
//!
//! - **A**: the intent-aware enhance gate (SOCIAL none, QA light, others full)
//! - **B**: critique and self-refine of the prompt before answering
//! - **C**: a route-specific answer instruction
//!
//! Refinement runs for every non-baseline variant. Without A every
//! non-SOCIAL route is refined with [`RewriteMode::Full`].

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

use promptloops_critic::{heuristic_critique, CritiqueEngine, CritiqueResult};
use promptloops_gen::{GenerationError, Generator};
use promptloops_judge::{GenerativeJudge, HeuristicJudge, Judge, JudgeType, JudgeVerdict};
use promptloops_logging::{LogEvent, Logger};
use promptloops_router::{
    classify_offline, enhance_mode_for, temperature_for, threshold_for, EnhanceMode,
    IntentResult, IntentRouter, Route,
};

use crate::error::PipelineError;
use crate::loop_runner::{RewriteMode, SelfRefiner};
use crate::RoundRecord;

/// Instruction for the unrouted baseline answer
pub const BASELINE_ANSWER_SYSTEM: &str = r#"You are a helpful assistant.
Answer the user's request as best as possible.
If critical information is missing, ask minimal clarifying questions or state brief assumptions.
Keep the response directly useful and not overly long."#;

/// Instruction for variants without route-specific answering
pub const GENERIC_ANSWER_SYSTEM: &str = r#"You are a helpful assistant.
Answer the user's request as best as possible.
If critical information is missing, ask minimal clarifying questions.
Keep it concise."#;

/// Route-specific answer instruction
pub fn answer_system_for(route: Route) -> &'static str {
    match route {
        Route::Social => {
            r#"You are a friendly, natural conversational partner.
Reply casually and briefly. Mirror the user's tone.
Do NOT turn greetings into tasks. Ask a light follow-up if appropriate."#
        }
        Route::Qa => {
            r#"You are a helpful assistant.
Answer clearly and accurately.
If information is missing, ask minimal clarifying questions.
Use bullet points when it helps."#
        }
        Route::Task => {
            r#"You are a practical assistant.
Do the task directly. If needed, ask ONLY the minimum clarifying questions.
Provide steps/checklists/templates when useful."#
        }
        Route::Tech => {
            r#"You are a senior technical assistant.
Be precise. Prefer correct, runnable solutions.
If code is needed, include code blocks.
If details are missing (language, environment, error logs), ask concise questions."#
        }
        Route::Creative => {
            r#"You are a creative writing assistant.
Be imaginative but follow the user's constraints.
If style is unspecified, pick a tasteful default."#
        }
    }
}

/// Which parts of the pipeline run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Variant {
    /// No routing, no rewrite, generic answer instruction
    Baseline,
    A,
    B,
    C,
    #[default]
    Abc,
}

impl Variant {
    /// Every variant, in sweep order
    pub const ALL: [Variant; 5] = [
        Variant::Baseline,
        Variant::A,
        Variant::B,
        Variant::C,
        Variant::Abc,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Baseline => "BASELINE",
            Variant::A => "A",
            Variant::B => "B",
            Variant::C => "C",
            Variant::Abc => "ABC",
        }
    }

    fn uses_enhance_gate(&self) -> bool {
        matches!(self, Variant::A | Variant::Abc)
    }

    fn uses_route_answers(&self) -> bool {
        matches!(self, Variant::C | Variant::Abc)
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Variant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BASELINE" => Ok(Variant::Baseline),
            "A" => Ok(Variant::A),
            "B" => Ok(Variant::B),
            "C" => Ok(Variant::C),
            "ABC" => Ok(Variant::Abc),
            _ => Err(format!("Unknown variant: {}", s)),
        }
    }
}

/// How the answer temperature is chosen
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TemperatureMode {
    /// Per-route lookup
    Auto,
    Fixed(f64),
}

impl TemperatureMode {
    fn resolve(&self, route: Route) -> f64 {
        match self {
            TemperatureMode::Auto => temperature_for(route),
            TemperatureMode::Fixed(t) => *t,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            TemperatureMode::Auto => "auto",
            TemperatureMode::Fixed(_) => "fixed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub variant: Variant,
    pub temperature: TemperatureMode,
    /// `None` derives the threshold from the classified intent
    pub threshold: Option<u32>,
    pub max_rounds: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            variant: Variant::Abc,
            temperature: TemperatureMode::Auto,
            threshold: None,
            max_rounds: 2,
        }
    }
}

/// Everything one pipeline run produced
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutput {
    pub route: Route,
    pub enhance_mode: EnhanceMode,
    pub temperature_used: f64,
    pub rewrite_threshold_used: Option<u32>,
    pub original_prompt: String,
    pub enhanced_prompt: String,
    pub answer: String,
    pub critique_original: Option<CritiqueResult>,
    pub critique_final: Option<CritiqueResult>,
    pub trace: Vec<RoundRecord>,
}

impl PipelineOutput {
    pub fn rewritten(&self) -> bool {
        self.enhanced_prompt.trim() != self.original_prompt.trim()
    }
}

/// Baseline (X) and variant (Y) answers to one query with both judges' verdicts
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonRecord {
    pub comparison_id: String,
    /// Stable digest of the run's inputs and outputs, for dedupe.
    /// Rows from one experiment share the experiment's digest.
    pub run_id: String,
    pub created_at: DateTime<Utc>,
    pub variant: Variant,
    pub temp_mode: String,
    pub threshold_mode: String,
    pub user_input: String,
    pub route: Route,
    pub temperature_used: f64,
    pub rewrite_threshold_used: Option<u32>,
    pub rewritten: bool,
    pub original_prompt: String,
    pub original_response: String,
    pub original_critique: Option<CritiqueResult>,
    pub original_heuristic: CritiqueResult,
    pub enhanced_prompt: String,
    pub enhanced_response: String,
    pub enhanced_critique: Option<CritiqueResult>,
    pub enhanced_heuristic: CritiqueResult,
    /// The generative verdict, or `{"error", "judge_type"}` when the judge call failed
    pub generative_verdict: serde_json::Value,
    pub heuristic_verdict: JudgeVerdict,
}

/// Several variants judged against one shared baseline answer
#[derive(Debug, Clone, Serialize)]
pub struct ExperimentReport {
    /// Shared by every row
    pub run_id: String,
    pub user_input: String,
    pub temperature_used: f64,
    pub baseline: PipelineOutput,
    /// One per distinct non-baseline variant, in request order
    pub rows: Vec<ComparisonRecord>,
}

/// Hex SHA-256 of the fields that identify a comparison run
pub fn compute_run_id(
    query: &str,
    route: Route,
    temperature: f64,
    threshold: Option<u32>,
    enhanced_prompt: &str,
    answer_x: &str,
    answer_y: &str,
) -> String {
    let threshold = threshold
        .map(|t| t.to_string())
        .unwrap_or_else(|| "None".to_string());
    let source = [
        query,
        route.as_str(),
        &format!("{:.3}", temperature),
        &threshold,
        enhanced_prompt,
        answer_x,
        answer_y,
    ]
    .join("|");

    hex::encode(Sha256::digest(source.as_bytes()))
}

/// Digest tying the rows of one experiment together
fn compute_experiment_id(query: &str, temperature: f64, rows: &[ComparisonRecord]) -> String {
    let mut source = format!("{}|{:.3}", query, temperature);
    for row in rows {
        source.push('|');
        source.push_str(row.variant.as_str());
        source.push(':');
        source.push_str(&row.run_id);
    }
    hex::encode(Sha256::digest(source.as_bytes()))
}

/// Routes, refines and answers queries with a single generator
pub struct Pipeline<'a> {
    generator: &'a dyn Generator,
    logger: Arc<Logger>,
}

impl<'a> Pipeline<'a> {
    pub fn new(generator: &'a dyn Generator, logger: Arc<Logger>) -> Self {
        Self { generator, logger }
    }

    /// Classify with generative fallback and log the verdict
    pub async fn classify(&self, text: &str) -> IntentResult {
        let intent = IntentRouter::new(self.generator).classify(text, true).await;
        self.logger.log(&LogEvent::IntentClassified {
            route: intent.route().to_string(),
            confidence: intent.confidence(),
            reason: intent.reason().to_string(),
        });
        intent
    }

    /// Answer `query` as is, with the generic baseline instruction
    pub async fn baseline_answer(
        &self,
        query: &str,
        temperature: f64,
    ) -> Result<String, GenerationError> {
        self.generator
            .generate_text(BASELINE_ANSWER_SYSTEM, query, temperature)
            .await
    }

    /// Run one variant of the pipeline over `query`
    pub async fn run(
        &self,
        query: &str,
        options: &PipelineOptions,
    ) -> Result<PipelineOutput, PipelineError> {
        let query = query.trim();

        if options.variant == Variant::Baseline {
            return self.run_baseline(query, options).await;
        }

        let intent = self.classify(query).await;
        let route = intent.route();
        let temperature_used = options.temperature.resolve(route);
        let threshold_used = options.threshold.unwrap_or_else(|| threshold_for(&intent));

        let enhance_mode = if options.variant.uses_enhance_gate() || route == Route::Social {
            enhance_mode_for(route)
        } else {
            EnhanceMode::Full
        };

        let critic = CritiqueEngine::new(self.generator);
        let critique_original = critic.critique(query).await?;

        let (enhanced_prompt, trace) = match RewriteMode::for_enhance(enhance_mode) {
            Some(mode) => {
                let outcome = SelfRefiner::new(self.generator, self.logger.clone())
                    .refine(query, threshold_used, options.max_rounds, mode)
                    .await?;
                (outcome.final_text, outcome.trace)
            }
            None => (query.to_string(), Vec::new()),
        };

        let critique_final = critic.critique(&enhanced_prompt).await?;

        let system = if options.variant.uses_route_answers() {
            answer_system_for(route)
        } else {
            GENERIC_ANSWER_SYSTEM
        };
        let answer = self
            .generator
            .generate_text(system, &enhanced_prompt, temperature_used)
            .await?;
        self.log_answer(route, temperature_used, &answer);

        Ok(PipelineOutput {
            route,
            enhance_mode,
            temperature_used,
            rewrite_threshold_used: Some(threshold_used),
            original_prompt: query.to_string(),
            enhanced_prompt,
            answer,
            critique_original: Some(critique_original),
            critique_final: Some(critique_final),
            trace,
        })
    }

    async fn run_baseline(
        &self,
        query: &str,
        options: &PipelineOptions,
    ) -> Result<PipelineOutput, PipelineError> {
        let temperature_used = match options.temperature {
            TemperatureMode::Fixed(t) => t,
            TemperatureMode::Auto => temperature_for(self.classify(query).await.route()),
        };

        let answer = self.baseline_answer(query, temperature_used).await?;
        self.log_answer(Route::Qa, temperature_used, &answer);

        Ok(PipelineOutput {
            route: Route::Qa,
            enhance_mode: EnhanceMode::None,
            temperature_used,
            rewrite_threshold_used: None,
            original_prompt: query.to_string(),
            enhanced_prompt: query.to_string(),
            answer,
            critique_original: None,
            critique_final: None,
            trace: Vec::new(),
        })
    }

    /// Answer `query` with the baseline (X) and with `options.variant` (Y),
    /// then judge the pair with both judges.
    ///
    /// Both sides share one temperature, picked from the rule-based route
    /// when the mode is auto. A failed generative judge call is recorded in
    /// the result rather than failing the comparison.
    pub async fn compare(
        &self,
        query: &str,
        options: &PipelineOptions,
    ) -> Result<ComparisonRecord, PipelineError> {
        let query = query.trim();
        let temperature_used = shared_temperature(query, options);
        let baseline = self.shared_baseline(query, options, temperature_used).await?;

        self.judge_variant(query, &baseline, options, temperature_used)
            .await
    }

    /// Run every variant in `variants` against a single baseline answer.
    ///
    /// The baseline is generated once and reused as X for each variant.
    /// `Baseline` entries and repeats are skipped; an empty list sweeps
    /// [`Variant::ALL`]. All rows carry the same `run_id`.
    pub async fn experiment(
        &self,
        query: &str,
        variants: &[Variant],
        options: &PipelineOptions,
    ) -> Result<ExperimentReport, PipelineError> {
        let query = query.trim();
        let all = Variant::ALL;
        let variants: &[Variant] = if variants.is_empty() { &all } else { variants };

        let temperature_used = shared_temperature(query, options);
        let baseline = self.shared_baseline(query, options, temperature_used).await?;

        let mut rows: Vec<ComparisonRecord> = Vec::new();
        for &variant in variants {
            if variant == Variant::Baseline || rows.iter().any(|r| r.variant == variant) {
                continue;
            }
            let variant_options = PipelineOptions {
                variant,
                ..options.clone()
            };
            let row = self
                .judge_variant(query, &baseline, &variant_options, temperature_used)
                .await?;
            rows.push(row);
        }

        let run_id = compute_experiment_id(query, temperature_used, &rows);
        for row in &mut rows {
            row.run_id = run_id.clone();
        }
        info!(run_id = %run_id, variants = rows.len(), "Experiment complete");

        Ok(ExperimentReport {
            run_id,
            user_input: query.to_string(),
            temperature_used,
            baseline,
            rows,
        })
    }

    async fn shared_baseline(
        &self,
        query: &str,
        options: &PipelineOptions,
        temperature_used: f64,
    ) -> Result<PipelineOutput, PipelineError> {
        self.run(
            query,
            &PipelineOptions {
                variant: Variant::Baseline,
                temperature: TemperatureMode::Fixed(temperature_used),
                ..options.clone()
            },
        )
        .await
    }

    /// Answer with `options.variant` and judge it against `baseline`
    async fn judge_variant(
        &self,
        query: &str,
        baseline: &PipelineOutput,
        options: &PipelineOptions,
        temperature_used: f64,
    ) -> Result<ComparisonRecord, PipelineError> {
        let enhanced = self
            .run(
                query,
                &PipelineOptions {
                    temperature: TemperatureMode::Fixed(temperature_used),
                    ..options.clone()
                },
            )
            .await?;

        let generative_verdict = match GenerativeJudge::new(self.generator)
            .judge(query, &baseline.answer, &enhanced.answer)
            .await
        {
            Ok(verdict) => {
                self.log_verdict(&verdict);
                serde_json::to_value(&verdict).unwrap_or_default()
            }
            Err(e) => {
                warn!(error = %e, "Generative judge failed, keeping heuristic verdict only");
                self.logger.log(&LogEvent::ErrorEncountered {
                    stage: "judge".to_string(),
                    error: e.to_string(),
                });
                json!({"error": e.to_string(), "judge_type": JudgeType::Generative})
            }
        };

        let heuristic_verdict =
            HeuristicJudge::new().verdict(query, &baseline.answer, &enhanced.answer);
        self.log_verdict(&heuristic_verdict);

        let run_id = compute_run_id(
            query,
            enhanced.route,
            enhanced.temperature_used,
            enhanced.rewrite_threshold_used,
            &enhanced.enhanced_prompt,
            &baseline.answer,
            &enhanced.answer,
        );
        info!(run_id = %run_id, variant = %options.variant, "Comparison complete");

        Ok(ComparisonRecord {
            comparison_id: uuid::Uuid::new_v4().to_string(),
            run_id,
            created_at: Utc::now(),
            variant: options.variant,
            temp_mode: options.temperature.label().to_string(),
            threshold_mode: if options.threshold.is_some() { "fixed" } else { "auto" }.to_string(),
            user_input: query.to_string(),
            route: enhanced.route,
            temperature_used: enhanced.temperature_used,
            rewrite_threshold_used: enhanced.rewrite_threshold_used,
            rewritten: enhanced.rewritten(),
            original_prompt: query.to_string(),
            original_response: baseline.answer.clone(),
            original_heuristic: heuristic_critique(query),
            enhanced_heuristic: heuristic_critique(&enhanced.enhanced_prompt),
            original_critique: enhanced.critique_original,
            enhanced_critique: enhanced.critique_final,
            enhanced_prompt: enhanced.enhanced_prompt,
            enhanced_response: enhanced.answer,
            generative_verdict,
            heuristic_verdict,
        })
    }

    fn log_answer(&self, route: Route, temperature: f64, answer: &str) {
        self.logger.log(&LogEvent::AnswerGenerated {
            route: route.to_string(),
            temperature,
            answer_len: answer.chars().count(),
        });
    }

    fn log_verdict(&self, verdict: &JudgeVerdict) {
        let judge_type = match verdict.judge_type {
            JudgeType::Generative => "generative",
            JudgeType::Heuristic => "heuristic",
        };
        self.logger.log(&LogEvent::JudgeCompleted {
            judge_type: judge_type.to_string(),
            winner: verdict.winner.to_string(),
            x_total: verdict.x.total(),
            y_total: verdict.y.total(),
        });
    }
}

/// Temperature both sides of a comparison answer at, from the rule-based route
fn shared_temperature(query: &str, options: &PipelineOptions) -> f64 {
    options.temperature.resolve(classify_offline(query).route())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_parse() {
        assert_eq!("abc".parse::<Variant>().unwrap(), Variant::Abc);
        assert_eq!("Baseline".parse::<Variant>().unwrap(), Variant::Baseline);
        assert!("AB".parse::<Variant>().is_err());
    }

    #[test]
    fn test_variant_switches() {
        assert!(Variant::Abc.uses_enhance_gate());
        assert!(Variant::Abc.uses_route_answers());
        assert!(Variant::A.uses_enhance_gate());
        assert!(!Variant::A.uses_route_answers());
        assert!(!Variant::B.uses_enhance_gate());
        assert!(Variant::C.uses_route_answers());
    }

    #[test]
    fn test_run_id_is_stable() {
        let a = compute_run_id("q", Route::Qa, 0.2, Some(12), "q?", "x", "y");
        let b = compute_run_id("q", Route::Qa, 0.2, Some(12), "q?", "x", "y");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);

        let c = compute_run_id("q", Route::Qa, 0.2004, Some(12), "q?", "x", "y");
        assert_eq!(a, c, "temperature is hashed at three decimals");

        let d = compute_run_id("q", Route::Qa, 0.2, None, "q?", "x", "y");
        assert_ne!(a, d);
    }

    #[test]
    fn test_temperature_mode() {
        assert_eq!(TemperatureMode::Auto.resolve(Route::Tech), 0.1);
        assert_eq!(TemperatureMode::Fixed(0.7).resolve(Route::Tech), 0.7);
        assert_eq!(TemperatureMode::Auto.label(), "auto");
    }

    #[test]
    fn test_every_route_has_an_answer_instruction() {
        for route in Route::ALL {
            assert!(!answer_system_for(route).is_empty());
        }
    }
}
