use std::sync::Arc;

use promptloops_core::{RefineError, RefineStatus, RewriteMode, SelfRefiner};
use promptloops_critic::CriticPrompts;
use promptloops_gen::{OutputKind, ScriptedGenerator};
use promptloops_logging::Logger;

/// Total 10, weakest structure
const LOW_CRITIQUE: &str = r#"{"scores": {"intent": 2, "clarity": 2, "structure": 1, "safety": 5},
"weakest": "structure", "edit": "Add the audience and a length limit.", "reason": "Too vague."}"#;

/// Total 16, wrapped in a fence the way chat models often answer
const HIGH_CRITIQUE: &str = "```json\n{\"scores\": {\"intent\": 4, \"clarity\": 4, \"structure\": 3, \"safety\": 5}, \
\"weakest\": \"structure\", \"edit\": \"None needed.\", \"reason\": \"Clear.\"}\n```";

fn logger() -> Arc<Logger> {
    Arc::new(Logger::silent())
}

#[tokio::test]
async fn test_greeting_is_passed_through() {
    let generator = ScriptedGenerator::with_responses([LOW_CRITIQUE]);
    let refiner = SelfRefiner::new(&generator, logger());

    let outcome = refiner
        .refine("hi", 20, 2, RewriteMode::Light)
        .await
        .unwrap();

    assert_eq!(outcome.final_text, "hi");
    assert_eq!(outcome.status, RefineStatus::Passthrough);
    assert_eq!(outcome.trace.len(), 1);
    assert_eq!(generator.calls().len(), 1, "no rewrite call for social text");
}

#[tokio::test]
async fn test_converges_after_one_rewrite() {
    let generator = ScriptedGenerator::with_responses([
        LOW_CRITIQUE,
        "Draft a project update email for my team.",
        "Draft a short project update email for my engineering team covering progress and blockers.",
        HIGH_CRITIQUE,
    ]);
    let refiner = SelfRefiner::new(&generator, logger());

    let outcome = refiner
        .refine("project update email for team", 13, 3, RewriteMode::Full)
        .await
        .unwrap();

    assert!(outcome.is_converged());
    assert_eq!(outcome.rounds, 2);
    assert_eq!(
        outcome.final_text,
        "Draft a short project update email for my engineering team covering progress and blockers."
    );
    assert_eq!(outcome.last_total(), Some(16));

    let rounds: Vec<usize> = outcome.trace.iter().map(|r| r.round).collect();
    assert_eq!(rounds, vec![1, 2]);
    assert_eq!(outcome.trace[0].prompt, "project update email for team");
    assert_eq!(outcome.trace[0].total, 10);

    let calls = generator.calls();
    assert_eq!(calls.len(), 4);
    assert_eq!(calls[0].kind, OutputKind::Structured);
    assert_eq!(calls[0].temperature, 0.0);
    assert_eq!(calls[1].system, CriticPrompts::REWRITE_FULL_SYSTEM);
    assert_eq!(calls[1].temperature, 0.2);
    assert_eq!(calls[2].system, CriticPrompts::REVISE_SYSTEM);
    assert!(calls[2]
        .user
        .contains("Critic suggestion:\nAdd the audience and a length limit."));
}

#[tokio::test]
async fn test_exhausted_returns_last_text() {
    let generator = ScriptedGenerator::with_responses([
        LOW_CRITIQUE,
        "rewrite one",
        "revision one",
        LOW_CRITIQUE,
        "rewrite two",
        "revision two",
    ]);
    let refiner = SelfRefiner::new(&generator, logger());

    let outcome = refiner
        .refine("summarize the meeting", 18, 2, RewriteMode::Light)
        .await
        .unwrap();

    assert_eq!(outcome.status, RefineStatus::Exhausted);
    assert_eq!(outcome.final_text, "revision two");
    assert!(outcome.trace.len() <= 2);
    assert_eq!(outcome.trace[1].prompt, "revision one");
    assert_eq!(
        generator.calls()[1].system,
        CriticPrompts::REWRITE_LIGHT_SYSTEM
    );
}

#[tokio::test]
async fn test_zero_rounds_makes_no_calls() {
    let generator = ScriptedGenerator::new();
    let refiner = SelfRefiner::new(&generator, logger());

    let outcome = refiner
        .refine("  keep my spacing  ", 10, 0, RewriteMode::Full)
        .await
        .unwrap();

    assert_eq!(outcome.status, RefineStatus::Exhausted);
    assert!(outcome.trace.is_empty());
    assert_eq!(outcome.final_text, "  keep my spacing  ");
    assert_eq!(outcome.original, "  keep my spacing  ");
    assert!(!outcome.changed());
    assert!(generator.calls().is_empty());
}

#[tokio::test]
async fn test_blank_rewrites_keep_previous_text() {
    let generator = ScriptedGenerator::with_responses([LOW_CRITIQUE, "", "   "]);
    let refiner = SelfRefiner::new(&generator, logger());

    let outcome = refiner
        .refine("fix the login bug", 19, 1, RewriteMode::Full)
        .await
        .unwrap();

    assert_eq!(outcome.final_text, "fix the login bug");
    // The revise pass still saw the unchanged candidate
    assert!(generator.calls()[2]
        .user
        .starts_with("Original prompt:\nfix the login bug\n"));
}

#[tokio::test]
async fn test_text_drifting_to_social_stops_rewriting() {
    let generator = ScriptedGenerator::with_responses([
        LOW_CRITIQUE,
        "hello there",
        "hello there",
        LOW_CRITIQUE,
    ]);
    let refiner = SelfRefiner::new(&generator, logger());

    let outcome = refiner
        .refine("make it nicer", 18, 3, RewriteMode::Full)
        .await
        .unwrap();

    assert_eq!(outcome.status, RefineStatus::Passthrough);
    assert_eq!(outcome.final_text, "hello there");
    assert_eq!(outcome.trace.len(), 2);
    assert_eq!(generator.remaining(), 0);
}

#[tokio::test]
async fn test_transport_failure_propagates() {
    let generator = ScriptedGenerator::new();
    generator.push_response(LOW_CRITIQUE);
    generator.push_failure("connection reset");
    let refiner = SelfRefiner::new(&generator, logger());

    let err = refiner
        .refine("write a haiku about rain", 15, 2, RewriteMode::Full)
        .await
        .unwrap_err();

    assert!(matches!(err, RefineError::Generation(_)));
    assert!(err.to_string().contains("connection reset"));
}

#[tokio::test]
async fn test_unparseable_critique_still_rewrites() {
    let generator = ScriptedGenerator::with_responses([
        "I think this prompt is fine overall.",
        "Explain how tides work.",
        "Explain how ocean tides work, in three short paragraphs.",
    ]);
    let refiner = SelfRefiner::new(&generator, logger());

    let outcome = refiner
        .refine("tides??", 12, 1, RewriteMode::Light)
        .await
        .unwrap();

    assert_eq!(outcome.trace[0].total, 0);
    assert!(outcome.trace[0]
        .critique
        .reason()
        .starts_with("critique output unparseable"));
    assert_eq!(
        outcome.final_text,
        "Explain how ocean tides work, in three short paragraphs."
    );
}
