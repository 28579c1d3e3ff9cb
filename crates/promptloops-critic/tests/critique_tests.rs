use promptloops_critic::{CritiqueEngine, CriticPrompts, GENERIC_EDIT};
use promptloops_gen::{GenerationError, OutputKind, ScriptedGenerator};

#[tokio::test]
async fn test_critique_recovers_prose_wrapped_json() {
    let generator = ScriptedGenerator::with_responses([r#"Here's my review:
```json
{"scores": {"intent": 4, "clarity": 2, "structure": 2, "safety": 5},
 "weakest": "clarity", "edit": "Name the programming language.", "reason": "Language unspecified."}
```"#]);
    let engine = CritiqueEngine::new(&generator);

    let result = engine.critique("sort a list").await.unwrap();

    assert_eq!(result.total(), 13);
    assert_eq!(result.weakest(), "clarity");
    assert_eq!(result.edit(), "Name the programming language.");

    let calls = generator.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].kind, OutputKind::Structured);
    assert_eq!(calls[0].system, CriticPrompts::CRITIQUE_SYSTEM);
    assert_eq!(calls[0].user, "Original prompt:\nsort a list\n");
    assert_eq!(calls[0].temperature, 0.0);
}

#[tokio::test]
async fn test_critique_garbage_is_not_an_error() {
    let generator = ScriptedGenerator::with_responses(["no idea"]);
    let engine = CritiqueEngine::new(&generator);

    let result = engine.critique("sort a list").await.unwrap();

    assert_eq!(result.total(), 0);
    assert_eq!(result.edit(), GENERIC_EDIT);
}

#[tokio::test]
async fn test_critique_transport_failure_propagates() {
    let generator = ScriptedGenerator::new();
    generator.push_failure("503 from upstream");
    let engine = CritiqueEngine::new(&generator);

    let err = engine.critique("sort a list").await.unwrap_err();
    assert!(matches!(err, GenerationError::ExecutionFailed(_)));
}
