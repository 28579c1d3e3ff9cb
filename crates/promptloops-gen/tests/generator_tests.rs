use serde_json::json;

use promptloops_gen::{
    is_recovery_error, CliGenerator, GenerationError, Generator, GeneratorConfig, OutputKind,
    ScriptedGenerator,
};

#[tokio::test]
async fn test_scripted_replays_in_order_and_records_calls() {
    let generator = ScriptedGenerator::with_responses(["first", "second"]);

    let a = generator.generate_text("sys", "one", 0.2).await.unwrap();
    let b = generator.generate_structured("sys", "two", 0.0).await.unwrap();

    assert_eq!(a, "first");
    assert_eq!(b, "second");

    let calls = generator.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].kind, OutputKind::Text);
    assert_eq!(calls[1].kind, OutputKind::Structured);
    assert_eq!(calls[1].user, "two");
    assert!((calls[0].temperature - 0.2).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_scripted_failure_is_transport_error() {
    let generator = ScriptedGenerator::new();
    generator.push_failure("service down");

    let err = generator.generate_text("sys", "user", 0.0).await.unwrap_err();
    assert!(matches!(err, GenerationError::ExecutionFailed(ref m) if m == "service down"));

    // Exhausted script keeps failing rather than panicking
    assert!(generator.generate_text("sys", "user", 0.0).await.is_err());
}

#[tokio::test]
async fn test_generate_recovered_absorbs_fenced_output() {
    let generator = ScriptedGenerator::with_responses(["```json\n{\"route\": \"QA\"}\n```"]);
    let map = generator.generate_recovered("sys", "user", 0.0).await.unwrap();
    assert_eq!(map["route"], json!("QA"));
}

#[tokio::test]
async fn test_generate_recovered_garbage_is_error_record_not_err() {
    let generator = ScriptedGenerator::with_responses(["I cannot help with that."]);
    let map = generator.generate_recovered("sys", "user", 0.0).await.unwrap();
    assert!(is_recovery_error(&map));
}

#[tokio::test]
async fn test_missing_binary_is_not_found() {
    let generator = CliGenerator::with_binary_path(
        "/nonexistent/promptloops-model-cli".into(),
        GeneratorConfig::default(),
    );

    assert!(!generator.is_available().await);
    let err = generator.generate_text("sys", "user", 0.1).await.unwrap_err();
    assert!(matches!(err, GenerationError::NotFound(_)));
}
