use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

use promptloops_gen::{is_recovery_error, Generator};

use crate::prompts::CLASSIFIER_SYSTEM;
use crate::rules::rule_route;

/// Confidence used when a generator reports something that is not a number
const DEFAULT_CONFIDENCE: f64 = 0.5;
/// Confidence of the conservative verdict returned when the fallback fails
const FAILURE_CONFIDENCE: f64 = 0.3;
/// Confidence of the default verdict when the rules are silent and the
/// generative fallback is not allowed
const NO_FALLBACK_CONFIDENCE: f64 = 0.4;

/// Closed set of intent categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Route {
    Social,
    Qa,
    Task,
    Tech,
    Creative,
}

impl Route {
    pub const ALL: [Route; 5] = [
        Route::Social,
        Route::Qa,
        Route::Task,
        Route::Tech,
        Route::Creative,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Route::Social => "SOCIAL",
            Route::Qa => "QA",
            Route::Task => "TASK",
            Route::Tech => "TECH",
            Route::Creative => "CREATIVE",
        }
    }

    /// Coerce an untrusted value into the closed set. Anything that is not
    /// one of the five route names becomes [`Route::Qa`].
    pub fn coerce(value: Option<&Value>) -> Route {
        value
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
            .unwrap_or(Route::Qa)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Route {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "SOCIAL" => Ok(Route::Social),
            "QA" => Ok(Route::Qa),
            "TASK" => Ok(Route::Task),
            "TECH" => Ok(Route::Tech),
            "CREATIVE" => Ok(Route::Creative),
            _ => Err(format!("Unknown route: {}", s)),
        }
    }
}

/// Outcome of one classification. Confidence is always within `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntentResult {
    route: Route,
    confidence: f64,
    reason: String,
}

impl IntentResult {
    /// Build a result, clamping `confidence` into `[0, 1]` (NaN becomes 0.5)
    pub fn new(route: Route, confidence: f64, reason: impl Into<String>) -> Self {
        Self {
            route,
            confidence: clamp_confidence(confidence),
            reason: reason.into(),
        }
    }

    pub fn route(&self) -> Route {
        self.route
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Build a result from a recovered generator mapping
    fn from_generated(data: &Map<String, Value>) -> Self {
        let route = Route::coerce(data.get("route"));
        let confidence = match data.get("confidence") {
            Some(Value::Number(n)) => n.as_f64().unwrap_or(DEFAULT_CONFIDENCE),
            Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(DEFAULT_CONFIDENCE),
            _ => DEFAULT_CONFIDENCE,
        };
        let reason = data
            .get("reason")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim();
        Self::new(route, confidence, reason)
    }
}

fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        DEFAULT_CONFIDENCE
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Deterministic-only classification. Never calls a generator and never
/// fails: when the rules are silent the result is a low-confidence QA.
pub fn classify_offline(text: &str) -> IntentResult {
    rule_route(text).unwrap_or_else(|| {
        IntentResult::new(
            Route::Qa,
            NO_FALLBACK_CONFIDENCE,
            "default QA, generative fallback disabled",
        )
    })
}

/// Rules-first intent router with a generative fallback
pub struct IntentRouter<'a> {
    generator: &'a dyn Generator,
}

impl<'a> IntentRouter<'a> {
    pub fn new(generator: &'a dyn Generator) -> Self {
        Self { generator }
    }

    /// Classify `text` into exactly one route.
    ///
    /// This never returns an error: transport failures and unparseable
    /// generator output both degrade to a conservative QA verdict.
    pub async fn classify(&self, text: &str, allow_generative_fallback: bool) -> IntentResult {
        if let Some(result) = rule_route(text) {
            debug!(route = %result.route, reason = %result.reason, "Rule-based route");
            return result;
        }

        if !allow_generative_fallback {
            return classify_offline(text);
        }

        let user = format!("User message:\n{}\n", text);
        let result = match self
            .generator
            .generate_recovered(CLASSIFIER_SYSTEM, &user, 0.0)
            .await
        {
            Ok(data) if is_recovery_error(&data) => {
                let detail = data
                    .get("error")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown");
                warn!(error = detail, "Classifier output unparseable");
                IntentResult::new(
                    Route::Qa,
                    FAILURE_CONFIDENCE,
                    format!(
                        "classifier output unparseable, used conservative default ({})",
                        detail
                    ),
                )
            }
            Ok(data) => IntentResult::from_generated(&data),
            Err(e) => {
                warn!(error = %e, "Classifier call failed");
                IntentResult::new(
                    Route::Qa,
                    FAILURE_CONFIDENCE,
                    format!(
                        "classification unavailable, used conservative default ({})",
                        e
                    ),
                )
            }
        };

        info!(
            route = %result.route,
            confidence = result.confidence,
            "Generative route"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn generated(value: Value) -> IntentResult {
        match value {
            Value::Object(map) => IntentResult::from_generated(&map),
            _ => unreachable!("test fixtures are objects"),
        }
    }

    #[test]
    fn test_route_serializes_uppercase() {
        assert_eq!(serde_json::to_value(Route::Qa).unwrap(), json!("QA"));
        assert_eq!(serde_json::to_value(Route::Creative).unwrap(), json!("CREATIVE"));
    }

    #[test]
    fn test_route_parse_is_lenient_on_case() {
        assert_eq!(" tech ".parse::<Route>().unwrap(), Route::Tech);
        assert!("POETRY".parse::<Route>().is_err());
    }

    #[test]
    fn test_unknown_route_coerced_to_qa() {
        let result = generated(json!({"route": "SMALLTALK", "confidence": 0.9}));
        assert_eq!(result.route(), Route::Qa);
        assert!((result.confidence() - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_non_string_route_coerced_to_qa() {
        let result = generated(json!({"route": 3}));
        assert_eq!(result.route(), Route::Qa);
    }

    #[test]
    fn test_confidence_clamped_and_defaulted() {
        assert_eq!(generated(json!({"route": "TASK", "confidence": 7.5})).confidence(), 1.0);
        assert_eq!(generated(json!({"route": "TASK", "confidence": -2})).confidence(), 0.0);
        assert_eq!(generated(json!({"route": "TASK", "confidence": "high"})).confidence(), 0.5);
        assert_eq!(generated(json!({"route": "TASK", "confidence": "NaN"})).confidence(), 0.5);
        assert_eq!(generated(json!({"route": "TASK", "confidence": null})).confidence(), 0.5);
        assert_eq!(generated(json!({"route": "TASK"})).confidence(), 0.5);
        assert!((generated(json!({"route": "TASK", "confidence": "0.8"})).confidence() - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_new_clamps_nan() {
        let result = IntentResult::new(Route::Tech, f64::NAN, "x");
        assert_eq!(result.confidence(), 0.5);
    }

    #[test]
    fn test_offline_default_is_qa() {
        let result = classify_offline("the weather in lisbon");
        assert_eq!(result.route(), Route::Qa);
        assert_eq!(result.confidence(), 0.4);
    }
}
