//! Sampling and rewrite policy.
//!
//! Temperature is a fixed per-route table. The rewrite threshold blends a
//! per-route base with a conservative floor, weighted by classification
//! confidence, so an uncertain route drifts toward the floor whatever it is.

use serde::{Deserialize, Serialize};

use crate::{IntentResult, Route};

/// Threshold used when confidence is zero
pub const THRESHOLD_FLOOR: u32 = 9;
pub const THRESHOLD_MIN: u32 = 4;
pub const THRESHOLD_MAX: u32 = 20;

/// How aggressively a prompt is rewritten before answering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EnhanceMode {
    /// Passthrough, no rewriting at all
    None,
    /// Minimal edits for ambiguity and grammar
    Light,
    /// Full structural rewrite
    Full,
}

/// Sampling temperature and refine-loop acceptance threshold for one request
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Policy {
    pub temperature: f64,
    pub rewrite_threshold: u32,
}

impl Policy {
    pub fn for_intent(intent: &IntentResult) -> Self {
        Self {
            temperature: temperature_for(intent.route()),
            rewrite_threshold: threshold_for(intent),
        }
    }
}

/// Answer sampling temperature by route
pub fn temperature_for(route: Route) -> f64 {
    match route {
        Route::Social => 0.8,
        Route::Creative => 1.0,
        Route::Qa => 0.2,
        Route::Tech => 0.1,
        Route::Task => 0.35,
    }
}

fn base_threshold(route: Route) -> u32 {
    match route {
        // Never reached in practice: SOCIAL input is passed through unchanged
        Route::Social => 20,
        Route::Qa => 13,
        Route::Task => 15,
        Route::Tech => 14,
        Route::Creative => 11,
    }
}

/// Minimum critique total at which the refine loop stops rewriting.
///
/// `round(base * confidence + floor * (1 - confidence))`, rounded half to
/// even and clamped into `[THRESHOLD_MIN, THRESHOLD_MAX]`.
pub fn threshold_for(intent: &IntentResult) -> u32 {
    let confidence = intent.confidence();
    let base = f64::from(base_threshold(intent.route()));
    let floor = f64::from(THRESHOLD_FLOOR);

    let blended = (base * confidence + floor * (1.0 - confidence)).round_ties_even();
    (blended as i64).clamp(i64::from(THRESHOLD_MIN), i64::from(THRESHOLD_MAX)) as u32
}

/// Intent-aware rewrite gate
pub fn enhance_mode_for(route: Route) -> EnhanceMode {
    match route {
        Route::Social => EnhanceMode::None,
        Route::Qa => EnhanceMode::Light,
        Route::Task | Route::Tech | Route::Creative => EnhanceMode::Full,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intent(route: Route, confidence: f64) -> IntentResult {
        IntentResult::new(route, confidence, "test")
    }

    #[test]
    fn test_full_confidence_is_base() {
        assert_eq!(threshold_for(&intent(Route::Social, 1.0)), 20);
        assert_eq!(threshold_for(&intent(Route::Qa, 1.0)), 13);
        assert_eq!(threshold_for(&intent(Route::Task, 1.0)), 15);
        assert_eq!(threshold_for(&intent(Route::Tech, 1.0)), 14);
        assert_eq!(threshold_for(&intent(Route::Creative, 1.0)), 11);
    }

    #[test]
    fn test_zero_confidence_is_floor() {
        for route in Route::ALL {
            assert_eq!(threshold_for(&intent(route, 0.0)), THRESHOLD_FLOOR);
        }
    }

    #[test]
    fn test_blending() {
        // 15 * 0.7 + 9 * 0.3 = 13.2
        assert_eq!(threshold_for(&intent(Route::Task, 0.7)), 13);
        // 13 * 0.65 + 9 * 0.35 = 11.6
        assert_eq!(threshold_for(&intent(Route::Qa, 0.65)), 12);
        // 11 * 0.75 + 9 * 0.25 = 10.5, ties go to even
        assert_eq!(threshold_for(&intent(Route::Creative, 0.75)), 10);
    }

    #[test]
    fn test_threshold_always_in_range() {
        for route in Route::ALL {
            for step in 0..=20 {
                let t = threshold_for(&intent(route, f64::from(step) / 20.0));
                assert!((THRESHOLD_MIN..=THRESHOLD_MAX).contains(&t));
            }
        }
    }

    #[test]
    fn test_temperature_table() {
        assert_eq!(temperature_for(Route::Creative), 1.0);
        assert_eq!(temperature_for(Route::Tech), 0.1);
        assert!(temperature_for(Route::Social) > temperature_for(Route::Qa));
    }

    #[test]
    fn test_policy_for_intent() {
        let policy = Policy::for_intent(&intent(Route::Tech, 0.85));
        assert_eq!(policy.temperature, 0.1);
        // 14 * 0.85 + 9 * 0.15 = 13.25
        assert_eq!(policy.rewrite_threshold, 13);
    }

    #[test]
    fn test_enhance_gate() {
        assert_eq!(enhance_mode_for(Route::Social), EnhanceMode::None);
        assert_eq!(enhance_mode_for(Route::Qa), EnhanceMode::Light);
        assert_eq!(enhance_mode_for(Route::Tech), EnhanceMode::Full);
    }
}
