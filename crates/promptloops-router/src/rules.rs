//! Deterministic routing rules.
//!
//! Rules are ordered from the most certain and cheapest to the least, so the
//! first match wins.

use lazy_static::lazy_static;
use regex::Regex;

use crate::{IntentResult, Route};

/// Inputs at or below this many characters count as "short"
const SHORT_INPUT_CHARS: usize = 12;
/// Greetings with at most this many words are still small-talk
const GREETING_MAX_WORDS: usize = 8;

lazy_static! {
    static ref SOCIAL: Regex = Regex::new(
        r"(?i)^\s*(hi|hey|hello|yo|hii|hiii|sup|what's up|whats up|good\s+morning|good\s+afternoon|good\s+evening|how\s+are\s+you)\b.*$"
    )
    .expect("social pattern is valid");
    static ref TECH: Regex = Regex::new(
        r"(?i)\b(traceback|stack\s*trace|exception|error|bug|debug|python|java|javascript|typescript|sql|select\b|join\b|power\s*bi|dax|m\s*code|streamlit|pip|conda|npm|git|docker|api|http\s*\d\d\d|json|yaml)\b"
    )
    .expect("tech pattern is valid");
    static ref CREATIVE: Regex = Regex::new(
        r"(?i)\b(story|poem|rap|lyrics|fantasy|character|plot|brainstorm|ideas|creative)\b"
    )
    .expect("creative pattern is valid");
    static ref TASK_VERBS: Regex = Regex::new(
        r"(?i)\b(draft|write|create|make|build|generate|design|plan|summarize|summarise|compare|review|fix|refactor|implement|convert|translate|explain\s+step\s+by\s+step)\b"
    )
    .expect("task pattern is valid");
    static ref WH_WORD: Regex = Regex::new(r"(?i)\b(what|why|how|when|where|which|who)\b")
        .expect("wh-word pattern is valid");
}

/// Apply the deterministic rules. `None` means no rule fired.
pub fn rule_route(text: &str) -> Option<IntentResult> {
    let t = text.trim();
    if t.is_empty() {
        return Some(IntentResult::new(Route::Social, 0.6, "empty/blank"));
    }

    let greeting = SOCIAL.is_match(t);

    if greeting && t.chars().count() <= SHORT_INPUT_CHARS {
        return Some(IntentResult::new(Route::Social, 0.95, "short greeting"));
    }

    if greeting && t.split_whitespace().count() <= GREETING_MAX_WORDS {
        return Some(IntentResult::new(Route::Social, 0.9, "greeting/small-talk"));
    }

    if TECH.is_match(t) {
        return Some(IntentResult::new(Route::Tech, 0.85, "tech keywords"));
    }

    if CREATIVE.is_match(t) {
        return Some(IntentResult::new(Route::Creative, 0.75, "creative keywords"));
    }

    if TASK_VERBS.is_match(t) {
        return Some(IntentResult::new(Route::Task, 0.7, "task verb"));
    }

    if t.contains('?') || WH_WORD.is_match(t) {
        return Some(IntentResult::new(Route::Qa, 0.65, "question form"));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route_of(text: &str) -> Option<(Route, f64)> {
        rule_route(text).map(|r| (r.route(), r.confidence()))
    }

    #[test]
    fn test_blank_is_social() {
        assert_eq!(route_of("   \n\t"), Some((Route::Social, 0.6)));
    }

    #[test]
    fn test_short_greeting() {
        assert_eq!(route_of("hi"), Some((Route::Social, 0.95)));
        assert_eq!(route_of("Hey there"), Some((Route::Social, 0.95)));
    }

    #[test]
    fn test_longer_greeting() {
        assert_eq!(
            route_of("good morning, hope you slept well"),
            Some((Route::Social, 0.9))
        );
    }

    #[test]
    fn test_long_greeting_falls_through() {
        // More than eight words: no longer small-talk, and the task verb wins
        assert_eq!(
            route_of("hello can you please write me a short note for my landlord today"),
            Some((Route::Task, 0.7))
        );
    }

    #[test]
    fn test_greeting_word_must_be_whole() {
        // "history" starts with "hi" but is not a greeting
        assert_ne!(route_of("history of rome").map(|r| r.0), Some(Route::Social));
    }

    #[test]
    fn test_tech_beats_task() {
        assert_eq!(
            route_of("fix this python traceback please"),
            Some((Route::Tech, 0.85))
        );
    }

    #[test]
    fn test_creative_beats_task() {
        assert_eq!(
            route_of("write a poem about autumn"),
            Some((Route::Creative, 0.75))
        );
    }

    #[test]
    fn test_task_verb() {
        assert_eq!(
            route_of("summarize this article for my team"),
            Some((Route::Task, 0.7))
        );
    }

    #[test]
    fn test_question_form() {
        assert_eq!(
            route_of("why is the sky blue"),
            Some((Route::Qa, 0.65))
        );
        assert_eq!(route_of("is lisbon warm in may?"), Some((Route::Qa, 0.65)));
    }

    #[test]
    fn test_no_verdict() {
        assert_eq!(route_of("the weather in lisbon"), None);
    }

    #[test]
    fn test_http_status_is_tech() {
        assert_eq!(route_of("getting http 503 from the gateway"), Some((Route::Tech, 0.85)));
    }
}
