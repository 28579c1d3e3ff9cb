//! Deterministic, surface-signal prompt critique.
//!
//! Not semantic. It gives an offline baseline to log next to the generative
//! critique, and a fallback when the generator is unavailable.

use lazy_static::lazy_static;
use regex::Regex;

use crate::{Axis, CritiqueResult, RubricScore, JUDGE_RANGE};

lazy_static! {
    static ref LIST_MARKUP: Regex =
        Regex::new(r"(?m)(^|\n)\s*([-*]|\d+\.)\s+").expect("list pattern is valid");
    static ref CONSTRAINT_WORDS: Regex = Regex::new(
        r"(?i)\b(must|should|need|prefer|avoid|only|exactly|at least|at most)\b"
    )
    .expect("constraint pattern is valid");
}

/// Prompts with at least this many words are considered to carry context
const CONTEXT_MIN_WORDS: usize = 10;
/// Prompts longer than this start to lose clarity
const CLARITY_MAX_WORDS: usize = 80;

/// True when `text` contains bullet or numbered-step markup
pub fn has_list_markup(text: &str) -> bool {
    LIST_MARKUP.is_match(text)
}

/// Score a prompt on the four rubric axes (1-5 each) from surface signals
pub fn heuristic_critique(prompt: &str) -> CritiqueResult {
    let p = prompt.trim();
    let n_words = p.split_whitespace().count();

    let has_question = p.contains('?');
    let has_constraints = CONSTRAINT_WORDS.is_match(p);
    let has_context = n_words >= CONTEXT_MIN_WORDS;

    let intent = 3 + i64::from(has_question) + i64::from(has_context);
    let clarity = 2
        + i64::from(has_context)
        + i64::from(has_constraints)
        + if n_words <= CLARITY_MAX_WORDS { 1 } else { -1 };
    let structure =
        2 + i64::from(p.contains('\n')) + i64::from(has_list_markup(p)) + i64::from(has_question);
    let safety = 5;

    let scores = RubricScore::from_axes(
        [
            (Axis::Intent, intent),
            (Axis::Clarity, clarity),
            (Axis::Structure, structure),
            (Axis::Safety, safety),
        ],
        JUDGE_RANGE,
    );

    let mut edits = Vec::new();
    if !has_context {
        edits.push("Add a bit more context (who/what/where) to reduce ambiguity.");
    }
    if !has_question {
        edits.push("State the request as a clear question or instruction.");
    }
    if !has_constraints {
        edits.push("Add any constraints (budget, format, scope) if relevant.");
    }
    let edit = if edits.is_empty() {
        "No edits are necessary.".to_string()
    } else {
        edits.join(" ")
    };

    CritiqueResult::new(
        scores,
        "",
        edit,
        "Heuristic (rule-based) critique using length/structure signals.",
    )
}
