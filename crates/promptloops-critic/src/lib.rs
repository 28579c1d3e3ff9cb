mod critique;
mod heuristic;
mod prompts;
mod rubric;

pub use critique::{normalize_critique, CritiqueEngine, CritiqueResult, GENERIC_EDIT};
pub use heuristic::{has_list_markup, heuristic_critique};
pub use prompts::CriticPrompts;
pub use rubric::{coerce_score, Axis, RubricRange, RubricScore, CRITIQUE_RANGE, JUDGE_RANGE};
