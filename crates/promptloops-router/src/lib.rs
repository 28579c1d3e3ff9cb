//! # promptloops-router
//!
//! Classifies a raw request into a [`Route`] and derives the sampling
//! [`Policy`] for it.
//!
//! Classification is rules-first: a deterministic pass over the text settles
//! most inputs without any generator call. Only when the rules have no
//! verdict does [`IntentRouter`] ask the generator, and whatever comes back
//! is coerced into the closed route set with a clamped confidence.

mod intent;
mod policy;
mod prompts;
mod rules;

pub use intent::{classify_offline, IntentResult, IntentRouter, Route};
pub use policy::{
    enhance_mode_for, temperature_for, threshold_for, EnhanceMode, Policy, THRESHOLD_FLOOR,
    THRESHOLD_MAX, THRESHOLD_MIN,
};
pub use prompts::CLASSIFIER_SYSTEM;
pub use rules::rule_route;
