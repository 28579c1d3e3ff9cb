//! # promptloops-core
//!
//! The self-refine loop and the end-to-end answer pipeline built on it.
//!
//! ## Key Types
//!
//! - [`SelfRefiner`] - critique / rewrite / revise until a threshold is met
//! - [`RefineOutcome`] - final text plus the per-round trace
//! - [`Pipeline`] - route, refine and answer a single query
//! - [`ComparisonRecord`] - baseline vs. variant answers with both judges' verdicts
//! - [`ExperimentReport`] - several variants judged against one shared baseline

mod context;
mod error;
mod loop_runner;
mod outcome;
mod pipeline;

pub use context::{RefineContext, RoundRecord};
pub use error::{PipelineError, RefineError};
pub use loop_runner::{RewriteMode, SelfRefiner};
pub use outcome::{RefineOutcome, RefineStatus};
pub use pipeline::{
    answer_system_for, compute_run_id, ComparisonRecord, ExperimentReport, Pipeline,
    PipelineOptions, PipelineOutput, TemperatureMode, Variant, BASELINE_ANSWER_SYSTEM,
    GENERIC_ANSWER_SYSTEM,
};
