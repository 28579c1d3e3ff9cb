use thiserror::Error;

use promptloops_gen::GenerationError;
use promptloops_judge::JudgeError;

#[derive(Error, Debug)]
pub enum RefineError {
    #[error("Generation error during refine: {0}")]
    Generation(#[from] GenerationError),
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Refine(#[from] RefineError),

    #[error(transparent)]
    Judge(#[from] JudgeError),
}

impl PipelineError {
    /// True when the failure came from the generation service itself
    pub fn is_transport(&self) -> bool {
        match self {
            PipelineError::Generation(_) => true,
            PipelineError::Refine(RefineError::Generation(_)) => true,
            PipelineError::Judge(JudgeError::Generation(_)) => true,
        }
    }
}
