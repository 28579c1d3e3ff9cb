use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::recover;

/// Transport-level failures of the generation service.
///
/// Malformed-but-present output is never reported here; it is absorbed by
/// [`recover`] and the normalisation in the consuming components.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Failed to spawn generator process: {0}")]
    SpawnFailed(#[from] std::io::Error),

    #[error("Generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Generator not found at path: {0}")]
    NotFound(String),

    #[error("Generator configuration error: {0}")]
    ConfigError(String),

    #[error("Generation failed: {0}")]
    ExecutionFailed(String),
}

/// Which flavour of output a call asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    /// Plain natural-language completion
    Text,
    /// Best-effort JSON object
    Structured,
}

/// Configuration for generator execution
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Working directory for spawned processes
    pub working_dir: PathBuf,
    /// Optional timeout (None = no limit)
    pub timeout: Option<Duration>,
    /// Additional environment variables
    pub env_vars: HashMap<String, String>,
    /// Model to use (if the backend supports it)
    pub model: Option<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            working_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            timeout: None,
            env_vars: HashMap::new(),
            model: None,
        }
    }
}

impl GeneratorConfig {
    pub fn new(working_dir: PathBuf) -> Self {
        Self {
            working_dir,
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_model(mut self, model: String) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_env(mut self, key: String, value: String) -> Self {
        self.env_vars.insert(key, value);
        self
    }
}

/// The generation-service capability consumed by every promptloops component
#[async_trait]
pub trait Generator: Send + Sync {
    /// Human-readable name of the backend
    fn name(&self) -> &str;

    /// Best-effort natural-language completion. May return an empty string.
    async fn generate_text(
        &self,
        system: &str,
        user: &str,
        temperature: f64,
    ) -> Result<String, GenerationError>;

    /// Same contract as [`Generator::generate_text`], with a best-effort
    /// request for JSON-shaped output. Callers must still run the result
    /// through [`recover`].
    async fn generate_structured(
        &self,
        system: &str,
        user: &str,
        temperature: f64,
    ) -> Result<String, GenerationError>;

    /// Structured call followed by recovery. Only transport failures are errors.
    async fn generate_recovered(
        &self,
        system: &str,
        user: &str,
        temperature: f64,
    ) -> Result<Map<String, Value>, GenerationError> {
        let raw = self.generate_structured(system, user, temperature).await?;
        Ok(recover(&raw))
    }

    /// Check if the backend is reachable
    async fn is_available(&self) -> bool;
}
