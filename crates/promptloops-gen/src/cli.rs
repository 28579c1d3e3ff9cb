use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

use crate::{GenerationError, Generator, GeneratorConfig, OutputKind, ProcessSpawner};

/// Environment variable carrying the requested sampling temperature to the
/// child process. The CLI has no temperature flag, so wrappers read this.
pub const TEMPERATURE_ENV: &str = "PROMPTLOOPS_TEMPERATURE";

const JSON_ONLY_SUFFIX: &str =
    "\n\nRespond with a single JSON object and nothing else. No code fences, no commentary.";

/// Generator backed by a local model CLI run in non-interactive print mode
pub struct CliGenerator {
    binary_path: PathBuf,
    config: GeneratorConfig,
}

impl CliGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self {
            binary_path: PathBuf::from("claude"),
            config,
        }
    }

    pub fn with_binary_path(path: PathBuf, config: GeneratorConfig) -> Self {
        Self {
            binary_path: path,
            config,
        }
    }

    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    async fn invoke(
        &self,
        system: &str,
        user: &str,
        temperature: f64,
        kind: OutputKind,
    ) -> Result<String, GenerationError> {
        debug!(
            generator = self.name(),
            ?kind,
            temperature,
            system_len = system.len(),
            user_len = user.len(),
            "Invoking generator"
        );

        let system_prompt = match kind {
            OutputKind::Text => system.to_string(),
            OutputKind::Structured => format!("{}{}", system, JSON_ONLY_SUFFIX),
        };

        let mut args = vec!["--print", "--system-prompt", system_prompt.as_str()];

        if let Some(model) = self.config.model.as_deref() {
            args.push("--model");
            args.push(model);
        }

        // `--` keeps user content starting with '-' from being read as an option
        args.push("--");
        args.push(user);

        let config = self
            .config
            .clone()
            .with_env(TEMPERATURE_ENV.to_string(), format!("{:.2}", temperature));

        ProcessSpawner::run(&self.binary_path, &args, &config).await
    }
}

impl Default for CliGenerator {
    fn default() -> Self {
        Self::new(GeneratorConfig::default())
    }
}

#[async_trait]
impl Generator for CliGenerator {
    fn name(&self) -> &str {
        "model-cli"
    }

    async fn generate_text(
        &self,
        system: &str,
        user: &str,
        temperature: f64,
    ) -> Result<String, GenerationError> {
        self.invoke(system, user, temperature, OutputKind::Text).await
    }

    async fn generate_structured(
        &self,
        system: &str,
        user: &str,
        temperature: f64,
    ) -> Result<String, GenerationError> {
        self.invoke(system, user, temperature, OutputKind::Structured)
            .await
    }

    async fn is_available(&self) -> bool {
        Command::new(&self.binary_path)
            .arg("--version")
            .output()
            .await
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
}
