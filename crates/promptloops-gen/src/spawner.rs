use std::path::Path;
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;
use tracing::debug;

use crate::{GenerationError, GeneratorConfig};

/// Utility for running a generator process to completion
pub struct ProcessSpawner;

impl ProcessSpawner {
    /// Spawn a process, wait for it (bounded by the configured timeout) and
    /// return its stdout. A non-zero exit is a transport failure.
    pub async fn run(
        binary: &Path,
        args: &[&str],
        config: &GeneratorConfig,
    ) -> Result<String, GenerationError> {
        let start = Instant::now();

        debug!(
            binary = %binary.display(),
            arg_count = args.len(),
            working_dir = %config.working_dir.display(),
            "Spawning generator process"
        );

        let mut cmd = Command::new(binary);
        cmd.args(args)
            .current_dir(&config.working_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(Stdio::null())
            .kill_on_drop(true);

        for (key, value) in &config.env_vars {
            cmd.env(key, value);
        }

        let output = match config.timeout {
            Some(limit) => tokio::time::timeout(limit, cmd.output())
                .await
                .map_err(|_| GenerationError::Timeout(limit))?,
            None => cmd.output().await,
        }
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                GenerationError::NotFound(binary.display().to_string())
            }
            _ => GenerationError::SpawnFailed(e),
        })?;

        let exit_code = output.status.code().unwrap_or(-1);
        debug!(
            exit_code,
            duration_ms = start.elapsed().as_millis(),
            stdout_len = output.stdout.len(),
            "Generator process completed"
        );

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GenerationError::ExecutionFailed(format!(
                "exit code {}: {}",
                exit_code,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}
