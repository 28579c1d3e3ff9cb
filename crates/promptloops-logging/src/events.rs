use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

/// Structured log events for the classify / refine / judge pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LogEvent {
    IntentClassified {
        route: String,
        confidence: f64,
        reason: String,
    },
    RefineStarted {
        prompt_preview: String,
        threshold: u32,
        max_rounds: usize,
        mode: String,
    },
    RoundCritiqued {
        round: usize,
        total: i64,
        threshold: u32,
        weakest: String,
    },
    /// SOCIAL text left untouched for the rest of the loop
    PassthroughApplied {
        round: usize,
    },
    RoundRewritten {
        round: usize,
        prompt_preview: String,
    },
    RefineConverged {
        rounds: usize,
        total: i64,
    },
    RefineExhausted {
        rounds: usize,
        last_total: Option<i64>,
    },
    AnswerGenerated {
        route: String,
        temperature: f64,
        answer_len: usize,
    },
    JudgeCompleted {
        judge_type: String,
        winner: String,
        x_total: i64,
        y_total: i64,
    },
    ComparisonSaved {
        comparison_id: String,
        inserted: bool,
    },
    ErrorEncountered {
        stage: String,
        error: String,
    },
}

impl LogEvent {
    /// Add a timestamp to serialize with the event
    fn with_timestamp(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let Some(obj) = value.as_object_mut() {
            obj.insert(
                "timestamp".to_string(),
                serde_json::Value::String(chrono::Utc::now().to_rfc3339()),
            );
        }
        value
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format with colors
    #[default]
    Pretty,
    /// JSON lines format for machine consumption
    Json,
    /// Compact single-line format
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

/// Logger for promptloops events - handles both console output and file logging
pub struct Logger {
    format: LogFormat,
    file_writer: Option<Mutex<File>>,
    console: bool,
}

impl Logger {
    pub fn new(format: LogFormat) -> Self {
        Self {
            format,
            file_writer: None,
            console: true,
        }
    }

    /// A logger that writes nowhere unless a file is attached
    pub fn silent() -> Self {
        Self {
            format: LogFormat::Json,
            file_writer: None,
            console: false,
        }
    }

    /// Create a logger with file output in addition to console
    pub fn with_file(format: LogFormat, log_path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        Ok(Self {
            format,
            file_writer: Some(Mutex::new(file)),
            console: true,
        })
    }

    /// Stop echoing events to stderr; a file sink, if any, keeps receiving them
    pub fn without_console(mut self) -> Self {
        self.console = false;
        self
    }

    pub fn log(&self, event: &LogEvent) {
        // File output is always JSON lines
        if let Some(ref writer) = self.file_writer {
            if let Ok(mut file) = writer.lock() {
                let json = event.with_timestamp();
                let _ = writeln!(file, "{}", json);
            }
        }

        if !self.console {
            return;
        }

        match self.format {
            LogFormat::Json => self.log_json(event),
            LogFormat::Pretty => self.log_pretty(event),
            LogFormat::Compact => self.log_compact(event),
        }
    }

    fn log_json(&self, event: &LogEvent) {
        if let Ok(json) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{}", json);
        }
    }

    fn log_pretty(&self, event: &LogEvent) {
        let mut stderr = std::io::stderr();
        match event {
            LogEvent::IntentClassified {
                route,
                confidence,
                reason,
            } => {
                let _ = writeln!(
                    stderr,
                    "{} {} {} {}",
                    "◆".bright_blue(),
                    "Route:".dimmed(),
                    route.bright_white().bold(),
                    format!("({:.0}%, {})", confidence * 100.0, reason).dimmed()
                );
            }
            LogEvent::RefineStarted {
                prompt_preview,
                threshold,
                max_rounds,
                mode,
            } => {
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{} {} threshold={} rounds={} mode={}",
                    "▶".bright_cyan(),
                    "REFINE".bright_cyan().bold(),
                    threshold,
                    max_rounds,
                    mode
                );
                let _ = writeln!(stderr, "    {}", Self::truncate(prompt_preview, 70).dimmed());
            }
            LogEvent::RoundCritiqued {
                round,
                total,
                threshold,
                weakest,
            } => {
                let score = format!("{}/{}", total, threshold);
                let styled = if i64::from(*threshold) <= *total {
                    score.bright_green()
                } else {
                    score.bright_yellow()
                };
                let _ = writeln!(
                    stderr,
                    "    {} Round {}: {} (weakest: {})",
                    "│".dimmed(),
                    round,
                    styled,
                    weakest
                );
            }
            LogEvent::PassthroughApplied { round } => {
                let _ = writeln!(
                    stderr,
                    "    {} Round {}: social input, left unchanged",
                    "│".dimmed(),
                    round
                );
            }
            LogEvent::RoundRewritten {
                round,
                prompt_preview,
            } => {
                let _ = writeln!(
                    stderr,
                    "    {} Round {} rewrite: {}",
                    "│".dimmed(),
                    round,
                    Self::truncate(prompt_preview, 60).dimmed()
                );
            }
            LogEvent::RefineConverged { rounds, total } => {
                let _ = writeln!(
                    stderr,
                    "    {} Converged after {} round(s) at {}",
                    "✓".bright_green(),
                    rounds,
                    total
                );
            }
            LogEvent::RefineExhausted { rounds, last_total } => {
                let total = last_total
                    .map(|t| t.to_string())
                    .unwrap_or_else(|| "-".to_string());
                let _ = writeln!(
                    stderr,
                    "    {} Round budget exhausted ({} round(s), last total {})",
                    "⚠".bright_yellow(),
                    rounds,
                    total
                );
            }
            LogEvent::AnswerGenerated {
                route,
                temperature,
                answer_len,
            } => {
                let _ = writeln!(
                    stderr,
                    "{} {} {} at t={:.2} ({} chars)",
                    "◆".bright_blue(),
                    "Answer:".dimmed(),
                    route,
                    temperature,
                    answer_len
                );
            }
            LogEvent::JudgeCompleted {
                judge_type,
                winner,
                x_total,
                y_total,
            } => {
                let _ = writeln!(
                    stderr,
                    "{} {} judge: X={} Y={} winner={}",
                    "▶".bright_magenta(),
                    judge_type.bright_magenta().bold(),
                    x_total,
                    y_total,
                    winner.bold()
                );
            }
            LogEvent::ComparisonSaved {
                comparison_id,
                inserted,
            } => {
                let status = if *inserted {
                    "saved".bright_green()
                } else {
                    "already stored".dimmed()
                };
                let _ = writeln!(stderr, "{} Comparison {} {}", "✓".dimmed(), comparison_id, status);
            }
            LogEvent::ErrorEncountered { stage, error } => {
                let _ = writeln!(
                    stderr,
                    "{} Error during {}: {}",
                    "✗".bright_red(),
                    stage,
                    error.bright_red()
                );
            }
        }
    }

    fn log_compact(&self, event: &LogEvent) {
        let mut stderr = std::io::stderr();
        let timestamp = chrono::Utc::now().format("%H:%M:%S");
        let msg = match event {
            LogEvent::IntentClassified {
                route, confidence, ..
            } => format!("[{}] route:{} {:.2}", timestamp, route, confidence),
            LogEvent::RefineStarted {
                threshold,
                max_rounds,
                mode,
                ..
            } => format!(
                "[{}] refine:start t={} n={} {}",
                timestamp, threshold, max_rounds, mode
            ),
            LogEvent::RoundCritiqued {
                round,
                total,
                threshold,
                ..
            } => format!("[{}] refine:critique:{} {}/{}", timestamp, round, total, threshold),
            LogEvent::PassthroughApplied { round } => {
                format!("[{}] refine:passthrough:{}", timestamp, round)
            }
            LogEvent::RoundRewritten { round, .. } => {
                format!("[{}] refine:rewrite:{}", timestamp, round)
            }
            LogEvent::RefineConverged { rounds, total } => {
                format!("[{}] refine:done:{} total={}", timestamp, rounds, total)
            }
            LogEvent::RefineExhausted { rounds, .. } => {
                format!("[{}] refine:limit:{}", timestamp, rounds)
            }
            LogEvent::AnswerGenerated {
                route, answer_len, ..
            } => format!("[{}] answer:{} {}c", timestamp, route, answer_len),
            LogEvent::JudgeCompleted {
                judge_type,
                winner,
                x_total,
                y_total,
            } => format!(
                "[{}] judge:{} {}-{} {}",
                timestamp, judge_type, x_total, y_total, winner
            ),
            LogEvent::ComparisonSaved {
                comparison_id,
                inserted,
            } => format!("[{}] saved:{} new={}", timestamp, comparison_id, inserted),
            LogEvent::ErrorEncountered { stage, error } => {
                format!("[{}] error:{}:{}", timestamp, stage, error)
            }
        };
        let _ = writeln!(stderr, "{}", msg);
    }

    /// Truncate on a character boundary, marking the cut with "..."
    fn truncate(s: &str, max_chars: usize) -> String {
        if s.chars().count() > max_chars {
            let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
            format!("{}...", kept)
        } else {
            s.to_string()
        }
    }
}
