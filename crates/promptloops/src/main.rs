mod config;
mod output;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use promptloops_core::{
    ComparisonRecord, Pipeline, PipelineError, PipelineOptions, RefineError, RewriteMode,
    SelfRefiner, TemperatureMode, Variant,
};
use promptloops_db::{ComparisonRow, Database};
use promptloops_gen::{CliGenerator, GenerationError, Generator, GeneratorConfig};
use promptloops_judge::{GenerativeJudge, HeuristicJudge, Judge, JudgeError};
use promptloops_logging::{init_tracing, LogEvent, LogFormat, Logger};
use promptloops_router::{enhance_mode_for, threshold_for, IntentRouter, Policy};

use crate::config::ProjectConfig;

#[derive(Parser, Debug)]
#[command(
    name = "promptloops",
    about = "Intent routing, self-refine and dual judging for LLM prompts",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Working directory (default: current directory)
    #[arg(short = 'd', long, global = true)]
    working_dir: Option<PathBuf>,

    /// Log output format (default: from promptloops.toml, else pretty)
    #[arg(long, value_enum, global = true)]
    log_format: Option<LogFormatChoice>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json_output: bool,

    /// Model to use (if the generator supports it)
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Append events as JSON lines to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Send events only to the log file, not to stderr
    #[arg(short, long, global = true, requires = "log_file")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classify a request into a route and show its policy
    Classify {
        text: String,

        /// Rules only, never call the generator
        #[arg(long)]
        no_fallback: bool,
    },
    /// Critique and rewrite a prompt until it clears the threshold
    Refine {
        text: String,

        /// Acceptance threshold (default: derived from the classified intent)
        #[arg(long)]
        threshold: Option<u32>,

        #[arg(short = 'n', long)]
        max_rounds: Option<usize>,

        #[arg(long, value_enum)]
        mode: Option<ModeChoice>,
    },
    /// Route, refine and answer a request
    Run {
        text: String,

        #[arg(long, value_enum, default_value = "abc")]
        variant: VariantChoice,

        /// Fixed answer temperature (default: per-route)
        #[arg(short, long)]
        temperature: Option<f64>,

        #[arg(long)]
        threshold: Option<u32>,

        #[arg(short = 'n', long)]
        max_rounds: Option<usize>,
    },
    /// Answer with the baseline and a variant, then judge the pair
    Compare {
        text: String,

        #[arg(long, value_enum, default_value = "abc")]
        variant: VariantChoice,

        #[arg(short, long)]
        temperature: Option<f64>,

        #[arg(long)]
        threshold: Option<u32>,

        #[arg(short = 'n', long)]
        max_rounds: Option<usize>,

        /// Store the comparison in the database
        #[arg(long)]
        save: bool,
    },
    /// Judge several variants against one shared baseline answer
    Experiment {
        text: String,

        /// Variants to run (default: all)
        #[arg(long, value_enum, value_delimiter = ',')]
        variants: Vec<VariantChoice>,

        #[arg(short, long)]
        temperature: Option<f64>,

        #[arg(long)]
        threshold: Option<u32>,

        #[arg(short = 'n', long)]
        max_rounds: Option<usize>,

        /// Store every row in the database
        #[arg(long)]
        save: bool,
    },
    /// Judge two responses to the same query
    Judge {
        #[arg(long)]
        query: String,

        #[arg(long)]
        x: String,

        #[arg(long)]
        y: String,

        /// Use the deterministic judge, no generator calls
        #[arg(long)]
        heuristic: bool,
    },
    /// List stored comparisons, newest first
    History {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatChoice {
    Pretty,
    Json,
    Compact,
}

impl From<LogFormatChoice> for LogFormat {
    fn from(choice: LogFormatChoice) -> Self {
        match choice {
            LogFormatChoice::Pretty => LogFormat::Pretty,
            LogFormatChoice::Json => LogFormat::Json,
            LogFormatChoice::Compact => LogFormat::Compact,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeChoice {
    Full,
    Light,
}

impl From<ModeChoice> for RewriteMode {
    fn from(choice: ModeChoice) -> Self {
        match choice {
            ModeChoice::Full => RewriteMode::Full,
            ModeChoice::Light => RewriteMode::Light,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum VariantChoice {
    Baseline,
    A,
    B,
    C,
    Abc,
}

impl From<VariantChoice> for Variant {
    fn from(choice: VariantChoice) -> Self {
        match choice {
            VariantChoice::Baseline => Variant::Baseline,
            VariantChoice::A => Variant::A,
            VariantChoice::B => Variant::B,
            VariantChoice::C => Variant::C,
            VariantChoice::Abc => Variant::Abc,
        }
    }
}

/// Everything a subcommand needs besides its own arguments
struct App {
    working_dir: PathBuf,
    config: ProjectConfig,
    generator: CliGenerator,
    logger: Arc<Logger>,
    json_output: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let working_dir = match cli.working_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    let config = ProjectConfig::load(&working_dir)?.unwrap_or_default();

    let log_format: LogFormat = match cli.log_format {
        Some(choice) => choice.into(),
        None => match config.log_format.as_deref() {
            Some(value) => value.parse().map_err(anyhow::Error::msg)?,
            None => LogFormat::default(),
        },
    };
    init_tracing(config.log_level.as_deref().unwrap_or("warn"), log_format);

    let generator = build_generator(&cli, &config, &working_dir);
    let logger = build_logger(&cli, &config, &working_dir, log_format)?;
    let app = App {
        working_dir,
        config,
        generator,
        logger: Arc::new(logger),
        json_output: cli.json_output,
    };

    let result = match cli.command {
        Command::Classify { text, no_fallback } => app.classify(&text, !no_fallback).await,
        Command::Refine {
            text,
            threshold,
            max_rounds,
            mode,
        } => app.refine(&text, threshold, max_rounds, mode).await,
        Command::Run {
            text,
            variant,
            temperature,
            threshold,
            max_rounds,
        } => {
            let options = app.pipeline_options(variant, temperature, threshold, max_rounds);
            app.run(&text, &options).await
        }
        Command::Compare {
            text,
            variant,
            temperature,
            threshold,
            max_rounds,
            save,
        } => {
            let options = app.pipeline_options(variant, temperature, threshold, max_rounds);
            app.compare(&text, &options, save).await
        }
        Command::Experiment {
            text,
            variants,
            temperature,
            threshold,
            max_rounds,
            save,
        } => {
            let options =
                app.pipeline_options(VariantChoice::Abc, temperature, threshold, max_rounds);
            let variants: Vec<Variant> = variants.into_iter().map(Variant::from).collect();
            app.experiment(&text, &variants, &options, save).await
        }
        Command::Judge {
            query,
            x,
            y,
            heuristic,
        } => app.judge(&query, &x, &y, heuristic).await,
        Command::History { limit } => app.history(limit),
    };

    match result {
        Err(e) if is_transport(&e) => {
            output::print_unavailable(&e);
            std::process::exit(2);
        }
        other => other,
    }
}

fn build_generator(cli: &Cli, config: &ProjectConfig, working_dir: &std::path::Path) -> CliGenerator {
    let mut generator_config = GeneratorConfig::new(working_dir.to_path_buf());
    if let Some(secs) = config.generator.timeout_secs {
        generator_config = generator_config.with_timeout(Duration::from_secs(secs));
    }
    if let Some(model) = config.model(cli.model.as_deref()) {
        generator_config = generator_config.with_model(model.to_string());
    }

    match config.generator.binary.clone() {
        Some(path) => CliGenerator::with_binary_path(path, generator_config),
        None => CliGenerator::new(generator_config),
    }
}

fn build_logger(
    cli: &Cli,
    config: &ProjectConfig,
    working_dir: &std::path::Path,
    format: LogFormat,
) -> Result<Logger> {
    let Some(path) = config.log_file(cli.log_file.as_deref(), working_dir) else {
        return Ok(Logger::new(format));
    };

    let logger = Logger::with_file(format, &path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;
    Ok(if cli.quiet {
        logger.without_console()
    } else {
        logger
    })
}

/// True when the error chain bottoms out in a generation-service failure
fn is_transport(error: &anyhow::Error) -> bool {
    error.downcast_ref::<GenerationError>().is_some()
        || error.downcast_ref::<RefineError>().is_some()
        || error.downcast_ref::<JudgeError>().is_some()
        || error
            .downcast_ref::<PipelineError>()
            .is_some_and(PipelineError::is_transport)
}

impl App {
    fn generator(&self) -> &dyn Generator {
        &self.generator
    }

    fn pipeline_options(
        &self,
        variant: VariantChoice,
        temperature: Option<f64>,
        threshold: Option<u32>,
        max_rounds: Option<usize>,
    ) -> PipelineOptions {
        PipelineOptions {
            variant: variant.into(),
            temperature: temperature.map_or(TemperatureMode::Auto, TemperatureMode::Fixed),
            threshold,
            max_rounds: self.config.max_rounds(max_rounds),
        }
    }

    async fn classify(&self, text: &str, allow_fallback: bool) -> Result<()> {
        let intent = IntentRouter::new(self.generator())
            .classify(text, allow_fallback)
            .await;
        self.logger.log(&LogEvent::IntentClassified {
            route: intent.route().to_string(),
            confidence: intent.confidence(),
            reason: intent.reason().to_string(),
        });

        let policy = Policy::for_intent(&intent);
        let enhance_mode = enhance_mode_for(intent.route());

        if self.json_output {
            let json = serde_json::json!({
                "intent": intent,
                "policy": policy,
                "enhance_mode": enhance_mode,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        } else {
            output::print_intent(&intent, &policy, enhance_mode);
        }
        Ok(())
    }

    async fn refine(
        &self,
        text: &str,
        threshold: Option<u32>,
        max_rounds: Option<usize>,
        mode: Option<ModeChoice>,
    ) -> Result<()> {
        let intent = IntentRouter::new(self.generator()).classify(text, true).await;
        let threshold = threshold.unwrap_or_else(|| threshold_for(&intent));

        let mode = match (mode, self.config.refine.mode.as_deref()) {
            (Some(choice), _) => choice.into(),
            (None, Some(value)) => value.parse().map_err(anyhow::Error::msg)?,
            (None, None) => {
                RewriteMode::for_enhance(enhance_mode_for(intent.route())).unwrap_or_default()
            }
        };

        let outcome = SelfRefiner::new(self.generator(), self.logger.clone())
            .refine(text, threshold, self.config.max_rounds(max_rounds), mode)
            .await?;

        if self.json_output {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        } else {
            output::print_refine(&outcome, threshold);
        }
        Ok(())
    }

    async fn run(&self, text: &str, options: &PipelineOptions) -> Result<()> {
        let result = Pipeline::new(self.generator(), self.logger.clone())
            .run(text, options)
            .await?;

        if self.json_output {
            println!("{}", serde_json::to_string_pretty(&result)?);
        } else {
            output::print_pipeline(&result);
        }
        Ok(())
    }

    async fn compare(&self, text: &str, options: &PipelineOptions, save: bool) -> Result<()> {
        let record = Pipeline::new(self.generator(), self.logger.clone())
            .compare(text, options)
            .await?;

        if save {
            self.save(&self.open_database()?, &record)?;
        }

        if self.json_output {
            println!("{}", serde_json::to_string_pretty(&record)?);
        } else {
            output::print_comparison(&record);
        }
        Ok(())
    }

    async fn experiment(
        &self,
        text: &str,
        variants: &[Variant],
        options: &PipelineOptions,
        save: bool,
    ) -> Result<()> {
        let report = Pipeline::new(self.generator(), self.logger.clone())
            .experiment(text, variants, options)
            .await?;

        if save {
            let db = self.open_database()?;
            for row in &report.rows {
                self.save(&db, row)?;
            }
        }

        if self.json_output {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            output::print_experiment(&report);
        }
        Ok(())
    }

    fn save(&self, db: &Database, record: &ComparisonRecord) -> Result<()> {
        let inserted = db
            .comparisons()
            .append(&to_row(record)?)
            .context("Failed to save comparison")?;
        self.logger.log(&LogEvent::ComparisonSaved {
            comparison_id: record.comparison_id.clone(),
            inserted,
        });
        Ok(())
    }

    async fn judge(&self, query: &str, x: &str, y: &str, heuristic: bool) -> Result<()> {
        let verdict = if heuristic {
            HeuristicJudge::new().verdict(query, x, y)
        } else {
            match GenerativeJudge::new(self.generator()).judge(query, x, y).await {
                Ok(verdict) => verdict,
                Err(e) => {
                    // The heuristic judge needs no generator, so it stands in
                    output::print_fallback(&e);
                    self.logger.log(&LogEvent::ErrorEncountered {
                        stage: "judge".to_string(),
                        error: e.to_string(),
                    });
                    HeuristicJudge::new().verdict(query, x, y)
                }
            }
        };

        if self.json_output {
            println!("{}", serde_json::to_string_pretty(&verdict)?);
        } else {
            output::print_verdict(&verdict);
        }
        Ok(())
    }

    fn history(&self, limit: usize) -> Result<()> {
        let db = self.open_database()?;
        let summaries = db
            .comparisons()
            .recent(limit)
            .context("Failed to read comparisons")?;

        if self.json_output {
            println!("{}", serde_json::to_string_pretty(&summaries)?);
        } else {
            output::print_history(&summaries);
        }
        Ok(())
    }

    fn open_database(&self) -> Result<Database> {
        let path = self
            .config
            .db_path(&self.working_dir)
            .unwrap_or_else(Database::default_path);
        Database::open_at(&path)
            .with_context(|| format!("Failed to open database at {}", path.display()))
    }
}

fn to_row(record: &ComparisonRecord) -> Result<ComparisonRow> {
    Ok(ComparisonRow {
        comparison_id: record.comparison_id.clone(),
        run_id: record.run_id.clone(),
        created_at: record.created_at,
        variant: record.variant.to_string(),
        temp_mode: record.temp_mode.clone(),
        threshold_mode: record.threshold_mode.clone(),
        user_input: record.user_input.clone(),
        route: record.route.to_string(),
        temperature_used: record.temperature_used,
        rewrite_threshold_used: record.rewrite_threshold_used,
        rewritten: record.rewritten,
        original_prompt: record.original_prompt.clone(),
        original_response: record.original_response.clone(),
        original_critique: serde_json::to_value(&record.original_critique)?,
        original_heuristic: serde_json::to_value(&record.original_heuristic)?,
        enhanced_prompt: record.enhanced_prompt.clone(),
        enhanced_response: record.enhanced_response.clone(),
        enhanced_critique: serde_json::to_value(&record.enhanced_critique)?,
        enhanced_heuristic: serde_json::to_value(&record.enhanced_heuristic)?,
        generative_verdict: record.generative_verdict.clone(),
        heuristic_verdict: serde_json::to_value(&record.heuristic_verdict)?,
    })
}
