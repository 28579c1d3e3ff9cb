//! Human-readable rendering of command results.

use colored::Colorize;

use promptloops_core::{
    ComparisonRecord, ExperimentReport, PipelineOutput, RefineOutcome, RefineStatus,
};
use promptloops_critic::CritiqueResult;
use promptloops_db::ComparisonSummary;
use promptloops_judge::{JudgeError, JudgeVerdict, Winner};
use promptloops_router::{EnhanceMode, IntentResult, Policy};

pub fn print_unavailable(error: &anyhow::Error) {
    eprintln!();
    eprintln!("{} generation unavailable", "✗".bright_red());
    eprintln!("  {}", format!("{:#}", error).dimmed());
}

pub fn print_fallback(error: &JudgeError) {
    eprintln!(
        "{} generation unavailable, used heuristic judge ({})",
        "⚠".bright_yellow(),
        error
    );
}

pub fn print_intent(intent: &IntentResult, policy: &Policy, enhance_mode: EnhanceMode) {
    println!("Route:       {}", intent.route().to_string().bold());
    println!("Confidence:  {:.2}", intent.confidence());
    println!("Reason:      {}", intent.reason());
    println!("Temperature: {:.2}", policy.temperature);
    println!("Threshold:   {}", policy.rewrite_threshold);
    println!("Enhance:     {:?}", enhance_mode);
}

pub fn print_refine(outcome: &RefineOutcome, threshold: u32) {
    let status = match outcome.status {
        RefineStatus::Converged => "CONVERGED".bright_green(),
        RefineStatus::Passthrough => "PASSTHROUGH".bright_blue(),
        RefineStatus::Exhausted => "EXHAUSTED".bright_yellow(),
    };

    eprintln!();
    eprintln!("=== {} ===", status);
    eprintln!("Rounds: {} (threshold {})", outcome.rounds, threshold);
    if !outcome.changed() {
        eprintln!("{}", "Text unchanged".dimmed());
    }
    for record in &outcome.trace {
        eprintln!(
            "  {} {:>2}/{}  weakest: {}  edit: {}",
            format!("#{}", record.round).dimmed(),
            record.total,
            threshold,
            record.critique.weakest(),
            record.critique.edit()
        );
    }
    println!("{}", outcome.final_text);
}

pub fn print_pipeline(result: &PipelineOutput) {
    eprintln!();
    eprintln!(
        "Route: {} | Enhance: {:?} | Temp: {:.2} | Threshold: {}",
        result.route.to_string().bold(),
        result.enhance_mode,
        result.temperature_used,
        result
            .rewrite_threshold_used
            .map(|t| t.to_string())
            .unwrap_or_else(|| "-".to_string())
    );
    if result.rewritten() {
        eprintln!("{}", "Enhanced prompt:".dimmed());
        eprintln!("  {}", result.enhanced_prompt);
    }
    if let (Some(before), Some(after)) = (&result.critique_original, &result.critique_final) {
        eprintln!(
            "Prompt critique: {} -> {}",
            before.total(),
            after.total()
        );
    }
    eprintln!();
    println!("{}", result.answer);
}

pub fn print_comparison(record: &ComparisonRecord) {
    println!("=== Comparison {} ===", record.comparison_id.dimmed());
    println!(
        "Route: {} | Temp: {:.2} | Rewritten: {}",
        record.route.to_string().bold(),
        record.temperature_used,
        record.rewritten
    );
    println!();
    println!("{}", "X) Baseline".bold());
    println!("{}", record.original_response);
    println!();
    println!("{} {}", "Y)".bold(), record.variant.to_string().bold());
    if record.rewritten {
        println!("{} {}", "Prompt:".dimmed(), record.enhanced_prompt);
    }
    println!("{}", record.enhanced_response);
    println!();
    print_prompt_scores("Heuristic prompt score", &record.original_heuristic, &record.enhanced_heuristic);

    match record.generative_verdict.get("winner").and_then(|w| w.as_str()) {
        Some(winner) => println!("Generative judge: {}", winner.bold()),
        None => println!("Generative judge: {}", "unavailable".bright_yellow()),
    }
    print_verdict(&record.heuristic_verdict);
}

pub fn print_experiment(report: &ExperimentReport) {
    println!("=== Experiment {} ===", report.run_id.dimmed());
    println!("Temp: {:.2}", report.temperature_used);
    println!();
    println!("{}", "X) Baseline".bold());
    println!("{}", report.baseline.answer);

    for row in &report.rows {
        let generative = row
            .generative_verdict
            .get("winner")
            .and_then(|w| w.as_str())
            .unwrap_or("-");
        let y_total = row
            .generative_verdict
            .get("Y")
            .and_then(|side| side.as_object())
            .map(|side| side.values().filter_map(|v| v.as_i64()).sum::<i64>());

        println!();
        println!(
            "{} {}  gen={} (Y={}) heur={} (Y={})",
            "Y)".bold(),
            row.variant.to_string().bold(),
            generative,
            y_total.map_or_else(|| "-".to_string(), |t| t.to_string()),
            row.heuristic_verdict.winner,
            row.heuristic_verdict.y.total()
        );
        if row.rewritten {
            println!("{} {}", "Prompt:".dimmed(), row.enhanced_prompt);
        }
        println!("{}", row.enhanced_response);
    }
}

fn print_prompt_scores(label: &str, before: &CritiqueResult, after: &CritiqueResult) {
    println!("{}: {} -> {}", label, before.total(), after.total());
}

pub fn print_verdict(verdict: &JudgeVerdict) {
    let winner = match verdict.winner {
        Winner::X => "X".bright_green(),
        Winner::Y => "Y".bright_green(),
        Winner::Tie => "tie".bright_yellow(),
    };
    println!(
        "{:?} judge: X={} Y={} winner={}",
        verdict.judge_type,
        verdict.x.total(),
        verdict.y.total(),
        winner.bold()
    );
    if !verdict.reason.is_empty() {
        println!("  {}", verdict.reason.dimmed());
    }
}

pub fn print_history(summaries: &[ComparisonSummary]) {
    if summaries.is_empty() {
        println!("(no comparisons yet)");
        return;
    }

    for summary in summaries {
        let input: String = summary.user_input.chars().take(48).collect();
        println!(
            "{}  {:<8} t={:.2} th={:<2} gen={:<4} heur={:<4} {}",
            summary.created_at.format("%Y-%m-%d %H:%M"),
            summary.route,
            summary.temperature_used,
            summary
                .rewrite_threshold_used
                .map(|t| t.to_string())
                .unwrap_or_else(|| "-".to_string()),
            summary.generative_winner.as_deref().unwrap_or("-"),
            summary.heuristic_winner.as_deref().unwrap_or("-"),
            input.dimmed()
        );
    }
}
