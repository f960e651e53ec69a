//! Terminal rendering of pipeline events and stored state

use std::fmt::Write;
use std::time::Duration;
use vas_pipeline::{PhaseKey, PipelineEvent, PipelineResults};
use vas_state::{AssessmentSummary, CheckpointRecord};

fn secs(duration: Duration) -> String {
    format!("{:.1}s", duration.as_secs_f64())
}

/// One line per event
pub(crate) fn event_line(event: &PipelineEvent) -> String {
    match event {
        PipelineEvent::Start { input } => format!("started: {}", input.identifier()),
        PipelineEvent::PhaseStart {
            name,
            estimated_duration,
            ..
        } => format!("  > {name} (est. {})", secs(*estimated_duration)),
        PipelineEvent::PhaseComplete {
            name,
            duration,
            restored,
            ..
        } => {
            if *restored {
                format!("  = {name} restored from checkpoint")
            } else {
                format!("  + {name} done in {}", secs(*duration))
            }
        }
        PipelineEvent::PhaseError {
            name,
            error,
            can_retry,
            ..
        } => {
            let hint = if *can_retry { " (retryable)" } else { "" };
            format!("  ! {name} failed: {error}{hint}")
        }
        PipelineEvent::OverviewReady { .. } => "  company overview ready".to_string(),
        PipelineEvent::Complete(results) => {
            format!("complete: all phases finished in {}", secs(results.elapsed))
        }
        PipelineEvent::PartialComplete { failed_phases, .. } => {
            format!("partial: failed {}", join_keys(failed_phases))
        }
        PipelineEvent::Cancelled { phase } => match phase {
            Some(phase) => format!("cancelled during {phase}"),
            None => "cancelled".to_string(),
        },
        PipelineEvent::Failed { error } => format!("failed: {error}"),
    }
}

pub(crate) fn results_summary(results: &PipelineResults) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", results.description);
    for key in PhaseKey::ALL {
        let state = match (results.get(key), results.failures.get(&key)) {
            (Some(_), _) => "completed".to_string(),
            (None, Some(failure)) => format!("error: {failure}"),
            (None, None) => "not run".to_string(),
        };
        let _ = writeln!(out, "  {:<24} {state}", key.descriptor().display_name);
    }
    out
}

pub(crate) fn record_summary(record: &CheckpointRecord) -> String {
    let mut out = String::new();
    let input = record
        .primary_input
        .as_ref()
        .map_or_else(|| "(none)".to_string(), |input| input.identifier());
    let _ = writeln!(out, "status:    {}", record.status);
    let _ = writeln!(out, "input:     {input}");
    let _ = writeln!(out, "updated:   {}", record.last_updated_at.to_rfc3339());
    let _ = writeln!(
        out,
        "completed: {}/{} ({})",
        record.completed_count(),
        PhaseKey::ALL.len(),
        join_keys(&record.completed_phase_results.keys().copied().collect::<Vec<_>>())
    );
    for (dimension, score) in &record.user_scores {
        let marker = if score.submitted { "" } else { " (draft)" };
        let _ = writeln!(out, "score:     {dimension} = {}{marker}", score.score);
    }
    let _ = write!(out, "resumable: {}", record.is_resumable());
    out
}

pub(crate) fn archive_line(summary: &AssessmentSummary) -> String {
    let score = summary
        .average_score
        .map_or_else(|| "-".to_string(), |avg| format!("{avg:.1}"));
    format!(
        "{}  {}  {:<32} phases={} score={score}",
        summary.key,
        summary.completed_at.format("%Y-%m-%d %H:%M"),
        summary.identifier,
        summary.phase_count
    )
}

fn join_keys(keys: &[PhaseKey]) -> String {
    if keys.is_empty() {
        return "none".to_string();
    }
    keys.iter()
        .map(|key| key.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
