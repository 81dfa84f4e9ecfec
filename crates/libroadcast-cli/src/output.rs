//! Console renderers for batch outcomes and push results.

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use libroadcast_core::{RoundEdit, UpdateOutcome};
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::client::{CliError, CliResult, PushResponse};

/// Print one batch outcome as soon as it is known; table mode only.
pub(crate) fn report_outcome(action: &str, outcome: &UpdateOutcome, format: OutputFormat) {
    if format == OutputFormat::Json {
        return;
    }
    match outcome {
        UpdateOutcome::Updated {
            round_id,
            position,
            edit,
        } => println!(
            "Updated {action} for round {position} ({round_id}): {}",
            describe_edit(edit)
        ),
        UpdateOutcome::Failed {
            round_id,
            position,
            edit,
            error,
        } => eprintln!(
            "Failed to update {action} for round {position} ({round_id}): {error} [attempted {}]",
            describe_edit(edit)
        ),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OutcomeRecord<'a> {
    round_id: &'a str,
    position: u32,
    status: &'static str,
    edit: &'a RoundEdit,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<'a> From<&'a UpdateOutcome> for OutcomeRecord<'a> {
    fn from(outcome: &'a UpdateOutcome) -> Self {
        match outcome {
            UpdateOutcome::Updated {
                round_id,
                position,
                edit,
            } => Self {
                round_id,
                position: *position,
                status: "updated",
                edit,
                error: None,
            },
            UpdateOutcome::Failed {
                round_id,
                position,
                edit,
                error,
            } => Self {
                round_id,
                position: *position,
                status: "failed",
                edit,
                error: Some(error.to_string()),
            },
        }
    }
}

/// Print the closing summary of a batch.
pub(crate) fn render_batch_summary(
    outcomes: &[UpdateOutcome],
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => {
            let records: Vec<OutcomeRecord<'_>> = outcomes.iter().map(OutcomeRecord::from).collect();
            let text = serde_json::to_string_pretty(&records)
                .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))?;
            println!("{text}");
        }
        OutputFormat::Table => {
            let updated = outcomes.iter().filter(|outcome| outcome.is_success()).count();
            println!("{updated} of {} rounds updated", outcomes.len());
        }
    }
    Ok(())
}

/// Render a push response as a table of games or as JSON.
pub(crate) fn render_push(
    round_id: &str,
    response: &PushResponse,
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => {
            let text = serde_json::to_string_pretty(response)
                .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))?;
            println!("{text}");
        }
        OutputFormat::Table => {
            println!("pushed {} games to round {round_id}", response.games.len());
            println!(
                "{:<3} {:<24} {:<24} {:<8} {:>7} ERROR",
                "#", "WHITE", "BLACK", "RESULT", "PLY"
            );
            for (index, game) in response.games.iter().enumerate() {
                let tag = |name: &str| game.tags.get(name).map_or("Unknown", String::as_str);
                let plies = game
                    .moves
                    .map_or_else(|| "Unknown".to_string(), |moves| moves.to_string());
                println!(
                    "{:<3} {:<24} {:<24} {:<8} {:>7} {}",
                    index + 1,
                    truncate(tag("White"), 24),
                    truncate(tag("Black"), 24),
                    tag("Result"),
                    plies,
                    game.error.as_deref().unwrap_or("None")
                );
            }
        }
    }
    Ok(())
}

/// Render the fields of an edit, with start times shown as UTC dates.
pub(crate) fn describe_edit(edit: &RoundEdit) -> String {
    let fields = edit.fields();
    if fields.is_empty() {
        return "no changes".to_string();
    }
    fields
        .into_iter()
        .map(|(name, value)| match (name, edit.starts_at) {
            ("startsAt", Some(millis)) => format!("{name}={}", format_starts_at(millis)),
            _ => format!("{name}={}", value.replace('\n', " | ")),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Format epoch milliseconds as a UTC timestamp, falling back to the raw number.
pub(crate) fn format_starts_at(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis).map_or_else(
        || millis.to_string(),
        |instant| instant.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        value.to_string()
    } else {
        let mut shortened: String = value.chars().take(width.saturating_sub(1)).collect();
        shortened.push('~');
        shortened
    }
}
