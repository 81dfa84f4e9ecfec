//! Delay, schedule, starts-after-previous, and polling period commands.

use anyhow::anyhow;
use libroadcast_core::edits::{period_edit, shift_start, starts_previous_edit};
use libroadcast_core::validate::{parse_delay, parse_flag_value, parse_period};
use libroadcast_core::{DelayEdit, RoundBatch, RoundSelector, parse_time_shift};
use tracing::info;

use crate::cli::{DelayArgs, FixScheduleArgs, PeriodArgs, StartsPreviousArgs};
use crate::client::{AppContext, CliError, CliResult};
use crate::commands::{fetch_rounds, run_batch};

pub(crate) async fn handle_delay(ctx: &AppContext, args: DelayArgs) -> CliResult<()> {
    let delay = parse_delay(&args.delay)?;
    let plan = DelayEdit::new(delay, args.only_delay, args.no_delay)?;
    let selector = RoundSelector::rounds(args.rounds.rounds.as_deref());
    ctx.require_scopes(false).await?;

    let rounds = fetch_rounds(ctx, &args.broadcast_id).await?;
    let batch = RoundBatch::select(&rounds, &selector);
    run_batch(ctx, "delay", &batch, |round, _| plan.build(round)).await?;
    Ok(())
}

pub(crate) async fn handle_fix_schedule(ctx: &AppContext, args: FixScheduleArgs) -> CliResult<()> {
    let shift_ms = parse_time_shift(&args.time_diff)?;
    let selector = RoundSelector::rounds(args.rounds.rounds.as_deref());
    ctx.require_scopes(false).await?;

    println!(
        "Applying time difference of {} ({shift_ms} ms) to broadcast {}.",
        args.time_diff, args.broadcast_id
    );
    let rounds = fetch_rounds(ctx, &args.broadcast_id).await?;
    let batch =
        RoundBatch::select_exact(&rounds, &selector).retain(|round| round.starts_at.is_some());
    if batch.is_empty() {
        return Err(CliError::failure(anyhow!(
            "No rounds to fix after applying filters."
        )));
    }
    run_batch(ctx, "schedule", &batch, |round, _| shift_start(round, shift_ms)).await?;
    Ok(())
}

pub(crate) async fn handle_starts_previous(
    ctx: &AppContext,
    args: StartsPreviousArgs,
) -> CliResult<()> {
    let value = parse_flag_value(&args.value);
    ctx.require_scopes(false).await?;

    let rounds = fetch_rounds(ctx, &args.broadcast_id).await?;
    let batch = RoundBatch::select(&rounds, &RoundSelector::all()).retain(|round| {
        round.starts_after_previous.unwrap_or(false) != value && round.starts_at.is_none()
    });
    if batch.is_empty() {
        info!(broadcast_id = %args.broadcast_id, value, "no round needs updating");
        println!("No rounds need startsAfterPrevious={value}.");
        return Ok(());
    }
    run_batch(ctx, "startsAfterPrevious", &batch, |_, _| {
        starts_previous_edit(value)
    })
    .await?;
    Ok(())
}

pub(crate) async fn handle_period(ctx: &AppContext, args: PeriodArgs) -> CliResult<()> {
    let period = parse_period(&args.period)?;
    let selector = RoundSelector::rounds(args.rounds.rounds.as_deref());
    ctx.require_scopes(true).await?;

    let rounds = fetch_rounds(ctx, &args.broadcast_id).await?;
    let batch = RoundBatch::select(&rounds, &selector);
    run_batch(ctx, "period", &batch, |_, _| period_edit(period)).await?;
    Ok(())
}
