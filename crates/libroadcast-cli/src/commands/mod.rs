//! Command handlers grouped by concern.

pub(crate) mod login;
pub(crate) mod push;
pub(crate) mod scoring;
pub(crate) mod source;
pub(crate) mod timing;

use anyhow::anyhow;
use libroadcast_core::{Round, RoundBatch, RoundEdit, UpdateOutcome};

use crate::client::{AppContext, CliError, CliResult};
use crate::output::{render_batch_summary, report_outcome};

/// Fetch the rounds of a broadcast, failing when there are none.
pub(crate) async fn fetch_rounds(ctx: &AppContext, broadcast_id: &str) -> CliResult<Vec<Round>> {
    let broadcast = ctx.lichess.broadcast(broadcast_id).await?;
    if broadcast.rounds.is_empty() {
        return Err(CliError::failure(anyhow!(
            "broadcast {broadcast_id} not found or has no rounds"
        )));
    }
    Ok(broadcast.rounds)
}

/// Edit every round of `batch`, printing each outcome and a closing summary.
pub(crate) async fn run_batch<F>(
    ctx: &AppContext,
    action: &str,
    batch: &RoundBatch<'_>,
    build: F,
) -> CliResult<Vec<UpdateOutcome>>
where
    F: FnMut(&Round, u32) -> RoundEdit,
{
    let outcomes = ctx
        .updater()
        .run(batch, build, |outcome| {
            report_outcome(action, outcome, ctx.output);
        })
        .await;
    render_batch_summary(&outcomes, ctx.output)?;
    Ok(outcomes)
}
