use libroadcast_core::edits::scoring_edit;
use libroadcast_core::validate::parse_scoring;
use libroadcast_core::{RoundBatch, RoundSelector};

use crate::cli::ScoreArgs;
use crate::client::{AppContext, CliResult};
use crate::commands::{fetch_rounds, run_batch};

pub(crate) async fn handle_score(ctx: &AppContext, args: ScoreArgs) -> CliResult<()> {
    let scoring = parse_scoring(
        &args.white_win,
        &args.white_draw,
        &args.black_win,
        &args.black_draw,
    )?;
    let selector = RoundSelector::rounds(args.rounds.rounds.as_deref());
    ctx.require_scopes(false).await?;

    let rounds = fetch_rounds(ctx, &args.broadcast_id).await?;
    let batch = RoundBatch::select(&rounds, &selector);
    run_batch(ctx, "scoring", &batch, |_, _| scoring_edit(&scoring)).await?;
    Ok(())
}
