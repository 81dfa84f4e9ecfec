//! Commands that change where a round's games come from.

use anyhow::anyhow;
use libroadcast_core::edits::game_ids_edit;
use libroadcast_core::validate::parse_game_count;
use libroadcast_core::{
    MAX_GAME_IDS, MultiUrlSourceEdit, MultiUrlTemplate, RoundBatch, RoundEdit, RoundEditor,
    RoundSelector, UrlSourceEdit, UrlTemplate, game_ids, parse_games,
};
use tracing::{info, warn};

use crate::cli::{RoundArgs, SetLichessGamesArgs, SetPgnArgs, SetPgnMultiArgs};
use crate::client::{AppContext, CliError, CliResult};
use crate::commands::{fetch_rounds, run_batch};
use crate::output::describe_edit;

pub(crate) async fn handle_set_pgn(ctx: &AppContext, args: SetPgnArgs) -> CliResult<()> {
    let template = UrlTemplate::parse(&args.source_url)?;
    let plan = UrlSourceEdit::new(template, args.with_filter, args.slice);
    let selector = RoundSelector::rounds(args.rounds.rounds.as_deref());
    ctx.require_scopes(false).await?;

    let rounds = fetch_rounds(ctx, &args.broadcast_id).await?;
    let batch = RoundBatch::select(&rounds, &selector);
    run_batch(ctx, "source URL", &batch, |_, position| plan.build(position)).await?;
    Ok(())
}

pub(crate) async fn handle_set_pgn_multi(ctx: &AppContext, args: SetPgnMultiArgs) -> CliResult<()> {
    let games = parse_game_count(&args.games)?;
    let template = MultiUrlTemplate::parse(&args.source_url, games)?;
    let plan = MultiUrlSourceEdit::new(template, args.only_games.as_deref(), args.with_filter);
    let selector = RoundSelector::rounds(args.rounds.rounds.as_deref());
    ctx.require_scopes(false).await?;

    let rounds = fetch_rounds(ctx, &args.broadcast_id).await?;
    let batch = RoundBatch::select(&rounds, &selector);
    run_batch(ctx, "source URLs", &batch, |_, position| plan.build(position)).await?;
    Ok(())
}

pub(crate) async fn handle_set_lichess_games(
    ctx: &AppContext,
    args: SetLichessGamesArgs,
) -> CliResult<()> {
    let ids: Vec<String> = args
        .game_ids
        .iter()
        .flat_map(|arg| arg.split_whitespace())
        .map(str::to_string)
        .collect();
    if ids.is_empty() {
        return Err(CliError::validation("at least one game id is required"));
    }
    ctx.require_scopes(false).await?;

    let round = ctx.lichess.round(&args.round_id).await?;
    edit_single_round(ctx, "games", &round.id, &game_ids_edit(&ids)).await
}

pub(crate) async fn handle_convert_names(ctx: &AppContext, args: RoundArgs) -> CliResult<()> {
    ctx.require_scopes(false).await?;

    let round = ctx.lichess.round(&args.round_id).await?;
    let pgn = ctx.lichess.round_pgn(&round.id).await?;
    let games = parse_games(&pgn)?;
    let ids = game_ids(&games);
    if ids.is_empty() {
        return Err(CliError::failure(anyhow!(
            "No games with GameId found in the PGN."
        )));
    }
    info!(round_id = %round.id, games = games.len(), ids = ids.len(), "collected game ids");
    if ids.len() > MAX_GAME_IDS {
        warn!(found = ids.len(), "round has more games than can be mirrored");
    }
    edit_single_round(ctx, "games", &round.id, &game_ids_edit(&ids)).await
}

async fn edit_single_round(
    ctx: &AppContext,
    action: &str,
    round_id: &str,
    edit: &RoundEdit,
) -> CliResult<()> {
    ctx.lichess
        .edit_round(round_id, edit)
        .await
        .map_err(|err| {
            CliError::failure(anyhow!("failed to update {action} for round {round_id}: {err}"))
        })?;
    println!("Updated {action} for round {round_id}: {}", describe_edit(edit));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::RoundsArg;
    use crate::client::test_support::context_for;
    use anyhow::Result;
    use httpmock::MockServer;
    use httpmock::prelude::*;
    use serde_json::json;

    fn mock_two_rounds(server: &MockServer) {
        server.mock(|when, then| {
            when.method(GET).path("/api/broadcast/bcast");
            then.status(200).json_body(json!({
                "tour": {"id": "bcast"},
                "rounds": [{"id": "r1"}, {"id": "r2"}]
            }));
        });
    }

    fn mock_round(server: &MockServer, id: &str) {
        let path = format!("/api/broadcast/-/-/{id}");
        let body = json!({"round": {"id": id}, "tour": {"id": "bcast"}});
        server.mock(move |when, then| {
            when.method(GET).path(path);
            then.status(200).json_body(body);
        });
    }

    #[tokio::test]
    async fn set_pgn_renders_position_filter_and_slices() -> Result<()> {
        let server = MockServer::start_async().await;
        mock_two_rounds(&server);
        let first = server.mock(|when, then| {
            when.method(POST)
                .path("/broadcast/round/r1/edit")
                .json_body(json!({
                    "syncSource": "url",
                    "syncUrl": "https://example.com/round-1.pgn",
                    "onlyRound": 1,
                    "slices": "1-5"
                }));
            then.status(200);
        });
        let second = server.mock(|when, then| {
            when.method(POST)
                .path("/broadcast/round/r2/edit")
                .json_body(json!({
                    "syncSource": "url",
                    "syncUrl": "https://example.com/round-2.pgn",
                    "onlyRound": 2,
                    "slices": "1-5"
                }));
            then.status(200);
        });

        let ctx = context_for(&server)?;
        handle_set_pgn(
            &ctx,
            SetPgnArgs {
                broadcast_id: "bcast".into(),
                source_url: "https://example.com/round-{}.pgn".into(),
                rounds: RoundsArg::default(),
                with_filter: true,
                slice: Some("1-5".into()),
            },
        )
        .await?;
        first.assert();
        second.assert();
        Ok(())
    }

    #[tokio::test]
    async fn set_pgn_rejects_bad_livechesscloud_template() -> Result<()> {
        let server = MockServer::start_async().await;
        let ctx = context_for(&server)?;
        let result = handle_set_pgn(
            &ctx,
            SetPgnArgs {
                broadcast_id: "bcast".into(),
                source_url: "https://view.livechesscloud.com/#abc/{}/1".into(),
                ..SetPgnArgs::default()
            },
        )
        .await;
        assert!(matches!(result, Err(CliError::Validation(_))));
        Ok(())
    }

    #[tokio::test]
    async fn unmatched_selector_falls_back_to_all_rounds() -> Result<()> {
        let server = MockServer::start_async().await;
        mock_two_rounds(&server);
        let first = server.mock(|when, then| {
            when.method(POST).path("/broadcast/round/r1/edit");
            then.status(200);
        });
        let second = server.mock(|when, then| {
            when.method(POST).path("/broadcast/round/r2/edit");
            then.status(200);
        });

        let ctx = context_for(&server)?;
        handle_set_pgn_multi(
            &ctx,
            SetPgnMultiArgs {
                broadcast_id: "bcast".into(),
                source_url: "https://example.com/{r}/{g}.pgn".into(),
                games: "2".into(),
                rounds: RoundsArg {
                    rounds: Some("9".into()),
                },
                ..SetPgnMultiArgs::default()
            },
        )
        .await?;
        first.assert();
        second.assert();
        Ok(())
    }

    #[tokio::test]
    async fn set_pgn_multi_joins_selected_games() -> Result<()> {
        let server = MockServer::start_async().await;
        mock_two_rounds(&server);
        let second = server.mock(|when, then| {
            when.method(POST)
                .path("/broadcast/round/r2/edit")
                .json_body(json!({
                    "syncSource": "urls",
                    "syncUrls": "https://example.com/2/1.pgn\nhttps://example.com/2/3.pgn"
                }));
            then.status(200);
        });

        let ctx = context_for(&server)?;
        handle_set_pgn_multi(
            &ctx,
            SetPgnMultiArgs {
                broadcast_id: "bcast".into(),
                source_url: "https://example.com/{r}/{g}.pgn".into(),
                games: "3".into(),
                rounds: RoundsArg {
                    rounds: Some("2".into()),
                },
                with_filter: false,
                only_games: Some("1,3".into()),
            },
        )
        .await?;
        second.assert();
        Ok(())
    }

    #[tokio::test]
    async fn set_pgn_multi_requires_game_placeholder() -> Result<()> {
        let server = MockServer::start_async().await;
        let ctx = context_for(&server)?;
        let result = handle_set_pgn_multi(
            &ctx,
            SetPgnMultiArgs {
                broadcast_id: "bcast".into(),
                source_url: "https://example.com/{r}.pgn".into(),
                games: "4".into(),
                ..SetPgnMultiArgs::default()
            },
        )
        .await;
        assert!(matches!(result, Err(CliError::Validation(_))));
        Ok(())
    }

    #[tokio::test]
    async fn set_lichess_games_joins_ids() -> Result<()> {
        let server = MockServer::start_async().await;
        mock_round(&server, "r1");
        let edit = server.mock(|when, then| {
            when.method(POST)
                .path("/broadcast/round/r1/edit")
                .json_body(json!({"syncSource": "ids", "syncIds": "aaaa1111 bbbb2222 cccc3333"}));
            then.status(200);
        });

        let ctx = context_for(&server)?;
        handle_set_lichess_games(
            &ctx,
            SetLichessGamesArgs {
                round_id: "r1".into(),
                game_ids: vec!["aaaa1111".into(), "bbbb2222 cccc3333".into()],
            },
        )
        .await?;
        edit.assert();
        Ok(())
    }

    #[tokio::test]
    async fn convert_names_uses_game_id_tags() -> Result<()> {
        let server = MockServer::start_async().await;
        mock_round(&server, "r1");
        server.mock(|when, then| {
            when.method(GET).path("/api/broadcast/round/r1.pgn");
            then.status(200).body(
                "[White \"A\"]\n[GameId \"id000001\"]\n\n1. e4 *\n\n[White \"B\"]\n[GameId \"id000002\"]\n\n1. d4 *\n",
            );
        });
        let edit = server.mock(|when, then| {
            when.method(POST)
                .path("/broadcast/round/r1/edit")
                .json_body(json!({"syncSource": "ids", "syncIds": "id000001 id000002"}));
            then.status(200);
        });

        let ctx = context_for(&server)?;
        handle_convert_names(&ctx, RoundArgs { round_id: "r1".into() }).await?;
        edit.assert();
        Ok(())
    }

    #[tokio::test]
    async fn convert_names_without_game_ids_fails() -> Result<()> {
        let server = MockServer::start_async().await;
        mock_round(&server, "r1");
        server.mock(|when, then| {
            when.method(GET).path("/api/broadcast/round/r1.pgn");
            then.status(200).body("[White \"A\"]\n\n1. e4 *\n");
        });
        let edit = server.mock(|when, then| {
            when.method(POST).path("/broadcast/round/r1/edit");
            then.status(200);
        });

        let ctx = context_for(&server)?;
        let result = handle_convert_names(&ctx, RoundArgs { round_id: "r1".into() }).await;
        assert!(matches!(result, Err(CliError::Failure(_))));
        assert_eq!(edit.hits(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn rejected_single_edit_is_a_failure() -> Result<()> {
        let server = MockServer::start_async().await;
        mock_round(&server, "r1");
        server.mock(|when, then| {
            when.method(POST).path("/broadcast/round/r1/edit");
            then.status(400).json_body(json!({"error": "bad ids"}));
        });

        let ctx = context_for(&server)?;
        let result = handle_set_lichess_games(
            &ctx,
            SetLichessGamesArgs {
                round_id: "r1".into(),
                game_ids: vec!["zzz".into()],
            },
        )
        .await;
        match result {
            Err(CliError::Failure(err)) => assert_eq!(
                err.to_string(),
                "failed to update games for round r1: 400 bad ids"
            ),
            _ => return Err(anyhow!("expected a failure")),
        }
        Ok(())
    }
}
