//! Push PGN into a round, once or on a polling loop.

use std::time::Duration;

use libroadcast_core::{filter_by_fide_ids, parse_games, write_games};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::cli::{PushArgs, PushFilterArgs};
use crate::client::{AppContext, CliError, CliResult};
use crate::output::render_push;

/// How fetched PGN is turned into the pushed body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Payload {
    Raw,
    Filtered { fide_ids: Vec<u64>, first_ongoing: bool },
}

impl Payload {
    fn prepare(&self, pgn: String) -> CliResult<String> {
        match self {
            Self::Raw => Ok(pgn),
            Self::Filtered {
                fide_ids,
                first_ongoing,
            } => {
                let games = parse_games(&pgn)?;
                let total = games.len();
                let matched = filter_by_fide_ids(games, fide_ids, *first_ongoing);
                debug!(total, matched = matched.len(), "filtered games by FIDE id");
                Ok(write_games(&matched))
            }
        }
    }
}

pub(crate) async fn handle_push(ctx: &AppContext, args: PushArgs) -> CliResult<()> {
    let interval = parse_loop_interval(args.interval.as_deref())?;
    push_command(ctx, &args.round_id, &args.source, Payload::Raw, interval).await
}

pub(crate) async fn handle_push_filter(ctx: &AppContext, args: PushFilterArgs) -> CliResult<()> {
    let fide_ids = parse_fide_ids(&args.fide_ids)?;
    let interval = parse_loop_interval(args.interval.as_deref())?;
    let payload = Payload::Filtered {
        fide_ids,
        first_ongoing: args.first_ongoing,
    };
    push_command(ctx, &args.round_id, &args.source, payload, interval).await
}

async fn push_command(
    ctx: &AppContext,
    round_id: &str,
    source: &str,
    payload: Payload,
    interval: Option<Duration>,
) -> CliResult<()> {
    ctx.require_scopes(false).await?;
    let round = ctx.lichess.round(round_id).await?;
    let mut pusher = PushLoop::new(ctx, &round.id, source, payload);

    let Some(interval) = interval else {
        let pgn = pusher.read().await?;
        if pgn.trim().is_empty() {
            println!("No games to push.");
            return Ok(());
        }
        return pusher.push(pgn).await;
    };

    println!(
        "Starting loop to push PGN every {} seconds...",
        interval.as_secs()
    );
    println!("Press Ctrl+C to stop.");
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let tick = pusher.tick().await;
        debug!(?tick, "push loop tick");
        if tick == Tick::ReadFailed {
            eprintln!(
                "Failed to read PGN content. Retrying in {} seconds...",
                interval.as_secs()
            );
        }
    }
}

/// Result of one polling iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Tick {
    Pushed,
    Unchanged,
    Empty,
    ReadFailed,
    PushFailed,
}

/// Reads a source and pushes it, remembering the last body that was accepted.
pub(crate) struct PushLoop<'a> {
    ctx: &'a AppContext,
    round_id: &'a str,
    source: &'a str,
    payload: Payload,
    last_pushed: Option<String>,
}

impl<'a> PushLoop<'a> {
    pub(crate) const fn new(
        ctx: &'a AppContext,
        round_id: &'a str,
        source: &'a str,
        payload: Payload,
    ) -> Self {
        Self {
            ctx,
            round_id,
            source,
            payload,
            last_pushed: None,
        }
    }

    async fn read(&self) -> CliResult<String> {
        let pgn = self.ctx.lichess.read_pgn_source(self.source).await?;
        self.payload.prepare(pgn)
    }

    async fn push(&self, pgn: String) -> CliResult<()> {
        let response = self.ctx.lichess.push_pgn(self.round_id, pgn).await?;
        println!("Successfully pushed PGN for round {}.", self.round_id);
        render_push(self.round_id, &response, self.ctx.output)
    }

    /// Push when the source changed since the last accepted push.
    pub(crate) async fn tick(&mut self) -> Tick {
        let pgn = match self.read().await {
            Ok(pgn) => pgn,
            Err(err) => {
                warn!(source = self.source, error = %err, "failed to read PGN");
                return Tick::ReadFailed;
            }
        };
        if pgn.trim().is_empty() {
            info!(source = self.source, "no games to push");
            return Tick::Empty;
        }
        if self.last_pushed.as_deref() == Some(pgn.as_str()) {
            return Tick::Unchanged;
        }
        match self.push(pgn.clone()).await {
            Ok(()) => {
                self.last_pushed = Some(pgn);
                Tick::Pushed
            }
            Err(err) => {
                eprintln!("error: {}", err.display_message());
                Tick::PushFailed
            }
        }
    }
}

fn parse_loop_interval(raw: Option<&str>) -> CliResult<Option<Duration>> {
    raw.map(|raw| {
        raw.trim()
            .parse::<u64>()
            .ok()
            .filter(|seconds| *seconds > 0)
            .map(Duration::from_secs)
            .ok_or_else(|| CliError::validation("Loop timer must be a positive integer."))
    })
    .transpose()
}

fn parse_fide_ids(raw: &[String]) -> CliResult<Vec<u64>> {
    raw.iter()
        .map(|id| {
            id.trim().parse::<u64>().map_err(|_| {
                CliError::validation(format!("FIDE id must be a number (got '{id}')"))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_support::context_for;
    use anyhow::{Result, anyhow};
    use httpmock::MockServer;
    use httpmock::prelude::*;
    use serde_json::json;

    const FILTER_SOURCE: &str = "[White \"A\"]\n[WhiteFideId \"1\"]\n[BlackFideId \"2\"]\n[Result \"1-0\"]\n\n1. e4 1-0\n\n[White \"C\"]\n[WhiteFideId \"3\"]\n[BlackFideId \"4\"]\n[Result \"*\"]\n\n1. d4 *\n";

    fn mock_round(server: &MockServer) {
        server.mock(|when, then| {
            when.method(GET).path("/api/broadcast/-/-/r1");
            then.status(200)
                .json_body(json!({"round": {"id": "r1"}, "tour": {"id": "t1"}}));
        });
    }

    #[test]
    fn loop_interval_must_be_positive() -> Result<()> {
        assert_eq!(parse_loop_interval(None).map_err(|err| anyhow!(err))?, None);
        assert_eq!(
            parse_loop_interval(Some("15")).map_err(|err| anyhow!(err))?,
            Some(Duration::from_secs(15))
        );
        for raw in ["0", "-5", "soon"] {
            assert!(matches!(
                parse_loop_interval(Some(raw)),
                Err(CliError::Validation(_))
            ));
        }
        Ok(())
    }

    #[test]
    fn fide_ids_must_be_numeric() {
        let ids = vec!["123".to_string(), "x".to_string()];
        assert!(matches!(parse_fide_ids(&ids), Err(CliError::Validation(_))));
    }

    #[test]
    fn filtered_payload_keeps_matching_games() -> Result<()> {
        let payload = Payload::Filtered {
            fide_ids: vec![4],
            first_ongoing: false,
        };
        let pgn = payload
            .prepare(FILTER_SOURCE.to_string())
            .map_err(|err| anyhow!(err))?;
        assert!(pgn.contains("[White \"C\"]"));
        assert!(!pgn.contains("[White \"A\"]"));
        Ok(())
    }

    #[tokio::test]
    async fn single_push_sends_file_contents() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("round.pgn");
        std::fs::write(&path, "[White \"A\"]\n\n1. e4 *\n")?;

        let server = MockServer::start_async().await;
        mock_round(&server);
        let push = server.mock(|when, then| {
            when.method(POST)
                .path("/api/broadcast/round/r1/push")
                .body("[White \"A\"]\n\n1. e4 *\n");
            then.status(200).json_body(json!({
                "games": [{"tags": {"White": "A"}, "moves": 1}]
            }));
        });

        let ctx = context_for(&server)?;
        handle_push(
            &ctx,
            PushArgs {
                round_id: "r1".into(),
                source: path.to_string_lossy().into_owned(),
                interval: None,
            },
        )
        .await?;
        push.assert();
        Ok(())
    }

    #[tokio::test]
    async fn single_push_with_unreadable_source_fails() -> Result<()> {
        let server = MockServer::start_async().await;
        mock_round(&server);
        let ctx = context_for(&server)?;
        let result = handle_push(
            &ctx,
            PushArgs {
                round_id: "r1".into(),
                source: "/nonexistent/round.pgn".into(),
                interval: None,
            },
        )
        .await;
        assert!(matches!(result, Err(CliError::Failure(_))));
        Ok(())
    }

    #[tokio::test]
    async fn push_filter_sends_only_matching_games() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("all.pgn");
        std::fs::write(&path, FILTER_SOURCE)?;

        let server = MockServer::start_async().await;
        mock_round(&server);
        let push = server.mock(|when, then| {
            when.method(POST)
                .path("/api/broadcast/round/r1/push")
                .body("[White \"A\"]\n[WhiteFideId \"1\"]\n[BlackFideId \"2\"]\n[Result \"1-0\"]\n\n1. e4 1-0");
            then.status(200).json_body(json!({"games": []}));
        });

        let ctx = context_for(&server)?;
        handle_push_filter(
            &ctx,
            PushFilterArgs {
                round_id: "r1".into(),
                source: path.to_string_lossy().into_owned(),
                fide_ids: vec!["2".into(), "1".into()],
                interval: None,
                first_ongoing: false,
            },
        )
        .await?;
        push.assert();
        Ok(())
    }

    #[tokio::test]
    async fn loop_pushes_only_changed_content() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("live.pgn");
        let source = path.to_string_lossy().into_owned();
        std::fs::write(&path, "1. e4 *")?;

        let server = MockServer::start_async().await;
        let first = server.mock(|when, then| {
            when.method(POST)
                .path("/api/broadcast/round/r1/push")
                .body("1. e4 *");
            then.status(200).json_body(json!({"games": []}));
        });
        let second = server.mock(|when, then| {
            when.method(POST)
                .path("/api/broadcast/round/r1/push")
                .body("1. e4 e5 *");
            then.status(200).json_body(json!({"games": []}));
        });

        let ctx = context_for(&server)?;
        let mut pusher = PushLoop::new(&ctx, "r1", &source, Payload::Raw);
        assert_eq!(pusher.tick().await, Tick::Pushed);
        assert_eq!(pusher.tick().await, Tick::Unchanged);
        std::fs::write(&path, "1. e4 e5 *")?;
        assert_eq!(pusher.tick().await, Tick::Pushed);
        std::fs::remove_file(&path)?;
        assert_eq!(pusher.tick().await, Tick::ReadFailed);

        assert_eq!(first.hits(), 1);
        assert_eq!(second.hits(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn failed_push_is_retried_on_next_tick() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("live.pgn");
        let source = path.to_string_lossy().into_owned();
        std::fs::write(&path, "1. d4 *")?;

        let server = MockServer::start_async().await;
        let push = server.mock(|when, then| {
            when.method(POST).path("/api/broadcast/round/r1/push");
            then.status(503);
        });

        let ctx = context_for(&server)?;
        let mut pusher = PushLoop::new(&ctx, "r1", &source, Payload::Raw);
        assert_eq!(pusher.tick().await, Tick::PushFailed);
        assert_eq!(pusher.tick().await, Tick::PushFailed);
        assert_eq!(push.hits(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn loop_skips_empty_filter_results() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("live.pgn");
        let source = path.to_string_lossy().into_owned();
        std::fs::write(&path, FILTER_SOURCE)?;

        let server = MockServer::start_async().await;
        let push = server.mock(|when, then| {
            when.method(POST).path("/api/broadcast/round/r1/push");
            then.status(200).json_body(json!({"games": []}));
        });

        let ctx = context_for(&server)?;
        let payload = Payload::Filtered {
            fide_ids: vec![99],
            first_ongoing: true,
        };
        let mut pusher = PushLoop::new(&ctx, "r1", &source, payload);
        assert_eq!(pusher.tick().await, Tick::Empty);
        assert_eq!(push.hits(), 0);
        Ok(())
    }
}
