//! Argument parsing and command dispatch for the `libroadcast` binary.

use std::ffi::OsString;
use std::time::Duration;

use clap::{
    Arg, ArgAction, Args, CommandFactory, FromArgMatches, Parser, Subcommand, ValueEnum,
};
use libroadcast_config::{CredentialStore, DOMAIN_ENV, TOKEN_ENV, resolve_credentials};
use libroadcast_core::EDIT_INTERVAL;
use libroadcast_telemetry::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, init_logging};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::client::{AppContext, CliError, CliResult, EXIT_FAILURE, LichessClient, parse_domain};
use crate::commands::login::handle_login;
use crate::commands::push::{handle_push, handle_push_filter};
use crate::commands::scoring::handle_score;
use crate::commands::source::{
    handle_convert_names, handle_set_lichess_games, handle_set_pgn, handle_set_pgn_multi,
};
use crate::commands::timing::{
    handle_delay, handle_fix_schedule, handle_period, handle_starts_previous,
};

pub(crate) const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Parses CLI arguments, executes the requested command, and returns the
/// process exit code.
pub async fn run() -> i32 {
    let cli = match parse_cli(std::env::args_os()) {
        Ok(cli) => cli,
        Err(err) => {
            let exit_code = if err.use_stderr() { EXIT_FAILURE } else { 0 };
            // Nothing useful to do if stdout or stderr is closed.
            let _ = err.print();
            return exit_code;
        }
    };

    let logging = LoggingConfig {
        level: &cli.global.log_level,
        format: cli.global.log_format,
        version: env!("CARGO_PKG_VERSION"),
    };
    if let Err(err) = init_logging(&logging) {
        eprintln!("warning: {err}");
    }

    let trace_id = Uuid::new_v4().to_string();
    debug!(trace_id = %trace_id, "starting command");

    match dispatch(cli, &trace_id).await {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            if err.wants_usage_hint() {
                eprintln!("Use --help to see usage.");
            }
            EXIT_FAILURE
        }
    }
}

/// Parse arguments, exposing `-v/--version` alongside `-h/--help`.
pub(crate) fn parse_cli<I, T>(args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = Cli::command()
        .disable_version_flag(true)
        .arg(
            Arg::new("version")
                .short('v')
                .long("version")
                .action(ArgAction::Version)
                .help("Print version"),
        )
        .try_get_matches_from(args)?;
    Cli::from_arg_matches(&matches)
}

async fn dispatch(cli: Cli, trace_id: &str) -> CliResult<()> {
    let store = CredentialStore::default_location();
    let timeout = Duration::from_secs(cli.global.timeout);

    match cli.command {
        Command::Login(args) => handle_login(&store?, args, timeout).await,
        Command::Admin(command) => {
            let ctx = build_context(&cli.global, store.ok().as_ref(), trace_id)?;
            dispatch_admin(&ctx, command).await
        }
    }
}

async fn dispatch_admin(ctx: &AppContext, command: AdminCommand) -> CliResult<()> {
    match command {
        AdminCommand::Delay(args) => handle_delay(ctx, args).await,
        AdminCommand::SetPgn(args) => handle_set_pgn(ctx, args).await,
        AdminCommand::SetPgnMulti(args) => handle_set_pgn_multi(ctx, args).await,
        AdminCommand::SetLichessGames(args) => handle_set_lichess_games(ctx, args).await,
        AdminCommand::ConvertNamesToId(args) => handle_convert_names(ctx, args).await,
        AdminCommand::FixSchedule(args) => handle_fix_schedule(ctx, args).await,
        AdminCommand::StartsPrevious(args) => handle_starts_previous(ctx, args).await,
        AdminCommand::Period(args) => handle_period(ctx, args).await,
        AdminCommand::Score(args) => handle_score(ctx, args).await,
        AdminCommand::Push(args) => handle_push(ctx, args).await,
        AdminCommand::PushFilterId(args) => handle_push_filter(ctx, args).await,
    }
}

fn build_context(
    global: &GlobalArgs,
    store: Option<&CredentialStore>,
    trace_id: &str,
) -> CliResult<AppContext> {
    let stored = store.and_then(|store| {
        store.load().unwrap_or_else(|err| {
            warn!(error = %err, "ignoring unreadable credentials file");
            None
        })
    });
    let credentials = resolve_credentials(
        global.token.as_deref(),
        global.domain.as_deref(),
        stored.as_ref(),
    )
    .ok_or_else(|| {
        CliError::auth(format!(
            "no Lichess token found; set {TOKEN_ENV} or run `libroadcast login`"
        ))
    })?;

    let base_url = parse_domain(&credentials.domain)?;
    debug!(domain = %base_url, "using Lichess instance");
    let lichess = LichessClient::new(
        base_url,
        &credentials.token,
        Duration::from_secs(global.timeout),
        trace_id,
    )?;

    Ok(AppContext {
        lichess,
        stored_scopes: credentials.stored_scopes,
        output: global.output,
        edit_interval: EDIT_INTERVAL,
    })
}

fn parse_log_format(input: &str) -> Result<LogFormat, String> {
    input.parse::<LogFormat>().map_err(|err| err.to_string())
}

#[derive(Parser)]
#[command(
    name = "libroadcast",
    version,
    about = "Administrative CLI for Lichess broadcasts"
)]
pub(crate) struct Cli {
    #[command(flatten)]
    pub(crate) global: GlobalArgs,
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Args)]
pub(crate) struct GlobalArgs {
    /// Lichess personal access token.
    #[arg(long, global = true, env = TOKEN_ENV, hide_env_values = true)]
    pub(crate) token: Option<String>,
    /// Lichess base URL.
    #[arg(long, global = true, env = DOMAIN_ENV)]
    pub(crate) domain: Option<String>,
    /// HTTP request timeout in seconds.
    #[arg(
        long,
        global = true,
        env = "LIBROADCAST_HTTP_TIMEOUT_SECS",
        default_value_t = DEFAULT_TIMEOUT_SECS
    )]
    pub(crate) timeout: u64,
    /// Log level or filter directive; `RUST_LOG` takes precedence.
    #[arg(
        long = "log-level",
        global = true,
        env = "LIBROADCAST_LOG",
        default_value = DEFAULT_LOG_LEVEL
    )]
    pub(crate) log_level: String,
    /// Log line format (`pretty` or `json`).
    #[arg(
        long = "log-format",
        global = true,
        value_parser = parse_log_format,
        default_value = "pretty"
    )]
    pub(crate) log_format: LogFormat,
    #[arg(
        long = "output",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Select output format for command results"
    )]
    pub(crate) output: OutputFormat,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Save a Lichess token for later commands, or remove it with --logout.
    Login(LoginArgs),
    #[command(flatten)]
    Admin(AdminCommand),
}

#[derive(Subcommand)]
pub(crate) enum AdminCommand {
    /// Set the transmission delay of broadcast rounds.
    Delay(DelayArgs),
    /// Point rounds at a single PGN URL; `{}` is replaced by the round number.
    #[command(name = "setPGN")]
    SetPgn(SetPgnArgs),
    /// Point rounds at several PGN URLs, one per game.
    #[command(name = "setPGNMulti")]
    SetPgnMulti(SetPgnMultiArgs),
    /// Mirror Lichess games by id into a round.
    #[command(name = "setLichessGames")]
    SetLichessGames(SetLichessGamesArgs),
    /// Read the GameId tags of a round's PGN and mirror those games.
    #[command(name = "convertNamesToID")]
    ConvertNamesToId(RoundArgs),
    /// Shift round start times by a duration such as `1h`, `-30m` or `1.5h`.
    #[command(name = "fixSchedule")]
    FixSchedule(FixScheduleArgs),
    /// Set whether rounds start after the previous one finishes.
    #[command(name = "startsPrevious")]
    StartsPrevious(StartsPreviousArgs),
    /// Set the source polling period of rounds (moderators only).
    Period(PeriodArgs),
    /// Set custom scoring for rounds.
    Score(ScoreArgs),
    /// Push PGN from a file or URL into a round.
    Push(PushArgs),
    /// Push only the games of the given FIDE ids into a round.
    #[command(name = "pushFilterID")]
    PushFilterId(PushFilterArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct LoginArgs {
    /// Token starting with `lip_`; prompted for when omitted.
    pub(crate) token: Option<String>,
    /// Lichess base URL.
    pub(crate) domain: Option<String>,
    /// Remove stored credentials.
    #[arg(long)]
    pub(crate) logout: bool,
    /// Save the token without asking Lichess for its scopes.
    #[arg(long = "skip-validation")]
    pub(crate) skip_validation: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct RoundsArg {
    /// Rounds to edit, e.g. `1-4,6,8+`; all rounds when omitted.
    #[arg(long)]
    pub(crate) rounds: Option<String>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DelayArgs {
    pub(crate) broadcast_id: String,
    /// Delay in seconds (0-3600).
    pub(crate) delay: String,
    #[command(flatten)]
    pub(crate) rounds: RoundsArg,
    /// Change the delay without moving start times.
    #[arg(long = "onlyDelay")]
    pub(crate) only_delay: bool,
    /// Move start times by the delay without changing it.
    #[arg(long = "noDelay")]
    pub(crate) no_delay: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct SetPgnArgs {
    pub(crate) broadcast_id: String,
    /// Source URL template.
    pub(crate) source_url: String,
    #[command(flatten)]
    pub(crate) rounds: RoundsArg,
    /// Only keep games whose round tag matches the round number.
    #[arg(long = "withFilter")]
    pub(crate) with_filter: bool,
    /// Game slice filter, e.g. `1-5,7`.
    #[arg(long)]
    pub(crate) slice: Option<String>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct SetPgnMultiArgs {
    pub(crate) broadcast_id: String,
    /// Source URL template with `{r}` (round) and `{g}` (game) placeholders.
    pub(crate) source_url: String,
    /// Number of games per round.
    pub(crate) games: String,
    #[command(flatten)]
    pub(crate) rounds: RoundsArg,
    /// Only keep games whose round tag matches the round number.
    #[arg(long = "withFilter")]
    pub(crate) with_filter: bool,
    /// Games to include, e.g. `1-4,7`.
    #[arg(long = "onlyGames")]
    pub(crate) only_games: Option<String>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct SetLichessGamesArgs {
    pub(crate) round_id: String,
    /// Lichess game ids (at most 64).
    #[arg(required = true, num_args = 1..)]
    pub(crate) game_ids: Vec<String>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct RoundArgs {
    pub(crate) round_id: String,
}

#[derive(Args, Debug, Default)]
pub(crate) struct FixScheduleArgs {
    pub(crate) broadcast_id: String,
    /// Signed duration added to each start time.
    #[arg(allow_hyphen_values = true)]
    pub(crate) time_diff: String,
    #[command(flatten)]
    pub(crate) rounds: RoundsArg,
}

#[derive(Args, Debug, Default)]
pub(crate) struct StartsPreviousArgs {
    pub(crate) broadcast_id: String,
    /// `true`, `1` or `yes` to enable; anything else disables.
    pub(crate) value: String,
}

#[derive(Args, Debug, Default)]
pub(crate) struct PeriodArgs {
    pub(crate) broadcast_id: String,
    /// Polling period in seconds (2-60).
    pub(crate) period: String,
    #[command(flatten)]
    pub(crate) rounds: RoundsArg,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ScoreArgs {
    pub(crate) broadcast_id: String,
    /// Points for a white win.
    pub(crate) white_win: String,
    /// Points for a white draw.
    pub(crate) white_draw: String,
    /// Points for a black win.
    pub(crate) black_win: String,
    /// Points for a black draw.
    pub(crate) black_draw: String,
    #[command(flatten)]
    pub(crate) rounds: RoundsArg,
}

#[derive(Args, Debug, Default)]
pub(crate) struct PushArgs {
    pub(crate) round_id: String,
    /// PGN file path or http(s) URL.
    pub(crate) source: String,
    /// Re-read the source every N seconds and push changes.
    #[arg(long = "loop", value_name = "SECONDS")]
    pub(crate) interval: Option<String>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct PushFilterArgs {
    pub(crate) round_id: String,
    /// PGN file path or http(s) URL.
    pub(crate) source: String,
    /// FIDE ids; two or more are read as (white, black) pairs.
    #[arg(required = true, num_args = 1..)]
    pub(crate) fide_ids: Vec<String>,
    /// Re-read the source every N seconds and push changes.
    #[arg(long = "loop", value_name = "SECONDS")]
    pub(crate) interval: Option<String>,
    /// Put unfinished games first.
    #[arg(long = "firstOngoing")]
    pub(crate) first_ongoing: bool,
}

#[derive(Copy, Clone, Debug, Default, ValueEnum, PartialEq, Eq)]
pub(crate) enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Result, anyhow};
    use clap::error::ErrorKind;

    fn parse(args: &[&str]) -> Result<Cli> {
        parse_cli(std::iter::once("libroadcast").chain(args.iter().copied()))
            .map_err(|err| anyhow!(err.to_string()))
    }

    #[test]
    fn short_and_long_version_flags_are_accepted() {
        for flag in ["-v", "--version"] {
            let err = parse_cli(["libroadcast", flag]).err();
            assert_eq!(err.map(|err| err.kind()), Some(ErrorKind::DisplayVersion));
        }
    }

    #[test]
    fn help_is_not_an_error_exit() {
        let err = parse_cli(["libroadcast", "--help"]).err();
        assert!(err.is_some_and(|err| !err.use_stderr()));
    }

    #[test]
    fn unknown_command_is_rejected() {
        let err = parse_cli(["libroadcast", "explode"]).err();
        assert!(err.is_some_and(|err| err.use_stderr()));
    }

    #[test]
    fn delay_flags_use_camel_case() -> Result<()> {
        let cli = parse(&["delay", "bcast", "60", "--rounds", "1-3", "--onlyDelay"])?;
        let Command::Admin(AdminCommand::Delay(args)) = cli.command else {
            return Err(anyhow!("expected delay command"));
        };
        assert_eq!(args.broadcast_id, "bcast");
        assert_eq!(args.delay, "60");
        assert_eq!(args.rounds.rounds.as_deref(), Some("1-3"));
        assert!(args.only_delay);
        assert!(!args.no_delay);
        Ok(())
    }

    #[test]
    fn fix_schedule_accepts_negative_shift() -> Result<()> {
        let cli = parse(&["fixSchedule", "bcast", "-2h", "--rounds", "4+"])?;
        let Command::Admin(AdminCommand::FixSchedule(args)) = cli.command else {
            return Err(anyhow!("expected fixSchedule command"));
        };
        assert_eq!(args.time_diff, "-2h");
        assert_eq!(args.rounds.rounds.as_deref(), Some("4+"));
        Ok(())
    }

    #[test]
    fn push_filter_collects_ids_and_flags() -> Result<()> {
        let cli = parse(&[
            "pushFilterID",
            "round1",
            "games.pgn",
            "111",
            "222",
            "--loop",
            "30",
            "--firstOngoing",
        ])?;
        let Command::Admin(AdminCommand::PushFilterId(args)) = cli.command else {
            return Err(anyhow!("expected pushFilterID command"));
        };
        assert_eq!(args.fide_ids, vec!["111", "222"]);
        assert_eq!(args.interval.as_deref(), Some("30"));
        assert!(args.first_ongoing);
        Ok(())
    }

    #[test]
    fn login_logout_needs_no_token() -> Result<()> {
        let cli = parse(&["login", "--logout"])?;
        let Command::Login(args) = cli.command else {
            return Err(anyhow!("expected login command"));
        };
        assert!(args.logout);
        assert!(args.token.is_none());
        Ok(())
    }

    #[test]
    fn global_flags_apply_after_the_command() -> Result<()> {
        let cli = parse(&[
            "push",
            "round1",
            "games.pgn",
            "--output",
            "json",
            "--log-format",
            "json",
            "--domain",
            "http://localhost:9663",
        ])?;
        assert_eq!(cli.global.output, OutputFormat::Json);
        assert_eq!(cli.global.log_format, LogFormat::Json);
        assert_eq!(cli.global.domain.as_deref(), Some("http://localhost:9663"));
        Ok(())
    }

    #[test]
    fn set_lichess_games_requires_ids() {
        assert!(parse(&["setLichessGames", "round1"]).is_err());
    }

    #[test]
    fn missing_token_is_an_auth_error() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = CredentialStore::at(dir.path().join("credentials.json"));
        let global = GlobalArgs {
            token: None,
            domain: None,
            timeout: DEFAULT_TIMEOUT_SECS,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_format: LogFormat::Pretty,
            output: OutputFormat::Table,
        };
        let result = build_context(&global, Some(&store), "trace");
        assert!(matches!(result, Err(CliError::Auth(_))));
        Ok(())
    }

    #[test]
    fn explicit_token_builds_context_without_store() -> Result<()> {
        let global = GlobalArgs {
            token: Some("lip_flag".to_string()),
            domain: Some("http://localhost:9663".to_string()),
            timeout: DEFAULT_TIMEOUT_SECS,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_format: LogFormat::Pretty,
            output: OutputFormat::Json,
        };
        let ctx = build_context(&global, None, "trace")?;
        assert_eq!(ctx.output, OutputFormat::Json);
        assert_eq!(ctx.edit_interval, EDIT_INTERVAL);
        Ok(())
    }
}
