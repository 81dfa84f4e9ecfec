//! Lichess HTTP client, CLI error type, and shared request helpers.

use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use libroadcast_config::ConfigError;
use libroadcast_core::{
    BatchRoundUpdater, Broadcast, EditError, PgnError, Round, RoundEdit, RoundEditor,
    ScheduleError, ValidationError,
};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::cli::OutputFormat;

pub(crate) const HEADER_REQUEST_ID: &str = "x-request-id";
pub(crate) const USER_AGENT: &str = concat!("libroadcast-cli/", env!("CARGO_PKG_VERSION"));
pub(crate) const STUDY_SCOPES: [&str; 2] = ["study:read", "study:write"];
pub(crate) const MODERATOR_SCOPE: &str = "web:mod";
pub(crate) const EXIT_FAILURE: i32 = 1;

/// CLI-level error type separating usage, authentication, and operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Auth(String),
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn wants_usage_hint(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) | Self::Auth(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.display_message())
    }
}

impl std::error::Error for CliError {}

impl From<ValidationError> for CliError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<ScheduleError> for CliError {
    fn from(err: ScheduleError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self::Failure(err.into())
    }
}

impl From<PgnError> for CliError {
    fn from(err: PgnError) -> Self {
        Self::Failure(err.into())
    }
}

/// Per-game summary returned by the push endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct PushedGame {
    #[serde(default)]
    pub(crate) tags: HashMap<String, String>,
    #[serde(default)]
    pub(crate) moves: Option<u32>,
    #[serde(default)]
    pub(crate) error: Option<String>,
}

/// Push endpoint response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct PushResponse {
    #[serde(default)]
    pub(crate) games: Vec<PushedGame>,
}

#[derive(Deserialize)]
struct RoundResponse {
    round: Round,
}

#[derive(Deserialize)]
struct TokenInfo {
    #[serde(default)]
    scopes: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Authenticated accessor for the Lichess broadcast API.
#[derive(Clone)]
pub(crate) struct LichessClient {
    http: Client,
    sources: Client,
    base_url: Url,
    token: String,
}

impl LichessClient {
    /// Build a client sending the bearer token and trace id on every call.
    pub(crate) fn new(
        base_url: Url,
        token: &str,
        timeout: Duration,
        trace_id: &str,
    ) -> CliResult<Self> {
        let mut default_headers = HeaderMap::new();
        let mut bearer = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| CliError::auth("token contains invalid characters"))?;
        bearer.set_sensitive(true);
        default_headers.insert(AUTHORIZATION, bearer);
        default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let request_id = HeaderValue::from_str(trace_id).map_err(|_| {
            CliError::failure(anyhow!("trace identifier contains invalid characters"))
        })?;
        default_headers.insert(HEADER_REQUEST_ID, request_id);

        let http = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .default_headers(default_headers)
            .build()
            .map_err(|err| CliError::failure(anyhow!("failed to build HTTP client: {err}")))?;
        let sources = plain_client(timeout)?;

        Ok(Self {
            http,
            sources,
            base_url,
            token: token.to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> CliResult<Url> {
        endpoint(&self.base_url, path)
    }

    /// Fetch a broadcast and its rounds in official order.
    pub(crate) async fn broadcast(&self, broadcast_id: &str) -> CliResult<Broadcast> {
        let path = format!("api/broadcast/{broadcast_id}");
        let response = self
            .http
            .get(self.endpoint(&path)?)
            .send()
            .await
            .map_err(|err| request_failed(&path, &err))?;
        if !response.status().is_success() {
            return Err(classify_problem(response).await);
        }
        response.json::<Broadcast>().await.map_err(|err| {
            CliError::failure(anyhow!("failed to decode broadcast {broadcast_id}: {err}"))
        })
    }

    /// Fetch a single round by id.
    pub(crate) async fn round(&self, round_id: &str) -> CliResult<Round> {
        let path = format!("api/broadcast/-/-/{round_id}");
        let response = self
            .http
            .get(self.endpoint(&path)?)
            .send()
            .await
            .map_err(|err| request_failed(&path, &err))?;
        if !response.status().is_success() {
            return Err(classify_problem(response).await);
        }
        response
            .json::<RoundResponse>()
            .await
            .map(|body| body.round)
            .map_err(|err| CliError::failure(anyhow!("failed to decode round {round_id}: {err}")))
    }

    /// Download the games of a round as PGN.
    pub(crate) async fn round_pgn(&self, round_id: &str) -> CliResult<String> {
        let path = format!("api/broadcast/round/{round_id}.pgn");
        let response = self
            .http
            .get(self.endpoint(&path)?)
            .header(ACCEPT, "application/x-chess-pgn")
            .send()
            .await
            .map_err(|err| request_failed(&path, &err))?;
        if !response.status().is_success() {
            return Err(classify_problem(response).await);
        }
        response
            .text()
            .await
            .map_err(|err| CliError::failure(anyhow!("failed to read PGN of round {round_id}: {err}")))
    }

    /// Replace the games of a round with `pgn`.
    pub(crate) async fn push_pgn(&self, round_id: &str, pgn: String) -> CliResult<PushResponse> {
        let path = format!("api/broadcast/round/{round_id}/push");
        let response = self
            .http
            .post(self.endpoint(&path)?)
            .header(CONTENT_TYPE, "text/plain")
            .body(pgn)
            .send()
            .await
            .map_err(|err| request_failed(&path, &err))?;
        if !response.status().is_success() {
            return Err(classify_problem(response).await);
        }
        response
            .json::<PushResponse>()
            .await
            .map_err(|err| CliError::failure(anyhow!("failed to decode push response: {err}")))
    }

    /// Fail unless the token carries the study scopes (and `web:mod` when `moderator`).
    ///
    /// Scopes recorded at login are trusted when they already satisfy the
    /// requirement; otherwise the token is checked against the server.
    pub(crate) async fn require_scopes(&self, stored: &[String], moderator: bool) -> CliResult<()> {
        let required = required_scopes(moderator);
        if !stored.is_empty() && missing_scopes(stored, &required).is_empty() {
            debug!("token scopes satisfied by stored credentials");
            return Ok(());
        }

        let granted = token_scopes(&self.http, &self.base_url, &self.token).await?;
        let missing = missing_scopes(&granted, &required);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(CliError::auth(format!(
                "missing required token scopes: {}",
                missing.join(", ")
            )))
        }
    }

    /// Read PGN text from an http(s) URL or a local file.
    pub(crate) async fn read_pgn_source(&self, source: &str) -> CliResult<String> {
        read_pgn_source(&self.sources, source).await
    }
}

#[async_trait]
impl RoundEditor for LichessClient {
    async fn edit_round(&self, round_id: &str, edit: &RoundEdit) -> Result<(), EditError> {
        let path = format!("broadcast/round/{round_id}/edit");
        let url = self.endpoint(&path).map_err(|err| EditError::Transport {
            message: err.display_message(),
        })?;
        let response = self
            .http
            .post(url)
            .query(&[("patch", "1")])
            .json(edit)
            .send()
            .await
            .map_err(|err| EditError::Transport {
                message: err.to_string(),
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        let reason = serde_json::from_str::<ErrorBody>(&body)
            .map(|body| body.error)
            .ok()
            .filter(|reason| !reason.trim().is_empty())
            .or_else(|| status.canonical_reason().map(str::to_string))
            .unwrap_or_else(|| "Unknown status".to_string());
        Err(EditError::Status {
            status: status.as_u16(),
            reason,
        })
    }
}

/// Application context passed to command handlers.
pub(crate) struct AppContext {
    pub(crate) lichess: LichessClient,
    pub(crate) stored_scopes: Vec<String>,
    pub(crate) output: OutputFormat,
    pub(crate) edit_interval: Duration,
}

impl AppContext {
    pub(crate) async fn require_scopes(&self, moderator: bool) -> CliResult<()> {
        self.lichess
            .require_scopes(&self.stored_scopes, moderator)
            .await
    }

    pub(crate) fn updater(&self) -> BatchRoundUpdater<'_, LichessClient> {
        BatchRoundUpdater::new(&self.lichess).with_interval(self.edit_interval)
    }
}

/// HTTP client without credentials, used for login and third-party PGN sources.
pub(crate) fn plain_client(timeout: Duration) -> CliResult<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|err| CliError::failure(anyhow!("failed to build HTTP client: {err}")))
}

/// Parse a Lichess base URL, forcing a trailing slash so relative joins keep any path prefix.
pub(crate) fn parse_domain(input: &str) -> CliResult<Url> {
    let normalized = libroadcast_config::normalize_domain(input);
    let url = normalized
        .parse::<Url>()
        .map_err(|err| CliError::validation(format!("invalid domain '{input}': {err}")))?;
    if matches!(url.scheme(), "http" | "https") {
        Ok(url)
    } else {
        Err(CliError::validation(format!(
            "invalid domain '{input}': must use http or https"
        )))
    }
}

fn endpoint(base_url: &Url, path: &str) -> CliResult<Url> {
    base_url
        .join(path)
        .map_err(|err| CliError::failure(anyhow!("invalid base URL: {err}")))
}

fn request_failed(path: &str, err: &reqwest::Error) -> CliError {
    CliError::failure(anyhow!("request to /{path} failed: {err}"))
}

fn required_scopes(moderator: bool) -> Vec<&'static str> {
    let mut scopes = STUDY_SCOPES.to_vec();
    if moderator {
        scopes.push(MODERATOR_SCOPE);
    }
    scopes
}

fn missing_scopes<'a>(granted: &[String], required: &[&'a str]) -> Vec<&'a str> {
    required
        .iter()
        .copied()
        .filter(|scope| !granted.iter().any(|granted| granted == scope))
        .collect()
}

/// Ask the server which scopes `token` carries.
pub(crate) async fn token_scopes(http: &Client, base_url: &Url, token: &str) -> CliResult<Vec<String>> {
    let path = "api/token/test";
    let response = http
        .post(endpoint(base_url, path)?)
        .header(CONTENT_TYPE, "text/plain")
        .body(token.to_string())
        .send()
        .await
        .map_err(|err| request_failed(path, &err))?;
    if !response.status().is_success() {
        return Err(classify_problem(response).await);
    }
    let tokens = response
        .json::<HashMap<String, Option<TokenInfo>>>()
        .await
        .map_err(|err| CliError::failure(anyhow!("failed to decode token test response: {err}")))?;
    let info = tokens
        .get(token)
        .and_then(Option::as_ref)
        .ok_or_else(|| CliError::auth("token is invalid or expired"))?;
    Ok(info
        .scopes
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|scope| !scope.is_empty())
        .map(str::to_string)
        .collect())
}

async fn read_pgn_source(http: &Client, source: &str) -> CliResult<String> {
    if source.starts_with("http://") || source.starts_with("https://") {
        info!(source, "fetching PGN");
        let response = http
            .get(source)
            .send()
            .await
            .map_err(|err| CliError::failure(anyhow!("failed to fetch PGN from {source}: {err}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(CliError::failure(anyhow!(
                "failed to fetch PGN from {source}: status {status}"
            )));
        }
        response
            .text()
            .await
            .map_err(|err| CliError::failure(anyhow!("failed to read PGN from {source}: {err}")))
    } else {
        tokio::fs::read_to_string(source)
            .await
            .map_err(|err| CliError::failure(anyhow!("failed to read PGN file '{source}': {err}")))
    }
}

/// Classify an HTTP error response into a CLI error.
pub(crate) async fn classify_problem(response: reqwest::Response) -> CliError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ErrorBody>(&body)
        .map(|body| body.error)
        .unwrap_or_else(|_| body.trim().to_string());

    let message = if detail.is_empty() {
        format!("request failed with status {status}")
    } else {
        format!("{detail} (status {status})")
    };

    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        CliError::auth(message)
    } else {
        CliError::failure(anyhow!(message))
    }
}
