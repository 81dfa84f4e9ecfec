//! Builders turning validated command arguments into per-round edit bodies.

use tracing::warn;
use url::Url;

use crate::error::ValidationError;
use crate::model::{CustomScoring, Round, RoundEdit, SyncSource};
use crate::selector::RoundSelector;
use crate::validate::MAX_GAME_COUNT;

/// Placeholder replaced by the round position in single-source templates.
pub const ROUND_PLACEHOLDER: &str = "{}";
/// Round placeholder in multi-source templates.
pub const MULTI_ROUND_PLACEHOLDER: &str = "{r}";
/// Game placeholder in multi-source templates.
pub const MULTI_GAME_PLACEHOLDER: &str = "{g}";
/// Host of the LiveChessCloud viewer.
pub const LIVECHESSCLOUD_HOST: &str = "view.livechesscloud.com";
/// Maximum number of Lichess game ids a round can mirror.
pub const MAX_GAME_IDS: usize = 64;

/// Delay change, optionally shifting the scheduled start by the same amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayEdit {
    delay: u32,
    only_delay: bool,
    no_delay: bool,
}

impl DelayEdit {
    /// Validate the flag combination.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::ConflictingFlags`] when both `only_delay`
    /// and `no_delay` are set.
    pub const fn new(delay: u32, only_delay: bool, no_delay: bool) -> Result<Self, ValidationError> {
        if only_delay && no_delay {
            return Err(ValidationError::ConflictingFlags {
                first: "--onlyDelay",
                second: "--noDelay",
            });
        }
        Ok(Self {
            delay,
            only_delay,
            no_delay,
        })
    }

    /// Body for `round`. Rounds without a start time only get the delay.
    #[must_use]
    pub fn build(&self, round: &Round) -> RoundEdit {
        let shift_ms = i64::from(self.delay) * 1000;
        RoundEdit {
            delay: (!self.no_delay).then_some(self.delay),
            starts_at: if self.only_delay {
                None
            } else {
                round
                    .starts_at
                    .map(|starts_at| starts_at.saturating_add(shift_ms))
            },
            ..RoundEdit::default()
        }
    }
}

/// Move a round's scheduled start by `shift_ms` milliseconds.
#[must_use]
pub fn shift_start(round: &Round, shift_ms: i64) -> RoundEdit {
    RoundEdit {
        starts_at: round
            .starts_at
            .map(|starts_at| starts_at.saturating_add(shift_ms)),
        ..RoundEdit::default()
    }
}

/// Set the source polling period.
#[must_use]
pub fn period_edit(period: u32) -> RoundEdit {
    RoundEdit {
        period: Some(period),
        ..RoundEdit::default()
    }
}

/// Set whether the round starts after the previous one.
#[must_use]
pub fn starts_previous_edit(value: bool) -> RoundEdit {
    RoundEdit {
        starts_after_previous: Some(value),
        ..RoundEdit::default()
    }
}

/// Flatten custom scoring into the dotted form keys the server expects.
#[must_use]
pub fn scoring_edit(scoring: &CustomScoring) -> RoundEdit {
    RoundEdit {
        white_win: Some(scoring.white.win),
        white_draw: Some(scoring.white.draw),
        black_win: Some(scoring.black.win),
        black_draw: Some(scoring.black.draw),
        ..RoundEdit::default()
    }
}

/// Mirror Lichess games by id. Ids beyond [`MAX_GAME_IDS`] are dropped.
#[must_use]
pub fn game_ids_edit(ids: &[String]) -> RoundEdit {
    if ids.len() > MAX_GAME_IDS {
        warn!(
            supplied = ids.len(),
            kept = MAX_GAME_IDS,
            "too many game ids; extra ids are ignored"
        );
    }
    let joined = ids
        .iter()
        .take(MAX_GAME_IDS)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ");
    RoundEdit {
        sync_source: Some(SyncSource::Ids),
        sync_ids: Some(joined),
        ..RoundEdit::default()
    }
}

fn check_http_url(rendered: &str, template: &str) -> Result<Url, ValidationError> {
    let url = Url::parse(rendered).map_err(|err| ValidationError::InvalidUrl {
        reason: format!("'{template}' is not an absolute URL ({err})"),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ValidationError::InvalidUrl {
            reason: format!("'{template}' must use http or https"),
        });
    }
    Ok(url)
}

/// Single-source URL template where `{}` stands for the round position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate {
    template: String,
}

impl UrlTemplate {
    /// Validate `template`.
    ///
    /// LiveChessCloud viewer links must end with `/{}` so each round points
    /// at its own page.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidUrl`] when the rendered URL is not an
    /// absolute http(s) URL or a LiveChessCloud link lacks the trailing placeholder.
    pub fn parse(template: &str) -> Result<Self, ValidationError> {
        let template = template.trim();
        let url = check_http_url(&template.replace(ROUND_PLACEHOLDER, "1"), template)?;
        if url.host_str() == Some(LIVECHESSCLOUD_HOST) && !template.ends_with("/{}") {
            return Err(ValidationError::InvalidUrl {
                reason: format!("LiveChessCloud URLs must end with \"/{{}}\" (got '{template}')"),
            });
        }
        Ok(Self {
            template: template.to_string(),
        })
    }

    /// URL for the round at `position`.
    #[must_use]
    pub fn render(&self, position: u32) -> String {
        self.template
            .replace(ROUND_PLACEHOLDER, &position.to_string())
    }
}

/// `syncSource: url` edit built from a [`UrlTemplate`].
#[derive(Debug, Clone)]
pub struct UrlSourceEdit {
    template: UrlTemplate,
    with_filter: bool,
    slices: Option<String>,
}

impl UrlSourceEdit {
    /// Combine a template with its optional round filter and slice expression.
    #[must_use]
    pub fn new(template: UrlTemplate, with_filter: bool, slices: Option<String>) -> Self {
        Self {
            template,
            with_filter,
            slices: slices
                .map(|slices| slices.trim().to_string())
                .filter(|slices| !slices.is_empty()),
        }
    }

    /// Body for the round at `position`.
    #[must_use]
    pub fn build(&self, position: u32) -> RoundEdit {
        RoundEdit {
            sync_source: Some(SyncSource::Url),
            sync_url: Some(self.template.render(position)),
            only_round: self.with_filter.then_some(position),
            slices: self.slices.clone(),
            ..RoundEdit::default()
        }
    }
}

/// Multi-source template with `{r}` for the round and `{g}` for the game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiUrlTemplate {
    template: String,
    games: u32,
}

impl MultiUrlTemplate {
    /// Validate `template` for a round of `games` boards.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when `{g}` is missing for more than one
    /// game, the URL is not absolute http(s), or it points at LiveChessCloud.
    pub fn parse(template: &str, games: u32) -> Result<Self, ValidationError> {
        let template = template.trim();
        if games == 0 || games > MAX_GAME_COUNT {
            return Err(ValidationError::OutOfRange {
                field: "number of games",
                value: games.to_string(),
                min: "1".to_string(),
                max: MAX_GAME_COUNT.to_string(),
            });
        }
        if games > 1 && !template.contains(MULTI_GAME_PLACEHOLDER) {
            return Err(ValidationError::InvalidUrl {
                reason: format!("'{template}' must contain {{g}} when covering more than one game"),
            });
        }
        let rendered = template
            .replace(MULTI_ROUND_PLACEHOLDER, "1")
            .replace(MULTI_GAME_PLACEHOLDER, "1");
        let url = check_http_url(&rendered, template)?;
        if url.host_str() == Some(LIVECHESSCLOUD_HOST) {
            return Err(ValidationError::InvalidUrl {
                reason: "LiveChessCloud URLs cannot be used as multiple sources; use setPGN instead"
                    .to_string(),
            });
        }
        Ok(Self {
            template: template.to_string(),
            games,
        })
    }

    /// Number of boards the template covers.
    #[must_use]
    pub const fn games(&self) -> u32 {
        self.games
    }

    /// URLs for the round at `position`, one per selected game in ascending order.
    #[must_use]
    pub fn render(&self, position: u32, only_games: &RoundSelector) -> Vec<String> {
        let round = position.to_string();
        (1..=self.games)
            .filter(|game| only_games.matches(*game))
            .map(|game| {
                self.template
                    .replace(MULTI_ROUND_PLACEHOLDER, &round)
                    .replace(MULTI_GAME_PLACEHOLDER, &game.to_string())
            })
            .collect()
    }
}

/// `syncSource: urls` edit built from a [`MultiUrlTemplate`].
#[derive(Debug, Clone)]
pub struct MultiUrlSourceEdit {
    template: MultiUrlTemplate,
    only_games: RoundSelector,
    with_filter: bool,
}

impl MultiUrlSourceEdit {
    /// `only_games` is parsed with the game count as its open-ended bound.
    #[must_use]
    pub fn new(template: MultiUrlTemplate, only_games: Option<&str>, with_filter: bool) -> Self {
        let only_games = only_games.map_or_else(RoundSelector::all, |expr| {
            RoundSelector::parse(expr, template.games())
        });
        Self {
            template,
            only_games,
            with_filter,
        }
    }

    /// Body for the round at `position`.
    #[must_use]
    pub fn build(&self, position: u32) -> RoundEdit {
        RoundEdit {
            sync_source: Some(SyncSource::Urls),
            sync_urls: Some(self.template.render(position, &self.only_games).join("\n")),
            only_round: self.with_filter.then_some(position),
            ..RoundEdit::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SideScoring;

    fn round(starts_at: Option<i64>) -> Round {
        Round {
            id: "r1".into(),
            starts_at,
            ..Round::default()
        }
    }

    #[test]
    fn delay_shifts_start_by_default() -> Result<(), ValidationError> {
        let edit = DelayEdit::new(300, false, false)?.build(&round(Some(1_000_000)));
        assert_eq!(edit.delay, Some(300));
        assert_eq!(edit.starts_at, Some(1_300_000));
        Ok(())
    }

    #[test]
    fn delay_flags_select_fields() -> Result<(), ValidationError> {
        let only = DelayEdit::new(300, true, false)?.build(&round(Some(1_000_000)));
        assert_eq!(only.delay, Some(300));
        assert_eq!(only.starts_at, None);

        let none = DelayEdit::new(300, false, true)?.build(&round(Some(1_000_000)));
        assert_eq!(none.delay, None);
        assert_eq!(none.starts_at, Some(1_300_000));

        let unscheduled = DelayEdit::new(300, false, false)?.build(&round(None));
        assert_eq!(unscheduled.delay, Some(300));
        assert_eq!(unscheduled.starts_at, None);
        Ok(())
    }

    #[test]
    fn delay_rejects_conflicting_flags() {
        assert!(matches!(
            DelayEdit::new(10, true, true),
            Err(ValidationError::ConflictingFlags { .. })
        ));
    }

    #[test]
    fn shift_start_moves_both_directions() {
        assert_eq!(shift_start(&round(Some(10_000)), 5_000).starts_at, Some(15_000));
        assert_eq!(shift_start(&round(Some(10_000)), -4_000).starts_at, Some(6_000));
        assert!(shift_start(&round(None), 5_000).is_empty());
    }

    #[test]
    fn scoring_uses_dotted_keys() -> anyhow::Result<()> {
        let scoring = CustomScoring {
            white: SideScoring { win: 3.0, draw: 1.0 },
            black: SideScoring { win: 2.0, draw: 1.5 },
        };
        let value = serde_json::to_value(scoring_edit(&scoring))?;
        assert_eq!(
            value,
            serde_json::json!({
                "customScoring.white.win": 3.0,
                "customScoring.white.draw": 1.0,
                "customScoring.black.win": 2.0,
                "customScoring.black.draw": 1.5
            })
        );
        Ok(())
    }

    #[test]
    fn game_ids_are_space_joined_and_capped() {
        let ids: Vec<String> = (0..70).map(|n| format!("g{n:06}")).collect();
        let edit = game_ids_edit(&ids);
        assert_eq!(edit.sync_source, Some(SyncSource::Ids));
        let joined = edit.sync_ids.unwrap_or_default();
        assert_eq!(joined.split(' ').count(), MAX_GAME_IDS);
        assert!(joined.starts_with("g000000 g000001"));
    }

    #[test]
    fn url_template_substitutes_round_position() -> Result<(), ValidationError> {
        let template = UrlTemplate::parse("https://example.com/r{}/games.pgn")?;
        let edit = UrlSourceEdit::new(template, true, Some("1-5".into())).build(3);
        assert_eq!(edit.sync_source, Some(SyncSource::Url));
        assert_eq!(
            edit.sync_url.as_deref(),
            Some("https://example.com/r3/games.pgn")
        );
        assert_eq!(edit.only_round, Some(3));
        assert_eq!(edit.slices.as_deref(), Some("1-5"));
        Ok(())
    }

    #[test]
    fn url_template_without_filter_omits_round_and_blank_slices() -> Result<(), ValidationError> {
        let template = UrlTemplate::parse("https://example.com/live.pgn")?;
        let edit = UrlSourceEdit::new(template, false, Some("  ".into())).build(2);
        assert_eq!(edit.sync_url.as_deref(), Some("https://example.com/live.pgn"));
        assert_eq!(edit.only_round, None);
        assert_eq!(edit.slices, None);
        Ok(())
    }

    #[test]
    fn url_template_rejects_relative_and_non_http() {
        assert!(UrlTemplate::parse("not a url/{}").is_err());
        assert!(UrlTemplate::parse("ftp://example.com/{}").is_err());
    }

    #[test]
    fn livechesscloud_requires_trailing_placeholder() -> Result<(), ValidationError> {
        assert!(UrlTemplate::parse("https://view.livechesscloud.com/#abc-123").is_err());
        let template = UrlTemplate::parse("https://view.livechesscloud.com/#abc-123/{}")?;
        assert_eq!(
            template.render(4),
            "https://view.livechesscloud.com/#abc-123/4"
        );
        Ok(())
    }

    #[test]
    fn multi_template_expands_rounds_and_games() -> Result<(), ValidationError> {
        let template = MultiUrlTemplate::parse("https://example.com/{r}/{g}.pgn", 3)?;
        let edit = MultiUrlSourceEdit::new(template, None, false).build(2);
        assert_eq!(edit.sync_source, Some(SyncSource::Urls));
        assert_eq!(
            edit.sync_urls.as_deref(),
            Some("https://example.com/2/1.pgn\nhttps://example.com/2/2.pgn\nhttps://example.com/2/3.pgn")
        );
        assert_eq!(edit.only_round, None);
        Ok(())
    }

    #[test]
    fn multi_template_honours_game_filter_and_round_filter() -> Result<(), ValidationError> {
        let template = MultiUrlTemplate::parse("https://example.com/{r}/{g}.pgn", 6)?;
        let edit = MultiUrlSourceEdit::new(template, Some("2,5+"), true).build(1);
        assert_eq!(
            edit.sync_urls.as_deref(),
            Some("https://example.com/1/2.pgn\nhttps://example.com/1/5.pgn\nhttps://example.com/1/6.pgn")
        );
        assert_eq!(edit.only_round, Some(1));
        Ok(())
    }

    #[test]
    fn multi_template_validation() {
        assert!(MultiUrlTemplate::parse("https://example.com/{r}.pgn", 2).is_err());
        assert!(MultiUrlTemplate::parse("https://example.com/{r}.pgn", 1).is_ok());
        assert!(MultiUrlTemplate::parse("https://example.com/{r}/{g}", 0).is_err());
        assert!(MultiUrlTemplate::parse("https://example.com/{r}/{g}", 4_000_000_000).is_err());
        assert!(
            MultiUrlTemplate::parse("https://view.livechesscloud.com/#x/{r}/{g}", 2).is_err()
        );
    }
}
