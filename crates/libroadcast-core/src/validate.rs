//! Validation and parsing helpers for command arguments.

use crate::error::ValidationError;
use crate::model::{CustomScoring, SideScoring};

/// Largest accepted transmission delay, in seconds.
pub const MAX_DELAY_SECS: u32 = 3600;
/// Smallest accepted source polling period, in seconds.
pub const MIN_PERIOD_SECS: u32 = 2;
/// Largest accepted source polling period, in seconds.
pub const MAX_PERIOD_SECS: u32 = 60;
/// Largest accepted number of games in a multi-source round.
pub const MAX_GAME_COUNT: u32 = 64;
/// Largest accepted custom score.
pub const MAX_SCORE: f64 = 10.0;

/// Parse a delay in seconds (`0..=3600`).
///
/// # Errors
///
/// Returns [`ValidationError`] when the input is not an integer or is out of range.
pub fn parse_delay(raw: &str) -> Result<u32, ValidationError> {
    parse_bounded_int("delay", raw, 0, MAX_DELAY_SECS)
}

/// Parse a source polling period in seconds (`2..=60`).
///
/// # Errors
///
/// Returns [`ValidationError`] when the input is not an integer or is out of range.
pub fn parse_period(raw: &str) -> Result<u32, ValidationError> {
    parse_bounded_int("period", raw, MIN_PERIOD_SECS, MAX_PERIOD_SECS)
}

/// Parse a game count for multi-source rounds (`1..=64`).
///
/// # Errors
///
/// Returns [`ValidationError`] when the input is not an integer or is out of range.
pub fn parse_game_count(raw: &str) -> Result<u32, ValidationError> {
    parse_bounded_int("number of games", raw, 1, MAX_GAME_COUNT)
}

fn parse_bounded_int(
    field: &'static str,
    raw: &str,
    min: u32,
    max: u32,
) -> Result<u32, ValidationError> {
    let value = raw
        .trim()
        .parse::<i64>()
        .map_err(|_| ValidationError::NotANumber {
            field,
            value: raw.to_string(),
        })?;
    u32::try_from(value)
        .ok()
        .filter(|value| (min..=max).contains(value))
        .ok_or_else(|| ValidationError::OutOfRange {
            field,
            value: value.to_string(),
            min: min.to_string(),
            max: max.to_string(),
        })
}

/// Parse one custom score in `[0, 10]`.
///
/// # Errors
///
/// Returns [`ValidationError`] when the input is not a finite number or is out of range.
pub fn parse_score(field: &'static str, raw: &str) -> Result<f64, ValidationError> {
    let value = raw
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| ValidationError::NotANumber {
            field,
            value: raw.to_string(),
        })?;
    if !(0.0..=MAX_SCORE).contains(&value) {
        return Err(ValidationError::OutOfRange {
            field,
            value: value.to_string(),
            min: "0".to_string(),
            max: MAX_SCORE.to_string(),
        });
    }
    Ok(value)
}

/// Parse the four custom scoring values in command-line order.
///
/// # Errors
///
/// Returns the first [`ValidationError`] encountered.
pub fn parse_scoring(
    white_win: &str,
    white_draw: &str,
    black_win: &str,
    black_draw: &str,
) -> Result<CustomScoring, ValidationError> {
    Ok(CustomScoring {
        white: SideScoring {
            win: parse_score("white win", white_win)?,
            draw: parse_score("white draw", white_draw)?,
        },
        black: SideScoring {
            win: parse_score("black win", black_win)?,
            draw: parse_score("black draw", black_draw)?,
        },
    })
}

/// Interpret a `startsPrevious` argument. `true`, `1` and `yes` enable it.
#[must_use]
pub fn parse_flag_value(raw: &str) -> bool {
    let value = raw.trim();
    value.eq_ignore_ascii_case("true") || value == "1" || value.eq_ignore_ascii_case("yes")
}
