//! Parsing of signed, human-readable time shifts such as `1h30m` or `-15m`.

use crate::error::ScheduleError;

/// Parse a signed time shift into milliseconds.
///
/// Accepts `humantime` durations (`2h`, `1h 30m`, `45s`, `1day`), a single
/// fractional amount with a unit (`1.5h`), an optional leading `-` or `+`,
/// and bare integers interpreted as milliseconds.
///
/// # Errors
///
/// Returns [`ScheduleError`] when the input is empty, unrecognised, or does
/// not fit in signed milliseconds.
pub fn parse_time_shift(raw: &str) -> Result<i64, ScheduleError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ScheduleError::Empty);
    }

    let (negative, magnitude) = match trimmed.as_bytes()[0] {
        b'-' => (true, trimmed[1..].trim_start()),
        b'+' => (false, trimmed[1..].trim_start()),
        _ => (false, trimmed),
    };
    if magnitude.is_empty() {
        return Err(ScheduleError::Unparseable {
            value: raw.to_string(),
        });
    }

    let millis = if magnitude.bytes().all(|byte| byte.is_ascii_digit()) {
        magnitude
            .parse::<i64>()
            .map_err(|_| ScheduleError::Overflow {
                value: raw.to_string(),
            })?
    } else if let Ok(duration) = humantime::parse_duration(magnitude) {
        i64::try_from(duration.as_millis()).map_err(|_| ScheduleError::Overflow {
            value: raw.to_string(),
        })?
    } else {
        let millis = parse_fractional(magnitude).ok_or_else(|| ScheduleError::Unparseable {
            value: raw.to_string(),
        })?;
        whole_millis(millis).ok_or_else(|| ScheduleError::Overflow {
            value: raw.to_string(),
        })?
    };

    Ok(if negative { -millis } else { millis })
}

fn parse_fractional(magnitude: &str) -> Option<f64> {
    let split = magnitude
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .filter(|index| *index > 0)?;
    let (amount, unit) = magnitude.split_at(split);
    let amount: f64 = amount.parse().ok()?;
    let unit_ms = match unit.trim().to_ascii_lowercase().as_str() {
        "ms" | "msec" | "msecs" | "millisecond" | "milliseconds" => 1.0,
        "s" | "sec" | "secs" | "second" | "seconds" => 1_000.0,
        "m" | "min" | "mins" | "minute" | "minutes" => 60_000.0,
        "h" | "hr" | "hrs" | "hour" | "hours" => 3_600_000.0,
        "d" | "day" | "days" => 86_400_000.0,
        _ => return None,
    };
    Some(amount * unit_ms)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn whole_millis(millis: f64) -> Option<i64> {
    (millis.is_finite() && millis < i64::MAX as f64).then(|| millis.round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_units_and_compound_durations() {
        assert_eq!(parse_time_shift("1h"), Ok(3_600_000));
        assert_eq!(parse_time_shift("30m"), Ok(1_800_000));
        assert_eq!(parse_time_shift("1h30m"), Ok(5_400_000));
        assert_eq!(parse_time_shift("1h 30m"), Ok(5_400_000));
        assert_eq!(parse_time_shift("2days"), Ok(172_800_000));
        assert_eq!(parse_time_shift("1.5h"), Ok(5_400_000));
        assert_eq!(parse_time_shift("-0.5 hours"), Ok(-1_800_000));
    }

    #[test]
    fn sign_prefix_controls_direction() {
        assert_eq!(parse_time_shift("-15m"), Ok(-900_000));
        assert_eq!(parse_time_shift("+10s"), Ok(10_000));
        assert_eq!(parse_time_shift(" - 1h "), Ok(-3_600_000));
    }

    #[test]
    fn bare_integers_are_milliseconds() {
        assert_eq!(parse_time_shift("1500"), Ok(1_500));
        assert_eq!(parse_time_shift("-250"), Ok(-250));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_time_shift("   "), Err(ScheduleError::Empty));
        assert!(matches!(
            parse_time_shift("soon"),
            Err(ScheduleError::Unparseable { .. })
        ));
        assert!(matches!(
            parse_time_shift("-"),
            Err(ScheduleError::Unparseable { .. })
        ));
        assert!(matches!(
            parse_time_shift("99999999999999999999"),
            Err(ScheduleError::Overflow { .. })
        ));
    }
}
