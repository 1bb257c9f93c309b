// Human time-span parsing: "2w", "3d12h", "90m", "45s", or bare seconds.

use chrono::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SpanParseError {
    #[error("empty time span")]
    Empty,
    #[error("invalid number in time span: `{0}`")]
    InvalidNumber(String),
    #[error("unknown time unit `{0}` (expected w, d, h, m, or s)")]
    UnknownUnit(char),
}

/// Parse a human time span into a duration.
///
/// Accepts one or more `<number><unit>` segments (`w`, `d`, `h`, `m`, `s`)
/// or a bare number of seconds. Segments accumulate, so `"1d12h"` is 36
/// hours.
pub fn parse_span(input: &str) -> Result<Duration, SpanParseError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(SpanParseError::Empty);
    }

    let mut total = Duration::zero();
    let mut digits = String::new();
    for ch in input.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
            continue;
        }
        let value: i64 =
            digits.parse().map_err(|_| SpanParseError::InvalidNumber(digits.clone()))?;
        digits.clear();
        total = total
            + match ch {
                'w' => Duration::weeks(value),
                'd' => Duration::days(value),
                'h' => Duration::hours(value),
                'm' => Duration::minutes(value),
                's' => Duration::seconds(value),
                other => return Err(SpanParseError::UnknownUnit(other)),
            };
    }

    // A trailing bare number counts as seconds.
    if !digits.is_empty() {
        let value: i64 = digits.parse().map_err(|_| SpanParseError::InvalidNumber(digits))?;
        total = total + Duration::seconds(value);
    }

    Ok(total)
}

/// Render a duration as `DDd HHh MMm SSs`, matching the spread log header.
pub fn format_span(span: Duration) -> String {
    let seconds = span.num_seconds().max(0);
    format!(
        "{:02}d {:02}h {:02}m {:02}s",
        seconds / 86_400,
        (seconds / 3_600) % 24,
        (seconds / 60) % 60,
        seconds % 60,
    )
}
