//! Syntactic patterns of the individual METAR groups.

use regex::Regex;
use std::sync::LazyLock;

// `\d` is any Unicode digit in `regex`; reports only carry ASCII digits.
static UTC_TIME: LazyLock<Regex> = LazyLock::new(|| compile(r"^[0-9]{6}$"));
static THREE_DIGITS: LazyLock<Regex> = LazyLock::new(|| compile(r"^[0-9]{3}$"));
static FOUR_DIGITS: LazyLock<Regex> = LazyLock::new(|| compile(r"^[0-9]{4}$"));
static DIGITS: LazyLock<Regex> = LazyLock::new(|| compile(r"^[0-9]+$"));
static TEMPERATURE: LazyLock<Regex> = LazyLock::new(|| compile(r"^M?[0-9]{2}$"));
static WEATHER_CODE: LazyLock<Regex> = LazyLock::new(|| compile(r"^(-|\+)?[A-Z]{2,6}$"));

fn compile(pattern: &str) -> Regex {
    // Patterns are literals above; a failure here is a programming error.
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid pattern {pattern}: {e}"))
}

/// `DDHHMM`
pub fn is_utc_time(s: &str) -> bool {
    UTC_TIME.is_match(s)
}

/// Wind direction, variation bound, cloud height.
pub fn is_three_digits(s: &str) -> bool {
    THREE_DIGITS.is_match(s)
}

/// Visibility, directional visibility, QNH.
pub fn is_four_digits(s: &str) -> bool {
    FOUR_DIGITS.is_match(s)
}

pub fn is_digits(s: &str) -> bool {
    DIGITS.is_match(s)
}

/// Two digits, `M` prefix for values below zero.
pub fn is_temperature(s: &str) -> bool {
    TEMPERATURE.is_match(s)
}

/// Intensity-optional phenomena code such as `-SHRA` or `+TSRA`.
pub fn is_weather_code(s: &str) -> bool {
    WEATHER_CODE.is_match(s)
}

/// Parses a temperature in METAR notation (`M05` is -5).
pub fn parse_temperature(s: &str) -> Option<i32> {
    if !is_temperature(s) {
        return None;
    }

    match s.strip_prefix('M') {
        Some(digits) => digits.parse::<i32>().ok().map(|v| -v),
        None => s.parse().ok(),
    }
}
