//! Wind group rules.
//!
//! Rules are applied in a fixed order: required fields, missing-value
//! pairing, calm wind, VRB, direction format, gust, variation, speed ceiling.
//! A missing or "not reported" pair ends the check: there is nothing numeric
//! left to judge.

use crate::{
    model::{GUST_THRESHOLD_KT, Observation, Reported, WindDirection},
    patterns,
    validate::{ErrorTag, GroupId, GroupReport, GroupValidator, ValidationContext},
};

const TAG: ErrorTag = ErrorTag::Wind;

/// Smallest spread between variation bounds worth reporting.
pub const MIN_VARIATION_DEGREES: i32 = 60;

/// Gust must exceed the mean speed by at least this much.
pub const MIN_GUST_EXCESS_KT: u32 = 10;

#[derive(Debug, Clone, Copy, Default)]
pub struct WindValidator;

impl GroupValidator for WindValidator {
    fn group(&self) -> GroupId {
        GroupId::Wind
    }

    fn check(&self, observation: &Observation, ctx: &ValidationContext<'_>) -> GroupReport {
        let mut report = GroupReport::default();

        let (Some(direction), Some(speed)) =
            (observation.wind_direction(), observation.wind_speed())
        else {
            if observation.wind_direction().is_none() {
                report.semantic(TAG, "Wind direction is required.");
            }
            if observation.wind_speed().is_none() {
                report.semantic(TAG, "Wind speed is required.");
            }
            return report;
        };

        let (direction, speed_text) = match (direction, speed) {
            (Reported::Value(d), Reported::Value(s)) => (d, s),
            (Reported::Missing, Reported::Missing) => return report,
            (Reported::Missing, Reported::Value(_)) => {
                report.semantic(TAG, r#"Wind speed must be "//" if direction is missing ("///")."#);
                return report;
            }
            (Reported::Value(_), Reported::Missing) => {
                report.semantic(TAG, r#"Wind direction must be "///" if speed is missing ("//")."#);
                return report;
            }
        };

        let speed = patterns::is_digits(speed_text)
            .then(|| speed_text.parse::<u32>().ok())
            .flatten();
        if speed.is_none() {
            report.format(TAG, r#"Wind speed must be a non-negative number or "//" for missing."#);
        }

        let calm_direction = matches!(direction, WindDirection::Degrees(d) if d == "000");
        if let Some(speed) = speed {
            if calm_direction && speed != 0 {
                report.semantic(TAG, "Wind speed must be 0 when direction is 000.");
            }
            if speed == 0 && !calm_direction {
                report.semantic(TAG, "Wind direction must be 000 when speed is 0.");
            }
        }

        match direction {
            WindDirection::Variable => {
                if speed.is_some_and(|s| s > ctx.rules.vrb_max_speed) {
                    report.semantic(
                        TAG,
                        format!(
                            "Variable wind (VRB) should only be used for wind speed ≤ {} KT.",
                            ctx.rules.vrb_max_speed
                        ),
                    );
                }
            }
            WindDirection::Degrees(degrees) => check_direction(degrees, &mut report),
        }

        if let Some(speed) = speed.filter(|s| *s >= GUST_THRESHOLD_KT) {
            check_gust(observation.gust(), speed, &mut report);
        }

        if !matches!(direction, WindDirection::Variable) {
            if let Some(variation) = observation.wind_variation() {
                if !variation.from.is_empty() && !variation.to.is_empty() {
                    check_variation(&variation.from, &variation.to, &mut report);
                }
            }
        }

        if speed.is_some_and(|s| s > ctx.rules.max_wind_speed) {
            report.semantic(
                TAG,
                format!(
                    "Wind speed exceeds maximum operational limit (>{} KT).",
                    ctx.rules.max_wind_speed
                ),
            );
        }

        report
    }
}

fn check_direction(degrees: &str, report: &mut GroupReport) {
    let value = patterns::is_three_digits(degrees)
        .then(|| degrees.parse::<u32>().ok())
        .flatten();
    let Some(value) = value else {
        report.format(TAG, r#"Wind direction must be 3 digits, "VRB" or "///"."#);
        return;
    };

    if value > 360 {
        report.semantic(TAG, "Wind direction must be between 000 and 360.");
    } else if value % 10 != 0 {
        report.semantic(TAG, "Wind direction must be a multiple of 10 (e.g. 010, 120).");
    }
}

fn check_gust(gust: Option<&str>, speed: u32, report: &mut GroupReport) {
    let Some(gust) = gust else {
        report.semantic(TAG, "Wind gust required when wind speed ≥ 15 KT.");
        return;
    };

    match gust.parse::<u32>() {
        Ok(g) if patterns::is_digits(gust) => {
            if g < speed.saturating_add(MIN_GUST_EXCESS_KT) {
                report.semantic(TAG, "Wind gust must be ≥ wind speed + 10 KT.");
            }
        }
        _ => report.format(TAG, "Wind gust must be a number."),
    }
}

/// Clockwise spread from `from` to `to`, wrapping through north.
pub fn variation_spread(from: i32, to: i32) -> i32 {
    if to > from { to - from } else { 360 + to - from }
}

fn check_variation(from: &str, to: &str, report: &mut GroupReport) {
    if !patterns::is_three_digits(from) || !patterns::is_three_digits(to) {
        report.format(TAG, "Wind variation bounds must be 3 digits.");
        return;
    }

    let (Ok(from), Ok(to)) = (from.parse::<i32>(), to.parse::<i32>()) else {
        return;
    };

    if variation_spread(from, to) < MIN_VARIATION_DEGREES {
        report.semantic(TAG, "Wind variation must differ by at least 60°.");
    }
}
