use chrono::{DateTime, Datelike, TimeZone, Utc};

use crate::{
    model::Observation,
    patterns,
    validate::{ErrorTag, GroupId, GroupReport, GroupValidator, ValidationContext},
};

pub const PAST_TIME_PROMPT: &str =
    "The time entered is in the past. Are you doing a correction to a previous METAR?";

/// Outcome of checking a `DDHHMM` observation time against "now".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeCheck {
    Accepted,
    /// Minutes before now; the observer may confirm a correction.
    Past { minutes: i64 },
    TooFarAhead { minutes: i64 },
    Malformed(&'static str),
}

/// Builds the candidate instant in the current UTC month and compares it
/// with `now`, rounded to whole minutes.
pub fn check_utc_time(utc_time: &str, now: DateTime<Utc>, window_minutes: i64) -> TimeCheck {
    if !patterns::is_utc_time(utc_time) {
        return TimeCheck::Malformed("Invalid format (use DDHHMM)");
    }

    let field = |range: std::ops::Range<usize>| utc_time.get(range)?.parse::<u32>().ok();
    let (Some(day), Some(hour), Some(minute)) = (field(0..2), field(2..4), field(4..6)) else {
        return TimeCheck::Malformed("Invalid format (use DDHHMM)");
    };

    if minute % 5 != 0 {
        return TimeCheck::Malformed("METAR time must be to the nearest 5 minutes");
    }

    let Some(candidate) = Utc
        .with_ymd_and_hms(now.year(), now.month(), day, hour, minute, 0)
        .single()
    else {
        return TimeCheck::Malformed("Day, hour or minute is out of range for the current month");
    };

    let seconds = (candidate - now).num_seconds();
    let minutes = (seconds as f64 / 60.0 + 0.5).floor() as i64;

    if minutes > window_minutes {
        TimeCheck::TooFarAhead { minutes }
    } else if minutes < 0 {
        TimeCheck::Past { minutes: -minutes }
    } else {
        TimeCheck::Accepted
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TimeValidator;

impl GroupValidator for TimeValidator {
    fn group(&self) -> GroupId {
        GroupId::Time
    }

    fn check(&self, observation: &Observation, ctx: &ValidationContext<'_>) -> GroupReport {
        let mut report = GroupReport::default();
        let header = observation.header();

        match check_utc_time(&header.utc_time, ctx.now, ctx.rules.future_window_minutes) {
            TimeCheck::Accepted => {}
            TimeCheck::Past { .. } if header.past_time_acknowledged => {}
            TimeCheck::Past { .. } => {
                report.soft(ErrorTag::Time, "Past time", PAST_TIME_PROMPT);
            }
            TimeCheck::TooFarAhead { .. } => {
                report.semantic(
                    ErrorTag::Time,
                    format!(
                        "Time is too far in the future (max {} min ahead)",
                        ctx.rules.future_window_minutes
                    ),
                );
            }
            TimeCheck::Malformed(reason) => report.format(ErrorTag::Time, reason),
        }

        report
    }
}
