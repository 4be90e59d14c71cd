//! Serialises an observation into the space-delimited METAR/SPECI text.
//!
//! Group order: type, station, time, wind (+ variation), CAVOK or
//! visibility/directional visibility/present weather/clouds, temperature and
//! dew point, QNH, recent weather and remarks. Empty groups are dropped and the
//! `=` terminator is attached to the last one.

use tracing::debug;

use crate::{
    error::{MetarError, Result},
    model::{
        GUST_THRESHOLD_KT, MISSING_QNH, MISSING_TEMPERATURE, MISSING_WIND_DIRECTION,
        MISSING_WIND_SPEED, Observation, ObservationType, Reported,
    },
    validate::{Checked, ValidationContext, check},
};

pub const TERMINATOR: char = '=';

/// Encodes an observation that passed validation.
pub fn encode_checked(checked: &Checked<'_>) -> String {
    let report = render(checked.observation());
    debug!(report = %report, "encoded observation");
    report
}

/// Validates, then encodes. An observation with findings is never encoded.
pub fn encode(observation: &Observation, ctx: &ValidationContext<'_>) -> Result<String> {
    match check(observation, ctx) {
        Ok(checked) => Ok(encode_checked(&checked)),
        Err(validation) => Err(MetarError::InvalidObservation {
            messages: validation.messages(),
        }),
    }
}

/// Renders whatever has been entered so far, without validation.
pub fn preview(observation: &Observation) -> String {
    render(observation)
}

/// `<type> <station> <DDHHMM>Z NIL=`
pub fn nil_report(observation_type: ObservationType, station_id: &str, utc_time: &str) -> String {
    terminate(vec![
        observation_type.to_string(),
        station_id.to_string(),
        format!("{utc_time}Z"),
        "NIL".to_string(),
    ])
}

fn render(observation: &Observation) -> String {
    let header = observation.header();
    let mut groups = vec![
        header
            .observation_type
            .map(|t| t.to_string())
            .unwrap_or_default(),
        header.station_id.clone(),
        if header.utc_time.is_empty() {
            String::new()
        } else {
            format!("{}Z", header.utc_time)
        },
    ];

    groups.extend(wind_groups(observation));
    groups.extend(sky_groups(observation));
    groups.push(temperature_group(observation));
    groups.push(qnh_group(observation));
    groups.push(supplementary_group(observation));

    groups.retain(|g| !g.is_empty());
    terminate(groups)
}

fn terminate(mut groups: Vec<String>) -> String {
    if let Some(last) = groups.last_mut() {
        last.push(TERMINATOR);
    }
    groups.join(" ")
}

fn wind_groups(observation: &Observation) -> Vec<String> {
    let mut groups = Vec::with_capacity(2);

    if let (Some(direction), Some(speed)) =
        (observation.wind_direction(), observation.wind_speed())
    {
        let direction = match direction {
            Reported::Value(d) => d.as_text(),
            Reported::Missing => MISSING_WIND_DIRECTION,
        };
        let speed_text = match speed {
            Reported::Value(s) => s.as_str(),
            Reported::Missing => MISSING_WIND_SPEED,
        };

        let mut wind = format!("{direction}{speed_text:0>2}");
        let gust_applies = observation
            .wind_speed_knots()
            .is_some_and(|s| s >= GUST_THRESHOLD_KT);
        if let Some(gust) = observation.gust().filter(|_| gust_applies) {
            wind.push('G');
            wind.push_str(gust);
        }
        wind.push_str("KT");
        groups.push(wind);
    }

    if let Some(variation) = observation.wind_variation() {
        if !variation.from.is_empty() && !variation.to.is_empty() {
            groups.push(format!("{}V{}", variation.from, variation.to));
        }
    }

    groups
}

fn sky_groups(observation: &Observation) -> Vec<String> {
    if observation.is_cavok() {
        return vec!["CAVOK".to_string()];
    }

    let mut groups = vec![observation.visibility().to_string()];

    if let Some(directional) = observation.directional_visibility() {
        if let Some(bearing) = directional.bearing.filter(|_| !directional.value.is_empty()) {
            groups.push(format!("{}{bearing}", directional.value));
        }
    }

    if let Some(weather) = observation.present_weather() {
        groups.push(weather.to_string());
    }

    groups.extend(
        observation
            .cloud_layers()
            .iter()
            .filter_map(|layer| layer.token()),
    );

    groups
}

fn temperature_group(observation: &Observation) -> String {
    let text = |value: &Reported<String>| match value {
        Reported::Value(v) => v.clone(),
        Reported::Missing => MISSING_TEMPERATURE.to_string(),
    };

    match (observation.temperature(), observation.dew_point()) {
        (Some(t), Some(d)) => format!("{}/{}", text(t), text(d)),
        _ => String::new(),
    }
}

fn qnh_group(observation: &Observation) -> String {
    match observation.qnh() {
        Some(Reported::Value(q)) => format!("Q{q}"),
        Some(Reported::Missing) => format!("Q{MISSING_QNH}"),
        None => String::new(),
    }
}

fn supplementary_group(observation: &Observation) -> String {
    let recent = observation
        .recent_weather()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(|r| format!("RE{r}"));
    let remarks = observation
        .remarks()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(|r| format!("RMK {r}"));

    [recent, remarks]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ")
}
