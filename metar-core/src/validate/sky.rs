//! Visibility, present weather and cloud rules.
//!
//! CAVOK replaces all three sub-groups, so none of these rules apply while it
//! is set.

use crate::{
    model::{CloudAmount, Observation},
    patterns,
    validate::{ErrorTag, GroupId, GroupReport, GroupValidator, ValidationContext},
};

/// Below this visibility (metres) the obscuring phenomenon must be reported.
pub const LOW_VISIBILITY_M: u32 = 1000;

/// `FEW` is only accepted in the lowest two layers.
const FEW_LAYER_LIMIT: usize = 2;

#[derive(Debug, Clone, Copy, Default)]
pub struct SkyValidator;

impl GroupValidator for SkyValidator {
    fn group(&self) -> GroupId {
        GroupId::Sky
    }

    fn check(&self, observation: &Observation, _ctx: &ValidationContext<'_>) -> GroupReport {
        let mut report = GroupReport::default();
        if observation.is_cavok() {
            return report;
        }

        check_visibility(observation, &mut report);
        check_directional_visibility(observation, &mut report);
        check_present_weather(observation, &mut report);
        check_clouds(observation, &mut report);

        report
    }
}

fn check_visibility(observation: &Observation, report: &mut GroupReport) {
    let visibility = observation.visibility();

    if visibility.is_empty() {
        report.semantic(ErrorTag::Visibility, "Visibility is required.");
    } else if !patterns::is_four_digits(visibility) {
        report.format(
            ErrorTag::Visibility,
            "Visibility must be 4 digits between 0000 and 9999 meters.",
        );
    }
}

fn check_directional_visibility(observation: &Observation, report: &mut GroupReport) {
    let Some(directional) = observation.directional_visibility() else {
        return;
    };

    match (directional.value.is_empty(), directional.bearing) {
        (true, None) => {}
        (false, Some(_)) => {
            if !patterns::is_four_digits(&directional.value) {
                report.format(
                    ErrorTag::Visibility,
                    "Directional visibility must be 4 digits (0000–9999) and direction must be valid (e.g., NE, SW).",
                );
            }
        }
        _ => report.semantic(
            ErrorTag::Visibility,
            "Both directional visibility and its value must be filled.",
        ),
    }
}

fn check_present_weather(observation: &Observation, report: &mut GroupReport) {
    let weather = observation.present_weather().filter(|w| !w.is_empty());

    let low_visibility = patterns::is_four_digits(observation.visibility())
        && observation
            .visibility()
            .parse::<u32>()
            .is_ok_and(|v| v < LOW_VISIBILITY_M);

    match weather {
        None if low_visibility => report.semantic(
            ErrorTag::Weather,
            "Present weather must be reported when visibility is less than 1000 meters.",
        ),
        Some(code) if !patterns::is_weather_code(code) => {
            report.format(ErrorTag::Weather, "Invalid present weather code.");
        }
        _ => {}
    }
}

fn check_clouds(observation: &Observation, report: &mut GroupReport) {
    let layers = observation.cloud_layers();

    if !layers.iter().any(|layer| layer.is_complete()) {
        report.semantic(ErrorTag::Cloud, "At least one cloud layer must be specified.");
        return;
    }

    for (index, layer) in layers.iter().enumerate() {
        if layer.is_blank() {
            continue;
        }
        let number = index + 1;

        if layer.amount == Some(CloudAmount::Few) && index >= FEW_LAYER_LIMIT {
            report.semantic(
                ErrorTag::Cloud,
                format!("Cloud layer {number}: \"FEW\" only allowed in first 2 layers."),
            );
        }

        if layer.convective.is_some() && layer.height.is_empty() {
            report.semantic(ErrorTag::Cloud, "CB/TCU clouds must have a height.");
        } else if !layer.is_complete() {
            report.semantic(
                ErrorTag::Cloud,
                format!("Cloud layer {number}: amount and height are both required."),
            );
        }

        if !layer.height.is_empty() && !patterns::is_three_digits(&layer.height) {
            report.format(
                ErrorTag::Cloud,
                format!("Cloud layer {number}: height must be 3 digits."),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::ValidationRules,
        model::{CloudField, Field, Toggle},
        validate::tests::{fixed_now, valid_observation},
    };
    use std::collections::BTreeSet;

    fn report(obs: &Observation) -> GroupReport {
        let rules = ValidationRules::default();
        let ctx = ValidationContext::new(fixed_now(), &rules);
        SkyValidator.check(obs, &ctx)
    }

    fn with_layers(layers: &[(&str, &str, &str)]) -> Observation {
        let mut obs = valid_observation();
        obs.remove_cloud_layer(0).unwrap();
        for (amount, height, convective) in layers {
            let idx = obs.add_cloud_layer().unwrap();
            obs.update_cloud_layer(idx, CloudField::Amount, amount).unwrap();
            obs.update_cloud_layer(idx, CloudField::Height, height).unwrap();
            obs.update_cloud_layer(idx, CloudField::Convective, convective)
                .unwrap();
        }
        obs
    }

    #[test]
    fn cavok_suppresses_every_rule() {
        let mut obs = Observation::new();
        obs.set_cavok(true);

        assert!(report(&obs).is_empty());
    }

    #[test]
    fn directional_visibility_needs_both_parts() {
        let mut obs = valid_observation();
        obs.set_enabled(Toggle::DirectionalVisibility, true).unwrap();
        obs.update_field(Field::DirectionalVisibilityValue, "4000")
            .unwrap();

        let report = report(&obs);
        assert_eq!(
            report.messages(),
            vec!["Both directional visibility and its value must be filled."]
        );
        assert_eq!(report.tags(), BTreeSet::from([ErrorTag::Visibility]));
    }

    #[test]
    fn directional_visibility_value_is_four_digits() {
        let mut obs = valid_observation();
        obs.set_enabled(Toggle::DirectionalVisibility, true).unwrap();
        obs.update_field(Field::DirectionalVisibilityValue, "400")
            .unwrap();
        obs.update_field(Field::DirectionalVisibilityBearing, "SW")
            .unwrap();

        assert_eq!(report(&obs).tags(), BTreeSet::from([ErrorTag::Visibility]));

        obs.update_field(Field::DirectionalVisibilityValue, "0400")
            .unwrap();
        assert!(report(&obs).is_empty());
    }

    #[test]
    fn visibility_format() {
        let mut obs = valid_observation();
        obs.update_field(Field::Visibility, "800").unwrap();

        assert_eq!(
            report(&obs).messages(),
            vec!["Visibility must be 4 digits between 0000 and 9999 meters."]
        );
    }

    #[test]
    fn low_visibility_requires_present_weather() {
        let mut obs = valid_observation();
        obs.update_field(Field::Visibility, "0800").unwrap();

        let found = report(&obs);
        assert_eq!(found.tags(), BTreeSet::from([ErrorTag::Weather]));

        obs.set_enabled(Toggle::PresentWeather, true).unwrap();
        obs.update_field(Field::PresentWeather, "fg").unwrap();
        assert!(report(&obs).is_empty());
    }

    #[test]
    fn present_weather_grammar() {
        let mut obs = valid_observation();
        obs.set_enabled(Toggle::PresentWeather, true).unwrap();
        obs.update_field(Field::PresentWeather, "-SHRAXYZ").unwrap();

        assert_eq!(report(&obs).messages(), vec!["Invalid present weather code."]);
    }

    #[test]
    fn at_least_one_complete_layer() {
        let obs = with_layers(&[("", "", "")]);
        assert_eq!(
            report(&obs).messages(),
            vec!["At least one cloud layer must be specified."]
        );

        let obs = with_layers(&[]);
        assert_eq!(report(&obs).tags(), BTreeSet::from([ErrorTag::Cloud]));
    }

    #[test]
    fn few_only_in_first_two_layers() {
        let obs = with_layers(&[("FEW", "010", ""), ("SCT", "020", ""), ("FEW", "030", "")]);

        assert_eq!(
            report(&obs).messages(),
            vec!["Cloud layer 3: \"FEW\" only allowed in first 2 layers."]
        );
    }

    #[test]
    fn convective_layer_needs_height() {
        let obs = with_layers(&[("SCT", "020", ""), ("BKN", "", "CB")]);

        assert_eq!(report(&obs).messages(), vec!["CB/TCU clouds must have a height."]);
    }

    #[test]
    fn layer_height_is_three_digits() {
        let obs = with_layers(&[("BKN", "20", "TCU")]);

        assert_eq!(
            report(&obs).messages(),
            vec!["Cloud layer 1: height must be 3 digits."]
        );
    }

    #[test]
    fn partial_layer_is_flagged() {
        let obs = with_layers(&[("SCT", "020", ""), ("BKN", "", "")]);

        assert_eq!(
            report(&obs).messages(),
            vec!["Cloud layer 2: amount and height are both required."]
        );
    }
}
