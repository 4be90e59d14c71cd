use crate::{
    config::ValidationRules,
    model::{Observation, Reported},
    patterns,
    validate::{ErrorTag, GroupId, GroupReport, GroupValidator, ValidationContext},
};

/// Temperature, dew point and QNH rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThermoValidator;

impl GroupValidator for ThermoValidator {
    fn group(&self) -> GroupId {
        GroupId::Thermo
    }

    fn check(&self, observation: &Observation, ctx: &ValidationContext<'_>) -> GroupReport {
        let mut report = GroupReport::default();

        let temperature = check_temperature(
            "Temperature",
            observation.temperature(),
            ctx.rules,
            &mut report,
        );
        let dew_point = check_temperature(
            "Dew point",
            observation.dew_point(),
            ctx.rules,
            &mut report,
        );

        if let (Some(t), Some(d)) = (temperature, dew_point) {
            if d > t {
                report.semantic(ErrorTag::TempDew, "Dew point must not exceed temperature.");
            }
        }

        check_qnh(observation.qnh(), ctx.rules, &mut report);

        report
    }
}

/// Returns the value in °C when it is a usable number.
fn check_temperature(
    label: &str,
    value: Option<&Reported<String>>,
    rules: &ValidationRules,
    report: &mut GroupReport,
) -> Option<i32> {
    match value {
        None => {
            report.semantic(ErrorTag::TempDew, format!("{label} is required."));
            None
        }
        Some(Reported::Missing) => {
            if !rules.allow_missing_temperature {
                report.semantic(
                    ErrorTag::TempDew,
                    format!(r#"{label} must be reported ("//" is not accepted)."#),
                );
            }
            None
        }
        Some(Reported::Value(text)) if rules.allow_negative_temperature => {
            let parsed = patterns::parse_temperature(text);
            if parsed.is_none() {
                report.format(
                    ErrorTag::TempDew,
                    format!("{label} must be 2 digits, prefixed with M below zero (e.g. 25, M05)."),
                );
            }
            parsed
        }
        Some(Reported::Value(text)) => {
            let parsed = patterns::parse_temperature(text).filter(|_| !text.starts_with('M'));
            if parsed.is_none() {
                report.format(
                    ErrorTag::TempDew,
                    format!("{label} must be a non-negative 2-digit number."),
                );
            }
            parsed
        }
    }
}

fn check_qnh(value: Option<&Reported<String>>, rules: &ValidationRules, report: &mut GroupReport) {
    match value {
        None => report.semantic(ErrorTag::Qnh, "QNH is required."),
        Some(Reported::Missing) => {
            if !rules.allow_missing_qnh {
                report.semantic(ErrorTag::Qnh, r#"QNH must be reported ("////" is not accepted)."#);
            }
        }
        Some(Reported::Value(text)) => {
            let hpa = patterns::is_four_digits(text)
                .then(|| text.parse::<u32>().ok())
                .flatten();
            let Some(hpa) = hpa else {
                report.format(ErrorTag::Qnh, "QNH must be 4 digits.");
                return;
            };

            if !(rules.qnh_min..=rules.qnh_max).contains(&hpa) {
                report.semantic(
                    ErrorTag::Qnh,
                    format!(
                        "QNH value must be between {} and {} hPa.",
                        rules.qnh_min, rules.qnh_max
                    ),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{model::Field, validate::tests::fixed_now};
    use rstest::rstest;

    fn messages_with(
        temperature: &str,
        dew_point: &str,
        qnh: &str,
        rules: &ValidationRules,
    ) -> Vec<String> {
        let mut obs = Observation::new();
        obs.update_field(Field::Temperature, temperature).unwrap();
        obs.update_field(Field::DewPoint, dew_point).unwrap();
        obs.update_field(Field::Qnh, qnh).unwrap();

        let ctx = ValidationContext::new(fixed_now(), rules);
        ThermoValidator
            .check(&obs, &ctx)
            .messages()
            .into_iter()
            .map(String::from)
            .collect()
    }

    fn messages(temperature: &str, dew_point: &str, qnh: &str) -> Vec<String> {
        messages_with(temperature, dew_point, qnh, &ValidationRules::default())
    }

    #[rstest]
    #[case("25", "20", "1013", &[])]
    #[case("25", "25", "1013", &[])]
    #[case(
        "M02",
        "M05",
        "1030",
        &[
            "Temperature must be a non-negative 2-digit number.",
            "Dew point must be a non-negative 2-digit number.",
        ]
    )]
    #[case("//", "//", "////", &[])]
    #[case("20", "25", "1013", &["Dew point must not exceed temperature."])]
    #[case("", "20", "1013", &["Temperature is required."])]
    #[case("25", "", "", &["Dew point is required.", "QNH is required."])]
    #[case("5", "20", "1013", &["Temperature must be a non-negative 2-digit number."])]
    #[case("٢٥", "20", "1013", &["Temperature must be a non-negative 2-digit number."])]
    #[case("25", "20", "101", &["QNH must be 4 digits."])]
    #[case("25", "20", "0850", &["QNH value must be between 900 and 1100 hPa."])]
    #[case("25", "20", "1101", &["QNH value must be between 900 and 1100 hPa."])]
    #[case("25", "20", "0900", &[])]
    fn thermodynamic_rules(
        #[case] temperature: &str,
        #[case] dew_point: &str,
        #[case] qnh: &str,
        #[case] expected: &[&str],
    ) {
        assert_eq!(messages(temperature, dew_point, qnh), expected);
    }

    #[rstest]
    #[case("M02", "M05", &[])]
    #[case("00", "M01", &[])]
    #[case("M05", "M02", &["Dew point must not exceed temperature."])]
    #[case(
        "5",
        "M02",
        &["Temperature must be 2 digits, prefixed with M below zero (e.g. 25, M05)."]
    )]
    fn m_notation_when_enabled(
        #[case] temperature: &str,
        #[case] dew_point: &str,
        #[case] expected: &[&str],
    ) {
        let rules = ValidationRules {
            allow_negative_temperature: true,
            ..ValidationRules::default()
        };

        assert_eq!(messages_with(temperature, dew_point, "1013", &rules), expected);
    }

    #[test]
    fn strict_rules_reject_missing_values() {
        let rules = ValidationRules {
            allow_missing_temperature: false,
            allow_missing_qnh: false,
            ..ValidationRules::default()
        };

        assert_eq!(
            messages_with("//", "20", "////", &rules),
            vec![
                r#"Temperature must be reported ("//" is not accepted)."#,
                r#"QNH must be reported ("////" is not accepted)."#,
            ]
        );
    }

    #[test]
    fn tags_are_split_between_tempdew_and_qnh() {
        let rules = ValidationRules::default();
        let ctx = ValidationContext::new(fixed_now(), &rules);
        let mut obs = Observation::new();
        obs.update_field(Field::Temperature, "10").unwrap();
        obs.update_field(Field::DewPoint, "12").unwrap();
        obs.update_field(Field::Qnh, "1200").unwrap();

        let report = ThermoValidator.check(&obs, &ctx);
        let tags: Vec<ErrorTag> = report.findings.iter().map(|f| f.tag).collect();
        assert_eq!(tags, vec![ErrorTag::TempDew, ErrorTag::Qnh]);
    }
}
