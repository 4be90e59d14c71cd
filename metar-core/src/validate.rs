use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{collections::BTreeSet, fmt::Debug};
use tracing::debug;

use crate::{
    config::ValidationRules,
    model::Observation,
    validate::{
        sky::SkyValidator, thermo::ThermoValidator, time::TimeValidator, wind::WindValidator,
    },
};

pub mod sky;
pub mod thermo;
pub mod time;
pub mod wind;

/// Field-group tag used by callers to highlight offending fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorTag {
    Time,
    Wind,
    Visibility,
    Weather,
    Cloud,
    TempDew,
    Qnh,
}

impl ErrorTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorTag::Time => "time",
            ErrorTag::Wind => "wind",
            ErrorTag::Visibility => "visibility",
            ErrorTag::Weather => "weather",
            ErrorTag::Cloud => "cloud",
            ErrorTag::TempDew => "tempdew",
            ErrorTag::Qnh => "qnh",
        }
    }

    /// The validator that produces this tag.
    pub fn group(&self) -> GroupId {
        match self {
            ErrorTag::Time => GroupId::Time,
            ErrorTag::Wind => GroupId::Wind,
            ErrorTag::Visibility | ErrorTag::Weather | ErrorTag::Cloud => GroupId::Sky,
            ErrorTag::TempDew | ErrorTag::Qnh => GroupId::Thermo,
        }
    }
}

impl std::fmt::Display for ErrorTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    /// A field does not match its syntactic pattern.
    Format,
    /// A rule across one or more fields is violated.
    Semantic,
    /// The observer may confirm and proceed (time in the past).
    SoftWarning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub tag: ErrorTag,
    pub kind: FindingKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

/// Findings of one group validator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GroupReport {
    pub findings: Vec<Finding>,
}

impl GroupReport {
    pub(crate) fn format(&mut self, tag: ErrorTag, message: impl Into<String>) {
        self.push(tag, FindingKind::Format, message.into(), None);
    }

    pub(crate) fn semantic(&mut self, tag: ErrorTag, message: impl Into<String>) {
        self.push(tag, FindingKind::Semantic, message.into(), None);
    }

    pub(crate) fn soft(
        &mut self,
        tag: ErrorTag,
        message: impl Into<String>,
        prompt: impl Into<String>,
    ) {
        self.push(tag, FindingKind::SoftWarning, message.into(), Some(prompt.into()));
    }

    fn push(&mut self, tag: ErrorTag, kind: FindingKind, message: String, prompt: Option<String>) {
        self.findings.push(Finding {
            tag,
            kind,
            message,
            prompt,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn messages(&self) -> Vec<&str> {
        self.findings.iter().map(|f| f.message.as_str()).collect()
    }

    pub fn tags(&self) -> BTreeSet<ErrorTag> {
        self.findings.iter().map(|f| f.tag).collect()
    }
}

/// The four rule sets, in the order their findings are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GroupId {
    Time,
    Wind,
    Sky,
    Thermo,
}

impl GroupId {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupId::Time => "time",
            GroupId::Wind => "wind",
            GroupId::Sky => "visibility/weather/cloud",
            GroupId::Thermo => "temperature/dew point/QNH",
        }
    }

    pub const fn all() -> &'static [GroupId] {
        &[GroupId::Time, GroupId::Wind, GroupId::Sky, GroupId::Thermo]
    }
}

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs shared by every validator of one pass. `now` is read once by the
/// caller so all groups judge the same instant.
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext<'a> {
    pub now: DateTime<Utc>,
    pub rules: &'a ValidationRules,
}

impl<'a> ValidationContext<'a> {
    pub fn new(now: DateTime<Utc>, rules: &'a ValidationRules) -> Self {
        Self { now, rules }
    }
}

/// One rule set over the observation. Implementations never mutate the
/// observation and return the same report for the same inputs.
pub trait GroupValidator: Send + Sync + Debug {
    fn group(&self) -> GroupId;

    fn check(&self, observation: &Observation, ctx: &ValidationContext<'_>) -> GroupReport;
}

pub fn validator_for(id: GroupId) -> &'static dyn GroupValidator {
    match id {
        GroupId::Time => &TimeValidator,
        GroupId::Wind => &WindValidator,
        GroupId::Sky => &SkyValidator,
        GroupId::Thermo => &ThermoValidator,
    }
}

/// Aggregated result of all group validators.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Validation {
    pub findings: Vec<Finding>,
}

impl Validation {
    pub fn is_ok(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn messages(&self) -> Vec<String> {
        self.findings.iter().map(|f| f.message.clone()).collect()
    }

    pub fn tags(&self) -> BTreeSet<ErrorTag> {
        self.findings.iter().map(|f| f.tag).collect()
    }

    /// Every finding can be overridden by the observer.
    pub fn is_soft_only(&self) -> bool {
        !self.findings.is_empty()
            && self
                .findings
                .iter()
                .all(|f| f.kind == FindingKind::SoftWarning)
    }
}

/// Runs every group validator against one snapshot.
pub fn validate(observation: &Observation, ctx: &ValidationContext<'_>) -> Validation {
    let mut findings = Vec::new();

    for id in GroupId::all() {
        let validator = validator_for(*id);
        let report = validator.check(observation, ctx);
        if !report.is_empty() {
            debug!(
                group = %validator.group(),
                count = report.findings.len(),
                "group validator reported findings"
            );
        }
        findings.extend(report.findings);
    }

    let validation = Validation { findings };
    debug!(
        ok = validation.is_ok(),
        tags = ?validation.tags(),
        "validation pass finished"
    );
    validation
}

/// Proof that an observation passed validation; the only input the
/// infallible encoder accepts.
#[derive(Debug, Clone, Copy)]
pub struct Checked<'a> {
    observation: &'a Observation,
}

impl<'a> Checked<'a> {
    pub fn observation(&self) -> &'a Observation {
        self.observation
    }
}

pub fn check<'a>(
    observation: &'a Observation,
    ctx: &ValidationContext<'_>,
) -> std::result::Result<Checked<'a>, Validation> {
    let validation = validate(observation, ctx);
    if validation.is_ok() {
        Ok(Checked { observation })
    } else {
        Err(validation)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::{CloudField, Field, ObservationType};
    use chrono::TimeZone;

    pub(crate) fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 11, 55, 0).unwrap()
    }

    /// A report at 15/1200Z that passes every validator at [`fixed_now`].
    pub(crate) fn valid_observation() -> Observation {
        let mut obs = Observation::new();
        obs.set_observation_type(ObservationType::Metar);
        obs.set_station_id("NFTF");
        obs.set_utc_time("151200");
        obs.update_field(Field::WindDirection, "090").unwrap();
        obs.update_field(Field::WindSpeed, "10").unwrap();
        obs.update_field(Field::Visibility, "9999").unwrap();
        let layer = obs.add_cloud_layer().unwrap();
        obs.update_cloud_layer(layer, CloudField::Amount, "FEW").unwrap();
        obs.update_cloud_layer(layer, CloudField::Height, "020").unwrap();
        obs.update_field(Field::Temperature, "25").unwrap();
        obs.update_field(Field::DewPoint, "20").unwrap();
        obs.update_field(Field::Qnh, "1013").unwrap();
        obs
    }

    #[test]
    fn complete_observation_is_accepted() {
        let rules = ValidationRules::default();
        let ctx = ValidationContext::new(fixed_now(), &rules);

        let validation = validate(&valid_observation(), &ctx);
        assert!(validation.is_ok(), "{:?}", validation.messages());
        assert!(validation.tags().is_empty());
    }

    #[test]
    fn validation_is_idempotent() {
        let rules = ValidationRules::default();
        let ctx = ValidationContext::new(fixed_now(), &rules);
        let mut obs = valid_observation();
        obs.update_field(Field::WindSpeed, "20").unwrap();
        obs.update_field(Field::Qnh, "1200").unwrap();
        let before = obs.clone();

        let first = validate(&obs, &ctx);
        let second = validate(&obs, &ctx);

        assert_eq!(first, second);
        assert_eq!(obs, before);
    }

    #[test]
    fn messages_follow_group_order_and_tags_are_unioned() {
        let rules = ValidationRules::default();
        let ctx = ValidationContext::new(fixed_now(), &rules);
        let mut obs = valid_observation();
        obs.update_field(Field::Qnh, "").unwrap();
        obs.update_field(Field::Visibility, "").unwrap();
        obs.update_field(Field::WindSpeed, "").unwrap();

        let validation = validate(&obs, &ctx);

        assert_eq!(
            validation.messages(),
            vec![
                "Wind speed is required.".to_string(),
                "Visibility is required.".to_string(),
                "QNH is required.".to_string(),
            ]
        );
        assert_eq!(
            validation.tags(),
            BTreeSet::from([ErrorTag::Wind, ErrorTag::Visibility, ErrorTag::Qnh])
        );
    }

    #[test]
    fn speed_above_threshold_without_gust_is_tagged_wind() {
        let rules = ValidationRules::default();
        let ctx = ValidationContext::new(fixed_now(), &rules);

        for speed in ["15", "22", "40", "99"] {
            let mut obs = valid_observation();
            obs.update_field(Field::WindSpeed, speed).unwrap();

            let validation = validate(&obs, &ctx);
            assert!(!validation.is_ok());
            assert!(validation.tags().contains(&ErrorTag::Wind));
        }
    }

    #[test]
    fn past_time_alone_is_soft() {
        let rules = ValidationRules::default();
        let now = Utc.with_ymd_and_hms(2025, 6, 15, 12, 30, 0).unwrap();
        let ctx = ValidationContext::new(now, &rules);

        let validation = validate(&valid_observation(), &ctx);

        assert!(!validation.is_ok());
        assert!(validation.is_soft_only());
        assert_eq!(validation.tags(), BTreeSet::from([ErrorTag::Time]));
    }

    #[test]
    fn non_ascii_digits_are_rejected() {
        let rules = ValidationRules::default();
        let ctx = ValidationContext::new(fixed_now(), &rules);
        let mut obs = valid_observation();
        obs.update_field(Field::WindDirection, "٠٩٠").unwrap();
        obs.update_field(Field::Visibility, "٩٩٩٩").unwrap();
        obs.update_cloud_layer(0, CloudField::Height, "٠٢٠").unwrap();

        let validation = validate(&obs, &ctx);

        assert_eq!(
            validation.tags(),
            BTreeSet::from([ErrorTag::Wind, ErrorTag::Visibility, ErrorTag::Cloud])
        );
        assert!(check(&obs, &ctx).is_err());
    }

    #[test]
    fn tags_map_back_to_their_group() {
        let groups: BTreeSet<GroupId> = [ErrorTag::Cloud, ErrorTag::Weather, ErrorTag::Qnh]
            .iter()
            .map(ErrorTag::group)
            .collect();

        assert_eq!(groups, BTreeSet::from([GroupId::Sky, GroupId::Thermo]));
        assert_eq!(ErrorTag::TempDew.to_string(), "tempdew");
    }

    #[test]
    fn dispatch_returns_the_requested_group() {
        for id in GroupId::all() {
            assert_eq!(validator_for(*id).group(), *id);
        }
    }

    #[test]
    fn check_hands_out_proof_only_when_valid() {
        let rules = ValidationRules::default();
        let ctx = ValidationContext::new(fixed_now(), &rules);
        let obs = valid_observation();
        assert!(check(&obs, &ctx).is_ok());

        let mut broken = valid_observation();
        broken.update_field(Field::DewPoint, "30").unwrap();
        let validation = check(&broken, &ctx).unwrap_err();
        assert_eq!(validation.tags(), BTreeSet::from([ErrorTag::TempDew]));
    }
}
