//! One observer's reporting session: the observation being edited, the
//! reports committed so far, and the field groups last flagged by validation.
//!
//! Header fields (country, observation type, station, time and the derived
//! bulletin codes) survive every commit; body fields are reset after each
//! committed or NIL report.

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use tracing::{info, warn};

use crate::{
    config::{Config, ValidationRules},
    encode,
    error::{MetarError, Result},
    ledger::Ledger,
    model::{CloudField, CloudLayer, Field, Observation, ObservationType, Toggle},
    station::{PacificDirectory, StationDirectory},
    validate::{
        self, ErrorTag, Validation, ValidationContext,
        time::{TimeCheck, check_utc_time},
    },
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The encoded report, now the last ledger line.
    Committed(String),
    /// Nothing was changed; the findings explain why.
    Rejected(Validation),
}

/// Validates, encodes, appends and resets as one step. On rejection neither
/// the ledger nor the observation is touched.
pub fn commit(
    observation: &mut Observation,
    ledger: &mut Ledger,
    ctx: &ValidationContext<'_>,
) -> CommitOutcome {
    let report = match validate::check(observation, ctx) {
        Ok(checked) => encode::encode_checked(&checked),
        Err(validation) => {
            warn!(tags = ?validation.tags(), "commit rejected");
            return CommitOutcome::Rejected(validation);
        }
    };

    ledger.append(report.clone());
    observation.reset_body();
    info!(station = %observation.header().station_id, "observation committed");

    CommitOutcome::Committed(report)
}

#[derive(Debug)]
pub struct Session {
    observation: Observation,
    ledger: Ledger,
    error_tags: BTreeSet<ErrorTag>,
    rules: ValidationRules,
    directory: Box<dyn StationDirectory>,
}

impl Session {
    pub fn new(rules: ValidationRules, directory: Box<dyn StationDirectory>) -> Self {
        Self {
            observation: Observation::new(),
            ledger: Ledger::new(),
            error_tags: BTreeSet::new(),
            rules,
            directory,
        }
    }

    /// Session over the built-in Pacific directory, preselecting the
    /// configured country and recipient.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut session = Self::new(config.rules.clone(), Box::new(PacificDirectory));

        if let Some(email) = &config.recipient_email {
            session.observation.set_recipient_email(email);
        }
        if let Some(country) = &config.default_country {
            session.select_country(country)?;
        }

        Ok(session)
    }

    pub fn observation(&self) -> &Observation {
        &self.observation
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn rules(&self) -> &ValidationRules {
        &self.rules
    }

    pub fn directory(&self) -> &dyn StationDirectory {
        self.directory.as_ref()
    }

    /// Groups flagged by the last rejected validation, for highlighting.
    pub fn error_tags(&self) -> &BTreeSet<ErrorTag> {
        &self.error_tags
    }

    /// Selects a country: clears the station and derives TTAAii and CCCC.
    pub fn select_country(&mut self, country: &str) -> Result<()> {
        let name = self
            .directory
            .countries()
            .into_iter()
            .find(|c| c.eq_ignore_ascii_case(country.trim()))
            .map(str::to_string)
            .ok_or_else(|| MetarError::UnknownCountry(country.trim().to_string()))?;

        let observation_type = self
            .observation
            .header
            .observation_type
            .unwrap_or(ObservationType::Metar);

        let header = &mut self.observation.header;
        header.station_id.clear();
        header.header_code = self
            .directory
            .header_code(&name, observation_type)
            .map(str::to_string);
        header.collective_code = self.directory.collective_code(&name).map(str::to_string);
        info!(
            country = %name,
            ttaaii = ?header.header_code,
            cccc = ?header.collective_code,
            "country selected"
        );
        header.country = Some(name);

        Ok(())
    }

    pub fn select_observation_type(&mut self, observation_type: ObservationType) {
        self.observation.set_observation_type(observation_type);

        let header = &mut self.observation.header;
        if let Some(country) = &header.country {
            header.header_code = self
                .directory
                .header_code(country, observation_type)
                .map(str::to_string);
        }
    }

    /// Selects a station of the current country. Returns the duplicate-station
    /// warning when the ledger already has a report for it.
    pub fn select_station(&mut self, station: &str) -> Result<Option<String>> {
        let country = self
            .observation
            .header
            .country
            .clone()
            .ok_or(MetarError::CountryNotSelected)?;

        let station = station.trim().to_uppercase();
        if !self.directory.has_station(&country, &station) {
            return Err(MetarError::UnknownStation { country, station });
        }

        self.observation.set_station_id(&station);
        Ok(self.station_warning())
    }

    pub fn station_warning(&self) -> Option<String> {
        self.ledger
            .station_warning(&self.observation.header().station_id)
    }

    /// Sets the observation time and reports how it compares with `now`, so
    /// the caller can ask about a past time straight away.
    pub fn set_utc_time(&mut self, utc_time: &str, now: DateTime<Utc>) -> TimeCheck {
        self.observation.set_utc_time(utc_time);
        check_utc_time(
            &self.observation.header().utc_time,
            now,
            self.rules.future_window_minutes,
        )
    }

    pub fn acknowledge_past_time(&mut self) {
        info!(utc_time = %self.observation.header().utc_time, "past observation time confirmed");
        self.observation.acknowledge_past_time();
    }

    pub fn set_recipient_email(&mut self, email: &str) {
        self.observation.set_recipient_email(email);
    }

    pub fn update_field(&mut self, field: Field, value: &str) -> Result<()> {
        self.observation.update_field(field, value)
    }

    pub fn set_enabled(&mut self, toggle: Toggle, enabled: bool) -> Result<()> {
        self.observation.set_enabled(toggle, enabled)
    }

    pub fn set_cavok(&mut self, cavok: bool) {
        self.observation.set_cavok(cavok);
    }

    pub fn add_cloud_layer(&mut self) -> Result<usize> {
        self.observation.add_cloud_layer()
    }

    pub fn remove_cloud_layer(&mut self, index: usize) -> Result<CloudLayer> {
        self.observation.remove_cloud_layer(index)
    }

    pub fn update_cloud_layer(
        &mut self,
        index: usize,
        field: CloudField,
        value: &str,
    ) -> Result<()> {
        self.observation.update_cloud_layer(index, field, value)
    }

    /// Runs every validator against the current snapshot and keeps the
    /// flagged groups (cleared when everything passes).
    pub fn validate(&mut self, now: DateTime<Utc>) -> Validation {
        let ctx = ValidationContext::new(now, &self.rules);
        let validation = validate::validate(&self.observation, &ctx);
        self.error_tags = validation.tags();
        validation
    }

    pub fn preview(&self) -> String {
        encode::preview(&self.observation)
    }

    pub fn commit(&mut self, now: DateTime<Utc>) -> CommitOutcome {
        let ctx = ValidationContext::new(now, &self.rules);
        let outcome = commit(&mut self.observation, &mut self.ledger, &ctx);

        self.error_tags = match &outcome {
            CommitOutcome::Committed(_) => BTreeSet::new(),
            CommitOutcome::Rejected(validation) => validation.tags(),
        };

        outcome
    }

    /// Appends `<type> <station> <time>Z NIL=` without validating the body,
    /// then resets the body as a commit does.
    pub fn report_nil(&mut self) -> Result<String> {
        let header = self.observation.header();

        let mut missing = Vec::new();
        if header.station_id.is_empty() {
            missing.push("Station");
        }
        if header.utc_time.is_empty() {
            missing.push("UTC Time");
        }
        let Some(observation_type) = header.observation_type.filter(|_| missing.is_empty()) else {
            if header.observation_type.is_none() {
                missing.push("Obs Type");
            }
            return Err(MetarError::NilPrecondition { missing });
        };

        let report = encode::nil_report(observation_type, &header.station_id, &header.utc_time);
        info!(station = %header.station_id, "NIL report");

        self.ledger.append(report.clone());
        self.observation.reset_body();
        self.error_tags.clear();

        Ok(report)
    }

    pub fn remove_last(&mut self) -> Option<String> {
        self.ledger.remove_last()
    }

    pub fn replace_at(&mut self, index: usize, text: &str) -> Result<()> {
        self.ledger.replace_at(index, text)
    }

    /// Bulletin header and every committed report, ready for delivery.
    pub fn bulletin(&self) -> String {
        self.ledger.bulletin(&self.observation.bulletin_header())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::tests::{fixed_now, valid_observation};
    use chrono::TimeZone;

    fn session() -> Session {
        Session::new(ValidationRules::default(), Box::new(PacificDirectory))
    }

    /// Tonga / METAR / NFTF at 15/1200Z with a body that validates at [`fixed_now`].
    fn ready_session() -> Session {
        let mut session = session();
        session.select_country("Tonga").unwrap();
        session.select_observation_type(ObservationType::Metar);
        session.select_station("NFTF").unwrap();
        session.set_utc_time("151200", fixed_now());
        fill_body(&mut session);
        session
    }

    fn fill_body(session: &mut Session) {
        let template = valid_observation();
        session.observation = Observation {
            header: session.observation.header.clone(),
            recipient_email: session.observation.recipient_email.clone(),
            ..template
        };
    }

    #[test]
    fn country_derives_bulletin_codes() {
        let mut session = session();
        session.select_country("tonga").unwrap();

        let header = session.observation().header();
        assert_eq!(header.country.as_deref(), Some("Tonga"));
        assert_eq!(header.header_code.as_deref(), Some("SATO31"));
        assert_eq!(header.collective_code.as_deref(), Some("NFTF"));

        session.select_observation_type(ObservationType::Speci);
        assert_eq!(
            session.observation().header().header_code.as_deref(),
            Some("SPTO31")
        );
    }

    #[test]
    fn changing_country_clears_station() {
        let mut session = ready_session();
        session.select_country("Fiji").unwrap();

        assert_eq!(session.observation().header().station_id, "");
        assert_eq!(
            session.observation().header().collective_code.as_deref(),
            Some("NFFN")
        );
    }

    #[test]
    fn unknown_country_and_station_are_rejected() {
        let mut session = session();
        assert_eq!(
            session.select_station("NFTF"),
            Err(MetarError::CountryNotSelected)
        );
        assert_eq!(
            session.select_country("Atlantis"),
            Err(MetarError::UnknownCountry("Atlantis".into()))
        );

        session.select_country("Samoa").unwrap();
        assert_eq!(
            session.select_station("nftf"),
            Err(MetarError::UnknownStation {
                country: "Samoa".into(),
                station: "NFTF".into(),
            })
        );
    }

    #[test]
    fn commit_appends_and_resets_body() {
        let mut session = ready_session();

        let outcome = session.commit(fixed_now());

        assert_eq!(
            outcome,
            CommitOutcome::Committed("METAR NFTF 151200Z 09010KT 9999 FEW020 25/20 Q1013=".into())
        );
        assert_eq!(session.ledger().len(), 1);
        let obs = session.observation();
        assert_eq!(obs.header().station_id, "NFTF");
        assert_eq!(obs.header().utc_time, "151200");
        assert_eq!(obs.wind_direction(), None);
        assert!(obs.cloud_layers().is_empty());
        assert!(session.error_tags().is_empty());
    }

    #[test]
    fn rejected_commit_changes_nothing_but_tags() {
        let mut session = ready_session();
        session.update_field(Field::WindSpeed, "20").unwrap();
        session.update_field(Field::DewPoint, "30").unwrap();
        let before = session.observation().clone();

        let CommitOutcome::Rejected(validation) = session.commit(fixed_now()) else {
            panic!("commit must be rejected");
        };

        assert_eq!(
            validation.tags(),
            BTreeSet::from([ErrorTag::Wind, ErrorTag::TempDew])
        );
        assert_eq!(session.error_tags(), &validation.tags());
        assert!(session.ledger().is_empty());
        assert_eq!(session.observation(), &before);
    }

    #[test]
    fn successful_validation_clears_stored_tags() {
        let mut session = ready_session();
        session.update_field(Field::Qnh, "1200").unwrap();
        session.validate(fixed_now());
        assert_eq!(session.error_tags(), &BTreeSet::from([ErrorTag::Qnh]));

        session.update_field(Field::Qnh, "1013").unwrap();
        assert!(session.validate(fixed_now()).is_ok());
        assert!(session.error_tags().is_empty());
    }

    #[test]
    fn past_time_needs_acknowledgement() {
        let mut session = ready_session();
        let later = Utc.with_ymd_and_hms(2025, 6, 15, 12, 40, 0).unwrap();

        let CommitOutcome::Rejected(validation) = session.commit(later) else {
            panic!("past time must be confirmed first");
        };
        assert!(validation.is_soft_only());

        session.acknowledge_past_time();
        assert!(matches!(session.commit(later), CommitOutcome::Committed(_)));
    }

    #[test]
    fn set_utc_time_reports_time_check() {
        let mut session = session();

        assert_eq!(session.set_utc_time("151200", fixed_now()), TimeCheck::Accepted);
        assert_eq!(
            session.set_utc_time("151130", fixed_now()),
            TimeCheck::Past { minutes: 25 }
        );
    }

    #[test]
    fn nil_report_requires_header() {
        let mut session = session();
        session.select_country("Tonga").unwrap();

        assert_eq!(
            session.report_nil(),
            Err(MetarError::NilPrecondition {
                missing: vec!["Station", "UTC Time", "Obs Type"],
            })
        );

        session.select_station("NFTV").unwrap();
        session.set_utc_time("151200", fixed_now());
        assert_eq!(
            session.report_nil(),
            Err(MetarError::NilPrecondition {
                missing: vec!["Obs Type"],
            })
        );
        assert!(session.ledger().is_empty());
    }

    #[test]
    fn nil_report_bypasses_validation_and_resets_body() {
        let mut session = ready_session();
        session.update_field(Field::Qnh, "1200").unwrap();
        session.validate(fixed_now());

        let report = session.report_nil().unwrap();

        assert_eq!(report, "METAR NFTF 151200Z NIL=");
        assert_eq!(session.ledger().entries(), ["METAR NFTF 151200Z NIL="]);
        assert_eq!(session.observation().qnh(), None);
        assert!(session.error_tags().is_empty());
    }

    #[test]
    fn station_warning_after_commit() {
        let mut session = ready_session();
        session.commit(fixed_now());

        assert_eq!(
            session.select_station("NFTF").unwrap().as_deref(),
            Some("Station NFTF already exists in METAR list.")
        );
        assert_eq!(session.select_station("NFTV").unwrap(), None);
    }

    #[test]
    fn bulletin_and_ledger_edits() {
        let mut session = ready_session();
        session.commit(fixed_now());
        session.select_station("NFTV").unwrap();
        session.report_nil().unwrap();

        assert_eq!(
            session.bulletin(),
            "SATO31 NFTF 151200\n\
             METAR NFTF 151200Z 09010KT 9999 FEW020 25/20 Q1013=\n\
             METAR NFTV 151200Z NIL="
        );

        session
            .replace_at(0, "METAR NFTF 151200Z 09011KT 9999 FEW020 25/20 Q1013=")
            .unwrap();
        assert_eq!(session.remove_last().as_deref(), Some("METAR NFTV 151200Z NIL="));
        assert_eq!(
            session.ledger().entries(),
            ["METAR NFTF 151200Z 09011KT 9999 FEW020 25/20 Q1013="]
        );
    }

    #[test]
    fn from_config_preselects_country() {
        let mut config = Config::default();
        config.set_default_country("Fiji");
        config.set_recipient_email("met@example.org");

        let session = Session::from_config(&config).unwrap();
        let header = session.observation().header();
        assert_eq!(header.country.as_deref(), Some("Fiji"));
        assert_eq!(header.header_code.as_deref(), Some("SAFJ31"));
        assert_eq!(session.observation().recipient_email(), Some("met@example.org"));
    }

    #[test]
    fn free_commit_composes_validate_encode_reset() {
        let rules = ValidationRules::default();
        let ctx = ValidationContext::new(fixed_now(), &rules);
        let mut observation = valid_observation();
        let mut ledger = Ledger::new();

        let outcome = commit(&mut observation, &mut ledger, &ctx);

        assert!(matches!(outcome, CommitOutcome::Committed(_)));
        assert_eq!(ledger.len(), 1);
        assert_eq!(observation.visibility(), "");
        assert_eq!(observation.header().station_id, "NFTF");
    }
}
