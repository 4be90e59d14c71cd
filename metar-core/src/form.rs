//! Flat, serde-friendly snapshot of the observation form.
//!
//! A form is never trusted as-is: [`ObservationForm::apply`] replays it through
//! the session transitions, so it hits the same checks as interactive edits.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    model::{CloudField, Field, ObservationType, Toggle},
    session::Session,
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CloudLayerForm {
    pub amount: Option<String>,
    pub height: Option<String>,
    pub convective: Option<String>,
}

/// Example TOML:
/// ```toml
/// country = "Tonga"
/// observation_type = "METAR"
/// station = "NFTF"
/// utc_time = "151200"
/// wind_direction = "090"
/// wind_speed = "10"
/// visibility = "9999"
/// temperature = "25"
/// dew_point = "20"
/// qnh = "1013"
///
/// [[clouds]]
/// amount = "FEW"
/// height = "020"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ObservationForm {
    pub country: Option<String>,
    pub observation_type: Option<String>,
    pub station: Option<String>,
    pub utc_time: Option<String>,
    /// The observer already confirmed a past time (a correction).
    pub past_time_acknowledged: bool,
    pub recipient_email: Option<String>,

    pub wind_direction: Option<String>,
    pub wind_speed: Option<String>,
    pub gust: Option<String>,
    pub wind_variation_from: Option<String>,
    pub wind_variation_to: Option<String>,

    pub cavok: bool,
    pub visibility: Option<String>,
    pub directional_visibility: Option<String>,
    pub directional_visibility_bearing: Option<String>,
    pub present_weather: Option<String>,
    pub clouds: Vec<CloudLayerForm>,

    pub temperature: Option<String>,
    pub dew_point: Option<String>,
    pub qnh: Option<String>,

    pub recent_weather: Option<String>,
    pub remarks: Option<String>,
}

impl ObservationForm {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Invalid observation form TOML")
    }

    pub fn from_json_str(contents: &str) -> Result<Self> {
        serde_json::from_str(contents).context("Invalid observation form JSON")
    }

    /// Replays the form into `session`. Optional groups are enabled when any
    /// of their values is present.
    pub fn apply(&self, session: &mut Session, now: DateTime<Utc>) -> Result<()> {
        if let Some(country) = &self.country {
            session.select_country(country)?;
        }
        if let Some(observation_type) = &self.observation_type {
            session.select_observation_type(ObservationType::try_from(observation_type.as_str())?);
        }
        if let Some(station) = &self.station {
            session
                .select_station(station)
                .with_context(|| format!("Cannot select station {station}"))?;
        }
        if let Some(utc_time) = &self.utc_time {
            session.set_utc_time(utc_time, now);
        }
        if self.past_time_acknowledged {
            session.acknowledge_past_time();
        }
        if let Some(email) = &self.recipient_email {
            session.set_recipient_email(email);
        }

        set(session, Field::WindDirection, &self.wind_direction)?;
        set(session, Field::WindSpeed, &self.wind_speed)?;
        set(session, Field::Gust, &self.gust)?;
        if self.wind_variation_from.is_some() || self.wind_variation_to.is_some() {
            session.set_enabled(Toggle::WindVariation, true)?;
            set(session, Field::WindVariationFrom, &self.wind_variation_from)?;
            set(session, Field::WindVariationTo, &self.wind_variation_to)?;
        }

        // CAVOK first, so conflicting sky values are reported instead of dropped.
        session.set_cavok(self.cavok);
        set(session, Field::Visibility, &self.visibility)?;
        if self.directional_visibility.is_some() || self.directional_visibility_bearing.is_some() {
            session.set_enabled(Toggle::DirectionalVisibility, true)?;
            set(session, Field::DirectionalVisibilityValue, &self.directional_visibility)?;
            set(
                session,
                Field::DirectionalVisibilityBearing,
                &self.directional_visibility_bearing,
            )?;
        }
        if self.present_weather.is_some() {
            session.set_enabled(Toggle::PresentWeather, true)?;
            set(session, Field::PresentWeather, &self.present_weather)?;
        }
        for (number, layer) in self.clouds.iter().enumerate().map(|(i, l)| (i + 1, l)) {
            apply_layer(session, layer).with_context(|| format!("Cloud layer {number}"))?;
        }

        set(session, Field::Temperature, &self.temperature)?;
        set(session, Field::DewPoint, &self.dew_point)?;
        set(session, Field::Qnh, &self.qnh)?;

        if self.recent_weather.is_some() {
            session.set_enabled(Toggle::RecentWeather, true)?;
            set(session, Field::RecentWeather, &self.recent_weather)?;
        }
        if self.remarks.is_some() {
            session.set_enabled(Toggle::Remarks, true)?;
            set(session, Field::Remarks, &self.remarks)?;
        }

        Ok(())
    }
}

fn set(session: &mut Session, field: Field, value: &Option<String>) -> Result<()> {
    if let Some(value) = value {
        session
            .update_field(field, value)
            .with_context(|| format!("Cannot set {}", field.as_str()))?;
    }
    Ok(())
}

fn apply_layer(session: &mut Session, layer: &CloudLayerForm) -> Result<()> {
    let index = session.add_cloud_layer()?;

    for (field, value) in [
        (CloudField::Amount, &layer.amount),
        (CloudField::Height, &layer.height),
        (CloudField::Convective, &layer.convective),
    ] {
        if let Some(value) = value {
            session.update_cloud_layer(index, field, value)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::ValidationRules, error::MetarError, session::CommitOutcome,
        station::PacificDirectory, validate::tests::fixed_now,
    };

    const TONGA: &str = r#"
        country = "Tonga"
        observation_type = "metar"
        station = "nftf"
        utc_time = "151200"
        wind_direction = "270"
        wind_speed = "22"
        gust = "34"
        wind_variation_from = "240"
        wind_variation_to = "310"
        visibility = "0800"
        present_weather = "+tsra"
        temperature = "24"
        dew_point = "22"
        qnh = "1008"
        remarks = "CB NE"

        [[clouds]]
        amount = "SCT"
        height = "012"

        [[clouds]]
        amount = "bkn"
        height = "025"
        convective = "cb"
    "#;

    fn session() -> Session {
        Session::new(ValidationRules::default(), Box::new(PacificDirectory))
    }

    #[test]
    fn toml_form_encodes_through_session() {
        let form = ObservationForm::from_toml_str(TONGA).unwrap();
        let mut session = session();
        form.apply(&mut session, fixed_now()).unwrap();

        assert_eq!(
            session.commit(fixed_now()),
            CommitOutcome::Committed(
                "METAR NFTF 151200Z 27022G34KT 240V310 0800 +TSRA SCT012 BKN025CB 24/22 Q1008 RMK CB NE="
                    .into()
            )
        );
    }

    #[test]
    fn json_form_with_cavok() {
        let form = ObservationForm::from_json_str(
            r#"{
                "country": "Fiji",
                "observation_type": "SPECI",
                "station": "NFFN",
                "utc_time": "151200",
                "wind_direction": "///",
                "wind_speed": "//",
                "cavok": true,
                "temperature": "01",
                "dew_point": "00",
                "qnh": "////"
            }"#,
        )
        .unwrap();
        let mut session = session();
        form.apply(&mut session, fixed_now()).unwrap();

        assert_eq!(
            session.commit(fixed_now()),
            CommitOutcome::Committed("SPECI NFFN 151200Z /////KT CAVOK 01/00 Q////=".into())
        );
        assert_eq!(
            session.observation().header().header_code.as_deref(),
            Some("SPFJ31")
        );
    }

    #[test]
    fn cavok_conflicts_with_visibility() {
        let form = ObservationForm {
            cavok: true,
            visibility: Some("9999".into()),
            ..ObservationForm::default()
        };

        let err = form.apply(&mut session(), fixed_now()).unwrap_err();
        assert_eq!(
            err.downcast_ref::<MetarError>(),
            Some(&MetarError::CavokActive)
        );
    }

    #[test]
    fn fifth_layer_in_form_is_rejected() {
        let form = ObservationForm {
            clouds: vec![CloudLayerForm::default(); 5],
            ..ObservationForm::default()
        };

        let err = form.apply(&mut session(), fixed_now()).unwrap_err();
        assert!(format!("{err:#}").starts_with("Cloud layer 5: At most 4 cloud layers"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(ObservationForm::from_toml_str("visibilty = \"9999\"").is_err());
    }
}
