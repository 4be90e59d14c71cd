//! The in-progress observation and the typed values it is made of.
//!
//! Every mutation goes through a named transition (`update_field`, the toggle
//! and cloud-layer functions, `reset_body`) so the structural invariants hold
//! after each call:
//! - CAVOK and the visibility/weather/cloud fields are never set together.
//! - A gust only exists while the wind speed is a reported value of 15 KT or more.
//! - There are never more than [`MAX_CLOUD_LAYERS`] cloud layers.

use serde::{Deserialize, Serialize};
use std::{convert::TryFrom, fmt};

use crate::error::{MetarError, Result};

pub const MAX_CLOUD_LAYERS: usize = 4;

/// Wind speed from which a gust must be reported.
pub const GUST_THRESHOLD_KT: u32 = 15;

pub const MISSING_WIND_DIRECTION: &str = "///";
pub const MISSING_WIND_SPEED: &str = "//";
pub const MISSING_TEMPERATURE: &str = "//";
pub const MISSING_QNH: &str = "////";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ObservationType {
    Metar,
    Speci,
}

impl ObservationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObservationType::Metar => "METAR",
            ObservationType::Speci => "SPECI",
        }
    }

    pub const fn all() -> &'static [ObservationType] {
        &[ObservationType::Metar, ObservationType::Speci]
    }
}

impl fmt::Display for ObservationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ObservationType {
    type Error = MetarError;

    fn try_from(value: &str) -> Result<Self> {
        match value.trim().to_uppercase().as_str() {
            "METAR" => Ok(ObservationType::Metar),
            "SPECI" => Ok(ObservationType::Speci),
            _ => Err(MetarError::format(
                "observation type",
                format!("'{value}' is not one of METAR, SPECI"),
            )),
        }
    }
}

/// A value that was either reported or explicitly marked as not available.
///
/// "Not entered yet" is the `None` of the surrounding `Option`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reported<T> {
    Value(T),
    Missing,
}

impl<T> Reported<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Reported::Value(v) => Some(v),
            Reported::Missing => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Reported::Missing)
    }
}

impl Reported<String> {
    /// Empty text is "not entered", `sentinel` is [`Reported::Missing`].
    fn parse(text: &str, sentinel: &str) -> Option<Self> {
        match text {
            "" => None,
            t if t == sentinel => Some(Reported::Missing),
            t => Some(Reported::Value(t.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WindDirection {
    /// `VRB`
    Variable,
    /// Raw degrees as entered; checked by the wind validator.
    Degrees(String),
}

impl WindDirection {
    pub fn as_text(&self) -> &str {
        match self {
            WindDirection::Variable => "VRB",
            WindDirection::Degrees(d) => d,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Bearing {
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
}

impl Bearing {
    pub fn as_str(&self) -> &'static str {
        match self {
            Bearing::N => "N",
            Bearing::NE => "NE",
            Bearing::E => "E",
            Bearing::SE => "SE",
            Bearing::S => "S",
            Bearing::SW => "SW",
            Bearing::W => "W",
            Bearing::NW => "NW",
        }
    }

    pub const fn all() -> &'static [Bearing] {
        &[
            Bearing::N,
            Bearing::NE,
            Bearing::E,
            Bearing::SE,
            Bearing::S,
            Bearing::SW,
            Bearing::W,
            Bearing::NW,
        ]
    }
}

impl fmt::Display for Bearing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Bearing {
    type Error = MetarError;

    fn try_from(value: &str) -> Result<Self> {
        let upper = value.trim().to_uppercase();
        Bearing::all()
            .iter()
            .copied()
            .find(|b| b.as_str() == upper)
            .ok_or_else(|| {
                MetarError::format(
                    "directional visibility bearing",
                    format!("'{value}' is not one of N, NE, E, SE, S, SW, W, NW"),
                )
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CloudAmount {
    Few,
    Sct,
    Bkn,
    Ovc,
}

impl CloudAmount {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloudAmount::Few => "FEW",
            CloudAmount::Sct => "SCT",
            CloudAmount::Bkn => "BKN",
            CloudAmount::Ovc => "OVC",
        }
    }

    pub const fn all() -> &'static [CloudAmount] {
        &[
            CloudAmount::Few,
            CloudAmount::Sct,
            CloudAmount::Bkn,
            CloudAmount::Ovc,
        ]
    }
}

impl fmt::Display for CloudAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for CloudAmount {
    type Error = MetarError;

    fn try_from(value: &str) -> Result<Self> {
        let upper = value.trim().to_uppercase();
        CloudAmount::all()
            .iter()
            .copied()
            .find(|a| a.as_str() == upper)
            .ok_or_else(|| {
                MetarError::format(
                    "cloud amount",
                    format!("'{value}' is not one of FEW, SCT, BKN, OVC"),
                )
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConvectiveType {
    Tcu,
    Cb,
}

impl ConvectiveType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConvectiveType::Tcu => "TCU",
            ConvectiveType::Cb => "CB",
        }
    }
}

impl fmt::Display for ConvectiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ConvectiveType {
    type Error = MetarError;

    fn try_from(value: &str) -> Result<Self> {
        match value.trim().to_uppercase().as_str() {
            "TCU" => Ok(ConvectiveType::Tcu),
            "CB" => Ok(ConvectiveType::Cb),
            _ => Err(MetarError::format(
                "convective cloud type",
                format!("'{value}' is not one of TCU, CB"),
            )),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloudLayer {
    pub amount: Option<CloudAmount>,
    /// Hundreds of feet, three digits.
    pub height: String,
    pub convective: Option<ConvectiveType>,
}

impl CloudLayer {
    pub fn is_blank(&self) -> bool {
        self.amount.is_none() && self.height.is_empty() && self.convective.is_none()
    }

    pub fn is_complete(&self) -> bool {
        self.amount.is_some() && !self.height.is_empty()
    }

    /// `<amount><height><TCU|CB>`, only for complete layers.
    pub fn token(&self) -> Option<String> {
        let amount = self.amount?;
        if self.height.is_empty() {
            return None;
        }

        let convective = self.convective.map(|c| c.as_str()).unwrap_or_default();
        Some(format!("{amount}{}{convective}", self.height))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloudField {
    Amount,
    Height,
    Convective,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindVariation {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectionalVisibility {
    pub value: String,
    pub bearing: Option<Bearing>,
}

/// Optional groups that are switched on before their values can be entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    WindVariation,
    DirectionalVisibility,
    PresentWeather,
    RecentWeather,
    Remarks,
}

impl Toggle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Toggle::WindVariation => "wind variation",
            Toggle::DirectionalVisibility => "directional visibility",
            Toggle::PresentWeather => "present weather",
            Toggle::RecentWeather => "recent weather",
            Toggle::Remarks => "remarks",
        }
    }
}

/// Text fields of the report body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    WindDirection,
    WindSpeed,
    Gust,
    WindVariationFrom,
    WindVariationTo,
    Visibility,
    DirectionalVisibilityValue,
    DirectionalVisibilityBearing,
    PresentWeather,
    Temperature,
    DewPoint,
    Qnh,
    RecentWeather,
    Remarks,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::WindDirection => "wind direction",
            Field::WindSpeed => "wind speed",
            Field::Gust => "gust",
            Field::WindVariationFrom => "wind variation from",
            Field::WindVariationTo => "wind variation to",
            Field::Visibility => "visibility",
            Field::DirectionalVisibilityValue => "directional visibility",
            Field::DirectionalVisibilityBearing => "directional visibility bearing",
            Field::PresentWeather => "present weather",
            Field::Temperature => "temperature",
            Field::DewPoint => "dew point",
            Field::Qnh => "QNH",
            Field::RecentWeather => "recent weather",
            Field::Remarks => "remarks",
        }
    }
}

/// Fields set once per reporting session and kept across commits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header {
    pub country: Option<String>,
    pub observation_type: Option<ObservationType>,
    pub station_id: String,
    /// `DDHHMM`
    pub utc_time: String,
    /// TTAAii, derived from country and observation type.
    pub header_code: Option<String>,
    /// CCCC, derived from country.
    pub collective_code: Option<String>,
    /// The observer confirmed that a past `utc_time` is intended (a correction).
    pub past_time_acknowledged: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Observation {
    pub(crate) header: Header,

    pub(crate) wind_direction: Option<Reported<WindDirection>>,
    pub(crate) wind_speed: Option<Reported<String>>,
    pub(crate) gust: Option<String>,
    pub(crate) wind_variation: Option<WindVariation>,

    pub(crate) cavok: bool,
    pub(crate) visibility: String,
    pub(crate) directional_visibility: Option<DirectionalVisibility>,
    pub(crate) present_weather: Option<String>,
    pub(crate) cloud_layers: Vec<CloudLayer>,

    pub(crate) temperature: Option<Reported<String>>,
    pub(crate) dew_point: Option<Reported<String>>,
    pub(crate) qnh: Option<Reported<String>>,

    pub(crate) recent_weather: Option<String>,
    pub(crate) remarks: Option<String>,

    pub(crate) recipient_email: Option<String>,
}

impl Observation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn wind_direction(&self) -> Option<&Reported<WindDirection>> {
        self.wind_direction.as_ref()
    }

    pub fn wind_speed(&self) -> Option<&Reported<String>> {
        self.wind_speed.as_ref()
    }

    pub fn gust(&self) -> Option<&str> {
        self.gust.as_deref()
    }

    pub fn wind_variation(&self) -> Option<&WindVariation> {
        self.wind_variation.as_ref()
    }

    pub fn is_cavok(&self) -> bool {
        self.cavok
    }

    pub fn visibility(&self) -> &str {
        &self.visibility
    }

    pub fn directional_visibility(&self) -> Option<&DirectionalVisibility> {
        self.directional_visibility.as_ref()
    }

    pub fn present_weather(&self) -> Option<&str> {
        self.present_weather.as_deref()
    }

    pub fn cloud_layers(&self) -> &[CloudLayer] {
        &self.cloud_layers
    }

    pub fn temperature(&self) -> Option<&Reported<String>> {
        self.temperature.as_ref()
    }

    pub fn dew_point(&self) -> Option<&Reported<String>> {
        self.dew_point.as_ref()
    }

    pub fn qnh(&self) -> Option<&Reported<String>> {
        self.qnh.as_ref()
    }

    pub fn recent_weather(&self) -> Option<&str> {
        self.recent_weather.as_deref()
    }

    pub fn remarks(&self) -> Option<&str> {
        self.remarks.as_deref()
    }

    pub fn recipient_email(&self) -> Option<&str> {
        self.recipient_email.as_deref()
    }

    pub fn set_recipient_email(&mut self, email: &str) {
        let email = email.trim();
        self.recipient_email = (!email.is_empty()).then(|| email.to_string());
    }

    pub fn set_observation_type(&mut self, observation_type: ObservationType) {
        self.header.observation_type = Some(observation_type);
    }

    pub fn set_station_id(&mut self, station_id: &str) {
        self.header.station_id = station_id.trim().to_uppercase();
    }

    /// Replaces the observation time; a previous past-time confirmation no
    /// longer applies.
    pub fn set_utc_time(&mut self, utc_time: &str) {
        let utc_time = utc_time.trim();
        if self.header.utc_time != utc_time {
            self.header.past_time_acknowledged = false;
        }
        self.header.utc_time = utc_time.to_string();
    }

    pub fn acknowledge_past_time(&mut self) {
        self.header.past_time_acknowledged = true;
    }

    /// Current text of a field as the observer would type it, sentinels
    /// included; empty when not entered.
    pub fn field_text(&self, field: Field) -> String {
        fn reported(value: Option<&Reported<String>>, sentinel: &str) -> String {
            match value {
                Some(Reported::Value(v)) => v.clone(),
                Some(Reported::Missing) => sentinel.to_string(),
                None => String::new(),
            }
        }

        match field {
            Field::WindDirection => match &self.wind_direction {
                Some(Reported::Value(d)) => d.as_text().to_string(),
                Some(Reported::Missing) => MISSING_WIND_DIRECTION.to_string(),
                None => String::new(),
            },
            Field::WindSpeed => reported(self.wind_speed.as_ref(), MISSING_WIND_SPEED),
            Field::Gust => self.gust.clone().unwrap_or_default(),
            Field::WindVariationFrom => self
                .wind_variation
                .as_ref()
                .map(|v| v.from.clone())
                .unwrap_or_default(),
            Field::WindVariationTo => self
                .wind_variation
                .as_ref()
                .map(|v| v.to.clone())
                .unwrap_or_default(),
            Field::Visibility => self.visibility.clone(),
            Field::DirectionalVisibilityValue => self
                .directional_visibility
                .as_ref()
                .map(|d| d.value.clone())
                .unwrap_or_default(),
            Field::DirectionalVisibilityBearing => self
                .directional_visibility
                .as_ref()
                .and_then(|d| d.bearing)
                .map(|b| b.to_string())
                .unwrap_or_default(),
            Field::PresentWeather => self.present_weather.clone().unwrap_or_default(),
            Field::Temperature => reported(self.temperature.as_ref(), MISSING_TEMPERATURE),
            Field::DewPoint => reported(self.dew_point.as_ref(), MISSING_TEMPERATURE),
            Field::Qnh => reported(self.qnh.as_ref(), MISSING_QNH),
            Field::RecentWeather => self.recent_weather.clone().unwrap_or_default(),
            Field::Remarks => self.remarks.clone().unwrap_or_default(),
        }
    }

    /// Numeric wind speed, `None` when not entered, missing or malformed.
    pub fn wind_speed_knots(&self) -> Option<u32> {
        self.wind_speed
            .as_ref()
            .and_then(Reported::value)
            .and_then(|s| s.parse().ok())
    }

    fn gust_applies(&self) -> bool {
        self.wind_speed_knots()
            .is_some_and(|speed| speed >= GUST_THRESHOLD_KT)
    }

    /// Sets one text field from user input.
    ///
    /// Input is trimmed; code fields are uppercased. Empty input clears the
    /// field. `=` terminates a report and is dropped from free text. Values
    /// the typed model cannot hold are rejected here; rule checks are left to
    /// the validators.
    pub fn update_field(&mut self, field: Field, value: &str) -> Result<()> {
        let text = value.trim();
        let upper = text.to_uppercase();

        if self.cavok && is_sky_field(field) {
            return Err(MetarError::CavokActive);
        }

        match field {
            Field::WindDirection => {
                self.wind_direction = match upper.as_str() {
                    "" => None,
                    MISSING_WIND_DIRECTION => Some(Reported::Missing),
                    "VRB" => Some(Reported::Value(WindDirection::Variable)),
                    d => Some(Reported::Value(WindDirection::Degrees(d.to_string()))),
                };
            }
            Field::WindSpeed => {
                self.wind_speed = Reported::parse(text, MISSING_WIND_SPEED);
                if !self.gust_applies() {
                    self.gust = None;
                }
            }
            Field::Gust => {
                if text.is_empty() {
                    self.gust = None;
                } else if self.gust_applies() {
                    self.gust = Some(text.to_string());
                } else {
                    return Err(MetarError::GustNotApplicable);
                }
            }
            Field::WindVariationFrom | Field::WindVariationTo => {
                let variation = self
                    .wind_variation
                    .as_mut()
                    .ok_or(MetarError::GroupDisabled(Toggle::WindVariation.as_str()))?;
                if field == Field::WindVariationFrom {
                    variation.from = text.to_string();
                } else {
                    variation.to = text.to_string();
                }
            }
            Field::Visibility => self.visibility = text.to_string(),
            Field::DirectionalVisibilityValue => {
                self.directional_visibility_mut()?.value = text.to_string();
            }
            Field::DirectionalVisibilityBearing => {
                let bearing = if text.is_empty() {
                    None
                } else {
                    Some(Bearing::try_from(text)?)
                };
                self.directional_visibility_mut()?.bearing = bearing;
            }
            Field::PresentWeather => {
                let weather = self
                    .present_weather
                    .as_mut()
                    .ok_or(MetarError::GroupDisabled(Toggle::PresentWeather.as_str()))?;
                *weather = upper;
            }
            Field::Temperature => self.temperature = Reported::parse(&upper, MISSING_TEMPERATURE),
            Field::DewPoint => self.dew_point = Reported::parse(&upper, MISSING_TEMPERATURE),
            Field::Qnh => self.qnh = Reported::parse(text, MISSING_QNH),
            Field::RecentWeather => {
                let recent = self
                    .recent_weather
                    .as_mut()
                    .ok_or(MetarError::GroupDisabled(Toggle::RecentWeather.as_str()))?;
                *recent = upper.replace('=', "");
            }
            Field::Remarks => {
                let remarks = self
                    .remarks
                    .as_mut()
                    .ok_or(MetarError::GroupDisabled(Toggle::Remarks.as_str()))?;
                *remarks = text.replace('=', "");
            }
        }

        Ok(())
    }

    fn directional_visibility_mut(&mut self) -> Result<&mut DirectionalVisibility> {
        self.directional_visibility
            .as_mut()
            .ok_or(MetarError::GroupDisabled(Toggle::DirectionalVisibility.as_str()))
    }

    pub fn is_enabled(&self, toggle: Toggle) -> bool {
        match toggle {
            Toggle::WindVariation => self.wind_variation.is_some(),
            Toggle::DirectionalVisibility => self.directional_visibility.is_some(),
            Toggle::PresentWeather => self.present_weather.is_some(),
            Toggle::RecentWeather => self.recent_weather.is_some(),
            Toggle::Remarks => self.remarks.is_some(),
        }
    }

    /// Switches an optional group on (empty values) or off (values dropped).
    ///
    /// Enabling an already enabled group keeps its values.
    pub fn set_enabled(&mut self, toggle: Toggle, enabled: bool) -> Result<()> {
        let sky_toggle = matches!(
            toggle,
            Toggle::DirectionalVisibility | Toggle::PresentWeather
        );
        if enabled && sky_toggle && self.cavok {
            return Err(MetarError::CavokActive);
        }

        match (toggle, enabled) {
            (Toggle::WindVariation, true) => {
                self.wind_variation.get_or_insert_with(WindVariation::default);
            }
            (Toggle::WindVariation, false) => self.wind_variation = None,
            (Toggle::DirectionalVisibility, true) => {
                self.directional_visibility
                    .get_or_insert_with(DirectionalVisibility::default);
            }
            (Toggle::DirectionalVisibility, false) => self.directional_visibility = None,
            (Toggle::PresentWeather, true) => {
                self.present_weather.get_or_insert_with(String::new);
            }
            (Toggle::PresentWeather, false) => self.present_weather = None,
            (Toggle::RecentWeather, true) => {
                self.recent_weather.get_or_insert_with(String::new);
            }
            (Toggle::RecentWeather, false) => self.recent_weather = None,
            (Toggle::Remarks, true) => {
                self.remarks.get_or_insert_with(String::new);
            }
            (Toggle::Remarks, false) => self.remarks = None,
        }

        Ok(())
    }

    /// Setting CAVOK drops visibility, directional visibility, present weather
    /// and cloud layers.
    pub fn set_cavok(&mut self, cavok: bool) {
        if cavok {
            self.visibility.clear();
            self.directional_visibility = None;
            self.present_weather = None;
            self.cloud_layers.clear();
        }
        self.cavok = cavok;
    }

    /// Appends an empty cloud layer and returns its index.
    pub fn add_cloud_layer(&mut self) -> Result<usize> {
        if self.cavok {
            return Err(MetarError::CavokActive);
        }
        if self.cloud_layers.len() >= MAX_CLOUD_LAYERS {
            return Err(MetarError::CloudLayerLimit {
                max: MAX_CLOUD_LAYERS,
            });
        }

        self.cloud_layers.push(CloudLayer::default());
        Ok(self.cloud_layers.len() - 1)
    }

    pub fn remove_cloud_layer(&mut self, index: usize) -> Result<CloudLayer> {
        self.check_layer_index(index)?;
        Ok(self.cloud_layers.remove(index))
    }

    pub fn update_cloud_layer(
        &mut self,
        index: usize,
        field: CloudField,
        value: &str,
    ) -> Result<()> {
        self.check_layer_index(index)?;
        let text = value.trim();
        let layer = &mut self.cloud_layers[index];

        match field {
            CloudField::Amount => {
                layer.amount = if text.is_empty() {
                    None
                } else {
                    Some(CloudAmount::try_from(text)?)
                };
            }
            CloudField::Height => layer.height = text.to_string(),
            CloudField::Convective => {
                layer.convective = if text.is_empty() {
                    None
                } else {
                    Some(ConvectiveType::try_from(text)?)
                };
            }
        }

        Ok(())
    }

    fn check_layer_index(&self, index: usize) -> Result<()> {
        if index >= self.cloud_layers.len() {
            return Err(MetarError::CloudLayerIndex {
                index,
                len: self.cloud_layers.len(),
            });
        }
        Ok(())
    }

    /// Restores every body field to its default; header fields and the
    /// recipient email are kept.
    pub fn reset_body(&mut self) {
        let header = std::mem::take(&mut self.header);
        let recipient_email = self.recipient_email.take();

        *self = Observation {
            header,
            recipient_email,
            ..Observation::default()
        };
    }

    /// `TTAAii CCCC DDHHMM`, empty parts skipped.
    pub fn bulletin_header(&self) -> String {
        [
            self.header.header_code.as_deref().unwrap_or_default(),
            self.header.collective_code.as_deref().unwrap_or_default(),
            self.header.utc_time.as_str(),
        ]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
    }
}

fn is_sky_field(field: Field) -> bool {
    matches!(
        field,
        Field::Visibility
            | Field::DirectionalVisibilityValue
            | Field::DirectionalVisibilityBearing
            | Field::PresentWeather
    )
}
