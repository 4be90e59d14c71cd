use thiserror::Error;

/// Errors raised at the mutation boundary of the observation model, the ledger
/// and the station directory.
///
/// Rule violations found while validating a report are not errors: they are
/// collected as [`crate::validate::Finding`] values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MetarError {
    #[error("Invalid {field}: {message}")]
    Format { field: &'static str, message: String },

    #[error("Gust can only be entered when wind speed is 15 KT or more.")]
    GustNotApplicable,

    #[error("Enable {0} before entering its values.")]
    GroupDisabled(&'static str),

    #[error("CAVOK is set: visibility, present weather and cloud are not reported.")]
    CavokActive,

    #[error("At most {max} cloud layers can be reported.")]
    CloudLayerLimit { max: usize },

    #[error("Cloud layer {index} does not exist (observation has {len} layers).")]
    CloudLayerIndex { index: usize, len: usize },

    #[error(
        "Please fill in {} before setting a NIL report.",
        missing.join(", ")
    )]
    NilPrecondition { missing: Vec<&'static str> },

    #[error("Observation does not validate:\n{}", messages.join("\n"))]
    InvalidObservation { messages: Vec<String> },

    #[error("Unknown country '{0}'.")]
    UnknownCountry(String),

    #[error("Select a country before choosing a station.")]
    CountryNotSelected,

    #[error("Station {station} is not listed for {country}.")]
    UnknownStation { country: String, station: String },

    #[error("Ledger line {index} does not exist (ledger has {len} lines).")]
    LedgerIndex { index: usize, len: usize },

    #[error("A ledger line cannot be replaced with empty text.")]
    EmptyEntry,
}

impl MetarError {
    pub fn format(field: &'static str, message: impl Into<String>) -> Self {
        Self::Format {
            field,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MetarError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nil_precondition_lists_missing_fields() {
        let err = MetarError::NilPrecondition {
            missing: vec!["station", "UTC time"],
        };

        assert_eq!(
            err.to_string(),
            "Please fill in station, UTC time before setting a NIL report."
        );
    }

    #[test]
    fn invalid_observation_lists_every_message() {
        let err = MetarError::InvalidObservation {
            messages: vec!["QNH is required.".into(), "Visibility is required.".into()],
        };

        let msg = err.to_string();
        assert!(msg.contains("QNH is required."));
        assert!(msg.contains("Visibility is required."));
    }
}
