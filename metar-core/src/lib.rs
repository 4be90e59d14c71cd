//! Core library for the `metar` CLI.
//!
//! This crate defines:
//! - The observation model and its mutation rules
//! - Group validators for time, wind, sky and temperature/pressure
//! - The METAR/SPECI encoder and the session ledger
//! - Configuration and station reference data
//!
//! It is used by `metar-cli`, but can also be embedded in other front ends.

pub mod config;
pub mod encode;
pub mod error;
pub mod form;
pub mod ledger;
pub mod model;
pub mod patterns;
pub mod session;
pub mod station;
pub mod validate;

pub use config::{Config, ValidationRules};
pub use encode::{encode, encode_checked, preview};
pub use error::{MetarError, Result};
pub use form::ObservationForm;
pub use ledger::Ledger;
pub use model::{CloudField, Field, Observation, ObservationType, Reported, Toggle};
pub use session::{CommitOutcome, Session, commit};
pub use station::{PacificDirectory, StationDirectory};
pub use validate::{ErrorTag, Finding, FindingKind, Validation, ValidationContext, validate};
