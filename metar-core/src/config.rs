use anyhow::{Context, Result, anyhow, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

/// Tunable limits of the group validators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationRules {
    /// How far ahead of "now" an observation time may be.
    pub future_window_minutes: i64,

    /// Accept `//` for temperature and dew point.
    pub allow_missing_temperature: bool,

    /// Accept `////` for QNH.
    pub allow_missing_qnh: bool,

    /// Accept temperatures below zero in `M` notation (`M05`).
    pub allow_negative_temperature: bool,

    /// Plausible QNH band in hPa, inclusive.
    pub qnh_min: u32,
    pub qnh_max: u32,

    /// Operational ceiling for the mean wind speed, KT.
    pub max_wind_speed: u32,

    /// Highest speed at which `VRB` may be reported, KT.
    pub vrb_max_speed: u32,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            future_window_minutes: 15,
            allow_missing_temperature: true,
            allow_missing_qnh: true,
            allow_negative_temperature: false,
            qnh_min: 900,
            qnh_max: 1100,
            max_wind_speed: 150,
            vrb_max_speed: 6,
        }
    }
}

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    /// Country preselected when a session starts, e.g. "Tonga".
    pub default_country: Option<String>,

    /// Address handed to the delivery step; never validated here.
    pub recipient_email: Option<String>,

    /// Example TOML:
    /// [rules]
    /// qnh_min = 900
    /// qnh_max = 1100
    #[serde(default)]
    pub rules: ValidationRules,
}

impl Config {
    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg = Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let cfg: Config = toml::from_str(contents).context("Invalid configuration TOML")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "metar-desk", "metar-cli")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    pub fn validate(&self) -> Result<()> {
        let rules = &self.rules;

        if rules.qnh_min > rules.qnh_max {
            bail!(
                "Invalid QNH band: qnh_min ({}) is above qnh_max ({}).",
                rules.qnh_min,
                rules.qnh_max
            );
        }

        if rules.future_window_minutes <= 0 {
            bail!("future_window_minutes must be at least 1.");
        }

        Ok(())
    }

    pub fn set_default_country(&mut self, country: &str) {
        self.default_country = Some(country.to_string());
    }

    /// Empty input removes the address.
    pub fn set_recipient_email(&mut self, email: &str) {
        let email = email.trim();
        self.recipient_email = (!email.is_empty()).then(|| email.to_string());
    }
}
