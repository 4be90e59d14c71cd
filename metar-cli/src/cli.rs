use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use clap::{ArgAction, Parser, Subcommand};
use inquire::{Select, Text};
use serde_json::json;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::debug;

use metar_core::{
    CommitOutcome, Config, ObservationForm, ObservationType, PacificDirectory, Session,
    StationDirectory, Validation,
};

use crate::compose;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "metar", version, about = "Compose and check METAR/SPECI reports")]
pub struct Cli {
    /// More log output (-v: info, -vv: debug, -vvv: trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Set the default country and the bulletin recipient.
    Configure,

    /// List countries, or the stations and bulletin codes of one country.
    Stations {
        /// Country name, e.g. "Tonga".
        country: Option<String>,
    },

    /// Validate an observation form (TOML, or JSON by extension) and print the report.
    Check {
        file: PathBuf,

        /// Validate against this instant (RFC 3339) instead of the clock.
        #[arg(long)]
        now: Option<String>,

        /// Treat a past observation time as a confirmed correction.
        #[arg(long)]
        accept_past_time: bool,

        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Compose reports interactively and print the bulletin.
    Session,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Stations { country } => stations(country.as_deref()),
            Command::Check {
                file,
                now,
                accept_past_time,
                json,
            } => check(&file, now.as_deref(), accept_past_time, json),
            Command::Session => {
                let config = Config::load()?;
                compose::run(&config)
            }
        }
    }
}

pub fn setup_logging(verbose: u8) {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("metar_core={level},metar={level}")));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();

    debug!("Logging initialized at level: {level}");
}

fn configure() -> Result<()> {
    let mut config = Config::load()?;
    let directory = PacificDirectory;

    let countries = directory.countries();
    let cursor = config
        .default_country
        .as_deref()
        .and_then(|current| countries.iter().position(|c| c.eq_ignore_ascii_case(current)))
        .unwrap_or_default();
    let country = Select::new("Default country:", countries)
        .with_starting_cursor(cursor)
        .prompt()?;
    config.set_default_country(country);

    let email = Text::new("Bulletin recipient email (empty for none):")
        .with_initial_value(config.recipient_email.as_deref().unwrap_or_default())
        .prompt()?;
    config.set_recipient_email(&email);

    config.save()?;
    println!("Saved {}", Config::config_file_path()?.display());
    Ok(())
}

fn stations(country: Option<&str>) -> Result<()> {
    let directory = PacificDirectory;

    let Some(country) = country else {
        for name in directory.countries() {
            let stations = directory.stations(name).unwrap_or_default();
            println!("{name:<18} {}", stations.join(" "));
        }
        return Ok(());
    };

    let Some(stations) = directory.stations(country) else {
        bail!("Unknown country '{country}'. Run `metar stations` for the list.");
    };

    println!("CCCC    {}", directory.collective_code(country).unwrap_or_default());
    for observation_type in ObservationType::all() {
        println!(
            "{:<7} {}",
            observation_type.as_str(),
            directory
                .header_code(country, *observation_type)
                .unwrap_or_default()
        );
    }
    println!("Stations: {}", stations.join(" "));
    Ok(())
}

fn check(file: &Path, now: Option<&str>, accept_past_time: bool, json: bool) -> Result<()> {
    let now = match now {
        Some(text) => DateTime::parse_from_rfc3339(text)
            .with_context(|| format!("Invalid --now value: {text}"))?
            .with_timezone(&Utc),
        None => Utc::now(),
    };

    let contents = fs::read_to_string(file)
        .with_context(|| format!("Failed to read observation form: {}", file.display()))?;
    let form = if file.extension().is_some_and(|ext| ext == "json") {
        ObservationForm::from_json_str(&contents)?
    } else {
        ObservationForm::from_toml_str(&contents)?
    };

    let config = Config::load()?;
    let mut session = Session::new(config.rules, Box::new(PacificDirectory));
    form.apply(&mut session, now)
        .with_context(|| format!("Failed to apply observation form: {}", file.display()))?;
    if accept_past_time {
        session.acknowledge_past_time();
    }

    match session.commit(now) {
        CommitOutcome::Committed(report) => {
            if json {
                let out = json!({ "ok": true, "report": report });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                println!("{report}");
            }
            Ok(())
        }
        CommitOutcome::Rejected(validation) => {
            if json {
                let out = json!({
                    "ok": false,
                    "error_tags": validation.tags(),
                    "findings": &validation.findings,
                });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                print_findings(&validation);
            }
            bail!("{} finding(s) in {}", validation.findings.len(), file.display())
        }
    }
}

pub fn print_findings(validation: &Validation) {
    for finding in &validation.findings {
        eprintln!("[{}] {}", finding.tag, finding.message);
        if let Some(prompt) = &finding.prompt {
            eprintln!("       {prompt}");
        }
    }
}
