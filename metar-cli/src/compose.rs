//! Interactive composition loop behind `metar session`.
//!
//! Each prompt writes straight into the [`Session`]; values the model refuses
//! are reported and asked again. Rule checks run on commit, and only the
//! groups that were flagged are asked again.

use anyhow::Result;
use chrono::Utc;
use inquire::{Confirm, CustomType, Select, Text};
use std::{collections::BTreeSet, fmt};

use metar_core::{
    CloudField, CommitOutcome, Config, Field, ObservationType, Session, Toggle,
    model::{Bearing, CloudAmount, GUST_THRESHOLD_KT, MAX_CLOUD_LAYERS},
    validate::{
        GroupId,
        time::{PAST_TIME_PROMPT, TimeCheck},
    },
};

use crate::cli::print_findings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    NewReport,
    NilReport,
    ChangeStation,
    RemoveLast,
    EditLine,
    ShowBulletin,
    Quit,
}

impl Action {
    const fn all() -> &'static [Action] {
        &[
            Action::NewReport,
            Action::NilReport,
            Action::ChangeStation,
            Action::RemoveLast,
            Action::EditLine,
            Action::ShowBulletin,
            Action::Quit,
        ]
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::NewReport => "New report",
            Action::NilReport => "NIL report",
            Action::ChangeStation => "Change station / time",
            Action::RemoveLast => "Remove last line",
            Action::EditLine => "Edit a line",
            Action::ShowBulletin => "Show bulletin",
            Action::Quit => "Quit",
        })
    }
}

pub fn run(config: &Config) -> Result<()> {
    let mut session = Session::from_config(config)?;
    choose_header(&mut session)?;

    loop {
        println!();
        for (number, line) in session.ledger().entries().iter().enumerate() {
            println!("{:>2}. {line}", number + 1);
        }

        match Select::new("Next:", Action::all().to_vec()).prompt()? {
            Action::NewReport => compose_report(&mut session)?,
            Action::NilReport => report_nil(&mut session)?,
            Action::ChangeStation => {
                choose_station(&mut session)?;
                choose_time(&mut session)?;
            }
            Action::RemoveLast => {
                if !session.ledger().is_empty()
                    && Confirm::new("Are you sure you want to delete the last METAR line?")
                        .with_default(false)
                        .prompt()?
                {
                    session.remove_last();
                }
            }
            Action::EditLine => edit_line(&mut session)?,
            Action::ShowBulletin => show_bulletin(&session),
            Action::Quit => {
                show_bulletin(&session);
                return Ok(());
            }
        }
    }
}

fn show_bulletin(session: &Session) {
    if session.ledger().is_empty() {
        println!("No reports yet.");
        return;
    }

    println!("\n{}\n", session.bulletin());
    if let Some(email) = session.observation().recipient_email() {
        println!("Recipient: {email}");
    }
}

fn choose_header(session: &mut Session) -> Result<()> {
    let countries: Vec<String> = session
        .directory()
        .countries()
        .into_iter()
        .map(String::from)
        .collect();
    let cursor = session
        .observation()
        .header()
        .country
        .as_deref()
        .and_then(|current| countries.iter().position(|c| c == current))
        .unwrap_or_default();

    let country = Select::new("Country:", countries)
        .with_starting_cursor(cursor)
        .prompt()?;
    session.select_country(&country)?;

    let observation_type =
        Select::new("Observation type:", ObservationType::all().to_vec()).prompt()?;
    session.select_observation_type(observation_type);

    choose_station(session)?;
    choose_time(session)
}

fn choose_station(session: &mut Session) -> Result<()> {
    let country = session
        .observation()
        .header()
        .country
        .clone()
        .unwrap_or_default();
    let stations = session
        .directory()
        .stations(&country)
        .map(<[_]>::to_vec)
        .unwrap_or_default();

    let station = Select::new("Station:", stations).prompt()?;
    if let Some(warning) = session.select_station(station)? {
        eprintln!("{warning}");
    }
    Ok(())
}

fn choose_time(session: &mut Session) -> Result<()> {
    loop {
        let current = session.observation().header().utc_time.clone();
        let utc_time = Text::new("UTC time (DDHHMM):")
            .with_initial_value(&current)
            .prompt()?;

        match session.set_utc_time(&utc_time, Utc::now()) {
            TimeCheck::Accepted => return Ok(()),
            TimeCheck::Past { .. } => {
                if Confirm::new(PAST_TIME_PROMPT).with_default(false).prompt()? {
                    session.acknowledge_past_time();
                    return Ok(());
                }
            }
            TimeCheck::TooFarAhead { .. } => eprintln!(
                "Time is too far in the future (max {} min ahead)",
                session.rules().future_window_minutes
            ),
            TimeCheck::Malformed(reason) => eprintln!("{reason}"),
        }
    }
}

fn report_nil(session: &mut Session) -> Result<()> {
    let station = session.observation().header().station_id.clone();
    if !station.is_empty()
        && !Confirm::new(&format!("{station} has NIL observation. Proceed?"))
            .with_default(true)
            .prompt()?
    {
        return Ok(());
    }

    match session.report_nil() {
        Ok(report) => println!("Added: {report}"),
        Err(err) => eprintln!("{err}"),
    }
    Ok(())
}

fn edit_line(session: &mut Session) -> Result<()> {
    let len = session.ledger().len();
    if len == 0 {
        return Ok(());
    }

    let number = CustomType::<usize>::new(&format!("METAR line number to edit (1 to {len}):"))
        .prompt()?;
    if !(1..=len).contains(&number) {
        eprintln!("Invalid line number.");
        return Ok(());
    }

    let current = session.ledger().entries()[number - 1].clone();
    let edited = Text::new("Edit the METAR line:")
        .with_initial_value(&current)
        .prompt()?;
    if let Err(err) = session.replace_at(number - 1, &edited) {
        eprintln!("{err}");
    }
    Ok(())
}

fn compose_report(session: &mut Session) -> Result<()> {
    for group in [GroupId::Wind, GroupId::Sky, GroupId::Thermo] {
        edit_group(session, group)?;
    }
    edit_supplementary(session)?;

    loop {
        println!("Preview: {}", session.preview());

        let validation = match session.commit(Utc::now()) {
            CommitOutcome::Committed(report) => {
                println!("Added: {report}");
                return Ok(());
            }
            CommitOutcome::Rejected(validation) => validation,
        };

        print_findings(&validation);

        if validation.is_soft_only() {
            if Confirm::new(PAST_TIME_PROMPT).with_default(false).prompt()? {
                session.acknowledge_past_time();
            } else {
                choose_time(session)?;
            }
            continue;
        }

        if !Confirm::new("Correct the flagged groups?")
            .with_default(true)
            .prompt()?
        {
            // The body stays in the session for the next attempt.
            return Ok(());
        }

        let flagged: BTreeSet<GroupId> = session.error_tags().iter().map(|t| t.group()).collect();
        for group in flagged {
            edit_group(session, group)?;
        }
    }
}

fn edit_group(session: &mut Session, group: GroupId) -> Result<()> {
    match group {
        GroupId::Time => choose_time(session),
        GroupId::Wind => edit_wind(session),
        GroupId::Sky => edit_sky(session),
        GroupId::Thermo => edit_thermo(session),
    }
}

/// Asks for one field until the model accepts the value.
fn ask(session: &mut Session, field: Field, message: &str) -> Result<()> {
    loop {
        let current = session.observation().field_text(field);
        let value = Text::new(message).with_initial_value(&current).prompt()?;

        match session.update_field(field, &value) {
            Ok(()) => return Ok(()),
            Err(err) => eprintln!("{err}"),
        }
    }
}

fn toggle(session: &mut Session, toggle: Toggle, message: &str) -> Result<bool> {
    let enabled = Confirm::new(message)
        .with_default(session.observation().is_enabled(toggle))
        .prompt()?;
    session.set_enabled(toggle, enabled)?;
    Ok(enabled)
}

fn edit_wind(session: &mut Session) -> Result<()> {
    ask(session, Field::WindDirection, "Wind direction (3 digits, VRB or ///):")?;
    ask(session, Field::WindSpeed, "Wind speed KT (or //):")?;

    let gusty = session
        .observation()
        .wind_speed_knots()
        .is_some_and(|speed| speed >= GUST_THRESHOLD_KT);
    if gusty {
        ask(session, Field::Gust, "Gust KT:")?;
    }

    if toggle(session, Toggle::WindVariation, "Report wind variation?")? {
        ask(session, Field::WindVariationFrom, "Variation from (3 digits):")?;
        ask(session, Field::WindVariationTo, "Variation to (3 digits):")?;
    }
    Ok(())
}

fn edit_sky(session: &mut Session) -> Result<()> {
    let cavok = Confirm::new("CAVOK?")
        .with_default(session.observation().is_cavok())
        .prompt()?;
    session.set_cavok(cavok);
    if cavok {
        return Ok(());
    }

    ask(session, Field::Visibility, "Visibility m (4 digits):")?;

    if toggle(
        session,
        Toggle::DirectionalVisibility,
        "Report directional visibility?",
    )? {
        ask(
            session,
            Field::DirectionalVisibilityValue,
            "Directional visibility m (4 digits):",
        )?;
        let bearing = Select::new("Direction:", Bearing::all().to_vec()).prompt()?;
        session.update_field(Field::DirectionalVisibilityBearing, bearing.as_str())?;
    }

    if toggle(session, Toggle::PresentWeather, "Report present weather?")? {
        ask(
            session,
            Field::PresentWeather,
            "Present weather (e.g. -RA, +TSRA, FG):",
        )?;
    }

    edit_clouds(session)
}

fn edit_clouds(session: &mut Session) -> Result<()> {
    let tokens: Vec<String> = session
        .observation()
        .cloud_layers()
        .iter()
        .filter_map(|layer| layer.token())
        .collect();

    if !session.observation().cloud_layers().is_empty() {
        println!("Cloud: {}", tokens.join(" "));
        if !Confirm::new("Re-enter cloud layers?")
            .with_default(false)
            .prompt()?
        {
            return Ok(());
        }
        while !session.observation().cloud_layers().is_empty() {
            session.remove_cloud_layer(0)?;
        }
    }

    for number in 1..=MAX_CLOUD_LAYERS {
        let message = if number == 1 {
            "Add a cloud layer?"
        } else {
            "Add another cloud layer?"
        };
        if !Confirm::new(message).with_default(number == 1).prompt()? {
            break;
        }

        let index = session.add_cloud_layer()?;
        let amount = Select::new("Amount:", CloudAmount::all().to_vec()).prompt()?;
        session.update_cloud_layer(index, CloudField::Amount, amount.as_str())?;

        let height = Text::new("Height (hundreds of ft, 3 digits):").prompt()?;
        session.update_cloud_layer(index, CloudField::Height, &height)?;

        let convective = Select::new("Convective cloud:", vec!["none", "TCU", "CB"]).prompt()?;
        if convective != "none" {
            session.update_cloud_layer(index, CloudField::Convective, convective)?;
        }
    }
    Ok(())
}

fn edit_thermo(session: &mut Session) -> Result<()> {
    ask(session, Field::Temperature, "Temperature °C (e.g. 25, //):")?;
    ask(session, Field::DewPoint, "Dew point °C (e.g. 20, //):")?;
    ask(session, Field::Qnh, "QNH hPa (4 digits or ////):")
}

fn edit_supplementary(session: &mut Session) -> Result<()> {
    if toggle(session, Toggle::RecentWeather, "Report recent weather?")? {
        ask(session, Field::RecentWeather, "Recent weather (e.g. RA, TS):")?;
    }
    if toggle(session, Toggle::Remarks, "Add remarks?")? {
        ask(session, Field::Remarks, "Remarks:")?;
    }
    Ok(())
}
