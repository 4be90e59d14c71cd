//! Station reference data: which stations a country reports for, and the WMO
//! bulletin codes (TTAAii, CCCC) its reports are routed under.

use std::fmt::Debug;

use crate::model::ObservationType;

pub trait StationDirectory: Send + Sync + Debug {
    fn countries(&self) -> Vec<&str>;

    fn stations(&self, country: &str) -> Option<&[&'static str]>;

    /// CCCC of the national collective.
    fn collective_code(&self, country: &str) -> Option<&str>;

    /// TTAAii for the country and observation type.
    fn header_code(&self, country: &str, observation_type: ObservationType) -> Option<&str>;

    fn has_station(&self, country: &str, station: &str) -> bool {
        self.stations(country)
            .is_some_and(|stations| stations.iter().any(|s| *s == station))
    }
}

#[derive(Debug, Clone, Copy)]
struct CountryEntry {
    name: &'static str,
    stations: &'static [&'static str],
    cccc: &'static str,
    metar_ttaaii: &'static str,
    speci_ttaaii: &'static str,
}

const PACIFIC: &[CountryEntry] = &[
    CountryEntry {
        name: "Tonga",
        stations: &["NFTF", "NFTV", "NFTL", "NFTP", "NFTO", "NFTN"],
        cccc: "NFTF",
        metar_ttaaii: "SATO31",
        speci_ttaaii: "SPTO31",
    },
    CountryEntry {
        name: "Fiji",
        stations: &["NFFN", "NFNA", "NFNL", "NFNS", "NFNK"],
        cccc: "NFFN",
        metar_ttaaii: "SAFJ31",
        speci_ttaaii: "SPFJ31",
    },
    CountryEntry {
        name: "Samoa",
        stations: &["NSFA", "NSMA"],
        cccc: "NSFA",
        metar_ttaaii: "SASA31",
        speci_ttaaii: "SPSA31",
    },
    CountryEntry {
        name: "Cook Islands",
        stations: &["NCRG"],
        cccc: "NCRG",
        metar_ttaaii: "SACI31",
        speci_ttaaii: "SPCI31",
    },
    CountryEntry {
        name: "Niue",
        stations: &["NIUE"],
        cccc: "NIUE",
        metar_ttaaii: "SANI31",
        speci_ttaaii: "SPNI31",
    },
    CountryEntry {
        name: "Tuvalu",
        stations: &["NGFU"],
        cccc: "NGFU",
        metar_ttaaii: "SATV31",
        speci_ttaaii: "SPTV31",
    },
    CountryEntry {
        name: "Vanuatu",
        stations: &["NVVV", "NVSS"],
        cccc: "NVVV",
        metar_ttaaii: "SAVU31",
        speci_ttaaii: "SPVU31",
    },
    CountryEntry {
        name: "Solomon Islands",
        stations: &["AGGH"],
        cccc: "AGGH",
        metar_ttaaii: "SASB31",
        speci_ttaaii: "SPSB31",
    },
    CountryEntry {
        name: "Papua New Guinea",
        stations: &["AYPY", "AYMD", "AYMO"],
        cccc: "AYPY",
        metar_ttaaii: "SAPG31",
        speci_ttaaii: "SPPG31",
    },
    CountryEntry {
        name: "Kiribati",
        stations: &["NGTA", "NGTZ"],
        cccc: "NGTA",
        metar_ttaaii: "SAKI31",
        speci_ttaaii: "SPKI31",
    },
    CountryEntry {
        name: "Nauru",
        stations: &["ANAU"],
        cccc: "ANAU",
        metar_ttaaii: "SANA31",
        speci_ttaaii: "SPNA31",
    },
    CountryEntry {
        name: "Palau",
        stations: &["PTRO"],
        cccc: "PTRO",
        metar_ttaaii: "SAPW31",
        speci_ttaaii: "SPPW31",
    },
];

/// Built-in table of the South-Pacific national meteorological services.
#[derive(Debug, Clone, Copy, Default)]
pub struct PacificDirectory;

impl PacificDirectory {
    fn entry(&self, country: &str) -> Option<&'static CountryEntry> {
        PACIFIC.iter().find(|e| e.name.eq_ignore_ascii_case(country))
    }
}

impl StationDirectory for PacificDirectory {
    fn countries(&self) -> Vec<&str> {
        PACIFIC.iter().map(|e| e.name).collect()
    }

    fn stations(&self, country: &str) -> Option<&[&'static str]> {
        self.entry(country).map(|e| e.stations)
    }

    fn collective_code(&self, country: &str) -> Option<&str> {
        self.entry(country).map(|e| e.cccc)
    }

    fn header_code(&self, country: &str, observation_type: ObservationType) -> Option<&str> {
        self.entry(country).map(|e| match observation_type {
            ObservationType::Metar => e.metar_ttaaii,
            ObservationType::Speci => e.speci_ttaaii,
        })
    }
}
