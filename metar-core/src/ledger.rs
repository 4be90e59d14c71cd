//! Reports committed during one session, in commit order.

use serde::Serialize;
use tracing::{info, warn};

use crate::error::{MetarError, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Ledger {
    entries: Vec<String>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn append(&mut self, report: String) {
        info!(line = self.entries.len() + 1, report = %report, "ledger append");
        self.entries.push(report);
    }

    /// Drops the most recent report. Asking the observer first is the caller's job.
    pub fn remove_last(&mut self) -> Option<String> {
        let removed = self.entries.pop();
        if let Some(report) = &removed {
            info!(report = %report, "ledger remove last");
        }
        removed
    }

    /// Replaces a line with manually edited text (trimmed, never empty).
    pub fn replace_at(&mut self, index: usize, text: &str) -> Result<()> {
        let len = self.entries.len();
        let entry = self
            .entries
            .get_mut(index)
            .ok_or(MetarError::LedgerIndex { index, len })?;

        let text = text.trim();
        if text.is_empty() {
            return Err(MetarError::EmptyEntry);
        }

        info!(index, report = %text, "ledger line edited");
        *entry = text.to_string();
        Ok(())
    }

    /// True when some entry already carries `station` as a whole group.
    pub fn contains_station(&self, station: &str) -> bool {
        let station = station.trim();
        if station.is_empty() {
            return false;
        }

        let needle = format!(" {station} ");
        self.entries.iter().any(|line| line.contains(&needle))
    }

    /// Soft warning shown while a station is selected; never blocks a commit.
    pub fn station_warning(&self, station: &str) -> Option<String> {
        if !self.contains_station(station) {
            return None;
        }

        let station = station.trim();
        warn!(station, "station already in ledger");
        Some(format!("Station {station} already exists in METAR list."))
    }

    /// Header line followed by one report per line.
    pub fn bulletin(&self, header: &str) -> String {
        let mut lines = Vec::with_capacity(self.entries.len() + 1);
        if !header.is_empty() {
            lines.push(header);
        }
        lines.extend(self.entries.iter().map(String::as_str));
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger() -> Ledger {
        let mut ledger = Ledger::new();
        ledger.append("METAR NFTF 151200Z 09010KT 9999 FEW020 25/20 Q1013=".into());
        ledger.append("METAR NFTV 151200Z NIL=".into());
        ledger
    }

    #[test]
    fn remove_last_pops_most_recent() {
        let mut ledger = ledger();

        assert_eq!(ledger.remove_last().as_deref(), Some("METAR NFTV 151200Z NIL="));
        assert_eq!(ledger.len(), 1);
        ledger.remove_last();
        assert_eq!(ledger.remove_last(), None);
        assert!(ledger.is_empty());
    }

    #[test]
    fn replace_at_trims_and_checks_bounds() {
        let mut ledger = ledger();

        ledger
            .replace_at(1, "  METAR NFTV 151200Z 00000KT CAVOK 24/19 Q1014=  ")
            .unwrap();
        assert_eq!(ledger.entries()[1], "METAR NFTV 151200Z 00000KT CAVOK 24/19 Q1014=");

        assert_eq!(
            ledger.replace_at(2, "METAR"),
            Err(MetarError::LedgerIndex { index: 2, len: 2 })
        );
        assert_eq!(ledger.replace_at(0, "   "), Err(MetarError::EmptyEntry));
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn station_lookup_matches_whole_group() {
        let ledger = ledger();

        assert!(ledger.contains_station("NFTF"));
        assert!(ledger.contains_station("NFTV"));
        assert!(!ledger.contains_station("NFT"));
        assert!(!ledger.contains_station(""));
        assert_eq!(
            ledger.station_warning("NFTF").as_deref(),
            Some("Station NFTF already exists in METAR list.")
        );
        assert_eq!(ledger.station_warning("NFTL"), None);
    }

    #[test]
    fn duplicate_stations_are_allowed() {
        let mut ledger = ledger();
        ledger.append("METAR NFTF 151230Z 09012KT 9999 FEW020 25/20 Q1013=".into());

        assert_eq!(ledger.len(), 3);
    }

    #[test]
    fn bulletin_puts_header_first() {
        let ledger = ledger();

        assert_eq!(
            ledger.bulletin("SATO31 NFTF 151200"),
            "SATO31 NFTF 151200\n\
             METAR NFTF 151200Z 09010KT 9999 FEW020 25/20 Q1013=\n\
             METAR NFTV 151200Z NIL="
        );
        assert_eq!(Ledger::new().bulletin(""), "");
    }
}
