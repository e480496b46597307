//! Rider records as exchanged with CSV collaborators.
//!
//! Numeric cells are read leniently: an empty or unparsable cell becomes 0
//! rather than aborting the run. Range validation (no negative cost or
//! points) happens later, at pool construction.

use std::fmt;
use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

/// Rider category. Each group carries its own required roster count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Group {
    Male,
    Female,
}

impl Group {
    pub const ALL: [Group; 2] = [Group::Male, Group::Female];
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Male => write!(f, "male"),
            Self::Female => write!(f, "female"),
        }
    }
}

/// One rider row as ingested, before normalization.
///
/// Column names follow the upstream fantasy export: `value` is the purchase
/// cost, `points` the fantasy points, `uci_points` the series points merged
/// in by [crate::data::uci].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiderRecord {
    pub name: String,
    #[serde(rename = "value", deserialize_with = "lenient_i64")]
    pub cost: i64,
    #[serde(rename = "points", deserialize_with = "lenient_f64")]
    pub primary_points: f64,
    #[serde(rename = "gender")]
    pub group: Group,
    #[serde(rename = "uci_points", default, deserialize_with = "lenient_f64")]
    pub secondary_points: f64,
    #[serde(rename = "injured", default, deserialize_with = "lenient_bool")]
    pub unavailable: bool,
}

#[derive(Debug)]
pub enum CsvError {
    Open(std::io::Error),
    Parse(csv::Error),
    Write(csv::Error),
}

impl fmt::Display for CsvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open(err) => write!(f, "failed to open riders csv: {err}"),
            Self::Parse(err) => write!(f, "failed to parse riders csv: {err}"),
            Self::Write(err) => write!(f, "failed to write riders csv: {err}"),
        }
    }
}

impl std::error::Error for CsvError {}

/// Load rider rows from a headered CSV file, preserving file order.
pub fn load_riders_csv(path: impl AsRef<Path>) -> Result<Vec<RiderRecord>, CsvError> {
    let file = File::open(path.as_ref()).map_err(CsvError::Open)?;
    let mut reader = csv::Reader::from_reader(file);
    let mut records = Vec::new();
    for row in reader.deserialize() {
        let record: RiderRecord = row.map_err(CsvError::Parse)?;
        records.push(record);
    }
    Ok(records)
}

/// Write rider rows with the same headers the loader expects.
pub fn write_riders_csv(path: impl AsRef<Path>, records: &[RiderRecord]) -> Result<(), CsvError> {
    let file = File::create(path.as_ref()).map_err(CsvError::Open)?;
    let mut writer = csv::Writer::from_writer(file);
    for record in records {
        writer.serialize(record).map_err(CsvError::Write)?;
    }
    writer
        .flush()
        .map_err(|err| CsvError::Write(csv::Error::from(err)))?;
    Ok(())
}

/// Lenient numeric cell: empty or unparsable reads as 0.
fn numeric_cell(raw: &str) -> f64 {
    raw.trim().parse::<f64>().unwrap_or(0.0)
}

fn lenient_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(numeric_cell(&raw) as i64)
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(numeric_cell(&raw))
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(raw.trim().eq_ignore_ascii_case("true"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_csv(data: &str) -> Vec<RiderRecord> {
        let mut reader = csv::Reader::from_reader(data.as_bytes());
        reader
            .deserialize()
            .collect::<Result<Vec<RiderRecord>, _>>()
            .expect("csv should parse")
    }

    #[test]
    fn parses_well_formed_rows() {
        let records = parse_csv(
            "name,value,points,gender,uci_points,injured\n\
             Amaury Pierron,700000,1290,male,1601,false\n\
             Valentina Holl,650000,1484,female,1725,true\n",
        );
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].cost, 700_000);
        assert_eq!(records[0].group, Group::Male);
        assert!(!records[0].unavailable);
        assert_eq!(records[1].group, Group::Female);
        assert!(records[1].unavailable);
    }

    #[test]
    fn unparsable_numeric_cells_read_as_zero() {
        let records = parse_csv(
            "name,value,points,gender,uci_points,injured\n\
             Ghost Rider,n/a,,male,--,\n",
        );
        assert_eq!(records[0].cost, 0);
        assert_eq!(records[0].primary_points, 0.0);
        assert_eq!(records[0].secondary_points, 0.0);
        assert!(!records[0].unavailable);
    }

    #[test]
    fn fractional_cost_cells_truncate() {
        let records = parse_csv(
            "name,value,points,gender,uci_points,injured\n\
             Rounded,1234.9,10,male,0,false\n",
        );
        assert_eq!(records[0].cost, 1234);
    }

    #[test]
    fn uci_points_column_is_optional() {
        let records = parse_csv(
            "name,value,points,gender,injured\n\
             Plain,100,10,female,false\n",
        );
        assert_eq!(records[0].secondary_points, 0.0);
    }

    #[test]
    fn injured_flag_is_case_insensitive() {
        let records = parse_csv(
            "name,value,points,gender,uci_points,injured\n\
             A,1,1,male,0,True\n\
             B,1,1,male,0,FALSE\n",
        );
        assert!(records[0].unavailable);
        assert!(!records[1].unavailable);
    }
}
