//! CSV input series and ledger output.

use chrono::{DateTime, NaiveDateTime};
use csv::{ReaderBuilder, Writer};
use serde::Deserialize;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::{debug, info};

use crate::domain::{ResultRecord, SeriesPoint, TimeSeries, REQUIRED_COLUMNS};
use crate::error::{EngineError, EngineResult};

const TIMESTAMP_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

#[derive(Debug, Deserialize)]
struct SeriesRow {
    #[serde(rename = "DATETIME")]
    datetime: String,
    #[serde(rename = "PRICE")]
    price: f64,
    #[serde(rename = "DEMAND")]
    demand: f64,
    #[serde(rename = "WIND")]
    wind: f64,
    #[serde(rename = "CURTAILMENT")]
    curtailment: f64,
    #[serde(rename = "CARBON_BASED_FUELS")]
    carbon_based_fuels: f64,
}

/// Parse an RFC 3339 timestamp (converted to UTC) or a naive one.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
}

pub fn read_series(path: &Path) -> EngineResult<TimeSeries> {
    let file = File::open(path)?;
    let series = read_series_from(file)?;
    info!(path = %path.display(), rows = series.len(), "loaded input series");
    Ok(series)
}

/// Extra columns are ignored; a missing required column fails before any row is read.
pub fn read_series_from<R: Read>(reader: R) -> EngineResult<TimeSeries> {
    let mut rdr = ReaderBuilder::new().has_headers(true).trim(csv::Trim::All).from_reader(reader);

    let headers = rdr.headers()?.clone();
    if let Some(missing) = REQUIRED_COLUMNS
        .iter()
        .find(|column| !headers.iter().any(|h| h == **column))
    {
        return Err(EngineError::MissingColumn((*missing).to_string()));
    }

    let mut points = Vec::new();
    for (index, row) in rdr.deserialize::<SeriesRow>().enumerate() {
        let row = row?;
        let timestamp = parse_timestamp(&row.datetime).ok_or_else(|| EngineError::InvalidTimestamp {
            row: index + 1,
            value: row.datetime.clone(),
        })?;
        points.push(SeriesPoint {
            timestamp,
            price: row.price,
            demand: row.demand,
            wind: row.wind,
            curtailment: row.curtailment,
            carbon_based_fuels: row.carbon_based_fuels,
        });
    }
    debug!(rows = points.len(), "parsed series rows");
    TimeSeries::new(points)
}

pub fn write_ledger(path: &Path, ledger: &[ResultRecord]) -> EngineResult<()> {
    let file = File::create(path)?;
    write_ledger_to(file, ledger)?;
    info!(path = %path.display(), rows = ledger.len(), "wrote operational ledger");
    Ok(())
}

pub fn write_ledger_to<W: Write>(writer: W, ledger: &[ResultRecord]) -> EngineResult<()> {
    let mut writer = Writer::from_writer(writer);
    for record in ledger {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn read_ledger(path: &Path) -> EngineResult<Vec<ResultRecord>> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_path(path)?;
    let mut ledger = Vec::new();
    for record in rdr.deserialize() {
        ledger.push(record?);
    }
    Ok(ledger)
}
