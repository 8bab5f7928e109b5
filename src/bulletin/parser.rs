/// Station bulletin parser
///
/// Locates the `yyyy` header and turns every following line into a
/// `StationRecord`. Rows whose year/month are not integers (unit rows,
/// trailing notes, "Site closed" remarks) are dropped silently; the only hard
/// failure is a bulletin with no header at all.
use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use super::normalize::NormalizedMeasurement;
use super::record::StationRecord;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BulletinError {
    #[error("no header found")]
    NoHeader,
}

/// Token that opens the bulletin header line (`yyyy  mm  tmax ...`)
pub const HEADER_TOKEN: &str = "yyyy";

/// Logical columns of a bulletin data row, in bulletin order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Year,
    Month,
    MaxTemp,
    MinTemp,
    AirFrostDays,
    Rainfall,
    SunshineHours,
}

impl Column {
    pub const ALL: [Column; 7] = [
        Column::Year,
        Column::Month,
        Column::MaxTemp,
        Column::MinTemp,
        Column::AirFrostDays,
        Column::Rainfall,
        Column::SunshineHours,
    ];

    pub const MEASUREMENTS: [Column; 5] = [
        Column::MaxTemp,
        Column::MinTemp,
        Column::AirFrostDays,
        Column::Rainfall,
        Column::SunshineHours,
    ];

    /// Position of the column in a whitespace-split data row
    pub const fn index(self) -> usize {
        match self {
            Column::Year => 0,
            Column::Month => 1,
            Column::MaxTemp => 2,
            Column::MinTemp => 3,
            Column::AirFrostDays => 4,
            Column::Rainfall => 5,
            Column::SunshineHours => 6,
        }
    }

    /// Column name used in the tabular export
    pub const fn name(self) -> &'static str {
        match self {
            Column::Year => "year",
            Column::Month => "month",
            Column::MaxTemp => "maxTemp",
            Column::MinTemp => "minTemp",
            Column::AirFrostDays => "airFrostDays",
            Column::Rainfall => "rainfall",
            Column::SunshineHours => "sunshineHours",
        }
    }
}

/// A data line split on whitespace runs.
///
/// Cells past the end of a ragged row read as empty tokens; cells past the
/// seventh column (e.g. `Provisional`) are ignored. Assumes no measurement
/// token contains internal whitespace.
struct DataRow<'a> {
    cells: Vec<&'a str>,
}

impl<'a> DataRow<'a> {
    fn split(line: &'a str) -> Self {
        Self {
            cells: line.split_whitespace().collect(),
        }
    }

    fn cell(&self, column: Column) -> &'a str {
        self.cells.get(column.index()).copied().unwrap_or("")
    }

    fn measurement(&self, column: Column) -> NormalizedMeasurement {
        NormalizedMeasurement::from_token(self.cell(column))
    }
}

/// Whether a line is the bulletin header: leading whitespace, then `yyyy`
/// in any case
pub fn is_header_line(line: &str) -> bool {
    line.trim_start()
        .get(..HEADER_TOKEN.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(HEADER_TOKEN))
}

/// Index of the first header line, if any
pub fn find_header(lines: &[&str]) -> Option<usize> {
    lines.iter().position(|line| is_header_line(line))
}

/// Parse one station bulletin into records tagged with `station_id`
#[instrument(skip(raw_text), fields(station = %station_id, text_size = raw_text.len()))]
pub fn parse_bulletin(raw_text: &str, station_id: &str) -> Result<Vec<StationRecord>, BulletinError> {
    let lines: Vec<&str> = raw_text.trim().lines().collect();

    let header_idx = find_header(&lines).ok_or_else(|| {
        warn!("No yyyy header line found in bulletin");
        debug!(
            "Bulletin preview (first 300 chars): {}",
            raw_text.chars().take(300).collect::<String>()
        );
        BulletinError::NoHeader
    })?;
    debug!("Found header at line {}", header_idx);

    let mut records = Vec::new();
    let mut dropped_rows = 0;

    for line in &lines[header_idx + 1..] {
        if line.trim().is_empty() {
            continue;
        }

        match parse_row(line, station_id) {
            Some(record) => records.push(record),
            None => {
                debug!("Dropping row without a valid year/month: '{}'", line.trim());
                dropped_rows += 1;
            }
        }
    }

    debug!(
        "Parsed {} records, dropped {} non-data rows",
        records.len(),
        dropped_rows
    );

    Ok(records)
}

/// Row admission: year and month must be integers forming a calendar month
fn parse_row(line: &str, station_id: &str) -> Option<StationRecord> {
    let row = DataRow::split(line);

    let year = row.cell(Column::Year).parse::<i32>().ok()?;
    let month = row.cell(Column::Month).parse::<u32>().ok()?;
    let date = NaiveDate::from_ymd_opt(year, month, 1)?;

    Some(StationRecord {
        station: station_id.to_string(),
        year,
        month,
        date,
        max_temp: row.measurement(Column::MaxTemp),
        min_temp: row.measurement(Column::MinTemp),
        air_frost_days: row.measurement(Column::AirFrostDays),
        rainfall: row.measurement(Column::Rainfall),
        sunshine_hours: row.measurement(Column::SunshineHours),
    })
}
