/// Delimited snapshot export of the corpus and the station location table
///
/// Files are written to a temporary file next to the target and renamed into
/// place, so readers never observe a half-written snapshot.
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::bulletin::StationRecord;
use crate::coordinates::StationLocation;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to move snapshot into place: {0}")]
    Persist(#[from] tempfile::PersistError),
}

/// Corpus columns in export order
pub const CORPUS_COLUMNS: [&str; 19] = [
    "station",
    "year",
    "month",
    "date",
    "maxTemp",
    "maxTemp_estimated",
    "maxTemp_autoSensor",
    "minTemp",
    "minTemp_estimated",
    "minTemp_autoSensor",
    "airFrostDays",
    "airFrostDays_estimated",
    "airFrostDays_autoSensor",
    "rainfall",
    "rainfall_estimated",
    "rainfall_autoSensor",
    "sunshineHours",
    "sunshineHours_estimated",
    "sunshineHours_autoSensor",
];

pub const LOCATION_COLUMNS: [&str; 3] = ["station", "latitude", "longitude"];

/// Flat tabular form of a `StationRecord`; field order matches `CORPUS_COLUMNS`
#[derive(Debug, Serialize)]
struct CorpusRow<'a> {
    station: &'a str,
    year: i32,
    month: u32,
    date: NaiveDate,
    max_temp: Option<f64>,
    max_temp_estimated: bool,
    max_temp_auto_sensor: bool,
    min_temp: Option<f64>,
    min_temp_estimated: bool,
    min_temp_auto_sensor: bool,
    air_frost_days: Option<f64>,
    air_frost_days_estimated: bool,
    air_frost_days_auto_sensor: bool,
    rainfall: Option<f64>,
    rainfall_estimated: bool,
    rainfall_auto_sensor: bool,
    sunshine_hours: Option<f64>,
    sunshine_hours_estimated: bool,
    sunshine_hours_auto_sensor: bool,
}

impl<'a> From<&'a StationRecord> for CorpusRow<'a> {
    fn from(r: &'a StationRecord) -> Self {
        Self {
            station: &r.station,
            year: r.year,
            month: r.month,
            date: r.date,
            max_temp: r.max_temp.value,
            max_temp_estimated: r.max_temp.estimated,
            max_temp_auto_sensor: r.max_temp.auto_sensor,
            min_temp: r.min_temp.value,
            min_temp_estimated: r.min_temp.estimated,
            min_temp_auto_sensor: r.min_temp.auto_sensor,
            air_frost_days: r.air_frost_days.value,
            air_frost_days_estimated: r.air_frost_days.estimated,
            air_frost_days_auto_sensor: r.air_frost_days.auto_sensor,
            rainfall: r.rainfall.value,
            rainfall_estimated: r.rainfall.estimated,
            rainfall_auto_sensor: r.rainfall.auto_sensor,
            sunshine_hours: r.sunshine_hours.value,
            sunshine_hours_estimated: r.sunshine_hours.estimated,
            sunshine_hours_auto_sensor: r.sunshine_hours.auto_sensor,
        }
    }
}

/// Where refreshes write their snapshots; `None` disables that file
#[derive(Debug, Clone, Default)]
pub struct ExportSettings {
    pub snapshot_path: Option<PathBuf>,
    pub coordinates_path: Option<PathBuf>,
}

impl ExportSettings {
    pub fn disabled() -> Self {
        Self::default()
    }
}

/// Write records as CSV to any writer. The header is always written, so an
/// empty corpus still yields a well-formed table.
pub fn write_records<'a, W, I>(records: I, writer: W) -> Result<usize, ExportError>
where
    W: Write,
    I: IntoIterator<Item = &'a StationRecord>,
{
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    wtr.write_record(CORPUS_COLUMNS)?;

    let mut rows = 0;
    for record in records {
        wtr.serialize(CorpusRow::from(record))?;
        rows += 1;
    }
    wtr.flush()?;

    Ok(rows)
}

/// Records rendered to an in-memory CSV document
pub fn records_to_csv_bytes<'a, I>(records: I) -> Result<Vec<u8>, ExportError>
where
    I: IntoIterator<Item = &'a StationRecord>,
{
    let mut buffer = Vec::new();
    write_records(records, &mut buffer)?;
    Ok(buffer)
}

pub fn write_locations<W: Write>(locations: &[StationLocation], writer: W) -> Result<(), ExportError> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    wtr.write_record(LOCATION_COLUMNS)?;
    for location in locations {
        wtr.serialize(location)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write the corpus snapshot to `path`, returning the number of rows
#[instrument(skip(records), fields(path = %path.display()))]
pub fn write_corpus_csv<'a, I>(records: I, path: &Path) -> Result<usize, ExportError>
where
    I: IntoIterator<Item = &'a StationRecord>,
{
    let mut rows = 0;
    write_atomically(path, |file| {
        rows = write_records(records, file)?;
        Ok(())
    })?;
    info!("Wrote {} corpus rows to {}", rows, path.display());
    Ok(rows)
}

#[instrument(skip(locations), fields(path = %path.display(), stations = locations.len()))]
pub fn write_locations_csv(locations: &[StationLocation], path: &Path) -> Result<(), ExportError> {
    write_atomically(path, |file| write_locations(locations, file))?;
    info!("Wrote {} station locations to {}", locations.len(), path.display());
    Ok(())
}

fn write_atomically<F>(path: &Path, write: F) -> Result<(), ExportError>
where
    F: FnOnce(&mut File) -> Result<(), ExportError>,
{
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;

    let mut temp_file = tempfile::NamedTempFile::new_in(dir)?;
    write(temp_file.as_file_mut())?;
    temp_file.as_file_mut().sync_all()?;
    debug!("Persisting snapshot to {}", path.display());
    temp_file.persist(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bulletin::{parse_bulletin, Column};

    const SAMPLE: &str = "   yyyy  mm  tmax  tmin    af   rain    sun
   2020   1   5.2  -1.3     3   45.0*  60.2
   2020   2   ---   2.1     0   30.5   70.0#
";

    #[test]
    fn test_columns_follow_measurement_table() {
        let mut expected = vec!["station", "year", "month", "date"]
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>();
        for column in Column::MEASUREMENTS {
            let name = column.name();
            expected.extend([
                name.to_string(),
                format!("{name}_estimated"),
                format!("{name}_autoSensor"),
            ]);
        }
        assert_eq!(expected, CORPUS_COLUMNS);
    }

    #[test]
    fn test_records_to_csv() {
        let records = parse_bulletin(SAMPLE, "sheffield").unwrap();
        let csv = String::from_utf8(records_to_csv_bytes(&records).unwrap()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], CORPUS_COLUMNS.join(","));
        assert_eq!(
            lines[1],
            "sheffield,2020,1,2020-01-01,5.2,false,false,-1.3,false,false,3.0,false,false,45.0,true,false,60.2,false,false"
        );
        assert_eq!(
            lines[2],
            "sheffield,2020,2,2020-02-01,,false,false,2.1,false,false,0.0,false,false,30.5,false,false,70.0,false,true"
        );
    }

    #[test]
    fn test_empty_records_still_have_header() {
        let csv = String::from_utf8(records_to_csv_bytes(std::iter::empty()).unwrap()).unwrap();
        assert_eq!(csv.trim_end(), CORPUS_COLUMNS.join(","));
    }

    #[test]
    fn test_locations_to_csv() {
        let locations = vec![
            StationLocation {
                station: "sheffield".to_string(),
                latitude: Some(53.381),
                longitude: Some(-1.49),
            },
            StationLocation::unknown("valley"),
        ];
        let mut buffer = Vec::new();
        write_locations(&locations, &mut buffer).unwrap();
        let csv = String::from_utf8(buffer).unwrap();

        assert_eq!(
            csv,
            "station,latitude,longitude\nsheffield,53.381,-1.49\nvalley,,\n"
        );
    }
}
