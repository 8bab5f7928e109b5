use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::normalize::NormalizedMeasurement;
use super::parser::Column;

/// One (station, year, month) observation parsed from a bulletin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StationRecord {
    pub station: String,
    pub year: i32,
    pub month: u32,
    /// First day of the observed month
    pub date: NaiveDate,
    pub max_temp: NormalizedMeasurement,
    pub min_temp: NormalizedMeasurement,
    pub air_frost_days: NormalizedMeasurement,
    pub rainfall: NormalizedMeasurement,
    pub sunshine_hours: NormalizedMeasurement,
}

impl StationRecord {
    /// Measurement for a measurement column, `None` for year/month
    pub fn measurement(&self, column: Column) -> Option<&NormalizedMeasurement> {
        match column {
            Column::Year | Column::Month => None,
            Column::MaxTemp => Some(&self.max_temp),
            Column::MinTemp => Some(&self.min_temp),
            Column::AirFrostDays => Some(&self.air_frost_days),
            Column::Rainfall => Some(&self.rainfall),
            Column::SunshineHours => Some(&self.sunshine_hours),
        }
    }

    /// Mean of the available max/min temperatures.
    ///
    /// One missing side falls back to the other, both missing gives `None`.
    pub fn avg_temp(&self) -> Option<f64> {
        match (self.max_temp.value, self.min_temp.value) {
            (Some(max), Some(min)) => Some((max + min) / 2.0),
            (Some(only), None) | (None, Some(only)) => Some(only),
            (None, None) => None,
        }
    }
}
