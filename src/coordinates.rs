/// Station coordinate extraction
///
/// Bulletins annotate the station location in their preamble, e.g.
/// `Location: 433900E 387200N, Lat 53.381 Lon -1.490, 131 metres amsl`.
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Only the preamble carries the annotation
pub const HEADER_SCAN_LINES: usize = 10;

static COORDINATE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Lat\s+([\-\d\.]+)\s+Lon\s+([\-\d\.]+)").expect("coordinate pattern is valid")
});

/// Location row for one configured station
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StationLocation {
    pub station: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl StationLocation {
    /// Location taken from the bulletin header, `None` coordinates if absent
    pub fn from_bulletin(station: &str, raw_text: &str) -> Self {
        match extract_coordinates(raw_text) {
            Some((latitude, longitude)) => Self {
                station: station.to_string(),
                latitude: Some(latitude),
                longitude: Some(longitude),
            },
            None => Self::unknown(station),
        }
    }

    /// Row for a station whose bulletin could not be read
    pub fn unknown(station: &str) -> Self {
        Self {
            station: station.to_string(),
            latitude: None,
            longitude: None,
        }
    }

    pub fn has_coordinates(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }
}

/// Find `Lat <number> Lon <number>` in the first lines of a bulletin.
///
/// Returns `None` when the annotation is missing or either number does not
/// parse; absence of coordinates is never an error.
pub fn extract_coordinates(raw_text: &str) -> Option<(f64, f64)> {
    let header = raw_text
        .lines()
        .take(HEADER_SCAN_LINES)
        .collect::<Vec<_>>()
        .join("\n");

    let captures = COORDINATE_PATTERN.captures(&header)?;
    let latitude = captures[1].parse::<f64>().ok()?;
    let longitude = captures[2].parse::<f64>().ok()?;

    Some((latitude, longitude))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_coordinates_simple() {
        assert_eq!(
            extract_coordinates("Sheffield\nLat 53.38 Lon -1.50\n"),
            Some((53.38, -1.50))
        );
    }

    #[test]
    fn test_extract_coordinates_met_office_location_line() {
        let text = "Sheffield\nLocation: 433900E 387200N, Lat 53.381 Lon -1.490, 131 metres amsl\n";
        assert_eq!(extract_coordinates(text), Some((53.381, -1.490)));
    }

    #[test]
    fn test_extract_coordinates_case_insensitive_and_spacing() {
        assert_eq!(
            extract_coordinates("LAT   51.761\tlon  -1.262"),
            Some((51.761, -1.262))
        );
    }

    #[test]
    fn test_extract_coordinates_missing() {
        assert_eq!(extract_coordinates("Sheffield\nno location given\n"), None);
    }

    #[test]
    fn test_extract_coordinates_unparseable_number() {
        assert_eq!(extract_coordinates("Lat 5.3.1 Lon -1.5"), None);
    }

    #[test]
    fn test_extract_coordinates_ignores_lines_after_header_window() {
        let mut text = String::new();
        for i in 0..HEADER_SCAN_LINES {
            text.push_str(&format!("preamble line {i}\n"));
        }
        text.push_str("Lat 53.38 Lon -1.50\n");
        assert_eq!(extract_coordinates(&text), None);
    }

    #[test]
    fn test_station_location_unknown_when_absent() {
        let location = StationLocation::from_bulletin("valley", "Valley\n");
        assert_eq!(location, StationLocation::unknown("valley"));
        assert!(!location.has_coordinates());
    }

    #[test]
    fn test_station_location_from_bulletin() {
        let location = StationLocation::from_bulletin("valley", "Valley\nLat 53.252 Lon -4.535\n");
        assert_eq!(location.latitude, Some(53.252));
        assert_eq!(location.longitude, Some(-4.535));
    }
}
