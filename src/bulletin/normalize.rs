/// Measurement token normalization
///
/// Turns one raw bulletin cell (e.g. `"12.3*"`, `"---"`, `"45#"`) into a
/// typed value plus the data-quality flags the bulletin encodes inline.
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Marker appended to values that were estimated rather than measured
pub const ESTIMATED_MARKER: char = '*';

/// Marker appended to values read from an automatic instrument
pub const AUTO_SENSOR_MARKER: char = '#';

/// Token used by the bulletins for missing data
pub const MISSING_MARKER: &str = "---";

/// One normalized measurement cell
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, ToSchema)]
pub struct NormalizedMeasurement {
    /// `None` when the cell is missing (`---`, empty) or not numeric
    pub value: Option<f64>,
    pub estimated: bool,
    pub auto_sensor: bool,
}

impl NormalizedMeasurement {
    /// Normalize a raw bulletin token.
    ///
    /// Markers may appear anywhere in the token, in either order. They are
    /// stripped before the numeric parse, so a flag can be set even when no
    /// value survives (`"*#"` is estimated, auto-sensor and missing).
    pub fn from_token(token: &str) -> Self {
        let trimmed = token.trim();
        let estimated = trimmed.contains(ESTIMATED_MARKER);
        let auto_sensor = trimmed.contains(AUTO_SENSOR_MARKER);

        let stripped: String = trimmed
            .chars()
            .filter(|c| *c != ESTIMATED_MARKER && *c != AUTO_SENSOR_MARKER)
            .collect();
        let stripped = stripped.trim();

        let value = if stripped.is_empty() || stripped == MISSING_MARKER {
            None
        } else {
            // "nan"/"inf" parse as f64 but are never real bulletin values
            stripped.parse::<f64>().ok().filter(|v| v.is_finite())
        };

        Self {
            value,
            estimated,
            auto_sensor,
        }
    }

    pub fn is_missing(&self) -> bool {
        self.value.is_none()
    }
}

/// Shorthand for [`NormalizedMeasurement::from_token`]
pub fn normalize(token: &str) -> NormalizedMeasurement {
    NormalizedMeasurement::from_token(token)
}
