use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::{IntoParams, ToSchema};

use crate::bulletin::StationRecord;
use crate::cache::{CacheError, ClimateSnapshot, CorpusCache};
use crate::coordinates::StationLocation;
use crate::export::{records_to_csv_bytes, ExportError};
use crate::services::refresh_service::RefreshService;
use crate::utils;

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Invalid station list: {0}")]
    InvalidStation(&'static str),

    #[error("Invalid year range: start {start} is after end {end}")]
    InvertedYearRange { start: i32, end: i32 },

    #[error("Station not found in corpus: {0}")]
    UnknownStation(String),

    #[error("Failed to render CSV: {0}")]
    Export(#[from] ExportError),

    #[error("Climate snapshot unavailable: {0}")]
    Unavailable(#[from] CacheError),
}

// Query string shared by the record endpoints (used by API)
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RecordQuery {
    /// Comma-separated station IDs; empty or absent means all stations
    pub stations: Option<String>,
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TrendQuery {
    pub stations: Option<String>,
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
    #[serde(default)]
    pub metric: Metric,
}

impl TrendQuery {
    pub fn record_query(&self) -> RecordQuery {
        RecordQuery {
            stations: self.stations.clone(),
            start_year: self.start_year,
            end_year: self.end_year,
        }
    }
}

/// Station and year-range selection applied before every aggregation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordFilter {
    pub stations: Vec<String>,
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
}

impl RecordFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn from_query(query: &RecordQuery) -> Result<Self, QueryError> {
        let stations = match query.stations.as_deref() {
            Some(list) => utils::parse_station_list(list).map_err(QueryError::InvalidStation)?,
            None => Vec::new(),
        };

        if let (Some(start), Some(end)) = (query.start_year, query.end_year) {
            if start > end {
                return Err(QueryError::InvertedYearRange { start, end });
            }
        }

        Ok(Self {
            stations,
            start_year: query.start_year,
            end_year: query.end_year,
        })
    }

    pub fn matches(&self, record: &StationRecord) -> bool {
        (self.stations.is_empty() || self.stations.iter().any(|s| *s == record.station))
            && self.start_year.is_none_or(|start| record.year >= start)
            && self.end_year.is_none_or(|end| record.year <= end)
    }

    pub fn apply<'a>(&'a self, records: &'a [StationRecord]) -> impl Iterator<Item = &'a StationRecord> + 'a {
        records.iter().filter(move |r| self.matches(r))
    }
}

/// Value plotted by the trend view
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    #[default]
    AverageTemperature,
    Rainfall,
    Sunshine,
}

impl Metric {
    pub fn value(self, record: &StationRecord) -> Option<f64> {
        match self {
            Metric::AverageTemperature => record.avg_temp(),
            Metric::Rainfall => record.rainfall.value,
            Metric::Sunshine => record.sunshine_hours.value,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Metric::AverageTemperature => "Avg Temp (°C)",
            Metric::Rainfall => "Rainfall (mm)",
            Metric::Sunshine => "Sunshine (hrs)",
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FilterOptions {
    pub stations: Vec<String>,
    pub min_year: Option<i32>,
    pub max_year: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TrendPoint {
    pub station: String,
    pub year: i32,
    /// Mean over the months of the year that have a value
    pub value: f64,
    pub months: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TrendResponse {
    pub metric: Metric,
    pub label: String,
    pub points: Vec<TrendPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct HeatmapRow {
    pub year: i32,
    /// Mean temperature for January..December, `null` where no data
    pub months: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HeatmapResponse {
    pub station: String,
    pub rows: Vec<HeatmapRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct StationMapEntry {
    pub station: String,
    pub mean_avg_temp: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Default)]
struct Mean {
    sum: f64,
    count: usize,
}

impl Mean {
    fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn value(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

/// Dashboard-facing view over the cached snapshot
#[derive(Clone)]
pub struct ClimateService {
    cache: CorpusCache,
    refresher: RefreshService,
}

impl ClimateService {
    pub fn new(cache: CorpusCache, refresher: RefreshService) -> Self {
        Self { cache, refresher }
    }

    /// Current snapshot, assembling it first if the cache is cold or expired
    pub async fn snapshot(&self) -> Result<Arc<ClimateSnapshot>, QueryError> {
        let refresher = self.refresher.clone();
        let snapshot = self
            .cache
            .get_or_compute(move || async move { refresher.build_snapshot().await })
            .await?;
        Ok(snapshot)
    }

    /// Reassemble now, regardless of cache age
    pub async fn refresh(&self) -> Result<Arc<ClimateSnapshot>, QueryError> {
        let refresher = self.refresher.clone();
        let snapshot = self
            .cache
            .refresh(move || async move { refresher.build_snapshot().await })
            .await?;
        Ok(snapshot)
    }

    /// Cached snapshot without triggering an assembly
    pub async fn peek(&self) -> Option<Arc<ClimateSnapshot>> {
        self.cache.peek().await
    }

    pub async fn locations(&self) -> Result<Vec<StationLocation>, QueryError> {
        Ok(self.snapshot().await?.locations.clone())
    }

    pub async fn filter_options(&self) -> Result<FilterOptions, QueryError> {
        let snapshot = self.snapshot().await?;
        Ok(filter_options(snapshot.as_ref()))
    }

    pub async fn records(&self, filter: &RecordFilter) -> Result<Vec<StationRecord>, QueryError> {
        let snapshot = self.snapshot().await?;
        Ok(filter.apply(snapshot.corpus.records()).cloned().collect())
    }

    pub async fn records_csv(&self, filter: &RecordFilter) -> Result<Vec<u8>, QueryError> {
        let snapshot = self.snapshot().await?;
        Ok(records_to_csv_bytes(filter.apply(snapshot.corpus.records()))?)
    }

    pub async fn annual_trend(
        &self,
        filter: &RecordFilter,
        metric: Metric,
    ) -> Result<TrendResponse, QueryError> {
        let snapshot = self.snapshot().await?;
        Ok(annual_trend(filter.apply(snapshot.corpus.records()), metric))
    }

    pub async fn monthly_heatmap(
        &self,
        filter: &RecordFilter,
        station: &str,
    ) -> Result<HeatmapResponse, QueryError> {
        let snapshot = self.snapshot().await?;
        if !snapshot.corpus.stations().contains(station) {
            return Err(QueryError::UnknownStation(station.to_string()));
        }
        Ok(monthly_heatmap(filter.apply(snapshot.corpus.records()), station))
    }

    pub async fn station_map(&self, filter: &RecordFilter) -> Result<Vec<StationMapEntry>, QueryError> {
        let snapshot = self.snapshot().await?;
        Ok(station_map(filter.apply(snapshot.corpus.records()), &snapshot.locations))
    }
}

/// Station list and year bounds for the filter widgets
pub fn filter_options(snapshot: &ClimateSnapshot) -> FilterOptions {
    let bounds = snapshot.corpus.year_bounds();
    FilterOptions {
        stations: snapshot
            .corpus
            .stations()
            .into_iter()
            .map(String::from)
            .collect(),
        min_year: bounds.map(|(min, _)| min),
        max_year: bounds.map(|(_, max)| max),
    }
}

/// Per (station, year) mean of `metric`, ordered by station then year.
/// Years where the metric is missing in every month are omitted.
pub fn annual_trend<'a, I>(records: I, metric: Metric) -> TrendResponse
where
    I: IntoIterator<Item = &'a StationRecord>,
{
    let mut groups: BTreeMap<(&str, i32), Mean> = BTreeMap::new();
    for record in records {
        if let Some(value) = metric.value(record) {
            groups
                .entry((record.station.as_str(), record.year))
                .or_default()
                .add(value);
        }
    }

    let points = groups
        .into_iter()
        .filter_map(|((station, year), mean)| {
            mean.value().map(|value| TrendPoint {
                station: station.to_string(),
                year,
                value,
                months: mean.count,
            })
        })
        .collect();

    TrendResponse {
        metric,
        label: metric.label().to_string(),
        points,
    }
}

/// Year × month grid of mean temperature for one station.
/// Years without any temperature are omitted.
pub fn monthly_heatmap<'a, I>(records: I, station: &str) -> HeatmapResponse
where
    I: IntoIterator<Item = &'a StationRecord>,
{
    let mut cells: BTreeMap<i32, [Mean; 12]> = BTreeMap::new();
    for record in records.into_iter().filter(|r| r.station == station) {
        if let Some(value) = record.avg_temp() {
            let row = cells.entry(record.year).or_default();
            row[(record.month - 1) as usize].add(value);
        }
    }

    let rows = cells
        .into_iter()
        .map(|(year, months)| HeatmapRow {
            year,
            months: months.iter().map(Mean::value).collect(),
        })
        .collect();

    HeatmapResponse {
        station: station.to_string(),
        rows,
    }
}

/// Mean temperature per station joined with the location table
pub fn station_map<'a, I>(records: I, locations: &[StationLocation]) -> Vec<StationMapEntry>
where
    I: IntoIterator<Item = &'a StationRecord>,
{
    let mut means: BTreeMap<&str, Mean> = BTreeMap::new();
    for record in records {
        let mean = means.entry(record.station.as_str()).or_default();
        if let Some(value) = record.avg_temp() {
            mean.add(value);
        }
    }

    let by_station: HashMap<&str, &StationLocation> = locations
        .iter()
        .map(|l| (l.station.as_str(), l))
        .collect();

    means
        .into_iter()
        .map(|(station, mean)| {
            let location = by_station.get(station);
            StationMapEntry {
                station: station.to_string(),
                mean_avg_temp: mean.value(),
                latitude: location.and_then(|l| l.latitude),
                longitude: location.and_then(|l| l.longitude),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bulletin::parse_bulletin;

    const OXFORD: &str = "Oxford
yyyy mm tmax tmin af rain sun
2019 1  8.0  2.0  5  50.0  60.0
2019 2 10.0  4.0  2  40.0  70.0
2020 1  9.0  3.0  4  ---   ---
2020 2  ---  ---  ---  30.0  80.0#
";

    const WICK: &str = "Wick Airport
yyyy mm tmax tmin af rain sun
2020 1  6.0  0.0  9  90.0  20.0
";

    fn records() -> Vec<StationRecord> {
        let mut records = parse_bulletin(OXFORD, "oxford").unwrap();
        records.extend(parse_bulletin(WICK, "wick").unwrap());
        records
    }

    #[test]
    fn test_filter_from_query() {
        let query = RecordQuery {
            stations: Some("Oxford,wick".to_string()),
            start_year: Some(2019),
            end_year: Some(2020),
        };
        let filter = RecordFilter::from_query(&query).unwrap();
        assert_eq!(filter.stations, vec!["oxford", "wick"]);
    }

    #[test]
    fn test_filter_rejects_inverted_range() {
        let query = RecordQuery {
            stations: None,
            start_year: Some(2021),
            end_year: Some(2020),
        };
        assert!(matches!(
            RecordFilter::from_query(&query),
            Err(QueryError::InvertedYearRange { start: 2021, end: 2020 })
        ));
    }

    #[test]
    fn test_filter_rejects_bad_station() {
        let query = RecordQuery {
            stations: Some("ox ford".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            RecordFilter::from_query(&query),
            Err(QueryError::InvalidStation(_))
        ));
    }

    #[test]
    fn test_filter_matches_station_and_years() {
        let records = records();
        let filter = RecordFilter {
            stations: vec!["oxford".to_string()],
            start_year: Some(2020),
            end_year: None,
        };
        let selected: Vec<_> = filter.apply(&records).collect();
        assert_eq!(selected.len(), 2);
        assert!(selected.iter().all(|r| r.station == "oxford" && r.year == 2020));

        assert_eq!(RecordFilter::all().apply(&records).count(), records.len());
    }

    #[test]
    fn test_annual_trend_average_temperature() {
        let records = records();
        let trend = annual_trend(&records, Metric::AverageTemperature);

        assert_eq!(trend.label, "Avg Temp (°C)");
        assert_eq!(
            trend.points,
            vec![
                TrendPoint { station: "oxford".into(), year: 2019, value: 6.0, months: 2 },
                TrendPoint { station: "oxford".into(), year: 2020, value: 6.0, months: 1 },
                TrendPoint { station: "wick".into(), year: 2020, value: 3.0, months: 1 },
            ]
        );
    }

    #[test]
    fn test_annual_trend_rainfall_skips_missing_months() {
        let records = records();
        let trend = annual_trend(&records, Metric::Rainfall);
        let oxford_2020 = trend
            .points
            .iter()
            .find(|p| p.station == "oxford" && p.year == 2020)
            .unwrap();
        assert_eq!(oxford_2020.value, 30.0);
        assert_eq!(oxford_2020.months, 1);
    }

    #[test]
    fn test_monthly_heatmap() {
        let records = records();
        let heatmap = monthly_heatmap(&records, "oxford");

        assert_eq!(heatmap.rows.len(), 2);
        assert_eq!(heatmap.rows[0].year, 2019);
        assert_eq!(heatmap.rows[0].months.len(), 12);
        assert_eq!(heatmap.rows[0].months[0], Some(5.0));
        assert_eq!(heatmap.rows[0].months[1], Some(7.0));
        assert_eq!(heatmap.rows[0].months[2], None);
        // February 2020 has no temperature at all
        assert_eq!(heatmap.rows[1].months[1], None);
    }

    #[test]
    fn test_station_map_joins_locations() {
        let records = records();
        let locations = vec![StationLocation {
            station: "oxford".to_string(),
            latitude: Some(51.761),
            longitude: Some(-1.262),
        }];
        let map = station_map(&records, &locations);

        assert_eq!(map.len(), 2);
        assert_eq!(map[0].station, "oxford");
        assert_eq!(map[0].mean_avg_temp, Some(6.0));
        assert_eq!(map[0].latitude, Some(51.761));
        assert_eq!(map[1].station, "wick");
        assert_eq!(map[1].latitude, None);
    }

    #[test]
    fn test_metric_deserializes_snake_case() {
        let metric: Metric = serde_json::from_str("\"average_temperature\"").unwrap();
        assert_eq!(metric, Metric::AverageTemperature);
    }
}
