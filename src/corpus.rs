/// Corpus assembly
///
/// Fetches and parses every configured station, tolerating individual
/// failures, and concatenates the results into one `Corpus`. The location
/// table is built in the same pass from the same bulletin texts.
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;

use crate::bulletin::{parse_bulletin, BulletinError, StationRecord};
use crate::coordinates::StationLocation;
use crate::fetch_error::FetchError;
use crate::fetcher::BulletinSource;
use crate::stations::Station;

pub const DEFAULT_FETCH_CONCURRENCY: usize = 8;
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// All records of the stations that were fetched and parsed successfully
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Corpus {
    records: Vec<StationRecord>,
}

impl Corpus {
    pub fn new(records: Vec<StationRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[StationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct station IDs present in the corpus, sorted
    pub fn stations(&self) -> BTreeSet<&str> {
        self.records.iter().map(|r| r.station.as_str()).collect()
    }

    /// Earliest and latest year present, `None` for an empty corpus
    pub fn year_bounds(&self) -> Option<(i32, i32)> {
        let min = self.records.iter().map(|r| r.year).min()?;
        let max = self.records.iter().map(|r| r.year).max()?;
        Some((min, max))
    }
}

/// Why one station was left out of the corpus
#[derive(Error, Debug)]
pub enum StationError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Format(#[from] BulletinError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StationFailure {
    pub station: String,
    pub reason: String,
}

/// Per-station outcome summary of one assembly run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AssemblyReport {
    pub stations_requested: usize,
    pub stations_parsed: usize,
    pub records: usize,
    pub failures: Vec<StationFailure>,
}

impl AssemblyReport {
    pub fn stations_failed(&self) -> usize {
        self.failures.len()
    }
}

/// Result of one assembly run
#[derive(Debug, Clone, Default)]
pub struct Assembly {
    pub corpus: Corpus,
    /// One row per requested station, in request order
    pub locations: Vec<StationLocation>,
    pub report: AssemblyReport,
}

/// Outcome for a single station, reported while the assembly runs
#[derive(Debug)]
pub struct StationOutcome {
    pub station: String,
    pub location: StationLocation,
    pub result: Result<Vec<StationRecord>, StationError>,
}

/// Runs fetch + parse across stations on a bounded pool
#[derive(Clone)]
pub struct CorpusAssembler {
    source: Arc<dyn BulletinSource>,
    concurrency: usize,
    fetch_timeout: Duration,
}

impl CorpusAssembler {
    pub fn new(source: Arc<dyn BulletinSource>) -> Self {
        Self {
            source,
            concurrency: DEFAULT_FETCH_CONCURRENCY,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    /// Maximum number of stations fetched at once (at least 1)
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Upper bound on a single station fetch
    pub fn with_fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    /// Assemble the corpus for `stations`.
    ///
    /// Never fails: unavailable or unparseable stations are skipped and
    /// recorded in the report. Records keep station-iteration order.
    pub async fn assemble(&self, stations: &[Station]) -> Assembly {
        self.assemble_with(stations, |_| {}).await
    }

    /// Like [`assemble`](Self::assemble), calling `on_station` once per
    /// station in input order. A slow station holds back the callbacks of
    /// the stations after it, though their fetches keep running.
    #[instrument(skip(self, stations, on_station), fields(stations = stations.len(), concurrency = self.concurrency))]
    pub async fn assemble_with<F>(&self, stations: &[Station], mut on_station: F) -> Assembly
    where
        F: FnMut(&StationOutcome),
    {
        info!("Assembling corpus from {} stations", stations.len());

        let outcomes: Vec<StationOutcome> = stream::iter(stations.to_vec())
            .map(|station| {
                let assembler = self.clone();
                async move { assembler.process_station(&station).await }
            })
            .buffered(self.concurrency)
            .inspect(|outcome| on_station(outcome))
            .collect()
            .await;

        let mut records = Vec::new();
        let mut locations = Vec::with_capacity(outcomes.len());
        let mut report = AssemblyReport {
            stations_requested: stations.len(),
            ..Default::default()
        };

        for outcome in outcomes {
            locations.push(outcome.location);
            match outcome.result {
                Ok(station_records) => {
                    report.stations_parsed += 1;
                    records.extend(station_records);
                }
                Err(e) => report.failures.push(StationFailure {
                    station: outcome.station,
                    reason: e.to_string(),
                }),
            }
        }

        report.records = records.len();

        if report.stations_parsed == 0 && !stations.is_empty() {
            warn!("No station bulletins could be parsed, corpus is empty");
        }
        info!(
            "Assembled {} records from {}/{} stations ({} failed)",
            report.records,
            report.stations_parsed,
            report.stations_requested,
            report.stations_failed()
        );

        Assembly {
            corpus: Corpus::new(records),
            locations,
            report,
        }
    }

    #[instrument(skip(self, station), fields(station = %station.id))]
    async fn process_station(&self, station: &Station) -> StationOutcome {
        let text = match self.fetch_bounded(station).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Station unavailable, skipping: {}", e);
                return StationOutcome {
                    station: station.id.clone(),
                    location: StationLocation::unknown(&station.id),
                    result: Err(e.into()),
                };
            }
        };

        let location = StationLocation::from_bulletin(&station.id, &text);
        let result = parse_bulletin(&text, &station.id).map_err(StationError::from);

        match &result {
            Ok(records) => debug!("Parsed {} records", records.len()),
            Err(e) => warn!("Bulletin unreadable, skipping: {}", e),
        }

        StationOutcome {
            station: station.id.clone(),
            location,
            result,
        }
    }

    async fn fetch_bounded(&self, station: &Station) -> Result<String, FetchError> {
        tokio::time::timeout(self.fetch_timeout, self.source.fetch(station))
            .await
            .map_err(|_| FetchError::Timeout(self.fetch_timeout))?
    }
}
