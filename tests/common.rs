#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use climate_trends_service::cache::CorpusCache;
use climate_trends_service::corpus::CorpusAssembler;
use climate_trends_service::export::ExportSettings;
use climate_trends_service::fetch_error::FetchError;
use climate_trends_service::fetcher::BulletinSource;
use climate_trends_service::services::{ClimateService, RefreshService};
use climate_trends_service::stations::Station;

/// Two years of a small station with one estimated and one missing cell
pub const OXFORD: &str = "Oxford
Location: 450900E 207200N, Lat 51.761 Lon -1.262, 63 metres amsl
   yyyy  mm   tmax    tmin      af    rain     sun
              degC    degC    days      mm   hours
   2019   1    8.0     2.0       5    50.0    60.0
   2019   7   24.0    14.0       0    30.0*  200.0
   2020   1   10.0     4.0       2    80.0     ---
   2020   7   22.0    12.0       0    45.0   180.0#
";

pub const WICK: &str = "Wick Airport
Location: 336500E 952300N, Lat 58.454 Lon -3.088, 36 metres amsl
   yyyy  mm   tmax    tmin      af    rain     sun
   2020   1    7.0     2.0       8    90.0    30.0
   2020   7   15.0     9.0       0    60.0   150.0
";

/// Bulletin text without a header line
pub const NO_HEADER: &str = "Lerwick\nThis station bulletin is temporarily unavailable.\n";

pub fn fixture(name: &str) -> String {
    let path = format!("{}/tests/fixtures/{name}", env!("CARGO_MANIFEST_DIR"));
    std::fs::read_to_string(path).expect("Failed to read fixture")
}

pub fn station(id: &str) -> Station {
    Station::new(id, format!("http://bulletins.test/{id}data.txt"))
}

pub fn stations(ids: &[&str]) -> Vec<Station> {
    ids.iter().map(|id| station(id)).collect()
}

/// In-memory bulletin source; stations not in the map are unavailable
#[derive(Default)]
pub struct StaticSource {
    bulletins: HashMap<String, String>,
    delays: HashMap<String, Duration>,
    calls: AtomicUsize,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, station: &str, text: &str) -> Self {
        self.bulletins.insert(station.to_string(), text.to_string());
        self
    }

    /// Delay the response for `station` by `delay`
    pub fn slow(mut self, station: &str, delay: Duration) -> Self {
        self.delays.insert(station.to_string(), delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BulletinSource for StaticSource {
    async fn fetch(&self, station: &Station) -> Result<String, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delays.get(&station.id) {
            tokio::time::sleep(*delay).await;
        }
        self.bulletins
            .get(&station.id)
            .cloned()
            .ok_or_else(|| FetchError::Unavailable(station.id.clone()))
    }
}

pub fn oxford_and_wick() -> StaticSource {
    StaticSource::new().with("oxford", OXFORD).with("wick", WICK)
}

/// Climate service over `source` with exports disabled
pub fn test_service(source: Arc<StaticSource>, ids: &[&str]) -> ClimateService {
    let assembler = CorpusAssembler::new(source).with_concurrency(4);
    let refresher = RefreshService::new(assembler, stations(ids), ExportSettings::disabled());
    ClimateService::new(CorpusCache::new(Duration::from_secs(60)), refresher)
}
