use std::time::Duration;
use tokio::time;
use tracing::{debug, error, info, instrument, warn};

use crate::services::ClimateService;

/// Periodically reassemble the corpus so API requests hit a warm cache.
/// The first tick fires immediately, warming the cache at start-up.
#[instrument(skip(climate_service), fields(period = ?period))]
pub async fn start_refresh_scheduler(climate_service: ClimateService, period: Duration) {
    let mut interval = time::interval(period);

    info!("Refresh scheduler started with {:?} interval", period);

    loop {
        interval.tick().await;
        debug!("Scheduler tick - reassembling corpus");

        let snapshot = match climate_service.refresh().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!("Scheduled refresh failed: {}", e);
                continue;
            }
        };
        let report = &snapshot.report;

        if report.stations_parsed == 0 {
            warn!(
                "Refresh produced an empty corpus ({} stations failed)",
                report.stations_failed()
            );
        } else {
            info!(
                "Refreshed corpus: {} records from {}/{} stations",
                report.records, report.stations_parsed, report.stations_requested
            );
        }

        for failure in &report.failures {
            debug!("Station {} skipped: {}", failure.station, failure.reason);
        }
    }
}
