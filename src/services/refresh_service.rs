use chrono::Utc;
use tracing::{info, instrument, warn};

use crate::cache::ClimateSnapshot;
use crate::corpus::CorpusAssembler;
use crate::export::{write_corpus_csv, write_locations_csv, ExportSettings};
use crate::stations::Station;

/// Builds a fresh snapshot: assemble every configured station, then write the
/// export files. Export is best-effort and never fails a refresh.
#[derive(Clone)]
pub struct RefreshService {
    assembler: CorpusAssembler,
    stations: Vec<Station>,
    export: ExportSettings,
}

impl RefreshService {
    pub fn new(assembler: CorpusAssembler, stations: Vec<Station>, export: ExportSettings) -> Self {
        Self {
            assembler,
            stations,
            export,
        }
    }

    #[instrument(skip(self), fields(stations = self.stations.len()))]
    pub async fn build_snapshot(&self) -> ClimateSnapshot {
        let assembly = self.assembler.assemble(&self.stations).await;

        let snapshot = ClimateSnapshot {
            corpus: assembly.corpus,
            locations: assembly.locations,
            report: assembly.report,
            refreshed_at: Utc::now(),
        };

        self.export_snapshot(&snapshot).await;

        info!(
            "Snapshot ready: {} records from {} stations",
            snapshot.corpus.len(),
            snapshot.report.stations_parsed
        );
        snapshot
    }

    async fn export_snapshot(&self, snapshot: &ClimateSnapshot) {
        if let Some(path) = self.export.snapshot_path.clone() {
            let records = snapshot.corpus.records().to_vec();
            let result =
                tokio::task::spawn_blocking(move || write_corpus_csv(&records, &path)).await;
            match result {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => warn!("Corpus snapshot export failed: {}", e),
                Err(e) => warn!("Corpus snapshot export task failed: {}", e),
            }
        }

        if let Some(path) = self.export.coordinates_path.clone() {
            let locations = snapshot.locations.clone();
            let result =
                tokio::task::spawn_blocking(move || write_locations_csv(&locations, &path)).await;
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("Station coordinate export failed: {}", e),
                Err(e) => warn!("Station coordinate export task failed: {}", e),
            }
        }
    }
}
