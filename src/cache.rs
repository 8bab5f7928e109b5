use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{debug, info};

use crate::coordinates::StationLocation;
use crate::corpus::{AssemblyReport, Corpus};

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Snapshot computation did not complete: {0}")]
    Compute(#[from] tokio::task::JoinError),
}

/// Records and locations from one refresh
#[derive(Debug, Clone, Serialize)]
pub struct ClimateSnapshot {
    pub corpus: Corpus,
    pub locations: Vec<StationLocation>,
    pub report: AssemblyReport,
    pub refreshed_at: DateTime<Utc>,
}

struct CacheEntry {
    snapshot: Arc<ClimateSnapshot>,
    computed_at: Instant,
}

/// TTL cache for the assembled snapshot
///
/// The cache only stores; the caller supplies the computation. Callers that
/// find the entry stale wait on a single recomputation, which runs in its
/// own task and is stored even if the caller that started it stops waiting.
/// `peek` returns the current entry immediately, without waiting on it.
#[derive(Clone)]
pub struct CorpusCache {
    ttl: Duration,
    entry: Arc<RwLock<Option<CacheEntry>>>,
    compute_gate: Arc<Mutex<()>>,
}

impl CorpusCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entry: Arc::new(RwLock::new(None)),
            compute_gate: Arc::new(Mutex::new(())),
        }
    }

    /// Current snapshot regardless of age, without computing
    pub async fn peek(&self) -> Option<Arc<ClimateSnapshot>> {
        self.entry
            .read()
            .await
            .as_ref()
            .map(|entry| entry.snapshot.clone())
    }

    /// Fresh snapshot, computing it with `compute` when missing or expired
    pub async fn get_or_compute<F, Fut>(&self, compute: F) -> Result<Arc<ClimateSnapshot>, CacheError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ClimateSnapshot> + Send + 'static,
    {
        if let Some(snapshot) = self.fresh().await {
            return Ok(snapshot);
        }

        let gate = self.compute_gate.clone().lock_owned().await;

        // another caller may have refreshed while we waited
        if let Some(snapshot) = self.fresh().await {
            debug!("Snapshot refreshed by a concurrent caller");
            return Ok(snapshot);
        }

        info!("Cached snapshot missing or expired, recomputing");
        self.spawn_compute(gate, compute()).await
    }

    /// Recompute unconditionally and replace the cached snapshot
    pub async fn refresh<F, Fut>(&self, compute: F) -> Result<Arc<ClimateSnapshot>, CacheError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ClimateSnapshot> + Send + 'static,
    {
        let gate = self.compute_gate.clone().lock_owned().await;
        self.spawn_compute(gate, compute()).await
    }

    /// Drop the cached snapshot; the next access recomputes
    pub async fn invalidate(&self) {
        *self.entry.write().await = None;
        debug!("Snapshot cache invalidated");
    }

    /// Run `computation` on its own task, holding `gate` until the result is stored
    async fn spawn_compute<Fut>(
        &self,
        gate: OwnedMutexGuard<()>,
        computation: Fut,
    ) -> Result<Arc<ClimateSnapshot>, CacheError>
    where
        Fut: Future<Output = ClimateSnapshot> + Send + 'static,
    {
        let cache = self.clone();
        let task = tokio::spawn(async move {
            let snapshot = cache.store(computation.await).await;
            drop(gate);
            snapshot
        });
        Ok(task.await?)
    }

    async fn fresh(&self) -> Option<Arc<ClimateSnapshot>> {
        let guard = self.entry.read().await;
        guard
            .as_ref()
            .filter(|entry| entry.computed_at.elapsed() < self.ttl)
            .map(|entry| entry.snapshot.clone())
    }

    async fn store(&self, snapshot: ClimateSnapshot) -> Arc<ClimateSnapshot> {
        let snapshot = Arc::new(snapshot);
        *self.entry.write().await = Some(CacheEntry {
            snapshot: snapshot.clone(),
            computed_at: Instant::now(),
        });
        snapshot
    }
}
