//! Store provider
//!
//! Owns the lazily-opened [`Store`] and decides when the dataset has to be
//! (re)loaded. Exactly one store instance exists per provider, and opening
//! it triggers at most one ingestion run.
//!
//! Ingestion is needed when the store was just created or recreated, or when
//! the init marker is still present from an earlier request. The marker is
//! written before the run starts and removed once the run reaches full
//! readiness, so an interrupted load is repeated on the next start.

use crate::pipeline::{IngestReport, IngestionPipeline};
use crate::source::DatasetSource;
use nutri_common::db::init::{open_store, Store};
use nutri_common::db::marker::InitMarker;
use nutri_common::{ReadinessPublisher, ReadinessState, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

pub struct StoreProvider {
    db_path: PathBuf,
    marker: InitMarker,
    source: Arc<dyn DatasetSource>,
    readiness: ReadinessPublisher,
    slot: Mutex<Option<Arc<Store>>>,
    reinit_lock: Mutex<()>,
    /// Held by an ingestion task for its whole run, marker clear included
    ingest_gate: Arc<Mutex<()>>,
    ingestion: Mutex<Option<JoinHandle<()>>>,
    last_report: Arc<RwLock<Option<IngestReport>>>,
}

impl StoreProvider {
    pub fn new(
        db_path: impl Into<PathBuf>,
        source: Arc<dyn DatasetSource>,
        readiness: ReadinessPublisher,
    ) -> Self {
        let db_path = db_path.into();
        Self {
            marker: InitMarker::for_database(&db_path),
            db_path,
            source,
            readiness,
            slot: Mutex::new(None),
            reinit_lock: Mutex::new(()),
            ingest_gate: Arc::new(Mutex::new(())),
            ingestion: Mutex::new(None),
            last_report: Arc::new(RwLock::new(None)),
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn marker(&self) -> &InitMarker {
        &self.marker
    }

    pub fn readiness(&self) -> &ReadinessPublisher {
        &self.readiness
    }

    /// Report of the most recent completed run, if any
    pub async fn last_report(&self) -> Option<IngestReport> {
        self.last_report.read().await.clone()
    }

    /// The shared store, opening it (and starting ingestion) on first use
    pub async fn store(&self) -> Result<Arc<Store>> {
        let mut slot = self.slot.lock().await;
        if let Some(store) = slot.as_ref() {
            return Ok(store.clone());
        }

        let store = Arc::new(open_store(&self.db_path).await?);

        if store.needs_ingestion() || self.marker.is_set() {
            info!(
                open_kind = ?store.open_kind(),
                marker = self.marker.is_set(),
                "Store needs ingestion"
            );
            self.readiness.reset();
            self.marker.set()?;
            self.spawn_ingestion(store.clone()).await;
        } else {
            self.readiness.advance(ReadinessState::FullReady);
        }

        *slot = Some(store.clone());
        Ok(store)
    }

    async fn spawn_ingestion(&self, store: Arc<Store>) {
        let pipeline = IngestionPipeline::new(store, self.readiness.clone());
        let source = self.source.clone();
        let marker = self.marker.clone();
        let last_report = self.last_report.clone();

        // Taken before spawning so a reinitialize cannot slip in ahead of the run
        let gate = self.ingest_gate.clone().lock_owned().await;

        let handle = tokio::spawn(async move {
            let _gate = gate;

            match pipeline.run(source).await {
                Ok(report) => {
                    if report.readiness.full_ready() {
                        if let Err(e) = marker.clear() {
                            warn!(error = %e, "Failed to clear init marker");
                        }
                    } else {
                        warn!(
                            readiness = ?report.readiness,
                            "Ingestion ended short of full readiness; init marker kept"
                        );
                    }
                    *last_report.write().await = Some(report);
                }
                Err(e) => error!(error = %e, "Ingestion failed; init marker kept"),
            }
        });

        *self.ingestion.lock().await = Some(handle);
    }

    /// Wait for the most recently started ingestion run, if any
    pub async fn join_ingestion(&self) {
        let handle = self.ingestion.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!(error = %e, "Ingestion task panicked");
            }
        }
    }

    /// Discard the cached store and schedule a full reload
    ///
    /// Waits for an in-flight run to finish first. The slot is never held
    /// while waiting, so `store()` keeps returning the cached store until the
    /// reset lands. Concurrent calls collapse into one: a call made while
    /// another is in progress, or while a reset is already pending, returns
    /// `false` and changes nothing.
    pub async fn reinitialize(&self) -> Result<bool> {
        let Ok(_reinit) = self.reinit_lock.try_lock() else {
            info!("Reinitialize already in progress");
            return Ok(false);
        };

        loop {
            // Same order as store(): slot, then gate
            let mut slot = self.slot.lock().await;
            let Ok(_gate) = self.ingest_gate.try_lock() else {
                drop(slot);
                info!("Waiting for in-flight ingestion before reinitializing");
                drop(self.ingest_gate.lock().await);
                continue;
            };

            if slot.is_none() && self.marker.is_set() {
                info!("Reinitialize already pending");
                return Ok(false);
            }

            self.marker.set()?;
            *slot = None;
            self.readiness.reset();

            info!(db = %self.db_path.display(), "Store reinitialized; next access reloads the dataset");
            return Ok(true);
        }
    }
}
