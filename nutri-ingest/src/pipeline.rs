//! Two-phase ingestion pipeline
//!
//! Loads a dataset into the record store in two passes over the same source:
//!
//! 1. **Basic**: identity fields only, committed as one delete-then-insert
//!    transaction. Publishes [`ReadinessState::BasicReady`].
//! 2. **Full**: every field, committed as one upsert transaction keyed on
//!    `user_id`. Publishes [`ReadinessState::FullReady`].
//!
//! A missing source or a missing required header aborts the run before any
//! row is parsed. Any other phase-1 failure is recorded and phase 2 still
//! runs. Bad rows are counted and skipped, never fatal.
//!
//! Runs on one pipeline are serialized: a run that starts while another is in
//! flight waits for it to finish.

use crate::error::IngestError;
use crate::parser::{parse_row, HeaderIndex, ParseMode, RowOutcome, SkipReason};
use crate::source::DatasetSource;
use chrono::{DateTime, Utc};
use csv::ReaderBuilder;
use nutri_common::db::init::Store;
use nutri_common::db::models::NutritionRecord;
use nutri_common::{ReadinessPublisher, ReadinessState};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

impl ParseMode {
    /// Readiness published when this phase commits
    pub fn readiness(self) -> ReadinessState {
        match self {
            ParseMode::Basic => ReadinessState::BasicReady,
            ParseMode::Full => ReadinessState::FullReady,
        }
    }
}

/// Outcome of one phase
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseReport {
    pub mode: ParseMode,
    /// Data lines read (header excluded)
    pub rows_read: usize,
    pub rows_parsed: usize,
    pub rows_failed: usize,
    /// True once the phase's transaction committed
    pub committed: bool,
    pub error: Option<String>,
}

impl PhaseReport {
    fn new(mode: ParseMode) -> Self {
        Self {
            mode,
            rows_read: 0,
            rows_parsed: 0,
            rows_failed: 0,
            committed: false,
            error: None,
        }
    }

    fn failed(mode: ParseMode, err: &IngestError) -> Self {
        Self {
            error: Some(err.to_string()),
            ..Self::new(mode)
        }
    }
}

/// Outcome of a complete two-phase run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub basic: PhaseReport,
    pub full: PhaseReport,
    /// Readiness at the end of the run
    pub readiness: ReadinessState,
}

/// Parsed rows of one pass plus the counters
struct ParsedBatch {
    records: Vec<NutritionRecord>,
    report: PhaseReport,
}

/// Read and parse the whole source in `mode`
///
/// Blocking: runs on a `spawn_blocking` worker.
fn read_batch(source: &dyn DatasetSource, mode: ParseMode) -> Result<ParsedBatch, IngestError> {
    let reader = source.open().map_err(|reason| IngestError::SourceUnavailable {
        origin: source.describe(),
        reason,
    })?;

    let mut csv = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let header = csv
        .headers()
        .map_err(|e| IngestError::SourceRead(e.to_string()))?
        .clone();
    let index = HeaderIndex::from_header(&header);
    if let Some(missing) = index.missing_required() {
        return Err(IngestError::MissingRequiredHeader(missing));
    }

    let mut records = Vec::new();
    let mut report = PhaseReport::new(mode);

    for (offset, result) in csv.records().enumerate() {
        // Header is line 1
        let line = offset + 2;
        report.rows_read += 1;

        let outcome = match result {
            Ok(row) => parse_row(&row, &index, mode),
            Err(e) if e.is_io_error() => return Err(IngestError::SourceRead(e.to_string())),
            Err(e) => RowOutcome::Skipped(SkipReason::Malformed(e.to_string())),
        };

        match outcome {
            RowOutcome::Parsed(record) => {
                report.rows_parsed += 1;
                records.push(record);
            }
            RowOutcome::Skipped(reason) => {
                report.rows_failed += 1;
                debug!(line, phase = ?mode, %reason, "Skipped row");
            }
        }
    }

    Ok(ParsedBatch { records, report })
}

/// Two-phase loader bound to one store
pub struct IngestionPipeline {
    store: Arc<Store>,
    readiness: ReadinessPublisher,
    run_lock: Mutex<()>,
}

impl IngestionPipeline {
    pub fn new(store: Arc<Store>, readiness: ReadinessPublisher) -> Self {
        Self {
            store,
            readiness,
            run_lock: Mutex::new(()),
        }
    }

    pub fn readiness(&self) -> &ReadinessPublisher {
        &self.readiness
    }

    /// Run both phases
    ///
    /// Returns `Err` only for failures fatal to the whole run. Phase-level
    /// failures are recorded in the report's `error` fields.
    pub async fn run(&self, source: Arc<dyn DatasetSource>) -> Result<IngestReport, IngestError> {
        let _running = self.run_lock.lock().await;

        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!(%run_id, source = %source.describe(), "Starting ingestion run");

        self.readiness.reset();

        let basic = match self.execute_phase(source.clone(), ParseMode::Basic).await {
            Ok(report) => report,
            Err(e) if e.is_fatal() => {
                error!(%run_id, error = %e, "Ingestion run aborted");
                return Err(e);
            }
            Err(e) => {
                warn!(%run_id, error = %e, "Basic phase failed; continuing with full phase");
                PhaseReport::failed(ParseMode::Basic, &e)
            }
        };

        let full = match self.execute_phase(source, ParseMode::Full).await {
            Ok(report) => report,
            Err(e) => {
                error!(%run_id, error = %e, "Full phase failed");
                PhaseReport::failed(ParseMode::Full, &e)
            }
        };

        let report = IngestReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            basic,
            full,
            readiness: self.readiness.current(),
        };

        info!(
            %run_id,
            readiness = ?report.readiness,
            basic_rows = report.basic.rows_parsed,
            full_rows = report.full.rows_parsed,
            rows_failed = report.full.rows_failed,
            "Ingestion run finished"
        );

        Ok(report)
    }

    /// Run a single phase without resetting readiness
    pub async fn run_phase(
        &self,
        source: Arc<dyn DatasetSource>,
        mode: ParseMode,
    ) -> Result<PhaseReport, IngestError> {
        let _running = self.run_lock.lock().await;
        self.execute_phase(source, mode).await
    }

    /// Run both phases on a background task
    pub fn spawn(
        self: Arc<Self>,
        source: Arc<dyn DatasetSource>,
    ) -> JoinHandle<Result<IngestReport, IngestError>> {
        tokio::spawn(async move { self.run(source).await })
    }

    /// Parse, commit and publish one phase
    ///
    /// A transaction failure is recorded in the returned report; read-level
    /// failures are returned as `Err`.
    async fn execute_phase(
        &self,
        source: Arc<dyn DatasetSource>,
        mode: ParseMode,
    ) -> Result<PhaseReport, IngestError> {
        let started = std::time::Instant::now();

        let ParsedBatch {
            records,
            mut report,
        } = tokio::task::spawn_blocking(move || read_batch(source.as_ref(), mode))
            .await
            .map_err(|e| IngestError::Worker(e.to_string()))??;

        if records.is_empty() {
            warn!(
                phase = ?mode,
                rows_read = report.rows_read,
                rows_failed = report.rows_failed,
                "No valid rows; nothing committed"
            );
            return Ok(report);
        }

        let store = self.store.records();
        let written = match mode {
            ParseMode::Basic => store.replace_all(&records).await,
            ParseMode::Full => store.upsert_all(&records).await,
        };

        match written {
            Ok(_) => {
                report.committed = true;
                self.readiness.advance(mode.readiness());
                info!(
                    phase = ?mode,
                    rows_read = report.rows_read,
                    rows_parsed = report.rows_parsed,
                    rows_failed = report.rows_failed,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Phase committed"
                );
            }
            Err(e) => {
                let e = IngestError::PhaseTransaction(e);
                error!(phase = ?mode, error = %e, "Phase transaction rolled back");
                report.error = Some(e.to_string());
            }
        }

        Ok(report)
    }
}
