//! Run Coordinator
//!
//! Drives one verification cycle through
//! `Idle -> Extracting -> Normalizing -> Validating -> (Idle | CapturingEvidence -> Recording -> Reporting -> Idle)`.
//!
//! Suspension happens only at collaborator boundaries (extraction, capture,
//! report viewer). Only extraction and sink write failures end a cycle
//! early; everything else degrades.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Local;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::evidence::{open_report, EvidenceCapture, EvidenceRecorder, EvidenceStore, SinkWriteError};
use crate::feed::{ExtractionError, FeedExtractor};
use crate::order_check::{normalize_all, validate, EvidenceRef, ReportStatus, RunRecord, RunSummary};
use crate::scheduler::CycleTask;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CycleState {
    Idle,
    Extracting,
    Normalizing,
    Validating,
    CapturingEvidence,
    Recording,
    Reporting,
}

/// Errors that end a cycle before it completes.
#[derive(Debug)]
pub enum CycleError {
    /// No observation exists; nothing is recorded
    Extraction(ExtractionError),
    /// A real violation could not be persisted
    SinkWrite(SinkWriteError),
}

impl fmt::Display for CycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Extraction(e) => write!(f, "extraction failed: {}", e),
            Self::SinkWrite(e) => write!(f, "evidence write failed: {}", e),
        }
    }
}

impl std::error::Error for CycleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Extraction(e) => Some(e),
            Self::SinkWrite(e) => Some(e),
        }
    }
}

impl From<ExtractionError> for CycleError {
    fn from(e: ExtractionError) -> Self {
        Self::Extraction(e)
    }
}

impl From<SinkWriteError> for CycleError {
    fn from(e: SinkWriteError) -> Self {
        Self::SinkWrite(e)
    }
}

pub struct RunCoordinator<S: EvidenceStore> {
    extractor: Arc<dyn FeedExtractor>,
    capture: Arc<dyn EvidenceCapture>,
    recorder: EvidenceRecorder<S>,
    window_size: usize,
    open_report: bool,
    state: CycleState,
    cycles_run: u64,
}

impl<S: EvidenceStore> RunCoordinator<S> {
    pub fn new(
        extractor: Arc<dyn FeedExtractor>,
        capture: Arc<dyn EvidenceCapture>,
        store: S,
        window_size: usize,
    ) -> Self {
        Self {
            extractor,
            capture,
            recorder: EvidenceRecorder::new(store),
            window_size,
            open_report: false,
            state: CycleState::Idle,
            cycles_run: 0,
        }
    }

    /// Launch the platform viewer on the report after each failing cycle.
    pub fn with_open_report(mut self, open: bool) -> Self {
        self.open_report = open;
        self
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    pub fn cycles_run(&self) -> u64 {
        self.cycles_run
    }

    pub fn store(&self) -> &S {
        self.recorder.store()
    }

    /// Run one verification cycle to completion. Always ends in `Idle`.
    pub async fn run_cycle(&mut self) -> Result<RunSummary, CycleError> {
        self.cycles_run += 1;
        let result = self.cycle().await;
        self.transition(CycleState::Idle);
        result
    }

    async fn cycle(&mut self) -> Result<RunSummary, CycleError> {
        let started_at = Local::now();

        self.transition(CycleState::Extracting);
        let mut raw = self.extractor.extract(self.window_size).await?;
        raw.truncate(self.window_size);

        self.transition(CycleState::Normalizing);
        let observed = normalize_all(&raw);

        self.transition(CycleState::Validating);
        let validation = validate(&observed);
        let record = RunRecord::new(started_at, observed, validation);

        let unparseable = record.unparseable_count();
        if unparseable > 0 {
            warn!("{} of {} timestamps could not be parsed", unparseable, raw.len());
        }

        if record.violations.is_empty() {
            info!(
                "Articles are correctly sorted by time ({} checked)",
                record.observed.len()
            );
            return Ok(RunSummary::passed(&record));
        }

        warn!(
            "Articles are NOT sorted correctly: {} of {} positions out of order",
            record.violations.len(),
            record.observed.len()
        );
        for v in &record.violations {
            warn!("{}", v.describe());
        }

        self.transition(CycleState::CapturingEvidence);
        let evidence = match self.capture.capture(&record.label).await {
            Ok(path) => {
                info!("Evidence saved: {}", path);
                EvidenceRef::captured(path)
            }
            Err(e) => {
                warn!("Evidence capture failed, recording without it: {:#}", e);
                EvidenceRef::unavailable(format!("{:#}", e))
            }
        };
        let record = record.with_evidence(evidence);

        self.transition(CycleState::Recording);
        let summary = self.recorder.record(&record)?;

        self.transition(CycleState::Reporting);
        if self.open_report {
            if let ReportStatus::Written { location } = &summary.report {
                if let Err(e) = open_report(location).await {
                    warn!("Could not open report: {:#}", e);
                }
            }
        }

        Ok(summary)
    }

    fn transition(&mut self, next: CycleState) {
        debug!("cycle state {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}

#[async_trait]
impl<S: EvidenceStore> CycleTask for RunCoordinator<S> {
    async fn run_once(&mut self) {
        info!("Running scheduled check (cycle {})", self.cycles_run + 1);
        match self.run_cycle().await {
            Ok(summary) => {
                debug!("Cycle {} finished: {:?}", summary.label, summary.outcome);
            }
            Err(CycleError::Extraction(e)) => {
                error!("Cycle aborted, no observation: {}", e);
            }
            Err(CycleError::SinkWrite(e)) => {
                error!(
                    "!!! VIOLATION EVIDENCE LOST: {} - fix storage before the next cycle !!!",
                    e
                );
            }
        }
    }
}
