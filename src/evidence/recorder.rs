//! Evidence Recorder
//!
//! Persists a failing `RunRecord`: one CSV row per violation, one log block
//! per cycle, then the report. Sink appends are the primary guarantee; a
//! report failure is reported in the summary and never undoes them.

use tracing::{error, info, warn};

use super::report::render_report;
use super::store::{table_row, EvidenceStore, SinkWriteError};
use crate::order_check::{Outcome, ReportStatus, RunRecord, RunSummary};

pub struct EvidenceRecorder<S: EvidenceStore> {
    store: S,
}

impl<S: EvidenceStore> EvidenceRecorder<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Append the record's violations to both sinks and regenerate the report.
    ///
    /// Both sinks are attempted even if the first fails; the first failure is
    /// returned. Passing records are not persisted.
    pub fn record(&mut self, record: &RunRecord) -> Result<RunSummary, SinkWriteError> {
        if record.outcome == Outcome::Pass || record.violations.is_empty() {
            return Ok(RunSummary::passed(record));
        }

        let table = self.store.append_table(&table_rows(record));
        let log = self.store.append_log(&log_block(record));

        for result in [&table, &log] {
            if let Err(e) = result {
                error!("EVIDENCE NOT PERSISTED for run {}: {}", record.label, e);
            }
        }
        table?;
        log?;

        let locations = self.store.locations();
        info!(
            "Errors logged in {} and {} ({} rows)",
            locations.log,
            locations.table,
            record.violations.len()
        );

        let report = match self.store.replace_report(&render_report(record, &locations)) {
            Ok(()) => {
                info!("Report saved as {}", locations.report);
                ReportStatus::Written {
                    location: locations.report,
                }
            }
            Err(e) => {
                warn!("Report generation failed (sinks already written): {}", e);
                ReportStatus::Failed {
                    error: e.to_string(),
                }
            }
        };

        Ok(RunSummary {
            label: record.label.clone(),
            outcome: Outcome::Fail,
            entries_checked: record.observed.len(),
            unparseable_entries: record.unparseable_count(),
            violations_recorded: record.violations.len(),
            evidence: record.evidence.clone(),
            report,
        })
    }
}

fn table_rows(record: &RunRecord) -> String {
    record
        .violations
        .iter()
        .map(|v| table_row(v) + "\n")
        .collect()
}

/// `Sorting Errors (<label>):` followed by one line per violation.
fn log_block(record: &RunRecord) -> String {
    let mut block = format!("Sorting Errors ({}):\n", record.label);
    for v in &record.violations {
        block.push_str(&v.describe());
        block.push('\n');
    }
    block
}
