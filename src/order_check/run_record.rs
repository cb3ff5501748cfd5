//! Run Records
//!
//! The immutable result of one verification cycle and the summary handed
//! back after persistence. A record is built once per cycle and never
//! mutated afterwards; nothing keeps a reference to a past cycle's record.

use std::fmt;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use super::timepoint::TimePoint;
use super::validator::{Validation, Violation};

/// Placeholder reference recorded when evidence capture failed.
pub const EVIDENCE_UNAVAILABLE: &str = "evidence-unavailable";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    Pass,
    Fail,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass => f.write_str("PASS"),
            Self::Fail => f.write_str("FAIL"),
        }
    }
}

/// Reference to the visual evidence of a failing cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EvidenceRef {
    Captured { path: String },
    Unavailable { reason: String },
}

impl EvidenceRef {
    pub fn captured(path: impl Into<String>) -> Self {
        Self::Captured { path: path.into() }
    }

    pub fn unavailable(reason: impl fmt::Display) -> Self {
        Self::Unavailable {
            reason: reason.to_string(),
        }
    }

    /// Path or placeholder identifier written into sinks and reports.
    pub fn as_reference(&self) -> &str {
        match self {
            Self::Captured { path } => path,
            Self::Unavailable { .. } => EVIDENCE_UNAVAILABLE,
        }
    }
}

/// `YYYY-MM-DD_HH-MM-SS+ZZZZ`, used for log headers and evidence file names.
/// The offset keeps labels unambiguous across DST changes.
pub fn run_label(at: &DateTime<Local>) -> String {
    at.format("%Y-%m-%d_%H-%M-%S%z").to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    pub started_at: DateTime<Local>,
    pub label: String,
    pub observed: Vec<TimePoint>,
    pub expected_order: Vec<TimePoint>,
    pub violations: Vec<Violation>,
    pub evidence: Option<EvidenceRef>,
    pub outcome: Outcome,
}

impl RunRecord {
    pub fn new(started_at: DateTime<Local>, observed: Vec<TimePoint>, validation: Validation) -> Self {
        let outcome = if validation.violations.is_empty() {
            Outcome::Pass
        } else {
            Outcome::Fail
        };
        Self {
            label: run_label(&started_at),
            started_at,
            observed,
            expected_order: validation.expected_order,
            violations: validation.violations,
            evidence: None,
            outcome,
        }
    }

    /// Attach the evidence reference; consumes the record so it stays immutable once handed on.
    pub fn with_evidence(self, evidence: EvidenceRef) -> Self {
        Self {
            evidence: Some(evidence),
            ..self
        }
    }

    pub fn unparseable_count(&self) -> usize {
        self.observed.iter().filter(|t| !t.is_parseable()).count()
    }
}

/// Outcome of report generation. A failed report never rolls back sink writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReportStatus {
    NotGenerated,
    Written { location: String },
    Failed { error: String },
}

/// What one cycle produced, returned to the scheduler / CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub label: String,
    pub outcome: Outcome,
    pub entries_checked: usize,
    pub unparseable_entries: usize,
    pub violations_recorded: usize,
    pub evidence: Option<EvidenceRef>,
    pub report: ReportStatus,
}

impl RunSummary {
    pub fn passed(record: &RunRecord) -> Self {
        Self {
            label: record.label.clone(),
            outcome: Outcome::Pass,
            entries_checked: record.observed.len(),
            unparseable_entries: record.unparseable_count(),
            violations_recorded: 0,
            evidence: None,
            report: ReportStatus::NotGenerated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order_check::validator::validate;
    use chrono::TimeZone;

    #[test]
    fn test_run_label_format() {
        let at = Local.with_ymd_and_hms(2025, 2, 3, 4, 5, 6).unwrap();
        let offset = at.format("%z").to_string();
        assert_eq!(run_label(&at), format!("2025-02-03_04-05-06{}", offset));
        assert!(offset.starts_with('+') || offset.starts_with('-'));
    }

    #[test]
    fn test_outcome_follows_violations() {
        let now = Local::now();
        let pass = RunRecord::new(now, vec![], validate(&[]));
        assert_eq!(pass.outcome, Outcome::Pass);

        let observed = vec![TimePoint::Unparseable, TimePoint::At(chrono::Utc::now())];
        let fail = RunRecord::new(now, observed.clone(), validate(&observed));
        assert_eq!(fail.outcome, Outcome::Fail);
        assert_eq!(fail.unparseable_count(), 1);
        assert_eq!(fail.violations.len(), 2);
    }

    #[test]
    fn test_placeholder_reference() {
        let e = EvidenceRef::unavailable("no page captured");
        assert_eq!(e.as_reference(), EVIDENCE_UNAVAILABLE);
        assert_eq!(EvidenceRef::captured("shots/a.html").as_reference(), "shots/a.html");
    }
}
