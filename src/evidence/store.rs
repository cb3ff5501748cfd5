//! Durable Evidence Store
//!
//! Two append-only sinks (a CSV table and a human-readable log) plus one
//! report document that is overwritten on every failing cycle. Sinks are
//! shared across cycles; writes are serialized by the scheduler's
//! non-overlap guarantee, so no locking happens here.
//!
//! Every record is newline-terminated and each append is a single buffered
//! write. If a previous append was torn (file does not end in `\n`), the next
//! append starts on a fresh line so later rows still parse.

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::StorageConfig;
use crate::order_check::{TimePoint, Violation};

/// Header row of the tabular sink, written once when the file is created.
pub const TABLE_HEADER: &str = "Position,Actual Date,Expected Date";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sink {
    Table,
    Log,
    Report,
    EvidenceDir,
}

impl fmt::Display for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table => f.write_str("table sink"),
            Self::Log => f.write_str("log sink"),
            Self::Report => f.write_str("report"),
            Self::EvidenceDir => f.write_str("evidence directory"),
        }
    }
}

/// Failure to persist to one of the durable sinks.
#[derive(Debug)]
pub struct SinkWriteError {
    pub sink: Sink,
    pub location: String,
    pub source: io::Error,
}

impl SinkWriteError {
    pub fn new(sink: Sink, location: impl Into<String>, source: io::Error) -> Self {
        Self {
            sink,
            location: location.into(),
            source,
        }
    }
}

impl fmt::Display for SinkWriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to write {} at {}: {}", self.sink, self.location, self.source)
    }
}

impl std::error::Error for SinkWriteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Where the store keeps its artifacts (referenced from the report).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreLocations {
    pub table: String,
    pub log: String,
    pub report: String,
}

/// Append-only evidence persistence.
pub trait EvidenceStore: Send {
    fn locations(&self) -> StoreLocations;

    /// Append newline-terminated rows to the tabular sink.
    fn append_table(&mut self, rows: &str) -> Result<(), SinkWriteError>;

    /// Append a newline-terminated block to the log sink.
    fn append_log(&mut self, block: &str) -> Result<(), SinkWriteError>;

    /// Overwrite the single most-recent report document.
    fn replace_report(&mut self, document: &str) -> Result<(), SinkWriteError>;
}

/// `position,actual,expected`
pub fn table_row(v: &Violation) -> String {
    format!("{},{},{}", v.position, v.actual, v.expected)
}

/// Parse one row of the tabular sink. Returns `None` for the header and for
/// torn or foreign lines.
pub fn parse_table_row(line: &str) -> Option<Violation> {
    let mut fields = line.trim_end_matches(['\r', '\n']).splitn(3, ',');
    let position = fields.next()?.trim().parse::<usize>().ok()?;
    let actual = TimePoint::from_rendered(fields.next()?)?;
    let expected = TimePoint::from_rendered(fields.next()?)?;
    if position == 0 {
        return None;
    }
    Some(Violation {
        position,
        actual,
        expected,
    })
}

// =============================================================================
// FILE STORE
// =============================================================================

/// Filesystem-backed store.
#[derive(Debug, Clone)]
pub struct FileStore {
    table_path: PathBuf,
    log_path: PathBuf,
    report_path: PathBuf,
}

impl FileStore {
    /// Open the store, creating the evidence directory and both sinks if missing.
    pub fn open(config: &StorageConfig) -> Result<Self, SinkWriteError> {
        let store = Self {
            table_path: config.table_path.clone(),
            log_path: config.log_path.clone(),
            report_path: config.report_path.clone(),
        };

        fs::create_dir_all(&config.evidence_dir).map_err(|e| {
            SinkWriteError::new(Sink::EvidenceDir, config.evidence_dir.display().to_string(), e)
        })?;
        for path in [&store.table_path, &store.log_path, &store.report_path] {
            create_parent(path).map_err(|e| {
                SinkWriteError::new(Sink::EvidenceDir, path.display().to_string(), e)
            })?;
        }

        store.ensure_table()?;
        if !store.log_path.exists() {
            File::create(&store.log_path)
                .map_err(|e| SinkWriteError::new(Sink::Log, display(&store.log_path), e))?;
            info!("Created log sink {}", store.log_path.display());
        }

        Ok(store)
    }

    /// Re-read every violation recorded in the tabular sink.
    pub fn read_violations(&self) -> io::Result<Vec<Violation>> {
        let content = fs::read_to_string(&self.table_path)?;
        Ok(content.lines().filter_map(parse_table_row).collect())
    }

    fn ensure_table(&self) -> Result<(), SinkWriteError> {
        if self.table_path.exists() {
            return Ok(());
        }
        fs::write(&self.table_path, format!("{}\n", TABLE_HEADER))
            .map_err(|e| SinkWriteError::new(Sink::Table, display(&self.table_path), e))?;
        info!("Created table sink {}", self.table_path.display());
        Ok(())
    }
}

impl EvidenceStore for FileStore {
    fn locations(&self) -> StoreLocations {
        StoreLocations {
            table: display(&self.table_path),
            log: display(&self.log_path),
            report: display(&self.report_path),
        }
    }

    fn append_table(&mut self, rows: &str) -> Result<(), SinkWriteError> {
        self.ensure_table()?;
        append_records(&self.table_path, rows)
            .map_err(|e| SinkWriteError::new(Sink::Table, display(&self.table_path), e))
    }

    fn append_log(&mut self, block: &str) -> Result<(), SinkWriteError> {
        append_records(&self.log_path, block)
            .map_err(|e| SinkWriteError::new(Sink::Log, display(&self.log_path), e))
    }

    fn replace_report(&mut self, document: &str) -> Result<(), SinkWriteError> {
        fs::write(&self.report_path, document)
            .map_err(|e| SinkWriteError::new(Sink::Report, display(&self.report_path), e))
    }
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

fn create_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

fn append_records(path: &Path, records: &str) -> io::Result<()> {
    if records.is_empty() {
        return Ok(());
    }

    let mut file = OpenOptions::new()
        .read(true)
        .append(true)
        .create(true)
        .open(path)?;

    let mut buf = String::with_capacity(records.len() + 2);
    if ends_mid_line(&mut file)? {
        warn!("{} ends with a torn record, starting a new line", path.display());
        buf.push('\n');
    }
    buf.push_str(records);
    if !buf.ends_with('\n') {
        buf.push('\n');
    }

    file.write_all(buf.as_bytes())?;
    file.sync_data()?;
    debug!("Appended {} bytes to {}", buf.len(), path.display());
    Ok(())
}

fn ends_mid_line(file: &mut File) -> io::Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

// =============================================================================
// MEMORY STORE
// =============================================================================

/// In-memory store with the same append semantics (for testing and dry runs).
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    table: String,
    log: String,
    report: Option<String>,
    report_writes: usize,
    fail_on: Option<Sink>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            table: format!("{}\n", TABLE_HEADER),
            ..Self::default()
        }
    }

    /// A store whose writes to `sink` always fail.
    pub fn failing_on(sink: Sink) -> Self {
        Self {
            fail_on: Some(sink),
            ..Self::new()
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn log(&self) -> &str {
        &self.log
    }

    pub fn report(&self) -> Option<&str> {
        self.report.as_deref()
    }

    pub fn report_writes(&self) -> usize {
        self.report_writes
    }

    pub fn violations(&self) -> Vec<Violation> {
        self.table.lines().filter_map(parse_table_row).collect()
    }

    fn check(&self, sink: Sink) -> Result<(), SinkWriteError> {
        if self.fail_on == Some(sink) {
            return Err(SinkWriteError::new(
                sink,
                "memory",
                io::Error::new(io::ErrorKind::Other, "injected write failure"),
            ));
        }
        Ok(())
    }
}

fn push_records(target: &mut String, records: &str) {
    if records.is_empty() {
        return;
    }
    if !target.is_empty() && !target.ends_with('\n') {
        target.push('\n');
    }
    target.push_str(records);
    if !target.ends_with('\n') {
        target.push('\n');
    }
}

impl EvidenceStore for MemoryStore {
    fn locations(&self) -> StoreLocations {
        StoreLocations {
            table: "memory://table".into(),
            log: "memory://log".into(),
            report: "memory://report".into(),
        }
    }

    fn append_table(&mut self, rows: &str) -> Result<(), SinkWriteError> {
        self.check(Sink::Table)?;
        push_records(&mut self.table, rows);
        Ok(())
    }

    fn append_log(&mut self, block: &str) -> Result<(), SinkWriteError> {
        self.check(Sink::Log)?;
        push_records(&mut self.log, block);
        Ok(())
    }

    fn replace_report(&mut self, document: &str) -> Result<(), SinkWriteError> {
        self.check(Sink::Report)?;
        self.report = Some(document.to_string());
        self.report_writes += 1;
        Ok(())
    }
}
