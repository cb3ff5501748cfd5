//! Failure Evidence
//!
//! The effectful stage of a failing cycle:
//! - `capture`: best-effort snapshot of what was observed
//! - `store`: append-only CSV and log sinks plus the overwritten report
//! - `recorder`: turns a `RunRecord` into sink appends and a report
//! - `report`: HTML rendering and optional viewer launch

pub mod capture;
pub mod recorder;
pub mod report;
pub mod store;

pub use capture::*;
pub use recorder::*;
pub use report::*;
pub use store::*;
