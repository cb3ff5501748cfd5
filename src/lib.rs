//! Feed Order Monitor Library
//!
//! Periodically checks that a time-ordered listing is really newest-first
//! and persists evidence when it is not. The binary in `main.rs` wires these
//! modules to the live feed and the filesystem.

pub mod config;
pub mod coordinator;
pub mod evidence;
pub mod feed;
pub mod order_check;
pub mod scheduler;

pub use config::{MonitorConfig, StorageConfig};
pub use coordinator::{CycleError, CycleState, RunCoordinator};
pub use scheduler::{CycleTask, Scheduler};
