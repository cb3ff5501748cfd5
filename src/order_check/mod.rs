//! Freshness Order Check
//!
//! The pure stage of a verification cycle: raw timestamp tokens are
//! normalized into `TimePoint`s, validated against their stable newest-first
//! sort, and folded into an immutable `RunRecord`. Nothing in here performs
//! I/O or suspends.
//!
//! ## Usage
//!
//! ```rust
//! use feed_order_monitor::order_check::{normalize_all, validate};
//!
//! let raw = vec![
//!     Some("2025-02-23T12:00:00".to_string()),
//!     Some("2025-02-23T11:00:00".to_string()),
//!     Some("2025-02-23T11:30:00".to_string()),
//! ];
//! let validation = validate(&normalize_all(&raw));
//! let positions: Vec<usize> = validation.violations.iter().map(|v| v.position).collect();
//! assert_eq!(positions, vec![2, 3]);
//! ```

pub mod run_record;
pub mod timepoint;
pub mod validator;

pub use run_record::*;
pub use timepoint::*;
pub use validator::*;
