//! Append-only open-event log for opentrack.
//!
//! # Modules
//!
//! - [`append`] - Serialized NDJSON appends to the log file
//! - [`recorder`] - Fire-and-forget recording through a single writer thread
//! - [`reader`] - Full-log scans that skip corrupt lines
//! - [`aggregate`] - Per-identifier statistics and the status query facade
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  EventRecorder  │  non-blocking enqueue from request handlers
//! └────────┬────────┘
//!          │  crossbeam channel
//!          ▼
//! ┌─────────────────┐
//! │    AppendLog    │  single writer thread, one JSON object per line
//! └────────┬────────┘
//!          │  opens.jsonl
//!          ▼
//! ┌─────────────────┐
//! │ EventLogReader  │  full scan per query, corrupt lines skipped
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │StatusAggregator │  opened / count / first / last
//! └─────────────────┘
//! ```
//!
//! The log is the source of truth; counts are always derived from it.

pub mod aggregate;
pub mod append;
pub mod error;
pub mod reader;
pub mod recorder;

pub use aggregate::{IdentifierAggregate, OpenStatus, ProxyPolicy, StatusAggregator};
pub use append::AppendLog;
pub use error::{Error, Result};
pub use reader::{EventLogReader, ScanStats};
pub use recorder::{EventRecorder, RecorderHandle, RecorderStats};
