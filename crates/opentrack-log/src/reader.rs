//! Event log reader.
//!
//! Scans the NDJSON log from the beginning on every call. Lines that fail to
//! decode are logged, counted and skipped, so one damaged record never hides
//! the rest of the history.
//!
//! A scan that races with the writer sees a prefix of the completed appends.
//! A final line without its terminating newline is a record still being
//! written and is left for the next scan. If the writer died mid-record,
//! [`AppendLog::open`](crate::AppendLog::open) terminates the fragment on
//! restart and it is counted as corrupt from then on.

use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::{Path, PathBuf};
use std::time::Instant;

use opentrack_core::metrics::{self, CORRUPT_LINES, SCAN_DURATION};
use opentrack_core::{EmailId, OpenEvent};
use tracing::{debug, warn};

use crate::error::Result;

/// Statistics from one log scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Complete lines read, including blank ones.
    pub total_lines: usize,
    /// Lines decoded into events.
    pub events: usize,
    /// Lines skipped because they did not decode.
    pub corrupt_lines: usize,
    /// Bytes consumed, excluding an unterminated trailing record.
    pub bytes_read: usize,
}

/// Reads open events back from the append-only log.
#[derive(Debug, Clone)]
pub struct EventLogReader {
    path: PathBuf,
}

impl EventLogReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Scan the log in append order, calling `handler` for every decoded event.
    ///
    /// A log that does not exist yet holds no events.
    pub fn scan<F>(&self, mut handler: F) -> Result<ScanStats>
    where
        F: FnMut(OpenEvent),
    {
        let started = Instant::now();
        let mut stats = ScanStats::default();

        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "event log not created yet");
                return Ok(stats);
            }
            Err(e) => return Err(e.into()),
        };
        let mut reader = BufReader::new(file);
        let mut buf: Vec<u8> = Vec::with_capacity(512);

        loop {
            buf.clear();
            let read = reader.read_until(b'\n', &mut buf)?;
            if read == 0 {
                break;
            }
            if buf.last() != Some(&b'\n') {
                debug!(bytes = read, "skipping unterminated trailing record");
                break;
            }

            stats.total_lines += 1;
            stats.bytes_read += read;
            let line_num = stats.total_lines;

            let line = match std::str::from_utf8(&buf) {
                Ok(line) => line,
                Err(e) => {
                    warn!("Line {}: invalid UTF-8: {}", line_num, e);
                    stats.corrupt_lines += 1;
                    continue;
                }
            };

            if line.trim().is_empty() {
                continue;
            }

            match OpenEvent::from_line(line) {
                Ok(event) => {
                    stats.events += 1;
                    handler(event);
                }
                Err(e) => {
                    warn!("Line {}: skipping corrupt record: {}", line_num, e);
                    stats.corrupt_lines += 1;
                }
            }
        }

        if stats.corrupt_lines > 0 {
            metrics::increment(CORRUPT_LINES, stats.corrupt_lines as u64);
        }
        metrics::observe_seconds(SCAN_DURATION, started.elapsed().as_secs_f64());
        debug!(
            events = stats.events,
            corrupt_lines = stats.corrupt_lines,
            bytes = stats.bytes_read,
            "event log scanned"
        );

        Ok(stats)
    }

    /// Every event in the log, in append order.
    pub fn read_all(&self) -> Result<Vec<OpenEvent>> {
        Ok(self.read_with_stats()?.0)
    }

    /// Every event plus the scan statistics.
    pub fn read_with_stats(&self) -> Result<(Vec<OpenEvent>, ScanStats)> {
        let mut events = Vec::new();
        let stats = self.scan(|event| events.push(event))?;
        Ok((events, stats))
    }

    /// Events for one identifier, in append order.
    pub fn read_for(&self, email_id: &EmailId) -> Result<Vec<OpenEvent>> {
        let mut events = Vec::new();
        self.scan(|event| {
            if &event.email_id == email_id {
                events.push(event);
            }
        })?;
        Ok(events)
    }
}
