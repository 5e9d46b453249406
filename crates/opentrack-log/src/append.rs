//! Append-only NDJSON log file.
//!
//! # Format
//!
//! ```text
//! {"emailId":"...","timestamp":"...",...}\n
//! {"emailId":"...","timestamp":"...",...}\n
//! ...
//! ```
//!
//! The file is opened with `O_APPEND` and never truncated, rewritten or
//! reordered. Each record is encoded up front and handed to the OS in a
//! single `write_all` while holding the file lock, so records from
//! concurrent callers never interleave.
//!
//! A log left ending mid-record by a crash is terminated with a newline on
//! open. The fragment then reads back as one corrupt line and later
//! appends stay intact.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use opentrack_core::OpenEvent;
use parking_lot::Mutex;
use tracing::{info, warn};

use crate::error::Result;

/// Thread-safe append handle on the event log.
pub struct AppendLog {
    path: PathBuf,
    file: Mutex<File>,
    records_written: AtomicU64,
    bytes_written: AtomicU64,
}

impl AppendLog {
    /// Open (or create) the log file for appending.
    ///
    /// Missing parent directories are created.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .create(true)
            .append(true)
            .open(&path)?;
        let existing_bytes = file.metadata()?.len();

        if existing_bytes > 0 && !ends_with_newline(&mut file)? {
            // Record torn by a crash; the next append must start a new line.
            file.write_all(b"\n")?;
            file.flush()?;
            warn!(
                path = %path.display(),
                "event log ended mid-record, terminated the partial line"
            );
        }

        info!(
            path = %path.display(),
            existing_bytes,
            "event log opened for append"
        );

        Ok(Self {
            path,
            file: Mutex::new(file),
            records_written: AtomicU64::new(0),
            bytes_written: AtomicU64::new(0),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one event as a single line.
    pub fn append(&self, event: &OpenEvent) -> Result<()> {
        let line = event.to_line()?;

        let mut file = self.file.lock();
        file.write_all(line.as_bytes())?;
        file.flush()?;
        drop(file);

        self.records_written.fetch_add(1, Ordering::Relaxed);
        self.bytes_written
            .fetch_add(line.len() as u64, Ordering::Relaxed);
        Ok(())
    }

    /// Force written records to stable storage.
    pub fn sync(&self) -> Result<()> {
        self.file.lock().sync_data()?;
        Ok(())
    }

    /// Records appended through this handle.
    pub fn records_written(&self) -> u64 {
        self.records_written.load(Ordering::Relaxed)
    }

    /// Bytes appended through this handle.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written.load(Ordering::Relaxed)
    }
}

fn ends_with_newline(file: &mut File) -> Result<bool> {
    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}
