//! Fire-and-forget event recorder.
//!
//! Request handlers hand events to [`EventRecorder`], which pushes them onto
//! an unbounded channel and returns immediately. A single writer thread owns
//! the [`AppendLog`] and drains the channel in order, so the log has exactly
//! one writer and a slow or failing disk never blocks a pixel response.
//!
//! ```text
//! [handler] ─┐
//! [handler] ─┼─► crossbeam channel ─► writer thread ─► AppendLog (NDJSON)
//! [handler] ─┘
//! ```
//!
//! Write failures are logged and counted by the writer thread; they are
//! never reported back to the request that produced the event.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use crossbeam_channel::{Receiver, Sender};
use opentrack_core::metrics::{self, EVENTS_ENQUEUED, EVENTS_WRITTEN, PROXY_OPENS, WRITE_ERRORS};
use opentrack_core::{ClassifiedEvent, EmailId, OpenEvent};
use tracing::{debug, info, warn};

use crate::append::AppendLog;
use crate::error::{Error, Result};

/// Cloneable handle for enqueueing open events.
#[derive(Clone)]
pub struct EventRecorder {
    sender: Sender<OpenEvent>,
    counters: Arc<RecorderCounters>,
}

/// Owns the writer thread. Call [`RecorderHandle::finish`] after every
/// [`EventRecorder`] clone has been dropped to flush and join it.
pub struct RecorderHandle {
    thread: thread::JoinHandle<()>,
    counters: Arc<RecorderCounters>,
}

#[derive(Default)]
struct RecorderCounters {
    enqueued: AtomicU64,
    written: AtomicU64,
    failed: AtomicU64,
}

/// Statistics about the recorder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecorderStats {
    /// Events accepted onto the queue.
    pub enqueued: u64,
    /// Events appended to the log.
    pub written: u64,
    /// Events dropped because the append failed.
    pub failed: u64,
}

impl EventRecorder {
    /// Start the writer thread for `log`.
    pub fn spawn(log: AppendLog) -> Result<(Self, RecorderHandle)> {
        let (sender, receiver) = crossbeam_channel::unbounded::<OpenEvent>();
        let counters = Arc::new(RecorderCounters::default());

        let thread_counters = Arc::clone(&counters);
        let thread = thread::Builder::new()
            .name("event-writer".to_string())
            .spawn(move || run_writer(log, receiver, &thread_counters))?;

        Ok((
            Self {
                sender,
                counters: Arc::clone(&counters),
            },
            RecorderHandle { thread, counters },
        ))
    }

    /// Capture an open now and queue it for appending.
    ///
    /// Returns once the event is queued; success means the writer accepted
    /// it, not that it reached disk.
    pub fn record(&self, email_id: EmailId, classified: ClassifiedEvent) -> Result<()> {
        self.enqueue(OpenEvent::capture(email_id, classified))
    }

    /// Queue an already-built event.
    pub fn enqueue(&self, event: OpenEvent) -> Result<()> {
        self.sender
            .send(event)
            .map_err(|e| Error::ChannelSend(e.to_string()))?;

        self.counters.enqueued.fetch_add(1, Ordering::Relaxed);
        metrics::increment(EVENTS_ENQUEUED, 1);
        Ok(())
    }

    pub fn stats(&self) -> RecorderStats {
        self.counters.snapshot()
    }
}

impl RecorderHandle {
    /// Wait for the queue to drain and the writer thread to exit.
    ///
    /// The writer stops once every [`EventRecorder`] clone is dropped.
    pub fn finish(self) -> Result<RecorderStats> {
        self.thread.join().map_err(|_| Error::WriterPanicked)?;
        Ok(self.counters.snapshot())
    }
}

impl RecorderCounters {
    fn snapshot(&self) -> RecorderStats {
        RecorderStats {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            written: self.written.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

fn run_writer(log: AppendLog, receiver: Receiver<OpenEvent>, counters: &RecorderCounters) {
    info!(path = %log.path().display(), "event writer thread started");

    for event in receiver.iter() {
        match log.append(&event) {
            Ok(()) => {
                counters.written.fetch_add(1, Ordering::Relaxed);
                metrics::increment(EVENTS_WRITTEN, 1);
                if event.is_automated_proxy {
                    metrics::increment(PROXY_OPENS, 1);
                }
                debug!(
                    email_id = %event.email_id,
                    automated = event.is_automated_proxy,
                    "open event recorded"
                );
            }
            Err(e) => {
                counters.failed.fetch_add(1, Ordering::Relaxed);
                metrics::increment(WRITE_ERRORS, 1);
                warn!(email_id = %event.email_id, error = %e, "failed to append open event");
            }
        }
    }

    if let Err(e) = log.sync() {
        warn!(error = %e, "failed to sync event log on shutdown");
    }

    info!(
        records = log.records_written(),
        bytes = log.bytes_written(),
        "event writer thread stopped"
    );
}
