//! Typed event stream from the pipeline worker to the presentation layer.
//!
//! The worker is the sole producer; whatever front-end started the run is
//! the sole consumer. Events travel over a plain `std::sync::mpsc` channel,
//! the same worker→printer pattern the process stage uses for its per-image
//! progress. The set of variants is closed: presentation code matches
//! exhaustively and the core never smuggles state through strings beyond
//! the human-readable log and heartbeat lines.
//!
//! [`EventSink`] wraps the sender and deliberately ignores send failures —
//! a consumer that went away must never take the pipeline down with it.

use crate::merge::FailureTaxonomy;
use crate::orchestrator::Stage;
use crate::plan::AnalysisSummary;
use std::path::PathBuf;
use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};

/// One event from the pipeline worker.
#[derive(Debug, Clone)]
pub enum Event {
    /// The orchestrator entered a new state.
    StageChanged(Stage),
    /// A timestamped log line (also written to the session log file).
    LogLine(String),
    /// Rate-limited human-readable status with throughput/ETA figures.
    Heartbeat(String),
    /// Stage-local progress: (processed, total).
    Progress { processed: usize, total: usize },
    /// Merge-stage counters.
    Counts {
        completed: usize,
        failed: usize,
        warnings: usize,
    },
    /// Remaining media by kind during the merge stage.
    Remaining { images: usize, videos: usize },
    /// The entry now being processed (path doubles as its own preview).
    NowProcessing { path: PathBuf, caption: String },
    /// Stage 1 finished; the run is paused until the consumer answers
    /// with `confirm_proceed` or `confirm_cancel`.
    ConfirmationNeeded(AnalysisSummary),
    /// Final failure breakdown, emitted once when the merge loop ends.
    FailureSummary(FailureTaxonomy),
    /// Normal completion: where the report and session log landed.
    Finished { report: PathBuf, log: PathBuf },
    /// The run aborted; no completion event follows.
    Fatal(String),
}

/// Cloneable sending half of the event stream.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: Sender<Event>,
}

impl EventSink {
    pub fn new(tx: Sender<Event>) -> Self {
        Self { tx }
    }

    /// Emit an event. A disconnected receiver is not an error.
    pub fn emit(&self, event: Event) {
        let _ = self.tx.send(event);
    }
}

/// Wall-clock throttle for heartbeat and progress emission.
///
/// Bounds event volume: `due()` returns true at most once per interval.
/// The first call always fires so a stage announces itself immediately.
#[derive(Debug)]
pub struct Ticker {
    interval: Duration,
    last: Option<Instant>,
}

impl Ticker {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// True if the interval has elapsed since the last firing.
    pub fn due(&mut self) -> bool {
        let now = Instant::now();
        match self.last {
            Some(last) if now.duration_since(last) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }

    /// True on every `n`th count or when the interval has elapsed,
    /// whichever comes first.
    pub fn due_or_nth(&mut self, count: usize, n: usize) -> bool {
        if n > 0 && count > 0 && count % n == 0 {
            self.last = Some(Instant::now());
            return true;
        }
        self.due()
    }
}
