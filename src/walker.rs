//! Directory inventory: breadth-first enumeration of the source tree.
//!
//! The walk uses an explicit FIFO queue rather than recursion, so depth is
//! bounded by the queue and a stop request can cut the traversal at any
//! directory boundary. A stopped walk returns the directories found so far
//! — a partial but self-consistent list the planning passes can still use.
//!
//! Per-directory listing failures (permissions, vanished directories) are
//! reported as log events and skipped; one unreadable directory never
//! aborts the inventory. Subdirectories are enqueued in sorted name order
//! so the inventory — and everything ordered by it downstream — is
//! reproducible for a fixed filesystem snapshot.

use crate::control::ControlState;
use crate::events::{Event, EventSink, Ticker};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Heartbeat cadence for inventory progress events.
const HEARTBEAT_EVERY: Duration = Duration::from_millis(300);

/// Result of an inventory walk.
#[derive(Debug, Clone)]
pub struct Inventory {
    /// All directories found, in BFS order; the root is first.
    pub directories: Vec<PathBuf>,
    /// False when a stop request ended the walk early.
    pub complete: bool,
}

/// Walk the tree under `root` breadth-first, collecting every directory.
pub fn inventory(root: &Path, control: &ControlState, sink: &EventSink) -> Inventory {
    let started = Instant::now();
    let mut heartbeat = Ticker::new(HEARTBEAT_EVERY);
    let mut directories = Vec::new();
    let mut queue: VecDeque<PathBuf> = VecDeque::new();
    queue.push_back(root.to_path_buf());

    while let Some(dir) = queue.pop_front() {
        if !control.checkpoint() {
            return Inventory {
                directories,
                complete: false,
            };
        }

        directories.push(dir.clone());

        match sorted_subdirectories(&dir) {
            Ok(subdirs) => queue.extend(subdirs),
            Err(err) => sink.emit(Event::LogLine(format!(
                "WARNING: cannot list {}: {err}",
                dir.display()
            ))),
        }

        if heartbeat.due() {
            let rate = directories.len() as f64 / started.elapsed().as_secs_f64().max(1e-6);
            let current = dir.strip_prefix(root).unwrap_or(&dir);
            sink.emit(Event::Heartbeat(format!(
                "Inventorying directories… {} found | queue {} | {:.0} dirs/s | in {}",
                directories.len(),
                queue.len(),
                rate,
                display_relative(current)
            )));
        }
    }

    Inventory {
        directories,
        complete: true,
    }
}

/// Immediate subdirectories of `dir`, sorted by name.
///
/// Entries whose type cannot be determined are skipped individually.
fn sorted_subdirectories(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut subdirs: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .map(|e| e.path())
        .collect();
    subdirs.sort();
    Ok(subdirs)
}

/// List the files of one directory in sorted name order.
///
/// Shared by the planning passes; tolerant the same way the walk is —
/// an unlistable directory yields the error for the caller to log.
pub fn sorted_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|e| e.path())
        .collect();
    files.sort();
    Ok(files)
}

/// "." for the root itself, relative path otherwise.
fn display_relative(path: &Path) -> String {
    if path.as_os_str().is_empty() {
        ".".to_string()
    } else {
        path.display().to_string()
    }
}
