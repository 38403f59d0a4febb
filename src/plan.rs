//! Stage 1: plan building.
//!
//! Three passes over the BFS directory inventory:
//!
//! 1. **Count** — tally media files per [`crate::media`] across every
//!    inventoried directory. The total is the stable denominator for
//!    percentage and ETA math before the slower mapping pass starts.
//! 2. **Short-circuit** — zero media means nothing for Stage 2 to do; an
//!    all-zero summary goes straight to the confirmation gate.
//! 3. **Map** — resolve each media file's sidecar, classify image/video,
//!    accumulate byte size (stat failures count as zero), and track
//!    same-stem image/video pairs ("live" captures). Every media file
//!    becomes exactly one [`PlanEntry`], appended in traversal order:
//!    directories in BFS order, files within a directory in sorted name
//!    order. Two runs over an unchanged tree produce identical plans.
//!
//! The plan is immutable once built; Stage 2 consumes it in order.

use crate::control::ControlState;
use crate::events::{Event, EventSink, Ticker};
use crate::report::SessionLog;
use crate::walker::{self, sorted_files};
use crate::{media, sidecar};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Progress cadence for the mapping pass: every Nth file or every 300 ms,
/// whichever comes first.
const PROGRESS_EVERY_NTH: usize = 100;
const PROGRESS_INTERVAL: Duration = Duration::from_millis(300);

#[derive(thiserror::Error, Debug)]
pub enum PlanError {
    #[error("source folder does not exist: {0}")]
    SourceMissing(PathBuf),
    #[error("source folder is not readable: {path}: {source}")]
    SourceUnreadable {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// One unit of Stage-2 work: a media file and its sidecar, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanEntry {
    pub media: PathBuf,
    pub sidecar: Option<PathBuf>,
}

/// Aggregate counters finalized at the end of Stage 1.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnalysisSummary {
    pub total: usize,
    pub images: usize,
    pub videos: usize,
    pub with_sidecar: usize,
    pub without_sidecar: usize,
    pub live_pairs: usize,
    pub total_bytes: u64,
}

/// Everything Stage 1 hands to the confirmation gate.
#[derive(Debug)]
pub struct PlanOutcome {
    pub entries: Vec<PlanEntry>,
    pub summary: AnalysisSummary,
    /// False when a stop request cut the stage short.
    pub complete: bool,
}

/// Build the ordered work list and analysis summary for `source`.
pub fn build_plan(
    source: &Path,
    control: &ControlState,
    sink: &EventSink,
    log: &mut SessionLog,
) -> Result<PlanOutcome, PlanError> {
    if !source.exists() {
        return Err(PlanError::SourceMissing(source.to_path_buf()));
    }
    // Probe readability up front: an unreadable root is fatal, unlike the
    // per-directory permission failures tolerated below.
    std::fs::read_dir(source).map_err(|source_err| PlanError::SourceUnreadable {
        path: source.to_path_buf(),
        source: source_err,
    })?;

    log.log(sink, format!("Inventorying subdirectories of {}", source.display()));
    let inventory = walker::inventory(source, control, sink);
    log.log(
        sink,
        format!(
            "Directory inventory complete: {} directories",
            inventory.directories.len()
        ),
    );
    if !inventory.complete {
        return Ok(PlanOutcome {
            entries: Vec::new(),
            summary: AnalysisSummary::default(),
            complete: false,
        });
    }

    let Some(total_media) = count_media(&inventory.directories, source, control, sink) else {
        return Ok(PlanOutcome {
            entries: Vec::new(),
            summary: AnalysisSummary::default(),
            complete: false,
        });
    };

    if total_media == 0 {
        log.log(sink, "No media files found under the source folder");
        return Ok(PlanOutcome {
            entries: Vec::new(),
            summary: AnalysisSummary::default(),
            complete: true,
        });
    }

    Ok(map_sidecars(&inventory.directories, source, total_media, control, sink, log))
}

/// Count pass. Returns `None` when stopped mid-count.
fn count_media(
    directories: &[PathBuf],
    source: &Path,
    control: &ControlState,
    sink: &EventSink,
) -> Option<usize> {
    let mut heartbeat = Ticker::new(PROGRESS_INTERVAL);
    let mut total = 0usize;

    for (index, dir) in directories.iter().enumerate() {
        if !control.checkpoint() {
            return None;
        }
        let Ok(files) = sorted_files(dir) else {
            // Already warned about during inventory; skip quietly here.
            continue;
        };
        total += files.iter().filter(|f| media::is_media(f)).count();

        if heartbeat.due() {
            let pct = (index + 1) * 100 / directories.len().max(1);
            sink.emit(Event::Heartbeat(format!(
                "Counting media files… {total} found ({pct}% of directories) | in {}",
                relative_display(dir, source)
            )));
        }
    }
    Some(total)
}

/// Mapping pass: resolve sidecars and build the ordered plan.
fn map_sidecars(
    directories: &[PathBuf],
    source: &Path,
    total_media: usize,
    control: &ControlState,
    sink: &EventSink,
    log: &mut SessionLog,
) -> PlanOutcome {
    log.log(sink, "Mapping sidecar JSON files to media");

    let mut entries: Vec<PlanEntry> = Vec::with_capacity(total_media);
    let mut summary = AnalysisSummary {
        total: total_media,
        ..AnalysisSummary::default()
    };
    // Stem → (has image, has video); a stem with both is one live pair.
    let mut stems: HashMap<String, (bool, bool)> = HashMap::new();

    let started = Instant::now();
    let mut progress = Ticker::new(PROGRESS_INTERVAL);
    let mut complete = true;

    'dirs: for dir in directories {
        if !control.checkpoint() {
            complete = false;
            break;
        }
        let Ok(files) = sorted_files(dir) else {
            continue;
        };

        for file in files {
            if !control.checkpoint() {
                complete = false;
                break 'dirs;
            }
            if !media::is_media(&file) {
                continue;
            }

            summary.total_bytes += std::fs::metadata(&file).map(|m| m.len()).unwrap_or(0);

            let is_image = media::is_image(&file);
            if is_image {
                summary.images += 1;
            } else {
                summary.videos += 1;
            }
            if let Some(stem) = file.file_stem() {
                let tags = stems.entry(stem.to_string_lossy().into_owned()).or_default();
                if is_image {
                    tags.0 = true;
                } else {
                    tags.1 = true;
                }
            }

            match sidecar::find_sidecar(&file) {
                Some(json) => {
                    summary.with_sidecar += 1;
                    entries.push(PlanEntry {
                        media: file,
                        sidecar: Some(json),
                    });
                }
                None => {
                    summary.without_sidecar += 1;
                    entries.push(PlanEntry {
                        media: file,
                        sidecar: None,
                    });
                }
            }

            if progress.due_or_nth(entries.len(), PROGRESS_EVERY_NTH) {
                let rate = entries.len() as f64 / started.elapsed().as_secs_f64().max(1e-6);
                let remaining = total_media.saturating_sub(entries.len());
                let eta = (remaining as f64 / rate.max(1e-6)) as u64;
                sink.emit(Event::Progress {
                    processed: entries.len(),
                    total: total_media,
                });
                sink.emit(Event::Heartbeat(format!(
                    "Mapping sidecars… {}/{} | {:.1} files/s | ETA {}m {}s | in {}",
                    entries.len(),
                    total_media,
                    rate,
                    eta / 60,
                    eta % 60,
                    relative_display(dir, source)
                )));
            }
        }
    }

    summary.live_pairs = stems.values().filter(|(img, vid)| *img && *vid).count();
    // A stopped mapping pass leaves total as the full count; the entries
    // list is the partial truth.
    if !complete {
        log.log(sink, format!("Planning stopped after {} of {} files", entries.len(), total_media));
    } else {
        sink.emit(Event::Progress {
            processed: total_media,
            total: total_media,
        });
        log.log(sink, "Planning phase complete");
        log.log(
            sink,
            format!(
                "Media files: {} ({} images, {} videos)",
                summary.total, summary.images, summary.videos
            ),
        );
        log.log(
            sink,
            format!(
                "Sidecars: {} matched, {} missing | live pairs: {}",
                summary.with_sidecar, summary.without_sidecar, summary.live_pairs
            ),
        );
        log.log(
            sink,
            format!("Total size scanned: {:.2} GB", summary.total_bytes as f64 / 1024f64.powi(3)),
        );
    }

    PlanOutcome {
        entries,
        summary,
        complete,
    }
}

fn relative_display(dir: &Path, source: &Path) -> String {
    match dir.strip_prefix(source) {
        Ok(rel) if rel.as_os_str().is_empty() => ".".to_string(),
        Ok(rel) => rel.display().to_string(),
        Err(_) => dir.display().to_string(),
    }
}
