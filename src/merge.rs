//! Stage 2: merge metadata and move files.
//!
//! Consumes the plan in order. For each entry: resolve its fate (no
//! sidecar / unreadable sidecar / tool failure / success), write one CSV
//! row, and move the media file (plus sidecar, when present) into the
//! completed or failed tree. The loop is strictly sequential — exiftool
//! invocations are not assumed concurrency-safe against one source tree,
//! and the report must stay in plan order.
//!
//! Error policy per the taxonomy:
//! - *fatal* (escapes this module): destination directories or the report
//!   cannot be created; the tool is unresolvable outside dry-run mode.
//! - *per-entry*: missing sidecar, unreadable or unparseable sidecar,
//!   non-zero tool exit, and move failures. Each becomes a failed row and
//!   a taxonomy bump; the loop continues.
//! - *warning*: a live-partner tool failure. The primary entry still
//!   counts as completed.
//!
//! In dry-run mode the tool is never invoked and nothing moves; counters
//! and the report reflect the outcomes the run would have had.

use crate::config::RunOptions;
use crate::control::ControlState;
use crate::events::{Event, EventSink};
use crate::exiftool::{MetadataTool, ToolError};
use crate::media;
use crate::metadata::{self, MetadataFields};
use crate::plan::{AnalysisSummary, PlanEntry};
use crate::report::{EntryStatus, ReportWriter, SessionLog, file_stamp};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

/// Live-partner probe order: a capture's sibling is looked up by swapping
/// the extension, most specific container first.
const LIVE_PARTNER_EXTENSIONS: &[&str] = &["mov", "mp4", "jpg", "jpeg"];

#[derive(Error, Debug)]
pub enum MergeError {
    #[error("could not create destination directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("metadata tool is not usable: {0}")]
    ToolUnavailable(#[source] ToolError),
    #[error("could not write merge report: {0}")]
    Report(#[from] csv::Error),
}

/// Why an entry (or its partner) did not complete cleanly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    NoSidecar,
    BadSidecar,
    ToolError,
    PartnerError,
    Other,
}

/// Failure counts by kind, snapshot emitted once when the loop ends.
///
/// `partner_error` counts warnings; it never reclassifies an entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FailureTaxonomy {
    pub no_sidecar: usize,
    pub bad_sidecar: usize,
    pub tool_error: usize,
    pub partner_error: usize,
    pub other: usize,
}

impl FailureTaxonomy {
    pub fn record(&mut self, kind: FailureKind) {
        match kind {
            FailureKind::NoSidecar => self.no_sidecar += 1,
            FailureKind::BadSidecar => self.bad_sidecar += 1,
            FailureKind::ToolError => self.tool_error += 1,
            FailureKind::PartnerError => self.partner_error += 1,
            FailureKind::Other => self.other += 1,
        }
    }

    /// Entry-level failures (partner warnings excluded).
    pub fn failures(&self) -> usize {
        self.no_sidecar + self.bad_sidecar + self.tool_error + self.other
    }
}

/// Final tallies of a merge run.
#[derive(Debug)]
pub struct MergeOutcome {
    pub completed: usize,
    pub failed: usize,
    pub warnings: usize,
    pub taxonomy: FailureTaxonomy,
    pub report: PathBuf,
    /// False when a stop request ended the loop early.
    pub complete: bool,
}

/// Execute Stage 2 over the plan.
pub fn run_merge(
    entries: &[PlanEntry],
    summary: &AnalysisSummary,
    options: &RunOptions,
    tool: &dyn MetadataTool,
    control: &ControlState,
    sink: &EventSink,
    log: &mut SessionLog,
) -> Result<MergeOutcome, MergeError> {
    for dir in [&options.completed, &options.failed, &options.logs] {
        std::fs::create_dir_all(dir).map_err(|source| MergeError::CreateDir {
            path: dir.clone(),
            source,
        })?;
    }
    if !options.dry_run {
        tool.check_available().map_err(MergeError::ToolUnavailable)?;
    }

    let report_path = options.logs.join(format!("merge_report_{}.csv", file_stamp()));
    let report = ReportWriter::create(report_path)?;
    log.log(sink, format!("Merge report: {}", report.path().display()));

    let mut run = MergeRun {
        options,
        tool,
        control,
        sink,
        log,
        report,
        taxonomy: FailureTaxonomy::default(),
        completed: 0,
        failed: 0,
        warnings: 0,
        images_left: summary.images,
        videos_left: summary.videos,
    };
    run.execute(entries)
}

/// The resolved fate of one plan entry.
struct EntryOutcome {
    status: EntryStatus,
    failure: Option<FailureKind>,
    note: String,
    /// Sidecar to move along with the media file, when one exists.
    sidecar: Option<PathBuf>,
}

struct MergeRun<'a> {
    options: &'a RunOptions,
    tool: &'a dyn MetadataTool,
    control: &'a ControlState,
    sink: &'a EventSink,
    log: &'a mut SessionLog,
    report: ReportWriter,
    taxonomy: FailureTaxonomy,
    completed: usize,
    failed: usize,
    warnings: usize,
    images_left: usize,
    videos_left: usize,
}

impl MergeRun<'_> {
    fn execute(mut self, entries: &[PlanEntry]) -> Result<MergeOutcome, MergeError> {
        let total = entries.len();
        let started = Instant::now();
        let mut complete = true;

        for (index, entry) in entries.iter().enumerate() {
            if !self.control.checkpoint() {
                complete = false;
                break;
            }
            let position = index + 1;
            self.announce(entry, position, total, started);

            let outcome = self.process_entry(entry);
            self.report.record(
                &entry.media,
                outcome.sidecar.as_deref(),
                outcome.status,
                &outcome.note,
            )?;
            match outcome.failure {
                Some(kind) => {
                    self.taxonomy.record(kind);
                    self.failed += 1;
                }
                None => self.completed += 1,
            }

            self.sink.emit(Event::Counts {
                completed: self.completed,
                failed: self.failed,
                warnings: self.warnings,
            });
            self.sink.emit(Event::Progress {
                processed: position,
                total,
            });
        }

        let log_path = self.log.path().to_path_buf();
        self.log.log(
            self.sink,
            format!(
                "Merge finished: {} completed, {} failed, {} warnings",
                self.completed, self.failed, self.warnings
            ),
        );
        self.sink.emit(Event::FailureSummary(self.taxonomy.clone()));
        self.sink.emit(Event::Finished {
            report: self.report.path().to_path_buf(),
            log: log_path,
        });

        Ok(MergeOutcome {
            completed: self.completed,
            failed: self.failed,
            warnings: self.warnings,
            taxonomy: self.taxonomy,
            report: self.report.path().to_path_buf(),
            complete,
        })
    }

    /// Per-entry telemetry: now-processing, remaining counters, heartbeat.
    fn announce(&mut self, entry: &PlanEntry, position: usize, total: usize, started: Instant) {
        let caption = entry
            .media
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.sink.emit(Event::NowProcessing {
            path: entry.media.clone(),
            caption,
        });

        if media::is_image(&entry.media) {
            self.images_left = self.images_left.saturating_sub(1);
        } else {
            self.videos_left = self.videos_left.saturating_sub(1);
        }
        self.sink.emit(Event::Remaining {
            images: self.images_left,
            videos: self.videos_left,
        });

        let rate = position as f64 / started.elapsed().as_secs_f64().max(1e-6);
        let eta = ((total - position) as f64 / rate.max(1e-6)) as u64;
        self.sink.emit(Event::Heartbeat(format!(
            "Merging… {position}/{total} | {rate:.1} files/s | ETA {}m {}s",
            eta / 60,
            eta % 60
        )));
    }

    /// Decide one entry's fate, invoke the tool, and move the files.
    ///
    /// Everything here is per-entry recoverable; the returned outcome is
    /// what lands in the report.
    fn process_entry(&mut self, entry: &PlanEntry) -> EntryOutcome {
        let media_path = &entry.media;

        let Some(sidecar) = entry.sidecar.as_ref().filter(|s| s.exists()) else {
            self.log_line(format!("FAIL (no sidecar): {}", media_path.display()));
            return self.fail(entry, None, FailureKind::NoSidecar, "No matching JSON sidecar");
        };

        let fields = match std::fs::read_to_string(sidecar)
            .map_err(|e| e.to_string())
            .and_then(|content| metadata::extract_fields(&content).map_err(|e| e.to_string()))
        {
            Ok(fields) => fields,
            Err(err) => {
                self.log_line(format!("FAIL (bad sidecar): {} -> {err}", media_path.display()));
                let note = format!("JSON sidecar error: {err}");
                return self.fail(entry, Some(sidecar.clone()), FailureKind::BadSidecar, &note);
            }
        };

        if let Err(err) = self.write_tags(&fields, media_path) {
            self.log_line(format!("FAIL (tool): {} -> {err}", media_path.display()));
            let note = format!("metadata tool error: {err}");
            return self.fail(entry, Some(sidecar.clone()), FailureKind::ToolError, &note);
        }

        let mut partner_note = String::new();
        if let Some(partner) = live_partner(media_path)
            && let Err(err) = self.write_tags(&fields, &partner)
        {
            partner_note = format!("Live partner failed: {}: {err}", partner.display());
            self.log_line(format!("WARN: {partner_note}"));
            self.taxonomy.record(FailureKind::PartnerError);
            self.warnings += 1;
        }

        if let Err(err) = self.move_pair(entry, Some(sidecar.as_path()), true) {
            self.log_line(format!("FAIL (move): {} -> {err}", media_path.display()));
            let note = format!("move error: {err}");
            return EntryOutcome {
                status: EntryStatus::Failed,
                failure: Some(FailureKind::Other),
                note,
                sidecar: Some(sidecar.clone()),
            };
        }

        self.log_line(format!("OK: {}", media_path.display()));
        EntryOutcome {
            status: if partner_note.is_empty() {
                EntryStatus::Completed
            } else {
                EntryStatus::CompletedWithPartnerWarn
            },
            failure: None,
            note: partner_note,
            sidecar: Some(sidecar.clone()),
        }
    }

    /// Route a failed entry to the failed tree and build its outcome.
    fn fail(
        &mut self,
        entry: &PlanEntry,
        sidecar: Option<PathBuf>,
        kind: FailureKind,
        note: &str,
    ) -> EntryOutcome {
        let mut note = note.to_string();
        if let Err(err) = self.move_pair(entry, sidecar.as_deref(), false) {
            self.log_line(format!("WARN: move to failed tree failed: {} -> {err}", entry.media.display()));
            note = format!("{note}; move error: {err}");
        }
        EntryOutcome {
            status: EntryStatus::Failed,
            failure: Some(kind),
            note,
            sidecar,
        }
    }

    /// Invoke the tool, or pretend to in dry-run mode.
    fn write_tags(&self, fields: &MetadataFields, target: &Path) -> Result<(), ToolError> {
        if self.options.dry_run {
            return Ok(());
        }
        self.tool.write(fields, target)
    }

    /// Move the media file (and sidecar, when present) under the completed
    /// or failed root. No-op in dry-run mode.
    fn move_pair(
        &self,
        entry: &PlanEntry,
        sidecar: Option<&Path>,
        succeeded: bool,
    ) -> std::io::Result<()> {
        if self.options.dry_run {
            return Ok(());
        }
        let dest_root = if succeeded {
            &self.options.completed
        } else {
            &self.options.failed
        };

        let file_name = Path::new(entry.media.file_name().unwrap_or_default());
        let relative = if self.options.preserve_tree {
            entry.media.strip_prefix(&self.options.source).unwrap_or(file_name)
        } else {
            file_name
        };
        let dest_media = dest_root.join(relative);
        if let Some(parent) = dest_media.parent() {
            std::fs::create_dir_all(parent)?;
        }
        move_file(&entry.media, &dest_media)?;

        if let Some(sidecar) = sidecar.filter(|s| s.exists()) {
            // The sidecar lands next to the media file, renamed to the
            // canonical `<media filename>.json` regardless of how
            // decorated its source name was.
            let mut json_name = file_name.as_os_str().to_os_string();
            json_name.push(".json");
            move_file(sidecar, &dest_media.with_file_name(json_name))?;
        }
        Ok(())
    }

    fn log_line(&mut self, msg: String) {
        self.log.log(self.sink, msg);
    }
}

/// Find a same-stem "live" partner file, if one exists on disk.
fn live_partner(media: &Path) -> Option<PathBuf> {
    for ext in LIVE_PARTNER_EXTENSIONS {
        let candidate = media.with_extension(ext);
        if candidate != *media && candidate.exists() {
            return Some(candidate);
        }
    }
    None
}

/// Rename, falling back to copy+remove across filesystems.
fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    match std::fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(_) => {
            std::fs::copy(from, to)?;
            std::fs::remove_file(from)
        }
    }
}
