//! Session outputs: the CSV merge report and the timestamped text log.
//!
//! Both are written incrementally and flushed after every record, so a
//! stop (or a crash) mid-merge leaves exactly the rows for the entries
//! that were actually processed — the report is the authoritative record
//! of what moved where.
//!
//! Report layout: `media_path,json_sidecar,status,note`, one row per plan
//! entry. Status is one of [`EntryStatus`]'s three values. Paths and error
//! notes contain arbitrary text (commas, quotes), which the csv writer
//! quotes for us.

use crate::events::{Event, EventSink};
use chrono::Local;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Outcome classification for one CSV row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    Failed,
    Completed,
    CompletedWithPartnerWarn,
}

impl EntryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EntryStatus::Failed => "FAILED",
            EntryStatus::Completed => "COMPLETED",
            EntryStatus::CompletedWithPartnerWarn => "COMPLETED_WITH_PARTNER_WARN",
        }
    }
}

/// Incremental CSV report writer.
pub struct ReportWriter {
    writer: csv::Writer<File>,
    path: PathBuf,
}

impl ReportWriter {
    /// Create the report file and write the header row.
    pub fn create(path: PathBuf) -> Result<Self, csv::Error> {
        let mut writer = csv::Writer::from_path(&path)?;
        writer.write_record(["media_path", "json_sidecar", "status", "note"])?;
        writer.flush()?;
        Ok(Self { writer, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one row and flush it to disk.
    pub fn record(
        &mut self,
        media: &Path,
        sidecar: Option<&Path>,
        status: EntryStatus,
        note: &str,
    ) -> Result<(), csv::Error> {
        self.writer.write_record([
            media.to_string_lossy().as_ref(),
            sidecar.map(|p| p.to_string_lossy()).unwrap_or_default().as_ref(),
            status.as_str(),
            note,
        ])?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Timestamped text log for one pipeline run, flushed per line.
#[derive(Debug)]
pub struct SessionLog {
    file: File,
    path: PathBuf,
}

impl SessionLog {
    /// Create `session_log_<stamp>.txt` inside the logs directory.
    pub fn create(logs_dir: &Path) -> std::io::Result<Self> {
        std::fs::create_dir_all(logs_dir)?;
        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        let path = logs_dir.join(format!("session_log_{stamp}.txt"));
        let file = File::create(&path)?;
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Log a line to both the file and the event stream.
    ///
    /// File write failures fall back to event-only logging; losing a log
    /// line must not fail the entry being processed.
    pub fn log(&mut self, sink: &EventSink, msg: impl AsRef<str>) {
        let line = format!("[{}] {}", Local::now().format("%Y-%m-%dT%H:%M:%S"), msg.as_ref());
        if writeln!(self.file, "{line}").and_then(|_| self.file.flush()).is_err() {
            sink.emit(Event::LogLine(format!("[ERROR] log write failed: {line}")));
            return;
        }
        sink.emit(Event::LogLine(line));
    }
}

/// Timestamp fragment for report/log file names, shared so one session's
/// outputs sort together.
pub fn file_stamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}
