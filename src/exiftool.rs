//! External metadata tool invocation.
//!
//! The [`MetadataTool`] trait defines the two operations the merge stage
//! needs: an availability probe (run before any file is touched) and a
//! synchronous write of one file's metadata. The production implementation
//! is [`ExifTool`], a black-box subprocess: argument vector in, exit code
//! out, captured output surfaced verbatim in failure messages.
//!
//! ## Argument layout
//!
//! [`build_args`] is a pure function from a normalized field set to the
//! exiftool argument vector:
//!
//! ```text
//! [-overwrite_original] -P -m -n
//! [-DateTimeOriginal=Y:M:D H:M:S -CreateDate=… -ModifyDate=…]
//! [-GPSLatitude=… -GPSLongitude=… [-GPSAltitude=…]]
//! [-XMP:Description=… -IPTC:Caption-Abstract=…]
//! [-XMP:Subject= -XMP:Subject+=kw …]
//! <target>
//! ```
//!
//! `-m -n` (ignore minor errors, numeric output) keep GPS and keyword
//! values round-tripping exactly; `-P` leaves the file's mtime to the
//! explicit `-ModifyDate` write. Capture time is written to all three date
//! fields at once so importers that read any one of them agree. The
//! description lands in both the XMP and IPTC caption tags for the same
//! reason. Keywords are cleared then appended one at a time — bulk array
//! assignment truncates on some exiftool versions.

use crate::metadata::MetadataFields;
use chrono::DateTime;
use std::ffi::OsString;
use std::path::Path;
use std::process::Command;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("could not launch {command}: {source}")]
    Launch {
        command: String,
        source: std::io::Error,
    },
    #[error("{command} failed ({status}): {detail}")]
    Failed {
        command: String,
        status: String,
        detail: String,
    },
}

/// Writes a normalized field set into a media file's embedded tags.
pub trait MetadataTool {
    /// Probe that the tool can run at all. Called once per merge session,
    /// before any file is modified.
    fn check_available(&self) -> Result<(), ToolError>;

    /// Write `fields` into `target`, synchronously.
    fn write(&self, fields: &MetadataFields, target: &Path) -> Result<(), ToolError>;
}

/// Build the exiftool argument vector for one target file.
///
/// Pure: no I/O, deterministic for a given field set. The target path is
/// always the final argument. A capture time outside chrono's representable
/// range drops the date arguments rather than failing the whole entry.
pub fn build_args(overwrite: bool, fields: &MetadataFields, target: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::new();
    let mut push = |s: String| args.push(OsString::from(s));

    if overwrite {
        push("-overwrite_original".into());
    }
    push("-P".into());
    push("-m".into());
    push("-n".into());

    if let Some(stamp) = fields.captured_at.and_then(format_capture_time) {
        push(format!("-DateTimeOriginal={stamp}"));
        push(format!("-CreateDate={stamp}"));
        push(format!("-ModifyDate={stamp}"));
    }

    if let (Some(lat), Some(lon)) = (fields.latitude, fields.longitude) {
        push(format!("-GPSLatitude={lat}"));
        push(format!("-GPSLongitude={lon}"));
        if let Some(alt) = fields.altitude {
            push(format!("-GPSAltitude={alt}"));
        }
    }

    if let Some(desc) = &fields.description {
        push(format!("-XMP:Description={desc}"));
        push(format!("-IPTC:Caption-Abstract={desc}"));
    }

    if !fields.keywords.is_empty() && overwrite {
        push("-XMP:Subject=".into());
    }
    for keyword in &fields.keywords {
        push(format!("-XMP:Subject+={keyword}"));
    }

    args.push(target.as_os_str().to_os_string());
    args
}

/// Epoch seconds → exiftool's `YYYY:MM:DD HH:MM:SS` in UTC.
fn format_capture_time(epoch: i64) -> Option<String> {
    DateTime::from_timestamp(epoch, 0).map(|dt| dt.format("%Y:%m:%d %H:%M:%S").to_string())
}

/// The real exiftool subprocess.
#[derive(Debug, Clone)]
pub struct ExifTool {
    command: String,
    overwrite: bool,
}

impl ExifTool {
    pub fn new(command: impl Into<String>, overwrite: bool) -> Self {
        Self {
            command: command.into(),
            overwrite,
        }
    }

    fn run(&self, args: &[OsString]) -> Result<(), ToolError> {
        let output = Command::new(&self.command)
            .args(args)
            .output()
            .map_err(|source| ToolError::Launch {
                command: self.command.clone(),
                source,
            })?;
        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        let detail = match stderr.trim() {
            "" => stdout.trim().to_string(),
            err => err.to_string(),
        };
        Err(ToolError::Failed {
            command: self.command.clone(),
            status: output.status.to_string(),
            detail,
        })
    }
}

impl MetadataTool for ExifTool {
    fn check_available(&self) -> Result<(), ToolError> {
        self.run(&[OsString::from("-ver")])
    }

    fn write(&self, fields: &MetadataFields, target: &Path) -> Result<(), ToolError> {
        self.run(&build_args(self.overwrite, fields, target))
    }
}
