//! Shared test utilities for the takeout-merge test suite.
//!
//! Builders for synthetic Takeout trees (media files plus sidecar JSON)
//! and a channel-backed event sink, used by the plan, merge, and
//! orchestrator tests.

use crate::events::{Event, EventSink};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};

/// Event sink wired to a receiver the test can drain.
pub fn run_sink() -> (EventSink, Receiver<Event>) {
    let (tx, rx) = mpsc::channel();
    (EventSink::new(tx), rx)
}

/// Write a fake media file (content is irrelevant to the pipeline).
pub fn write_media(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, b"fake media bytes").unwrap();
    path
}

/// Write an exact-match sidecar (`<name>.json`) with plausible content.
pub fn write_sidecar(dir: &Path, media_name: &str) -> PathBuf {
    write_sidecar_with(dir, media_name, &takeout_sidecar(1681564222, "test shot"))
}

/// Write an exact-match sidecar with the given JSON content.
pub fn write_sidecar_with(dir: &Path, media_name: &str, content: &str) -> PathBuf {
    let path = dir.join(format!("{media_name}.json"));
    fs::write(&path, content).unwrap();
    path
}

/// A minimal but realistic Takeout sidecar document.
pub fn takeout_sidecar(timestamp: i64, description: &str) -> String {
    format!(
        r#"{{
  "title": "test",
  "description": "{description}",
  "photoTakenTime": {{"timestamp": "{timestamp}"}},
  "geoData": {{"latitude": 52.5, "longitude": 13.4, "altitude": 34.0}},
  "people": [{{"name": "Alice"}}]
}}"#
    )
}

/// Collect every file under `root`, relative to it, sorted.
pub fn relative_files(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in fs::read_dir(&dir).unwrap().filter_map(|e| e.ok()) {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else {
                files.push(path.strip_prefix(root).unwrap().to_path_buf());
            }
        }
    }
    files.sort();
    files
}
