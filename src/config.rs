//! Run configuration.
//!
//! Two layers, merged front-end-side before a run starts:
//!
//! - [`MergeConfig`] — the optional `merge.toml` file. Sparse: override
//!   just the values you want. Unknown keys are rejected to catch typos
//!   early.
//! - [`RunOptions`] — the fully resolved inputs the orchestrator works
//!   from: source, the three destination directories, behavior toggles,
//!   and the exiftool command.
//!
//! ```toml
//! # merge.toml — all keys optional, defaults shown
//! exiftool = "exiftool"       # command name or explicit path
//! results_dir = "Takeout-Results"
//! preserve_tree = true        # recreate source-relative paths in output
//! overwrite = true            # let exiftool rewrite files in place
//! ```
//!
//! When no destinations are given, they derive from the source's parent:
//! `<source>/../<results_dir>/{Completed,Failed,Logs}` — which keeps the
//! results out of the source tree, so re-running over the source (or over
//! a previous run's Failed tree, the retry path) never re-scans its own
//! output.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Sparse file-level configuration (`merge.toml`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MergeConfig {
    /// Exiftool command name or explicit path.
    pub exiftool: String,
    /// Name of the results directory derived next to the source.
    pub results_dir: String,
    /// Recreate source-relative paths under the destination roots.
    pub preserve_tree: bool,
    /// Pass `-overwrite_original`; otherwise exiftool keeps backups.
    pub overwrite: bool,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            exiftool: default_exiftool(),
            results_dir: "Takeout-Results".to_string(),
            preserve_tree: true,
            overwrite: true,
        }
    }
}

fn default_exiftool() -> String {
    if cfg!(windows) { "exiftool.exe" } else { "exiftool" }.to_string()
}

/// Load `merge.toml` from an explicit path; a missing file means defaults.
pub fn load_config(path: &Path) -> Result<MergeConfig, ConfigError> {
    if !path.exists() {
        return Ok(MergeConfig::default());
    }
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// The three destination roots of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destinations {
    pub completed: PathBuf,
    pub failed: PathBuf,
    pub logs: PathBuf,
}

/// Derive default destinations next to the source folder.
pub fn default_destinations(source: &Path, results_dir: &str) -> Destinations {
    let results = source
        .parent()
        .map(|p| p.join(results_dir))
        .unwrap_or_else(|| PathBuf::from(results_dir));
    Destinations {
        completed: results.join("Completed"),
        failed: results.join("Failed"),
        logs: results.join("Logs"),
    }
}

/// Fully resolved inputs for one pipeline run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub source: PathBuf,
    pub completed: PathBuf,
    pub failed: PathBuf,
    pub logs: PathBuf,
    pub preserve_tree: bool,
    pub overwrite: bool,
    pub dry_run: bool,
    pub exiftool: String,
}

impl RunOptions {
    /// Options for `source` with config defaults and derived destinations.
    pub fn new(source: PathBuf, config: &MergeConfig) -> Self {
        let destinations = default_destinations(&source, &config.results_dir);
        Self {
            source,
            completed: destinations.completed,
            failed: destinations.failed,
            logs: destinations.logs,
            preserve_tree: config.preserve_tree,
            overwrite: config.overwrite,
            dry_run: false,
            exiftool: config.exiftool.clone(),
        }
    }
}
