//! Sidecar JSON resolution.
//!
//! Each media file exported by Google Takeout *should* travel with a JSON
//! sidecar named by appending `.json` to the full filename
//! (`photo.jpg` → `photo.jpg.json`). In practice exports are messier:
//! Takeout appends counters (`photo.jpg(1).json`), truncates long names,
//! and drops album-level `metadata.json` files into the same directories.
//!
//! Resolution order:
//! 1. The exact `<filename>.json` sibling, if it exists.
//! 2. Otherwise, among sibling files matching `<stem>*.json` (excluding
//!    album-level JSON), the one with the shortest name — the least
//!    decorated candidate is the base match. Ties break lexically.
//!
//! The fallback scans a sorted directory listing, so the result is
//! deterministic for a fixed filesystem snapshot.

use crate::media;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Locate the best-matching JSON sidecar for a media file.
///
/// Returns `None` when no candidate exists or the directory cannot be
/// listed; a missing sidecar is an expected per-file condition, not an
/// error, and is classified downstream by the merge stage.
pub fn find_sidecar(media_path: &Path) -> Option<PathBuf> {
    let file_name = media_path.file_name()?;
    let mut exact_name = OsString::from(file_name);
    exact_name.push(".json");
    let exact = media_path.with_file_name(&exact_name);
    if exact.exists() {
        return Some(exact);
    }

    let stem = media_path.file_stem()?.to_string_lossy().to_string();
    let parent = media_path.parent()?;
    let mut candidates: Vec<String> = std::fs::read_dir(parent)
        .ok()?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|e| e.file_name().to_string_lossy().to_string())
        .filter(|name| name.starts_with(&stem) && name.to_lowercase().ends_with(".json"))
        .filter(|name| !media::is_album_json(Path::new(name)))
        .collect();

    candidates.sort();
    candidates.sort_by_key(|name| name.len());
    candidates.first().map(|name| parent.join(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, b"x").unwrap();
        path
    }

    #[test]
    fn exact_match_wins_over_decorated_variant() {
        let tmp = TempDir::new().unwrap();
        let media = touch(tmp.path(), "photo.jpg");
        let exact = touch(tmp.path(), "photo.jpg.json");
        touch(tmp.path(), "photo.jpg(1).json");

        assert_eq!(find_sidecar(&media), Some(exact));
    }

    #[test]
    fn falls_back_to_shortest_stem_match() {
        let tmp = TempDir::new().unwrap();
        let media = touch(tmp.path(), "photo.jpg");
        touch(tmp.path(), "photo.jpg(1).json");
        let short = touch(tmp.path(), "photo.json");

        assert_eq!(find_sidecar(&media), Some(short));
    }

    #[test]
    fn equal_length_candidates_break_lexically() {
        let tmp = TempDir::new().unwrap();
        let media = touch(tmp.path(), "photo.jpg");
        touch(tmp.path(), "photo.b.json");
        let first = touch(tmp.path(), "photo.a.json");

        assert_eq!(find_sidecar(&media), Some(first));
    }

    #[test]
    fn album_json_is_never_a_sidecar() {
        let tmp = TempDir::new().unwrap();
        // "metadata.json" starts with the stem of "metadata.jpg"
        let media = touch(tmp.path(), "metadata.jpg");
        touch(tmp.path(), "metadata.json");

        assert_eq!(find_sidecar(&media), None);
    }

    #[test]
    fn none_when_no_candidate_exists() {
        let tmp = TempDir::new().unwrap();
        let media = touch(tmp.path(), "photo.jpg");
        touch(tmp.path(), "other.jpg.json");

        assert_eq!(find_sidecar(&media), None);
    }

    #[test]
    fn candidate_must_share_the_stem_prefix() {
        let tmp = TempDir::new().unwrap();
        let media = touch(tmp.path(), "IMG_0001.jpg");
        let sidecar = touch(tmp.path(), "IMG_0001.jpg.supplemental-metadata.json");
        touch(tmp.path(), "IMG_0002.jpg.json");

        assert_eq!(find_sidecar(&media), Some(sidecar));
    }

    #[test]
    fn subdirectories_are_ignored() {
        let tmp = TempDir::new().unwrap();
        let media = touch(tmp.path(), "photo.jpg");
        fs::create_dir(tmp.path().join("photo.dir.json")).unwrap();

        assert_eq!(find_sidecar(&media), None);
    }
}
