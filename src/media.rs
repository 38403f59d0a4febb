//! Media file classification.
//!
//! Pure predicates over paths, shared by the plan and merge stages. A file
//! is classified by its extension alone (case-insensitive); the fixed sets
//! below mirror what Google Takeout exports actually contain.
//!
//! Album-level JSON files (`metadata.json`, `album.json`) describe a whole
//! album, not a single media file, and must never be picked up as sidecars.

use std::path::Path;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "heic", "dng", "tif", "tiff", "webp"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "m4v"];
const ALBUM_JSON_NAMES: &[&str] = &["metadata.json", "album.json"];

fn extension_of(path: &Path) -> Option<String> {
    path.extension().map(|e| e.to_string_lossy().to_lowercase())
}

/// True if the path has an image extension.
pub fn is_image(path: &Path) -> bool {
    extension_of(path).is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

/// True if the path has a video extension.
pub fn is_video(path: &Path) -> bool {
    extension_of(path).is_some_and(|ext| VIDEO_EXTENSIONS.contains(&ext.as_str()))
}

/// True if the path has any media extension (image or video).
pub fn is_media(path: &Path) -> bool {
    is_image(path) || is_video(path)
}

/// True if the path is an album-level JSON file (never a per-file sidecar).
pub fn is_album_json(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .is_some_and(|name| ALBUM_JSON_NAMES.contains(&name.as_str()))
}
