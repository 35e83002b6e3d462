//! Media-kind knowledge: which local files are worth searching subtitles
//! for.

use std::path::{Path, PathBuf};

/// Extensions treated as video containers.
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "avi", "divx", "flv", "m2ts", "m4v", "mkv", "mov", "mp4", "mpeg", "mpg", "ogm", "ogv", "rm",
    "rmvb", "ts", "vob", "webm", "wmv",
];

/// Whether a path looks like a video file.
pub fn is_video_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            VIDEO_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Video files directly inside `dir` (not recursive), sorted by name.
pub fn find_video_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_video_file(path))
        .collect();
    files.sort();
    Ok(files)
}
