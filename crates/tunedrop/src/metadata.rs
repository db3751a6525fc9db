//! Best-effort artist/title extraction from a file path.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

/// Separators tried in order between artist and title in a file stem.
const SEPARATORS: [&str; 3] = [" - ", " – ", "_-_"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackMetadata {
    pub artist: String,
    pub title: String,
}

/// Derives (artist, title) for a file found under `root`.
///
/// `"Artist - Title.ext"` splits on the first separator when both halves are
/// non-empty. Otherwise the parent directory names the artist, unless the
/// file sits directly in `root`.
pub fn extract_track_metadata(path: &Path, root: &Path) -> TrackMetadata {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().trim().to_string())
        .unwrap_or_default();

    for separator in SEPARATORS {
        if let Some((artist, title)) = stem.split_once(separator) {
            let (artist, title) = (artist.trim(), title.trim());
            if !artist.is_empty() && !title.is_empty() {
                return TrackMetadata {
                    artist: artist.to_string(),
                    title: title.to_string(),
                };
            }
        }
    }

    // Watcher events carry absolute paths while a rescan yields paths under the
    // configured root, which may be relative.
    let root = absolute(root);
    let path = absolute(path);
    let artist = path
        .parent()
        .filter(|parent| *parent != root)
        .and_then(|parent| parent.file_name())
        .map(|name| name.to_string_lossy().trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| UNKNOWN_ARTIST.to_string());

    TrackMetadata {
        artist,
        title: stem,
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOT: &str = "/music/TunePat";

    fn extract(path: &str) -> TrackMetadata {
        extract_track_metadata(Path::new(path), Path::new(ROOT))
    }

    #[test]
    fn test_artist_dash_title() {
        let meta = extract("/music/TunePat/Artist - Title.mp3");
        assert_eq!(meta.artist, "Artist");
        assert_eq!(meta.title, "Title");
    }

    #[test]
    fn test_splits_on_first_separator_only() {
        let meta = extract("/music/TunePat/Daft Punk - One More Time - Radio Edit.flac");
        assert_eq!(meta.artist, "Daft Punk");
        assert_eq!(meta.title, "One More Time - Radio Edit");
    }

    #[test]
    fn test_en_dash_and_underscore_separators() {
        assert_eq!(extract("/music/TunePat/A – B.wav").artist, "A");
        let meta = extract("/music/TunePat/Some_Artist_-_Some_Song.m4a");
        assert_eq!(meta.artist, "Some_Artist");
        assert_eq!(meta.title, "Some_Song");
    }

    #[test]
    fn test_parent_directory_is_artist() {
        let meta = extract("/music/TunePat/Radiohead/Creep.mp3");
        assert_eq!(meta.artist, "Radiohead");
        assert_eq!(meta.title, "Creep");
    }

    #[test]
    fn test_file_in_root_is_unknown_artist() {
        let meta = extract("/music/TunePat/Creep.mp3");
        assert_eq!(meta.artist, UNKNOWN_ARTIST);
        assert_eq!(meta.title, "Creep");
    }

    #[test]
    fn test_relative_root_matches_absolute_event_path() {
        let cwd = std::env::current_dir().unwrap();
        let root = Path::new("music");

        let from_scan = extract_track_metadata(Path::new("music/Creep.mp3"), root);
        let from_event = extract_track_metadata(&cwd.join("music/Creep.mp3"), root);
        assert_eq!(from_scan, from_event);
        assert_eq!(from_event.artist, UNKNOWN_ARTIST);

        let nested = extract_track_metadata(&cwd.join("music/Radiohead/Creep.mp3"), root);
        assert_eq!(nested.artist, "Radiohead");
    }

    #[test]
    fn test_dot_prefixed_root_is_the_same_root() {
        let meta = extract_track_metadata(Path::new("music/Creep.mp3"), Path::new("./music"));
        assert_eq!(meta.artist, UNKNOWN_ARTIST);
    }

    #[test]
    fn test_empty_half_falls_back() {
        let meta = extract("/music/TunePat/ - Intro.mp3");
        assert_eq!(meta.artist, UNKNOWN_ARTIST);
        assert_eq!(meta.title, "- Intro");
    }
}
