//! Helpers for turning user-supplied names into safe file and object names,
//! and for keeping full paths out of tracing span attributes.

use std::path::Path;

/// Returns only the filename component of a path, for log and span fields.
pub fn redact_path(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}

/// Keeps alphanumerics, spaces, hyphens and underscores, then trims.
///
/// Used for artist/title components of downloaded file names.
pub fn sanitize_component(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Keeps alphanumerics, dots, hyphens, underscores and spaces, then trims.
///
/// Used for object-storage names of watcher-sourced files, where the extension must survive.
pub fn sanitize_object_name(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '.' | '-' | '_' | ' '))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Builds the output file stem for a fetched track.
///
/// `"{artist} - {title}"`, or the title alone when the artist sanitizes to nothing.
/// Returns `None` when both components are empty.
pub fn output_stem(artist: &str, title: &str) -> Option<String> {
    let artist = sanitize_component(artist);
    let title = sanitize_component(title);

    if artist.is_empty() && title.is_empty() {
        None
    } else if artist.is_empty() {
        Some(title)
    } else {
        Some(format!("{} - {}", artist, title))
    }
}

/// Strips the query string from a URL for logging.
pub fn redact_url(url: &str) -> &str {
    url.split_once('?').map(|(base, _)| base).unwrap_or(url)
}
