//! Inbound fetch requests and their validated form.

use serde::{Deserialize, Deserializer, Serialize};

/// Platform tags meaning "look the track up by name".
const SEARCH_PLATFORMS: [&str; 2] = ["spotify", "search"];

const UNKNOWN: &str = "Unknown";

/// Accepts a string or a number for ids coming from clients.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Body of `POST /download`, and one entry of a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadRequest {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    /// Catalog record to patch once the file is uploaded.
    #[serde(default, deserialize_with = "string_or_number")]
    pub track_id: Option<String>,
}

/// Body of `POST /batch`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BatchRequest {
    #[serde(default)]
    pub tracks: Vec<DownloadRequest>,
}

/// How the source of a job is found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobSpec {
    /// A locator the fetch engine can use as is.
    Direct { url: String },
    /// A track named by artist and title, to be looked up.
    Search {
        artist: String,
        title: String,
        platform: Option<String>,
    },
}

impl JobSpec {
    pub fn is_search(&self) -> bool {
        matches!(self, JobSpec::Search { .. })
    }
}

/// A validated fetch job, ready to be queued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadJob {
    pub spec: JobSpec,
    pub artist: String,
    pub title: String,
    pub track_id: Option<String>,
}

/// RFC 3986 scheme: an ASCII letter followed by letters, digits, `+`, `-` or `.`.
fn is_scheme(scheme: &str) -> bool {
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// True for `scheme://rest` locators without whitespace.
fn has_scheme(url: &str) -> bool {
    !url.contains(char::is_whitespace)
        && url
            .split_once("://")
            .is_some_and(|(scheme, rest)| is_scheme(scheme) && !rest.is_empty())
}

impl From<DownloadRequest> for DownloadJob {
    fn from(request: DownloadRequest) -> Self {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        let artist = non_empty(request.artist).unwrap_or_else(|| UNKNOWN.to_string());
        let title = non_empty(request.title).unwrap_or_else(|| UNKNOWN.to_string());
        let platform = non_empty(request.platform).map(|p| p.trim().to_lowercase());
        let url = non_empty(request.url).map(|u| u.trim().to_string());

        let search_origin = platform
            .as_deref()
            .is_some_and(|p| SEARCH_PLATFORMS.contains(&p));

        let spec = match url {
            Some(url) if !search_origin && has_scheme(&url) => JobSpec::Direct { url },
            _ => JobSpec::Search {
                artist: artist.clone(),
                title: title.clone(),
                platform,
            },
        };

        Self {
            spec,
            artist,
            title,
            track_id: non_empty(request.track_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(json: serde_json::Value) -> DownloadJob {
        serde_json::from_value::<DownloadRequest>(json).unwrap().into()
    }

    #[test]
    fn test_direct_url() {
        let job = request(serde_json::json!({
            "url": "https://www.youtube.com/watch?v=abc",
            "title": "Foo",
            "artist": "Bar",
            "platform": "youtube"
        }));
        assert_eq!(
            job.spec,
            JobSpec::Direct {
                url: "https://www.youtube.com/watch?v=abc".to_string()
            }
        );
        assert_eq!(job.artist, "Bar");
    }

    #[test]
    fn test_spotify_is_search_even_with_url() {
        let job = request(serde_json::json!({
            "url": "https://open.spotify.com/track/1",
            "title": "Foo",
            "artist": "Bar",
            "platform": "Spotify"
        }));
        assert!(job.spec.is_search());
    }

    #[test]
    fn test_missing_or_schemeless_url_is_search() {
        assert!(request(serde_json::json!({"title": "Foo"})).spec.is_search());
        assert!(request(serde_json::json!({"url": "Bar - Foo"})).spec.is_search());
        assert!(request(serde_json::json!({"url": "   "})).spec.is_search());
    }

    #[test]
    fn test_option_like_url_is_never_direct() {
        for url in [
            "--exec=touch /tmp/owned x://y",
            "-x://y",
            "--exec=id://y",
            "1http://x.test/a",
            "https://x.test/a --exec=id",
        ] {
            let job = request(serde_json::json!({"url": url, "title": "Foo"}));
            assert!(job.spec.is_search(), "url {:?} was accepted as direct", url);
        }
    }

    #[test]
    fn test_scheme_rules() {
        assert!(has_scheme("https://x.test/a"));
        assert!(has_scheme("svn+ssh://host/repo"));
        assert!(!has_scheme("://x.test"));
        assert!(!has_scheme("https://"));
        assert!(!has_scheme("ht tp://x.test"));
    }

    #[test]
    fn test_defaults_to_unknown() {
        let job = request(serde_json::json!({"url": "https://x.test/a"}));
        assert_eq!(job.artist, "Unknown");
        assert_eq!(job.title, "Unknown");
        assert_eq!(job.track_id, None);
    }

    #[test]
    fn test_numeric_track_id() {
        let job = request(serde_json::json!({"title": "Foo", "track_id": 17}));
        assert_eq!(job.track_id.as_deref(), Some("17"));
    }

    #[test]
    fn test_batch_defaults_to_empty() {
        let batch: BatchRequest = serde_json::from_str("{}").unwrap();
        assert!(batch.tracks.is_empty());
    }
}
