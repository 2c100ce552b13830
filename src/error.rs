//! Error taxonomy for the search pipeline.
//!
//! Validation and configuration errors (unsupported backend, empty export set)
//! are fatal. Upstream page failures are local to pagination and handled per
//! [`crate::config::ErrorPolicy`]. Per-record anomalies never surface here:
//! a record without lyrics is dropped, a query that cannot be located in the
//! lyrics degrades to a snippet sentinel.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used across the library.
pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Debug, Error)]
pub enum SearchError {
    /// A paginated source answered with a non-success status.
    #[error("{source_name} responded with status {status} for page {page}")]
    UpstreamStatus {
        source_name: String,
        page: usize,
        status: u16,
    },

    /// The lyrics body for a track could not be obtained; the track cannot be scored.
    #[error("no lyrics available for track {track_id}")]
    MissingLyrics { track_id: String },

    /// Nothing survived to the export stage. No playlist is touched.
    #[error("refusing to create empty playlist '{playlist}'; no changes have been made")]
    EmptyExportSet { playlist: String },

    #[error("unsupported backend '{0}' (expected one of: musixmatch, spotify)")]
    UnsupportedBackend(String),

    #[error("unsupported frontend '{0}' (expected one of: spotify)")]
    UnsupportedFrontend(String),

    /// A cache file required for an offline run does not exist.
    #[error("cache file '{}' does not exist", path.display())]
    CacheMiss { path: PathBuf },

    /// An export target collides with an input or cache file.
    #[error("unsafe output path '{}': {reason}", path.display())]
    UnsafeOutput { path: PathBuf, reason: String },

    /// A sentence playlist cannot be built because some words have no track.
    #[error("no results for the following words (cannot proceed): {}", words.join(", "))]
    UnmatchedWords { words: Vec<String> },

    /// A confirmation prompt received no usable answer.
    #[error("no valid answer after {attempts} attempts")]
    InvalidResponse { attempts: usize },

    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in '{}': {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl SearchError {
    /// True for errors that end the run without having modified any destination.
    pub fn is_empty_export(&self) -> bool {
        matches!(self, SearchError::EmptyExportSet { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_export_message() {
        let err = SearchError::EmptyExportSet {
            playlist: "love_raw".to_string(),
        };
        assert!(err.is_empty_export());
        assert!(err.to_string().contains("refusing to create empty playlist 'love_raw'"));
    }

    #[test]
    fn test_unmatched_words_message() {
        let err = SearchError::UnmatchedWords {
            words: vec!["zzz".to_string(), "qqq".to_string()],
        };
        assert!(!err.is_empty_export());
        assert!(err.to_string().ends_with("(cannot proceed): zzz, qqq"));
    }

    #[test]
    fn test_upstream_status_message() {
        let err = SearchError::UpstreamStatus {
            source_name: "musixmatch".to_string(),
            page: 3,
            status: 401,
        };
        assert!(!err.is_empty_export());
        assert_eq!(err.to_string(), "musixmatch responded with status 401 for page 3");
    }
}
