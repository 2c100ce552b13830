//! Playlist export.
//!
//! [`JsonPlaylistWriter`] is the on-disk [`PlaylistSink`]: one JSON document per
//! playlist holding its name, description and ordered track ids. Writing a
//! playlist that already exists replaces its contents.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SearchError};
use crate::models::SourceId;
use crate::normalize::cache_key;
use crate::safety::validate_output_path;
use crate::sources::{Frontend, PlaylistSink};

/// Marker every export file name carries.
pub const PLAYLIST_PATTERN: &str = "playlist";

pub fn playlist_description(query: &str, repo_url: Option<&str>) -> String {
    let mut description = format!(
        "{query} playlist! Created via an automated script; author does not endorse contents. \
         Sorted in rough order of {query}-ness."
    );
    if let Some(url) = repo_url {
        description.push_str(&format!(" See {} for more details.", url));
    }
    description
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlaylistFile {
    pub name: String,
    pub description: String,
    pub track_ids: Vec<SourceId>,
}

#[derive(Clone, Debug)]
pub struct JsonPlaylistWriter {
    dir: PathBuf,
    frontend: Frontend,
    protected: Vec<PathBuf>,
}

impl JsonPlaylistWriter {
    pub fn new(dir: impl Into<PathBuf>, frontend: Frontend) -> Self {
        Self {
            dir: dir.into(),
            frontend,
            protected: Vec::new(),
        }
    }

    /// Paths the writer must never overwrite (fetched inputs).
    pub fn protecting(mut self, paths: Vec<PathBuf>) -> Self {
        self.protected = paths;
        self
    }

    pub fn playlist_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!(
            "{}_{}_{}.json",
            self.frontend.name(),
            cache_key(name),
            PLAYLIST_PATTERN
        ))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.playlist_path(name).exists()
    }

    pub fn read(path: &Path) -> Result<PlaylistFile> {
        let contents = fs::read_to_string(path).map_err(|source| SearchError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| SearchError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl PlaylistSink for JsonPlaylistWriter {
    fn create_or_replace_playlist(
        &mut self,
        name: &str,
        ordered_ids: &[SourceId],
        description: &str,
    ) -> Result<String> {
        if ordered_ids.is_empty() {
            return Err(SearchError::EmptyExportSet {
                playlist: name.to_string(),
            });
        }

        let path = self.playlist_path(name);
        validate_output_path(&path, PLAYLIST_PATTERN, &self.protected)?;

        if path.exists() {
            tracing::info!("Replacing contents of existing playlist '{}'", name);
        } else {
            tracing::info!("Creating playlist '{}'", name);
        }

        let playlist = PlaylistFile {
            name: name.to_string(),
            description: description.to_string(),
            track_ids: ordered_ids.to_vec(),
        };
        let json = serde_json::to_string_pretty(&playlist).map_err(|source| SearchError::Json {
            path: path.clone(),
            source,
        })?;
        fs::create_dir_all(&self.dir).map_err(|source| SearchError::Io {
            path: self.dir.clone(),
            source,
        })?;
        fs::write(&path, json).map_err(|source| SearchError::Io {
            path: path.clone(),
            source,
        })?;

        tracing::info!("Added {} tracks to '{}'", ordered_ids.len(), path.display());
        Ok(path.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[&str]) -> Vec<SourceId> {
        raw.iter().map(|id| SourceId::new(*id)).collect()
    }

    #[test]
    fn test_playlist_description() {
        let text = playlist_description("love", None);
        assert!(text.starts_with("love playlist!"));
        assert!(text.ends_with("Sorted in rough order of love-ness."));
        assert!(playlist_description("love", Some("https://example.org")).ends_with("See https://example.org for more details."));
    }

    #[test]
    fn test_create_then_replace() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = JsonPlaylistWriter::new(dir.path(), Frontend::Spotify);

        let id = writer
            .create_or_replace_playlist("dont stop", &ids(&["a", "b"]), "first")
            .unwrap();
        assert!(id.ends_with("spotify_dont_stop_playlist.json"));
        assert!(writer.exists("dont stop"));

        writer
            .create_or_replace_playlist("dont stop", &ids(&["c"]), "second")
            .unwrap();
        let stored = JsonPlaylistWriter::read(&writer.playlist_path("dont stop")).unwrap();
        assert_eq!(stored.track_ids, ids(&["c"]));
        assert_eq!(stored.description, "second");
    }

    #[test]
    fn test_empty_export_refused_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = JsonPlaylistWriter::new(dir.path(), Frontend::Spotify);
        let err = writer.create_or_replace_playlist("love", &[], "desc").unwrap_err();
        assert!(err.is_empty_export());
        assert!(!writer.exists("love"));
    }

    #[test]
    fn test_protected_path_refused() {
        let dir = tempfile::tempdir().unwrap();
        let writer = JsonPlaylistWriter::new(dir.path(), Frontend::Spotify);
        let target = writer.playlist_path("love");
        let mut writer = writer.protecting(vec![target]);
        let err = writer
            .create_or_replace_playlist("love", &ids(&["a"]), "desc")
            .unwrap_err();
        assert!(matches!(err, SearchError::UnsafeOutput { .. }));
    }
}
