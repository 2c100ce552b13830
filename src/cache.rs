//! On-disk JSON cache of fetched and derived results.
//!
//! Files are named `<source>_<cache_key>_<stage>.json` inside the output
//! directory, so re-running a query reuses earlier stages.

use std::fs;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Result, SearchError};
use crate::models::CatalogTrack;
use crate::normalize::cache_key;
use crate::sources::CatalogSearch;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheStage {
    /// Raw search results as fetched.
    TrackList,
    /// Scored, filtered and deduplicated lyrics results.
    SearchResults,
    /// Catalog lookups keyed by their free-text query.
    MatchCache,
    /// Export report.
    Final,
    Stats,
}

impl CacheStage {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheStage::TrackList => "track_list",
            CacheStage::SearchResults => "search_results",
            CacheStage::MatchCache => "match_cache",
            CacheStage::Final => "final",
            CacheStage::Stats => "stats",
        }
    }

    /// Stages holding fetched data that cannot be regenerated offline.
    pub fn is_input(self) -> bool {
        matches!(self, CacheStage::TrackList | CacheStage::MatchCache)
    }
}

pub const ALL_STAGES: [CacheStage; 5] = [
    CacheStage::TrackList,
    CacheStage::SearchResults,
    CacheStage::MatchCache,
    CacheStage::Final,
    CacheStage::Stats,
];

#[derive(Clone, Debug)]
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, source: &str, query: &str, stage: CacheStage) -> PathBuf {
        self.root
            .join(format!("{}_{}_{}.json", source, cache_key(query), stage.as_str()))
    }

    /// Every input-stage file name for `query`, across `sources`.
    pub fn input_paths(&self, sources: &[&str], query: &str) -> Vec<PathBuf> {
        sources
            .iter()
            .flat_map(|source| {
                ALL_STAGES
                    .iter()
                    .filter(|stage| stage.is_input())
                    .map(move |stage| self.path(source, query, *stage))
            })
            .collect()
    }

    /// Load a cache file. A missing file is a [`SearchError::CacheMiss`].
    pub fn load<T: DeserializeOwned>(&self, path: &Path) -> Result<T> {
        if !path.exists() {
            return Err(SearchError::CacheMiss {
                path: path.to_path_buf(),
            });
        }
        let contents = fs::read_to_string(path).map_err(|source| SearchError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| SearchError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| SearchError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let json = serde_json::to_string_pretty(value).map_err(|source| SearchError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json).map_err(|source| SearchError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!("Wrote {}", path.display());
        Ok(())
    }

    /// Return the cached value if present, otherwise fetch, save and return it.
    pub fn load_or_fetch<T, F>(&self, path: &Path, fetch: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Result<T>,
    {
        if path.exists() {
            tracing::info!("Using cached results from {}", path.display());
            return self.load(path);
        }
        let value = fetch()?;
        self.save(path, &value)?;
        Ok(value)
    }
}

/// Catalog search answered from a `match_cache` file.
///
/// Queries absent from the file yield no results and are reported as unmatched.
#[derive(Debug, Default)]
pub struct CachedCatalogSearch {
    entries: FxHashMap<String, Vec<CatalogTrack>>,
}

impl CachedCatalogSearch {
    pub fn load(store: &CacheStore, path: &Path) -> Result<Self> {
        let entries = match store.load(path) {
            Ok(entries) => entries,
            Err(SearchError::CacheMiss { path }) => {
                tracing::warn!("No catalog lookups cached at {}", path.display());
                FxHashMap::default()
            }
            Err(err) => return Err(err),
        };
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CatalogSearch for CachedCatalogSearch {
    fn search(&self, query: &str) -> Result<Vec<CatalogTrack>> {
        match self.entries.get(query) {
            Some(results) => Ok(results.clone()),
            None => {
                tracing::debug!("No cached catalog lookup for '{}'", query);
                Ok(Vec::new())
            }
        }
    }
}

/// Catalog search answered from per-query `track_list` files of one source.
///
/// Used where each search term has its own fetched result file, e.g. one per
/// word of a sentence playlist. A term without a file yields no results.
#[derive(Clone, Debug)]
pub struct CachedTrackLists {
    store: CacheStore,
    source: String,
}

impl CachedTrackLists {
    pub fn new(store: CacheStore, source: impl Into<String>) -> Self {
        Self {
            store,
            source: source.into(),
        }
    }
}

impl CatalogSearch for CachedTrackLists {
    fn search(&self, query: &str) -> Result<Vec<CatalogTrack>> {
        let path = self.store.path(&self.source, query, CacheStage::TrackList);
        match self.store.load(&path) {
            Ok(results) => Ok(results),
            Err(SearchError::CacheMiss { path }) => {
                tracing::debug!("No cached results for '{}' at {}", query, path.display());
                Ok(Vec::new())
            }
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AlbumType, CatalogAlbum, CatalogArtist, SourceId};
    use std::cell::Cell;

    fn entry(id: &str) -> CatalogTrack {
        CatalogTrack {
            id: SourceId::new(id),
            name: "Love".to_string(),
            artists: vec![CatalogArtist { name: "A".to_string() }],
            album: CatalogAlbum {
                name: "Album".to_string(),
                album_type: AlbumType::Single,
            },
            popularity: 1,
            explicit: false,
        }
    }

    #[test]
    fn test_cache_path_layout() {
        let store = CacheStore::new("/tmp/results");
        assert_eq!(
            store.path("musixmatch", "dont stop", CacheStage::TrackList),
            PathBuf::from("/tmp/results/musixmatch_dont_stop_track_list.json")
        );
    }

    #[test]
    fn test_load_missing_is_cache_miss() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path());
        let path = store.path("spotify", "love", CacheStage::TrackList);
        let err = store.load::<Vec<CatalogTrack>>(&path).unwrap_err();
        assert!(matches!(err, SearchError::CacheMiss { .. }));
    }

    #[test]
    fn test_load_or_fetch_short_circuits() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path().join("nested"));
        let path = store.path("spotify", "love", CacheStage::TrackList);
        let calls = Cell::new(0);
        let fetch = || {
            calls.set(calls.get() + 1);
            Ok(vec![entry("a")])
        };

        let first: Vec<CatalogTrack> = store.load_or_fetch(&path, fetch).unwrap();
        let second: Vec<CatalogTrack> = store.load_or_fetch(&path, fetch).unwrap();
        assert_eq!(first, second);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_invalid_json_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path());
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = store.load::<Vec<CatalogTrack>>(&path).unwrap_err();
        assert!(matches!(err, SearchError::Json { .. }));
    }

    #[test]
    fn test_cached_catalog_search() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path());
        let path = store.path("spotify", "love", CacheStage::MatchCache);
        let mut lookups: FxHashMap<String, Vec<CatalogTrack>> = FxHashMap::default();
        lookups.insert("A Love".to_string(), vec![entry("a")]);
        store.save(&path, &lookups).unwrap();

        let search = CachedCatalogSearch::load(&store, &path).unwrap();
        assert_eq!(search.len(), 1);
        assert_eq!(search.search("A Love").unwrap().len(), 1);
        assert!(search.search("B Love").unwrap().is_empty());

        let missing = store.path("spotify", "other", CacheStage::MatchCache);
        assert!(CachedCatalogSearch::load(&store, &missing).unwrap().is_empty());
    }

    #[test]
    fn test_cached_track_lists_per_term() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path());
        store
            .save(&store.path("spotify", "love", CacheStage::TrackList), &vec![entry("a"), entry("b")])
            .unwrap();

        let search = CachedTrackLists::new(store, "spotify");
        assert_eq!(search.search("love").unwrap().len(), 2);
        assert!(search.search("hate").unwrap().is_empty());
    }

    #[test]
    fn test_input_paths() {
        let store = CacheStore::new("out");
        let paths = store.input_paths(&["spotify"], "love");
        assert_eq!(
            paths,
            vec![
                PathBuf::from("out/spotify_love_track_list.json"),
                PathBuf::from("out/spotify_love_match_cache.json"),
            ]
        );
    }
}
