//! Data model for records flowing through the pipeline.
//!
//! Lyrics-source records are parsed as [`RawLyricsTrack`] and enriched into
//! [`ScoredTrack`] once. Catalog records are parsed as [`CatalogTrack`] and keep
//! their raw fields; derived forms are computed from them on demand.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::error::{Result, SearchError};

// ============================================================================
// IDENTIFIERS
// ============================================================================

/// Opaque identifier assigned by a source. Some sources send numbers, others strings.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "IdRepr")]
pub struct SourceId(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum IdRepr {
    Text(String),
    Number(i64),
}

impl From<IdRepr> for SourceId {
    fn from(repr: IdRepr) -> Self {
        match repr {
            IdRepr::Text(s) => SourceId(s),
            IdRepr::Number(n) => SourceId(n.to_string()),
        }
    }
}

impl SourceId {
    pub fn new(id: impl Into<String>) -> Self {
        SourceId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// LYRICS SOURCE
// ============================================================================

/// A lyrics-source entry as cached after fetching.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RawLyricsTrack {
    #[serde(alias = "id")]
    pub track_id: SourceId,
    #[serde(alias = "artist_name")]
    pub artist: String,
    #[serde(alias = "album_name", default)]
    pub album: Option<String>,
    #[serde(alias = "track_name")]
    pub track: String,
    /// Absent when the lyrics body could not be fetched.
    #[serde(default)]
    pub lyrics: Option<String>,
}

/// Windowed excerpt of lyrics around the first query occurrence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LyricsSnippet {
    Window(String),
    /// The query could not be located in the lyrics.
    Missing,
    /// The lyrics contain no words.
    Empty,
}

impl LyricsSnippet {
    pub fn is_window(&self) -> bool {
        matches!(self, LyricsSnippet::Window(_))
    }
}

impl fmt::Display for LyricsSnippet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LyricsSnippet::Window(text) => f.write_str(text),
            LyricsSnippet::Missing => f.write_str("<MISSING>"),
            LyricsSnippet::Empty => f.write_str("<EMPTY>"),
        }
    }
}

impl Serialize for LyricsSnippet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for LyricsSnippet {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Ok(match text.as_str() {
            "<MISSING>" => LyricsSnippet::Missing,
            "<EMPTY>" => LyricsSnippet::Empty,
            _ => LyricsSnippet::Window(text),
        })
    }
}

/// A lyrics-source record after normalization and scoring.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScoredTrack {
    pub track_id: SourceId,
    pub artist: String,
    pub album: String,
    pub track: String,
    pub clean_artist: String,
    pub clean_album: String,
    pub clean_track: String,
    pub clean_lyrics: String,
    pub lyrics_snippet: LyricsSnippet,
    pub num_query_references: usize,
    pub score: f64,
}

// ============================================================================
// CATALOG
// ============================================================================

/// Album release type, from the catalog's `album_type` field.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "String")]
pub enum AlbumType {
    Album,
    Single,
    Compilation,
    #[default]
    Unknown,
}

impl From<Option<String>> for AlbumType {
    fn from(s: Option<String>) -> Self {
        match s.as_deref().map(str::to_ascii_lowercase).as_deref() {
            Some("album") => AlbumType::Album,
            Some("single") => AlbumType::Single,
            Some("compilation") => AlbumType::Compilation,
            _ => AlbumType::Unknown,
        }
    }
}

impl From<AlbumType> for String {
    fn from(t: AlbumType) -> Self {
        t.as_str().to_string()
    }
}

impl AlbumType {
    pub fn as_str(self) -> &'static str {
        match self {
            AlbumType::Album => "album",
            AlbumType::Single => "single",
            AlbumType::Compilation => "compilation",
            AlbumType::Unknown => "unknown",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CatalogArtist {
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CatalogAlbum {
    pub name: String,
    #[serde(default)]
    pub album_type: AlbumType,
}

/// A catalog search result. Field names follow the catalog's track object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CatalogTrack {
    pub id: SourceId,
    pub name: String,
    pub artists: Vec<CatalogArtist>,
    pub album: CatalogAlbum,
    #[serde(default)]
    pub popularity: u32,
    #[serde(default)]
    pub explicit: bool,
}

impl CatalogTrack {
    pub fn artist_names(&self) -> impl Iterator<Item = &str> {
        self.artists.iter().map(|a| a.name.as_str())
    }

    /// "Artist A, Artist B - Title", for logs and reports.
    pub fn display_name(&self) -> String {
        let artists: Vec<&str> = self.artist_names().collect();
        format!("{} - {}", artists.join(", "), self.name)
    }
}

// ============================================================================
// KEYS AND TIERS
// ============================================================================

/// Identity of a recording for deduplication.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum IdentityKey {
    Lyrics { artist: String, track: String },
    /// Artist names are sorted so credit order does not matter.
    Catalog { artists: Vec<String>, track: String },
}

/// How closely a title matches the query. Ordered best first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    Exact,
    Substring,
    NoMatch,
}

// ============================================================================
// STATISTICS
// ============================================================================

/// Counters collected over one pipeline run.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PipelineStats {
    // Lyrics stage
    pub lyrics_fetched: usize,
    pub lyrics_missing: usize,
    pub lyrics_filtered: usize,
    pub lyrics_duplicates: usize,
    pub lyrics_kept: usize,

    // Catalog stage
    pub catalog_fetched: usize,
    pub catalog_filtered: usize,
    pub catalog_duplicates: usize,
    pub catalog_kept: usize,

    // Cross-source matching
    pub lookups: usize,
    pub lookups_unmatched: usize,
    pub lookups_ambiguous: usize,
    pub lookups_failed: usize,

    // Export ordering
    pub tier_exact: usize,
    pub tier_substring: usize,
    pub tier_no_match: usize,
    pub exported: usize,

    pub elapsed_secs: f64,
}

impl PipelineStats {
    /// Percentage of lookups that found a catalog entry
    pub fn match_rate(&self) -> f64 {
        if self.lookups == 0 {
            0.0
        } else {
            let matched = self
                .lookups
                .saturating_sub(self.lookups_unmatched + self.lookups_failed);
            100.0 * matched as f64 / self.lookups as f64
        }
    }

    pub fn record_tier(&mut self, tier: MatchTier) {
        match tier {
            MatchTier::Exact => self.tier_exact += 1,
            MatchTier::Substring => self.tier_substring += 1,
            MatchTier::NoMatch => self.tier_no_match += 1,
        }
    }

    /// Log stats at info level in JSON format
    pub fn log_phase(&self, phase: &str) {
        if let Ok(json) = serde_json::to_string_pretty(self) {
            tracing::info!("[STATS:{}]\n{}", phase, json);
        }
    }

    /// Write stats to a JSON file
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|source| SearchError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, json).map_err(|source| SearchError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
