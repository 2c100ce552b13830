//! Per-word "sentence" playlists.
//!
//! The query is split into words and every word is matched to a catalog track
//! titled exactly that word, so reading the playlist's titles in order spells
//! the query. Matches are remembered per word in a [`WordDb`] shared across
//! runs, so common words are only searched once.

use std::collections::BTreeMap;
use std::path::Path;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::cache::CacheStore;
use crate::error::{Result, SearchError};
use crate::models::{CatalogTrack, SourceId};
use crate::normalize::{fold_to_ascii, normalize_query, WHITESPACE};
use crate::sources::{CatalogSearch, SimilarityOracle};

pub const DEFAULT_MAX_TRACKS_PER_WORD: usize = 5;
/// Results analyzed before giving up on a word that already has a match.
pub const DEFAULT_SOFT_RESULT_LIMIT: usize = 1000;
/// Results analyzed before giving up on a word regardless.
pub const DEFAULT_HARD_RESULT_LIMIT: usize = 5000;
pub const WORD_DB_FILE: &str = "db.json";

const ANALYZED_LOG_INTERVAL: usize = 1000;

#[derive(Clone, Debug, PartialEq)]
pub struct SentenceConfig {
    pub max_tracks_per_word: usize,
    pub soft_result_limit: usize,
    pub hard_result_limit: usize,
    pub allow_explicit: bool,
    pub normalize_query: bool,
}

impl Default for SentenceConfig {
    fn default() -> Self {
        Self {
            max_tracks_per_word: DEFAULT_MAX_TRACKS_PER_WORD,
            soft_result_limit: DEFAULT_SOFT_RESULT_LIMIT,
            hard_result_limit: DEFAULT_HARD_RESULT_LIMIT,
            allow_explicit: false,
            normalize_query: true,
        }
    }
}

pub fn sentence_description(repo_url: Option<&str>) -> String {
    let mut description =
        "Created via an automated script; author does not endorse song contents.".to_string();
    if let Some(url) = repo_url {
        description.push_str(&format!(" See {} for more details.", url));
    }
    description
}

// ============================================================================
// WORD DATABASE
// ============================================================================

/// Known tracks per lowercase word.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WordDb {
    entries: BTreeMap<String, Vec<CatalogTrack>>,
}

impl WordDb {
    /// Load the database. A missing file is an empty database.
    pub fn load(store: &CacheStore, path: &Path) -> Result<Self> {
        match store.load(path) {
            Ok(db) => Ok(db),
            Err(SearchError::CacheMiss { .. }) => {
                tracing::info!("No word database at {}; starting empty", path.display());
                Ok(Self::default())
            }
            Err(err) => Err(err),
        }
    }

    pub fn save(&self, store: &CacheStore, path: &Path) -> Result<()> {
        store.save(path, self)
    }

    pub fn get(&self, word: &str) -> Option<&[CatalogTrack]> {
        self.entries.get(&word.to_lowercase()).map(Vec::as_slice)
    }

    pub fn insert(&mut self, word: &str, tracks: Vec<CatalogTrack>) {
        self.entries.insert(word.to_lowercase(), tracks);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// MATCHING
// ============================================================================

/// Words of the query, normalized first unless disabled.
pub fn sentence_words(query: &str, normalize: bool) -> Vec<String> {
    let text = if normalize {
        let normalized = normalize_query(query);
        if normalized != query {
            tracing::warn!("Normalized '{}' to '{}'", query, normalized);
        }
        normalized
    } else {
        query.trim().to_string()
    };
    WHITESPACE
        .split(&text)
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

struct ExactMatch {
    raw_ratio: u8,
    folded_ratio: u8,
    track: CatalogTrack,
}

/// Tracks titled exactly `word` (case and accents ignored), best first.
///
/// Results are consumed lazily and scanning stops once `max_tracks_per_word`
/// distinct (artists, title) matches are found, once `soft_result_limit`
/// results have been analyzed with at least one match, or once
/// `hard_result_limit` results have been analyzed. Ranked by similarity of the
/// raw title, then of the folded title, then popularity.
pub fn exact_title_matches<I>(
    word: &str,
    results: I,
    config: &SentenceConfig,
    similarity: &dyn SimilarityOracle,
) -> Vec<CatalogTrack>
where
    I: IntoIterator<Item = CatalogTrack>,
{
    let target = fold_to_ascii(word);
    let mut matches: Vec<ExactMatch> = Vec::new();
    let mut index: FxHashMap<(Vec<String>, String), usize> = FxHashMap::default();
    let mut analyzed = 0;

    for track in results {
        analyzed += 1;
        if analyzed % ANALYZED_LOG_INTERVAL == 0 {
            tracing::info!("'{}': {} exact matches after {} results", word, matches.len(), analyzed);
        }

        let folded = fold_to_ascii(&track.name);
        if folded == target {
            if track.explicit && !config.allow_explicit {
                tracing::debug!("Skipping explicit track {} ({})", track.display_name(), track.id);
            } else {
                let mut artists: Vec<String> = track.artist_names().map(str::to_string).collect();
                artists.sort();
                let candidate = ExactMatch {
                    raw_ratio: similarity.similarity(&track.name, word),
                    folded_ratio: similarity.similarity(&folded, &target),
                    track,
                };
                match index.get(&(artists.clone(), candidate.track.name.clone())) {
                    Some(&slot) => matches[slot] = candidate,
                    None => {
                        index.insert((artists, candidate.track.name.clone()), matches.len());
                        matches.push(candidate);
                    }
                }
            }
        }

        if matches.len() >= config.max_tracks_per_word {
            tracing::debug!("Found {} exact matches for '{}'", matches.len(), word);
            break;
        }
        if !matches.is_empty() && analyzed >= config.soft_result_limit {
            tracing::debug!("Soft limit reached for '{}' with {} matches", word, matches.len());
            break;
        }
        if analyzed >= config.hard_result_limit {
            tracing::debug!("Hard limit reached for '{}' with {} matches", word, matches.len());
            break;
        }
    }

    matches.sort_by(|a, b| {
        (b.raw_ratio, b.folded_ratio, b.track.popularity).cmp(&(a.raw_ratio, a.folded_ratio, a.track.popularity))
    });
    matches.into_iter().map(|m| m.track).collect()
}

/// Candidates for one word of the sentence, best first.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SentenceWord {
    pub word: String,
    pub candidates: Vec<CatalogTrack>,
}

impl SentenceWord {
    pub fn pick(&self) -> Option<&CatalogTrack> {
        self.candidates.first()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Sentence {
    pub query: String,
    pub words: Vec<SentenceWord>,
}

impl Sentence {
    pub fn missing(&self) -> Vec<&str> {
        self.words
            .iter()
            .filter(|w| w.candidates.is_empty())
            .map(|w| w.word.as_str())
            .collect()
    }

    /// One id per word, in order. Fails if any word has no track.
    pub fn track_ids(&self) -> Result<Vec<SourceId>> {
        let missing = self.missing();
        if !missing.is_empty() {
            return Err(SearchError::UnmatchedWords {
                words: missing.into_iter().map(str::to_string).collect(),
            });
        }
        Ok(self
            .words
            .iter()
            .filter_map(SentenceWord::pick)
            .map(|t| t.id.clone())
            .collect())
    }

    /// Titles of the picked tracks, which read back as the sentence.
    pub fn titles(&self) -> Vec<&str> {
        self.words
            .iter()
            .filter_map(SentenceWord::pick)
            .map(|t| t.name.as_str())
            .collect()
    }
}

/// Find tracks for every word of `query`.
///
/// Words already in `db` are not searched. New matches are added to `db`.
/// Without a catalog only the database is consulted. `on_word` is called once
/// per word, for progress reporting.
pub fn build_sentence(
    query: &str,
    config: &SentenceConfig,
    db: &mut WordDb,
    catalog: Option<&dyn CatalogSearch>,
    similarity: &dyn SimilarityOracle,
    mut on_word: impl FnMut(),
) -> Result<Sentence> {
    let mut sentence = Sentence {
        query: query.to_string(),
        words: Vec::new(),
    };

    for word in sentence_words(query, config.normalize_query) {
        let candidates = if let Some(known) = db.get(&word) {
            tracing::debug!("'{}' found in word database", word);
            known.to_vec()
        } else if let Some(catalog) = catalog {
            let results = catalog.search(&word)?;
            let found = exact_title_matches(&word, results, config, similarity);
            if !found.is_empty() {
                db.insert(&word, found.clone());
            }
            found
        } else {
            tracing::warn!("Word '{}' not in word database and catalog search is disabled", word);
            Vec::new()
        };
        on_word();
        sentence.words.push(SentenceWord { word, candidates });
    }

    Ok(sentence)
}
