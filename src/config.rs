//! Run configuration, built once from the command line and passed down by reference.

use std::path::{Path, PathBuf};

use crate::error::{Result, SearchError};
use crate::normalize::{cache_key, normalize_query};
use crate::sources::{Backend, Frontend};

// ============================================================================
// DEFAULTS
// ============================================================================

/// Phrases that mark a record as something other than the original recording.
pub const DEFAULT_BANNED_WORDS: &[&str] = &[
    "instrumental",
    "karaoke",
    "originally performed",
    "(live)",
    "(skit)",
    "live in",
    "in the style of",
    "tribute to",
    "remix",
];

pub const DEFAULT_ALLOWED_LANGUAGES: &[&str] = &["en"];

pub const DEFAULT_MAX_PLAYLIST_TRACKS: usize = 1000;
pub const DEFAULT_MAX_PAGES: usize = 50;
pub const DEFAULT_PAGE_SIZE: usize = 100;
pub const DEFAULT_RESULTS_DIR: &str = "results";

/// What to do when a non-essential upstream call fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ErrorPolicy {
    Propagate,
    #[default]
    SkipAndLog,
}

// ============================================================================
// FILTER CONFIG
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
pub struct FilterConfig {
    /// Lowercase phrases; a record whose artist, album or title contains any is dropped.
    pub banned_words: Vec<String>,
    /// Language codes accepted when the detector is confident.
    pub allowed_languages: Vec<String>,
    /// Drop records whose title does not contain the query.
    pub require_title_contains_query: bool,
    /// Drop records whose title contains the query.
    pub forbid_title_contains_query: bool,
    /// Drop explicit catalog tracks.
    pub exclude_explicit: bool,
    /// Enables the fuzzy artist/album predicates on catalog results.
    pub fuzzy_threshold: Option<u8>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            banned_words: DEFAULT_BANNED_WORDS.iter().map(|w| w.to_string()).collect(),
            allowed_languages: DEFAULT_ALLOWED_LANGUAGES.iter().map(|l| l.to_string()).collect(),
            require_title_contains_query: true,
            forbid_title_contains_query: false,
            exclude_explicit: false,
            fuzzy_threshold: None,
        }
    }
}

impl FilterConfig {
    /// Replace the banned-word list. Entries are lowercased and blanks dropped.
    pub fn with_banned_words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.banned_words = clean_word_list(words);
        self
    }

    /// Append to the banned-word list, skipping entries already present.
    pub fn with_extra_banned_words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for word in clean_word_list(words) {
            if !self.banned_words.contains(&word) {
                self.banned_words.push(word);
            }
        }
        self
    }

    pub fn with_allowed_languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.allowed_languages = clean_word_list(languages);
        self
    }
}

fn clean_word_list<I, S>(words: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    words
        .into_iter()
        .map(|w| w.as_ref().trim().to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

/// Load a word list: one phrase per line, blank lines and `#` comments ignored.
pub fn load_word_list(path: &Path) -> Result<Vec<String>> {
    let contents = std::fs::read_to_string(path).map_err(|source| SearchError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(clean_word_list(
        contents.lines().filter(|line| !line.trim_start().starts_with('#')),
    ))
}

// ============================================================================
// SEARCH CONFIG
// ============================================================================

#[derive(Clone, Debug)]
pub struct SearchConfig {
    pub query: String,
    pub backends: Vec<Backend>,
    pub frontends: Vec<Frontend>,
    pub filters: FilterConfig,
    pub output_dir: PathBuf,
    pub playlist_name: Option<String>,
    pub max_playlist_tracks: Option<usize>,
    pub max_pages: Option<usize>,
    pub page_size: usize,
    pub on_upstream_error: ErrorPolicy,
    pub create_playlist: bool,
}

impl SearchConfig {
    /// Defaults for `query`: the lyrics backend, the spotify frontend, results
    /// under `./results/<cache_key>`.
    pub fn new(query: impl Into<String>) -> Self {
        let query = query.into();
        let output_dir = Path::new(DEFAULT_RESULTS_DIR).join(cache_key(&normalize_query(&query)));
        Self {
            query,
            backends: vec![Backend::Musixmatch],
            frontends: vec![Frontend::Spotify],
            filters: FilterConfig::default(),
            output_dir,
            playlist_name: None,
            max_playlist_tracks: Some(DEFAULT_MAX_PLAYLIST_TRACKS),
            max_pages: Some(DEFAULT_MAX_PAGES),
            page_size: DEFAULT_PAGE_SIZE,
            on_upstream_error: ErrorPolicy::default(),
            create_playlist: false,
        }
    }

    /// The query after normalization. Used for searching and for tier comparison.
    pub fn normalized_query(&self) -> String {
        normalize_query(&self.query)
    }

    /// File-name form of the normalized query.
    pub fn cache_key(&self) -> String {
        cache_key(&self.normalized_query())
    }

    pub fn uses_backend(&self, backend: Backend) -> bool {
        self.backends.contains(&backend)
    }

    pub fn uses_frontend(&self, frontend: Frontend) -> bool {
        self.frontends.contains(&frontend)
    }

    pub fn playlist_name(&self) -> String {
        match &self.playlist_name {
            Some(name) => name.clone(),
            None => self.normalized_query(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_filter_defaults() {
        let config = FilterConfig::default();
        assert!(config.banned_words.iter().any(|w| w == "karaoke"));
        assert_eq!(config.allowed_languages, vec!["en".to_string()]);
        assert!(config.require_title_contains_query);
        assert!(!config.forbid_title_contains_query);
        assert_eq!(config.fuzzy_threshold, None);
    }

    #[test]
    fn test_banned_word_overrides() {
        let replaced = FilterConfig::default().with_banned_words(["  Cover ", ""]);
        assert_eq!(replaced.banned_words, vec!["cover".to_string()]);

        let extended = FilterConfig::default().with_extra_banned_words(["cover", "remix"]);
        assert_eq!(extended.banned_words.len(), DEFAULT_BANNED_WORDS.len() + 1);
        assert_eq!(extended.banned_words.last().map(String::as_str), Some("cover"));
    }

    #[test]
    fn test_load_word_list() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# banned\nDemo\n\n  acoustic version \n").unwrap();
        let words = load_word_list(file.path()).unwrap();
        assert_eq!(words, vec!["demo".to_string(), "acoustic version".to_string()]);
    }

    #[test]
    fn test_load_word_list_missing_file() {
        let err = load_word_list(Path::new("/nonexistent/words.txt")).unwrap_err();
        assert!(matches!(err, SearchError::Io { .. }));
    }

    #[test]
    fn test_search_config_defaults() {
        let config = SearchConfig::new("Don't Stop");
        assert_eq!(config.normalized_query(), "Dont Stop");
        assert_eq!(config.cache_key(), "Dont_Stop");
        assert_eq!(config.output_dir, Path::new("results").join("Dont_Stop"));
        assert_eq!(config.playlist_name(), "Dont Stop");
        assert_eq!(config.max_playlist_tracks, Some(1000));
        assert!(config.uses_backend(Backend::Musixmatch));
        assert!(!config.uses_backend(Backend::Spotify));
        assert_eq!(config.on_upstream_error, ErrorPolicy::SkipAndLog);
    }
}
