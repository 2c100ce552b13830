//! Narrow interfaces to everything outside the ranking engine.
//!
//! Transport, authentication, language models and string similarity are all
//! reached through the traits below so the core stays deterministic and
//! testable with in-memory fakes.

use std::fmt;
use std::str::FromStr;

use crate::config::ErrorPolicy;
use crate::error::{Result, SearchError};
use crate::models::{CatalogTrack, SourceId};

// ============================================================================
// SOURCE SELECTORS
// ============================================================================

/// Where raw results come from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Backend {
    /// Lyrics-indexed source, searched by lyrics content.
    Musixmatch,
    /// Streaming catalog, searched by metadata.
    Spotify,
}

impl Backend {
    pub fn name(self) -> &'static str {
        match self {
            Backend::Musixmatch => "musixmatch",
            Backend::Spotify => "spotify",
        }
    }
}

impl FromStr for Backend {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "musixmatch" => Ok(Backend::Musixmatch),
            "spotify" => Ok(Backend::Spotify),
            _ => Err(SearchError::UnsupportedBackend(s.to_string())),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where the ordered result list is exported to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Frontend {
    Spotify,
}

impl Frontend {
    pub fn name(self) -> &'static str {
        match self {
            Frontend::Spotify => "spotify",
        }
    }
}

impl FromStr for Frontend {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "spotify" => Ok(Frontend::Spotify),
            _ => Err(SearchError::UnsupportedFrontend(s.to_string())),
        }
    }
}

impl fmt::Display for Frontend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// COLLABORATOR TRAITS
// ============================================================================

/// One page of a paginated search.
#[derive(Clone, Debug)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Total number of results the source reports for the query.
    pub total_available: usize,
}

/// A paginated search endpoint. Pages are numbered from 1.
pub trait PageFetcher {
    type Item;

    fn source_name(&self) -> &str;

    fn fetch_page(&self, query: &str, page: usize, page_size: usize) -> Result<Page<Self::Item>>;
}

/// Free-text search against the streaming catalog.
pub trait CatalogSearch {
    fn search(&self, query: &str) -> Result<Vec<CatalogTrack>>;
}

#[derive(Clone, Debug, PartialEq)]
pub struct LanguageGuess {
    pub code: String,
    pub probability: f64,
    pub is_reliable: bool,
}

/// Statistical language identification.
pub trait LanguageOracle {
    /// `None` when no prediction can be made.
    fn detect(&self, text: &str) -> Option<LanguageGuess>;
}

/// Fuzzy string similarity on a 0 to 100 scale.
pub trait SimilarityOracle {
    fn similarity(&self, a: &str, b: &str) -> u8;
}

/// Destination for the final ordered track list.
pub trait PlaylistSink {
    /// Creates the playlist, or replaces the contents of an existing one with
    /// the same name. Returns the playlist identifier.
    fn create_or_replace_playlist(
        &mut self,
        name: &str,
        ordered_ids: &[SourceId],
        description: &str,
    ) -> Result<String>;
}

// ============================================================================
// PAGINATION
// ============================================================================

/// Number of pages needed to cover `total_available` results.
pub fn page_count(total_available: usize, page_size: usize, max_pages: Option<usize>) -> usize {
    let pages = total_available.div_ceil(page_size.max(1));
    match max_pages {
        Some(max) => pages.min(max),
        None => pages,
    }
}

/// Fetch every page of a search.
///
/// The first page determines how many pages exist. A failure there always
/// propagates; later failures follow `policy`.
pub fn fetch_all_pages<F: PageFetcher>(
    fetcher: &F,
    query: &str,
    page_size: usize,
    max_pages: Option<usize>,
    policy: ErrorPolicy,
) -> Result<Vec<F::Item>> {
    let first = fetcher.fetch_page(query, 1, page_size)?;
    let num_pages = page_count(first.total_available, page_size, max_pages);
    tracing::info!(
        "{}: {} results available for '{}', fetching {} page(s)",
        fetcher.source_name(),
        first.total_available,
        query,
        num_pages
    );

    let mut items = first.items;
    for page in 2..=num_pages {
        match fetcher.fetch_page(query, page, page_size) {
            Ok(next) => items.extend(next.items),
            Err(err) => match policy {
                ErrorPolicy::Propagate => return Err(err),
                ErrorPolicy::SkipAndLog => {
                    tracing::warn!("{}: skipping page {}: {}", fetcher.source_name(), page, err);
                }
            },
        }
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Serves `total` numbered items; pages listed in `failing` return a 500.
    struct FakeFetcher {
        total: usize,
        failing: Vec<usize>,
        requested: RefCell<Vec<usize>>,
    }

    impl PageFetcher for FakeFetcher {
        type Item = usize;

        fn source_name(&self) -> &str {
            "fake"
        }

        fn fetch_page(&self, _query: &str, page: usize, page_size: usize) -> Result<Page<usize>> {
            self.requested.borrow_mut().push(page);
            if self.failing.contains(&page) {
                return Err(SearchError::UpstreamStatus {
                    source_name: "fake".to_string(),
                    page,
                    status: 500,
                });
            }
            let start = (page - 1) * page_size;
            let end = (start + page_size).min(self.total);
            Ok(Page {
                items: (start..end).collect(),
                total_available: self.total,
            })
        }
    }

    fn fetcher(total: usize, failing: &[usize]) -> FakeFetcher {
        FakeFetcher {
            total,
            failing: failing.to_vec(),
            requested: RefCell::new(Vec::new()),
        }
    }

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(0, 100, None), 0);
        assert_eq!(page_count(250, 100, None), 3);
        assert_eq!(page_count(250, 100, Some(2)), 2);
        assert_eq!(page_count(5, 0, None), 5);
    }

    #[test]
    fn test_fetch_all_pages_collects_everything() {
        let f = fetcher(25, &[]);
        let items = fetch_all_pages(&f, "love", 10, None, ErrorPolicy::Propagate).unwrap();
        assert_eq!(items, (0..25).collect::<Vec<_>>());
        assert_eq!(*f.requested.borrow(), vec![1, 2, 3]);
    }

    #[test]
    fn test_fetch_all_pages_respects_max_pages() {
        let f = fetcher(25, &[]);
        let items = fetch_all_pages(&f, "love", 10, Some(2), ErrorPolicy::Propagate).unwrap();
        assert_eq!(items.len(), 20);
    }

    #[test]
    fn test_fetch_all_pages_skips_failed_page() {
        let f = fetcher(25, &[2]);
        let items = fetch_all_pages(&f, "love", 10, None, ErrorPolicy::SkipAndLog).unwrap();
        assert_eq!(items.len(), 15);
        assert!(!items.contains(&10));
    }

    #[test]
    fn test_fetch_all_pages_propagates_failed_page() {
        let f = fetcher(25, &[3]);
        let err = fetch_all_pages(&f, "love", 10, None, ErrorPolicy::Propagate).unwrap_err();
        assert!(matches!(err, SearchError::UpstreamStatus { page: 3, status: 500, .. }));
    }

    #[test]
    fn test_first_page_failure_always_propagates() {
        let f = fetcher(25, &[1]);
        assert!(fetch_all_pages(&f, "love", 10, None, ErrorPolicy::SkipAndLog).is_err());
    }

    #[test]
    fn test_selectors_reject_unknown_names() {
        assert_eq!("Spotify".parse::<Backend>().unwrap(), Backend::Spotify);
        assert_eq!("musixmatch".parse::<Backend>().unwrap(), Backend::Musixmatch);
        assert!(matches!(
            "genius".parse::<Backend>(),
            Err(SearchError::UnsupportedBackend(name)) if name == "genius"
        ));
        assert!(matches!(
            "tidal".parse::<Frontend>(),
            Err(SearchError::UnsupportedFrontend(_))
        ));
    }
}
