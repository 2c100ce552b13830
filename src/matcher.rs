//! Cross-source matching: translate lyrics-source records into catalog entries.
//!
//! Each distinct (artist, title) pair is searched once in the catalog. A single
//! result is accepted as-is; with several, the most popular wins (last in
//! catalog order on ties). Pairs with no result are reported as unmatched.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

use crate::config::ErrorPolicy;
use crate::error::Result;
use crate::models::{CatalogTrack, ScoredTrack, SourceId};
use crate::sources::CatalogSearch;

/// A distinct (artist, title) pair looked up in the catalog.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct LookupPair {
    pub artist: String,
    pub track: String,
}

impl LookupPair {
    /// Free-text catalog query for this pair.
    pub fn search_query(&self) -> String {
        format!("{} {}", self.artist, self.track)
    }
}

/// One line of the match report.
#[derive(Clone, Debug, Serialize)]
pub struct MatchRecord {
    pub pair: LookupPair,
    pub lyrics_track_id: SourceId,
    pub score: f64,
    pub catalog: Option<CatalogTrack>,
}

#[derive(Clone, Debug, Default)]
pub struct CrossSourceMatch {
    /// Accepted catalog entries, unique by id, in lookup order.
    pub pool: Vec<CatalogTrack>,
    pub report: Vec<MatchRecord>,
    pub unmatched: Vec<LookupPair>,
    /// Pairs that had more than one catalog result.
    pub ambiguous: usize,
    /// Lookups that failed and were skipped.
    pub failed: usize,
}

/// Distinct pairs from the cleaned artist/title of each record, highest score first.
/// For a repeated pair the last record wins.
pub fn lookup_pairs(records: &[ScoredTrack]) -> Vec<(LookupPair, &ScoredTrack)> {
    let mut pairs: Vec<(LookupPair, &ScoredTrack)> = Vec::new();
    let mut index: FxHashMap<LookupPair, usize> = FxHashMap::default();
    for record in records {
        let pair = LookupPair {
            artist: record.clean_artist.clone(),
            track: record.clean_track.clone(),
        };
        match index.get(&pair) {
            Some(&slot) => pairs[slot].1 = record,
            None => {
                index.insert(pair.clone(), pairs.len());
                pairs.push((pair, record));
            }
        }
    }
    pairs.sort_by(|a, b| b.1.score.total_cmp(&a.1.score));
    pairs
}

/// Pick the catalog result to accept for one lookup.
/// Among equally popular results the later one wins.
pub fn pick_best(results: Vec<CatalogTrack>) -> Option<CatalogTrack> {
    let mut best: Option<CatalogTrack> = None;
    for candidate in results {
        let at_least_as_popular = best
            .as_ref()
            .map_or(true, |current| candidate.popularity >= current.popularity);
        if at_least_as_popular {
            best = Some(candidate);
        }
    }
    best
}

/// Look up every distinct pair in the catalog and collect the accepted entries.
///
/// `on_lookup` is called once per pair after its lookup, for progress reporting.
pub fn match_across_sources(
    records: &[ScoredTrack],
    catalog: &dyn CatalogSearch,
    policy: ErrorPolicy,
    mut on_lookup: impl FnMut(),
) -> Result<CrossSourceMatch> {
    let mut result = CrossSourceMatch::default();
    let mut seen_ids: FxHashSet<SourceId> = FxHashSet::default();

    for (pair, record) in lookup_pairs(records) {
        let query = pair.search_query();
        let lookup = catalog.search(&query);
        on_lookup();

        let results = match lookup {
            Ok(results) => results,
            Err(err) => match policy {
                ErrorPolicy::Propagate => return Err(err),
                ErrorPolicy::SkipAndLog => {
                    tracing::warn!("Catalog lookup for '{}' failed: {}", query, err);
                    result.failed += 1;
                    continue;
                }
            },
        };

        if results.len() > 1 {
            result.ambiguous += 1;
            tracing::debug!("{} catalog results for '{}', taking most popular", results.len(), query);
        }

        let accepted = pick_best(results);
        match &accepted {
            Some(track) => {
                tracing::debug!("Matched '{}' to {} ({})", query, track.display_name(), track.id);
                if seen_ids.insert(track.id.clone()) {
                    result.pool.push(track.clone());
                }
            }
            None => {
                tracing::debug!("No catalog results for '{}'", query);
                result.unmatched.push(pair.clone());
            }
        }

        result.report.push(MatchRecord {
            pair,
            lyrics_track_id: record.track_id.clone(),
            score: record.score,
            catalog: accepted,
        });
    }

    Ok(result)
}
