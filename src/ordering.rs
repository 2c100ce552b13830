//! Final ordering of the catalog pool for export.
//!
//! Tracks are binned by how closely their title matches the query (exact,
//! substring, none), each bin ordered by popularity, and the bins concatenated.

use rustc_hash::FxHashSet;
use serde::Serialize;

use crate::models::{CatalogTrack, MatchTier, SourceId};
use crate::normalize::{clean_track_field, match_form};

/// Tier of a catalog title against the query, compared in match form.
pub fn match_tier(query: &str, title: &str) -> MatchTier {
    let query = match_form(query);
    let title = match_form(&clean_track_field(title));
    if title == query {
        MatchTier::Exact
    } else if title.contains(&query) {
        MatchTier::Substring
    } else {
        MatchTier::NoMatch
    }
}

/// One exported position.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RankedTrack {
    pub id: SourceId,
    pub name: String,
    pub artists: Vec<String>,
    pub popularity: u32,
    pub tier: MatchTier,
}

/// Bin, order and truncate the pool.
///
/// Each id appears at most once, in the position of its first occurrence in
/// the binned order. `max_len` caps the output.
pub fn rank_for_export(pool: &[CatalogTrack], query: &str, max_len: Option<usize>) -> Vec<RankedTrack> {
    let mut by_popularity: Vec<&CatalogTrack> = pool.iter().collect();
    // Stable: equal popularity keeps pool order
    by_popularity.sort_by(|a, b| b.popularity.cmp(&a.popularity));

    let mut tiered: Vec<(MatchTier, &CatalogTrack)> = by_popularity
        .into_iter()
        .map(|track| (match_tier(query, &track.name), track))
        .collect();
    tiered.sort_by_key(|(tier, _)| *tier);

    let mut seen: FxHashSet<&SourceId> = FxHashSet::default();
    let mut ranked = Vec::new();
    for (tier, track) in tiered {
        if max_len.is_some_and(|max| ranked.len() >= max) {
            break;
        }
        if !seen.insert(&track.id) {
            continue;
        }
        ranked.push(RankedTrack {
            id: track.id.clone(),
            name: track.name.clone(),
            artists: track.artist_names().map(str::to_string).collect(),
            popularity: track.popularity,
            tier,
        });
    }
    ranked
}

/// Ordered ids for the playlist sink.
pub fn order_for_export(pool: &[CatalogTrack], query: &str, max_len: Option<usize>) -> Vec<SourceId> {
    rank_for_export(pool, query, max_len)
        .into_iter()
        .map(|ranked| ranked.id)
        .collect()
}
