//! Filter pipeline.
//!
//! Each record is checked against a set of independent predicates. A record is
//! dropped when any predicate fires. Every predicate is evaluated (no
//! short-circuit) so the full [`FilterDecision`] can be logged and explained.

use serde::Serialize;

use crate::config::FilterConfig;
use crate::models::{CatalogTrack, ScoredTrack};
use crate::normalize::{clean_track_field, fold_to_ascii, match_form, WordMatcher};
use crate::sources::{LanguageOracle, SimilarityOracle};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    ContainsBannedWords,
    LanguageNotAllowed,
    ExplicitNotAllowed,
    TitleContainsQuery,
    TitleDoesNotContainQuery,
    ArtistNameContainsQuery,
    AlbumNameContainsQuery,
    ArtistNameFuzzyMatchesQuery,
    AlbumNameFuzzyMatchesQuery,
}

impl Predicate {
    pub fn name(self) -> &'static str {
        match self {
            Predicate::ContainsBannedWords => "contains_banned_words",
            Predicate::LanguageNotAllowed => "language_not_allowed",
            Predicate::ExplicitNotAllowed => "explicit_not_allowed",
            Predicate::TitleContainsQuery => "title_contains_query",
            Predicate::TitleDoesNotContainQuery => "title_does_not_contain_query",
            Predicate::ArtistNameContainsQuery => "artist_name_contains_query",
            Predicate::AlbumNameContainsQuery => "album_name_contains_query",
            Predicate::ArtistNameFuzzyMatchesQuery => "artist_name_fuzzy_matches_query",
            Predicate::AlbumNameFuzzyMatchesQuery => "album_name_fuzzy_matches_query",
        }
    }
}

/// Outcome of every predicate evaluated for one record, in evaluation order.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct FilterDecision {
    outcomes: Vec<(Predicate, bool)>,
}

impl FilterDecision {
    fn record(&mut self, predicate: Predicate, fired: bool) {
        self.outcomes.push((predicate, fired));
    }

    /// True when no predicate fired.
    pub fn passes(&self) -> bool {
        self.outcomes.iter().all(|(_, fired)| !fired)
    }

    pub fn fired(&self) -> Vec<&'static str> {
        self.outcomes
            .iter()
            .filter(|(_, fired)| *fired)
            .map(|(p, _)| p.name())
            .collect()
    }

    /// `None` if the predicate was not evaluated under the current config.
    pub fn outcome(&self, predicate: Predicate) -> Option<bool> {
        self.outcomes
            .iter()
            .find(|(p, _)| *p == predicate)
            .map(|(_, fired)| *fired)
    }

    pub fn outcomes(&self) -> &[(Predicate, bool)] {
        &self.outcomes
    }
}

/// A dropped record together with the reasons it was dropped.
#[derive(Clone, Debug)]
pub struct Rejected<T> {
    pub record: T,
    pub decision: FilterDecision,
}

// ============================================================================
// SHARED PREDICATES
// ============================================================================

/// True if any lowercase field contains any banned phrase.
pub fn contains_banned_words(fields: &[&str], banned_words: &[String]) -> bool {
    fields
        .iter()
        .any(|field| banned_words.iter().any(|word| field.contains(word.as_str())))
}

/// Fires only for a confident prediction outside the allow-list.
/// No prediction, or an unreliable one, gives the record the benefit of the doubt.
pub fn language_not_allowed(oracle: &dyn LanguageOracle, text: &str, allowed: &[String]) -> bool {
    match oracle.detect(text) {
        Some(guess) if guess.is_reliable => !allowed.iter().any(|lang| *lang == guess.code),
        _ => false,
    }
}

// ============================================================================
// LYRICS SOURCE
// ============================================================================

pub fn evaluate_lyrics_track(
    query: &str,
    track: &ScoredTrack,
    config: &FilterConfig,
    oracle: &dyn LanguageOracle,
) -> FilterDecision {
    let query = match_form(query);
    let artist = track.artist.to_lowercase();
    let album = track.album.to_lowercase();
    let title = track.track.to_lowercase();
    let title_contains_query = match_form(&track.track).contains(&query);

    let mut decision = FilterDecision::default();
    decision.record(
        Predicate::ContainsBannedWords,
        contains_banned_words(&[artist.as_str(), album.as_str(), title.as_str()], &config.banned_words),
    );
    decision.record(
        Predicate::LanguageNotAllowed,
        language_not_allowed(oracle, &track.clean_lyrics.to_lowercase(), &config.allowed_languages),
    );
    decision.record(
        Predicate::ArtistNameContainsQuery,
        match_form(&track.artist).contains(&query),
    );
    if config.forbid_title_contains_query {
        decision.record(Predicate::TitleContainsQuery, title_contains_query);
    }
    if config.require_title_contains_query {
        decision.record(Predicate::TitleDoesNotContainQuery, !title_contains_query);
    }
    decision
}

/// Split scored records into kept and rejected, preserving order.
pub fn filter_lyrics_tracks(
    query: &str,
    tracks: Vec<ScoredTrack>,
    config: &FilterConfig,
    oracle: &dyn LanguageOracle,
) -> (Vec<ScoredTrack>, Vec<Rejected<ScoredTrack>>) {
    let mut kept = Vec::new();
    let mut rejected = Vec::new();
    for track in tracks {
        let decision = evaluate_lyrics_track(query, &track, config, oracle);
        if decision.passes() {
            kept.push(track);
        } else {
            tracing::debug!(
                "Filtering out lyrics result {} - {}: {:?}",
                track.artist,
                track.track,
                decision.fired()
            );
            rejected.push(Rejected { record: track, decision });
        }
    }
    (kept, rejected)
}

// ============================================================================
// CATALOG
// ============================================================================

/// Word-boundary matcher for the query in its comparison form.
pub fn catalog_query_matcher(query: &str) -> WordMatcher {
    WordMatcher::new(&match_form(query))
}

pub fn evaluate_catalog_track(
    query: &str,
    track: &CatalogTrack,
    config: &FilterConfig,
    similarity: &dyn SimilarityOracle,
) -> FilterDecision {
    evaluate_catalog_track_with(&catalog_query_matcher(query), track, config, similarity)
}

/// [`evaluate_catalog_track`] with the query matcher built by the caller.
pub fn evaluate_catalog_track_with(
    matcher: &WordMatcher,
    track: &CatalogTrack,
    config: &FilterConfig,
    similarity: &dyn SimilarityOracle,
) -> FilterDecision {
    let query = matcher.needle();
    let title = fold_to_ascii(&track.name);
    let clean_title = match_form(&clean_track_field(&track.name));
    let album = fold_to_ascii(&track.album.name);
    let artists: Vec<String> = track.artist_names().map(fold_to_ascii).collect();
    // Query comparisons use the same form as the query itself
    let artist_forms: Vec<String> = track.artist_names().map(match_form).collect();
    let album_form = match_form(&track.album.name);

    let title_contains_query = matcher.is_match(&clean_title);

    let mut fields = vec![title.as_str(), album.as_str()];
    fields.extend(artists.iter().map(String::as_str));

    let mut decision = FilterDecision::default();
    decision.record(
        Predicate::ContainsBannedWords,
        contains_banned_words(&fields, &config.banned_words),
    );
    decision.record(
        Predicate::ExplicitNotAllowed,
        config.exclude_explicit && track.explicit,
    );
    if config.forbid_title_contains_query {
        decision.record(Predicate::TitleContainsQuery, title_contains_query);
    }
    if config.require_title_contains_query {
        decision.record(Predicate::TitleDoesNotContainQuery, !title_contains_query);
    }
    decision.record(
        Predicate::ArtistNameContainsQuery,
        !title_contains_query && artist_forms.iter().any(|a| a.contains(query)),
    );
    decision.record(
        Predicate::AlbumNameContainsQuery,
        !title_contains_query && album_form.contains(query),
    );
    if let Some(threshold) = config.fuzzy_threshold {
        decision.record(
            Predicate::ArtistNameFuzzyMatchesQuery,
            !title_contains_query
                && artist_forms.iter().any(|a| similarity.similarity(query, a) > threshold),
        );
        decision.record(
            Predicate::AlbumNameFuzzyMatchesQuery,
            !title_contains_query && similarity.similarity(query, &album_form) > threshold,
        );
    }
    decision
}

pub fn filter_catalog_tracks(
    query: &str,
    tracks: Vec<CatalogTrack>,
    config: &FilterConfig,
    similarity: &dyn SimilarityOracle,
) -> (Vec<CatalogTrack>, Vec<Rejected<CatalogTrack>>) {
    let matcher = catalog_query_matcher(query);
    let mut kept = Vec::new();
    let mut rejected = Vec::new();
    for track in tracks {
        let decision = evaluate_catalog_track_with(&matcher, &track, config, similarity);
        if decision.passes() {
            kept.push(track);
        } else {
            tracing::debug!(
                "Filtering out catalog result {}: {:?}",
                track.display_name(),
                decision.fired()
            );
            rejected.push(Rejected { record: track, decision });
        }
    }
    (kept, rejected)
}
