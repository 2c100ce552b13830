//! Relevance scoring for lyrics-source records.
//!
//! A record's score grows with how much of its lyrics body is taken up by the
//! query, plus a flat bonus when the title itself contains the query.

use crate::error::{Result, SearchError};
use crate::models::{RawLyricsTrack, ScoredTrack};
use crate::normalize::{clean_track_field, count_query_references, lyrics_snippet, match_form, strip_lyrics_cruft};

/// Added when the track title contains the query.
pub const TITLE_BONUS: f64 = 1.0;

/// Relevance of one record to `query`.
///
/// `references × len(query) / len(lyrics)`, plus [`TITLE_BONUS`] when the title
/// contains the query. Title and query are compared in [`match_form`], so the
/// normalized query still matches "Don't Stop" or "Beyoncé". Lengths are counted
/// in characters. Empty lyrics contribute nothing.
pub fn score(query: &str, track: &str, lyrics: &str, num_query_references: usize) -> f64 {
    let lyrics_len = lyrics.chars().count();
    let density = if lyrics_len == 0 {
        0.0
    } else {
        (num_query_references * query.chars().count()) as f64 / lyrics_len as f64
    };

    let query_form = match_form(query);
    let title_bonus = if !query_form.is_empty() && match_form(track).contains(&query_form) {
        TITLE_BONUS
    } else {
        0.0
    };

    density + title_bonus
}

/// Clean, annotate and score one raw record. Fails when it has no lyrics body.
pub fn score_track(query: &str, raw: RawLyricsTrack) -> Result<ScoredTrack> {
    let Some(lyrics) = raw.lyrics else {
        return Err(SearchError::MissingLyrics {
            track_id: raw.track_id.to_string(),
        });
    };

    let clean_lyrics = strip_lyrics_cruft(&lyrics).trim().to_string();
    let num_query_references = count_query_references(query, &clean_lyrics);
    let score = score(query, &raw.track, &clean_lyrics, num_query_references);
    let album = raw.album.unwrap_or_default();

    Ok(ScoredTrack {
        clean_artist: clean_track_field(&raw.artist),
        clean_album: clean_track_field(&album),
        clean_track: clean_track_field(&raw.track),
        lyrics_snippet: lyrics_snippet(query, &clean_lyrics),
        track_id: raw.track_id,
        artist: raw.artist,
        album,
        track: raw.track,
        clean_lyrics,
        num_query_references,
        score,
    })
}

/// Score a batch. Records without lyrics are dropped and counted.
pub fn score_tracks(query: &str, raws: Vec<RawLyricsTrack>) -> (Vec<ScoredTrack>, usize) {
    let mut scored = Vec::with_capacity(raws.len());
    let mut missing = 0;
    for raw in raws {
        match score_track(query, raw) {
            Ok(track) => scored.push(track),
            Err(err) => {
                tracing::debug!("Dropping record: {}", err);
                missing += 1;
            }
        }
    }
    (scored, missing)
}
