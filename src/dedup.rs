//! Deduplication of records that describe the same recording.
//!
//! The two sources use different survivor policies:
//! - lyrics records: the last record seen for a key wins, then the set is
//!   ordered by score;
//! - catalog records: a kept single only gives way to a more popular single;
//!   any other kept record gives way to anything more popular.
//!
//! In both cases a key keeps the position of its first occurrence.

use rustc_hash::FxHashMap;

use crate::models::{AlbumType, CatalogTrack, IdentityKey, ScoredTrack};
use crate::normalize::identity_form;

pub fn lyrics_identity(track: &ScoredTrack) -> IdentityKey {
    IdentityKey::Lyrics {
        artist: track.artist.clone(),
        track: track.clean_track.clone(),
    }
}

/// Artist names are folded and sorted so credit order and accents do not matter.
pub fn catalog_identity(track: &CatalogTrack) -> IdentityKey {
    let mut artists: Vec<String> = track.artist_names().map(identity_form).collect();
    artists.sort();
    IdentityKey::Catalog {
        artists,
        track: identity_form(&track.name),
    }
}

/// Group `items` by key. `replace(existing, candidate)` decides whether the
/// candidate takes over an occupied slot.
fn dedupe_by<T>(
    items: Vec<T>,
    key: impl Fn(&T) -> IdentityKey,
    replace: impl Fn(&T, &T) -> bool,
) -> (Vec<T>, usize) {
    let mut slots: Vec<T> = Vec::with_capacity(items.len());
    let mut index: FxHashMap<IdentityKey, usize> = FxHashMap::default();
    let mut duplicates = 0;

    for item in items {
        let k = key(&item);
        match index.get(&k) {
            Some(&slot) => {
                duplicates += 1;
                if replace(&slots[slot], &item) {
                    slots[slot] = item;
                }
            }
            None => {
                index.insert(k, slots.len());
                slots.push(item);
            }
        }
    }
    (slots, duplicates)
}

/// Deduplicate lyrics records (last write wins) and sort by score, highest first.
/// Returns the survivors and the number of duplicates collapsed.
pub fn dedupe_lyrics_tracks(tracks: Vec<ScoredTrack>) -> (Vec<ScoredTrack>, usize) {
    let (mut survivors, duplicates) = dedupe_by(tracks, lyrics_identity, |existing, candidate| {
        tracing::debug!(
            "Overwriting {} - {} (score {:.4}) with record {} (score {:.4})",
            existing.artist,
            existing.clean_track,
            existing.score,
            candidate.track_id,
            candidate.score
        );
        true
    });
    // Stable: equal scores keep first-insertion order
    survivors.sort_by(|a, b| b.score.total_cmp(&a.score));
    (survivors, duplicates)
}

/// True if `candidate` should replace `existing` under the catalog policy.
pub fn prefer_catalog_track(existing: &CatalogTrack, candidate: &CatalogTrack) -> bool {
    let more_popular = candidate.popularity > existing.popularity;
    if existing.album.album_type == AlbumType::Single {
        candidate.album.album_type == AlbumType::Single && more_popular
    } else {
        more_popular
    }
}

/// Deduplicate catalog records, keeping first-occurrence order.
pub fn dedupe_catalog_tracks(tracks: Vec<CatalogTrack>) -> (Vec<CatalogTrack>, usize) {
    dedupe_by(tracks, catalog_identity, |existing, candidate| {
        let replace = prefer_catalog_track(existing, candidate);
        if replace {
            tracing::debug!(
                "Replacing {} ({}, popularity {}) with {} ({}, popularity {})",
                existing.id,
                existing.album.album_type.as_str(),
                existing.popularity,
                candidate.id,
                candidate.album.album_type.as_str(),
                candidate.popularity
            );
        }
        replace
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CatalogAlbum, CatalogArtist, LyricsSnippet, SourceId};

    fn lyrics_track(id: &str, artist: &str, title: &str, score: f64) -> ScoredTrack {
        ScoredTrack {
            track_id: SourceId::new(id),
            artist: artist.to_string(),
            album: String::new(),
            track: title.to_string(),
            clean_artist: artist.to_string(),
            clean_album: String::new(),
            clean_track: title.to_string(),
            clean_lyrics: String::new(),
            lyrics_snippet: LyricsSnippet::Empty,
            num_query_references: 0,
            score,
        }
    }

    fn catalog_track(id: &str, artists: &[&str], title: &str, album_type: AlbumType, popularity: u32) -> CatalogTrack {
        CatalogTrack {
            id: SourceId::new(id),
            name: title.to_string(),
            artists: artists
                .iter()
                .map(|name| CatalogArtist { name: name.to_string() })
                .collect(),
            album: CatalogAlbum {
                name: "Album".to_string(),
                album_type,
            },
            popularity,
            explicit: false,
        }
    }

    fn ids(tracks: &[CatalogTrack]) -> Vec<&str> {
        tracks.iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn test_kept_single_only_replaced_by_more_popular_single() {
        let tracks = vec![
            catalog_track("single", &["X"], "Song", AlbumType::Single, 80),
            catalog_track("album", &["X"], "Song", AlbumType::Album, 95),
            catalog_track("weak-single", &["X"], "Song", AlbumType::Single, 70),
        ];
        let (survivors, duplicates) = dedupe_catalog_tracks(tracks);
        assert_eq!(ids(&survivors), vec!["single"]);
        assert_eq!(duplicates, 2);

        let tracks = vec![
            catalog_track("single", &["X"], "Song", AlbumType::Single, 80),
            catalog_track("better-single", &["X"], "Song", AlbumType::Single, 85),
        ];
        let (survivors, _) = dedupe_catalog_tracks(tracks);
        assert_eq!(ids(&survivors), vec!["better-single"]);
    }

    #[test]
    fn test_kept_album_replaced_by_anything_more_popular() {
        let tracks = vec![
            catalog_track("album", &["X"], "Song", AlbumType::Album, 10),
            catalog_track("single", &["X"], "Song", AlbumType::Single, 99),
        ];
        let (survivors, _) = dedupe_catalog_tracks(tracks);
        assert_eq!(ids(&survivors), vec!["single"]);

        let tracks = vec![
            catalog_track("album", &["X"], "Song", AlbumType::Album, 90),
            catalog_track("single", &["X"], "Song", AlbumType::Single, 80),
        ];
        let (survivors, _) = dedupe_catalog_tracks(tracks);
        assert_eq!(ids(&survivors), vec!["album"]);
        assert_eq!(survivors[0].popularity, 90);
    }

    #[test]
    fn test_equal_popularity_keeps_existing() {
        let tracks = vec![
            catalog_track("first", &["X"], "Song", AlbumType::Compilation, 50),
            catalog_track("second", &["X"], "Song", AlbumType::Album, 50),
        ];
        let (survivors, _) = dedupe_catalog_tracks(tracks);
        assert_eq!(ids(&survivors), vec!["first"]);
    }

    #[test]
    fn test_catalog_key_ignores_artist_order_and_decoration() {
        let tracks = vec![
            catalog_track("a", &["B", "A"], "Song (Remastered)", AlbumType::Album, 10),
            catalog_track("b", &["A", "B"], "Song", AlbumType::Album, 20),
            catalog_track("c", &["Beyoncé"], "Halo", AlbumType::Album, 5),
            catalog_track("d", &["Beyonce"], "Halo feat. Someone", AlbumType::Album, 1),
        ];
        let (survivors, duplicates) = dedupe_catalog_tracks(tracks);
        assert_eq!(ids(&survivors), vec!["b", "c"]);
        assert_eq!(duplicates, 2);
    }

    #[test]
    fn test_catalog_dedupe_keeps_first_occurrence_order() {
        let tracks = vec![
            catalog_track("one", &["X"], "First", AlbumType::Album, 10),
            catalog_track("two", &["Y"], "Second", AlbumType::Album, 10),
            catalog_track("one-better", &["X"], "First", AlbumType::Album, 50),
        ];
        let (survivors, _) = dedupe_catalog_tracks(tracks);
        assert_eq!(ids(&survivors), vec!["one-better", "two"]);
    }

    #[test]
    fn test_lyrics_last_write_wins_then_sorted_by_score() {
        let tracks = vec![
            lyrics_track("1", "A", "Love", 0.5),
            lyrics_track("2", "B", "Love", 0.9),
            lyrics_track("3", "A", "Love", 0.1),
            lyrics_track("4", "C", "Love", 0.9),
        ];
        let (survivors, duplicates) = dedupe_lyrics_tracks(tracks);
        let ids: Vec<&str> = survivors.iter().map(|t| t.track_id.as_str()).collect();
        assert_eq!(ids, vec!["2", "4", "3"]);
        assert_eq!(duplicates, 1);
    }

    #[test]
    fn test_dedupe_is_idempotent() {
        let tracks = vec![
            catalog_track("a", &["X"], "Song", AlbumType::Single, 80),
            catalog_track("b", &["X"], "Song", AlbumType::Album, 40),
            catalog_track("c", &["Y"], "Other", AlbumType::Album, 40),
        ];
        let (once, _) = dedupe_catalog_tracks(tracks);
        let (twice, duplicates) = dedupe_catalog_tracks(once.clone());
        assert_eq!(once, twice);
        assert_eq!(duplicates, 0);
    }
}
