//! End-to-end orchestration.
//!
//! Lyrics results: score → filter → dedupe → cross-source match.
//! Catalog results: filter → dedupe.
//! Both feed one catalog pool, which is binned and ordered for export.

use std::time::Instant;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::cache::{CacheStage, CacheStore};
use crate::config::{FilterConfig, SearchConfig};
use crate::dedup::{dedupe_catalog_tracks, dedupe_lyrics_tracks};
use crate::error::{Result, SearchError};
use crate::export::playlist_description;
use crate::filters::{filter_catalog_tracks, filter_lyrics_tracks, Rejected};
use crate::matcher::{lookup_pairs, match_across_sources, LookupPair, MatchRecord};
use crate::models::{CatalogTrack, PipelineStats, RawLyricsTrack, ScoredTrack, SourceId};
use crate::ordering::{rank_for_export, RankedTrack};
use crate::progress::{create_progress_bar, format_duration, log_progress};
use crate::scoring::score_tracks;
use crate::sources::{
    fetch_all_pages, Backend, CatalogSearch, LanguageOracle, PageFetcher, PlaylistSink, SimilarityOracle,
};

/// Log a line every this many catalog lookups in log-only mode.
const LOOKUP_LOG_INTERVAL: u64 = 50;

/// External services the pipeline consults.
pub struct Collaborators<'a> {
    pub language: &'a dyn LanguageOracle,
    pub similarity: &'a dyn SimilarityOracle,
    /// Needed to translate lyrics results into catalog entries.
    pub catalog: Option<&'a dyn CatalogSearch>,
}

/// Raw results per backend. `None` for backends not in use.
#[derive(Clone, Debug, Default)]
pub struct SearchInputs {
    pub lyrics: Option<Vec<RawLyricsTrack>>,
    pub catalog: Option<Vec<CatalogTrack>>,
}

#[derive(Debug, Default)]
pub struct SearchOutcome {
    pub query: String,
    /// Surviving lyrics records, highest score first.
    pub lyrics_results: Vec<ScoredTrack>,
    pub rejected_lyrics: Vec<Rejected<ScoredTrack>>,
    /// Surviving catalog search results.
    pub catalog_results: Vec<CatalogTrack>,
    pub matches: Vec<MatchRecord>,
    pub unmatched: Vec<LookupPair>,
    pub ranked: Vec<RankedTrack>,
    pub stats: PipelineStats,
}

impl SearchOutcome {
    pub fn ordered_ids(&self) -> Vec<SourceId> {
        self.ranked.iter().map(|r| r.id.clone()).collect()
    }

    pub fn report(&self) -> ExportReport<'_> {
        ExportReport {
            query: &self.query,
            ranked: &self.ranked,
            matches: &self.matches,
            unmatched: &self.unmatched,
        }
    }
}

/// What gets persisted as the `final` stage.
#[derive(Debug, Serialize)]
pub struct ExportReport<'a> {
    pub query: &'a str,
    pub ranked: &'a [RankedTrack],
    pub matches: &'a [MatchRecord],
    pub unmatched: &'a [LookupPair],
}

// ============================================================================
// STAGES
// ============================================================================

/// Raw results for one backend: from the cache when present, otherwise every
/// page is fetched and the result cached.
pub fn fetch_or_load<F>(config: &SearchConfig, store: &CacheStore, backend: Backend, fetcher: &F) -> Result<Vec<F::Item>>
where
    F: PageFetcher,
    F::Item: Serialize + DeserializeOwned,
{
    let query = config.normalized_query();
    let path = store.path(backend.name(), &query, CacheStage::TrackList);
    store.load_or_fetch(&path, || {
        fetch_all_pages(
            fetcher,
            &query,
            config.page_size,
            config.max_pages,
            config.on_upstream_error,
        )
    })
}

/// Score, filter and deduplicate lyrics-source results.
pub fn run_lyrics_stage(
    query: &str,
    raws: Vec<RawLyricsTrack>,
    filters: &FilterConfig,
    oracle: &dyn LanguageOracle,
    stats: &mut PipelineStats,
) -> (Vec<ScoredTrack>, Vec<Rejected<ScoredTrack>>) {
    stats.lyrics_fetched += raws.len();
    let (scored, missing) = score_tracks(query, raws);
    stats.lyrics_missing += missing;

    let (kept, rejected) = filter_lyrics_tracks(query, scored, filters, oracle);
    stats.lyrics_filtered += rejected.len();

    let (deduped, duplicates) = dedupe_lyrics_tracks(kept);
    stats.lyrics_duplicates += duplicates;
    stats.lyrics_kept += deduped.len();

    tracing::info!(
        "Lyrics: {} fetched, {} without lyrics, {} filtered, {} duplicates, {} kept",
        stats.lyrics_fetched,
        missing,
        rejected.len(),
        duplicates,
        deduped.len()
    );
    (deduped, rejected)
}

/// Filter and deduplicate catalog search results.
pub fn run_catalog_stage(
    query: &str,
    tracks: Vec<CatalogTrack>,
    filters: &FilterConfig,
    similarity: &dyn SimilarityOracle,
    stats: &mut PipelineStats,
) -> Vec<CatalogTrack> {
    stats.catalog_fetched += tracks.len();
    let (kept, rejected) = filter_catalog_tracks(query, tracks, filters, similarity);
    stats.catalog_filtered += rejected.len();

    let (deduped, duplicates) = dedupe_catalog_tracks(kept);
    stats.catalog_duplicates += duplicates;
    stats.catalog_kept += deduped.len();

    tracing::info!(
        "Catalog: {} fetched, {} filtered, {} duplicates, {} kept",
        stats.catalog_fetched,
        rejected.len(),
        duplicates,
        deduped.len()
    );
    deduped
}

// ============================================================================
// RUN
// ============================================================================

pub fn run(config: &SearchConfig, inputs: SearchInputs, collaborators: &Collaborators<'_>) -> Result<SearchOutcome> {
    let start = Instant::now();
    let query = config.normalized_query();
    let mut outcome = SearchOutcome {
        query: query.clone(),
        ..Default::default()
    };
    let mut pool: Vec<CatalogTrack> = Vec::new();

    if let Some(raws) = inputs.lyrics {
        let (kept, rejected) =
            run_lyrics_stage(&query, raws, &config.filters, collaborators.language, &mut outcome.stats);
        outcome.rejected_lyrics = rejected;

        match collaborators.catalog {
            Some(catalog) => {
                let total = lookup_pairs(&kept).len() as u64;
                outcome.stats.lookups += total as usize;
                let pb = create_progress_bar(total, "Matching lyrics results to catalog");
                let mut done = 0;
                let matched = match_across_sources(&kept, catalog, config.on_upstream_error, || {
                    done += 1;
                    pb.inc(1);
                    log_progress("match", done, total, LOOKUP_LOG_INTERVAL);
                });
                pb.finish_and_clear();
                let matched = matched?;

                outcome.stats.lookups_unmatched += matched.unmatched.len();
                outcome.stats.lookups_ambiguous += matched.ambiguous;
                outcome.stats.lookups_failed += matched.failed;
                tracing::info!(
                    "Matched {:.1}% of {} lyrics results to catalog entries",
                    outcome.stats.match_rate(),
                    total
                );
                pool.extend(matched.pool);
                outcome.matches = matched.report;
                outcome.unmatched = matched.unmatched;
            }
            None => tracing::warn!("No catalog search available; lyrics results will not be exported"),
        }
        outcome.lyrics_results = kept;
    }

    if let Some(tracks) = inputs.catalog {
        let kept = run_catalog_stage(
            &query,
            tracks,
            &config.filters,
            collaborators.similarity,
            &mut outcome.stats,
        );
        pool.extend(kept.iter().cloned());
        outcome.catalog_results = kept;
    }

    outcome.ranked = rank_for_export(&pool, &query, config.max_playlist_tracks);
    for ranked in &outcome.ranked {
        outcome.stats.record_tier(ranked.tier);
    }
    outcome.stats.exported = outcome.ranked.len();
    outcome.stats.elapsed_secs = start.elapsed().as_secs_f64();

    tracing::info!(
        "{} tracks ready for export in {}",
        outcome.ranked.len(),
        format_duration(start.elapsed())
    );
    outcome.stats.log_phase("search");
    Ok(outcome)
}

/// Hand the ordered list to the sink. Refuses an empty list without touching it.
pub fn export(
    config: &SearchConfig,
    outcome: &SearchOutcome,
    sink: &mut dyn PlaylistSink,
    repo_url: Option<&str>,
) -> Result<String> {
    let name = config.playlist_name();
    let ids = outcome.ordered_ids();
    if ids.is_empty() {
        return Err(SearchError::EmptyExportSet { playlist: name });
    }
    let description = playlist_description(&outcome.query, repo_url);
    sink.create_or_replace_playlist(&name, &ids, &description)
}
