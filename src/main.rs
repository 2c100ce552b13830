use anyhow::{Context, Result};
use clap::Parser;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use lyrics_search::cache::{CacheStage, CacheStore, CachedCatalogSearch};
use lyrics_search::config::{
    load_word_list, ErrorPolicy, FilterConfig, SearchConfig, DEFAULT_MAX_PAGES, DEFAULT_MAX_PLAYLIST_TRACKS,
    DEFAULT_PAGE_SIZE,
};
use lyrics_search::export::JsonPlaylistWriter;
use lyrics_search::oracles::{TokenSortSimilarity, WhatlangOracle};
use lyrics_search::pipeline::{self, Collaborators, SearchInputs, SearchOutcome};
use lyrics_search::progress;
use lyrics_search::prompt::{self, DEFAULT_ATTEMPTS};
use lyrics_search::sources::{Backend, CatalogSearch, Frontend};
use lyrics_search::SearchError;

#[derive(Parser)]
#[command(name = "lyrics-search")]
#[command(about = "Rank songs whose lyrics match a query and export them as a playlist")]
struct Args {
    /// Free-text query, e.g. "dont stop"
    query: String,

    /// Sources to read results from (musixmatch, spotify)
    #[arg(short, long, num_args = 1.., default_values = ["musixmatch"])]
    backends: Vec<String>,

    /// Destinations to export to (spotify)
    #[arg(short, long, num_args = 1.., default_values = ["spotify"])]
    frontends: Vec<String>,

    /// Languages allowed when detection is confident
    #[arg(long, num_args = 1..)]
    languages: Option<Vec<String>>,

    /// Replace the default banned-word list
    #[arg(long, num_args = 1..)]
    banned_words: Option<Vec<String>>,

    /// Add to the banned-word list
    #[arg(long, num_args = 1..)]
    extra_banned_words: Vec<String>,

    /// Add banned words from a file, one phrase per line
    #[arg(long)]
    banned_words_file: Option<PathBuf>,

    /// Keep results whose title does not contain the query
    #[arg(long)]
    no_strict: bool,

    /// Keep only results whose title does NOT contain the query
    #[arg(long)]
    no_query_in_title: bool,

    /// Drop explicit catalog tracks
    #[arg(long)]
    no_explicit: bool,

    /// Drop catalog tracks whose artist or album is this similar (0-100) to the query
    #[arg(long)]
    fuzzy_threshold: Option<u8>,

    #[arg(long, default_value_t = DEFAULT_MAX_PLAYLIST_TRACKS)]
    max_playlist_tracks: usize,

    #[arg(long, default_value_t = DEFAULT_MAX_PAGES)]
    max_pages: usize,

    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    page_size: usize,

    /// Abort on the first failed upstream call instead of skipping it
    #[arg(long)]
    fail_fast: bool,

    /// Defaults to the normalized query
    #[arg(long)]
    playlist_name: Option<String>,

    #[arg(long)]
    create_playlist: bool,

    /// Replace existing playlists without asking
    #[arg(short, long)]
    yes: bool,

    /// Results directory (default: ./results/<query>)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// 0-1: warnings, 2: info, 3: debug
    #[arg(short, long, default_value_t = 2, value_parser = clap::value_parser!(u8).range(0..=3))]
    verbosity: u8,
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 | 1 => "warn",
        2 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn build_config(args: &Args) -> Result<SearchConfig> {
    let mut filters = FilterConfig::default();
    if let Some(words) = &args.banned_words {
        filters = filters.with_banned_words(words);
    }
    filters = filters.with_extra_banned_words(&args.extra_banned_words);
    if let Some(path) = &args.banned_words_file {
        let words = load_word_list(path)
            .with_context(|| format!("Failed to load banned words from {}", path.display()))?;
        filters = filters.with_extra_banned_words(words);
    }
    if let Some(languages) = &args.languages {
        filters = filters.with_allowed_languages(languages);
    }
    filters.require_title_contains_query = !args.no_strict && !args.no_query_in_title;
    filters.forbid_title_contains_query = args.no_query_in_title;
    filters.exclude_explicit = args.no_explicit;
    filters.fuzzy_threshold = args.fuzzy_threshold;

    let mut config = SearchConfig::new(&args.query);
    config.backends = args
        .backends
        .iter()
        .map(|b| b.parse::<Backend>())
        .collect::<Result<_, SearchError>>()?;
    config.frontends = args
        .frontends
        .iter()
        .map(|f| f.parse::<Frontend>())
        .collect::<Result<_, SearchError>>()?;
    config.filters = filters;
    if let Some(output) = &args.output {
        config.output_dir = output.clone();
    }
    config.playlist_name = args.playlist_name.clone();
    config.max_playlist_tracks = Some(args.max_playlist_tracks);
    config.max_pages = Some(args.max_pages);
    config.page_size = args.page_size;
    config.on_upstream_error = if args.fail_fast {
        ErrorPolicy::Propagate
    } else {
        ErrorPolicy::SkipAndLog
    };
    config.create_playlist = args.create_playlist;
    Ok(config)
}

fn load_inputs(config: &SearchConfig, store: &CacheStore, query: &str) -> Result<SearchInputs> {
    let mut inputs = SearchInputs::default();
    if config.uses_backend(Backend::Musixmatch) {
        let path = store.path(Backend::Musixmatch.name(), query, CacheStage::TrackList);
        inputs.lyrics = Some(
            store
                .load(&path)
                .with_context(|| format!("Failed to load lyrics results for '{}'", query))?,
        );
    }
    if config.uses_backend(Backend::Spotify) {
        let path = store.path(Backend::Spotify.name(), query, CacheStage::TrackList);
        inputs.catalog = Some(
            store
                .load(&path)
                .with_context(|| format!("Failed to load catalog results for '{}'", query))?,
        );
    }
    Ok(inputs)
}

fn print_summary(outcome: &SearchOutcome) {
    println!("\n{:=<60}", "");
    println!("Search complete for '{}'", outcome.query);
    println!("  Lyrics results kept: {}", outcome.lyrics_results.len());
    println!("  Catalog results kept: {}", outcome.catalog_results.len());
    println!("  Unmatched lookups: {}", outcome.unmatched.len());
    println!("  Tracks to export: {}", outcome.ranked.len());
    println!("{:=<60}", "");
    for (i, track) in outcome.ranked.iter().take(10).enumerate() {
        println!(
            "  {:>2}. {} - {} (popularity {}, {:?})",
            i + 1,
            track.artists.join(", "),
            track.name,
            track.popularity,
            track.tier
        );
    }
}

fn run(args: &Args) -> Result<()> {
    let config = build_config(args)?;
    progress::set_log_only(args.verbosity < 2);

    let query = config.normalized_query();
    tracing::info!("Searching for '{}' (normalized from '{}')", query, config.query);

    let store = CacheStore::new(&config.output_dir);
    let inputs = load_inputs(&config, &store, &query)?;

    let catalog_search = if config.uses_backend(Backend::Musixmatch) && config.uses_frontend(Frontend::Spotify) {
        let path = store.path(Frontend::Spotify.name(), &query, CacheStage::MatchCache);
        Some(CachedCatalogSearch::load(&store, &path)?)
    } else {
        None
    };
    let collaborators = Collaborators {
        language: &WhatlangOracle,
        similarity: &TokenSortSimilarity,
        catalog: catalog_search.as_ref().map(|c| c as &dyn CatalogSearch),
    };

    let outcome = pipeline::run(&config, inputs, &collaborators)?;

    if !outcome.lyrics_results.is_empty() {
        let path = store.path(Backend::Musixmatch.name(), &query, CacheStage::SearchResults);
        store.save(&path, &outcome.lyrics_results)?;
    }
    for frontend in &config.frontends {
        store.save(&store.path(frontend.name(), &query, CacheStage::Final), &outcome.report())?;
    }
    outcome
        .stats
        .write_to_file(&store.path("pipeline", &query, CacheStage::Stats))
        .context("Failed to write stats")?;

    print_summary(&outcome);

    let name = config.playlist_name();
    if outcome.ranked.is_empty() {
        return Err(SearchError::EmptyExportSet { playlist: name }.into());
    }
    if !config.create_playlist {
        tracing::info!("Skipping playlist creation (pass --create-playlist to export)");
        return Ok(());
    }

    let repo_url = std::env::var("LR_REPO_URL").ok();
    let protected = store.input_paths(&[Backend::Musixmatch.name(), Backend::Spotify.name()], &query);
    for frontend in &config.frontends {
        let mut writer = JsonPlaylistWriter::new(&config.output_dir, *frontend).protecting(protected.clone());
        if writer.exists(&name) && !args.yes {
            let replace = prompt::yes_no(
                &mut io::stdin().lock(),
                &mut io::stderr(),
                &format!("Playlist '{}' already exists for {}. Replace its contents?", name, frontend),
                false,
                DEFAULT_ATTEMPTS,
            )?;
            if !replace {
                tracing::warn!("Leaving existing playlist '{}' untouched", name);
                continue;
            }
        }
        let playlist = pipeline::export(&config, &outcome, &mut writer, repo_url.as_deref())?;
        println!("Exported {} tracks to {}", outcome.ranked.len(), playlist);
    }

    Ok(())
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    init_logging(args.verbosity);

    match run(&args) {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err) => {
            if err
                .downcast_ref::<SearchError>()
                .is_some_and(SearchError::is_empty_export)
            {
                eprintln!("No tracks found; nothing to export ({})", err);
                return Ok(ExitCode::from(1));
            }
            if args.verbosity > 1 {
                return Err(err);
            }
            eprintln!("ERROR: {}", err);
            Ok(ExitCode::from(2))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_backend_is_lyrics_only() {
        let args = Args::parse_from(["lyrics-search", "love"]);
        assert_eq!(args.backends, vec!["musixmatch".to_string()]);
        let config = build_config(&args).unwrap();
        assert!(config.uses_backend(Backend::Musixmatch));
        assert!(!config.uses_backend(Backend::Spotify));
        assert!(config.uses_frontend(Frontend::Spotify));
    }

    #[test]
    fn test_both_backends_on_request() {
        let args = Args::parse_from(["lyrics-search", "love", "-b", "musixmatch", "spotify"]);
        let config = build_config(&args).unwrap();
        assert_eq!(config.backends, vec![Backend::Musixmatch, Backend::Spotify]);
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let args = Args::parse_from(["lyrics-search", "love", "-b", "lastfm"]);
        assert!(build_config(&args).is_err());
    }
}
