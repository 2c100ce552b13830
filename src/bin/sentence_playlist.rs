//! Build a playlist whose track titles spell out the query, one track per word.
//!
//! Usage: sentence-playlist <QUERY> [--allow-explicit] [--no-api] [--create-playlist]

use anyhow::{Context, Result};
use clap::Parser;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use lyrics_search::cache::{CacheStore, CachedTrackLists};
use lyrics_search::config::DEFAULT_RESULTS_DIR;
use lyrics_search::export::JsonPlaylistWriter;
use lyrics_search::oracles::TokenSortSimilarity;
use lyrics_search::progress::{self, create_progress_bar};
use lyrics_search::prompt::{self, DEFAULT_ATTEMPTS};
use lyrics_search::sentence::{
    build_sentence, sentence_description, SentenceConfig, WordDb, DEFAULT_HARD_RESULT_LIMIT,
    DEFAULT_MAX_TRACKS_PER_WORD, DEFAULT_SOFT_RESULT_LIMIT, WORD_DB_FILE,
};
use lyrics_search::sources::{CatalogSearch, Frontend, PlaylistSink};

#[derive(Parser)]
#[command(name = "sentence-playlist")]
#[command(about = "Build a playlist of tracks titled after each word of the query")]
struct Args {
    query: String,

    #[arg(long)]
    allow_explicit: bool,

    /// Only use the word database; never search the catalog
    #[arg(long)]
    no_api: bool,

    #[arg(long)]
    no_normalize_query: bool,

    /// Stop searching a word once this many tracks are found
    #[arg(long, default_value_t = DEFAULT_MAX_TRACKS_PER_WORD)]
    max_tracks_per_word: usize,

    /// Stop searching a word after this many results if it has at least one match
    #[arg(long, default_value_t = DEFAULT_SOFT_RESULT_LIMIT)]
    per_word_soft_result_limit: usize,

    /// Stop searching a word after this many results regardless
    #[arg(long, default_value_t = DEFAULT_HARD_RESULT_LIMIT)]
    per_word_hard_result_limit: usize,

    /// Results directory holding the word database and per-word results (default: ./results)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Defaults to the query
    #[arg(long)]
    playlist_name: Option<String>,

    #[arg(long)]
    create_playlist: bool,

    /// Replace an existing playlist without asking
    #[arg(short, long)]
    yes: bool,

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

fn run(args: &Args) -> Result<()> {
    progress::set_log_only(args.verbosity < 2);
    let config = SentenceConfig {
        max_tracks_per_word: args.max_tracks_per_word,
        soft_result_limit: args.per_word_soft_result_limit,
        hard_result_limit: args.per_word_hard_result_limit,
        allow_explicit: args.allow_explicit,
        normalize_query: !args.no_normalize_query,
    };

    let root = args.output.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_RESULTS_DIR));
    let store = CacheStore::new(&root);
    let db_path = root.join(WORD_DB_FILE);
    let mut db = WordDb::load(&store, &db_path).context("Failed to load word database")?;
    let search = CachedTrackLists::new(store.clone(), Frontend::Spotify.name());
    let catalog = if args.no_api {
        None
    } else {
        Some(&search as &dyn CatalogSearch)
    };

    let words = args.query.split_whitespace().count() as u64;
    let pb = create_progress_bar(words, "Finding a track per word");
    let sentence = build_sentence(&args.query, &config, &mut db, catalog, &TokenSortSimilarity, || pb.inc(1));
    pb.finish_and_clear();
    let sentence = sentence?;

    for word in &sentence.words {
        println!("'{}' results:", word.word);
        for track in &word.candidates {
            println!("  {} (popularity {})", track.display_name(), track.popularity);
        }
    }

    db.save(&store, &db_path).context("Failed to save word database")?;
    let ids = sentence.track_ids()?;

    if args.create_playlist {
        let name = args.playlist_name.clone().unwrap_or_else(|| args.query.clone());
        let mut writer = JsonPlaylistWriter::new(&root, Frontend::Spotify).protecting(vec![db_path.clone()]);
        let replace = if writer.exists(&name) && !args.yes {
            prompt::yes_no(
                &mut io::stdin().lock(),
                &mut io::stderr(),
                &format!("Playlist '{}' already exists. Replace its contents?", name),
                false,
                DEFAULT_ATTEMPTS,
            )?
        } else {
            true
        };
        if replace {
            let repo_url = std::env::var("LR_REPO_URL").ok();
            let playlist = writer.create_or_replace_playlist(&name, &ids, &sentence_description(repo_url.as_deref()))?;
            println!("Exported {} tracks to {}", ids.len(), playlist);
        } else {
            tracing::warn!("Leaving existing playlist '{}' untouched", name);
        }
    }

    println!("Final playlist:");
    println!("{}", sentence.titles().join(" "));
    Ok(())
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    init_logging(args.verbosity);

    match run(&args) {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err) if args.verbosity > 1 => Err(err),
        Err(err) => {
            eprintln!("ERROR: {}", err);
            Ok(ExitCode::from(2))
        }
    }
}
