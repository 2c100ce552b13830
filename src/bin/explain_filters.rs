//! Show why each cached lyrics result was kept or dropped.
//!
//! Usage: explain-filters <QUERY> [--output DIR] [--only-dropped] [--no-strict]

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use lyrics_search::cache::{CacheStage, CacheStore};
use lyrics_search::config::{FilterConfig, SearchConfig};
use lyrics_search::filters::evaluate_lyrics_track;
use lyrics_search::models::RawLyricsTrack;
use lyrics_search::oracles::WhatlangOracle;
use lyrics_search::scoring::score_tracks;
use lyrics_search::sources::Backend;

#[derive(Parser)]
#[command(name = "explain-filters")]
#[command(about = "Print the filter decision for every cached lyrics result")]
struct Args {
    query: String,

    /// Results directory (default: ./results/<query>)
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(long, num_args = 1..)]
    languages: Option<Vec<String>>,

    #[arg(long)]
    no_strict: bool,

    /// Print only records that were dropped
    #[arg(long)]
    only_dropped: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    let mut config = SearchConfig::new(&args.query);
    if let Some(output) = &args.output {
        config.output_dir = output.clone();
    }
    let mut filters = FilterConfig {
        require_title_contains_query: !args.no_strict,
        ..FilterConfig::default()
    };
    if let Some(languages) = &args.languages {
        filters = filters.with_allowed_languages(languages);
    }

    let query = config.normalized_query();
    let store = CacheStore::new(&config.output_dir);
    let path = store.path(Backend::Musixmatch.name(), &query, CacheStage::TrackList);
    let raws: Vec<RawLyricsTrack> = store
        .load(&path)
        .with_context(|| format!("Failed to load lyrics results from {}", path.display()))?;

    let (scored, missing) = score_tracks(&query, raws);
    let oracle = WhatlangOracle;
    let mut dropped = 0;

    for track in &scored {
        let decision = evaluate_lyrics_track(&query, track, &filters, &oracle);
        let passes = decision.passes();
        if !passes {
            dropped += 1;
        }
        if passes && args.only_dropped {
            continue;
        }
        println!(
            "{} {:>8.4}  {} - {}",
            if passes { "KEEP" } else { "DROP" },
            track.score,
            track.artist,
            track.track
        );
        println!("     snippet: {}", track.lyrics_snippet);
        for (predicate, fired) in decision.outcomes() {
            println!("     {:<34} {}", predicate.name(), fired);
        }
    }

    println!("\n{:=<60}", "");
    println!("Records: {}", scored.len() + missing);
    println!("  Without lyrics: {}", missing);
    println!("  Dropped by filters: {}", dropped);
    println!("  Kept: {}", scored.len() - dropped);
    println!("{:=<60}", "");

    Ok(())
}
