//! Guards against an export clobbering cached search data.
//!
//! Fetched track lists and catalog lookups are expensive to rebuild, so an
//! export target is refused if it could be one of them.

use std::path::{Path, PathBuf};

use crate::cache::CacheStage;
use crate::error::{Result, SearchError};

/// File-name suffixes of cache stages that must never be overwritten by an export.
pub fn protected_suffixes() -> Vec<String> {
    [CacheStage::TrackList, CacheStage::MatchCache, CacheStage::SearchResults]
        .iter()
        .map(|stage| format!("_{}.json", stage.as_str()))
        .collect()
}

/// Validates that an export path is safe to overwrite.
///
/// Checks:
/// - The file name must contain `required_pattern` (e.g. "playlist")
/// - It must not be any of `protected`
/// - It must not look like a cache-stage file
pub fn validate_output_path(output: &Path, required_pattern: &str, protected: &[PathBuf]) -> Result<()> {
    let output_name = output.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let refuse = |reason: String| {
        Err(SearchError::UnsafeOutput {
            path: output.to_path_buf(),
            reason,
        })
    };

    if !output_name.contains(required_pattern) {
        return refuse(format!("file name must contain '{}'", required_pattern));
    }

    if let Some(input) = protected.iter().find(|p| p.as_path() == output) {
        return refuse(format!("same path as input '{}'", input.display()));
    }

    if let Some(suffix) = protected_suffixes()
        .into_iter()
        .find(|suffix| output_name.ends_with(suffix.as_str()))
    {
        return refuse(format!("matches cache file pattern '*{}'", suffix));
    }

    Ok(())
}
