//! Lyrics search library - track reconciliation and ranking shared by all binaries.

pub mod cache;
pub mod config;
pub mod dedup;
pub mod error;
pub mod export;
pub mod filters;
pub mod matcher;
pub mod models;
pub mod normalize;
pub mod oracles;
pub mod ordering;
pub mod pipeline;
pub mod progress;
pub mod prompt;
pub mod safety;
pub mod scoring;
pub mod sentence;
pub mod sources;

pub use error::{Result, SearchError};
