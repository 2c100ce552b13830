//! Concrete oracles behind [`LanguageOracle`] and [`SimilarityOracle`].

use strsim::normalized_levenshtein;

use crate::normalize::fold_to_ascii;
use crate::sources::{LanguageGuess, LanguageOracle, SimilarityOracle};

// ============================================================================
// LANGUAGE
// ============================================================================

/// Trigram-based language detection via `whatlang`.
#[derive(Clone, Copy, Debug, Default)]
pub struct WhatlangOracle;

/// Two-letter code for an ISO 639-3 code, when the allow-list is likely to use one.
pub fn iso_639_1(code: &str) -> Option<&'static str> {
    Some(match code {
        "eng" => "en",
        "spa" => "es",
        "fra" => "fr",
        "deu" => "de",
        "ita" => "it",
        "por" => "pt",
        "nld" => "nl",
        "rus" => "ru",
        "ukr" => "uk",
        "pol" => "pl",
        "swe" => "sv",
        "dan" => "da",
        "nob" => "no",
        "fin" => "fi",
        "tur" => "tr",
        "ces" => "cs",
        "hun" => "hu",
        "ron" => "ro",
        "ell" => "el",
        "heb" => "he",
        "ara" => "ar",
        "hin" => "hi",
        "jpn" => "ja",
        "kor" => "ko",
        "cmn" => "zh",
        "vie" => "vi",
        "tha" => "th",
        "ind" => "id",
        "epo" => "eo",
        "lat" => "la",
        _ => return None,
    })
}

impl LanguageOracle for WhatlangOracle {
    fn detect(&self, text: &str) -> Option<LanguageGuess> {
        let info = whatlang::detect(text)?;
        let code = info.lang().code();
        Some(LanguageGuess {
            code: iso_639_1(code).unwrap_or(code).to_string(),
            probability: info.confidence(),
            is_reliable: info.is_reliable(),
        })
    }
}

// ============================================================================
// SIMILARITY
// ============================================================================

/// Partial token-sort ratio: tokens of both strings are sorted, then the shorter
/// string is compared against every same-length window of the longer one.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokenSortSimilarity;

fn sorted_tokens(s: &str) -> String {
    let folded = fold_to_ascii(s);
    let mut tokens: Vec<&str> = folded
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

fn to_percent(similarity: f64) -> u8 {
    (similarity * 100.0).round().clamp(0.0, 100.0) as u8
}

pub fn token_sort_ratio(a: &str, b: &str) -> u8 {
    let (a, b) = (sorted_tokens(a), sorted_tokens(b));
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    to_percent(normalized_levenshtein(&a, &b))
}

pub fn partial_token_sort_ratio(a: &str, b: &str) -> u8 {
    let (a, b) = (sorted_tokens(a), sorted_tokens(b));
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    if short.is_empty() {
        return 0;
    }
    if short.len() == long.len() {
        return to_percent(normalized_levenshtein(&short, &long));
    }

    // Folded strings are ASCII, so byte windows are char windows
    let best = (0..=long.len() - short.len())
        .map(|start| normalized_levenshtein(&short, &long[start..start + short.len()]))
        .fold(0.0_f64, f64::max);
    to_percent(best)
}

impl SimilarityOracle for TokenSortSimilarity {
    fn similarity(&self, a: &str, b: &str) -> u8 {
        partial_token_sort_ratio(a, b)
    }
}
