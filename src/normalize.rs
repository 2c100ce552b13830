//! Text normalization shared by every stage of the pipeline.
//!
//! Three families of transforms live here:
//! - query normalization ([`normalize_query`]), used for the query itself and for
//!   any title compared against it;
//! - field cleaning ([`clean_track_field`]) for track/artist/album names;
//! - lyrics handling (cruft stripping, tokenization, snippets, reference counts).
//!
//! Every transform is deterministic and idempotent. Tests below pin that down.

use any_ascii::any_ascii;
use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashMap;
use unicode_normalization::UnicodeNormalization;

use crate::models::LyricsSnippet;

// ============================================================================
// REGEX PATTERNS
// ============================================================================

/// Bracketed spans stripped from names: "[...]", "{...}", "<...>", "(...)".
/// Each group is optional; the whole pattern is applied in a single pass.
pub static PARENTHETICAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\[.*\])?(\{.*\})?(<.*>)?(\(.*\))?").unwrap());

/// Featured-artist marker. Everything from the marker onwards is dropped.
pub static FEAT_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)feat\.").unwrap());

/// Transcriber annotations: "******* This Lyrics is NOT for Commercial use *******\n(1409617829412)"
pub static LYRICS_CRUFT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*+.*\*+\s+\(\d+\)").unwrap());

/// Word separator for lyrics tokenization. Keeps '#', apostrophes and double quotes inside words.
pub static LYRICS_WORD_SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r#"[^\w#'"]"#).unwrap());

/// Quote characters dropped from queries once contractions have been expanded.
pub static QUOTES: Lazy<Regex> = Lazy::new(|| Regex::new(r#"['"]"#).unwrap());

/// Punctuation that only separates words; runs of it collapse to one space.
/// Hyphens belong here so "self-love" becomes "self love".
pub static INTER_WORD_PUNCTUATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\\#()*+,\-/:<=>@\[\]^_`{|}~]+").unwrap());

/// Punctuation that carries meaning and is kept as its own token.
pub static PUNCTUATION_TO_KEEP: Lazy<Regex> = Lazy::new(|| Regex::new(r"[;!.?$%&]").unwrap());

/// Regex to collapse any whitespace run into a single space
pub static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

// ============================================================================
// CONTRACTIONS
// ============================================================================

/// Elisions common in song titles and lyrics, keyed by their lowercase form.
/// Standard contractions ("don't", "can't") are left alone and only lose their apostrophe.
pub static CONTRACTIONS: Lazy<FxHashMap<&str, &str>> = Lazy::new(|| {
    let mut m = FxHashMap::default();
    m.insert("'cause", "because");
    m.insert("'cos", "because");
    m.insert("'til", "until");
    m.insert("'till", "until");
    m.insert("'bout", "about");
    m.insert("'round", "around");
    m.insert("'fore", "before");
    m.insert("'em", "them");
    m.insert("'n'", "and");
    m.insert("'n", "and");
    m.insert("n'", "and");
    m.insert("o'", "of");
    m.insert("ol'", "old");
    m.insert("lil'", "little");
    m.insert("'twas", "it was");
    m.insert("'tis", "it is");
    m.insert("c'mon", "come on");
    m.insert("y'all", "you all");
    m.insert("ma'am", "madam");
    m
});

/// Expand a single whitespace-delimited word.
///
/// Surrounding punctuation (other than apostrophes, which are part of the
/// elision) is peeled off before lookup and put back afterwards.
/// A dropped-g ending ("lovin'") becomes "-ing".
pub fn expand_contraction(word: &str) -> String {
    let is_peelable = |c: char| c.is_ascii_punctuation() && c != '\'';
    let core = word.trim_start_matches(is_peelable);
    let leading = &word[..word.len() - core.len()];
    let core = core.trim_end_matches(is_peelable);
    let trailing = &word[leading.len() + core.len()..];

    let lower = core.to_lowercase();
    let expanded = if let Some(&replacement) = CONTRACTIONS.get(lower.as_str()) {
        Some(replacement.to_string())
    } else if lower.len() > 3
        && lower.ends_with("in'")
        && lower[..lower.len() - 3].chars().all(char::is_alphabetic)
    {
        Some(format!("{}ing", &core[..core.len() - 3]))
    } else {
        None
    };

    match expanded {
        Some(replacement) => {
            let starts_upper = core
                .chars()
                .find(|c| c.is_alphabetic())
                .is_some_and(char::is_uppercase);
            let replacement = if starts_upper {
                capitalize(&replacement)
            } else {
                replacement
            };
            format!("{}{}{}", leading, replacement, trailing)
        }
        None => word.to_string(),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Check if a character is a Unicode combining mark (diacritical mark).
pub fn is_combining_mark(c: char) -> bool {
    matches!(c as u32, 0x0300..=0x036F | 0x1AB0..=0x1AFF | 0x1DC0..=0x1DFF | 0x20D0..=0x20FF | 0xFE20..=0xFE2F)
}

/// Decompose and transliterate to ASCII, preserving case.
/// e.g., "Beyoncé" → "Beyonce", "Кино" → "Kino"
pub fn transliterate(s: &str) -> String {
    // First strip diacritics via NFKD decomposition
    let stripped: String = s.nfkd().filter(|c| !is_combining_mark(*c)).collect();
    // Then transliterate any remaining non-ASCII (Cyrillic, Hebrew, CJK, curly quotes, etc.)
    any_ascii(&stripped)
}

/// Fold Unicode text to lowercase ASCII.
/// e.g., "Björk" → "bjork", "Motörhead" → "motorhead"
pub fn fold_to_ascii(s: &str) -> String {
    transliterate(s).to_lowercase()
}

// ============================================================================
// NORMALIZATION FUNCTIONS
// ============================================================================

/// Normalize a free-text query (or a title that will be compared to one).
///
/// Transliterates, expands elisions, drops quotes, collapses word-separating
/// punctuation and hyphens to spaces, splits `; ! . ? $ % &` into their own
/// tokens and collapses whitespace. Case is preserved.
pub fn normalize_query(query: &str) -> String {
    let decoded = transliterate(query);

    let expanded = WHITESPACE
        .split(&decoded)
        .map(expand_contraction)
        .collect::<Vec<_>>()
        .join(" ");

    let unquoted = QUOTES.replace_all(&expanded, "");
    let separated = INTER_WORD_PUNCTUATION.replace_all(&unquoted, " ");
    // Add a space before all kept punctuation so it becomes a separate "word"
    let tokenized = PUNCTUATION_TO_KEEP.replace_all(&separated, " $0");

    WHITESPACE.replace_all(&tokenized, " ").trim().to_string()
}

/// Case-insensitive comparison form of a query or title.
pub fn match_form(s: &str) -> String {
    normalize_query(s).to_lowercase()
}

/// Clean a track, artist or album name.
///
/// 1. Remove bracketed statements (e.g. "track name [cover by foo]")
/// 2. Truncate at a featured-artist marker (e.g. "Song feat. FOO")
pub fn clean_track_field(value: &str) -> String {
    let mut cleaned = PARENTHETICAL.replace_all(value, "").trim().to_string();
    if let Some(m) = FEAT_MARKER.find(&cleaned) {
        cleaned = cleaned[..m.start()].trim().to_string();
    }
    cleaned
}

/// Lowercase ASCII form of a cleaned field. Used for identity keys.
pub fn identity_form(value: &str) -> String {
    let folded = fold_to_ascii(&clean_track_field(value));
    WHITESPACE.replace_all(&folded, " ").trim().to_string()
}

/// Word-boundary matcher for one needle. Compile once per query and reuse it
/// across records.
#[derive(Clone, Debug)]
pub struct WordMatcher {
    needle: String,
    pattern: Option<Regex>,
}

impl WordMatcher {
    pub fn new(needle: &str) -> Self {
        let pattern = if needle.is_empty() {
            None
        } else {
            Regex::new(&format!(r"\b{}\b", regex::escape(needle))).ok()
        };
        Self {
            needle: needle.to_string(),
            pattern,
        }
    }

    pub fn needle(&self) -> &str {
        &self.needle
    }

    /// True if the needle occurs in `haystack` on word boundaries. An empty needle never matches.
    pub fn is_match(&self, haystack: &str) -> bool {
        match &self.pattern {
            Some(re) => re.is_match(haystack),
            None => !self.needle.is_empty() && haystack.contains(&self.needle),
        }
    }
}

/// One-off form of [`WordMatcher::is_match`].
pub fn contains_word(haystack: &str, needle: &str) -> bool {
    WordMatcher::new(needle).is_match(haystack)
}

/// File-name-safe form of a query: whitespace runs and path separators become '_'.
pub fn cache_key(query: &str) -> String {
    let joined = WHITESPACE.replace_all(query.trim(), "_");
    joined.replace(['/', '\\'], "_")
}

// ============================================================================
// LYRICS
// ============================================================================

/// Remove transcriber annotations from a lyrics body.
pub fn strip_lyrics_cruft(lyrics: &str) -> String {
    LYRICS_CRUFT.replace_all(lyrics, "").to_string()
}

/// Lowercased lyrics words.
pub fn lyrics_words(lyrics: &str) -> Vec<String> {
    LYRICS_WORD_SEPARATOR
        .split(lyrics)
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Non-overlapping occurrences of the query in the lyrics, both in [`match_form`].
pub fn count_query_references(query: &str, lyrics: &str) -> usize {
    let query = match_form(query);
    if query.is_empty() {
        return 0;
    }
    match_form(lyrics).matches(query.as_str()).count()
}

/// Comparison key for a single lyrics word: elisions expanded, quotes dropped,
/// folded to lowercase ASCII. "Don't" and "dont" share a key, as do "lovin'" and "loving".
pub fn word_key(word: &str) -> String {
    let expanded = expand_contraction(word);
    QUOTES.replace_all(&fold_to_ascii(&expanded), "").into_owned()
}

/// Number of words kept on each side of the first query occurrence.
pub const SNIPPET_RADIUS: usize = 5;

/// Window of lyrics around the first occurrence of the query, with the
/// occurrence uppercased. Multi-word queries match a contiguous word run.
/// Words are compared by [`word_key`], so a normalized query still finds
/// "Don't" or "Beyoncé" in the original text.
pub fn lyrics_snippet(query: &str, clean_lyrics: &str) -> LyricsSnippet {
    let mut words = lyrics_words(clean_lyrics);
    if words.is_empty() {
        return LyricsSnippet::Empty;
    }

    let query_keys: Vec<String> = lyrics_words(query).iter().map(|w| word_key(w)).collect();
    if query_keys.is_empty() || query_keys.len() > words.len() {
        return LyricsSnippet::Missing;
    }

    let keys: Vec<String> = words.iter().map(|w| word_key(w)).collect();
    let Some(start_of_match) = keys
        .windows(query_keys.len())
        .position(|window| window == query_keys.as_slice())
    else {
        return LyricsSnippet::Missing;
    };
    let end_of_match = start_of_match + query_keys.len();

    for word in &mut words[start_of_match..end_of_match] {
        *word = word.to_uppercase();
    }

    let start = start_of_match.saturating_sub(SNIPPET_RADIUS);
    let end = (end_of_match + SNIPPET_RADIUS).min(words.len());
    LyricsSnippet::Window(words[start..end].join(" "))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLES: &[&str] = &[
        "",
        "!!!",
        "...",
        "---",
        "'",
        "Don't Stop",
        "dont stop",
        "Rock 'n' Roll",
        "Nothin' but a G thang",
        "'Cause I said so",
        "Beyoncé - Halo",
        "self-love",
        "hello, world!",
        "AC/DC: Back in Black",
        "$5 & 10% off?",
        "“Curly” quotes ‘here’",
        "  spaced    out  ",
        "Кино",
        "what's up; doc?",
        "#1 (feat. Someone)",
    ];

    #[test]
    fn test_normalize_query_idempotent() {
        for sample in SAMPLES {
            let once = normalize_query(sample);
            assert_eq!(normalize_query(&once), once, "not idempotent for {:?}", sample);
        }
    }

    #[test]
    fn test_normalize_query_basic() {
        assert_eq!(normalize_query("Don't Stop"), "Dont Stop");
        assert_eq!(normalize_query("Rock 'n' Roll"), "Rock and Roll");
        assert_eq!(normalize_query("Nothin' but love"), "Nothing but love");
        assert_eq!(normalize_query("'Cause I said so"), "Because I said so");
        assert_eq!(normalize_query("Beyoncé - Halo"), "Beyonce Halo");
        assert_eq!(normalize_query("self-love"), "self love");
        assert_eq!(normalize_query("hello, world!"), "hello world !");
        assert_eq!(normalize_query("  spaced    out  "), "spaced out");
        assert_eq!(normalize_query(""), "");
        assert_eq!(normalize_query("!!!"), "! ! !");
    }

    #[test]
    fn test_match_form_equates_apostrophe_variants() {
        assert_eq!(match_form("Don't Stop"), match_form("dont stop"));
        assert_eq!(match_form("DON’T STOP"), "dont stop");
    }

    #[test]
    fn test_expand_contraction_keeps_surrounding_punctuation() {
        assert_eq!(expand_contraction("(lovin',"), "(loving,");
        assert_eq!(expand_contraction("'til"), "until");
        assert_eq!(expand_contraction("Y'all"), "You all");
        assert_eq!(expand_contraction("don't"), "don't");
        assert_eq!(expand_contraction("in'"), "in'");
    }

    #[test]
    fn test_clean_track_field() {
        assert_eq!(clean_track_field("Song Title (Live) [Remastered]"), "Song Title");
        assert_eq!(clean_track_field("Track Name [cover by foo]"), "Track Name");
        assert_eq!(clean_track_field("Song Feat. Someone Else"), "Song");
        assert_eq!(clean_track_field("Song (feat. Someone)"), "Song");
        assert_eq!(clean_track_field("  Plain  "), "Plain");
        assert_eq!(clean_track_field("Artist {x} <y>"), "Artist");
    }

    #[test]
    fn test_clean_track_field_idempotent() {
        for sample in SAMPLES.iter().chain(["Song (Live) feat. X", "a [b] c (d) feat. e"].iter()) {
            let once = clean_track_field(sample);
            assert_eq!(clean_track_field(&once), once, "not idempotent for {:?}", sample);
        }
    }

    #[test]
    fn test_identity_form() {
        assert_eq!(identity_form("Beyoncé (Remastered)"), "beyonce");
        assert_eq!(identity_form("Halo feat. Someone"), "halo");
    }

    #[test]
    fn test_fold_to_ascii() {
        assert_eq!(fold_to_ascii("Björk"), "bjork");
        assert_eq!(fold_to_ascii("Motörhead"), "motorhead");
        assert_eq!(fold_to_ascii("Beyoncé"), "beyonce");
    }

    #[test]
    fn test_strip_lyrics_cruft() {
        let lyrics = "I love you\n\n******* This Lyrics is NOT for Commercial use *******\n(1409617829412)";
        assert_eq!(strip_lyrics_cruft(lyrics).trim(), "I love you");
    }

    #[test]
    fn test_count_query_references() {
        assert_eq!(count_query_references("love", "I love you, I LOVE you so"), 2);
        assert_eq!(count_query_references("Love", "lovely love"), 2);
        assert_eq!(count_query_references("", "anything"), 0);
    }

    #[test]
    fn test_count_query_references_normalized_query() {
        let lyrics = "don't stop me now, don't stop";
        assert_eq!(count_query_references(&normalize_query("Don't Stop"), lyrics), 2);
        assert_eq!(count_query_references("Beyonce", "Beyoncé, oh beyoncé"), 2);
        assert_eq!(count_query_references("Beyoncé", "beyonce"), 1);
    }

    #[test]
    fn test_word_key() {
        assert_eq!(word_key("Don't"), "dont");
        assert_eq!(word_key("lovin'"), "loving");
        assert_eq!(word_key("Beyoncé"), "beyonce");
    }

    #[test]
    fn test_lyrics_snippet_window() {
        let snippet = lyrics_snippet("love", "I love you, I love you so");
        assert_eq!(snippet, LyricsSnippet::Window("i LOVE you i love you so".to_string()));
    }

    #[test]
    fn test_lyrics_snippet_radius() {
        let lyrics = "one two three four five six seven eight nine ten eleven twelve";
        let snippet = lyrics_snippet("seven", lyrics);
        assert_eq!(
            snippet,
            LyricsSnippet::Window("two three four five six SEVEN eight nine ten eleven twelve".to_string())
        );
    }

    #[test]
    fn test_lyrics_snippet_multi_word() {
        let snippet = lyrics_snippet("dont stop", "we dont stop now");
        assert_eq!(snippet, LyricsSnippet::Window("we DONT STOP now".to_string()));
    }

    #[test]
    fn test_lyrics_snippet_finds_original_spelling() {
        let snippet = lyrics_snippet("Dont Stop", "don't stop me now don't stop");
        assert_eq!(snippet, LyricsSnippet::Window("DON'T STOP me now don't stop".to_string()));

        let snippet = lyrics_snippet("Beyonce", "call me beyoncé tonight");
        assert_eq!(snippet, LyricsSnippet::Window("call me BEYONCÉ tonight".to_string()));
    }

    #[test]
    fn test_lyrics_snippet_sentinels() {
        assert_eq!(lyrics_snippet("love", ""), LyricsSnippet::Empty);
        assert_eq!(lyrics_snippet("love", "!!! ???"), LyricsSnippet::Empty);
        assert_eq!(lyrics_snippet("love", "lovely day"), LyricsSnippet::Missing);
    }

    #[test]
    fn test_contains_word() {
        assert!(contains_word("love me do", "love"));
        assert!(!contains_word("lovely day", "love"));
        assert!(!contains_word("anything", ""));
    }

    #[test]
    fn test_word_matcher_reused_across_haystacks() {
        let matcher = WordMatcher::new("dont stop");
        assert_eq!(matcher.needle(), "dont stop");
        assert!(matcher.is_match("dont stop believin"));
        assert!(matcher.is_match("we dont stop"));
        assert!(!matcher.is_match("dont stopping"));
        assert!(!WordMatcher::new("").is_match("anything"));
        assert!(WordMatcher::new("a.b").is_match("x a.b y"));
    }

    #[test]
    fn test_cache_key() {
        assert_eq!(cache_key("dont stop"), "dont_stop");
        assert_eq!(cache_key(" AC/DC  rocks "), "AC_DC_rocks");
    }
}
