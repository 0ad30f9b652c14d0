//! Hybrid string similarity used by the fuzzy resolution stage.
//!
//! All scores are in `0.0..=100.0`. The building block is the normalized
//! Levenshtein similarity from `strsim` (`ratio`); token-based variants
//! make word order and extra words matter less, and partial variants let
//! a short query match part of a long title.

use std::collections::BTreeSet;

/// Scale applied to token-based scores so they never beat a real
/// whole-string match.
const UNBASE_SCALE: f64 = 0.95;

/// Lowercase, replace anything that is not alphanumeric with a space and
/// trim both ends.
pub fn default_process(text: &str) -> String {
    let mapped: String = text
        .chars()
        .flat_map(|c| {
            let keep = if c.is_alphanumeric() { c } else { ' ' };
            keep.to_lowercase()
        })
        .collect();
    mapped.trim().to_string()
}

/// Normalized Levenshtein similarity of two strings, scaled to 100.
///
/// ```
/// use filmshelf::fuzzy::ratio;
///
/// assert_eq!(ratio("alien", "alien"), 100.0);
/// assert_eq!(ratio("abcd", "abxy"), 50.0);
/// ```
pub fn ratio(a: &str, b: &str) -> f64 {
    100.0 * strsim::normalized_levenshtein(a, b)
}

/// Byte offsets of every char boundary in `text`, including the end.
fn boundaries(text: &str) -> Vec<usize> {
    text.char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect()
}

fn char_slice<'a>(
    text: &'a str,
    bounds: &[usize],
    from: usize,
    to: usize,
) -> &'a str {
    &text[bounds[from]..bounds[to]]
}

/// Best `ratio` of the shorter string against any equally long window of
/// the longer one, including windows clipped at either edge.
pub fn partial_ratio(a: &str, b: &str) -> f64 {
    let (short, long) = if a.chars().count() <= b.chars().count() {
        (a, b)
    } else {
        (b, a)
    };

    let n = short.chars().count();
    if n == 0 {
        return if long.is_empty() { 100.0 } else { 0.0 };
    }

    // bounds[i] is the byte offset of char i; the last entry is the end.
    let bounds = boundaries(long);
    let chars = bounds.len() - 1;
    let window = |from: usize, to: usize| char_slice(long, &bounds, from, to);

    let full_windows = (0..=chars - n).map(|s| window(s, s + n));
    let head_windows = (1..n).map(|k| window(0, k.min(chars)));
    let tail_windows = (1..n).map(|k| window(chars.saturating_sub(k), chars));

    let mut best: f64 = 0.0;
    for candidate in full_windows.chain(head_windows).chain(tail_windows) {
        best = best.max(ratio(short, candidate));
        if best >= 100.0 {
            break;
        }
    }
    best
}

fn sorted_tokens(text: &str) -> Vec<&str> {
    let mut tokens: Vec<&str> = text.split_whitespace().collect();
    tokens.sort_unstable();
    tokens
}

/// `ratio` after sorting the words of both strings.
pub fn token_sort_ratio(a: &str, b: &str) -> f64 {
    ratio(&sorted_tokens(a).join(" "), &sorted_tokens(b).join(" "))
}

struct TokenSets<'a> {
    intersection: Vec<&'a str>,
    only_a: Vec<&'a str>,
    only_b: Vec<&'a str>,
}

impl<'a> TokenSets<'a> {
    fn new(a: &'a str, b: &'a str) -> Self {
        let set_a: BTreeSet<&str> = a.split_whitespace().collect();
        let set_b: BTreeSet<&str> = b.split_whitespace().collect();
        Self {
            intersection: set_a.intersection(&set_b).copied().collect(),
            only_a: set_a.difference(&set_b).copied().collect(),
            only_b: set_b.difference(&set_a).copied().collect(),
        }
    }

    /// One side's words are a subset of the other's.
    fn is_subset_match(&self) -> bool {
        !self.intersection.is_empty()
            && (self.only_a.is_empty() || self.only_b.is_empty())
    }
}

fn joined(prefix: &str, rest: &[&str]) -> String {
    match (prefix.is_empty(), rest.is_empty()) {
        (true, _) => rest.join(" "),
        (false, true) => prefix.to_string(),
        (false, false) => format!("{prefix} {}", rest.join(" ")),
    }
}

/// Compares the shared words against each side's shared-plus-extra words.
pub fn token_set_ratio(a: &str, b: &str) -> f64 {
    let sets = TokenSets::new(a, b);
    if sets.is_subset_match() {
        return 100.0;
    }

    let sect = sets.intersection.join(" ");
    let with_a = joined(&sect, &sets.only_a);
    let with_b = joined(&sect, &sets.only_b);

    if sect.is_empty() {
        return ratio(&with_a, &with_b);
    }
    ratio(&sect, &with_a)
        .max(ratio(&sect, &with_b))
        .max(ratio(&with_a, &with_b))
}

pub fn partial_token_ratio(a: &str, b: &str) -> f64 {
    let sets = TokenSets::new(a, b);
    if sets.is_subset_match() {
        return 100.0;
    }

    let sorted = partial_ratio(
        &sorted_tokens(a).join(" "),
        &sorted_tokens(b).join(" "),
    );
    if sets.intersection.is_empty() {
        return sorted;
    }
    sorted.max(partial_ratio(&sets.only_a.join(" "), &sets.only_b.join(" ")))
}

/// Weighted blend of whole-string, partial and token scores.
///
/// Both inputs go through [`default_process`] first. Returns `0.0` if
/// either side is empty after processing.
///
/// ```
/// use filmshelf::fuzzy::weighted_ratio;
///
/// assert_eq!(weighted_ratio("Alien", "alien!"), 100.0);
/// assert!(weighted_ratio("godfather", "The Godfather") >= 90.0);
/// assert!(weighted_ratio("xyz", "Inception") < 60.0);
/// ```
pub fn weighted_ratio(query: &str, candidate: &str) -> f64 {
    let a = default_process(query);
    let b = default_process(candidate);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let len_a = a.chars().count() as f64;
    let len_b = b.chars().count() as f64;
    let len_ratio = len_a.max(len_b) / len_a.min(len_b);

    let whole = ratio(&a, &b);
    if len_ratio < 1.5 {
        let token =
            token_sort_ratio(&a, &b).max(token_set_ratio(&a, &b));
        return whole.max(token * UNBASE_SCALE);
    }

    let partial_scale = if len_ratio < 8.0 { 0.9 } else { 0.6 };
    let partial = partial_ratio(&a, &b) * partial_scale;
    let partial_token =
        partial_token_ratio(&a, &b) * UNBASE_SCALE * partial_scale;
    whole.max(partial).max(partial_token)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn process_strips_punctuation_and_case() {
        assert_eq!(default_process("  Star Wars: Episode IV! "), "star wars  episode iv");
    }

    #[test]
    fn ratio_of_empty_strings() {
        assert_eq!(ratio("", ""), 100.0);
        assert_eq!(ratio("abc", ""), 0.0);
    }

    #[test]
    fn partial_ratio_finds_substring() {
        assert_eq!(partial_ratio("matrix", "the matrix reloaded"), 100.0);
    }

    #[test]
    fn partial_ratio_uses_edge_windows() {
        // "xma" overlaps the start of "matrix" by two characters only.
        let score = partial_ratio("xma", "matrix");
        assert!(score > 60.0, "got {score}");
    }

    #[test]
    fn partial_ratio_respects_char_boundaries() {
        let score = partial_ratio("amelie", "le fabuleux destin d'amélie");
        assert!(score > 60.0, "got {score}");
    }

    #[test]
    fn token_sort_ignores_word_order() {
        assert_eq!(token_sort_ratio("runner blade", "blade runner"), 100.0);
    }

    #[test]
    fn token_set_subset_is_full_match() {
        assert_eq!(token_set_ratio("godfather", "the godfather"), 100.0);
    }

    #[test]
    fn weighted_ratio_empty_is_zero() {
        assert_eq!(weighted_ratio("", "Alien"), 0.0);
        assert_eq!(weighted_ratio("!!!", "Alien"), 0.0);
    }

    #[test]
    fn weighted_ratio_tolerates_typos() {
        let score = weighted_ratio("Incepshun", "Inception");
        assert!(score >= 60.0, "got {score}");
    }

    #[test]
    fn weighted_ratio_scales_token_matches() {
        assert_eq!(weighted_ratio("godfather", "The Godfather"), 95.0);
    }

    proptest! {
        #[test]
        fn weighted_ratio_is_bounded(a in "[a-zA-Z ]{0,16}", b in "[a-zA-Z ]{0,16}") {
            let score = weighted_ratio(&a, &b);
            prop_assert!((0.0..=100.0).contains(&score));
        }

        #[test]
        fn identical_nonblank_strings_score_full(a in "[a-z]{1,12}( [a-z]{1,8}){0,3}") {
            prop_assert_eq!(weighted_ratio(&a, &a), 100.0);
        }
    }
}
