use unicode_normalization::UnicodeNormalization;

/// Canonicalize a title for equality and containment checks.
///
/// Applies NFKD compatibility decomposition, full Unicode case folding
/// (so `"Straße"` and `"STRASSE"` compare equal), then collapses every
/// run of whitespace into a single space and trims both ends.
///
/// # Examples
///
/// ```
/// use filmshelf::normalize::normalize_title;
///
/// assert_eq!(normalize_title("  The   Matrix "), "the matrix");
/// assert_eq!(normalize_title("Straße"), normalize_title("STRASSE"));
/// ```
pub fn normalize_title(text: &str) -> String {
    let decomposed: String = text.nfkd().collect();
    let folded = fold_case(&decomposed);
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Full Unicode case folding without any other normalization.
pub fn fold_case(text: &str) -> String {
    caseless::default_case_fold_str(text)
}

/// Whether two titles name the same movie under normalized comparison.
pub fn same_title(a: &str, b: &str) -> bool {
    normalize_title(a) == normalize_title(b)
}
