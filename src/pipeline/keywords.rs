//! Keyword matching against story titles.

/// Find the first keyword (in insertion order) contained in the title.
///
/// Matching is case-insensitive substring containment; the stored,
/// case-preserved keyword is returned. An empty keyword set never matches.
pub fn match_keyword<'a>(title: &str, keywords: &'a [String]) -> Option<&'a str> {
    if keywords.is_empty() {
        return None;
    }
    let title = title.to_lowercase();
    keywords
        .iter()
        .find(|k| !k.is_empty() && title.contains(&k.to_lowercase()))
        .map(String::as_str)
}
