//! Title quality filter applied before a scraped story is accepted.
//!
//! Real-world feeds occasionally wrap section headers or ellipsis-only
//! placeholders in story markup. The filter rejects those while still
//! accepting short legitimate headlines in Latin or Sinhala script.

/// Minimum count of information-carrying characters for an acceptable title.
const MIN_LETTER_COUNT: usize = 3;

/// Section labels that sometimes leak into `<item>` markup as fake stories.
const CATEGORY_LABELS: &[&str] = &[
    "Latest News",
    "Hot News",
    "Breaking News",
    "Sports",
    "Business",
    "Video",
    "Photo Gallery",
];

/// Decide whether a scraped title carries enough information to be a story.
///
/// Rejects empty titles, exact category labels, and titles with fewer than
/// three letters, counting Latin letters, ASCII digits, and base Sinhala
/// letters. Combining signs and punctuation do not count, so "..." and "??"
/// are rejected while a three-letter headline in either script passes.
pub fn acceptable_title(title: &str) -> bool {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return false;
    }
    if CATEGORY_LABELS
        .iter()
        .any(|label| label.eq_ignore_ascii_case(trimmed))
    {
        return false;
    }
    trimmed.chars().filter(|c| is_letter(*c)).count() >= MIN_LETTER_COUNT
}

/// Latin letters, ASCII digits, and base Sinhala letters (independent vowels
/// U+0D85..=U+0D96 and consonants U+0D9A..=U+0DC6). Sinhala vowel signs and
/// al-lakuna (U+0DCA..) are combining marks and intentionally excluded.
fn is_letter(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(c, '\u{0D85}'..='\u{0D96}' | '\u{0D9A}'..='\u{0DC6}')
}
