//! Publish-date normalization for heterogeneous feed dates.
//!
//! Feeds in the wild mix RFC 2822, ISO 8601, and localized Sinhala month
//! names, sometimes with decorative offset text appended. `normalize` tries
//! each representation in turn and returns `None` when nothing parses —
//! callers must treat `None` as "unknown", never as "now".

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Sinhala month names mapped to the English abbreviations chrono can parse.
const SINHALA_MONTHS: &[(&str, &str)] = &[
    ("ජනවාරි", "Jan"),
    ("පෙබරවාරි", "Feb"),
    ("මාර්තු", "Mar"),
    ("අප්‍රේල්", "Apr"),
    ("මැයි", "May"),
    ("ජූනි", "Jun"),
    ("ජූලි", "Jul"),
    ("අගෝස්තු", "Aug"),
    ("සැප්තැම්බර්", "Sep"),
    ("ඔක්තෝබර්", "Oct"),
    ("නොවැම්බර්", "Nov"),
    ("දෙසැම්බර්", "Dec"),
];

/// Naive (offset-free) formats seen after artifact stripping.
const NAIVE_FORMATS: &[&str] = &[
    "%d %b %Y %H:%M:%S",
    "%d %b %Y %H:%M",
    "%b %d, %Y %H:%M:%S",
    "%b %d, %Y",
    "%d %b %Y",
];

/// Convert raw feed date text to a UTC timestamp, or `None` when unparseable.
///
/// Strategy: strip known non-parseable offset artifacts, attempt direct
/// parsing, then substitute Sinhala month names with English abbreviations
/// and retry. Never panics and never errors past this boundary.
pub fn normalize(raw: &str) -> Option<DateTime<Utc>> {
    let cleaned = strip_artifacts(raw);
    if cleaned.is_empty() {
        return None;
    }
    parse_attempt(&cleaned).or_else(|| parse_attempt(&substitute_months(&cleaned)))
}

fn parse_attempt(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
        }
    }
    None
}

/// Drop trailing parenthesized zone labels like "(+0530)" or "(Sri Lanka
/// Standard Time)" that break both RFC parsers, and collapse whitespace runs.
fn strip_artifacts(raw: &str) -> String {
    let mut text = raw.trim();
    if let (Some(open), true) = (text.rfind('('), text.ends_with(')')) {
        text = text[..open].trim_end();
    }
    let mut out = String::with_capacity(text.len());
    let mut last_was_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(c);
            last_was_space = false;
        }
    }
    out
}

fn substitute_months(text: &str) -> String {
    let mut out = text.to_string();
    for (sinhala, english) in SINHALA_MONTHS {
        if out.contains(sinhala) {
            out = out.replace(sinhala, english);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_rfc2822_date() {
        let dt = normalize("Wed, 01 Jan 2025 06:30:00 +0530").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2025, 1, 1, 1, 0, 0).unwrap());
    }

    #[test]
    fn test_rfc2822_gmt_suffix() {
        let dt = normalize("Mon, 10 Mar 2025 12:00:00 GMT").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_rfc3339_date() {
        let dt = normalize("2025-06-15T08:45:00Z").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2025, 6, 15, 8, 45, 0).unwrap());
    }

    #[test]
    fn test_parenthesized_zone_artifact_stripped() {
        let dt = normalize("Wed, 01 Jan 2025 06:30:00 +0530 (+0530)").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2025, 1, 1, 1, 0, 0).unwrap());
    }

    #[test]
    fn test_sinhala_month_substitution() {
        let dt = normalize("05 ජනවාරි 2025 18:00:00").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2025, 1, 5, 18, 0, 0).unwrap());
    }

    #[test]
    fn test_sinhala_month_date_only() {
        let dt = normalize("12 දෙසැම්බර් 2024").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 12, 12, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_garbage_yields_none() {
        assert_eq!(normalize("Recent"), None);
        assert_eq!(normalize("tomorrow-ish"), None);
        assert_eq!(normalize(""), None);
        assert_eq!(normalize("   "), None);
    }

    #[test]
    fn test_whitespace_runs_collapsed() {
        let dt = normalize("Wed,  01  Jan 2025 06:30:00 +0530").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2025, 1, 1, 1, 0, 0).unwrap());
    }
}
