//! Lenient feed scraper.
//!
//! Deliberately not a real XML parser: the feeds this daemon watches are
//! frequently malformed (unescaped ampersands, truncated responses, stray
//! markup inside CDATA), and structured parsers reject them wholesale.
//! Instead the raw text is split on `<item>` delimiters and each fragment is
//! scraped with a small ordered set of extraction rules per field, every rule
//! with an explicit fallback.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use super::dates;
use super::quality::acceptable_title;

/// Upper bound on accepted records per parse pass.
pub const MAX_ITEMS: usize = 15;

/// Title used when a fragment carries no parsable title tag.
pub const FALLBACK_TITLE: &str = "News Update";

/// Sentinel link for fragments whose link cannot be resolved.
pub const UNRESOLVED_LINK: &str = "#";

/// Static placeholder shown when no usable image is found in a fragment.
pub const PLACEHOLDER_IMAGE: &str = "assets/story-placeholder.png";

static TITLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<title>(.*?)</title>").expect("title rule"));
static LINK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<link>(.*?)</link>").expect("link rule"));
static MEDIA_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<(?:media:thumbnail|media:content|enclosure)[^>]+url="([^"]+)""#)
        .expect("media rule")
});
static IMG_SRC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"src=["']([^"']+)["']"#).expect("img src rule"));
static BARE_IMAGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(https?://[^\s"'<>]+\.(?:jpe?g|png|gif|webp))"#).expect("bare image rule")
});
static DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<pubDate>(.*?)</pubDate>").expect("date rule"));

/// One parsed feed entry. Identity for novelty and dedup purposes is `link`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Story {
    pub title: String,
    pub link: String,
    /// Always https (or the local placeholder path).
    pub image: String,
    /// `None` when the publish date was absent or unparseable.
    pub published: Option<DateTime<Utc>>,
}

/// Scrape an ordered sequence of stories out of raw feed text.
///
/// Fragments without a closing `</item>` (truncated fetches) are dropped.
/// Fragments whose title fails the quality filter are dropped. Order is the
/// feed's own (newest first by convention). Scanning stops once [`MAX_ITEMS`]
/// records are accepted.
pub fn parse_stories(raw: &str) -> Vec<Story> {
    let mut stories = Vec::new();

    for fragment in raw.split("<item>").skip(1) {
        let Some(end) = fragment.find("</item>") else {
            continue;
        };
        let fragment = &fragment[..end];

        let title = extract_title(fragment);
        if !acceptable_title(&title) {
            continue;
        }

        stories.push(Story {
            title,
            link: extract_link(fragment),
            image: extract_image(fragment),
            published: extract_date(fragment),
        });
        if stories.len() >= MAX_ITEMS {
            break;
        }
    }

    stories
}

fn extract_title(fragment: &str) -> String {
    TITLE_RE
        .captures(fragment)
        .map(|c| strip_cdata(&c[1]).trim().to_string())
        .unwrap_or_else(|| FALLBACK_TITLE.to_string())
}

fn extract_link(fragment: &str) -> String {
    LINK_RE
        .captures(fragment)
        .map(|c| strip_cdata(&c[1]).trim().to_string())
        .filter(|link| !link.is_empty())
        .unwrap_or_else(|| UNRESOLVED_LINK.to_string())
}

/// Priority-ordered image extraction: media-attachment URL attribute, then an
/// embedded `src=` inside the description, then any bare URL with an image
/// extension. Tracking-pixel-looking candidates are rejected at every step.
fn extract_image(fragment: &str) -> String {
    let candidate = MEDIA_URL_RE
        .captures(fragment)
        .map(|c| c[1].to_string())
        .filter(|url| plausible_image(url))
        .or_else(|| {
            IMG_SRC_RE
                .captures(fragment)
                .map(|c| c[1].to_string())
                .filter(|url| plausible_image(url))
        })
        .or_else(|| {
            BARE_IMAGE_RE
                .captures(fragment)
                .map(|c| c[1].to_string())
                .filter(|url| plausible_image(url))
        });

    match candidate {
        Some(url) => force_https(&url),
        None => PLACEHOLDER_IMAGE.to_string(),
    }
}

fn extract_date(fragment: &str) -> Option<DateTime<Utc>> {
    DATE_RE
        .captures(fragment)
        .and_then(|c| dates::normalize(&c[1]))
}

fn strip_cdata(text: &str) -> String {
    text.replace("<![CDATA[", "").replace("]]>", "")
}

/// Reject ad-tracking pixels and implausibly short URLs.
fn plausible_image(url: &str) -> bool {
    if url.len() < 12 {
        return false;
    }
    let lower = url.to_lowercase();
    !(lower.contains("pixel") || lower.contains("1x1") || lower.contains("spacer"))
}

fn force_https(url: &str) -> String {
    match url.strip_prefix("http://") {
        Some(rest) => format!("https://{}", rest),
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn item(body: &str) -> String {
        format!("<rss><channel><item>{}</item></channel></rss>", body)
    }

    #[test]
    fn test_basic_item() {
        let raw = item(
            "<title>Cabinet reshuffle announced</title>\
             <link>https://example.lk/news/1</link>\
             <pubDate>Wed, 01 Jan 2025 06:30:00 +0530</pubDate>",
        );
        let stories = parse_stories(&raw);
        assert_eq!(stories.len(), 1);
        assert_eq!(stories[0].title, "Cabinet reshuffle announced");
        assert_eq!(stories[0].link, "https://example.lk/news/1");
        assert_eq!(stories[0].image, PLACEHOLDER_IMAGE);
        assert_eq!(
            stories[0].published,
            Some(Utc.with_ymd_and_hms(2025, 1, 1, 1, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_cdata_title_stripped() {
        let raw = item("<title><![CDATA[ Flood warning issued ]]></title><link>https://x/a</link>");
        let stories = parse_stories(&raw);
        assert_eq!(stories[0].title, "Flood warning issued");
    }

    #[test]
    fn test_missing_title_uses_fallback() {
        // The fallback title itself passes the quality filter.
        let raw = item("<link>https://x/a</link>");
        let stories = parse_stories(&raw);
        assert_eq!(stories[0].title, FALLBACK_TITLE);
    }

    #[test]
    fn test_missing_link_uses_sentinel() {
        let raw = item("<title>Headline without a link</title>");
        let stories = parse_stories(&raw);
        assert_eq!(stories[0].link, UNRESOLVED_LINK);
    }

    #[test]
    fn test_unterminated_item_dropped() {
        let raw = "<item><title>First story headline</title><link>https://x/a</link></item>\
                   <item><title>Truncated tail</title><link>https://x/b</link>";
        let stories = parse_stories(raw);
        assert_eq!(stories.len(), 1);
        assert_eq!(stories[0].link, "https://x/a");
    }

    #[test]
    fn test_junk_title_filtered() {
        let raw = format!(
            "{}{}",
            item("<title>...</title><link>https://x/junk</link>"),
            item("<title>Real headline here</title><link>https://x/real</link>")
        );
        let stories = parse_stories(&raw);
        assert_eq!(stories.len(), 1);
        assert_eq!(stories[0].link, "https://x/real");
    }

    #[test]
    fn test_media_thumbnail_preferred_over_description_src() {
        let raw = item(
            "<title>Story with two images</title>\
             <media:thumbnail url=\"https://img.example.lk/thumb-main.jpg\"/>\
             <description>&lt;img src=\"https://img.example.lk/inline.jpg\"&gt;</description>",
        );
        let stories = parse_stories(&raw);
        assert_eq!(stories[0].image, "https://img.example.lk/thumb-main.jpg");
    }

    #[test]
    fn test_description_src_fallback() {
        let raw = item(
            "<title>Story with embedded image</title>\
             <description>&lt;img src='https://img.example.lk/inline.jpg'&gt;</description>",
        );
        let stories = parse_stories(&raw);
        assert_eq!(stories[0].image, "https://img.example.lk/inline.jpg");
    }

    #[test]
    fn test_bare_url_fallback() {
        let raw = item(
            "<title>Story with a bare image URL</title>\
             <description>see https://img.example.lk/photos/scene.png for details</description>",
        );
        let stories = parse_stories(&raw);
        assert_eq!(stories[0].image, "https://img.example.lk/photos/scene.png");
    }

    #[test]
    fn test_no_image_yields_placeholder() {
        let raw = item("<title>Story without any image</title>");
        let stories = parse_stories(&raw);
        assert_eq!(stories[0].image, PLACEHOLDER_IMAGE);
    }

    #[test]
    fn test_http_image_upgraded_to_https() {
        let raw = item(
            "<title>Insecure image story</title>\
             <media:thumbnail url=\"http://img.example.lk/photo.jpg\"/>",
        );
        let stories = parse_stories(&raw);
        assert_eq!(stories[0].image, "https://img.example.lk/photo.jpg");
    }

    #[test]
    fn test_tracking_pixel_rejected() {
        let raw = item(
            "<title>Story with a tracking pixel</title>\
             <media:thumbnail url=\"https://ads.example.com/pixel.gif\"/>",
        );
        let stories = parse_stories(&raw);
        assert_eq!(stories[0].image, PLACEHOLDER_IMAGE);
    }

    #[test]
    fn test_unparseable_date_is_none() {
        let raw = item("<title>Story with bad date</title><pubDate>Recent</pubDate>");
        let stories = parse_stories(&raw);
        assert_eq!(stories[0].published, None);
    }

    #[test]
    fn test_bounded_at_fifteen() {
        let mut raw = String::new();
        for i in 0..50 {
            raw.push_str(&item(&format!(
                "<title>Story number {i}</title><link>https://x/{i}</link>"
            )));
        }
        let stories = parse_stories(&raw);
        assert_eq!(stories.len(), MAX_ITEMS);
        assert_eq!(stories[0].link, "https://x/0");
        assert_eq!(stories[14].link, "https://x/14");
    }

    #[test]
    fn test_order_preserved() {
        let raw = format!(
            "{}{}{}",
            item("<title>Newest story first</title><link>https://x/3</link>"),
            item("<title>Middle story here</title><link>https://x/2</link>"),
            item("<title>Oldest story last</title><link>https://x/1</link>")
        );
        let links: Vec<_> = parse_stories(&raw).into_iter().map(|s| s.link).collect();
        assert_eq!(links, vec!["https://x/3", "https://x/2", "https://x/1"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_stories("").is_empty());
        assert!(parse_stories("<rss><channel></channel></rss>").is_empty());
    }
}
