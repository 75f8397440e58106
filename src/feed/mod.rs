//! Feed retrieval and tolerant scraping.

pub mod dates;
pub mod fetcher;
pub mod parser;
pub mod quality;

pub use fetcher::{build_client, fetch_raw, FetchError};
pub use parser::{parse_stories, Story, MAX_ITEMS, PLACEHOLDER_IMAGE, UNRESOLVED_LINK};
