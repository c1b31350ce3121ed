//! Atom document model and acquisition.
//!
//! - **Model**: [`Feed`], [`Entry`] and the Atom constructs they carry
//! - **Parsing**: charset-aware decoding of `<entry>` and `<feed>` documents
//! - **Fetching**: single-GET HTTP retrieval through an injected client
//!
//! # Example
//!
//! ```ignore
//! use atomdiff::{FeedFetcher, FetchConfig};
//!
//! let fetcher = FeedFetcher::from_config(FetchConfig::default())?;
//! let (snapshot, _raw) = fetcher.fetch_feed("https://example.com/feed.atom").await?;
//!
//! // Later
//! let update = fetcher.changes_since(&snapshot, "https://example.com/feed.atom").await?;
//! for entry in &update.new_entries {
//!     println!("new: {}", entry.title);
//! }
//! ```

mod fetcher;
mod model;
mod parser;

pub use fetcher::{FeedFetcher, FeedUpdate, FetchError};
pub use model::{Entry, Feed, Link, Person, Text};
pub use parser::{parse_bytes, parse_feed_bytes, parse_feed_str, parse_str, ParseError};
