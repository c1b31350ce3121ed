//! Atom feed acquisition and snapshot diffing for polling feed monitors.
//!
//! The crate answers one question: which entries changed between two
//! fetches of the same feed?
//!
//! - [`feed`] parses Atom `<entry>` and `<feed>` documents from text, bytes
//!   or a URL
//! - [`diff`] compares two parsed [`Feed`] snapshots
//!
//! ```
//! use atomdiff::{compare_old_and_new, parse_feed_str};
//!
//! let old = parse_feed_str(
//!     "<feed><entry><title>A</title><updated>2024-01-01T00:00:00Z</updated></entry></feed>",
//! ).unwrap();
//! let new = parse_feed_str(
//!     "<feed>\
//!        <entry><title>B</title><updated>2024-01-02T00:00:00Z</updated></entry>\
//!        <entry><title>A</title><updated>2024-01-01T00:00:00Z</updated></entry>\
//!      </feed>",
//! ).unwrap();
//!
//! let added = compare_old_and_new(&old, &new);
//! assert_eq!(added.len(), 1);
//! assert_eq!(added[0].title, "B");
//! ```

pub mod config;
pub mod diff;
mod error;
pub mod feed;
pub mod util;

pub use config::{ConfigError, FetchConfig};
pub use diff::{compare_items, compare_old_and_new, EntryIdentity, FeedDiffer};
pub use error::Error;
pub use feed::{
    parse_bytes, parse_feed_bytes, parse_feed_str, parse_str, Entry, Feed, FeedFetcher,
    FeedUpdate, FetchError, ParseError,
};
