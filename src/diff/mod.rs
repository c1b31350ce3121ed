//! Snapshot comparison for Atom feeds.
//!
//! Given two [`Feed`] values parsed at different times, the differ reports
//! the entries present on one side with no identity match on the other.
//! Identity is pluggable through [`EntryIdentity`]; the default is
//! [`TitleAndUpdated`].
//!
//! Two comparison modes exist:
//!
//! - [`compare_old_and_new`] - every entry of the newer snapshot missing
//!   from the older one. This is the usual "what's new" question.
//! - [`compare_items`] - entries unique to whichever snapshot has more
//!   entries, with an equal-length short-circuit (see below).
//!
//! # Equal-length short-circuit
//!
//! `compare_items` returns nothing when both feeds have the same number of
//! entries, even if every entry differs. Existing consumers depend on this,
//! so it is the default. Build a [`FeedDiffer`] with
//! [`FeedDiffer::with_equal_length_short_circuit`]`(false)` for a real
//! comparison.
//!
//! Both modes are O(n·m) linear scans. Results borrow from the input feeds
//! and keep the source side's document order.

mod identity;

pub use identity::{EntryIdentity, IdOrTitleAndUpdated, TitleAndUpdated};

use crate::feed::{Entry, Feed};

/// Configurable feed comparison.
#[derive(Debug, Clone)]
pub struct FeedDiffer<I = TitleAndUpdated> {
    identity: I,
    equal_length_short_circuit: bool,
}

impl Default for FeedDiffer<TitleAndUpdated> {
    fn default() -> Self {
        Self::new(TitleAndUpdated)
    }
}

impl<I: EntryIdentity> FeedDiffer<I> {
    pub fn new(identity: I) -> Self {
        Self {
            identity,
            equal_length_short_circuit: true,
        }
    }

    /// Controls the equal-length short-circuit of [`FeedDiffer::compare_items`].
    ///
    /// When disabled and both feeds have the same length, `feed_one` is
    /// treated as the bigger side.
    pub fn with_equal_length_short_circuit(mut self, enabled: bool) -> Self {
        self.equal_length_short_circuit = enabled;
        self
    }

    /// Entries of the feed with more entries that have no identity match in
    /// the other feed.
    ///
    /// Returns an empty vector when both feeds have the same number of
    /// entries and the short-circuit is enabled (the default).
    pub fn compare_items<'a>(&self, feed_one: &'a Feed, feed_two: &'a Feed) -> Vec<&'a Entry> {
        let (bigger, smaller) = match feed_two.entries.len().cmp(&feed_one.entries.len()) {
            std::cmp::Ordering::Greater => (feed_two, feed_one),
            std::cmp::Ordering::Less => (feed_one, feed_two),
            std::cmp::Ordering::Equal if self.equal_length_short_circuit => return Vec::new(),
            std::cmp::Ordering::Equal => (feed_one, feed_two),
        };
        self.unmatched(&bigger.entries, &smaller.entries)
    }

    /// Entries of `feed_new` that have no identity match in `feed_old`,
    /// regardless of either feed's size.
    pub fn compare_old_and_new<'a>(&self, feed_old: &Feed, feed_new: &'a Feed) -> Vec<&'a Entry> {
        self.unmatched(&feed_new.entries, &feed_old.entries)
    }

    fn unmatched<'a>(&self, source: &'a [Entry], other: &[Entry]) -> Vec<&'a Entry> {
        source
            .iter()
            .filter(|candidate| {
                !other
                    .iter()
                    .any(|existing| self.identity.same_entry(candidate, existing))
            })
            .collect()
    }
}

/// [`FeedDiffer::compare_items`] with the default identity and the
/// equal-length short-circuit enabled.
pub fn compare_items<'a>(feed_one: &'a Feed, feed_two: &'a Feed) -> Vec<&'a Entry> {
    FeedDiffer::default().compare_items(feed_one, feed_two)
}

/// [`FeedDiffer::compare_old_and_new`] with the default identity.
pub fn compare_old_and_new<'a>(feed_old: &Feed, feed_new: &'a Feed) -> Vec<&'a Entry> {
    FeedDiffer::default().compare_old_and_new(feed_old, feed_new)
}
