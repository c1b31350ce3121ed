use crate::feed::Entry;

/// Decides whether two entries from independently fetched documents are the
/// same logical item.
///
/// Implementations must be pure: the differ may call them many times per
/// comparison and expects the same answer each time.
pub trait EntryIdentity {
    fn same_entry(&self, a: &Entry, b: &Entry) -> bool;
}

/// Default identity: `title` and `updated` must both match exactly.
///
/// No trimming, case folding or date normalisation. Two distinct entries
/// sharing a title and timestamp collide, and an entry whose title or
/// timestamp changed is reported as new.
#[derive(Debug, Clone, Copy, Default)]
pub struct TitleAndUpdated;

impl EntryIdentity for TitleAndUpdated {
    fn same_entry(&self, a: &Entry, b: &Entry) -> bool {
        a.updated == b.updated && a.title == b.title
    }
}

/// Prefers the Atom `id` when both entries carry one.
///
/// Falls back to [`TitleAndUpdated`] if either id is empty. With ids
/// present, an edited entry (new `updated`) is still the same item.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdOrTitleAndUpdated;

impl EntryIdentity for IdOrTitleAndUpdated {
    fn same_entry(&self, a: &Entry, b: &Entry) -> bool {
        if !a.id.is_empty() && !b.id.is_empty() {
            return a.id == b.id;
        }
        TitleAndUpdated.same_entry(a, b)
    }
}

impl<F> EntryIdentity for F
where
    F: Fn(&Entry, &Entry) -> bool,
{
    fn same_entry(&self, a: &Entry, b: &Entry) -> bool {
        self(a, b)
    }
}
