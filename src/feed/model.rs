use chrono::{DateTime, FixedOffset};

// ============================================================================
// Atom Documents
// ============================================================================

/// A parsed Atom `<feed>` document.
///
/// Entries keep the order in which they appear in the source document.
/// That order carries no meaning for comparison; see [`crate::diff`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Feed {
    pub id: String,
    pub title: String,
    pub updated: String,
    pub links: Vec<Link>,
    pub author: Option<Person>,
    pub entries: Vec<Entry>,
}

/// A single Atom `<entry>`.
///
/// Text fields hold the character data exactly as it appeared in the
/// document, whitespace included. Entry identity compares these raw values,
/// so no normalisation happens at parse time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Entry {
    pub title: String,
    pub id: String,
    pub links: Vec<Link>,
    pub published: String,
    pub updated: String,
    pub author: Option<Person>,
    pub summary: Option<Text>,
    pub content: Option<Text>,
}

/// An Atom `<link>` element. All fields come from attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Link {
    pub rel: String,
    pub href: String,
    pub media_type: String,
    pub hreflang: String,
    pub title: String,
    pub length: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Person {
    pub name: String,
    pub uri: String,
    pub email: String,
}

/// A text construct such as `<summary>` or `<content>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Text {
    /// The `type` attribute (`text`, `html`, `xhtml`), empty when absent.
    pub kind: String,
    pub body: String,
}

// ============================================================================
// Accessors
// ============================================================================

impl Entry {
    /// `updated` parsed as RFC 3339, or `None` when absent or malformed.
    ///
    /// Surrounding whitespace is ignored here only; [`Entry::updated`]
    /// itself keeps the raw text.
    pub fn updated_at(&self) -> Option<DateTime<FixedOffset>> {
        parse_timestamp(&self.updated)
    }

    /// `published` parsed as RFC 3339, or `None` when absent or malformed.
    pub fn published_at(&self) -> Option<DateTime<FixedOffset>> {
        parse_timestamp(&self.published)
    }

    /// The entry's preferred link target.
    ///
    /// Picks the first `rel="alternate"` link (a missing `rel` means
    /// alternate per RFC 4287), falling back to the first link of any kind.
    pub fn link(&self) -> Option<&str> {
        self.links
            .iter()
            .find(|l| l.rel.is_empty() || l.rel == "alternate")
            .or_else(|| self.links.first())
            .map(|l| l.href.as_str())
    }
}

impl Feed {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(raw).ok()
}
