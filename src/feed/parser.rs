use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

use crate::feed::model::{Entry, Feed, Link, Person, Text};
use crate::util::{check_declared_charset, decode_document, CharsetError};

type XmlReader<'a> = Reader<&'a [u8]>;

/// Errors that can occur while decoding an Atom document.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Malformed XML: mismatched tags, bad escapes, broken attributes.
    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),
    /// The charset could not be resolved or the bytes do not match it.
    #[error(transparent)]
    Charset(#[from] CharsetError),
    /// Non-empty input without any element.
    #[error("Document has no root element")]
    NoRootElement,
    /// The document ended while an element was still open.
    #[error("Unexpected end of document inside <{0}>")]
    Truncated(String),
    /// An attribute value does not fit its Atom type.
    #[error("Invalid value {value:?} for attribute {name}")]
    InvalidAttribute { name: String, value: String },
    /// A full feed was expected but the root element is something else.
    #[error("Expected <feed> root element, found <{0}>")]
    UnexpectedRoot(String),
}

/// Parses a single Atom `<entry>` document from text.
///
/// Empty input is not an error: it yields `Entry::default()`.
///
/// The text is already Unicode, so a declared encoding is only checked
/// for being a known label. Fields are read by local name, so a namespace
/// prefix on the elements does not matter. Unknown elements and attributes
/// are ignored. Character data is kept verbatim, whitespace included.
///
/// # Errors
///
/// - [`ParseError::Charset`] when the declaration names an unknown charset
/// - [`ParseError::Xml`] or [`ParseError::Truncated`] when the XML is malformed
/// - [`ParseError::NoRootElement`] when there is no element at all
/// - [`ParseError::InvalidAttribute`] when a typed attribute does not parse
///
/// # Examples
///
/// ```
/// let entry = atomdiff::parse_str(
///     "<entry><title>Hello</title><updated>2024-01-01T00:00:00Z</updated></entry>",
/// ).unwrap();
/// assert_eq!(entry.title, "Hello");
///
/// assert_eq!(atomdiff::parse_str("").unwrap(), atomdiff::Entry::default());
/// ```
pub fn parse_str(text: &str) -> Result<Entry, ParseError> {
    if text.is_empty() {
        return Ok(Entry::default());
    }
    check_declared_charset(text)?;
    read_entry_document(text)
}

/// Parses a single Atom `<entry>` document from raw bytes.
///
/// The charset is taken from a byte order mark, then from the XML
/// declaration, defaulting to UTF-8. Otherwise identical to [`parse_str`].
pub fn parse_bytes(bytes: &[u8]) -> Result<Entry, ParseError> {
    if bytes.is_empty() {
        return Ok(Entry::default());
    }
    let text = decode_document(bytes)?;
    read_entry_document(&text)
}

/// Parses a full Atom `<feed>` document from text.
///
/// Empty input yields `Feed::default()`. Any non-empty document must have
/// a `feed` root element (namespace prefix ignored).
pub fn parse_feed_str(text: &str) -> Result<Feed, ParseError> {
    if text.is_empty() {
        return Ok(Feed::default());
    }
    check_declared_charset(text)?;
    read_feed_document(text)
}

/// Parses a full Atom `<feed>` document from raw bytes.
pub fn parse_feed_bytes(bytes: &[u8]) -> Result<Feed, ParseError> {
    if bytes.is_empty() {
        return Ok(Feed::default());
    }
    let text = decode_document(bytes)?;
    read_feed_document(&text)
}

// ============================================================================
// Document Walk
// ============================================================================

fn reader_for(text: &str) -> XmlReader<'_> {
    // XXE: quick-xml (0.37) never expands <!ENTITY> declarations. Only the
    // five XML builtins and character references are unescaped; custom
    // entity references fail in `unescape()`.
    let mut reader = Reader::from_str(text);
    // Identity compares raw text, so whitespace must survive
    reader.config_mut().trim_text(false);
    reader
}

fn read_entry_document(text: &str) -> Result<Entry, ParseError> {
    let mut reader = reader_for(text);
    let (root, empty) = read_root(&mut reader)?;
    read_entry(&mut reader, &root, empty)
}

fn read_feed_document(text: &str) -> Result<Feed, ParseError> {
    let mut reader = reader_for(text);
    let (root, empty) = read_root(&mut reader)?;

    if root.local_name().as_ref() != b"feed" {
        return Err(ParseError::UnexpectedRoot(local_name(&root)));
    }

    let feed = read_feed(&mut reader, &root, empty)?;
    tracing::trace!(entries = feed.entries.len(), "Parsed Atom feed");
    Ok(feed)
}

/// Skips the prolog (declaration, comments, doctype, stray text) up to the
/// first element. Returns the element and whether it is self-closing.
fn read_root<'a>(reader: &mut XmlReader<'a>) -> Result<(BytesStart<'a>, bool), ParseError> {
    loop {
        match reader.read_event()? {
            Event::Start(e) => return Ok((e, false)),
            Event::Empty(e) => return Ok((e, true)),
            Event::Eof => return Err(ParseError::NoRootElement),
            _ => {}
        }
    }
}

/// Next event inside `parent`. EOF here means the document was cut short.
fn next_child<'a>(
    reader: &mut XmlReader<'a>,
    parent: &BytesStart<'_>,
) -> Result<Event<'a>, ParseError> {
    match reader.read_event()? {
        Event::Eof => Err(ParseError::Truncated(local_name(parent))),
        event => Ok(event),
    }
}

fn read_feed<'a>(
    reader: &mut XmlReader<'a>,
    start: &BytesStart<'a>,
    empty: bool,
) -> Result<Feed, ParseError> {
    let mut feed = Feed::default();
    if empty {
        return Ok(feed);
    }

    loop {
        let (e, empty) = match next_child(reader, start)? {
            Event::Start(e) => (e, false),
            Event::Empty(e) => (e, true),
            Event::End(_) => return Ok(feed),
            _ => continue,
        };

        match e.local_name().as_ref() {
            b"title" => feed.title = read_text_construct(reader, &e, empty)?.body,
            b"id" => feed.id = read_text(reader, &e, empty, false)?,
            b"updated" => feed.updated = read_text(reader, &e, empty, false)?,
            b"author" => feed.author = Some(read_person(reader, &e, empty)?),
            b"link" => {
                feed.links.push(read_link(reader, &e)?);
                skip(reader, &e, empty)?;
            }
            b"entry" => feed.entries.push(read_entry(reader, &e, empty)?),
            _ => skip(reader, &e, empty)?,
        }
    }
}

fn read_entry<'a>(
    reader: &mut XmlReader<'a>,
    start: &BytesStart<'a>,
    empty: bool,
) -> Result<Entry, ParseError> {
    let mut entry = Entry::default();
    if empty {
        return Ok(entry);
    }

    loop {
        let (e, empty) = match next_child(reader, start)? {
            Event::Start(e) => (e, false),
            Event::Empty(e) => (e, true),
            Event::End(_) => return Ok(entry),
            _ => continue,
        };

        match e.local_name().as_ref() {
            b"title" => entry.title = read_text_construct(reader, &e, empty)?.body,
            b"id" => entry.id = read_text(reader, &e, empty, false)?,
            b"published" => entry.published = read_text(reader, &e, empty, false)?,
            b"updated" => entry.updated = read_text(reader, &e, empty, false)?,
            b"summary" => entry.summary = Some(read_text_construct(reader, &e, empty)?),
            b"content" => entry.content = Some(read_text_construct(reader, &e, empty)?),
            b"author" => entry.author = Some(read_person(reader, &e, empty)?),
            b"link" => {
                entry.links.push(read_link(reader, &e)?);
                skip(reader, &e, empty)?;
            }
            _ => skip(reader, &e, empty)?,
        }
    }
}

fn read_person<'a>(
    reader: &mut XmlReader<'a>,
    start: &BytesStart<'a>,
    empty: bool,
) -> Result<Person, ParseError> {
    let mut person = Person::default();
    if empty {
        return Ok(person);
    }

    loop {
        let (e, empty) = match next_child(reader, start)? {
            Event::Start(e) => (e, false),
            Event::Empty(e) => (e, true),
            Event::End(_) => return Ok(person),
            _ => continue,
        };

        match e.local_name().as_ref() {
            b"name" => person.name = read_text(reader, &e, empty, false)?,
            b"uri" => person.uri = read_text(reader, &e, empty, false)?,
            b"email" => person.email = read_text(reader, &e, empty, false)?,
            _ => skip(reader, &e, empty)?,
        }
    }
}

/// Reads `<title>`, `<summary>` or `<content>`.
///
/// For `type="xhtml"` the markup is dropped and the character data of every
/// descendant is concatenated. Other types keep only the element's own
/// character data (escaped HTML arrives here already unescaped).
fn read_text_construct<'a>(
    reader: &mut XmlReader<'a>,
    start: &BytesStart<'a>,
    empty: bool,
) -> Result<Text, ParseError> {
    let kind = attribute(reader, start, b"type")?.unwrap_or_default();
    let body = read_text(reader, start, empty, kind == "xhtml")?;
    Ok(Text { kind, body })
}

/// Collects character data up to the end of `start`, verbatim.
///
/// Child elements are skipped unless `descend` is set, in which case their
/// character data is appended in document order.
fn read_text<'a>(
    reader: &mut XmlReader<'a>,
    start: &BytesStart<'a>,
    empty: bool,
    descend: bool,
) -> Result<String, ParseError> {
    let mut text = String::new();
    if empty {
        return Ok(text);
    }

    loop {
        match next_child(reader, start)? {
            Event::Text(t) => text.push_str(&t.unescape()?),
            Event::CData(c) => {
                let decoded = reader.decoder().decode(&c).map_err(quick_xml::Error::from)?;
                text.push_str(&decoded);
            }
            Event::Start(child) if descend => {
                text.push_str(&read_text(reader, &child, false, true)?);
            }
            Event::Start(child) => skip(reader, &child, false)?,
            Event::End(_) => return Ok(text),
            _ => {}
        }
    }
}

fn read_link(reader: &XmlReader<'_>, e: &BytesStart<'_>) -> Result<Link, ParseError> {
    let mut link = Link::default();

    for attr_result in e.attributes() {
        let attr = attr_result.map_err(quick_xml::Error::from)?;
        let value = attr.decode_and_unescape_value(reader.decoder())?;
        match attr.key.as_ref() {
            b"rel" => link.rel = value.into_owned(),
            b"href" => link.href = value.into_owned(),
            b"type" => link.media_type = value.into_owned(),
            b"hreflang" => link.hreflang = value.into_owned(),
            b"title" => link.title = value.into_owned(),
            b"length" => {
                let length = value.trim().parse::<u64>().map_err(|_| ParseError::InvalidAttribute {
                    name: "length".to_string(),
                    value: value.to_string(),
                })?;
                link.length = Some(length);
            }
            _ => {}
        }
    }

    Ok(link)
}

fn attribute(
    reader: &XmlReader<'_>,
    e: &BytesStart<'_>,
    name: &[u8],
) -> Result<Option<String>, ParseError> {
    for attr_result in e.attributes() {
        let attr = attr_result.map_err(quick_xml::Error::from)?;
        if attr.key.as_ref() == name {
            return Ok(Some(attr.decode_and_unescape_value(reader.decoder())?.into_owned()));
        }
    }
    Ok(None)
}

fn skip(reader: &mut XmlReader<'_>, e: &BytesStart<'_>, empty: bool) -> Result<(), ParseError> {
    if !empty {
        reader.read_to_end(e.name())?;
    }
    Ok(())
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE_ENTRY: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<entry xmlns="http://www.w3.org/2005/Atom">
  <title>Atom-Powered Robots Run Amok</title>
  <link href="http://example.org/2003/12/13/atom03"/>
  <id>urn:uuid:1225c695-cfb8-4ebb-aaaa-80da344efa6a</id>
  <updated>2003-12-13T18:30:02Z</updated>
  <summary>Some text.</summary>
  <content type="html">Robots are &lt;b&gt;everywhere&lt;/b&gt;.</content>
</entry>"#;

    fn is_malformed(result: &Result<Entry, ParseError>) -> bool {
        matches!(result, Err(ParseError::Xml(_)) | Err(ParseError::Truncated(_)))
    }

    #[test]
    fn test_empty_string_yields_default_entry() {
        assert_eq!(parse_str("").unwrap(), Entry::default());
        assert_eq!(parse_bytes(b"").unwrap(), Entry::default());
    }

    #[test]
    fn test_parse_sample_entry() {
        let entry = parse_str(SAMPLE_ENTRY).unwrap();

        assert_eq!(entry.title, "Atom-Powered Robots Run Amok");
        assert_eq!(entry.updated, "2003-12-13T18:30:02Z");
        assert_eq!(entry.id, "urn:uuid:1225c695-cfb8-4ebb-aaaa-80da344efa6a");
        assert_eq!(entry.link(), Some("http://example.org/2003/12/13/atom03"));
        assert_eq!(entry.summary.as_ref().map(|s| s.body.as_str()), Some("Some text."));

        let content = entry.content.unwrap();
        assert_eq!(content.kind, "html");
        assert_eq!(content.body, "Robots are <b>everywhere</b>.");
    }

    #[test]
    fn test_parse_bytes_matches_parse_str() {
        assert_eq!(
            parse_bytes(SAMPLE_ENTRY.as_bytes()).unwrap(),
            parse_str(SAMPLE_ENTRY).unwrap()
        );
    }

    #[test]
    fn test_text_kept_verbatim() {
        let entry = parse_str(
            "<entry><title>\n   Multi\n  </title><updated> 2024-01-01T00:00:00Z</updated><content>  x  </content></entry>",
        )
        .unwrap();

        assert_eq!(entry.title, "\n   Multi\n  ");
        assert_eq!(entry.updated, " 2024-01-01T00:00:00Z");
        assert_eq!(entry.content.map(|c| c.body), Some("  x  ".to_string()));
    }

    #[test]
    fn test_trailing_space_in_title_kept() {
        assert_eq!(parse_str("<entry><title>Post </title></entry>").unwrap().title, "Post ");
        assert_eq!(parse_str("<entry><title>Post</title></entry>").unwrap().title, "Post");
    }

    #[test]
    fn test_cdata_title() {
        let entry = parse_str("<entry><title><![CDATA[a < b & c]]></title></entry>").unwrap();
        assert_eq!(entry.title, "a < b & c");
    }

    #[test]
    fn test_xhtml_title_keeps_descendant_text() {
        let entry = parse_str(
            r#"<entry><title type="xhtml"><div xmlns="http://www.w3.org/1999/xhtml">Hi <b>there</b></div></title><updated>2024-01-01T00:00:00Z</updated></entry>"#,
        )
        .unwrap();
        assert_eq!(entry.title, "Hi there");
        assert_eq!(entry.updated, "2024-01-01T00:00:00Z");
    }

    #[test]
    fn test_non_xhtml_text_skips_child_elements() {
        let entry = parse_str("<entry><title>Hello <b>bold</b>world</title></entry>").unwrap();
        assert_eq!(entry.title, "Hello world");
    }

    #[test]
    fn test_unknown_elements_ignored() {
        let entry = parse_str(
            "<entry><title>T</title><category term=\"x\"/><rights>mine</rights><source><title>S</title></source></entry>",
        )
        .unwrap();
        assert_eq!(entry.title, "T");
        assert_eq!(entry.updated, "");
    }

    #[test]
    fn test_empty_elements() {
        let entry = parse_str("<entry><title/><summary type=\"text\"/><author/></entry>").unwrap();
        assert_eq!(entry.title, "");
        assert_eq!(
            entry.summary,
            Some(Text {
                kind: "text".to_string(),
                body: String::new(),
            })
        );
        assert_eq!(entry.author, Some(Person::default()));
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        assert_eq!(parse_str("<entry/>").unwrap(), Entry::default());
    }

    #[test]
    fn test_author_fields() {
        let entry = parse_str(
            "<entry><author><name>Jane</name><uri>https://jane.example</uri><email>j@example.com</email></author></entry>",
        )
        .unwrap();
        let author = entry.author.unwrap();
        assert_eq!(author.name, "Jane");
        assert_eq!(author.uri, "https://jane.example");
        assert_eq!(author.email, "j@example.com");
    }

    #[test]
    fn test_link_attributes() {
        let entry = parse_str(
            r#"<entry><link rel="enclosure" href="https://example.com/a.mp3?x=1&amp;y=2" type="audio/mpeg" hreflang="en" title="Ep 1" length="1024"/></entry>"#,
        )
        .unwrap();
        assert_eq!(
            entry.links,
            vec![Link {
                rel: "enclosure".to_string(),
                href: "https://example.com/a.mp3?x=1&y=2".to_string(),
                media_type: "audio/mpeg".to_string(),
                hreflang: "en".to_string(),
                title: "Ep 1".to_string(),
                length: Some(1024),
            }]
        );
    }

    #[test]
    fn test_invalid_link_length() {
        let result = parse_str(r#"<entry><link href="x" length="big"/></entry>"#);
        match result {
            Err(ParseError::InvalidAttribute { name, value }) => {
                assert_eq!(name, "length");
                assert_eq!(value, "big");
            }
            other => panic!("Expected InvalidAttribute, got {:?}", other),
        }
    }

    #[test]
    fn test_interleaved_links_collected() {
        let entry = parse_str(
            r#"<entry>
                <link rel="alternate" href="https://example.com/a"/>
                <title>T</title>
                <link rel="edit" href="https://example.com/edit"></link>
            </entry>"#,
        )
        .unwrap();
        assert_eq!(entry.links.len(), 2);
        assert_eq!(entry.links[1].rel, "edit");
    }

    #[test]
    fn test_malformed_xml_is_parse_error() {
        assert!(is_malformed(&parse_str("<entry><title>Unclosed")));
    }

    #[test]
    fn test_mismatched_tags_is_parse_error() {
        assert!(is_malformed(&parse_str("<entry><title>Oops</updated></entry>")));
    }

    #[test]
    fn test_unknown_entity_is_parse_error() {
        let result = parse_str("<entry><title>&xxe;</title></entry>");
        assert!(matches!(result, Err(ParseError::Xml(_))));
    }

    #[test]
    fn test_no_root_element() {
        assert!(matches!(parse_str("   \n"), Err(ParseError::NoRootElement)));
        assert!(matches!(parse_str("just text"), Err(ParseError::NoRootElement)));
    }

    #[test]
    fn test_unknown_charset_is_parse_error() {
        let doc = r#"<?xml version="1.0" encoding="x-unknown-charset"?><entry/>"#;
        assert!(matches!(parse_str(doc), Err(ParseError::Charset(_))));
        assert!(matches!(parse_bytes(doc.as_bytes()), Err(ParseError::Charset(_))));
    }

    #[test]
    fn test_latin1_bytes_decode_title() {
        let mut doc = b"<?xml version=\"1.0\" encoding=\"iso-8859-1\"?><entry><title>Caf".to_vec();
        doc.push(0xE9);
        doc.extend_from_slice(b"</title></entry>");

        let entry = parse_bytes(&doc).unwrap();
        assert_eq!(entry.title, "Caf\u{e9}");
    }

    #[test]
    fn test_parse_feed_with_entries_in_order() {
        let feed = parse_feed_str(
            r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Example Feed</title>
  <id>urn:feed</id>
  <updated>2024-01-02T00:00:00Z</updated>
  <link rel="self" href="https://example.com/feed.atom"/>
  <author><name>Jane</name></author>
  <entry><title>First</title><updated>2024-01-01T00:00:00Z</updated></entry>
  <entry><title>Second</title><updated>2024-01-02T00:00:00Z</updated></entry>
</feed>"#,
        )
        .unwrap();

        assert_eq!(feed.title, "Example Feed");
        assert_eq!(feed.id, "urn:feed");
        assert_eq!(feed.links[0].rel, "self");
        assert_eq!(feed.author.as_ref().map(|a| a.name.as_str()), Some("Jane"));
        let titles: Vec<&str> = feed.entries.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["First", "Second"]);
    }

    #[test]
    fn test_feed_with_xhtml_entry_title() {
        let feed = parse_feed_str(
            r#"<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <title type="xhtml"><div xmlns="http://www.w3.org/1999/xhtml">Hi <b>there</b></div></title>
    <updated>2024-01-01T00:00:00Z</updated>
  </entry>
  <entry><title>Plain</title><updated>2024-01-02T00:00:00Z</updated></entry>
</feed>"#,
        )
        .unwrap();

        assert_eq!(feed.entries.len(), 2);
        assert_eq!(feed.entries[0].title, "Hi there");
        assert_eq!(feed.entries[1].title, "Plain");
    }

    #[test]
    fn test_entry_level_fields_not_taken_from_feed() {
        let feed = parse_feed_str(
            "<feed><title>Feed</title><entry><title>Entry</title></entry></feed>",
        )
        .unwrap();
        assert_eq!(feed.title, "Feed");
        assert_eq!(feed.entries[0].title, "Entry");
    }

    #[test]
    fn test_parse_feed_without_entries() {
        let feed = parse_feed_str("<feed><title>Quiet</title></feed>").unwrap();
        assert!(feed.is_empty());
        assert_eq!(parse_feed_str("<feed/>").unwrap(), Feed::default());
        assert_eq!(parse_feed_str("").unwrap(), Feed::default());
        assert_eq!(parse_feed_bytes(b"").unwrap(), Feed::default());
    }

    #[test]
    fn test_parse_feed_rejects_other_roots() {
        let result = parse_feed_str("<rss version=\"2.0\"><channel/></rss>");
        match result {
            Err(ParseError::UnexpectedRoot(name)) => assert_eq!(name, "rss"),
            other => panic!("Expected UnexpectedRoot, got {:?}", other),
        }
    }

    #[test]
    fn test_truncated_feed_is_parse_error() {
        let result = parse_feed_str("<feed><entry><title>A</title>");
        assert!(matches!(result, Err(ParseError::Truncated(_)) | Err(ParseError::Xml(_))));
    }

    #[test]
    fn test_parse_feed_accepts_prefixed_elements() {
        let feed = parse_feed_str(
            r#"<atom:feed xmlns:atom="http://www.w3.org/2005/Atom">
  <atom:title>P</atom:title>
  <atom:entry>
    <atom:title>Prefixed</atom:title>
    <atom:updated>2024-01-01T00:00:00Z</atom:updated>
  </atom:entry>
</atom:feed>"#,
        )
        .unwrap();

        assert_eq!(feed.title, "P");
        assert_eq!(feed.entries.len(), 1);
        assert_eq!(feed.entries[0].title, "Prefixed");
        assert_eq!(feed.entries[0].updated, "2024-01-01T00:00:00Z");
    }

    #[test]
    fn test_parse_prefixed_entry() {
        let entry = parse_str(
            r#"<atom:entry xmlns:atom="http://www.w3.org/2005/Atom"><atom:title>T</atom:title><atom:updated>U</atom:updated></atom:entry>"#,
        )
        .unwrap();
        assert_eq!(entry.title, "T");
        assert_eq!(entry.updated, "U");
    }
}
