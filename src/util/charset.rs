use std::borrow::Cow;

use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8};
use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

/// Errors raised while resolving or applying a document's character encoding.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CharsetError {
    /// The XML declaration names an encoding label we cannot map.
    #[error("Unsupported charset: {0}")]
    Unsupported(String),
    /// The bytes are not valid in the resolved encoding.
    #[error("Document is not valid {encoding}")]
    Malformed { encoding: &'static str },
}

/// Decodes a raw XML document into Unicode text.
///
/// Resolution order follows XML 1.0 Appendix F:
///
/// 1. A byte order mark wins and is stripped
/// 2. BOM-less UTF-16 is sniffed from the `<?` pattern
/// 3. The `encoding` label of the XML declaration
/// 4. UTF-8
///
/// Returns a borrowed string when the input is already valid UTF-8.
pub fn decode_document(bytes: &[u8]) -> Result<Cow<'_, str>, CharsetError> {
    let (encoding, body) = match Encoding::for_bom(bytes) {
        Some((encoding, bom_len)) => (encoding, &bytes[bom_len..]),
        None => (sniff_encoding(bytes)?, bytes),
    };

    tracing::trace!(encoding = encoding.name(), len = body.len(), "Decoding XML document");

    encoding
        .decode_without_bom_handling_and_without_replacement(body)
        .ok_or(CharsetError::Malformed {
            encoding: encoding.name(),
        })
}

/// Verifies that a document which is already Unicode declares a known charset.
///
/// Nothing is transcoded; an unrecognised label is still an error because
/// the document claims an encoding we could not have honoured.
pub fn check_declared_charset(text: &str) -> Result<(), CharsetError> {
    declared_encoding(text.as_bytes()).map(|_| ())
}

fn sniff_encoding(bytes: &[u8]) -> Result<&'static Encoding, CharsetError> {
    match bytes {
        [0x3C, 0x00, 0x3F, 0x00, ..] => return Ok(UTF_16LE),
        [0x00, 0x3C, 0x00, 0x3F, ..] => return Ok(UTF_16BE),
        _ => {}
    }

    match declared_encoding(bytes)? {
        // An ASCII-compatible stream cannot really be UTF-16; the label is wrong
        Some(enc) if enc == UTF_16LE || enc == UTF_16BE => Ok(UTF_8),
        Some(enc) => Ok(enc),
        None => Ok(UTF_8),
    }
}

/// Reads the `encoding` pseudo-attribute of a leading XML declaration.
///
/// Returns `Ok(None)` when there is no declaration, no label, or the
/// declaration is too broken to read. The parser reports the latter.
fn declared_encoding(bytes: &[u8]) -> Result<Option<&'static Encoding>, CharsetError> {
    let mut reader = Reader::from_reader(bytes);

    let decl = match reader.read_event() {
        Ok(Event::Decl(decl)) => decl,
        _ => return Ok(None),
    };

    let label = match decl.encoding() {
        Some(Ok(label)) => label,
        _ => return Ok(None),
    };

    match Encoding::for_label(label.as_ref()) {
        Some(encoding) => Ok(Some(encoding)),
        None => Err(CharsetError::Unsupported(
            String::from_utf8_lossy(label.as_ref()).into_owned(),
        )),
    }
}
