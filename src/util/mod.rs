//! Utility functions shared by the acquisition layer.
//!
//! - **Charset handling**: BOM/declaration-driven decoding of raw XML bytes
//! - **URL validation**: scheme checks and SSRF protection for polled URLs

mod charset;
mod url_validator;

pub use charset::{check_declared_charset, decode_document, CharsetError};
pub use url_validator::{validate_feed_url, UrlValidationError};
