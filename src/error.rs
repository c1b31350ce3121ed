use thiserror::Error;

use crate::feed::{FetchError, ParseError};

/// Failure of a fetch-and-parse operation.
///
/// Both variants are transparent so the underlying cause is reported
/// exactly as the lower layer produced it.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}
