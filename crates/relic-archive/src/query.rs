//! Parsing of externally supplied `key=value` tokens.
//!
//! The query language is flat conjunction: each token contributes one
//! exact-match condition and a digest must satisfy all of them. There is
//! no OR, negation, or range comparison.

use relic_types::{Condition, Metadata};

use crate::error::{ArchiveError, ArchiveResult};

/// Split one `key=value` token at the first `=`.
fn split_token(token: &str) -> ArchiveResult<(&str, &str)> {
    token
        .split_once('=')
        .ok_or_else(|| ArchiveError::MalformedCondition(token.to_string()))
}

/// Parse query tokens into conditions, rejecting tokens without `=`.
pub fn parse_conditions<I, S>(tokens: I) -> ArchiveResult<Vec<Condition>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tokens
        .into_iter()
        .map(|token| {
            let (key, value) = split_token(token.as_ref())?;
            Ok(Condition::new(key, value))
        })
        .collect()
}

/// Parse `key=value` tokens into a metadata set for an add operation.
pub fn parse_metadata<I, S>(tokens: I) -> ArchiveResult<Metadata>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut metadata = Metadata::new();
    for token in tokens {
        let (key, value) = split_token(token.as_ref())?;
        metadata.insert(key, value);
    }
    Ok(metadata)
}
