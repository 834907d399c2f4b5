//! Identifier - Composite identifiers for remote objects
//!
//! Remote objects are addressed by several values at once (account id,
//! namespace, object id). They are stored as a single string with the
//! segments joined by `/`, e.g. `111111111111/default/analysts`.

use thiserror::Error;

/// Separator between composite identifier segments
pub const SEPARATOR: char = '/';

/// Error returned when a composite identifier cannot be decoded
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    #[error("unexpected format of ID ({id}), expected {expected} segments separated by '/', got {found}")]
    SegmentCount {
        id: String,
        expected: usize,
        found: usize,
    },

    #[error("unexpected format of ID ({id}), segment {index} is empty")]
    EmptySegment { id: String, index: usize },

    #[error("unexpected format of ID ({id}), expected {format}")]
    Format { id: String, format: String },
}

/// Join segments into a composite identifier
pub fn encode(segments: &[&str]) -> String {
    segments.join("/")
}

/// Split a composite identifier into exactly `expected` non-empty segments
pub fn decode(id: &str, expected: usize) -> Result<Vec<String>, IdentifierError> {
    let parts: Vec<&str> = id.split(SEPARATOR).collect();
    if parts.len() != expected {
        return Err(IdentifierError::SegmentCount {
            id: id.to_string(),
            expected,
            found: parts.len(),
        });
    }
    if let Some(index) = parts.iter().position(|p| p.is_empty()) {
        return Err(IdentifierError::EmptySegment {
            id: id.to_string(),
            index,
        });
    }
    Ok(parts.into_iter().map(str::to_string).collect())
}

/// Named layout of a composite identifier
///
/// Decoding through a format reports the expected layout on failure, e.g.
/// `expected AWS_ACCOUNT_ID/NAMESPACE/GROUP_NAME`.
#[derive(Debug, Clone, Copy)]
pub struct IdFormat {
    segments: &'static [&'static str],
}

impl IdFormat {
    pub const fn new(segments: &'static [&'static str]) -> Self {
        Self { segments }
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn encode(&self, segments: &[&str]) -> String {
        debug_assert_eq!(segments.len(), self.segments.len());
        encode(segments)
    }

    pub fn decode(&self, id: &str) -> Result<Vec<String>, IdentifierError> {
        decode(id, self.segments.len()).map_err(|_| IdentifierError::Format {
            id: id.to_string(),
            format: self.segments.join("/"),
        })
    }
}
