//! Deterministic cache keys.
//!
//! A key is an operation name followed by its scoping identifiers, joined
//! with `:`. A literal `:` or `\` inside a segment is escaped with `\`, so
//! the encoding is injective: distinct segment lists never produce the
//! same key, and identical queries always do.

use billbook_core::{BusinessId, InvoiceKind};
use std::fmt;

const SEPARATOR: char = ':';
const ESCAPE: char = '\\';

/// Operation names used by the built-in fetchers.
pub mod operations {
    pub const PARTIES: &str = "parties";
    pub const ITEMS: &str = "items";
    pub const BUSINESS: &str = "business";
    pub const RECENT_INVOICES: &str = "recent-invoices";
}

/// A cache key built from an operation name and scoping segments.
///
/// The segment list is private; keys are only built through [`CacheKey::new`]
/// and [`CacheKey::with`], which keeps the encoded form and the segments in
/// sync.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    encoded: String,
    segments: Vec<String>,
}

impl CacheKey {
    /// Start a key for the named operation.
    pub fn new(operation: &str) -> Self {
        let mut encoded = String::with_capacity(operation.len() + 40);
        push_escaped(&mut encoded, operation);
        Self {
            encoded,
            segments: vec![operation.to_string()],
        }
    }

    /// Append a scoping segment.
    pub fn with(mut self, segment: impl fmt::Display) -> Self {
        let segment = segment.to_string();
        self.encoded.push(SEPARATOR);
        push_escaped(&mut self.encoded, &segment);
        self.segments.push(segment);
        self
    }

    /// Parties list of a business.
    pub fn parties(business_id: BusinessId) -> Self {
        Self::new(operations::PARTIES).with(business_id)
    }

    /// Items list of a business.
    pub fn items(business_id: BusinessId) -> Self {
        Self::new(operations::ITEMS).with(business_id)
    }

    /// Business profile.
    pub fn business(business_id: BusinessId) -> Self {
        Self::new(operations::BUSINESS).with(business_id)
    }

    /// Most recent invoices of one kind, limited to `limit` rows.
    pub fn recent_invoices(business_id: BusinessId, kind: InvoiceKind, limit: usize) -> Self {
        Self::new(operations::RECENT_INVOICES)
            .with(business_id)
            .with(kind.as_str())
            .with(limit)
    }

    /// Prefix shared by every recent-invoices key of a business, whatever
    /// the kind or limit.
    pub fn recent_invoices_prefix(business_id: BusinessId) -> String {
        Self::new(operations::RECENT_INVOICES)
            .with(business_id)
            .child_prefix()
    }

    /// Prefix matching every key that extends this one with more segments.
    pub fn child_prefix(&self) -> String {
        let mut prefix = String::with_capacity(self.encoded.len() + 1);
        prefix.push_str(&self.encoded);
        prefix.push(SEPARATOR);
        prefix
    }

    /// The encoded key string.
    pub fn as_str(&self) -> &str {
        &self.encoded
    }

    /// The operation name.
    pub fn operation(&self) -> &str {
        &self.segments[0]
    }

    /// All segments, operation first.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Parse an encoded key back into segments.
    ///
    /// Returns `None` for a dangling escape or an escape of anything other
    /// than `:` or `\`.
    pub fn parse(encoded: &str) -> Option<Self> {
        let mut segments = Vec::new();
        let mut current = String::new();
        let mut chars = encoded.chars();
        while let Some(c) = chars.next() {
            match c {
                ESCAPE => match chars.next() {
                    Some(next @ (ESCAPE | SEPARATOR)) => current.push(next),
                    _ => return None,
                },
                SEPARATOR => segments.push(std::mem::take(&mut current)),
                other => current.push(other),
            }
        }
        segments.push(current);

        Some(Self {
            encoded: encoded.to_string(),
            segments,
        })
    }
}

fn push_escaped(out: &mut String, segment: &str) {
    for c in segment.chars() {
        if c == SEPARATOR || c == ESCAPE {
            out.push(ESCAPE);
        }
        out.push(c);
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encoded)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.encoded
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.encoded
    }
}
