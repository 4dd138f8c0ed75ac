//! File identity, byte spans and build revisions.
//!
//! These types are the coordinate system of the symbol model: every scope and
//! declaration carries a [`FileId`], a [`Span`] and the [`Revision`] of the
//! build that produced it. Spans are only comparable within the same revision
//! of the same file; a rebuild bumps the file's revision and re-stamps every
//! surviving record.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

// ============================================================================
// Content Hash
// ============================================================================

/// Hash of a file's content (SHA-256, stored as hex for JSON compatibility).
///
/// Used to tell whether a rebuild actually observed different source text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub String);

impl ContentHash {
    /// Compute SHA-256 hash of the given bytes, returning hex-encoded string.
    pub fn compute(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        ContentHash(hex::encode(hasher.finalize()))
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// File Identity
// ============================================================================

/// Stable identifier of a source file within the symbol model.
///
/// Assigned when a path is first interned and never reused; the mapping to a
/// concrete path lives in the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileId(pub u32);

impl FileId {
    /// Create a new file ID.
    pub fn new(id: u32) -> Self {
        FileId(id)
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "file_{}", self.0)
    }
}

// ============================================================================
// Span
// ============================================================================

/// Byte offsets into file content, half-open: `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    /// Start byte offset (inclusive).
    pub start: usize,
    /// End byte offset (exclusive).
    pub end: usize,
}

impl Span {
    /// Create a new span.
    ///
    /// # Panics
    /// Panics if `start > end`.
    pub fn new(start: usize, end: usize) -> Self {
        assert!(start <= end, "Span start ({start}) must be <= end ({end})");
        Span { start, end }
    }

    /// An empty span at offset zero, for synthesized nodes.
    pub fn zero() -> Self {
        Span { start: 0, end: 0 }
    }

    /// Length of the span in bytes.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Check if span is empty.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Check if this span contains the given byte offset.
    pub fn contains_offset(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    /// Check if this span contains another span entirely.
    pub fn contains(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Check if this span overlaps with another.
    ///
    /// Adjacent spans (one ends where another starts) do NOT overlap.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

// ============================================================================
// Revision
// ============================================================================

/// Build generation of a file within the symbol model.
///
/// Bumped once per (re)build. Records stamped with an older revision than
/// their file's current one were not re-encountered by the latest build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Revision(pub u32);

impl Revision {
    /// The revision of a file that has never been built.
    pub const INITIAL: Revision = Revision(0);

    /// The next revision after this one.
    pub fn next(self) -> Revision {
        Revision(self.0 + 1)
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rev_{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================
