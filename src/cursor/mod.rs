//! Sorted posting cursor algebra for combining document-id streams.

pub mod conjunction;
pub mod disjunction;
pub mod filtered;
pub mod not;
pub mod vec;

pub use self::conjunction::ConjunctionCursor;
pub use self::disjunction::DisjunctionCursor;
pub use self::filtered::FilteredCursor;
pub use self::not::NotCursor;
pub use self::vec::{BitsetCursor, VecPostingCursor};

use std::fmt::Debug;

use crate::error::Result;

/// Sentinel document ID returned by exhausted cursors.
pub const NO_MORE_DOCS: u64 = u64::MAX;

/// Trait for sorted iterators over ascending document IDs.
///
/// A cursor is positioned on its first document at construction. `doc_id()`
/// is non-decreasing across calls, and once a cursor reports exhaustion it
/// remains exhausted permanently.
pub trait PostingCursor: Send + Debug {
    /// Get the current document ID, or [`NO_MORE_DOCS`] if exhausted.
    fn doc_id(&self) -> u64;

    /// Move to the next matching document.
    fn next(&mut self) -> Result<bool>;

    /// Move to the first document >= target.
    ///
    /// A target at or behind the current position is normalized to
    /// `doc_id() + 1`, so `advance` always makes progress and never moves
    /// backwards.
    fn advance(&mut self, target: u64) -> Result<bool>;

    /// Get the cost of iterating through this cursor.
    fn cost(&self) -> u64;

    /// Check if this cursor is exhausted.
    fn is_exhausted(&self) -> bool;
}

/// A posting cursor that can additionally answer membership probes in O(1).
pub trait RandomAccessCursor: PostingCursor {
    /// Check whether `doc_id` is in the underlying posting set, without
    /// moving the cursor.
    fn contains(&self, doc_id: u64) -> bool;
}

/// A cursor that matches no documents.
///
/// Carries no state, so values can be shared or re-created freely.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyCursor;

impl EmptyCursor {
    /// Create a new empty cursor.
    pub fn new() -> Self {
        EmptyCursor
    }
}

impl PostingCursor for EmptyCursor {
    fn doc_id(&self) -> u64 {
        NO_MORE_DOCS
    }

    fn next(&mut self) -> Result<bool> {
        Ok(false)
    }

    fn advance(&mut self, _target: u64) -> Result<bool> {
        Ok(false)
    }

    fn cost(&self) -> u64 {
        0
    }

    fn is_exhausted(&self) -> bool {
        true
    }
}

/// A cursor that matches all documents in `[0, max_doc)`.
#[derive(Debug)]
pub struct AllCursor {
    current_doc: u64,
    max_doc: u64,
}

impl AllCursor {
    /// Create a new all cursor.
    pub fn new(max_doc: u64) -> Self {
        AllCursor {
            current_doc: 0,
            max_doc,
        }
    }
}

impl PostingCursor for AllCursor {
    fn doc_id(&self) -> u64 {
        if self.current_doc >= self.max_doc {
            NO_MORE_DOCS
        } else {
            self.current_doc
        }
    }

    fn next(&mut self) -> Result<bool> {
        if self.current_doc >= self.max_doc {
            Ok(false)
        } else {
            self.current_doc += 1;
            Ok(self.current_doc < self.max_doc)
        }
    }

    fn advance(&mut self, target: u64) -> Result<bool> {
        if target <= self.current_doc {
            return self.next();
        }
        if target >= self.max_doc {
            self.current_doc = self.max_doc;
            Ok(false)
        } else {
            self.current_doc = target;
            Ok(true)
        }
    }

    fn cost(&self) -> u64 {
        self.max_doc
    }

    fn is_exhausted(&self) -> bool {
        self.current_doc >= self.max_doc
    }
}
