//! Complement (NOT) cursor over a bounded document range.

use crate::cursor::{NO_MORE_DOCS, PostingCursor};
use crate::error::Result;

/// A cursor that matches every document in `[0, bound)` absent from the
/// inner cursor.
///
/// The inner cursor is walked in lock-step with an incrementing candidate;
/// candidates the inner cursor also produces are skipped.
#[derive(Debug)]
pub struct NotCursor {
    /// The cursor for documents to exclude.
    inner: Box<dyn PostingCursor>,
    /// Exclusive upper bound on produced document IDs.
    bound: u64,
    /// Current document ID.
    current_doc: u64,
    /// Whether this cursor is exhausted.
    exhausted: bool,
}

impl NotCursor {
    /// Create a new NOT cursor.
    pub fn new(inner: Box<dyn PostingCursor>, bound: u64) -> Result<Self> {
        let mut cursor = NotCursor {
            inner,
            bound,
            current_doc: 0,
            exhausted: false,
        };
        cursor.seek_valid()?;
        Ok(cursor)
    }

    /// Walk the candidate forward until it falls in a gap of the inner
    /// cursor, or the bound is reached.
    fn seek_valid(&mut self) -> Result<bool> {
        while self.current_doc < self.bound {
            let excluded = self.inner.doc_id();

            if excluded > self.current_doc {
                // Inner cursor is ahead or exhausted: the candidate is a gap
                return Ok(true);
            } else if excluded == self.current_doc {
                self.current_doc += 1;
            } else {
                // Inner cursor is behind: catch it up to the candidate
                self.inner.advance(self.current_doc)?;
            }
        }

        self.current_doc = NO_MORE_DOCS;
        self.exhausted = true;
        Ok(false)
    }
}

impl PostingCursor for NotCursor {
    fn doc_id(&self) -> u64 {
        if self.exhausted {
            NO_MORE_DOCS
        } else {
            self.current_doc
        }
    }

    fn next(&mut self) -> Result<bool> {
        if self.exhausted {
            return Ok(false);
        }

        self.current_doc += 1;
        self.seek_valid()
    }

    fn advance(&mut self, target: u64) -> Result<bool> {
        if self.exhausted {
            return Ok(false);
        }
        if target <= self.current_doc {
            return self.next();
        }
        if target >= self.bound {
            self.current_doc = NO_MORE_DOCS;
            self.exhausted = true;
            return Ok(false);
        }

        self.current_doc = target;
        self.seek_valid()
    }

    fn cost(&self) -> u64 {
        self.bound
    }

    fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}
