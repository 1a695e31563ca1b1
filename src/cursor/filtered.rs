//! Predicate-filtered cursor.

use std::fmt;

use crate::cursor::{NO_MORE_DOCS, PostingCursor};
use crate::error::Result;

/// Predicate deciding whether a document produced by the inner cursor is
/// kept.
pub type CursorPredicate = Box<dyn Fn(u64) -> bool + Send>;

/// A cursor that yields the subsequence of an inner cursor satisfying a
/// predicate.
pub struct FilteredCursor {
    inner: Box<dyn PostingCursor>,
    predicate: CursorPredicate,
}

impl FilteredCursor {
    /// Create a new filtered cursor, positioned on the first accepted
    /// document.
    pub fn new(inner: Box<dyn PostingCursor>, predicate: CursorPredicate) -> Result<Self> {
        let mut cursor = FilteredCursor { inner, predicate };
        cursor.seek_accepted()?;
        Ok(cursor)
    }

    /// Walk the inner cursor until the predicate accepts or it exhausts.
    fn seek_accepted(&mut self) -> Result<bool> {
        while !self.inner.is_exhausted() {
            if (self.predicate)(self.inner.doc_id()) {
                return Ok(true);
            }
            self.inner.next()?;
        }
        Ok(false)
    }
}

impl fmt::Debug for FilteredCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilteredCursor")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

impl PostingCursor for FilteredCursor {
    fn doc_id(&self) -> u64 {
        if self.inner.is_exhausted() {
            NO_MORE_DOCS
        } else {
            self.inner.doc_id()
        }
    }

    fn next(&mut self) -> Result<bool> {
        if self.inner.is_exhausted() {
            return Ok(false);
        }

        self.inner.next()?;
        self.seek_accepted()
    }

    fn advance(&mut self, target: u64) -> Result<bool> {
        if self.inner.is_exhausted() {
            return Ok(false);
        }
        if target <= self.doc_id() {
            return self.next();
        }

        self.inner.advance(target)?;
        self.seek_accepted()
    }

    fn cost(&self) -> u64 {
        self.inner.cost()
    }

    fn is_exhausted(&self) -> bool {
        self.inner.is_exhausted()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::VecPostingCursor;

    fn filtered(ids: &[u64], predicate: impl Fn(u64) -> bool + Send + 'static) -> FilteredCursor {
        FilteredCursor::new(
            Box::new(VecPostingCursor::from_vec(ids.to_vec())),
            Box::new(predicate),
        )
        .unwrap()
    }

    fn drain(cursor: &mut dyn PostingCursor) -> Vec<u64> {
        let mut out = Vec::new();
        while !cursor.is_exhausted() {
            out.push(cursor.doc_id());
            cursor.next().unwrap();
        }
        out
    }

    #[test]
    fn test_filtered_cursor_subsequence() {
        let mut cursor = filtered(&[1, 2, 3, 4, 5, 6, 7, 8], |doc| doc % 2 == 0);
        assert_eq!(drain(&mut cursor), vec![2, 4, 6, 8]);
    }

    #[test]
    fn test_filtered_cursor_skips_leading_rejects() {
        let cursor = filtered(&[1, 3, 5, 6], |doc| doc > 4);
        assert_eq!(cursor.doc_id(), 5);
    }

    #[test]
    fn test_filtered_cursor_rejects_all() {
        let cursor = filtered(&[1, 2, 3], |_| false);
        assert!(cursor.is_exhausted());
        assert_eq!(cursor.doc_id(), NO_MORE_DOCS);
    }

    #[test]
    fn test_filtered_cursor_advance() {
        let mut cursor = filtered(&[2, 4, 5, 8, 10, 12], |doc| doc % 2 == 0);

        assert_eq!(cursor.doc_id(), 2);
        assert!(cursor.advance(5).unwrap());
        assert_eq!(cursor.doc_id(), 8);

        // Backward target behaves like next()
        assert!(cursor.advance(3).unwrap());
        assert_eq!(cursor.doc_id(), 10);

        assert!(!cursor.advance(13).unwrap());
        assert!(cursor.is_exhausted());
    }
}
