//! Disjunction (OR) cursor implementing a heap-based merge.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::cursor::{NO_MORE_DOCS, PostingCursor};
use crate::error::Result;

/// A helper struct for tracking cursors in the disjunction heap.
#[derive(Debug)]
struct CursorEntry {
    cursor: Box<dyn PostingCursor>,
}

impl PartialEq for CursorEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cursor.doc_id() == other.cursor.doc_id()
    }
}

impl Eq for CursorEntry {}

impl PartialOrd for CursorEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CursorEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap: lower doc IDs come first
        other.cursor.doc_id().cmp(&self.cursor.doc_id())
    }
}

/// A cursor that matches documents present in any child cursor.
///
/// The heap root always holds the smallest live child position; exhausted
/// children are dropped from the heap, shrinking it, and an empty heap
/// means the whole disjunction is exhausted.
#[derive(Debug)]
pub struct DisjunctionCursor {
    /// Min-heap of live cursors, ordered by current doc ID.
    heap: BinaryHeap<CursorEntry>,
    /// Current document ID.
    current_doc: u64,
    /// Whether this cursor is exhausted.
    exhausted: bool,
    /// Total cost estimate.
    cost: u64,
}

impl DisjunctionCursor {
    /// Create a new disjunction cursor from multiple child cursors.
    pub fn new(mut cursors: Vec<Box<dyn PostingCursor>>) -> Self {
        let mut heap = BinaryHeap::new();
        let mut cost = 0;

        for cursor in cursors.drain(..) {
            if !cursor.is_exhausted() {
                cost += cursor.cost();
                heap.push(CursorEntry { cursor });
            }
        }

        let current_doc = heap
            .peek()
            .map(|entry| entry.cursor.doc_id())
            .unwrap_or(NO_MORE_DOCS);
        let exhausted = heap.is_empty();

        DisjunctionCursor {
            heap,
            current_doc,
            exhausted,
            cost,
        }
    }

    /// Create an empty disjunction cursor.
    pub fn empty() -> Self {
        DisjunctionCursor {
            heap: BinaryHeap::new(),
            current_doc: NO_MORE_DOCS,
            exhausted: true,
            cost: 0,
        }
    }

    /// Pop and advance every child sitting below `target`, reinserting the
    /// survivors, then refresh the current position from the heap root.
    fn advance_children_below(&mut self, target: u64) -> Result<()> {
        let mut reinsert = Vec::new();
        while let Some(entry) = self.heap.peek() {
            if entry.cursor.doc_id() >= target {
                break;
            }
            let mut entry = self.heap.pop().expect("peeked entry disappeared");
            if entry.cursor.advance(target)? {
                reinsert.push(entry);
            }
        }

        for entry in reinsert {
            self.heap.push(entry);
        }

        if let Some(entry) = self.heap.peek() {
            self.current_doc = entry.cursor.doc_id();
        } else {
            self.current_doc = NO_MORE_DOCS;
            self.exhausted = true;
        }

        Ok(())
    }
}

impl PostingCursor for DisjunctionCursor {
    fn doc_id(&self) -> u64 {
        self.current_doc
    }

    fn next(&mut self) -> Result<bool> {
        if self.exhausted {
            return Ok(false);
        }

        self.advance_children_below(self.current_doc + 1)?;
        Ok(!self.exhausted)
    }

    fn advance(&mut self, target: u64) -> Result<bool> {
        if self.exhausted {
            return Ok(false);
        }
        if target <= self.current_doc {
            return self.next();
        }

        self.advance_children_below(target)?;
        Ok(!self.exhausted)
    }

    fn cost(&self) -> u64 {
        self.cost
    }

    fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::VecPostingCursor;

    fn cursors(sets: &[&[u64]]) -> Vec<Box<dyn PostingCursor>> {
        sets.iter()
            .map(|ids| Box::new(VecPostingCursor::from_vec(ids.to_vec())) as Box<dyn PostingCursor>)
            .collect()
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
    fn test_disjunction_union_without_duplicates() {
        let mut cursor = DisjunctionCursor::new(cursors(&[&[1, 3, 5], &[2, 3, 6], &[3, 5, 7]]));

        assert_eq!(drain(&mut cursor), vec![1, 2, 3, 5, 6, 7]);
        assert_eq!(cursor.doc_id(), NO_MORE_DOCS);
    }

    #[test]
    fn test_disjunction_empty() {
        let cursor = DisjunctionCursor::empty();
        assert!(cursor.is_exhausted());
        assert_eq!(cursor.doc_id(), NO_MORE_DOCS);

        let cursor = DisjunctionCursor::new(vec![]);
        assert!(cursor.is_exhausted());
    }

    #[test]
    fn test_disjunction_ignores_exhausted_children() {
        let mut cursor = DisjunctionCursor::new(cursors(&[&[], &[4, 8], &[]]));

        assert_eq!(cursor.doc_id(), 4);
        assert_eq!(drain(&mut cursor), vec![4, 8]);
    }

    #[test]
    fn test_disjunction_advance() {
        let mut cursor = DisjunctionCursor::new(cursors(&[&[1, 10, 20], &[5, 15, 25]]));

        assert_eq!(cursor.doc_id(), 1);
        assert!(cursor.advance(12).unwrap());
        assert_eq!(cursor.doc_id(), 15);

        // Backward target behaves like next()
        assert!(cursor.advance(3).unwrap());
        assert_eq!(cursor.doc_id(), 20);

        assert!(cursor.next().unwrap());
        assert_eq!(cursor.doc_id(), 25);

        assert!(!cursor.next().unwrap());
        assert!(cursor.is_exhausted());
    }

    #[test]
    fn test_disjunction_cost_is_sum_of_children() {
        let cursor = DisjunctionCursor::new(cursors(&[&[1, 2], &[2, 3, 4]]));
        assert_eq!(cursor.cost(), 5);
    }
}
