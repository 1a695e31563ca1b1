//! Concrete posting cursors backed by in-memory sorted doc-id arrays.

use std::sync::Arc;

use bit_vec::BitVec;

use crate::cursor::{NO_MORE_DOCS, PostingCursor, RandomAccessCursor};
use crate::error::Result;

/// A posting cursor over a shared, ascending doc-id array.
///
/// Posting arrays are read-only after segment load and may be shared across
/// concurrently executing queries; each cursor carries only its own position.
#[derive(Debug)]
pub struct VecPostingCursor {
    doc_ids: Arc<Vec<u64>>,
    position: usize,
}

impl VecPostingCursor {
    /// Create a new cursor over a shared posting array.
    pub fn new(doc_ids: Arc<Vec<u64>>) -> Self {
        VecPostingCursor {
            doc_ids,
            position: 0,
        }
    }

    /// Create a cursor that owns its posting array.
    pub fn from_vec(doc_ids: Vec<u64>) -> Self {
        Self::new(Arc::new(doc_ids))
    }
}

impl PostingCursor for VecPostingCursor {
    fn doc_id(&self) -> u64 {
        if self.position < self.doc_ids.len() {
            self.doc_ids[self.position]
        } else {
            NO_MORE_DOCS
        }
    }

    fn next(&mut self) -> Result<bool> {
        if self.position >= self.doc_ids.len() {
            Ok(false)
        } else {
            self.position += 1;
            Ok(self.position < self.doc_ids.len())
        }
    }

    fn advance(&mut self, target: u64) -> Result<bool> {
        if target <= self.doc_id() {
            return self.next();
        }
        // Binary search within the remaining suffix
        let suffix = &self.doc_ids[self.position..];
        let offset = suffix.partition_point(|&doc| doc < target);
        self.position += offset;
        Ok(self.position < self.doc_ids.len())
    }

    fn cost(&self) -> u64 {
        self.doc_ids.len() as u64
    }

    fn is_exhausted(&self) -> bool {
        self.position >= self.doc_ids.len()
    }
}

/// A posting cursor that pairs a sorted doc-id array with a bit set for
/// constant-time membership probes.
#[derive(Debug)]
pub struct BitsetCursor {
    cursor: VecPostingCursor,
    bits: Arc<BitVec>,
}

impl BitsetCursor {
    /// Create a new bitset cursor from a shared posting array and the
    /// segment's document count.
    pub fn new(doc_ids: Arc<Vec<u64>>, max_doc: u64) -> Self {
        let mut bits = BitVec::from_elem(max_doc as usize, false);
        for &doc_id in doc_ids.iter() {
            if doc_id < max_doc {
                bits.set(doc_id as usize, true);
            }
        }
        BitsetCursor {
            cursor: VecPostingCursor::new(doc_ids),
            bits: Arc::new(bits),
        }
    }

    /// Create a bitset cursor sharing a pre-built bit set.
    pub fn with_bits(doc_ids: Arc<Vec<u64>>, bits: Arc<BitVec>) -> Self {
        BitsetCursor {
            cursor: VecPostingCursor::new(doc_ids),
            bits,
        }
    }

    /// The shared bit set backing this cursor.
    pub fn bits(&self) -> &Arc<BitVec> {
        &self.bits
    }
}

impl PostingCursor for BitsetCursor {
    fn doc_id(&self) -> u64 {
        self.cursor.doc_id()
    }

    fn next(&mut self) -> Result<bool> {
        self.cursor.next()
    }

    fn advance(&mut self, target: u64) -> Result<bool> {
        self.cursor.advance(target)
    }

    fn cost(&self) -> u64 {
        self.cursor.cost()
    }

    fn is_exhausted(&self) -> bool {
        self.cursor.is_exhausted()
    }
}

impl RandomAccessCursor for BitsetCursor {
    fn contains(&self, doc_id: u64) -> bool {
        self.bits.get(doc_id as usize).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_cursor_iteration() {
        let mut cursor = VecPostingCursor::from_vec(vec![0, 1, 2, 3, 4]);

        assert_eq!(cursor.doc_id(), 0);
        assert!(!cursor.is_exhausted());
        assert_eq!(cursor.cost(), 5);

        for i in 1..5 {
            assert!(cursor.next().unwrap());
            assert_eq!(cursor.doc_id(), i);
        }

        assert!(!cursor.next().unwrap());
        assert!(cursor.is_exhausted());
        assert_eq!(cursor.doc_id(), NO_MORE_DOCS);
    }

    #[test]
    fn test_vec_cursor_advance() {
        let mut cursor = VecPostingCursor::from_vec(vec![2, 4, 8, 16, 32]);

        assert!(cursor.advance(5).unwrap());
        assert_eq!(cursor.doc_id(), 8);

        // Exact hit
        assert!(cursor.advance(16).unwrap());
        assert_eq!(cursor.doc_id(), 16);

        // Backward target steps forward instead of rewinding
        assert!(cursor.advance(3).unwrap());
        assert_eq!(cursor.doc_id(), 32);

        assert!(!cursor.advance(100).unwrap());
        assert!(cursor.is_exhausted());

        // Once exhausted, remains exhausted
        assert!(!cursor.advance(2).unwrap());
        assert_eq!(cursor.doc_id(), NO_MORE_DOCS);
    }

    #[test]
    fn test_vec_cursor_empty() {
        let mut cursor = VecPostingCursor::from_vec(vec![]);

        assert_eq!(cursor.doc_id(), NO_MORE_DOCS);
        assert!(cursor.is_exhausted());
        assert!(!cursor.next().unwrap());
        assert!(!cursor.advance(0).unwrap());
    }

    #[test]
    fn test_bitset_cursor_contains() {
        let cursor = BitsetCursor::new(Arc::new(vec![1, 3, 7]), 10);

        assert!(cursor.contains(1));
        assert!(cursor.contains(3));
        assert!(cursor.contains(7));
        assert!(!cursor.contains(0));
        assert!(!cursor.contains(5));
        // Out of range probes are simply absent
        assert!(!cursor.contains(10));
        assert!(!cursor.contains(u64::MAX));
    }

    #[test]
    fn test_bitset_cursor_iterates_like_vec_cursor() {
        let mut cursor = BitsetCursor::new(Arc::new(vec![2, 5, 9]), 12);

        assert_eq!(cursor.doc_id(), 2);
        assert!(cursor.advance(4).unwrap());
        assert_eq!(cursor.doc_id(), 5);
        assert!(cursor.next().unwrap());
        assert_eq!(cursor.doc_id(), 9);
        assert!(!cursor.next().unwrap());
        assert!(cursor.is_exhausted());
    }
}
