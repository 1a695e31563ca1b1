//! Conjunction (AND) cursor implementing a zig-zag join.

use crate::cursor::{NO_MORE_DOCS, PostingCursor};
use crate::error::{CallunaError, Result};

/// A cursor that matches documents present in all child cursors.
///
/// Children are synchronized by a zig-zag join: the scan repeatedly raises
/// the target to the highest child position seen and restarts until every
/// child agrees, so the work done is proportional to the sum of skip
/// distances rather than to the product of the posting lengths.
#[derive(Debug)]
pub struct ConjunctionCursor {
    /// The child cursors that must all match.
    cursors: Vec<Box<dyn PostingCursor>>,
    /// Current document ID.
    current_doc: u64,
    /// Whether this cursor is exhausted.
    exhausted: bool,
    /// Cost estimate, bounded by the cheapest child.
    cost: u64,
}

impl ConjunctionCursor {
    /// Create a new conjunction cursor from one or more child cursors.
    pub fn new(cursors: Vec<Box<dyn PostingCursor>>) -> Result<Self> {
        if cursors.is_empty() {
            return Err(CallunaError::construction(
                "conjunction requires at least one cursor",
            ));
        }

        let cost = cursors.iter().map(|c| c.cost()).min().unwrap_or(0);
        let mut cursor = ConjunctionCursor {
            cursors,
            current_doc: 0,
            exhausted: false,
            cost,
        };

        // Synchronize on the first agreement
        let first_target = cursor.cursors[0].doc_id();
        if first_target == NO_MORE_DOCS {
            cursor.exhausted = true;
            cursor.current_doc = NO_MORE_DOCS;
        } else if !cursor.align(first_target)? {
            cursor.exhausted = true;
            cursor.current_doc = NO_MORE_DOCS;
        }

        Ok(cursor)
    }

    /// Advance every child to agreement on the smallest document >= target.
    ///
    /// `last_agreeing` names the child that most recently established the
    /// target; it is already positioned there, so a restarted scan skips it.
    fn align(&mut self, mut target: u64) -> Result<bool> {
        let mut last_agreeing: Option<usize> = None;
        let mut index = 0;

        while index < self.cursors.len() {
            if Some(index) == last_agreeing {
                index += 1;
                continue;
            }

            let child = &mut self.cursors[index];
            if child.doc_id() < target && !child.advance(target)? {
                self.exhausted = true;
                self.current_doc = NO_MORE_DOCS;
                return Ok(false);
            }

            let doc_id = child.doc_id();
            if doc_id == NO_MORE_DOCS {
                self.exhausted = true;
                self.current_doc = NO_MORE_DOCS;
                return Ok(false);
            }

            if doc_id > target {
                // This child overshot: raise the target and rescan the rest
                target = doc_id;
                last_agreeing = Some(index);
                index = 0;
            } else {
                index += 1;
            }
        }

        self.current_doc = target;
        Ok(true)
    }
}

impl PostingCursor for ConjunctionCursor {
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

        let target = self.current_doc + 1;
        self.align(target)
    }

    fn advance(&mut self, target: u64) -> Result<bool> {
        if self.exhausted {
            return Ok(false);
        }
        if target <= self.current_doc {
            return self.next();
        }

        self.align(target)
    }

    fn cost(&self) -> u64 {
        self.cost
    }

    fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}
