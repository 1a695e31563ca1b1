//! Facet selections and their per-segment filter compilation.

use serde::{Deserialize, Serialize};

use crate::cursor::{
    ConjunctionCursor, DisjunctionCursor, NotCursor, PostingCursor, RandomAccessCursor,
};
use crate::error::{CallunaError, Result};
use crate::segment::SegmentReader;

/// A user's selection within one facet field.
///
/// Multiple selected values are OR-ed; excluded values are removed from the
/// candidate space. A selection with no values at all requests counts only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacetSelection {
    /// The facet field.
    pub field: String,
    /// Selected values (any may match).
    pub values: Vec<String>,
    /// Excluded values (none may match).
    pub not_values: Vec<String>,
}

impl FacetSelection {
    /// Create an empty selection for a field.
    pub fn new<S: Into<String>>(field: S) -> Self {
        FacetSelection {
            field: field.into(),
            values: Vec::new(),
            not_values: Vec::new(),
        }
    }

    /// Add a selected value.
    pub fn select<S: Into<String>>(mut self, value: S) -> Self {
        self.values.push(value.into());
        self
    }

    /// Add an excluded value.
    pub fn exclude<S: Into<String>>(mut self, value: S) -> Self {
        self.not_values.push(value.into());
        self
    }

    /// Whether this selection actually constrains candidates.
    pub fn has_selection(&self) -> bool {
        !self.values.is_empty() || !self.not_values.is_empty()
    }

    /// Compile this selection against one segment.
    pub fn compile(&self, segment: &dyn SegmentReader) -> Result<SelectionFilter> {
        if !self.has_selection() {
            return Err(CallunaError::construction(format!(
                "selection on '{}' has no values to compile",
                self.field
            )));
        }

        // Single positive value with no exclusions keeps the O(1) probe
        if self.values.len() == 1 && self.not_values.is_empty() {
            if let Some(cursor) = segment.random_access_cursor(&self.field, &self.values[0]) {
                return Ok(SelectionFilter {
                    field: self.field.clone(),
                    cursor: FilterCursor::Random(cursor),
                });
            }
        }

        let positive: Option<Box<dyn PostingCursor>> = match self.values.len() {
            0 => None,
            1 => Some(segment.posting_cursor(&self.field, &self.values[0])?),
            _ => {
                let mut cursors = Vec::with_capacity(self.values.len());
                for value in &self.values {
                    cursors.push(segment.posting_cursor(&self.field, value)?);
                }
                Some(Box::new(DisjunctionCursor::new(cursors)))
            }
        };

        let negative: Option<Box<dyn PostingCursor>> = match self.not_values.len() {
            0 => None,
            1 => Some(segment.posting_cursor(&self.field, &self.not_values[0])?),
            _ => {
                let mut cursors = Vec::with_capacity(self.not_values.len());
                for value in &self.not_values {
                    cursors.push(segment.posting_cursor(&self.field, value)?);
                }
                Some(Box::new(DisjunctionCursor::new(cursors)))
            }
        };

        let cursor: Box<dyn PostingCursor> = match (positive, negative) {
            (Some(positive), None) => positive,
            (None, Some(negative)) => Box::new(NotCursor::new(negative, segment.max_doc())?),
            (Some(positive), Some(negative)) => {
                let complement = Box::new(NotCursor::new(negative, segment.max_doc())?);
                Box::new(ConjunctionCursor::new(vec![positive, complement])?)
            }
            (None, None) => unreachable!("guarded by has_selection"),
        };

        Ok(SelectionFilter {
            field: self.field.clone(),
            cursor: FilterCursor::Plain(cursor),
        })
    }
}

/// One facet selection compiled against one segment.
#[derive(Debug)]
pub struct SelectionFilter {
    field: String,
    cursor: FilterCursor,
}

#[derive(Debug)]
enum FilterCursor {
    Plain(Box<dyn PostingCursor>),
    Random(Box<dyn RandomAccessCursor>),
}

impl SelectionFilter {
    /// The facet field this filter constrains.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// The filter's current cursor position.
    pub fn position(&self) -> u64 {
        self.cursor_ref().doc_id()
    }

    /// Advance the cursor to the first match >= target and return the new
    /// position.
    pub fn advance(&mut self, target: u64) -> Result<u64> {
        let cursor = self.cursor_mut();
        cursor.advance(target)?;
        Ok(cursor.doc_id())
    }

    /// O(1) membership probe, when this filter supports it.
    pub fn contains(&self, doc_id: u64) -> Option<bool> {
        match &self.cursor {
            FilterCursor::Plain(_) => None,
            FilterCursor::Random(cursor) => Some(cursor.contains(doc_id)),
        }
    }

    /// Estimated number of matching documents, for selectivity ordering.
    pub fn cost(&self) -> u64 {
        self.cursor_ref().cost()
    }

    fn cursor_ref(&self) -> &dyn PostingCursor {
        match &self.cursor {
            FilterCursor::Plain(cursor) => cursor.as_ref(),
            FilterCursor::Random(cursor) => cursor.as_ref(),
        }
    }

    fn cursor_mut(&mut self) -> &mut dyn PostingCursor {
        match &mut self.cursor {
            FilterCursor::Plain(cursor) => cursor.as_mut(),
            FilterCursor::Random(cursor) => cursor.as_mut(),
        }
    }
}
