//! Index segment contract consumed by the browsing layer.

use std::fmt::Debug;
use std::sync::Arc;

use ahash::AHashMap;
use bit_vec::BitVec;

use crate::cursor::{
    BitsetCursor, EmptyCursor, PostingCursor, RandomAccessCursor, VecPostingCursor,
};
use crate::error::{CallunaError, Result};
use crate::facet::cache::FacetDataCache;

/// Trait for index segments supplying postings and facet data.
///
/// Implementations are read-only after load and may be shared across
/// concurrently executing queries.
pub trait SegmentReader: Send + Sync + Debug {
    /// Number of documents in this segment.
    fn max_doc(&self) -> u64;

    /// The facet fields this segment carries.
    fn fields(&self) -> Vec<String>;

    /// The facet data cache for a field.
    fn facet_cache(&self, field: &str) -> Result<Arc<FacetDataCache>>;

    /// A posting cursor over documents carrying `value` in `field`.
    ///
    /// An unknown value yields an empty cursor; an unknown field is a
    /// construction error.
    fn posting_cursor(&self, field: &str, value: &str) -> Result<Box<dyn PostingCursor>>;

    /// A random-access posting cursor, when the segment can offer O(1)
    /// membership probes for the value.
    fn random_access_cursor(
        &self,
        field: &str,
        value: &str,
    ) -> Option<Box<dyn RandomAccessCursor>>;
}

/// Per-value posting data for one field.
#[derive(Debug)]
struct FieldPostings {
    cache: Arc<FacetDataCache>,
    postings: AHashMap<String, Arc<Vec<u64>>>,
    bitsets: AHashMap<String, Arc<BitVec>>,
}

/// An in-memory segment built from (document, field, value) rows.
///
/// This is the reference implementation of [`SegmentReader`]; postings,
/// bit sets, and the facet cache are built eagerly and shared behind `Arc`.
#[derive(Debug)]
pub struct InMemorySegment {
    max_doc: u64,
    fields: AHashMap<String, FieldPostings>,
}

impl InMemorySegment {
    /// Build a segment from (document, field, value) rows.
    pub fn build(max_doc: u64, rows: &[(u64, &str, &str)]) -> Result<Self> {
        let mut by_field: AHashMap<String, Vec<(u64, String)>> = AHashMap::new();
        for (doc_id, field, value) in rows {
            by_field
                .entry((*field).to_string())
                .or_default()
                .push((*doc_id, (*value).to_string()));
        }

        let mut fields = AHashMap::with_capacity(by_field.len());
        for (field, doc_values) in by_field {
            let cache = Arc::new(FacetDataCache::build(max_doc, doc_values)?);

            let mut postings = AHashMap::new();
            let mut bitsets = AHashMap::new();
            for ordinal in 1..cache.value_count() as u32 {
                let value = cache.value(ordinal).to_string();
                let doc_ids = Arc::new(cache.postings_for(&value));

                let mut bits = BitVec::from_elem(max_doc as usize, false);
                for &doc_id in doc_ids.iter() {
                    bits.set(doc_id as usize, true);
                }

                postings.insert(value.clone(), doc_ids);
                bitsets.insert(value, Arc::new(bits));
            }

            fields.insert(
                field,
                FieldPostings {
                    cache,
                    postings,
                    bitsets,
                },
            );
        }

        Ok(InMemorySegment { max_doc, fields })
    }

    fn field(&self, field: &str) -> Result<&FieldPostings> {
        self.fields.get(field).ok_or_else(|| {
            CallunaError::construction(format!("unknown facet field: {field}"))
        })
    }
}

impl SegmentReader for InMemorySegment {
    fn max_doc(&self) -> u64 {
        self.max_doc
    }

    fn fields(&self) -> Vec<String> {
        let mut fields: Vec<String> = self.fields.keys().cloned().collect();
        fields.sort_unstable();
        fields
    }

    fn facet_cache(&self, field: &str) -> Result<Arc<FacetDataCache>> {
        Ok(Arc::clone(&self.field(field)?.cache))
    }

    fn posting_cursor(&self, field: &str, value: &str) -> Result<Box<dyn PostingCursor>> {
        let field = self.field(field)?;
        match field.postings.get(value) {
            Some(doc_ids) => Ok(Box::new(VecPostingCursor::new(Arc::clone(doc_ids)))),
            None => Ok(Box::new(EmptyCursor::new())),
        }
    }

    fn random_access_cursor(
        &self,
        field: &str,
        value: &str,
    ) -> Option<Box<dyn RandomAccessCursor>> {
        let field = self.fields.get(field)?;
        let doc_ids = field.postings.get(value)?;
        let bits = field.bitsets.get(value)?;
        Some(Box::new(BitsetCursor::with_bits(
            Arc::clone(doc_ids),
            Arc::clone(bits),
        )))
    }
}
