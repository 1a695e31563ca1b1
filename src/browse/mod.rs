//! Faceted browse orchestration across index segments.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::cursor::{AllCursor, NO_MORE_DOCS, PostingCursor};
use crate::error::Result;
use crate::facet::collector::{DefaultFacetCountCollector, FacetAccessible, FacetCountCollector};
use crate::facet::merge::CombinedFacetView;
use crate::facet::selection::FacetSelection;
use crate::facet::spec::{BrowseFacet, FacetSpec};
use crate::facet::validator::MultiSelectValidator;
use crate::segment::SegmentReader;

/// Factory producing one segment's primary candidate stream.
pub type BaseCursorFactory =
    Box<dyn Fn(&dyn SegmentReader) -> Result<Box<dyn PostingCursor>> + Send + Sync>;

/// A faceted browse request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowseRequest {
    /// Facet selections to filter by.
    pub selections: Vec<FacetSelection>,
    /// Facet extraction specs, keyed by field.
    pub facet_specs: HashMap<String, FacetSpec>,
    /// Number of leading hits to skip.
    pub offset: usize,
    /// Maximum number of hits to return.
    pub count: usize,
}

impl Default for BrowseRequest {
    fn default() -> Self {
        BrowseRequest {
            selections: Vec::new(),
            facet_specs: HashMap::new(),
            offset: 0,
            count: 10,
        }
    }
}

impl BrowseRequest {
    /// Create a new browse request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a facet selection.
    pub fn add_selection(mut self, selection: FacetSelection) -> Self {
        self.selections.push(selection);
        self
    }

    /// Request facet counts for a field.
    pub fn set_facet_spec<S: Into<String>>(mut self, field: S, spec: FacetSpec) -> Self {
        self.facet_specs.insert(field.into(), spec);
        self
    }

    /// Set the number of leading hits to skip.
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Set the maximum number of hits to return.
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }
}

/// Results of a faceted browse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowseResult {
    /// Total number of matching documents across all segments.
    pub total_hits: u64,
    /// Matching document IDs in global address space, windowed by
    /// offset/count.
    pub hits: Vec<u64>,
    /// Extracted facets per requested field.
    pub facets: HashMap<String, Vec<BrowseFacet>>,
}

/// Per-segment browse products, in global doc-id space.
struct SegmentOutcome {
    total_hits: u64,
    hits: Vec<u64>,
    collectors: Vec<DefaultFacetCountCollector>,
}

/// Drives faceted browsing over a set of index segments.
///
/// Segments are read-only and shared; each browse builds its own validators
/// and collectors, so concurrent browses never contend beyond the segment
/// list lock.
#[derive(Debug, Default)]
pub struct FacetedBrowser {
    segments: RwLock<Vec<Arc<dyn SegmentReader>>>,
}

impl FacetedBrowser {
    /// Create a browser with no segments.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a segment. Documents keep their segment-local IDs; globally they
    /// are addressed past the documents of earlier segments.
    pub fn add_segment(&self, segment: Arc<dyn SegmentReader>) {
        self.segments.write().push(segment);
    }

    /// Number of registered segments.
    pub fn segment_count(&self) -> usize {
        self.segments.read().len()
    }

    /// Total number of documents across all segments.
    pub fn num_docs(&self) -> u64 {
        self.segments
            .read()
            .iter()
            .map(|segment| segment.max_doc())
            .sum()
    }

    /// Execute a browse request, segment by segment.
    pub fn browse(&self, request: &BrowseRequest) -> Result<BrowseResult> {
        self.browse_with_base(request, None)
    }

    /// Execute a browse request with a caller-supplied primary query
    /// cursor per segment.
    pub fn browse_with_base(
        &self,
        request: &BrowseRequest,
        base: Option<&BaseCursorFactory>,
    ) -> Result<BrowseResult> {
        let segments = self.snapshot();
        let budget = request.offset + request.count;
        let count_fields = Self::count_fields(request);

        let mut validator = MultiSelectValidator::new(request.selections.clone(), count_fields);

        let mut outcomes = Vec::with_capacity(segments.len());
        let mut doc_base = 0u64;
        let mut collected = 0usize;
        for segment in &segments {
            let outcome = Self::browse_segment(
                &mut validator,
                segment,
                doc_base,
                budget.saturating_sub(collected),
                base,
            )?;
            collected += outcome.hits.len();
            doc_base += segment.max_doc();
            outcomes.push(outcome);
        }

        Self::assemble(request, outcomes)
    }

    /// Execute a browse request with one rayon task per segment.
    ///
    /// Results are identical to [`browse`](FacetedBrowser::browse): every
    /// segment gets its own validator binding, and per-query state is never
    /// shared across tasks.
    pub fn browse_parallel(&self, request: &BrowseRequest) -> Result<BrowseResult> {
        let segments = self.snapshot();
        let budget = request.offset + request.count;
        let count_fields = Self::count_fields(request);

        let mut doc_bases = Vec::with_capacity(segments.len());
        let mut doc_base = 0u64;
        for segment in &segments {
            doc_bases.push(doc_base);
            doc_base += segment.max_doc();
        }

        let outcomes: Result<Vec<SegmentOutcome>> = segments
            .par_iter()
            .zip(doc_bases)
            .map(|(segment, doc_base)| {
                let mut validator =
                    MultiSelectValidator::new(request.selections.clone(), count_fields.clone());
                Self::browse_segment(&mut validator, segment, doc_base, budget, None)
            })
            .collect();

        Self::assemble(request, outcomes?)
    }

    fn snapshot(&self) -> Vec<Arc<dyn SegmentReader>> {
        self.segments.read().clone()
    }

    fn count_fields(request: &BrowseRequest) -> Vec<String> {
        request.facet_specs.keys().cloned().collect()
    }

    fn browse_segment(
        validator: &mut MultiSelectValidator,
        segment: &Arc<dyn SegmentReader>,
        doc_base: u64,
        hit_budget: usize,
        base: Option<&BaseCursorFactory>,
    ) -> Result<SegmentOutcome> {
        validator.set_next_reader(segment.as_ref())?;

        // Without a base query or any selection, counts are the segment's
        // value frequencies; skip the per-document loop entirely.
        if validator.is_match_all() && base.is_none() {
            validator.collect_all()?;
            let total_hits = segment.max_doc();
            let hits = (0..total_hits.min(hit_budget as u64))
                .map(|doc_id| doc_base + doc_id)
                .collect();
            return Ok(SegmentOutcome {
                total_hits,
                hits,
                collectors: validator.detach_collectors(),
            });
        }

        let mut cursor: Box<dyn PostingCursor> = match base {
            Some(factory) => factory(segment.as_ref())?,
            None => Box::new(AllCursor::new(segment.max_doc())),
        };

        let mut total_hits = 0u64;
        let mut hits = Vec::new();
        let mut doc_id = cursor.doc_id();
        while doc_id != NO_MORE_DOCS {
            if validator.validate(doc_id)? {
                total_hits += 1;
                if hits.len() < hit_budget {
                    hits.push(doc_base + doc_id);
                }
                if !cursor.next()? {
                    break;
                }
            } else {
                // Jump straight past the region the validator ruled out
                let target = validator.next_target();
                if target == NO_MORE_DOCS || !cursor.advance(target)? {
                    break;
                }
            }
            doc_id = cursor.doc_id();
        }

        Ok(SegmentOutcome {
            total_hits,
            hits,
            collectors: validator.detach_collectors(),
        })
    }

    fn assemble(request: &BrowseRequest, outcomes: Vec<SegmentOutcome>) -> Result<BrowseResult> {
        let mut total_hits = 0u64;
        let mut all_hits = Vec::new();
        let mut views: HashMap<String, Vec<Box<dyn FacetAccessible>>> = HashMap::new();

        for outcome in outcomes {
            total_hits += outcome.total_hits;
            all_hits.extend(outcome.hits);
            for collector in outcome.collectors {
                views
                    .entry(collector.field().to_string())
                    .or_default()
                    .push(Box::new(collector));
            }
        }

        let start = request.offset.min(all_hits.len());
        let end = (request.offset + request.count).min(all_hits.len());
        let hits = all_hits[start..end].to_vec();

        let mut facets = HashMap::with_capacity(request.facet_specs.len());
        for (field, spec) in &request.facet_specs {
            let segment_views = views.remove(field).unwrap_or_default();
            let mut combined = CombinedFacetView::new(spec.clone(), segment_views)?;
            facets.insert(field.clone(), combined.facets()?);
            combined.close()?;
        }

        Ok(BrowseResult {
            total_hits,
            hits,
            facets,
        })
    }
}
