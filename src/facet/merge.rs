//! Cross-segment facet count merging and ranked top-K extraction.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::error::{CallunaError, Result};
use crate::facet::collector::{FacetAccessible, FacetIterator};
use crate::facet::heap::BoundedTopKHeap;
use crate::facet::spec::{BrowseFacet, FacetOrder, FacetSpec, compare_hits_desc};

/// A peeked per-segment entry in the merge heap.
#[derive(Debug)]
struct MergeEntry {
    value: String,
    count: u64,
    source: usize,
}

impl PartialEq for MergeEntry {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for MergeEntry {}

impl PartialOrd for MergeEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MergeEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap: lower values come first
        other.value.cmp(&self.value)
    }
}

/// K-way merge over per-segment facet iterators, keyed by facet value and
/// summing counts of equal values across segments.
pub struct CombinedFacetIterator<'a> {
    iterators: Vec<Box<dyn FacetIterator + 'a>>,
    heap: BinaryHeap<MergeEntry>,
}

impl<'a> CombinedFacetIterator<'a> {
    /// Create a merge iterator over per-segment iterators.
    pub fn new(mut iterators: Vec<Box<dyn FacetIterator + 'a>>) -> Self {
        let mut heap = BinaryHeap::with_capacity(iterators.len());
        for (source, iterator) in iterators.iter_mut().enumerate() {
            if let Some(facet) = iterator.next(1) {
                heap.push(MergeEntry {
                    value: facet.value,
                    count: facet.count,
                    source,
                });
            }
        }
        CombinedFacetIterator { iterators, heap }
    }

    fn refill(&mut self, source: usize) {
        if let Some(facet) = self.iterators[source].next(1) {
            self.heap.push(MergeEntry {
                value: facet.value,
                count: facet.count,
                source,
            });
        }
    }
}

impl FacetIterator for CombinedFacetIterator<'_> {
    fn next(&mut self, min_hits: u64) -> Option<BrowseFacet> {
        loop {
            let head = self.heap.pop()?;
            let value = head.value;
            let mut count = head.count;
            self.refill(head.source);

            // Fold in every segment sitting on the same value
            while let Some(peer) = self.heap.peek() {
                if peer.value != value {
                    break;
                }
                let peer = self.heap.pop().expect("peeked entry disappeared");
                count += peer.count;
                self.refill(peer.source);
            }

            if count >= min_hits {
                return Some(BrowseFacet { value, count });
            }
        }
    }
}

/// Combined, single-use view over per-segment facet counts.
///
/// The view transitions Open -> Closed exactly once via
/// [`close`](CombinedFacetView::close); every operation after that fails
/// with [`CallunaError::Closed`], guarding against reads of per-segment
/// buffers that may have been recycled.
#[derive(Debug)]
pub struct CombinedFacetView {
    spec: FacetSpec,
    views: Vec<Box<dyn FacetAccessible>>,
    closed: bool,
}

impl CombinedFacetView {
    /// Create a combined view from per-segment facet counts.
    pub fn new(spec: FacetSpec, views: Vec<Box<dyn FacetAccessible>>) -> Result<Self> {
        if spec.order_by == FacetOrder::Custom && spec.custom_comparator.is_none() {
            return Err(CallunaError::construction(
                "custom facet order requires a comparator",
            ));
        }
        Ok(CombinedFacetView {
            spec,
            views,
            closed: false,
        })
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(CallunaError::closed("combined facet view is closed"))
        } else {
            Ok(())
        }
    }

    /// Whether this view has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Extract the merged facet list per this view's spec.
    pub fn facets(&self) -> Result<Vec<BrowseFacet>> {
        self.ensure_open()?;

        let iterators = self.views.iter().map(|view| view.iterator()).collect();
        let mut merged = CombinedFacetIterator::new(iterators);
        let spec = &self.spec;

        let facets = match spec.order_by {
            FacetOrder::ValueAsc => {
                let mut out = Vec::new();
                while let Some(facet) = merged.next(spec.min_hit_count) {
                    out.push(facet);
                    if spec.is_bounded() && out.len() >= spec.max_count {
                        break;
                    }
                }
                out
            }
            FacetOrder::HitsDesc => {
                if spec.is_bounded() {
                    let mut heap: BoundedTopKHeap<BrowseFacet> =
                        BoundedTopKHeap::new(spec.max_count, Box::new(compare_hits_desc));
                    let mut min_hits = spec.min_hit_count;
                    while let Some(facet) = merged.next(min_hits) {
                        heap.push(facet);
                        if heap.is_full() {
                            // Anything below the weakest kept count is doomed
                            let weakest = heap.peek_weakest().expect("full heap has a root").count;
                            min_hits = min_hits.max(weakest + 1);
                        }
                    }
                    heap.into_sorted()
                } else {
                    let mut out = Vec::new();
                    while let Some(facet) = merged.next(spec.min_hit_count) {
                        out.push(facet);
                    }
                    out.sort_by(compare_hits_desc);
                    out
                }
            }
            FacetOrder::Custom => {
                let comparator = self
                    .spec
                    .custom_comparator
                    .clone()
                    .expect("validated at construction");
                if spec.is_bounded() {
                    let heap_comparator = comparator.clone();
                    let mut heap: BoundedTopKHeap<BrowseFacet> = BoundedTopKHeap::new(
                        spec.max_count,
                        Box::new(move |a, b| heap_comparator.compare(a, b)),
                    );
                    while let Some(facet) = merged.next(spec.min_hit_count) {
                        heap.push(facet);
                    }
                    heap.into_sorted()
                } else {
                    let mut out = Vec::new();
                    while let Some(facet) = merged.next(spec.min_hit_count) {
                        out.push(facet);
                    }
                    out.sort_by(|a, b| comparator.compare(a, b));
                    out
                }
            }
        };

        Ok(facets)
    }

    /// Look up one value's combined facet.
    pub fn facet(&self, value: &str) -> Result<Option<BrowseFacet>> {
        self.ensure_open()?;

        let count: u64 = self
            .views
            .iter()
            .filter_map(|view| view.facet(value))
            .map(|facet| facet.count)
            .sum();

        if count > 0 && count >= self.spec.min_hit_count {
            Ok(Some(BrowseFacet::new(value, count)))
        } else {
            Ok(None)
        }
    }

    /// Close this view, releasing the per-segment counts it holds.
    pub fn close(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.closed = true;
        self.views.clear();
        Ok(())
    }
}
