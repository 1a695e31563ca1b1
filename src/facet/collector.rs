//! Per-segment facet count collection.

use std::fmt::Debug;
use std::sync::Arc;

use crate::facet::cache::FacetDataCache;
use crate::facet::spec::BrowseFacet;

/// Trait for per-segment facet count collectors.
///
/// A collector lives for exactly one segment and is mutated by a single
/// caller thread, only through [`collect`](FacetCountCollector::collect)
/// and [`collect_all`](FacetCountCollector::collect_all).
pub trait FacetCountCollector: Send + Debug {
    /// The facet field this collector counts.
    fn field(&self) -> &str;

    /// Count one document.
    fn collect(&mut self, doc_id: u64);

    /// Count every document in the segment.
    fn collect_all(&mut self);
}

/// Read access to collected facet counts.
pub trait FacetAccessible: Send + Debug {
    /// Look up the counted facet for one value, if it was seen.
    fn facet(&self, value: &str) -> Option<BrowseFacet>;

    /// Iterate counted values in ascending value order.
    fn iterator(&self) -> Box<dyn FacetIterator + '_>;
}

/// Iterator over counted facet values in ascending value order.
pub trait FacetIterator {
    /// Advance to the next value whose count is at least `min_hits`.
    fn next(&mut self, min_hits: u64) -> Option<BrowseFacet>;
}

/// The standard ordinal-array count collector.
#[derive(Debug)]
pub struct DefaultFacetCountCollector {
    field: String,
    cache: Arc<FacetDataCache>,
    counts: Vec<u64>,
}

impl DefaultFacetCountCollector {
    /// Create a collector over one segment's facet data.
    pub fn new<S: Into<String>>(field: S, cache: Arc<FacetDataCache>) -> Self {
        let counts = vec![0u64; cache.value_count()];
        DefaultFacetCountCollector {
            field: field.into(),
            cache,
            counts,
        }
    }

    /// The per-ordinal counts.
    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    /// Number of distinct counted values, computed by enumerating the
    /// count array. The reserved missing ordinal is not a value.
    pub fn distinct_values(&self) -> usize {
        self.counts
            .iter()
            .skip(1)
            .filter(|&&count| count > 0)
            .count()
    }
}

impl FacetCountCollector for DefaultFacetCountCollector {
    fn field(&self) -> &str {
        &self.field
    }

    fn collect(&mut self, doc_id: u64) {
        let ordinal = self.cache.ordinal(doc_id);
        self.counts[ordinal as usize] += 1;
    }

    fn collect_all(&mut self) {
        for (ordinal, &freq) in self.cache.freqs().iter().enumerate() {
            self.counts[ordinal] += freq;
        }
    }
}

impl FacetAccessible for DefaultFacetCountCollector {
    fn facet(&self, value: &str) -> Option<BrowseFacet> {
        let ordinal = self.cache.ordinal_of(value)?;
        if ordinal == 0 {
            return None;
        }
        let count = self.counts[ordinal as usize];
        if count > 0 {
            Some(BrowseFacet::new(value, count))
        } else {
            None
        }
    }

    fn iterator(&self) -> Box<dyn FacetIterator + '_> {
        Box::new(DefaultFacetIterator {
            collector: self,
            ordinal: 1,
        })
    }
}

/// Value-ordered iterator over one collector's counts.
///
/// The dictionary is sorted, so walking ordinals upward walks values
/// upward.
struct DefaultFacetIterator<'a> {
    collector: &'a DefaultFacetCountCollector,
    ordinal: usize,
}

impl FacetIterator for DefaultFacetIterator<'_> {
    fn next(&mut self, min_hits: u64) -> Option<BrowseFacet> {
        let counts = &self.collector.counts;
        while self.ordinal < counts.len() {
            let ordinal = self.ordinal;
            self.ordinal += 1;

            let count = counts[ordinal];
            if count > 0 && count >= min_hits {
                let value = self.collector.cache.value(ordinal as u32);
                return Some(BrowseFacet::new(value, count));
            }
        }
        None
    }
}
