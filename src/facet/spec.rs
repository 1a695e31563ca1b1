//! Facet output types and ordering specifications.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A facet value and its hit count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowseFacet {
    /// The facet value.
    pub value: String,
    /// Number of documents carrying this value.
    pub count: u64,
}

impl BrowseFacet {
    /// Create a new browse facet.
    pub fn new<S: Into<String>>(value: S, count: u64) -> Self {
        BrowseFacet {
            value: value.into(),
            count,
        }
    }
}

/// An injected ordering over browse facets.
///
/// The comparator defines the emission order: `Less` means the left facet
/// ranks ahead of the right one in the final list.
#[derive(Clone)]
pub struct FacetComparator(Arc<dyn Fn(&BrowseFacet, &BrowseFacet) -> Ordering + Send + Sync>);

impl FacetComparator {
    /// Create a comparator from a function value.
    pub fn new<F>(compare: F) -> Self
    where
        F: Fn(&BrowseFacet, &BrowseFacet) -> Ordering + Send + Sync + 'static,
    {
        FacetComparator(Arc::new(compare))
    }

    /// Compare two facets.
    pub fn compare(&self, a: &BrowseFacet, b: &BrowseFacet) -> Ordering {
        (self.0)(a, b)
    }
}

impl fmt::Debug for FacetComparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FacetComparator(..)")
    }
}

/// Ordering mode for extracted facet lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum FacetOrder {
    /// Facet values in ascending order.
    ValueAsc,
    /// Hit counts in descending order, ties broken by ascending value.
    #[default]
    HitsDesc,
    /// Order supplied by [`FacetSpec::custom_comparator`].
    Custom,
}

/// Specification for facet extraction: ordering mode and count thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacetSpec {
    /// The ordering mode.
    pub order_by: FacetOrder,
    /// Minimum combined hit count for a value to appear.
    pub min_hit_count: u64,
    /// Maximum number of facets returned; `0` means unbounded.
    pub max_count: usize,
    /// Comparator used when `order_by` is [`FacetOrder::Custom`].
    #[serde(skip)]
    pub custom_comparator: Option<FacetComparator>,
}

impl Default for FacetSpec {
    fn default() -> Self {
        FacetSpec {
            order_by: FacetOrder::HitsDesc,
            min_hit_count: 1,
            max_count: 0,
            custom_comparator: None,
        }
    }
}

impl FacetSpec {
    /// Create a spec ordered by ascending facet value.
    pub fn value_asc() -> Self {
        FacetSpec {
            order_by: FacetOrder::ValueAsc,
            ..Default::default()
        }
    }

    /// Create a spec ordered by descending hit count.
    pub fn hits_desc() -> Self {
        FacetSpec {
            order_by: FacetOrder::HitsDesc,
            ..Default::default()
        }
    }

    /// Create a spec ordered by a custom comparator.
    pub fn custom(comparator: FacetComparator) -> Self {
        FacetSpec {
            order_by: FacetOrder::Custom,
            custom_comparator: Some(comparator),
            ..Default::default()
        }
    }

    /// Set the minimum combined hit count.
    pub fn with_min_hit_count(mut self, min_hit_count: u64) -> Self {
        self.min_hit_count = min_hit_count;
        self
    }

    /// Set the maximum number of facets returned (`0` means unbounded).
    pub fn with_max_count(mut self, max_count: usize) -> Self {
        self.max_count = max_count;
        self
    }

    /// Whether this spec bounds the number of returned facets.
    pub fn is_bounded(&self) -> bool {
        self.max_count > 0
    }
}

/// The descending-hits ordering: count descending, ties broken by
/// ascending value.
pub fn compare_hits_desc(a: &BrowseFacet, b: &BrowseFacet) -> Ordering {
    b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value))
}

/// The ascending-value ordering.
pub fn compare_value_asc(a: &BrowseFacet, b: &BrowseFacet) -> Ordering {
    a.value.cmp(&b.value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_facet_spec_defaults() {
        let spec = FacetSpec::default();
        assert_eq!(spec.order_by, FacetOrder::HitsDesc);
        assert_eq!(spec.min_hit_count, 1);
        assert_eq!(spec.max_count, 0);
        assert!(!spec.is_bounded());
    }

    #[test]
    fn test_facet_spec_builders() {
        let spec = FacetSpec::value_asc()
            .with_min_hit_count(2)
            .with_max_count(10);
        assert_eq!(spec.order_by, FacetOrder::ValueAsc);
        assert_eq!(spec.min_hit_count, 2);
        assert_eq!(spec.max_count, 10);
        assert!(spec.is_bounded());
    }

    #[test]
    fn test_hits_desc_ordering() {
        let a = BrowseFacet::new("apple", 5);
        let b = BrowseFacet::new("banana", 3);
        let c = BrowseFacet::new("cherry", 5);

        assert_eq!(compare_hits_desc(&a, &b), Ordering::Less);
        assert_eq!(compare_hits_desc(&b, &a), Ordering::Greater);
        // Equal counts break ties on ascending value
        assert_eq!(compare_hits_desc(&a, &c), Ordering::Less);
    }

    #[test]
    fn test_custom_comparator() {
        // Rank by value length, shortest first
        let cmp = FacetComparator::new(|a, b| a.value.len().cmp(&b.value.len()));
        let short = BrowseFacet::new("ab", 1);
        let long = BrowseFacet::new("abcd", 9);
        assert_eq!(cmp.compare(&short, &long), Ordering::Less);
    }
}
