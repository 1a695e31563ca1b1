//! Facet counting, validation, and merged extraction.

pub mod cache;
pub mod collector;
pub mod heap;
pub mod merge;
pub mod selection;
pub mod spec;
pub mod validator;

pub use self::cache::FacetDataCache;
pub use self::collector::{
    DefaultFacetCountCollector, FacetAccessible, FacetCountCollector, FacetIterator,
};
pub use self::heap::BoundedTopKHeap;
pub use self::merge::{CombinedFacetIterator, CombinedFacetView};
pub use self::selection::{FacetSelection, SelectionFilter};
pub use self::spec::{BrowseFacet, FacetComparator, FacetOrder, FacetSpec};
pub use self::validator::MultiSelectValidator;
