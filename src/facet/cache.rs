//! Per-segment facet data cache: ordinal array and value dictionary.

use ahash::AHashMap;

use crate::error::{CallunaError, Result};

/// Read-only facet data for one field of one segment.
///
/// Ordinal 0 is reserved for documents carrying no value. The dictionary is
/// sorted, so ascending ordinal order is ascending value order. The cache
/// is immutable after build and may be shared across concurrently
/// executing queries against the same segment.
#[derive(Debug)]
pub struct FacetDataCache {
    /// Per-document ordinal, indexed by document ID.
    ordinals: Vec<u32>,
    /// Sorted facet values; index 0 is the reserved missing value.
    values: Vec<String>,
    /// Per-ordinal document frequency.
    freqs: Vec<u64>,
    /// Value lookup table.
    index: AHashMap<String, u32>,
}

impl FacetDataCache {
    /// Build a cache from (document, value) rows.
    ///
    /// Documents absent from `rows` get the reserved missing ordinal; a
    /// document listed twice or out of range is a construction error.
    pub fn build<S: Into<String>>(max_doc: u64, rows: Vec<(u64, S)>) -> Result<Self> {
        let mut doc_values: Vec<(u64, String)> = Vec::with_capacity(rows.len());
        for (doc_id, value) in rows {
            if doc_id >= max_doc {
                return Err(CallunaError::construction(format!(
                    "document {doc_id} out of range (max_doc {max_doc})"
                )));
            }
            let value = value.into();
            if value.is_empty() {
                return Err(CallunaError::construction(
                    "the empty facet value is reserved for missing documents",
                ));
            }
            doc_values.push((doc_id, value));
        }

        let mut values: Vec<String> = doc_values.iter().map(|(_, v)| v.clone()).collect();
        values.sort_unstable();
        values.dedup();
        values.insert(0, String::new());

        let mut index = AHashMap::with_capacity(values.len());
        for (ordinal, value) in values.iter().enumerate() {
            index.insert(value.clone(), ordinal as u32);
        }

        let mut ordinals = vec![0u32; max_doc as usize];
        let mut seen = vec![false; max_doc as usize];
        for (doc_id, value) in &doc_values {
            let slot = *doc_id as usize;
            if seen[slot] {
                return Err(CallunaError::construction(format!(
                    "document {doc_id} has more than one facet value"
                )));
            }
            seen[slot] = true;
            ordinals[slot] = index[value];
        }

        let mut freqs = vec![0u64; values.len()];
        for &ordinal in &ordinals {
            freqs[ordinal as usize] += 1;
        }

        Ok(FacetDataCache {
            ordinals,
            values,
            freqs,
            index,
        })
    }

    /// The ordinal stored for a document.
    pub fn ordinal(&self, doc_id: u64) -> u32 {
        self.ordinals[doc_id as usize]
    }

    /// The value behind an ordinal.
    pub fn value(&self, ordinal: u32) -> &str {
        &self.values[ordinal as usize]
    }

    /// Number of dictionary entries, including the reserved missing value.
    pub fn value_count(&self) -> usize {
        self.values.len()
    }

    /// Per-ordinal document frequency.
    pub fn freq(&self, ordinal: u32) -> u64 {
        self.freqs[ordinal as usize]
    }

    /// All per-ordinal document frequencies.
    pub fn freqs(&self) -> &[u64] {
        &self.freqs
    }

    /// Look up the ordinal of a value.
    pub fn ordinal_of(&self, value: &str) -> Option<u32> {
        self.index.get(value).copied()
    }

    /// Number of documents covered by this cache.
    pub fn max_doc(&self) -> u64 {
        self.ordinals.len() as u64
    }

    /// Ascending doc-id posting list for one value.
    pub fn postings_for(&self, value: &str) -> Vec<u64> {
        match self.ordinal_of(value) {
            Some(ordinal) if ordinal != 0 => self
                .ordinals
                .iter()
                .enumerate()
                .filter(|&(_, &ord)| ord == ordinal)
                .map(|(doc_id, _)| doc_id as u64)
                .collect(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> FacetDataCache {
        FacetDataCache::build(
            6,
            vec![(0, "red"), (1, "blue"), (2, "red"), (4, "green"), (5, "red")],
        )
        .unwrap()
    }

    #[test]
    fn test_dictionary_is_sorted_with_reserved_slot() {
        let cache = cache();

        assert_eq!(cache.value_count(), 4);
        assert_eq!(cache.value(0), "");
        assert_eq!(cache.value(1), "blue");
        assert_eq!(cache.value(2), "green");
        assert_eq!(cache.value(3), "red");
    }

    #[test]
    fn test_ordinals_and_freqs() {
        let cache = cache();

        assert_eq!(cache.ordinal(0), cache.ordinal_of("red").unwrap());
        assert_eq!(cache.ordinal(1), cache.ordinal_of("blue").unwrap());
        // Document 3 carries no value
        assert_eq!(cache.ordinal(3), 0);

        assert_eq!(cache.freq(cache.ordinal_of("red").unwrap()), 3);
        assert_eq!(cache.freq(cache.ordinal_of("blue").unwrap()), 1);
        assert_eq!(cache.freq(0), 1);
        assert_eq!(cache.max_doc(), 6);
    }

    #[test]
    fn test_postings_for_value() {
        let cache = cache();

        assert_eq!(cache.postings_for("red"), vec![0, 2, 5]);
        assert_eq!(cache.postings_for("green"), vec![4]);
        assert!(cache.postings_for("purple").is_empty());
        // The reserved missing value never yields postings
        assert!(cache.postings_for("").is_empty());
    }

    #[test]
    fn test_out_of_range_document_rejected() {
        let result = FacetDataCache::build(2, vec![(5, "red")]);
        assert!(matches!(result, Err(CallunaError::Construction(_))));
    }

    #[test]
    fn test_empty_value_rejected() {
        let result = FacetDataCache::build(2, vec![(0, "")]);
        assert!(matches!(result, Err(CallunaError::Construction(_))));
    }

    #[test]
    fn test_duplicate_document_rejected() {
        let result = FacetDataCache::build(3, vec![(1, "red"), (1, "blue")]);
        assert!(matches!(result, Err(CallunaError::Construction(_))));
    }
}
