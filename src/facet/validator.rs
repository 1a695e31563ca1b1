//! Multi-select facet validation over one segment at a time.

use crate::error::{CallunaError, Result};
use crate::facet::collector::{DefaultFacetCountCollector, FacetCountCollector};
use crate::facet::selection::{FacetSelection, SelectionFilter};
use crate::segment::SegmentReader;

/// One selection filter bound to the current segment.
#[derive(Debug)]
struct FilterBinding {
    filter: SelectionFilter,
    /// Cached cursor position; only moved forward when a candidate passes
    /// it.
    position: u64,
    /// Index of this filter's collector in the collector table.
    collector: usize,
}

impl FilterBinding {
    fn advance_to(&mut self, doc_id: u64) -> Result<()> {
        self.position = self.filter.advance(doc_id)?;
        Ok(())
    }
}

/// Validates candidate documents against every active facet selection while
/// driving per-value count collection.
///
/// The defining multi-select invariant: a candidate failing exactly one
/// selected facet still feeds that facet's collector, so selecting a value
/// within a facet never hides its sibling counts, while every other facet's
/// selection still constrains the candidate set.
///
/// The validator is rebuilt per segment via
/// [`set_next_reader`](MultiSelectValidator::set_next_reader) and must be
/// driven by a single caller delivering strictly increasing document IDs.
#[derive(Debug)]
pub struct MultiSelectValidator {
    /// Selections carrying real constraints.
    selections: Vec<FacetSelection>,
    /// Every field needing a count collector, selected or not.
    count_fields: Vec<String>,
    /// Per-segment filter bindings, ordered by ascending selectivity.
    selected: Vec<FilterBinding>,
    /// Collector indexes for count-only fields.
    always_collect: Vec<usize>,
    /// Per-segment collectors, one per count field.
    collectors: Vec<DefaultFacetCountCollector>,
    /// Skip target; valid only after a failed validation.
    next_target: u64,
    /// Last validated document, for the ordering invariant.
    last_doc: Option<u64>,
    /// Whether a segment is currently bound.
    bound: bool,
}

impl MultiSelectValidator {
    /// Create a validator from the request's selections and the set of
    /// fields whose counts are wanted.
    ///
    /// Fields carrying a selection are counted whether or not they appear
    /// in `count_fields`. Selections are keyed by field: multiple
    /// selections on one field are merged into a single filter.
    pub fn new(selections: Vec<FacetSelection>, count_fields: Vec<String>) -> Self {
        let mut merged: Vec<FacetSelection> = Vec::new();
        for selection in selections {
            match merged.iter_mut().find(|seen| seen.field == selection.field) {
                Some(existing) => {
                    existing.values.extend(selection.values);
                    existing.not_values.extend(selection.not_values);
                }
                None => merged.push(selection),
            }
        }

        let mut fields = count_fields;
        for selection in &merged {
            if !fields.iter().any(|field| *field == selection.field) {
                fields.push(selection.field.clone());
            }
        }

        let selections = merged
            .into_iter()
            .filter(|selection| selection.has_selection())
            .collect();

        MultiSelectValidator {
            selections,
            count_fields: fields,
            selected: Vec::new(),
            always_collect: Vec::new(),
            collectors: Vec::new(),
            next_target: 0,
            last_doc: None,
            bound: false,
        }
    }

    /// Number of filters carrying a real selection.
    pub fn selection_count(&self) -> usize {
        self.selections.len()
    }

    /// Whether every candidate passes (no selection constrains the
    /// segment).
    pub fn is_match_all(&self) -> bool {
        self.selections.is_empty()
    }

    /// Bind this validator to a segment, rebuilding every filter cursor and
    /// collector and re-sorting filters by ascending selectivity.
    pub fn set_next_reader(&mut self, segment: &dyn SegmentReader) -> Result<()> {
        self.collectors = Vec::with_capacity(self.count_fields.len());
        for field in &self.count_fields {
            let cache = segment.facet_cache(field)?;
            self.collectors
                .push(DefaultFacetCountCollector::new(field.clone(), cache));
        }

        self.selected = Vec::with_capacity(self.selections.len());
        let mut selected_fields = Vec::with_capacity(self.selections.len());
        for selection in &self.selections {
            let filter = selection.compile(segment)?;
            let collector = self
                .count_fields
                .iter()
                .position(|field| *field == selection.field)
                .expect("selected field registered as count field");
            let position = filter.position();
            self.selected.push(FilterBinding {
                filter,
                position,
                collector,
            });
            selected_fields.push(selection.field.clone());
        }

        // Least selective first: cheapest cursors are the likeliest to miss
        self.selected.sort_by_key(|binding| binding.filter.cost());

        self.always_collect = (0..self.count_fields.len())
            .filter(|index| !selected_fields.contains(&self.count_fields[*index]))
            .collect();

        self.next_target = 0;
        self.last_doc = None;
        self.bound = true;
        Ok(())
    }

    /// Test one candidate document, feeding collectors per the multi-select
    /// invariant. Candidates must arrive in strictly increasing order.
    pub fn validate(&mut self, doc_id: u64) -> Result<bool> {
        if !self.bound {
            return Err(CallunaError::invariant(
                "validate called before set_next_reader",
            ));
        }
        if let Some(last) = self.last_doc {
            if doc_id <= last {
                return Err(CallunaError::invariant(format!(
                    "documents must increase: got {doc_id} after {last}"
                )));
            }
        }
        self.last_doc = Some(doc_id);

        match self.selected.len() {
            0 => {
                self.collect_all_fields(doc_id);
                Ok(true)
            }
            1 => self.validate_single(doc_id),
            _ => self.validate_general(doc_id),
        }
    }

    /// The document the caller should advance to after a failed
    /// validation.
    pub fn next_target(&self) -> u64 {
        self.next_target
    }

    /// Hand the finished segment's collectors to the caller. The validator
    /// must be re-bound before further validation.
    pub fn detach_collectors(&mut self) -> Vec<DefaultFacetCountCollector> {
        self.bound = false;
        self.selected.clear();
        self.always_collect.clear();
        std::mem::take(&mut self.collectors)
    }

    /// Count every document in the bound segment into every collector.
    ///
    /// Only meaningful for a match-all validator driven without a base
    /// query, where it replaces the per-document loop.
    pub fn collect_all(&mut self) -> Result<()> {
        if !self.bound {
            return Err(CallunaError::invariant(
                "collect_all called before set_next_reader",
            ));
        }
        for collector in &mut self.collectors {
            collector.collect_all();
        }
        Ok(())
    }

    fn validate_single(&mut self, doc_id: u64) -> Result<bool> {
        let binding = &mut self.selected[0];

        let matched = match binding.filter.contains(doc_id) {
            Some(contained) => contained,
            None => {
                // No O(1) probe: fall back to the cursor
                if binding.position < doc_id {
                    binding.advance_to(doc_id)?;
                }
                binding.position == doc_id
            }
        };

        if matched {
            self.collect_all_fields(doc_id);
            Ok(true)
        } else {
            // With a single selection, every candidate contributes to the
            // selected facet's sibling counts, so the caller may not skip
            // past any of them.
            let collector = binding.collector;
            self.collectors[collector].collect(doc_id);
            self.next_target = doc_id + 1;
            Ok(false)
        }
    }

    fn validate_general(&mut self, doc_id: u64) -> Result<bool> {
        let mut miss: Option<usize> = None;

        for index in 0..self.selected.len() {
            if self.selected[index].position < doc_id {
                self.selected[index].advance_to(doc_id)?;
            }

            if self.selected[index].position > doc_id {
                if let Some(first) = miss {
                    // A second disagreement: the caller can jump straight to
                    // the nearer of the two blocking positions.
                    self.next_target = self.selected[first]
                        .position
                        .min(self.selected[index].position);
                    self.selected.swap(0, first);
                    return Ok(false);
                }
                miss = Some(index);
            }
        }

        match miss {
            None => {
                self.collect_all_fields(doc_id);
                Ok(true)
            }
            Some(index) => {
                // Sole miss: the candidate satisfies every other facet, so
                // it still counts toward the missing facet's siblings.
                let collector = self.selected[index].collector;
                self.collectors[collector].collect(doc_id);
                self.next_target = doc_id + 1;
                self.selected.swap(0, index);
                Ok(false)
            }
        }
    }

    fn collect_all_fields(&mut self, doc_id: u64) {
        for binding in &self.selected {
            self.collectors[binding.collector].collect(doc_id);
        }
        for &index in &self.always_collect {
            self.collectors[index].collect(doc_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::facet::collector::FacetAccessible;
    use crate::facet::spec::BrowseFacet;
    use crate::segment::InMemorySegment;

    fn segment() -> Arc<dyn SegmentReader> {
        // size: 2,4,6,8 / kind: 4,8,12 (within max_doc 14)
        Arc::new(
            InMemorySegment::build(
                14,
                &[
                    (2, "size", "small"),
                    (4, "size", "small"),
                    (6, "size", "small"),
                    (8, "size", "small"),
                    (1, "size", "large"),
                    (4, "kind", "disk"),
                    (8, "kind", "disk"),
                    (12, "kind", "disk"),
                    (3, "kind", "tape"),
                ],
            )
            .unwrap(),
        )
    }

    fn facet(collectors: &[DefaultFacetCountCollector], field: &str, value: &str) -> u64 {
        collectors
            .iter()
            .find(|collector| collector.field() == field)
            .and_then(|collector| collector.facet(value))
            .map(|facet: BrowseFacet| facet.count)
            .unwrap_or(0)
    }

    #[test]
    fn test_two_filter_validation() {
        let segment = segment();
        let mut validator = MultiSelectValidator::new(
            vec![
                FacetSelection::new("size").select("small"),
                FacetSelection::new("kind").select("disk"),
            ],
            vec![],
        );
        validator.set_next_reader(segment.as_ref()).unwrap();

        // Document 4 is in both selections
        assert!(validator.validate(4).unwrap());

        // Document 6 fails only the kind filter: the kind collector is fed
        // (document 6 has no kind value, so nothing surfaces), the size
        // collector is not.
        assert!(!validator.validate(6).unwrap());
        assert!(validator.next_target() >= 7);

        // Document 8 is in both selections again
        assert!(validator.validate(8).unwrap());

        let collectors = validator.detach_collectors();
        assert_eq!(facet(&collectors, "size", "small"), 2);
        assert_eq!(facet(&collectors, "kind", "disk"), 2);
        assert_eq!(facet(&collectors, "kind", "tape"), 0);
    }

    #[test]
    fn test_double_disagreement_skips_ahead() {
        let segment = segment();
        let mut validator = MultiSelectValidator::new(
            vec![
                FacetSelection::new("size").select("small"),
                FacetSelection::new("kind").select("disk"),
            ],
            vec![],
        );
        validator.set_next_reader(segment.as_ref()).unwrap();

        // Document 0 is in neither selection: both filters disagree, and the
        // skip target is the nearer blocking position (size matches at 2,
        // kind at 4).
        assert!(!validator.validate(0).unwrap());
        assert_eq!(validator.next_target(), 2);

        let collectors = validator.detach_collectors();
        // A double miss feeds no collector
        assert_eq!(facet(&collectors, "size", "small"), 0);
        assert_eq!(facet(&collectors, "kind", "disk"), 0);
    }

    #[test]
    fn test_single_filter_random_probe() {
        let segment = segment();
        let mut validator =
            MultiSelectValidator::new(vec![FacetSelection::new("size").select("small")], vec![]);
        validator.set_next_reader(segment.as_ref()).unwrap();
        assert_eq!(validator.selection_count(), 1);

        assert!(validator.validate(2).unwrap());
        assert!(!validator.validate(3).unwrap());
        assert_eq!(validator.next_target(), 4);
        assert!(validator.validate(4).unwrap());

        let collectors = validator.detach_collectors();
        // Misses still count toward the selected facet's siblings
        assert_eq!(facet(&collectors, "size", "small"), 2);
    }

    #[test]
    fn test_match_all_counts_everything() {
        let segment = segment();
        let mut validator = MultiSelectValidator::new(
            vec![],
            vec!["size".to_string(), "kind".to_string()],
        );
        assert!(validator.is_match_all());
        validator.set_next_reader(segment.as_ref()).unwrap();

        for doc_id in 0..14 {
            assert!(validator.validate(doc_id).unwrap());
        }

        let collectors = validator.detach_collectors();
        assert_eq!(facet(&collectors, "size", "small"), 4);
        assert_eq!(facet(&collectors, "size", "large"), 1);
        assert_eq!(facet(&collectors, "kind", "disk"), 3);
        assert_eq!(facet(&collectors, "kind", "tape"), 1);
    }

    #[test]
    fn test_collect_all_fast_path_matches_loop() {
        let segment = segment();
        let mut validator = MultiSelectValidator::new(
            vec![],
            vec!["size".to_string(), "kind".to_string()],
        );
        validator.set_next_reader(segment.as_ref()).unwrap();
        validator.collect_all().unwrap();

        let collectors = validator.detach_collectors();
        assert_eq!(facet(&collectors, "size", "small"), 4);
        assert_eq!(facet(&collectors, "kind", "disk"), 3);
    }

    #[test]
    fn test_sibling_counts_with_always_collect_field() {
        let segment = segment();
        let mut validator = MultiSelectValidator::new(
            vec![FacetSelection::new("kind").select("disk")],
            vec!["size".to_string(), "kind".to_string()],
        );
        validator.set_next_reader(segment.as_ref()).unwrap();

        let mut passed = Vec::new();
        for doc_id in 0..14 {
            if validator.validate(doc_id).unwrap() {
                passed.push(doc_id);
            }
        }
        assert_eq!(passed, vec![4, 8, 12]);

        let collectors = validator.detach_collectors();
        // The size facet only sees documents passing the kind selection
        assert_eq!(facet(&collectors, "size", "small"), 2);
        assert_eq!(facet(&collectors, "size", "large"), 0);
        // The kind facet keeps its sibling counts despite the selection
        assert_eq!(facet(&collectors, "kind", "disk"), 3);
        assert_eq!(facet(&collectors, "kind", "tape"), 1);
    }

    #[test]
    fn test_same_field_selections_merge() {
        let segment = segment();
        let mut validator = MultiSelectValidator::new(
            vec![
                FacetSelection::new("kind").select("disk"),
                FacetSelection::new("kind").select("tape"),
            ],
            vec![],
        );
        // One merged filter, not two
        assert_eq!(validator.selection_count(), 1);
        validator.set_next_reader(segment.as_ref()).unwrap();

        let mut passed = Vec::new();
        for doc_id in 0..14 {
            if validator.validate(doc_id).unwrap() {
                passed.push(doc_id);
            }
        }
        assert_eq!(passed, vec![3, 4, 8, 12]);

        let collectors = validator.detach_collectors();
        assert_eq!(facet(&collectors, "kind", "disk"), 3);
        assert_eq!(facet(&collectors, "kind", "tape"), 1);
    }

    #[test]
    fn test_out_of_order_documents_rejected() {
        let segment = segment();
        let mut validator =
            MultiSelectValidator::new(vec![FacetSelection::new("size").select("small")], vec![]);
        validator.set_next_reader(segment.as_ref()).unwrap();

        validator.validate(5).unwrap();
        assert!(matches!(
            validator.validate(5),
            Err(CallunaError::InvariantViolation(_))
        ));
        assert!(matches!(
            validator.validate(3),
            Err(CallunaError::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_validate_requires_binding() {
        let mut validator = MultiSelectValidator::new(vec![], vec!["size".to_string()]);
        assert!(matches!(
            validator.validate(0),
            Err(CallunaError::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_rebinding_resets_per_segment_state() {
        let segment = segment();
        let mut validator =
            MultiSelectValidator::new(vec![FacetSelection::new("kind").select("disk")], vec![]);

        validator.set_next_reader(segment.as_ref()).unwrap();
        assert!(validator.validate(4).unwrap());
        let first = validator.detach_collectors();
        assert_eq!(facet(&first, "kind", "disk"), 1);

        // Fresh cursors and collectors; earlier documents are valid again
        validator.set_next_reader(segment.as_ref()).unwrap();
        assert!(validator.validate(4).unwrap());
        let second = validator.detach_collectors();
        assert_eq!(facet(&second, "kind", "disk"), 1);
    }

    #[test]
    fn test_failing_filter_moves_to_front() {
        let segment = segment();
        let mut validator = MultiSelectValidator::new(
            vec![
                FacetSelection::new("size").select("small"),
                FacetSelection::new("kind").select("disk"),
            ],
            vec![],
        );
        validator.set_next_reader(segment.as_ref()).unwrap();

        // kind (cost 3) sorts ahead of size (cost 4) initially. Document 2
        // passes size but fails kind, so kind stays the front probe.
        assert!(!validator.validate(2).unwrap());
        assert_eq!(validator.selected[0].filter.field(), "kind");

        // Document 6 again fails kind alone
        assert!(!validator.validate(6).unwrap());
        assert_eq!(validator.selected[0].filter.field(), "kind");
    }
}
