//! Analytic segments: extra analytic dimensions identified by a short code.
//!
//! Segments are looked up by code or name from pickers, so the interesting
//! behavior here is the display name and the name search.

use serde::{Deserialize, Serialize};

use erpext_core::{DomainError, DomainResult, Entity, RecordId, define_id};

define_id!(SegmentId, RecordId, "Analytic segment identifier.");

/// Default number of results returned by a name search.
pub const DEFAULT_SEARCH_LIMIT: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyticSegment {
    id: SegmentId,
    code: String,
    name: String,
    description: Option<String>,
}

impl AnalyticSegment {
    pub fn new(
        id: SegmentId,
        code: impl Into<String>,
        name: impl Into<String>,
        description: Option<String>,
    ) -> DomainResult<Self> {
        let code = code.into();
        let name = name.into();
        if code.trim().is_empty() && name.trim().is_empty() {
            return Err(DomainError::validation(
                "analytic segment needs a code or a name",
            ));
        }
        Ok(Self {
            id,
            code,
            name,
            description,
        })
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// `"[code] name"`, as shown in pickers.
    pub fn display_name(&self) -> String {
        format!("[{}] {}", self.code, self.name)
    }

    /// Case-insensitive prefix test; `term` is taken literally.
    fn code_has_prefix(&self, term: &str) -> bool {
        fold(&self.code).starts_with(&fold(term))
    }
}

/// Case folding shared by every case-insensitive comparison.
fn fold(value: &str) -> String {
    value.to_lowercase()
}

impl Entity for AnalyticSegment {
    type Id = SegmentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// How the search term is matched against the segment name.
///
/// Terms are plain text: `%` and `_` match only themselves, never act as
/// wildcards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOperator {
    /// Case-insensitive substring.
    #[default]
    Ilike,
    /// Case-sensitive substring.
    Like,
    /// Exact match.
    Equals,
    NotIlike,
    NotLike,
    NotEquals,
}

impl MatchOperator {
    pub fn is_negative(self) -> bool {
        matches!(
            self,
            MatchOperator::NotIlike | MatchOperator::NotLike | MatchOperator::NotEquals
        )
    }

    /// Positive form of the operator applied to `value`.
    fn matches_positive(self, value: &str, term: &str) -> bool {
        match self {
            MatchOperator::Ilike | MatchOperator::NotIlike => {
                fold(value).contains(&fold(term))
            }
            MatchOperator::Like | MatchOperator::NotLike => value.contains(term),
            MatchOperator::Equals | MatchOperator::NotEquals => value == term,
        }
    }

    fn matches(self, value: &str, term: &str) -> bool {
        let positive = self.matches_positive(value, term);
        if self.is_negative() { !positive } else { positive }
    }
}

/// In-memory set of analytic segments, kept ordered by `(name, code)`.
#[derive(Debug, Clone, Default)]
pub struct SegmentDirectory {
    segments: Vec<AnalyticSegment>,
}

impl SegmentDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a segment. Ids are unique; codes may repeat.
    pub fn insert(&mut self, segment: AnalyticSegment) -> DomainResult<()> {
        if self.segments.iter().any(|s| s.id == segment.id) {
            return Err(DomainError::conflict(format!(
                "segment {} already exists",
                segment.id
            )));
        }
        self.segments.push(segment);
        self.segments
            .sort_by(|a, b| (&a.name, &a.code).cmp(&(&b.name, &b.code)));
        Ok(())
    }

    pub fn get(&self, id: SegmentId) -> Option<&AnalyticSegment> {
        self.segments.iter().find(|s| s.id == id)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Search segments by code prefix or name, returning `(id, display name)`.
    ///
    /// An empty term returns every segment. Otherwise a segment matches when
    /// its code starts with the term (case-insensitive) or its name matches
    /// under `operator`. For negative operators both conditions are negated
    /// and must hold together.
    pub fn name_search(
        &self,
        term: &str,
        operator: MatchOperator,
        limit: usize,
    ) -> Vec<(SegmentId, String)> {
        self.segments
            .iter()
            .filter(|segment| {
                if term.is_empty() {
                    return true;
                }
                let name_match = operator.matches(&segment.name, term);
                if operator.is_negative() {
                    !segment.code_has_prefix(term) && name_match
                } else {
                    segment.code_has_prefix(term) || name_match
                }
            })
            .take(limit)
            .map(|segment| (segment.id, segment.display_name()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn segment(code: &str, name: &str) -> AnalyticSegment {
        AnalyticSegment::new(SegmentId::generate(), code, name, None).unwrap()
    }

    fn directory() -> SegmentDirectory {
        let mut dir = SegmentDirectory::new();
        dir.insert(segment("NE", "North East")).unwrap();
        dir.insert(segment("SW", "South West")).unwrap();
        dir.insert(segment("NW", "North West")).unwrap();
        dir.insert(segment("RET", "Retail")).unwrap();
        dir
    }

    fn names(results: &[(SegmentId, String)]) -> Vec<&str> {
        results.iter().map(|(_, n)| n.as_str()).collect()
    }

    #[test]
    fn display_name_shows_code_in_brackets() {
        assert_eq!(segment("NE", "North East").display_name(), "[NE] North East");
    }

    #[test]
    fn empty_term_lists_everything_in_name_order() {
        let results = directory().name_search("", MatchOperator::Ilike, DEFAULT_SEARCH_LIMIT);
        assert_eq!(
            names(&results),
            vec!["[NE] North East", "[NW] North West", "[RET] Retail", "[SW] South West"]
        );
    }

    #[test]
    fn matches_code_prefix_or_name() {
        let results = directory().name_search("n", MatchOperator::Ilike, DEFAULT_SEARCH_LIMIT);
        assert_eq!(names(&results), vec!["[NE] North East", "[NW] North West"]);

        let results = directory().name_search("west", MatchOperator::Ilike, DEFAULT_SEARCH_LIMIT);
        assert_eq!(names(&results), vec!["[NW] North West", "[SW] South West"]);

        let results = directory().name_search("re", MatchOperator::Ilike, DEFAULT_SEARCH_LIMIT);
        assert_eq!(names(&results), vec!["[RET] Retail"]);
    }

    #[test]
    fn case_sensitive_name_match_still_uses_case_insensitive_code() {
        let results = directory().name_search("west", MatchOperator::Like, DEFAULT_SEARCH_LIMIT);
        assert!(results.is_empty());

        let results = directory().name_search("sw", MatchOperator::Like, DEFAULT_SEARCH_LIMIT);
        assert_eq!(names(&results), vec!["[SW] South West"]);
    }

    #[test]
    fn negative_operator_excludes_code_and_name_matches() {
        let results = directory().name_search("North", MatchOperator::NotIlike, DEFAULT_SEARCH_LIMIT);
        assert_eq!(names(&results), vec!["[RET] Retail", "[SW] South West"]);

        // "s" prefixes the SW code, and "South West" contains "s".
        let results = directory().name_search("s", MatchOperator::NotIlike, DEFAULT_SEARCH_LIMIT);
        assert_eq!(names(&results), vec!["[RET] Retail"]);
    }

    #[test]
    fn limit_truncates_results() {
        let results = directory().name_search("", MatchOperator::Ilike, 2);
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn repeated_codes_are_allowed_but_ids_are_not() {
        let mut dir = directory();
        dir.insert(segment("ne", "New England")).unwrap();
        assert_eq!(dir.len(), 5);

        let results = dir.name_search("NE", MatchOperator::Ilike, DEFAULT_SEARCH_LIMIT);
        assert_eq!(names(&results), vec!["[ne] New England", "[NE] North East"]);

        let existing = dir.segments[0].clone();
        let err = dir.insert(existing).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        assert_eq!(dir.len(), 5);
    }

    #[test]
    fn percent_and_underscore_are_matched_literally() {
        let mut dir = directory();
        dir.insert(segment("R_D", "Research 100%")).unwrap();

        let results = dir.name_search("N%", MatchOperator::Ilike, DEFAULT_SEARCH_LIMIT);
        assert!(results.is_empty());

        let results = dir.name_search("r_", MatchOperator::Ilike, DEFAULT_SEARCH_LIMIT);
        assert_eq!(names(&results), vec!["[R_D] Research 100%"]);

        let results = dir.name_search("100%", MatchOperator::Like, DEFAULT_SEARCH_LIMIT);
        assert_eq!(names(&results), vec!["[R_D] Research 100%"]);
    }

    #[test]
    fn segment_needs_code_or_name() {
        let err = AnalyticSegment::new(SegmentId::generate(), " ", "", None).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    proptest! {
        /// Property: a term and its negation partition the directory.
        #[test]
        fn positive_and_negative_searches_partition(term in "[a-zA-Z]{1,3}") {
            let dir = directory();
            let pos = dir.name_search(&term, MatchOperator::Ilike, usize::MAX);
            let neg = dir.name_search(&term, MatchOperator::NotIlike, usize::MAX);

            prop_assert_eq!(pos.len() + neg.len(), dir.len());
            for (id, _) in &pos {
                prop_assert!(neg.iter().all(|(other, _)| other != id));
            }
        }
    }
}
