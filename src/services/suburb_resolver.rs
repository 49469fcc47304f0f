//! Suburb validation and query-filter construction
//!
//! Resolution order: exact match, exact match after stripping a trailing
//! state qualifier ("Manly (NSW)"), then fuzzy match with the configured
//! scorer. A handful of ambiguous suburbs are allowed through unresolved so
//! the caller can search by postcode instead.

use crate::infra::error::{Result, StrataError};
use crate::infra::gazetteer::SuburbReferenceSet;
use crate::services::similarity::{normalize, SimilarityScorer, WeightedRatio};
use regex::Regex;
use rustc_hash::FxHashSet;
use std::sync::{Arc, LazyLock};
use tracing::{debug, info, warn};

/// Trailing "(NSW)"-style jurisdiction qualifier
static JURISDICTION_QUALIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*\((?:NSW|ACT|VIC|QLD|SA|WA|TAS|NT)\)\s*$")
        .expect("jurisdiction pattern is valid")
});

/// Filter expression handed to the data source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryFilter {
    /// Case-insensitive "contains" match on the suburb attribute
    SuburbContains(String),
    /// Exact postcode match
    PostcodeEquals(u32),
}

impl QueryFilter {
    /// Build a suburb filter, sanitizing the name for the upstream where-clause
    pub fn suburb(name: &str) -> Self {
        let sanitized = name.replace('-', " ").replace('\'', "''").replace('"', "\"\"");
        QueryFilter::SuburbContains(sanitized)
    }

    /// ArcGIS SQL where-clause
    pub fn where_clause(&self) -> String {
        match self {
            QueryFilter::SuburbContains(name) => format!("UPPER(suburb) LIKE UPPER('%{name}%')"),
            QueryFilter::PostcodeEquals(postcode) => format!("postcode = {postcode}"),
        }
    }
}

impl std::fmt::Display for QueryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.where_clause())
    }
}

/// How a suburb name was matched
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchKind {
    Exact,
    QualifierStripped,
    Fuzzy { score: f64 },
}

/// Outcome of a successful resolution
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Suburb found in the gazetteer
    Matched { suburb: String, kind: MatchKind, filter: QueryFilter },
    /// Not resolvable, but allow-listed for a postcode search by the caller
    Deferred { suburb: String },
}

impl Resolution {
    pub fn filter(&self) -> Option<&QueryFilter> {
        match self {
            Resolution::Matched { filter, .. } => Some(filter),
            Resolution::Deferred { .. } => None,
        }
    }
}

pub struct SuburbResolver {
    reference: Arc<SuburbReferenceSet>,
    scorer: Box<dyn SimilarityScorer>,
    threshold: f64,
    deferred: FxHashSet<String>,
}

impl SuburbResolver {
    /// Resolver with the weighted-ratio scorer
    pub fn new<I, S>(reference: Arc<SuburbReferenceSet>, threshold: f64, deferred: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::with_scorer(reference, Box::new(WeightedRatio), threshold, deferred)
    }

    pub fn with_scorer<I, S>(
        reference: Arc<SuburbReferenceSet>,
        scorer: Box<dyn SimilarityScorer>,
        threshold: f64,
        deferred: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let deferred = deferred.into_iter().map(|s| s.as_ref().trim().to_uppercase()).collect();
        Self { reference, scorer, threshold, deferred }
    }

    /// Validate free-text suburb input against the gazetteer
    pub fn resolve(&self, input: &str) -> Result<Resolution> {
        let suburb_upper = input.trim().to_uppercase();
        if suburb_upper.is_empty() {
            return Err(StrataError::MissingInput);
        }

        self.reference.ensure_loaded()?;

        if self.reference.contains(&suburb_upper) {
            return Ok(matched(suburb_upper, MatchKind::Exact));
        }

        let plain = JURISDICTION_QUALIFIER.replace(&suburb_upper, "");
        if plain != suburb_upper && self.reference.contains(&plain) {
            debug!(input = %input, suburb = %plain, "suburb_qualifier_stripped");
            return Ok(matched(plain.into_owned(), MatchKind::QualifierStripped));
        }

        if let Some((suburb, score)) = self.best_fuzzy_match(&suburb_upper) {
            info!(input = %input, suburb = %suburb, score = %format!("{score:.1}"), "suburb_fuzzy_matched");
            return Ok(matched(suburb, MatchKind::Fuzzy { score }));
        }

        info!(input = %input, threshold = %self.threshold, "suburb_fuzzy_match_failed");

        if self.deferred.contains(&suburb_upper) {
            warn!(suburb = %suburb_upper, "suburb_unresolved_postcode_fallback_expected");
            return Ok(Resolution::Deferred { suburb: suburb_upper });
        }

        Err(StrataError::invalid_suburb(input.trim()))
    }

    /// Highest-scoring reference suburb at or above the threshold.
    /// Ties keep the candidate seen first in gazetteer order.
    fn best_fuzzy_match(&self, suburb_upper: &str) -> Option<(String, f64)> {
        let query = normalize(suburb_upper);
        if query.is_empty() {
            return None;
        }

        let mut best: Option<(String, f64)> = None;
        self.reference.for_each(|candidate| {
            let score = self.scorer.score(&query, &normalize(candidate));
            if score < self.threshold {
                return;
            }
            if best.as_ref().map_or(true, |(_, best_score)| score > *best_score) {
                best = Some((candidate.to_string(), score));
            }
        });
        best
    }
}

fn matched(suburb: String, kind: MatchKind) -> Resolution {
    let filter = QueryFilter::suburb(&suburb);
    Resolution::Matched { suburb, kind, filter }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFERRED: [&str; 4] = ["MANLY", "CREMORNE", "NEWINGTON", "NEUTRAL BAY"];

    fn resolver(names: &[&str]) -> SuburbResolver {
        let reference = Arc::new(SuburbReferenceSet::from_names(names.iter().copied()));
        SuburbResolver::new(reference, 85.0, DEFERRED)
    }

    fn matched_name(resolution: Resolution) -> String {
        match resolution {
            Resolution::Matched { suburb, .. } => suburb,
            other => panic!("expected match, got {other:?}"),
        }
    }

    #[test]
    fn test_exact_match_case_insensitive() {
        let r = resolver(&["SYDNEY", "MANLY"]);
        let resolution = r.resolve("  sydney ").unwrap();
        assert_eq!(
            resolution,
            Resolution::Matched {
                suburb: "SYDNEY".to_string(),
                kind: MatchKind::Exact,
                filter: QueryFilter::SuburbContains("SYDNEY".to_string()),
            }
        );
    }

    #[test]
    fn test_qualifier_stripped() {
        let r = resolver(&["SYDNEY", "MANLY"]);
        let resolution = r.resolve("Manly (NSW)").unwrap();
        assert!(matches!(
            resolution,
            Resolution::Matched { kind: MatchKind::QualifierStripped, .. }
        ));
        assert_eq!(matched_name(resolution), "MANLY");
    }

    #[test]
    fn test_misspelling_below_threshold_is_invalid() {
        // SYNDEY vs SYDNEY scores 83.3 under the weighted ratio
        let r = resolver(&["SYDNEY", "MANLY"]);
        let err = r.resolve("Syndey").unwrap_err();
        assert_eq!(err, StrataError::invalid_suburb("Syndey"));
    }

    #[test]
    fn test_misspelling_above_threshold_matches() {
        let r = resolver(&["SYDNEY", "PARRAMATTA"]);
        let resolution = r.resolve("parramata").unwrap();
        match &resolution {
            Resolution::Matched { kind: MatchKind::Fuzzy { score }, .. } => assert!(*score >= 85.0),
            other => panic!("expected fuzzy match, got {other:?}"),
        }
        assert_eq!(matched_name(resolution), "PARRAMATTA");
    }

    #[test]
    fn test_lower_threshold_admits_close_misspelling() {
        let reference = Arc::new(SuburbReferenceSet::from_names(["SYDNEY"]));
        let r = SuburbResolver::new(reference, 80.0, DEFERRED);
        assert_eq!(matched_name(r.resolve("Syndey").unwrap()), "SYDNEY");
    }

    #[test]
    fn test_fuzzy_tie_keeps_first_seen() {
        let r = resolver(&["BONDI JUNCTION", "BONDI BEACH"]);
        assert_eq!(matched_name(r.resolve("Bondi").unwrap()), "BONDI JUNCTION");

        let r = resolver(&["BONDI BEACH", "BONDI JUNCTION"]);
        assert_eq!(matched_name(r.resolve("Bondi").unwrap()), "BONDI BEACH");
    }

    #[test]
    fn test_fuzzy_prefers_higher_score() {
        let r = resolver(&["NORTH SYDNEY", "NEUTRAL BAY"]);
        assert_eq!(matched_name(r.resolve("Bay Neutral").unwrap()), "NEUTRAL BAY");
    }

    #[test]
    fn test_allow_listed_suburb_is_deferred() {
        let r = resolver(&["SYDNEY"]);
        assert_eq!(
            r.resolve("manly").unwrap(),
            Resolution::Deferred { suburb: "MANLY".to_string() }
        );
        assert!(r.resolve("manly").unwrap().filter().is_none());
    }

    #[test]
    fn test_blank_input_is_missing() {
        let r = resolver(&["SYDNEY"]);
        assert_eq!(r.resolve("   ").unwrap_err(), StrataError::MissingInput);
    }

    #[test]
    fn test_empty_reference_set_unavailable() {
        let r = resolver(&[]);
        assert!(matches!(
            r.resolve("Sydney"),
            Err(StrataError::ReferenceSetUnavailable { .. })
        ));
    }

    #[test]
    fn test_filter_replaces_hyphens_and_escapes_quotes() {
        assert_eq!(
            QueryFilter::suburb("WOOLOOMOOLOO-EAST").where_clause(),
            "UPPER(suburb) LIKE UPPER('%WOOLOOMOOLOO EAST%')"
        );
        assert_eq!(
            QueryFilter::suburb("X') OR 1=1 --").where_clause(),
            "UPPER(suburb) LIKE UPPER('%X'') OR 1=1   %')"
        );
        assert_eq!(QueryFilter::suburb("O\"NEIL"), QueryFilter::SuburbContains("O\"\"NEIL".into()));
    }

    #[test]
    fn test_postcode_filter() {
        assert_eq!(QueryFilter::PostcodeEquals(2095).where_clause(), "postcode = 2095");
    }

    struct FixedScorer(f64);

    impl SimilarityScorer for FixedScorer {
        fn score(&self, _a: &str, _b: &str) -> f64 {
            self.0
        }
    }

    #[test]
    fn test_scorer_is_pluggable() {
        let reference = Arc::new(SuburbReferenceSet::from_names(["GLEBE", "ULTIMO"]));
        let r = SuburbResolver::with_scorer(
            reference.clone(),
            Box::new(FixedScorer(99.0)),
            85.0,
            DEFERRED,
        );
        assert_eq!(matched_name(r.resolve("anything").unwrap()), "GLEBE");

        let r =
            SuburbResolver::with_scorer(reference, Box::new(FixedScorer(10.0)), 85.0, DEFERRED);
        assert!(r.resolve("anything").is_err());
    }
}
