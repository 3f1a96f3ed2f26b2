//! Weighted overall score.
//!
//! `overall = Σ(score × weight) / Σ(weight)` over present scores only; an
//! absent score is left out of both sums.

use std::collections::BTreeMap;

use crate::analyzer::CriterionAssessment;
use crate::criteria::Criterion;

/// Weighted mean of the present scores, or `None` when nothing is scored or
/// the scored weights sum to zero.
pub fn weighted_score<I>(scores: I) -> Option<f64>
where
    I: IntoIterator<Item = (Option<u8>, u32)>,
{
    let (total, weight) = scores
        .into_iter()
        .filter_map(|(score, weight)| score.map(|s| (f64::from(s), f64::from(weight))))
        .fold((0.0, 0.0), |(total, weights), (score, weight)| (total + score * weight, weights + weight));

    if weight > 0.0 { Some(total / weight) } else { None }
}

/// Overall score for assessments paired by position with their weights.
///
/// Returns `0.0` when no assessment carries a score; use [`weighted_score`]
/// to tell that apart from a real result.
///
/// Both slices must have the same length. Debug builds panic on a mismatch;
/// release builds ignore the unpaired tail of the longer slice.
pub fn aggregate_score(assessments: &[CriterionAssessment], weights: &[u32]) -> f64 {
    debug_assert_eq!(assessments.len(), weights.len(), "one weight per assessment");
    weighted_score(assessments.iter().zip(weights).map(|(a, w)| (a.suggested_score, *w))).unwrap_or(0.0)
}

/// Overall score for an id-keyed assessment map, weighted by the matching criteria.
///
/// Criteria without an assessment are ignored.
pub fn score_assessments(assessments: &BTreeMap<String, CriterionAssessment>, criteria: &[Criterion]) -> Option<f64> {
    let mut seen = std::collections::HashSet::new();
    weighted_score(
        criteria
            .iter()
            .rev()
            .filter(|c| seen.insert(c.id.as_str()))
            .filter_map(|c| assessments.get(&c.id).map(|a| (a.suggested_score, c.weight))),
    )
}
