// 🎯 Classifier - Decision thresholds over similarity signals
// Buckets each candidate: exact duplicate / merge candidate / related / new
//
// Thresholds and weights are the contract surface of the engine. They are
// explicit tunable constants, locked down by the property tests in
// `summary` - change them and the tests will tell you what moved.

use serde::{Deserialize, Serialize};

use crate::contact::{CandidateContact, ExistingRecord};
use crate::merge::MergePlan;
use crate::normalizer::NormalizedRecord;
use crate::similarity::{score, SignalScores};

// ============================================================================
// THRESHOLD CONSTANTS
// ============================================================================

/// Below this confidence no existing record is considered a match at all.
pub const MIN_MATCH_FLOOR: f64 = 30.0;

/// At or above this confidence (and without exact identity) a pair becomes
/// a merge candidate for human review.
pub const MERGE_FLOOR: f64 = 55.0;

/// Organization similarity at or above this counts as "organization
/// matches or is highly similar".
pub const ORG_MATCH_FLOOR: f64 = 0.75;

/// Name similarity below this (with no email/profile match) means the
/// person identity differs.
pub const NAME_MATCH_FLOOR: f64 = 0.60;

/// Signal weights. Organization and name carry the match; geography and
/// investment profile are tie-breaking modifiers - their combined 20
/// points sit below `MIN_MATCH_FLOOR`, so they can never create a match
/// on their own.
pub const ORG_WEIGHT: f64 = 45.0;
pub const NAME_WEIGHT: f64 = 35.0;
pub const GEO_WEIGHT: f64 = 10.0;
pub const PROFILE_WEIGHT: f64 = 10.0;

// ============================================================================
// MATCH CATEGORY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchCategory {
    /// No plausible match in the directory - create as a new record.
    New,

    /// Same organization, different individual. Always created as a new
    /// record, never merged.
    RelatedContact,

    /// Probably the same entity; human review required before merging.
    MergeCandidate,

    /// Same underlying entity, safe to auto-skip.
    ExactDuplicate,

    /// No name and no organization - cannot be scored. Surfaced for manual
    /// fixing, never silently bucketed as new.
    Unscorable,
}

impl std::fmt::Display for MatchCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchCategory::New => write!(f, "new"),
            MatchCategory::RelatedContact => write!(f, "related_contact"),
            MatchCategory::MergeCandidate => write!(f, "merge_candidate"),
            MatchCategory::ExactDuplicate => write!(f, "exact_duplicate"),
            MatchCategory::Unscorable => write!(f, "unscorable"),
        }
    }
}

// ============================================================================
// MATCH RESULT
// ============================================================================

/// One classified candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResult {
    pub candidate: CandidateContact,

    /// Best-matching existing record, when one cleared the floor.
    pub matched_id: Option<String>,

    pub category: MatchCategory,

    /// 0–100, present whenever `matched_id` is.
    pub confidence: Option<u8>,

    /// Human-readable signals that fired, for the review surface.
    pub reasons: Vec<String>,

    /// Precomputed merge plan; only merge candidates carry one.
    pub merge_plan: Option<MergePlan>,
}

// ============================================================================
// CLASSIFIER
// ============================================================================

/// Applies the decision policy to one candidate at a time. Thresholds are
/// public so operators can tune them per deployment; defaults are the
/// documented contract values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classifier {
    pub min_match_floor: f64,
    pub merge_floor: f64,
    pub org_match_floor: f64,
    pub name_match_floor: f64,
    pub org_weight: f64,
    pub name_weight: f64,
    pub geo_weight: f64,
    pub profile_weight: f64,
}

impl Classifier {
    pub fn new() -> Self {
        Classifier {
            min_match_floor: MIN_MATCH_FLOOR,
            merge_floor: MERGE_FLOOR,
            org_match_floor: ORG_MATCH_FLOOR,
            name_match_floor: NAME_MATCH_FLOOR,
            org_weight: ORG_WEIGHT,
            name_weight: NAME_WEIGHT,
            geo_weight: GEO_WEIGHT,
            profile_weight: PROFILE_WEIGHT,
        }
    }

    pub fn with_floors(min_match_floor: f64, merge_floor: f64) -> Self {
        Classifier {
            min_match_floor,
            merge_floor,
            ..Classifier::new()
        }
    }

    /// Combine independent signals into one 0–100 confidence value.
    ///
    /// Exact identity pins confidence at 100. Otherwise a weighted sum
    /// emphasizing organization and name; a missing-location geography
    /// signal is neutral, not a penalty. Monotone in every signal.
    pub fn confidence(&self, signals: &SignalScores) -> f64 {
        if signals.exact_identity > 0.0 {
            return 100.0;
        }
        let weighted = signals.organization * self.org_weight
            + signals.name * self.name_weight
            + signals.geography.unwrap_or(0.0) * self.geo_weight
            + signals.investment_overlap * self.profile_weight;
        weighted.min(100.0)
    }

    /// Classify one candidate against the directory records selected by
    /// blocking (`hits` are positions into `directory`/`norms`).
    ///
    /// Returns the result plus the matched position so the aggregator can
    /// compute a merge plan without re-searching.
    pub fn classify(
        &self,
        candidate: &CandidateContact,
        candidate_norm: &NormalizedRecord,
        directory: &[ExistingRecord],
        norms: &[NormalizedRecord],
        hits: &[usize],
    ) -> (MatchResult, Option<usize>) {
        if !candidate.is_scorable() {
            let result = MatchResult {
                candidate: candidate.clone(),
                matched_id: None,
                category: MatchCategory::Unscorable,
                confidence: None,
                reasons: vec![
                    "no name and no organization - fix the extraction and re-import".to_string(),
                ],
                merge_plan: None,
            };
            return (result, None);
        }

        let best = self.select_best(candidate_norm, directory, norms, hits);

        // 1. Nothing cleared the minimum floor → new.
        let Some((idx, signals, confidence)) = best else {
            return (self.new_contact(candidate), None);
        };
        if confidence < self.min_match_floor {
            return (self.new_contact(candidate), None);
        }

        let existing = &directory[idx];
        let existing_norm = &norms[idx];

        let org_matches = signals.organization >= self.org_match_floor;
        let both_lack_org =
            candidate_norm.org_stem.is_none() && existing_norm.org_stem.is_none();

        // 2. Exact identity and the organizations agree (or both absent)
        //    → same entity, safe to auto-skip.
        if signals.exact_identity > 0.0 && (org_matches || both_lack_org) {
            let result = MatchResult {
                candidate: candidate.clone(),
                matched_id: Some(existing.id.clone()),
                category: MatchCategory::ExactDuplicate,
                confidence: Some(100),
                reasons: self.reasons(&signals, candidate_norm, existing_norm),
                merge_plan: None,
            };
            return (result, Some(idx));
        }

        // 3. Same firm, different individual. Requires both names present
        //    and genuinely different - an org-only candidate against an
        //    org-only record is a merge question, not a colleague.
        let person_differs = signals.exact_identity == 0.0
            && candidate_norm.name.is_some()
            && existing_norm.name.is_some()
            && signals.name < self.name_match_floor;
        if org_matches && person_differs {
            let mut reasons = self.reasons(&signals, candidate_norm, existing_norm);
            reasons.push("different person at the same organization".to_string());
            let result = MatchResult {
                candidate: candidate.clone(),
                matched_id: Some(existing.id.clone()),
                category: MatchCategory::RelatedContact,
                confidence: Some(round_confidence(confidence)),
                reasons,
                merge_plan: None,
            };
            return (result, Some(idx));
        }

        // 4. Strong enough for review, not strong enough to auto-skip.
        if confidence >= self.merge_floor {
            let result = MatchResult {
                candidate: candidate.clone(),
                matched_id: Some(existing.id.clone()),
                category: MatchCategory::MergeCandidate,
                confidence: Some(round_confidence(confidence)),
                reasons: self.reasons(&signals, candidate_norm, existing_norm),
                merge_plan: None, // filled by the aggregator
            };
            return (result, Some(idx));
        }

        // 5. Ambiguous partial match - conservatively new, never a silent
        //    duplicate.
        (self.new_contact(candidate), None)
    }

    /// Highest-confidence existing record among the blocked hits. Ties
    /// break by ascending record id so runs are deterministic regardless
    /// of directory snapshot order.
    fn select_best(
        &self,
        candidate_norm: &NormalizedRecord,
        directory: &[ExistingRecord],
        norms: &[NormalizedRecord],
        hits: &[usize],
    ) -> Option<(usize, SignalScores, f64)> {
        let mut best: Option<(usize, SignalScores, f64)> = None;

        for &idx in hits {
            let signals = score(candidate_norm, &norms[idx]);
            let confidence = self.confidence(&signals);

            let better = match &best {
                None => true,
                Some((best_idx, _, best_conf)) => {
                    confidence > *best_conf
                        || (confidence == *best_conf
                            && directory[idx].id < directory[*best_idx].id)
                }
            };
            if better {
                best = Some((idx, signals, confidence));
            }
        }

        best
    }

    fn new_contact(&self, candidate: &CandidateContact) -> MatchResult {
        MatchResult {
            candidate: candidate.clone(),
            matched_id: None,
            category: MatchCategory::New,
            confidence: None,
            reasons: Vec::new(),
            merge_plan: None,
        }
    }

    /// Human-readable descriptions of the signals that fired.
    fn reasons(
        &self,
        signals: &SignalScores,
        candidate: &NormalizedRecord,
        existing: &NormalizedRecord,
    ) -> Vec<String> {
        let mut reasons = Vec::new();

        if signals.exact_identity > 0.0 {
            if matches!((&candidate.email, &existing.email), (Some(a), Some(b)) if a == b) {
                reasons.push("email address matches".to_string());
            }
            if matches!(
                (&candidate.profile_token, &existing.profile_token),
                (Some(a), Some(b)) if a == b
            ) {
                reasons.push("profile URL matches".to_string());
            }
        }

        if signals.name >= 1.0 {
            reasons.push("name matches".to_string());
        } else if signals.name >= self.name_match_floor {
            reasons.push("names are similar".to_string());
        }

        if signals.organization >= 1.0 {
            reasons.push("organization name matches".to_string());
        } else if signals.organization >= self.org_match_floor {
            reasons.push("organization names are similar".to_string());
        } else if signals.organization > 0.0 {
            reasons.push("organization names partially overlap".to_string());
        }

        match signals.geography {
            Some(g) if g >= 1.0 => reasons.push("city and country match".to_string()),
            Some(g) if g >= 0.5 => reasons.push("country matches".to_string()),
            _ => {}
        }

        if signals.investment_overlap > 0.0 {
            reasons.push(format!(
                "{:.0}% investment profile overlap",
                signals.investment_overlap * 100.0
            ));
        }

        reasons
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new()
    }
}

fn round_confidence(confidence: f64) -> u8 {
    confidence.round().clamp(0.0, 100.0) as u8
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contact::EntityKind;
    use crate::normalizer::normalize;

    fn contact(name: Option<&str>, org: Option<&str>, email: Option<&str>) -> CandidateContact {
        let mut c = CandidateContact::empty(EntityKind::Investor);
        c.name = name.map(str::to_string);
        c.organization = org.map(str::to_string);
        c.email = email.map(str::to_string);
        c
    }

    fn run(
        candidate: &CandidateContact,
        directory: &[ExistingRecord],
    ) -> (MatchResult, Option<usize>) {
        let norms: Vec<_> = directory.iter().map(|r| normalize(&r.contact)).collect();
        let hits: Vec<usize> = (0..directory.len()).collect();
        let classifier = Classifier::new();
        classifier.classify(candidate, &normalize(candidate), directory, &norms, &hits)
    }

    #[test]
    fn email_match_with_matching_org_is_exact_duplicate() {
        let candidate = contact(Some("Jane Doe"), Some("Acme Ventures"), Some("jane@acme.vc"));
        let existing = ExistingRecord::new(
            "rec_1",
            contact(Some("Jane Doe"), Some("Acme Ventures LLC"), Some("jane@acme.vc")),
        );

        let (result, idx) = run(&candidate, &[existing]);
        assert_eq!(result.category, MatchCategory::ExactDuplicate);
        assert_eq!(result.confidence, Some(100));
        assert_eq!(result.matched_id.as_deref(), Some("rec_1"));
        assert_eq!(idx, Some(0));
        assert!(result.reasons.iter().any(|r| r.contains("email")));
    }

    #[test]
    fn email_match_with_conflicting_org_needs_review() {
        // Same email but a different firm: never "new", but not safe to
        // auto-skip either.
        let candidate = contact(Some("Jane Doe"), Some("Orbit Labs"), Some("jane@gmail.com"));
        let existing = ExistingRecord::new(
            "rec_1",
            contact(Some("Jane Doe"), Some("Acme Ventures"), Some("jane@gmail.com")),
        );

        let (result, _) = run(&candidate, &[existing]);
        assert_eq!(result.category, MatchCategory::MergeCandidate);
        assert_eq!(result.confidence, Some(100));
    }

    #[test]
    fn same_org_different_person_is_related() {
        let candidate = contact(Some("John Smith"), Some("Acme Ventures"), None);
        let existing = ExistingRecord::new(
            "rec_1",
            contact(Some("Jane Doe"), Some("Acme Ventures"), None),
        );

        let (result, _) = run(&candidate, &[existing]);
        assert_eq!(result.category, MatchCategory::RelatedContact);
        assert!(result
            .reasons
            .iter()
            .any(|r| r.contains("different person")));
    }

    #[test]
    fn org_only_pair_is_merge_question_not_related() {
        // Fund-level records with no person name: close orgs + matching
        // geography land in review, not in "related".
        let mut candidate = contact(None, Some("Acme Capital"), None);
        candidate.city = Some("Berlin".into());
        candidate.country = Some("Germany".into());
        candidate.stages = vec!["seed".into()];

        let mut existing_contact = contact(None, Some("Acme Ventures"), None);
        existing_contact.city = Some("Berlin".into());
        existing_contact.country = Some("Germany".into());
        existing_contact.stages = vec!["seed".into(), "series a".into()];
        let existing = ExistingRecord::new("rec_1", existing_contact);

        let (result, _) = run(&candidate, &[existing]);
        assert_eq!(result.category, MatchCategory::MergeCandidate);
        let confidence = result.confidence.unwrap();
        assert!(
            (55..85).contains(&(confidence as i32)),
            "expected mid-range confidence, got {confidence}"
        );
        assert!(result.reasons.iter().any(|r| r.contains("organization")));
        assert!(result.reasons.iter().any(|r| r.contains("city and country")));
    }

    #[test]
    fn unscorable_candidate_is_surfaced_distinctly() {
        let mut candidate = contact(None, None, Some("someone@acme.vc"));
        candidate.city = Some("Berlin".into());

        let (result, idx) = run(&candidate, &[]);
        assert_eq!(result.category, MatchCategory::Unscorable);
        assert!(idx.is_none());
        assert!(!result.reasons.is_empty());
    }

    #[test]
    fn weak_partial_match_defaults_to_new() {
        // Only a modest name-token overlap: below the merge floor.
        let candidate = contact(Some("Jane Miller"), None, None);
        let existing = ExistingRecord::new(
            "rec_1",
            contact(Some("Jane Brooks"), Some("Acme Ventures"), None),
        );

        let (result, idx) = run(&candidate, &[existing]);
        assert_eq!(result.category, MatchCategory::New);
        assert!(result.matched_id.is_none());
        assert!(idx.is_none());
    }

    #[test]
    fn ties_break_by_ascending_record_id() {
        let candidate = contact(Some("Jane Doe"), Some("Acme Ventures"), None);
        let twin = contact(Some("Jane Doe"), Some("Acme Ventures"), None);
        let directory = vec![
            ExistingRecord::new("rec_b", twin.clone()),
            ExistingRecord::new("rec_a", twin),
        ];

        let (result, idx) = run(&candidate, &directory);
        assert_eq!(result.matched_id.as_deref(), Some("rec_a"));
        assert_eq!(idx, Some(1));
    }

    #[test]
    fn confidence_is_monotone_in_added_signals() {
        let classifier = Classifier::new();

        let base = SignalScores {
            exact_identity: 0.0,
            name: 0.7,
            organization: 0.8,
            geography: None,
            investment_overlap: 0.0,
        };
        let with_geo = SignalScores {
            geography: Some(1.0),
            ..base.clone()
        };
        let with_geo_and_profile = SignalScores {
            investment_overlap: 0.6,
            ..with_geo.clone()
        };

        let c0 = classifier.confidence(&base);
        let c1 = classifier.confidence(&with_geo);
        let c2 = classifier.confidence(&with_geo_and_profile);
        assert!(c1 >= c0);
        assert!(c2 >= c1);
    }

    #[test]
    fn modifiers_alone_never_reach_the_match_floor() {
        let classifier = Classifier::new();
        let modifiers_only = SignalScores {
            exact_identity: 0.0,
            name: 0.0,
            organization: 0.0,
            geography: Some(1.0),
            investment_overlap: 1.0,
        };
        assert!(classifier.confidence(&modifiers_only) < classifier.min_match_floor);
    }
}
