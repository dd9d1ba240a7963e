// 📊 Summary Aggregator - One report per import run
// Orchestrates normalize → block → score → classify → plan for a batch

use log::{debug, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::classifier::{Classifier, MatchCategory, MatchResult};
use crate::contact::{CandidateContact, ExistingRecord};
use crate::merge;
use crate::normalizer::normalize;
use crate::similarity::{BlockingIndex, BlockingStrategy, StandardBlocking};

// ============================================================================
// DEDUPLICATION SUMMARY
// ============================================================================

/// The full report for one import run: every candidate lands in exactly
/// one bucket. Computed fresh per run, never persisted.
///
/// `unscorable` sits beside the four match buckets so malformed
/// extractions are visible to the operator instead of hiding in
/// `new_contacts`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeduplicationSummary {
    /// No plausible match - created as-is by the apply step.
    pub new_contacts: Vec<MatchResult>,

    /// Same organization, different individual - created as-is.
    pub related_contacts: Vec<MatchResult>,

    /// Probably the same entity; each carries a precomputed merge plan
    /// awaiting operator review.
    pub merge_candidates: Vec<MatchResult>,

    /// Same entity, safe to auto-skip.
    pub exact_duplicates: Vec<MatchResult>,

    /// No name and no organization - needs a manual fix upstream.
    pub unscorable: Vec<MatchResult>,
}

impl DeduplicationSummary {
    pub fn total(&self) -> usize {
        self.new_contacts.len()
            + self.related_contacts.len()
            + self.merge_candidates.len()
            + self.exact_duplicates.len()
            + self.unscorable.len()
    }

    /// All results across buckets, bucket by bucket.
    pub fn all_results(&self) -> impl Iterator<Item = &MatchResult> {
        self.new_contacts
            .iter()
            .chain(self.related_contacts.iter())
            .chain(self.merge_candidates.iter())
            .chain(self.exact_duplicates.iter())
            .chain(self.unscorable.iter())
    }

    pub fn summary(&self) -> String {
        format!(
            "{} candidates: {} new, {} related, {} to review, {} duplicates, {} unscorable",
            self.total(),
            self.new_contacts.len(),
            self.related_contacts.len(),
            self.merge_candidates.len(),
            self.exact_duplicates.len(),
            self.unscorable.len()
        )
    }
}

// ============================================================================
// DEDUPLICATION ENGINE
// ============================================================================

/// The only public entry point callers should use. Pure computation over a
/// candidate batch and a read-only directory snapshot; all mutation is
/// delegated to the external apply step.
pub struct DeduplicationEngine {
    pub classifier: Classifier,
    blocking: Box<dyn BlockingStrategy>,
}

impl DeduplicationEngine {
    /// Engine with the documented default thresholds and blocking keys.
    pub fn new() -> Self {
        DeduplicationEngine {
            classifier: Classifier::new(),
            blocking: Box::new(StandardBlocking),
        }
    }

    pub fn with_classifier(classifier: Classifier) -> Self {
        DeduplicationEngine {
            classifier,
            blocking: Box::new(StandardBlocking),
        }
    }

    /// Swap the blocking key derivation (phonetic keys, wider fallbacks)
    /// without touching scoring or classification.
    pub fn with_blocking(mut self, blocking: Box<dyn BlockingStrategy>) -> Self {
        self.blocking = blocking;
        self
    }

    /// Classify a whole candidate batch against the directory snapshot.
    ///
    /// Deterministic: no randomness, no wall clock, ties broken by stable
    /// record id, and bucket contents canonically ordered - identical
    /// inputs yield byte-identical summaries even if the batch arrives
    /// reordered. Candidates are independent, so classification fans out
    /// across threads with the directory shared read-only.
    pub fn aggregate(
        &self,
        candidates: &[CandidateContact],
        directory: &[ExistingRecord],
    ) -> DeduplicationSummary {
        let norms: Vec<_> = directory.par_iter().map(|r| normalize(&r.contact)).collect();
        let index = BlockingIndex::build(&norms, &*self.blocking);
        debug!(
            "aggregate: {} candidates against {} directory records",
            candidates.len(),
            directory.len()
        );

        let classified: Vec<(MatchResult, Option<usize>)> = candidates
            .par_iter()
            .map(|candidate| {
                let norm = normalize(candidate);
                let hits = index.probe(&norm, &*self.blocking);
                self.classifier
                    .classify(candidate, &norm, directory, &norms, &hits)
            })
            .collect();

        let mut summary = DeduplicationSummary {
            new_contacts: Vec::new(),
            related_contacts: Vec::new(),
            merge_candidates: Vec::new(),
            exact_duplicates: Vec::new(),
            unscorable: Vec::new(),
        };

        for (mut result, matched_idx) in classified {
            match result.category {
                MatchCategory::New => summary.new_contacts.push(result),
                MatchCategory::RelatedContact => summary.related_contacts.push(result),
                MatchCategory::MergeCandidate => {
                    if let Some(idx) = matched_idx {
                        result.merge_plan =
                            Some(merge::plan(&result.candidate, &directory[idx]));
                    }
                    summary.merge_candidates.push(result);
                }
                MatchCategory::ExactDuplicate => summary.exact_duplicates.push(result),
                MatchCategory::Unscorable => summary.unscorable.push(result),
            }
        }

        canonicalize(&mut summary);
        info!("import run classified: {}", summary.summary());
        summary
    }
}

impl Default for DeduplicationEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Order each bucket by the serialized result, so summaries are
/// byte-identical across runs and across reordering of the input batch.
fn canonicalize(summary: &mut DeduplicationSummary) {
    let sort = |bucket: &mut Vec<MatchResult>| {
        bucket.sort_by_cached_key(|r| serde_json::to_string(r).unwrap_or_default());
    };
    sort(&mut summary.new_contacts);
    sort(&mut summary.related_contacts);
    sort(&mut summary.merge_candidates);
    sort(&mut summary.exact_duplicates);
    sort(&mut summary.unscorable);
}

// ============================================================================
// TESTS
// ============================================================================
