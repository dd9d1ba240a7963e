// 📋 Review Reducer - Operator decisions over one deduplication summary
// External state management on top of the engine's pure output; the engine
// itself never sees any of this.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::contact::ExistingRecord;
use crate::merge::MergePlan;
use crate::summary::DeduplicationSummary;

// ============================================================================
// DECISIONS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewAction {
    /// Apply the precomputed merge plan to the matched record.
    AcceptMerge,

    /// Override: insert the candidate as a brand-new record instead.
    TreatAsNew,

    /// Drop the candidate entirely.
    Dismiss,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewDecision {
    pub action: ReviewAction,
    pub decided_at: DateTime<Utc>,
}

/// Per-run operator state, keyed by position within
/// `summary.merge_candidates`. New/related contacts need no decision and
/// exact duplicates are auto-skipped, so only merge candidates are tracked.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReviewState {
    decisions: HashMap<usize, ReviewDecision>,
}

impl ReviewState {
    pub fn new() -> Self {
        ReviewState::default()
    }

    pub fn decide(&mut self, index: usize, action: ReviewAction) {
        self.decisions.insert(
            index,
            ReviewDecision {
                action,
                decided_at: Utc::now(),
            },
        );
    }

    /// "Accept all merges": one decision per pending merge candidate,
    /// without disturbing decisions already made.
    pub fn accept_all_merges(&mut self, summary: &DeduplicationSummary) {
        for index in 0..summary.merge_candidates.len() {
            self.decisions
                .entry(index)
                .or_insert_with(|| ReviewDecision {
                    action: ReviewAction::AcceptMerge,
                    decided_at: Utc::now(),
                });
        }
    }

    pub fn decision(&self, index: usize) -> Option<&ReviewDecision> {
        self.decisions.get(&index)
    }

    /// True once every merge candidate has a decision.
    pub fn is_complete(&self, summary: &DeduplicationSummary) -> bool {
        (0..summary.merge_candidates.len()).all(|i| self.decisions.contains_key(&i))
    }
}

// ============================================================================
// APPLY OPERATIONS
// ============================================================================

/// What the external apply step should persist. The engine and this
/// reducer compute; the collaborator owning the store executes.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ApplyOp {
    /// Insert a brand-new directory record (freshly minted id,
    /// contributor_count starts at 1).
    Insert { record: ExistingRecord },

    /// Apply a merge plan to an existing record, incrementing its
    /// contributor count atomically with the field changes.
    Update { id: String, plan: MergePlan },
}

/// Fold a reviewed summary into the operations to persist.
///
/// New and related contacts always insert; exact duplicates and unscorable
/// candidates never produce an operation; merge candidates follow the
/// operator's decision (undecided ones are skipped - call
/// `ReviewState::is_complete` first if that matters to the caller).
pub fn build_apply_ops(summary: &DeduplicationSummary, state: &ReviewState) -> Vec<ApplyOp> {
    let mut ops: Vec<ApplyOp> = Vec::new();

    let insert = |ops: &mut Vec<ApplyOp>, contact: &crate::contact::CandidateContact| {
        ops.push(ApplyOp::Insert {
            record: ExistingRecord::new(Uuid::new_v4().to_string(), contact.clone()),
        });
    };

    for result in summary.new_contacts.iter().chain(summary.related_contacts.iter()) {
        insert(&mut ops, &result.candidate);
    }

    for (index, result) in summary.merge_candidates.iter().enumerate() {
        match state.decision(index).map(|d| d.action) {
            Some(ReviewAction::AcceptMerge) => {
                if let Some(plan) = &result.merge_plan {
                    ops.push(ApplyOp::Update {
                        id: plan.existing_id.clone(),
                        plan: plan.clone(),
                    });
                }
            }
            Some(ReviewAction::TreatAsNew) => insert(&mut ops, &result.candidate),
            Some(ReviewAction::Dismiss) | None => {}
        }
    }

    ops
}

// ============================================================================
// TESTS
// ============================================================================
