// 🔀 Merge Planner - Field-by-field reconciliation, pure and non-mutating
// Existing record is authoritative once established; gaps are backfilled

use serde::{Deserialize, Serialize};

use crate::contact::{CandidateContact, ExistingRecord};
use crate::normalizer::fold_text;

// ============================================================================
// FIELD CHANGES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeAction {
    /// Candidate filled a gap the existing record had.
    Backfilled,

    /// Set-valued field gained terms from the candidate.
    Unioned,

    /// Numeric range extended to cover both sides.
    Widened,

    /// Conflicting scalar replaced by the candidate's value (later, more
    /// precise source).
    Replaced,
}

/// One reviewable line of the merge plan. Only fields that actually change
/// are listed - untouched existing values are not worth an operator's time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: String,
    pub action: MergeAction,
    pub detail: String,
}

impl FieldChange {
    fn new(field: &str, action: MergeAction, detail: String) -> Self {
        FieldChange {
            field: field.to_string(),
            action,
            detail,
        }
    }
}

// ============================================================================
// MERGE PLAN
// ============================================================================

/// The reconciled record plus everything the apply step needs to persist
/// it atomically. Computing a plan mutates nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergePlan {
    pub existing_id: String,

    /// The full post-merge attribute set.
    pub merged: CandidateContact,

    /// Side-effect annotation: existing count + 1, persisted together with
    /// the merge by the apply step.
    pub contributor_count: u32,

    /// Field-level changes for the human review surface.
    pub changes: Vec<FieldChange>,
}

impl MergePlan {
    pub fn is_noop(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "merge into {}: {} field change(s), contributor #{}",
            self.existing_id,
            self.changes.len(),
            self.contributor_count
        )
    }
}

// ============================================================================
// PLAN
// ============================================================================

/// Compute the field-by-field reconciliation of a candidate into its
/// matched existing record.
///
/// Policy per field class:
/// - scalars and contact channels: existing wins, candidate backfills gaps
/// - set-valued fields: normalized-dedup union, casing kept from whichever
///   side introduced a term first (existing side first)
/// - numeric ranges: widened to cover both sides, never averaged; a
///   conflicting fund size takes the candidate's value
pub fn plan(candidate: &CandidateContact, existing: &ExistingRecord) -> MergePlan {
    let mut changes: Vec<FieldChange> = Vec::new();
    let mut merged = existing.contact.clone();

    merge_scalar("name", &mut merged.name, &candidate.name, &mut changes);
    merge_scalar(
        "organization",
        &mut merged.organization,
        &candidate.organization,
        &mut changes,
    );
    merge_scalar("city", &mut merged.city, &candidate.city, &mut changes);
    merge_scalar("country", &mut merged.country, &candidate.country, &mut changes);
    merge_scalar("email", &mut merged.email, &candidate.email, &mut changes);
    merge_scalar(
        "profile_url",
        &mut merged.profile_url,
        &candidate.profile_url,
        &mut changes,
    );
    merge_number("latitude", &mut merged.latitude, candidate.latitude, &mut changes);
    merge_number("longitude", &mut merged.longitude, candidate.longitude, &mut changes);

    merge_terms("stages", &mut merged.stages, &candidate.stages, &mut changes);
    merge_terms("sectors", &mut merged.sectors, &candidate.sectors, &mut changes);
    merge_terms(
        "thesis_keywords",
        &mut merged.thesis_keywords,
        &candidate.thesis_keywords,
        &mut changes,
    );
    merge_terms(
        "notable_investments",
        &mut merged.notable_investments,
        &candidate.notable_investments,
        &mut changes,
    );

    widen_ticket_range(&mut merged, candidate, &mut changes);
    merge_fund_size(&mut merged, candidate, &mut changes);

    MergePlan {
        existing_id: existing.id.clone(),
        merged,
        contributor_count: existing.contributor_count + 1,
        changes,
    }
}

/// Existing wins; candidate backfills an absent value.
fn merge_scalar(
    field: &str,
    existing: &mut Option<String>,
    candidate: &Option<String>,
    changes: &mut Vec<FieldChange>,
) {
    let existing_absent = fold_text(existing.as_deref()).is_none();
    if !existing_absent {
        return;
    }
    if let Some(value) = candidate.as_deref().filter(|v| !v.trim().is_empty()) {
        *existing = Some(value.to_string());
        changes.push(FieldChange::new(
            field,
            MergeAction::Backfilled,
            format!("set to \"{}\"", value.trim()),
        ));
    }
}

fn merge_number(
    field: &str,
    existing: &mut Option<f64>,
    candidate: Option<f64>,
    changes: &mut Vec<FieldChange>,
) {
    if existing.is_none() {
        if let Some(value) = candidate {
            *existing = Some(value);
            changes.push(FieldChange::new(
                field,
                MergeAction::Backfilled,
                format!("set to {value}"),
            ));
        }
    }
}

/// Union, deduplicated on the normalized form, existing-side casing first.
fn merge_terms(
    field: &str,
    existing: &mut Vec<String>,
    candidate: &[String],
    changes: &mut Vec<FieldChange>,
) {
    let mut seen: Vec<String> = existing
        .iter()
        .filter_map(|t| fold_text(Some(t.as_str())))
        .collect();
    let mut added: Vec<String> = Vec::new();

    for term in candidate {
        let Some(key) = fold_text(Some(term.as_str())) else {
            continue;
        };
        if seen.contains(&key) {
            continue;
        }
        seen.push(key);
        existing.push(term.clone());
        added.push(term.clone());
    }

    if !added.is_empty() {
        changes.push(FieldChange::new(
            field,
            MergeAction::Unioned,
            format!("added: {}", added.join(", ")),
        ));
    }
}

/// Ticket range widens: min of mins, max of maxes. Conflicting numbers
/// usually mean two sources observed different deals - keep the envelope.
fn widen_ticket_range(
    merged: &mut CandidateContact,
    candidate: &CandidateContact,
    changes: &mut Vec<FieldChange>,
) {
    match (merged.ticket_min, candidate.ticket_min) {
        (Some(a), Some(b)) if b < a => {
            merged.ticket_min = Some(b);
            changes.push(FieldChange::new(
                "ticket_min",
                MergeAction::Widened,
                format!("lowered from {a} to {b}"),
            ));
        }
        (None, Some(b)) => {
            merged.ticket_min = Some(b);
            changes.push(FieldChange::new(
                "ticket_min",
                MergeAction::Backfilled,
                format!("set to {b}"),
            ));
        }
        _ => {}
    }

    match (merged.ticket_max, candidate.ticket_max) {
        (Some(a), Some(b)) if b > a => {
            merged.ticket_max = Some(b);
            changes.push(FieldChange::new(
                "ticket_max",
                MergeAction::Widened,
                format!("raised from {a} to {b}"),
            ));
        }
        (None, Some(b)) => {
            merged.ticket_max = Some(b);
            changes.push(FieldChange::new(
                "ticket_max",
                MergeAction::Backfilled,
                format!("set to {b}"),
            ));
        }
        _ => {}
    }
}

/// A conflicting fund size takes the candidate's value: the freshly parsed
/// source is the later, more precise one. Never averaged.
fn merge_fund_size(
    merged: &mut CandidateContact,
    candidate: &CandidateContact,
    changes: &mut Vec<FieldChange>,
) {
    match (merged.fund_size, candidate.fund_size) {
        (None, Some(b)) => {
            merged.fund_size = Some(b);
            changes.push(FieldChange::new(
                "fund_size",
                MergeAction::Backfilled,
                format!("set to {b}"),
            ));
        }
        (Some(a), Some(b)) if (a - b).abs() > f64::EPSILON => {
            merged.fund_size = Some(b);
            changes.push(FieldChange::new(
                "fund_size",
                MergeAction::Replaced,
                format!("updated from {a} to {b}"),
            ));
        }
        _ => {}
    }
}

// ============================================================================
// TESTS
// ============================================================================
