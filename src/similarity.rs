// 📐 Similarity Scorer - Weighted pairwise signals + blocking index
// Compares a candidate against existing records, pruned to shared-key buckets

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use strsim::jaro_winkler;

use crate::normalizer::NormalizedRecord;

/// Two name tokens count as overlapping when identical or nearly so
/// ("goldman" / "goldmann"). Tightened relative to whole-string fuzzy
/// matching since single tokens are short.
const TOKEN_FUZZY_FLOOR: f64 = 0.92;

/// Similarity floor applied when one full normalized name strictly
/// contains the other ("jane doe" inside "jane doe cfa").
const SUBSTRING_NAME_BOOST: f64 = 0.9;

// ============================================================================
// SIGNAL SCORES
// ============================================================================

/// Independent 0–1 signals for one candidate/existing pair. The classifier
/// combines them; this module never decides anything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalScores {
    /// 1.0 when normalized emails or profile tokens match exactly, else 0.
    pub exact_identity: f64,

    /// Token-set overlap of names, boosted for strict-substring names.
    pub name: f64,

    /// Token-set overlap of organization stems; 0 if either side lacks one.
    pub organization: f64,

    /// 1.0 city+country match, 0.5 country only, 0.0 mismatch.
    /// `None` when either side has no location at all - neutral, never a
    /// penalty.
    pub geography: Option<f64>,

    /// Jaccard overlap across the union of stage and sector terms. A minor
    /// signal by weight; never sufficient alone.
    pub investment_overlap: f64,
}

impl SignalScores {
    pub fn has_any_signal(&self) -> bool {
        self.exact_identity > 0.0
            || self.name > 0.0
            || self.organization > 0.0
            || self.geography.unwrap_or(0.0) > 0.0
            || self.investment_overlap > 0.0
    }
}

// ============================================================================
// PAIRWISE SCORING
// ============================================================================

/// Score one candidate against one existing record. Pure; both sides are
/// pre-normalized comparison forms.
pub fn score(candidate: &NormalizedRecord, existing: &NormalizedRecord) -> SignalScores {
    SignalScores {
        exact_identity: exact_identity(candidate, existing),
        name: name_similarity(candidate, existing),
        organization: organization_similarity(candidate, existing),
        geography: geography_signal(candidate, existing),
        investment_overlap: fuzzyless_jaccard(
            &candidate.investment_terms(),
            &existing.investment_terms(),
        ),
    }
}

fn exact_identity(a: &NormalizedRecord, b: &NormalizedRecord) -> f64 {
    let email_match = matches!((&a.email, &b.email), (Some(x), Some(y)) if x == y);
    let profile_match =
        matches!((&a.profile_token, &b.profile_token), (Some(x), Some(y)) if x == y);
    if email_match || profile_match {
        1.0
    } else {
        0.0
    }
}

fn name_similarity(a: &NormalizedRecord, b: &NormalizedRecord) -> f64 {
    let (Some(name_a), Some(name_b)) = (&a.name, &b.name) else {
        return 0.0;
    };

    let overlap = fuzzy_jaccard(&a.name_tokens, &b.name_tokens);

    // "Jane Doe" vs "Jane Doe, CFA": one name strictly contains the other.
    if name_a != name_b && (name_a.contains(name_b.as_str()) || name_b.contains(name_a.as_str())) {
        return overlap.max(SUBSTRING_NAME_BOOST);
    }

    overlap
}

fn organization_similarity(a: &NormalizedRecord, b: &NormalizedRecord) -> f64 {
    if a.org_stem.is_none() || b.org_stem.is_none() {
        return 0.0;
    }
    fuzzy_jaccard(&a.org_stem_tokens, &b.org_stem_tokens)
}

fn geography_signal(a: &NormalizedRecord, b: &NormalizedRecord) -> Option<f64> {
    if !a.has_location() || !b.has_location() {
        return None;
    }

    let city_match = matches!((&a.city, &b.city), (Some(x), Some(y)) if x == y);
    let country_match = matches!((&a.country, &b.country), (Some(x), Some(y)) if x == y);

    if city_match && country_match {
        Some(1.0)
    } else if country_match {
        Some(0.5)
    } else {
        Some(0.0)
    }
}

/// Jaccard over token sets where tokens also overlap when nearly identical
/// (Jaro-Winkler). The fuzzy step only ever raises the overlap count.
fn fuzzy_jaccard(a: &[String], b: &[String]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let mut used = vec![false; b.len()];
    let mut overlap = 0usize;

    for token_a in a {
        let hit = b.iter().enumerate().find(|(i, token_b)| {
            !used[*i]
                && (token_a == *token_b || jaro_winkler(token_a, token_b) >= TOKEN_FUZZY_FLOOR)
        });
        if let Some((i, _)) = hit {
            used[i] = true;
            overlap += 1;
        }
    }

    let union = a.len() + b.len() - overlap;
    overlap as f64 / union as f64
}

/// Plain Jaccard for already-exact term sets (stages/sectors are controlled
/// vocabulary, no fuzzy step).
fn fuzzyless_jaccard(a: &[&str], b: &[&str]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let overlap = a.iter().filter(|t| b.contains(t)).count();
    let union = a.len() + b.len() - overlap;
    overlap as f64 / union as f64
}

// ============================================================================
// BLOCKING
// ============================================================================

/// Derives cheap grouping keys so pairwise scoring runs only within
/// matching buckets instead of the full cross-product.
///
/// Pluggable: the default keys are a practical approximation of true
/// record linkage (no phonetic matching, no cross-field transposition) and
/// can be swapped without touching the scorer.
pub trait BlockingStrategy: Send + Sync {
    fn keys(&self, record: &NormalizedRecord) -> Vec<String>;
}

/// Default keys: organization stem, email domain, first name token.
/// Guarantee: a candidate and an existing record sharing any one of the
/// three is always compared.
#[derive(Debug, Clone, Default)]
pub struct StandardBlocking;

impl BlockingStrategy for StandardBlocking {
    fn keys(&self, record: &NormalizedRecord) -> Vec<String> {
        let mut keys = Vec::with_capacity(3);
        if let Some(stem) = &record.org_stem {
            keys.push(format!("org:{stem}"));
        }
        if let Some(domain) = &record.email_domain {
            keys.push(format!("dom:{domain}"));
        }
        if let Some(token) = record.first_name_token() {
            keys.push(format!("name:{token}"));
        }
        keys
    }
}

/// Inverted index from blocking key to existing-record positions.
pub struct BlockingIndex {
    postings: HashMap<String, Vec<usize>>,
}

impl BlockingIndex {
    pub fn build(records: &[NormalizedRecord], strategy: &dyn BlockingStrategy) -> Self {
        let mut postings: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, record) in records.iter().enumerate() {
            for key in strategy.keys(record) {
                postings.entry(key).or_default().push(idx);
            }
        }
        BlockingIndex { postings }
    }

    /// Existing-record positions sharing at least one key with the
    /// candidate, sorted ascending for deterministic iteration.
    pub fn probe(
        &self,
        candidate: &NormalizedRecord,
        strategy: &dyn BlockingStrategy,
    ) -> Vec<usize> {
        let mut hits: Vec<usize> = strategy
            .keys(candidate)
            .iter()
            .filter_map(|key| self.postings.get(key))
            .flatten()
            .copied()
            .collect();
        hits.sort_unstable();
        hits.dedup();
        hits
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contact::{CandidateContact, EntityKind};
    use crate::normalizer::normalize;

    fn norm(
        name: Option<&str>,
        org: Option<&str>,
        email: Option<&str>,
        city: Option<&str>,
        country: Option<&str>,
    ) -> NormalizedRecord {
        let mut c = CandidateContact::empty(EntityKind::Investor);
        c.name = name.map(str::to_string);
        c.organization = org.map(str::to_string);
        c.email = email.map(str::to_string);
        c.city = city.map(str::to_string);
        c.country = country.map(str::to_string);
        normalize(&c)
    }

    #[test]
    fn exact_identity_on_email() {
        let a = norm(Some("Jane Doe"), None, Some("jane@acme.vc"), None, None);
        let b = norm(Some("J. Doe"), None, Some("JANE@ACME.VC"), None, None);
        assert_eq!(score(&a, &b).exact_identity, 1.0);
    }

    #[test]
    fn exact_identity_on_profile_token() {
        let mut ca = CandidateContact::empty(EntityKind::Investor);
        ca.name = Some("Jane Doe".into());
        ca.profile_url = Some("https://www.linkedin.com/in/janedoe/".into());
        let mut cb = ca.clone();
        cb.profile_url = Some("linkedin.com/in/janedoe".into());

        let s = score(&normalize(&ca), &normalize(&cb));
        assert_eq!(s.exact_identity, 1.0);
    }

    #[test]
    fn absent_emails_never_match() {
        let a = norm(Some("Jane Doe"), None, None, None, None);
        let b = norm(Some("John Smith"), None, None, None, None);
        assert_eq!(score(&a, &b).exact_identity, 0.0);
    }

    #[test]
    fn substring_name_boost() {
        let a = norm(Some("Jane Doe"), None, None, None, None);
        let b = norm(Some("Jane Doe, CFA"), None, None, None, None);
        assert!(score(&a, &b).name >= SUBSTRING_NAME_BOOST);
    }

    #[test]
    fn name_tokens_fuzzy_overlap() {
        let a = norm(Some("Anna Goldman"), None, None, None, None);
        let b = norm(Some("Anna Goldmann"), None, None, None, None);
        assert_eq!(score(&a, &b).name, 1.0);
    }

    #[test]
    fn organization_zero_when_either_absent() {
        let a = norm(Some("Jane Doe"), Some("Acme Ventures"), None, None, None);
        let b = norm(Some("Jane Doe"), None, None, None, None);
        assert_eq!(score(&a, &b).organization, 0.0);
    }

    #[test]
    fn organization_stems_ignore_legal_suffix() {
        let a = norm(None, Some("Acme Ventures"), None, None, None);
        let b = norm(None, Some("Acme Ventures LLC"), None, None, None);
        assert_eq!(score(&a, &b).organization, 1.0);
    }

    #[test]
    fn geography_tiers() {
        let berlin = norm(None, Some("Acme"), None, Some("Berlin"), Some("Germany"));
        let berlin2 = norm(None, Some("Acme"), None, Some("Berlin"), Some("Germany"));
        let munich = norm(None, Some("Acme"), None, Some("Munich"), Some("Germany"));
        let paris = norm(None, Some("Acme"), None, Some("Paris"), Some("France"));
        let nowhere = norm(None, Some("Acme"), None, None, None);

        assert_eq!(score(&berlin, &berlin2).geography, Some(1.0));
        assert_eq!(score(&berlin, &munich).geography, Some(0.5));
        assert_eq!(score(&berlin, &paris).geography, Some(0.0));
        assert_eq!(score(&berlin, &nowhere).geography, None, "missing side is neutral");
    }

    #[test]
    fn investment_overlap_partial() {
        let mut ca = CandidateContact::empty(EntityKind::Fund);
        ca.organization = Some("Acme".into());
        ca.stages = vec!["seed".into()];
        let mut cb = ca.clone();
        cb.stages = vec!["seed".into(), "series a".into()];

        let s = score(&normalize(&ca), &normalize(&cb));
        assert!((s.investment_overlap - 0.5).abs() < 1e-9);
    }

    #[test]
    fn blocking_covers_org_domain_and_name_keys() {
        let existing = vec![
            norm(Some("Jane Doe"), Some("Acme Ventures"), None, None, None),
            norm(Some("Bob Ray"), None, Some("bob@nova.fund"), None, None),
            norm(Some("Carol King"), Some("Zenith Capital"), None, None, None),
        ];
        let strategy = StandardBlocking;
        let index = BlockingIndex::build(&existing, &strategy);

        // Shares only the org stem.
        let by_org = norm(None, Some("Acme Capital"), None, None, None);
        assert_eq!(index.probe(&by_org, &strategy), vec![0]);

        // Shares only the email domain.
        let by_domain = norm(Some("Robert Ray"), None, Some("robert@nova.fund"), None, None);
        assert!(index.probe(&by_domain, &strategy).contains(&1));

        // Shares only the first name token.
        let by_name = norm(Some("Carol Anne King"), None, None, None, None);
        assert!(index.probe(&by_name, &strategy).contains(&2));

        // Shares nothing - empty probe.
        let stranger = norm(Some("Xavier Quinn"), Some("Orbit Labs"), None, None, None);
        assert!(index.probe(&stranger, &strategy).is_empty());
    }

    #[test]
    fn probe_is_sorted_and_deduped() {
        let existing = vec![norm(
            Some("Jane Doe"),
            Some("Acme Ventures"),
            Some("jane@acme.vc"),
            None,
            None,
        )];
        let strategy = StandardBlocking;
        let index = BlockingIndex::build(&existing, &strategy);

        // Candidate shares org stem AND domain AND name token with record 0.
        let c = norm(Some("Jane Roe"), Some("Acme Fund"), Some("x@acme.vc"), None, None);
        assert_eq!(index.probe(&c, &strategy), vec![0]);
    }
}
