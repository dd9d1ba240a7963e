// 🧹 Normalizer - Canonical comparison forms for contact fields
// Pure, infallible: missing fields stay None, absence never matches absence

use serde::{Deserialize, Serialize};

use crate::contact::CandidateContact;

/// Legal / generic suffixes stripped from organization names before
/// comparison. "Acme Ventures LLC" and "Acme Ventures" both stem to "acme".
/// The original spelling is preserved on the record for display.
const ORG_LEGAL_SUFFIXES: &[&str] = &[
    "ventures", "venture", "capital", "partners", "partner", "llc", "llp",
    "lp", "inc", "ltd", "gmbh", "fund", "funds", "management", "advisors",
    "advisers", "group", "holdings", "co", "company", "vc",
];

// ============================================================================
// NORMALIZED RECORD
// ============================================================================

/// Comparison form of one contact. Every field is lower-cased, trimmed and
/// whitespace-collapsed; `None` marks absence (a field that trims to empty
/// is absent too).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub name: Option<String>,
    pub name_tokens: Vec<String>,

    /// Full lower-cased organization name.
    pub org: Option<String>,
    /// Organization with legal suffixes stripped ("acme ventures llc" → "acme").
    pub org_stem: Option<String>,
    pub org_stem_tokens: Vec<String>,

    /// Whole email lowered for comparison (RFC allows a case-sensitive
    /// local part, but directory matching compares case-insensitively).
    pub email: Option<String>,
    pub email_domain: Option<String>,

    /// Canonical profile-path token, protocol and host variants stripped.
    pub profile_token: Option<String>,

    pub city: Option<String>,
    pub country: Option<String>,

    pub stages: Vec<String>,
    pub sectors: Vec<String>,
}

impl NormalizedRecord {
    /// First token of the normalized name, used as a blocking key.
    pub fn first_name_token(&self) -> Option<&str> {
        self.name_tokens.first().map(|s| s.as_str())
    }

    /// True if the record carries any comparable location at all.
    pub fn has_location(&self) -> bool {
        self.city.is_some() || self.country.is_some()
    }

    /// Union of stage and sector terms (the investment-profile signal set).
    pub fn investment_terms(&self) -> Vec<&str> {
        let mut terms: Vec<&str> = self
            .stages
            .iter()
            .chain(self.sectors.iter())
            .map(|s| s.as_str())
            .collect();
        terms.sort_unstable();
        terms.dedup();
        terms
    }
}

// ============================================================================
// NORMALIZE
// ============================================================================

/// Canonicalize one contact. Never fails; unparseable values degrade to
/// absent rather than erroring.
pub fn normalize(contact: &CandidateContact) -> NormalizedRecord {
    let name = fold_text(contact.name.as_deref());
    let name_tokens = name.as_deref().map(tokenize).unwrap_or_default();

    let org = fold_text(contact.organization.as_deref());
    let org_stem_tokens = org.as_deref().map(stem_org_tokens).unwrap_or_default();
    let org_stem = if org_stem_tokens.is_empty() {
        None
    } else {
        Some(org_stem_tokens.join(" "))
    };

    let email = fold_text(contact.email.as_deref());
    let email_domain = email
        .as_deref()
        .and_then(|e| e.rsplit_once('@').map(|(_, dom)| dom.to_string()))
        .filter(|d| !d.is_empty());

    NormalizedRecord {
        name,
        name_tokens,
        org,
        org_stem,
        org_stem_tokens,
        email,
        email_domain,
        profile_token: contact.profile_url.as_deref().and_then(profile_token),
        city: fold_text(contact.city.as_deref()),
        country: fold_text(contact.country.as_deref()),
        stages: fold_terms(&contact.stages),
        sectors: fold_terms(&contact.sectors),
    }
}

/// Lowercase + trim + collapse internal whitespace. Empty results are absent.
pub fn fold_text(value: Option<&str>) -> Option<String> {
    let folded = value?
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if folded.is_empty() {
        None
    } else {
        Some(folded)
    }
}

/// Split on non-alphanumeric characters, drop empties, dedup preserving
/// first occurrence order.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    for token in text.split(|c: char| !c.is_alphanumeric()) {
        if token.is_empty() {
            continue;
        }
        let token = token.to_lowercase();
        if !tokens.contains(&token) {
            tokens.push(token);
        }
    }
    tokens
}

/// Organization tokens with legal suffixes removed. If every token is a
/// suffix word ("Capital Partners"), the full token list is kept - an org
/// must never stem to nothing.
fn stem_org_tokens(org: &str) -> Vec<String> {
    let tokens = tokenize(org);
    let stemmed: Vec<String> = tokens
        .iter()
        .filter(|t| !ORG_LEGAL_SUFFIXES.contains(&t.as_str()))
        .cloned()
        .collect();
    if stemmed.is_empty() {
        tokens
    } else {
        stemmed
    }
}

/// Reduce a professional-network URL to a canonical profile-path token.
///
/// "https://www.linkedin.com/in/janedoe/" and "linkedin.com/in/JaneDoe"
/// both become "in/janedoe". URLs with no path fall back to the bare host.
fn profile_token(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let parsed = url::Url::parse(&with_scheme).ok()?;
    let host = parsed.host_str()?.to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);

    let path = parsed.path().trim_matches('/').to_lowercase();
    if path.is_empty() {
        Some(host.to_string())
    } else {
        Some(path)
    }
}

/// Normalized term set: folded, deduped, sorted (order-irrelevant by contract).
fn fold_terms(terms: &[String]) -> Vec<String> {
    let mut folded: Vec<String> = terms
        .iter()
        .filter_map(|t| fold_text(Some(t.as_str())))
        .collect();
    folded.sort_unstable();
    folded.dedup();
    folded
}

// ============================================================================
// TESTS
// ============================================================================
