// 👥 Contact Model - Candidate and directory record types
// Shared attribute shape: a candidate is an ExistingRecord minus identity

use serde::{Deserialize, Serialize};

// ============================================================================
// ENTITY KIND
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Individual investor (angel, partner at a fund)
    Investor,

    /// Fund-level record (the firm itself)
    Fund,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Investor => "investor",
            EntityKind::Fund => "fund",
        }
    }
}

// ============================================================================
// CANDIDATE CONTACT
// ============================================================================

/// A freshly parsed contact from one import run (spreadsheet or screenshot
/// extraction). Has no identifier; lives only for the duration of the run.
///
/// Missing fields are `None`, never `""` - the normalizer and scorer treat
/// absence as absence, so two blank fields never count as a match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateContact {
    // Identity
    pub name: Option<String>,
    pub organization: Option<String>,
    pub entity_kind: EntityKind,

    // Location
    pub city: Option<String>,
    pub country: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,

    // Contact channels
    pub email: Option<String>,
    pub profile_url: Option<String>,

    // Investment profile (order-irrelevant sets)
    pub stages: Vec<String>,
    pub sectors: Vec<String>,
    pub thesis_keywords: Vec<String>,
    pub notable_investments: Vec<String>,

    // Numeric attributes (USD)
    pub ticket_min: Option<f64>,
    pub ticket_max: Option<f64>,
    pub fund_size: Option<f64>,
}

impl CandidateContact {
    /// Empty investor-kind candidate. Import paths fill in what they parsed.
    pub fn empty(entity_kind: EntityKind) -> Self {
        CandidateContact {
            name: None,
            organization: None,
            entity_kind,
            city: None,
            country: None,
            latitude: None,
            longitude: None,
            email: None,
            profile_url: None,
            stages: Vec::new(),
            sectors: Vec::new(),
            thesis_keywords: Vec::new(),
            notable_investments: Vec::new(),
            ticket_min: None,
            ticket_max: None,
            fund_size: None,
        }
    }

    /// A candidate with neither a name nor an organization cannot be scored
    /// at all. Reported as `unscorable`, never silently bucketed as new.
    pub fn is_scorable(&self) -> bool {
        let has = |f: &Option<String>| f.as_deref().is_some_and(|s| !s.trim().is_empty());
        has(&self.name) || has(&self.organization)
    }

    /// Display label for reasons and review surfaces.
    pub fn label(&self) -> String {
        match (&self.name, &self.organization) {
            (Some(n), Some(o)) => format!("{} ({})", n, o),
            (Some(n), None) => n.clone(),
            (None, Some(o)) => o.clone(),
            (None, None) => "<unscorable contact>".to_string(),
        }
    }
}

// ============================================================================
// EXISTING RECORD
// ============================================================================

/// A directory record that survives across import runs.
///
/// `id` is the stable identity; `contributor_count` tracks how many import
/// runs have corroborated or enriched the record. Mutation happens only in
/// the external apply step - the engine reads a snapshot and never writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExistingRecord {
    pub id: String,
    pub contributor_count: u32,

    #[serde(flatten)]
    pub contact: CandidateContact,
}

impl ExistingRecord {
    pub fn new(id: impl Into<String>, contact: CandidateContact) -> Self {
        ExistingRecord {
            id: id.into(),
            contributor_count: 1,
            contact,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
