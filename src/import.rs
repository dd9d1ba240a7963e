// 📥 Candidate Import - CSV interchange from the extraction step
// The engine itself never does I/O; this loads what the external
// spreadsheet/screenshot extractor emitted into candidate records.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};

use crate::contact::{CandidateContact, EntityKind};

/// Multi-value cells (stages, sectors, keywords, investments) are
/// `|`-separated in the interchange format.
const LIST_SEPARATOR: char = '|';

/// Load a candidate batch from a CSV file on disk.
pub fn load_candidates_csv(path: &Path) -> Result<Vec<CandidateContact>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open candidate CSV: {}", path.display()))?;
    parse_candidates_csv(file)
        .with_context(|| format!("Failed to parse candidate CSV: {}", path.display()))
}

/// Parse a candidate batch from any reader (tests feed byte slices).
///
/// Extraction quality is trusted upstream: unknown columns are ignored,
/// blank cells become absent fields, and unparseable numbers degrade to
/// absent rather than failing the whole batch. Only a structurally broken
/// CSV is an error.
pub fn parse_candidates_csv<R: Read>(reader: R) -> Result<Vec<CandidateContact>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()
        .context("Candidate CSV has no header row")?
        .iter()
        .map(|h| h.to_lowercase())
        .collect();
    let column = |name: &str| headers.iter().position(|h| h == name);

    let name_idx = column("name");
    let org_idx = column("organization");
    let kind_idx = column("entity_kind");
    let city_idx = column("city");
    let country_idx = column("country");
    let lat_idx = column("latitude");
    let lng_idx = column("longitude");
    let email_idx = column("email");
    let profile_idx = column("profile_url");
    let stages_idx = column("stages");
    let sectors_idx = column("sectors");
    let keywords_idx = column("thesis_keywords");
    let investments_idx = column("notable_investments");
    let ticket_min_idx = column("ticket_min");
    let ticket_max_idx = column("ticket_max");
    let fund_size_idx = column("fund_size");

    let mut candidates = Vec::new();

    for (row, record) in csv_reader.records().enumerate() {
        let record = record.with_context(|| format!("Bad CSV record at row {}", row + 2))?;

        let text = |idx: Option<usize>| -> Option<String> {
            idx.and_then(|i| record.get(i))
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        let number = |idx: Option<usize>| text(idx).and_then(|v| v.parse::<f64>().ok());
        let list = |idx: Option<usize>| -> Vec<String> {
            text(idx)
                .map(|cell| {
                    cell.split(LIST_SEPARATOR)
                        .map(str::trim)
                        .filter(|v| !v.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default()
        };

        let entity_kind = match text(kind_idx).as_deref() {
            Some("fund") => EntityKind::Fund,
            _ => EntityKind::Investor,
        };

        let mut candidate = CandidateContact::empty(entity_kind);
        candidate.name = text(name_idx);
        candidate.organization = text(org_idx);
        candidate.city = text(city_idx);
        candidate.country = text(country_idx);
        candidate.latitude = number(lat_idx);
        candidate.longitude = number(lng_idx);
        candidate.email = text(email_idx);
        candidate.profile_url = text(profile_idx);
        candidate.stages = list(stages_idx);
        candidate.sectors = list(sectors_idx);
        candidate.thesis_keywords = list(keywords_idx);
        candidate.notable_investments = list(investments_idx);
        candidate.ticket_min = number(ticket_min_idx);
        candidate.ticket_max = number(ticket_max_idx);
        candidate.fund_size = number(fund_size_idx);

        candidates.push(candidate);
    }

    Ok(candidates)
}

// ============================================================================
// TESTS
// ============================================================================
