//! Panchayat listing with client-side fallback
//!
//! The endpoint's `panchayats_by_clf` convenience call is expected to return
//! panchayats with a `recorded_count`. When it does not, the same listing is
//! rebuilt here from the raw mapping and panchayat tables, and the counts are
//! summed from each panchayat's villages.
//!
//! The mapping table has no fixed schema. Rows are matched to the CLF by
//! scanning every cell, and panchayat ids are collected from a list of known
//! column spellings plus any purely numeric cell that is not the CLF id
//! itself. That last rule can pick up unrelated numeric columns; it is kept
//! because the true mapping schema is unknown.

use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

use crate::api::SurveyApi;
use crate::error::FetchError;
use crate::gather::gather;
use crate::outcome::CallOutcome;
use crate::session::Session;
use crate::value::Row;

/// Mapping rows linking CLFs to panchayats
pub const MAPPING_TABLE: &str = "PanchayatsUnderCLF";

/// Canonical panchayat records
pub const PANCHAYAT_TABLE: &str = "Panchayat";

/// Column attached to every listed panchayat
pub const RECORDED_COUNT: &str = "recorded_count";

/// Column spellings seen for comma-separated panchayat id lists
pub const PANCHAYAT_ID_COLUMNS: &[&str] = &[
    "panchayat_id",
    "panchayatid",
    "panchayat",
    "panchayatId",
    "panchayat_id ",
];

/// Where a listing came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingSource {
    /// Server convenience call, used as-is
    Server,
    /// Rebuilt from the raw tables
    Fallback {
        mapping_rows: usize,
        matched_rows: usize,
    },
    /// Panchayats of one district (admin view)
    District,
    /// Every panchayat (no CLF assigned)
    All,
}

/// Panchayats to display, each carrying `recorded_count`.
#[derive(Debug, Clone, PartialEq)]
pub struct PanchayatListing {
    pub panchayats: Vec<Row>,
    pub source: ListingSource,
}

impl PanchayatListing {
    pub fn is_empty(&self) -> bool {
        self.panchayats.is_empty()
    }

    /// Text for an empty listing ("no data", not an error).
    pub fn empty_message(&self) -> String {
        match self.source {
            ListingSource::Fallback {
                mapping_rows,
                matched_rows,
            } => format!(
                "No Panchayats found. Mapping rows: {}. Matched mapping rows: {}.",
                mapping_rows, matched_rows
            ),
            _ => "No Panchayats found.".to_string(),
        }
    }
}

/// Panchayats for the current user.
///
/// A CLF-assigned session without an admin district goes through
/// [`panchayats_for_clf`]; an admin district lists that district; anything
/// else lists every panchayat.
pub async fn resolve_panchayats<A: SurveyApi + ?Sized>(
    api: &A,
    session: Option<&Session>,
    admin_district: Option<&str>,
    max_concurrent: usize,
) -> Result<PanchayatListing, FetchError> {
    match (session.and_then(Session::assigned_clf_id), admin_district) {
        (Some(clf_id), None) => panchayats_for_clf(api, &clf_id, max_concurrent).await,
        (_, Some(district_id)) => panchayats_for_district(api, district_id, max_concurrent).await,
        (None, None) => all_panchayats(api, max_concurrent).await,
    }
}

/// Panchayats under a CLF, with recorded counts.
///
/// Raw-table fetch failures are returned as errors; an empty listing is not
/// an error.
pub async fn panchayats_for_clf<A: SurveyApi + ?Sized>(
    api: &A,
    clf_id: &str,
    max_concurrent: usize,
) -> Result<PanchayatListing, FetchError> {
    let server = api.panchayats_by_clf(clf_id).await;
    if let Some(panchayats) = usable_server_listing(&server) {
        debug!(clf_id, count = panchayats.len(), "using server panchayat listing");
        return Ok(PanchayatListing {
            panchayats,
            source: ListingSource::Server,
        });
    }

    let server_rows = server.rows_or_empty();
    info!(
        clf_id,
        server_rows = server_rows.len(),
        "server listing unusable, joining raw tables"
    );

    let mapping = fetch_table(api, MAPPING_TABLE).await?;
    let all_panchayats = fetch_table(api, PANCHAYAT_TABLE).await?;

    let target = clf_id.trim();
    let matched = match_mapping_rows(&mapping, target);
    let candidates = candidate_panchayat_ids(&matched, target);
    let selected = select_panchayats(&all_panchayats, &candidates, &server_rows);

    debug!(
        mapping_rows = mapping.len(),
        matched_rows = matched.len(),
        candidates = candidates.len(),
        selected = selected.len(),
        "mapping join"
    );

    Ok(PanchayatListing {
        panchayats: attach_recorded_counts(api, selected, max_concurrent).await,
        source: ListingSource::Fallback {
            mapping_rows: mapping.len(),
            matched_rows: matched.len(),
        },
    })
}

/// Panchayats of one district, with recorded counts.
pub async fn panchayats_for_district<A: SurveyApi + ?Sized>(
    api: &A,
    district_id: &str,
    max_concurrent: usize,
) -> Result<PanchayatListing, FetchError> {
    let in_district: Vec<Row> = fetch_table(api, PANCHAYAT_TABLE)
        .await?
        .into_iter()
        .filter(|p| p.text("district_id").as_deref() == Some(district_id))
        .collect();

    Ok(PanchayatListing {
        panchayats: attach_recorded_counts(api, in_district, max_concurrent).await,
        source: ListingSource::District,
    })
}

/// Every panchayat, with recorded counts.
pub async fn all_panchayats<A: SurveyApi + ?Sized>(
    api: &A,
    max_concurrent: usize,
) -> Result<PanchayatListing, FetchError> {
    let panchayats = fetch_table(api, PANCHAYAT_TABLE).await?;
    Ok(PanchayatListing {
        panchayats: attach_recorded_counts(api, panchayats, max_concurrent).await,
        source: ListingSource::All,
    })
}

/// Server rows, if the listing is a non-empty array of records that all
/// carry a `recorded_count` column.
pub fn usable_server_listing(outcome: &CallOutcome) -> Option<Vec<Row>> {
    let items = outcome.as_array()?;
    if items.is_empty() {
        return None;
    }
    let rows: Vec<Row> = items.iter().cloned().filter_map(Row::from_value).collect();
    if rows.len() != items.len() || !rows.iter().all(|r| r.has_field(RECORDED_COUNT)) {
        return None;
    }
    Some(rows)
}

/// Rows of a raw table. A null body counts as an empty table.
async fn fetch_table<A: SurveyApi + ?Sized>(api: &A, table: &str) -> Result<Vec<Row>, FetchError> {
    match api.list(table).await {
        CallOutcome::Ok(Value::Null) => Ok(Vec::new()),
        outcome => outcome.into_rows().map_err(|e| {
            warn!(table, error = %e, "raw table fetch failed");
            e
        }),
    }
}

/// Mapping rows mentioning `target`: exact trimmed match on any cell, or,
/// when nothing matches exactly, substring containment on any cell.
pub fn match_mapping_rows<'a>(mapping: &'a [Row], target: &str) -> Vec<&'a Row> {
    let exact: Vec<&Row> = mapping
        .iter()
        .filter(|row| row.any_field_equals(target))
        .collect();
    if !exact.is_empty() {
        return exact;
    }
    mapping
        .iter()
        .filter(|row| row.any_field_contains(target))
        .collect()
}

/// Panchayat ids named by the matched mapping rows.
pub fn candidate_panchayat_ids(matched: &[&Row], target: &str) -> HashSet<String> {
    let mut ids = HashSet::new();

    for row in matched {
        for column in PANCHAYAT_ID_COLUMNS {
            let cell = row.get(column);
            if !cell.is_truthy() {
                continue;
            }
            if let Some(list) = cell.render() {
                ids.extend(
                    list.split(',')
                        .map(str::trim)
                        .filter(|id| !id.is_empty())
                        .map(str::to_string),
                );
            }
        }

        for (_, cell) in row.fields() {
            if !cell.is_truthy() {
                continue;
            }
            if let Some(text) = cell.render() {
                let text = text.trim();
                if is_bare_integer(text) && text != target {
                    ids.insert(text.to_string());
                }
            }
        }
    }

    ids
}

fn is_bare_integer(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}

/// Panchayat records for the candidate ids, in table order.
///
/// When the server had named panchayats (without counts), their ids are
/// unioned in: the table record is used when one exists, then the server
/// record, then a bare `{id}`.
pub fn select_panchayats(
    all_panchayats: &[Row],
    candidates: &HashSet<String>,
    server_rows: &[Row],
) -> Vec<Row> {
    let selected: Vec<Row> = all_panchayats
        .iter()
        .filter(|p| p.id().is_some_and(|id| candidates.contains(&id)))
        .cloned()
        .collect();

    if server_rows.is_empty() {
        return selected;
    }

    let server_by_id: HashMap<String, &Row> = server_rows
        .iter()
        .filter_map(|r| r.id().map(|id| (id, r)))
        .collect();

    let mut seen = HashSet::new();
    let union_ids: Vec<String> = selected
        .iter()
        .filter_map(Row::id)
        .chain(server_rows.iter().filter_map(Row::id))
        .filter(|id| seen.insert(id.clone()))
        .collect();

    union_ids
        .into_iter()
        .map(|id| {
            all_panchayats
                .iter()
                .find(|p| p.id().as_deref() == Some(id.as_str()))
                .or_else(|| server_by_id.get(&id).copied())
                .cloned()
                .unwrap_or_else(|| Row::new().with("id", id))
        })
        .collect()
}

/// Attach `recorded_count` to each panchayat, summed over its villages.
///
/// Lookups run concurrently; a failed lookup counts as zero for that
/// panchayat only.
pub async fn attach_recorded_counts<A: SurveyApi + ?Sized>(
    api: &A,
    panchayats: Vec<Row>,
    max_concurrent: usize,
) -> Vec<Row> {
    gather(panchayats, max_concurrent, |panchayat| async move {
        match panchayat.id() {
            Some(id) => village_total(api, &id).await,
            None => 0.0,
        }
    })
    .await
    .into_iter()
    .map(|(panchayat, total)| panchayat.with(RECORDED_COUNT, total))
    .collect()
}

/// Sum of `recorded_count` over a panchayat's villages.
pub async fn village_total<A: SurveyApi + ?Sized>(api: &A, panchayat_id: &str) -> f64 {
    match api.villages_by_panchayat(panchayat_id).await {
        CallOutcome::Ok(Value::Array(villages)) => Row::from_array(villages)
            .iter()
            .fold(0.0, |total, village| total + village.number(RECORDED_COUNT)),
        CallOutcome::Ok(_) => 0.0,
        failure => {
            warn!(panchayat_id, outcome = ?failure, "village lookup failed, counting zero");
            0.0
        }
    }
}
