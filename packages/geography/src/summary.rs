//! State summary CSV loading.
//!
//! The file has a `state` name column, a `code` column holding either a
//! postal code or a FIPS code, and one column per [`GeoFactor`] it
//! provides. Unrecognized columns are ignored.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr as _;

use displacement_geography_models::{GeoFactor, GeoSummary, fips};

use crate::GeographyError;

const STATE_COLUMN: &str = "state";
const CODE_COLUMN: &str = "code";

/// Loads the state summary from a CSV file.
///
/// # Errors
///
/// Returns [`GeographyError`] if the file cannot be read, lacks the `state`
/// or `code` column, names an unknown state, or holds a non-numeric rate.
pub fn load_geo_summary(path: &Path) -> Result<Vec<GeoSummary>, GeographyError> {
    log::info!("Loading state summary from {}", path.display());
    let file = File::open(path)?;
    read_geo_summary(file)
}

/// Reads a state summary from any CSV source.
///
/// Rows are returned sorted by state name. A code appearing twice keeps
/// its first row.
///
/// # Errors
///
/// See [`load_geo_summary`].
pub fn read_geo_summary<R: Read>(reader: R) -> Result<Vec<GeoSummary>, GeographyError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    let required = |column: &str| {
        headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(column))
            .ok_or_else(|| GeographyError::MissingColumn {
                column: column.to_string(),
            })
    };
    let state_idx = required(STATE_COLUMN)?;
    let code_idx = required(CODE_COLUMN)?;

    let factor_idxs: Vec<(GeoFactor, usize)> = headers
        .iter()
        .enumerate()
        .filter_map(|(idx, header)| GeoFactor::from_str(header).ok().map(|f| (f, idx)))
        .collect();
    if factor_idxs.is_empty() {
        log::warn!("State summary has no recognized factor columns");
    }

    let mut seen: BTreeSet<&'static str> = BTreeSet::new();
    let mut summaries = Vec::new();
    let mut record = csv::StringRecord::new();

    while reader.read_record(&mut record)? {
        let line = record.position().map_or(0, csv::Position::line);
        let field = |idx: usize| record.get(idx).unwrap_or("");

        let code = field(code_idx);
        let state = fips::lookup(code).ok_or_else(|| GeographyError::UnknownState {
            line,
            code: code.to_string(),
        })?;
        if !seen.insert(state.abbr) {
            log::warn!("Duplicate state {} at line {line}; skipping", state.abbr);
            continue;
        }

        let mut rates = BTreeMap::new();
        for (factor, idx) in &factor_idxs {
            let raw = field(*idx);
            if raw.is_empty() {
                continue;
            }
            let rate = raw
                .parse::<f64>()
                .ok()
                .filter(|r| r.is_finite())
                .ok_or_else(|| GeographyError::InvalidRate {
                    line,
                    column: factor.to_string(),
                    value: raw.to_string(),
                })?;
            rates.insert(*factor, rate);
        }

        let name = field(state_idx);
        summaries.push(GeoSummary {
            state: if name.is_empty() {
                state.name.to_string()
            } else {
                name.to_string()
            },
            abbr: state.abbr.to_string(),
            fips: state.fips.to_string(),
            rates,
        });
    }

    summaries.sort_by(|a, b| a.state.cmp(&b.state));
    log::info!("Loaded {} state summaries", summaries.len());

    Ok(summaries)
}
