//! Respondent extract loading.
//!
//! The extract is a CSV file with one row per respondent. `SCRAM` (the
//! respondent id) and `HWEIGHT` are required, `PWEIGHT` is optional, and
//! every other header naming a known [`Variable`] becomes an integer code
//! column. Anything else in the file is ignored.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use displacement_survey_models::{RESPONDENT_ID_COLUMN, SurveyTable, Variable, WeightColumn};

use crate::{SurveyError, parse_code};

/// Loads the respondent extract from a CSV file.
///
/// # Errors
///
/// Returns [`SurveyError`] if the file cannot be read, a required column is
/// missing, a code cell is not an integer, or a weight is negative or not a
/// number.
pub fn load_respondents(path: &Path) -> Result<SurveyTable, SurveyError> {
    log::info!("Loading respondents from {}", path.display());
    let file = File::open(path)?;
    read_respondents(file)
}

/// Reads a respondent extract from any CSV source.
///
/// # Errors
///
/// See [`load_respondents`].
pub fn read_respondents<R: Read>(reader: R) -> Result<SurveyTable, SurveyError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    let position = |column: &str| headers.iter().position(|h| h == column);
    let required = |column: &str| {
        position(column).ok_or_else(|| SurveyError::MissingColumn {
            column: column.to_string(),
        })
    };

    let id_idx = required(RESPONDENT_ID_COLUMN)?;
    let weight_idxs: Vec<(WeightColumn, usize)> = {
        let household = required(WeightColumn::Household.as_ref())?;
        let mut idxs = vec![(WeightColumn::Household, household)];
        if let Some(person) = position(WeightColumn::Person.as_ref()) {
            idxs.push((WeightColumn::Person, person));
        }
        idxs
    };

    let mut code_idxs: Vec<(Variable, usize)> = Vec::new();
    let mut ignored: Vec<&str> = Vec::new();
    for (idx, header) in headers.iter().enumerate() {
        if idx == id_idx || weight_idxs.iter().any(|(_, w)| *w == idx) {
            continue;
        }
        match Variable::from_code(header) {
            Ok(variable) => code_idxs.push((variable, idx)),
            Err(_) => ignored.push(header),
        }
    }
    if !ignored.is_empty() {
        log::debug!("Ignoring {} unused columns: {ignored:?}", ignored.len());
    }

    let mut ids: Vec<String> = Vec::new();
    let mut weights: BTreeMap<WeightColumn, Vec<f64>> = BTreeMap::new();
    let mut codes: BTreeMap<Variable, Vec<Option<i64>>> = BTreeMap::new();
    let mut record = csv::StringRecord::new();

    while reader.read_record(&mut record)? {
        let line = record.position().map_or(0, csv::Position::line);
        let field = |idx: usize| record.get(idx).unwrap_or("");

        ids.push(field(id_idx).to_string());

        for (column, idx) in &weight_idxs {
            let raw = field(*idx);
            let weight = raw
                .parse::<f64>()
                .ok()
                .filter(|w| w.is_finite() && *w >= 0.0)
                .ok_or_else(|| SurveyError::InvalidWeight {
                    line,
                    column: column.to_string(),
                    value: raw.to_string(),
                })?;
            weights.entry(*column).or_default().push(weight);
        }

        for (variable, idx) in &code_idxs {
            let raw = field(*idx);
            let code = if raw.is_empty() {
                None
            } else {
                Some(parse_code(raw).ok_or_else(|| SurveyError::InvalidValue {
                    line,
                    column: variable.to_string(),
                    value: raw.to_string(),
                })?)
            };
            codes.entry(*variable).or_default().push(code);
        }
    }

    let record_count = ids.len();
    let mut table = SurveyTable::new(ids);
    for (column, _) in &weight_idxs {
        let values = weights.remove(column).unwrap_or_default();
        table = table.with_weights(*column, values)?;
    }
    for (variable, _) in &code_idxs {
        let values = codes.remove(variable).unwrap_or_default();
        table = table.with_column(*variable, values)?;
    }

    log::info!(
        "Loaded {record_count} respondents with {} survey columns",
        code_idxs.len()
    );

    Ok(table)
}
