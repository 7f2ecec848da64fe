//! Data dictionary parsing.
//!
//! The dictionary is a CSV file with one row per survey variable:
//!
//! ```text
//! Variable,Name,Type,Conversion
//! ND_DAMAGE,Property damage,Ordinal,1=No damage;2=Minor damage;3=Major damage
//! ```
//!
//! `Conversion` holds `code=label` pairs separated by `;`. Only the first
//! `=` of a pair splits it, so labels may contain `=` and `,`.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use displacement_survey_models::{
    Conversion, DataDictionary, Variable, VariableDescriptor, VariableType,
};

use crate::{SurveyError, parse_code};

const VARIABLE_COLUMN: &str = "variable";
const NAME_COLUMN: &str = "name";
const TYPE_COLUMN: &str = "type";
const CONVERSION_COLUMN: &str = "conversion";

/// Header positions of the four dictionary columns.
struct DictionaryColumns {
    variable: usize,
    name: usize,
    kind: usize,
    conversion: usize,
}

impl DictionaryColumns {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, SurveyError> {
        let find = |column: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(column))
                .ok_or_else(|| SurveyError::MissingColumn {
                    column: column.to_string(),
                })
        };

        Ok(Self {
            variable: find(VARIABLE_COLUMN)?,
            name: find(NAME_COLUMN)?,
            kind: find(TYPE_COLUMN)?,
            conversion: find(CONVERSION_COLUMN)?,
        })
    }
}

/// Loads the data dictionary from a CSV file.
///
/// # Errors
///
/// Returns [`SurveyError`] if the file cannot be opened, is not valid CSV,
/// or lacks one of the `Variable`, `Name`, `Type` and `Conversion`
/// columns. Individual bad rows are skipped with a warning.
pub fn load_dictionary(path: &Path) -> Result<DataDictionary, SurveyError> {
    log::info!("Loading data dictionary from {}", path.display());
    let file = File::open(path)?;
    read_dictionary(file)
}

/// Reads a data dictionary from any CSV source.
///
/// Rows for variables the dashboard does not use are ignored. Rows missing
/// a code or display name, or carrying an unknown type tag, are logged and
/// skipped.
///
/// # Errors
///
/// Returns [`SurveyError`] on I/O or CSV failures and when a required
/// header is missing.
pub fn read_dictionary<R: Read>(reader: R) -> Result<DataDictionary, SurveyError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let columns = DictionaryColumns::from_headers(reader.headers()?)?;
    let mut builder = DataDictionary::builder();
    let mut skipped = 0_usize;
    let mut record = csv::StringRecord::new();

    while reader.read_record(&mut record)? {
        let line = record.position().map_or(0, csv::Position::line);

        match parse_row(&record, &columns, line) {
            Ok(Some((variable, descriptor))) => {
                if builder.contains(variable) {
                    log::warn!("Duplicate data dictionary entry for {variable} at line {line}");
                }
                builder.insert(variable, descriptor);
            }
            Ok(None) => {}
            Err(e) => {
                skipped += 1;
                log::warn!("Skipping row: {e}");
            }
        }
    }

    let dictionary = builder.build();
    log::info!(
        "Loaded {} data dictionary entries ({skipped} malformed rows skipped)",
        dictionary.len()
    );

    Ok(dictionary)
}

/// Parses one dictionary row.
///
/// Returns `Ok(None)` for well-formed rows describing variables outside
/// [`Variable`].
fn parse_row(
    record: &csv::StringRecord,
    columns: &DictionaryColumns,
    line: u64,
) -> Result<Option<(Variable, VariableDescriptor)>, SurveyError> {
    let field = |idx: usize| record.get(idx).unwrap_or("").trim();
    let malformed = |reason: String| SurveyError::MalformedDictionary { line, reason };

    let code = field(columns.variable);
    if code.is_empty() {
        return Err(malformed("missing variable code".to_string()));
    }

    let name = field(columns.name);
    if name.is_empty() {
        return Err(malformed(format!("missing display name for '{code}'")));
    }

    let kind = match field(columns.kind) {
        "" => VariableType::Numeric,
        tag => tag
            .parse::<VariableType>()
            .map_err(|_| malformed(format!("unknown type '{tag}' for '{code}'")))?,
    };

    let Ok(variable) = Variable::from_code(code) else {
        log::debug!("Ignoring data dictionary entry for unused variable {code}");
        return Ok(None);
    };

    let conversion = parse_conversion(field(columns.conversion));
    if kind.is_categorical() && conversion.is_empty() {
        log::warn!("{kind} variable {variable} has no conversion entries (line {line})");
    }

    Ok(Some((variable, VariableDescriptor::new(name, kind, conversion))))
}

/// Parses `code=label` pairs separated by `;` into a [`Conversion`].
///
/// Malformed pairs are skipped with a warning. A repeated code keeps the
/// last label.
#[must_use]
pub fn parse_conversion(text: &str) -> Conversion {
    let mut conversion = Conversion::new();

    for entry in text.split(';').map(str::trim).filter(|e| !e.is_empty()) {
        let Some((code, label)) = entry.split_once('=') else {
            log::warn!("Skipping conversion entry without '=': '{entry}'");
            continue;
        };

        let Some(code) = parse_code(code) else {
            log::warn!("Skipping conversion entry with non-integer code: '{entry}'");
            continue;
        };

        let label = label.trim();
        if label.is_empty() {
            log::warn!("Skipping conversion entry with empty label: '{entry}'");
            continue;
        }

        if let Some(previous) = conversion.insert(code, label) {
            log::warn!("Conversion code {code} repeated; replacing '{previous}' with '{label}'");
        }
    }

    conversion
}
