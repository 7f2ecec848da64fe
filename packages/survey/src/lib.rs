#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Loading and preprocessing of the Household Pulse Survey extract.
//!
//! [`dictionary`] parses the data dictionary file, [`respondents`] loads the
//! respondent extract, and [`preprocess`] derives the binned age, household
//! size and rent columns and merges their descriptors into a new
//! dictionary. All of this runs once at startup; the results are read-only
//! afterwards.
//!
//! [`puf`] reads the zipped weekly public use files the extract is cut
//! from.

pub mod dictionary;
pub mod preprocess;
pub mod puf;
pub mod respondents;

use std::path::PathBuf;

use displacement_survey_models::ColumnLengthError;
use thiserror::Error;

/// Errors that can occur while loading or preprocessing survey data.
#[derive(Debug, Error)]
pub enum SurveyError {
    /// Reading an input file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A required column is absent from the file header.
    #[error("Missing column '{column}'")]
    MissingColumn {
        /// Name of the missing column.
        column: String,
    },

    /// A data dictionary row could not be used.
    #[error("Malformed data dictionary row at line {line}: {reason}")]
    MalformedDictionary {
        /// 1-based line in the dictionary file.
        line: u64,
        /// What was wrong with the row.
        reason: String,
    },

    /// A code cell could not be parsed as an integer.
    #[error("Invalid value '{value}' in column '{column}' at line {line}")]
    InvalidValue {
        /// 1-based line in the respondent file.
        line: u64,
        /// Column the cell belongs to.
        column: String,
        /// Raw cell text.
        value: String,
    },

    /// A weight cell was not a finite, non-negative number.
    #[error("Invalid weight '{value}' in column '{column}' at line {line}")]
    InvalidWeight {
        /// 1-based line in the respondent file.
        line: u64,
        /// Weight column the cell belongs to.
        column: String,
        /// Raw cell text.
        value: String,
    },

    /// A derived column did not line up with the table.
    #[error("Column length mismatch: {0}")]
    ColumnLength(#[from] ColumnLengthError),

    /// A zip archive could not be opened or read.
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// A public use file archive holds no respondent CSV.
    #[error("Archive has no respondent CSV")]
    MissingPufCsv,

    /// No public use file archives were found.
    #[error("No *_PUF_CSV.zip archives in {}", dir.display())]
    NoPufArchives {
        /// Directory that was searched.
        dir: PathBuf,
    },

    /// Loading one public use file archive failed.
    #[error("Failed to load {}: {source}", path.display())]
    Archive {
        /// Archive path.
        path: PathBuf,
        /// What went wrong inside it.
        #[source]
        source: Box<Self>,
    },
}

/// Parses a raw survey code.
///
/// Codes are integers, but exports that passed through a float column
/// write them as `2.0`; those are accepted when they are integral.
pub(crate) fn parse_code(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(code) = raw.parse::<i64>() {
        return Some(code);
    }
    let value = raw.parse::<f64>().ok()?;
    #[allow(clippy::cast_possible_truncation)]
    let code = value as i64;
    #[allow(clippy::cast_precision_loss)]
    let integral = value.is_finite() && (code as f64 - value).abs() < f64::EPSILON;
    integral.then_some(code)
}
