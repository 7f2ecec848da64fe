#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Per-state displacement summary loading.
//!
//! The summary file is produced offline from the survey's state
//! identifiers and is loaded once at startup to back the choropleth map.

pub mod summary;

use thiserror::Error;

/// Errors that can occur while loading the state summary.
#[derive(Debug, Error)]
pub enum GeographyError {
    /// Reading the file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A required column is absent from the header.
    #[error("Missing column '{column}'")]
    MissingColumn {
        /// Name of the missing column.
        column: String,
    },

    /// A state code matched neither a postal nor a FIPS code.
    #[error("Unknown state code '{code}' at line {line}")]
    UnknownState {
        /// 1-based line in the summary file.
        line: u64,
        /// Raw code text.
        code: String,
    },

    /// A rate cell was not a finite number.
    #[error("Invalid rate '{value}' in column '{column}' at line {line}")]
    InvalidRate {
        /// 1-based line in the summary file.
        line: u64,
        /// Factor column the cell belongs to.
        column: String,
        /// Raw cell text.
        value: String,
    },
}
