#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Weighted cross-tabulation of survey factors.
//!
//! [`crosstab::crosstab`] is the only computation the dashboard performs
//! per request: a grouped weighted sum normalized within each factor
//! category. [`correlation`] screens survey variables for redundancy
//! offline.

pub mod correlation;
pub mod crosstab;

use displacement_survey_models::{MissingDescriptorError, Variable, WeightColumn};
use thiserror::Error;

/// Errors that can occur while building a cross-tab or correlation matrix.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// The variable has no data dictionary entry.
    #[error("Missing descriptor: {0}")]
    MissingDescriptor(#[from] MissingDescriptorError),

    /// The variable's dictionary entry has no code-to-label mapping.
    #[error("Variable '{variable}' has no conversion mapping")]
    EmptyConversion {
        /// Variable lacking labels.
        variable: Variable,
    },

    /// The variable was not loaded from the respondent extract.
    #[error("Column '{variable}' not present in respondent data")]
    MissingColumn {
        /// Variable lacking a column.
        variable: Variable,
    },

    /// The requested weight column was not loaded.
    #[error("Weight column '{column}' not present in respondent data")]
    MissingWeight {
        /// Weight column that was requested.
        column: WeightColumn,
    },

    /// A weight was negative or not finite.
    #[error("Invalid weight {value} for record {record}")]
    InvalidWeight {
        /// Index of the offending record.
        record: usize,
        /// The weight value.
        value: f64,
    },
}
