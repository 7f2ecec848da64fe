#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Cross-tabulation request and result types.
//!
//! A [`CrossTab`] is the weighted distribution of an outcome (columns)
//! within each category of a factor (rows). Results are rebuilt for every
//! chart request and never stored. [`correlation`] holds the types for
//! screening redundant survey variables.

pub mod correlation;

pub use correlation::{
    CorrelationMatrix, CorrelationMethod, CorrelationRequest, DEFAULT_CORRELATION_TOLERANCE,
};
use displacement_survey_models::{Variable, WeightColumn};
use serde::{Deserialize, Serialize};

/// Marker preceding the sample size appended to an annotated row label.
pub const SAMPLE_SIZE_MARKER: &str = "\n(n=";

/// Parameters for a single cross-tabulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossTabRequest {
    /// Variable whose categories become the columns.
    pub outcome: Variable,
    /// Variable whose categories become the rows.
    pub factor: Variable,
    /// Weight column to aggregate.
    pub weight: WeightColumn,
    /// Whether row labels are annotated with unweighted sample sizes.
    pub samples: bool,
}

impl CrossTabRequest {
    /// Household-weighted request without sample annotation.
    #[must_use]
    pub const fn new(outcome: Variable, factor: Variable) -> Self {
        Self {
            outcome,
            factor,
            weight: WeightColumn::Household,
            samples: false,
        }
    }

    #[must_use]
    pub const fn with_weight(mut self, weight: WeightColumn) -> Self {
        self.weight = weight;
        self
    }

    #[must_use]
    pub const fn with_samples(mut self, samples: bool) -> Self {
        self.samples = samples;
        self
    }
}

/// An outcome label that appears in the result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossTabColumn {
    /// Lowest raw survey code carrying the label.
    pub code: i64,
    /// Display label.
    pub label: String,
}

/// A factor category with its outcome distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossTabRow {
    /// Raw survey code.
    pub code: i64,
    /// Display label, with the sample size appended when requested.
    pub label: String,
    /// Number of records aggregated into this row.
    pub sample_size: usize,
    /// Summed weight of those records.
    pub total_weight: f64,
    /// Share of the row's weight in each column, aligned with
    /// [`CrossTab::columns`]. Sums to 1.
    pub shares: Vec<f64>,
}

/// Weighted, row-normalized contingency table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossTab {
    /// Row variable.
    pub factor: Variable,
    /// Display name of the row variable.
    pub factor_name: String,
    /// Column variable.
    pub outcome: Variable,
    /// Display name of the column variable.
    pub outcome_name: String,
    /// Outcome categories in category order.
    pub columns: Vec<CrossTabColumn>,
    /// Factor categories in category order. Categories with no
    /// observations or no weight are absent.
    pub rows: Vec<CrossTabRow>,
}

impl CrossTab {
    /// Row labels in order.
    #[must_use]
    pub fn row_labels(&self) -> Vec<&str> {
        self.rows.iter().map(|r| r.label.as_str()).collect()
    }

    /// Column labels in order.
    #[must_use]
    pub fn column_labels(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.label.as_str()).collect()
    }

    /// Shares of one column down all rows.
    #[must_use]
    pub fn column_shares(&self, column: usize) -> Vec<f64> {
        self.rows
            .iter()
            .map(|r| r.shares.get(column).copied().unwrap_or_default())
            .collect()
    }

    /// Share at `(row label, column label)`, if both exist.
    #[must_use]
    pub fn share(&self, row: &str, column: &str) -> Option<f64> {
        let column = self.columns.iter().position(|c| c.label == column)?;
        self.rows
            .iter()
            .find(|r| r.label == row)
            .and_then(|r| r.shares.get(column).copied())
    }

    /// Total number of records aggregated.
    #[must_use]
    pub fn sample_size(&self) -> usize {
        self.rows.iter().map(|r| r.sample_size).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> CrossTab {
        CrossTab {
            factor: Variable::Tenure,
            factor_name: "Tenure".to_string(),
            outcome: Variable::NdDamage,
            outcome_name: "Property damage".to_string(),
            columns: vec![
                CrossTabColumn {
                    code: 1,
                    label: "None".to_string(),
                },
                CrossTabColumn {
                    code: 2,
                    label: "Major".to_string(),
                },
            ],
            rows: vec![
                CrossTabRow {
                    code: 1,
                    label: "Owner".to_string(),
                    sample_size: 3,
                    total_weight: 4.0,
                    shares: vec![0.25, 0.75],
                },
                CrossTabRow {
                    code: 2,
                    label: "Renter".to_string(),
                    sample_size: 2,
                    total_weight: 2.0,
                    shares: vec![1.0, 0.0],
                },
            ],
        }
    }

    #[test]
    fn lookups() {
        let table = table();
        assert_eq!(table.row_labels(), ["Owner", "Renter"]);
        assert_eq!(table.column_labels(), ["None", "Major"]);
        assert_eq!(table.column_shares(1), [0.75, 0.0]);
        assert_eq!(table.share("Owner", "Major"), Some(0.75));
        assert_eq!(table.share("Owner", "Minor"), None);
        assert_eq!(table.sample_size(), 5);
    }

    #[test]
    fn request_defaults_to_household_weight() {
        let request = CrossTabRequest::new(Variable::NdDamage, Variable::Tenure);
        assert_eq!(request.weight, WeightColumn::Household);
        assert!(!request.samples);
        assert!(request.with_samples(true).samples);
    }
}
