//! Correlation matrix request and result types.

use displacement_survey_models::Variable;
use serde::{Deserialize, Serialize};

/// Coefficient above which the later of two variables is reported as
/// redundant.
pub const DEFAULT_CORRELATION_TOLERANCE: f64 = 0.7;

/// How coefficients are computed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrelationMethod {
    /// Pearson coefficient of the average ranks.
    #[default]
    Spearman,
    /// Pearson coefficient of the raw codes.
    Pearson,
}

/// Parameters for a correlation matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelationRequest {
    /// Variables in matrix order.
    pub variables: Vec<Variable>,
    pub method: CorrelationMethod,
    /// Whether coefficients are reported as absolute values.
    pub absolute: bool,
}

impl CorrelationRequest {
    /// Absolute Spearman coefficients between `variables`.
    #[must_use]
    pub const fn new(variables: Vec<Variable>) -> Self {
        Self {
            variables,
            method: CorrelationMethod::Spearman,
            absolute: true,
        }
    }

    #[must_use]
    pub const fn with_method(mut self, method: CorrelationMethod) -> Self {
        self.method = method;
        self
    }

    #[must_use]
    pub const fn with_absolute(mut self, absolute: bool) -> Self {
        self.absolute = absolute;
        self
    }
}

/// Symmetric matrix of pairwise coefficients.
///
/// `values[i][j]` relates `variables[i]` and `variables[j]`. It is `None`
/// when fewer than two records carry both values or either side does not
/// vary over them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelationMatrix {
    pub method: CorrelationMethod,
    pub variables: Vec<Variable>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    /// Coefficient between `a` and `b`, if both are in the matrix and it is
    /// defined.
    #[must_use]
    pub fn get(&self, a: Variable, b: Variable) -> Option<f64> {
        let i = self.variables.iter().position(|v| *v == a)?;
        let j = self.variables.iter().position(|v| *v == b)?;
        self.values.get(i)?.get(j).copied().flatten()
    }

    /// Variables whose coefficient with any earlier variable exceeds
    /// `tolerance` in magnitude, in matrix order.
    #[must_use]
    pub fn exceeding(&self, tolerance: f64) -> Vec<Variable> {
        self.variables
            .iter()
            .enumerate()
            .filter(|(j, _)| {
                self.values
                    .iter()
                    .take(*j)
                    .any(|row| row.get(*j).copied().flatten().is_some_and(|r| r.abs() > tolerance))
            })
            .map(|(_, variable)| *variable)
            .collect()
    }
}
