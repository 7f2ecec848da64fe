//! Pairwise correlation between survey variables.
//!
//! Used offline to find factors that carry the same information before
//! they are offered on the dashboard. Each pair is computed over the
//! records where both values are present and not a sentinel. Weights are
//! not applied.

use displacement_analytics_models::{CorrelationMatrix, CorrelationMethod, CorrelationRequest};
use displacement_survey_models::{SurveyTable, Variable, is_sentinel};

use crate::AnalyticsError;

/// Builds the coefficient matrix for `request.variables`.
///
/// # Errors
///
/// Returns [`AnalyticsError::MissingColumn`] if any variable is not loaded
/// in `table`.
pub fn correlation_matrix(
    table: &SurveyTable,
    request: &CorrelationRequest,
) -> Result<CorrelationMatrix, AnalyticsError> {
    let columns = request
        .variables
        .iter()
        .map(|variable| {
            table
                .column(*variable)
                .ok_or(AnalyticsError::MissingColumn {
                    variable: *variable,
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let n = columns.len();
    let mut values = vec![vec![None; n]; n];
    for (i, a) in columns.iter().enumerate() {
        for (j, b) in columns.iter().enumerate().skip(i) {
            let r = coefficient(a, b, request.method)
                .map(|r| if request.absolute { r.abs() } else { r });
            values[i][j] = r;
            values[j][i] = r;
        }
    }

    Ok(CorrelationMatrix {
        method: request.method,
        variables: request.variables.clone(),
        values,
    })
}

/// Variables to drop because they correlate above `tolerance` with an
/// earlier variable in the matrix.
#[must_use]
pub fn redundant_variables(matrix: &CorrelationMatrix, tolerance: f64) -> Vec<Variable> {
    let redundant = matrix.exceeding(tolerance);
    log::info!(
        "{} variables exceed the correlation tolerance of {:.0}%: {redundant:?}",
        redundant.len(),
        tolerance * 100.0
    );
    redundant
}

fn coefficient(a: &[Option<i64>], b: &[Option<i64>], method: CorrelationMethod) -> Option<f64> {
    let (xs, ys): (Vec<i64>, Vec<i64>) = a
        .iter()
        .zip(b)
        .filter_map(|pair| match pair {
            (Some(x), Some(y)) if !is_sentinel(*x) && !is_sentinel(*y) => Some((*x, *y)),
            _ => None,
        })
        .unzip();

    match method {
        CorrelationMethod::Spearman => pearson(&average_ranks(&xs), &average_ranks(&ys)),
        CorrelationMethod::Pearson => {
            #[allow(clippy::cast_precision_loss)]
            let as_f64 = |values: &[i64]| values.iter().map(|v| *v as f64).collect::<Vec<_>>();
            pearson(&as_f64(&xs), &as_f64(&ys))
        }
    }
}

/// 1-based ranks; tied values share the mean of the positions they span.
fn average_ranks(values: &[i64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by_key(|idx| values[*idx]);

    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        #[allow(clippy::cast_precision_loss)]
        let rank = (start + end + 1) as f64 / 2.0;
        for idx in &order[start..end] {
            ranks[*idx] = rank;
        }
        start = end;
    }
    ranks
}

fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() < 2 {
        return None;
    }
    #[allow(clippy::cast_precision_loss)]
    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in xs.iter().zip(ys) {
        let (dx, dy) = (x - mean_x, y - mean_y);
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx <= 0.0 || syy <= 0.0 {
        return None;
    }
    Some((sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0))
}
