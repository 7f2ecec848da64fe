//! Weighted cross-tabulation.
//!
//! Records with a sentinel (`-88`/`-99`) or missing value in either
//! variable are excluded. Outcome and factor codes without a label in the
//! data dictionary are dropped. Each remaining factor category gets the
//! share of its summed weight falling into each outcome label; outcome
//! codes that share a label are one column.

use std::collections::{BTreeMap, BTreeSet};

use displacement_analytics_models::{
    CrossTab, CrossTabColumn, CrossTabRequest, CrossTabRow, SAMPLE_SIZE_MARKER,
};
use displacement_survey_models::{
    Conversion, DataDictionary, SurveyTable, Variable, VariableDescriptor, group_thousands,
    is_sentinel,
};

use crate::AnalyticsError;

/// Per factor-category accumulator.
#[derive(Debug, Default)]
struct RowTotals {
    records: usize,
    by_outcome: BTreeMap<i64, f64>,
}

/// Looks up a descriptor that must carry labels.
fn labelled(
    dictionary: &DataDictionary,
    variable: Variable,
) -> Result<&VariableDescriptor, AnalyticsError> {
    let descriptor = dictionary.descriptor(variable)?;
    if descriptor.conversion.is_empty() {
        return Err(AnalyticsError::EmptyConversion { variable });
    }
    Ok(descriptor)
}

/// Appends the sample size to a row label unless it already carries one.
fn annotate(label: &str, records: usize) -> String {
    if label.contains(SAMPLE_SIZE_MARKER) {
        label.to_string()
    } else {
        let records = i64::try_from(records).unwrap_or(i64::MAX);
        format!("{label}{SAMPLE_SIZE_MARKER}{})", group_thousands(records))
    }
}

/// Maps every labelled code to the first (lowest) code carrying the same
/// label. Columns are keyed by that code.
fn column_codes(conversion: &Conversion) -> BTreeMap<i64, i64> {
    let mut first_by_label: BTreeMap<&str, i64> = BTreeMap::new();
    conversion
        .iter()
        .map(|(code, label)| (code, *first_by_label.entry(label).or_insert(code)))
        .collect()
}

/// Label for a code that is known to be in the conversion.
fn label_of(conversion: &Conversion, code: i64) -> String {
    conversion.label(code).unwrap_or_default().to_string()
}

/// Builds the weighted distribution of `request.outcome` within each
/// category of `request.factor`.
///
/// Rows and columns follow the variables' category (code) order; a column
/// whose label several outcome codes share sits at the first of them. Factor
/// categories that end up with no records or zero total weight are left
/// out rather than reported as zeros.
///
/// # Errors
///
/// * [`AnalyticsError::MissingDescriptor`] / [`AnalyticsError::EmptyConversion`]
///   if either variable lacks a labelled dictionary entry
/// * [`AnalyticsError::MissingColumn`] / [`AnalyticsError::MissingWeight`]
///   if the respondent table lacks a required column
/// * [`AnalyticsError::InvalidWeight`] if a weight is negative or not finite
pub fn crosstab(
    table: &SurveyTable,
    dictionary: &DataDictionary,
    request: &CrossTabRequest,
) -> Result<CrossTab, AnalyticsError> {
    let factor_descriptor = labelled(dictionary, request.factor)?;
    let outcome_descriptor = labelled(dictionary, request.outcome)?;

    let factor_values = table
        .column(request.factor)
        .ok_or(AnalyticsError::MissingColumn {
            variable: request.factor,
        })?;
    let outcome_values = table
        .column(request.outcome)
        .ok_or(AnalyticsError::MissingColumn {
            variable: request.outcome,
        })?;
    let weights = table
        .weights(request.weight)
        .ok_or(AnalyticsError::MissingWeight {
            column: request.weight,
        })?;

    if let Some((record, value)) = weights
        .iter()
        .enumerate()
        .find(|(_, w)| !w.is_finite() || **w < 0.0)
    {
        return Err(AnalyticsError::InvalidWeight {
            record,
            value: *value,
        });
    }

    let outcome_columns = column_codes(&outcome_descriptor.conversion);
    let mut rows: BTreeMap<i64, RowTotals> = BTreeMap::new();
    let mut observed_outcomes: BTreeSet<i64> = BTreeSet::new();
    let mut excluded = 0_usize;
    let mut unmapped_outcomes = 0_usize;
    let mut unmapped_factors = 0_usize;

    for ((factor, outcome), weight) in factor_values.iter().zip(outcome_values).zip(weights) {
        let (Some(factor), Some(outcome)) = (*factor, *outcome) else {
            excluded += 1;
            continue;
        };
        if is_sentinel(factor) || is_sentinel(outcome) {
            excluded += 1;
            continue;
        }
        let Some(column) = outcome_columns.get(&outcome).copied() else {
            unmapped_outcomes += 1;
            continue;
        };
        if factor_descriptor.conversion.label(factor).is_none() {
            unmapped_factors += 1;
            continue;
        }

        let totals = rows.entry(factor).or_default();
        totals.records += 1;
        *totals.by_outcome.entry(column).or_default() += weight;
        observed_outcomes.insert(column);
    }

    if unmapped_outcomes > 0 || unmapped_factors > 0 {
        log::debug!(
            "{} x {}: {unmapped_outcomes} outcome and {unmapped_factors} factor values unmapped",
            request.factor,
            request.outcome
        );
    }
    log::trace!(
        "{} x {}: {excluded} records excluded as missing or sentinel",
        request.factor,
        request.outcome
    );

    let columns: Vec<CrossTabColumn> = observed_outcomes
        .iter()
        .map(|code| CrossTabColumn {
            code: *code,
            label: label_of(&outcome_descriptor.conversion, *code),
        })
        .collect();

    let rows: Vec<CrossTabRow> = rows
        .into_iter()
        .filter_map(|(code, totals)| {
            let total_weight: f64 = totals.by_outcome.values().sum();
            if total_weight <= 0.0 {
                log::debug!(
                    "{} category {code} has no weight; omitting row",
                    request.factor
                );
                return None;
            }

            let shares = columns
                .iter()
                .map(|column| {
                    totals.by_outcome.get(&column.code).copied().unwrap_or(0.0) / total_weight
                })
                .collect();

            let label = label_of(&factor_descriptor.conversion, code);
            let label = if request.samples {
                annotate(&label, totals.records)
            } else {
                label
            };

            Some(CrossTabRow {
                code,
                label,
                sample_size: totals.records,
                total_weight,
                shares,
            })
        })
        .collect();

    Ok(CrossTab {
        factor: request.factor,
        factor_name: factor_descriptor.name.clone(),
        outcome: request.outcome,
        outcome_name: outcome_descriptor.name.clone(),
        columns,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use displacement_survey_models::{VariableDescriptor, VariableType, WeightColumn};

    use super::*;

    fn dictionary() -> DataDictionary {
        let mut builder = DataDictionary::builder();
        builder
            .insert(
                Variable::NdDamage,
                VariableDescriptor::new(
                    "Property damage",
                    VariableType::Ordinal,
                    [(1, "No damage"), (2, "Minor damage"), (3, "Major damage")]
                        .into_iter()
                        .collect(),
                ),
            )
            .insert(
                Variable::NdHowlong,
                VariableDescriptor::new(
                    "Displacement duration",
                    VariableType::Ordinal,
                    [
                        (1, "Never returned"),
                        (2, "Less than a week"),
                        (3, "One week to one month"),
                    ]
                    .into_iter()
                    .collect(),
                ),
            )
            .insert(
                Variable::Tenure,
                VariableDescriptor::new("Housing tenure", VariableType::Nominal, Conversion::new()),
            );
        builder.build()
    }

    fn table(rows: &[(Option<i64>, Option<i64>, f64)]) -> SurveyTable {
        let ids = (0..rows.len()).map(|i| format!("R{i}")).collect();
        SurveyTable::new(ids)
            .with_column(Variable::NdDamage, rows.iter().map(|r| r.0).collect())
            .unwrap()
            .with_column(Variable::NdHowlong, rows.iter().map(|r| r.1).collect())
            .unwrap()
            .with_weights(WeightColumn::Household, rows.iter().map(|r| r.2).collect())
            .unwrap()
    }

    fn duration_by_damage(samples: bool) -> CrossTabRequest {
        CrossTabRequest::new(Variable::NdDamage, Variable::NdHowlong).with_samples(samples)
    }

    fn assert_rows_sum_to_one(result: &CrossTab) {
        for row in &result.rows {
            let sum: f64 = row.shares.iter().sum();
            assert!((sum - 1.0).abs() < 1e-9, "row {} sums to {sum}", row.label);
        }
    }

    #[test]
    fn weighted_shares() {
        let table = table(&[
            (Some(1), Some(2), 10.0),
            (Some(1), Some(2), 5.0),
            (Some(2), Some(2), 5.0),
        ]);
        let result = crosstab(&table, &dictionary(), &duration_by_damage(false)).unwrap();

        assert_eq!(result.row_labels(), ["Less than a week"]);
        assert_eq!(result.column_labels(), ["No damage", "Minor damage"]);
        assert!((result.share("Less than a week", "No damage").unwrap() - 0.75).abs() < 1e-12);
        assert!((result.share("Less than a week", "Minor damage").unwrap() - 0.25).abs() < 1e-12);
        assert_eq!(result.factor_name, "Displacement duration");
        assert_eq!(result.outcome_name, "Property damage");
    }

    #[test]
    fn sentinels_never_contribute() {
        let table = table(&[
            (Some(1), Some(1), 3.0),
            (Some(-99), Some(1), 100.0),
            (Some(2), Some(-88), 100.0),
            (Some(-88), Some(-99), 100.0),
            (Some(3), Some(1), 1.0),
        ]);
        let result = crosstab(&table, &dictionary(), &duration_by_damage(true)).unwrap();

        assert_eq!(result.rows.len(), 1);
        let row = &result.rows[0];
        assert_eq!(row.sample_size, 2);
        assert!((row.total_weight - 4.0).abs() < 1e-12);
        assert_eq!(result.column_labels(), ["No damage", "Major damage"]);
        assert!(result.columns.iter().all(|c| c.code > 0));
    }

    #[test]
    fn rows_and_columns_follow_category_order() {
        let table = table(&[
            (Some(3), Some(3), 1.0),
            (Some(1), Some(2), 1.0),
            (Some(2), Some(1), 1.0),
            (Some(3), Some(1), 1.0),
        ]);
        let result = crosstab(&table, &dictionary(), &duration_by_damage(false)).unwrap();

        assert_eq!(
            result.row_labels(),
            ["Never returned", "Less than a week", "One week to one month"]
        );
        assert_eq!(
            result.column_labels(),
            ["No damage", "Minor damage", "Major damage"]
        );
        assert_rows_sum_to_one(&result);
    }

    #[test]
    fn empty_combinations_are_zero_not_missing() {
        let table = table(&[(Some(1), Some(1), 2.0), (Some(3), Some(2), 2.0)]);
        let result = crosstab(&table, &dictionary(), &duration_by_damage(false)).unwrap();

        assert_eq!(result.rows[0].shares, [1.0, 0.0]);
        assert_eq!(result.rows[1].shares, [0.0, 1.0]);
    }

    #[test]
    fn zero_weight_rows_are_omitted() {
        let table = table(&[
            (Some(1), Some(1), 0.0),
            (Some(2), Some(1), 0.0),
            (Some(1), Some(2), 4.0),
        ]);
        let result = crosstab(&table, &dictionary(), &duration_by_damage(false)).unwrap();

        assert_eq!(result.row_labels(), ["Less than a week"]);
        assert_rows_sum_to_one(&result);
    }

    #[test]
    fn unmapped_and_missing_values_are_dropped() {
        let table = table(&[
            (Some(1), Some(1), 1.0),
            (Some(7), Some(1), 50.0),
            (Some(2), Some(9), 50.0),
            (None, Some(1), 50.0),
            (Some(2), None, 50.0),
        ]);
        let result = crosstab(&table, &dictionary(), &duration_by_damage(false)).unwrap();

        assert_eq!(result.row_labels(), ["Never returned"]);
        assert_eq!(result.column_labels(), ["No damage"]);
        assert_eq!(result.sample_size(), 1);
    }

    #[test]
    fn sample_sizes_annotate_labels_once() {
        let rows: Vec<(Option<i64>, Option<i64>, f64)> =
            (0..1234).map(|i| (Some(1 + i % 2), Some(1), 1.0)).collect();
        let table = table(&rows);
        let dictionary = dictionary();

        let first = crosstab(&table, &dictionary, &duration_by_damage(true)).unwrap();
        let second = crosstab(&table, &dictionary, &duration_by_damage(true)).unwrap();

        assert_eq!(first.row_labels(), ["Never returned\n(n=1,234)"]);
        assert_eq!(first, second);
    }

    #[test]
    fn annotation_is_not_doubled() {
        assert_eq!(annotate("Owner\n(n=12)", 40), "Owner\n(n=12)");
        assert_eq!(annotate("Owner", 40), "Owner\n(n=40)");
    }

    #[test]
    fn person_weight_can_be_selected() {
        let table = table(&[(Some(1), Some(1), 1.0), (Some(2), Some(1), 1.0)])
            .with_weights(WeightColumn::Person, vec![3.0, 1.0])
            .unwrap();
        let request = duration_by_damage(false).with_weight(WeightColumn::Person);
        let result = crosstab(&table, &dictionary(), &request).unwrap();

        assert_eq!(result.rows[0].shares, [0.75, 0.25]);
    }

    #[test]
    fn missing_descriptor_is_error() {
        let table = table(&[(Some(1), Some(1), 1.0)]);
        let request = CrossTabRequest::new(Variable::NdDamage, Variable::AgeBin);
        let err = crosstab(&table, &dictionary(), &request).unwrap_err();
        assert!(matches!(
            err,
            AnalyticsError::MissingDescriptor(e) if e.variable == Variable::AgeBin
        ));
    }

    #[test]
    fn empty_conversion_is_error() {
        let table = table(&[(Some(1), Some(1), 1.0)]);
        let request = CrossTabRequest::new(Variable::NdDamage, Variable::Tenure);
        let err = crosstab(&table, &dictionary(), &request).unwrap_err();
        assert!(matches!(
            err,
            AnalyticsError::EmptyConversion { variable: Variable::Tenure }
        ));
    }

    #[test]
    fn missing_column_and_weight_are_errors() {
        let table = SurveyTable::new(vec!["a".into()])
            .with_column(Variable::NdDamage, vec![Some(1)])
            .unwrap();
        let err = crosstab(&table, &dictionary(), &duration_by_damage(false)).unwrap_err();
        assert!(matches!(
            err,
            AnalyticsError::MissingColumn { variable: Variable::NdHowlong }
        ));

        let table = table
            .with_column(Variable::NdHowlong, vec![Some(1)])
            .unwrap();
        let err = crosstab(&table, &dictionary(), &duration_by_damage(false)).unwrap_err();
        assert!(matches!(err, AnalyticsError::MissingWeight { .. }));
    }

    #[test]
    fn negative_weight_is_error() {
        let table = table(&[(Some(1), Some(1), 1.0), (Some(1), Some(1), -2.0)]);
        let err = crosstab(&table, &dictionary(), &duration_by_damage(false)).unwrap_err();
        assert!(matches!(err, AnalyticsError::InvalidWeight { record: 1, .. }));
    }

    #[test]
    fn non_finite_weight_is_error() {
        let table = table(&[(Some(1), Some(1), f64::INFINITY), (Some(2), Some(1), 1.0)]);
        let err = crosstab(&table, &dictionary(), &duration_by_damage(false)).unwrap_err();
        assert!(matches!(err, AnalyticsError::InvalidWeight { record: 0, .. }));
    }

    #[test]
    fn codes_sharing_a_label_form_one_column() {
        let mut builder = dictionary().to_builder();
        builder.insert(
            Variable::NdDamage,
            VariableDescriptor::new(
                "Property damage",
                VariableType::Ordinal,
                [(1, "No damage"), (2, "Some damage"), (3, "Some damage")]
                    .into_iter()
                    .collect(),
            ),
        );
        let dictionary = builder.build();
        let table = table(&[
            (Some(1), Some(1), 1.0),
            (Some(2), Some(1), 1.0),
            (Some(3), Some(1), 1.0),
        ]);
        let result = crosstab(&table, &dictionary, &duration_by_damage(false)).unwrap();

        assert_eq!(result.column_labels(), ["No damage", "Some damage"]);
        assert_eq!(result.columns[1].code, 2);
        let shares = &result.rows[0].shares;
        assert_eq!(shares.len(), 2);
        assert!((shares[0] - 1.0 / 3.0).abs() < 1e-12);
        assert!((shares[1] - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn every_row_sums_to_one() {
        let rows: Vec<(Option<i64>, Option<i64>, f64)> = (0..500_i64)
            .map(|i| {
                let damage = [1, 2, 3, -99][usize::try_from(i % 4).unwrap()];
                let duration = [1, 2, 3, -88, 2][usize::try_from(i % 5).unwrap()];
                #[allow(clippy::cast_precision_loss)]
                let weight = ((i * 37) % 11) as f64 * 0.7;
                (Some(damage), Some(duration), weight)
            })
            .collect();
        let result = crosstab(&table(&rows), &dictionary(), &duration_by_damage(true)).unwrap();

        assert!(!result.is_empty());
        assert_rows_sum_to_one(&result);
        assert!(result.columns.iter().all(|c| !is_sentinel(c.code)));
        assert!(result.rows.iter().all(|r| !is_sentinel(r.code)));
    }
}
