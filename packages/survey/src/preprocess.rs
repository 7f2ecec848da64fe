//! Derived categorical columns.
//!
//! Three continuous survey answers are bucketed into ordinal bins so they
//! can be cross-tabulated like any other factor: age (from birth year),
//! household size and monthly rent. Each [`BinPolicy`] also produces the
//! descriptor for its derived column, which is merged into a new
//! [`DataDictionary`] rather than patched into the loaded one.
//!
//! Bin `0` covers `b0 <= v <= b1`; every later bin `i` covers
//! `b[i] < v <= b[i+1]`. Values below `b0` or above the last boundary stay
//! unassigned, as do sentinel and missing source values.

use displacement_survey_models::{
    Conversion, DataDictionary, DictionaryBuilder, SurveyTable, Variable, VariableDescriptor,
    VariableType, group_thousands, is_sentinel,
};

use crate::SurveyError;

/// Year the survey responses were collected.
pub const DEFAULT_SURVEY_YEAR: i64 = 2022;

/// Upper boundary standing in for "no upper limit".
pub const UNBOUNDED: i64 = i64::MAX;

const AGE_BOUNDARIES: [i64; 8] = [0, 24, 34, 44, 54, 64, 74, UNBOUNDED];
const HOUSEHOLD_SIZE_BOUNDARIES: [i64; 6] = [0, 1, 2, 4, 7, UNBOUNDED];
const RENT_BOUNDARIES: [i64; 6] = [0, 400, 800, 1200, 2000, 10000];

/// How a source value is turned into the quantity being binned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceTransform {
    /// Bin the raw value.
    Identity,
    /// Bin `survey_year - value`, clamped at zero.
    AgeFromBirthYear {
        /// Year the survey was fielded.
        survey_year: i64,
    },
}

impl SourceTransform {
    const fn apply(self, value: i64) -> i64 {
        match self {
            Self::Identity => value,
            Self::AgeFromBirthYear { survey_year } => {
                let age = survey_year.saturating_sub(value);
                if age < 0 { 0 } else { age }
            }
        }
    }
}

/// Fixed-boundary binning of one source column into one derived column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinPolicy {
    /// Column holding the continuous answer.
    pub source: Variable,
    /// Derived ordinal column.
    pub target: Variable,
    /// Display name registered for the derived column.
    pub display_name: String,
    /// Strictly increasing boundaries `b0 < b1 < ... < bn`.
    pub boundaries: Vec<i64>,
    /// One label per bin (`boundaries.len() - 1` of them).
    pub labels: Vec<String>,
    /// Transform applied to source values before binning.
    pub transform: SourceTransform,
}

impl BinPolicy {
    /// Number of bins.
    #[must_use]
    pub fn bin_count(&self) -> usize {
        self.boundaries.len().saturating_sub(1)
    }

    /// Bin index for an already-transformed value.
    #[must_use]
    pub fn bin_index(&self, value: i64) -> Option<usize> {
        let (&lower, _) = self.boundaries.split_first()?;
        if value == lower && self.bin_count() > 0 {
            return Some(0);
        }
        self.boundaries
            .windows(2)
            .position(|pair| pair[0] < value && value <= pair[1])
    }

    /// Bin index for a raw source cell.
    ///
    /// Missing and sentinel values are never binned.
    #[must_use]
    pub fn bin_source(&self, raw: Option<i64>) -> Option<usize> {
        let raw = raw.filter(|code| !is_sentinel(*code))?;
        self.bin_index(self.transform.apply(raw))
    }

    /// Conversion mapping bin index to label.
    #[must_use]
    pub fn conversion(&self) -> Conversion {
        self.labels
            .iter()
            .enumerate()
            .map(|(idx, label)| (bin_code(idx), label.clone()))
            .collect()
    }

    /// Descriptor registered for [`Self::target`].
    #[must_use]
    pub fn descriptor(&self) -> VariableDescriptor {
        VariableDescriptor::new(
            self.display_name.clone(),
            VariableType::Ordinal,
            self.conversion(),
        )
    }

    /// Bins every record of `source`.
    #[must_use]
    pub fn bin_column(&self, source: &[Option<i64>]) -> Vec<Option<i64>> {
        source
            .iter()
            .map(|raw| self.bin_source(*raw).map(bin_code))
            .collect()
    }
}

#[allow(clippy::cast_possible_wrap)]
const fn bin_code(idx: usize) -> i64 {
    idx as i64
}

/// Builds one label per bin.
///
/// `interior` renders `(lower, upper]`; `first` and `last`, when given,
/// replace the first and last labels.
fn bin_labels(
    boundaries: &[i64],
    interior: impl Fn(i64, i64) -> String,
    first: Option<String>,
    last: Option<String>,
) -> Vec<String> {
    let mut labels: Vec<String> = boundaries
        .windows(2)
        .map(|pair| interior(pair[0], pair[1]))
        .collect();
    if let (Some(first), Some(label)) = (first, labels.first_mut()) {
        *label = first;
    }
    if let (Some(last), Some(label)) = (last, labels.last_mut()) {
        *label = last;
    }
    labels
}

/// Integer range label: `"25 - 34"`, or just `"2"` when the bin holds a
/// single integer.
fn count_range(lower: i64, upper: i64) -> String {
    if lower + 1 == upper {
        upper.to_string()
    } else {
        format!("{} - {upper}", lower + 1)
    }
}

fn dollars(amount: i64) -> String {
    format!("${}", group_thousands(amount))
}

/// Second-to-last boundary, i.e. the lower edge of the open-ended bin.
fn last_finite(boundaries: &[i64]) -> i64 {
    boundaries.iter().rev().nth(1).copied().unwrap_or_default()
}

/// Age buckets: `24 or less`, `25 - 34`, ..., `65 - 74`, `75+`.
#[must_use]
pub fn age_policy(survey_year: i64) -> BinPolicy {
    let boundaries = AGE_BOUNDARIES.to_vec();
    let labels = bin_labels(
        &boundaries,
        count_range,
        Some(format!("{} or less", boundaries[1])),
        Some(format!("{}+", last_finite(&boundaries) + 1)),
    );
    BinPolicy {
        source: Variable::TbirthYear,
        target: Variable::AgeBin,
        display_name: "Age".to_string(),
        boundaries,
        labels,
        transform: SourceTransform::AgeFromBirthYear { survey_year },
    }
}

/// Household size buckets: `1`, `2`, `3 - 4`, `5 - 7`, `8+`.
#[must_use]
pub fn household_size_policy() -> BinPolicy {
    let boundaries = HOUSEHOLD_SIZE_BOUNDARIES.to_vec();
    let labels = bin_labels(
        &boundaries,
        count_range,
        None,
        Some(format!("{}+", last_finite(&boundaries) + 1)),
    );
    BinPolicy {
        source: Variable::ThhldNumper,
        target: Variable::HhBin,
        display_name: "Household size".to_string(),
        boundaries,
        labels,
        transform: SourceTransform::Identity,
    }
}

/// Monthly rent buckets: `$400 or less`, `$400 - $800`, ...,
/// `$2,000 or more`.
#[must_use]
pub fn rent_policy() -> BinPolicy {
    let boundaries = RENT_BOUNDARIES.to_vec();
    let labels = bin_labels(
        &boundaries,
        |lower, upper| format!("{} - {}", dollars(lower), dollars(upper)),
        Some(format!("{} or less", dollars(boundaries[1]))),
        Some(format!("{} or more", dollars(last_finite(&boundaries)))),
    );
    BinPolicy {
        source: Variable::Trentamt,
        target: Variable::RentBin,
        display_name: "Rent (per month)".to_string(),
        boundaries,
        labels,
        transform: SourceTransform::Identity,
    }
}

/// The policies applied at startup, in order.
#[must_use]
pub fn default_policies(survey_year: i64) -> Vec<BinPolicy> {
    vec![
        age_policy(survey_year),
        household_size_policy(),
        rent_policy(),
    ]
}

/// Applies one policy: adds (or replaces) the derived column and merges the
/// derived descriptor into `builder`.
///
/// A missing source column leaves the table untouched; the descriptor is
/// still merged so the dictionary is the same whatever the extract holds.
///
/// # Errors
///
/// Returns [`SurveyError::ColumnLength`] if the derived column cannot be
/// attached to the table.
pub fn apply_policy(
    table: SurveyTable,
    builder: &mut DictionaryBuilder,
    policy: &BinPolicy,
) -> Result<SurveyTable, SurveyError> {
    builder.merge(policy.target, policy.descriptor());

    let Some(source) = table.column(policy.source) else {
        log::warn!(
            "Cannot derive {}: source column {} not loaded",
            policy.target,
            policy.source
        );
        return Ok(table);
    };

    let binned = policy.bin_column(source);
    let unassigned = binned.iter().filter(|b| b.is_none()).count();
    log::debug!(
        "Binned {} into {} ({unassigned} of {} records unassigned)",
        policy.source,
        policy.target,
        binned.len()
    );

    Ok(table.with_column(policy.target, binned)?)
}

/// Applies the [`default_policies`] and returns the extended table along
/// with a new dictionary containing the derived descriptors.
///
/// Running this again on its own output yields the same table and
/// dictionary.
///
/// # Errors
///
/// Returns [`SurveyError::ColumnLength`] if a derived column cannot be
/// attached to the table.
pub fn preprocess(
    mut table: SurveyTable,
    dictionary: &DataDictionary,
    survey_year: i64,
) -> Result<(SurveyTable, DataDictionary), SurveyError> {
    let mut builder = dictionary.to_builder();
    let before: Vec<Variable> = table.variables().collect();

    for policy in default_policies(survey_year) {
        table = apply_policy(table, &mut builder, &policy)?;
    }

    let added: Vec<Variable> = table
        .variables()
        .filter(|v| !before.contains(v))
        .collect();
    log::info!("Added derived columns: {added:?}");

    Ok((table, builder.build()))
}

#[cfg(test)]
mod tests {
    use displacement_survey_models::WeightColumn;

    use super::*;

    fn labels(policy: &BinPolicy) -> Vec<&str> {
        policy.labels.iter().map(String::as_str).collect()
    }

    #[test]
    fn age_labels() {
        assert_eq!(
            labels(&age_policy(DEFAULT_SURVEY_YEAR)),
            ["24 or less", "25 - 34", "35 - 44", "45 - 54", "55 - 64", "65 - 74", "75+"]
        );
    }

    #[test]
    fn household_size_labels() {
        assert_eq!(
            labels(&household_size_policy()),
            ["1", "2", "3 - 4", "5 - 7", "8+"]
        );
    }

    #[test]
    fn rent_labels() {
        assert_eq!(
            labels(&rent_policy()),
            [
                "$400 or less",
                "$400 - $800",
                "$800 - $1,200",
                "$1,200 - $2,000",
                "$2,000 or more"
            ]
        );
    }

    #[test]
    fn age_from_birth_year() {
        let policy = age_policy(2022);
        // 2022 - 2000 = 22
        assert_eq!(policy.bin_source(Some(2000)), Some(0));
        assert_eq!(policy.conversion().label(0), Some("24 or less"));
        // 2022 - 1988 = 34 closes the second bin
        assert_eq!(policy.bin_source(Some(1988)), Some(1));
        assert_eq!(policy.bin_source(Some(1987)), Some(2));
        assert_eq!(policy.bin_source(Some(1930)), Some(6));
    }

    #[test]
    fn future_or_current_birth_year_is_youngest_bin() {
        let policy = age_policy(2022);
        assert_eq!(policy.bin_source(Some(2022)), Some(0));
        assert_eq!(policy.bin_source(Some(2030)), Some(0));
    }

    #[test]
    fn sentinels_and_missing_stay_unassigned() {
        let policy = age_policy(2022);
        assert_eq!(policy.bin_source(Some(-99)), None);
        assert_eq!(policy.bin_source(Some(-88)), None);
        assert_eq!(policy.bin_source(None), None);
        assert_eq!(rent_policy().bin_source(Some(-99)), None);
    }

    #[test]
    fn lower_bound_belongs_to_first_bin() {
        let rent = rent_policy();
        assert_eq!(rent.bin_index(0), Some(0));
        assert_eq!(rent.bin_index(400), Some(0));
        assert_eq!(rent.bin_index(401), Some(1));
        assert_eq!(rent.bin_index(10000), Some(4));
        assert_eq!(rent.bin_index(10001), None);
        assert_eq!(rent.bin_index(-1), None);
    }

    #[test]
    fn household_size_bins() {
        let policy = household_size_policy();
        let binned = policy.bin_column(&[Some(1), Some(2), Some(4), Some(5), Some(12), None]);
        assert_eq!(binned, [Some(0), Some(1), Some(2), Some(3), Some(4), None]);
    }

    fn fixture() -> (SurveyTable, DataDictionary) {
        let table = SurveyTable::new(vec!["a".into(), "b".into(), "c".into()])
            .with_weights(WeightColumn::Household, vec![1.0, 1.0, 1.0])
            .unwrap()
            .with_column(Variable::TbirthYear, vec![Some(2000), Some(1940), Some(-99)])
            .unwrap()
            .with_column(Variable::Trentamt, vec![Some(0), Some(950), None])
            .unwrap();
        let mut builder = DataDictionary::builder();
        builder.insert(
            Variable::TbirthYear,
            VariableDescriptor::new("Year of birth", VariableType::Numeric, Conversion::new()),
        );
        (table, builder.build())
    }

    #[test]
    fn preprocess_adds_columns_and_descriptors() {
        let (table, dictionary) = fixture();
        let (table, dictionary) = preprocess(table, &dictionary, 2022).unwrap();

        assert_eq!(
            table.column(Variable::AgeBin).unwrap(),
            [Some(0), Some(6), None]
        );
        assert_eq!(
            table.column(Variable::RentBin).unwrap(),
            [Some(0), Some(2), None]
        );
        // THHLD_NUMPER not loaded: no column, descriptor still registered.
        assert!(!table.has_column(Variable::HhBin));
        assert!(dictionary.contains(Variable::HhBin));

        let age = dictionary.descriptor(Variable::AgeBin).unwrap();
        assert_eq!(age.name, "Age");
        assert_eq!(age.kind, VariableType::Ordinal);
        assert_eq!(age.conversion.len(), 7);
        assert!(dictionary.contains(Variable::TbirthYear));
    }

    #[test]
    fn preprocess_is_idempotent() {
        let (table, dictionary) = fixture();
        let (once_table, once_dictionary) = preprocess(table, &dictionary, 2022).unwrap();
        let (twice_table, twice_dictionary) =
            preprocess(once_table.clone(), &once_dictionary, 2022).unwrap();

        assert_eq!(once_table, twice_table);
        assert_eq!(once_dictionary, twice_dictionary);
    }

    #[test]
    fn existing_descriptor_keeps_name_and_gets_fresh_conversion() {
        let (table, _) = fixture();
        let mut builder = DataDictionary::builder();
        builder.insert(
            Variable::RentBin,
            VariableDescriptor::new(
                "Monthly rent",
                VariableType::Ordinal,
                [(0, "stale")].into_iter().collect(),
            ),
        );
        let (_, dictionary) = preprocess(table, &builder.build(), 2022).unwrap();

        let rent = dictionary.descriptor(Variable::RentBin).unwrap();
        assert_eq!(rent.name, "Monthly rent");
        assert_eq!(rent.conversion, rent_policy().conversion());
    }
}
