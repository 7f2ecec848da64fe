#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Survey variable, data dictionary and respondent table types.
//!
//! The dashboard only ever looks at a fixed subset of the Household Pulse
//! Survey, so every column it touches is a [`Variable`]. Looking a column
//! up by an unknown code is an error at the boundary rather than a silent
//! miss deep inside an aggregation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// Raw codes meaning "missing" (`-99`) or "refused/not applicable" (`-88`).
///
/// Records carrying either value in a variable are never aggregated for
/// that variable.
pub const SENTINEL_CODES: [i64; 2] = [-88, -99];

/// Column holding the unique respondent identifier.
pub const RESPONDENT_ID_COLUMN: &str = "SCRAM";

/// Returns `true` if `code` is one of the reserved [`SENTINEL_CODES`].
#[must_use]
pub fn is_sentinel(code: i64) -> bool {
    SENTINEL_CODES.contains(&code)
}

/// Formats an integer with `,` thousands separators (`1234567` -> `1,234,567`).
#[must_use]
pub fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        grouped.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

/// A survey variable known to the dashboard, keyed by its survey code.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Variable {
    /// Property damage severity.
    NdDamage,
    /// How long the household was displaced.
    NdHowlong,
    /// Type of disaster.
    HazardType,
    /// Unsanitary conditions after the disaster.
    NdUnsanitary,
    /// Food shortage after the disaster.
    NdFdshrtage,
    /// Loss of water.
    NdWater,
    /// Loss of electricity.
    NdElctrc,
    /// Frequency of feeling down or depressed.
    Down,
    /// Frequency of worrying.
    Worry,
    /// Difficulty walking or climbing stairs.
    Mobility,
    /// Difficulty remembering or concentrating.
    Remembering,
    /// Difficulty with self care.
    Selfcare,
    /// Difficulty understanding or being understood.
    Understand,
    /// Housing tenure.
    Tenure,
    /// Type of living quarters.
    Livqtrrv,
    /// Monthly rent bucket (derived from [`Self::Trentamt`]).
    RentBin,
    /// Educational attainment.
    Eeduc,
    /// Household income.
    Income,
    /// Household income per person.
    IncomePer,
    /// Any work in the last seven days.
    Anywork,
    /// Work setting.
    Setting,
    /// Kind of work.
    Kindwork,
    /// Days teleworked.
    Twdays,
    /// School enrollment.
    Schoolenroll,
    /// Household size bucket (derived from [`Self::ThhldNumper`]).
    HhBin,
    /// Age bucket (derived from [`Self::TbirthYear`]).
    AgeBin,
    /// Hispanic origin.
    Rhispanic,
    /// Race.
    Rrace,
    /// Marital status.
    Ms,
    /// Gender identity.
    GenidDescribe,
    /// Year of birth.
    TbirthYear,
    /// Number of people in the household.
    ThhldNumper,
    /// Monthly rent amount in dollars.
    Trentamt,
}

impl Variable {
    /// The property damage outcome.
    pub const DAMAGE: Self = Self::NdDamage;

    /// The displacement duration outcome.
    pub const DURATION: Self = Self::NdHowlong;

    /// Variables offered as dashboard factors, in display order.
    pub const FACTORS: &[Self] = &[
        Self::NdDamage,
        Self::NdHowlong,
        Self::HazardType,
        Self::NdUnsanitary,
        Self::NdFdshrtage,
        Self::NdWater,
        Self::NdElctrc,
        Self::Down,
        Self::Worry,
        Self::Mobility,
        Self::Remembering,
        Self::Selfcare,
        Self::Understand,
        Self::Tenure,
        Self::Livqtrrv,
        Self::RentBin,
        Self::Eeduc,
        Self::Income,
        Self::IncomePer,
        Self::Anywork,
        Self::Setting,
        Self::Kindwork,
        Self::Twdays,
        Self::Schoolenroll,
        Self::HhBin,
        Self::AgeBin,
        Self::Rhispanic,
        Self::Rrace,
        Self::Ms,
        Self::GenidDescribe,
    ];

    /// Parses a survey code into a [`Variable`].
    ///
    /// # Errors
    ///
    /// Returns [`UnknownVariableError`] if the code is not one the
    /// dashboard knows about.
    pub fn from_code(code: &str) -> Result<Self, UnknownVariableError> {
        code.trim().parse().map_err(|_| UnknownVariableError {
            code: code.trim().to_string(),
        })
    }
}

/// Error returned when a survey code does not name a known [`Variable`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariableError {
    /// The code that failed to parse.
    pub code: String,
}

impl std::fmt::Display for UnknownVariableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown survey variable '{}'", self.code)
    }
}

impl std::error::Error for UnknownVariableError {}

/// Survey weight columns a cross-tab can be weighted by.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
pub enum WeightColumn {
    /// Household weight.
    #[default]
    #[serde(rename = "HWEIGHT")]
    #[strum(serialize = "HWEIGHT")]
    Household,
    /// Person weight.
    #[serde(rename = "PWEIGHT")]
    #[strum(serialize = "PWEIGHT")]
    Person,
}

/// Measurement level of a survey variable.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[strum(ascii_case_insensitive)]
pub enum VariableType {
    /// Ordered categories.
    Ordinal,
    /// Unordered categories.
    Nominal,
    /// Continuous or count values.
    Numeric,
}

impl VariableType {
    /// Returns `true` for [`Self::Ordinal`] and [`Self::Nominal`].
    #[must_use]
    pub const fn is_categorical(self) -> bool {
        matches!(self, Self::Ordinal | Self::Nominal)
    }
}

/// Mapping from raw survey code to display label, ordered by code.
///
/// Code order is the natural category order used for chart axes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Conversion(BTreeMap<i64, String>);

impl Conversion {
    /// Creates an empty conversion.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Inserts a label, returning the label it replaced.
    pub fn insert(&mut self, code: i64, label: impl Into<String>) -> Option<String> {
        self.0.insert(code, label.into())
    }

    /// Display label for `code`, if mapped.
    #[must_use]
    pub fn label(&self, code: i64) -> Option<&str> {
        self.0.get(&code).map(String::as_str)
    }

    /// Position of `code` in category order, if mapped.
    #[must_use]
    pub fn position(&self, code: i64) -> Option<usize> {
        self.0.keys().position(|c| *c == code)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates `(code, label)` pairs in category order.
    pub fn iter(&self) -> impl Iterator<Item = (i64, &str)> {
        self.0.iter().map(|(code, label)| (*code, label.as_str()))
    }
}

impl<S: Into<String>> FromIterator<(i64, S)> for Conversion {
    fn from_iter<T: IntoIterator<Item = (i64, S)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(code, label)| (code, label.into()))
                .collect(),
        )
    }
}

/// Data dictionary entry for one survey variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableDescriptor {
    /// Human-readable name used for axis and legend titles.
    pub name: String,
    /// Measurement level.
    pub kind: VariableType,
    /// Raw code to label mapping. Empty for most numeric variables.
    pub conversion: Conversion,
}

impl VariableDescriptor {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: VariableType, conversion: Conversion) -> Self {
        Self {
            name: name.into(),
            kind,
            conversion,
        }
    }
}

/// Error returned when a variable has no entry in the [`DataDictionary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissingDescriptorError {
    /// The variable that was looked up.
    pub variable: Variable,
}

impl std::fmt::Display for MissingDescriptorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "no data dictionary entry for '{}'", self.variable)
    }
}

impl std::error::Error for MissingDescriptorError {}

/// Immutable data dictionary keyed by [`Variable`].
///
/// Built once from the dictionary file, extended with derived descriptors
/// through a [`DictionaryBuilder`], then only ever read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DataDictionary {
    descriptors: BTreeMap<Variable, VariableDescriptor>,
}

impl DataDictionary {
    /// Starts a builder seeded with no descriptors.
    #[must_use]
    pub fn builder() -> DictionaryBuilder {
        DictionaryBuilder::default()
    }

    /// Starts a builder seeded with a copy of this dictionary.
    #[must_use]
    pub fn to_builder(&self) -> DictionaryBuilder {
        DictionaryBuilder {
            descriptors: self.descriptors.clone(),
        }
    }

    /// Descriptor for `variable`, if present.
    #[must_use]
    pub fn get(&self, variable: Variable) -> Option<&VariableDescriptor> {
        self.descriptors.get(&variable)
    }

    /// Descriptor for `variable`.
    ///
    /// # Errors
    ///
    /// Returns [`MissingDescriptorError`] if the dictionary has no entry.
    pub fn descriptor(
        &self,
        variable: Variable,
    ) -> Result<&VariableDescriptor, MissingDescriptorError> {
        self.get(variable)
            .ok_or(MissingDescriptorError { variable })
    }

    #[must_use]
    pub fn contains(&self, variable: Variable) -> bool {
        self.descriptors.contains_key(&variable)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Variable, &VariableDescriptor)> {
        self.descriptors.iter().map(|(v, d)| (*v, d))
    }
}

/// Accumulates descriptors before freezing them into a [`DataDictionary`].
#[derive(Debug, Clone, Default)]
pub struct DictionaryBuilder {
    descriptors: BTreeMap<Variable, VariableDescriptor>,
}

impl DictionaryBuilder {
    /// Inserts or replaces the descriptor for `variable`.
    pub fn insert(&mut self, variable: Variable, descriptor: VariableDescriptor) -> &mut Self {
        self.descriptors.insert(variable, descriptor);
        self
    }

    /// Merges a derived descriptor.
    ///
    /// A new variable gets the whole descriptor. An existing variable keeps
    /// its name and type and only has its conversion replaced, so merging
    /// the same derived descriptor twice is a no-op.
    pub fn merge(&mut self, variable: Variable, descriptor: VariableDescriptor) -> &mut Self {
        match self.descriptors.get_mut(&variable) {
            Some(existing) => existing.conversion = descriptor.conversion,
            None => {
                self.descriptors.insert(variable, descriptor);
            }
        }
        self
    }

    /// Returns `true` if a descriptor for `variable` has been added.
    #[must_use]
    pub fn contains(&self, variable: Variable) -> bool {
        self.descriptors.contains_key(&variable)
    }

    #[must_use]
    pub fn build(self) -> DataDictionary {
        DataDictionary {
            descriptors: self.descriptors,
        }
    }
}

/// Error returned when a column does not match the table's record count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnLengthError {
    /// Column that was being added.
    pub column: String,
    /// Number of values supplied.
    pub len: usize,
    /// Number of records in the table.
    pub expected: usize,
}

impl std::fmt::Display for ColumnLengthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "column '{}' has {} values, table has {} records",
            self.column, self.len, self.expected
        )
    }
}

impl std::error::Error for ColumnLengthError {}

/// Column-oriented respondent table.
///
/// One record per respondent. Code columns hold `None` where the source
/// cell was empty or (for derived columns) where no bin applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SurveyTable {
    ids: Vec<String>,
    weights: BTreeMap<WeightColumn, Vec<f64>>,
    columns: BTreeMap<Variable, Vec<Option<i64>>>,
}

impl SurveyTable {
    /// Creates a table with one record per respondent id and no columns.
    #[must_use]
    pub const fn new(ids: Vec<String>) -> Self {
        Self {
            ids,
            weights: BTreeMap::new(),
            columns: BTreeMap::new(),
        }
    }

    /// Adds (or replaces) a weight column.
    ///
    /// # Errors
    ///
    /// Returns [`ColumnLengthError`] if `values` does not have one entry per
    /// record.
    pub fn with_weights(
        mut self,
        column: WeightColumn,
        values: Vec<f64>,
    ) -> Result<Self, ColumnLengthError> {
        self.check_len(column.as_ref(), values.len())?;
        self.weights.insert(column, values);
        Ok(self)
    }

    /// Adds (or replaces) a code column.
    ///
    /// # Errors
    ///
    /// Returns [`ColumnLengthError`] if `values` does not have one entry per
    /// record.
    pub fn with_column(
        mut self,
        variable: Variable,
        values: Vec<Option<i64>>,
    ) -> Result<Self, ColumnLengthError> {
        self.check_len(variable.as_ref(), values.len())?;
        self.columns.insert(variable, values);
        Ok(self)
    }

    fn check_len(&self, column: &str, len: usize) -> Result<(), ColumnLengthError> {
        if len == self.ids.len() {
            Ok(())
        } else {
            Err(ColumnLengthError {
                column: column.to_string(),
                len,
                expected: self.ids.len(),
            })
        }
    }

    /// Number of respondent records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Respondent identifiers in record order.
    #[must_use]
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Values of a code column, if loaded.
    #[must_use]
    pub fn column(&self, variable: Variable) -> Option<&[Option<i64>]> {
        self.columns.get(&variable).map(Vec::as_slice)
    }

    /// Values of a weight column, if loaded.
    #[must_use]
    pub fn weights(&self, column: WeightColumn) -> Option<&[f64]> {
        self.weights.get(&column).map(Vec::as_slice)
    }

    #[must_use]
    pub fn has_column(&self, variable: Variable) -> bool {
        self.columns.contains_key(&variable)
    }

    /// Loaded code columns in [`Variable`] order.
    pub fn variables(&self) -> impl Iterator<Item = Variable> + '_ {
        self.columns.keys().copied()
    }
}
